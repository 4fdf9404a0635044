//! Workflow submission model
//!
//! Running an installed package submits an Argo `Workflow` that references
//! the package's WorkflowTemplate, or a one-task DAG calling a single
//! template of it. Declared parameters without a default value are
//! required at submission time.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{CoreError, Result};

/// A workflow parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A declared parameter with no value must be supplied at runtime
    pub fn is_required(&self) -> bool {
        self.value.is_none()
    }
}

/// `arguments` / `inputs` block of a workflow or template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Arguments {
    /// Read an `arguments`/`inputs` object, tolerating its absence
    ///
    /// Non-string parameter values (numbers, booleans) are kept as their
    /// JSON text.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(params) = value
            .and_then(|v| v.get("parameters"))
            .and_then(Value::as_array)
        else {
            return Self::default();
        };

        let parameters = params
            .iter()
            .filter_map(|p| {
                let name = p.get("name")?.as_str()?.to_string();
                let value = p.get("value").map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
                Some(Parameter { name, value })
            })
            .collect();

        Self { parameters }
    }

    /// Value supplied for a parameter
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rev()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_deref())
    }

    /// Check that every required parameter has a runtime value
    pub fn check_required(&self, runtime: &Arguments) -> Result<()> {
        for parameter in self.parameters.iter().filter(|p| p.is_required()) {
            if runtime.value_of(&parameter.name).is_none() {
                return Err(CoreError::RequiredParameterMissing {
                    name: parameter.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Parse runtime arguments given as `--name value` pairs
pub fn parse_arguments<S: AsRef<str>>(args: &[S]) -> Result<Arguments> {
    if args.len() % 2 != 0 {
        return Err(CoreError::InvalidArguments {
            message: format!(
                "expected `--name value` pairs, got a dangling '{}'",
                args[args.len() - 1].as_ref()
            ),
        });
    }

    let parameters = args
        .chunks(2)
        .map(|pair| {
            let name = pair[0].as_ref();
            let name = name.strip_prefix("--").unwrap_or(name);
            Parameter::new(name, pair[1].as_ref())
        })
        .collect();

    Ok(Arguments { parameters })
}

/// Options shared by both kinds of workflow submission
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reference cluster-scoped templates
    pub cluster: bool,
    pub service_account: Option<String>,
    pub image_pull_secret: Option<String>,
}

/// Workflow running a package's WorkflowTemplate
pub fn package_workflow(template_name: &str, args: &Arguments, options: &RunOptions) -> Value {
    let mut workflow = workflow_skeleton(template_name, options);
    workflow["spec"]["workflowTemplateRef"] = json!({
        "name": template_name,
        "clusterScope": options.cluster,
    });
    workflow["spec"]["arguments"] = json!(args);
    workflow
}

/// Workflow calling a single template of a package through a one-task DAG
pub fn template_workflow(
    package_template: &str,
    template: &str,
    args: &Arguments,
    options: &RunOptions,
) -> Value {
    let mut workflow = workflow_skeleton(template, options);
    workflow["spec"]["entrypoint"] = json!(template);
    workflow["spec"]["templates"] = json!([{
        "name": template,
        "dag": {
            "tasks": [{
                "name": format!("call-{}", template),
                "templateRef": {
                    "name": package_template,
                    "template": template,
                    "clusterScope": options.cluster,
                },
                "arguments": args,
            }]
        }
    }]);
    workflow
}

fn workflow_skeleton(name: &str, options: &RunOptions) -> Value {
    let mut workflow = json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Workflow",
        "metadata": { "generateName": format!("{}-", name) },
        "spec": {},
    });

    if let Some(sa) = &options.service_account {
        workflow["spec"]["serviceAccountName"] = json!(sa);
    }
    if let Some(secret) = &options.image_pull_secret {
        workflow["spec"]["imagePullSecrets"] = json!([{ "name": secret }]);
    }
    workflow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let args = parse_arguments(&["--env", "prod", "--retries", "3"]).unwrap();
        assert_eq!(args.value_of("env"), Some("prod"));
        assert_eq!(args.value_of("retries"), Some("3"));
    }

    #[test]
    fn test_parse_arguments_dangling() {
        let err = parse_arguments(&["--env"]);
        assert!(matches!(err, Err(CoreError::InvalidArguments { .. })));
    }

    #[test]
    fn test_parse_arguments_empty() {
        let args = parse_arguments::<&str>(&[]).unwrap();
        assert!(args.parameters.is_empty());
    }

    #[test]
    fn test_arguments_from_value() {
        let value = json!({"parameters": [
            {"name": "env"},
            {"name": "retries", "value": 3},
            {"name": "mode", "value": "fast"}
        ]});
        let args = Arguments::from_value(Some(&value));

        assert_eq!(args.parameters.len(), 3);
        assert!(args.parameters[0].is_required());
        assert_eq!(args.value_of("retries"), Some("3"));
        assert_eq!(args.value_of("mode"), Some("fast"));
        assert_eq!(Arguments::from_value(None), Arguments::default());
    }

    #[test]
    fn test_check_required() {
        let declared = Arguments {
            parameters: vec![
                Parameter {
                    name: "env".to_string(),
                    value: None,
                },
                Parameter::new("mode", "fast"),
            ],
        };

        let missing = parse_arguments(&["--mode", "slow"]).unwrap();
        let err = declared.check_required(&missing).unwrap_err();
        assert!(matches!(err, CoreError::RequiredParameterMissing { name } if name == "env"));

        let supplied = parse_arguments(&["--env", "prod"]).unwrap();
        assert!(declared.check_required(&supplied).is_ok());
    }

    #[test]
    fn test_package_workflow() {
        let args = parse_arguments(&["--env", "prod"]).unwrap();
        let options = RunOptions {
            cluster: true,
            service_account: Some("runner".to_string()),
            image_pull_secret: Some("regcred".to_string()),
        };
        let wf = package_workflow("demo", &args, &options);

        assert_eq!(wf["metadata"]["generateName"], "demo-");
        assert_eq!(wf["spec"]["workflowTemplateRef"]["name"], "demo");
        assert_eq!(wf["spec"]["workflowTemplateRef"]["clusterScope"], true);
        assert_eq!(wf["spec"]["serviceAccountName"], "runner");
        assert_eq!(wf["spec"]["imagePullSecrets"][0]["name"], "regcred");
        assert_eq!(wf["spec"]["arguments"]["parameters"][0]["value"], "prod");
    }

    #[test]
    fn test_template_workflow() {
        let wf = template_workflow("demo", "extract", &Arguments::default(), &RunOptions::default());

        assert_eq!(wf["metadata"]["generateName"], "extract-");
        assert_eq!(wf["spec"]["entrypoint"], "extract");
        let task = &wf["spec"]["templates"][0]["dag"]["tasks"][0];
        assert_eq!(task["name"], "call-extract");
        assert_eq!(task["templateRef"]["name"], "demo");
        assert_eq!(task["templateRef"]["template"], "extract");
        assert_eq!(task["templateRef"]["clusterScope"], false);
        assert!(wf["spec"].get("serviceAccountName").is_none());
    }
}
