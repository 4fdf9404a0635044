//! Error types for argopack-kube

use argopack_core::CoreError;
use thiserror::Error;

/// Result type for argopack-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reconciling packages against a cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// A cluster API call failed for a specific object
    #[error("failed to {verb} {kind} '{name}' ({scope}): {source}")]
    Operation {
        verb: &'static str,
        kind: String,
        name: String,
        scope: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Object lacks the installer marker label
    #[error("{kind} '{name}' is not managed by argopack (missing installer label)")]
    NotAPackage { kind: String, name: String },

    /// Lookup by name did not match exactly one installed package
    #[error("package '{name}' not found in {scope} ({found} match(es))")]
    PackageNotFound {
        name: String,
        scope: String,
        found: usize,
    },

    /// A resource manifest could not be parsed
    #[error("failed to parse {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// A manifest parsed but does not describe a usable object
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Declared parameter without a runtime value
    #[error("Required parameter missing '{name}'")]
    RequiredParameterMissing { name: String },

    /// Package template has no entrypoint
    #[error("package '{name}' is not runnable (no entrypoint)")]
    NotRunnable { name: String },

    /// Named template is not part of the package
    #[error("template '{template}' not found in package '{package}'")]
    TemplateNotFound { package: String, template: String },

    /// One or more resources failed; every failure is kept
    #[error("{scope}: {} resource(s) failed{}", .failures.len(), render_failures(.failures))]
    ReconcileFailed {
        scope: String,
        failures: Vec<KubeError>,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Package model error
    #[error(transparent)]
    Core(CoreError),
}

fn render_failures(failures: &[KubeError]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  - {}", f))
        .collect::<String>()
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<CoreError> for KubeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::RequiredParameterMissing { name } => {
                KubeError::RequiredParameterMissing { name }
            }
            other => KubeError::Core(other),
        }
    }
}

impl KubeError {
    /// HTTP status code of the underlying API error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => Some(resp.code),
            KubeError::Operation { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// `Ok` when there are no failures, else the aggregate of all of them
    pub fn aggregate(scope: impl Into<String>, errors: Vec<KubeError>) -> Result<()> {
        if errors.is_empty() {
            return Ok(());
        }
        Err(Self::reconcile_failed(scope, errors))
    }

    /// Collapse failures into one error, flattening nested aggregates
    pub fn reconcile_failed(scope: impl Into<String>, errors: Vec<KubeError>) -> Self {
        let failures = errors
            .into_iter()
            .flat_map(|e| match e {
                KubeError::ReconcileFailed { failures, .. } => failures,
                other => vec![other],
            })
            .collect();

        KubeError::ReconcileFailed {
            scope: scope.into(),
            failures,
        }
    }
}
