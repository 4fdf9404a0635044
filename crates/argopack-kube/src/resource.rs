//! Cluster objects projected with their package version

use argopack_core::codec::decode;
use argopack_core::provenance::{Provenance, keys};
use kube::api::DynamicObject;
use semver::Version;

use crate::error::{KubeError, Result};

/// A live cluster object with its decoded package version
///
/// Built fresh from every list response. Objects without a usable version
/// label are treated as `0.0.0` so they always look older than any
/// package being installed.
#[derive(Debug, Clone)]
pub struct VersionedResource {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub resource_version: Option<String>,
    pub version: Version,
    pub raw: DynamicObject,
}

impl VersionedResource {
    pub fn from_object(raw: DynamicObject) -> Self {
        let version = raw
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(keys::VERSION))
            .map(|label| parse_lenient(&decode(label)))
            .unwrap_or_else(zero);

        Self {
            kind: raw
                .types
                .as_ref()
                .map(|t| t.kind.clone())
                .unwrap_or_default(),
            name: raw.metadata.name.clone().unwrap_or_default(),
            namespace: raw.metadata.namespace.clone(),
            resource_version: raw.metadata.resource_version.clone(),
            version,
            raw,
        }
    }

    /// Provenance recorded on the object
    pub fn provenance(&self) -> Result<Provenance> {
        let labels = self.raw.metadata.labels.clone().unwrap_or_default();
        Provenance::from_labels(&labels).map_err(|_| KubeError::NotAPackage {
            kind: self.kind.clone(),
            name: self.name.clone(),
        })
    }
}

fn zero() -> Version {
    Version::new(0, 0, 0)
}

/// Parse a version label, padding short forms like `1.2` and `v3`
pub(crate) fn parse_lenient(value: &str) -> Version {
    let value = value.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(value) {
        return version;
    }

    let parts = match value
        .split('.')
        .map(str::parse::<u64>)
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        Ok(parts) => parts,
        Err(_) => return zero(),
    };

    match parts.as_slice() {
        [major] => Version::new(*major, 0, 0),
        [major, minor] => Version::new(*major, *minor, 0),
        _ => zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use kube::core::TypeMeta;
    use std::collections::BTreeMap;

    fn object(labels: Option<BTreeMap<String, String>>) -> DynamicObject {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: "v1".to_string(),
                kind: "ConfigMap".to_string(),
            }),
            metadata: ObjectMeta {
                name: Some("cfg".to_string()),
                namespace: Some("default".to_string()),
                resource_version: Some("7".to_string()),
                labels,
                ..Default::default()
            },
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn test_version_from_label() {
        let labels = BTreeMap::from([(keys::VERSION.to_string(), "1.4.2".to_string())]);
        let res = VersionedResource::from_object(object(Some(labels)));
        assert_eq!(res.version, Version::new(1, 4, 2));
        assert_eq!(res.kind, "ConfigMap");
        assert_eq!(res.name, "cfg");
        assert_eq!(res.resource_version.as_deref(), Some("7"));
    }

    #[test]
    fn test_missing_or_bad_label_is_zero() {
        assert_eq!(VersionedResource::from_object(object(None)).version, zero());

        let labels = BTreeMap::from([(keys::VERSION.to_string(), "latest".to_string())]);
        assert_eq!(
            VersionedResource::from_object(object(Some(labels))).version,
            zero()
        );
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("1.2"), Version::new(1, 2, 0));
        assert_eq!(parse_lenient("v3"), Version::new(3, 0, 0));
        assert_eq!(parse_lenient("2.0.0-beta.1").pre.as_str(), "beta.1");
        assert_eq!(parse_lenient(""), zero());
        assert_eq!(parse_lenient("1.2.3.4"), zero());
    }

    #[test]
    fn test_provenance_requires_marker() {
        let res = VersionedResource::from_object(object(None));
        assert!(matches!(
            res.provenance(),
            Err(KubeError::NotAPackage { .. })
        ));
    }
}
