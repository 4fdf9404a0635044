//! Update policy
//!
//! Decides what to do with one declared resource given what the cluster
//! already holds under the same name.

use std::fmt;

use semver::Version;

use crate::kind::UpdatePolicy;
use crate::resource::VersionedResource;

/// Action taken for a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateDecision {
    /// Not present, create it
    Create,
    /// Present and outdated (or forced), patch in place
    PatchUpdate,
    /// Present and outdated (or forced), delete then create
    RecreateUpdate,
    /// Installed version is newer than the candidate
    SkipNewer,
    /// Installed version equals the candidate
    SkipUpToDate,
}

impl UpdateDecision {
    /// Decide the action for a candidate version
    ///
    /// Equal versions with `force` still update, never create.
    pub fn decide(
        existing: Option<&VersionedResource>,
        candidate: &Version,
        force: bool,
        policy: UpdatePolicy,
    ) -> Self {
        let Some(existing) = existing else {
            return Self::Create;
        };

        let needs_update = existing.version < *candidate;
        let is_newer = existing.version > *candidate;

        if !(needs_update || force) {
            return if is_newer {
                Self::SkipNewer
            } else {
                Self::SkipUpToDate
            };
        }

        match policy {
            UpdatePolicy::Recreate => Self::RecreateUpdate,
            UpdatePolicy::Patch => Self::PatchUpdate,
        }
    }

    /// Whether the decision leads to an API mutation
    pub fn is_mutation(&self) -> bool {
        !self.is_skip()
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkipNewer | Self::SkipUpToDate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::PatchUpdate => "patched",
            Self::RecreateUpdate => "recreated",
            Self::SkipNewer => "skipped (newer installed)",
            Self::SkipUpToDate => "skipped (up to date)",
        }
    }
}

impl fmt::Display for UpdateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argopack_core::provenance::keys;
    use kube::api::{DynamicObject, ObjectMeta};
    use std::collections::BTreeMap;

    fn existing(version: Option<&str>) -> VersionedResource {
        let labels = version.map(|v| BTreeMap::from([(keys::VERSION.to_string(), v.to_string())]));
        VersionedResource::from_object(DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some("res".to_string()),
                labels,
                ..Default::default()
            },
            data: serde_json::json!({}),
        })
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_absent_creates() {
        for force in [false, true] {
            assert_eq!(
                UpdateDecision::decide(None, &v("1.0.0"), force, UpdatePolicy::Patch),
                UpdateDecision::Create
            );
        }
    }

    #[test]
    fn test_upgrade_patches_or_recreates() {
        let old = existing(Some("1.0.0"));
        assert_eq!(
            UpdateDecision::decide(Some(&old), &v("1.1.0"), false, UpdatePolicy::Patch),
            UpdateDecision::PatchUpdate
        );
        assert_eq!(
            UpdateDecision::decide(Some(&old), &v("1.1.0"), false, UpdatePolicy::Recreate),
            UpdateDecision::RecreateUpdate
        );
    }

    #[test]
    fn test_downgrade_is_skipped_unless_forced() {
        let newer = existing(Some("2.0.0"));
        assert_eq!(
            UpdateDecision::decide(Some(&newer), &v("1.0.0"), false, UpdatePolicy::Patch),
            UpdateDecision::SkipNewer
        );
        assert_eq!(
            UpdateDecision::decide(Some(&newer), &v("1.0.0"), true, UpdatePolicy::Patch),
            UpdateDecision::PatchUpdate
        );
        assert_eq!(
            UpdateDecision::decide(Some(&newer), &v("1.0.0"), true, UpdatePolicy::Recreate),
            UpdateDecision::RecreateUpdate
        );
    }

    #[test]
    fn test_equal_versions() {
        let same = existing(Some("1.0.0"));
        assert_eq!(
            UpdateDecision::decide(Some(&same), &v("1.0.0"), false, UpdatePolicy::Patch),
            UpdateDecision::SkipUpToDate
        );
        assert_eq!(
            UpdateDecision::decide(Some(&same), &v("1.0.0"), true, UpdatePolicy::Patch),
            UpdateDecision::PatchUpdate
        );
    }

    #[test]
    fn test_unlabeled_object_is_always_older() {
        let unlabeled = existing(None);
        assert_eq!(
            UpdateDecision::decide(Some(&unlabeled), &v("0.0.1"), false, UpdatePolicy::Patch),
            UpdateDecision::PatchUpdate
        );
    }

    #[test]
    fn test_prerelease_is_older_than_release() {
        let pre = existing(Some("1.0.0-rc.1"));
        assert_eq!(
            UpdateDecision::decide(Some(&pre), &v("1.0.0"), false, UpdatePolicy::Patch),
            UpdateDecision::PatchUpdate
        );
    }

    #[test]
    fn test_skip_flags() {
        assert!(UpdateDecision::SkipNewer.is_skip());
        assert!(UpdateDecision::SkipUpToDate.is_skip());
        assert!(UpdateDecision::RecreateUpdate.is_mutation());
        assert!(UpdateDecision::Create.is_mutation());
    }
}
