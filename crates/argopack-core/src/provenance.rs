//! Provenance labels and annotations
//!
//! Every object argopack creates carries labels identifying the package,
//! version, parent package and registry it came from, plus the installer
//! marker used to discover managed objects later. There is no other index:
//! list, uninstall and dependency lookups are all label-selector queries.

use std::collections::BTreeMap;

use crate::codec::{decode, encode, fits_label, special_encode};
use crate::error::{CoreError, Result};
use crate::package::PackageDescriptor;

/// Label and annotation keys
pub mod keys {
    /// Package name
    pub const NAME: &str = "argopm.atlan.com/name";
    /// Package version
    pub const VERSION: &str = "argopm.atlan.com/version";
    /// Root package that triggered the install (`name@version`)
    pub const PARENT: &str = "argopm.atlan.com/parent";
    /// Registry the package came from
    pub const REGISTRY: &str = "argopm.atlan.com/registry";
    /// Installer marker, present on every managed object
    pub const INSTALLER: &str = "argopm.atlan.com/installer";

    pub const DESCRIPTION: &str = "argopm.atlan.com/description";
    pub const HOMEPAGE: &str = "argopm.atlan.com/homepage";
    pub const AUTHOR: &str = "argopm.atlan.com/author";
    pub const REPOSITORY: &str = "argopm.atlan.com/repository";
    pub const SUPPORT: &str = "argopm.atlan.com/support";
    pub const KEYWORDS: &str = "argopm.atlan.com/keywords";
}

/// Value of the installer marker label
pub const INSTALLER_VALUE: &str = "argopm";

/// Keys owned by the installer; these always overwrite author-declared values
pub const PROVENANCE_LABEL_KEYS: [&str; 5] = [
    keys::INSTALLER,
    keys::NAME,
    keys::VERSION,
    keys::PARENT,
    keys::REGISTRY,
];

/// Labels copied onto workflow pods
pub const POD_LABEL_KEYS: [&str; 4] = [keys::INSTALLER, keys::NAME, keys::VERSION, keys::PARENT];

/// Identity of the install being performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub name: String,
    pub version: String,
    pub parent: String,
    pub registry: String,
}

impl Provenance {
    /// Provenance for a package installed on behalf of `parent`
    pub fn new(
        package: &PackageDescriptor,
        parent: impl Into<String>,
        registry: impl Into<String>,
    ) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version.to_string(),
            parent: parent.into(),
            registry: registry.into(),
        }
    }

    /// Decode provenance from the labels of a cluster object
    ///
    /// Fails with `NotAPackage` if the installer marker is missing.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Result<Self> {
        if labels.get(keys::INSTALLER).map(String::as_str) != Some(INSTALLER_VALUE) {
            return Err(CoreError::NotAPackage {
                label: keys::INSTALLER.to_string(),
            });
        }

        let get = |key: &str| labels.get(key).map(|v| decode(v)).unwrap_or_default();

        Ok(Self {
            name: get(keys::NAME),
            version: get(keys::VERSION),
            parent: get(keys::PARENT),
            registry: get(keys::REGISTRY),
        })
    }

    /// `<name>@<version>`
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Encoded provenance labels
    pub fn labels(&self) -> BTreeMap<String, String> {
        let labels = BTreeMap::from([
            (keys::INSTALLER.to_string(), encode(INSTALLER_VALUE)),
            (keys::NAME.to_string(), special_encode(&self.name)),
            (keys::VERSION.to_string(), encode(&self.version)),
            (keys::PARENT.to_string(), special_encode(&self.parent)),
            (keys::REGISTRY.to_string(), special_encode(&self.registry)),
        ]);

        for (key, value) in &labels {
            if !fits_label(value) {
                tracing::warn!(
                    "label {} of package {} is {} characters long and will be rejected by the API server",
                    key,
                    self.name,
                    value.len()
                );
            }
        }

        labels
    }

    /// Selector matching every object of this package
    pub fn package_selector(&self) -> String {
        package_selector(&self.name)
    }

    /// Selector matching every object installed with this package as parent
    pub fn dependency_selector(&self) -> String {
        format!("{}={}", keys::PARENT, special_encode(&self.qualified_name()))
    }
}

/// Full label set for a package: its `config.labels` plus provenance labels
pub fn labels_for_package(
    package: &PackageDescriptor,
    provenance: &Provenance,
) -> BTreeMap<String, String> {
    let mut labels = package.config.labels.clone();
    labels.extend(provenance.labels());
    labels
}

/// Human-readable annotations for a package
pub fn annotations_for_package(
    package: &PackageDescriptor,
    provenance: &Provenance,
) -> BTreeMap<String, String> {
    let mut annotations = package.config.annotations.clone();

    annotations.insert(keys::NAME.to_string(), provenance.name.clone());
    annotations.insert(keys::VERSION.to_string(), provenance.version.clone());
    annotations.insert(keys::PARENT.to_string(), provenance.parent.clone());
    annotations.insert(keys::REGISTRY.to_string(), provenance.registry.clone());
    annotations.insert(
        keys::DESCRIPTION.to_string(),
        package.description.clone().unwrap_or_default(),
    );
    annotations.insert(
        keys::HOMEPAGE.to_string(),
        package.homepage.clone().unwrap_or_default(),
    );
    annotations.insert(keys::SUPPORT.to_string(), package.support_contact());
    annotations.insert(keys::AUTHOR.to_string(), package.author_name());

    if let Some(url) = package.repository_url() {
        annotations.insert(keys::REPOSITORY.to_string(), url.to_string());
    }
    if !package.keywords.is_empty() {
        annotations.insert(
            keys::KEYWORDS.to_string(),
            serde_json::to_string(&package.keywords).unwrap_or_default(),
        );
    }

    annotations
}

/// Whether an annotation key is written by the installer
pub fn is_provenance_annotation(key: &str) -> bool {
    key.starts_with("argopm.atlan.com/")
}

/// Selector matching every object managed by argopack
pub fn installer_selector() -> String {
    format!("{}={}", keys::INSTALLER, INSTALLER_VALUE)
}

/// Selector matching every object of the named package
pub fn package_selector(name: &str) -> String {
    format!("{}={}", keys::NAME, special_encode(name))
}
