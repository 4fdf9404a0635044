//! Package descriptor loading
//!
//! A package is a directory with a `package.json` at its root and one
//! sub-directory per resource category (`configmaps/`, `secrets/`,
//! `templates/`, `cronworkflows/`, `pipelines/`).

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Name of the package manifest file
pub const PACKAGE_FILE: &str = "package.json";

/// Directory holding already-fetched dependencies
pub const DEPENDENCIES_DIR: &str = "node_modules";

/// Package manifest (`package.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Package name (required)
    pub name: String,

    /// Package version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default)]
    pub author: Option<Person>,

    #[serde(default)]
    pub bugs: Option<Bugs>,

    #[serde(default)]
    pub repository: Option<Repository>,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Extra labels and annotations stamped on every resource
    #[serde(default)]
    pub config: PackageConfig,

    /// Dependencies (name -> version range)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// `config` block of the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Author field: either `"Name <mail>"` or an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Person {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

/// Bug tracker field: either a URL or an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bugs {
    Url(String),
    Detailed {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

/// Repository field: either a shorthand string or an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Detailed {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        url: String,
    },
}

impl PackageDescriptor {
    /// Parse a manifest from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(content)?;
        if descriptor.name.trim().is_empty() {
            return Err(CoreError::InvalidPackage {
                message: "name must not be empty".to_string(),
            });
        }
        Ok(descriptor)
    }

    /// `<name>@<version>`, the identity used for parent references
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Support contact for annotations: the bug tracker email, if any
    pub fn support_contact(&self) -> String {
        match &self.bugs {
            Some(Bugs::Detailed {
                email: Some(email), ..
            }) => email.clone(),
            _ => String::new(),
        }
    }

    /// Author for annotations: the name when known, else the raw field as JSON
    pub fn author_name(&self) -> String {
        match &self.author {
            Some(Person::Detailed {
                name: Some(name), ..
            }) => name.clone(),
            Some(author) => serde_json::to_string(author).unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Repository URL, if any
    pub fn repository_url(&self) -> Option<&str> {
        match &self.repository {
            Some(Repository::Url(url)) => Some(url),
            Some(Repository::Detailed { url, .. }) => Some(url),
            None => None,
        }
    }
}

/// A package directory with its parsed manifest
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub descriptor: PackageDescriptor,
    pub root: PathBuf,
}

impl LoadedPackage {
    /// Load a package from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CoreError::PackageNotFound {
                path: root.display().to_string(),
            });
        }

        let manifest = root.join(PACKAGE_FILE);
        if !manifest.is_file() {
            return Err(CoreError::InvalidPackage {
                message: format!("{} not found in {}", PACKAGE_FILE, root.display()),
            });
        }

        let content = std::fs::read_to_string(&manifest)?;
        let descriptor = PackageDescriptor::from_json(&content)?;

        Ok(Self { descriptor, root })
    }

    /// Directory of a resource category inside this package
    pub fn category_dir(&self, dir_name: &str) -> PathBuf {
        self.root.join(dir_name)
    }

    /// Package directories of already-fetched dependencies
    ///
    /// Scoped packages live one level deeper (`node_modules/@scope/pkg`).
    pub fn dependency_dirs(&self) -> Result<Vec<PathBuf>> {
        let modules = self.root.join(DEPENDENCIES_DIR);
        if !modules.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&modules)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }

            let is_scope = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('@'))
                .unwrap_or(false);

            if is_scope {
                for inner in std::fs::read_dir(&path)? {
                    let inner = inner?.path();
                    if inner.join(PACKAGE_FILE).is_file() {
                        dirs.push(inner);
                    }
                }
            } else if path.join(PACKAGE_FILE).is_file() {
                dirs.push(path);
            }
        }

        dirs.sort();
        Ok(dirs)
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_minimal() {
        let pkg = PackageDescriptor::from_json(r#"{"name": "demo", "version": "1.0.0"}"#).unwrap();
        assert_eq!(pkg.name, "demo");
        assert_eq!(pkg.version, Version::new(1, 0, 0));
        assert!(pkg.config.labels.is_empty());
        assert_eq!(pkg.qualified_name(), "demo@1.0.0");
    }

    #[test]
    fn test_descriptor_rejects_bad_version() {
        let err = PackageDescriptor::from_json(r#"{"name": "demo", "version": "latest"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_descriptor_rejects_empty_name() {
        let err = PackageDescriptor::from_json(r#"{"name": " ", "version": "1.0.0"}"#);
        assert!(matches!(err, Err(CoreError::InvalidPackage { .. })));
    }

    #[test]
    fn test_descriptor_full() {
        let pkg = PackageDescriptor::from_json(
            r#"{
                "name": "@atlan/demo",
                "version": "2.1.0",
                "description": "Demo package",
                "homepage": "https://example.com",
                "author": {"name": "Jane", "email": "jane@example.com"},
                "bugs": {"url": "https://example.com/issues", "email": "support@example.com"},
                "repository": {"type": "git", "url": "https://github.com/example/demo"},
                "keywords": ["argo", "demo"],
                "config": {"labels": {"team": "data"}, "annotations": {"owner": "jane"}},
                "dependencies": {"@atlan/base": "^1.0.0"}
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.author_name(), "Jane");
        assert_eq!(pkg.support_contact(), "support@example.com");
        assert_eq!(pkg.repository_url(), Some("https://github.com/example/demo"));
        assert_eq!(pkg.config.labels["team"], "data");
        assert_eq!(pkg.dependencies["@atlan/base"], "^1.0.0");
    }

    #[test]
    fn test_descriptor_string_fields() {
        let pkg = PackageDescriptor::from_json(
            r#"{
                "name": "demo",
                "version": "1.0.0",
                "author": "Jane <jane@example.com>",
                "bugs": "https://example.com/issues",
                "repository": "github:example/demo"
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.author_name(), "\"Jane <jane@example.com>\"");
        assert_eq!(pkg.support_contact(), "");
        assert_eq!(pkg.repository_url(), Some("github:example/demo"));
    }

    #[test]
    fn test_load_missing_directory() {
        let err = LoadedPackage::load("/nonexistent/argopack/package");
        assert!(matches!(err, Err(CoreError::PackageNotFound { .. })));
    }

    #[test]
    fn test_load_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedPackage::load(dir.path());
        assert!(matches!(err, Err(CoreError::InvalidPackage { .. })));
    }

    #[test]
    fn test_dependency_dirs_include_scoped_packages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(PACKAGE_FILE), r#"{"name":"root","version":"1.0.0"}"#).unwrap();

        let plain = root.join(DEPENDENCIES_DIR).join("plain");
        let scoped = root.join(DEPENDENCIES_DIR).join("@scope").join("inner");
        let not_a_package = root.join(DEPENDENCIES_DIR).join(".bin");
        std::fs::create_dir_all(&plain).unwrap();
        std::fs::create_dir_all(&scoped).unwrap();
        std::fs::create_dir_all(&not_a_package).unwrap();
        std::fs::write(plain.join(PACKAGE_FILE), r#"{"name":"plain","version":"1.0.0"}"#).unwrap();
        std::fs::write(
            scoped.join(PACKAGE_FILE),
            r#"{"name":"@scope/inner","version":"1.0.0"}"#,
        )
        .unwrap();

        let pkg = LoadedPackage::load(root).unwrap();
        let deps = pkg.dependency_dirs().unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&plain));
        assert!(deps.contains(&scoped));
    }
}
