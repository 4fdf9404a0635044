//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Package not found: {path}")]
    PackageNotFound { path: String },

    #[error("Invalid package.json: {message}")]
    InvalidPackage { message: String },

    #[error("Not an argopack package: missing installer label '{label}'")]
    NotAPackage { label: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Required parameter missing '{name}'")]
    RequiredParameterMissing { name: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
