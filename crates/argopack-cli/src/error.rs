//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use argopack_core::CoreError;
use argopack_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Missing parameters or invalid settings
    #[error("Validation failed: {message}")]
    #[diagnostic(code(argopack::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Package loading, manifest or lookup error
    #[error("Package error: {message}")]
    #[diagnostic(code(argopack::cli::package))]
    Package {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(argopack::cli::io))]
    Io { message: String },

    /// Kubernetes API failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(argopack::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid command-line usage
    #[error("Usage error: {message}")]
    #[diagnostic(code(argopack::cli::usage))]
    Usage { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(argopack::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Package { .. } => exit_codes::PACKAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a package error
    pub fn package(message: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: None,
        }
    }

    /// Create a package error with help text
    pub fn package_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a cluster error
    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::PackageNotFound { .. } => CliError::package_with_help(
                message,
                "pass the directory containing package.json",
            ),
            CoreError::InvalidPackage { .. }
            | CoreError::NotAPackage { .. }
            | CoreError::JsonParse(_)
            | CoreError::InvalidVersion(_) => CliError::package(message),
            CoreError::Io(_) => CliError::Io { message },
            CoreError::InvalidArguments { .. } => CliError::usage(message),
            CoreError::RequiredParameterMissing { .. }
            | CoreError::YamlParse(_)
            | CoreError::InvalidConfig { .. } => CliError::validation(message),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::RequiredParameterMissing { name } => CliError::Validation {
                message,
                help: Some(format!("pass it after `--` as `--{} <value>`", name)),
            },
            KubeError::PackageNotFound { .. } => CliError::package_with_help(
                message,
                "run `argopack list` to see installed packages",
            ),
            KubeError::NotAPackage { .. }
            | KubeError::NotRunnable { .. }
            | KubeError::TemplateNotFound { .. }
            | KubeError::ManifestParse { .. }
            | KubeError::InvalidManifest(_) => CliError::package(message),
            KubeError::Io(_) => CliError::Io { message },
            KubeError::Api(_) | KubeError::Operation { .. } | KubeError::ReconcileFailed { .. } => {
                CliError::cluster(message)
            }
            _ => CliError::Other { message },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
