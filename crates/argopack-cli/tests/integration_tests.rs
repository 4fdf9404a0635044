//! Integration tests for CLI commands
//!
//! These only cover paths that fail or finish before a cluster connection.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Helper to run argopack with an isolated config directory
fn argopack(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_argopack"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("ARGOPACK_NAMESPACE")
        .env_remove("ARGOPACK_REGISTRY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute argopack")
}

mod general {
    use super::*;

    #[test]
    fn test_help() {
        let home = TempDir::new().unwrap();
        let output = argopack(home.path(), &["--help"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["install", "list", "info", "uninstall", "run"] {
            assert!(stdout.contains(command), "help should mention {}", command);
        }
    }

    #[test]
    fn test_version() {
        let home = TempDir::new().unwrap();
        let output = argopack(home.path(), &["--version"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_unknown_command() {
        let home = TempDir::new().unwrap();
        let output = argopack(home.path(), &["publish"]);

        assert!(!output.status.success());
    }
}

mod install_command {
    use super::*;

    #[test]
    fn test_install_missing_directory() {
        let home = TempDir::new().unwrap();
        let missing = home.path().join("does-not-exist");
        let output = argopack(home.path(), &["install", missing.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("not found"));
    }

    #[test]
    fn test_install_directory_without_manifest() {
        let home = TempDir::new().unwrap();
        let package = TempDir::new().unwrap();
        let output = argopack(home.path(), &["install", package.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("package.json"));
    }

    #[test]
    fn test_install_invalid_manifest() {
        let home = TempDir::new().unwrap();
        let package = TempDir::new().unwrap();
        std::fs::write(package.path().join("package.json"), "{ not json").unwrap();

        let output = argopack(home.path(), &["install", package.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_install_invalid_version() {
        let home = TempDir::new().unwrap();
        let package = TempDir::new().unwrap();
        std::fs::write(
            package.path().join("package.json"),
            r#"{"name": "demo", "version": "one"}"#,
        )
        .unwrap();

        let output = argopack(home.path(), &["install", package.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
    }
}

mod run_command {
    use super::*;

    #[test]
    fn test_run_dangling_argument() {
        let home = TempDir::new().unwrap();
        let output = argopack(home.path(), &["run", "demo", "--", "--env"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("dangling"));
    }
}
