//! Initialize a pushrules machine
//!
//! Writes a starter machine.toml that builds on one of the preset machines.

use crate::machine::Preset;
use std::fs;
use std::path::Path;

/// Starter machine.toml; `{preset}` is replaced with the chosen preset
const DEFAULT_MACHINE_TOML: &str = r#"[machine]
version = "1"
preset = "{preset}"

# Builder used when a build is needed and no build rule matches
# default-builder = "gradle"

# Goal sets made of catalog goals
# [goal-sets.docs]
# description = "Docs only"
# goals = ["autofix", "review"]

# Goal rules are consulted top to bottom, before the preset's rules.
# The first rule whose push tests all hold decides the goals.
# [[goal-rules]]
# label = "Docs only change"
# when = ["has-file:mkdocs.yml", "!is-node"]
# goals = "docs"

# [builders.gradle]
# commands = ["./gradlew build"]

# [[build-rules]]
# label = "Gradle build"
# when = ["has-file:build.gradle"]
# builder = "gradle"

# [[deploy-rules]]
# goal = "staging-deploy"
# label = "Gradle to staging"
# when = ["has-file:build.gradle"]
# deployer = "gradle-staging"

# [[disposal-rules]]
# label = "Keep docs"
# when = ["has-file:mkdocs.yml"]
# goals = "no-goals"

[project]
# Patterns left out when a checkout is snapshotted
exclude = ["**/node_modules/**", "**/target/**"]

[output]
format = "human"
"#;

/// Error type for init command
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path error
    #[error("Path error: {0}")]
    Path(String),
}

/// Result of init command
#[derive(Debug, PartialEq, Eq)]
pub struct InitResult {
    /// Files that were created
    pub created: Vec<String>,
    /// Files that were skipped (already existed)
    pub skipped: Vec<String>,
    /// Files that were overwritten
    pub overwritten: Vec<String>,
}

impl InitResult {
    fn new() -> Self {
        Self {
            created: Vec::new(),
            skipped: Vec::new(),
            overwritten: Vec::new(),
        }
    }
}

/// Starter configuration text for `preset`
pub fn starter_config(preset: Preset) -> String {
    DEFAULT_MACHINE_TOML.replace("{preset}", preset.as_str())
}

/// Run the init command
///
/// Writes a starter configuration to `path`, creating missing parent
/// directories. An existing file is only replaced when `force` is set.
///
/// # Errors
///
/// Returns `InitError::Path` if `path` is not valid UTF-8 or names a
/// directory, and `InitError::Io` if writing fails.
pub fn run_init(path: &Path, preset: Preset, force: bool) -> Result<InitResult, InitError> {
    let mut result = InitResult::new();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    handle_file(path, &starter_config(preset), force, &mut result)?;

    Ok(result)
}

/// Handle creation of a single file
fn handle_file(
    path: &Path,
    content: &str,
    force: bool,
    result: &mut InitResult,
) -> Result<(), InitError> {
    let path_str = path_to_string(path)?;

    if path.is_dir() {
        return Err(InitError::Path(format!(
            "Path '{}' exists but is a directory",
            path_str
        )));
    }

    if path.exists() {
        if force {
            fs::write(path, content)?;
            result.overwritten.push(path_str);
        } else {
            result.skipped.push(path_str);
        }
    } else {
        fs::write(path, content)?;
        result.created.push(path_str);
    }

    Ok(())
}

/// Convert a path to a string representation
fn path_to_string(path: &Path) -> Result<String, InitError> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| InitError::Path(format!("Invalid UTF-8 in path: {:?}", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("machine.toml");

        let result = run_init(&path, Preset::CloudFoundry, false).expect("init should succeed");

        assert_eq!(result.created, vec![path.to_str().unwrap().to_string()]);
        assert!(result.skipped.is_empty());
        assert!(result.overwritten.is_empty());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("preset = \"cloud-foundry\""));
    }

    #[test]
    fn test_starter_config_loads_for_every_preset() {
        for preset in Preset::ALL {
            let config = MachineConfig::parse(&starter_config(preset))
                .unwrap_or_else(|e| panic!("{} starter config invalid: {}", preset, e));
            assert_eq!(config.machine.preset, Some(preset));
            assert!(config.build_machine().is_ok());
        }
    }

    #[test]
    fn test_init_skips_existing_file_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("machine.toml");
        fs::write(&path, "existing content").unwrap();

        let result = run_init(&path, Preset::K8s, false).expect("init should succeed");

        assert_eq!(result.skipped.len(), 1);
        assert!(result.created.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing content");
    }

    #[test]
    fn test_init_overwrites_with_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("machine.toml");
        fs::write(&path, "existing content").unwrap();

        let result = run_init(&path, Preset::K8s, true).expect("init should succeed");

        assert_eq!(result.overwritten.len(), 1);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("preset = \"k8s\""));
    }

    #[test]
    fn test_init_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ci/delivery/machine.toml");

        run_init(&path, Preset::StaticAnalysis, false).expect("init should succeed");

        assert!(path.is_file());
    }

    #[test]
    fn test_init_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_init(temp_dir.path(), Preset::K8s, true).unwrap_err();
        assert!(matches!(err, InitError::Path(_)));
    }
}
