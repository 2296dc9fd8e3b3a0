//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use treewalk_checks::default_modules;
use treewalk_core::{CheckerSection, Config, ModuleEntry, Severity};

const CONFIG_FILE_NAME: &str = "treewalk.toml";

const HEADER: &str = "\
# treewalk configuration
#
# Each [[module]] table names a check; the other keys are its properties.
# Common properties: severity, id, tokens, message.<key>.
# Run `treewalk list-checks` for the available modules.

";

/// Starter configuration: every default check spelled out, so that the
/// file is easy to tune.
fn starter_config() -> Config {
    let mut modules: Vec<ModuleEntry> = default_modules();
    if let Some(length) = modules.iter_mut().find(|m| m.name == "MethodLength") {
        length.options.insert("max".to_string(), toml::Value::Integer(150));
    }
    Config {
        checker: CheckerSection {
            threads: Some(1),
            severity: Some(Severity::Error),
            file_extensions: vec!["java".to_string()],
            exclude: vec!["**/build/**".to_string(), "**/target/**".to_string()],
            ..CheckerSection::default()
        },
        modules,
        ..Config::default()
    }
}

/// Renders the starter configuration file.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn render() -> Result<String> {
    let body = toml::to_string_pretty(&starter_config()).context("Failed to render configuration")?;
    Ok(format!("{HEADER}{body}"))
}

/// Runs the init command in `dir` and returns the written path.
pub fn run(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, render()?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE_NAME} to configure checks");
    println!("  2. Run: treewalk check");

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn starter_config_parses_back() {
        let config = Config::parse(&render().unwrap()).unwrap();
        assert_eq!(config.checker.file_extensions, vec!["java".to_string()]);
        assert_eq!(config.modules.len(), default_modules().len());
        assert!(config.preset.is_none());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = run(tmp.path(), false).unwrap();
        std::fs::write(&path, "# edited").unwrap();

        assert!(run(tmp.path(), false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");

        run(tmp.path(), true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[[module]]"));
    }
}
