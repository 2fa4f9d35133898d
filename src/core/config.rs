use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::PigenError;
use crate::models::{Config, TargetMode, Taxonomy, API_KEYS_ENV};

/// CLI values that take precedence over pigen.toml
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub mode: Option<TargetMode>,
    pub retries: Option<u32>,
    pub output: Option<PathBuf>,
}

/// Load configuration from the project directory, then apply CLI overrides and
/// any keys from `PIGEN_API_KEYS`
pub fn load_config(project_root: &Path, overrides: ConfigOverrides) -> Result<Config, PigenError> {
    let env_keys = std::env::var(API_KEYS_ENV).ok();
    load_config_with_env(project_root, overrides, env_keys.as_deref())
}

/// Same as [`load_config`] with the environment value passed in
pub fn load_config_with_env(
    project_root: &Path,
    overrides: ConfigOverrides,
    env_keys: Option<&str>,
) -> Result<Config, PigenError> {
    let config = Config::load_from_dir(project_root)?
        .with_overrides(
            overrides.model,
            overrides.mode,
            overrides.retries,
            overrides.output,
        )
        .with_extra_keys(env_keys);

    info!(
        "Configuration loaded: model={}, mode={:?}, keys={}, retries={}",
        config.gateway.model,
        config.target.mode,
        config.gateway.api_keys.len(),
        config.generation.max_retries
    );

    Ok(config)
}

/// Taxonomy for the configured mode, from `[target].taxonomy_file` if set
pub fn load_taxonomy(project_root: &Path, config: &Config) -> Result<Taxonomy, PigenError> {
    let taxonomy = Taxonomy::resolve(
        project_root,
        config.target.taxonomy_file.as_deref(),
        config.target.mode,
    )?;
    info!(
        "Taxonomy: {} categories, {} pairs",
        taxonomy.categories.len(),
        taxonomy.pair_count()
    );
    Ok(taxonomy)
}

/// Output directory, relative paths resolved against the project root
pub fn output_dir(project_root: &Path, config: &Config) -> PathBuf {
    if config.output.dir.is_absolute() {
        config.output.dir.clone()
    } else {
        project_root.join(&config.output.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_with_env(temp_dir.path(), ConfigOverrides::default(), None).unwrap();
        assert_eq!(config.gateway.model, "gemini-2.0-flash");
        assert!(config.gateway.api_keys.is_empty());
        assert_eq!(config.target.mode, TargetMode::Standard);
    }

    #[test]
    fn test_load_config_with_file_and_env() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("pigen.toml"),
            r#"
[gateway]
model = "gemini-1.5-flash"
api_keys = ["file-key"]

[target]
mode = "pico"
"#,
        )
        .unwrap();

        let config = load_config_with_env(
            temp_dir.path(),
            ConfigOverrides::default(),
            Some("env-a,env-b"),
        )
        .unwrap();

        assert_eq!(config.gateway.model, "gemini-1.5-flash");
        assert_eq!(config.gateway.api_keys, vec!["file-key", "env-a", "env-b"]);
        assert_eq!(config.target.mode, TargetMode::Pico);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            model: Some("gemini-1.5-pro".to_string()),
            mode: Some(TargetMode::Pico),
            retries: Some(6),
            output: Some(PathBuf::from("/tmp/dataset")),
        };
        let config = load_config_with_env(temp_dir.path(), overrides, None).unwrap();

        assert_eq!(config.gateway.model, "gemini-1.5-pro");
        assert_eq!(config.generation.max_retries, 6);
        assert_eq!(output_dir(temp_dir.path(), &config), PathBuf::from("/tmp/dataset"));
    }

    #[test]
    fn test_bad_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pigen.toml"), "[gateway\nmodel=").unwrap();
        assert!(matches!(
            load_config_with_env(temp_dir.path(), ConfigOverrides::default(), None),
            Err(PigenError::Config(_))
        ));
    }

    #[test]
    fn test_load_taxonomy_builtin_and_relative_output() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::default();
        let taxonomy = load_taxonomy(temp_dir.path(), &config).unwrap();
        assert_eq!(taxonomy, Taxonomy::builtin(TargetMode::Standard));
        assert_eq!(output_dir(temp_dir.path(), &config), temp_dir.path().join("output"));
    }
}
