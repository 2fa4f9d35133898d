use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::TargetMode;

/// Environment variable holding extra comma-separated API keys
pub const API_KEYS_ENV: &str = "PIGEN_API_KEYS";

/// Configuration loaded from pigen.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the generateContent API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name to use
    #[serde(default = "default_model")]
    pub model: String,
    /// Credentials, rotated round-robin
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Per-credential cap on requests in any trailing minute
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: usize,
    /// Timeout in seconds for a single request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_keys: Vec::new(),
            max_requests_per_minute: default_max_requests_per_minute(),
            timeout_seconds: default_timeout(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_requests_per_minute() -> usize {
    15
}

fn default_timeout() -> u64 {
    120
}

fn default_top_p() -> f32 {
    0.8
}

fn default_top_k() -> u32 {
    40
}

/// Retry loop and sampling temperatures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Attempt budget per work item
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay after an empty response, and the floor of the retry backoff
    #[serde(default = "default_base_delay")]
    pub base_delay_seconds: f64,
    /// Upper bound of the uniform jitter added to the retry backoff
    #[serde(default = "default_jitter")]
    pub jitter_seconds: f64,
    #[serde(default = "default_base_prompt_temperature")]
    pub base_prompt_temperature: f32,
    #[serde(default = "default_enrichment_temperature")]
    pub enrichment_temperature: f32,
    #[serde(default = "default_code_temperature")]
    pub code_temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_seconds: default_base_delay(),
            jitter_seconds: default_jitter(),
            base_prompt_temperature: default_base_prompt_temperature(),
            enrichment_temperature: default_enrichment_temperature(),
            code_temperature: default_code_temperature(),
        }
    }
}

impl GenerationConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.base_delay_seconds.max(0.0))
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> f64 {
    5.0
}

fn default_jitter() -> f64 {
    2.0
}

fn default_base_prompt_temperature() -> f32 {
    0.8
}

fn default_enrichment_temperature() -> f32 {
    0.7
}

fn default_code_temperature() -> f32 {
    0.75
}

/// Target board selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub mode: TargetMode,
    /// Optional taxonomy file, relative to the project directory
    #[serde(default)]
    pub taxonomy_file: Option<PathBuf>,
}

/// Validator thresholds and optional rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_code_length")]
    pub min_code_length: usize,
    #[serde(default = "default_min_comment_lines")]
    pub min_comment_lines: usize,
    /// Require the subcategory (or its keywords) to appear in the code
    #[serde(default)]
    pub check_subcategory: bool,
    /// Log a warning when no error handling idiom is found
    #[serde(default = "default_true")]
    pub warn_missing_error_handling: bool,
    /// Run `<compiler> -fsyntax-only` on accepted candidates
    #[serde(default)]
    pub compile_check: bool,
    #[serde(default = "default_compiler")]
    pub compiler: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_code_length: default_min_code_length(),
            min_comment_lines: default_min_comment_lines(),
            check_subcategory: false,
            warn_missing_error_handling: true,
            compile_check: false,
            compiler: default_compiler(),
        }
    }
}

fn default_min_code_length() -> usize {
    150
}

fn default_min_comment_lines() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_compiler() -> String {
    "gcc".to_string()
}

/// Where accepted examples are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also write each accepted example as a standalone .c file
    #[serde(default)]
    pub write_source_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_source_files: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Config {
    /// Load config from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Try to load config from pigen.toml in the given directory
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join("pigen.toml");
        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI overrides into the config
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        mode: Option<TargetMode>,
        retries: Option<u32>,
        output: Option<PathBuf>,
    ) -> Self {
        if let Some(m) = model {
            self.gateway.model = m;
        }
        if let Some(m) = mode {
            self.target.mode = m;
        }
        if let Some(r) = retries {
            self.generation.max_retries = r;
        }
        if let Some(o) = output {
            self.output.dir = o;
        }
        self
    }

    /// Append comma-separated keys (typically from `PIGEN_API_KEYS`)
    pub fn with_extra_keys(mut self, keys: Option<&str>) -> Self {
        if let Some(raw) = keys {
            for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                if !self.gateway.api_keys.iter().any(|k| k == key) {
                    self.gateway.api_keys.push(key.to_string());
                }
            }
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.model, "gemini-2.0-flash");
        assert_eq!(config.gateway.max_requests_per_minute, 15);
        assert!(config.gateway.api_keys.is_empty());
        assert_eq!(config.generation.max_retries, 3);
        assert_eq!(config.generation.base_delay(), Duration::from_secs(5));
        assert_eq!(config.target.mode, TargetMode::Standard);
        assert_eq!(config.validation.min_code_length, 150);
        assert!(!config.validation.check_subcategory);
        assert!(!config.validation.compile_check);
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_config_with_overrides() {
        let config = Config::default().with_overrides(
            Some("gemini-1.5-pro".to_string()),
            Some(TargetMode::Pico),
            Some(5),
            Some(PathBuf::from("dataset")),
        );
        assert_eq!(config.gateway.model, "gemini-1.5-pro");
        assert_eq!(config.target.mode, TargetMode::Pico);
        assert_eq!(config.generation.max_retries, 5);
        assert_eq!(config.output.dir, PathBuf::from("dataset"));
    }

    #[test]
    fn test_with_extra_keys_dedupes() {
        let mut config = Config::default();
        config.gateway.api_keys = vec!["a".to_string()];
        let config = config.with_extra_keys(Some(" a, b ,,c"));
        assert_eq!(config.gateway.api_keys, vec!["a", "b", "c"]);

        let config = config.with_extra_keys(None);
        assert_eq!(config.gateway.api_keys.len(), 3);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[gateway]
model = "gemini-1.5-flash"
api_keys = ["k1", "k2"]
max_requests_per_minute = 10

[generation]
max_retries = 4
jitter_seconds = 0.5

[target]
mode = "pico"

[validation]
check_subcategory = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.model, "gemini-1.5-flash");
        assert_eq!(config.gateway.api_keys.len(), 2);
        assert_eq!(config.gateway.max_requests_per_minute, 10);
        assert_eq!(config.gateway.timeout_seconds, 120); // default
        assert_eq!(config.generation.max_retries, 4);
        assert!((config.generation.jitter_seconds - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.target.mode, TargetMode::Pico);
        assert!(config.validation.check_subcategory);
        assert_eq!(config.validation.min_comment_lines, 3); // default
    }
}
