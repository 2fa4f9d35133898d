use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use super::{TargetMode, Taxonomy};

/// One unit of generation work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub category: String,
    pub subcategory: String,
    /// Zero-padded sequence number, e.g. "0007"
    pub id: String,
}

impl WorkItem {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>, seq: usize) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            id: format!("{:04}", seq),
        }
    }
}

/// Variation axes drawn once per work item and held fixed across its retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub complexity: String,
    pub style: String,
    pub platform: String,
    pub integration: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
    /// Task text from the first synthesis stage
    #[serde(default)]
    pub base_prompt: String,
    /// Enriched instruction from the second synthesis stage
    #[serde(default)]
    pub enriched_prompt: String,
}

impl GenerationContext {
    /// Draw each axis uniformly and independently
    pub fn sample<R: Rng + ?Sized>(taxonomy: &Taxonomy, rng: &mut R) -> Self {
        fn pick<R: Rng + ?Sized>(values: &[String], rng: &mut R) -> String {
            values.choose(rng).cloned().unwrap_or_default()
        }

        Self {
            complexity: pick(&taxonomy.complexity_levels, rng),
            style: pick(&taxonomy.code_styles, rng),
            platform: pick(&taxonomy.platforms, rng),
            integration: pick(&taxonomy.integration_patterns, rng),
            context: pick(&taxonomy.use_contexts, rng),
            timestamp: Utc::now(),
            base_prompt: String::new(),
            enriched_prompt: String::new(),
        }
    }

    pub fn with_prompts(mut self, base_prompt: String, enriched_prompt: String) -> Self {
        self.base_prompt = base_prompt;
        self.enriched_prompt = enriched_prompt;
        self
    }
}

/// Record the model is instructed to emit.
///
/// Every field is optional: models drop keys, emit nulls, or send tags as a
/// list instead of a comma-joined string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,
    #[serde(default, rename = "file-name")]
    pub file_name: Option<String>,
    #[serde(default, rename = "build-command")]
    pub build_command: Option<String>,
    #[serde(default)]
    pub cmakelists: Option<String>,
}

impl StructuredRecord {
    /// Build instructions for the configured target
    pub fn build_instructions(&self, mode: TargetMode) -> Option<&str> {
        match mode {
            TargetMode::Standard => self.build_command.as_deref(),
            TargetMode::Pico => self.cmakelists.as_deref(),
        }
    }
}

/// Accepts `"a, b"`, `["a", "b"]` or null
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        Joined(String),
        List(Vec<serde_json::Value>),
        Other(serde::de::IgnoredAny),
    }

    let tags = match Tags::deserialize(deserializer)? {
        Tags::Joined(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        Tags::List(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|t| !t.is_empty())
            .collect(),
        Tags::Other(_) => Vec::new(),
    };
    Ok(tags)
}

/// Outcome of the code validator. `reason` is empty iff accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl ValidationVerdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Dataset row written to pipeline_examples.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedExample {
    pub id: String,
    pub task: String,
    pub category: String,
    pub input: String,
    pub prompt: String,
    pub output: String,
    pub explanation: String,
    pub complexity: String,
    pub tags: String,
    #[serde(rename = "file-name")]
    pub file_name: String,
    #[serde(rename = "build-command", default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmakelists: Option<String>,
    pub timestamp: String,
}

/// Raw response kept for debugging when a record could not be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub id: String,
    pub raw_response: String,
}
