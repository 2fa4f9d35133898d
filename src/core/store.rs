use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{
    ErrorLogEntry, GenerationContext, SavedExample, StructuredRecord, TargetMode, WorkItem,
};

pub const EXAMPLES_FILE: &str = "pipeline_examples.json";
pub const ERRORS_FILE: &str = "pipeline_errors.json";
pub const SOURCES_DIR: &str = "raspberry_pi_code_examples";

const DEFAULT_CATEGORY: &str = "ADC/DAC (Raspberry Pi, C Language)";
const DEFAULT_EXPLANATION: &str = "Generated using Gemini API based on the given prompt.";

/// Where accepted records and unparseable responses go
pub trait ExampleSink: Send {
    fn append(
        &mut self,
        item: &WorkItem,
        record: &StructuredRecord,
        ctx: &GenerationContext,
    ) -> Result<SavedExample, StoreError>;

    fn append_error(&mut self, id: &str, raw_response: &str) -> Result<(), StoreError>;
}

/// JSON snapshot store: every append rewrites the full file
pub struct ExampleStore {
    dir: PathBuf,
    mode: TargetMode,
    write_source_files: bool,
    examples: Vec<SavedExample>,
    errors: Vec<ErrorLogEntry>,
}

/// Python-style title case: upper after any non-letter, lower elsewhere
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}

pub fn task_title(category: &str, subcategory: &str, context: &str) -> String {
    format!(
        "Create a {} {} Application for {}",
        title_case(subcategory),
        title_case(category),
        title_case(context)
    )
}

fn dashed(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// Tags derived from the work item and its context
pub fn generated_tags(item: &WorkItem, ctx: &GenerationContext) -> Vec<String> {
    let mut tags = vec![item.category.clone(), item.subcategory.clone()];
    if let Some(last) = ctx.context.split_whitespace().last() {
        tags.push(last.to_string());
    }
    if !ctx.platform.is_empty() {
        tags.push(dashed(&ctx.platform));
    }
    if ctx.integration != "standalone" {
        tags.push(dashed(&ctx.integration));
    }
    tags
}

/// Sorted, deduplicated union joined with ", "
pub fn merge_tags(generated: &[String], from_response: &[String]) -> String {
    let mut all: Vec<&str> = generated
        .iter()
        .chain(from_response)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    all.sort_unstable();
    all.dedup();
    all.join(", ")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build the saved row, filling absent fields with defaults
pub fn build_example(
    item: &WorkItem,
    record: &StructuredRecord,
    ctx: &GenerationContext,
    mode: TargetMode,
) -> SavedExample {
    let id = &item.id;
    let default_build = format!("gcc example_{}.c -o example_{}", id, id);
    let build = record
        .build_instructions(mode)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(String::from)
        .unwrap_or(default_build);

    let (build_command, cmakelists) = match mode {
        TargetMode::Standard => (Some(build), None),
        TargetMode::Pico => (None, Some(build)),
    };

    SavedExample {
        id: id.clone(),
        task: task_title(&item.category, &item.subcategory, &ctx.context),
        category: non_empty(&record.category).unwrap_or(DEFAULT_CATEGORY).to_string(),
        input: ctx.base_prompt.clone(),
        prompt: ctx.enriched_prompt.clone(),
        output: record.output.clone().unwrap_or_default(),
        explanation: non_empty(&record.explanation)
            .unwrap_or(DEFAULT_EXPLANATION)
            .to_string(),
        complexity: ctx.complexity.clone(),
        tags: merge_tags(&generated_tags(item, ctx), &record.tags),
        file_name: non_empty(&record.file_name)
            .map(String::from)
            .unwrap_or_else(|| format!("example_{}.c", id)),
        build_command,
        cmakelists,
        timestamp: ctx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Write `contents` to a sibling temp file, then rename over `path`
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let temp_file = path.with_extension("json.tmp");
    fs::write(&temp_file, contents).map_err(|e| StoreError::WriteError(temp_file.clone(), e))?;
    fs::rename(&temp_file, path).map_err(|e| StoreError::WriteError(path.to_path_buf(), e))
}

fn load_snapshot<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        fs::read_to_string(path).map_err(|e| StoreError::ReadError(path.to_path_buf(), e))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| StoreError::ParseError(path.to_path_buf(), e.to_string()))
}

fn file_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

impl ExampleStore {
    /// Open (or create) the output directory and load existing snapshots
    pub fn open(dir: &Path, mode: TargetMode, write_source_files: bool) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::WriteError(dir.to_path_buf(), e))?;

        let examples: Vec<SavedExample> = load_snapshot(&dir.join(EXAMPLES_FILE))?;
        let errors: Vec<ErrorLogEntry> = load_snapshot(&dir.join(ERRORS_FILE))?;
        if !examples.is_empty() {
            info!("Loaded {} existing examples from {}", examples.len(), dir.display());
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            mode,
            write_source_files,
            examples,
            errors,
        })
    }

    pub fn examples(&self) -> &[SavedExample] {
        &self.examples
    }

    pub fn errors(&self) -> &[ErrorLogEntry] {
        &self.errors
    }

    pub fn examples_path(&self) -> PathBuf {
        self.dir.join(EXAMPLES_FILE)
    }

    pub fn errors_path(&self) -> PathBuf {
        self.dir.join(ERRORS_FILE)
    }

    /// Rewrite both snapshots (the error file only once it has entries)
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.examples)
            .map_err(|e| StoreError::SerializeError(e.to_string()))?;
        write_atomic(&self.examples_path(), &json)?;

        if !self.errors.is_empty() {
            let json = serde_json::to_string_pretty(&self.errors)
                .map_err(|e| StoreError::SerializeError(e.to_string()))?;
            write_atomic(&self.errors_path(), &json)?;
        }

        debug!("Saved {} examples, {} error logs", self.examples.len(), self.errors.len());
        Ok(())
    }

    /// Standalone `.c` file with a comment header describing the example
    fn write_source_file(
        &self,
        item: &WorkItem,
        example: &SavedExample,
        ctx: &GenerationContext,
    ) -> Result<PathBuf, StoreError> {
        let sources = self.dir.join(SOURCES_DIR);
        fs::create_dir_all(&sources).map_err(|e| StoreError::WriteError(sources.clone(), e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let file_name = format!(
            "{}_{}_{}_{}.c",
            file_safe(&item.category),
            file_safe(&item.subcategory),
            item.id,
            stamp
        );
        let path = sources.join(file_name);

        let mut contents = format!(
            "// Example-id: {}\n// {}\n// Generated: {}\n// Complexity: {}, Style: {}\n// Tags: {}\n\n",
            example.id, example.task, example.timestamp, example.complexity, ctx.style, example.tags
        );
        match (&example.build_command, &example.cmakelists) {
            (Some(cmd), _) => contents.push_str(&format!("// Build-Command: {}\n", cmd)),
            (None, Some(cmake)) => {
                for line in cmake.lines() {
                    contents.push_str(&format!("// cmakelists: {}\n", line));
                }
            }
            (None, None) => {}
        }
        contents.push_str(&example.output);
        contents.push('\n');

        fs::write(&path, contents).map_err(|e| StoreError::WriteError(path.clone(), e))?;
        Ok(path)
    }
}

impl ExampleSink for ExampleStore {
    fn append(
        &mut self,
        item: &WorkItem,
        record: &StructuredRecord,
        ctx: &GenerationContext,
    ) -> Result<SavedExample, StoreError> {
        let example = build_example(item, record, ctx, self.mode);

        if self.write_source_files {
            let path = self.write_source_file(item, &example, ctx)?;
            debug!("Wrote source file {}", path.display());
        }

        self.examples.push(example.clone());
        if let Err(e) = self.save() {
            self.examples.pop();
            return Err(e);
        }
        info!("Saved example {} ({} total)", example.id, self.examples.len());
        Ok(example)
    }

    fn append_error(&mut self, id: &str, raw_response: &str) -> Result<(), StoreError> {
        self.errors.push(ErrorLogEntry {
            id: id.to_string(),
            raw_response: raw_response.to_string(),
        });
        if let Err(e) = self.save() {
            self.errors.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn item() -> WorkItem {
        WorkItem::new("sensor_reading", "temperature sensor", 1)
    }

    fn context() -> GenerationContext {
        GenerationContext {
            complexity: "intermediate".to_string(),
            style: "functional".to_string(),
            platform: "Raspberry Pi 4 Model B".to_string(),
            integration: "with multiple sensors".to_string(),
            context: "smart agriculture".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            base_prompt: "Read a DS18B20.".to_string(),
            enriched_prompt: "Read a DS18B20 via sysfs and log to CSV.".to_string(),
        }
    }

    fn record() -> StructuredRecord {
        StructuredRecord {
            output: Some("int main(void) { return 0; }".to_string()),
            tags: vec!["C".to_string(), "sensor_reading".to_string()],
            build_command: Some("gcc temp.c -o temp".to_string()),
            ..StructuredRecord::default()
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("sensor_reading"), "Sensor_Reading");
        assert_eq!(title_case("DHT11 sensor"), "Dht11 Sensor");
        assert_eq!(
            task_title("sensor_reading", "temperature sensor", "smart agriculture"),
            "Create a Temperature Sensor Sensor_Reading Application for Smart Agriculture"
        );
    }

    #[test]
    fn test_generated_tags() {
        let tags = generated_tags(&item(), &context());
        assert_eq!(
            tags,
            vec![
                "sensor_reading",
                "temperature sensor",
                "agriculture",
                "raspberry-pi-4-model-b",
                "with-multiple-sensors"
            ]
        );

        let mut ctx = context();
        ctx.integration = "standalone".to_string();
        assert_eq!(generated_tags(&item(), &ctx).len(), 4);
    }

    #[test]
    fn test_merge_tags_sorted_unique() {
        let merged = merge_tags(
            &["b".to_string(), "a".to_string()],
            &["a".to_string(), " C ".to_string()],
        );
        assert_eq!(merged, "C, a, b");
    }

    #[test]
    fn test_build_example_defaults() {
        let bare = StructuredRecord {
            output: Some("code".to_string()),
            ..StructuredRecord::default()
        };
        let example = build_example(&item(), &bare, &context(), TargetMode::Standard);
        assert_eq!(example.category, DEFAULT_CATEGORY);
        assert_eq!(example.explanation, DEFAULT_EXPLANATION);
        assert_eq!(example.file_name, "example_0001.c");
        assert_eq!(example.build_command.as_deref(), Some("gcc example_0001.c -o example_0001"));
        assert_eq!(example.cmakelists, None);
        assert_eq!(example.timestamp, "2024-05-01 12:30:00");
        assert_eq!(example.input, "Read a DS18B20.");
        assert_eq!(example.prompt, "Read a DS18B20 via sysfs and log to CSV.");

        let pico = build_example(&item(), &bare, &context(), TargetMode::Pico);
        assert_eq!(pico.build_command, None);
        assert!(pico.cmakelists.is_some());
    }

    #[test]
    fn test_append_rewrites_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();

        let saved = store.append(&item(), &record(), &context()).unwrap();
        assert_eq!(saved.build_command.as_deref(), Some("gcc temp.c -o temp"));
        assert!(saved.tags.contains("C, agriculture"));

        let on_disk: Vec<SavedExample> =
            serde_json::from_str(&fs::read_to_string(store.examples_path()).unwrap()).unwrap();
        assert_eq!(on_disk, vec![saved]);
        assert!(!store.errors_path().exists());
        assert!(!dir.path().join("pipeline_examples.json.tmp").exists());
    }

    #[test]
    fn test_append_error_writes_error_file() {
        let dir = TempDir::new().unwrap();
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();
        store.append_error("0003", "not json").unwrap();

        let errors: Vec<ErrorLogEntry> =
            serde_json::from_str(&fs::read_to_string(store.errors_path()).unwrap()).unwrap();
        assert_eq!(errors[0].id, "0003");
        assert_eq!(errors[0].raw_response, "not json");
        assert!(store.examples_path().exists());
    }

    #[test]
    fn test_failed_save_leaves_no_example_behind() {
        let dir = TempDir::new().unwrap();
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();

        // A directory squatting on the temp path makes the write fail
        let blocker = dir.path().join("pipeline_examples.json.tmp");
        fs::create_dir(&blocker).unwrap();
        assert!(matches!(
            store.append(&item(), &record(), &context()),
            Err(StoreError::WriteError(_, _))
        ));
        assert!(store.examples().is_empty());

        fs::remove_dir(&blocker).unwrap();
        store
            .append(&WorkItem::new("actuators", "servo", 2), &record(), &context())
            .unwrap();

        let on_disk: Vec<SavedExample> =
            serde_json::from_str(&fs::read_to_string(store.examples_path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].id, "0002");
    }

    #[test]
    fn test_failed_error_save_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();

        let blocker = dir.path().join("pipeline_errors.json.tmp");
        fs::create_dir(&blocker).unwrap();
        assert!(store.append_error("0001", "garbage").is_err());
        assert!(store.errors().is_empty());

        fs::remove_dir(&blocker).unwrap();
        store.append_error("0002", "also garbage").unwrap();

        let errors: Vec<ErrorLogEntry> =
            serde_json::from_str(&fs::read_to_string(store.errors_path()).unwrap()).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, "0002");
    }

    #[test]
    fn test_reopen_accumulates() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();
            store.append(&item(), &record(), &context()).unwrap();
        }
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, false).unwrap();
        assert_eq!(store.examples().len(), 1);
        store
            .append(&WorkItem::new("actuators", "servo", 2), &record(), &context())
            .unwrap();
        assert_eq!(store.examples().len(), 2);
    }

    #[test]
    fn test_corrupt_snapshot_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(EXAMPLES_FILE), "{oops").unwrap();
        assert!(matches!(
            ExampleStore::open(dir.path(), TargetMode::Standard, false),
            Err(StoreError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_source_file_written() {
        let dir = TempDir::new().unwrap();
        let mut store = ExampleStore::open(dir.path(), TargetMode::Standard, true).unwrap();
        store.append(&item(), &record(), &context()).unwrap();

        let sources: Vec<_> = fs::read_dir(dir.path().join(SOURCES_DIR))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(sources.len(), 1);
        let name = sources[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("sensor_reading_temperature_sensor_0001_"));
        let contents = fs::read_to_string(&sources[0]).unwrap();
        assert!(contents.starts_with("// Example-id: 0001\n"));
        assert!(contents.contains("// Build-Command: gcc temp.c -o temp"));
        assert!(contents.ends_with("int main(void) { return 0; }\n"));
    }
}
