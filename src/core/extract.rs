//! Normalization of raw model responses into a record and clean C source.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::StructuredRecord;

static JSON_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n```").ok());

static C_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```c[ \t]*\r?\n(.*?)\r?\n```").ok());

/// A parsed response together with the code pulled out of its `output` field
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub record: StructuredRecord,
    pub code: String,
}

fn fenced_interior<'a>(fence: &LazyLock<Option<Regex>>, text: &'a str) -> Option<&'a str> {
    let re = fence.as_ref()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Interior of a ```json fence, or the whole text. Always trimmed.
pub fn unwrap_json_block(text: &str) -> &str {
    match fenced_interior(&JSON_FENCE, text) {
        Some(inner) => {
            debug!("JSON block found inside ```json wrapper");
            inner
        }
        None => {
            debug!("No ```json wrapper found, using full text");
            text.trim()
        }
    }
}

/// Interior of a ```c fence, or the raw field. Always trimmed.
pub fn unwrap_code_block(output: &str) -> &str {
    match fenced_interior(&C_FENCE, output) {
        Some(inner) => {
            debug!("C code block extracted from output field");
            inner
        }
        None => output.trim(),
    }
}

/// Parse a response into a record; a JSON list unwraps to its first element.
pub fn parse_record(text: &str) -> Result<StructuredRecord, ExtractError> {
    let json = unwrap_json_block(text);
    let value: Value = serde_json::from_str(json)?;

    let object = match value {
        Value::Array(items) => {
            debug!("Response JSON is a list, unwrapping first element");
            items.into_iter().next().ok_or(ExtractError::EmptyArray)?
        }
        other => other,
    };

    if !object.is_object() {
        return Err(ExtractError::NotAnObject);
    }

    Ok(serde_json::from_value(object)?)
}

/// Clean code from a parsed record's `output` field
pub fn extract_code(record: &StructuredRecord) -> Result<String, ExtractError> {
    let output = record.output.as_deref().unwrap_or_default();
    let code = unwrap_code_block(output);
    if code.is_empty() {
        warn!("'output' field is empty or missing");
        return Err(ExtractError::MissingOutput);
    }
    Ok(code.to_string())
}

/// Full extraction pass over one raw response
pub fn extract(text: &str) -> Result<Extracted, ExtractError> {
    let record = parse_record(text)?;
    let code = extract_code(&record)?;
    Ok(Extracted { record, code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_json_block_fenced() {
        let text = "Here you go:\n```json\n{\"output\": \"x\"}\n```\nThanks";
        assert_eq!(unwrap_json_block(text), "{\"output\": \"x\"}");
    }

    #[test]
    fn test_unwrap_json_block_plain() {
        assert_eq!(unwrap_json_block("  {\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(unwrap_json_block(""), "");
    }

    #[test]
    fn test_unwrap_code_block() {
        let fenced = "```c\n#include <stdio.h>\nint main(void) { return 0; }\n```";
        assert_eq!(
            unwrap_code_block(fenced),
            "#include <stdio.h>\nint main(void) { return 0; }"
        );
        assert_eq!(unwrap_code_block("  int x;  "), "int x;");
        // Other language tags are left alone
        assert_eq!(unwrap_code_block("```cpp\nint x;\n```"), "```cpp\nint x;\n```");
    }

    #[test]
    fn test_parse_record_list_unwraps_first() {
        let text = r#"[{"output": "first"}, {"output": "second"}]"#;
        let record = parse_record(text).unwrap();
        assert_eq!(record.output.as_deref(), Some("first"));
    }

    #[test]
    fn test_parse_record_errors() {
        assert!(matches!(parse_record("not json at all"), Err(ExtractError::InvalidJson(_))));
        assert!(matches!(parse_record("[]"), Err(ExtractError::EmptyArray)));
        assert!(matches!(parse_record("\"just a string\""), Err(ExtractError::NotAnObject)));
        assert!(matches!(parse_record("[42]"), Err(ExtractError::NotAnObject)));
    }

    #[test]
    fn test_extract_missing_output() {
        assert!(matches!(
            extract(r#"{"category": "demo"}"#),
            Err(ExtractError::MissingOutput)
        ));
        assert!(matches!(
            extract(r#"{"output": "   "}"#),
            Err(ExtractError::MissingOutput)
        ));
    }

    #[test]
    fn test_extract_clean_input_has_no_fence_artifacts() {
        let code = "#include <stdio.h>\nint main(void) {\n    return 0;\n}";
        let text = serde_json::json!({ "output": code, "tags": "C" }).to_string();
        let extracted = extract(&text).unwrap();
        assert_eq!(extracted.code, code);
        assert!(!extracted.code.contains("```"));

        // Running the cleaned code back through the unwrappers changes nothing
        assert_eq!(unwrap_code_block(&extracted.code), code);
    }

    #[test]
    fn test_extract_double_fenced() {
        let inner = serde_json::json!({ "output": "```c\nint main(void) { return 0; }\n```" });
        let text = format!("```json\n{}\n```", inner);
        let extracted = extract(&text).unwrap();
        assert_eq!(extracted.code, "int main(void) { return 0; }");
    }

    #[test]
    fn test_json_fence_not_closed_by_code_fence_in_string() {
        let inner = serde_json::json!({
            "output": "```c\n#include <stdio.h>\nint main(void) { return 0; }\n```",
            "build-command": "gcc main.c -o main",
        });
        let text = format!("Here you go:\n```json\n{}\n```\n", inner);

        let extracted = extract(&text).unwrap();
        assert_eq!(extracted.code, "#include <stdio.h>\nint main(void) { return 0; }");
        assert_eq!(extracted.record.build_command.as_deref(), Some("gcc main.c -o main"));
    }

    #[test]
    fn test_code_fence_needs_closing_line() {
        let output = "```c\nprintf(\"```\");\nreturn 0;\n```";
        assert_eq!(unwrap_code_block(output), "printf(\"```\");\nreturn 0;");
    }
}
