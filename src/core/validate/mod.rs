//! Layered static checks deciding whether generated C code is kept.
//!
//! Checks run in a fixed order and stop at the first failure. Every rejection
//! reason is written as an instruction, because it is fed verbatim into the
//! next generation attempt.

pub mod build_command;
pub mod compile;
pub mod cpp;
pub mod headers;
pub mod restricted;

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::{TargetMode, ValidationConfig, ValidationVerdict};
use restricted::RestrictedRules;

pub use build_command::looks_cpp;

static BLOCK_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").ok());

static LINE_COMMENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"//.*").ok());

static MAIN_FN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\bmain\s*\(").ok());

static WELL_FORMED_INCLUDE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*#include\s+[<"].+[>"]"#).ok());

/// Keywords too generic to prove a subcategory is implemented
const GENERIC_WORDS: &[&str] = &["sensor", "value", "data", "input", "output", "control"];

/// Substrings that indicate some form of error reporting
const ERROR_HANDLING_MARKERS: &[&str] = &["fprintf(stderr", "perror(", "return 1", "exit("];

/// Remove `/* ... */` and `// ...` comments
pub fn strip_comments(code: &str) -> String {
    let without_blocks = match BLOCK_COMMENT.as_ref() {
        Some(re) => re.replace_all(code, "").into_owned(),
        None => code.to_string(),
    };
    match LINE_COMMENT.as_ref() {
        Some(re) => re.replace_all(&without_blocks, "").into_owned(),
        None => without_blocks,
    }
}

/// `main` followed by optional whitespace and `(`, outside comments
pub fn has_main(code: &str) -> bool {
    let stripped = strip_comments(code);
    MAIN_FN.as_ref().is_some_and(|re| re.is_match(&stripped))
}

pub fn has_valid_include(code: &str) -> bool {
    WELL_FORMED_INCLUDE
        .as_ref()
        .is_some_and(|re| re.is_match(code))
}

/// Lines that start with `//` or `*`, or contain `/*`
pub fn count_comment_lines(code: &str) -> usize {
    code.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with("//") || line.contains("/*") || trimmed.starts_with('*')
        })
        .count()
}

/// Subcategory named in the code, or one of its specific keywords in a comment
pub fn subcategory_match_fuzzy(code: &str, subcategory: &str) -> bool {
    let subcategory = subcategory.to_lowercase();
    let code_lower = code.to_lowercase();

    if code_lower.contains(&subcategory) {
        return true;
    }

    let comment_lines: Vec<&str> = code_lower
        .lines()
        .filter(|line| line.contains("//") || line.contains("/*"))
        .map(str::trim)
        .collect();

    subcategory
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty() && !GENERIC_WORDS.contains(word))
        .filter_map(|word| Regex::new(&format!(r"\b{}\b", regex::escape(word))).ok())
        .any(|re| comment_lines.iter().any(|line| re.is_match(line)))
}

pub fn has_error_handling(code: &str) -> bool {
    ERROR_HANDLING_MARKERS.iter().any(|m| code.contains(m))
}

/// Validator configured for one target and one set of thresholds
#[derive(Debug)]
pub struct CodeValidator {
    mode: TargetMode,
    min_code_length: usize,
    min_comment_lines: usize,
    check_subcategory: bool,
    warn_missing_error_handling: bool,
    restricted: RestrictedRules,
}

impl CodeValidator {
    pub fn new(config: &ValidationConfig, mode: TargetMode) -> Self {
        Self {
            mode,
            min_code_length: config.min_code_length,
            min_comment_lines: config.min_comment_lines,
            check_subcategory: config.check_subcategory,
            warn_missing_error_handling: config.warn_missing_error_handling,
            restricted: RestrictedRules::for_mode(mode),
        }
    }

    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    /// Run every check in order, stopping at the first failure
    pub fn validate(&self, code: &str, subcategory: &str) -> ValidationVerdict {
        let verdict = self.run_checks(code, subcategory);
        if verdict.accepted {
            debug!("Code passed validation ({} chars)", code.trim().len());
            if self.warn_missing_error_handling && !has_error_handling(code) {
                warn!("Error handling/logging not detected in accepted code");
            }
        } else {
            warn!("Validation failed: {}", verdict.reason);
        }
        verdict
    }

    fn run_checks(&self, code: &str, subcategory: &str) -> ValidationVerdict {
        let length = code.trim().chars().count();
        if length < self.min_code_length {
            return ValidationVerdict::reject(format!(
                "The code is too short ({} characters). Write a complete, working C program of at least {} characters.",
                length, self.min_code_length
            ));
        }

        let constructs = cpp::find_cpp_constructs(&strip_comments(code));
        if !constructs.is_empty() {
            return ValidationVerdict::reject(format!(
                "The code must be plain C. Remove these C++ constructs and use C equivalents: {}.",
                constructs.join(", ")
            ));
        }

        if !has_main(code) {
            return ValidationVerdict::reject(
                "The program must define a main() function as its entry point.",
            );
        }

        if !has_valid_include(code) {
            return ValidationVerdict::reject(
                "The code must include its headers with well-formed #include <...> or #include \"...\" directives.",
            );
        }

        let violations = self.restricted.check(code);

        if !headers::has_whitelisted_include(code, self.mode) {
            let mut reason = "The code must include at least one real C or Raspberry Pi library header, such as <stdio.h>, <wiringPi.h>, <pigpio.h> or <linux/i2c-dev.h>.".to_string();
            if !violations.is_empty() {
                reason.push_str(&format!(
                    " Also fix these headers: {}.",
                    restricted::describe(&violations)
                ));
            }
            return ValidationVerdict::reject(reason);
        }

        if !violations.is_empty() {
            return ValidationVerdict::reject(format!(
                "Fix these header and library problems: {}.",
                restricted::describe(&violations)
            ));
        }

        if self.check_subcategory && !subcategory_match_fuzzy(code, subcategory) {
            return ValidationVerdict::reject(format!(
                "The code must clearly implement '{}'. Use it in the code and name it in the comments.",
                subcategory
            ));
        }

        let comments = count_comment_lines(code);
        if comments < self.min_comment_lines {
            return ValidationVerdict::reject(format!(
                "Add more explanatory comments: found {} comment lines, at least {} are required.",
                comments, self.min_comment_lines
            ));
        }

        ValidationVerdict::accept()
    }
}
