use std::fs;
use std::path::Path;

use crate::core::config::{load_config, ConfigOverrides};
use crate::core::validate::{looks_cpp, CodeValidator};
use crate::error::PigenError;
use crate::models::TargetMode;

/// Result of checking a local C file
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub accepted: bool,
    pub reason: String,
    /// Build command flagged as C++, if one was given
    pub cpp_build: Option<bool>,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.accepted && self.cpp_build != Some(true)
    }
}

/// Run the validator (and build-command classifier) on a local file
pub fn check_file(
    project_root: &Path,
    file: &Path,
    subcategory: Option<&str>,
    build_command: Option<&str>,
    mode: Option<TargetMode>,
) -> Result<CheckResult, PigenError> {
    if !file.exists() {
        return Err(PigenError::SourceNotFound(file.to_path_buf()));
    }
    let code = fs::read_to_string(file)?;

    let overrides = ConfigOverrides {
        mode,
        ..ConfigOverrides::default()
    };
    let mut config = load_config(project_root, overrides)?;
    // Without a subcategory there is nothing to match against
    if subcategory.is_none() {
        config.validation.check_subcategory = false;
    }

    let validator = CodeValidator::new(&config.validation, config.target.mode);
    let verdict = validator.validate(&code, subcategory.unwrap_or_default());

    Ok(CheckResult {
        accepted: verdict.accepted,
        reason: verdict.reason,
        cpp_build: build_command.map(looks_cpp),
    })
}

pub fn print_check_result(file: &Path, result: &CheckResult) {
    println!("Checking {}", file.display());
    if result.accepted {
        println!("  Validator:     PASS");
    } else {
        println!("  Validator:     FAIL");
        println!("  Reason:        {}", result.reason);
    }
    match result.cpp_build {
        Some(true) => println!("  Build command: FAIL (looks like C++)"),
        Some(false) => println!("  Build command: PASS"),
        None => {}
    }
}
