//! Extraction and acceptance checks for a single generation attempt.

use tracing::{error, warn};

use crate::core::extract::{extract, Extracted};
use crate::core::prompts::build_command_reason;
use crate::core::validate::{compile, looks_cpp, CodeValidator};
use crate::error::ExtractError;

/// What one model response amounted to
#[derive(Debug)]
pub(crate) enum Evaluation {
    Accepted(Extracted),
    /// Response could not be turned into a record
    Malformed(ExtractError),
    /// Record parsed but failed a content check; carries the correction
    Rejected(String),
}

/// Settings for the checks applied after the validator
pub(crate) struct AcceptanceChecks<'a> {
    pub validator: &'a CodeValidator,
    /// Compiler for the `-fsyntax-only` pass, when enabled
    pub compiler: Option<&'a str>,
}

impl AcceptanceChecks<'_> {
    /// Extract, validate, classify the build command, then optionally compile
    pub(crate) fn evaluate(&self, response: &str, subcategory: &str, platform: &str) -> Evaluation {
        let extracted = match extract(response) {
            Ok(e) => e,
            Err(e) => {
                error!("Could not extract a record from the response: {}", e);
                return Evaluation::Malformed(e);
            }
        };

        let verdict = self.validator.validate(&extracted.code, subcategory);
        if !verdict.accepted {
            return Evaluation::Rejected(verdict.reason);
        }

        let mode = self.validator.mode();
        let build = extracted.record.build_instructions(mode).unwrap_or_default();
        if looks_cpp(build) {
            warn!("Generated code has a C++ build command: {}", build);
            return Evaluation::Rejected(build_command_reason(platform, mode));
        }

        if let Some(compiler) = self.compiler {
            match compile::syntax_check(compiler, &extracted.code) {
                Ok((true, _)) => {}
                Ok((false, diagnostics)) => {
                    warn!("Generated code failed {} -fsyntax-only", compiler);
                    return Evaluation::Rejected(compile::syntax_reason(compiler, &diagnostics));
                }
                Err(e) => warn!("Compile check skipped: {}", e),
            }
        }

        Evaluation::Accepted(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TargetMode, ValidationConfig};

    const CODE: &str = "#include <stdio.h>\n#include <wiringPi.h>\n\n// Read a button on GPIO 4\nint main(void) {\n    /* BCM numbering */\n    if (wiringPiSetupGpio() == -1) {\n        fprintf(stderr, \"setup failed\\n\");\n        return 1;\n    }\n    // Poll once and print the level\n    printf(\"%d\\n\", digitalRead(4));\n    return 0;\n}";

    fn response(build: &str) -> String {
        serde_json::json!({ "output": CODE, "build-command": build }).to_string()
    }

    fn checks(validator: &CodeValidator) -> AcceptanceChecks<'_> {
        AcceptanceChecks { validator, compiler: None }
    }

    #[test]
    fn test_accepts_good_response() {
        let validator = CodeValidator::new(&ValidationConfig::default(), TargetMode::Standard);
        let outcome = checks(&validator).evaluate(&response("gcc b.c -o b -lwiringPi"), "button", "Raspberry Pi 4 Model B");
        match outcome {
            Evaluation::Accepted(e) => assert_eq!(e.code, CODE),
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_cpp_build_command_rejected() {
        let validator = CodeValidator::new(&ValidationConfig::default(), TargetMode::Standard);
        let outcome = checks(&validator).evaluate(&response("g++ b.cpp -o b"), "button", "Raspberry Pi Zero W");
        match outcome {
            Evaluation::Rejected(reason) => assert!(reason.contains("Raspberry Pi Zero W")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_response() {
        let validator = CodeValidator::new(&ValidationConfig::default(), TargetMode::Standard);
        let outcome = checks(&validator).evaluate("Sorry, I can't help with that.", "button", "Pi");
        assert!(matches!(outcome, Evaluation::Malformed(ExtractError::InvalidJson(_))));
    }

    #[test]
    fn test_validator_reason_passed_through() {
        let validator = CodeValidator::new(&ValidationConfig::default(), TargetMode::Standard);
        let short = serde_json::json!({ "output": "int main(void) { return 0; }" }).to_string();
        match checks(&validator).evaluate(&short, "button", "Pi") {
            Evaluation::Rejected(reason) => assert!(reason.contains("too short")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
