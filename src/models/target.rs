//! Target board mode

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board family the generated examples target.
///
/// The mode changes the record schema (`build-command` vs `cmakelists`),
/// the restricted-header table and the built-in taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Linux single-board computers (Pi 3/4/5, Zero W)
    Standard,
    /// RP2040 microcontroller built with the Pico SDK
    Pico,
}

impl TargetMode {
    /// Returns the display name for the mode
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetMode::Standard => "Raspberry Pi (Linux)",
            TargetMode::Pico => "Raspberry Pi Pico",
        }
    }

    /// JSON key the model must use for build instructions
    pub fn build_field(&self) -> &'static str {
        match self {
            TargetMode::Standard => "build-command",
            TargetMode::Pico => "cmakelists",
        }
    }

    /// Description of the build field shown to the model
    pub fn build_field_description(&self) -> &'static str {
        match self {
            TargetMode::Standard => "The gcc or make command to compile the code",
            TargetMode::Pico => {
                "The CMAKELISTS.txt program to compile the code using the CMAKE command"
            }
        }
    }

    /// Whether the target is a microcontroller without an OS toolchain
    pub fn is_microcontroller(&self) -> bool {
        matches!(self, TargetMode::Pico)
    }

    /// Returns all available modes
    pub fn all() -> &'static [TargetMode] {
        &[TargetMode::Standard, TargetMode::Pico]
    }
}

impl Default for TargetMode {
    fn default() -> Self {
        TargetMode::Standard
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
