use std::fs;
use std::path::Path;
use tracing::info;

use dialoguer::{theme::ColorfulTheme, Select};

use crate::core::store::{EXAMPLES_FILE, SOURCES_DIR};
use crate::error::PigenError;
use crate::models::{TargetMode, Taxonomy, API_KEYS_ENV};

pub const CONFIG_FILE: &str = "pigen.toml";
pub const TAXONOMY_FILE: &str = "taxonomy.toml";

/// Initialize a pigen project for the given or selected target mode
pub fn init_project(project_root: &Path, mode: Option<TargetMode>) -> Result<(), PigenError> {
    let mode = match mode {
        Some(m) => m,
        None => prompt_for_mode()?,
    };

    info!("Initializing {} project", mode.display_name());
    println!("Initializing pigen project for {}...", mode.display_name());

    if !project_root.exists() {
        fs::create_dir_all(project_root)?;
        info!("Created project directory: {}", project_root.display());
    }

    create_file_if_not_exists(&project_root.join(CONFIG_FILE), &default_config_toml(mode))?;

    let taxonomy = Taxonomy::builtin(mode)
        .to_toml()
        .map_err(|e| PigenError::Init(format!("Failed to serialize taxonomy: {}", e)))?;
    create_file_if_not_exists(&project_root.join(TAXONOMY_FILE), &taxonomy)?;

    info!("pigen project initialized successfully!");
    print_next_steps(project_root, mode);

    Ok(())
}

/// Default config for `mode`, pointing at the generated taxonomy file
pub fn default_config_toml(mode: TargetMode) -> String {
    let mode_key = match mode {
        TargetMode::Standard => "standard",
        TargetMode::Pico => "pico",
    };
    format!(
        r#"# pigen configuration

[gateway]
model = "gemini-2.0-flash"
# Keys are rotated round-robin; {env} is appended at runtime
api_keys = []
max_requests_per_minute = 15
timeout_seconds = 120

[generation]
max_retries = 3
base_delay_seconds = 5.0
jitter_seconds = 2.0
base_prompt_temperature = 0.8
enrichment_temperature = 0.7
code_temperature = 0.75

[target]
mode = "{mode}"
taxonomy_file = "{taxonomy}"

[validation]
min_code_length = 150
min_comment_lines = 3
check_subcategory = false
warn_missing_error_handling = true
# Runs `<compiler> -fsyntax-only` on accepted code
compile_check = false
compiler = "gcc"

[output]
dir = "output"
write_source_files = false
"#,
        env = API_KEYS_ENV,
        mode = mode_key,
        taxonomy = TAXONOMY_FILE,
    )
}

fn prompt_for_mode() -> Result<TargetMode, PigenError> {
    let modes = TargetMode::all();
    let items: Vec<&str> = modes.iter().map(|m| m.display_name()).collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select target board")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| PigenError::Init(format!("Failed to get user input: {}", e)))?;

    Ok(modes[selection])
}

fn create_file_if_not_exists(path: &Path, content: &str) -> Result<(), PigenError> {
    if !path.exists() {
        fs::write(path, content)?;
        info!("Created file: {}", path.display());
    } else {
        info!("File already exists: {}", path.display());
    }
    Ok(())
}

fn print_next_steps(project_root: &Path, mode: TargetMode) {
    println!("pigen project initialized at {}", project_root.display());
    println!("\nTarget: {}", mode.display_name());
    println!("\nNext steps:");
    println!("1. Add Gemini API keys to [gateway].api_keys in {} or export {}", CONFIG_FILE, API_KEYS_ENV);
    println!("2. Edit {} to adjust categories, weights and variation axes", TAXONOMY_FILE);
    println!("3. Run 'pigen ping' to check connectivity");
    println!("4. Run 'pigen plan --count 20' to preview the work queue");
    println!("5. Run 'pigen run --count 20' to generate examples");
    println!("\nAccepted examples accumulate in output/{}", EXAMPLES_FILE);

    if mode.is_microcontroller() {
        println!("\nPico tips:");
        println!("- Records carry a 'cmakelists' field instead of a gcc build command");
        println!("- Pico SDK headers such as pico/stdlib.h and hardware/adc.h are allowed");
    } else {
        println!("\nSet [output].write_source_files = true to also write .c files under output/{}", SOURCES_DIR);
    }
}
