use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::config::{load_config, load_taxonomy, output_dir, ConfigOverrides};
use crate::core::gateway::GeminiClient;
use crate::core::runner::{ItemOutcome, ItemResult, Orchestrator};
use crate::core::sampler::build_work_items;
use crate::core::store::ExampleStore;
use crate::error::PigenError;
use crate::models::TargetMode;

/// Run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Requested number of examples (coverage may raise it)
    pub count: usize,
    /// Seed for the work queue, context sampling and jitter
    pub seed: Option<u64>,
    /// Model override
    pub model: Option<String>,
    /// Target mode override
    pub mode: Option<TargetMode>,
    /// Attempt budget override
    pub retries: Option<u32>,
    /// Output directory override
    pub output: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            count: 20,
            seed: None,
            model: None,
            mode: None,
            retries: None,
            output: None,
        }
    }
}

impl RunOptions {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            mode: self.mode,
            retries: self.retries,
            output: self.output.clone(),
        }
    }
}

/// Seeded or entropy RNG for the work queue
pub(crate) fn queue_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

/// Generate examples
pub async fn run_generation(project_root: &Path, options: RunOptions) -> Result<(), PigenError> {
    let config = load_config(project_root, options.overrides())?;
    let taxonomy = load_taxonomy(project_root, &config)?;

    let gateway = GeminiClient::new(config.gateway.clone(), config.generation.base_delay())?;

    let out_dir = output_dir(project_root, &config);
    let mut store = ExampleStore::open(&out_dir, config.target.mode, config.output.write_source_files)?;
    let existing = store.examples().len();

    let mut rng = queue_rng(options.seed);
    let items = build_work_items(&taxonomy, options.count, &mut rng)?;
    info!(
        "Generating {} examples for {} with {}",
        items.len(),
        config.target.mode.display_name(),
        config.gateway.model
    );

    let summary = {
        let mut orchestrator = Orchestrator::new(&config, &taxonomy, &gateway, &mut store, options.seed);
        orchestrator.run(&items).await
    };

    println!("\n=== Run Summary ===");
    println!("Processed: {}", summary.processed);
    println!("Accepted:  {}", summary.accepted);
    println!("Failed:    {}", summary.failed);

    if !summary.results.is_empty() {
        println!("\nResults:");
        for result in &summary.results {
            print_item_result(result);
        }
    }

    println!(
        "\nDataset: {} ({} new, {} total)",
        store.examples_path().display(),
        store.examples().len() - existing,
        store.examples().len()
    );
    if !store.errors().is_empty() {
        println!("Unparseable responses: {}", store.errors_path().display());
    }

    Ok(())
}

fn print_item_result(result: &ItemResult) {
    let status_str = match result.outcome {
        ItemOutcome::Accepted => "PASS",
        ItemOutcome::Exhausted => "FAIL",
        ItemOutcome::NotSaved => "UNSAVED",
    };

    let label = format!("{} {}/{}", result.id, result.category, result.subcategory);
    match &result.last_reason {
        Some(reason) if !result.is_accepted() => println!(
            "  {} [{}] ({} attempts): {}",
            label, status_str, result.attempts, reason
        ),
        _ => println!("  {} [{}] ({} attempts)", label, status_str, result.attempts),
    }
}
