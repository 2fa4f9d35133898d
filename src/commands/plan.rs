use std::collections::BTreeMap;
use std::path::Path;

use crate::commands::run::{queue_rng, RunOptions};
use crate::core::config::{load_config, load_taxonomy, ConfigOverrides};
use crate::core::sampler::build_work_items;
use crate::error::PigenError;
use crate::models::WorkItem;

/// Show the work queue a run with the same count and seed would process
pub fn plan_generation(project_root: &Path, options: RunOptions) -> Result<Vec<WorkItem>, PigenError> {
    let overrides = ConfigOverrides {
        mode: options.mode,
        ..ConfigOverrides::default()
    };
    let config = load_config(project_root, overrides)?;
    let taxonomy = load_taxonomy(project_root, &config)?;

    let mut rng = queue_rng(options.seed);
    let items = build_work_items(&taxonomy, options.count, &mut rng)?;

    println!("=== DRY RUN ===\n");
    println!("Target: {}", config.target.mode.display_name());
    println!(
        "Requested {}, queued {} ({} coverage pairs)\n",
        options.count,
        items.len(),
        taxonomy.pair_count()
    );
    for item in &items {
        println!("  {} {} / {}", item.id, item.category, item.subcategory);
    }

    println!("\nPer category:");
    for (category, count) in category_counts(&items) {
        println!("  {:<24} {}", category, count);
    }
    println!("\nRun 'pigen run' with the same --count and --seed to execute.");

    Ok(items)
}

fn category_counts(items: &[WorkItem]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.category.as_str()).or_insert(0) += 1;
    }
    counts
}
