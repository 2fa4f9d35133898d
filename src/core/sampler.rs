//! Work queue construction: full coverage, weighted fill, shuffle.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::models::{Taxonomy, TaxonomyError, WorkItem};

/// Build `total` work items (or more, see below) from the taxonomy.
///
/// Every (category, subcategory) pair appears once, in taxonomy order, with
/// ids starting at 0001. Remaining slots draw a category by relative weight
/// and a subcategory uniformly. The list is then shuffled. When `total` is
/// below the number of pairs, full coverage wins and the list is longer than
/// requested.
pub fn build_work_items<R: Rng + ?Sized>(
    taxonomy: &Taxonomy,
    total: usize,
    rng: &mut R,
) -> Result<Vec<WorkItem>, TaxonomyError> {
    let mut items: Vec<WorkItem> = taxonomy
        .entries()
        .enumerate()
        .map(|(i, entry)| WorkItem::new(entry.category, entry.subcategory, i + 1))
        .collect();

    let coverage = items.len();
    if total < coverage {
        warn!(
            "Requested {} examples but the taxonomy has {} pairs; generating all {} for full coverage",
            total, coverage, coverage
        );
    }

    let remaining = total.saturating_sub(coverage);
    if remaining > 0 {
        let weights = WeightedIndex::new(taxonomy.categories.iter().map(|c| c.weight))
            .map_err(|e| TaxonomyError::Invalid(format!("category weights: {}", e)))?;

        for _ in 0..remaining {
            let category = &taxonomy.categories[weights.sample(rng)];
            let Some(subcategory) = category.subcategories.choose(rng) else {
                return Err(TaxonomyError::Invalid(format!(
                    "category '{}' has no subcategories",
                    category.name
                )));
            };
            items.push(WorkItem::new(&category.name, subcategory, items.len() + 1));
        }
    }

    debug!("Built {} work items ({} coverage, {} weighted)", items.len(), coverage, remaining);
    items.shuffle(rng);
    Ok(items)
}
