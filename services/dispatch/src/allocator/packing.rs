//! Greedy packing of ranked assets into a space budget.
//!
//! Assets are considered most-urgent-first; among equally urgent assets the
//! smaller ones are favored to maximize throughput. Assets with unknown
//! size are accepted optimistically without consuming budget, bounded by a
//! per-allocation cap so a single call cannot overcommit a node without
//! limit.

use lifeboat_model::RankedAsset;

/// Maximum number of unknown-size assets accepted per allocation.
pub const MAX_UNKNOWN_SIZE_ASSETS: usize = 5;

/// Select the assets to allocate for the given budget, in acceptance order.
///
/// Deterministic: ordering is `(priority, known size, asset_id)` with
/// unknown sizes after known ones within a priority group, so the same
/// input list and budget always select the same subset.
pub fn pack(available: &[RankedAsset], free_space_mb: f64) -> Vec<RankedAsset> {
    let mut ordered: Vec<&RankedAsset> = available.iter().collect();
    ordered.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(match (a.size_mb, b.size_mb) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then(a.asset_id.cmp(&b.asset_id))
    });

    let mut selected = Vec::new();
    let mut remaining = free_space_mb;
    let mut unknown_accepted = 0;

    for asset in ordered {
        match asset.size_mb {
            Some(size) => {
                if size <= remaining {
                    remaining -= size;
                    selected.push(asset.clone());
                }
            }
            None => {
                // True cost is not yet known; accept without consuming
                // budget, up to the cap.
                if unknown_accepted < MAX_UNKNOWN_SIZE_ASSETS {
                    unknown_accepted += 1;
                    selected.push(asset.clone());
                }
            }
        }
    }

    selected
}

/// Total size of the selected assets, counting only known sizes.
pub fn allocated_size_mb(selected: &[RankedAsset]) -> f64 {
    selected.iter().filter_map(|a| a.size_mb).sum()
}
