//! Pure rank assignment over a catalog snapshot.
//!
//! The ordering rule: incomplete datasets always outrank complete ones, and
//! within each group more popular datasets (higher event count) come first.
//! Ranks are a dense permutation 1..N with ties broken by ascending dataset
//! id, so the assignment is deterministic for a given snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a dataset's completion status is derived from its resource and
/// rescue counts. The catalog's historical join for this was inconsistent
/// across variants, so the rule is pluggable rather than hard-coded.
pub trait CompletionPolicy: Send + Sync {
    fn is_complete(&self, resource_count: i64, rescued_resource_count: i64) -> bool;
}

/// Default rule: a dataset is complete when every distinct resource it owns
/// has at least one asset with a non-null rescue locator. A dataset with no
/// resources is vacuously complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocatorCompletion;

impl CompletionPolicy for LocatorCompletion {
    fn is_complete(&self, resource_count: i64, rescued_resource_count: i64) -> bool {
        rescued_resource_count >= resource_count
    }
}

/// Per-dataset state captured at the start of a recompute pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSnapshot {
    pub dataset_id: i64,

    /// Whether every resource of the dataset has a rescued asset.
    pub completed: bool,

    /// Most recent popularity signal for the dataset.
    pub event_count: i64,

    /// Rank from the dataset's latest rank row, if it has ever been ranked.
    pub current_rank: Option<i32>,
}

/// A rank row to append: emitted only for datasets whose rank changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRankRecord {
    pub dataset_id: i64,
    pub ranking_id: String,
    pub event_count: i64,
    /// The rank previously on record, absent for first-ranked datasets.
    pub db_rank: Option<i32>,
    pub rank: i32,
    pub updated_at: DateTime<Utc>,
}

/// Batch tag shared by all rows of one recompute: the UTC day code.
pub fn ranking_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Assign dense ranks 1..N over the snapshot and return the rows to append.
///
/// Datasets whose newly assigned rank equals their recorded rank are not
/// re-emitted, which keeps the append-only log sparse and makes the
/// computation idempotent: a second pass over an unchanged catalog emits
/// nothing.
pub fn compute_rank(snapshot: &[DatasetSnapshot], now: DateTime<Utc>) -> Vec<NewRankRecord> {
    let mut ordered: Vec<&DatasetSnapshot> = snapshot.iter().collect();
    ordered.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then(b.event_count.cmp(&a.event_count))
            .then(a.dataset_id.cmp(&b.dataset_id))
    });

    let batch_id = ranking_id(now);

    ordered
        .iter()
        .enumerate()
        .filter_map(|(idx, dataset)| {
            let rank = idx as i32 + 1;
            if dataset.current_rank == Some(rank) {
                return None;
            }
            Some(NewRankRecord {
                dataset_id: dataset.dataset_id,
                ranking_id: batch_id.clone(),
                event_count: dataset.event_count,
                db_rank: dataset.current_rank,
                rank,
                updated_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn snapshot(dataset_id: i64, completed: bool, event_count: i64) -> DatasetSnapshot {
        DatasetSnapshot {
            dataset_id,
            completed,
            event_count,
            current_rank: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_incomplete_datasets_rank_first() {
        let records = compute_rank(
            &[
                snapshot(1, true, 1_000_000),
                snapshot(2, false, 3),
                snapshot(3, false, 10),
            ],
            now(),
        );

        let ranks: Vec<(i64, i32)> = records.iter().map(|r| (r.dataset_id, r.rank)).collect();
        // Popular-but-complete dataset 1 sorts after both incomplete ones.
        assert_eq!(ranks, vec![(3, 1), (2, 2), (1, 3)]);
    }

    #[test]
    fn test_ties_break_by_dataset_id() {
        let records = compute_rank(
            &[snapshot(9, false, 5), snapshot(4, false, 5)],
            now(),
        );
        assert_eq!(records[0].dataset_id, 4);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[1].dataset_id, 9);
        assert_eq!(records[1].rank, 2);
    }

    #[test]
    fn test_unchanged_ranks_not_emitted() {
        let stable = DatasetSnapshot {
            dataset_id: 1,
            completed: false,
            event_count: 10,
            current_rank: Some(1),
        };
        let moved = DatasetSnapshot {
            dataset_id: 2,
            completed: false,
            event_count: 5,
            current_rank: Some(7),
        };

        let records = compute_rank(&[stable, moved], now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dataset_id, 2);
        assert_eq!(records[0].db_rank, Some(7));
        assert_eq!(records[0].rank, 2);
    }

    #[test]
    fn test_second_pass_emits_nothing() {
        let mut datasets = vec![
            snapshot(1, false, 10),
            snapshot(2, true, 50),
            snapshot(3, false, 2),
        ];

        let first = compute_rank(&datasets, now());
        assert_eq!(first.len(), 3);

        // Apply the emitted ranks as the new current state.
        for record in &first {
            let dataset = datasets
                .iter_mut()
                .find(|d| d.dataset_id == record.dataset_id)
                .unwrap();
            dataset.current_rank = Some(record.rank);
        }

        let second = compute_rank(&datasets, now());
        assert!(second.is_empty());
    }

    #[test]
    fn test_batch_shares_ranking_id_and_timestamp() {
        let ts = now();
        let records = compute_rank(&[snapshot(1, false, 1), snapshot(2, false, 2)], ts);
        assert!(records.iter().all(|r| r.ranking_id == "20250801"));
        assert!(records.iter().all(|r| r.updated_at == ts));
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(compute_rank(&[], now()).is_empty());
    }

    proptest! {
        /// Ranks form a dense permutation 1..N and incomplete datasets
        /// always precede complete ones regardless of popularity.
        #[test]
        fn prop_dense_permutation_incomplete_first(
            entries in proptest::collection::vec(
                (1i64..500, any::<bool>(), 0i64..10_000),
                0..60,
            )
        ) {
            // Distinct dataset ids.
            let mut seen = HashSet::new();
            let datasets: Vec<DatasetSnapshot> = entries
                .into_iter()
                .filter(|(id, _, _)| seen.insert(*id))
                .map(|(id, completed, events)| snapshot(id, completed, events))
                .collect();

            let records = compute_rank(&datasets, now());

            // No prior ranks, so every dataset is emitted exactly once.
            prop_assert_eq!(records.len(), datasets.len());

            let mut ranks: Vec<i32> = records.iter().map(|r| r.rank).collect();
            ranks.sort_unstable();
            let expected: Vec<i32> = (1..=datasets.len() as i32).collect();
            prop_assert_eq!(ranks, expected);

            let worst_incomplete = records
                .iter()
                .filter(|r| {
                    !datasets.iter().find(|d| d.dataset_id == r.dataset_id).unwrap().completed
                })
                .map(|r| r.rank)
                .max();
            let best_complete = records
                .iter()
                .filter(|r| {
                    datasets.iter().find(|d| d.dataset_id == r.dataset_id).unwrap().completed
                })
                .map(|r| r.rank)
                .min();

            if let (Some(worst), Some(best)) = (worst_incomplete, best_complete) {
                prop_assert!(worst < best);
            }
        }
    }

    #[test]
    fn test_locator_completion_vacuous_for_empty_dataset() {
        let policy = LocatorCompletion;
        assert!(policy.is_complete(0, 0));
        assert!(policy.is_complete(3, 3));
        assert!(!policy.is_complete(3, 2));
    }
}
