//! Trial batch planning: balanced partitions under a token cap.
//!
//! Every trial shuffles the live documents with a trial-seeded permutation
//! and deals them round-robin into bins, so each document meets a fresh
//! neighborhood while every bin stays within one item of the others. Bins
//! are grown in count until each fits the token cap; past half the document
//! count a bin would hold a single item, which carries no ordering signal,
//! so planning fails instead.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::document::Document;
use crate::prompts::{ITEM_OVERHEAD_TOKENS, PROMPT_OVERHEAD_TOKENS};
use crate::tokenizer::TokenEstimate;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(
        "cannot fit {docs} documents under {limit} tokens per batch \
         (worst bin {worst} tokens at {bins} bins)"
    )]
    Oversize {
        docs: usize,
        bins: usize,
        limit: usize,
        worst: usize,
    },
}

/// An ordered slice of documents destined for one provider call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub items: Vec<Arc<Document>>,
    pub estimated_tokens: usize,
    pub trial: usize,
    pub round: usize,
}

/// Plans one trial's batches.
pub struct BatchPlanner<'a> {
    batch_size: usize,
    batch_tokens: usize,
    estimator: &'a dyn TokenEstimate,
}

impl<'a> BatchPlanner<'a> {
    pub fn new(batch_size: usize, batch_tokens: usize, estimator: &'a dyn TokenEstimate) -> Self {
        Self {
            batch_size,
            batch_tokens,
            estimator,
        }
    }

    /// Partition `docs` into batches for one trial.
    ///
    /// `min_bins` lets the scheduler retry a failed trial with a doubled
    /// partition count; pass 1 otherwise.
    pub fn plan(
        &self,
        docs: &[Arc<Document>],
        initial_prompt: &str,
        trial: usize,
        round: usize,
        seed: u64,
        min_bins: usize,
    ) -> Result<Vec<Batch>, BatchError> {
        let count = docs.len();
        let mut shuffled: Vec<Arc<Document>> = docs.to_vec();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

        let fixed_tokens =
            self.estimator.estimate_tokens(initial_prompt) + PROMPT_OVERHEAD_TOKENS;
        let item_tokens: Vec<usize> = shuffled
            .iter()
            .map(|d| {
                self.estimator.estimate_tokens(&d.value)
                    + self.estimator.estimate_tokens(&d.key)
                    + ITEM_OVERHEAD_TOKENS
            })
            .collect();

        // A bin of one item carries no ordering signal, so bins never exceed
        // half the document count. When the item count is not divisible, a
        // bin may hold one item more than `batch_size`.
        let max_bins = (count / 2).max(1);
        let initial = (count + self.batch_size - 1) / self.batch_size;
        let mut bins = initial.max(min_bins).clamp(1, max_bins);

        loop {
            let mut bin_tokens = vec![fixed_tokens; bins];
            for (i, tokens) in item_tokens.iter().enumerate() {
                bin_tokens[i % bins] += tokens;
            }
            let worst = bin_tokens.iter().copied().max().unwrap_or(fixed_tokens);

            if worst <= self.batch_tokens {
                let mut items: Vec<Vec<Arc<Document>>> = vec![Vec::new(); bins];
                for (i, doc) in shuffled.into_iter().enumerate() {
                    items[i % bins].push(doc);
                }
                return Ok(items
                    .into_iter()
                    .zip(bin_tokens)
                    .map(|(items, estimated_tokens)| Batch {
                        items,
                        estimated_tokens,
                        trial,
                        round,
                    })
                    .collect());
            }

            if bins >= max_bins {
                return Err(BatchError::Oversize {
                    docs: count,
                    bins,
                    limit: self.batch_tokens,
                    worst,
                });
            }
            bins += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::HeuristicEstimator;
    use std::collections::HashSet;

    fn docs(n: usize) -> Vec<Arc<Document>> {
        (0..n)
            .map(|i| Arc::new(Document::from_text(format!("document number {i}"))))
            .collect()
    }

    fn plan(
        docs: &[Arc<Document>],
        batch_size: usize,
        batch_tokens: usize,
        seed: u64,
    ) -> Result<Vec<Batch>, BatchError> {
        let estimator = HeuristicEstimator;
        BatchPlanner::new(batch_size, batch_tokens, &estimator)
            .plan(docs, "rank these", 1, 1, seed, 1)
    }

    #[test]
    fn exact_fit_produces_one_batch() {
        let docs = docs(10);
        let batches = plan(&docs, 10, 100_000, 7).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].items.len(), 10);
    }

    #[test]
    fn every_document_appears_exactly_once() {
        let docs = docs(23);
        let batches = plan(&docs, 5, 100_000, 7).unwrap();
        let mut seen = HashSet::new();
        for batch in &batches {
            for doc in &batch.items {
                assert!(seen.insert(doc.key.clone()));
            }
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn bin_sizes_differ_by_at_most_one() {
        let docs = docs(23);
        let batches = plan(&docs, 5, 100_000, 7).unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.items.len()).collect();
        let min = sizes.iter().min().unwrap();
        let max = sizes.iter().max().unwrap();
        assert!(max - min <= 1);
        assert!(*min >= 2);
    }

    #[test]
    fn token_cap_grows_bin_count() {
        let docs = docs(12);
        let roomy = plan(&docs, 12, 100_000, 7).unwrap();
        assert_eq!(roomy.len(), 1);
        // Small cap forces a finer partition while staying under it.
        let cramped = plan(&docs, 12, 100, 7).unwrap();
        assert!(cramped.len() > 1);
        for batch in &cramped {
            assert!(batch.estimated_tokens <= 100);
        }
    }

    #[test]
    fn impossible_cap_is_an_error() {
        let docs = docs(6);
        let err = plan(&docs, 3, 10, 7).unwrap_err();
        assert!(matches!(err, BatchError::Oversize { .. }));
    }

    #[test]
    fn shuffle_is_seed_deterministic() {
        let docs = docs(15);
        let a = plan(&docs, 4, 100_000, 42).unwrap();
        let b = plan(&docs, 4, 100_000, 42).unwrap();
        let c = plan(&docs, 4, 100_000, 43).unwrap();
        let keys = |batches: &[Batch]| -> Vec<String> {
            batches
                .iter()
                .flat_map(|b| b.items.iter().map(|d| d.key.clone()))
                .collect()
        };
        assert_eq!(keys(&a), keys(&b));
        assert_ne!(keys(&a), keys(&c));
    }

    #[test]
    fn min_bins_raises_partition_count() {
        let docs = docs(20);
        let estimator = HeuristicEstimator;
        let planner = BatchPlanner::new(10, 100_000, &estimator);
        let batches = planner.plan(&docs, "rank", 1, 1, 7, 4).unwrap();
        assert_eq!(batches.len(), 4);
    }
}
