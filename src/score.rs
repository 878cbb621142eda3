//! Mean-rank score ledger and the global ordering derived from it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::document::Document;

/// Per-document accumulation across trials.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerEntry {
    pub rank_sum: u64,
    pub exposure: u32,
    pub last_seen_trial: usize,
}

impl LedgerEntry {
    /// Mean returned rank; lower is more relevant.
    pub fn score(&self) -> f64 {
        self.rank_sum as f64 / self.exposure.max(1) as f64
    }
}

/// A document with its current score, as produced by [`ScoreLedger::ordering`].
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc: Arc<Document>,
    pub score: f64,
    pub exposure: u32,
}

/// Global per-document score state. One entry per live document; the ranker
/// serializes all mutation behind a single mutex.
#[derive(Debug, Default)]
pub struct ScoreLedger {
    entries: HashMap<String, LedgerEntry>,
}

impl ScoreLedger {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keys
                .into_iter()
                .map(|k| (k.into(), LedgerEntry::default()))
                .collect(),
        }
    }

    /// Apply one accepted ranking: position i (1-based) adds i to the rank
    /// sum and bumps exposure. Keys not in the ledger are ignored.
    pub fn apply_ranking(&mut self, keys: &[String], trial: usize) {
        for (i, key) in keys.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.rank_sum += (i + 1) as u64;
                entry.exposure += 1;
                entry.last_seen_trial = trial;
            }
        }
    }

    pub fn entry(&self, key: &str) -> Option<LedgerEntry> {
        self.entries.get(key).copied()
    }

    /// Drop everything except `keep` (refinement cut).
    pub fn retain_keys(&mut self, keep: &HashSet<String>) {
        self.entries.retain(|key, _| keep.contains(key));
    }

    /// Sort `docs` by score ascending, ties broken by exposure descending
    /// (more-observed wins) then key ascending.
    pub fn ordering(&self, docs: &[Arc<Document>]) -> Vec<ScoredDocument> {
        let mut scored: Vec<ScoredDocument> = docs
            .iter()
            .map(|doc| {
                let entry = self.entry(&doc.key).unwrap_or_default();
                ScoredDocument {
                    doc: doc.clone(),
                    score: entry.score(),
                    exposure: entry.exposure,
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| b.exposure.cmp(&a.exposure))
                .then_with(|| a.doc.key.cmp(&b.doc.key))
        });
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: &str) -> Arc<Document> {
        Arc::new(Document::from_text(value))
    }

    fn keys(docs: &[Arc<Document>]) -> Vec<String> {
        docs.iter().map(|d| d.key.clone()).collect()
    }

    #[test]
    fn score_is_mean_rank() {
        let docs = vec![doc("a"), doc("b")];
        let mut ledger = ScoreLedger::new(keys(&docs));

        ledger.apply_ranking(&keys(&docs), 1);
        let reversed: Vec<String> = keys(&docs).into_iter().rev().collect();
        ledger.apply_ranking(&reversed, 2);

        // Each document saw ranks 1 and 2 once.
        for d in &docs {
            let entry = ledger.entry(&d.key).unwrap();
            assert_eq!(entry.exposure, 2);
            assert_eq!(entry.rank_sum, 3);
            assert!((entry.score() - 1.5).abs() < 1e-12);
            assert_eq!(entry.last_seen_trial, 2);
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let docs = vec![doc("a")];
        let mut ledger = ScoreLedger::new(keys(&docs));
        ledger.apply_ranking(&["feedf00d".to_string(), docs[0].key.clone()], 1);
        let entry = ledger.entry(&docs[0].key).unwrap();
        assert_eq!(entry.rank_sum, 2);
        assert_eq!(entry.exposure, 1);
    }

    #[test]
    fn ordering_breaks_ties_by_exposure_then_key() {
        let docs = vec![doc("a"), doc("b"), doc("c")];
        let (a, b, c) = (&docs[0].key, &docs[1].key, &docs[2].key);
        let mut ledger = ScoreLedger::new(keys(&docs));

        // a: ranks 2,2 (score 2.0, exposure 2); b: rank 2 once (score 2.0,
        // exposure 1); c: rank 1 three times (score 1.0).
        ledger.apply_ranking(&[c.clone(), a.clone()], 1);
        ledger.apply_ranking(&[c.clone(), b.clone()], 2);
        ledger.apply_ranking(&[c.clone(), a.clone()], 3);

        let ordering = ledger.ordering(&docs);
        let got: Vec<&str> = ordering.iter().map(|s| s.doc.key.as_str()).collect();
        assert_eq!(got, vec![c.as_str(), a.as_str(), b.as_str()]);
    }

    #[test]
    fn equal_scores_and_exposures_sort_by_key() {
        let docs = vec![doc("a"), doc("b")];
        let mut ledger = ScoreLedger::new(keys(&docs));
        ledger.apply_ranking(&keys(&docs), 1);
        let reversed: Vec<String> = keys(&docs).into_iter().rev().collect();
        ledger.apply_ranking(&reversed, 2);

        let ordering = ledger.ordering(&docs);
        let mut sorted_keys = keys(&docs);
        sorted_keys.sort();
        let got: Vec<String> = ordering.iter().map(|s| s.doc.key.clone()).collect();
        assert_eq!(got, sorted_keys);
    }

    #[test]
    fn retain_drops_cut_documents() {
        let docs = vec![doc("a"), doc("b")];
        let mut ledger = ScoreLedger::new(keys(&docs));
        let keep: HashSet<String> = [docs[0].key.clone()].into_iter().collect();
        ledger.retain_keys(&keep);
        assert!(ledger.entry(&docs[0].key).is_some());
        assert!(ledger.entry(&docs[1].key).is_none());
    }
}
