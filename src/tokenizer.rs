//! Token estimation for batch sizing.
//!
//! Batch planning only needs an upper-bound estimate, so a character-count
//! heuristic is an acceptable fallback when no tokenizer is available.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

/// Conservative characters-per-token ratio for the heuristic fallback.
pub const FALLBACK_CHARS_PER_TOKEN: f64 = 3.5;

/// Estimate the token count of a string.
pub trait TokenEstimate: Send + Sync {
    fn estimate_tokens(&self, text: &str) -> usize;
}

/// Tokenizer encoding selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    O200kBase,
    Cl100kBase,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "o200k_base" => Ok(Encoding::O200kBase),
            "cl100k_base" => Ok(Encoding::Cl100kBase),
            other => Err(format!(
                "unknown encoding {other:?} (expected \"o200k_base\" or \"cl100k_base\")"
            )),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::O200kBase => write!(f, "o200k_base"),
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
        }
    }
}

static O200K: Lazy<Arc<CoreBPE>> =
    Lazy::new(|| Arc::new(o200k_base().expect("o200k_base tables ship with tiktoken-rs")));
static CL100K: Lazy<Arc<CoreBPE>> =
    Lazy::new(|| Arc::new(cl100k_base().expect("cl100k_base tables ship with tiktoken-rs")));

/// BPE-backed token estimator.
#[derive(Clone)]
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl std::fmt::Debug for TiktokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenEstimator").finish()
    }
}

impl TiktokenEstimator {
    pub fn new(encoding: Encoding) -> Self {
        let bpe = match encoding {
            Encoding::O200kBase => O200K.clone(),
            Encoding::Cl100kBase => CL100K.clone(),
        };
        Self { bpe }
    }
}

impl TokenEstimate for TiktokenEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Character-count heuristic used when no tokenizer capability is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimate for HeuristicEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        (text.len() as f64 / FALLBACK_CHARS_PER_TOKEN).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_rounds_up() {
        let est = HeuristicEstimator;
        assert_eq!(est.estimate_tokens(""), 0);
        assert_eq!(est.estimate_tokens("abc"), 1);
        assert_eq!(est.estimate_tokens("abcd"), 2);
        assert_eq!(est.estimate_tokens(&"x".repeat(35)), 10);
    }

    #[test]
    fn tiktoken_counts_tokens() {
        let est = TiktokenEstimator::new(Encoding::O200kBase);
        let n = est.estimate_tokens("The quick brown fox jumps over the lazy dog.");
        assert!(n > 0);
        assert!(n < 20);
    }

    #[test]
    fn encoding_parses() {
        assert_eq!("o200k_base".parse::<Encoding>().unwrap(), Encoding::O200kBase);
        assert_eq!(
            "cl100k_base".parse::<Encoding>().unwrap(),
            Encoding::Cl100kBase
        );
        assert!("p50k_base".parse::<Encoding>().is_err());
    }
}
