//! Engine configuration and defaults.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_TOKENS: usize = 128_000;
pub const DEFAULT_MAX_TRIALS: usize = 50;
pub const DEFAULT_MIN_TRIALS: usize = 5;
pub const DEFAULT_STABLE_TRIALS: usize = 5;
pub const DEFAULT_ELBOW_TOLERANCE: f64 = 0.05;
pub const DEFAULT_REFINEMENT_RATIO: f64 = 0.5;
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Smallest meaningful batch: a single item carries no ordering signal.
pub const MIN_BATCH_SIZE: usize = 2;

/// How the relevance cliff is located in the sorted score curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElbowMethod {
    /// Maximum discrete second difference, gated by a noise floor.
    #[default]
    Curvature,
    /// Maximum perpendicular distance from the normalized endpoint line.
    Perpendicular,
}

impl FromStr for ElbowMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "curvature" => Ok(ElbowMethod::Curvature),
            "perpendicular" => Ok(ElbowMethod::Perpendicular),
            other => Err(format!(
                "unknown elbow method {other:?} (expected \"curvature\" or \"perpendicular\")"
            )),
        }
    }
}

impl fmt::Display for ElbowMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElbowMethod::Curvature => write!(f, "curvature"),
            ElbowMethod::Perpendicular => write!(f, "perpendicular"),
        }
    }
}

/// How batch keys omitted from a reply are treated.
///
/// Appending keeps every live document exposed each trial but biases omitted
/// documents toward the tail positions; excluding skips their score update
/// for that batch entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Append omitted keys after the reply, in original batch order.
    #[default]
    AppendInOrder,
    /// Leave omitted keys out of that batch's score update.
    Exclude,
}

impl FromStr for MissingKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(MissingKeyPolicy::AppendInOrder),
            "exclude" => Ok(MissingKeyPolicy::Exclude),
            other => Err(format!(
                "unknown missing-key policy {other:?} (expected \"append\" or \"exclude\")"
            )),
        }
    }
}

impl fmt::Display for MissingKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingKeyPolicy::AppendInOrder => write!(f, "append"),
            MissingKeyPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

/// Full configuration for a ranking run.
///
/// Validated by the ranker at construction; see `ranker::validate_config`.
#[derive(Debug, Clone)]
pub struct RankConfig {
    /// The caller's ranking instruction, prepended to every batch prompt.
    pub initial_prompt: String,
    /// Upper bound on items per batch.
    pub batch_size: usize,
    /// Upper bound on estimated prompt tokens per batch.
    pub batch_tokens: usize,
    /// Absolute trial cap across all rounds.
    pub max_trials: usize,
    /// Trials per round before convergence is considered.
    pub min_trials: usize,
    /// Window of recent trials inspected by the convergence test.
    pub stable_trials: usize,
    /// Maximum normalized-elbow spread within the window to declare convergence.
    pub elbow_tolerance: f64,
    pub elbow_method: ElbowMethod,
    /// Fraction of documents kept at each convergence; 0 disables refinement.
    pub refinement_ratio: f64,
    /// Global cap on concurrent provider calls.
    pub concurrency: usize,
    /// When false, every round runs to the trial cap.
    pub enable_convergence: bool,
    /// Ask the model to justify each surviving item after ranking.
    pub relevance: bool,
    /// Skip ranking entirely; every document survives and gets a justification.
    pub relevance_only: bool,
    /// Log intended calls and synthesize shuffled orderings instead of
    /// contacting the provider.
    pub dry_run: bool,
    pub missing_key_policy: MissingKeyPolicy,
    /// Seed for trial shuffles and dry-run orderings. Random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            initial_prompt: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_tokens: DEFAULT_BATCH_TOKENS,
            max_trials: DEFAULT_MAX_TRIALS,
            min_trials: DEFAULT_MIN_TRIALS,
            stable_trials: DEFAULT_STABLE_TRIALS,
            elbow_tolerance: DEFAULT_ELBOW_TOLERANCE,
            elbow_method: ElbowMethod::default(),
            refinement_ratio: DEFAULT_REFINEMENT_RATIO,
            concurrency: DEFAULT_CONCURRENCY,
            enable_convergence: true,
            relevance: false,
            relevance_only: false,
            dry_run: false,
            missing_key_policy: MissingKeyPolicy::default(),
            rng_seed: None,
        }
    }
}
