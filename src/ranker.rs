//! Trial scheduler: drives shuffled ranking trials to convergence.
//!
//! Core loop:
//! 1. Plan a trial: shuffle the live documents and deal them into balanced
//!    batches under the token cap.
//! 2. Dispatch every batch through the provider under a global admission
//!    semaphore. Trials overlap through a small ordered pipeline, so the next
//!    trial's batches fill slots while the slowest batch of the previous one
//!    is still outstanding.
//! 3. As each accepted ordering arrives, fold it into the score ledger.
//! 4. When a trial's batches have all resolved, commit it: snapshot the
//!    ordering, locate the elbow, record the trial, emit a trace event, and
//!    ask the convergence monitor whether the elbow has stabilized.
//! 5. On convergence, cut to the top fraction and either start the
//!    refinement round or emit the survivors.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::stream::{self, FuturesOrdered, StreamExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::batch::{Batch, BatchError, BatchPlanner};
use crate::config::{RankConfig, MIN_BATCH_SIZE};
use crate::convergence::ConvergenceMonitor;
use crate::document::{Document, RankedDocument};
use crate::elbow::detect_elbow;
use crate::gateway::{
    CompletionProvider, CompletionRequest, MetricsCollector, ProviderError, TokenUsage,
};
use crate::prompts::{build_ranking_prompt, parse_ranking_reply, ranking_schema, ParseError};
use crate::relevance::annotate_survivors;
use crate::score::{ScoreLedger, ScoredDocument};
use crate::tokenizer::{HeuristicEstimator, TokenEstimate};
use crate::trace::{now_epoch_ms, TraceEvent, TraceRankEntry, TraceSink};

// =============================================================================
// Constants
// =============================================================================

/// Trials allowed in flight at once. The admission semaphore remains the
/// only real backpressure; overlap just amortizes provider latency tails.
const TRIAL_OVERLAP: usize = 2;

/// Re-prompts per batch per trial after an unparseable reply.
const MAX_PARSE_RETRIES: usize = 1;

/// Entries included in each trial trace event.
const TRACE_TOP_ENTRIES: usize = 10;

/// Output cap for a ranking reply.
const RANKING_MAX_OUTPUT_TOKENS: u32 = 1024;

// =============================================================================
// Error type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("invalid input: {0}")]
    InputInvalid(String),
    #[error("provider authentication failed: {0}")]
    ProviderAuth(#[source] ProviderError),
    #[error("cannot fit batches under the token budget: {0}")]
    BatchOversize(#[from] BatchError),
    #[error("trace error: {0}")]
    Trace(#[from] crate::trace::TraceError),
}

// =============================================================================
// Outcome types
// =============================================================================

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Elbow position stabilized within tolerance.
    Converged,
    /// Absolute trial cap reached.
    MaxTrials,
    /// External cancellation; the ordering is best-effort.
    Cancelled,
    /// No scoring ran (single document or relevance-only mode).
    NotRanked,
}

/// Snapshot of one committed trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub round: usize,
    pub live_documents: usize,
    pub elbow: Option<usize>,
    /// More than half of this trial's batches were dropped.
    pub degraded: bool,
    pub failed_batches: usize,
    pub total_batches: usize,
    pub usage: TokenUsage,
    pub wall_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankMeta {
    pub trials_run: usize,
    pub rounds: usize,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
    /// Set when the run was cancelled before finishing.
    pub incomplete: bool,
    pub trials: Vec<TrialRecord>,
}

#[derive(Debug)]
pub struct RankOutcome {
    /// Survivors sorted by rank ascending.
    pub results: Vec<RankedDocument>,
    pub meta: RankMeta,
}

// =============================================================================
// Validation
// =============================================================================

pub fn validate_config(config: &RankConfig) -> Result<(), RankError> {
    if config.initial_prompt.trim().is_empty() {
        return Err(RankError::InputInvalid(
            "initial prompt must not be empty".into(),
        ));
    }
    if config.batch_size < MIN_BATCH_SIZE {
        return Err(RankError::InputInvalid(format!(
            "batch_size must be >= {MIN_BATCH_SIZE}"
        )));
    }
    if config.batch_tokens == 0 {
        return Err(RankError::InputInvalid("batch_tokens must be >= 1".into()));
    }
    if config.max_trials == 0 {
        return Err(RankError::InputInvalid("max_trials must be >= 1".into()));
    }
    if config.min_trials == 0 || config.stable_trials == 0 {
        return Err(RankError::InputInvalid(
            "min_trials and stable_trials must be >= 1".into(),
        ));
    }
    if !(0.0..=1.0).contains(&config.elbow_tolerance) {
        return Err(RankError::InputInvalid(
            "elbow_tolerance must be in [0, 1]".into(),
        ));
    }
    if !(0.0..1.0).contains(&config.refinement_ratio) {
        return Err(RankError::InputInvalid(
            "refinement_ratio must be >= 0 and < 1".into(),
        ));
    }
    if config.concurrency == 0 {
        return Err(RankError::InputInvalid("concurrency must be >= 1".into()));
    }
    Ok(())
}

// =============================================================================
// Ranker
// =============================================================================

pub struct Ranker {
    config: RankConfig,
    provider: Option<Arc<dyn CompletionProvider>>,
    estimator: Arc<dyn TokenEstimate>,
    metrics: Option<Arc<MetricsCollector>>,
    seed: u64,
}

impl Ranker {
    pub fn new(
        config: RankConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, RankError> {
        Self::build(config, Some(provider))
    }

    /// A ranker that never contacts a provider; orderings are synthesized by
    /// shuffling each batch.
    pub fn dry_run(mut config: RankConfig) -> Result<Self, RankError> {
        config.dry_run = true;
        Self::build(config, None)
    }

    fn build(
        config: RankConfig,
        provider: Option<Arc<dyn CompletionProvider>>,
    ) -> Result<Self, RankError> {
        validate_config(&config)?;
        if provider.is_none() && !config.dry_run {
            return Err(RankError::InputInvalid(
                "a provider is required unless dry_run is set".into(),
            ));
        }
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        Ok(Self {
            config,
            provider,
            estimator: Arc::new(HeuristicEstimator),
            metrics: None,
            seed,
        })
    }

    /// Replace the default character-heuristic token estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimate>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Attach a metrics collector; enables `model_perf` trace events.
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn rank(&self, documents: Vec<Document>) -> Result<RankOutcome, RankError> {
        self.rank_with_trace(documents, None, None).await
    }

    /// Rank with optional trace streaming and cooperative cancellation.
    ///
    /// On cancellation no new batches are admitted, in-flight work drains
    /// naturally, and the best-effort ordering is returned with
    /// `meta.incomplete` set.
    pub async fn rank_with_trace(
        &self,
        documents: Vec<Document>,
        trace: Option<&dyn TraceSink>,
        cancel: Option<&AtomicBool>,
    ) -> Result<RankOutcome, RankError> {
        match self.rank_inner(documents, trace, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Some(trace) = trace {
                    let _ = trace.record(TraceEvent::Fatal {
                        timestamp_ms: now_epoch_ms(),
                        reason: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    async fn rank_inner(
        &self,
        documents: Vec<Document>,
        trace: Option<&dyn TraceSink>,
        cancel: Option<&AtomicBool>,
    ) -> Result<RankOutcome, RankError> {
        if documents.is_empty() {
            return Err(RankError::InputInvalid("document list is empty".into()));
        }
        let mut keys_seen: HashSet<&str> = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if !keys_seen.insert(doc.key.as_str()) {
                return Err(RankError::InputInvalid(format!(
                    "duplicate document key: {}",
                    doc.key
                )));
            }
        }

        let docs: Vec<Arc<Document>> = documents.into_iter().map(Arc::new).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        if self.config.relevance_only {
            let mut results = unranked_results(&docs);
            let usage = self.maybe_annotate(&mut results, &semaphore).await;
            return Ok(RankOutcome {
                results,
                meta: RankMeta {
                    trials_run: 0,
                    rounds: 0,
                    usage,
                    stop_reason: StopReason::NotRanked,
                    incomplete: false,
                    trials: Vec::new(),
                },
            });
        }

        if docs.len() < 2 {
            let mut results = unranked_results(&docs);
            let usage = self.maybe_annotate(&mut results, &semaphore).await;
            return Ok(RankOutcome {
                results,
                meta: RankMeta {
                    trials_run: 0,
                    rounds: 0,
                    usage,
                    stop_reason: StopReason::NotRanked,
                    incomplete: false,
                    trials: Vec::new(),
                },
            });
        }

        let ledger = Arc::new(Mutex::new(ScoreLedger::new(
            docs.iter().map(|d| d.key.clone()),
        )));
        let mut monitor = ConvergenceMonitor::new(
            self.config.enable_convergence,
            self.config.min_trials,
            self.config.stable_trials,
            self.config.elbow_tolerance,
        );

        let mut live: Vec<Arc<Document>> = docs;
        let mut records: Vec<TrialRecord> = Vec::new();
        let mut usage_total = TokenUsage::default();
        let mut round = 1usize;
        let mut trials_committed = 0usize;
        let mut incomplete = false;

        let stop_reason = 'rounds: loop {
            monitor.reset();
            let live_arc = Arc::new(live.clone());
            let mut pending = FuturesOrdered::new();
            let mut next_trial = trials_committed + 1;

            let round_end = loop {
                let cancelled = cancel
                    .map(|flag| flag.load(AtomicOrdering::Relaxed))
                    .unwrap_or(false);
                while !cancelled
                    && pending.len() < TRIAL_OVERLAP
                    && next_trial <= self.config.max_trials
                {
                    pending.push_back(self.run_trial(
                        next_trial,
                        round,
                        live_arc.clone(),
                        ledger.clone(),
                        semaphore.clone(),
                        cancel,
                    ));
                    next_trial += 1;
                }

                let Some(result) = pending.next().await else {
                    break if cancelled {
                        RoundEnd::Cancelled
                    } else {
                        RoundEnd::TrialCap
                    };
                };
                let outcome = result?;

                trials_committed += 1;
                usage_total.add(outcome.usage);

                let ordering = lock(&ledger).ordering(&live_arc);
                let scores: Vec<f64> = ordering.iter().map(|s| s.score).collect();
                let elbow = detect_elbow(&scores, self.config.elbow_method);

                let record = TrialRecord {
                    trial_index: outcome.trial_index,
                    round,
                    live_documents: live_arc.len(),
                    elbow,
                    degraded: outcome.failed_batches * 2 > outcome.total_batches,
                    failed_batches: outcome.failed_batches,
                    total_batches: outcome.total_batches,
                    usage: outcome.usage,
                    wall_time_ms: outcome.wall_time_ms,
                };
                if record.degraded {
                    warn!(
                        trial = record.trial_index,
                        failed = record.failed_batches,
                        total = record.total_batches,
                        "trial degraded: over half its batches were dropped"
                    );
                }

                if let Some(trace) = trace {
                    trace.record(TraceEvent::Trial {
                        timestamp_ms: now_epoch_ms(),
                        trial_index: record.trial_index,
                        round: record.round,
                        live_documents: record.live_documents,
                        elbow: record.elbow,
                        degraded: record.degraded,
                        failed_batches: record.failed_batches,
                        total_batches: record.total_batches,
                        usage: record.usage,
                        wall_time_ms: record.wall_time_ms,
                        top: ordering
                            .iter()
                            .take(TRACE_TOP_ENTRIES)
                            .map(|s| TraceRankEntry {
                                key: s.doc.key.clone(),
                                score: s.score,
                                exposure: s.exposure,
                            })
                            .collect(),
                    })?;
                    if let Some(metrics) = &self.metrics {
                        trace.record(TraceEvent::ModelPerf {
                            timestamp_ms: now_epoch_ms(),
                            models: metrics.aggregate(),
                        })?;
                    }
                }

                monitor.record(elbow, live_arc.len());
                records.push(record);

                let cancelled = cancel
                    .map(|flag| flag.load(AtomicOrdering::Relaxed))
                    .unwrap_or(false);
                if cancelled {
                    if pending.is_empty() {
                        break RoundEnd::Cancelled;
                    }
                    continue;
                }
                if monitor.converged() {
                    break RoundEnd::Converged;
                }
            };

            match round_end {
                RoundEnd::Converged => {
                    info!(
                        round,
                        trials = trials_committed,
                        live = live.len(),
                        "round converged"
                    );
                    if self.config.refinement_ratio == 0.0 {
                        break 'rounds StopReason::Converged;
                    }
                    // In-flight trials from this round are abandoned here;
                    // their partial ledger updates only concern documents
                    // that either survive or are cut wholesale.
                    drop(pending);
                    let ordering = lock(&ledger).ordering(&live);
                    let cutoff =
                        ((live.len() as f64 * self.config.refinement_ratio).floor() as usize)
                            .max(1);
                    let survivors: Vec<Arc<Document>> = ordering[..cutoff]
                        .iter()
                        .map(|s| s.doc.clone())
                        .collect();
                    let keep: HashSet<String> =
                        survivors.iter().map(|d| d.key.clone()).collect();
                    lock(&ledger).retain_keys(&keep);
                    live = survivors;
                    info!(round, survivors = live.len(), "refined to top fraction");

                    let full_round = round == 1;
                    if full_round && live.len() >= 2 && trials_committed < self.config.max_trials
                    {
                        round += 1;
                        continue 'rounds;
                    }
                    break 'rounds StopReason::Converged;
                }
                RoundEnd::TrialCap => break 'rounds StopReason::MaxTrials,
                RoundEnd::Cancelled => {
                    incomplete = true;
                    break 'rounds StopReason::Cancelled;
                }
            }
        };

        let ordering = lock(&ledger).ordering(&live);
        let mut results = ranked_results(ordering);
        if !incomplete {
            usage_total.add(self.maybe_annotate(&mut results, &semaphore).await);
        }

        Ok(RankOutcome {
            results,
            meta: RankMeta {
                trials_run: trials_committed,
                rounds: round,
                usage: usage_total,
                stop_reason,
                incomplete,
                trials: records,
            },
        })
    }

    async fn run_trial(
        &self,
        trial_index: usize,
        round: usize,
        live: Arc<Vec<Arc<Document>>>,
        ledger: Arc<Mutex<ScoreLedger>>,
        semaphore: Arc<Semaphore>,
        cancel: Option<&AtomicBool>,
    ) -> Result<TrialOutcome, RankError> {
        let started = Instant::now();
        let planner = BatchPlanner::new(
            self.config.batch_size,
            self.config.batch_tokens,
            self.estimator.as_ref(),
        );
        let seed = trial_seed(self.seed, trial_index);

        let batches = match planner.plan(
            &live,
            &self.config.initial_prompt,
            trial_index,
            round,
            seed,
            1,
        ) {
            Ok(batches) => batches,
            Err(BatchError::Oversize { bins, .. }) => {
                warn!(
                    trial = trial_index,
                    bins, "batch planning exceeded the token budget, retrying with doubled bins"
                );
                planner.plan(
                    &live,
                    &self.config.initial_prompt,
                    trial_index,
                    round,
                    seed,
                    bins.saturating_mul(2),
                )?
            }
        };
        let total_batches = batches.len();

        let results = stream::iter(batches.into_iter().enumerate().map(|(batch_index, batch)| {
            self.run_batch(
                trial_index,
                batch_index,
                batch,
                ledger.clone(),
                semaphore.clone(),
                cancel,
            )
        }))
        .buffer_unordered(self.config.concurrency.max(1))
        .collect::<Vec<Result<BatchOutcome, RankError>>>()
        .await;

        let mut usage = TokenUsage::default();
        let mut failed_batches = 0usize;
        for result in results {
            let outcome = result?;
            usage.add(outcome.usage);
            if !outcome.accepted {
                failed_batches += 1;
            }
        }

        Ok(TrialOutcome {
            trial_index,
            usage,
            failed_batches,
            total_batches,
            wall_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn run_batch(
        &self,
        trial_index: usize,
        batch_index: usize,
        batch: Batch,
        ledger: Arc<Mutex<ScoreLedger>>,
        semaphore: Arc<Semaphore>,
        cancel: Option<&AtomicBool>,
    ) -> Result<BatchOutcome, RankError> {
        let keys: Vec<String> = batch.items.iter().map(|d| d.key.clone()).collect();

        if self.config.dry_run {
            debug!(
                trial = trial_index,
                batch = batch_index,
                items = keys.len(),
                estimated_tokens = batch.estimated_tokens,
                "dry-run: skipping provider call"
            );
            let mut stub = keys;
            stub.shuffle(&mut StdRng::seed_from_u64(batch_seed(
                self.seed,
                trial_index,
                batch_index,
            )));
            lock(&ledger).apply_ranking(&stub, trial_index);
            return Ok(BatchOutcome {
                accepted: true,
                usage: TokenUsage::default(),
            });
        }

        let Some(provider) = &self.provider else {
            return Err(RankError::InputInvalid("no provider configured".into()));
        };

        let items: Vec<(&str, &str)> = batch
            .items
            .iter()
            .map(|d| (d.key.as_str(), d.value.as_str()))
            .collect();
        let request = CompletionRequest::new(build_ranking_prompt(
            &self.config.initial_prompt,
            &items,
        ))
        .schema(ranking_schema())
        .max_tokens(RANKING_MAX_OUTPUT_TOKENS);

        let mut usage = TokenUsage::default();
        let mut attempt = 0usize;
        loop {
            let cancelled = cancel
                .map(|flag| flag.load(AtomicOrdering::Relaxed))
                .unwrap_or(false);
            if cancelled {
                return Ok(BatchOutcome {
                    accepted: false,
                    usage,
                });
            }

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                return Ok(BatchOutcome {
                    accepted: false,
                    usage,
                });
            };
            let response = provider.complete(&request).await;
            drop(permit);

            match response {
                Ok(resp) => {
                    usage.add(resp.usage);
                    match parse_ranking_reply(
                        &resp.content,
                        &keys,
                        self.config.missing_key_policy,
                    ) {
                        Ok(ranking) => {
                            lock(&ledger).apply_ranking(&ranking, trial_index);
                            return Ok(BatchOutcome {
                                accepted: true,
                                usage,
                            });
                        }
                        Err(ParseError::EmptyRanking) => {
                            if attempt < MAX_PARSE_RETRIES {
                                debug!(
                                    trial = trial_index,
                                    batch = batch_index,
                                    "unparseable ranking reply, re-prompting"
                                );
                                attempt += 1;
                                continue;
                            }
                            warn!(
                                trial = trial_index,
                                batch = batch_index,
                                "ranking reply unusable after retry, dropping batch"
                            );
                        }
                    }
                }
                Err(err) if err.is_auth() => return Err(RankError::ProviderAuth(err)),
                Err(err) => {
                    // The gateway already exhausted network retries.
                    warn!(
                        trial = trial_index,
                        batch = batch_index,
                        error = %err,
                        "provider call failed, dropping batch"
                    );
                }
            }
            return Ok(BatchOutcome {
                accepted: false,
                usage,
            });
        }
    }

    async fn maybe_annotate(
        &self,
        results: &mut [RankedDocument],
        semaphore: &Arc<Semaphore>,
    ) -> TokenUsage {
        if !(self.config.relevance || self.config.relevance_only) || results.is_empty() {
            return TokenUsage::default();
        }
        if self.config.dry_run {
            debug!(
                survivors = results.len(),
                "dry-run: skipping relevance calls"
            );
            return TokenUsage::default();
        }
        let Some(provider) = &self.provider else {
            return TokenUsage::default();
        };
        annotate_survivors(
            provider.clone(),
            semaphore.clone(),
            &self.config.initial_prompt,
            self.config.concurrency,
            results,
        )
        .await
    }
}

// =============================================================================
// Internals
// =============================================================================

enum RoundEnd {
    Converged,
    TrialCap,
    Cancelled,
}

#[derive(Debug)]
struct TrialOutcome {
    trial_index: usize,
    usage: TokenUsage,
    failed_batches: usize,
    total_batches: usize,
    wall_time_ms: u64,
}

#[derive(Debug)]
struct BatchOutcome {
    accepted: bool,
    usage: TokenUsage,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn trial_seed(base: u64, trial: usize) -> u64 {
    base ^ (trial as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn batch_seed(base: u64, trial: usize, batch: usize) -> u64 {
    trial_seed(base, trial) ^ ((batch as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03))
}

fn ranked_results(ordering: Vec<ScoredDocument>) -> Vec<RankedDocument> {
    ordering
        .into_iter()
        .enumerate()
        .map(|(i, scored)| RankedDocument {
            key: scored.doc.key.clone(),
            value: scored.doc.value.clone(),
            object: scored.doc.object.clone(),
            score: scored.score,
            exposure: scored.exposure,
            rank: i + 1,
            relevance: None,
        })
        .collect()
}

fn unranked_results(docs: &[Arc<Document>]) -> Vec<RankedDocument> {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| RankedDocument {
            key: doc.key.clone(),
            value: doc.value.clone(),
            object: doc.object.clone(),
            score: 0.0,
            exposure: 0,
            rank: i + 1,
            relevance: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankConfig;

    fn base_config() -> RankConfig {
        RankConfig {
            initial_prompt: "rank by relevance".to_string(),
            ..RankConfig::default()
        }
    }

    #[test]
    fn validate_accepts_defaults_with_prompt() {
        validate_config(&base_config()).unwrap();
    }

    #[test]
    fn validate_rejects_empty_prompt() {
        let mut config = base_config();
        config.initial_prompt = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(RankError::InputInvalid(_))
        ));
    }

    #[test]
    fn validate_rejects_tiny_batches() {
        let mut config = base_config();
        config.batch_size = 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validate_rejects_full_refinement_ratio() {
        let mut config = base_config();
        config.refinement_ratio = 1.0;
        assert!(validate_config(&config).is_err());
        config.refinement_ratio = 0.99;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency_and_trials() {
        let mut config = base_config();
        config.concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = base_config();
        config.max_trials = 0;
        assert!(validate_config(&config).is_err());

        let mut config = base_config();
        config.stable_trials = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_tolerance() {
        let mut config = base_config();
        config.elbow_tolerance = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn seeds_are_deterministic_and_distinct() {
        assert_eq!(trial_seed(7, 3), trial_seed(7, 3));
        assert_ne!(trial_seed(7, 3), trial_seed(7, 4));
        assert_ne!(trial_seed(7, 3), trial_seed(8, 3));
        assert_ne!(batch_seed(7, 3, 0), batch_seed(7, 3, 1));
        assert_ne!(batch_seed(7, 3, 0), trial_seed(7, 3));
    }

    #[test]
    fn dry_run_requires_no_provider() {
        let ranker = Ranker::dry_run(base_config());
        assert!(ranker.is_ok());
    }
}
