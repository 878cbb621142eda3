#![forbid(unsafe_code)]

//! # ordinal-harness
//!
//! Rank a pile of opaque documents against a natural-language instruction
//! using an LLM as the comparison oracle.
//!
//! Asking a model to order thousands of items in one shot is hopeless, so the
//! engine runs stochastic trials instead: each trial shuffles the live
//! documents into small batches, asks the model to order every batch, and
//! folds the returned positions into a per-document mean-rank score. An elbow
//! detector finds the relevance cliff in the sorted score curve, and trials
//! stop once the cliff stops moving. An optional refinement round re-ranks
//! the surviving top fraction for better resolution at the head of the list.

pub mod batch;
pub mod config;
pub mod convergence;
pub mod document;
pub mod elbow;
pub mod gateway;
pub mod loader;
pub mod prompts;
pub mod ranker;
pub mod relevance;
pub mod score;
pub mod tokenizer;
pub mod trace;

pub use config::{ElbowMethod, MissingKeyPolicy, RankConfig};
pub use document::{Document, RankedDocument};
pub use gateway::{
    CompletionProvider, CompletionRequest, CompletionResponse, MetricsCollector, ModelStats,
    ProviderError, TokenUsage,
};
pub use ranker::{RankError, RankMeta, RankOutcome, Ranker, StopReason, TrialRecord};
pub use trace::{JsonlTraceSink, TraceError, TraceEvent, TraceSink, TraceWorker};
