#![forbid(unsafe_code)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ordinal_harness::config::{self, ElbowMethod, MissingKeyPolicy, RankConfig};
use ordinal_harness::gateway::{
    build_provider, parse_compare_models, CompletionProvider, MeteredProvider, MetricsCollector,
    ProviderOptions, ProviderSpec, ProviderTokenEstimator, RoundRobinSelector,
};
use ordinal_harness::loader;
use ordinal_harness::ranker::Ranker;
use ordinal_harness::tokenizer::{Encoding, TiktokenEstimator};
use ordinal_harness::trace::{JsonlTraceSink, TraceSink};

#[derive(Parser)]
#[command(
    name = "ordinal",
    version,
    about = "Rank documents with an LLM via shuffled batch trials"
)]
struct Cli {
    /// Input file or directory
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Force JSON parsing regardless of file extension
    #[arg(long)]
    json: bool,

    /// Write the ranked JSON output to this file as well
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Glob pattern for files when the input is a directory
    #[arg(long, default_value = "*")]
    pattern: String,

    /// Ranking instruction (prefix with @ to read from a file)
    #[arg(short = 'p', long)]
    prompt: String,

    /// Template applied to each input object
    #[arg(long, default_value = loader::DEFAULT_TEMPLATE)]
    template: String,

    /// Number of items per batch
    #[arg(short = 'b', long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Maximum number of ranking trials
    #[arg(long, default_value_t = config::DEFAULT_MAX_TRIALS)]
    max_trials: usize,

    /// Max concurrent LLM calls across all trials
    #[arg(short = 'c', long, default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Max prompt tokens per batch
    #[arg(long = "tokens", default_value_t = config::DEFAULT_BATCH_TOKENS)]
    batch_tokens: usize,

    /// Refinement ratio (0.0-1.0, e.g. 0.5 = keep top 50%; 0 disables)
    #[arg(long = "ratio", default_value_t = config::DEFAULT_REFINEMENT_RATIO)]
    refinement_ratio: f64,

    /// Provider for single-model runs: openai, openrouter, anthropic, ollama
    #[arg(long, default_value = "openai")]
    provider: String,

    /// Model name
    #[arg(short = 'm', long, default_value = "gpt-4o-mini")]
    model: String,

    /// API base URL override (for compatible APIs like vLLM)
    #[arg(short = 'u', long)]
    base_url: Option<String>,

    /// Tokenizer encoding
    #[arg(long, default_value = "o200k_base")]
    encoding: String,

    /// Compare multiple models (format: "provider:model,provider:model")
    #[arg(long)]
    compare: Option<String>,

    /// Disable early stopping based on convergence
    #[arg(long)]
    no_converge: bool,

    /// Elbow position tolerance (0.05 = 5%)
    #[arg(long, default_value_t = config::DEFAULT_ELBOW_TOLERANCE)]
    elbow_tolerance: f64,

    /// Stable trials required for convergence
    #[arg(long, default_value_t = config::DEFAULT_STABLE_TRIALS)]
    stable_trials: usize,

    /// Minimum trials before checking convergence
    #[arg(long, default_value_t = config::DEFAULT_MIN_TRIALS)]
    min_trials: usize,

    /// Elbow detection method: curvature (default), perpendicular
    #[arg(long, default_value = "curvature")]
    elbow_method: String,

    /// Scoring for keys a reply omits: append (original order) or exclude
    #[arg(long, default_value = "append")]
    missing_keys: String,

    /// Seed for trial shuffles (random when unset)
    #[arg(long)]
    seed: Option<u64>,

    /// Log API calls without making them
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// Post-process each surviving item with a relevance justification
    #[arg(short = 'r', long)]
    relevance: bool,

    /// Skip ranking and only produce relevance justifications
    #[arg(long)]
    relevance_only: bool,

    /// Trace file path for streaming trial execution state (JSON Lines)
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write logs to file instead of stderr
    #[arg(long)]
    log: Option<PathBuf>,
}

fn init_logging(debug: bool, log: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_prompt(raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    match raw.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.log.as_deref())?;

    let encoding: Encoding = cli.encoding.parse()?;
    let elbow_method: ElbowMethod = cli.elbow_method.parse()?;
    let missing_key_policy: MissingKeyPolicy = cli.missing_keys.parse()?;
    let initial_prompt = load_prompt(&cli.prompt)?;

    let rank_config = RankConfig {
        initial_prompt,
        batch_size: cli.batch_size,
        batch_tokens: cli.batch_tokens,
        max_trials: cli.max_trials,
        min_trials: cli.min_trials,
        stable_trials: cli.stable_trials,
        elbow_tolerance: cli.elbow_tolerance,
        elbow_method,
        refinement_ratio: cli.refinement_ratio,
        concurrency: cli.concurrency,
        enable_convergence: !cli.no_converge,
        relevance: cli.relevance,
        relevance_only: cli.relevance_only,
        dry_run: cli.dry_run,
        missing_key_policy,
        rng_seed: cli.seed,
    };

    let documents = loader::load_documents(&cli.file, &cli.template, cli.json, &cli.pattern)?;

    let provider_options = ProviderOptions {
        base_url: cli.base_url.clone(),
        encoding,
        ..ProviderOptions::default()
    };

    let ranker = if cli.dry_run {
        Ranker::dry_run(rank_config)?.with_estimator(Arc::new(TiktokenEstimator::new(encoding)))
    } else if let Some(compare) = &cli.compare {
        let specs = parse_compare_models(compare)?;
        let providers = specs
            .iter()
            .map(|spec| build_provider(spec, &provider_options))
            .collect::<Result<Vec<_>, _>>()?;
        let metrics = Arc::new(MetricsCollector::new());
        let metered: Arc<dyn CompletionProvider> = Arc::new(MeteredProvider::new(
            RoundRobinSelector::new(providers)?,
            metrics.clone(),
        ));
        Ranker::new(rank_config, metered.clone())?
            .with_metrics(metrics)
            .with_estimator(Arc::new(ProviderTokenEstimator::new(metered)))
    } else {
        let spec = ProviderSpec::new(cli.provider.parse()?, &cli.model);
        let provider = build_provider(&spec, &provider_options)?;
        Ranker::new(rank_config, provider.clone())?
            .with_estimator(Arc::new(ProviderTokenEstimator::new(provider)))
    };

    let (trace_sink, trace_worker) = match &cli.trace {
        Some(path) => {
            let (sink, worker) = JsonlTraceSink::new(path)?;
            (Some(sink), Some(worker))
        }
        None => (None, None),
    };

    let result = ranker
        .rank_with_trace(
            documents,
            trace_sink.as_ref().map(|s| s as &dyn TraceSink),
            None,
        )
        .await;

    // Drop the sink so the worker drains before we touch the outcome.
    drop(trace_sink);
    if let Some(worker) = trace_worker {
        worker.join()?;
    }

    let outcome = result?;
    let json = serde_json::to_string_pretty(&outcome.results)?;
    if !cli.dry_run {
        println!("{json}");
    }
    if let Some(path) = &cli.output {
        std::fs::write(path, &json)?;
    }

    Ok(())
}
