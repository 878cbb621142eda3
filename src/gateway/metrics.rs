//! Per-call metrics and per-model aggregation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

/// Performance data for a single provider call.
#[derive(Debug, Clone)]
pub struct CallMetrics {
    /// Format: "provider:model".
    pub model_id: String,
    pub latency_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub success: bool,
    /// Error code when the call failed.
    pub error_kind: Option<String>,
}

/// Thread-safe collection of [`CallMetrics`].
#[derive(Debug, Default)]
pub struct MetricsCollector {
    inner: Mutex<Vec<CallMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metrics: CallMetrics) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(metrics);
    }

    pub fn snapshot(&self) -> Vec<CallMetrics> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Aggregate everything recorded so far, one entry per model, sorted by
    /// model id for deterministic output.
    pub fn aggregate(&self) -> Vec<ModelStats> {
        aggregate_by_model(&self.snapshot())
    }
}

/// Aggregated performance statistics for a single model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub model_id: String,
    pub call_count: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub total_tokens: u64,
}

pub fn aggregate_by_model(metrics: &[CallMetrics]) -> Vec<ModelStats> {
    let mut grouped: BTreeMap<&str, Vec<&CallMetrics>> = BTreeMap::new();
    for m in metrics {
        grouped.entry(m.model_id.as_str()).or_default().push(m);
    }

    grouped
        .into_iter()
        .map(|(model_id, group)| {
            let call_count = group.len();
            let success_count = group.iter().filter(|m| m.success).count();
            let error_count = call_count - success_count;
            let total_latency: u64 = group.iter().map(|m| m.latency_ms).sum();
            let total_tokens: u64 = group
                .iter()
                .map(|m| m.input_tokens + m.output_tokens)
                .sum();

            let mut latencies: Vec<u64> = group.iter().map(|m| m.latency_ms).collect();
            latencies.sort_unstable();

            ModelStats {
                model_id: model_id.to_string(),
                call_count,
                success_count,
                error_count,
                success_rate: success_count as f64 / call_count as f64,
                avg_latency_ms: total_latency / call_count as u64,
                p50_latency_ms: percentile(&latencies, 50.0),
                p95_latency_ms: percentile(&latencies, 95.0),
                p99_latency_ms: percentile(&latencies, 99.0),
                total_tokens,
            }
        })
        .collect()
}

/// Linear-interpolation percentile over sorted values: index = p/100 * (n-1).
fn percentile(sorted: &[u64], p: f64) -> u64 {
    match sorted.len() {
        0 => 0,
        1 => sorted[0],
        n => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lower = rank as usize;
            let upper = lower + 1;
            if upper >= n {
                return sorted[n - 1];
            }
            let fraction = rank - lower as f64;
            let interpolated =
                sorted[lower] as f64 + fraction * (sorted[upper] as f64 - sorted[lower] as f64);
            interpolated as u64
        }
    }
}
