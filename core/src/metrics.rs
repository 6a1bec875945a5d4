use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct SearchMetrics {
    total_searches: u64,
    failed_searches: u64,
    total_nodes: u64,
    latencies: VecDeque<u64>, // microseconds
}

struct MetricsState {
    search_metrics: SearchMetrics,
    max_history: usize,
}

/// Thread-safe recorder for search outcomes. Clones share the same state.
#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                search_metrics: SearchMetrics::default(),
                max_history: max_history.max(1),
            })),
        }
    }

    pub fn record_search(&self, latency_us: u64, node_count: usize) {
        let mut state = self.lock();
        state.search_metrics.total_searches += 1;
        state.search_metrics.total_nodes += node_count as u64;
        push_latency(&mut state, latency_us);
    }

    pub fn record_failure(&self, latency_us: u64) {
        let mut state = self.lock();
        state.search_metrics.total_searches += 1;
        state.search_metrics.failed_searches += 1;
        push_latency(&mut state, latency_us);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let m = &state.search_metrics;

        let mut sorted_latencies: Vec<u64> = m.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let succeeded = m.total_searches - m.failed_searches;
        let failure_rate = if m.total_searches > 0 {
            m.failed_searches as f32 / m.total_searches as f32
        } else {
            0.0
        };
        let avg_nodes = if succeeded > 0 {
            m.total_nodes as f32 / succeeded as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            total_searches: m.total_searches,
            failed_searches: m.failed_searches,
            failure_rate,
            avg_nodes,
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: m.latencies.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Every update completes under the lock, so a poisoned state is still consistent.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn push_latency(state: &mut MetricsState, latency_us: u64) {
    state.search_metrics.latencies.push_back(latency_us);
    if state.search_metrics.latencies.len() > state.max_history {
        state.search_metrics.latencies.pop_front();
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_searches: u64,
    pub failed_searches: u64,
    pub failure_rate: f32,
    pub avg_nodes: f32,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
}
