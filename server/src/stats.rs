//! Request statistics and per-handler counters for the debug endpoints.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Named monotonically increasing counters (`n_index`, `n_add`, ...).
#[derive(Debug, Default)]
pub struct Counters {
    values: Mutex<BTreeMap<&'static str, u64>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, name: &'static str) {
        *self.values.lock().entry(name).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.values
            .lock()
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }
}

/// Totals collected by the `track` middleware.
#[derive(Debug)]
pub struct Stats {
    started: Instant,
    total_count: AtomicU64,
    total_micros: AtomicU64,
    status_codes: Mutex<BTreeMap<u16, u64>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub pid: u32,
    pub uptime_sec: f64,
    pub total_count: u64,
    pub status_code_count: BTreeMap<String, u64>,
    pub total_response_time_sec: f64,
    pub average_response_time_sec: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            total_count: AtomicU64::new(0),
            total_micros: AtomicU64::new(0),
            status_codes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record(&self, status: StatusCode, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        *self.status_codes.lock().entry(status.as_u16()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_count = self.total_count.load(Ordering::Relaxed);
        let total = Duration::from_micros(self.total_micros.load(Ordering::Relaxed)).as_secs_f64();
        let average = if total_count == 0 {
            0.0
        } else {
            total / total_count as f64
        };

        StatsSnapshot {
            pid: std::process::id(),
            uptime_sec: self.started.elapsed().as_secs_f64(),
            total_count,
            status_code_count: self
                .status_codes
                .lock()
                .iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect(),
            total_response_time_sec: total,
            average_response_time_sec: average,
        }
    }
}

/// Middleware recording status and latency of every response.
pub async fn track(State(stats): State<Arc<Stats>>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    stats.record(response.status(), start.elapsed());
    response
}
