use serde::Serialize;
use std::collections::HashMap;

/// One progress line of `--output json` mode, emitted once a second.
#[derive(Debug, Serialize)]
pub struct JsonStats {
    pub elapsed_secs: u64,
    pub users: u64,
    pub requests_per_sec: f64,
    pub bytes_per_sec: u64,
    pub total_requests: u64,
    pub total_bytes: u64,
    pub total_errors: u64,
    pub latency_mean: f64,
    pub latency_stdev: f64,
    pub latency_max: u64,
    pub latency_p50: u64,
    pub latency_p75: u64,
    pub latency_p90: u64,
    pub latency_p99: u64,
    pub latency_stdev_pct: f64,
    pub latency_distribution: Vec<(u8, u64)>,
    pub errors: HashMap<String, u64>,
    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,
    pub req_per_sec_stdev_pct: f64,
}
