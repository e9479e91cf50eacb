use dashmap::DashMap;
use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// Shared metrics aggregator, mutated by every user loop. Latencies are
/// recorded in microseconds.
#[derive(Debug)]
pub struct Stats {
    pub users: AtomicU64,
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_bytes_received: AtomicU64,
    pub errors_map: DashMap<String, u64>,
    pub latency_histogram: Arc<Mutex<Histogram<u64>>>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            users: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_bytes_received: AtomicU64::new(0),
            errors_map: DashMap::new(),
            latency_histogram: Arc::new(Mutex::new(Histogram::new(3).unwrap_or_else(|_| {
                eprintln!("Failed to create histogram, using default");
                Histogram::new(2).expect("Failed to create fallback histogram")
            }))),
        }
    }

    pub fn inc_users(&self) {
        self.users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, error: String) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
        *self.errors_map.entry(error).or_insert(0) += 1;
    }

    pub fn merge(
        &self,
        requests: u64,
        bytes_received: u64,
        errors: &HashMap<String, u64>,
        histogram: &Histogram<u64>,
    ) {
        self.total_requests.fetch_add(requests, Ordering::Relaxed);
        self.total_bytes_received
            .fetch_add(bytes_received, Ordering::Relaxed);

        let error_count: u64 = errors.values().sum();
        self.total_errors.fetch_add(error_count, Ordering::Relaxed);

        for (k, v) in errors {
            *self.errors_map.entry(k.clone()).or_insert(0) += v;
        }

        if let Ok(mut h) = self.latency_histogram.lock() {
            let _ = h.add(histogram);
        }
    }

    pub fn snapshot(
        &self,
        duration: Duration,
        elapsed: Duration,
        rps_samples: Vec<f64>,
    ) -> StatsSnapshot {
        StatsSnapshot {
            duration,
            elapsed,
            users: self.users.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            total_bytes_received: self.total_bytes_received.load(Ordering::Relaxed),
            errors: self
                .errors_map
                .iter()
                .map(|r| (r.key().clone(), *r.value()))
                .collect(),
            latency_histogram: if let Ok(hist) = self.latency_histogram.lock() {
                hist.clone()
            } else {
                Histogram::new(3).unwrap_or_else(|_| {
                    Histogram::new(2).expect("Failed to create fallback histogram")
                })
            },
            rps_samples,
        }
    }
}

/// Per-user buffer merged into the shared [`Stats`] about once a second to
/// keep lock traffic off the request path.
pub(crate) struct LocalStats {
    pub requests: AtomicU64,
    pub bytes_received: AtomicU64,
    pub errors: Mutex<HashMap<String, u64>>,
    pub histogram: Mutex<Histogram<u64>>,
}

impl LocalStats {
    pub fn new() -> Option<Self> {
        Some(Self {
            requests: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            errors: Mutex::new(HashMap::new()),
            histogram: Mutex::new(Histogram::new(3).ok()?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub duration: Duration,
    pub elapsed: Duration,
    pub users: u64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_bytes_received: u64,
    pub errors: HashMap<String, u64>,
    pub latency_histogram: Histogram<u64>,
    pub rps_samples: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_totals_and_errors() {
        let stats = Stats::new();
        let mut errors = HashMap::new();
        errors.insert("Request timeout".to_owned(), 2);
        let mut hist = Histogram::<u64>::new(3).expect("failed to create histogram");
        hist.record(1500).expect("failed to record");

        stats.merge(10, 4096, &errors, &hist);
        stats.merge(5, 1024, &HashMap::new(), &hist);

        let snap = stats.snapshot(
            Duration::from_secs(10),
            Duration::from_secs(10),
            Vec::new(),
        );
        assert_eq!(snap.total_requests, 15);
        assert_eq!(snap.total_bytes_received, 5120);
        assert_eq!(snap.total_errors, 2);
        assert_eq!(snap.errors.get("Request timeout"), Some(&2));
        assert_eq!(snap.latency_histogram.len(), 2);
    }

    #[test]
    fn record_error_counts_per_description() {
        let stats = Stats::new();
        stats.record_error("boom".to_owned());
        stats.record_error("boom".to_owned());
        stats.record_error("other".to_owned());

        let snap = stats.snapshot(Duration::ZERO, Duration::ZERO, Vec::new());
        assert_eq!(snap.total_errors, 3);
        assert_eq!(snap.errors.get("boom"), Some(&2));
        assert_eq!(snap.errors.get("other"), Some(&1));
    }
}
