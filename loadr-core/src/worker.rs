use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

use crate::payload::WeatherReading;
use crate::scenario::{Action, TaskSpec};
use crate::stats::{LocalStats, Stats};

/// Execution context of one simulated user: its own HTTP client, RNG and
/// local stats buffer. Requests are strictly sequential per user.
pub(crate) struct UserContext {
    user_id: u64,
    client: Client,
    base_url: String,
    stats: Arc<Stats>,
    local: LocalStats,
    rng: StdRng,
}

impl UserContext {
    pub fn new(client: Client, base_url: String, stats: Arc<Stats>, user_id: u64) -> Option<Self> {
        Some(Self {
            user_id,
            client,
            base_url,
            stats,
            local: LocalStats::new()?,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Uniformly random pause inside the scenario's wait range.
    pub fn pause_duration(&mut self, wait: (f64, f64)) -> Duration {
        let (min, max) = wait;
        if max <= min {
            return Duration::from_secs_f64(min.max(0.0));
        }
        Duration::from_secs_f64(self.rng.gen_range(min..=max))
    }

    pub fn flush_stats(&self) {
        let requests = self.local.requests.swap(0, Ordering::Relaxed);
        let bytes_received = self.local.bytes_received.swap(0, Ordering::Relaxed);

        let mut errors_guard = match self.local.errors.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        let mut histogram_guard = match self.local.histogram.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        if requests > 0
            || bytes_received > 0
            || !errors_guard.is_empty()
            || !histogram_guard.is_empty()
        {
            self.stats
                .merge(requests, bytes_received, &errors_guard, &histogram_guard);

            errors_guard.clear();
            histogram_guard.reset();
        }
    }

    /// Issue the HTTP call for one task and record the outcome. Failures are
    /// counted, never propagated: the user loop continues regardless.
    pub async fn execute(&mut self, task: &TaskSpec) {
        let (request, start) = match &task.action {
            Action::Get { path } => {
                let url = self.resolve_url(path);
                (self.client.get(url), Instant::now())
            }
            Action::PostWeather { path } => {
                let url = self.resolve_url(path);
                let reading = WeatherReading::sample(&mut self.rng);
                (self.client.post(url).json(&reading), Instant::now())
            }
        };

        let resp = request.send().await;
        self.process_response(resp, start).await;
    }

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn process_response(&self, resp: reqwest::Result<reqwest::Response>, start: Instant) {
        match resp {
            Ok(r) => {
                let status = r.status().as_u16();
                // Body + headers + status line approximation, as wrk reports it
                let headers_size = r
                    .headers()
                    .iter()
                    .map(|(k, v)| k.as_str().len() + v.len() + 4)
                    .sum::<usize>()
                    + 12;

                match r.bytes().await {
                    Ok(body) => {
                        self.local.requests.fetch_add(1, Ordering::Relaxed);
                        self.local
                            .bytes_received
                            .fetch_add((body.len() + headers_size) as u64, Ordering::Relaxed);
                        let duration = start.elapsed();
                        {
                            let mut hist =
                                self.local.histogram.lock().unwrap_or_else(|e| e.into_inner());
                            let _ = hist.record(duration.as_micros() as u64);
                        }

                        if !(200..400).contains(&status) {
                            let mut errors =
                                self.local.errors.lock().unwrap_or_else(|e| e.into_inner());
                            *errors
                                .entry("Non 2xx and non 3xx status code".to_owned())
                                .or_insert(0) += 1;
                        }
                    }
                    Err(e) => {
                        self.local.requests.fetch_add(1, Ordering::Relaxed);
                        let mut errors =
                            self.local.errors.lock().unwrap_or_else(|e| e.into_inner());
                        *errors
                            .entry(format!("Response processing error: {}", e))
                            .or_insert(0) += 1;
                    }
                }
            }
            Err(e) => {
                self.local.requests.fetch_add(1, Ordering::Relaxed);
                let mut errors = self.local.errors.lock().unwrap_or_else(|e| e.into_inner());
                if e.is_timeout() {
                    *errors.entry("Request timeout".to_owned()).or_insert(0) += 1;
                } else {
                    *errors.entry(format!("Request error: {}", e)).or_insert(0) += 1;
                }
            }
        }
    }
}
