use std::time::Duration;

mod error;
mod payload;
mod runner;
mod scenario;
mod stats;
mod worker;

pub use error::*;
pub use payload::{CONDITIONS, PLACES, WeatherReading};
pub use scenario::{Action, Scenario, TaskSpec};
pub use stats::StatsSnapshot;

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub duration: Duration,
    pub users: u64, // Target number of simulated users
    pub start_users: u64,
    pub ramp_up: Option<Duration>,
    pub scenario: Scenario,
}

pub async fn run_load<F>(config: LoadConfig, on_progress: Option<F>) -> error::Result<StatsSnapshot>
where
    F: FnMut(StatsSnapshot) + Send + 'static,
{
    runner::run_load(config, on_progress).await
}

pub async fn run_iterations(scenario: Scenario, iterations: u64) -> error::Result<StatsSnapshot> {
    runner::run_iterations(scenario, iterations).await
}
