use crate::LoadConfig;
use crate::error::{Error, Result};
use crate::scenario::{Scenario, TaskPicker};
use crate::stats::{Stats, StatsSnapshot};
use crate::worker::UserContext;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, sleep};

enum ExecutionMode {
    Duration(Instant),
    Iterations(u64),
}

fn build_client() -> Result<Client> {
    // One connection per user: single idle slot and no cross-user pooling
    Ok(Client::builder()
        .pool_max_idle_per_host(1)
        .http1_only()
        .tcp_nodelay(true)
        .no_proxy()
        .build()?)
}

pub async fn run_load<F>(config: LoadConfig, mut on_progress: Option<F>) -> Result<StatsSnapshot>
where
    F: FnMut(StatsSnapshot) + Send + 'static,
{
    config.scenario.validate()?;
    let picker = Arc::new(TaskPicker::new(&config.scenario.tasks)?);
    let scenario = Arc::new(config.scenario);

    let stats = Arc::new(Stats::new());
    let mut set = JoinSet::new();

    let start_time = Instant::now();
    let end_time = start_time + config.duration;
    let mut current_users = 0;
    let user_counter = Arc::new(AtomicU64::new(1));

    let mut rps_samples: Vec<f64> = Vec::new();
    let mut last_requests = 0u64;
    let mut last_tick = start_time;

    // Main loop: ramp users up to the target, snapshot once a second
    while Instant::now() < end_time {
        let now = Instant::now();
        let elapsed = now.duration_since(start_time);

        let ramp_up_secs = if let Some(ramp_up) = config.ramp_up {
            ramp_up.as_secs_f64()
        } else {
            (config.duration.as_secs_f64() - 1f64).max(1.0)
        };

        let progress = elapsed.as_secs_f64() / ramp_up_secs;
        let progress = progress.min(1.0);

        let target_users = if config.users >= config.start_users {
            config.start_users as f64 + (config.users - config.start_users) as f64 * progress
        } else {
            config.start_users as f64
        };

        let target_users = target_users as u64;

        if current_users < target_users {
            let to_spawn = target_users - current_users;
            for _ in 0..to_spawn {
                let stats = stats.clone();
                let scenario = scenario.clone();
                let picker = picker.clone();
                let user_id = user_counter.fetch_add(1, Ordering::Relaxed);
                let client = build_client()?;

                set.spawn(async move {
                    stats.inc_users();
                    let mode = ExecutionMode::Duration(end_time);
                    if let Err(e) = run_user(scenario, picker, stats, mode, user_id, client).await {
                        tracing::error!("user {} loop failed: {}", user_id, e);
                    }
                });
            }
            current_users += to_spawn;
        }

        let total = stats.total_requests.load(Ordering::Relaxed);
        let interval = now.duration_since(last_tick).as_secs_f64();
        if interval > 0.0 {
            rps_samples.push((total - last_requests) as f64 / interval);
        }
        last_requests = total;
        last_tick = now;

        if let Some(ref mut cb) = on_progress {
            let snapshot = stats.snapshot(
                config.duration,
                Instant::now().duration_since(start_time),
                rps_samples.clone(),
            );
            cb(snapshot);
        }

        sleep(Duration::from_secs(1)).await;
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            tracing::error!("user task failed: {}", e);
        }
    }

    Ok(stats.snapshot(config.duration, config.duration, rps_samples))
}

/// Single user, exactly `iterations` task executions. Used for smoke runs
/// and tests where a timed run would be nondeterministic.
pub async fn run_iterations(scenario: Scenario, iterations: u64) -> Result<StatsSnapshot> {
    scenario.validate()?;
    let picker = Arc::new(TaskPicker::new(&scenario.tasks)?);
    let stats = Arc::new(Stats::new());
    let start = Instant::now();

    let client = build_client()?;

    stats.inc_users();
    run_user(
        Arc::new(scenario),
        picker,
        stats.clone(),
        ExecutionMode::Iterations(iterations),
        1,
        client,
    )
    .await?;

    let elapsed = start.elapsed();
    Ok(stats.snapshot(elapsed, elapsed, Vec::new()))
}

async fn run_user(
    scenario: Arc<Scenario>,
    picker: Arc<TaskPicker>,
    stats: Arc<Stats>,
    mode: ExecutionMode,
    user_id: u64,
    client: Client,
) -> Result<()> {
    let mut ctx = UserContext::new(client, scenario.base_url.clone(), stats, user_id)
        .ok_or_else(|| Error::ScenarioError("failed to create user context".to_owned()))?;

    let mut remaining = match mode {
        ExecutionMode::Iterations(n) => n,
        ExecutionMode::Duration(_) => 0,
    };
    let mut last_flush = Instant::now();

    loop {
        match mode {
            ExecutionMode::Duration(end_time) => {
                if Instant::now() >= end_time {
                    break;
                }
            }
            ExecutionMode::Iterations(_) => {
                if remaining == 0 {
                    break;
                }
                remaining -= 1;
            }
        }

        if last_flush.elapsed() > Duration::from_secs(1) {
            ctx.flush_stats();
            last_flush = Instant::now();
        }

        let task = picker.pick(&scenario.tasks, ctx.rng_mut());
        let pause = ctx.pause_duration(scenario.wait);
        if !pause.is_zero() {
            sleep(pause).await;
        }

        tracing::trace!("user {} executing task {}", ctx.user_id(), task.name);
        ctx.execute(task).await;
    }

    ctx.flush_stats();
    Ok(())
}
