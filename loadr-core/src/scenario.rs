use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Deserialize;

use crate::error::{Error, Result};

/// One HTTP call pattern a simulated user may perform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// GET the given path. Absolute `http(s)://` paths bypass the base URL.
    Get { path: String },
    /// POST a freshly sampled weather reading as JSON to the given path.
    PostWeather { path: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    /// Relative selection weight; higher means proportionally more frequent.
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(flatten)]
    pub action: Action,
}

fn default_weight() -> u32 {
    1
}

/// A load scenario: where to send requests, how long each user pauses
/// between tasks, and the weighted task table to pick from.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub base_url: String,
    /// Wait range in seconds between consecutive tasks of one user.
    pub wait: (f64, f64),
    pub tasks: Vec<TaskSpec>,
}

impl Scenario {
    pub fn from_json(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(Error::ScenarioError("task list is empty".to_owned()));
        }
        let (min, max) = self.wait;
        if min < 0.0 || max < min {
            return Err(Error::ScenarioError(format!(
                "wait range [{}, {}] is not a valid interval",
                min, max
            )));
        }
        if self.tasks.iter().all(|t| t.weight == 0) {
            return Err(Error::ScenarioError("total task weight is zero".to_owned()));
        }
        Ok(())
    }
}

/// Weighted random index over a scenario's task table, built once per run.
pub struct TaskPicker {
    dist: WeightedIndex<u32>,
}

impl TaskPicker {
    pub fn new(tasks: &[TaskSpec]) -> Result<Self> {
        let dist = WeightedIndex::new(tasks.iter().map(|t| t.weight))
            .map_err(|e| Error::ScenarioError(e.to_string()))?;
        Ok(Self { dist })
    }

    pub fn pick<'a, R: Rng + ?Sized>(&self, tasks: &'a [TaskSpec], rng: &mut R) -> &'a TaskSpec {
        &tasks[self.dist.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn weather_task(name: &str, weight: u32) -> TaskSpec {
        TaskSpec {
            name: name.to_owned(),
            weight,
            action: Action::PostWeather {
                path: "/clima".to_owned(),
            },
        }
    }

    #[test]
    fn parses_scenario_file_content() {
        let content = r#"{
            "base_url": "http://127.0.0.1:8000",
            "wait": [1.0, 5.0],
            "tasks": [
                { "name": "engineering", "weight": 1, "action": "post_weather", "path": "/clima" },
                { "name": "home_page", "action": "get", "path": "/" }
            ]
        }"#;
        let scenario = Scenario::from_json(content).expect("failed to parse scenario");
        assert_eq!(scenario.base_url, "http://127.0.0.1:8000");
        assert_eq!(scenario.wait, (1.0, 5.0));
        assert_eq!(scenario.tasks.len(), 2);
        // weight defaults to 1 when omitted
        assert_eq!(scenario.tasks[1].weight, 1);
        assert!(matches!(scenario.tasks[1].action, Action::Get { ref path } if path == "/"));
    }

    #[test]
    fn rejects_empty_task_list() {
        let scenario = Scenario {
            base_url: String::new(),
            wait: (0.0, 0.0),
            tasks: Vec::new(),
        };
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn rejects_inverted_wait_range() {
        let scenario = Scenario {
            base_url: String::new(),
            wait: (5.0, 1.0),
            tasks: vec![weather_task("t", 1)],
        };
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn rejects_zero_total_weight() {
        let scenario = Scenario {
            base_url: String::new(),
            wait: (0.0, 0.0),
            tasks: vec![weather_task("a", 0), weather_task("b", 0)],
        };
        assert!(scenario.validate().is_err());
        assert!(TaskPicker::new(&scenario.tasks).is_err());
    }

    #[test]
    fn zero_weight_tasks_are_never_picked() {
        let tasks = vec![weather_task("never", 0), weather_task("always", 5)];
        let picker = TaskPicker::new(&tasks).expect("failed to build picker");
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            assert_eq!(picker.pick(&tasks, &mut rng).name, "always");
        }
    }

    #[test]
    fn single_task_is_always_picked() {
        let tasks = vec![weather_task("only", 3)];
        let picker = TaskPicker::new(&tasks).expect("failed to build picker");
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(picker.pick(&tasks, &mut rng).name, "only");
        }
    }

    #[test]
    fn heavier_tasks_are_picked_more_often() {
        let tasks = vec![weather_task("light", 1), weather_task("heavy", 9)];
        let picker = TaskPicker::new(&tasks).expect("failed to build picker");
        let mut rng = StdRng::seed_from_u64(42);
        let heavy = (0..1000)
            .filter(|_| picker.pick(&tasks, &mut rng).name == "heavy")
            .count();
        // 9:1 weights; allow generous slack around the 900 expectation
        assert!(heavy > 800, "heavy picked only {} times", heavy);
    }
}
