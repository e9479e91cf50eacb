use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to scenario file (JSON)
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Target base URL (overrides the scenario file's base_url)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Number of simulated users to start with
    #[arg(long, default_value_t = 0)]
    pub start_users: u64,

    /// Target number of simulated users to end with
    #[arg(short = 'c', long, default_value_t = 10)]
    pub users: u64,

    /// Time to reach the target user count in seconds
    #[arg(long)]
    pub ramp_up: Option<u64>,

    /// Duration of the run in seconds
    #[arg(short, long, default_value_t = 10)]
    pub duration: u64,

    /// Run a fixed number of iterations with a single user instead of a timed run
    #[arg(short, long)]
    pub iterations: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}
