use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gauntlet",
    version,
    about = "Benchmark scoring orchestrator for OpenAI-compatible endpoints"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Submit a run and follow it to completion
    Submit(SubmitArgs),
    /// Show the stored state of a run
    Status(StatusArgs),
    /// Print per-task results for a run
    Results(ResultsArgs),
    /// Cancel a pending or running run
    Cancel(CancelArgs),
    /// Print the competitor leaderboard
    Leaderboard(LeaderboardArgs),
    /// Validate a suite file and the orchestrator config
    Validate(ValidateArgs),
}

#[derive(clap::Args, Clone)]
pub struct SubmitArgs {
    /// Suite YAML to run
    #[arg(long)]
    pub suite_file: PathBuf,

    /// Competitor name on the leaderboard
    #[arg(long)]
    pub competitor: String,

    /// Base URL of the OpenAI-compatible endpoint under test
    #[arg(long)]
    pub target: String,

    /// Model identifier passed to the endpoint
    #[arg(long)]
    pub model: String,

    /// Percentage of suite tasks to run (deterministic subset)
    #[arg(long, default_value_t = 100)]
    pub subset: u8,

    /// Sampling seed; the same seed and subset select the same tasks
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Client identity used for rate limiting
    #[arg(long, default_value = "cli")]
    pub client: String,

    #[arg(long, default_value = ".gauntlet/gauntlet.db")]
    pub db: PathBuf,

    /// Orchestrator config YAML (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// API key for the target endpoint
    #[arg(long, env = "GAUNTLET_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Suppress per-task progress lines
    #[arg(long)]
    pub quiet: bool,
}

#[derive(clap::Args, Clone)]
pub struct StatusArgs {
    pub run_id: i64,

    #[arg(long, default_value = ".gauntlet/gauntlet.db")]
    pub db: PathBuf,

    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Clone)]
pub struct ResultsArgs {
    pub run_id: i64,

    #[arg(long, default_value = ".gauntlet/gauntlet.db")]
    pub db: PathBuf,
}

#[derive(clap::Args, Clone)]
pub struct CancelArgs {
    pub run_id: i64,

    #[arg(long, default_value = ".gauntlet/gauntlet.db")]
    pub db: PathBuf,
}

#[derive(clap::Args, Clone)]
pub struct LeaderboardArgs {
    #[arg(long, default_value = ".gauntlet/gauntlet.db")]
    pub db: PathBuf,

    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub suite_file: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,
}
