use std::path::{Path, PathBuf};

use gauntlet_core::config::OrchestratorConfig;
use gauntlet_core::storage::Store;

use super::args::{Cli, Command};

mod cancel;
mod leaderboard;
mod results;
mod status;
mod submit;
mod validate;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// The run itself failed or was cancelled.
    pub const RUN_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const INTERNAL_ERROR: i32 = 3;
}

pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Submit(args) => submit::run(args).await,
        Command::Status(args) => status::run(args),
        Command::Results(args) => results::run(args),
        Command::Cancel(args) => cancel::run(args),
        Command::Leaderboard(args) => leaderboard::run(args),
        Command::Validate(args) => validate::run(args),
    }
}

/// Opens the store, creating parent directories for a fresh database.
pub(crate) fn open_store(db: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = Store::open(db)?;
    store.init_schema()?;
    Ok(store)
}

pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<OrchestratorConfig, i32> {
    let mut cfg = match path {
        Some(p) => match OrchestratorConfig::load(p) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("✖ {e}");
                return Err(exit_codes::CONFIG_ERROR);
            }
        },
        None => OrchestratorConfig::default(),
    };
    cfg.apply_env();
    if let Err(e) = cfg.validate() {
        eprintln!("✖ {e}");
        return Err(exit_codes::CONFIG_ERROR);
    }
    Ok(cfg)
}
