use std::sync::Arc;

use gauntlet_core::executor::HttpTargetFactory;
use gauntlet_core::model::{RunRequest, RunStatus};
use gauntlet_core::orchestrator::Orchestrator;
use gauntlet_core::suite::load_suite;

use super::exit_codes;
use crate::cli::args::SubmitArgs;

pub async fn run(args: SubmitArgs) -> anyhow::Result<i32> {
    let suite = match load_suite(&args.suite_file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("✖ {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let config = match super::load_config(args.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };
    let checks = gauntlet_scoring::default_checks(config.judge.as_ref());

    let store = super::open_store(&args.db)?;
    let orchestrator = Orchestrator::new(
        store,
        config,
        Arc::new(HttpTargetFactory {
            api_key: args.api_key.clone(),
        }),
        checks,
    );
    orchestrator.register_suite(suite.clone());

    let record = match orchestrator.create_run(RunRequest {
        client_id: args.client.clone(),
        competitor: args.competitor.clone(),
        target: args.target.clone(),
        suite: suite.suite.clone(),
        model: args.model.clone(),
        subset_percent: args.subset,
        seed: args.seed,
        benchmark: None,
        metadata: serde_json::json!({}),
    }) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("✖ run rejected ({}): {e}", e.reason_code());
            return Ok(exit_codes::RUN_FAILED);
        }
    };

    eprintln!(
        "run {} submitted: {} tasks against {}",
        record.id, record.progress_total, record.target
    );

    let mut progress = orchestrator.watch_run(record.id);
    while let Some(snapshot) = progress.recv().await {
        if !args.quiet {
            eprintln!(
                "  [{}] {}/{} tasks",
                snapshot.status.as_str(),
                snapshot.current,
                snapshot.total
            );
        }
    }

    let final_record = orchestrator
        .get_run(record.id)?
        .ok_or_else(|| anyhow::anyhow!("run {} disappeared", record.id))?;
    println!("{}", serde_json::to_string_pretty(&final_record)?);

    match final_record.status {
        RunStatus::Completed => Ok(exit_codes::OK),
        _ => Ok(exit_codes::RUN_FAILED),
    }
}
