use super::exit_codes;
use crate::cli::args::ResultsArgs;

pub fn run(args: ResultsArgs) -> anyhow::Result<i32> {
    let store = super::open_store(&args.db)?;
    if store.get_run(args.run_id)?.is_none() {
        eprintln!("✖ run {} not found", args.run_id);
        return Ok(exit_codes::RUN_FAILED);
    }
    let results = store.list_task_results(args.run_id)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(exit_codes::OK)
}
