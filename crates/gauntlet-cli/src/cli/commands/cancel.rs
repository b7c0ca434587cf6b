use super::exit_codes;
use crate::cli::args::CancelArgs;

pub fn run(args: CancelArgs) -> anyhow::Result<i32> {
    let store = super::open_store(&args.db)?;
    let Some(record) = store.get_run(args.run_id)? else {
        eprintln!("✖ run {} not found", args.run_id);
        return Ok(exit_codes::RUN_FAILED);
    };
    if record.status.is_terminal() {
        // cancelling a finished run is a no-op, not an error
        eprintln!(
            "run {} already {}",
            args.run_id,
            record.status.as_str()
        );
        return Ok(exit_codes::OK);
    }
    store.mark_cancelled(args.run_id)?;
    eprintln!("run {} cancelled", args.run_id);
    Ok(exit_codes::OK)
}
