use gauntlet_core::suite::load_suite;

use super::exit_codes;
use crate::cli::args::ValidateArgs;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    if let Err(code) = super::load_config(args.config.as_ref()) {
        return Ok(code);
    }

    match load_suite(&args.suite_file) {
        Ok(suite) => {
            eprintln!(
                "✔ suite '{}' OK ({} tasks)",
                suite.suite,
                suite.tasks.len()
            );
            Ok(exit_codes::OK)
        }
        Err(e) => {
            eprintln!("✖ {e}");
            Ok(exit_codes::CONFIG_ERROR)
        }
    }
}
