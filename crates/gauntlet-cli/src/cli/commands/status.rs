use super::exit_codes;
use crate::cli::args::StatusArgs;

pub fn run(args: StatusArgs) -> anyhow::Result<i32> {
    let store = super::open_store(&args.db)?;
    let Some(record) = store.get_run(args.run_id)? else {
        eprintln!("✖ run {} not found", args.run_id);
        return Ok(exit_codes::RUN_FAILED);
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(exit_codes::OK);
    }

    println!(
        "run {} [{}] suite={} model={} progress={}/{}",
        record.id,
        record.status.as_str(),
        record.suite,
        record.model,
        record.progress_current,
        record.progress_total
    );
    if let Some(score) = record.composite_score {
        println!("composite: {:.2}", score);
        let s = &record.scores;
        for (name, value) in [
            ("quality", s.quality),
            ("speed", s.speed),
            ("cost", s.cost),
            ("streaming", s.streaming),
            ("multimodal", s.multimodal),
        ] {
            if let Some(v) = value {
                println!("  {name}: {v:.2}");
            }
        }
    }
    if let Some(error) = &record.error {
        println!("error: {error}");
    }
    Ok(exit_codes::OK)
}
