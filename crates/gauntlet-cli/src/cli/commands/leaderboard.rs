use super::exit_codes;
use crate::cli::args::LeaderboardArgs;

pub fn run(args: LeaderboardArgs) -> anyhow::Result<i32> {
    let store = super::open_store(&args.db)?;
    let rows = store.leaderboard()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(exit_codes::OK);
    }

    if rows.is_empty() {
        println!("no competitors yet");
        return Ok(exit_codes::OK);
    }
    for (rank, c) in rows.iter().enumerate() {
        match c.best_composite_score {
            Some(score) => println!("{:>3}. {:<24} {:>7.2}", rank + 1, c.name, score),
            None => println!("{:>3}. {:<24} {:>7}", rank + 1, c.name, "-"),
        }
    }
    Ok(exit_codes::OK)
}
