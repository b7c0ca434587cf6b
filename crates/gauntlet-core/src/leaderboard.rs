use crate::model::{Competitor, RunRecord};
use crate::storage::Store;

/// Updates best-score-per-competitor on run completion. The compare
/// happens inside a single conditional UPDATE, so two runs for the same
/// competitor completing at once cannot lose the better score.
#[derive(Clone)]
pub struct LeaderboardAggregator {
    store: Store,
}

impl LeaderboardAggregator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn on_run_completed(&self, run: &RunRecord) -> anyhow::Result<()> {
        let Some(score) = run.composite_score else {
            return Ok(());
        };
        let improved = self.store.record_best(run.competitor_id, run.id, score)?;
        if improved {
            tracing::info!(
                run_id = run.id,
                competitor_id = run.competitor_id,
                score,
                "new best composite score"
            );
        }
        Ok(())
    }

    pub fn leaderboard(&self) -> anyhow::Result<Vec<Competitor>> {
        self.store.leaderboard()
    }
}
