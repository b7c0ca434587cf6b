use crate::model::{Competitor, ComponentScores, RunRecord, RunStatus, TaskResult, TaskType};
use anyhow::Context;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// New-run parameters persisted at admission time.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub competitor_id: i64,
    pub target: String,
    pub suite: String,
    pub model: String,
    pub subset_percent: u8,
    pub seed: u64,
    pub progress_total: u32,
    pub metadata: serde_json::Value,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Self::from_conn(Connection::open(path)?)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> anyhow::Result<Self> {
        // cascade deletes for task_results rely on this pragma
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // competitors

    pub fn upsert_competitor(&self, name: &str) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO competitors(name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        let id = conn.query_row(
            "SELECT id FROM competitors WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Conditional best-score update: loses to a concurrent better run,
    /// never to a concurrent worse one. Single statement, so two runs
    /// completing at once cannot interleave a read-modify-write.
    pub fn record_best(&self, competitor_id: i64, run_id: i64, score: f64) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE competitors SET best_composite_score = ?1, best_run_id = ?2
             WHERE id = ?3 AND (best_composite_score IS NULL OR best_composite_score < ?1)",
            params![score, run_id, competitor_id],
        )?;
        Ok(changed > 0)
    }

    /// Competitors ordered by best score descending, nulls last.
    pub fn leaderboard(&self) -> anyhow::Result<Vec<Competitor>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, best_composite_score, best_run_id FROM competitors
             ORDER BY best_composite_score IS NULL, best_composite_score DESC, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Competitor {
                id: row.get(0)?,
                name: row.get(1)?,
                best_composite_score: row.get(2)?,
                best_run_id: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // runs

    pub fn insert_run(&self, new_run: &NewRun) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO runs(competitor_id, target, suite, model, subset_percent, seed,
                              status, progress_current, progress_total, created_at, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', 0, ?7, ?8, ?9)",
            params![
                new_run.competitor_id,
                new_run.target,
                new_run.suite,
                new_run.model,
                new_run.subset_percent as i64,
                new_run.seed as i64,
                new_run.progress_total as i64,
                now_rfc3339(),
                serde_json::to_string(&new_run.metadata)?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// pending -> running. Guarded so a cancelled run cannot resurrect.
    pub fn mark_running(&self, run_id: i64) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE runs SET status='running', started_at=?1 WHERE id=?2 AND status='pending'",
            params![now_rfc3339(), run_id],
        )?;
        Ok(changed > 0)
    }

    /// running -> completed, with scores and completed_at in one write.
    pub fn mark_completed(
        &self,
        run_id: i64,
        scores: &ComponentScores,
        composite: Option<f64>,
    ) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE runs SET status='completed', quality_score=?1, speed_score=?2, cost_score=?3,
                             streaming_score=?4, multimodal_score=?5, composite_score=?6,
                             completed_at=?7
             WHERE id=?8 AND status='running'",
            params![
                scores.quality,
                scores.speed,
                scores.cost,
                scores.streaming,
                scores.multimodal,
                composite,
                now_rfc3339(),
                run_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn mark_failed(&self, run_id: i64, error: &str) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE runs SET status='failed', error=?1, completed_at=?2
             WHERE id=?3 AND status IN ('pending','running')",
            params![error, now_rfc3339(), run_id],
        )?;
        Ok(changed > 0)
    }

    pub fn mark_cancelled(&self, run_id: i64) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE runs SET status='cancelled', completed_at=?1
             WHERE id=?2 AND status IN ('pending','running')",
            params![now_rfc3339(), run_id],
        )?;
        Ok(changed > 0)
    }

    pub fn increment_progress(&self, run_id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET progress_current = progress_current + 1 WHERE id=?1",
            params![run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> anyhow::Result<Option<RunRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, competitor_id, target, suite, model, subset_percent, seed, status,
                    progress_current, progress_total, quality_score, speed_score, cost_score,
                    streaming_score, multimodal_score, composite_score, created_at, started_at,
                    completed_at, error, metadata_json
             FROM runs WHERE id=?1",
        )?;
        let mut rows = stmt.query(params![run_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(run_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn delete_run(&self, run_id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM runs WHERE id=?1", params![run_id])?;
        Ok(())
    }

    // task results

    pub fn insert_task_result(&self, result: &TaskResult) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO task_results(run_id, task_id, benchmark, task_type, success,
                 response_text, error, quality_score, latency_seconds, ttft_seconds,
                 tokens_per_second, prompt_tokens, completion_tokens, total_tokens, cost_usd,
                 continuity_score, max_gap_seconds, stream_json, metadata_json)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
            params![
                result.run_id,
                result.task_id,
                result.benchmark,
                result.task_type.as_str(),
                result.success,
                result.response_text,
                result.error,
                result.quality_score,
                result.latency_seconds,
                result.ttft_seconds,
                result.tokens_per_second,
                result.prompt_tokens as i64,
                result.completion_tokens as i64,
                result.total_tokens as i64,
                result.cost_usd,
                result.continuity_score,
                result.max_gap_seconds,
                serde_json::to_string(&result.stream_metrics)?,
                serde_json::to_string(&result.metadata)?,
            ],
        )?;
        Ok(())
    }

    pub fn list_task_results(&self, run_id: i64) -> anyhow::Result<Vec<TaskResult>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT run_id, task_id, benchmark, task_type, success, response_text, error,
                    quality_score, latency_seconds, ttft_seconds, tokens_per_second,
                    prompt_tokens, completion_tokens, total_tokens, cost_usd, continuity_score,
                    max_gap_seconds, stream_json, metadata_json
             FROM task_results WHERE run_id=?1 ORDER BY id",
        )?;
        let mut out = Vec::new();
        let mut rows = stmt.query(params![run_id])?;
        while let Some(row) = rows.next()? {
            out.push(task_result_from_row(row)?);
        }
        Ok(out)
    }
}

fn run_from_row(row: &Row<'_>) -> anyhow::Result<RunRecord> {
    let status_raw: String = row.get(7)?;
    let status = RunStatus::parse(&status_raw)
        .with_context(|| format!("unknown run status '{}' in store", status_raw))?;
    let metadata_raw: Option<String> = row.get(20)?;
    Ok(RunRecord {
        id: row.get(0)?,
        competitor_id: row.get(1)?,
        target: row.get(2)?,
        suite: row.get(3)?,
        model: row.get(4)?,
        subset_percent: row.get::<_, i64>(5)? as u8,
        seed: row.get::<_, i64>(6)? as u64,
        status,
        progress_current: row.get::<_, i64>(8)? as u32,
        progress_total: row.get::<_, i64>(9)? as u32,
        scores: ComponentScores {
            quality: row.get(10)?,
            speed: row.get(11)?,
            cost: row.get(12)?,
            streaming: row.get(13)?,
            multimodal: row.get(14)?,
        },
        composite_score: row.get(15)?,
        created_at: row.get(16)?,
        started_at: row.get(17)?,
        completed_at: row.get(18)?,
        error: row.get(19)?,
        metadata: metadata_raw
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?
            .unwrap_or(serde_json::Value::Null),
    })
}

fn task_result_from_row(row: &Row<'_>) -> anyhow::Result<TaskResult> {
    let type_raw: String = row.get(3)?;
    let task_type = TaskType::parse(&type_raw)
        .with_context(|| format!("unknown task type '{}' in store", type_raw))?;
    let stream_raw: Option<String> = row.get(17)?;
    let metadata_raw: Option<String> = row.get(18)?;
    Ok(TaskResult {
        run_id: row.get(0)?,
        task_id: row.get(1)?,
        benchmark: row.get(2)?,
        task_type,
        success: row.get(4)?,
        response_text: row.get(5)?,
        error: row.get(6)?,
        quality_score: row.get(7)?,
        latency_seconds: row.get(8)?,
        ttft_seconds: row.get(9)?,
        tokens_per_second: row.get(10)?,
        prompt_tokens: row.get::<_, i64>(11)? as u32,
        completion_tokens: row.get::<_, i64>(12)? as u32,
        total_tokens: row.get::<_, i64>(13)? as u32,
        cost_usd: row.get(14)?,
        continuity_score: row.get(15)?,
        max_gap_seconds: row.get(16)?,
        stream_metrics: stream_raw
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?
            .unwrap_or(serde_json::Value::Null),
        metadata: metadata_raw
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?
            .unwrap_or(serde_json::Value::Null),
    })
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
