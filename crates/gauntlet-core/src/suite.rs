use crate::errors::ConfigError;
use crate::model::TaskType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

pub const SUPPORTED_SUITE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub version: u32,
    pub suite: String,
    #[serde(default)]
    pub benchmark: Option<String>,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub prompt: String,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub expected: ExpectedCheck,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

fn d_max_tokens() -> u32 {
    1024
}

/// Expected-behavior check payload, matched by task type in the scoring
/// layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ExpectedCheck {
    MustContain {
        must_contain: Vec<String>,
    },
    /// Response must parse as JSON carrying these top-level fields.
    JsonFields {
        json_fields: Vec<String>,
    },
    /// Code-producing tasks: fragments that must appear in the answer.
    CodeContains {
        code_contains: Vec<String>,
    },
    /// Open-ended tasks graded by the judge (or the heuristic fallback).
    JudgeRubric {
        rubric: String,
    },
    #[default]
    None,
}

pub fn load_suite(path: &Path) -> Result<Suite, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read suite {}: {}", path.display(), e)))?;
    let suite: Suite = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse suite YAML: {}", e)))?;
    validate_suite(&suite)?;
    Ok(suite)
}

pub fn validate_suite(suite: &Suite) -> Result<(), ConfigError> {
    if suite.version != SUPPORTED_SUITE_VERSION {
        return Err(ConfigError(format!(
            "unsupported suite version {} (supported: {})",
            suite.version, SUPPORTED_SUITE_VERSION
        )));
    }
    if suite.tasks.is_empty() {
        return Err(ConfigError("suite has no tasks".into()));
    }
    let mut seen = HashSet::new();
    for t in &suite.tasks {
        if !seen.insert(t.id.as_str()) {
            return Err(ConfigError(format!("duplicate task id '{}'", t.id)));
        }
    }
    Ok(())
}

/// Deterministic subset selection. Tasks are ranked by
/// `sha256(seed_le || task_id)` and the lowest `round(total * pct / 100)`
/// are kept, in original suite order. The same (suite, percent, seed)
/// always selects the same tasks; this is what makes subset runs
/// comparable across competitors.
pub fn sample_tasks(suite: &Suite, subset_percent: u8, seed: u64) -> Vec<TaskSpec> {
    let pct = subset_percent.clamp(1, 100);
    if pct == 100 {
        return suite.tasks.clone();
    }
    let total = suite.tasks.len();
    let n = ((total as f64 * pct as f64 / 100.0).round() as usize).clamp(1, total);

    let mut ranked: Vec<(String, &str)> = suite
        .tasks
        .iter()
        .map(|t| (selection_key(seed, &t.id), t.id.as_str()))
        .collect();
    // tie-break on id so equal digests (never in practice) stay stable
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let keep: HashSet<&str> = ranked.iter().take(n).map(|(_, id)| *id).collect();
    suite
        .tasks
        .iter()
        .filter(|t| keep.contains(t.id.as_str()))
        .cloned()
        .collect()
}

fn selection_key(seed: u64, task_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(task_id.as_bytes());
    hex::encode(hasher.finalize())
}
