use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ChatQuality,
    Research,
    ToolUse,
    Coding,
    Streaming,
    Multimodal,
    Cost,
}

impl TaskType {
    /// Task types whose quality_score feeds the quality component.
    pub fn counts_toward_quality(&self) -> bool {
        matches!(
            self,
            TaskType::ChatQuality | TaskType::Research | TaskType::ToolUse | TaskType::Coding
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ChatQuality => "chat_quality",
            TaskType::Research => "research",
            TaskType::ToolUse => "tool_use",
            TaskType::Coding => "coding",
            TaskType::Streaming => "streaming",
            TaskType::Multimodal => "multimodal",
            TaskType::Cost => "cost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat_quality" => Some(TaskType::ChatQuality),
            "research" => Some(TaskType::Research),
            "tool_use" => Some(TaskType::ToolUse),
            "coding" => Some(TaskType::Coding),
            "streaming" => Some(TaskType::Streaming),
            "multimodal" => Some(TaskType::Multimodal),
            "cost" => Some(TaskType::Cost),
            _ => None,
        }
    }
}

/// Per-component scores on a 0-100 scale. A component is `None` when the
/// sampled task set had nothing to measure it with, in which case the
/// composite renormalizes over the components that are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub quality: Option<f64>,
    pub speed: Option<f64>,
    pub cost: Option<f64>,
    pub streaming: Option<f64>,
    pub multimodal: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub competitor_id: i64,
    pub target: String,
    pub suite: String,
    pub model: String,
    pub subset_percent: u8,
    pub seed: u64,
    pub status: RunStatus,
    pub progress_current: u32,
    pub progress_total: u32,
    pub scores: ComponentScores,
    pub composite_score: Option<f64>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub run_id: i64,
    pub task_id: String,
    pub benchmark: String,
    pub task_type: TaskType,
    pub success: bool,
    pub response_text: String,
    pub error: Option<String>,
    pub quality_score: f64,
    pub latency_seconds: f64,
    pub ttft_seconds: Option<f64>,
    pub tokens_per_second: Option<f64>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
    pub continuity_score: Option<f64>,
    pub max_gap_seconds: f64,
    /// Raw streaming metrics (chunk count, gap stats) for later inspection.
    #[serde(default)]
    pub stream_metrics: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub id: i64,
    pub name: String,
    pub best_composite_score: Option<f64>,
    pub best_run_id: Option<i64>,
}

/// Admission request for a new scoring run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Client identity used for rate limiting.
    pub client_id: String,
    pub competitor: String,
    pub target: String,
    pub suite: String,
    pub model: String,
    pub subset_percent: u8,
    pub seed: u64,
    /// Benchmark label stamped on task results; defaults to the
    /// suite's own benchmark (or suite name) when absent.
    pub benchmark: Option<String>,
    pub metadata: serde_json::Value,
}
