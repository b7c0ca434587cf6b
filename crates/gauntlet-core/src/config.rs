use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Composite weights. Absent components are excluded from both the
/// numerator and the denominator of the weighted blend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeWeights {
    #[serde(default = "d_w_quality")]
    pub quality: f64,
    #[serde(default = "d_w_speed")]
    pub speed: f64,
    #[serde(default = "d_w_cost")]
    pub cost: f64,
    #[serde(default = "d_w_streaming")]
    pub streaming: f64,
    #[serde(default = "d_w_multimodal")]
    pub multimodal: f64,
}

fn d_w_quality() -> f64 {
    0.40
}
fn d_w_speed() -> f64 {
    0.20
}
fn d_w_cost() -> f64 {
    0.15
}
fn d_w_streaming() -> f64 {
    0.15
}
fn d_w_multimodal() -> f64 {
    0.10
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            quality: d_w_quality(),
            speed: d_w_speed(),
            cost: d_w_cost(),
            streaming: d_w_streaming(),
            multimodal: d_w_multimodal(),
        }
    }
}

/// Reference targets the speed and cost curves normalize against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTargets {
    /// TTFT at or below this scores full marks on the TTFT half of speed.
    #[serde(default = "d_ref_ttft")]
    pub ttft_secs: f64,
    /// Tokens/sec at or above this scores full marks on the TPS half.
    #[serde(default = "d_ref_tps")]
    pub tokens_per_second: f64,
    /// A run spending this much USD scores 0 on cost; zero spend scores 100.
    #[serde(default = "d_ref_budget")]
    pub budget_usd: f64,
}

fn d_ref_ttft() -> f64 {
    1.0
}
fn d_ref_tps() -> f64 {
    50.0
}
fn d_ref_budget() -> f64 {
    1.0
}

impl Default for ReferenceTargets {
    fn default() -> Self {
        Self {
            ttft_secs: d_ref_ttft(),
            tokens_per_second: d_ref_tps(),
            budget_usd: d_ref_budget(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRates {
    /// USD per 1k prompt tokens.
    #[serde(default = "d_prompt_rate")]
    pub prompt_per_1k: f64,
    /// USD per 1k completion tokens.
    #[serde(default = "d_completion_rate")]
    pub completion_per_1k: f64,
    /// USD per sandbox-second, for tasks that bill execution time.
    #[serde(default)]
    pub sandbox_per_second: f64,
}

fn d_prompt_rate() -> f64 {
    0.001
}
fn d_completion_rate() -> f64 {
    0.002
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            prompt_per_1k: d_prompt_rate(),
            completion_per_1k: d_completion_rate(),
            sandbox_per_second: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_judge_model")]
    pub model: String,
}

fn d_judge_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Global cap on simultaneously running runs (K).
    #[serde(default = "d_max_runs")]
    pub max_concurrent_runs: usize,
    /// Per-run task worker count (M), independent from the run cap.
    #[serde(default = "d_task_workers")]
    pub task_workers: usize,
    /// Progress stream poll interval.
    #[serde(default = "d_poll_interval")]
    pub poll_interval_secs: f64,
    #[serde(default = "d_rate_requests")]
    pub rate_limit_requests: usize,
    #[serde(default = "d_rate_window")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "d_task_timeout")]
    pub task_timeout_secs: f64,
    #[serde(default = "d_run_timeout")]
    pub run_timeout_secs: f64,
    /// Retries for transient task failures, on top of the first attempt.
    #[serde(default = "d_task_retries")]
    pub task_retries: u32,
    #[serde(default = "d_backoff_base")]
    pub retry_backoff_base_secs: f64,
    /// Inter-chunk gaps above this threshold count against continuity.
    #[serde(default = "d_gap_threshold")]
    pub gap_threshold_secs: f64,
    #[serde(default)]
    pub reference: ReferenceTargets,
    #[serde(default)]
    pub rates: CostRates,
    #[serde(default)]
    pub weights: CompositeWeights,
    #[serde(default)]
    pub judge: Option<JudgeConfig>,
}

fn d_max_runs() -> usize {
    3
}
fn d_task_workers() -> usize {
    4
}
fn d_poll_interval() -> f64 {
    1.0
}
fn d_rate_requests() -> usize {
    10
}
fn d_rate_window() -> u64 {
    60
}
fn d_task_timeout() -> f64 {
    120.0
}
fn d_run_timeout() -> f64 {
    3600.0
}
fn d_task_retries() -> u32 {
    2
}
fn d_backoff_base() -> f64 {
    0.5
}
fn d_gap_threshold() -> f64 {
    2.0
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        // serde defaults are the single source of truth
        serde_yaml::from_str("{}").expect("default config")
    }
}

impl OrchestratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Environment overrides for deployment knobs, GAUNTLET_* prefixed.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("GAUNTLET_MAX_RUNS") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_runs = n;
            }
        }
        if let Ok(v) = std::env::var("GAUNTLET_TASK_WORKERS") {
            if let Ok(n) = v.parse() {
                self.task_workers = n;
            }
        }
        if let Ok(v) = std::env::var("GAUNTLET_TASK_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.task_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GAUNTLET_RUN_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.run_timeout_secs = n;
            }
        }
        if let Ok(endpoint) = std::env::var("GAUNTLET_JUDGE_ENDPOINT") {
            let api_key = std::env::var("GAUNTLET_JUDGE_API_KEY").ok();
            let model = std::env::var("GAUNTLET_JUDGE_MODEL").unwrap_or_else(|_| d_judge_model());
            self.judge = Some(JudgeConfig {
                endpoint,
                api_key,
                model,
            });
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_runs == 0 {
            return Err(ConfigError("max_concurrent_runs must be >= 1".into()));
        }
        if self.task_workers == 0 {
            return Err(ConfigError("task_workers must be >= 1".into()));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError("rate_limit_window_secs must be >= 1".into()));
        }
        let w = &self.weights;
        if w.quality + w.speed + w.cost + w.streaming + w.multimodal <= 0.0 {
            return Err(ConfigError("composite weights must sum to > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_concurrent_runs, 3);
        assert_eq!(cfg.task_workers, 4);
        assert_eq!(cfg.weights.quality, 0.40);
        assert_eq!(cfg.weights.streaming, 0.15);
        assert!(cfg.judge.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cfg = OrchestratorConfig::default();
        cfg.task_workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: OrchestratorConfig =
            serde_yaml::from_str("max_concurrent_runs: 8\nweights:\n  quality: 0.5\n").unwrap();
        assert_eq!(cfg.max_concurrent_runs, 8);
        assert_eq!(cfg.weights.quality, 0.5);
        // untouched weights keep their defaults
        assert_eq!(cfg.weights.speed, 0.20);
        assert_eq!(cfg.task_workers, 4);
    }
}
