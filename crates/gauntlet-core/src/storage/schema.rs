pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS competitors (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  best_composite_score REAL,
  best_run_id INTEGER
);

CREATE TABLE IF NOT EXISTS runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  competitor_id INTEGER NOT NULL REFERENCES competitors(id),
  target TEXT NOT NULL,
  suite TEXT NOT NULL,
  model TEXT NOT NULL,
  subset_percent INTEGER NOT NULL,
  seed INTEGER NOT NULL,
  status TEXT NOT NULL,
  progress_current INTEGER NOT NULL DEFAULT 0,
  progress_total INTEGER NOT NULL DEFAULT 0,
  quality_score REAL,
  speed_score REAL,
  cost_score REAL,
  streaming_score REAL,
  multimodal_score REAL,
  composite_score REAL,
  created_at TEXT NOT NULL,
  started_at TEXT,
  completed_at TEXT,
  error TEXT,
  metadata_json TEXT
);

CREATE TABLE IF NOT EXISTS task_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
  task_id TEXT NOT NULL,
  benchmark TEXT NOT NULL,
  task_type TEXT NOT NULL,
  success INTEGER NOT NULL,
  response_text TEXT NOT NULL,
  error TEXT,
  quality_score REAL NOT NULL,
  latency_seconds REAL NOT NULL,
  ttft_seconds REAL,
  tokens_per_second REAL,
  prompt_tokens INTEGER NOT NULL,
  completion_tokens INTEGER NOT NULL,
  total_tokens INTEGER NOT NULL,
  cost_usd REAL NOT NULL,
  continuity_score REAL,
  max_gap_seconds REAL NOT NULL,
  stream_json TEXT,
  metadata_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_task_results_run ON task_results(run_id);
"#;
