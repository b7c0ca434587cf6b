pub mod composite;
pub mod config;
pub mod errors;
pub mod executor;
pub mod leaderboard;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod scoring;
pub mod storage;
pub mod suite;
