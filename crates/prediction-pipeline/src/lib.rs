//! Prediction workflows: template orchestration, stock-data enrichment and
//! asynchronous job tracking.

pub mod enrichment;
pub mod jobs;
pub mod service;

pub use jobs::{JobStore, JobTracker};
pub use service::{NoopObserver, PredictionService, StageObserver, StrategyRequest};
