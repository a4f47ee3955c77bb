//! In-memory tracking of asynchronous prediction jobs.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::FutureExt;
use prediction_core::{Job, PredictionOptions, PredictionOutcome, PredictionStatus};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::service::{PredictionService, StageObserver};

/// Concurrent store of job records.
///
/// Updates enforce the status machine: transitions never regress, terminal
/// states absorb, and progress is non-decreasing.
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh job in the Pending state and return its id
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.insert(
            id,
            Job {
                id,
                status: PredictionStatus::Pending,
                created_at: now,
                updated_at: now,
                message: "Prediction queued for processing".to_string(),
                progress: 0.0,
                result: None,
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }

    /// Most recently created jobs first
    pub fn list(&self, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|j| j.clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        jobs
    }

    /// Apply a status update, ignoring regressions and updates to jobs
    /// already in a terminal state. The result is stored only alongside
    /// a transition to Completed.
    pub fn update(
        &self,
        id: Uuid,
        status: PredictionStatus,
        message: &str,
        progress: f64,
        result: Option<PredictionOutcome>,
    ) {
        let Some(mut job) = self.jobs.get_mut(&id) else {
            tracing::warn!(%id, "status update for unknown job");
            return;
        };
        if job.status.is_terminal() {
            tracing::warn!(%id, ?status, "ignoring update to terminal job");
            return;
        }
        if status.rank() < job.status.rank() {
            tracing::warn!(
                %id,
                from = ?job.status,
                to = ?status,
                "ignoring status regression"
            );
            return;
        }

        job.status = status;
        job.message = message.to_string();
        job.progress = job.progress.max(progress);
        job.updated_at = Utc::now();
        job.result = if status == PredictionStatus::Completed {
            result
        } else {
            None
        };
    }
}

/// Mirrors one job's stage transitions into the store
struct JobProgress {
    store: Arc<JobStore>,
    id: Uuid,
}

impl StageObserver for JobProgress {
    fn on_transition(&self, status: PredictionStatus, message: &str, progress: f64) {
        self.store.update(self.id, status, message, progress, None);
    }
}

/// Owns the job store and the background tasks driving each job.
pub struct JobTracker {
    store: Arc<JobStore>,
    service: Arc<PredictionService>,
    handles: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl JobTracker {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            service,
            handles: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<JobStore> {
        Arc::clone(&self.store)
    }

    /// Number of background tasks still tracked
    pub fn active_tasks(&self) -> usize {
        self.handles.len()
    }

    /// Create a job and spawn its pipeline run. The spawned task always
    /// drives the job to a terminal state, including on panic, and drops
    /// its own handle entry on the way out.
    pub fn submit(&self, prediction_text: String, options: PredictionOptions) -> Uuid {
        self.handles.retain(|_, handle| !handle.is_finished());

        let id = self.store.create();
        let store = Arc::clone(&self.store);
        let service = Arc::clone(&self.service);
        let handles = Arc::clone(&self.handles);

        let handle = tokio::spawn(async move {
            let observer = JobProgress {
                store: Arc::clone(&store),
                id,
            };
            let run = service.run_pipeline(&prediction_text, &options, &observer);
            match std::panic::AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(outcome)) => {
                    store.update(
                        id,
                        PredictionStatus::Completed,
                        "Prediction processing completed",
                        100.0,
                        Some(outcome),
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(%id, "prediction job failed: {e}");
                    store.update(
                        id,
                        PredictionStatus::Failed,
                        &format!("Prediction processing failed: {e}"),
                        100.0,
                        None,
                    );
                }
                Err(_) => {
                    tracing::error!(%id, "prediction job panicked");
                    store.update(
                        id,
                        PredictionStatus::Failed,
                        "Prediction processing failed: internal error",
                        100.0,
                        None,
                    );
                }
            }
            handles.remove(&id);
        });
        self.handles.insert(id, handle);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.store.get(id)
    }

    pub fn list(&self, limit: usize) -> Vec<Job> {
        self.store.list(limit)
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        for entry in self.handles.iter() {
            entry.value().abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending() {
        let store = JobStore::new();
        let id = store.create();
        let job = store.get(id).unwrap();
        assert_eq!(job.status, PredictionStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.result.is_none());
    }

    #[test]
    fn update_rejects_regression() {
        let store = JobStore::new();
        let id = store.create();
        store.update(id, PredictionStatus::FindingTickers, "tickers", 50.0, None);
        store.update(id, PredictionStatus::Analyzing, "back?", 10.0, None);
        let job = store.get(id).unwrap();
        assert_eq!(job.status, PredictionStatus::FindingTickers);
        assert_eq!(job.progress, 50.0);
    }

    #[test]
    fn terminal_state_absorbs() {
        let store = JobStore::new();
        let id = store.create();
        store.update(id, PredictionStatus::Failed, "boom", 100.0, None);
        store.update(
            id,
            PredictionStatus::Completed,
            "late success",
            100.0,
            None,
        );
        let job = store.get(id).unwrap();
        assert_eq!(job.status, PredictionStatus::Failed);
        assert_eq!(job.message, "boom");
    }

    #[test]
    fn progress_never_decreases() {
        let store = JobStore::new();
        let id = store.create();
        store.update(id, PredictionStatus::Researching, "research", 30.0, None);
        store.update(
            id,
            PredictionStatus::FindingTickers,
            "tickers",
            10.0,
            None,
        );
        assert_eq!(store.get(id).unwrap().progress, 30.0);
    }

    fn dummy_outcome() -> PredictionOutcome {
        serde_json::from_value(serde_json::json!({
            "prediction_text": "p",
            "analysis": {
                "timing": "1 year",
                "confidence": 0.5,
                "tolerance": 0.5,
                "related_industries": [],
                "name": "n",
                "category": "c",
                "best_case_scenario": "b",
                "worst_case_scenario": "w"
            },
            "market_research": null,
            "relevant_tickers": { "tickers": [] },
            "investment_strategy": {
                "name": "s",
                "description": "d",
                "pros": [],
                "cons": [],
                "timing": "1 year",
                "risk": 0.5,
                "estimated_return": 1.0,
                "involved_tickers": [],
                "trades": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn result_only_stored_on_completion() {
        let store = JobStore::new();
        let id = store.create();
        store.update(
            id,
            PredictionStatus::Failed,
            "boom",
            100.0,
            Some(dummy_outcome()),
        );
        assert!(store.get(id).unwrap().result.is_none());

        let id = store.create();
        store.update(
            id,
            PredictionStatus::Completed,
            "done",
            100.0,
            Some(dummy_outcome()),
        );
        assert!(store.get(id).unwrap().result.is_some());
    }

    #[test]
    fn list_orders_newest_first_and_limits() {
        let store = JobStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(store.create());
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        let listed = store.list(2);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }
}
