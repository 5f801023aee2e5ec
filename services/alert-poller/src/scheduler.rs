//! Polling scheduler.
//!
//! Runs one ingestion cycle per tick. A tick that fires while a cycle is
//! still running is skipped. A failed cycle leaves the current alert set
//! untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ingestion::{CycleOutcome, IngestionPipeline};
use metrics::{counter, gauge};
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::state::{AlertStore, CycleRecord, CycleStatus};

pub struct Scheduler {
    pipeline: IngestionPipeline,
    store: Arc<AlertStore>,
    poll_interval: Duration,
    running: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        pipeline: IngestionPipeline,
        store: Arc<AlertStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            store,
            poll_interval,
            running: Mutex::new(()),
        }
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// Run a cycle unless one is already in flight. Returns `None` when the
    /// tick was skipped.
    pub async fn tick(&self) -> Option<CycleRecord> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous ingestion cycle still running, skipping tick");
            counter!("alert_cycles_total", "outcome" => "skipped").increment(1);
            return None;
        };
        Some(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> CycleRecord {
        let id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(cycle = %id, source = %self.pipeline.source_name(), "Starting ingestion cycle");

        let outcome = self.pipeline.run().await;
        let completed_at = Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;

        let record = match outcome {
            CycleOutcome::Completed(report) => {
                let alert_count = report.alerts.len();
                counter!("alert_cycles_total", "outcome" => "success").increment(1);
                counter!("alert_files_failed_total").increment(report.failures.len() as u64);
                gauge!("alerts_current").set(alert_count as f64);

                self.store.replace(report.alerts, &id);
                info!(
                    cycle = %id,
                    alerts = alert_count,
                    duration_ms = duration_ms,
                    "Alert set replaced"
                );

                CycleRecord {
                    id,
                    started_at,
                    completed_at,
                    duration_ms,
                    status: CycleStatus::Success,
                    failed_stage: None,
                    alerts: alert_count,
                    files_total: report.files_total,
                    files_parsed: report.files_parsed,
                    files_failed: report.failures,
                    error_message: None,
                }
            }
            CycleOutcome::Failed { stage, error } => {
                counter!("alert_cycles_total", "outcome" => "failed").increment(1);
                warn!(
                    cycle = %id,
                    stage = ?stage,
                    error = %error,
                    held_alerts = self.store.snapshot().alerts.len(),
                    "Ingestion cycle failed, keeping previous alerts"
                );

                CycleRecord {
                    id,
                    started_at,
                    completed_at,
                    duration_ms,
                    status: CycleStatus::Failed,
                    failed_stage: Some(stage),
                    alerts: 0,
                    files_total: 0,
                    files_parsed: 0,
                    files_failed: Vec::new(),
                    error_message: Some(error.to_string()),
                }
            }
        };

        self.store.record(record.clone()).await;
        record
    }

    /// Poll until a shutdown signal arrives. The first tick fires
    /// immediately.
    pub async fn run_forever(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Starting alert polling"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = interval.tick() => {
                    // Detached: an overlapping tick must reach the guard.
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        scheduler.tick().await;
                    });
                }
            }
        }
    }
}
