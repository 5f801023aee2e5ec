//! In-memory alert store.
//!
//! The scheduler is the only writer. Readers take an `Arc` snapshot of the
//! current set or subscribe to replacements through a watch channel, so a
//! reader always sees either the old set or the new one.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ingestion::{CycleState, FileFailure, NormalizedAlert};
use serde::Serialize;
use tokio::sync::{watch, Mutex};

/// The alert set published by the last successful cycle.
#[derive(Debug, Clone, Default)]
pub struct AlertSnapshot {
    pub alerts: Vec<NormalizedAlert>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Cycle that produced this set.
    pub cycle_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Success,
    Failed,
}

/// Summary of one ingestion cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: CycleStatus,
    /// Stage that failed, for failed cycles.
    pub failed_stage: Option<CycleState>,
    pub alerts: usize,
    pub files_total: usize,
    pub files_parsed: usize,
    pub files_failed: Vec<FileFailure>,
    pub error_message: Option<String>,
}

pub struct AlertStore {
    current: watch::Sender<Arc<AlertSnapshot>>,
    history: Mutex<VecDeque<CycleRecord>>,
    max_history: usize,
}

impl AlertStore {
    pub fn new(max_history: usize) -> Self {
        let (current, _) = watch::channel(Arc::new(AlertSnapshot::default()));
        Self {
            current,
            history: Mutex::new(VecDeque::new()),
            max_history: max_history.max(1),
        }
    }

    /// The current alert set.
    pub fn snapshot(&self) -> Arc<AlertSnapshot> {
        self.current.borrow().clone()
    }

    /// Receive every published replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AlertSnapshot>> {
        self.current.subscribe()
    }

    /// Replace the whole alert set.
    pub fn replace(&self, alerts: Vec<NormalizedAlert>, cycle_id: &str) {
        let snapshot = AlertSnapshot {
            alerts,
            updated_at: Some(Utc::now()),
            cycle_id: Some(cycle_id.to_string()),
        };
        self.current.send_replace(Arc::new(snapshot));
    }

    pub async fn record(&self, record: CycleRecord) {
        let mut history = self.history.lock().await;
        history.push_front(record);
        while history.len() > self.max_history {
            history.pop_back();
        }
    }

    pub async fn last_cycle(&self) -> Option<CycleRecord> {
        self.history.lock().await.front().cloned()
    }

    /// Recorded cycles, most recent first.
    pub async fn recent_cycles(&self, limit: usize) -> Vec<CycleRecord> {
        self.history
            .lock()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }
}
