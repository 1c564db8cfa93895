// Sync state management.
// Tracks connection status, pass metrics and the activity log, and runs the periodic sync loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::reconcile::{Reconciler, SyncOutcome};

/// Most activity messages kept for display.
const MAX_MESSAGES: usize = 50;

/// Reachability of the photo server as seen by the last pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No pass has completed yet.
    #[default]
    Connecting,
    /// Server reachable and listing photos.
    Online,
    /// Server unreachable; showing cached photos.
    Offline,
    /// Server reachable but has no photos.
    Empty,
    /// Server unreachable and nothing cached.
    Unreachable,
}

impl ConnectionStatus {
    /// Label and color name for the status bar.
    pub fn display(&self) -> (&'static str, &'static str) {
        match self {
            ConnectionStatus::Connecting => ("CONNECTING", "yellow"),
            ConnectionStatus::Online => ("ONLINE", "green"),
            ConnectionStatus::Offline => ("OFFLINE", "yellow"),
            ConnectionStatus::Empty => ("ONLINE", "green"),
            ConnectionStatus::Unreachable => ("OFFLINE", "red"),
        }
    }

    /// Whether there is nothing to show.
    pub fn is_empty_state(&self) -> bool {
        matches!(self, ConnectionStatus::Empty | ConnectionStatus::Unreachable)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ConnectionStatus::Offline | ConnectionStatus::Unreachable)
    }
}

/// Activity message level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

/// A message for the activity log.
#[derive(Debug, Clone)]
pub struct ActivityMessage {
    pub level: ActivityLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ActivityLevel::Info,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: ActivityLevel::Warn,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ActivityLevel::Error,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Counters collected across sync passes.
#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub passes: u64,
    pub offline_passes: u64,
    /// Slots served from cache in the last pass.
    pub cached_slots: usize,
    /// Slots still on their remote url in the last pass.
    pub remote_slots: usize,
    pub photos_backfilled: u64,
}

/// Sync status shown by the UI.
#[derive(Debug, Default)]
pub struct SyncState {
    pub status: ConnectionStatus,
    pub last_online: Option<DateTime<Utc>>,
    pub metrics: SyncMetrics,
    pub messages: VecDeque<ActivityMessage>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a pass, logging status transitions.
    pub fn record_pass(&mut self, outcome: &SyncOutcome) {
        let previous = self.status;
        self.status = outcome.status;
        self.metrics.passes += 1;

        let cached = outcome.sequence.items().iter().filter(|i| i.is_cached()).count();
        self.metrics.cached_slots = cached;
        self.metrics.remote_slots = outcome.sequence.len() - cached;

        match outcome.status {
            ConnectionStatus::Online | ConnectionStatus::Empty => {
                self.last_online = Some(Utc::now());
            }
            ConnectionStatus::Offline | ConnectionStatus::Unreachable => {
                self.metrics.offline_passes += 1;
            }
            ConnectionStatus::Connecting => {}
        }

        if previous != outcome.status {
            let message = match outcome.status {
                ConnectionStatus::Online => {
                    ActivityMessage::info(format!("Online, {} photos", outcome.sequence.len()))
                }
                ConnectionStatus::Empty => ActivityMessage::info("Online, no photos uploaded yet"),
                ConnectionStatus::Offline => ActivityMessage::warn(format!(
                    "Server unreachable, showing {} cached photos",
                    outcome.sequence.len()
                )),
                ConnectionStatus::Unreachable => {
                    ActivityMessage::error("Server unreachable and no cached photos")
                }
                ConnectionStatus::Connecting => return,
            };
            self.push(message);
        }
    }

    /// Note a completed background download.
    pub fn record_backfill(&mut self) {
        self.metrics.photos_backfilled += 1;
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(ActivityMessage::info(message));
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(ActivityMessage::warn(message));
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push(ActivityMessage::error(message));
    }

    /// Most recent message, if any.
    pub fn latest(&self) -> Option<&ActivityMessage> {
        self.messages.back()
    }

    pub fn push(&mut self, message: ActivityMessage) {
        self.messages.push_back(message);
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_front();
        }
    }
}

/// Run a reconciliation pass every `period` until the receiver goes away.
///
/// Each pass completes before the next tick is taken, so passes never overlap.
pub async fn run_sync_loop(
    reconciler: Arc<Reconciler>,
    period: Duration,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
    mut refresh: mpsc::UnboundedReceiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = refresh.recv() => ticker.reset(),
        }

        let outcome = reconciler.sync().await;
        tracing::debug!(status = ?outcome.status, photos = outcome.sequence.len(), "sync pass complete");
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}
