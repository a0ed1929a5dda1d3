use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::scale::{ReadingOutcome, ReadingService};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub polls: u64,
    pub successes: u64,
    pub not_found: u64,
    pub parse_failures: u64,
    pub io_errors: u64,
}

impl MonitorStats {
    fn record(&mut self, outcome: &ReadingOutcome) {
        self.polls += 1;
        match outcome {
            ReadingOutcome::Success(_) => self.successes += 1,
            ReadingOutcome::DeviceNotFound => self.not_found += 1,
            ReadingOutcome::ParseFailure => self.parse_failures += 1,
            ReadingOutcome::IoError(_) => self.io_errors += 1,
        }
    }
}

/// Polls the reading service on a fixed interval; retry cadence lives here,
/// not in `get_weight()`.
#[derive(Clone)]
pub struct MonitorService {
    reading_service: Arc<ReadingService>,
    poll_interval: Duration,
    is_running: Arc<RwLock<bool>>,
    stats: Arc<RwLock<MonitorStats>>,
}

impl MonitorService {
    pub fn new(reading_service: Arc<ReadingService>, poll_interval: Duration) -> Self {
        Self {
            reading_service,
            poll_interval,
            is_running: Arc::new(RwLock::new(false)),
            stats: Arc::new(RwLock::new(MonitorStats::default())),
        }
    }

    /// One poll; the blocking read runs off the async workers.
    pub async fn poll_once(&self) -> ReadingOutcome {
        let service = self.reading_service.clone();
        let outcome = match tokio::task::spawn_blocking(move || service.get_weight()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Scale poll task failed: {}", e);
                ReadingOutcome::IoError(e.to_string())
            }
        };

        self.stats.write().await.record(&outcome);
        outcome
    }

    /// Polls until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        {
            let mut running = self.is_running.write().await;
            if *running {
                info!("⚖️  Monitor already running");
                return;
            }
            *running = true;
        }

        info!("⚖️  Polling scale every {:?}", self.poll_interval);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_label = "";

        while *self.is_running.read().await {
            ticker.tick().await;
            if !*self.is_running.read().await {
                break;
            }

            let outcome = self.poll_once().await;
            match &outcome {
                ReadingOutcome::Success(reading) => info!("⚖️  {}", reading),
                ReadingOutcome::DeviceNotFound => warn!("✗ Disconnected: USB scale not found"),
                ReadingOutcome::ParseFailure => warn!("⚠ Scale error: unreadable frame"),
                ReadingOutcome::IoError(detail) => warn!("⚠ Scale error: {}", detail),
            }

            if outcome.label() != last_label {
                info!("🔁 Scale status: {}", outcome.label());
                last_label = outcome.label();
            }
        }

        info!("⚖️  Monitor stopped");
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        info!("⚖️  Monitor stopping...");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }
}
