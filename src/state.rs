//! Application state shared by all handlers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::keystore::KeyStore;
use crate::types::HealthResponse;

/// Per-call counters
///
/// `echo_handled` and `add_handled` move only once business logic runs,
/// so they show whether a rejected call ever reached its handler.
#[derive(Debug, Default)]
pub struct CallStats {
    pub echo_handled: AtomicU64,
    pub add_handled: AtomicU64,
    pub rejected: AtomicU64,
}

pub struct AppState {
    /// Trusted keys, injected by whoever builds the server
    pub keys: Arc<dyn KeyStore>,
    pub stats: CallStats,
    pub config: Config,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, keys: Arc<dyn KeyStore>) -> Arc<Self> {
        Arc::new(Self {
            keys,
            stats: CallStats::default(),
            config,
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }

    pub fn record_rejected(&self) {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn echo_handled(&self) -> u64 {
        self.stats.echo_handled.load(Ordering::Relaxed)
    }

    pub fn add_handled(&self) -> u64 {
        self.stats.add_handled.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.stats.rejected.load(Ordering::Relaxed)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".into(),
            version: self.config.version.clone(),
            started_at: self.started_at,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            trusted_keys: self.keys.trusted_count(),
            echo_handled: self.echo_handled(),
            add_handled: self.add_handled(),
            rejected: self.rejected(),
        }
    }
}
