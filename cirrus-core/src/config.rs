//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::default_worker_threads;
use crate::transport::codec::DEFAULT_USER_AGENT;

/// Settings shared by every request a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Worker event loops; 0 = one per available core.
    pub worker_threads: usize,
    /// Bound on DNS + TCP connect + TLS handshake, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            connect_timeout_ms: 5_000,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Worker count with `0` resolved.
    pub fn resolved_worker_threads(&self) -> usize {
        match self.worker_threads {
            0 => default_worker_threads(),
            n => n,
        }
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }
}
