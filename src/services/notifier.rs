use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{Advisory, Severity};

/// Narrow channel through which the sync layer talks to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, advisory: Advisory);
}

fn log_advisory(advisory: &Advisory) {
    match advisory.severity {
        Severity::Error => tracing::error!(message = %advisory.message, "advisory"),
        Severity::Warning => tracing::warn!(message = %advisory.message, "advisory"),
        Severity::Info | Severity::Success => {
            tracing::info!(severity = ?advisory.severity, message = %advisory.message, "advisory")
        }
    }
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, advisory: Advisory) {
        log_advisory(&advisory);
    }
}

const DEFAULT_FEED_CAPACITY: usize = 256;

/// Buffers advisories until the UI drains them. Oldest entries are dropped
/// once the buffer is full.
#[derive(Debug)]
pub struct AdvisoryFeed {
    capacity: usize,
    queue: Mutex<VecDeque<Advisory>>,
}

impl Default for AdvisoryFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl AdvisoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Removes and returns everything queued so far
    pub fn drain(&self) -> Vec<Advisory> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.drain(..).collect()
    }

    /// Copies the queued advisories without consuming them
    pub fn peek(&self) -> Vec<Advisory> {
        let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.iter().cloned().collect()
    }
}

impl Notifier for AdvisoryFeed {
    fn notify(&self, advisory: Advisory) {
        log_advisory(&advisory);
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(advisory);
    }
}
