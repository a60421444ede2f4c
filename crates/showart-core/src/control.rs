use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::archive::Extractor;

/// Bounded retry for deleting a freshly extracted archive that may still be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Request to stop a pipeline between stages. A running stage always completes.
#[derive(Clone, Debug, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Control options for an engine run (retry policy, extractor override, stop support).
#[derive(Debug, Default)]
pub struct EngineControl {
    pub retry: RetryPolicy,
    /// Replaces the command-line extractor named in `EngineOptions`.
    pub extractor: Option<Box<dyn Extractor>>,
    pub stop_token: Option<StopToken>,
}

impl EngineControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    pub fn with_stop_token(mut self, token: StopToken) -> Self {
        self.stop_token = Some(token);
        self
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_token.as_ref().is_some_and(StopToken::is_stopped)
    }
}
