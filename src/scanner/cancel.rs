use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::engine::ScanError;

/// Cooperative cancellation shared between a running scan and whoever
/// scheduled it. The scanner only looks at it between probes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Raise the flag. Returns `true` if it was already raised, i.e. this is
    /// a repeated interrupt and the caller should stop waiting.
    pub fn interrupt(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<(), ScanError> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}
