//! Build cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that cancels a build.
///
/// Clones observe the same flag. The graph builder checks it between
/// batches; once set, in-flight work is discarded and the build fails with
/// [`Error::Aborted`](crate::Error::Aborted).
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let signal = AbortSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_aborted());
        signal.abort();
        assert!(observer.is_aborted());
    }
}
