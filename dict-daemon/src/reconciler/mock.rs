//! Mock reconciler for testing.

use super::{ReconcileError, Reconciler};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock reconciler for testing.
///
/// Every call is recorded (including failed ones). Failures are queued and
/// consumed one per call.
#[derive(Debug, Default)]
pub struct MockReconciler {
    inner: Arc<Mutex<MockReconcilerInner>>,
}

#[derive(Debug, Default)]
struct MockReconcilerInner {
    calls: Vec<bool>,
    elapsed: Duration,
    failures: VecDeque<String>,
    restarts: usize,
}

impl MockReconciler {
    /// Create a mock reconciler reporting zero elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the elapsed time reported by successful passes.
    pub fn set_elapsed(&self, elapsed: Duration) {
        self.inner.lock().unwrap().elapsed = elapsed;
    }

    /// Queue a failure for an upcoming pass.
    pub fn fail_next(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.push_back(error.to_string());
    }

    /// Number of passes attempted.
    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// The `test_mode` flag of every pass, oldest first.
    pub fn test_mode_flags(&self) -> Vec<bool> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of `restart()` calls.
    pub fn restarts(&self) -> usize {
        self.inner.lock().unwrap().restarts
    }
}

impl Clone for MockReconciler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Reconciler for MockReconciler {
    async fn maintain(&self, test_mode: bool) -> Result<Duration, ReconcileError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(test_mode);

        if let Some(error) = inner.failures.pop_front() {
            return Err(ReconcileError::Failed(error));
        }

        Ok(inner.elapsed)
    }

    fn restart(&self) {
        self.inner.lock().unwrap().restarts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_are_consumed_in_order() {
        let reconciler = MockReconciler::new();
        reconciler.set_elapsed(Duration::from_millis(250));
        reconciler.fail_next("sheet locked");

        assert!(reconciler.maintain(false).await.is_err());
        assert_eq!(
            reconciler.maintain(true).await.unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(reconciler.test_mode_flags(), vec![false, true]);
    }
}
