use parking_lot::Mutex;

use crate::error::{CompositeError, ServiceError};

/// Shared sink for failures raised by pooled workers
///
/// Workers record concurrently; the submitter inspects the collection once
/// every submission has completed and surfaces only the first failure.
#[derive(Debug, Default)]
pub struct ExceptionCollector {
    failures: Mutex<Vec<ServiceError>>,
}

impl ExceptionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: ServiceError) {
        self.failures.lock().push(error);
    }

    pub fn clear(&self) {
        self.failures.lock().clear();
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.lock().is_empty()
    }

    /// Drain the collected failures into a composite error, first one leading
    pub fn take_composite(&self, submitted: usize) -> Option<CompositeError> {
        let mut failures = std::mem::take(&mut *self.failures.lock());
        if failures.is_empty() {
            return None;
        }
        let failed = failures.len();
        let first = failures.swap_remove(0);
        Some(CompositeError {
            first: Box::new(first),
            failed,
            submitted,
        })
    }
}
