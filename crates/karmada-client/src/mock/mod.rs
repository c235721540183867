//! In-memory Karmada clients for unit testing
//!
//! - `member.rs` - member cluster pods, namespaces and CRDs
//! - `propagation.rs` - PropagationPolicies on the control plane
//!
//! Both mocks record every mutating call so tests can assert that a steady
//! state reconcile issues no writes.

mod member;
mod propagation;

pub use member::MockMemberClusterClient;
pub use propagation::MockPropagationClient;

use std::sync::{Arc, Mutex};

/// Ordered log of mutating calls, shared between clones of a mock
#[derive(Clone, Default)]
pub(crate) struct WriteLog(Arc<Mutex<Vec<String>>>);

impl WriteLog {
    pub(crate) fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}
