use serde::Serialize;

use kbase_core::types::Namespace;

/// Outcome of a reset: which namespaces were wiped, which could not be, and
/// how many sample chunks were restored into the default namespace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetReport {
    pub cleared: Vec<Namespace>,
    pub failed: Vec<(Namespace, String)>,
    /// Set when namespaces could not be enumerated; only the default
    /// namespace was cleared and others may still hold data.
    pub listing_error: Option<String>,
    /// `None` when the sample document could not be found.
    pub sample_chunks: Option<usize>,
}

impl ResetReport {
    /// Every namespace was wiped and the sample was restored.
    pub fn succeeded(&self) -> bool {
        self.listing_error.is_none() && self.failed.is_empty() && self.sample_chunks.is_some()
    }

    pub(crate) fn record(mut self, namespace: Namespace, outcome: kbase_core::Result<()>) -> Self {
        match outcome {
            Ok(()) => self.cleared.push(namespace),
            Err(e) => self.failed.push((namespace, e.to_string())),
        }
        self
    }
}
