use std::collections::HashSet;

/// Hosts that have already failed during the current batch.
///
/// Owned by a single `extract_batch` call and dropped with it; nothing carries
/// over between batches.
#[derive(Debug, Default)]
pub struct DomainFailureSet {
    failed: HashSet<String>,
}

impl DomainFailureSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(&self, host: &str) -> bool {
        self.failed.contains(host)
    }

    /// Marks `host` as failed. Returns `true` the first time a host trips.
    pub fn record_failure(&mut self, host: &str) -> bool {
        self.failed.insert(host.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }
}
