use std::collections::HashSet;

/// Signatures already handed to the notifier during this run.
///
/// Append-only and unbounded: entries are never evicted, so memory grows with
/// the number of distinct transactions seen. Owned by a single poll loop.
#[derive(Debug, Default)]
pub struct DedupWindow {
    notified: HashSet<String>,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, signature: &str) -> bool {
        self.notified.contains(signature)
    }

    /// Returns `false` if the signature was already present.
    pub fn mark_seen(&mut self, signature: &str) -> bool {
        if self.notified.contains(signature) {
            return false;
        }
        self.notified.insert(signature.to_string())
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }
}
