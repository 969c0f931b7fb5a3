use crate::db::Store;
use crate::error::Result;

use super::fetcher::FeedSource;

/// Filters the feed's current entries down to addresses the store has not
/// recorded yet, preserving feed order.
pub struct Discovery<F> {
    source: F,
}

impl<F: FeedSource> Discovery<F> {
    pub fn new(source: F) -> Self {
        Self { source }
    }

    /// A feed fetch or parse failure propagates unhandled; the caller treats
    /// it as fatal for the whole cycle, never as a partial result.
    pub async fn discover_new(&self, store: &Store) -> Result<Vec<String>> {
        let entries = self.source.list_current_entries().await?;
        let known = store.list_known_addresses().await?;

        Ok(entries
            .into_iter()
            .filter(|address| !known.contains(address))
            .collect())
    }
}
