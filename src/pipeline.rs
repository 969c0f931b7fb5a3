use crate::db::Store;
use crate::error::{AppError, Result};
use crate::feed::{Discovery, FeedSource};
use crate::matcher::find_hits;
use crate::models::RefreshReport;
use crate::services::{ContentExtractor, Notifier};

/// Drives one discovery → extract → match → notify cycle over all newly
/// discovered items, in discovery order.
pub struct Refresher<'a, F, E, N> {
    store: &'a Store,
    discovery: Discovery<F>,
    extractor: E,
    notifier: N,
}

impl<'a, F, E, N> Refresher<'a, F, E, N>
where
    F: FeedSource,
    E: ContentExtractor,
    N: Notifier,
{
    pub fn new(store: &'a Store, source: F, extractor: E, notifier: N) -> Self {
        Self {
            store,
            discovery: Discovery::new(source),
            extractor,
            notifier,
        }
    }

    /// One full cycle. A discovery failure aborts the cycle before anything
    /// is committed. After that, failures are contained per item or per
    /// subscriber: a bad page or a bounced send never blocks the rest.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let new_addresses = self.discovery.discover_new(self.store).await?;
        let mut report = RefreshReport::default();

        for address in new_addresses {
            tracing::info!("processing {}", address);

            let extracted = match self.extractor.extract(&address).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    tracing::warn!("extraction failed for {}: {}", address, e);
                    report.skipped += 1;
                    continue;
                }
            };

            // A concurrent cycle may have recorded this address since
            // discovery; the unique constraint on address is the arbiter.
            match self
                .store
                .record_item(&address, extracted.markup.clone())
                .await
            {
                Ok(()) => {}
                Err(AppError::DuplicateKey(_)) => {
                    tracing::debug!("{} already recorded, skipping", address);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
            report.new_items += 1;

            // Subscribers are re-fetched per item so a mid-cycle change is
            // picked up on the next item.
            for subscriber in self.store.list_subscribers().await? {
                let terms = match self.store.get_search_terms(&subscriber.email).await {
                    Ok(terms) => terms,
                    Err(e) => {
                        tracing::error!("term lookup failed for {}: {}", subscriber.email, e);
                        continue;
                    }
                };

                let hits = find_hits(&extracted.text, &terms);
                if hits.is_empty() {
                    continue;
                }

                match self
                    .store
                    .record_alert_link(&subscriber.email, &address)
                    .await
                {
                    Ok(()) => {}
                    Err(e @ (AppError::UnknownSubscriber(_) | AppError::UnknownItem(_))) => {
                        // The subscriber and item were both fetched moments
                        // ago; losing one here is a consistency fault scoped
                        // to this alert.
                        tracing::error!(
                            "alert link {} -> {} not recorded: {}",
                            subscriber.email,
                            address,
                            e
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                }

                match self.notifier.notify(&subscriber, &hits, &address).await {
                    Ok(()) => report.alerts_sent += 1,
                    Err(e) => {
                        tracing::warn!("notification to {} failed: {}", subscriber.email, e)
                    }
                }
            }
        }

        Ok(report)
    }
}
