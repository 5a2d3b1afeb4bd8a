use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tracing::trace;

use crate::error::ArbitrageError;
use crate::exchange::client::QuoteFeed;
use crate::models::quote::{ Quote, QuoteMap, Snapshot };
use super::SnapshotSource;

/// Emits snapshots from pushed quote updates.
///
/// Updates are folded into a last-value map, so each snapshot carries the
/// latest known quote of every symbol seen so far. Without a throttle every
/// update yields a snapshot. With one, the first update is emitted at once
/// and later snapshots are at least `throttle` apart; updates arriving in
/// between are folded in, and a quiet feed is awaited for one more update.
pub struct PushSource<F> {
    feed: F,
    quotes: Arc<QuoteMap>,
    throttle: Option<Duration>,
    last_emit: Option<Instant>,
}

impl<F> PushSource<F> where F: QuoteFeed {
    pub fn new(feed: F) -> Self {
        Self {
            feed,
            quotes: Arc::new(QuoteMap::default()),
            throttle: None,
            last_emit: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Number of distinct symbols seen so far
    #[inline]
    pub fn known_symbols(&self) -> usize {
        self.quotes.len()
    }

    fn apply(&mut self, quote: Quote) {
        trace!(symbol = %quote.symbol_id, "Quote update");
        // copies the map only while the previous snapshot is still held
        Arc::make_mut(&mut self.quotes).insert(quote.symbol_id.clone(), quote);
    }

    /// Fold every update that arrives before `deadline`, then make sure at
    /// least one was seen
    async fn fold_until(&mut self, deadline: Instant) -> Result<(), ArbitrageError> {
        let mut fresh = false;

        while Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, self.feed.next_quote()).await {
                Ok(quote) => {
                    self.apply(quote?);
                    fresh = true;
                }
                Err(_) => {
                    break;
                }
            }
        }

        if !fresh {
            let quote = self.feed.next_quote().await?;
            self.apply(quote);
        }

        Ok(())
    }
}

#[async_trait]
impl<F> SnapshotSource for PushSource<F> where F: QuoteFeed + 'static {
    async fn next_snapshot(&mut self) -> Result<Snapshot, ArbitrageError> {
        match (self.throttle, self.last_emit) {
            (Some(throttle), Some(last)) => self.fold_until(last + throttle).await?,
            _ => {
                let quote = self.feed.next_quote().await?;
                self.apply(quote);
            }
        }

        self.last_emit = Some(Instant::now());
        trace!(known_symbols = self.known_symbols(), "Push snapshot");

        Ok(Snapshot::new(Utc::now(), self.quotes.clone()))
    }

    fn mode(&self) -> &'static str {
        match self.throttle {
            Some(_) => "throttled push",
            None => "push",
        }
    }
}
