use std::sync::Arc;
use std::time::{ Duration, Instant };

use async_trait::async_trait;
use chrono::Utc;
use tracing::{ debug, warn };

use crate::error::ArbitrageError;
use crate::exchange::client::ExchangeClient;
use crate::models::quote::Snapshot;
use super::SnapshotSource;

/// Fetches a batch of book tickers every `interval`.
///
/// The first snapshot is fetched without waiting. Every later call sleeps
/// the full interval first, so the gap is measured from the end of one
/// fetch and drifts with slow fetches.
pub struct PollSource<C: ?Sized> {
    client: Arc<C>,
    interval: Duration,
    started: bool,
}

impl<C> PollSource<C> where C: ExchangeClient + ?Sized {
    pub fn new(client: Arc<C>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            started: false,
        }
    }
}

#[async_trait]
impl<C> SnapshotSource for PollSource<C> where C: ExchangeClient + ?Sized + 'static {
    async fn next_snapshot(&mut self) -> Result<Snapshot, ArbitrageError> {
        if self.started {
            tokio::time::sleep(self.interval).await;
        }
        self.started = true;

        let start = Instant::now();
        let quotes = self.client.get_book_tickers().await.map_err(|e| {
            warn!("Book ticker poll failed: {}", e);
            e
        })?;

        let snapshot = Snapshot::from_quotes(Utc::now(), quotes);
        debug!("Polled {} quotes in {:.2?}", snapshot.len(), start.elapsed());

        Ok(snapshot)
    }

    fn mode(&self) -> &'static str {
        "poll"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::Quote;
    use crate::source::testing::ScriptedClient;
    use std::sync::atomic::Ordering;

    fn quotes() -> Vec<Quote> {
        vec![Quote::new("BTCUSDT", Some(10000.0), Some(9999.0))]
    }

    #[tokio::test(start_paused = true)]
    async fn first_snapshot_is_immediate_then_interval_holds() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        client.push_tickers(Ok(quotes()));
        client.push_tickers(Ok(quotes()));
        let mut source = PollSource::new(client.clone(), Duration::from_secs(5));

        let t0 = tokio::time::Instant::now();
        let first = source.next_snapshot().await.unwrap();
        assert_eq!(t0.elapsed(), Duration::ZERO);
        assert_eq!(first.ask_price("BTCUSDT"), Some(10000.0));

        source.next_snapshot().await.unwrap();
        assert!(t0.elapsed() >= Duration::from_secs(5));
        assert_eq!(client.ticker_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_returned_and_next_call_still_waits() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        client.push_tickers(Err(ArbitrageError::fetch("HTTP 503")));
        client.push_tickers(Ok(quotes()));
        let mut source = PollSource::new(client.clone(), Duration::from_secs(2));

        let t0 = tokio::time::Instant::now();
        assert!(matches!(source.next_snapshot().await, Err(ArbitrageError::FetchFailure(_))));

        let snapshot = source.next_snapshot().await.unwrap();
        assert!(t0.elapsed() >= Duration::from_secs(2));
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_on_its_own() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        client.push_tickers(Err(ArbitrageError::fetch("HTTP 500")));
        let mut source = PollSource::new(client.clone(), Duration::from_secs(1));

        let _ = source.next_snapshot().await;

        assert_eq!(client.ticker_calls.load(Ordering::SeqCst), 1);
    }
}
