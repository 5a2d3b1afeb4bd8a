// src/source/mod.rs

pub mod poll;
pub mod push;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{ self, BoxStream, StreamExt };
use tracing::info;

use crate::config::{ Config, SourceMode };
use crate::error::ArbitrageError;
use crate::exchange::book_ticker_stream::BookTickerStream;
use crate::exchange::client::ExchangeClient;
use crate::models::quote::Snapshot;
use crate::models::topology::ExchangeTopology;

pub use poll::PollSource;
pub use push::PushSource;

/// Never-ending producer of market snapshots.
///
/// Each call either yields the next snapshot or reports the failure of that
/// one iteration. Sources do not retry on their own.
#[async_trait]
pub trait SnapshotSource: Send + 'static {
    async fn next_snapshot(&mut self) -> Result<Snapshot, ArbitrageError>;

    fn mode(&self) -> &'static str;

    /// Consume the source into a lazy, infinite stream
    fn into_stream(self: Box<Self>) -> BoxStream<'static, Result<Snapshot, ArbitrageError>> {
        stream
            ::unfold(self, |mut source| async move {
                let item = source.next_snapshot().await;
                Some((item, source))
            })
            .boxed()
    }
}

/// Pick the source variant for the configured mode
pub async fn build_source(
    config: &Config,
    client: Arc<dyn ExchangeClient>,
    topology: &ExchangeTopology
) -> Result<Box<dyn SnapshotSource>, ArbitrageError> {
    let source: Box<dyn SnapshotSource> = match config.source_mode() {
        SourceMode::Poll(interval) => Box::new(PollSource::new(client, interval)),
        SourceMode::Push => {
            let symbol_ids = topology.symbol_ids();
            let feed = BookTickerStream::connect(
                &config.ws_url,
                config.api_key.as_deref(),
                &symbol_ids
            ).await?;

            match config.push_throttle() {
                Some(throttle) => Box::new(PushSource::new(feed).with_throttle(throttle)),
                None => Box::new(PushSource::new(feed)),
            }
        }
    };

    info!("Snapshot source ready in {} mode", source.mode());

    Ok(source)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{ ScriptedClient, ScriptedFeed };
    use crate::models::quote::Quote;

    #[tokio::test(start_paused = true)]
    async fn stream_yields_each_iteration_including_failures() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        client.push_tickers(Ok(vec![Quote::new("BTCUSDT", Some(1.0), Some(1.0))]));
        client.push_tickers(Err(ArbitrageError::fetch("HTTP 500")));
        client.push_tickers(Ok(vec![]));

        let source: Box<dyn SnapshotSource> = Box::new(
            PollSource::new(client.clone(), std::time::Duration::from_secs(1))
        );
        let items: Vec<_> = source.into_stream().take(3).collect().await;

        assert_eq!(items[0].as_ref().unwrap().len(), 1);
        assert!(matches!(items[1], Err(ArbitrageError::FetchFailure(_))));
        assert!(items[2].as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_stream_ends_items_with_stream_closed() {
        let feed = ScriptedFeed::new(vec![Ok(Quote::new("BTCUSDT", Some(1.0), Some(1.0)))]);
        let source: Box<dyn SnapshotSource> = Box::new(PushSource::new(feed));

        let items: Vec<_> = source.into_stream().take(2).collect().await;

        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ArbitrageError::StreamClosed)));
    }

    #[tokio::test]
    async fn builds_poll_source_when_interval_is_set() {
        let config = Config::from_lookup(|key: &str| {
            (key == "TRI_POLL_INTERVAL_SECS").then(|| "2".to_string())
        }).unwrap();

        let source = build_source(
            &config,
            Arc::new(ScriptedClient::new(vec![])),
            &ExchangeTopology::default()
        ).await.unwrap();

        assert_eq!(source.mode(), "poll");
    }

    #[tokio::test]
    async fn builds_throttled_push_source_when_throttle_is_set() {
        use futures::SinkExt;
        use tokio::net::TcpListener;
        use tokio_tungstenite::accept_async;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            let request = ws.next().await;
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            request.is_some()
        });

        let config = Config::from_lookup(move |key: &str| {
            match key {
                "TRI_WS_URL" => Some(ws_url.clone()),
                "TRI_PUSH_THROTTLE_SECS" => Some("0.5".to_string()),
                _ => None,
            }
        }).unwrap();
        let topology = crate::arbitrage::topology::resolve_topology(
            &[
                crate::models::symbol::Symbol::new("BTCUSDT", "BTC", "USDT"),
                crate::models::symbol::Symbol::new("ETHUSDT", "ETH", "USDT"),
                crate::models::symbol::Symbol::new("ETHBTC", "ETH", "BTC"),
            ],
            "USDT"
        );

        let source = build_source(&config, Arc::new(ScriptedClient::new(vec![])), &topology).await.unwrap();
        assert_eq!(source.mode(), "throttled push");

        let items: Vec<_> = source.into_stream().take(1).collect().await;
        assert!(matches!(items[0], Err(ArbitrageError::StreamClosed)));
        assert!(server.await.unwrap());
    }
}
