use async_trait::async_trait;
use tokio_tungstenite::{ connect_async, MaybeTlsStream, WebSocketStream };
use futures::{ SinkExt, StreamExt };
use tokio::net::TcpStream;
use tungstenite::{ client::IntoClientRequest, http::HeaderValue, protocol::Message, Utf8Bytes };
use tracing::{ debug, error, info, trace, warn };
use std::sync::Arc;
use std::time::Duration;

use crate::error::ArbitrageError;
use crate::exchange::client::QuoteFeed;
use crate::models::binance_models::{ StreamFrame, StreamSubscription };
use crate::models::quote::Quote;

/// Streams per `SUBSCRIBE` request
const SUBSCRIBE_BATCH: usize = 100;

/// Gap between subscription requests; the API caps incoming messages per second
const SUBSCRIBE_GAP: Duration = Duration::from_millis(250);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the `SUBSCRIBE` requests covering `<symbol>@bookTicker` for every id
pub fn subscription_batches(symbol_ids: &[Arc<str>], batch_size: usize) -> Vec<StreamSubscription> {
    symbol_ids
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(i, chunk)| StreamSubscription {
            method: "SUBSCRIBE",
            params: chunk
                .iter()
                .map(|id| format!("{}@bookTicker", id.to_lowercase()))
                .collect(),
            id: (i as u64) + 1,
        })
        .collect()
}

/// Push feed of `bookTicker` updates over one websocket connection.
///
/// Once the socket ends or errors the feed is spent; every later call
/// returns `StreamClosed`.
pub struct BookTickerStream {
    ws_stream: WsStream,
    closed: bool,
}

impl BookTickerStream {
    /// Connect to `ws_url` and subscribe the book ticker of every symbol
    pub async fn connect(
        ws_url: &str,
        api_key: Option<&str>,
        symbol_ids: &[Arc<str>]
    ) -> Result<Self, ArbitrageError> {
        info!("Connecting to Binance WebSocket: {}", ws_url);

        let mut request = ws_url
            .into_client_request()
            .map_err(|e| ArbitrageError::fetch(format!("Invalid websocket URL {}: {}", ws_url, e)))?;

        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key).map_err(|e|
                ArbitrageError::Config(format!("Invalid API key header: {}", e))
            )?;
            request.headers_mut().insert("X-MBX-APIKEY", value);
        }

        let (ws_stream, _) = connect_async(request).await.map_err(|e|
            ArbitrageError::fetch(format!("Failed to connect to Binance WebSocket: {}", e))
        )?;

        info!("Connected to Binance WebSocket");

        let mut stream = Self {
            ws_stream,
            closed: false,
        };
        stream.subscribe(symbol_ids).await?;

        Ok(stream)
    }

    async fn subscribe(&mut self, symbol_ids: &[Arc<str>]) -> Result<(), ArbitrageError> {
        let batches = subscription_batches(symbol_ids, SUBSCRIBE_BATCH);
        let count = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(SUBSCRIBE_GAP).await;
            }

            let payload = serde_json
                ::to_string(&batch)
                .map_err(|e| ArbitrageError::fetch(format!("Failed to encode subscription: {}", e)))?;

            self.ws_stream
                .send(Message::Text(Utf8Bytes::from(payload))).await
                .map_err(|e| ArbitrageError::fetch(format!("Failed to send subscription: {}", e)))?;

            debug!("Sent subscription request {} with {} streams", batch.id, batch.params.len());
        }

        info!("Subscribed to book tickers of {} symbols in {} requests", symbol_ids.len(), count);

        Ok(())
    }

    /// Turn one text frame into a quote; `Ok(None)` for frames that carry no update
    fn handle_text(text: &str) -> Result<Option<Quote>, ArbitrageError> {
        match serde_json::from_str::<StreamFrame>(text) {
            Ok(StreamFrame::Ticker(update)) => {
                trace!(update_id = update.update_id, symbol = %update.symbol, "Book ticker update");
                Ok(Some(update.into()))
            }
            Ok(StreamFrame::Ack(ack)) => {
                debug!("Subscription {} acknowledged: {:?}", ack.id, ack.result);
                Ok(None)
            }
            Ok(StreamFrame::Error(err)) => {
                error!(request_id = ?err.id, "Subscription error {}: {}", err.error.code, err.error.msg);
                Err(ArbitrageError::fetch(format!("Subscription error {}: {}", err.error.code, err.error.msg)))
            }
            Err(e) => {
                warn!("Malformed stream frame: {}", text);
                Err(ArbitrageError::fetch(format!("Malformed stream frame: {}", e)))
            }
        }
    }
}

#[async_trait]
impl QuoteFeed for BookTickerStream {
    async fn next_quote(&mut self) -> Result<Quote, ArbitrageError> {
        if self.closed {
            return Err(ArbitrageError::StreamClosed);
        }

        loop {
            let message = match self.ws_stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    self.closed = true;
                    return Err(ArbitrageError::fetch(format!("WebSocket error: {}", e)));
                }
                None => {
                    self.closed = true;
                    return Err(ArbitrageError::StreamClosed);
                }
            };

            match message {
                Message::Text(text) => {
                    if let Some(quote) = Self::handle_text(text.as_str())? {
                        return Ok(quote);
                    }
                }
                Message::Ping(data) => {
                    self.ws_stream
                        .send(Message::Pong(data)).await
                        .map_err(|e| ArbitrageError::fetch(format!("Failed to answer ping: {}", e)))?;
                }
                Message::Close(frame) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    self.closed = true;
                    return Err(ArbitrageError::StreamClosed);
                }
                Message::Binary(_) => {
                    return Err(ArbitrageError::fetch("Unexpected binary frame on bookTicker stream"));
                }
                _ => {}
            }
        }
    }
}
