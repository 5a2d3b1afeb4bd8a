use async_trait::async_trait;
use anyhow::{ Context, Result };
use reqwest::{ Client as HttpClient, Url };
use serde::de::DeserializeOwned;
use tracing::{ debug, error, info, warn };
use std::time::{ Duration, Instant };
use std::sync::Arc;

use crate::error::ArbitrageError;
use crate::exchange::client::ExchangeClient;
use crate::models::binance_models::{ BinanceBookTicker, BinanceExchangeInfo, BinanceSymbol };
use crate::models::quote::Quote;
use crate::models::symbol::Symbol;

pub struct BinanceClient {
    /// Base URL for API requests, e.g. `https://api.binance.com/api/`
    base_url: Url,

    /// API key sent as `X-MBX-APIKEY` when present
    api_key: Option<Arc<str>>,

    /// Pooled client reused across requests
    http: HttpClient,
}

impl BinanceClient {
    /// Create a new Binance REST client
    pub fn new(rest_url: &str, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(rest_url).with_context(||
            format!("Invalid REST URL: {}", rest_url)
        )?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .tcp_nodelay(true) // Disable Nagle's algorithm for low latency
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.map(Into::into),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ArbitrageError> {
        self.base_url
            .join(path)
            .map_err(|e| ArbitrageError::fetch(format!("Failed to build URL for {}: {}", path, e)))
    }

    /// GET `path` and decode the JSON body; every failure is a `FetchFailure`
    async fn get_json<T>(&self, path: &str) -> Result<T, ArbitrageError> where T: DeserializeOwned {
        let url = self.endpoint(path)?;
        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("X-MBX-APIKEY", key.as_ref());
        }

        let response = request
            .send().await
            .map_err(|e| ArbitrageError::fetch(format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Binance API error: {} - {}", status, text);
            return Err(ArbitrageError::fetch(format!("Binance API error: {} - {}", status, text)));
        }

        response
            .json::<T>().await
            .map_err(|e| ArbitrageError::fetch(format!("Malformed {} response: {}", path, e)))
    }

    async fn fetch_exchange_info(&self) -> Result<Vec<BinanceSymbol>, ArbitrageError> {
        let start = Instant::now();
        debug!("Fetching exchange info from Binance");

        let info: BinanceExchangeInfo = self.get_json("v3/exchangeInfo").await?;

        info!("Fetched {} symbols from Binance in {:.2?}", info.symbols.len(), start.elapsed());

        Ok(info.symbols)
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn name(&self) -> &str {
        "Binance"
    }

    async fn get_all_symbols(&self) -> Result<Vec<Symbol>, ArbitrageError> {
        let symbols = self.fetch_exchange_info().await?;
        Ok(symbols.into_iter().map(Symbol::from).collect())
    }

    async fn get_active_spot_symbols(&self) -> Result<Vec<Symbol>, ArbitrageError> {
        let all_symbols = self.fetch_exchange_info().await?;
        let total = all_symbols.len();

        let spot_symbols: Vec<Symbol> = all_symbols
            .into_iter()
            .filter(BinanceSymbol::is_active_spot)
            .map(Symbol::from)
            .collect();

        debug!("{} of {} symbols are active spot pairs", spot_symbols.len(), total);

        Ok(spot_symbols)
    }

    async fn get_book_tickers(&self) -> Result<Vec<Quote>, ArbitrageError> {
        let start = Instant::now();
        let tickers: Vec<BinanceBookTicker> = self.get_json("v3/ticker/bookTicker").await?;

        debug!("Fetched {} book tickers in {:.2?}", tickers.len(), start.elapsed());

        Ok(tickers.into_iter().map(Quote::from).collect())
    }

    async fn is_operational(&self) -> Result<bool, ArbitrageError> {
        let url = self.endpoint("v3/ping")?;

        let response = self.http
            .get(url)
            .timeout(Duration::from_secs(2)) // Short timeout for ping
            .send().await;

        match response {
            Ok(res) => Ok(res.status().is_success()),
            Err(e) => {
                warn!("Binance ping failed: {}", e);
                Ok(false)
            }
        }
    }
}
