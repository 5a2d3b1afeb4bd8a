use async_trait::async_trait;

use crate::error::ArbitrageError;
use crate::models::quote::Quote;
use crate::models::symbol::Symbol;

/// Exchange client trait that defines the metadata and quote operations the detector needs
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get the name of the exchange
    fn name(&self) -> &str;

    /// Fetch all listed trading symbols
    async fn get_all_symbols(&self) -> Result<Vec<Symbol>, ArbitrageError>;

    /// Fetch only active spot trading symbols
    async fn get_active_spot_symbols(&self) -> Result<Vec<Symbol>, ArbitrageError>;

    /// Fetch the top of book for every symbol in one batch
    async fn get_book_tickers(&self) -> Result<Vec<Quote>, ArbitrageError>;

    /// Check if the exchange is operational
    async fn is_operational(&self) -> Result<bool, ArbitrageError>;
}

/// A push subscription yielding one quote update per call
#[async_trait]
pub trait QuoteFeed: Send {
    async fn next_quote(&mut self) -> Result<Quote, ArbitrageError>;
}
