use std::sync::Arc;

use ahash::AHashMap;
use chrono::{ DateTime, Utc };

/// Top-of-book prices for one symbol. A side without resting orders is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol_id: Arc<str>,
    pub ask_price: Option<f64>,
    pub bid_price: Option<f64>,
}

impl Quote {
    pub fn new(symbol_id: &str, ask_price: Option<f64>, bid_price: Option<f64>) -> Self {
        Self {
            symbol_id: symbol_id.into(),
            ask_price,
            bid_price,
        }
    }
}

pub type QuoteMap = AHashMap<Arc<str>, Quote>;

/// Market state at one instant, keyed by symbol id.
///
/// The quote map is shared; a producer that keeps folding updates into it
/// only copies it while an older snapshot is still alive.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    quotes: Arc<QuoteMap>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>, quotes: Arc<QuoteMap>) -> Self {
        Self { taken_at, quotes }
    }

    /// Build from a batch of quotes; a later quote for the same symbol wins
    pub fn from_quotes<I>(taken_at: DateTime<Utc>, quotes: I) -> Self
        where I: IntoIterator<Item = Quote>
    {
        let quotes: QuoteMap = quotes
            .into_iter()
            .map(|q| (q.symbol_id.clone(), q))
            .collect();
        Self::new(taken_at, Arc::new(quotes))
    }

    #[inline]
    pub fn get(&self, symbol_id: &str) -> Option<&Quote> {
        self.quotes.get(symbol_id)
    }

    /// Best ask, or `None` if the symbol is absent or has no ask
    #[inline]
    pub fn ask_price(&self, symbol_id: &str) -> Option<f64> {
        self.get(symbol_id).and_then(|q| q.ask_price)
    }

    /// Best bid, or `None` if the symbol is absent or has no bid
    #[inline]
    pub fn bid_price(&self, symbol_id: &str) -> Option<f64> {
        self.get(symbol_id).and_then(|q| q.bid_price)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
