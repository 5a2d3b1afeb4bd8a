use serde::{ Deserialize, Serialize };

use crate::utils::serde_helpers::deserialize_price;
use super::quote::Quote;
use super::symbol::Symbol;

/// Response of `GET /api/v3/exchangeInfo` (only the fields used here)
#[derive(Debug, Deserialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BinanceSymbol {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub is_spot_trading_allowed: bool,
}

impl BinanceSymbol {
    #[inline]
    pub fn is_active_spot(&self) -> bool {
        self.status == "TRADING" && self.is_spot_trading_allowed
    }
}

impl From<BinanceSymbol> for Symbol {
    fn from(s: BinanceSymbol) -> Self {
        Symbol {
            symbol_id: s.symbol.into(),
            base_asset: s.base_asset.into(),
            quote_asset: s.quote_asset.into(),
        }
    }
}

/// One element of `GET /api/v3/ticker/bookTicker`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceBookTicker {
    pub symbol: String,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub bid_price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub ask_price: Option<f64>,
}

impl From<BinanceBookTicker> for Quote {
    fn from(t: BinanceBookTicker) -> Self {
        Quote {
            symbol_id: t.symbol.into(),
            ask_price: t.ask_price,
            bid_price: t.bid_price,
        }
    }
}

/// `<symbol>@bookTicker` websocket payload
#[derive(Debug, Deserialize)]
pub struct BinanceBookTickerUpdate {
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b", default, deserialize_with = "deserialize_price")]
    pub bid_price: Option<f64>,
    #[serde(rename = "a", default, deserialize_with = "deserialize_price")]
    pub ask_price: Option<f64>,
}

impl From<BinanceBookTickerUpdate> for Quote {
    fn from(t: BinanceBookTickerUpdate) -> Self {
        Quote {
            symbol_id: t.symbol.into(),
            ask_price: t.ask_price,
            bid_price: t.bid_price,
        }
    }
}

/// Websocket message for subscribing to streams
#[derive(Debug, Serialize)]
pub struct StreamSubscription {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

/// Acknowledgement of a websocket request
#[derive(Debug, Deserialize)]
pub struct SubscriptionResponse {
    pub result: Option<serde_json::Value>,
    pub id: u64,
}

/// Error frame sent by the websocket API
#[derive(Debug, Deserialize)]
pub struct StreamErrorResponse {
    pub error: StreamError,
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StreamError {
    pub code: i64,
    pub msg: String,
}

/// Any text frame the bookTicker connection can receive
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Ticker(BinanceBookTickerUpdate),
    Error(StreamErrorResponse),
    Ack(SubscriptionResponse),
}
