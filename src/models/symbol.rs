use std::fmt;
use std::sync::Arc;

/// Trading pair as listed in exchange metadata; never mutated after load
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub symbol_id: Arc<str>, // Using Arc<str> to reduce clone costs
    pub base_asset: Arc<str>,
    pub quote_asset: Arc<str>,
}

impl Symbol {
    pub fn new(symbol_id: &str, base_asset: &str, quote_asset: &str) -> Self {
        Self {
            symbol_id: symbol_id.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
        }
    }
}

impl fmt::Display for Symbol {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_asset, self.quote_asset)
    }
}
