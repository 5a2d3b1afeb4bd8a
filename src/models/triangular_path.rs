use std::fmt;
use std::sync::Arc;

/// Three leg symbol ids in traversal order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriangularPath {
    pub first_symbol: Arc<str>,
    pub second_symbol: Arc<str>,
    pub third_symbol: Arc<str>,
}

impl TriangularPath {
    /// Rebuild the leg ids of `anchor → first → second → anchor` from the
    /// exchange naming convention `{BASE}{QUOTE}`
    pub fn from_assets(anchor: &str, first_asset: &str, second_asset: &str) -> Self {
        Self {
            first_symbol: format!("{}{}", first_asset, anchor).into(),
            second_symbol: format!("{}{}", second_asset, first_asset).into(),
            third_symbol: format!("{}{}", second_asset, anchor).into(),
        }
    }

    #[inline]
    pub fn symbols(&self) -> [&str; 3] {
        [&*self.first_symbol, &*self.second_symbol, &*self.third_symbol]
    }
}

impl fmt::Display for TriangularPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} → {}", self.first_symbol, self.second_symbol, self.third_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuilds_leg_ids_from_assets() {
        let path = TriangularPath::from_assets("USDT", "BTC", "ETH");
        assert_eq!(path.symbols(), ["BTCUSDT", "ETHBTC", "ETHUSDT"]);
        assert_eq!(path.to_string(), "BTCUSDT → ETHBTC → ETHUSDT");
    }
}
