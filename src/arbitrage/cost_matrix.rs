// src/arbitrage/cost_matrix.rs

use std::sync::Arc;

use tracing::{ debug, info };

use crate::error::ArbitrageError;
use crate::exchange::client::ExchangeClient;
use crate::models::cost_table::{ AssetIndex, CostTable, PriceMatrix, PriceVector };
use crate::models::quote::Snapshot;
use crate::models::symbol::Symbol;
use crate::models::topology::ExchangeTopology;
use super::topology::{ resolve_topology, TopologyCache };

/// A usable price is finite and strictly positive; anything else means no route
#[inline]
fn price_or_zero(price: Option<f64>) -> f64 {
    match price {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => 0.0,
    }
}

/// Divide, normalizing a zero divisor or a non-finite quotient to `0`
#[inline]
fn div_or_zero(amount: f64, price: f64) -> f64 {
    if price == 0.0 {
        return 0.0;
    }
    let value = amount / price;
    if value.is_finite() { value } else { 0.0 }
}

#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Turns snapshots into full cost tables over the cached topology
#[derive(Debug)]
pub struct CostMatrixEngine {
    topology: TopologyCache,
    swap_amount: f64,
}

impl CostMatrixEngine {
    pub fn new(anchor: &str, swap_amount: f64) -> Self {
        Self {
            topology: TopologyCache::new(anchor),
            swap_amount,
        }
    }

    #[inline]
    pub fn anchor(&self) -> &str {
        self.topology.anchor()
    }

    #[inline]
    pub fn swap_amount(&self) -> f64 {
        self.swap_amount
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.topology.is_initialized()
    }

    #[inline]
    pub fn topology(&self) -> Result<Arc<ExchangeTopology>, ArbitrageError> {
        self.topology.get()
    }

    /// Fetch exchange metadata and rebuild the topology from it
    pub async fn refresh(
        &mut self,
        client: &dyn ExchangeClient,
        active_only: bool
    ) -> Result<Arc<ExchangeTopology>, ArbitrageError> {
        let symbols = Self::fetch_symbols(client, active_only).await?;
        Ok(self.refresh_from_symbols(&symbols))
    }

    /// Fetch exchange metadata and resolve it without touching the cached topology
    pub async fn fetch_topology(
        &self,
        client: &dyn ExchangeClient,
        active_only: bool
    ) -> Result<ExchangeTopology, ArbitrageError> {
        let symbols = Self::fetch_symbols(client, active_only).await?;
        Ok(resolve_topology(&symbols, self.anchor()))
    }

    async fn fetch_symbols(
        client: &dyn ExchangeClient,
        active_only: bool
    ) -> Result<Vec<Symbol>, ArbitrageError> {
        let symbols = if active_only {
            client.get_active_spot_symbols().await?
        } else {
            client.get_all_symbols().await?
        };

        info!("Resolving topology from {} {} symbols", symbols.len(), client.name());

        Ok(symbols)
    }

    pub fn install(&mut self, topology: Arc<ExchangeTopology>) -> Arc<ExchangeTopology> {
        self.topology.install(topology)
    }

    pub fn refresh_from_symbols(&mut self, symbols: &[Symbol]) -> Arc<ExchangeTopology> {
        self.topology.refresh(symbols)
    }

    /// Compute the `first asset × second asset` table for one snapshot
    pub fn compute(&self, snapshot: &Snapshot) -> Result<CostTable, ArbitrageError> {
        let topology = self.topology.get()?;
        let table = compute_cost_table(&topology, snapshot, self.swap_amount);

        debug!(
            cells = table.len(),
            quotes = snapshot.len(),
            "Computed cost table for snapshot at {}",
            snapshot.taken_at
        );

        Ok(table)
    }
}

/// Pure cost-table computation over an explicit topology
pub fn compute_cost_table(
    topology: &ExchangeTopology,
    snapshot: &Snapshot,
    swap_amount: f64
) -> CostTable {
    // Rows: first-leg base assets. Columns: second-leg base assets.
    let mut rows = AssetIndex::with_capacity(topology.first_leg.len());
    for s in &topology.first_leg {
        rows.insert(&s.base_asset);
    }

    let mut columns = AssetIndex::with_capacity(topology.second_leg.len());
    for s in &topology.second_leg {
        columns.insert(&s.base_asset);
    }

    // Leg 1: buy A with anchor at the ask
    let mut p1 = PriceVector::zeros(rows.clone());
    for s in &topology.first_leg {
        p1.set(&s.base_asset, price_or_zero(snapshot.ask_price(&s.symbol_id)));
    }
    let stage1 = p1.map(|price| div_or_zero(swap_amount, price));

    // Leg 2: buy B with A at the ask; p2[A][B]
    let mut p2 = PriceMatrix::zeros(rows.clone(), columns.clone());
    for s in &topology.second_leg {
        p2.set(&s.quote_asset, &s.base_asset, price_or_zero(snapshot.ask_price(&s.symbol_id)));
    }

    // Leg 3: sell B for anchor at the bid
    let mut p3 = PriceVector::zeros(columns.clone());
    for s in &topology.third_leg {
        p3.set(&s.base_asset, price_or_zero(snapshot.bid_price(&s.symbol_id)));
    }

    let mut stage3 = PriceMatrix::zeros(rows.clone(), columns.clone());
    for first in rows.assets() {
        let amount_a = stage1.get_or_zero(first);
        for second in columns.assets() {
            let amount_b = div_or_zero(amount_a, p2.get_or_zero(first, second));
            let recovered = finite_or_zero(amount_b * p3.get_or_zero(second));
            stage3.set(first, second, recovered);
        }
    }

    CostTable::from_results(&stage3, swap_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::Quote;
    use chrono::{ TimeZone, Utc };

    fn triangle_topology() -> ExchangeTopology {
        resolve_topology(
            &[
                Symbol::new("BTCUSDT", "BTC", "USDT"),
                Symbol::new("ETHUSDT", "ETH", "USDT"),
                Symbol::new("ETHBTC", "ETH", "BTC"),
            ],
            "USDT"
        )
    }

    fn snapshot(quotes: Vec<Quote>) -> Snapshot {
        Snapshot::from_quotes(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), quotes)
    }

    fn triangle_snapshot() -> Snapshot {
        snapshot(
            vec![
                Quote::new("BTCUSDT", Some(10000.0), Some(9999.0)),
                Quote::new("ETHUSDT", Some(1000.0), Some(999.0)),
                Quote::new("ETHBTC", Some(0.01), Some(0.0099))
            ]
        )
    }

    fn wide_topology() -> ExchangeTopology {
        resolve_topology(
            &[
                Symbol::new("BTCUSDT", "BTC", "USDT"),
                Symbol::new("ETHUSDT", "ETH", "USDT"),
                Symbol::new("BNBUSDT", "BNB", "USDT"),
                Symbol::new("ETHBTC", "ETH", "BTC"),
                Symbol::new("BNBBTC", "BNB", "BTC"),
                Symbol::new("BNBETH", "BNB", "ETH"),
            ],
            "USDT"
        )
    }

    fn wide_snapshot() -> Snapshot {
        snapshot(
            vec![
                Quote::new("BTCUSDT", Some(40000.0), Some(39990.0)),
                Quote::new("ETHUSDT", Some(2000.0), Some(1999.0)),
                Quote::new("BNBUSDT", Some(300.0), Some(299.5)),
                Quote::new("ETHBTC", Some(0.05), Some(0.0499)),
                Quote::new("BNBBTC", Some(0.0075), Some(0.0074)),
                Quote::new("BNBETH", Some(0.15), Some(0.149))
            ]
        )
    }

    #[test]
    fn end_to_end_triangle() {
        let table = compute_cost_table(&triangle_topology(), &triangle_snapshot(), 100.0);

        assert_eq!(table.first_assets(), &[Arc::<str>::from("BTC")]);
        assert_eq!(table.second_assets(), &[Arc::<str>::from("ETH")]);

        let cell = table.get("BTC", "ETH").unwrap();
        assert!((cell.result - 999.0).abs() < 1e-9);
        assert!(cell.has_arb);
        assert!((cell.expected_profit - 8.99).abs() < 1e-9);
    }

    #[test]
    fn engine_requires_refresh_before_compute() {
        let engine = CostMatrixEngine::new("USDT", 100.0);
        let result = engine.compute(&triangle_snapshot());
        assert!(matches!(result, Err(ArbitrageError::NotInitialized)));
    }

    #[test]
    fn engine_computes_after_refresh() {
        let mut engine = CostMatrixEngine::new("USDT", 100.0);
        engine.refresh_from_symbols(
            &[
                Symbol::new("BTCUSDT", "BTC", "USDT"),
                Symbol::new("ETHUSDT", "ETH", "USDT"),
                Symbol::new("ETHBTC", "ETH", "BTC"),
            ]
        );

        let table = engine.compute(&triangle_snapshot()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.swap_amount, 100.0);
    }

    #[test]
    fn missing_quote_marks_path_unreachable() {
        let snap = snapshot(
            vec![
                Quote::new("BTCUSDT", Some(10000.0), Some(9999.0)),
                Quote::new("ETHUSDT", Some(1000.0), Some(999.0))
            ]
        );

        let table = compute_cost_table(&triangle_topology(), &snap, 100.0);
        let cell = table.get("BTC", "ETH").unwrap();

        assert_eq!(cell.result, 0.0);
        assert_eq!(cell.expected_profit, -1.0);
        assert!(!cell.has_arb);
    }

    #[test]
    fn zero_priced_first_leg_never_yields_infinity() {
        let snap = snapshot(
            vec![
                Quote::new("BTCUSDT", Some(0.0), Some(9999.0)),
                Quote::new("ETHUSDT", Some(1000.0), Some(999.0)),
                Quote::new("ETHBTC", Some(0.01), Some(0.0099))
            ]
        );

        let table = compute_cost_table(&triangle_topology(), &snap, 100.0);
        let cell = table.get("BTC", "ETH").unwrap();

        assert_eq!(cell.result, 0.0);
        assert_eq!(cell.expected_profit, -1.0);
    }

    #[test]
    fn missing_bid_on_third_leg_is_unreachable() {
        let snap = snapshot(
            vec![
                Quote::new("BTCUSDT", Some(10000.0), Some(9999.0)),
                Quote::new("ETHUSDT", Some(1000.0), None),
                Quote::new("ETHBTC", Some(0.01), Some(0.0099))
            ]
        );

        let cell = compute_cost_table(&triangle_topology(), &snap, 100.0);
        assert_eq!(cell.get("BTC", "ETH").unwrap().result, 0.0);
    }

    #[test]
    fn negative_price_is_treated_as_no_route() {
        let snap = snapshot(
            vec![
                Quote::new("BTCUSDT", Some(10000.0), Some(9999.0)),
                Quote::new("ETHUSDT", Some(1000.0), Some(999.0)),
                Quote::new("ETHBTC", Some(-0.01), Some(0.0099))
            ]
        );

        let table = compute_cost_table(&triangle_topology(), &snap, 100.0);
        assert_eq!(table.get("BTC", "ETH").unwrap().result, 0.0);
    }

    #[test]
    fn unlisted_pairings_are_unreachable_and_do_not_leak() {
        let table = compute_cost_table(&wide_topology(), &wide_snapshot(), 100.0);

        // Rows BTC, ETH; columns ETH, BNB
        assert_eq!(table.len(), 4);

        // No ETHETH pair exists
        let same = table.get("ETH", "ETH").unwrap();
        assert_eq!(same.result, 0.0);
        assert_eq!(same.expected_profit, -1.0);

        // 100 / 2000 / 0.15 * 299.5
        let eth_bnb = table.get("ETH", "BNB").unwrap();
        assert!((eth_bnb.result - 100.0 / 2000.0 / 0.15 * 299.5).abs() < 1e-9);

        // 100 / 40000 / 0.0075 * 299.5
        let btc_bnb = table.get("BTC", "BNB").unwrap();
        assert!((btc_bnb.result - 100.0 / 40000.0 / 0.0075 * 299.5).abs() < 1e-9);
    }

    #[test]
    fn zero_price_in_one_path_leaves_others_intact() {
        let mut quotes = vec![
            Quote::new("BTCUSDT", Some(40000.0), Some(39990.0)),
            Quote::new("ETHUSDT", Some(2000.0), Some(1999.0)),
            Quote::new("BNBUSDT", Some(300.0), Some(299.5)),
            Quote::new("ETHBTC", Some(0.05), Some(0.0499)),
            Quote::new("BNBETH", Some(0.15), Some(0.149))
        ];
        quotes.push(Quote::new("BNBBTC", Some(0.0), Some(0.0)));

        let table = compute_cost_table(&wide_topology(), &snapshot(quotes), 100.0);

        assert_eq!(table.get("BTC", "BNB").unwrap().result, 0.0);
        assert!(table.get("BTC", "ETH").unwrap().result > 0.0);
        assert!(table.get("ETH", "BNB").unwrap().result > 0.0);
    }

    #[test]
    fn complete_quotes_give_finite_non_negative_cells() {
        let table = compute_cost_table(&wide_topology(), &wide_snapshot(), 100.0);

        assert!(table.iter().all(|c| c.result.is_finite() && c.result >= 0.0));
        assert!(table.iter().all(|c| c.expected_profit.is_finite()));
    }

    #[test]
    fn computation_is_idempotent() {
        let topology = wide_topology();
        let snap = wide_snapshot();

        let a = compute_cost_table(&topology, &snap, 100.0);
        let b = compute_cost_table(&topology, &snap, 100.0);

        assert_eq!(a, b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.result.to_bits(), y.result.to_bits());
        }
    }

    #[test]
    fn scaling_swap_amount_scales_results_not_profit() {
        let topology = wide_topology();
        let snap = wide_snapshot();

        let small = compute_cost_table(&topology, &snap, 100.0);
        let large = compute_cost_table(&topology, &snap, 1000.0);

        for (s, l) in small.iter().zip(large.iter()) {
            assert_eq!(s.first_asset, l.first_asset);
            assert_eq!(s.second_asset, l.second_asset);
            if s.result > 0.0 {
                assert!((l.result / s.result - 10.0).abs() < 1e-9);
            } else {
                assert_eq!(l.result, 0.0);
            }
            assert!((s.expected_profit - l.expected_profit).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_topology_yields_empty_table() {
        let topology = resolve_topology(&[Symbol::new("BTCUSDT", "BTC", "USDT")], "USDT");
        let table = compute_cost_table(&topology, &triangle_snapshot(), 100.0);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn refresh_fetches_metadata_through_client() {
        use crate::source::testing::ScriptedClient;

        let client = ScriptedClient::new(
            vec![
                Symbol::new("BTCUSDT", "BTC", "USDT"),
                Symbol::new("ETHUSDT", "ETH", "USDT"),
                Symbol::new("ETHBTC", "ETH", "BTC")
            ]
        );
        let mut engine = CostMatrixEngine::new("USDT", 100.0);

        let topology = engine.refresh(&client, true).await.unwrap();

        assert!(engine.is_initialized());
        assert_eq!(topology.second_leg.len(), 1);
        assert!(engine.compute(&triangle_snapshot()).unwrap().get("BTC", "ETH").unwrap().has_arb);
    }

    #[tokio::test]
    async fn fetched_topology_is_not_used_until_installed() {
        use crate::source::testing::ScriptedClient;

        let client = ScriptedClient::new(vec![Symbol::new("BTCUSDT", "BTC", "USDT")]);
        client.push_symbols(
            vec![
                Symbol::new("BTCUSDT", "BTC", "USDT"),
                Symbol::new("ETHUSDT", "ETH", "USDT"),
                Symbol::new("ETHBTC", "ETH", "BTC")
            ]
        );
        let mut engine = CostMatrixEngine::new("USDT", 100.0);
        engine.refresh(&client, true).await.unwrap();

        let fetched = engine.fetch_topology(&client, true).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(engine.topology().unwrap().second_leg.len(), 1);

        engine.install(Arc::new(fetched));
        assert!(engine.topology().unwrap().is_empty());
        assert!(engine.compute(&triangle_snapshot()).unwrap().is_empty());
    }
}
