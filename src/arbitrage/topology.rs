// src/arbitrage/topology.rs

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashSet;
use tracing::{ info, warn };

use crate::error::ArbitrageError;
use crate::models::symbol::Symbol;
use crate::models::topology::ExchangeTopology;

/// Derive the leg lists of every `anchor → A → B → anchor` path.
///
/// Leg lists keep the order of `symbols`. A bridge asset with several
/// candidate second legs keeps all of them.
pub fn resolve_topology(symbols: &[Symbol], anchor: &str) -> ExchangeTopology {
    let start = Instant::now();

    let anchor_pairs: Vec<&Symbol> = symbols
        .iter()
        .filter(|s| s.quote_asset.as_ref() == anchor)
        .collect();

    let anchor_bases: AHashSet<&str> = anchor_pairs
        .iter()
        .map(|s| s.base_asset.as_ref())
        .collect();

    let quote_assets: AHashSet<&str> = symbols
        .iter()
        .map(|s| s.quote_asset.as_ref())
        .collect();

    let bridge_assets: AHashSet<&str> = anchor_bases
        .iter()
        .copied()
        .filter(|asset| quote_assets.contains(asset))
        .collect();

    let first_leg: Vec<Symbol> = anchor_pairs
        .iter()
        .filter(|s| bridge_assets.contains(s.base_asset.as_ref()))
        .map(|s| (*s).clone())
        .collect();

    let second_leg: Vec<Symbol> = symbols
        .iter()
        .filter(|s| {
            bridge_assets.contains(s.quote_asset.as_ref()) &&
                anchor_bases.contains(s.base_asset.as_ref())
        })
        .cloned()
        .collect();

    let second_bases: AHashSet<&str> = second_leg
        .iter()
        .map(|s| s.base_asset.as_ref())
        .collect();

    let third_leg: Vec<Symbol> = anchor_pairs
        .iter()
        .filter(|s| second_bases.contains(s.base_asset.as_ref()))
        .map(|s| (*s).clone())
        .collect();

    if anchor_pairs.is_empty() {
        warn!("Anchor asset {} not found as quote in any symbol", anchor);
    }

    info!(
        anchor,
        symbols = symbols.len(),
        first = first_leg.len(),
        second = second_leg.len(),
        third = third_leg.len(),
        "Resolved exchange topology in {:?}",
        start.elapsed()
    );

    ExchangeTopology {
        first_leg,
        second_leg,
        third_leg,
    }
}

/// Owned, memoized topology. Written on refresh only; read on every tick.
#[derive(Debug)]
pub struct TopologyCache {
    anchor: Arc<str>,
    topology: Option<Arc<ExchangeTopology>>,
}

impl TopologyCache {
    pub fn new(anchor: &str) -> Self {
        Self {
            anchor: anchor.into(),
            topology: None,
        }
    }

    #[inline]
    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.topology.is_some()
    }

    /// The current topology, or `NotInitialized` before the first refresh
    #[inline]
    pub fn get(&self) -> Result<Arc<ExchangeTopology>, ArbitrageError> {
        self.topology.clone().ok_or(ArbitrageError::NotInitialized)
    }

    /// Recompute from scratch and replace the cached value as a whole
    pub fn refresh(&mut self, symbols: &[Symbol]) -> Arc<ExchangeTopology> {
        self.install(Arc::new(resolve_topology(symbols, &self.anchor)))
    }

    /// Replace the cached value with a topology resolved elsewhere
    pub fn install(&mut self, topology: Arc<ExchangeTopology>) -> Arc<ExchangeTopology> {
        self.topology = Some(topology.clone());
        topology
    }

    #[cfg(test)]
    pub fn invalidate(&mut self) {
        self.topology = None;
    }
}
