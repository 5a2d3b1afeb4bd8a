use std::sync::Arc;

use tracing::debug;

use crate::arbitrage::cost_matrix::CostMatrixEngine;
use crate::arbitrage::selector::{ ArbitrageCandidate, OpportunitySelector };
use crate::config::Config;
use crate::error::ArbitrageError;
use crate::exchange::client::ExchangeClient;
use crate::models::quote::Snapshot;
use crate::models::topology::ExchangeTopology;

/// One detection tick: snapshot → cost table → best candidate
pub struct Pipeline {
    engine: CostMatrixEngine,
    selector: OpportunitySelector,
}

impl Pipeline {
    pub fn new(engine: CostMatrixEngine, selector: OpportunitySelector) -> Self {
        Self { engine, selector }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CostMatrixEngine::new(&config.anchor_asset, config.swap_amount),
            OpportunitySelector::new(&config.anchor_asset, config.order_profit)
        )
    }

    #[inline]
    pub fn engine(&self) -> &CostMatrixEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CostMatrixEngine {
        &mut self.engine
    }

    #[inline]
    pub fn selector(&self) -> &OpportunitySelector {
        &self.selector
    }

    pub async fn refresh(
        &mut self,
        client: &dyn ExchangeClient,
        active_only: bool
    ) -> Result<Arc<ExchangeTopology>, ArbitrageError> {
        self.engine.refresh(client, active_only).await
    }

    pub fn process(&self, snapshot: &Snapshot) -> Result<Option<ArbitrageCandidate>, ArbitrageError> {
        let table = self.engine.compute(snapshot)?;

        if table.is_empty() {
            // No bridge asset in the current topology, every tick is a no-op
            debug!("Degraded tick: cost table is empty for snapshot at {}", snapshot.taken_at);
            return Ok(None);
        }

        let best = table
            .iter()
            .map(|c| c.expected_profit)
            .fold(f64::NEG_INFINITY, f64::max);
        let viable = table
            .iter()
            .filter(|c| c.has_arb)
            .count();

        debug!(cells = table.len(), viable, best_profit = best, "Evaluated cost table");

        Ok(self.selector.select(&table))
    }
}
