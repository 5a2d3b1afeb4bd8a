// src/arbitrage/selector.rs

use std::sync::Arc;

use colored::Colorize;
use tracing::debug;

use crate::models::cost_table::{ CostCell, CostTable };
use crate::models::triangular_path::TriangularPath;

/// Best path of one tick that cleared the profit threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageCandidate {
    pub path: TriangularPath,
    pub first_asset: Arc<str>,
    pub second_asset: Arc<str>,
    pub start_amount: f64,
    pub end_amount: f64,
    pub expected_profit: f64,
    pub anchor: Arc<str>,
}

impl ArbitrageCandidate {
    #[inline]
    pub fn profit_percentage(&self) -> f64 {
        self.expected_profit * 100.0
    }

    /// Format candidate for display
    pub fn display(&self) -> String {
        format!(
            "{} → {} → {} | Profit: {:.4}% | Start: {} {} | End: {:.6} {}",
            self.path.first_symbol.to_string().green(),
            self.path.second_symbol.to_string().yellow(),
            self.path.third_symbol.to_string().green(),
            self.profit_percentage().to_string().bright_green().bold(),
            self.start_amount,
            self.anchor,
            self.end_amount,
            self.anchor
        )
    }
}

/// Picks the single most profitable cell above `order_profit`
#[derive(Debug, Clone)]
pub struct OpportunitySelector {
    anchor: Arc<str>,
    order_profit: f64,
}

impl OpportunitySelector {
    pub fn new(anchor: &str, order_profit: f64) -> Self {
        Self {
            anchor: anchor.into(),
            order_profit,
        }
    }

    #[inline]
    pub fn order_profit(&self) -> f64 {
        self.order_profit
    }

    /// Ties keep the cell met first in table order. `None` is the normal
    /// "nothing to do" outcome.
    pub fn select(&self, table: &CostTable) -> Option<ArbitrageCandidate> {
        let mut best: Option<&CostCell> = None;

        for cell in table.iter().filter(|c| c.expected_profit > self.order_profit) {
            match best {
                Some(current) if cell.expected_profit <= current.expected_profit => {}
                _ => {
                    best = Some(cell);
                }
            }
        }

        let cell = best?;

        debug!(
            first = %cell.first_asset,
            second = %cell.second_asset,
            expected_profit = cell.expected_profit,
            "Selected arbitrage cell"
        );

        Some(ArbitrageCandidate {
            path: TriangularPath::from_assets(&self.anchor, &cell.first_asset, &cell.second_asset),
            first_asset: cell.first_asset.clone(),
            second_asset: cell.second_asset.clone(),
            start_amount: table.swap_amount,
            end_amount: cell.result,
            expected_profit: cell.expected_profit,
            anchor: self.anchor.clone(),
        })
    }
}
