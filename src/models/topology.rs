use std::sync::Arc;

use ahash::AHashSet;

use super::symbol::Symbol;

/// The three ordered leg lists of every `anchor → A → B → anchor` path.
///
/// Derived from exchange metadata at resolution time and then shared
/// read-only across ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeTopology {
    /// Anchor-quoted pairs whose base asset serves as a bridge: `anchor → A`
    pub first_leg: Vec<Symbol>,
    /// Pairs quoted in a bridge asset whose base also trades against the anchor: `A → B`
    pub second_leg: Vec<Symbol>,
    /// Anchor-quoted pairs whose base is a second-leg base: `B → anchor`
    pub third_leg: Vec<Symbol>,
}

impl ExchangeTopology {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first_leg.is_empty() && self.second_leg.is_empty() && self.third_leg.is_empty()
    }

    /// Every symbol id the legs refer to, in leg order and without duplicates
    pub fn symbol_ids(&self) -> Vec<Arc<str>> {
        let mut seen = AHashSet::with_capacity(
            self.first_leg.len() + self.second_leg.len() + self.third_leg.len()
        );

        self.first_leg
            .iter()
            .chain(self.second_leg.iter())
            .chain(self.third_leg.iter())
            .filter(|s| seen.insert(s.symbol_id.clone()))
            .map(|s| s.symbol_id.clone())
            .collect()
    }

    /// The ids of `symbol_ids` as a set, for comparisons that ignore leg order
    pub fn symbol_set(&self) -> AHashSet<Arc<str>> {
        self.first_leg
            .iter()
            .chain(self.second_leg.iter())
            .chain(self.third_leg.iter())
            .map(|s| s.symbol_id.clone())
            .collect()
    }
}
