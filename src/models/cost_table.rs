use std::sync::Arc;

use ahash::AHashMap;

/// Ordered set of asset names mapping each asset to a fixed position
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    assets: Vec<Arc<str>>,
    positions: AHashMap<Arc<str>, usize>,
}

impl AssetIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            assets: Vec::with_capacity(capacity),
            positions: AHashMap::with_capacity(capacity),
        }
    }

    /// Insert an asset, keeping the position of its first appearance
    pub fn insert(&mut self, asset: &Arc<str>) -> usize {
        if let Some(&pos) = self.positions.get(asset) {
            return pos;
        }
        let pos = self.assets.len();
        self.assets.push(asset.clone());
        self.positions.insert(asset.clone(), pos);
        pos
    }

    #[inline]
    pub fn position(&self, asset: &str) -> Option<usize> {
        self.positions.get(asset).copied()
    }

    #[inline]
    pub fn assets(&self) -> &[Arc<str>] {
        &self.assets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl PartialEq for AssetIndex {
    fn eq(&self, other: &Self) -> bool {
        self.assets == other.assets
    }
}

/// Per-asset prices over a fixed asset index; unknown assets read as `0`
#[derive(Debug, Clone)]
pub struct PriceVector {
    index: AssetIndex,
    values: Vec<f64>,
}

impl PriceVector {
    pub fn zeros(index: AssetIndex) -> Self {
        let values = vec![0.0; index.len()];
        Self { index, values }
    }

    /// Set the value for an asset of the index; assets outside it are ignored
    #[inline]
    pub fn set(&mut self, asset: &str, value: f64) {
        if let Some(pos) = self.index.position(asset) {
            self.values[pos] = value;
        }
    }

    /// Lookup with zero default: an asset without a price has no route
    #[inline]
    pub fn get_or_zero(&self, asset: &str) -> f64 {
        self.index
            .position(asset)
            .map(|pos| self.values[pos])
            .unwrap_or(0.0)
    }

    /// Apply `f` to every value by position, producing a vector over the same index
    pub fn map<F>(&self, f: F) -> Self where F: Fn(f64) -> f64 {
        Self {
            index: self.index.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Dense `row asset × column asset` table; absent combinations read as `0`
#[derive(Debug, Clone)]
pub struct PriceMatrix {
    rows: AssetIndex,
    columns: AssetIndex,
    values: Vec<f64>,
}

impl PriceMatrix {
    pub fn zeros(rows: AssetIndex, columns: AssetIndex) -> Self {
        let values = vec![0.0; rows.len() * columns.len()];
        Self { rows, columns, values }
    }

    #[inline]
    fn offset(&self, row: &str, column: &str) -> Option<usize> {
        let r = self.rows.position(row)?;
        let c = self.columns.position(column)?;
        Some(r * self.columns.len() + c)
    }

    /// Set a cell; combinations outside the table's shape are ignored
    #[inline]
    pub fn set(&mut self, row: &str, column: &str, value: f64) {
        if let Some(offset) = self.offset(row, column) {
            self.values[offset] = value;
        }
    }

    /// Lookup with zero default: a missing pairing has no route
    #[inline]
    pub fn get_or_zero(&self, row: &str, column: &str) -> f64 {
        self.offset(row, column)
            .map(|offset| self.values[offset])
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn rows(&self) -> &AssetIndex {
        &self.rows
    }

    #[inline]
    pub fn columns(&self) -> &AssetIndex {
        &self.columns
    }
}

/// Outcome of the path `anchor → first_asset → second_asset → anchor`
#[derive(Debug, Clone, PartialEq)]
pub struct CostCell {
    pub first_asset: Arc<str>,
    pub second_asset: Arc<str>,
    /// Anchor amount recovered after all three legs; `0` when unreachable
    pub result: f64,
    pub has_arb: bool,
    pub expected_profit: f64,
}

/// Full `first asset × second asset` profitability table for one snapshot.
///
/// Cells are stored row-major: rows follow first-leg order, columns follow
/// the first appearance of each second-leg base asset.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    pub swap_amount: f64,
    rows: AssetIndex,
    columns: AssetIndex,
    cells: Vec<CostCell>,
}

impl CostTable {
    /// Derive every cell from a finished result matrix
    pub fn from_results(results: &PriceMatrix, swap_amount: f64) -> Self {
        let rows = results.rows().clone();
        let columns = results.columns().clone();
        let mut cells = Vec::with_capacity(rows.len() * columns.len());

        for first in rows.assets() {
            for second in columns.assets() {
                let result = results.get_or_zero(first, second);
                cells.push(CostCell {
                    first_asset: first.clone(),
                    second_asset: second.clone(),
                    result,
                    has_arb: result > swap_amount,
                    expected_profit: result / swap_amount - 1.0,
                });
            }
        }

        Self { swap_amount, rows, columns, cells }
    }

    #[inline]
    pub fn get(&self, first_asset: &str, second_asset: &str) -> Option<&CostCell> {
        let r = self.rows.position(first_asset)?;
        let c = self.columns.position(second_asset)?;
        self.cells.get(r * self.columns.len() + c)
    }

    /// Cells in row-major order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, CostCell> {
        self.cells.iter()
    }

    #[inline]
    pub fn first_assets(&self) -> &[Arc<str>] {
        self.rows.assets()
    }

    #[inline]
    pub fn second_assets(&self) -> &[Arc<str>] {
        self.columns.assets()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}
