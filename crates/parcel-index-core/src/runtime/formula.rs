// crates/parcel-index-core/src/runtime/formula.rs
// ============================================================================
// Module: Default Layer Formula
// Description: Equal-width range binning and Mapbox-style paint expressions.
// Purpose: Provide the default bin/formula generator for layer statistics.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Range bins are equal-width over `[min, max]`. The bin count is bounded by
//! the configured maximum, the number of distinct values, and Sturges' rule.
//! A value lands in the first bin whose upper edge exceeds it; the last bin is
//! closed at `max`, so every element is counted exactly once.
//!
//! Formulas are Mapbox GL expressions (`match` for categories, `step` for
//! ranges) plus a legend the front end renders verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::BinCount;
use crate::core::BinValues;
use crate::core::Layer;
use crate::core::RangeBins;
use crate::core::is_structural_layer;
use crate::core::layer::category_key;
use crate::interfaces::LayerFormula;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default upper bound on range bins.
pub const DEFAULT_MAX_BINS: u32 = 7;
/// Hard upper bound on range bins.
pub const MAX_BINS_LIMIT: u32 = 64;
/// Color used for features with no matching bin.
pub const FALLBACK_COLOR: &str = "#cccccc";
/// Color used for structural layers.
pub const STRUCTURAL_COLOR: &str = "#333333";
/// Default categorical/sequential palette.
pub const DEFAULT_PALETTE: [&str; 7] =
    ["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02", "#a6761d"];

// ============================================================================
// SECTION: Mapbox Layer Formula
// ============================================================================

/// Default [`LayerFormula`] emitting Mapbox GL paint expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapboxLayerFormula {
    /// Maximum number of range bins.
    max_bins: u32,
    /// Colors assigned cyclically to bins and categories.
    palette: Vec<String>,
}

impl Default for MapboxLayerFormula {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BINS)
    }
}

impl MapboxLayerFormula {
    /// Creates a formula generator with the default palette.
    ///
    /// `max_bins` is clamped to `1 ..= MAX_BINS_LIMIT`.
    #[must_use]
    pub fn new(max_bins: u32) -> Self {
        Self {
            max_bins: max_bins.clamp(1, MAX_BINS_LIMIT),
            palette: DEFAULT_PALETTE.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replaces the palette; an empty palette keeps the default.
    #[must_use]
    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        if !palette.is_empty() {
            self.palette = palette;
        }
        self
    }

    /// Returns the configured maximum bin count.
    #[must_use]
    pub const fn max_bins(&self) -> u32 {
        self.max_bins
    }

    /// Returns the palette color for a bin or category position.
    fn color(&self, position: usize) -> &str {
        self.palette.get(position % self.palette.len()).map_or(FALLBACK_COLOR, String::as_str)
    }

    /// Builds the formulas for a structural layer.
    fn structural_formulas(layer: &Layer) -> Value {
        json!({
            "expression": STRUCTURAL_COLOR,
            "legend": [{
                "label": layer.display_name(),
                "color": STRUCTURAL_COLOR,
                "count": layer.bin_count.total(),
            }],
        })
    }

    /// Builds a `match` expression over category values.
    fn category_formulas(&self, layer: &Layer, values: &[Value]) -> Value {
        if values.is_empty() {
            return json!({ "expression": FALLBACK_COLOR, "legend": [] });
        }
        let mut expression = vec![json!("match"), json!(["get", layer.key])];
        let mut legend = Vec::with_capacity(values.len());
        for (position, value) in values.iter().enumerate() {
            let color = self.color(position);
            expression.push(value.clone());
            expression.push(json!(color));
            legend.push(json!({
                "label": category_key(value),
                "color": color,
                "count": tally_count(&layer.bin_count, value),
            }));
        }
        expression.push(json!(FALLBACK_COLOR));
        json!({ "expression": expression, "legend": legend })
    }

    /// Builds a `step` expression over range bins.
    fn range_formulas(&self, layer: &Layer, bins: &[[f64; 2]]) -> Value {
        let Some(first) = bins.first() else {
            return json!({ "expression": FALLBACK_COLOR, "legend": [] });
        };
        let counts = match &layer.bin_count {
            BinCount::Histogram(counts) => counts.as_slice(),
            BinCount::Tally(_) => &[],
        };
        let expression = if bins.len() == 1 {
            json!(self.color(0))
        } else {
            let mut steps =
                vec![json!("step"), json!(["to-number", ["get", layer.key]]), json!(self.color(0))];
            for (position, bin) in bins.iter().enumerate().skip(1) {
                steps.push(json!(bin[0]));
                steps.push(json!(self.color(position)));
            }
            Value::Array(steps)
        };
        let legend: Vec<Value> = bins
            .iter()
            .enumerate()
            .map(|(position, bin)| {
                json!({
                    "label": format!("{} - {}", bin[0], bin[1]),
                    "color": self.color(position),
                    "count": counts.get(position).copied().unwrap_or(0),
                })
            })
            .collect();
        json!({
            "expression": expression,
            "legend": legend,
            "domain": [first[0], bins.last().map_or(first[1], |bin| bin[1])],
        })
    }
}

impl LayerFormula for MapboxLayerFormula {
    fn generate_bins(&self, sorted: &[f64]) -> RangeBins {
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return RangeBins::default();
        };
        let bin_total = self.max_bins.min(distinct_count(sorted)).min(sturges_bins(sorted.len()));
        if bin_total <= 1 || min >= max {
            return RangeBins {
                bins: vec![[min, max]],
                counts: vec![u64::try_from(sorted.len()).unwrap_or(u64::MAX)],
            };
        }
        let bins: Vec<[f64; 2]> = (0 .. bin_total)
            .map(|index| {
                let lower = bin_edge(min, max, index, bin_total);
                let upper =
                    if index + 1 == bin_total { max } else { bin_edge(min, max, index + 1, bin_total) };
                [lower, upper]
            })
            .collect();
        let mut counts = vec![0_u64; bins.len()];
        let last = bins.len() - 1;
        let mut position = 0;
        for value in sorted {
            while position < last && *value >= bins[position][1] {
                position += 1;
            }
            counts[position] += 1;
        }
        RangeBins {
            bins,
            counts,
        }
    }

    fn build_formulas(&self, layer: &Layer) -> Value {
        if is_structural_layer(&layer.key) {
            return Self::structural_formulas(layer);
        }
        match &layer.bin_values {
            BinValues::Categories(values) => self.category_formulas(layer, values),
            BinValues::Ranges(bins) => self.range_formulas(layer, bins),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the `index`-th of `total` equal-width edges over `[min, max]`.
///
/// Interpolates instead of scaling `max - min`, which overflows for spans
/// wider than `f64::MAX`.
fn bin_edge(min: f64, max: f64, index: u32, total: u32) -> f64 {
    let fraction = f64::from(index) / f64::from(total);
    min.mul_add(1.0 - fraction, max * fraction)
}

/// Counts distinct values in an ascending sequence.
fn distinct_count(sorted: &[f64]) -> u32 {
    let mut distinct = 0_u32;
    let mut previous: Option<f64> = None;
    for value in sorted {
        if previous.is_none_or(|prev| prev.total_cmp(value).is_ne()) {
            distinct = distinct.saturating_add(1);
        }
        previous = Some(*value);
    }
    distinct
}

/// Returns `ceil(log2 n) + 1`, the Sturges bin count.
const fn sturges_bins(len: usize) -> u32 {
    if len <= 1 {
        return 1;
    }
    usize::BITS - (len - 1).leading_zeros() + 1
}

/// Returns the tally for a category value.
fn tally_count(bin_count: &BinCount, value: &Value) -> u64 {
    match bin_count {
        BinCount::Tally(tally) => tally.get(&category_key(value)).copied().unwrap_or(0),
        BinCount::Histogram(_) => 0,
    }
}
