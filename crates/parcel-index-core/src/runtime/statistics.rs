// crates/parcel-index-core/src/runtime/statistics.rs
// ============================================================================
// Module: Layer Statistics Engine
// Description: Per-layer accumulation of category tallies and range histograms.
// Purpose: Turn observed parcel values into finished layer statistics.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A [`LayerAccumulator`] observes parcels one at a time and is consumed by
//! [`LayerAccumulator::finish`], which produces an immutable [`Layer`]. Only
//! valid values are ever counted. Structural layers count every parcel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::HashSet;

use serde_json::Value;

use crate::core::BinCount;
use crate::core::BinValues;
use crate::core::Layer;
use crate::core::LayerDataType;
use crate::core::LayerDescriptor;
use crate::core::ParcelFeature;
use crate::core::is_structural_layer;
use crate::core::is_valid_layer_value;
use crate::core::layer::category_key;
use crate::core::layer::range_value;
use crate::interfaces::LayerFormula;

// ============================================================================
// SECTION: Ordered Range Value
// ============================================================================

/// Range value ordered by IEEE-754 total order.
#[derive(Debug, Clone, Copy)]
struct OrderedValue(f64);

impl PartialEq for OrderedValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedValue {}

impl PartialOrd for OrderedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ============================================================================
// SECTION: Accumulator
// ============================================================================

/// Intermediate per-layer state.
#[derive(Debug, Clone)]
enum Accumulation {
    /// Parcel count for `parcels` / `outline`.
    Structural {
        /// Parcels observed.
        count: u64,
    },
    /// Distinct values and their tallies.
    Category {
        /// Distinct values in first-seen order.
        seen: Vec<Value>,
        /// Serialized forms of `seen` for membership checks.
        seen_keys: HashSet<String>,
        /// Occurrences per category key.
        tally: BTreeMap<String, u64>,
    },
    /// Occurrences per raw numeric value, not yet bucketed.
    Range {
        /// Value to occurrence count.
        occurrences: BTreeMap<OrderedValue, u64>,
    },
}

/// Accumulates statistics for one declared layer.
#[derive(Debug, Clone)]
pub struct LayerAccumulator {
    /// Layer declaration.
    descriptor: LayerDescriptor,
    /// Running state.
    accumulation: Accumulation,
}

impl LayerAccumulator {
    /// Creates an empty accumulator for a declared layer.
    #[must_use]
    pub fn new(descriptor: LayerDescriptor) -> Self {
        let accumulation = if is_structural_layer(&descriptor.key) {
            Accumulation::Structural {
                count: 0,
            }
        } else {
            match descriptor.data_type {
                LayerDataType::Category => Accumulation::Category {
                    seen: Vec::new(),
                    seen_keys: HashSet::new(),
                    tally: BTreeMap::new(),
                },
                LayerDataType::Range => Accumulation::Range {
                    occurrences: BTreeMap::new(),
                },
            }
        };
        Self {
            descriptor,
            accumulation,
        }
    }

    /// Observes one parcel.
    pub fn observe(&mut self, parcel: &ParcelFeature) {
        let value = parcel.property(&self.descriptor.key);
        match &mut self.accumulation {
            Accumulation::Structural {
                count,
            } => *count += 1,
            Accumulation::Category {
                seen,
                seen_keys,
                tally,
            } => {
                let Some(value) = value.filter(|value| is_valid_layer_value(value)) else {
                    return;
                };
                if seen_keys.insert(value.to_string()) {
                    seen.push(value.clone());
                }
                *tally.entry(category_key(value)).or_insert(0) += 1;
            }
            Accumulation::Range {
                occurrences,
            } => {
                if let Some(number) = value.and_then(range_value) {
                    *occurrences.entry(OrderedValue(number)).or_insert(0) += 1;
                }
            }
        }
    }

    /// Finishes the layer: final bins, counts, and display formulas.
    #[must_use]
    pub fn finish(self, formula: &dyn LayerFormula) -> Layer {
        let LayerDescriptor {
            key,
            name,
            data_type,
        } = self.descriptor;
        let (bin_values, bin_count) = match self.accumulation {
            Accumulation::Structural {
                count,
            } => {
                let tally = BTreeMap::from([(key.clone(), count)]);
                (BinValues::Categories(Vec::new()), BinCount::Tally(tally))
            }
            Accumulation::Category {
                seen,
                tally,
                ..
            } => (BinValues::Categories(seen), BinCount::Tally(tally)),
            Accumulation::Range {
                occurrences,
            } => {
                let expanded = expand_occurrences(&occurrences);
                let bins = formula.generate_bins(&expanded);
                (BinValues::Ranges(bins.bins), BinCount::Histogram(bins.counts))
            }
        };
        let mut layer = Layer {
            key,
            name,
            data_type,
            bin_values,
            bin_count,
            formulas: Value::Null,
        };
        layer.formulas = formula.build_formulas(&layer);
        layer
    }
}

/// Expands a value-to-count map into an ascending flat sequence.
fn expand_occurrences(occurrences: &BTreeMap<OrderedValue, u64>) -> Vec<f64> {
    let mut expanded = Vec::new();
    for (value, count) in occurrences {
        for _ in 0 .. *count {
            expanded.push(value.0);
        }
    }
    expanded
}

// ============================================================================
// SECTION: Collection Statistics
// ============================================================================

/// Computes finished statistics for every declared layer over all parcels.
#[must_use]
pub fn compute_layer_statistics<'a>(
    descriptors: &[LayerDescriptor],
    parcels: impl IntoIterator<Item = &'a ParcelFeature>,
    formula: &dyn LayerFormula,
) -> Vec<Layer> {
    let mut accumulators: Vec<LayerAccumulator> =
        descriptors.iter().cloned().map(LayerAccumulator::new).collect();
    for parcel in parcels {
        for accumulator in &mut accumulators {
            accumulator.observe(parcel);
        }
    }
    accumulators.into_iter().map(|accumulator| accumulator.finish(formula)).collect()
}
