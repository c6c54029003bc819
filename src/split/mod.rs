//! Level-wise split search
//!
//! For every node of a tree level, the [`SplitEngine`] schedules a subset of predictors,
//! evaluates each (node, predictor) pair independently and keeps at most one split per node:
//! the one with the greatest gain over the node's prebias.
mod bitmask;
mod candidate;
mod criterion;
mod engine;
mod factor;
mod heap_elem;
mod numeric;
mod run_set;
mod schedule;
mod walk;

pub use bitmask::BitMask;
pub use engine::SplitEngine;
pub use factor::SubsetKey;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Where a discovered split sends observations
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum SplitValue<F> {
    /// Ranks below `rank_mean`, equivalently values below `threshold`, go left
    Numeric { rank_mean: f64, threshold: F },
    /// Factor codes set in the mask go left
    Factor(BitMask),
}

/// The best admissible split of a frontier node
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredSplit<F> {
    pub pred_idx: usize,
    pub value: SplitValue<F>,
    /// Impurity decrease over the node's prebias, always positive
    pub gain: F,
    /// Sample count sent left, bag multiplicities included
    pub lh_s_count: usize,
    /// Distinct samples sent left
    pub lh_idx_count: usize,
    pub lh_sum: F,
    pub rh_s_count: usize,
    /// Response sum, or sample weight for a categorical response, sent right
    pub rh_sum: F,
}

impl<F> DiscoveredSplit<F> {
    pub fn is_factor(&self) -> bool {
        matches!(self.value, SplitValue::Factor(_))
    }
}

impl<F> SplitValue<F> {
    /// Returns true if an observation of the given rank goes to the left subtree
    pub fn sends_left(&self, rank: usize) -> bool {
        match self {
            SplitValue::Numeric { rank_mean, .. } => (rank as f64) < *rank_mean,
            SplitValue::Factor(mask) => mask.test(rank),
        }
    }
}
