//!
//! # Rank-based split search
//! `rankforest` provides the induction core of a decision-tree ensemble learner: the
//! rank-compressed storage of predictor columns and the level-wise search for the best split
//! of every node of a tree.
//!
//! # The big picture
//!
//! Training starts by sorting every predictor column once into runs of equal rank
//! ([`PreSorted`]). The [`PredictorStore`] expands these runs into explicit (row, rank)
//! pairs, eliding for each predictor the single rank that covers a plurality of the rows.
//!
//! Trees are then grown one level at a time. For every node of the current frontier, the
//! [`SplitEngine`] schedules a subset of the predictors, asks a [`Restage`] collaborator to lay
//! out the node's samples in each predictor's rank order, evaluates every (node, predictor)
//! pair in parallel and keeps at most one [`DiscoveredSplit`] per node. Regression responses
//! are split by sum-of-squares, categorical responses by Gini impurity.
//!
//! Bagging, tree materialization and prediction are left to the caller. [`StagedSamples`] is a
//! plain in-memory [`Restage`] implementation, enough to drive the engine over a bag.
//!
//! # Current state
//!
//! Numeric and factor predictors are supported, with per-predictor selection probabilities,
//! fixed predictor budgets and monotone constraints for regression.
//!

pub mod error;
mod float;
mod hyperparams;
mod param_guard;
pub mod prelude;
mod presort;
mod split;
mod stage;
mod store;

#[cfg(feature = "benchmarks")]
pub mod benchmarks;

pub use error::{Error, Result};
pub use float::Float;
pub use hyperparams::{InductionParams, InductionValidParams};
pub use param_guard::ParamGuard;
pub use presort::{PreSorted, Run, SortedColumn};
pub use split::{BitMask, DiscoveredSplit, SplitEngine, SplitValue, SubsetKey};
pub use stage::{FrontierNode, Restage, StageRange, StagedSample, StagedSamples};
pub use store::{PredictorStore, RankedRow};
