//! rankforest prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::{Float, ParamGuard, Restage};

#[doc(no_inline)]
pub use crate::{InductionParams, InductionValidParams, PreSorted, PredictorStore};

#[doc(no_inline)]
pub use crate::{DiscoveredSplit, FrontierNode, SplitEngine, SplitValue, StagedSamples};
