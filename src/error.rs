//! Error types in rankforest
//!
//! Only the construction phase reports errors. Once a [`PredictorStore`](crate::PredictorStore)
//! and a [`SplitEngine`](crate::SplitEngine) exist, failing to split a node is an ordinary
//! outcome and is not surfaced here.

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("training aborted: malformed predictor input: {0}")]
    MalformedInput(String),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
