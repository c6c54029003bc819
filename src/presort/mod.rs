//! Column sorting
//!
//! Raw predictor columns are sorted once per training run into rank-ordered runs. The
//! [`PreSorted`] block gathers the columns of all predictors, numeric predictors first,
//! and is consumed by [`PredictorStore::new`](crate::PredictorStore::new).
mod column;

pub use column::*;

use ndarray::{ArrayBase, Axis, Data, Ix2};

use crate::error::{Error, Result};
use crate::Float;

/// Sorted columns of every predictor in a training set
#[derive(Clone, Debug, PartialEq)]
pub struct PreSorted<F> {
    n_row: usize,
    n_pred_num: usize,
    columns: Vec<SortedColumn<F>>,
}

impl<F: Float> PreSorted<F> {
    /// Sorts the columns of a numeric block and a factor block observed on the same rows.
    ///
    /// ### Parameters
    ///
    /// * `num`: numeric predictors, one column per predictor
    /// * `fac`: zero-justified factor codes, one column per predictor
    ///
    /// Either block may have no columns, but not both.
    pub fn new(
        num: &ArrayBase<impl Data<Elem = F>, Ix2>,
        fac: &ArrayBase<impl Data<Elem = usize>, Ix2>,
    ) -> Result<Self> {
        let n_row = if num.ncols() > 0 { num.nrows() } else { fac.nrows() };
        if fac.ncols() > 0 && fac.nrows() != n_row {
            return Err(Error::MalformedInput(format!(
                "numeric block has {} rows, factor block {}",
                num.nrows(),
                fac.nrows()
            )));
        }

        let numeric = num
            .axis_iter(Axis(1))
            .map(|column| SortedColumn::numeric(&column))
            .collect::<Result<Vec<_>>>()?;
        let factor = fac
            .axis_iter(Axis(1))
            .map(|column| SortedColumn::factor(&column))
            .collect::<Result<Vec<_>>>()?;

        Self::from_columns(n_row, numeric, factor)
    }

    /// Gathers individually sorted columns, as produced by [`SortedColumn`], checking that the
    /// runs of each cover every one of the `n_row` rows exactly once.
    pub fn from_columns(
        n_row: usize,
        numeric: Vec<SortedColumn<F>>,
        factor: Vec<SortedColumn<F>>,
    ) -> Result<Self> {
        if n_row == 0 {
            return Err(Error::MalformedInput("no observations".into()));
        }
        if numeric.is_empty() && factor.is_empty() {
            return Err(Error::MalformedInput("no predictors".into()));
        }
        if let Some((pred_idx, column)) = factor
            .iter()
            .enumerate()
            .find(|(_, column)| !column.values().is_empty())
        {
            return Err(Error::MalformedInput(format!(
                "factor predictor {} carries {} numeric values",
                pred_idx,
                column.values().len()
            )));
        }

        let n_pred_num = numeric.len();
        let columns: Vec<_> = numeric.into_iter().chain(factor).collect();
        for (pred_idx, column) in columns.iter().enumerate() {
            if column.n_row() != n_row {
                return Err(Error::MalformedInput(format!(
                    "predictor {} was sorted over {} rows rather than {}",
                    pred_idx,
                    column.n_row(),
                    n_row
                )));
            }
            let runs = column.runs().iter().map(|run| (run.row, run.length));
            column::check_coverage(runs, n_row)?;
        }

        Ok(PreSorted {
            n_row,
            n_pred_num,
            columns,
        })
    }

    pub fn n_row(&self) -> usize {
        self.n_row
    }

    pub fn n_pred(&self) -> usize {
        self.columns.len()
    }

    pub fn n_pred_num(&self) -> usize {
        self.n_pred_num
    }

    /// Sorted column of a predictor, numeric predictors first
    pub fn column(&self, pred_idx: usize) -> &SortedColumn<F> {
        &self.columns[pred_idx]
    }

    pub fn columns(&self) -> &[SortedColumn<F>] {
        &self.columns
    }
}
