use ndarray::{ArrayBase, Data, Ix1};
use noisy_float::{checkers::NumChecker, NoisyFloat};

use crate::error::{Error, Result};
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A block of observations sharing a rank and occupying contiguous rows
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Run {
    pub rank: usize,
    pub row: usize,
    pub length: usize,
}

impl Run {
    /// True if `row` begins where this run ends
    fn abuts(&self, row: usize) -> bool {
        self.row + self.length == row
    }
}

/// A single predictor column sorted into rank order and compressed into runs.
///
/// Ranks never decrease along `runs`. Two neighbouring runs share a rank only when their rows
/// are not contiguous: ties separated in row order stay separate so that every run maps back
/// to an exact row interval.
///
/// Numeric columns also keep their distinct values, indexed by rank. Factor columns use the
/// factor code as rank and keep no values.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct SortedColumn<F> {
    runs: Vec<Run>,
    values: Vec<F>,
    n_row: usize,
}

impl<F: Float> SortedColumn<F> {
    /// Sorts a raw numeric column given in row order
    ///
    /// ### Parameters
    ///
    /// * `column`: one value per row, without NaNs
    ///
    /// ### Returns
    ///
    /// The run-length encoded column, with the distinct values in ascending order.
    pub fn numeric(column: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Self> {
        if column.is_empty() {
            return Err(Error::MalformedInput("empty numeric column".into()));
        }
        if column.iter().any(|x| x.is_nan()) {
            return Err(Error::MalformedInput("NaN in numeric column".into()));
        }

        let mut pairs: Vec<(F, Run)> = column
            .iter()
            .enumerate()
            .map(|(row, &value)| {
                (
                    value,
                    Run {
                        rank: 0,
                        row,
                        length: 1,
                    },
                )
            })
            .collect();
        // stable: ties keep row order
        pairs.sort_by_key(|&(value, _)| NoisyFloat::<_, NumChecker>::new(value));

        Ok(Self::rank_numeric(pairs, column.len()))
    }

    /// Sorts a numeric column which an upstream producer already grouped into runs.
    ///
    /// `values`, `row_start` and `run_length` are parallel, one entry per run, and the run
    /// lengths must add up to `n_row`. Runs are sorted by value and neighbours are merged under
    /// the same contiguity rule as [`numeric`](Self::numeric), adding their lengths.
    pub fn numeric_rle(
        values: &[F],
        row_start: &[usize],
        run_length: &[usize],
        n_row: usize,
    ) -> Result<Self> {
        if values.len() != row_start.len() || values.len() != run_length.len() {
            return Err(Error::MalformedInput(format!(
                "run-length vectors differ in length: {} values, {} starts, {} lengths",
                values.len(),
                row_start.len(),
                run_length.len()
            )));
        }
        if values.is_empty() {
            return Err(Error::MalformedInput("empty numeric column".into()));
        }
        if values.iter().any(|x| x.is_nan()) {
            return Err(Error::MalformedInput("NaN in numeric column".into()));
        }
        if run_length.iter().any(|&length| length == 0) {
            return Err(Error::MalformedInput("zero run length".into()));
        }
        check_coverage(row_start.iter().copied().zip(run_length.iter().copied()), n_row)?;

        let mut pairs: Vec<(F, Run)> = values
            .iter()
            .zip(row_start.iter().zip(run_length))
            .map(|(&value, (&row, &length))| {
                (
                    value,
                    Run {
                        rank: 0,
                        row,
                        length,
                    },
                )
            })
            .collect();
        // rows are unique, so (value, row) is a total order
        pairs.sort_by_key(|&(value, run)| (NoisyFloat::<_, NumChecker>::new(value), run.row));

        Ok(Self::rank_numeric(pairs, n_row))
    }

    /// Sorts a factor column of zero-justified codes given in row order.
    ///
    /// Ranks are the codes themselves, gaps included, so that they agree with the codes seen at
    /// prediction time.
    pub fn factor(codes: &ArrayBase<impl Data<Elem = usize>, Ix1>) -> Result<Self> {
        if codes.is_empty() {
            return Err(Error::MalformedInput("empty factor column".into()));
        }

        let mut pairs: Vec<(usize, usize)> = codes
            .iter()
            .enumerate()
            .map(|(row, &code)| (code, row))
            .collect();
        pairs.sort_unstable();

        let mut runs: Vec<Run> = Vec::new();
        for (code, row) in pairs {
            match runs.last_mut() {
                Some(last) if last.rank == code && last.abuts(row) => last.length += 1,
                _ => runs.push(Run {
                    rank: code,
                    row,
                    length: 1,
                }),
            }
        }

        Ok(SortedColumn {
            runs,
            values: Vec::new(),
            n_row: codes.len(),
        })
    }

    /// Assigns dense ranks to value-ordered runs, merging contiguous ties
    fn rank_numeric(pairs: Vec<(F, Run)>, n_row: usize) -> Self {
        let mut runs: Vec<Run> = Vec::with_capacity(pairs.len());
        let mut values: Vec<F> = Vec::new();

        for (value, run) in pairs {
            let tied = values.last().map_or(false, |&last| last == value);
            match runs.last_mut() {
                Some(last) if tied && last.abuts(run.row) => last.length += run.length,
                _ => {
                    if !tied {
                        values.push(value);
                    }
                    runs.push(Run {
                        rank: values.len() - 1,
                        ..run
                    });
                }
            }
        }

        SortedColumn {
            runs,
            values,
            n_row,
        }
    }

    /// Runs in rank order
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Distinct values of a numeric column, indexed by rank. Empty for factors.
    pub fn values(&self) -> &[F] {
        &self.values
    }

    /// Number of rows covered by the runs
    pub fn n_row(&self) -> usize {
        self.n_row
    }

    /// One past the highest rank present
    pub fn rank_count(&self) -> usize {
        self.runs.last().map_or(0, |run| run.rank + 1)
    }
}

/// Checks that runs, given as (first row, length), cover each of `n_row` rows exactly once
pub(crate) fn check_coverage(
    runs: impl IntoIterator<Item = (usize, usize)>,
    n_row: usize,
) -> Result<()> {
    let mut seen = vec![false; n_row];
    let mut covered = 0;
    for (row, length) in runs {
        if row + length > n_row {
            return Err(Error::MalformedInput(format!(
                "run of length {} at row {} exceeds {} rows",
                length, row, n_row
            )));
        }
        let rows = &mut seen[row..row + length];
        if let Some(offset) = rows.iter().position(|&seen| seen) {
            return Err(Error::MalformedInput(format!(
                "row {} is covered by more than one run",
                row + offset
            )));
        }
        rows.iter_mut().for_each(|seen| *seen = true);
        covered += length;
    }
    if covered != n_row {
        return Err(Error::MalformedInput(format!(
            "runs cover {} rows rather than {}",
            covered, n_row
        )));
    }
    Ok(())
}
