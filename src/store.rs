//! Rank-compressed predictor storage
//!
//! The store expands the runs of every predictor into explicit (row, rank) pairs held in one
//! contiguous buffer. A rank covering more than a plurality of the rows is "dense": its rows are
//! not materialized, and consumers recover their aggregate statistics by subtraction.
use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::presort::{PreSorted, Run};
use crate::{Float, InductionValidParams};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// An explicitly stored observation of a predictor
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RankedRow {
    pub row: usize,
    pub rank: usize,
}

/// Rank-ordered, dense-elided representation of all predictors of a training set.
///
/// Built once per training run and read-only afterwards. Predictors without a dense rank
/// occupy fixed regions of `n_row` entries at the front of the buffer, compressed predictors
/// follow at offsets accumulated from their explicit counts.
///
/// ### Example
///
/// ```rust
/// use ndarray::{array, Array2};
/// use rankforest::{InductionParams, ParamGuard, PreSorted, PredictorStore};
///
/// let num = array![[0.0], [0.0], [0.0], [1.0], [2.0]];
/// let fac = Array2::<usize>::zeros((5, 0));
/// let presorted = PreSorted::new(&num, &fac).unwrap();
/// let params = InductionParams::new().check().unwrap();
/// let store = PredictorStore::new(&presorted, &params).unwrap();
///
/// // rank 0 covers 3 of 5 rows and is elided
/// assert_eq!(store.dense_rank(0), Some(0));
/// assert_eq!(store.explicit_count(0), 2);
/// assert_eq!(store.mean_rank(0, 1.5), 1.5);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug)]
pub struct PredictorStore<F> {
    n_row: usize,
    n_pred_num: usize,
    /// Count of predictors stored without compression
    non_compact: usize,
    /// Sum of the explicit counts of compressed predictors
    accum_compact: usize,
    dense_rank: Vec<Option<usize>>,
    explicit_count: Vec<usize>,
    start: Vec<usize>,
    /// Region index for uncompressed predictors, accumulated offset for compressed ones
    safe_offset: Vec<usize>,
    rank_count: Vec<usize>,
    num_offset: Vec<usize>,
    num_val: Vec<F>,
    rows: Box<[RankedRow]>,
}

/// Finds the rank with the largest coverage, merging neighbouring runs of equal rank.
///
/// Returns the rank and its coverage if the coverage exceeds `threshold` rows.
fn dense_block(runs: &[Run], threshold: f64) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;
    for run in runs {
        current = match current {
            Some((rank, count)) if rank == run.rank => Some((rank, count + run.length)),
            _ => Some((run.rank, run.length)),
        };
        if let Some((rank, count)) = current {
            if best.map_or(true, |(_, max)| count > max) {
                best = Some((rank, count));
            }
        }
    }

    best.filter(|&(_, count)| count as f64 > threshold)
}

impl<F: Float> PredictorStore<F> {
    /// Builds the store from the sorted columns of all predictors
    pub fn new(presorted: &PreSorted<F>, params: &InductionValidParams) -> Result<Self> {
        let n_row = presorted.n_row();
        let n_pred = presorted.n_pred();
        let threshold = params.plurality() * n_row as f64;

        let dense: Vec<Option<(usize, usize)>> = presorted
            .columns()
            .par_iter()
            .map(|column| dense_block(column.runs(), threshold))
            .collect();

        let mut non_compact = 0;
        let mut accum_compact = 0;
        let mut dense_rank = Vec::with_capacity(n_pred);
        let mut explicit_count = Vec::with_capacity(n_pred);
        let mut safe_offset = Vec::with_capacity(n_pred);
        for block in &dense {
            match *block {
                Some((rank, coverage)) => {
                    let count = n_row - coverage;
                    dense_rank.push(Some(rank));
                    explicit_count.push(count);
                    safe_offset.push(accum_compact);
                    accum_compact += count;
                }
                None => {
                    dense_rank.push(None);
                    explicit_count.push(n_row);
                    safe_offset.push(non_compact);
                    non_compact += 1;
                }
            }
        }

        // uncompressed predictors first, as with staging offsets
        let start: Vec<usize> = dense_rank
            .iter()
            .zip(&safe_offset)
            .map(|(dense, &offset)| match dense {
                Some(_) => non_compact * n_row + offset,
                None => offset * n_row,
            })
            .collect();

        let block_total: usize = explicit_count.iter().sum();
        let mut rows = vec![RankedRow::default(); block_total].into_boxed_slice();
        for (pred_idx, column) in presorted.columns().iter().enumerate() {
            let region = &mut rows[start[pred_idx]..start[pred_idx] + explicit_count[pred_idx]];
            let mut slots = region.iter_mut();
            for run in column
                .runs()
                .iter()
                .filter(|run| Some(run.rank) != dense_rank[pred_idx])
            {
                for row in run.row..run.row + run.length {
                    let slot = slots.next().ok_or_else(|| {
                        Error::MalformedInput(format!(
                            "predictor {} expands beyond {} explicit rows",
                            pred_idx, explicit_count[pred_idx]
                        ))
                    })?;
                    *slot = RankedRow {
                        row,
                        rank: run.rank,
                    };
                }
            }
            if slots.next().is_some() {
                return Err(Error::MalformedInput(format!(
                    "predictor {} expands to fewer than {} explicit rows",
                    pred_idx, explicit_count[pred_idx]
                )));
            }
        }

        let rank_count = presorted
            .columns()
            .iter()
            .map(|column| column.rank_count())
            .collect();
        let mut num_offset = Vec::with_capacity(presorted.n_pred_num());
        let mut num_val = Vec::new();
        for column in &presorted.columns()[..presorted.n_pred_num()] {
            num_offset.push(num_val.len());
            num_val.extend_from_slice(column.values());
        }

        debug!(
            "predictor store: {} rows, {} predictors, {} compressed, {} explicit entries",
            n_row,
            n_pred,
            n_pred - non_compact,
            block_total
        );

        Ok(PredictorStore {
            n_row,
            n_pred_num: presorted.n_pred_num(),
            non_compact,
            accum_compact,
            dense_rank,
            explicit_count,
            start,
            safe_offset,
            rank_count,
            num_offset,
            num_val,
            rows,
        })
    }

    pub fn n_row(&self) -> usize {
        self.n_row
    }

    pub fn n_pred(&self) -> usize {
        self.dense_rank.len()
    }

    pub fn n_pred_num(&self) -> usize {
        self.n_pred_num
    }

    /// Returns true if the predictor holds factor codes rather than numeric values
    pub fn is_factor(&self, pred_idx: usize) -> bool {
        pred_idx >= self.n_pred_num
    }

    /// Position of a numeric predictor among the numeric predictors
    pub fn num_idx(&self, pred_idx: usize) -> usize {
        debug_assert!(!self.is_factor(pred_idx));
        pred_idx
    }

    /// Position of a factor predictor among the factor predictors
    pub fn fac_idx(&self, pred_idx: usize) -> usize {
        debug_assert!(self.is_factor(pred_idx));
        pred_idx - self.n_pred_num
    }

    /// One past the highest rank of a predictor: the number of distinct values of a numeric
    /// predictor, the cardinality implied by the highest code of a factor.
    pub fn rank_count(&self, pred_idx: usize) -> usize {
        self.rank_count[pred_idx]
    }

    /// Number of rows stored explicitly for a predictor
    pub fn explicit_count(&self, pred_idx: usize) -> usize {
        self.explicit_count[pred_idx]
    }

    /// The elided rank of a predictor, if any
    pub fn dense_rank(&self, pred_idx: usize) -> Option<usize> {
        self.dense_rank[pred_idx]
    }

    /// Number of rows implied by the dense rank
    pub fn dense_coverage(&self, pred_idx: usize) -> usize {
        self.n_row - self.explicit_count[pred_idx]
    }

    /// Explicit (row, rank) pairs of a predictor in rank order
    pub fn entries(&self, pred_idx: usize) -> &[RankedRow] {
        let start = self.start[pred_idx];
        &self.rows[start..start + self.explicit_count[pred_idx]]
    }

    pub fn entry(&self, pred_idx: usize, idx: usize) -> RankedRow {
        self.entries(pred_idx)[idx]
    }

    /// Computes a conservative buffer size, allowing strided access for uncompressed
    /// predictors but full-width access for compressed predictors.
    pub fn safe_size(&self, stride: usize) -> usize {
        self.non_compact * stride + self.accum_compact
    }

    /// Computes a conservative offset for storing predictor-based information.
    ///
    /// ### Returns
    ///
    /// The offset of the predictor's region within a buffer of [`safe_size`](Self::safe_size)
    /// slots, and the number of slots available from it.
    pub fn safe_offset(&self, pred_idx: usize, stride: usize) -> (usize, usize) {
        match self.dense_rank[pred_idx] {
            None => (self.safe_offset[pred_idx] * stride, stride),
            Some(_) => (
                self.non_compact * stride + self.safe_offset[pred_idx],
                self.explicit_count[pred_idx],
            ),
        }
    }

    /// Derives a split value for a numeric predictor.
    ///
    /// `rank_mean` is the mean splitting rank: values at its floor and ceiling are averaged,
    /// interpolating when it is fractional.
    pub fn mean_rank(&self, pred_idx: usize, rank_mean: f64) -> F {
        let low = rank_mean.floor() as usize;
        let high = rank_mean.ceil() as usize;
        (self.num_val(pred_idx, low) + self.num_val(pred_idx, high)) / F::cast(2.0)
    }

    fn num_val(&self, pred_idx: usize, rank: usize) -> F {
        self.num_val[self.num_offset[self.num_idx(pred_idx)] + rank]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};
    use proptest::prelude::*;

    use crate::{InductionParams, ParamGuard, SortedColumn};

    fn build(num: Array2<f64>, fac: Array2<usize>) -> PredictorStore<f64> {
        let presorted = PreSorted::new(&num, &fac).unwrap();
        let params = InductionParams::new().check().unwrap();
        PredictorStore::new(&presorted, &params).unwrap()
    }

    #[test]
    fn contiguous_plurality_becomes_dense() {
        // value 4 occupies rows 2..6, 40% of the column
        let store = build(
            array![[1.0], [2.0], [4.0], [4.0], [4.0], [4.0], [3.0], [5.0], [6.0], [7.0]],
            Array2::zeros((10, 0)),
        );

        assert_eq!(store.dense_rank(0), Some(3));
        assert_eq!(store.explicit_count(0), 6);
        assert_eq!(store.dense_coverage(0), 4);
        assert!(store.entries(0).iter().all(|entry| entry.rank != 3));
    }

    #[test]
    fn dense_rank_merges_runs_across_row_gaps() {
        // 0 ties at rows 0, 1, 3 and 5: two runs and two singletons, 4 of 8 rows
        let store = build(
            array![[0.0], [0.0], [1.0], [0.0], [2.0], [0.0], [3.0], [4.0]],
            Array2::zeros((8, 0)),
        );

        assert_eq!(store.dense_rank(0), Some(0));
        assert_eq!(store.explicit_count(0), 4);
    }

    #[test]
    fn spread_column_stays_explicit() {
        let store = build(
            array![[1.0], [2.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0]],
            Array2::zeros((8, 0)),
        );

        assert_eq!(store.dense_rank(0), None);
        assert_eq!(store.explicit_count(0), 8);
        assert_eq!(store.dense_coverage(0), 0);
    }

    #[test]
    fn uncompressed_predictors_are_laid_out_first() {
        let num = array![
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [4.0, 1.0]
        ];
        let fac = array![[0], [1], [2], [2]];
        let store = build(num, fac);

        assert_eq!(store.dense_rank(0), None);
        assert_eq!(store.dense_rank(1), Some(0));
        assert_eq!(store.dense_rank(2), Some(2));

        // one uncompressed predictor, then counts 1 and 2
        assert_eq!(store.safe_size(10), 10 + 1 + 2);
        assert_eq!(store.safe_offset(0, 10), (0, 10));
        assert_eq!(store.safe_offset(1, 10), (10, 1));
        assert_eq!(store.safe_offset(2, 10), (11, 2));
        assert_eq!(store.entries(1), &[RankedRow { row: 3, rank: 1 }]);
        assert_eq!(
            store.entries(2),
            &[RankedRow { row: 0, rank: 0 }, RankedRow { row: 1, rank: 1 }]
        );
    }

    #[test]
    fn factor_lookups() {
        let store = build(array![[0.5], [0.25], [1.0]], array![[4], [0], [4]]);

        assert!(!store.is_factor(0));
        assert!(store.is_factor(1));
        assert_eq!(store.fac_idx(1), 0);
        assert_eq!(store.rank_count(1), 5);
        assert_eq!(store.rank_count(0), 3);
    }

    #[test]
    fn mean_rank_interpolates() {
        let store = build(array![[10.0], [30.0], [20.0]], Array2::zeros((3, 0)));

        assert_abs_diff_eq!(store.mean_rank(0, 0.5), 15.0);
        assert_abs_diff_eq!(store.mean_rank(0, 1.5), 25.0);
        assert_abs_diff_eq!(store.mean_rank(0, 2.0), 30.0);
    }

    #[test]
    fn threshold_follows_configured_plurality() {
        let column = SortedColumn::numeric(&array![0.0, 0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let presorted = PreSorted::from_columns(6, vec![column], Vec::new()).unwrap();

        let loose = InductionParams::new().plurality(0.25).check().unwrap();
        let strict = InductionParams::new().plurality(0.5).check().unwrap();
        assert_eq!(
            PredictorStore::new(&presorted, &loose).unwrap().dense_rank(0),
            Some(0)
        );
        assert_eq!(
            PredictorStore::new(&presorted, &strict).unwrap().dense_rank(0),
            None
        );
    }

    proptest! {
        #[test]
        fn explicit_and_dense_rows_cover_column(
            raw in proptest::collection::vec(0u8..4, 1..150),
            codes in proptest::collection::vec(0usize..3, 150),
        ) {
            let n_row = raw.len();
            let num = Array1::from(raw.iter().map(|&x| x as f64).collect::<Vec<_>>())
                .into_shape((n_row, 1))
                .unwrap();
            let fac = Array1::from(codes[..n_row].to_vec()).into_shape((n_row, 1)).unwrap();
            let store = build(num, fac);

            for pred_idx in 0..store.n_pred() {
                let entries = store.entries(pred_idx);
                prop_assert_eq!(
                    store.explicit_count(pred_idx) + store.dense_coverage(pred_idx),
                    n_row
                );
                prop_assert_eq!(entries.len(), store.explicit_count(pred_idx));
                for pair in entries.windows(2) {
                    prop_assert!(pair[0].rank <= pair[1].rank);
                }
                if let Some(dense) = store.dense_rank(pred_idx) {
                    prop_assert!(entries.iter().all(|entry| entry.rank != dense));
                    prop_assert!(store.dense_coverage(pred_idx) as f64 > 0.25 * n_row as f64);
                }
                let (offset, extent) = store.safe_offset(pred_idx, n_row);
                prop_assert!(offset + extent <= store.safe_size(n_row));
            }
        }
    }
}
