//! Sample staging
//!
//! The split engine does not own the bagged samples. It sees them through [`Restage`], which
//! lays out the samples of every frontier node in each predictor's rank order and reports where
//! they landed. [`StagedSamples`] is an in-memory implementation of that collaborator, used to
//! drive the engine level by level.
use std::ops::Range;

use log::trace;
use ndarray::{ArrayBase, Data, Ix1};

use crate::error::{Error, Result};
use crate::split::DiscoveredSplit;
use crate::{Float, PredictorStore};

/// A node of the current tree level, awaiting a split decision
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierNode<F> {
    /// Position of the node within its level
    pub level_idx: usize,
    /// Offset of the node's samples in staging order
    pub start: usize,
    /// Distinct samples in the node
    pub idx_count: usize,
    /// Samples in the node, bag multiplicities included
    pub s_count: usize,
    /// Response sum, or total sample weight for a categorical response
    pub sum: F,
}

/// A bagged sample as seen by one predictor
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StagedSample<F> {
    pub rank: usize,
    pub sample_idx: usize,
    /// Bag multiplicity
    pub s_count: usize,
    /// Response times multiplicity, or sample weight times multiplicity when categorical
    pub y_sum: F,
    /// Response category, zero for regression
    pub ctg: usize,
}

/// Placement of a (node, predictor) pair after restaging.
///
/// Explicit samples occupy `start..end` of buffer `buf_idx`. The remaining `dense_count`
/// samples of the node hold the predictor's dense rank and are not staged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageRange {
    pub buf_idx: usize,
    pub start: usize,
    pub end: usize,
    pub dense_count: usize,
}

/// Row bookkeeping consumed by the split engine
pub trait Restage<F> {
    /// Partitions the samples of `node` by current tree membership, in rank order of the
    /// predictor, and reports the resulting explicit range.
    fn restage(&mut self, node: &FrontierNode<F>, pred_idx: usize) -> StageRange;

    /// Staged samples of a predictor, read from one side of its double buffer
    fn samples(&self, pred_idx: usize, buf_idx: usize, range: Range<usize>) -> &[StagedSample<F>];

    /// Per-category response sums of a node. Empty for regression.
    fn ctg_sums(&self, node: &FrontierNode<F>) -> &[F];
}

#[derive(Clone, Copy, Debug)]
struct BaggedSample<F> {
    row: usize,
    s_count: usize,
    y_sum: F,
    ctg: usize,
}

/// Double-buffered staging of bagged samples over a [`PredictorStore`].
///
/// Predictors are restaged lazily: the first request for a predictor at a level partitions all
/// of its samples into the other side of its buffer, grouped by frontier node. Samples whose
/// node became a leaf are dropped along the way.
pub struct StagedSamples<'a, F> {
    store: &'a PredictorStore<F>,
    ctg_width: usize,
    bagged: Vec<BaggedSample<F>>,
    buffers: Vec<[Vec<StagedSample<F>>; 2]>,
    /// Side holding each predictor's latest staging
    source: Vec<usize>,
    /// Level of each predictor's latest staging
    staged_at: Vec<usize>,
    /// Explicit ranges of each predictor's latest staging, one per node of that level
    live: Vec<Vec<Range<usize>>>,
    level: usize,
    frontier: Vec<FrontierNode<F>>,
    node_ctg: Vec<F>,
    sample_node: Vec<Option<usize>>,
}

impl<'a, F: Float> StagedSamples<'a, F> {
    /// Stages a regression response.
    ///
    /// ### Parameters
    ///
    /// * `y`: response per row
    /// * `bag`: multiplicity of each row in the bag, zero when out of bag
    pub fn regression(
        store: &'a PredictorStore<F>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        bag: &[usize],
    ) -> Result<Self> {
        Self::check_rows(store, y.len(), bag)?;
        let bagged = bag
            .iter()
            .zip(y.iter())
            .enumerate()
            .filter(|&(_, (&s_count, _))| s_count > 0)
            .map(|(row, (&s_count, &y))| BaggedSample {
                row,
                s_count,
                y_sum: y * F::cast(s_count),
                ctg: 0,
            })
            .collect();

        Ok(Self::stage(store, 0, bagged))
    }

    /// Stages a categorical response.
    ///
    /// ### Parameters
    ///
    /// * `y`: zero-justified category per row, below `ctg_width`
    /// * `weight`: sample weight per row
    /// * `bag`: multiplicity of each row in the bag, zero when out of bag
    pub fn classification(
        store: &'a PredictorStore<F>,
        y: &ArrayBase<impl Data<Elem = usize>, Ix1>,
        weight: &ArrayBase<impl Data<Elem = F>, Ix1>,
        ctg_width: usize,
        bag: &[usize],
    ) -> Result<Self> {
        Self::check_rows(store, y.len(), bag)?;
        if weight.len() != y.len() {
            return Err(Error::MalformedInput(format!(
                "{} weights for {} responses",
                weight.len(),
                y.len()
            )));
        }
        if let Some(ctg) = y.iter().find(|&&ctg| ctg >= ctg_width) {
            return Err(Error::MalformedInput(format!(
                "category {} exceeds response width {}",
                ctg, ctg_width
            )));
        }
        let bagged = bag
            .iter()
            .zip(y.iter().zip(weight.iter()))
            .enumerate()
            .filter(|&(_, (&s_count, _))| s_count > 0)
            .map(|(row, (&s_count, (&ctg, &weight)))| BaggedSample {
                row,
                s_count,
                y_sum: weight * F::cast(s_count),
                ctg,
            })
            .collect();

        Ok(Self::stage(store, ctg_width, bagged))
    }

    fn check_rows(store: &PredictorStore<F>, n_response: usize, bag: &[usize]) -> Result<()> {
        if n_response != store.n_row() || bag.len() != store.n_row() {
            return Err(Error::MalformedInput(format!(
                "{} responses and {} bag counts for {} rows",
                n_response,
                bag.len(),
                store.n_row()
            )));
        }
        if bag.iter().all(|&s_count| s_count == 0) {
            return Err(Error::MalformedInput("empty bag".into()));
        }
        Ok(())
    }

    /// Stages every predictor for the root node
    fn stage(store: &'a PredictorStore<F>, ctg_width: usize, bagged: Vec<BaggedSample<F>>) -> Self {
        let n_sample = bagged.len();
        let mut row_sample = vec![None; store.n_row()];
        for (sample_idx, sample) in bagged.iter().enumerate() {
            row_sample[sample.row] = Some(sample_idx);
        }

        let mut buffers = Vec::with_capacity(store.n_pred());
        let mut live = Vec::with_capacity(store.n_pred());
        for pred_idx in 0..store.n_pred() {
            let mut staged = vec![StagedSample::default(); n_sample];
            let mut end = 0;
            for entry in store.entries(pred_idx) {
                if let Some(sample_idx) = row_sample[entry.row] {
                    let sample = &bagged[sample_idx];
                    staged[end] = StagedSample {
                        rank: entry.rank,
                        sample_idx,
                        s_count: sample.s_count,
                        y_sum: sample.y_sum,
                        ctg: sample.ctg,
                    };
                    end += 1;
                }
            }
            buffers.push([staged, vec![StagedSample::default(); n_sample]]);
            live.push(vec![0..end]);
        }

        let root = FrontierNode {
            level_idx: 0,
            start: 0,
            idx_count: n_sample,
            s_count: bagged.iter().map(|sample| sample.s_count).sum(),
            sum: bagged.iter().map(|sample| sample.y_sum).sum(),
        };
        let node_ctg = Self::ctg_totals(ctg_width, &bagged, &vec![Some(0); n_sample], 1);

        StagedSamples {
            store,
            ctg_width,
            buffers,
            source: vec![0; store.n_pred()],
            staged_at: vec![0; store.n_pred()],
            live,
            level: 0,
            frontier: vec![root],
            node_ctg,
            sample_node: vec![Some(0); n_sample],
            bagged,
        }
    }

    fn ctg_totals(
        ctg_width: usize,
        bagged: &[BaggedSample<F>],
        sample_node: &[Option<usize>],
        n_node: usize,
    ) -> Vec<F> {
        let mut totals = vec![F::zero(); n_node * ctg_width];
        if ctg_width > 0 {
            for (sample, node) in bagged.iter().zip(sample_node) {
                if let Some(node) = node {
                    totals[node * ctg_width + sample.ctg] += sample.y_sum;
                }
            }
        }
        totals
    }

    /// Nodes of the current level
    pub fn frontier(&self) -> &[FrontierNode<F>] {
        &self.frontier
    }

    /// Index of the current level, zero at the root
    pub fn level(&self) -> usize {
        self.level
    }

    /// Partitions one predictor's latest staging into its other buffer by current node
    fn restage_pred(&mut self, pred_idx: usize) {
        let source = self.source[pred_idx];
        let target = 1 - source;
        let mut cursor: Vec<usize> = self.frontier.iter().map(|node| node.start).collect();

        let (low, high) = self.buffers[pred_idx].split_at_mut(1);
        let (from, to) = if source == 0 {
            (&low[0], &mut high[0])
        } else {
            (&high[0], &mut low[0])
        };
        for range in &self.live[pred_idx] {
            for staged in &from[range.clone()] {
                if let Some(node) = self.sample_node[staged.sample_idx] {
                    to[cursor[node]] = *staged;
                    cursor[node] += 1;
                }
            }
        }

        self.live[pred_idx] = self
            .frontier
            .iter()
            .zip(cursor)
            .map(|(node, end)| node.start..end)
            .collect();
        self.source[pred_idx] = target;
        self.staged_at[pred_idx] = self.level;
    }

    /// Applies the split decisions of the current level and advances to the next one.
    ///
    /// Left children precede right children, in frontier order. Nodes without a split become
    /// leaves and their samples leave the staging.
    ///
    /// ### Panics
    ///
    /// If `splits` does not hold one entry per frontier node, or if a split names a predictor
    /// which was not restaged at this level.
    pub fn apply_splits(&mut self, splits: &[Option<DiscoveredSplit<F>>]) -> &[FrontierNode<F>] {
        assert_eq!(splits.len(), self.frontier.len());

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); self.frontier.len()];
        for (sample_idx, node) in self.sample_node.iter().enumerate() {
            if let Some(node) = node {
                members[*node].push(sample_idx);
            }
        }

        let mut goes_left = vec![false; self.bagged.len()];
        for (level_idx, split) in splits.iter().enumerate() {
            if let Some(split) = split {
                assert_eq!(self.staged_at[split.pred_idx], self.level);
                let dense_left = self
                    .store
                    .dense_rank(split.pred_idx)
                    .map_or(false, |rank| split.value.sends_left(rank));
                for &sample_idx in &members[level_idx] {
                    goes_left[sample_idx] = dense_left;
                }
                let buf = &self.buffers[split.pred_idx][self.source[split.pred_idx]];
                for staged in &buf[self.live[split.pred_idx][level_idx].clone()] {
                    goes_left[staged.sample_idx] = split.value.sends_left(staged.rank);
                }
            }
        }

        let mut frontier = Vec::new();
        let mut sample_node = vec![None; self.bagged.len()];
        let mut start = 0;
        for (level_idx, split) in splits.iter().enumerate() {
            if split.is_none() {
                continue;
            }
            for left in [true, false].iter() {
                let mut node = FrontierNode {
                    level_idx: frontier.len(),
                    start,
                    idx_count: 0,
                    s_count: 0,
                    sum: F::zero(),
                };
                for &sample_idx in members[level_idx]
                    .iter()
                    .filter(|&&sample_idx| goes_left[sample_idx] == *left)
                {
                    let sample = &self.bagged[sample_idx];
                    sample_node[sample_idx] = Some(node.level_idx);
                    node.idx_count += 1;
                    node.s_count += sample.s_count;
                    node.sum += sample.y_sum;
                }
                start += node.idx_count;
                frontier.push(node);
            }
        }

        trace!(
            "level {}: {} of {} nodes split",
            self.level,
            frontier.len() / 2,
            self.frontier.len()
        );
        self.node_ctg =
            Self::ctg_totals(self.ctg_width, &self.bagged, &sample_node, frontier.len());
        self.sample_node = sample_node;
        self.frontier = frontier;
        self.level += 1;

        &self.frontier
    }
}

impl<'a, F: Float> Restage<F> for StagedSamples<'a, F> {
    fn restage(&mut self, node: &FrontierNode<F>, pred_idx: usize) -> StageRange {
        if self.staged_at[pred_idx] != self.level {
            self.restage_pred(pred_idx);
        }
        let range = &self.live[pred_idx][node.level_idx];
        StageRange {
            buf_idx: self.source[pred_idx],
            start: range.start,
            end: range.end,
            dense_count: node.idx_count - range.len(),
        }
    }

    fn samples(&self, pred_idx: usize, buf_idx: usize, range: Range<usize>) -> &[StagedSample<F>] {
        &self.buffers[pred_idx][buf_idx][range]
    }

    fn ctg_sums(&self, node: &FrontierNode<F>) -> &[F] {
        let start = node.level_idx * self.ctg_width;
        &self.node_ctg[start..start + self.ctg_width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    use crate::split::SplitValue;
    use crate::{BitMask, InductionParams, ParamGuard, PreSorted};

    fn store() -> PredictorStore<f64> {
        let num = array![[3.0], [1.0], [2.0], [1.0], [1.0], [4.0]];
        let fac = array![[0], [1], [1], [0], [2], [1]];
        let presorted = PreSorted::new(&num, &fac).unwrap();
        PredictorStore::new(&presorted, &InductionParams::new().check().unwrap()).unwrap()
    }

    #[test]
    fn root_stages_bagged_rows_in_rank_order() {
        let store = store();
        let y = array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let mut stage = StagedSamples::regression(&store, &y, &[1, 2, 0, 1, 1, 1]).unwrap();

        let root = stage.frontier()[0].clone();
        assert_eq!(root.idx_count, 5);
        assert_eq!(root.s_count, 6);
        assert_eq!(root.sum, 0.0 + 2.0 + 3.0 + 4.0 + 5.0);

        // value 1.0 covers rows 1, 3, 4 and is dense: only rows 0 and 5 are explicit
        assert_eq!(store.dense_rank(0), Some(0));
        let range = stage.restage(&root, 0);
        assert_eq!(range.dense_count, 3);
        let rows: Vec<_> = stage
            .samples(0, range.buf_idx, range.start..range.end)
            .iter()
            .map(|sample| (sample.rank, sample.y_sum))
            .collect();
        assert_eq!(rows, vec![(2, 0.0), (3, 5.0)]);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let store = store();
        assert!(StagedSamples::regression(&store, &array![1.0, 2.0], &[1; 6]).is_err());
        assert!(StagedSamples::regression(&store, &ndarray::Array1::from_elem(6, 1.0), &[0; 6]).is_err());
        let y = array![0, 1, 2, 0, 1, 0];
        assert!(StagedSamples::classification(&store, &y, &ndarray::Array1::from_elem(6, 1.0), 2, &[1; 6]).is_err());
    }

    #[test]
    fn factor_split_partitions_and_restages() {
        let store = store();
        let y = array![0, 1, 1, 0, 1, 1];
        let mut stage =
            StagedSamples::classification(&store, &y, &ndarray::Array1::from_elem(6, 1.0), 2, &[1; 6]).unwrap();
        let root = stage.frontier()[0].clone();
        assert_eq!(stage.ctg_sums(&root), &[2.0, 4.0]);
        stage.restage(&root, 1);

        let mut mask = BitMask::new(3);
        mask.set(0);
        let split = DiscoveredSplit {
            pred_idx: 1,
            value: SplitValue::Factor(mask),
            gain: 1.0,
            lh_s_count: 2,
            lh_idx_count: 2,
            lh_sum: 2.0,
            rh_s_count: 4,
            rh_sum: 4.0,
        };
        let frontier = stage.apply_splits(&[Some(split)]).to_vec();

        assert_eq!(frontier.len(), 2);
        assert_eq!((frontier[0].start, frontier[0].idx_count), (0, 2));
        assert_eq!((frontier[1].start, frontier[1].idx_count), (2, 4));
        assert_eq!(stage.ctg_sums(&frontier[0]), &[2.0, 0.0]);
        assert_eq!(stage.ctg_sums(&frontier[1]), &[0.0, 4.0]);

        // numeric predictor was last staged at the root and is restaged on demand
        let left = stage.restage(&frontier[0], 0);
        let right = stage.restage(&frontier[1], 0);
        assert_eq!((left.end - left.start, left.dense_count), (1, 1));
        let ranks: Vec<_> = stage
            .samples(0, right.buf_idx, right.start..right.end)
            .iter()
            .map(|sample| sample.rank)
            .collect();
        // rows 1, 2, 4, 5 carry 1.0, 2.0, 1.0, 4.0; rank 0 is dense
        assert_eq!(ranks, vec![1, 3]);
        assert_eq!(right.dense_count, 2);
    }

    #[test]
    fn unsplit_nodes_leave_staging() {
        let store = store();
        let y = array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let mut stage = StagedSamples::regression(&store, &y, &[1; 6]).unwrap();

        assert!(stage.apply_splits(&[None]).is_empty());
        assert_eq!(stage.level(), 1);
    }
}
