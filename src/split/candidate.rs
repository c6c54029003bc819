use super::walk::DenseBlock;
use super::{DiscoveredSplit, SplitValue};
use crate::stage::{FrontierNode, StageRange, StagedSample};
use crate::{Float, PredictorStore};

/// Direction in which the mean response must move from the left to the right side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Monotone {
    Increasing,
    Decreasing,
}

impl Monotone {
    /// Compares the side means without dividing
    pub fn admits<F: Float>(
        self,
        lh_sum: F,
        lh_s_count: usize,
        rh_sum: F,
        rh_s_count: usize,
    ) -> bool {
        let left = lh_sum * F::cast(rh_s_count);
        let right = rh_sum * F::cast(lh_s_count);
        match self {
            Monotone::Increasing => left <= right,
            Monotone::Decreasing => left >= right,
        }
    }
}

/// A (frontier node, predictor) pair scheduled for evaluation at the current level
#[derive(Clone, Debug)]
pub(crate) struct SplitCandidate<F> {
    pub level_idx: usize,
    pub pred_idx: usize,
    pub prebias: F,
    pub mono: Option<Monotone>,
    pub range: StageRange,
}

impl<F: Float> SplitCandidate<F> {
    pub fn new(level_idx: usize, pred_idx: usize, prebias: F, mono: Option<Monotone>) -> Self {
        SplitCandidate {
            level_idx,
            pred_idx,
            prebias,
            mono,
            range: StageRange::default(),
        }
    }
}

/// Read-only inputs of one candidate evaluation
pub(crate) struct Evaluation<'a, F> {
    pub store: &'a PredictorStore<F>,
    pub cand: &'a SplitCandidate<F>,
    pub node: &'a FrontierNode<F>,
    pub explicit: &'a [StagedSample<F>],
    pub node_ctg: &'a [F],
}

impl<'a, F: Float> Evaluation<'a, F> {
    pub fn pred_idx(&self) -> usize {
        self.cand.pred_idx
    }

    /// The node's samples at the dense rank, if the restage left any
    pub fn dense(&self) -> Option<DenseBlock<F>> {
        if self.cand.range.dense_count == 0 {
            return None;
        }
        let rank = self.store.dense_rank(self.cand.pred_idx)?;
        Some(DenseBlock::by_subtraction(
            rank,
            self.cand.range.dense_count,
            self.node.s_count,
            self.node.sum,
            self.explicit,
        ))
    }

    /// Information a cut must exceed to be accepted.
    ///
    /// The prebias is widened by the rounding a node-wide sum of `s_count` terms can accumulate,
    /// so that cuts of a constant response never register a gain.
    pub fn floor(&self) -> F {
        let prebias = self.cand.prebias;
        prebias + prebias * F::epsilon() * F::cast(4 * self.node.s_count)
    }

    /// Records a winning cut, complementing the left statistics from the node totals
    pub fn discovered(
        &self,
        value: SplitValue<F>,
        info: F,
        lh_s_count: usize,
        lh_idx_count: usize,
        lh_sum: F,
    ) -> DiscoveredSplit<F> {
        DiscoveredSplit {
            pred_idx: self.cand.pred_idx,
            value,
            gain: info - self.cand.prebias,
            lh_s_count,
            lh_idx_count,
            lh_sum,
            rh_s_count: self.node.s_count - lh_s_count,
            rh_sum: self.node.sum - lh_sum,
        }
    }

    /// Numeric split between two adjacent ranks
    pub fn numeric_value(&self, rank_low: usize, rank_high: usize) -> SplitValue<F> {
        let rank_mean = (rank_low + rank_high) as f64 / 2.0;
        SplitValue::Numeric {
            rank_mean,
            threshold: self.store.mean_rank(self.cand.pred_idx, rank_mean),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_compares_means() {
        // means 2 and 3
        assert!(Monotone::Increasing.admits(4.0, 2, 9.0, 3));
        assert!(!Monotone::Decreasing.admits(4.0, 2, 9.0, 3));
        // equal means pass both ways
        assert!(Monotone::Increasing.admits(2.0, 1, 4.0, 2));
        assert!(Monotone::Decreasing.admits(2.0, 1, 4.0, 2));
    }
}
