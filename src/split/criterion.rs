use super::candidate::{Evaluation, SplitCandidate};
use super::run_set::{FacRun, RunSet};
use super::{factor, numeric, DiscoveredSplit};
use crate::stage::FrontierNode;
use crate::{Float, InductionValidParams, PredictorStore};

/// Smallest left response weight admitted by the categorical criterion
pub(crate) const MIN_SUM_L: f64 = 1e-8;
/// Smallest right response weight admitted by the categorical criterion
pub(crate) const MIN_SUM_R: f64 = 1e-5;
/// Smallest weight admitted as a denominator
pub(crate) const MIN_DENOM: f64 = 1e-5;

/// Sum-of-squares information of a bipartition, up to a node constant
pub(crate) fn regression_info<F: Float>(
    lh_sum: F,
    lh_s_count: usize,
    rh_sum: F,
    rh_s_count: usize,
) -> F {
    lh_sum * lh_sum / F::cast(lh_s_count) + rh_sum * rh_sum / F::cast(rh_s_count)
}

/// Gini information of a bipartition, given each side's sum of squared category weights.
///
/// Returns `None` when either side is too light for the quotients to be trusted.
pub(crate) fn gini_info<F: Float>(ss_l: F, sum_l: F, ss_r: F, sum_r: F) -> Option<F> {
    let admissible = sum_l > F::cast(MIN_SUM_L)
        && sum_r > F::cast(MIN_SUM_R)
        && sum_l > F::cast(MIN_DENOM)
        && sum_r > F::cast(MIN_DENOM);
    if admissible {
        Some(ss_l / sum_l + ss_r / sum_r)
    } else {
        None
    }
}

/// Per-node state computed before scheduling
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NodeStats<F> {
    pub prebias: F,
    pub splittable: bool,
}

/// Scratch space of one candidate within the level buffers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SlotWidth {
    pub runs: usize,
    pub acc: usize,
}

/// Response-type specific behaviour of the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SplitMode {
    Regression,
    Categorical { ctg_width: usize },
}

impl SplitMode {
    pub fn new(params: &InductionValidParams) -> Self {
        if params.is_regression() {
            SplitMode::Regression
        } else {
            SplitMode::Categorical {
                ctg_width: params.ctg_width(),
            }
        }
    }

    pub fn ctg_width(&self) -> usize {
        match *self {
            SplitMode::Regression => 0,
            SplitMode::Categorical { ctg_width } => ctg_width,
        }
    }

    /// Derives the prebias of a node and decides whether it is worth scheduling
    pub fn level_preset<F: Float>(
        &self,
        node: &FrontierNode<F>,
        node_ctg: &[F],
        min_node: usize,
    ) -> NodeStats<F> {
        let populated = node.s_count >= min_node.max(2) && node.idx_count >= 2;
        match self {
            SplitMode::Regression => NodeStats {
                prebias: if node.s_count > 0 {
                    node.sum * node.sum / F::cast(node.s_count)
                } else {
                    F::zero()
                },
                splittable: populated,
            },
            SplitMode::Categorical { .. } => {
                let ss = node_ctg.iter().fold(F::zero(), |ss, &sum| ss + sum * sum);
                let pure = node_ctg.iter().filter(|&&sum| sum > F::zero()).count() < 2;
                NodeStats {
                    prebias: if node.sum > F::zero() {
                        ss / node.sum
                    } else {
                        F::zero()
                    },
                    splittable: populated && !pure,
                }
            }
        }
    }

    /// Sizes the scratch space of a candidate.
    ///
    /// A factor candidate observes at most as many runs as the predictor has codes, and no more
    /// than its explicit extent for a stride of the node's sample count, plus the dense run.
    pub fn run_offsets<F: Float>(
        &self,
        store: &PredictorStore<F>,
        node: &FrontierNode<F>,
        cand: &SplitCandidate<F>,
    ) -> SlotWidth {
        let ctg_width = self.ctg_width();
        if store.is_factor(cand.pred_idx) {
            let (_, extent) = store.safe_offset(cand.pred_idx, node.idx_count);
            let dense = store.dense_rank(cand.pred_idx).map_or(0, |_| 1);
            let runs = store.rank_count(cand.pred_idx).min(extent + dense);
            SlotWidth {
                runs,
                acc: runs * ctg_width,
            }
        } else {
            // left, right and dense category sums
            SlotWidth {
                runs: 0,
                acc: 3 * ctg_width,
            }
        }
    }

    /// Evaluates one candidate within its slots
    pub fn split<F: Float>(
        &self,
        eval: &Evaluation<F>,
        runs: &mut [FacRun<F>],
        acc: &mut [F],
        params: &InductionValidParams,
    ) -> Option<DiscoveredSplit<F>> {
        let is_factor = eval.store.is_factor(eval.pred_idx());
        match (*self, is_factor) {
            (SplitMode::Regression, false) => numeric::split_regression(eval),
            (SplitMode::Categorical { ctg_width }, false) => {
                numeric::split_categorical(eval, ctg_width, acc)
            }
            (SplitMode::Regression, true) => {
                factor::split_regression(eval, &RunSet::collect(eval, runs, acc, 0))
            }
            (SplitMode::Categorical { ctg_width: 2 }, true) => {
                factor::split_binary(eval, &RunSet::collect(eval, runs, acc, 2))
            }
            (SplitMode::Categorical { ctg_width }, true) => factor::split_subsets(
                eval,
                &RunSet::collect(eval, runs, acc, ctg_width),
                params,
            ),
        }
    }
}
