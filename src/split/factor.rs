//! Subset cuts over the codes of a factor predictor
//!
//! Regression and binary responses admit a total order of the runs under which the best subset
//! is a prefix, found by one sweep. A wider categorical response searches subsets best-first
//! from a bounded heap.
use std::collections::BinaryHeap;

use noisy_float::{checkers::FiniteChecker, NoisyFloat};

use super::candidate::Evaluation;
use super::criterion::{gini_info, regression_info};
use super::heap_elem::MaxHeapElem;
use super::run_set::RunSet;
use super::{DiscoveredSplit, SplitValue};
use crate::{Float, InductionValidParams};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Priority of a subset in the categorical subset search
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubsetKey {
    /// Expand the subsets with the highest Gini information first
    Gain,
    /// Expand the subsets carrying the most response weight first
    Weight,
}

impl Default for SubsetKey {
    fn default() -> Self {
        SubsetKey::Gain
    }
}

/// Run indices in ascending order of their keys, lower indices first among equals
fn ordered_by<F: Float>(keys: &[F]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&run_idx| NoisyFloat::<_, FiniteChecker>::new(keys[run_idx]));
    order
}

fn factor_split<F: Float>(
    eval: &Evaluation<F>,
    set: &RunSet<F>,
    left: &[usize],
    info: F,
) -> DiscoveredSplit<F> {
    let (lh_s_count, lh_idx_count, lh_sum) = set.left_totals(left.iter().copied());
    let bit_width = eval.store.rank_count(eval.pred_idx());
    eval.discovered(
        SplitValue::Factor(set.left_mask(left.iter().copied(), bit_width)),
        info,
        lh_s_count,
        lh_idx_count,
        lh_sum,
    )
}

/// Sweeps the runs ordered by mean response
pub(crate) fn split_regression<F: Float>(
    eval: &Evaluation<F>,
    set: &RunSet<F>,
) -> Option<DiscoveredSplit<F>> {
    let runs = set.runs();
    let means: Vec<F> = runs
        .iter()
        .map(|run| run.sum / F::cast(run.s_count))
        .collect();
    let order = ordered_by(&means);

    let (node_s_count, node_sum) = (eval.node.s_count, eval.node.sum);
    let mut floor = eval.floor();
    let mut best = None;
    let (mut lh_s_count, mut lh_sum) = (0, F::zero());
    for (cut, &run_idx) in order.iter().enumerate().take(runs.len().saturating_sub(1)) {
        lh_s_count += runs[run_idx].s_count;
        lh_sum += runs[run_idx].sum;
        let rh_s_count = node_s_count - lh_s_count;
        let info = regression_info(lh_sum, lh_s_count, node_sum - lh_sum, rh_s_count);
        if info > floor {
            floor = info;
            best = Some(cut + 1);
        }
    }

    best.map(|prefix| factor_split(eval, set, &order[..prefix], floor))
}

/// Sweeps the runs of a two-category response ordered by the proportion of category one
pub(crate) fn split_binary<F: Float>(
    eval: &Evaluation<F>,
    set: &RunSet<F>,
) -> Option<DiscoveredSplit<F>> {
    let runs = set.runs();
    let proportions: Vec<F> = (0..runs.len())
        .map(|run_idx| {
            if runs[run_idx].sum > F::zero() {
                set.ctg(run_idx)[1] / runs[run_idx].sum
            } else {
                F::zero()
            }
        })
        .collect();
    let order = ordered_by(&proportions);

    let node_ctg = eval.node_ctg;
    let mut floor = eval.floor();
    let mut best = None;
    let (mut ctg_0, mut ctg_1) = (F::zero(), F::zero());
    for (cut, &run_idx) in order.iter().enumerate().take(runs.len().saturating_sub(1)) {
        ctg_0 += set.ctg(run_idx)[0];
        ctg_1 += set.ctg(run_idx)[1];
        let (rh_0, rh_1) = (node_ctg[0] - ctg_0, node_ctg[1] - ctg_1);
        let info = gini_info(
            ctg_0 * ctg_0 + ctg_1 * ctg_1,
            ctg_0 + ctg_1,
            rh_0 * rh_0 + rh_1 * rh_1,
            rh_0 + rh_1,
        );
        if let Some(info) = info.filter(|&info| info > floor) {
            floor = info;
            best = Some(cut + 1);
        }
    }

    best.map(|prefix| factor_split(eval, set, &order[..prefix], floor))
}

/// Gini information of the runs selected by `subset`, a mask over positions of `search`
fn subset_info<F: Float>(
    eval: &Evaluation<F>,
    set: &RunSet<F>,
    search: &[usize],
    subset: u64,
    ctg_l: &mut [F],
) -> (F, Option<F>) {
    ctg_l.iter_mut().for_each(|sum| *sum = F::zero());
    for (bit, &run_idx) in search.iter().enumerate() {
        if subset & (1u64 << bit) != 0 {
            for (sum, &run_sum) in ctg_l.iter_mut().zip(set.ctg(run_idx)) {
                *sum += run_sum;
            }
        }
    }

    let (mut sum_l, mut ss_l, mut ss_r) = (F::zero(), F::zero(), F::zero());
    for (&left, &node) in ctg_l.iter().zip(eval.node_ctg) {
        let right = node - left;
        sum_l += left;
        ss_l += left * left;
        ss_r += right * right;
    }
    (sum_l, gini_info(ss_l, sum_l, ss_r, eval.node.sum - sum_l))
}

/// Best-first search over subsets of the runs, bounded by the configured ceiling.
///
/// Every subset is generated once, by adding to its parent a run above the parent's highest.
/// Unless some runs were left out of the search, the last run stays on the right, as each
/// bipartition would otherwise be visited twice. The search is exhaustive whenever the ceiling
/// exceeds the number of subsets.
pub(crate) fn split_subsets<F: Float>(
    eval: &Evaluation<F>,
    set: &RunSet<F>,
    params: &InductionValidParams,
) -> Option<DiscoveredSplit<F>> {
    if set.len() < 2 {
        return None;
    }
    let (search, pinned) = set.dewiden(params.max_width());
    let n_bit = if pinned { search.len() } else { search.len() - 1 };

    let mut ctg_l = vec![F::zero(); eval.node_ctg.len()];
    let key = |subset: u64, ctg_l: &mut [F]| {
        let (sum_l, info) = subset_info(eval, set, &search, subset, ctg_l);
        match params.subset_key() {
            SubsetKey::Gain => info.unwrap_or_else(F::zero),
            SubsetKey::Weight => sum_l,
        }
    };
    let mut heap: BinaryHeap<MaxHeapElem<F, u64>> = (0..n_bit)
        .map(|bit| MaxHeapElem::new(key(1u64 << bit, &mut ctg_l), 1u64 << bit))
        .collect();

    let mut floor = eval.floor();
    let mut best = None;
    let mut popped = 0;
    while popped < params.search_ceiling() {
        let subset = match heap.pop() {
            Some(top) => top.elem,
            None => break,
        };
        popped += 1;
        let (_, info) = subset_info(eval, set, &search, subset, &mut ctg_l);
        if let Some(info) = info.filter(|&info| info > floor) {
            floor = info;
            best = Some(subset);
        }
        let highest = 63 - subset.leading_zeros() as usize;
        for bit in highest + 1..n_bit {
            let child = subset | (1u64 << bit);
            heap.push(MaxHeapElem::new(key(child, &mut ctg_l), child));
        }
    }

    best.map(|subset| {
        let left: Vec<usize> = (0..n_bit)
            .filter(|&bit| subset & (1u64 << bit) != 0)
            .map(|bit| search[bit])
            .collect();
        factor_split(eval, set, &left, floor)
    })
}
