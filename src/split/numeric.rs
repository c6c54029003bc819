//! Cuts over the ranks of a numeric predictor
//!
//! Both sweeps walk the node's samples in rank order, accumulating the left side, and evaluate
//! a cut at every rank change. The right side is always the node total less the left side.
use super::candidate::Evaluation;
use super::criterion::{gini_info, regression_info};
use super::walk::{walk, Step};
use super::DiscoveredSplit;
use crate::Float;

/// Best cut seen so far by a sweep
struct Cut<F> {
    info: F,
    rank_low: usize,
    rank_high: usize,
    lh_s_count: usize,
    lh_idx_count: usize,
    lh_sum: F,
}

struct LeftSide<F> {
    s_count: usize,
    idx_count: usize,
    sum: F,
}

impl<F: Float> LeftSide<F> {
    fn new() -> Self {
        LeftSide {
            s_count: 0,
            idx_count: 0,
            sum: F::zero(),
        }
    }

    fn add(&mut self, step: &Step<F>) {
        self.s_count += step.s_count();
        self.idx_count += step.idx_count();
        self.sum += step.sum();
    }

    fn cut(&self, info: F, rank_low: usize, rank_high: usize) -> Cut<F> {
        Cut {
            info,
            rank_low,
            rank_high,
            lh_s_count: self.s_count,
            lh_idx_count: self.idx_count,
            lh_sum: self.sum,
        }
    }
}

fn discovered<F: Float>(eval: &Evaluation<F>, cut: Option<Cut<F>>) -> Option<DiscoveredSplit<F>> {
    cut.map(|cut| {
        eval.discovered(
            eval.numeric_value(cut.rank_low, cut.rank_high),
            cut.info,
            cut.lh_s_count,
            cut.lh_idx_count,
            cut.lh_sum,
        )
    })
}

/// Sum-of-squares sweep, honouring the candidate's monotone constraint
pub(crate) fn split_regression<F: Float>(eval: &Evaluation<F>) -> Option<DiscoveredSplit<F>> {
    let dense = eval.dense();
    let (node_s_count, node_sum) = (eval.node.s_count, eval.node.sum);

    let mut left = LeftSide::new();
    let mut best: Option<Cut<F>> = None;
    let mut floor = eval.floor();
    let mut rank_prev = None;
    for step in walk(eval.explicit, dense.as_ref()) {
        if let Some(rank_low) = rank_prev.filter(|&rank| rank != step.rank()) {
            let rh_s_count = node_s_count - left.s_count;
            let rh_sum = node_sum - left.sum;
            let admitted = eval
                .cand
                .mono
                .map_or(true, |mono| mono.admits(left.sum, left.s_count, rh_sum, rh_s_count));
            if admitted {
                let info = regression_info(left.sum, left.s_count, rh_sum, rh_s_count);
                if info > floor {
                    floor = info;
                    best = Some(left.cut(info, rank_low, step.rank()));
                }
            }
        }
        left.add(&step);
        rank_prev = Some(step.rank());
    }

    discovered(eval, best)
}

/// Gini sweep over per-category sums held in the candidate's accumulator slot
pub(crate) fn split_categorical<F: Float>(
    eval: &Evaluation<F>,
    ctg_width: usize,
    acc: &mut [F],
) -> Option<DiscoveredSplit<F>> {
    let (ctg_l, rest) = acc.split_at_mut(ctg_width);
    let (ctg_r, ctg_dense) = rest.split_at_mut(ctg_width);
    ctg_l.iter_mut().for_each(|sum| *sum = F::zero());
    ctg_r.copy_from_slice(eval.node_ctg);

    let dense = eval.dense();
    if dense.is_some() {
        ctg_dense.copy_from_slice(eval.node_ctg);
        for sample in eval.explicit {
            ctg_dense[sample.ctg] -= sample.y_sum;
        }
    }

    let node_sum = eval.node.sum;
    let mut ss_l = F::zero();
    let mut ss_r = ctg_r.iter().fold(F::zero(), |ss, &sum| ss + sum * sum);
    let mut left = LeftSide::new();
    let mut best: Option<Cut<F>> = None;
    let mut floor = eval.floor();
    let mut rank_prev = None;
    for step in walk(eval.explicit, dense.as_ref()) {
        if let Some(rank_low) = rank_prev.filter(|&rank| rank != step.rank()) {
            if let Some(info) = gini_info(ss_l, left.sum, ss_r, node_sum - left.sum) {
                if info > floor {
                    floor = info;
                    best = Some(left.cut(info, rank_low, step.rank()));
                }
            }
        }

        let mut shift = |ctg: usize, y_sum: F| {
            ss_l += y_sum * (ctg_l[ctg] + ctg_l[ctg] + y_sum);
            ss_r -= y_sum * (ctg_r[ctg] + ctg_r[ctg] - y_sum);
            ctg_l[ctg] += y_sum;
            ctg_r[ctg] -= y_sum;
        };
        match step {
            Step::Explicit(sample) => shift(sample.ctg, sample.y_sum),
            Step::Dense(_) => {
                for (ctg, &y_sum) in ctg_dense.iter().enumerate() {
                    shift(ctg, y_sum);
                }
            }
        }
        left.add(&step);
        rank_prev = Some(step.rank());
    }

    discovered(eval, best)
}
