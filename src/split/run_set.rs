use std::cmp::Reverse;

use noisy_float::{checkers::FiniteChecker, NoisyFloat};

use super::candidate::Evaluation;
use super::walk::{walk, Step};
use super::BitMask;
use crate::Float;

/// The samples of a node sharing one factor code
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct FacRun<F> {
    pub rank: usize,
    pub idx_count: usize,
    pub s_count: usize,
    pub sum: F,
}

/// Runs of a factor candidate in code order, with per-category sums when categorical.
///
/// Borrows its storage from the candidate's slots of the level buffers.
pub(crate) struct RunSet<'a, F> {
    runs: &'a [FacRun<F>],
    ctg: &'a [F],
    ctg_width: usize,
}

impl<'a, F: Float> RunSet<'a, F> {
    /// Gathers the runs of a candidate into its slots
    pub fn collect(
        eval: &Evaluation<F>,
        runs: &'a mut [FacRun<F>],
        ctg: &'a mut [F],
        ctg_width: usize,
    ) -> Self {
        let dense = eval.dense();
        let mut len = 0;
        let mut dense_run = None;
        for step in walk(eval.explicit, dense.as_ref()) {
            if len == 0 || runs[len - 1].rank != step.rank() {
                runs[len] = FacRun {
                    rank: step.rank(),
                    ..Default::default()
                };
                ctg[len * ctg_width..(len + 1) * ctg_width]
                    .iter_mut()
                    .for_each(|sum| *sum = F::zero());
                len += 1;
            }
            let run = &mut runs[len - 1];
            run.idx_count += step.idx_count();
            run.s_count += step.s_count();
            run.sum += step.sum();
            match step {
                Step::Explicit(sample) if ctg_width > 0 => {
                    ctg[(len - 1) * ctg_width + sample.ctg] += sample.y_sum
                }
                Step::Dense(_) => dense_run = Some(len - 1),
                _ => {}
            }
        }

        if let Some(dense_run) = dense_run.filter(|_| ctg_width > 0) {
            // the dense run holds whatever the explicit runs leave of the node's sums
            let (before, rest) = ctg[..len * ctg_width].split_at_mut(dense_run * ctg_width);
            let (dense_ctg, after) = rest.split_at_mut(ctg_width);
            dense_ctg.copy_from_slice(eval.node_ctg);
            for other in before.chunks(ctg_width).chain(after.chunks(ctg_width)) {
                for (sum, &explicit) in dense_ctg.iter_mut().zip(other) {
                    *sum -= explicit;
                }
            }
        }

        let runs: &'a [FacRun<F>] = runs;
        let ctg: &'a [F] = ctg;
        RunSet {
            runs: &runs[..len],
            ctg: &ctg[..len * ctg_width],
            ctg_width,
        }
    }

    pub fn runs(&self) -> &[FacRun<F>] {
        self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Per-category response sums of a run
    pub fn ctg(&self, run_idx: usize) -> &[F] {
        &self.ctg[run_idx * self.ctg_width..(run_idx + 1) * self.ctg_width]
    }

    /// Selects the runs entering a subset search.
    ///
    /// Keeps the `max_width` heaviest runs, heavier first and lower codes first among equals,
    /// and returns them in code order. The flag tells whether any run was left out.
    pub fn dewiden(&self, max_width: usize) -> (Vec<usize>, bool) {
        if self.len() <= max_width {
            return ((0..self.len()).collect(), false);
        }
        let mut by_weight: Vec<usize> = (0..self.len()).collect();
        // stable: lower codes stay first among equal weights
        by_weight.sort_by_key(|&run_idx| {
            Reverse(NoisyFloat::<_, FiniteChecker>::new(self.runs[run_idx].sum))
        });
        by_weight.truncate(max_width);
        by_weight.sort_unstable();
        (by_weight, true)
    }

    /// Mask over the predictor's codes with the given runs set
    pub fn left_mask(&self, run_idx: impl IntoIterator<Item = usize>, bit_width: usize) -> BitMask {
        let mut mask = BitMask::new(bit_width);
        for run_idx in run_idx {
            mask.set(self.runs[run_idx].rank);
        }
        mask
    }

    /// Left-side sample counts and response sum of a set of runs
    pub fn left_totals(&self, run_idx: impl IntoIterator<Item = usize>) -> (usize, usize, F) {
        run_idx
            .into_iter()
            .fold((0, 0, F::zero()), |(s_count, idx_count, sum), run_idx| {
                let run = &self.runs[run_idx];
                (s_count + run.s_count, idx_count + run.idx_count, sum + run.sum)
            })
    }
}
