use log::{debug, trace};
use rand::Rng;
use rayon::prelude::*;

use super::candidate::{Evaluation, SplitCandidate};
use super::criterion::{SlotWidth, SplitMode};
use super::run_set::FacRun;
use super::schedule::{draw_monotone, draw_predictors};
use super::DiscoveredSplit;
use crate::error::Result;
use crate::stage::{FrontierNode, Restage};
use crate::{Float, InductionValidParams, PredictorStore};

/// Finds the best split of every node of a tree level.
///
/// The engine borrows the predictor store and the configuration of a training run and holds no
/// state across levels: the scratch buffers of a level are allocated by
/// [`split_level`](SplitEngine::split_level) and released when it returns.
///
/// ### Example
///
/// ```rust
/// use ndarray::{array, Array2};
/// use rand::{rngs::SmallRng, SeedableRng};
/// use rankforest::{
///     InductionParams, ParamGuard, PreSorted, PredictorStore, SplitEngine, SplitValue,
///     StagedSamples,
/// };
///
/// let x = array![[1.0], [1.0], [1.0], [2.0], [2.0], [5.0]];
/// let y = array![0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
/// let presorted = PreSorted::new(&x, &Array2::<usize>::zeros((6, 0))).unwrap();
/// let params = InductionParams::new().check().unwrap();
/// let store = PredictorStore::new(&presorted, &params).unwrap();
///
/// let mut stage = StagedSamples::regression(&store, &y, &[1; 6]).unwrap();
/// let frontier = stage.frontier().to_vec();
/// let engine = SplitEngine::new(&store, &params).unwrap();
/// let splits = engine.split_level(&frontier, &mut stage, &mut SmallRng::seed_from_u64(42));
///
/// let split = splits[0].as_ref().unwrap();
/// assert_eq!(split.value, SplitValue::Numeric { rank_mean: 0.5, threshold: 1.5 });
/// assert_eq!(split.lh_s_count, 3);
/// ```
pub struct SplitEngine<'a, F> {
    store: &'a PredictorStore<F>,
    params: &'a InductionValidParams,
    mode: SplitMode,
}

impl<'a, F: Float> SplitEngine<'a, F> {
    /// Binds a store to the configuration it is trained under.
    ///
    /// Fails if the per-predictor vectors of the configuration do not match the store.
    pub fn new(store: &'a PredictorStore<F>, params: &'a InductionValidParams) -> Result<Self> {
        params.check_pred_count(store.n_pred())?;
        Ok(SplitEngine {
            store,
            params,
            mode: SplitMode::new(params),
        })
    }

    /// Splits a level of the tree.
    ///
    /// Schedules candidates for every splittable node, restages them, evaluates them in
    /// parallel and keeps the highest-gain split of each node. Candidates of a node are
    /// compared in predictor order and a later candidate must beat the gain of an earlier one
    /// strictly.
    ///
    /// ### Returns
    ///
    /// One entry per frontier node, `None` for nodes left as leaves
    pub fn split_level<S, R>(
        &self,
        frontier: &[FrontierNode<F>],
        stage: &mut S,
        rng: &mut R,
    ) -> Vec<Option<DiscoveredSplit<F>>>
    where
        S: Restage<F> + Sync,
        R: Rng,
    {
        let mut candidates = Vec::new();
        let mut unsplittable = 0;
        for node in frontier {
            let stats = self
                .mode
                .level_preset(node, stage.ctg_sums(node), self.params.min_node());
            if !stats.splittable {
                unsplittable += 1;
                continue;
            }
            for pred_idx in draw_predictors(self.params, self.store.n_pred(), rng) {
                let mono = if self.store.is_factor(pred_idx) {
                    None
                } else {
                    draw_monotone(self.params, pred_idx, rng)
                };
                candidates.push(SplitCandidate::new(
                    node.level_idx,
                    pred_idx,
                    stats.prebias,
                    mono,
                ));
            }
        }

        for cand in &mut candidates {
            cand.range = stage.restage(&frontier[cand.level_idx], cand.pred_idx);
        }

        let widths: Vec<SlotWidth> = candidates
            .iter()
            .map(|cand| {
                self.mode
                    .run_offsets(self.store, &frontier[cand.level_idx], cand)
            })
            .collect();
        let mut runs = vec![FacRun::default(); widths.iter().map(|width| width.runs).sum()];
        let mut acc = vec![F::zero(); widths.iter().map(|width| width.acc).sum()];
        let slots = carve(&mut runs, &mut acc, &widths);

        let stage = &*stage;
        let outcomes: Vec<Option<DiscoveredSplit<F>>> = candidates
            .par_iter()
            .zip(slots)
            .map(|(cand, (run_slot, acc_slot))| {
                let node = &frontier[cand.level_idx];
                let eval = Evaluation {
                    store: self.store,
                    cand,
                    node,
                    explicit: stage.samples(
                        cand.pred_idx,
                        cand.range.buf_idx,
                        cand.range.start..cand.range.end,
                    ),
                    node_ctg: stage.ctg_sums(node),
                };
                self.mode.split(&eval, run_slot, acc_slot, self.params)
            })
            .collect();

        let mut best: Vec<Option<DiscoveredSplit<F>>> = vec![None; frontier.len()];
        for (cand, outcome) in candidates.iter().zip(outcomes) {
            trace!(
                "node {} predictor {}: {}",
                cand.level_idx,
                cand.pred_idx,
                outcome
                    .as_ref()
                    .map_or("no split".to_string(), |split| format!("gain {}", split.gain))
            );
            if let Some(split) = outcome {
                let slot = &mut best[cand.level_idx];
                if slot.as_ref().map_or(true, |incumbent| split.gain > incumbent.gain) {
                    *slot = Some(split);
                }
            }
        }

        debug!(
            "split level: {} nodes, {} unsplittable, {} candidates, {} splits",
            frontier.len(),
            unsplittable,
            candidates.len(),
            best.iter().filter(|split| split.is_some()).count()
        );
        best
    }
}

/// Partitions the level buffers into disjoint per-candidate slots
fn carve<'b, F>(
    mut runs: &'b mut [FacRun<F>],
    mut acc: &'b mut [F],
    widths: &[SlotWidth],
) -> Vec<(&'b mut [FacRun<F>], &'b mut [F])> {
    widths
        .iter()
        .map(|width| {
            let (run_slot, runs_rest) = std::mem::take(&mut runs).split_at_mut(width.runs);
            let (acc_slot, acc_rest) = std::mem::take(&mut acc).split_at_mut(width.acc);
            runs = runs_rest;
            acc = acc_rest;
            (run_slot, acc_slot)
        })
        .collect()
}
