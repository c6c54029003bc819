use std::collections::BinaryHeap;

use rand::Rng;

use super::candidate::Monotone;
use super::heap_elem::MinHeapElem;
use crate::InductionValidParams;

/// Draws the predictors examined at one node, in ascending order.
///
/// With a fixed budget, the `pred_fixed` predictors with the greatest weighted keys
/// `u^(1 / prob)` are kept, so that the selection is a weighted sample without replacement.
/// Otherwise each predictor is examined with its own probability. One uniform is drawn per
/// predictor either way.
pub(crate) fn draw_predictors<R: Rng>(
    params: &InductionValidParams,
    n_pred: usize,
    rng: &mut R,
) -> Vec<usize> {
    let fixed = params.pred_fixed();
    if fixed == 0 {
        return (0..n_pred)
            .filter(|&pred_idx| rng.gen::<f64>() < params.pred_prob(pred_idx))
            .collect();
    }

    let mut heap = BinaryHeap::with_capacity(fixed + 1);
    for pred_idx in 0..n_pred {
        let u: f64 = rng.gen();
        let prob = params.pred_prob(pred_idx);
        if prob <= 0.0 {
            continue;
        }
        heap.push(MinHeapElem::new(u.powf(prob.recip()), pred_idx));
        if heap.len() > fixed {
            heap.pop();
        }
    }

    let mut chosen: Vec<usize> = heap.into_iter().map(|top| top.elem).collect();
    chosen.sort_unstable();
    chosen
}

/// Decides whether a predictor's monotone constraint applies to one candidate
pub(crate) fn draw_monotone<R: Rng>(
    params: &InductionValidParams,
    pred_idx: usize,
    rng: &mut R,
) -> Option<Monotone> {
    let mono = params.reg_mono(pred_idx);
    if mono == 0.0 || rng.gen::<f64>() >= mono.abs() {
        None
    } else if mono > 0.0 {
        Some(Monotone::Increasing)
    } else {
        Some(Monotone::Decreasing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use crate::{InductionParams, ParamGuard};

    #[test]
    fn fixed_budget_draws_exactly() {
        let params = InductionParams::new().pred_fixed(3).check().unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let chosen = draw_predictors(&params, 8, &mut rng);
            assert_eq!(chosen.len(), 3);
            assert!(chosen.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn zero_probability_is_never_drawn() {
        let prob = vec![1.0, 0.0, 1.0, 0.0];
        let fixed = InductionParams::new()
            .pred_fixed(4)
            .pred_prob(prob.clone())
            .check()
            .unwrap();
        let free = InductionParams::new().pred_prob(prob).check().unwrap();
        let mut rng = SmallRng::seed_from_u64(7);

        assert_eq!(draw_predictors(&fixed, 4, &mut rng), vec![0, 2]);
        assert_eq!(draw_predictors(&free, 4, &mut rng), vec![0, 2]);
    }

    #[test]
    fn weights_bias_fixed_draws() {
        let params = InductionParams::new()
            .pred_fixed(1)
            .pred_prob(vec![0.9, 0.1])
            .check()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let first = (0..1000)
            .filter(|_| draw_predictors(&params, 2, &mut rng) == vec![0])
            .count();
        // P(u^(1/0.9) > v^(1/0.1)) = 0.9
        assert!(first > 850 && first < 950, "{}", first);
    }

    #[test]
    fn monotone_draws_follow_sign_and_magnitude() {
        let params = InductionParams::new()
            .reg_mono(vec![1.0, -1.0, 0.0])
            .check()
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(11);

        assert_eq!(draw_monotone(&params, 0, &mut rng), Some(Monotone::Increasing));
        assert_eq!(draw_monotone(&params, 1, &mut rng), Some(Monotone::Decreasing));
        assert_eq!(draw_monotone(&params, 2, &mut rng), None);
    }
}
