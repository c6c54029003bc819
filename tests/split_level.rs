use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use rankforest::prelude::*;
use rankforest::{FrontierNode, InductionValidParams};

struct Problem {
    num: Array2<f64>,
    fac: Array2<usize>,
    y: Array1<f64>,
    ctg: Array1<usize>,
    bag: Vec<usize>,
}

fn problem(n_row: usize, seed: u64) -> Problem {
    let mut rng = SmallRng::seed_from_u64(seed);
    let num = Array2::from_shape_fn((n_row, 3), |(_, col)| {
        rng.gen_range(0..4 + 4 * col) as f64 / 2.0
    });
    let fac = Array2::from_shape_fn((n_row, 2), |(_, col)| rng.gen_range(0..3 + 2 * col));
    let y = Array1::from_shape_fn(n_row, |row| {
        num[[row, 1]] + if fac[[row, 0]] == 1 { 5.0 } else { 0.0 }
    });
    let ctg = Array1::from_shape_fn(n_row, |row| {
        (fac[[row, 1]] + (num[[row, 0]] > 1.0) as usize) % 3
    });
    let bag = (0..n_row).map(|_| rng.gen_range(0..3)).collect();

    Problem {
        num,
        fac,
        y,
        ctg,
        bag,
    }
}

fn regression_level(
    problem: &Problem,
    params: &InductionValidParams,
    seed: u64,
) -> Vec<Option<DiscoveredSplit<f64>>> {
    let presorted = PreSorted::new(&problem.num, &problem.fac).unwrap();
    let store = PredictorStore::new(&presorted, params).unwrap();
    let mut stage = StagedSamples::regression(&store, &problem.y, &problem.bag).unwrap();
    let frontier = stage.frontier().to_vec();
    let engine = SplitEngine::new(&store, params).unwrap();
    engine.split_level(&frontier, &mut stage, &mut SmallRng::seed_from_u64(seed))
}

#[test]
fn seeded_levels_are_identical() {
    let problem = problem(300, 1);
    let params = InductionParams::new()
        .pred_fixed(2)
        .pred_prob(vec![0.2, 0.9, 0.5, 0.7, 0.4])
        .check()
        .unwrap();

    let first = regression_level(&problem, &params, 99);
    let second = regression_level(&problem, &params, 99);
    assert_eq!(first, second);
    assert!(first[0].is_some());
}

/// Grows a tree level by level, checking that children partition their parents
fn grow<'a>(
    stage: &mut StagedSamples<'a, f64>,
    engine: &SplitEngine<'a, f64>,
    depth: usize,
) -> Vec<Vec<FrontierNode<f64>>> {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut levels = vec![stage.frontier().to_vec()];
    for _ in 0..depth {
        let frontier = stage.frontier().to_vec();
        if frontier.is_empty() {
            break;
        }
        let splits = engine.split_level(&frontier, stage, &mut rng);
        let parents: Vec<_> = frontier
            .iter()
            .zip(&splits)
            .filter_map(|(node, split)| split.as_ref().map(|split| (node.clone(), split.clone())))
            .collect();
        let children = stage.apply_splits(&splits).to_vec();

        assert_eq!(children.len(), 2 * parents.len());
        for ((parent, split), pair) in parents.iter().zip(children.chunks(2)) {
            assert!(split.gain > 0.0);
            assert_eq!(pair[0].s_count, split.lh_s_count);
            assert_eq!(pair[0].idx_count, split.lh_idx_count);
            assert_eq!(pair[1].s_count, split.rh_s_count);
            assert_eq!(pair[0].idx_count + pair[1].idx_count, parent.idx_count);
            assert_abs_diff_eq!(pair[0].sum, split.lh_sum, epsilon = 1e-9);
            assert_abs_diff_eq!(pair[1].sum, split.rh_sum, epsilon = 1e-9);
        }
        for pair in children.windows(2) {
            assert_eq!(pair[0].start + pair[0].idx_count, pair[1].start);
        }
        levels.push(children);
    }
    levels
}

#[test]
fn regression_tree_grows_consistently() {
    let problem = problem(400, 2);
    let params = InductionParams::new().min_node(5).check().unwrap();
    let presorted = PreSorted::new(&problem.num, &problem.fac).unwrap();
    let store = PredictorStore::new(&presorted, &params).unwrap();
    let engine = SplitEngine::new(&store, &params).unwrap();
    let mut stage = StagedSamples::regression(&store, &problem.y, &problem.bag).unwrap();

    let levels = grow(&mut stage, &engine, 4);
    assert!(levels.len() >= 3);
    assert_eq!(levels[1].len(), 2);
}

#[test]
fn classification_tree_grows_consistently() {
    let problem = problem(400, 4);
    let params = InductionParams::new()
        .ctg_width(3)
        .max_width(2)
        .pred_fixed(3)
        .check()
        .unwrap();
    let presorted = PreSorted::new(&problem.num, &problem.fac).unwrap();
    let store = PredictorStore::new(&presorted, &params).unwrap();
    let engine = SplitEngine::new(&store, &params).unwrap();
    let weight = Array1::ones(400);
    let mut stage =
        StagedSamples::classification(&store, &problem.ctg, &weight, 3, &problem.bag).unwrap();

    let levels = grow(&mut stage, &engine, 5);
    assert!(levels.len() >= 3);
}
