use crate::stage::StagedSample;
use crate::Float;

/// Aggregate of a node's samples at the predictor's dense rank.
///
/// These samples are never staged, their statistics are the node totals less the explicit ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DenseBlock<F> {
    pub rank: usize,
    pub idx_count: usize,
    pub s_count: usize,
    pub sum: F,
}

impl<F: Float> DenseBlock<F> {
    pub fn by_subtraction(
        rank: usize,
        idx_count: usize,
        node_s_count: usize,
        node_sum: F,
        explicit: &[StagedSample<F>],
    ) -> Self {
        let (s_count, sum) = explicit
            .iter()
            .fold((0, F::zero()), |(s_count, sum), sample| {
                (s_count + sample.s_count, sum + sample.y_sum)
            });
        DenseBlock {
            rank,
            idx_count,
            s_count: node_s_count - s_count,
            sum: node_sum - sum,
        }
    }
}

/// One position of a rank-ordered sweep
#[derive(Clone, Copy, Debug)]
pub(crate) enum Step<'a, F> {
    Explicit(&'a StagedSample<F>),
    Dense(&'a DenseBlock<F>),
}

impl<'a, F: Float> Step<'a, F> {
    pub fn rank(&self) -> usize {
        match self {
            Step::Explicit(sample) => sample.rank,
            Step::Dense(block) => block.rank,
        }
    }

    pub fn idx_count(&self) -> usize {
        match self {
            Step::Explicit(_) => 1,
            Step::Dense(block) => block.idx_count,
        }
    }

    pub fn s_count(&self) -> usize {
        match self {
            Step::Explicit(sample) => sample.s_count,
            Step::Dense(block) => block.s_count,
        }
    }

    pub fn sum(&self) -> F {
        match self {
            Step::Explicit(sample) => sample.y_sum,
            Step::Dense(block) => block.sum,
        }
    }
}

/// Walks the explicit samples in rank order, with the dense block slotted in at its rank
pub(crate) fn walk<'a, F: Float>(
    explicit: &'a [StagedSample<F>],
    dense: Option<&'a DenseBlock<F>>,
) -> impl Iterator<Item = Step<'a, F>> + 'a {
    let at = dense.map_or(explicit.len(), |block| {
        explicit.partition_point(|sample| sample.rank < block.rank)
    });
    let (low, high) = explicit.split_at(at);

    low.iter()
        .map(Step::Explicit)
        .chain(dense.map(Step::Dense))
        .chain(high.iter().map(Step::Explicit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rank: usize, y_sum: f64) -> StagedSample<f64> {
        StagedSample {
            rank,
            s_count: 1,
            y_sum,
            ..Default::default()
        }
    }

    #[test]
    fn dense_block_lands_at_its_rank() {
        let explicit = [sample(0, 1.0), sample(2, 2.0), sample(3, 3.0)];
        let block = DenseBlock::by_subtraction(1, 2, 6, 10.0, &explicit);
        assert_eq!(block.s_count, 3);
        assert_eq!(block.sum, 4.0);

        let ranks: Vec<_> = walk(&explicit, Some(&block)).map(|step| step.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        let counts: Vec<_> = walk(&explicit, Some(&block))
            .map(|step| step.idx_count())
            .collect();
        assert_eq!(counts, vec![1, 2, 1, 1]);
    }

    #[test]
    fn dense_block_at_either_end() {
        let explicit = [sample(1, 1.0), sample(2, 2.0)];
        let low = DenseBlock::by_subtraction(0, 1, 3, 3.0, &explicit);
        let high = DenseBlock::by_subtraction(5, 1, 3, 3.0, &explicit);

        assert_eq!(walk(&explicit, Some(&low)).next().map(|s| s.rank()), Some(0));
        assert_eq!(walk(&explicit, Some(&high)).last().map(|s| s.rank()), Some(5));
        assert_eq!(walk(&explicit, None).count(), 2);
    }
}
