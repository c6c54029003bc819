use crate::{
    error::{Error, Result},
    ParamGuard, SubsetKey,
};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// The set of parameters shared by the [predictor store](crate::PredictorStore) and the
/// [split engine](crate::SplitEngine) for one training run.
///
/// The value is immutable once checked and is passed by reference to both constructors, so
/// successive training runs never observe each other's configuration.
///
/// ### Example
///
/// ```rust
/// use rankforest::{InductionParams, ParamGuard};
///
/// let params = InductionParams::new()
///     .ctg_width(3)
///     .pred_fixed(2)
///     .min_node(4)
///     .check()
///     .unwrap();
/// assert_eq!(params.ctg_width(), 3);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct InductionValidParams {
    ctg_width: usize,
    pred_fixed: usize,
    pred_prob: Vec<f64>,
    reg_mono: Vec<f64>,
    min_node: usize,
    plurality: f64,
    max_width: usize,
    search_ceiling: usize,
    subset_key: SubsetKey,
}

impl InductionValidParams {
    /// Number of response categories, zero for regression
    pub fn ctg_width(&self) -> usize {
        self.ctg_width
    }

    pub fn is_regression(&self) -> bool {
        self.ctg_width == 0
    }

    /// Number of predictors examined per node, zero when scheduling is probabilistic
    pub fn pred_fixed(&self) -> usize {
        self.pred_fixed
    }

    /// Selection probability of a predictor, one when none was configured
    pub fn pred_prob(&self, pred_idx: usize) -> f64 {
        self.pred_prob.get(pred_idx).copied().unwrap_or(1.0)
    }

    /// Monotonicity of a predictor, zero when unconstrained
    pub fn reg_mono(&self, pred_idx: usize) -> f64 {
        self.reg_mono.get(pred_idx).copied().unwrap_or(0.0)
    }

    pub fn min_node(&self) -> usize {
        self.min_node
    }

    pub fn plurality(&self) -> f64 {
        self.plurality
    }

    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn search_ceiling(&self) -> usize {
        self.search_ceiling
    }

    pub fn subset_key(&self) -> SubsetKey {
        self.subset_key
    }

    /// Checks the per-predictor vectors against the number of predictors actually stored.
    pub(crate) fn check_pred_count(&self, n_pred: usize) -> Result<()> {
        if !self.pred_prob.is_empty() && self.pred_prob.len() != n_pred {
            return Err(Error::Parameters(format!(
                "expected {} selection probabilities, got {}",
                n_pred,
                self.pred_prob.len()
            )));
        }
        if !self.reg_mono.is_empty() && self.reg_mono.len() != n_pred {
            return Err(Error::Parameters(format!(
                "expected {} monotonicity values, got {}",
                n_pred,
                self.reg_mono.len()
            )));
        }
        if self.pred_fixed > n_pred {
            return Err(Error::Parameters(format!(
                "fixed predictor count {} exceeds predictor count {}",
                self.pred_fixed, n_pred
            )));
        }
        Ok(())
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct InductionParams(InductionValidParams);

impl InductionParams {
    pub fn new() -> Self {
        Self(InductionValidParams {
            ctg_width: 0,
            pred_fixed: 0,
            pred_prob: Vec::new(),
            reg_mono: Vec::new(),
            min_node: 2,
            plurality: 0.25,
            max_width: 10,
            search_ceiling: 1024,
            subset_key: SubsetKey::Gain,
        })
    }

    /// Sets the number of response categories. Zero selects regression.
    pub fn ctg_width(mut self, ctg_width: usize) -> Self {
        self.0.ctg_width = ctg_width;
        self
    }

    /// Examines exactly `pred_fixed` predictors per node, drawn with probability weighting.
    ///
    /// Zero switches to independent per-predictor draws against `pred_prob`.
    pub fn pred_fixed(mut self, pred_fixed: usize) -> Self {
        self.0.pred_fixed = pred_fixed;
        self
    }

    /// Sets the per-predictor selection probabilities
    pub fn pred_prob(mut self, pred_prob: Vec<f64>) -> Self {
        self.0.pred_prob = pred_prob;
        self
    }

    /// Sets the per-predictor monotonicity constraints of a regression.
    ///
    /// The sign selects the direction in which the mean response must move from the left to
    /// the right side of a split. The magnitude is the probability that the constraint is
    /// enforced for a given node.
    pub fn reg_mono(mut self, reg_mono: Vec<f64>) -> Self {
        self.0.reg_mono = reg_mono;
        self
    }

    /// Sets the minimum sample count of a node eligible for splitting
    pub fn min_node(mut self, min_node: usize) -> Self {
        self.0.min_node = min_node;
        self
    }

    /// Sets the fraction of rows a single rank must exceed to be elided from storage
    pub fn plurality(mut self, plurality: f64) -> Self {
        self.0.plurality = plurality;
        self
    }

    /// Sets the maximum number of factor levels entering the categorical subset search
    pub fn max_width(mut self, max_width: usize) -> Self {
        self.0.max_width = max_width;
        self
    }

    /// Sets the maximum number of subsets evaluated by the categorical subset search
    pub fn search_ceiling(mut self, search_ceiling: usize) -> Self {
        self.0.search_ceiling = search_ceiling;
        self
    }

    /// Sets the priority under which the subset search expands candidate subsets
    pub fn subset_key(mut self, subset_key: SubsetKey) -> Self {
        self.0.subset_key = subset_key;
        self
    }
}

impl Default for InductionParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamGuard for InductionParams {
    type Checked = InductionValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let params = &self.0;
        if params.ctg_width == 1 {
            Err(Error::Parameters(
                "a categorical response needs at least two categories".into(),
            ))
        } else if let Some(prob) = params
            .pred_prob
            .iter()
            .find(|prob| !(0.0..=1.0).contains(*prob))
        {
            Err(Error::Parameters(format!(
                "selection probability should be in [0, 1], but was {}",
                prob
            )))
        } else if let Some(mono) = params
            .reg_mono
            .iter()
            .find(|mono| !(-1.0..=1.0).contains(*mono))
        {
            Err(Error::Parameters(format!(
                "monotonicity should be in [-1, 1], but was {}",
                mono
            )))
        } else if params.ctg_width > 0 && params.reg_mono.iter().any(|mono| *mono != 0.0) {
            Err(Error::Parameters(
                "monotonicity constraints require a regression response".into(),
            ))
        } else if !(params.plurality > 0.0 && params.plurality < 1.0) {
            Err(Error::Parameters(format!(
                "plurality should be in (0, 1), but was {}",
                params.plurality
            )))
        } else if !(2..=64).contains(&params.max_width) {
            Err(Error::Parameters(format!(
                "maximal run width should be in [2, 64], but was {}",
                params.max_width
            )))
        } else if params.search_ceiling == 0 {
            Err(Error::Parameters(
                "subset search ceiling should be positive".into(),
            ))
        } else {
            Ok(params)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = InductionParams::default().check().unwrap();
        assert!(params.is_regression());
        assert_eq!(params.min_node(), 2);
        assert_eq!(params.pred_prob(7), 1.0);
        assert_eq!(params.reg_mono(7), 0.0);
    }

    #[test]
    fn rejects_single_category() {
        assert!(InductionParams::new().ctg_width(1).check().is_err());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let params = InductionParams::new().pred_prob(vec![0.5, 1.5]);
        assert!(params.check_ref().is_err());
    }

    #[test]
    fn rejects_categorical_monotonicity() {
        let params = InductionParams::new().ctg_width(2).reg_mono(vec![1.0]);
        assert!(params.check().is_err());
    }

    #[test]
    fn checks_vector_lengths_against_predictors() {
        let params = InductionParams::new()
            .pred_prob(vec![1.0; 3])
            .check()
            .unwrap();
        assert!(params.check_pred_count(3).is_ok());
        assert!(params.check_pred_count(4).is_err());
    }

    #[test]
    #[should_panic]
    fn panic_on_zero_ceiling() {
        InductionParams::new().search_ceiling(0).check_unwrap();
    }
}
