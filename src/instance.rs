use std::collections::HashMap;

/// Token multiset of one category: token -> multiplicity.
pub type Tokens = HashMap<String, u32>;

/// One time step: a token multiset per category.
pub type Observation = Vec<Tokens>;

/// An observed sequence.
///
/// Distinct observations are stored once in `obs`; `index` maps every logical
/// time step to the observation it shows, so a value held over many steps
/// costs a single entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub obs: Vec<Observation>,
    index: Vec<usize>,
}

impl Instance {
    /// Builds an instance where `obs[k]` is repeated for `periods[k]`
    /// consecutive time steps. Panics if the two slices differ in length;
    /// use [`Instance::try_new`] for untrusted input.
    pub fn new(obs: Vec<Observation>, periods: &[usize]) -> Self {
        assert_eq!(
            obs.len(),
            periods.len(),
            "every observation needs a period"
        );
        let index = periods
            .iter()
            .enumerate()
            .flat_map(|(k, &p)| std::iter::repeat(k).take(p))
            .collect();
        Self { obs, index }
    }

    pub fn try_new(
        obs: Vec<Observation>,
        periods: &[usize],
    ) -> Result<Self, crate::errors::CorpusError> {
        if obs.len() != periods.len() {
            return Err(crate::errors::CorpusError::PeriodMismatch {
                observations: obs.len(),
                periods: periods.len(),
            });
        }
        Ok(Self::new(obs, periods))
    }

    /// One time step per observation.
    pub fn from_sequence(obs: Vec<Observation>) -> Self {
        let periods = vec![1; obs.len()];
        Self::new(obs, &periods)
    }

    /// Number of time steps.
    pub fn t(&self) -> usize {
        self.index.len()
    }

    /// Per-category token multisets at time `t`.
    pub fn o(&self, t: usize) -> &Observation {
        &self.obs[self.index[t]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pairs: &[(&str, u32)]) -> Tokens {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_periods_expand_index() {
        let a = vec![tokens(&[("founder", 1)])];
        let b = vec![tokens(&[("vice", 1), ("president", 1)])];
        let inst = Instance::new(vec![a.clone(), b.clone()], &[1, 3]);

        assert_eq!(inst.t(), 4);
        assert_eq!(inst.o(0), &a);
        for t in 1..4 {
            assert_eq!(inst.o(t), &b);
        }
    }

    #[test]
    fn test_zero_period_is_skipped() {
        let a = vec![tokens(&[("x", 1)])];
        let b = vec![tokens(&[("y", 2)])];
        let inst = Instance::new(vec![a, b.clone()], &[0, 2]);
        assert_eq!(inst.t(), 2);
        assert_eq!(inst.o(0), &b);
    }

    #[test]
    fn test_try_new_rejects_mismatch() {
        let a = vec![tokens(&[("x", 1)])];
        assert!(Instance::try_new(vec![a], &[1, 2]).is_err());
    }

    #[test]
    fn test_empty_instance() {
        let inst = Instance::from_sequence(Vec::new());
        assert_eq!(inst.t(), 0);
    }
}
