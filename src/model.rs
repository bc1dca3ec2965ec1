//! HMM parameter estimate held as running sufficient statistics.
//!
//! Parameters are never stored directly; `pi`, `a` and `b` are derived from
//! the accumulators on every call. A model is written by exactly one owner
//! while it is being estimated and is only read afterwards.

use crate::instance::Observation;
use crate::multinomial::{multinomial_matrix, Multinomial};
use serde::{Deserialize, Serialize};

/// Expected statistics contributed by one instance (or one hard assignment).
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Posterior state distribution at the first time step.
    pub gamma1: Vec<f64>,
    /// Expected departures from each state.
    pub sum_gamma: Vec<f64>,
    /// Expected transition counts, `sum_xi[i][j]` for i -> j.
    pub sum_xi: Vec<Vec<f64>>,
    /// Posterior-weighted token counts per state and category.
    pub sum_gamma_obs: Vec<Vec<Multinomial>>,
}

impl Statistics {
    pub fn zeros(n: usize, c: usize) -> Self {
        Self {
            gamma1: vec![0.0; n],
            sum_gamma: vec![0.0; n],
            sum_xi: vec![vec![0.0; n]; n],
            sum_gamma_obs: multinomial_matrix(n, c),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    n: usize,
    c: usize,
    pub s1: Vec<f64>,
    pub s1_sum: f64,
    pub sum_gamma: Vec<f64>,
    pub sum_xi: Vec<Vec<f64>>,
    pub sum_gamma_obs: Vec<Vec<Multinomial>>,
}

impl Model {
    /// An empty model with every accumulator at zero.
    pub fn new(n: usize, c: usize) -> Self {
        Self {
            n,
            c,
            s1: vec![0.0; n],
            s1_sum: 0.0,
            sum_gamma: vec![0.0; n],
            sum_xi: vec![vec![0.0; n]; n],
            sum_gamma_obs: multinomial_matrix(n, c),
        }
    }

    /// Number of hidden states.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of observation categories.
    pub fn c(&self) -> usize {
        self.c
    }

    /// Initial-state probability. Zero while no sequence has been counted.
    pub fn pi(&self, i: usize) -> f64 {
        if self.s1_sum == 0.0 {
            return 0.0;
        }
        self.s1[i] / self.s1_sum
    }

    /// Transition probability i -> j. Zero for a state with no departures.
    pub fn a(&self, i: usize, j: usize) -> f64 {
        if self.sum_gamma[i] == 0.0 {
            return 0.0;
        }
        self.sum_xi[i][j] / self.sum_gamma[i]
    }

    /// Emission probability of a whole observation from state `i`.
    ///
    /// Categories and tokens are treated as independent: the result is the
    /// product over categories of each token's estimated probability raised
    /// to its multiplicity. Unseen tokens have probability 0.
    pub fn b(&self, i: usize, obs: &Observation) -> f64 {
        let mut p = 1.0;
        for (dist, tokens) in self.sum_gamma_obs[i].iter().zip(obs) {
            for (token, &mult) in tokens {
                if mult == 0 {
                    continue;
                }
                p *= dist.prob(token).powf(f64::from(mult));
                if p == 0.0 {
                    return 0.0;
                }
            }
        }
        p
    }

    /// Folds one contribution into the running totals.
    ///
    /// Not synchronized: concurrent producers must funnel their statistics
    /// through a single caller.
    pub fn update(&mut self, stats: &Statistics) {
        for i in 0..self.n {
            self.s1[i] += stats.gamma1[i];
            self.s1_sum += stats.gamma1[i];
            self.sum_gamma[i] += stats.sum_gamma[i];
            for j in 0..self.n {
                self.sum_xi[i][j] += stats.sum_xi[i][j];
            }
            for c in 0..self.c {
                self.sum_gamma_obs[i][c].merge(&stats.sum_gamma_obs[i][c]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Tokens;

    fn obs(cats: &[&[(&str, u32)]]) -> Observation {
        cats.iter()
            .map(|pairs| pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<Tokens>())
            .collect()
    }

    #[test]
    fn test_new_model_is_zero() {
        let m = Model::new(3, 2);
        assert_eq!(m.n(), 3);
        assert_eq!(m.c(), 2);
        assert_eq!(m.s1_sum, 0.0);
        assert_eq!(m.pi(0), 0.0);
        assert_eq!(m.a(1, 2), 0.0);
        assert!(m.sum_gamma_obs.iter().flatten().all(Multinomial::is_empty));
    }

    #[test]
    fn test_update_and_derived_parameters() {
        let mut m = Model::new(2, 1);
        let mut stats = Statistics::zeros(2, 1);
        stats.gamma1 = vec![0.25, 0.75];
        stats.sum_gamma = vec![2.0, 1.0];
        stats.sum_xi = vec![vec![1.5, 0.5], vec![0.0, 1.0]];
        stats.sum_gamma_obs[0][0].inc("a", 3.0);
        stats.sum_gamma_obs[0][0].inc("b", 1.0);
        stats.sum_gamma_obs[1][0].inc("b", 2.0);

        m.update(&stats);
        m.update(&stats);

        assert_eq!(m.s1, vec![0.5, 1.5]);
        assert_eq!(m.s1_sum, 2.0);
        assert_eq!(m.pi(0), 0.25);
        assert_eq!(m.a(0, 0), 0.75);
        assert_eq!(m.a(1, 1), 1.0);

        let o = obs(&[&[("a", 2), ("b", 1)]]);
        assert!((m.b(0, &o) - 0.75 * 0.75 * 0.25).abs() < 1e-12);
        assert_eq!(m.b(1, &o), 0.0);
    }

    #[test]
    fn test_b_multiplies_across_categories() {
        let mut m = Model::new(1, 2);
        let mut stats = Statistics::zeros(1, 2);
        stats.sum_gamma_obs[0][0].inc("x", 1.0);
        stats.sum_gamma_obs[0][0].inc("y", 1.0);
        stats.sum_gamma_obs[0][1].inc("z", 4.0);
        m.update(&stats);

        let o = obs(&[&[("x", 1)], &[("z", 3)]]);
        assert!((m.b(0, &o) - 0.5).abs() < 1e-12);

        let silent = obs(&[&[], &[]]);
        assert_eq!(m.b(0, &silent), 1.0);
    }

    #[test]
    fn test_b_large_multiplicity_does_not_overflow_exponent() {
        let mut m = Model::new(1, 1);
        let mut stats = Statistics::zeros(1, 1);
        stats.sum_gamma_obs[0][0].inc("x", 1.0);
        stats.sum_gamma_obs[0][0].inc("y", 1.0);
        m.update(&stats);

        let huge = obs(&[&[("x", 1u32 << 31)]]);
        assert_eq!(m.b(0, &huge), 0.0);

        let max = obs(&[&[("x", u32::MAX)]]);
        assert_eq!(m.b(0, &max), 0.0);
    }
}
