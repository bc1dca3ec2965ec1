//! Forward-backward inference over a single instance.
//!
//! Probabilities are kept in linear space. When a normalizer comes out as
//! exactly zero the affected vector is left as computed rather than divided.

use crate::instance::Instance;
use crate::model::{Model, Statistics};

/// Left-to-right forward recurrence. Yields `alpha_t` for t = 0, 1, ..
/// holding only the previous vector.
pub struct ForwardPass<'a> {
    inst: &'a Instance,
    model: &'a Model,
    t: usize,
    alpha: Vec<f64>,
}

impl<'a> ForwardPass<'a> {
    pub fn new(inst: &'a Instance, model: &'a Model) -> Self {
        Self {
            inst,
            model,
            t: 0,
            alpha: Vec::new(),
        }
    }
}

impl<'a> Iterator for ForwardPass<'a> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.t >= self.inst.t() {
            return None;
        }
        let m = self.model;
        let o = self.inst.o(self.t);
        self.alpha = if self.t == 0 {
            (0..m.n()).map(|i| m.pi(i) * m.b(i, o)).collect()
        } else {
            (0..m.n())
                .map(|j| {
                    let sum: f64 = (0..m.n()).map(|i| self.alpha[i] * m.a(i, j)).sum();
                    sum * m.b(j, o)
                })
                .collect()
        };
        self.t += 1;
        Some(self.alpha.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.inst.t() - self.t;
        (left, Some(left))
    }
}

/// Full backward table, `beta[t][i]`. Empty for a zero-length instance.
pub fn backward(inst: &Instance, m: &Model) -> Vec<Vec<f64>> {
    let len = inst.t();
    let n = m.n();
    let mut beta = vec![vec![0.0; n]; len];
    if len == 0 {
        return beta;
    }

    beta[len - 1] = vec![1.0; n];
    for t in (0..len - 1).rev() {
        let o = inst.o(t + 1);
        let emit: Vec<f64> = (0..n).map(|j| m.b(j, o)).collect();
        for i in 0..n {
            beta[t][i] = (0..n).map(|j| m.a(i, j) * emit[j] * beta[t + 1][j]).sum();
        }
    }
    beta
}

/// Posterior statistics of one instance under `m`, given its backward table.
pub fn inference(inst: &Instance, m: &Model, beta: &[Vec<f64>]) -> Statistics {
    let n = m.n();
    let len = inst.t();
    let mut stats = Statistics::zeros(n, m.c());
    let mut gamma = vec![0.0; n];
    let mut xi = vec![vec![0.0; n]; n];

    for (t, alpha) in ForwardPass::new(inst, m).enumerate() {
        let mut norm = 0.0;
        for i in 0..n {
            gamma[i] = alpha[i] * beta[t][i];
            norm += gamma[i];
        }
        if norm != 0.0 {
            for g in gamma.iter_mut() {
                *g /= norm;
            }
        }

        let o = inst.o(t);
        for i in 0..n {
            if t == 0 {
                stats.gamma1[i] = gamma[i];
            }
            if t + 1 < len {
                stats.sum_gamma[i] += gamma[i];
            }
            for (dist, tokens) in stats.sum_gamma_obs[i].iter_mut().zip(o) {
                for (token, &mult) in tokens {
                    dist.inc(token, gamma[i] * f64::from(mult));
                }
            }
        }

        if t + 1 < len {
            let next = inst.o(t + 1);
            let emit: Vec<f64> = (0..n).map(|j| m.b(j, next)).collect();
            let mut xi_sum = 0.0;
            for i in 0..n {
                for j in 0..n {
                    let x = alpha[i] * m.a(i, j) * emit[j] * beta[t + 1][j];
                    xi[i][j] = x;
                    xi_sum += x;
                }
            }
            let scale = if xi_sum != 0.0 { xi_sum } else { 1.0 };
            for i in 0..n {
                for j in 0..n {
                    stats.sum_xi[i][j] += xi[i][j] / scale;
                }
            }
        }
    }

    stats
}

/// Probability of the whole instance under `m`: the mass of the last
/// forward vector. `None` for a zero-length instance, where it is undefined.
pub fn likelihood(inst: &Instance, m: &Model) -> Option<f64> {
    ForwardPass::new(inst, m).last().map(|alpha| alpha.iter().sum())
}
