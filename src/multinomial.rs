use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weighted token histogram, the sufficient statistic of one per-state,
/// per-category emission distribution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Multinomial {
    pub hist: HashMap<String, f64>,
    pub sum: f64,
}

impl Multinomial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to the count of `token` and to the total.
    pub fn inc(&mut self, token: &str, weight: f64) {
        match self.hist.get_mut(token) {
            Some(w) => *w += weight,
            None => {
                self.hist.insert(token.to_string(), weight);
            }
        }
        self.sum += weight;
    }

    /// Estimated probability of `token`. Unseen tokens and empty histograms
    /// get 0; there is no smoothing.
    pub fn prob(&self, token: &str) -> f64 {
        if self.sum == 0.0 {
            return 0.0;
        }
        self.hist.get(token).map_or(0.0, |w| w / self.sum)
    }

    /// Folds every count of `other` into this histogram.
    pub fn merge(&mut self, other: &Multinomial) {
        for (token, weight) in &other.hist {
            self.inc(token, *weight);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }
}

/// `n` rows of `c` empty multinomials.
pub fn multinomial_matrix(n: usize, c: usize) -> Vec<Vec<Multinomial>> {
    vec![vec![Multinomial::new(); c]; n]
}
