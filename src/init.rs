use crate::instance::Instance;
use crate::model::Model;
use log::info;
use rand::Rng;

/// Source of uniformly distributed states in `[0, n)`.
pub trait StateSampler {
    fn intn(&mut self, n: usize) -> usize;
}

/// Adapts any `rand` generator.
pub struct RandomStates<R>(pub R);

impl<R: Rng> StateSampler for RandomStates<R> {
    fn intn(&mut self, n: usize) -> usize {
        self.0.gen_range(0, n)
    }
}

/// Bootstrap model from one random hard state assignment per time step.
///
/// Each drawn state is counted exactly as inference would count a posterior
/// that puts all its mass on that state.
pub fn init<S: StateSampler + ?Sized>(
    n: usize,
    c: usize,
    corpus: &[Instance],
    rng: &mut S,
) -> Model {
    let mut m = Model::new(n, c);

    for inst in corpus {
        let len = inst.t();
        let mut prev_state = 0;
        for t in 0..len {
            let state = rng.intn(n);
            if t == 0 {
                m.s1[state] += 1.0;
                m.s1_sum += 1.0;
            } else {
                m.sum_xi[prev_state][state] += 1.0;
            }
            if t + 1 < len {
                m.sum_gamma[state] += 1.0;
            }
            for (dist, tokens) in m.sum_gamma_obs[state].iter_mut().zip(inst.o(t)) {
                for (token, &mult) in tokens {
                    dist.inc(token, f64::from(mult));
                }
            }
            prev_state = state;
        }
    }

    info!(
        "Initialized {}-state model from {} instances",
        n,
        corpus.len()
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::{career_corpus, AlternatingStates};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_init_alternating_states() {
        let corpus = career_corpus();
        let mut rng = AlternatingStates::default();
        let m = init(2, 2, &corpus, &mut rng);

        assert_eq!(m.s1, vec![1.0, 0.0]);
        assert_eq!(m.s1_sum, 1.0);
        assert_eq!(m.sum_gamma, vec![5.0, 4.0]);
        assert_eq!(m.sum_xi, vec![vec![0.0, 5.0], vec![4.0, 0.0]]);

        let title0 = &m.sum_gamma_obs[0][0];
        assert_eq!(title0.hist["founder"], 1.0);
        assert_eq!(title0.hist["president"], 4.0);
        assert_eq!(title0.hist["vice"], 4.0);
        assert_eq!(title0.sum, 9.0);

        let skill0 = &m.sum_gamma_obs[0][1];
        assert_eq!(skill0.hist["applied"], 4.0);
        assert_eq!(skill0.hist["helping"], 1.0);
        assert_eq!(skill0.hist["predictive"], 4.0);
        assert_eq!(skill0.sum, 9.0);

        let title1 = &m.sum_gamma_obs[1][0];
        assert_eq!(title1.hist["manager"], 1.0);
        assert_eq!(title1.hist["president"], 4.0);
        assert_eq!(title1.hist["senior"], 1.0);
        assert_eq!(title1.hist["vice"], 4.0);
        assert_eq!(title1.sum, 10.0);

        let skill1 = &m.sum_gamma_obs[1][1];
        assert_eq!(skill1.hist["applied"], 4.0);
        assert_eq!(skill1.hist["linkedin"], 1.0);
        assert_eq!(skill1.hist["predictive"], 4.0);
        assert_eq!(skill1.sum, 9.0);
    }

    #[test]
    fn test_init_is_deterministic_for_a_seed() {
        let corpus = career_corpus();
        let a = init(3, 2, &corpus, &mut RandomStates(StdRng::seed_from_u64(7)));
        let b = init(3, 2, &corpus, &mut RandomStates(StdRng::seed_from_u64(7)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_init_skips_zero_length_instances() {
        let corpus = vec![Instance::from_sequence(Vec::new())];
        let mut rng = AlternatingStates::default();
        let m = init(2, 2, &corpus, &mut rng);

        assert_eq!(m, Model::new(2, 2));
        assert!(rng.history.is_empty());
    }

    #[test]
    fn test_random_states_in_range() {
        let mut rng = RandomStates(StdRng::seed_from_u64(1));
        for _ in 0..100 {
            assert!(rng.intn(4) < 4);
        }
    }
}
