use crate::errors::TrainError;
use crate::inference::{backward, inference, likelihood};
use crate::instance::Instance;
use crate::model::Model;
use crossbeam_channel::bounded;
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;

/// Default worker count: every core but one, which is left to the aggregator.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Runs EM rounds over a corpus on a fixed pool of workers.
///
/// Each round is a map-reduce: workers take instances round-robin by index
/// and send their results over one bounded channel to a single aggregator,
/// which is the only code touching the round's result.
pub struct ParallelTrainer {
    pool: ThreadPool,
    workers: usize,
    channel_capacity: usize,
}

impl ParallelTrainer {
    pub fn new() -> Result<Self, TrainError> {
        Self::with_workers(default_workers())
    }

    pub fn with_workers(workers: usize) -> Result<Self, TrainError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("em-worker-{}", i))
            .build()?;
        info!("Initializing ParallelTrainer with {} workers", workers);
        Ok(Self {
            pool,
            workers,
            channel_capacity: workers,
        })
    }

    /// Bound on results waiting for the aggregator.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maps every instance on the worker pool and folds the results on one
    /// aggregator thread. Returns only after the aggregator has folded every
    /// result and handed its accumulator back.
    fn map_reduce<T, R, M, F>(
        &self,
        corpus: &[Instance],
        map: M,
        init: R,
        mut fold: F,
    ) -> Result<R, TrainError>
    where
        T: Send,
        R: Send,
        M: Fn(&Instance) -> T + Sync,
        F: FnMut(&mut R, T) + Send,
    {
        let workers = self.workers;
        let (tx, rx) = bounded::<T>(self.channel_capacity);
        let (done_tx, done_rx) = bounded::<R>(1);

        std::thread::scope(|s| {
            let aggregator = s.spawn(move || {
                let mut acc = init;
                for item in rx.iter() {
                    fold(&mut acc, item);
                }
                // The receiver is gone only if the caller already gave up.
                let _ = done_tx.send(acc);
            });

            let map = &map;
            self.pool.scope(|ps| {
                for worker in 0..workers {
                    let tx = tx.clone();
                    ps.spawn(move |_| {
                        for (i, inst) in corpus.iter().enumerate() {
                            if i % workers != worker {
                                continue;
                            }
                            if tx.send(map(inst)).is_err() {
                                break;
                            }
                        }
                    });
                }
            });
            drop(tx);

            // Joining here keeps an aggregator panic from re-raising out of the scope.
            aggregator.join().map_err(|_| TrainError::AggregatorLost)?;
            done_rx.recv().map_err(|_| TrainError::AggregatorLost)
        })
    }

    /// One EM round: re-estimates a fresh model from posteriors computed
    /// against `baseline`.
    pub fn epoch(
        &self,
        corpus: &[Instance],
        n: usize,
        c: usize,
        baseline: &Model,
    ) -> Result<Model, TrainError> {
        let start = Instant::now();
        let estimate = self.map_reduce(
            corpus,
            |inst| {
                let beta = backward(inst, baseline);
                inference(inst, baseline, &beta)
            },
            Model::new(n, c),
            |model, stats| model.update(&stats),
        )?;
        debug!(
            "Epoch over {} instances finished in {:.2?}",
            corpus.len(),
            start.elapsed()
        );
        Ok(estimate)
    }

    /// Total log-likelihood of the corpus. NaN if any instance has no time
    /// steps, since its likelihood is undefined.
    pub fn log_l(&self, corpus: &[Instance], model: &Model) -> Result<f64, TrainError> {
        let (logl, undefined) = self.map_reduce(
            corpus,
            |inst| likelihood(inst, model),
            (0.0_f64, 0_usize),
            |(logl, undefined), l| match l {
                Some(l) => *logl += l.ln(),
                None => {
                    *logl = f64::NAN;
                    *undefined += 1;
                }
            },
        )?;
        if undefined > 0 {
            warn!(
                "{} zero-length instance(s) have undefined likelihood; log-likelihood is NaN",
                undefined
            );
        }
        Ok(logl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_positive() {
        assert!(default_workers() >= 1);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let trainer = ParallelTrainer::with_workers(0).unwrap();
        assert_eq!(trainer.workers(), 1);
    }

    #[test]
    fn test_map_reduce_sees_every_instance_once() {
        let corpus: Vec<Instance> = (0..37)
            .map(|k| Instance::new(vec![vec![Default::default()]], &[k]))
            .collect();
        let trainer = ParallelTrainer::with_workers(4)
            .unwrap()
            .with_channel_capacity(1);

        let lengths = trainer
            .map_reduce(&corpus, |inst| inst.t(), Vec::new(), |acc, t| acc.push(t))
            .unwrap();

        let mut sorted = lengths.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_failed_aggregator_is_reported() {
        let corpus: Vec<Instance> = (1..9)
            .map(|k| Instance::new(vec![vec![Default::default()]], &[k]))
            .collect();
        let trainer = ParallelTrainer::with_workers(3).unwrap();

        let result = trainer.map_reduce(
            &corpus,
            |inst| inst.t(),
            0usize,
            |_, _| panic!("aggregator failed"),
        );

        assert!(matches!(result, Err(TrainError::AggregatorLost)));
    }

    #[test]
    fn test_log_l_empty_corpus_is_zero() {
        let trainer = ParallelTrainer::with_workers(2).unwrap();
        let model = Model::new(2, 1);
        assert_eq!(trainer.log_l(&[], &model).unwrap(), 0.0);
    }

    #[test]
    fn test_log_l_zero_length_instance_is_nan() {
        let trainer = ParallelTrainer::with_workers(2).unwrap();
        let model = Model::new(2, 1);
        let corpus = vec![Instance::from_sequence(Vec::new())];
        assert!(trainer.log_l(&corpus, &model).unwrap().is_nan());
    }
}
