use crate::errors::TrainError;
use crate::instance::Instance;
use crate::model::Model;
use crate::parallel::ParallelTrainer;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::{info, warn};
use std::io::Write;
use std::time::Instant;

/// Receiving end of a stop request, checked between epochs only.
#[derive(Debug, Clone)]
pub struct Interrupt {
    receiver: Receiver<()>,
}

/// Sending end of an [`Interrupt`]; usually owned by a signal handler.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    sender: Sender<()>,
}

impl Interrupt {
    pub fn channel() -> (InterruptHandle, Interrupt) {
        let (sender, receiver) = bounded(1);
        (InterruptHandle { sender }, Interrupt { receiver })
    }

    /// An interrupt nobody can trigger.
    pub fn never() -> Interrupt {
        Interrupt::channel().1
    }

    /// Non-blocking check. Consumes the pending request if there is one.
    pub fn requested(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }
}

impl InterruptHandle {
    /// Asks the training loop to stop at the next epoch boundary. Repeated
    /// requests before it is seen collapse into one.
    pub fn request(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Training run parameters.
#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub n: usize,
    pub c: usize,
    pub max_epochs: usize,
}

/// Runs up to `opts.max_epochs` EM rounds starting from `model`, writing the
/// corpus log-likelihood after each round to `sink`, one line per epoch.
///
/// A requested interrupt is honoured before the next round starts; the round
/// in flight always completes.
pub fn train<W: Write + ?Sized>(
    trainer: &ParallelTrainer,
    corpus: &[Instance],
    opts: TrainOptions,
    mut model: Model,
    interrupt: &Interrupt,
    sink: &mut W,
) -> Result<Model, TrainError> {
    if opts.n == 0 {
        return Err(TrainError::InvalidDimensions(
            "number of states must be positive".into(),
        ));
    }
    if model.n() != opts.n || model.c() != opts.c {
        return Err(TrainError::InvalidDimensions(format!(
            "model is {}x{}, training expects {}x{}",
            model.n(),
            model.c(),
            opts.n,
            opts.c
        )));
    }

    let start = Instant::now();
    for epoch in 0..opts.max_epochs {
        if interrupt.requested() {
            warn!("Terminate due to interrupt after {} epochs", epoch);
            return Ok(model);
        }
        model = trainer.epoch(corpus, opts.n, opts.c, &model)?;
        let logl = trainer.log_l(corpus, &model)?;
        writeln!(sink, "{:.6}", logl)?;
        info!(
            "Epoch {}/{}: log-likelihood {:.6} ({:.2?} elapsed)",
            epoch + 1,
            opts.max_epochs,
            logl,
            start.elapsed()
        );
    }
    Ok(model)
}
