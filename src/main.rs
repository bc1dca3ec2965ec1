use anyhow::{Context, Result};
use clap::Parser;
use hmm_trainer::config::{load_config, TrainConfig};
use hmm_trainer::corpus::{estimate_c, load_corpus};
use hmm_trainer::init::{init, RandomStates};
use hmm_trainer::parallel::{default_workers, ParallelTrainer};
use hmm_trainer::train::{train, Interrupt, InterruptHandle, TrainOptions};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Baum-Welch training of multi-category HMMs", long_about = None)]
struct Cli {
    /// JSON-lines corpus, one instance per line.
    #[clap(long, value_parser)]
    corpus: PathBuf,
    /// Optional JSON training configuration; flags below override it.
    #[clap(long, env = "HMM_TRAINER_CONFIG")]
    config: Option<PathBuf>,
    #[clap(long)]
    states: Option<usize>,
    #[clap(long)]
    iterations: Option<usize>,
    #[clap(long)]
    workers: Option<usize>,
    #[clap(long)]
    seed: Option<u64>,
    /// Where to append one log-likelihood per epoch; stdout when absent.
    #[clap(long)]
    loglik: Option<PathBuf>,
    #[clap(long, default_value = "model.json")]
    output: PathBuf,
}

/// Forwards to the inner sink and ticks the progress bar once per line.
struct ProgressWriter<W: Write> {
    inner: W,
    bar: ProgressBar,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        let lines = buf[..written].iter().filter(|&&b| b == b'\n').count();
        self.bar.inc(lines as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(unix)]
fn listen_for_interrupt() -> io::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::interrupt())
}

#[cfg(windows)]
fn listen_for_interrupt() -> io::Result<tokio::signal::windows::CtrlC> {
    tokio::signal::windows::ctrl_c()
}

/// Routes Ctrl-C to `handle`. Returns once the handler is registered, so an
/// interrupt arriving at any point after this call is delivered to training.
fn install_ctrl_c(handle: InterruptHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<io::Result<()>>(1);
    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async move {
                let mut listener = match listen_for_interrupt() {
                    Ok(listener) => {
                        let _ = ready_tx.send(Ok(()));
                        listener
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while listener.recv().await.is_some() {
                    warn!("Interrupt received; stopping after the current epoch");
                    handle.request();
                }
            })
        })
        .context("Failed to spawn signal thread")?;
    ready_rx
        .recv()
        .context("Signal thread exited before registering")?
        .context("Failed to register Ctrl-C handler")?;
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<TrainConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => TrainConfig::default(),
    };
    if let Some(states) = cli.states {
        config.states = states;
    }
    if let Some(iterations) = cli.iterations {
        config.max_epochs = iterations;
    }
    if cli.workers.is_some() {
        config.workers = cli.workers;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let config = resolve_config(&cli)?;
    info!("Training configuration: {:?}", config);
    anyhow::ensure!(config.states > 0, "number of states must be positive");

    let corpus = load_corpus(&cli.corpus)
        .with_context(|| format!("Failed to load corpus: {:?}", cli.corpus))?;
    let c = estimate_c(&corpus).context("Malformed corpus")?;
    info!("Corpus: {} instances, {} categories", corpus.len(), c);

    let mut rng = match config.seed {
        Some(seed) => RandomStates(StdRng::seed_from_u64(seed)),
        None => RandomStates(StdRng::from_entropy()),
    };
    let model = init(config.states, c, &corpus, &mut rng);

    let mut trainer = ParallelTrainer::with_workers(config.workers.unwrap_or_else(default_workers))?;
    if let Some(capacity) = config.channel_capacity {
        trainer = trainer.with_channel_capacity(capacity);
    }

    let (handle, interrupt) = Interrupt::channel();
    install_ctrl_c(handle)?;

    let bar = ProgressBar::new(config.max_epochs as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs")?
            .progress_chars("#>-"),
    );
    let sink: Box<dyn Write> = match &cli.loglik {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(io::stdout()),
    };
    let mut sink = ProgressWriter { inner: sink, bar: bar.clone() };

    let opts = TrainOptions {
        n: config.states,
        c,
        max_epochs: config.max_epochs,
    };
    let model = train(&trainer, &corpus, opts, model, &interrupt, &mut sink)?;
    sink.flush()?;
    bar.finish_with_message("Training completed");

    let out = File::create(&cli.output)
        .with_context(|| format!("Failed to create output file: {:?}", cli.output))?;
    serde_json::to_writer_pretty(BufWriter::new(out), &model)
        .with_context(|| format!("Failed to write model to {:?}", cli.output))?;

    info!(
        "Saved model to {:?}. Total time: {:.2?}",
        cli.output,
        start.elapsed()
    );
    Ok(())
}
