use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error reading corpus file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON parsing error in {path} at line {line}: {source}")]
    JsonParseError {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Inconsistent category count: expected {expected}, found {found}")]
    InconsistentCategories { expected: usize, found: usize },
    #[error("Instance has {observations} observations but {periods} periods")]
    PeriodMismatch { observations: usize, periods: usize },
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Invalid model dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Aggregator exited before handing back its result")]
    AggregatorLost,
    #[error("Failed to write log-likelihood progress: {0}")]
    Sink(#[from] io::Error),
    #[error("Corpus validation failed: {0}")]
    Corpus(#[from] CorpusError),
}
