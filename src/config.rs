use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Training configuration, usually read from a JSON file and then
/// overridden by command-line flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Number of hidden states N.
    #[serde(default = "default_states")]
    pub states: usize,
    /// Upper bound on EM rounds.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    /// Worker threads; defaults to available parallelism minus one.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Seed for the bootstrap assignment; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Results allowed to queue for the aggregator; defaults to the worker count.
    #[serde(default)]
    pub channel_capacity: Option<usize>,
}

fn default_states() -> usize {
    2
}

fn default_max_epochs() -> usize {
    20
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            states: default_states(),
            max_epochs: default_max_epochs(),
            workers: None,
            seed: None,
            channel_capacity: None,
        }
    }
}

pub fn load_config(path: &Path) -> Result<TrainConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
