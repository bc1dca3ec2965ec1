//! Corpus loading and validation.
//!
//! The on-disk format is JSON lines, one instance per line:
//!
//! ```json
//! {"observations": [[{"founder": 1}, {"helping": 1}], [{"vice": 1}, {"applied": 2}]], "periods": [1, 4]}
//! ```
//!
//! `periods` may be omitted, in which case every observation lasts one step.

use crate::errors::CorpusError;
use crate::instance::{Instance, Observation};
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Deserialize, Debug)]
struct InstanceRecord {
    observations: Vec<Observation>,
    #[serde(default)]
    periods: Option<Vec<usize>>,
}

/// Reads a JSON-lines corpus. Blank lines are skipped.
pub fn load_corpus(path: &Path) -> Result<Vec<Instance>, CorpusError> {
    let file = File::open(path).map_err(|e| CorpusError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let mut corpus = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CorpusError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: InstanceRecord =
            serde_json::from_str(&line).map_err(|e| CorpusError::JsonParseError {
                path: path.to_path_buf(),
                line: line_no + 1,
                source: e,
            })?;
        let inst = match record.periods {
            Some(periods) => Instance::try_new(record.observations, &periods)?,
            None => Instance::from_sequence(record.observations),
        };
        corpus.push(inst);
    }

    debug!(
        "Loaded {} instances with {} time steps in total",
        corpus.len(),
        corpus.iter().map(Instance::t).sum::<usize>()
    );
    info!("Loaded corpus of {} instances from {:?}", corpus.len(), path);
    Ok(corpus)
}

/// Number of categories per observation, checked across the whole corpus.
///
/// Returns 0 when the corpus holds no observation at all.
pub fn estimate_c(corpus: &[Instance]) -> Result<usize, CorpusError> {
    let mut c = None;
    for inst in corpus {
        for o in &inst.obs {
            match c {
                None => c = Some(o.len()),
                Some(expected) if expected != o.len() => {
                    return Err(CorpusError::InconsistentCategories {
                        expected,
                        found: o.len(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(c.unwrap_or(0))
}
