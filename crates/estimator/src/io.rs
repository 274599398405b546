//! Saving and restoring estimator state
//!
//! Anything serialisable works, but this is intended for the estimators so
//! that a run can be checkpointed and continued. JSON is human-readable,
//! binary is compact and exact.

// standard library
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// crate modules
use crate::error::Result;

// external crates
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Write to a pretty JSON file
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing JSON to {}", path.display());
    let f = BufWriter::new(File::create(path)?);
    Ok(serde_json::to_writer_pretty(f, value)?)
}

/// Read back from a JSON file
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let f = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(f)?)
}

/// Write to a bincode file
pub fn save_binary<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing binary to {}", path.display());
    let f = BufWriter::new(File::create(path)?);
    Ok(bincode::serialize_into(f, value)?)
}

/// Read back from a bincode file
pub fn load_binary<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let f = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(f)?)
}
