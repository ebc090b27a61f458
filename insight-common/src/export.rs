//! Timestamped JSON export files.
//!
//! Exports are pretty-printed and named `<prefix>_<YYYY-MM-DD>.json`; a second
//! export on the same day overwrites the first.
use crate::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const BATCH_EXPORT_PREFIX: &str = "twitter_data";
pub const LOG_EXPORT_PREFIX: &str = "logs";

pub fn export_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}_{}.json", at.format("%Y-%m-%d"))
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write `value` into `dir` and return the full path of the new file.
pub fn write_json_export<T: Serialize + ?Sized>(
    dir: &Path,
    prefix: &str,
    value: &T,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(prefix, Utc::now()));
    fs::write(&path, to_pretty_json(value)?)?;
    tracing::debug!(path = %path.display(), "export.written");
    Ok(path)
}

pub fn read_json_export<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
