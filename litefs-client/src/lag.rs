//! Replication lag reported by the LiteFS node
//!
//! LiteFS writes the lag in milliseconds to a `.lag` file in the mount
//! directory. The lag is 0 on the primary; without new transactions the
//! primary sends heartbeats once per second, so a replica's lag stays fresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LagError;

/// Value written before the first replication from the primary completes
pub const NOT_REPLICATED: i32 = i32::MAX;

/// Path of the lag file next to `database_path`
pub fn lag_path(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(".lag")
}

/// How far this node is lagging behind the primary
pub fn lag(database_path: impl AsRef<Path>) -> Result<Duration, LagError> {
    let content = std::fs::read_to_string(lag_path(database_path.as_ref()))?;
    parse_lag(&content)
}

fn parse_lag(content: &str) -> Result<Duration, LagError> {
    let millis: i32 = content.trim().parse()?;

    if millis == NOT_REPLICATED {
        return Err(LagError::NotReplicated);
    }
    if millis < 0 {
        return Err(LagError::Negative(millis));
    }

    Ok(Duration::from_millis(millis as u64))
}
