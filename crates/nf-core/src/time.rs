//! Wall-clock timestamps for residue records.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as fractional Unix seconds.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
