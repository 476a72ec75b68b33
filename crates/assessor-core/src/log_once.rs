//! Log a known, non-fatal condition only the first time it happens.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Mutex;

use once_cell::sync::Lazy;

static SEEN: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Returns true the first time `key` is seen in this process.
pub fn first_time(key: &str) -> bool {
    let mut seen = SEEN.lock().unwrap_or_else(|e| e.into_inner());
    seen.insert(key.to_string())
}

pub fn warn_once(key: &str, message: impl Display) {
    if first_time(key) {
        tracing::warn!(condition = key, "{}", message);
    }
}

pub fn info_once(key: &str, message: impl Display) {
    if first_time(key) {
        tracing::info!(condition = key, "{}", message);
    }
}
