//! Recommendation engine: pure functions that rank store contents for a
//! user profile. Every ranked entry carries a numeric score (lower = higher
//! rank) and a human-readable reason string; results are capped at 10.
//!
//! All entry points take `today` (and where relevant `now`) as parameters so
//! ordering is deterministic under test.

use serde::Serialize;

pub mod finance;
pub mod housing;
pub mod policy;
pub mod recent;

pub const CRATE_NAME: &str = "ybh-recommend";

/// Output contract consumed by the query layer.
pub const MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    pub score: f64,
    pub reason: String,
}

pub(crate) fn join_reasons(parts: Vec<&str>) -> String {
    parts.join(", ")
}
