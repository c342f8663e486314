//! Source adapter contracts + one adapter per external provider.
//!
//! Adapters issue paged requests and deserialize each provider's own JSON or
//! HTML shape into typed raw records. The result is always the explicit
//! three-state [`FetchOutcome`], so orchestrators can tell "exhausted" from
//! "errored" — but neither state propagates as an `Err`, and no adapter
//! retries on its own.

use thiserror::Error;
use ybh_storage::FetchError;

pub mod finlife;
pub mod lh;
pub mod sh;
pub mod youth;

pub const CRATE_NAME: &str = "ybh-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

/// One paged call against a source: a page of raw records, an exhausted
/// source, or a failed call (timeout, 5xx, malformed body).
#[derive(Debug)]
pub enum FetchOutcome<P> {
    Page(P),
    Empty,
    Failed(AdapterError),
}

impl<P> FetchOutcome<P> {
    pub fn map<U>(self, f: impl FnOnce(P) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Page(page) => FetchOutcome::Page(f(page)),
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::Failed(err) => FetchOutcome::Failed(err),
        }
    }
}

/// Percent-encode a query component (RFC 3986 unreserved set kept as-is);
/// the public-data portals require encoded Korean filter values.
pub fn encode_query_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
