//! Failure taxonomy for the pipeline seams.
//!
//! Only upstream-fetch and storage-write failures ever reach the API
//! boundary; parse and explanation failures are recovered locally with
//! safe defaults.

use thiserror::Error;

/// Upstream fetch failure. One attempt per call site, no retry loop;
/// callers surface this as a user-visible "failed to load" condition.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote API answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    /// The request never completed (DNS, connect, timeout).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not have the expected shape.
    #[error("upstream response malformed: {0}")]
    Malformed(String),
}

/// Failure of a full refresh run.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] SourceError),
    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}
