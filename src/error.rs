//! Error taxonomy for the session core.
//!
//! An unwanted block arriving is deliberately not represented here: it is a
//! silent filter inside the loop, not an error, so it never becomes a
//! `SessionError` variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The session's cancellation scope fired before the call could
    /// complete. A clean termination, not a fault.
    #[error("session was cancelled")]
    Cancelled,

    /// The want-manager refused a request. The session keeps running; the
    /// next tick re-broadcasts the live want set as an implicit retry.
    #[error("want manager failed: {0}")]
    WantManager(#[source] anyhow::Error),

    /// A provider search ended prematurely. Treated as an empty result by
    /// the session loop; this variant exists for callers who want to know
    /// why a search came back empty.
    #[error("provider oracle failed: {0}")]
    ProviderOracle(#[source] anyhow::Error),
}
