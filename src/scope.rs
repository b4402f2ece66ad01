//! Cancellation scopes bound a session's lifetime.
//!
//! A [`Scope`] stands in for the `context.Context` the original session was
//! bound to: the host creates one per session, hands the [`Scope`] to
//! [`crate::session::new_session`], and fires cancellation through the
//! paired [`ScopeHandle`] to tear the session down. Every select loop in
//! this crate races its real work against [`Scope::cancelled`] so no send or
//! await can outlive the scope.

use tokio_context::context::{Handle, RefContext};

/// A cloneable cancellation scope.
///
/// Cloning a `Scope` does not create independent cancellation domains: all
/// clones observe the same cancellation, matching the fan-out needed by
/// `SessionHandle` (many callers share one session's scope) and the
/// provider-search subtask, which is parented to the session's scope so it
/// never outlives the session that spawned it.
#[derive(Clone)]
pub struct Scope(RefContext);

impl Scope {
    /// Create a fresh, independent scope and the handle that cancels it.
    pub fn new() -> (Scope, ScopeHandle) {
        let (ctx, handle) = RefContext::new();
        (Scope(ctx), ScopeHandle(handle))
    }

    /// Wrap an existing `tokio_context` scope, e.g. one threaded in by a
    /// caller that already owns a `RefContext`.
    pub fn from_context(ctx: RefContext) -> Scope {
        Scope(ctx)
    }

    /// Resolves once the scope has been cancelled. Intended for use inside
    /// `tokio::select!` alongside the event this task is otherwise waiting
    /// on, never awaited bare.
    pub async fn cancelled(&self) {
        self.0.done().await
    }
}

/// Owns cancellation for a [`Scope`]. Dropping the handle does not cancel
/// the scope; [`ScopeHandle::cancel`] must be called explicitly, matching
/// `context.CancelFunc` semantics.
pub struct ScopeHandle(Handle);

impl ScopeHandle {
    pub fn cancel(self) {
        self.0.cancel();
    }
}
