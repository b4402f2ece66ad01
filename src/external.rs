//! Contracts for the collaborators the session treats as external: the
//! want-manager that owns wire transmission and cross-session wantlist
//! dedup, and the provider oracle that turns an identifier into a stream of
//! peers. Neither is implemented by this crate — only the boundary is
//! defined here as an `async_trait`, the same pattern used for storage
//! traits elsewhere in this codebase, without this crate caring how a
//! concrete collaborator is built.

use async_trait::async_trait;
use cid::Cid;
use futures::stream::BoxStream;
use libp2p::PeerId;

use crate::scope::Scope;

/// Owns wire-level want transmission and cross-session wantlist
/// deduplication. Shared across every session in the process; must be safe
/// for concurrent use.
#[async_trait]
pub trait WantManager: Send + Sync {
    /// Promise to transmit wants for each identifier to `peers_hint` (an
    /// empty hint means "all connected peers"). Non-blocking from the
    /// caller's perspective; delivery is best-effort.
    async fn want_blocks(
        &self,
        scope: &Scope,
        cids: &[Cid],
        peers_hint: &[PeerId],
        session_id: u64,
    ) -> anyhow::Result<()>;

    /// Promise to suppress further delivery of wants for these identifiers
    /// on behalf of `session_id`.
    async fn cancel_wants(&self, cids: &[Cid], session_id: u64);
}

/// External "find providers" oracle. Must be safe to cancel via `scope`.
pub trait ProviderOracle: Send + Sync {
    /// Yields at most `max` peers believed to host `cid`; terminates when
    /// exhausted or `max` is reached.
    fn find_providers<'a>(&'a self, scope: &'a Scope, cid: Cid, max: usize) -> BoxStream<'a, PeerId>;
}
