//! The session loop and its external handle.
//!
//! One task owns every piece of mutable state and reacts to exactly one
//! event per loop iteration (E1–E7 below). Every other caller talks to
//! that task through channels multiplexed by [`SessionHandle`]; no lock
//! ever guards the live-want state. The one exception is [`InterestCache`],
//! shared behind a `parking_lot::Mutex` so the handle can answer cheaply
//! for identifiers it already knows about without a round trip through the
//! loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use cid::Cid;
use futures::StreamExt;
use libp2p::PeerId;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

use crate::block::Block;
use crate::cid_queue::CidQueue;
use crate::config::SessionConfig;
use crate::external::{ProviderOracle, WantManager};
use crate::get_blocks::GetBlocks;
use crate::interest_cache::InterestCache;
use crate::notifier::Notifier;
use crate::peer_set::PeerSet;
use crate::registry::SessionRegistry;
use crate::scope::Scope;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

struct InterestReq {
    cid: Cid,
    resp: oneshot::Sender<bool>,
}

/// Owns all mutable session state; runs as a single spawned task for the
/// lifetime of the session's [`Scope`].
struct SessionLoop {
    id: u64,
    scope: Scope,
    registry: SessionRegistry,

    cid_queue: CidQueue,
    live_wants: AHashMap<Cid, Instant>,
    peer_set: PeerSet,
    interest_cache: Arc<Mutex<InterestCache>>,

    lat_total: Duration,
    fetch_count: u32,

    notifier: Notifier,
    config: SessionConfig,

    want_manager: Arc<dyn WantManager>,
    provider_oracle: Arc<dyn ProviderOracle>,

    incoming_rx: mpsc::Receiver<(PeerId, Block)>,
    new_reqs_rx: mpsc::Receiver<Vec<Cid>>,
    cancel_rx: mpsc::Receiver<SmallVec<[Cid; 4]>>,
    interest_rx: mpsc::Receiver<InterestReq>,
}

impl SessionLoop {
    fn is_wanted(&self, c: &Cid) -> bool {
        self.live_wants.contains_key(c) || self.cid_queue.contains(c)
    }

    /// Before any latency evidence, fall back to the conservative
    /// provider-search cadence; afterwards wait a multiple of measured
    /// latency so healthy transfers do not trigger redundant searches.
    fn next_tick_delay(&self) -> Duration {
        if self.fetch_count == 0 {
            self.config.prov_search_delay
        } else {
            self.config.base_tick_delay + 3 * (self.lat_total / self.fetch_count)
        }
    }

    /// Records a want in flight and hands it to the want-manager. The
    /// want-manager is the system of record for actual transmission; this
    /// only tracks that a want now exists.
    async fn promote(&mut self, c: Cid) {
        self.live_wants.insert(c, Instant::now());
        let peers = self.peer_set.snapshot();
        if let Err(e) = self
            .want_manager
            .want_blocks(&self.scope, &[c], &peers, self.id)
            .await
        {
            tracing::warn!(id = self.id, cid = %c, error = %e, "want manager failed to promote cid");
        }
    }

    fn spawn_provider_search(&self, cid: Cid, new_peers_tx: mpsc::Sender<PeerId>) {
        let provider_oracle = self.provider_oracle.clone();
        let scope = self.scope.clone();
        let max = self.config.provider_search_max;
        let id = self.id;
        tokio::spawn(async move {
            let mut peers = provider_oracle.find_providers(&scope, cid, max);
            loop {
                tokio::select! {
                    _ = scope.cancelled() => break,
                    next = peers.next() => match next {
                        Some(peer) => {
                            if new_peers_tx.send(peer).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            tracing::trace!(id, cid = %cid, "provider search finished");
        });
    }

    /// E1 — block arrival.
    async fn handle_block_arrival(&mut self, peer: PeerId, block: Block) {
        if self.peer_set.insert(peer) {
            tracing::trace!(id = self.id, %peer, "peer added to active set");
        }

        let cid = *block.cid();
        if !self.is_wanted(&cid) {
            // another session may want this block, but this one never
            // asked for it.
            return;
        }

        if let Some(requested_at) = self.live_wants.remove(&cid) {
            self.lat_total += requested_at.elapsed();
        } else {
            self.cid_queue.remove(&cid);
        }
        self.fetch_count += 1;
        self.notifier.publish(block);

        if !self.cid_queue.is_empty() {
            if let Some(next) = self.cid_queue.pop() {
                self.promote(next).await;
            }
        }
    }

    /// E2 — new fetch request.
    async fn handle_new_requests(&mut self, ids: Vec<Cid>) {
        {
            let mut cache = self.interest_cache.lock();
            for id in &ids {
                cache.insert(*id);
            }
        }

        // a caller-supplied batch may repeat an identifier; `fetch({c,c,c})`
        // must leave the same `LiveWantTable`/`CidQueue` as `fetch({c})`, so
        // dedup before promotion/queuing rather than promoting `c` twice.
        let mut seen = ahash::AHashSet::with_capacity(ids.len());
        let mut ids: Vec<Cid> = ids.into_iter().filter(|c| seen.insert(*c)).collect();

        if self.live_wants.len() < self.config.active_wants_limit {
            let slots = self.config.active_wants_limit - self.live_wants.len();
            let split = slots.min(ids.len());
            let to_promote: Vec<Cid> = ids.drain(..split).collect();
            for id in to_promote {
                self.promote(id).await;
            }
        }

        for id in ids {
            self.cid_queue.push(id);
        }
    }

    /// E3 — cancel request. Deliberately does not touch `live_wants`: an
    /// identifier already on the wire stays there until its block arrives
    /// or the session ends.
    fn handle_cancel(&mut self, ids: &[Cid]) {
        for id in ids {
            self.cid_queue.remove(id);
        }
    }

    /// E4 — tick. Rebroadcasts the live want set unconditionally — even an
    /// empty one — and only *then* spawns a provider search for the first
    /// identifier by iteration order, and only if the live set is
    /// non-empty. The "first identifier only" restriction is a deliberate
    /// cost-control heuristic, not an oversight.
    async fn handle_tick(&mut self, new_peers_tx: &mpsc::Sender<PeerId>) {
        let now = Instant::now();
        let live: Vec<Cid> = self.live_wants.keys().copied().collect();
        for id in &live {
            self.live_wants.insert(*id, now);
        }

        if let Err(e) = self
            .want_manager
            .want_blocks(&self.scope, &live, &[], self.id)
            .await
        {
            tracing::warn!(id = self.id, error = %e, "tick rebroadcast failed");
        }

        if let Some(&first) = live.first() {
            self.spawn_provider_search(first, new_peers_tx.clone());
        }
    }

    async fn run(mut self) {
        let mut tick = wasm_timer::Delay::new(self.config.prov_search_delay);
        let (new_peers_tx, mut new_peers_rx) =
            mpsc::channel::<PeerId>(self.config.new_peers_channel_capacity);

        loop {
            tokio::select! {
                biased;

                _ = self.scope.cancelled() => {
                    tracing::debug!(id = self.id, "session cancelled, exiting loop");
                    break;
                }

                Some((peer, block)) = self.incoming_rx.recv() => {
                    self.handle_block_arrival(peer, block).await;
                    let next = self.next_tick_delay();
                    tick.reset(next);
                }

                Some(ids) = self.new_reqs_rx.recv() => {
                    self.handle_new_requests(ids).await;
                }

                Some(ids) = self.cancel_rx.recv() => {
                    self.handle_cancel(&ids);
                }

                Some(req) = self.interest_rx.recv() => {
                    let wanted = self.is_wanted(&req.cid);
                    let _ = req.resp.send(wanted);
                }

                Some(peer) = new_peers_rx.recv() => {
                    if self.peer_set.insert(peer) {
                        tracing::trace!(id = self.id, %peer, "new peer discovered via provider search");
                    }
                }

                _ = &mut tick => {
                    self.handle_tick(&new_peers_tx).await;
                    let next = self.next_tick_delay();
                    tick.reset(next);
                }
            }
        }

        self.registry.deregister(self.id);
    }
}

/// External façade for a session: multiplexes `get_block`/`get_blocks`/
/// `receive_block_from` onto the loop's event channels. Does no state
/// mutation of its own.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    scope: Scope,
    notifier: Notifier,
    interest_cache: Arc<Mutex<InterestCache>>,
    config: SessionConfig,

    incoming_tx: mpsc::Sender<(PeerId, Block)>,
    new_reqs_tx: mpsc::Sender<Vec<Cid>>,
    cancel_tx: mpsc::Sender<SmallVec<[Cid; 4]>>,
    interest_tx: mpsc::Sender<InterestReq>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registers interest in `ids` *before* they are sent into the fetch
    /// queue, so no block delivered in between can be missed, then returns
    /// a stream yielding matching blocks as they arrive. No order is
    /// guaranteed.
    pub async fn get_blocks(&self, ids: Vec<Cid>) -> GetBlocks {
        let (subscription_id, receiver) = self
            .notifier
            .subscribe(ids.iter().copied(), self.config.output_buffer);

        tokio::select! {
            _ = self.new_reqs_tx.send(ids.clone()) => {}
            _ = self.scope.cancelled() => {}
        }

        GetBlocks {
            receiver: ReceiverStream::new(receiver),
            remaining: ids.into_iter().collect(),
            cancel_tx: self.cancel_tx.clone(),
            subscription_id,
            notifier: self.notifier.clone(),
        }
    }

    /// Convenience over [`SessionHandle::get_blocks`] returning the first
    /// block, or [`crate::error::SessionError::Cancelled`] if the session's
    /// scope fires first.
    pub async fn get_block(&self, id: Cid) -> Result<Block, crate::error::SessionError> {
        let mut stream = self.get_blocks(vec![id]).await;
        tokio::select! {
            next = stream.next() => next.ok_or(crate::error::SessionError::Cancelled),
            _ = self.scope.cancelled() => Err(crate::error::SessionError::Cancelled),
        }
    }

    /// Delivers E1. Called by the exchange layer for every block it routes
    /// to this session; blocks this session never asked for are silently
    /// dropped by the loop.
    pub async fn receive_block_from(&self, peer: PeerId, block: Block) {
        tokio::select! {
            _ = self.incoming_tx.send((peer, block)) => {}
            _ = self.scope.cancelled() => {}
        }
    }

    /// Answers "was this session ever interested in `c`?" — a cheap local
    /// read of the shared interest cache on a hit, falling back to E6 (a
    /// round trip into the loop) on a miss. The cache is insert-only and is
    /// never cleared on delivery, so this stays `true` for an identifier
    /// whose block has already arrived; use [`SessionHandle::is_live_want`]
    /// to ask whether `c` is still outstanding right now.
    pub async fn is_interested_in(&self, c: &Cid) -> bool {
        if self.interest_cache.lock().contains(c) {
            return true;
        }
        self.is_live_want(c).await
    }

    /// E6 — answers "is `c` currently outstanding for this session?", i.e.
    /// present in `LiveWantTable` or `CidQueue` right now. Always a round
    /// trip into the loop; unlike [`SessionHandle::is_interested_in`], it
    /// never consults the interest cache, so it goes `false` again once a
    /// block has been delivered or a cancel has landed.
    pub async fn is_live_want(&self, c: &Cid) -> bool {
        let (resp_tx, resp_rx) = oneshot::channel();
        let sent = tokio::select! {
            res = self.interest_tx.send(InterestReq { cid: *c, resp: resp_tx }) => res.is_ok(),
            _ = self.scope.cancelled() => false,
        };
        if !sent {
            return false;
        }
        resp_rx.await.unwrap_or(false)
    }
}

/// Creates and registers a new session bound to `scope`. The session's loop
/// task runs until `scope` fires, at which point it removes itself from
/// `registry`.
pub fn new_session(
    scope: Scope,
    want_manager: Arc<dyn WantManager>,
    provider_oracle: Arc<dyn ProviderOracle>,
    config: SessionConfig,
    registry: &SessionRegistry,
) -> SessionHandle {
    let id = next_session_id();
    let notifier = Notifier::new();
    let interest_cache = Arc::new(Mutex::new(InterestCache::new(config.interest_cache_capacity)));

    let (incoming_tx, incoming_rx) = mpsc::channel(1);
    let (new_reqs_tx, new_reqs_rx) = mpsc::channel(1);
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    let (interest_tx, interest_rx) = mpsc::channel(1);

    let session_loop = SessionLoop {
        id,
        scope: scope.clone(),
        registry: registry.clone(),
        cid_queue: CidQueue::new(),
        live_wants: AHashMap::new(),
        peer_set: PeerSet::new(),
        interest_cache: interest_cache.clone(),
        lat_total: Duration::ZERO,
        fetch_count: 0,
        notifier: notifier.clone(),
        config,
        want_manager,
        provider_oracle,
        incoming_rx,
        new_reqs_rx,
        cancel_rx,
        interest_rx,
    };

    tokio::spawn(session_loop.run());

    let handle = SessionHandle {
        id,
        scope,
        notifier,
        interest_cache,
        config,
        incoming_tx,
        new_reqs_tx,
        cancel_tx,
        interest_tx,
    };

    registry.register(handle.clone());
    handle
}
