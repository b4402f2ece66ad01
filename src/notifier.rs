//! Publish/subscribe bus delivering received blocks to callers of
//! `get_blocks`.
//!
//! An `ahash`-keyed map of subscriptions guarded by a single
//! `parking_lot::Mutex`, the same "lock around a small map" shape used
//! elsewhere in this codebase for tracking small sets of live peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use cid::Cid;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::block::Block;

struct Subscription {
    interests: AHashSet<Cid>,
    sender: mpsc::Sender<Block>,
}

#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    subscriptions: Mutex<AHashMap<u64, Subscription>>,
}

pub struct SubscriptionId(u64);

impl Notifier {
    pub fn new() -> Self {
        Notifier::default()
    }

    /// Registers interest in `interests` before the identifiers are fed
    /// into the fetch queue, so no block can arrive ahead of the
    /// subscription.
    pub fn subscribe(
        &self,
        interests: impl IntoIterator<Item = Cid>,
        buffer: usize,
    ) -> (SubscriptionId, mpsc::Receiver<Block>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscriptions.lock().insert(
            id,
            Subscription {
                interests: interests.into_iter().collect(),
                sender,
            },
        );
        (SubscriptionId(id), receiver)
    }

    /// Idempotent: unsubscribing twice, or after the subscriber has already
    /// been dropped, is a no-op.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        self.inner.subscriptions.lock().remove(&id.0);
    }

    /// Fans `block` out to every subscriber whose interest set contains its
    /// identifier. Uses a non-blocking send per subscriber: a subscriber
    /// that has stopped draining its channel loses blocks rather than
    /// stalling the session loop for every other caller. A publish racing a
    /// concurrent unsubscribe is a harmless no-op, because the entry is
    /// simply absent from the map by the time publish reads it.
    pub fn publish(&self, block: Block) {
        let subscriptions = self.inner.subscriptions.lock();
        for sub in subscriptions.values() {
            if sub.interests.contains(block.cid()) {
                let _ = sub.sender.try_send(block.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash::Code;

    fn cid(n: u8) -> Cid {
        Cid::new_v1(0x55, Code::Sha2_256.digest(&[n]))
    }

    #[tokio::test]
    async fn delivers_only_to_interested_subscribers() {
        let notif = Notifier::new();
        let (a, b) = (cid(1), cid(2));
        let (_id1, mut rx_a) = notif.subscribe([a], 8);
        let (_id2, mut rx_b) = notif.subscribe([b], 8);

        notif.publish(Block::new(a, &b"hello"[..]));

        let got = rx_a.try_recv().expect("subscriber for a should get block");
        assert_eq!(got.cid(), &a);
        assert!(rx_b.try_recv().is_err(), "subscriber for b must not see it");
    }

    #[tokio::test]
    async fn publish_after_unsubscribe_is_noop() {
        let notif = Notifier::new();
        let a = cid(1);
        let (id, mut rx) = notif.subscribe([a], 8);
        notif.unsubscribe(&id);
        notif.unsubscribe(&id); // idempotent
        notif.publish(Block::new(a, &b"hello"[..]));
        assert!(rx.try_recv().is_err());
    }
}
