//! The stream returned by [`crate::session::SessionHandle::get_blocks`]: a
//! channel of blocks that, when dropped, cancels interest in whatever was
//! not yet delivered.

use std::pin::Pin;
use std::task::{Context, Poll};

use ahash::AHashSet;
use cid::Cid;
use futures::Stream;
use smallvec::SmallVec;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::block::Block;
use crate::notifier::{Notifier, SubscriptionId};

/// A stream of blocks matching the identifiers passed to `get_blocks`.
///
/// Dropping this stream before it has produced a block for every requested
/// identifier delivers a cancel (E3) for whatever is still outstanding, and
/// always unsubscribes from the notifier.
pub struct GetBlocks {
    pub(crate) receiver: ReceiverStream<Block>,
    pub(crate) remaining: AHashSet<Cid>,
    pub(crate) cancel_tx: mpsc::Sender<SmallVec<[Cid; 4]>>,
    pub(crate) subscription_id: SubscriptionId,
    pub(crate) notifier: Notifier,
}

impl Stream for GetBlocks {
    type Item = Block;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Block>> {
        match Pin::new(&mut self.receiver).poll_next(cx) {
            Poll::Ready(Some(block)) => {
                self.remaining.remove(block.cid());
                Poll::Ready(Some(block))
            }
            other => other,
        }
    }
}

impl Drop for GetBlocks {
    fn drop(&mut self) {
        self.notifier.unsubscribe(&self.subscription_id);
        if !self.remaining.is_empty() {
            let ids: SmallVec<[Cid; 4]> = self.remaining.iter().copied().collect();
            // best-effort: if the loop is gone or its cancel queue is full,
            // there is nothing further to do on a synchronous drop.
            let _ = self.cancel_tx.try_send(ids);
        }
    }
}
