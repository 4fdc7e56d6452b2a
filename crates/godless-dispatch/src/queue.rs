use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::request::QueuedRequest;

/// A priority queue abstraction over pending requests: concrete ordering
/// is a hook, the default is FIFO. Implementations
/// only need to agree on what `drain_one` returns next; the dispatcher
/// worker just calls it in a loop.
#[async_trait]
pub(crate) trait RequestQueue: Send + Sync {
    fn enqueue(&self, request: QueuedRequest);
    async fn drain_one(&self) -> QueuedRequest;
}

/// FIFO queue, grounded in `RequestPriorityQueue.Drain()`'s channel-backed
/// original: a `Notify` wakes the worker rather than a genuine channel,
/// since the items themselves (carrying a non-`Clone` oneshot sender)
/// live in a plain `VecDeque` guarded by a `parking_lot::Mutex`.
pub(crate) struct FifoQueue {
    items: Mutex<VecDeque<QueuedRequest>>,
    notify: Notify,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl Default for FifoQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestQueue for FifoQueue {
    fn enqueue(&self, request: QueuedRequest) {
        self.items.lock().push_back(request);
        self.notify.notify_one();
    }

    async fn drain_one(&self) -> QueuedRequest {
        loop {
            if let Some(item) = self.items.lock().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }
}
