use std::collections::VecDeque;

/// One socket waiting for room in the outbound ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedSend {
    /// Stream id of the waiting socket
    pub stream_id: u8,
    /// Payload length the socket needs room for
    pub required_len: usize,
}

/// Ordered queue of sockets with outbound work that did not fit in the ring.
///
/// The queue stores stream ids, never sockets, so a socket can be deleted while a stale id
/// would otherwise linger. Draining is strictly first in, first out: a large head blocks
/// smaller entries behind it.
#[derive(Debug, Default)]
pub struct SendArbiter {
    queue: VecDeque<QueuedSend>,
}

impl SendArbiter {
    /// Creates an empty arbiter.
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    /// Queues a socket behind every socket already waiting.
    pub fn enqueue(&mut self, stream_id: u8, required_len: usize) {
        debug_assert!(!self.contains(stream_id), "socket queued twice");
        self.queue.push_back(QueuedSend { stream_id, required_len });
    }

    /// Returns the entry that must be served next.
    pub fn front(&self) -> Option<QueuedSend> {
        self.queue.front().copied()
    }

    /// Removes and returns the head entry.
    pub fn pop_front(&mut self) -> Option<QueuedSend> {
        self.queue.pop_front()
    }

    /// Removes a socket wherever it sits. Returns true if it was queued.
    pub fn remove(&mut self, stream_id: u8) -> bool {
        match self.queue.iter().position(|entry| entry.stream_id == stream_id) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns true if the socket is waiting.
    pub fn contains(&self, stream_id: u8) -> bool {
        self.queue.iter().any(|entry| entry.stream_id == stream_id)
    }

    /// Returns the number of waiting sockets.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns an iterator over the waiting entries in service order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedSend> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbiter_basic_operations() {
        let mut arbiter = SendArbiter::new();
        assert!(arbiter.is_empty());

        arbiter.enqueue(3, 200);
        arbiter.enqueue(5, 2);
        assert_eq!(arbiter.len(), 2);
        assert_eq!(arbiter.front(), Some(QueuedSend { stream_id: 3, required_len: 200 }));
    }

    #[test]
    fn test_arbiter_keeps_fifo_order() {
        let mut arbiter = SendArbiter::new();
        arbiter.enqueue(1, 10);
        arbiter.enqueue(3, 0);
        arbiter.enqueue(5, 4);

        let order: Vec<u8> =
            std::iter::from_fn(|| arbiter.pop_front()).map(|entry| entry.stream_id).collect();
        assert_eq!(order, vec![1, 3, 5]);
    }

    #[test]
    fn test_arbiter_remove_from_middle() {
        let mut arbiter = SendArbiter::new();
        arbiter.enqueue(1, 10);
        arbiter.enqueue(3, 0);
        arbiter.enqueue(5, 4);

        assert!(arbiter.remove(3));
        assert!(!arbiter.remove(3));
        assert!(!arbiter.contains(3));

        let ids: Vec<u8> = arbiter.iter().map(|entry| entry.stream_id).collect();
        assert_eq!(ids, vec![1, 5]);
    }
}
