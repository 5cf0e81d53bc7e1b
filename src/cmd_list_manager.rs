use std::collections::VecDeque;

use crate::{command_buffer::CommandBuffer, sync::SpinMutex};

pub const MIN_CMD_BUFFER_SIZE: usize = 1024;

struct Buffers<B> {
    cached: Vec<Box<CommandBuffer<B>>>,
    pending: VecDeque<Box<CommandBuffer<B>>>,
    total: usize,
}

/// Pools command buffers and queues submitted ones for RHI-thread execution.
///
/// Every buffer is in exactly one of three places at any instant: the idle
/// cache, the pending-execution FIFO, or on loan to a recording producer.
/// All bookkeeping sits behind a single spin lock, which also serializes
/// submit against pop and makes the FIFO order the submission order.
pub struct CmdListManager<B> {
    buffers: SpinMutex<Buffers<B>>,
    cmd_buffer_size: usize,
}

impl<B> CmdListManager<B> {
    pub fn new(cmd_buffer_size: usize) -> Self {
        assert!(
            cmd_buffer_size >= MIN_CMD_BUFFER_SIZE,
            "command buffer size {} is below the {} byte minimum",
            cmd_buffer_size,
            MIN_CMD_BUFFER_SIZE
        );

        Self {
            buffers: SpinMutex::new(Buffers {
                cached: Vec::new(),
                pending: VecDeque::new(),
                total: 0,
            }),
            cmd_buffer_size,
        }
    }

    fn pop_or_grow(buffers: &mut Buffers<B>, size: usize) -> Box<CommandBuffer<B>> {
        if let Some(buffer) = buffers.cached.pop() {
            buffer
        } else {
            buffers.total += 1;
            tracing::debug!(total = buffers.total, "growing command buffer pool");
            Box::new(CommandBuffer::new(size))
        }
    }

    /// Hands out an idle buffer, growing the pool if the cache is empty.
    /// The returned buffer is on loan until submitted or released.
    pub fn allocate(&self) -> Box<CommandBuffer<B>> {
        let mut buffers = self.buffers.lock();

        Self::pop_or_grow(&mut buffers, self.cmd_buffer_size)
    }

    /// Pushes `submitted` onto the pending-execution FIFO and hands back a
    /// fresh buffer under one lock acquisition, so the producer never holds
    /// zero buffers and no other thread can observe an inconsistent total
    /// between the two steps.
    pub fn submit_and_allocate(&self, submitted: Box<CommandBuffer<B>>) -> Box<CommandBuffer<B>> {
        let mut buffers = self.buffers.lock();
        buffers.pending.push_back(submitted);

        Self::pop_or_grow(&mut buffers, self.cmd_buffer_size)
    }

    /// Returns a loaned buffer straight to the idle cache, discarding
    /// whatever it recorded. Used for abandoned recordings and for buffers
    /// the consumer has finished executing.
    pub fn release(&self, mut buffer: Box<CommandBuffer<B>>) {
        buffer.clear();
        self.buffers.lock().cached.push(buffer);
    }

    /// Consumer side: next buffer in submission order, or `None` when the
    /// queue is drained. The caller executes it, then hands it back through
    /// [`Self::release`].
    pub fn pop_pending(&self) -> Option<Box<CommandBuffer<B>>> {
        self.buffers.lock().pending.pop_front()
    }

    pub fn total_buffers(&self) -> usize {
        self.buffers.lock().total
    }

    /// Buffers currently on loan to producers. Snapshot only; stale as soon
    /// as the lock drops.
    pub fn allocated_buffers(&self) -> usize {
        let buffers = self.buffers.lock();

        buffers.total - buffers.cached.len() - buffers.pending.len()
    }

    pub fn pending_buffers(&self) -> usize {
        self.buffers.lock().pending.len()
    }

    pub fn cmd_buffer_size(&self) -> usize {
        self.cmd_buffer_size
    }
}

impl<B> Drop for CmdListManager<B> {
    fn drop(&mut self) {
        let buffers = self.buffers.get_mut();
        let unexecuted = buffers.pending.iter().filter(|b| !b.is_empty()).count();

        if unexecuted > 0 {
            tracing::warn!(
                unexecuted,
                "dropping command buffers with unexecuted commands at shutdown"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CmdListManager, MIN_CMD_BUFFER_SIZE};

    const fn is_send_sync<T: Send + Sync>() {}

    const _: () = is_send_sync::<CmdListManager<Vec<u32>>>();

    #[test]
    #[should_panic]
    fn undersized_buffers_are_rejected() {
        let _ = CmdListManager::<Vec<u32>>::new(MIN_CMD_BUFFER_SIZE - 1);
    }

    #[test]
    fn pending_buffers_execute_in_submission_order() {
        let manager = CmdListManager::new(4096);

        let mut buffer = manager.allocate();
        for tag in 0..8u32 {
            buffer.enqueue(move |log: &mut Vec<u32>| log.push(tag));
            buffer = manager.submit_and_allocate(buffer);
        }
        manager.release(buffer);

        let mut log = Vec::new();
        while let Some(mut buffer) = manager.pop_pending() {
            buffer.execute(&mut log);
            manager.release(buffer);
        }

        assert_eq!(log, [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn buffer_states_stay_conserved() {
        let manager = CmdListManager::<Vec<u32>>::new(4096);
        let mut loaned = Vec::new();

        let conserved = |manager: &CmdListManager<Vec<u32>>, loaned: usize| {
            manager.allocated_buffers() == loaned
                && manager.total_buffers()
                    == manager.allocated_buffers() + manager.pending_buffers() + cached(manager)
        };

        fn cached<B>(manager: &CmdListManager<B>) -> usize {
            manager.total_buffers() - manager.allocated_buffers() - manager.pending_buffers()
        }

        for _ in 0..3 {
            loaned.push(manager.allocate());
            assert!(conserved(&manager, loaned.len()));
        }

        let buffer = loaned.pop().unwrap();
        loaned.push(manager.submit_and_allocate(buffer));
        assert!(conserved(&manager, loaned.len()));
        assert_eq!(manager.pending_buffers(), 1);

        manager.release(loaned.pop().unwrap());
        assert!(conserved(&manager, loaned.len()));

        let buffer = manager.pop_pending().unwrap();
        manager.release(buffer);
        assert!(conserved(&manager, loaned.len()));

        for buffer in loaned.drain(..) {
            manager.release(buffer);
        }
        assert!(conserved(&manager, 0));
    }

    #[test]
    fn released_buffer_is_reused_before_pool_grows() {
        let manager = CmdListManager::<Vec<u32>>::new(4096);

        let buffer = manager.allocate();
        let released = &*buffer as *const _;
        manager.release(buffer);

        let buffer = manager.allocate();
        assert!(std::ptr::eq(&*buffer, released));
        assert_eq!(manager.total_buffers(), 1);

        manager.release(buffer);
    }

    #[test]
    fn empty_submit_round_trip() {
        let manager = CmdListManager::<Vec<u32>>::new(4096);

        let b1 = manager.allocate();
        let b2 = manager.submit_and_allocate(b1);
        assert_eq!(manager.pending_buffers(), 1);

        let mut b1 = manager.pop_pending().unwrap();
        b1.execute(&mut Vec::new());
        manager.release(b1);

        assert_eq!(manager.pending_buffers(), 0);
        assert_eq!(manager.allocated_buffers(), 1);

        manager.release(b2);
    }

    #[test]
    fn concurrent_submissions_are_all_queued() {
        let manager = CmdListManager::<Vec<u32>>::new(4096);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut buffer = manager.allocate();
                    for _ in 0..16 {
                        buffer = manager.submit_and_allocate(buffer);
                    }
                    manager.release(buffer);
                });
            }
        });

        assert_eq!(manager.pending_buffers(), 64);
        assert_eq!(manager.allocated_buffers(), 0);

        while let Some(buffer) = manager.pop_pending() {
            manager.release(buffer);
        }
    }
}
