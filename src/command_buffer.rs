use std::mem;

type Command<B> = Box<dyn FnOnce(&mut B) + Send>;

/// Append-only list of recorded commands backed by a fixed byte budget.
///
/// Each enqueued closure's captured state counts against the budget; a
/// command that does not fit is a programming error, not a runtime
/// condition. Callers size buffers for their worst case or split work
/// across several buffers.
pub struct CommandBuffer<B> {
    commands: Vec<Command<B>>,
    capacity: usize,
    bytes_used: usize,
}

impl<B> CommandBuffer<B> {
    pub fn new(size_in_bytes: usize) -> Self {
        Self {
            commands: Vec::new(),
            capacity: size_in_bytes,
            bytes_used: 0,
        }
    }

    pub fn enqueue<F>(&mut self, command: F)
    where
        F: FnOnce(&mut B) + Send + 'static,
    {
        let size = mem::size_of::<F>();

        assert!(
            self.bytes_used + size <= self.capacity,
            "command of {} bytes does not fit, {} of {} bytes already recorded",
            size,
            self.bytes_used,
            self.capacity
        );

        self.bytes_used += size;
        self.commands.push(Box::new(command));
    }

    /// Runs every recorded command in insertion order, exactly once,
    /// synchronously on the calling thread. The write cursor is only
    /// reclaimed by [`Self::clear`].
    pub fn execute(&mut self, backend: &mut B) {
        for command in self.commands.drain(..) {
            command(backend);
        }
    }

    /// Drops any unexecuted commands and resets the write cursor. Safe to
    /// call on an already-empty buffer.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.bytes_used = 0;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }
}

#[cfg(test)]
mod tests {
    use super::CommandBuffer;

    const fn is_send<T: Send>() {}

    const _: () = is_send::<CommandBuffer<Vec<u32>>>();

    #[test]
    fn executes_in_insertion_order() {
        let mut buffer = CommandBuffer::new(1024);

        for tag in 0..4u32 {
            buffer.enqueue(move |log: &mut Vec<u32>| log.push(tag));
        }

        let mut log = Vec::new();
        buffer.execute(&mut log);

        assert_eq!(log, [0, 1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn execute_runs_commands_once() {
        let mut buffer = CommandBuffer::new(1024);
        buffer.enqueue(|log: &mut Vec<u32>| log.push(7));

        let mut log = Vec::new();
        buffer.execute(&mut log);
        buffer.execute(&mut log);

        assert_eq!(log, [7]);
    }

    #[test]
    fn clear_drops_recorded_commands() {
        let mut buffer = CommandBuffer::new(1024);
        buffer.enqueue(|log: &mut Vec<u32>| log.push(1));

        buffer.clear();
        buffer.clear();

        let mut log = Vec::new();
        buffer.execute(&mut log);

        assert!(log.is_empty());
        assert_eq!(buffer.bytes_used(), 0);
    }

    #[test]
    fn cursor_reclaimed_only_by_clear() {
        let payload = [0u8; 24];
        let mut buffer = CommandBuffer::<Vec<u32>>::new(64);
        buffer.enqueue(move |_| {
            // `let _ = x` captures nothing under edition 2021 precise
            // capture; bind it so the closure owns the 24-byte payload.
            let _payload = payload;
        });

        assert_eq!(buffer.bytes_used(), 24);

        buffer.execute(&mut Vec::new());
        assert_eq!(buffer.bytes_used(), 24);

        buffer.clear();
        assert_eq!(buffer.bytes_used(), 0);
    }

    #[test]
    #[should_panic]
    fn overflowing_the_budget_panics() {
        let mut buffer = CommandBuffer::<Vec<u32>>::new(32);

        let small = [0u8; 8];
        buffer.enqueue(move |_| {
            let _small = small;
        });

        let large = [0u8; 64];
        buffer.enqueue(move |_| {
            let _large = large;
        });
    }
}
