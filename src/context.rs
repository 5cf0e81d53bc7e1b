use std::thread::{self, ThreadId};

use crate::{backend::GpuBackend, command_buffer::CommandBuffer};

/// RHI-thread face of the driver: the only path through which command
/// buffers reach the backend. Tagged with the thread that created it and
/// asserts on every entry point, so touching the context off the RHI
/// thread fails loudly instead of racing the backend.
pub struct Context<B: GpuBackend> {
    backend: B,
    owner: ThreadId,
}

impl<B: GpuBackend> Context<B> {
    pub(crate) fn new(backend: B) -> Self {
        Self {
            backend,
            owner: thread::current().id(),
        }
    }

    /// Runs every command recorded in `buffer`, in order, against the
    /// backend. The buffer is drained but not cleared; the caller decides
    /// when its capacity is reclaimed.
    pub fn execute(&mut self, buffer: &mut CommandBuffer<B>) {
        self.assert_rhi_thread();
        buffer.execute(&mut self.backend);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn assert_rhi_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "context touched off the RHI thread"
        );
    }
}
