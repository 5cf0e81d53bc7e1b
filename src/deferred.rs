use std::mem;

use crate::{
    backend::GpuBackend, command_buffer::CommandBuffer, context::Context, sync::SpinMutex,
};

struct Queues<B> {
    submit_init: Option<Box<CommandBuffer<B>>>,
    submit_release: Option<Box<CommandBuffer<B>>>,
    deferred_init: Option<Box<CommandBuffer<B>>>,
    deferred_release: Option<Box<CommandBuffer<B>>>,
}

/// Double-buffered init/release queues deferring GPU object lifetime
/// operations to the RHI thread's frame boundary.
///
/// Producers push onto the deferred-role buffers at any point in a frame;
/// `begin_frame` swaps roles with an O(1) pointer exchange under the spin
/// lock, so the buffer the RHI thread is executing is never the one being
/// appended to. Inits run before the frame's draws, releases after them.
///
/// Nothing executes implicitly at drop: shutdown flushing is the explicit
/// [`Self::drain`], and unexecuted work left behind is logged, not run.
pub struct DeferredResources<B: GpuBackend> {
    queues: SpinMutex<Queues<B>>,
}

impl<B: GpuBackend> DeferredResources<B> {
    pub fn new(buffer_size: usize) -> Self {
        let buffer = || Some(Box::new(CommandBuffer::new(buffer_size)));

        Self {
            queues: SpinMutex::new(Queues {
                submit_init: buffer(),
                submit_release: buffer(),
                deferred_init: buffer(),
                deferred_release: buffer(),
            }),
        }
    }

    /// Enqueues GPU-side setup for a freshly created resource. Runs on the
    /// RHI thread after the next `begin_frame`, before that frame's draws.
    pub fn push_init<F>(&self, command: F)
    where
        F: FnOnce(&mut B) + Send + 'static,
    {
        self.queues
            .lock()
            .deferred_init
            .as_mut()
            .unwrap()
            .enqueue(command);
    }

    /// Enqueues GPU-side destruction. Runs on the RHI thread after the next
    /// `begin_frame`'s draws, so work already issued this frame still sees
    /// the object alive.
    pub fn push_release<F>(&self, command: F)
    where
        F: FnOnce(&mut B) + Send + 'static,
    {
        self.queues
            .lock()
            .deferred_release
            .as_mut()
            .unwrap()
            .enqueue(command);
    }

    /// RHI thread, once per frame, before any drawing: swaps the submit and
    /// deferred roles. What producers filled last frame becomes this frame's
    /// submit pair; the drained-and-cleared previous submit pair starts
    /// accumulating this frame's pushes.
    pub fn begin_frame(&self) {
        let mut queues = self.queues.lock();
        let queues = &mut *queues;

        mem::swap(&mut queues.submit_init, &mut queues.deferred_init);
        mem::swap(&mut queues.submit_release, &mut queues.deferred_release);
    }

    pub fn execute_pending_init_queue(&self, context: &mut Context<B>) {
        let mut buffer = self.queues.lock().submit_init.take().unwrap();
        context.execute(&mut buffer);
        self.queues.lock().submit_init = Some(buffer);
    }

    pub fn execute_pending_release_queue(&self, context: &mut Context<B>) {
        let mut buffer = self.queues.lock().submit_release.take().unwrap();
        context.execute(&mut buffer);
        self.queues.lock().submit_release = Some(buffer);
    }

    /// Clears both submit-role buffers so they can take the deferred role
    /// next frame. Idempotent.
    pub fn end_frame(&self) {
        let mut queues = self.queues.lock();

        queues.submit_init.as_mut().unwrap().clear();
        queues.submit_release.as_mut().unwrap().clear();
    }

    /// Explicit shutdown flush: executes whatever sits in both roles of
    /// both queues and leaves everything empty.
    pub fn drain(&self, context: &mut Context<B>) {
        tracing::debug!("draining deferred resource queues");

        self.execute_pending_init_queue(context);
        self.execute_pending_release_queue(context);
        self.end_frame();
        self.begin_frame();
        self.execute_pending_init_queue(context);
        self.execute_pending_release_queue(context);
        self.end_frame();
    }
}

impl<B: GpuBackend> Drop for DeferredResources<B> {
    fn drop(&mut self) {
        let queues = self.queues.get_mut();

        let unexecuted = [
            &queues.submit_init,
            &queues.submit_release,
            &queues.deferred_init,
            &queues.deferred_release,
        ]
        .iter()
        .map(|buffer| buffer.as_ref().map(|b| b.len()).unwrap_or(0))
        .sum::<usize>();

        if unexecuted > 0 {
            tracing::warn!(
                unexecuted,
                "dropping deferred resource commands that never executed"
            );
        }
    }
}
