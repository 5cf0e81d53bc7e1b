use atomig::Atomic;

use crate::{backend::GpuBackend, context::Context, device::Device};

/// Owns the whole submission machinery for one backend instance: the
/// shared [`Device`] producers clone, and the [`Context`] that stays on
/// the thread that built the driver. Construct it on the RHI thread and
/// drive [`Self::frame`] from there; everything else may happen anywhere.
///
/// Replaces global device/context registration with an explicit object so
/// init and teardown order are visible at the call site.
pub struct Driver<B: GpuBackend> {
    device: Device<B>,
    context: Context<B>,
    frame_index: Atomic<u64>,
}

impl<B: GpuBackend> Driver<B> {
    pub fn new(backend: B, cmd_buffer_size: usize) -> Self {
        tracing::debug!(cmd_buffer_size, "creating rhi driver");

        Self {
            device: Device::inner_new(cmd_buffer_size),
            context: Context::new(backend),
            frame_index: Atomic::new(0),
        }
    }

    pub fn device(&self) -> Device<B> {
        self.device.clone()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// One RHI-thread frame:
    /// swap the deferred queues in, run pending inits, run every command
    /// buffer committed since the last frame in submission order, run
    /// pending releases, clear the drained queues.
    pub fn frame(&mut self) {
        self.device.deferred.begin_frame();
        self.device.deferred.execute_pending_init_queue(&mut self.context);

        let mut executed = 0;
        while let Some(mut buffer) = self.device.cmd_lists.pop_pending() {
            self.context.execute(&mut buffer);
            self.device.cmd_lists.release(buffer);
            executed += 1;
        }

        self.device.deferred.execute_pending_release_queue(&mut self.context);
        self.device.deferred.end_frame();

        let frame = self
            .frame_index
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        tracing::trace!(frame, executed, "frame executed");
    }

    /// Explicit teardown: flushes both deferred queues so enqueued releases
    /// still reach the backend, then drops everything. Command buffers
    /// still pending at this point are discarded, loudly.
    pub fn shutdown(mut self) {
        let pending = self.device.cmd_lists.pending_buffers();
        if pending > 0 {
            tracing::warn!(pending, "shutting down with unexecuted command buffers");
        }

        self.device.deferred.drain(&mut self.context);
        tracing::debug!(
            frames = self.frame_index(),
            leaked = self.device.live_resources(),
            "rhi driver shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::Driver;
    use crate::{
        headless::HeadlessBackend,
        types::{BufferDesc, BufferUsage, RenderPassDesc, Viewport},
    };

    fn pass() -> RenderPassDesc {
        RenderPassDesc {
            viewport: Viewport {
                x: 0,
                y: 0,
                width: 1280,
                height: 720,
            },
            clear_color: Some(glam::Vec4::new(0.1, 0.1, 0.1, 1.0)),
            clear_depth: Some(1.0),
        }
    }

    #[test]
    fn frame_runs_inits_draws_then_releases() {
        let backend = HeadlessBackend::new();
        let counters = backend.counters();
        let mut driver = Driver::new(backend, 8192);
        let device = driver.device();

        let vb = device.create_vertex_buffer(BufferDesc {
            size: 4096,
            usage: BufferUsage::Static,
        });

        let mut list = device.create_cmd_list();
        list.update_vertex_buffer(vb, 0, vec![0; 512]);
        list.begin_render_pass(pass());
        list.bind_vertex_buffers(&[vb]);
        list.draw(3, 0, 1, 0);
        list.end_render_pass();
        list.commit();
        device.destroy_vertex_buffer(vb);
        drop(list);

        // The release was enqueued before the frame boundary, so it runs
        // this frame, after the draws that still reference the buffer.
        driver.frame();
        assert_eq!(counters.inits(), 1);
        assert_eq!(counters.updates(), 1);
        assert_eq!(counters.draws(), 1);
        assert_eq!(counters.releases(), 1);
        assert_eq!(device.live_resources(), 0);

        driver.frame();
        assert_eq!(counters.releases(), 1);
        assert_eq!(driver.frame_index(), 2);

        driver.shutdown();
    }

    #[test]
    fn producers_on_worker_threads_feed_the_rhi_thread() {
        let backend = HeadlessBackend::new();
        let counters = backend.counters();
        let mut driver = Driver::new(backend, 16 * 1024);
        let device = driver.device();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let device = device.clone();
                s.spawn(move || {
                    let vb = device.create_vertex_buffer(BufferDesc {
                        size: 1024,
                        usage: BufferUsage::Dynamic,
                    });

                    let mut list = device.create_cmd_list();
                    for _ in 0..8 {
                        list.begin_render_pass(pass());
                        list.bind_vertex_buffers(&[vb]);
                        list.draw(3, 0, 1, 0);
                        list.end_render_pass();
                        list.commit();
                    }

                    device.destroy_vertex_buffer(vb);
                });
            }
        });

        driver.frame();
        assert_eq!(counters.inits(), 4);
        assert_eq!(counters.draws(), 32);
        assert_eq!(counters.releases(), 4);
        assert_eq!(device.cmd_lists.pending_buffers(), 0);
        assert_eq!(device.cmd_lists.allocated_buffers(), 0);
        assert_eq!(device.live_resources(), 0);

        driver.shutdown();
    }

    #[test]
    fn shutdown_drains_releases_enqueued_after_the_last_frame() {
        let backend = HeadlessBackend::new();
        let counters = backend.counters();
        let mut driver = Driver::new(backend, 8192);
        let device = driver.device();

        let vb = device.create_vertex_buffer(BufferDesc {
            size: 1024,
            usage: BufferUsage::Static,
        });
        driver.frame();
        device.destroy_vertex_buffer(vb);

        driver.shutdown();
        assert_eq!(counters.releases(), 1);
        assert_eq!(device.live_resources(), 0);
    }
}
