use std::{ops::Deref, sync::Arc};

use parking_lot::Mutex;

use crate::{
    backend::GpuBackend,
    cmd_list::CmdList,
    cmd_list_manager::CmdListManager,
    deferred::DeferredResources,
    resource::{Handle, HandleArena, IndexBuffer, Sampler, Texture, UniformBuffer, VertexBuffer},
    types::{BufferDesc, SamplerDesc, TextureDesc},
};

/// Producer-facing half of the driver. Cheap to clone and share across
/// worker threads; all methods are callable from any thread.
///
/// Resource creation is CPU-cheap: a handle is allocated immediately and
/// the GPU-side setup is enqueued onto the deferred init queue, to run on
/// the RHI thread before the next frame's draws. Destruction mirrors it
/// through the deferred release queue, after the next frame's draws.
pub struct Device<B: GpuBackend>(Arc<DeviceInner<B>>);

impl<B: GpuBackend> Clone for Device<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<B: GpuBackend> Deref for Device<B> {
    type Target = DeviceInner<B>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct DeviceInner<B: GpuBackend> {
    pub(crate) cmd_lists: CmdListManager<B>,
    pub(crate) deferred: DeferredResources<B>,

    vertex_buffers: Arc<Mutex<HandleArena<VertexBuffer>>>,
    index_buffers: Arc<Mutex<HandleArena<IndexBuffer>>>,
    uniform_buffers: Arc<Mutex<HandleArena<UniformBuffer>>>,
    textures: Arc<Mutex<HandleArena<Texture>>>,
    samplers: Arc<Mutex<HandleArena<Sampler>>>,
}

impl<B: GpuBackend> Device<B> {
    pub(crate) fn inner_new(cmd_buffer_size: usize) -> Self {
        Self(Arc::new(DeviceInner {
            cmd_lists: CmdListManager::new(cmd_buffer_size),
            deferred: DeferredResources::new(cmd_buffer_size),

            vertex_buffers: Default::default(),
            index_buffers: Default::default(),
            uniform_buffers: Default::default(),
            textures: Default::default(),
            samplers: Default::default(),
        }))
    }

    pub fn create_cmd_list(&self) -> CmdList<B> {
        CmdList::inner_new(self.clone(), self.cmd_lists.allocate())
    }
}

impl<B: GpuBackend> DeviceInner<B> {
    pub fn create_vertex_buffer(&self, desc: BufferDesc) -> Handle<VertexBuffer> {
        let handle = self.vertex_buffers.lock().allocate();
        self.deferred
            .push_init(move |backend| backend.create_vertex_buffer(handle, &desc));

        handle
    }

    pub fn destroy_vertex_buffer(&self, handle: Handle<VertexBuffer>) {
        self.vertex_buffers.lock().retire(handle);

        let arena = Arc::clone(&self.vertex_buffers);
        self.deferred.push_release(move |backend| {
            backend.destroy_vertex_buffer(handle);
            arena.lock().free(handle);
        });
    }

    pub fn create_index_buffer(&self, desc: BufferDesc) -> Handle<IndexBuffer> {
        let handle = self.index_buffers.lock().allocate();
        self.deferred
            .push_init(move |backend| backend.create_index_buffer(handle, &desc));

        handle
    }

    pub fn destroy_index_buffer(&self, handle: Handle<IndexBuffer>) {
        self.index_buffers.lock().retire(handle);

        let arena = Arc::clone(&self.index_buffers);
        self.deferred.push_release(move |backend| {
            backend.destroy_index_buffer(handle);
            arena.lock().free(handle);
        });
    }

    pub fn create_uniform_buffer(&self, desc: BufferDesc) -> Handle<UniformBuffer> {
        let handle = self.uniform_buffers.lock().allocate();
        self.deferred
            .push_init(move |backend| backend.create_uniform_buffer(handle, &desc));

        handle
    }

    pub fn destroy_uniform_buffer(&self, handle: Handle<UniformBuffer>) {
        self.uniform_buffers.lock().retire(handle);

        let arena = Arc::clone(&self.uniform_buffers);
        self.deferred.push_release(move |backend| {
            backend.destroy_uniform_buffer(handle);
            arena.lock().free(handle);
        });
    }

    pub fn create_texture(&self, desc: TextureDesc) -> Handle<Texture> {
        let handle = self.textures.lock().allocate();
        self.deferred
            .push_init(move |backend| backend.create_texture(handle, &desc));

        handle
    }

    pub fn destroy_texture(&self, handle: Handle<Texture>) {
        self.textures.lock().retire(handle);

        let arena = Arc::clone(&self.textures);
        self.deferred.push_release(move |backend| {
            backend.destroy_texture(handle);
            arena.lock().free(handle);
        });
    }

    pub fn create_sampler(&self, desc: SamplerDesc) -> Handle<Sampler> {
        let handle = self.samplers.lock().allocate();
        self.deferred
            .push_init(move |backend| backend.create_sampler(handle, &desc));

        handle
    }

    pub fn destroy_sampler(&self, handle: Handle<Sampler>) {
        self.samplers.lock().retire(handle);

        let arena = Arc::clone(&self.samplers);
        self.deferred.push_release(move |backend| {
            backend.destroy_sampler(handle);
            arena.lock().free(handle);
        });
    }

    /// Handles not yet reclaimed across every resource kind, including ones
    /// whose deferred release has been enqueued but not executed.
    pub fn live_resources(&self) -> usize {
        self.vertex_buffers.lock().live_count()
            + self.index_buffers.lock().live_count()
            + self.uniform_buffers.lock().live_count()
            + self.textures.lock().live_count()
            + self.samplers.lock().live_count()
    }
}
