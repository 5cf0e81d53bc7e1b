use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use atomig::Atomic;

use crate::{
    backend::GpuBackend,
    resource::{Handle, IndexBuffer, Sampler, Texture, UniformBuffer, VertexBuffer},
    types::{BufferDesc, PipelineState, Region2d, RenderPassDesc, SamplerDesc, TextureDesc},
};

#[derive(Debug)]
struct CountersInner {
    inits: Atomic<u64>,
    releases: Atomic<u64>,
    updates: Atomic<u64>,
    draws: Atomic<u64>,
}

impl Default for CountersInner {
    fn default() -> Self {
        Self {
            inits: Atomic::new(0),
            releases: Atomic::new(0),
            updates: Atomic::new(0),
            draws: Atomic::new(0),
        }
    }
}

/// Shared view of what a [`HeadlessBackend`] has executed so far. Survives
/// the backend moving into the driver, which is what makes frame-boundary
/// behavior observable from tests and the demo.
#[derive(Clone, Debug, Default)]
pub struct HeadlessCounters(Arc<CountersInner>);

impl HeadlessCounters {
    pub fn inits(&self) -> u64 {
        self.0.inits.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn releases(&self) -> u64 {
        self.0.releases.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn updates(&self) -> u64 {
        self.0.updates.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn draws(&self) -> u64 {
        self.0.draws.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn bump(counter: &Atomic<u64>) {
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Software stand-in for a real API binding, in the role the WARP adapter
/// plays for D3D: the full command and lifecycle protocol without a GPU.
/// Tracks live objects per kind and panics on the misuse classes a real
/// backend would turn into undefined behavior.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    counters: HeadlessCounters,

    vertex_buffers: HashMap<u32, usize>,
    index_buffers: HashMap<u32, usize>,
    uniform_buffers: HashMap<u32, usize>,
    textures: HashMap<u32, TextureDesc>,
    samplers: HashSet<u32>,

    in_pass: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> HeadlessCounters {
        self.counters.clone()
    }

    pub fn live_objects(&self) -> usize {
        self.vertex_buffers.len()
            + self.index_buffers.len()
            + self.uniform_buffers.len()
            + self.textures.len()
            + self.samplers.len()
    }

    fn insert(map: &mut HashMap<u32, usize>, index: u32, size: usize, kind: &str) {
        let previous = map.insert(index, size);
        assert!(previous.is_none(), "{kind} {index} initialized twice");
    }

    fn remove(map: &mut HashMap<u32, usize>, index: u32, kind: &str) {
        assert!(
            map.remove(&index).is_some(),
            "{kind} {index} destroyed but never initialized"
        );
    }

    fn update(map: &HashMap<u32, usize>, index: u32, byte_offset: usize, data: &[u8], kind: &str) {
        let size = *map
            .get(&index)
            .unwrap_or_else(|| panic!("updating {kind} {index} before its init ran"));
        assert!(
            byte_offset + data.len() <= size,
            "update of {} bytes at offset {} overflows {kind} {index} of {} bytes",
            data.len(),
            byte_offset,
            size
        );
    }

    fn bound(map: &HashMap<u32, usize>, index: u32, kind: &str) {
        assert!(
            map.contains_key(&index),
            "binding {kind} {index} before its init ran"
        );
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_vertex_buffer(&mut self, handle: Handle<VertexBuffer>, desc: &BufferDesc) {
        Self::insert(&mut self.vertex_buffers, handle.index(), desc.size, "vertex buffer");
        HeadlessCounters::bump(&self.counters.0.inits);
    }

    fn destroy_vertex_buffer(&mut self, handle: Handle<VertexBuffer>) {
        Self::remove(&mut self.vertex_buffers, handle.index(), "vertex buffer");
        HeadlessCounters::bump(&self.counters.0.releases);
    }

    fn create_index_buffer(&mut self, handle: Handle<IndexBuffer>, desc: &BufferDesc) {
        Self::insert(&mut self.index_buffers, handle.index(), desc.size, "index buffer");
        HeadlessCounters::bump(&self.counters.0.inits);
    }

    fn destroy_index_buffer(&mut self, handle: Handle<IndexBuffer>) {
        Self::remove(&mut self.index_buffers, handle.index(), "index buffer");
        HeadlessCounters::bump(&self.counters.0.releases);
    }

    fn create_uniform_buffer(&mut self, handle: Handle<UniformBuffer>, desc: &BufferDesc) {
        Self::insert(&mut self.uniform_buffers, handle.index(), desc.size, "uniform buffer");
        HeadlessCounters::bump(&self.counters.0.inits);
    }

    fn destroy_uniform_buffer(&mut self, handle: Handle<UniformBuffer>) {
        Self::remove(&mut self.uniform_buffers, handle.index(), "uniform buffer");
        HeadlessCounters::bump(&self.counters.0.releases);
    }

    fn create_texture(&mut self, handle: Handle<Texture>, desc: &TextureDesc) {
        let previous = self.textures.insert(handle.index(), *desc);
        assert!(previous.is_none(), "texture {} initialized twice", handle.index());
        HeadlessCounters::bump(&self.counters.0.inits);
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        assert!(
            self.textures.remove(&handle.index()).is_some(),
            "texture {} destroyed but never initialized",
            handle.index()
        );
        HeadlessCounters::bump(&self.counters.0.releases);
    }

    fn create_sampler(&mut self, handle: Handle<Sampler>, _desc: &SamplerDesc) {
        assert!(
            self.samplers.insert(handle.index()),
            "sampler {} initialized twice",
            handle.index()
        );
        HeadlessCounters::bump(&self.counters.0.inits);
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        assert!(
            self.samplers.remove(&handle.index()),
            "sampler {} destroyed but never initialized",
            handle.index()
        );
        HeadlessCounters::bump(&self.counters.0.releases);
    }

    fn update_vertex_buffer(&mut self, handle: Handle<VertexBuffer>, byte_offset: usize, data: &[u8]) {
        Self::update(&self.vertex_buffers, handle.index(), byte_offset, data, "vertex buffer");
        HeadlessCounters::bump(&self.counters.0.updates);
    }

    fn update_index_buffer(&mut self, handle: Handle<IndexBuffer>, byte_offset: usize, data: &[u8]) {
        Self::update(&self.index_buffers, handle.index(), byte_offset, data, "index buffer");
        HeadlessCounters::bump(&self.counters.0.updates);
    }

    fn update_uniform_buffer(
        &mut self,
        handle: Handle<UniformBuffer>,
        byte_offset: usize,
        data: &[u8],
    ) {
        Self::update(&self.uniform_buffers, handle.index(), byte_offset, data, "uniform buffer");
        HeadlessCounters::bump(&self.counters.0.updates);
    }

    fn update_texture2d(
        &mut self,
        handle: Handle<Texture>,
        mip_level: u32,
        region: Region2d,
        _data: &[u8],
    ) {
        let desc = self
            .textures
            .get(&handle.index())
            .unwrap_or_else(|| panic!("updating texture {} before its init ran", handle.index()));
        assert!(mip_level < desc.mip_levels);
        assert!(region.x + region.width <= (desc.width >> mip_level).max(1));
        assert!(region.y + region.height <= (desc.height >> mip_level).max(1));
        HeadlessCounters::bump(&self.counters.0.updates);
    }

    fn generate_mip_maps(&mut self, handle: Handle<Texture>) {
        assert!(
            self.textures.contains_key(&handle.index()),
            "generating mips for texture {} before its init ran",
            handle.index()
        );
    }

    fn begin_render_pass(&mut self, _desc: &RenderPassDesc) {
        assert!(!self.in_pass, "render pass begun inside another render pass");
        self.in_pass = true;
    }

    fn bind_pipeline_state(&mut self, _state: &PipelineState) {
        assert!(self.in_pass, "pipeline bound outside a render pass");
    }

    fn bind_vertex_buffers(&mut self, buffers: &[Handle<VertexBuffer>]) {
        for handle in buffers {
            Self::bound(&self.vertex_buffers, handle.index(), "vertex buffer");
        }
    }

    fn bind_index_buffer(&mut self, handle: Handle<IndexBuffer>) {
        Self::bound(&self.index_buffers, handle.index(), "index buffer");
    }

    fn bind_uniform_buffer(
        &mut self,
        handle: Handle<UniformBuffer>,
        _index: u32,
        byte_offset: usize,
        byte_size: usize,
    ) {
        let size = *self
            .uniform_buffers
            .get(&handle.index())
            .unwrap_or_else(|| panic!("binding uniform buffer {} before its init ran", handle.index()));
        assert!(byte_offset + byte_size <= size);
    }

    fn bind_texture(&mut self, handle: Handle<Texture>, _slot: u32) {
        assert!(
            self.textures.contains_key(&handle.index()),
            "binding texture {} before its init ran",
            handle.index()
        );
    }

    fn bind_sampler(&mut self, handle: Handle<Sampler>, _slot: u32) {
        assert!(
            self.samplers.contains(&handle.index()),
            "binding sampler {} before its init ran",
            handle.index()
        );
    }

    fn draw(&mut self, _vertex_count: u32, _base_vertex: u32, _instance_count: u32, _base_instance: u32) {
        assert!(self.in_pass, "draw outside a render pass");
        HeadlessCounters::bump(&self.counters.0.draws);
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _base_index: u32,
        _instance_count: u32,
        _base_instance: u32,
    ) {
        assert!(self.in_pass, "draw outside a render pass");
        HeadlessCounters::bump(&self.counters.0.draws);
    }

    fn end_render_pass(&mut self) {
        assert!(self.in_pass, "render pass ended but never begun");
        self.in_pass = false;
    }
}

#[cfg(test)]
mod tests {
    use super::HeadlessBackend;
    use crate::{
        backend::GpuBackend,
        resource::{HandleArena, VertexBuffer},
        types::{BufferDesc, BufferUsage},
    };

    const fn is_send<T: Send>() {}

    const _: () = is_send::<HeadlessBackend>();

    fn desc() -> BufferDesc {
        BufferDesc {
            size: 256,
            usage: BufferUsage::Static,
        }
    }

    #[test]
    fn tracks_lifecycle_and_counters() {
        let mut arena = HandleArena::<VertexBuffer>::new();
        let mut backend = HeadlessBackend::new();
        let counters = backend.counters();

        let handle = arena.allocate();
        backend.create_vertex_buffer(handle, &desc());
        backend.update_vertex_buffer(handle, 0, &[0; 128]);
        backend.destroy_vertex_buffer(handle);

        assert_eq!(counters.inits(), 1);
        assert_eq!(counters.updates(), 1);
        assert_eq!(counters.releases(), 1);
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    #[should_panic(expected = "before its init ran")]
    fn update_before_init_panics() {
        let mut arena = HandleArena::<VertexBuffer>::new();
        let mut backend = HeadlessBackend::new();

        backend.update_vertex_buffer(arena.allocate(), 0, &[0; 16]);
    }

    #[test]
    #[should_panic(expected = "destroyed but never initialized")]
    fn double_destroy_panics() {
        let mut arena = HandleArena::<VertexBuffer>::new();
        let mut backend = HeadlessBackend::new();

        let handle = arena.allocate();
        backend.create_vertex_buffer(handle, &desc());
        backend.destroy_vertex_buffer(handle);
        backend.destroy_vertex_buffer(handle);
    }
}
