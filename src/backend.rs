use crate::{
    resource::{Handle, IndexBuffer, Sampler, Texture, UniformBuffer, VertexBuffer},
    types::{BufferDesc, PipelineState, Region2d, RenderPassDesc, SamplerDesc, TextureDesc},
};

/// Call contract toward the concrete graphics API binding.
///
/// Everything here runs on the RHI thread only, driven by command buffer
/// execution through the context; implementations never see calls from
/// producer threads. Lifetime misuse (use before the deferred init ran,
/// use after destruction) is a programming error and implementations are
/// expected to panic on it rather than limp along.
pub trait GpuBackend: Send + 'static {
    fn create_vertex_buffer(&mut self, handle: Handle<VertexBuffer>, desc: &BufferDesc);
    fn destroy_vertex_buffer(&mut self, handle: Handle<VertexBuffer>);

    fn create_index_buffer(&mut self, handle: Handle<IndexBuffer>, desc: &BufferDesc);
    fn destroy_index_buffer(&mut self, handle: Handle<IndexBuffer>);

    fn create_uniform_buffer(&mut self, handle: Handle<UniformBuffer>, desc: &BufferDesc);
    fn destroy_uniform_buffer(&mut self, handle: Handle<UniformBuffer>);

    fn create_texture(&mut self, handle: Handle<Texture>, desc: &TextureDesc);
    fn destroy_texture(&mut self, handle: Handle<Texture>);

    fn create_sampler(&mut self, handle: Handle<Sampler>, desc: &SamplerDesc);
    fn destroy_sampler(&mut self, handle: Handle<Sampler>);

    fn update_vertex_buffer(&mut self, handle: Handle<VertexBuffer>, byte_offset: usize, data: &[u8]);
    fn update_index_buffer(&mut self, handle: Handle<IndexBuffer>, byte_offset: usize, data: &[u8]);
    fn update_uniform_buffer(
        &mut self,
        handle: Handle<UniformBuffer>,
        byte_offset: usize,
        data: &[u8],
    );
    fn update_texture2d(
        &mut self,
        handle: Handle<Texture>,
        mip_level: u32,
        region: Region2d,
        data: &[u8],
    );
    fn generate_mip_maps(&mut self, handle: Handle<Texture>);

    fn begin_render_pass(&mut self, desc: &RenderPassDesc);
    fn bind_pipeline_state(&mut self, state: &PipelineState);
    fn bind_vertex_buffers(&mut self, buffers: &[Handle<VertexBuffer>]);
    fn bind_index_buffer(&mut self, handle: Handle<IndexBuffer>);
    fn bind_uniform_buffer(
        &mut self,
        handle: Handle<UniformBuffer>,
        index: u32,
        byte_offset: usize,
        byte_size: usize,
    );
    fn bind_texture(&mut self, handle: Handle<Texture>, slot: u32);
    fn bind_sampler(&mut self, handle: Handle<Sampler>, slot: u32);

    fn draw(&mut self, vertex_count: u32, base_vertex: u32, instance_count: u32, base_instance: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
    );
    fn end_render_pass(&mut self);
}
