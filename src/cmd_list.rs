use smallvec::SmallVec;

use crate::{
    backend::GpuBackend,
    command_buffer::CommandBuffer,
    device::Device,
    resource::{Handle, IndexBuffer, Sampler, Texture, UniformBuffer, VertexBuffer},
    types::{PipelineState, Region2d, RenderPassDesc, MAX_VERTEX_ATTRIBUTES},
};

/// Records rendering and update commands for later execution on the RHI
/// thread. Capture happens on whatever thread owns the list; execution
/// happens when the RHI thread reaches the committed buffer, this frame or
/// the next. Access to one list is single-threaded; share work by giving
/// each producer its own list.
pub struct CmdList<B: GpuBackend> {
    device: Device<B>,
    buffer: Option<Box<CommandBuffer<B>>>,
}

impl<B: GpuBackend> CmdList<B> {
    pub(crate) fn inner_new(device: Device<B>, buffer: Box<CommandBuffer<B>>) -> Self {
        Self {
            device,
            buffer: Some(buffer),
        }
    }

    fn enqueue<F>(&mut self, command: F)
    where
        F: FnOnce(&mut B) + Send + 'static,
    {
        self.buffer.as_mut().unwrap().enqueue(command);
    }

    pub fn update_vertex_buffer(
        &mut self,
        buffer: Handle<VertexBuffer>,
        byte_offset: usize,
        data: Vec<u8>,
    ) {
        self.enqueue(move |backend| backend.update_vertex_buffer(buffer, byte_offset, &data));
    }

    pub fn update_index_buffer(
        &mut self,
        buffer: Handle<IndexBuffer>,
        byte_offset: usize,
        data: Vec<u8>,
    ) {
        self.enqueue(move |backend| backend.update_index_buffer(buffer, byte_offset, &data));
    }

    pub fn update_uniform_buffer(
        &mut self,
        buffer: Handle<UniformBuffer>,
        byte_offset: usize,
        data: Vec<u8>,
    ) {
        self.enqueue(move |backend| backend.update_uniform_buffer(buffer, byte_offset, &data));
    }

    pub fn update_texture2d(
        &mut self,
        texture: Handle<Texture>,
        mip_level: u32,
        region: Region2d,
        data: Vec<u8>,
    ) {
        self.enqueue(move |backend| backend.update_texture2d(texture, mip_level, region, &data));
    }

    pub fn generate_mip_maps(&mut self, texture: Handle<Texture>) {
        self.enqueue(move |backend| backend.generate_mip_maps(texture));
    }

    pub fn begin_render_pass(&mut self, desc: RenderPassDesc) {
        self.enqueue(move |backend| backend.begin_render_pass(&desc));
    }

    pub fn bind_pipeline_state(&mut self, state: PipelineState) {
        self.enqueue(move |backend| backend.bind_pipeline_state(&state));
    }

    pub fn bind_vertex_buffers(&mut self, buffers: &[Handle<VertexBuffer>]) {
        assert!(buffers.len() <= MAX_VERTEX_ATTRIBUTES);

        let buffers: SmallVec<[_; MAX_VERTEX_ATTRIBUTES]> = buffers.iter().copied().collect();
        self.enqueue(move |backend| backend.bind_vertex_buffers(&buffers));
    }

    pub fn bind_index_buffer(&mut self, buffer: Handle<IndexBuffer>) {
        self.enqueue(move |backend| backend.bind_index_buffer(buffer));
    }

    pub fn bind_uniform_buffer(
        &mut self,
        buffer: Handle<UniformBuffer>,
        index: u32,
        byte_offset: usize,
        byte_size: usize,
    ) {
        self.enqueue(move |backend| {
            backend.bind_uniform_buffer(buffer, index, byte_offset, byte_size)
        });
    }

    pub fn bind_texture(&mut self, texture: Handle<Texture>, slot: u32) {
        self.enqueue(move |backend| backend.bind_texture(texture, slot));
    }

    pub fn bind_sampler(&mut self, sampler: Handle<Sampler>, slot: u32) {
        self.enqueue(move |backend| backend.bind_sampler(sampler, slot));
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        base_vertex: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        self.enqueue(move |backend| {
            backend.draw(vertex_count, base_vertex, instance_count, base_instance)
        });
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        self.enqueue(move |backend| {
            backend.draw_indexed(index_count, base_index, instance_count, base_instance)
        });
    }

    pub fn end_render_pass(&mut self) {
        self.enqueue(move |backend| backend.end_render_pass());
    }

    /// Commits the captured commands to the RHI thread's pending queue and
    /// leaves the list ready to keep recording, without a window in which
    /// it holds no buffer.
    pub fn commit(&mut self) {
        let submitted = self.buffer.take().unwrap();
        self.buffer = Some(self.device.cmd_lists.submit_and_allocate(submitted));
    }

    pub fn recorded_commands(&self) -> usize {
        self.buffer.as_ref().unwrap().len()
    }
}

impl<B: GpuBackend> Drop for CmdList<B> {
    fn drop(&mut self) {
        // Uncommitted recordings are abandoned, not submitted.
        if let Some(buffer) = self.buffer.take() {
            self.device.cmd_lists.release(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{device::Device, headless::HeadlessBackend};

    #[test]
    fn commit_queues_the_recording_and_keeps_the_list_usable() {
        let device = Device::<HeadlessBackend>::inner_new(4096);

        let mut list = device.create_cmd_list();
        list.draw(3, 0, 1, 0);
        assert_eq!(list.recorded_commands(), 1);

        list.commit();
        assert_eq!(list.recorded_commands(), 0);
        assert_eq!(device.cmd_lists.pending_buffers(), 1);

        list.draw(3, 0, 1, 0);
        list.commit();
        assert_eq!(device.cmd_lists.pending_buffers(), 2);
    }

    #[test]
    fn dropping_an_uncommitted_list_returns_its_buffer() {
        let device = Device::<HeadlessBackend>::inner_new(4096);

        {
            let mut list = device.create_cmd_list();
            list.draw(3, 0, 1, 0);
            assert_eq!(device.cmd_lists.allocated_buffers(), 1);
        }

        assert_eq!(device.cmd_lists.allocated_buffers(), 0);
        assert_eq!(device.cmd_lists.pending_buffers(), 0);
    }
}
