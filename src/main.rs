use berserk_rhi::{
    driver::Driver,
    headless::HeadlessBackend,
    types::{BufferDesc, BufferUsage, PipelineState, RenderPassDesc, Viewport},
};

use rand::Rng;

const FRAMES: u64 = 16;
const PRODUCERS: usize = 4;
const CMD_BUFFER_SIZE: usize = 64 * 1024;

fn main() {
    tracing_subscriber::fmt::init();

    let backend = HeadlessBackend::new();
    let counters = backend.counters();

    let mut driver = Driver::new(backend, CMD_BUFFER_SIZE);
    let device = driver.device();

    for _ in 0..FRAMES {
        rayon::scope(|s| {
            for producer in 0..PRODUCERS {
                let device = device.clone();

                s.spawn(move |_| {
                    let mut rng = rand::thread_rng();

                    let vb = device.create_vertex_buffer(BufferDesc {
                        size: 64 * 1024,
                        usage: BufferUsage::Dynamic,
                    });

                    let mut list = device.create_cmd_list();
                    list.update_vertex_buffer(vb, 0, vec![0; rng.gen_range(1024..16 * 1024)]);

                    list.begin_render_pass(RenderPassDesc {
                        viewport: Viewport {
                            x: 0,
                            y: 0,
                            width: 1280,
                            height: 720,
                        },
                        clear_color: Some(glam::Vec4::new(0.1, 0.2, 0.3, 1.0)),
                        clear_depth: Some(1.0),
                    });
                    list.bind_pipeline_state(PipelineState::default());
                    list.bind_vertex_buffers(&[vb]);
                    for _ in 0..rng.gen_range(1..32) {
                        list.draw(3, 0, 1, 0);
                    }
                    list.end_render_pass();
                    list.commit();

                    device.destroy_vertex_buffer(vb);
                    tracing::trace!(producer, "work committed");
                });
            }
        });

        driver.frame();
    }

    tracing::info!(
        frames = driver.frame_index(),
        inits = counters.inits(),
        releases = counters.releases(),
        updates = counters.updates(),
        draws = counters.draws(),
        live = device.live_resources(),
        "headless run complete"
    );

    driver.shutdown();
}
