#![allow(dead_code)]

use gpu_recorder::gpu::driver::command::{SetBindGroup, SetIndexBuffer, SetVertexBuffer};
use gpu_recorder::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const TARGET_FORMAT: Format = Format::RGBA8Unorm;
pub const TARGET_SIZE: u32 = 400;

/// A context holding what a typical draw needs: two bind groups matching the
/// pipeline's layouts, two vertex buffers and an index buffer, plus a render
/// target. `storage` is bound as a writable storage buffer in group 1 and may
/// also be used as a vertex buffer to provoke hazards.
pub struct Fixture {
    pub ctx: Context,
    pub uniform: Handle<Buffer>,
    pub storage: Handle<Buffer>,
    pub vertex: Handle<Buffer>,
    pub index: Handle<Buffer>,
    pub indirect: Handle<Buffer>,
    pub layouts: [Handle<BindGroupLayout>; 2],
    pub groups: [Handle<BindGroup>; 2],
    pub pipeline: Handle<RenderPipeline>,
    pub target: Handle<Texture>,
    pub target_view: Handle<TextureView>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_info(&ContextInfo::default())
    }

    pub fn with_info(info: &ContextInfo) -> Self {
        init_logging();
        let mut ctx = Context::new(info);

        let uniform = ctx
            .make_buffer(&BufferInfo {
                debug_name: "uniforms",
                byte_size: 256,
                usage: BufferUsage::UNIFORM,
                ..Default::default()
            })
            .unwrap();
        let storage = ctx
            .make_buffer(&BufferInfo {
                debug_name: "storage",
                usage: BufferUsage::STORAGE | BufferUsage::VERTEX | BufferUsage::INDEX,
                ..Default::default()
            })
            .unwrap();
        let vertex = ctx
            .make_buffer(&BufferInfo {
                debug_name: "vertices",
                usage: BufferUsage::VERTEX,
                ..Default::default()
            })
            .unwrap();
        let index = ctx
            .make_buffer(&BufferInfo {
                debug_name: "indices",
                usage: BufferUsage::INDEX,
                ..Default::default()
            })
            .unwrap();
        let indirect = ctx
            .make_buffer(&BufferInfo {
                debug_name: "indirect",
                usage: BufferUsage::INDIRECT,
                ..Default::default()
            })
            .unwrap();

        let layout0 = ctx
            .make_bind_group_layout(&BindGroupLayoutInfo {
                debug_name: "layout0",
                entries: &[BindGroupLayoutEntry {
                    binding: 0,
                    ty: BindingType::UniformBuffer,
                }],
            })
            .unwrap();
        let layout1 = ctx
            .make_bind_group_layout(&BindGroupLayoutInfo {
                debug_name: "layout1",
                entries: &[
                    BindGroupLayoutEntry {
                        binding: 0,
                        ty: BindingType::UniformBuffer,
                    },
                    BindGroupLayoutEntry {
                        binding: 1,
                        ty: BindingType::StorageBuffer,
                    },
                ],
            })
            .unwrap();

        let group0 = ctx
            .make_bind_group(&BindGroupInfo {
                debug_name: "group0",
                layout: layout0,
                entries: &[BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::Buffer {
                        buffer: uniform,
                        offset: 0,
                        size: 256,
                    },
                }],
            })
            .unwrap();
        let group1 = ctx
            .make_bind_group(&BindGroupInfo {
                debug_name: "group1",
                layout: layout1,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::Buffer {
                            buffer: uniform,
                            offset: 0,
                            size: 256,
                        },
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Buffer {
                            buffer: storage,
                            offset: 0,
                            size: 1024,
                        },
                    },
                ],
            })
            .unwrap();

        let pipeline = ctx
            .make_render_pipeline(&RenderPipelineInfo {
                debug_name: "pipeline",
                bind_group_layouts: &[layout0, layout1],
                vertex_buffer_count: 2,
                color_formats: &[Some(TARGET_FORMAT)],
                ..Default::default()
            })
            .unwrap();

        let target = ctx
            .make_texture(&TextureInfo {
                debug_name: "target",
                dim: Extent {
                    width: TARGET_SIZE,
                    height: TARGET_SIZE,
                },
                format: TARGET_FORMAT,
                native: NativeHandle(0x100),
                ..Default::default()
            })
            .unwrap();
        let target_view = ctx
            .make_texture_view(&TextureViewInfo {
                debug_name: "target.view",
                texture: target,
                native: NativeHandle(0x101),
                ..Default::default()
            })
            .unwrap();

        Self {
            ctx,
            uniform,
            storage,
            vertex,
            index,
            indirect,
            layouts: [layout0, layout1],
            groups: [group0, group1],
            pipeline,
            target,
            target_view,
        }
    }

    pub fn color_attachments(&self) -> [Option<RenderPassColorAttachment>; 1] {
        [Some(RenderPassColorAttachment {
            view: self.target_view,
            resolve_target: None,
            ops: Operations {
                load: LoadOp::Clear(Color::TRANSPARENT),
                store: StoreOp::Store,
            },
        })]
    }

    pub fn bundle_desc(&self) -> RenderBundleEncoderDescriptor {
        RenderBundleEncoderDescriptor {
            debug_name: "bundle".to_string(),
            color_formats: vec![Some(TARGET_FORMAT)],
            ..Default::default()
        }
    }

    /// Records a fully bound draw into a bundle.
    pub fn bundle_with_draw(&self) -> std::sync::Arc<RenderBundle> {
        let mut bundle = self.ctx.create_render_bundle_encoder(&self.bundle_desc());
        self.bind_bundle(&mut bundle);
        bundle.draw(&Draw::default());
        bundle.finish().unwrap()
    }

    pub fn bind_bundle(&self, bundle: &mut RenderBundleEncoder) {
        bundle.set_pipeline(self.pipeline);
        bundle.set_bind_group(0, self.groups[0]);
        bundle.set_bind_group(1, self.groups[1]);
        bundle.set_vertex_buffer(0, self.vertex, 0);
        bundle.set_vertex_buffer(1, self.vertex, 0);
    }

    pub fn bind_pass(&self, pass: &mut RenderPassEncoder) {
        pass.set_pipeline(self.pipeline);
        pass.set_bind_group(0, self.groups[0]);
        pass.set_bind_group(1, self.groups[1]);
        pass.set_vertex_buffer(0, self.vertex, 0);
        pass.set_vertex_buffer(1, self.vertex, 0);
    }
}

/// Tallies what a replay delivers.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub passes: usize,
    pub pipelines: usize,
    pub bind_groups: usize,
    pub vertex_buffers: usize,
    pub index_buffers: usize,
    pub draws: usize,
    pub resets: usize,
    pub open: bool,
}

impl CommandSink for CountingSink {
    fn begin_render_pass(&mut self, _pass: &ResolvedRenderPass) {
        assert!(!self.open, "render passes do not nest");
        self.open = true;
        self.passes += 1;
    }

    fn end_render_pass(&mut self) {
        assert!(self.open);
        self.open = false;
    }

    fn set_pipeline(&mut self, _pipeline: Handle<RenderPipeline>) {
        self.pipelines += 1;
    }

    fn set_bind_group(&mut self, _cmd: &SetBindGroup) {
        self.bind_groups += 1;
    }

    fn set_vertex_buffer(&mut self, _cmd: &SetVertexBuffer) {
        self.vertex_buffers += 1;
    }

    fn set_index_buffer(&mut self, _cmd: &SetIndexBuffer) {
        self.index_buffers += 1;
    }

    fn draw(&mut self, _cmd: &Draw) {
        self.draws += 1;
    }

    fn draw_indexed(&mut self, _cmd: &DrawIndexed) {
        self.draws += 1;
    }

    fn draw_indirect(&mut self, _cmd: &DrawIndirect) {
        self.draws += 1;
    }

    fn draw_indexed_indirect(&mut self, _cmd: &DrawIndirect) {
        self.draws += 1;
    }

    fn reset_bindings(&mut self) {
        self.resets += 1;
    }
}
