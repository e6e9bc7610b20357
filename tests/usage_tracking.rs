mod common;

use common::{Fixture, TARGET_FORMAT};
use gpu_recorder::*;

fn pass_desc<'a>(colors: &'a [Option<RenderPassColorAttachment>]) -> RenderPassDescriptor<'a> {
    RenderPassDescriptor {
        debug_name: "usage",
        color_attachments: colors,
        depth_stencil_attachment: None,
    }
}

fn storage_conflict(f: &Fixture, result: Result<CommandBuffer, ValidationError>) {
    match result {
        Err(ValidationError::ResourceConflict {
            resource, usages, ..
        }) => {
            assert_eq!(resource, ResourceId::Buffer(f.storage));
            assert!(usages.contains(UsageBits::STORAGE_WRITE));
            assert!(usages.contains(UsageBits::VERTEX_READ));
        }
        other => panic!("expected a storage buffer conflict, got {other:?}"),
    }
}

/// Binds `storage` as vertex buffer 1 and draws, while group 1 writes it.
fn bundle_with_storage_as_vertex(f: &Fixture) -> RenderBundleEncoder<'_> {
    let mut bundle = f.ctx.create_render_bundle_encoder(&f.bundle_desc());
    f.bind_bundle(&mut bundle);
    bundle.set_vertex_buffer(1, f.storage, 0);
    bundle.draw(&Draw::default());
    bundle
}

#[test]
fn conflict_inside_a_bundle() {
    let f = Fixture::new();
    let mut bundle = bundle_with_storage_as_vertex(&f);
    match bundle.finish() {
        Err(ValidationError::ResourceConflict {
            resource, command, ..
        }) => {
            assert_eq!(resource, ResourceId::Buffer(f.storage));
            // Both usages come from the draw, the seventh command of the bundle.
            assert_eq!(command, 6);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn vertex_only_usage_is_not_a_conflict_until_drawn() {
    let f = Fixture::new();
    let mut bundle = f.ctx.create_render_bundle_encoder(&f.bundle_desc());
    f.bind_bundle(&mut bundle);
    bundle.set_vertex_buffer(1, f.storage, 0);
    // Rebinding the slot before the draw leaves only the storage write.
    bundle.set_vertex_buffer(1, f.vertex, 0);
    bundle.draw(&Draw::default());
    assert!(bundle.finish().is_ok());
}

/// A pipeline that only uses group 0, so `storage` is never written by its draws.
fn reader_pipeline(f: &mut Fixture) -> Handle<RenderPipeline> {
    f.ctx
        .make_render_pipeline(&RenderPipelineInfo {
            debug_name: "reader",
            bind_group_layouts: &[f.layouts[0]],
            vertex_buffer_count: 2,
            color_formats: &[Some(TARGET_FORMAT)],
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn conflict_between_bundle_and_pass_is_symmetric() {
    let mut f = Fixture::new();
    let reader = reader_pipeline(&mut f);
    let colors = f.color_attachments();

    // The bundle writes `storage` through group 1.
    let writer = f.bundle_with_draw();

    // The pass reads it as a vertex buffer after executing the bundle.
    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.execute_bundles(&[writer.clone()]);
    pass.set_pipeline(reader);
    pass.set_bind_group(0, f.groups[0]);
    pass.set_vertex_buffer(0, f.storage, 0);
    pass.set_vertex_buffer(1, f.vertex, 0);
    pass.draw(&Draw::default());
    pass.end();
    storage_conflict(&f, encoder.finish());

    // And the other way around.
    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.set_pipeline(reader);
    pass.set_bind_group(0, f.groups[0]);
    pass.set_vertex_buffer(0, f.storage, 0);
    pass.set_vertex_buffer(1, f.vertex, 0);
    pass.draw(&Draw::default());
    pass.execute_bundles(&[writer]);
    pass.end();
    storage_conflict(&f, encoder.finish());
}

#[test]
fn conflict_across_two_bundles() {
    let mut f = Fixture::new();
    let read_only = reader_pipeline(&mut f);
    let writer = f.bundle_with_draw();

    let mut reader = f.ctx.create_render_bundle_encoder(&f.bundle_desc());
    reader.set_pipeline(read_only);
    reader.set_bind_group(0, f.groups[0]);
    reader.set_vertex_buffer(0, f.vertex, 0);
    reader.set_vertex_buffer(1, f.vertex, 0);
    reader.set_index_buffer(f.storage, IndexType::U32, 0);
    reader.draw_indexed(&DrawIndexed::default());
    let reader = reader.finish().unwrap();
    assert_eq!(
        reader.usage().classify(ResourceId::Buffer(f.storage)),
        Some(UsageClass::Read)
    );

    let colors = f.color_attachments();

    // Each bundle alone is fine, and so is executing the writer repeatedly.
    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.execute_bundles(&[writer.clone(), writer.clone()]);
    pass.end();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.execute_bundles(&[reader.clone()]);
    pass.end();
    assert!(encoder.finish().is_ok());

    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.execute_bundles(&[writer, reader]);
    pass.end();
    match encoder.finish() {
        Err(ValidationError::ResourceConflict {
            resource, usages, ..
        }) => {
            assert_eq!(resource, ResourceId::Buffer(f.storage));
            assert_eq!(usages, UsageBits::STORAGE_WRITE | UsageBits::INDEX_READ);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn separate_passes_do_not_conflict() {
    let f = Fixture::new();
    let colors = f.color_attachments();
    let writer = f.bundle_with_draw();

    let mut encoder = f.ctx.create_command_encoder();
    {
        let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
        pass.execute_bundles(&[writer]);
        pass.end();
    }
    {
        let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
        pass.set_pipeline(f.pipeline);
        pass.set_bind_group(0, f.groups[0]);
        pass.set_bind_group(1, f.groups[0]);
        pass.set_vertex_buffer(0, f.storage, 0);
        pass.set_vertex_buffer(1, f.vertex, 0);
        pass.end();
    }
    let buffer = encoder.finish().unwrap();
    assert_eq!(buffer.passes().len(), 2);

    let first = &buffer.passes()[0].usage;
    let second = &buffer.passes()[1].usage;
    assert_eq!(
        first.classify(ResourceId::Buffer(f.storage)),
        Some(UsageClass::Write)
    );
    // Nothing was drawn in the second pass, so nothing was charged.
    assert_eq!(second.classify(ResourceId::Buffer(f.storage)), None);
    assert_eq!(
        second.classify(ResourceId::Texture(f.target)),
        Some(UsageClass::Write)
    );
}

#[test]
fn sampling_the_render_target_conflicts_with_the_attachment() {
    let mut f = Fixture::new();
    let layout = f
        .ctx
        .make_bind_group_layout(&BindGroupLayoutInfo {
            debug_name: "sampled",
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                ty: BindingType::SampledTexture,
            }],
        })
        .unwrap();
    let group = f
        .ctx
        .make_bind_group(&BindGroupInfo {
            debug_name: "sampled.group",
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(f.target_view),
            }],
        })
        .unwrap();
    let pipeline = f
        .ctx
        .make_render_pipeline(&RenderPipelineInfo {
            debug_name: "sampler",
            bind_group_layouts: &[layout],
            color_formats: &[Some(TARGET_FORMAT)],
            ..Default::default()
        })
        .unwrap();

    let colors = f.color_attachments();
    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, group);
    pass.draw(&Draw::default());
    pass.end();

    match encoder.finish() {
        Err(ValidationError::ResourceConflict {
            resource,
            usages,
            command,
            ..
        }) => {
            assert_eq!(resource, ResourceId::Texture(f.target));
            assert_eq!(usages, UsageBits::RT_WRITE | UsageBits::SAMPLED);
            // Attachments are command 0; the draw is the third recorded command.
            assert_eq!(command, 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn storage_writes_set_the_uav_flag() {
    let f = Fixture::new();
    let colors = f.color_attachments();

    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    f.bind_pass(&mut pass);
    pass.draw(&Draw::default());
    pass.end();
    let mut pass = encoder.begin_render_pass(&pass_desc(&colors));
    pass.end();
    let buffer = encoder.finish().unwrap();

    assert!(buffer.passes()[0].pass.has_uav_writes);
    assert!(!buffer.passes()[1].pass.has_uav_writes);
}

#[test]
fn encoders_record_concurrently() {
    let f = Fixture::new();
    let bundle = f.bundle_with_draw();
    let colors = f.color_attachments();

    let buffers: Vec<CommandBuffer> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (f, bundle, colors) = (&f, bundle.clone(), &colors);
                s.spawn(move || {
                    let mut encoder = f.ctx.create_command_encoder();
                    let mut pass = encoder.begin_render_pass(&pass_desc(colors));
                    pass.execute_bundles(&[bundle]);
                    pass.end();
                    encoder.finish().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(buffers.len(), 4);
    f.ctx.submit(&buffers).unwrap();
}
