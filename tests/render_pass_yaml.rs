#![cfg(feature = "recorder-serde")]

mod common;

use common::{Fixture, TARGET_FORMAT};
use gpu_recorder::*;

const BUNDLE_YAML: &str = r#"
debug_name: "scene.opaque"
color_formats: [RGBA8Unorm]
"#;

const OPS_YAML: &str = r#"
colors:
  - load: { clear: { r: 0.2, g: 0.3, b: 0.4, a: 1.0 } }
    store: Store
"#;

#[test]
fn bundle_encoder_from_yaml_executes_in_a_matching_pass() {
    common::init_logging();
    let f = Fixture::new();

    let mut bundle = f.ctx.create_render_bundle_encoder_from_yaml(BUNDLE_YAML).unwrap();
    f.bind_bundle(&mut bundle);
    bundle.draw(&Draw::default());
    let bundle = bundle.finish().unwrap();
    assert_eq!(bundle.label(), "scene.opaque");
    assert_eq!(
        bundle.attachment_state(),
        &AttachmentState::new(&[Some(TARGET_FORMAT)], None, 1)
    );

    let ops = AttachmentOpsCfg::from_yaml(OPS_YAML).unwrap();
    let colors = ops
        .color_attachments(&[Some((f.target_view, None))])
        .unwrap();
    assert_eq!(
        colors[0].map(|c| c.ops.load),
        Some(LoadOp::Clear(Color {
            r: 0.2,
            g: 0.3,
            b: 0.4,
            a: 1.0
        }))
    );
    assert!(ops.depth_stencil_attachment(f.target_view).is_none());

    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
        debug_name: "yaml",
        color_attachments: &colors,
        depth_stencil_attachment: None,
    });
    pass.execute_bundles(&[bundle]);
    pass.end();
    let buffer = encoder.finish().unwrap();
    assert_eq!(buffer.passes().len(), 1);
}

#[test]
fn yaml_bundle_layout_is_still_checked_against_the_pass() {
    let f = Fixture::new();
    let mut bundle = f
        .ctx
        .create_render_bundle_encoder_from_yaml("color_formats: [RGBA8Unorm, ~]\nsample_count: 1")
        .unwrap();
    // Left empty: the fixture pipeline only has one color slot.
    let bundle = bundle.finish().unwrap();

    let colors = f.color_attachments();
    let mut encoder = f.ctx.create_command_encoder();
    let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
        color_attachments: &colors,
        ..Default::default()
    });
    pass.execute_bundles(&[bundle]);
    pass.end();
    assert!(matches!(
        encoder.finish(),
        Err(ValidationError::IncompatibleAttachments {
            context: "render bundle",
            mismatch: AttachmentMismatch::ColorCount {
                expected: 1,
                found: 2
            },
        })
    ));
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let f = Fixture::new();
    let result = f
        .ctx
        .create_render_bundle_encoder_from_yaml("color_formats: [NotAFormat]");
    assert!(matches!(
        result,
        Err(GPUError::Config(ConfigError::Yaml(_)))
    ));
}

#[test]
fn several_bundle_layouts_in_one_document() {
    let cfgs = RenderBundleCfg::vec_from_yaml(
        r#"
- debug_name: "shadow"
  depth_stencil_format: Depth32Float
- debug_name: "hud"
  color_formats: [BGRA8Unorm]
  sample_count: 4
"#,
    )
    .unwrap();
    assert_eq!(cfgs.len(), 2);

    let shadow = RenderBundleEncoderDescriptor::from(&cfgs[0]);
    assert!(shadow.color_formats.is_empty());
    assert_eq!(shadow.depth_stencil_format, Some(Format::Depth32Float));
    assert_eq!(shadow.sample_count, 1);

    let hud = cfgs[1].descriptor();
    assert_eq!(hud.color_formats, vec![Some(Format::BGRA8Unorm)]);
    assert_eq!(hud.sample_count, 4);
}

#[test]
fn missing_file_reports_the_path() {
    let f = Fixture::new();
    let path = "does/not/exist/bundle.yaml";
    let err = match f.ctx.create_render_bundle_encoder_from_yaml_file(path) {
        Ok(_) => panic!("loading {path} should fail"),
        Err(err) => err,
    };
    assert!(format!("{err:#}").contains(path));

    let err = AttachmentOpsCfg::from_yaml_file(path).unwrap_err();
    assert!(err.to_string().contains(path));
}
