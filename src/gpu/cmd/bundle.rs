use std::sync::Arc;

use log::{debug, warn};

use crate::gpu::compat::AttachmentState;
use crate::gpu::context::Context;
use crate::gpu::driver::command::{CommandList, Draw, DrawIndexed, DrawIndirect};
use crate::gpu::driver::state::UsageSummary;
use crate::gpu::driver::types::IndexType;
use crate::gpu::error::{AttachmentSlot, ValidationError};
use crate::gpu::structs::{RenderBundleEncoderDescriptor, MAX_COLOR_ATTACHMENTS};
use crate::utils::Handle;
use crate::{BindGroup, Buffer, ExternalTexture, RenderPipeline};

use super::scope::{RecordingState, RenderScope};

/// A finished, immutable sequence of draws that passes replay with
/// [`RenderPassEncoder::execute_bundles`](super::RenderPassEncoder::execute_bundles).
#[derive(Debug)]
pub struct RenderBundle {
    label: String,
    attachment_state: AttachmentState,
    commands: CommandList,
    usage: UsageSummary,
    external_textures: Vec<Handle<ExternalTexture>>,
}

impl RenderBundle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn attachment_state(&self) -> &AttachmentState {
        &self.attachment_state
    }

    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    /// Hazard-checked usages, merged into every pass that executes the bundle.
    pub fn usage(&self) -> &UsageSummary {
        &self.usage
    }

    pub fn external_textures(&self) -> &[Handle<ExternalTexture>] {
        &self.external_textures
    }
}

fn validate_descriptor(desc: &RenderBundleEncoderDescriptor) -> Result<(), ValidationError> {
    if desc.color_formats.len() > MAX_COLOR_ATTACHMENTS {
        return Err(ValidationError::TooManyColorAttachments {
            count: desc.color_formats.len(),
            max: MAX_COLOR_ATTACHMENTS,
        });
    }
    if desc.color_formats.iter().all(Option::is_none) && desc.depth_stencil_format.is_none() {
        return Err(ValidationError::NoAttachments);
    }
    for (index, format) in desc.color_formats.iter().enumerate() {
        if let Some(format) = format.filter(|f| !f.is_color()) {
            return Err(ValidationError::InvalidAttachmentFormat {
                slot: AttachmentSlot::Color(index),
                format,
            });
        }
    }
    if let Some(format) = desc.depth_stencil_format.filter(|f| !f.is_depth_stencil()) {
        return Err(ValidationError::InvalidAttachmentFormat {
            slot: AttachmentSlot::DepthStencil,
            format,
        });
    }
    if !matches!(desc.sample_count, 1 | 4) {
        return Err(ValidationError::InvalidSampleCount {
            count: desc.sample_count,
        });
    }
    Ok(())
}

/// Records a [`RenderBundle`]. Starts with nothing bound, whatever the pass it will
/// be executed in has bound.
pub struct RenderBundleEncoder<'a> {
    label: String,
    scope: Option<RenderScope<'a>>,
    state: RecordingState,
}

impl<'a> RenderBundleEncoder<'a> {
    pub(crate) fn new(ctx: &'a Context, desc: &RenderBundleEncoderDescriptor) -> Self {
        let mut state = RecordingState::Open;
        let scope = match validate_descriptor(desc) {
            Ok(()) => Some(RenderScope::new(
                ctx,
                AttachmentState::new(
                    &desc.color_formats,
                    desc.depth_stencil_format,
                    desc.sample_count,
                ),
                0,
            )),
            Err(err) => {
                state.latch(Err(err));
                None
            }
        };

        Self {
            label: desc.debug_name.clone(),
            scope,
            state,
        }
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    fn record(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut RenderScope<'a>) -> Result<(), ValidationError>,
    ) {
        if self.state == RecordingState::Finished {
            warn!("{what} recorded on finished render bundle '{}'", self.label);
            return;
        }
        if !self.state.is_open() {
            return;
        }
        if let Some(scope) = self.scope.as_mut() {
            let result = f(scope);
            self.state.latch(result);
        }
    }

    pub fn set_pipeline(&mut self, pipeline: Handle<RenderPipeline>) {
        self.record("set_pipeline", |s| s.set_pipeline(pipeline));
    }

    pub fn set_bind_group(&mut self, index: u32, group: Handle<BindGroup>) {
        self.record("set_bind_group", |s| s.set_bind_group(index, group));
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: Handle<Buffer>, offset: u64) {
        self.record("set_vertex_buffer", |s| {
            s.set_vertex_buffer(slot, buffer, offset)
        });
    }

    pub fn set_index_buffer(&mut self, buffer: Handle<Buffer>, format: IndexType, offset: u64) {
        self.record("set_index_buffer", |s| {
            s.set_index_buffer(buffer, format, offset)
        });
    }

    pub fn draw(&mut self, cmd: &Draw) {
        self.record("draw", |s| s.draw(cmd));
    }

    pub fn draw_indexed(&mut self, cmd: &DrawIndexed) {
        self.record("draw_indexed", |s| s.draw_indexed(cmd));
    }

    pub fn draw_indirect(&mut self, cmd: &DrawIndirect) {
        self.record("draw_indirect", |s| s.draw_indirect(cmd));
    }

    pub fn draw_indexed_indirect(&mut self, cmd: &DrawIndirect) {
        self.record("draw_indexed_indirect", |s| s.draw_indexed_indirect(cmd));
    }

    /// Freezes the bundle. Only the first call can succeed.
    pub fn finish(&mut self) -> Result<Arc<RenderBundle>, ValidationError> {
        self.state.finish()?;
        let scope = self.scope.take().ok_or(ValidationError::AlreadyFinished)?;
        let attachment_state = scope.attachment_state().clone();
        let output = scope.finish()?;

        debug!(
            "render bundle '{}' finished with {} commands",
            self.label,
            output.commands.len()
        );
        Ok(Arc::new(RenderBundle {
            label: self.label.clone(),
            attachment_state,
            commands: output.commands,
            usage: output.usage,
            external_textures: output.external_textures,
        }))
    }
}
