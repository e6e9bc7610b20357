use std::sync::Arc;

use log::{debug, warn};

use crate::gpu::backend::ResolvedRenderPass;
use crate::gpu::context::Context;
use crate::gpu::driver::command::{Draw, DrawIndexed, DrawIndirect};
use crate::gpu::driver::types::{IndexType, UsageBits};
use crate::gpu::error::ValidationError;
use crate::utils::Handle;
use crate::{BindGroup, Buffer, RenderPipeline};

use super::attachments::PassAttachments;
use super::bundle::RenderBundle;
use super::encoder::{CommandEncoder, RecordedPass};
use super::scope::RenderScope;

/// Attachment usages are charged to origin 0; pass commands count from 1.
const ATTACHMENT_ORIGIN: u32 = 0;

pub(crate) struct PassRecording<'a> {
    scope: RenderScope<'a>,
    pass: ResolvedRenderPass,
}

impl<'a> PassRecording<'a> {
    pub fn new(ctx: &'a Context, attachments: PassAttachments) -> Self {
        let mut scope = RenderScope::new(ctx, attachments.state, ATTACHMENT_ORIGIN + 1);
        for (texture, range, usage) in attachments.usages {
            scope
                .usage_mut()
                .add_texture_usage(texture, range, usage, ATTACHMENT_ORIGIN);
        }
        Self {
            scope,
            pass: attachments.pass,
        }
    }
}

/// Records one render pass into its parent [`CommandEncoder`].
pub struct RenderPassEncoder<'e, 'a> {
    encoder: &'e mut CommandEncoder<'a>,
    recording: Option<PassRecording<'a>>,
    ended: bool,
}

impl<'e, 'a> RenderPassEncoder<'e, 'a> {
    pub(super) fn new(
        encoder: &'e mut CommandEncoder<'a>,
        recording: Option<PassRecording<'a>>,
    ) -> Self {
        Self {
            encoder,
            recording,
            ended: false,
        }
    }

    fn record(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut RenderScope<'a>) -> Result<(), ValidationError>,
    ) {
        if self.ended {
            warn!("{what} recorded on an ended render pass");
            self.encoder
                .state
                .latch(Err(ValidationError::PassAlreadyEnded));
            return;
        }
        if !self.encoder.state.is_open() {
            return;
        }
        if let Some(recording) = self.recording.as_mut() {
            let result = f(&mut recording.scope);
            self.encoder.state.latch(result);
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

    /// Replays `bundles` in order. When the list is non-empty the pass is left with
    /// nothing bound afterwards.
    pub fn execute_bundles(&mut self, bundles: &[Arc<RenderBundle>]) {
        self.record("execute_bundles", |s| s.execute_bundles(bundles));
    }

    /// Checks the pass for hazards and hands it to the encoder.
    pub fn end(&mut self) {
        if self.ended {
            warn!("render pass ended twice");
            self.encoder
                .state
                .latch(Err(ValidationError::PassAlreadyEnded));
            return;
        }
        self.ended = true;
        self.encoder.pass_open = false;

        let Some(PassRecording { scope, mut pass }) = self.recording.take() else {
            return;
        };
        if !self.encoder.state.is_open() {
            return;
        }

        match scope.finish() {
            Ok(output) => {
                pass.has_uav_writes = output.usage.any_usage(UsageBits::STORAGE_WRITE);
                debug!(
                    "end render pass '{}' ({} commands)",
                    pass.label,
                    output.commands.len()
                );
                self.encoder.add_external_textures(&output.external_textures);
                self.encoder.passes.push(RecordedPass {
                    pass,
                    commands: output.commands,
                    usage: output.usage,
                });
            }
            Err(err) => self.encoder.state.latch(Err(err)),
        }
    }
}
