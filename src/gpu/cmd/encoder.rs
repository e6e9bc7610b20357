use log::{debug, warn};

use crate::gpu::backend::ResolvedRenderPass;
use crate::gpu::context::Context;
use crate::gpu::driver::command::{CommandList, CommandSink};
use crate::gpu::driver::state::UsageSummary;
use crate::gpu::error::ValidationError;
use crate::gpu::structs::RenderPassDescriptor;
use crate::gpu::Backend;
use crate::utils::Handle;
use crate::ExternalTexture;

use super::attachments::resolve_render_pass;
use super::pass::{PassRecording, RenderPassEncoder};
use super::scope::RecordingState;

/// A render pass as it was recorded, ready for backend translation and replay.
#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub pass: ResolvedRenderPass,
    pub commands: CommandList,
    pub usage: UsageSummary,
}

/// Finished output of a [`CommandEncoder`].
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    passes: Vec<RecordedPass>,
    external_textures: Vec<Handle<ExternalTexture>>,
}

impl CommandBuffer {
    pub fn passes(&self) -> &[RecordedPass] {
        &self.passes
    }

    /// External textures sampled anywhere in the buffer, checked again at submit.
    pub fn external_textures(&self) -> &[Handle<ExternalTexture>] {
        &self.external_textures
    }

    /// Native descriptors of every pass, in recording order.
    pub fn translate<B: Backend>(&self) -> Vec<B::RenderPass> {
        self.passes
            .iter()
            .map(|p| B::translate_render_pass(&p.pass))
            .collect()
    }

    /// Replays every pass into `sink`. Returns the number of commands delivered.
    pub fn append<S: CommandSink>(&self, sink: &mut S) -> usize {
        let mut cnt = 0;
        for pass in &self.passes {
            sink.begin_render_pass(&pass.pass);
            cnt += pass.commands.append(sink);
            sink.end_render_pass();
        }
        cnt
    }
}

/// Top-level recording context. Render passes borrow it and latch their errors
/// into it; [`finish`](Self::finish) reports the first one.
pub struct CommandEncoder<'a> {
    ctx: &'a Context,
    pub(super) state: RecordingState,
    pub(super) passes: Vec<RecordedPass>,
    pub(super) external_textures: Vec<Handle<ExternalTexture>>,
    pub(super) pass_open: bool,
}

impl<'a> CommandEncoder<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            state: RecordingState::Open,
            passes: Vec::new(),
            external_textures: Vec::new(),
            pass_open: false,
        }
    }

    pub fn state(&self) -> &RecordingState {
        &self.state
    }

    pub fn begin_render_pass<'e>(
        &'e mut self,
        desc: &RenderPassDescriptor,
    ) -> RenderPassEncoder<'e, 'a> {
        if self.state == RecordingState::Finished {
            warn!("render pass '{}' begun on a finished encoder", desc.debug_name);
        }
        self.pass_open = true;

        let recording = if self.state.is_open() {
            match resolve_render_pass(self.ctx, desc) {
                Ok(attachments) => {
                    debug!("begin render pass '{}'", desc.debug_name);
                    Some(PassRecording::new(self.ctx, attachments))
                }
                Err(err) => {
                    self.state.latch(Err(err));
                    None
                }
            }
        } else {
            None
        };

        RenderPassEncoder::new(self, recording)
    }

    /// Only the first call can succeed.
    pub fn finish(&mut self) -> Result<CommandBuffer, ValidationError> {
        let pass_open = self.pass_open;
        self.state.finish()?;
        if pass_open {
            return Err(ValidationError::PassNotEnded);
        }

        debug!("command encoder finished with {} passes", self.passes.len());
        Ok(CommandBuffer {
            passes: std::mem::take(&mut self.passes),
            external_textures: std::mem::take(&mut self.external_textures),
        })
    }
}

impl CommandEncoder<'_> {
    pub(super) fn add_external_textures(&mut self, textures: &[Handle<ExternalTexture>]) {
        for texture in textures {
            if !self.external_textures.contains(texture) {
                self.external_textures.push(*texture);
            }
        }
    }
}
