use std::sync::Arc;

use log::{debug, trace};

use crate::gpu::compat::AttachmentState;
use crate::gpu::context::Context;
use crate::gpu::driver::command::{
    Command, CommandList, Draw, DrawIndexed, DrawIndirect, SetBindGroup, SetIndexBuffer,
    SetVertexBuffer,
};
use crate::gpu::driver::state::{ResourceId, UsageSummary, UsageTracker};
use crate::gpu::driver::types::{BufferUsage, IndexType, ResourceUse};
use crate::gpu::error::ValidationError;
use crate::gpu::execution::{BindingState, BoundIndexBuffer, BoundVertexBuffer};
use crate::gpu::structs::BoundResource;
use crate::utils::Handle;
use crate::{BindGroup, Buffer, ExternalTexture, RenderPipeline};

use super::RenderBundle;

/// Lifecycle of a recording context. The first error is kept until `finish`.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    Open,
    Error(ValidationError),
    Finished,
}

impl RecordingState {
    pub fn is_open(&self) -> bool {
        matches!(self, RecordingState::Open)
    }

    /// Keeps the first failure; later ones are consequences of it.
    pub(crate) fn latch(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            if self.is_open() {
                debug!("recording error latched: {err}");
                *self = RecordingState::Error(err);
            }
        }
    }

    /// Moves to `Finished`, yielding the latched error if any.
    pub(crate) fn finish(&mut self) -> Result<(), ValidationError> {
        match std::mem::replace(self, RecordingState::Finished) {
            RecordingState::Open => Ok(()),
            RecordingState::Error(err) => Err(err),
            RecordingState::Finished => Err(ValidationError::AlreadyFinished),
        }
    }
}

/// What a finished scope leaves behind.
pub(crate) struct ScopeOutput {
    pub commands: CommandList,
    pub usage: UsageSummary,
    pub external_textures: Vec<Handle<ExternalTexture>>,
}

/// Bindings, usages and commands of one pass or bundle.
pub(crate) struct RenderScope<'a> {
    ctx: &'a Context,
    attachment_state: AttachmentState,
    bindings: BindingState,
    usage: UsageTracker,
    commands: CommandList,
    external_textures: Vec<Handle<ExternalTexture>>,
    /// Origin of the first command. Passes reserve 0 for their attachments.
    origin_base: u32,
}

fn require_buffer_usage(
    ctx: &Context,
    buffer: Handle<Buffer>,
    required: BufferUsage,
) -> Result<(), ValidationError> {
    if ctx.buffer(buffer)?.usage.contains(required) {
        Ok(())
    } else {
        Err(ValidationError::MissingBufferUsage {
            resource: ResourceId::Buffer(buffer),
            required,
        })
    }
}

impl<'a> RenderScope<'a> {
    pub fn new(ctx: &'a Context, attachment_state: AttachmentState, origin_base: u32) -> Self {
        Self {
            ctx,
            attachment_state,
            bindings: BindingState::new(),
            usage: UsageTracker::new(),
            commands: CommandList::new(),
            external_textures: Vec::new(),
            origin_base,
        }
    }

    pub fn attachment_state(&self) -> &AttachmentState {
        &self.attachment_state
    }

    pub fn usage_mut(&mut self) -> &mut UsageTracker {
        &mut self.usage
    }

    fn next_origin(&self) -> u32 {
        self.origin_base + self.commands.len() as u32
    }

    fn record(&mut self, cmd: Command) {
        trace!("#{} {:?}", self.next_origin(), cmd.op());
        self.commands.push(cmd);
    }

    fn note_external_texture(&mut self, texture: Handle<ExternalTexture>) {
        if !self.external_textures.contains(&texture) {
            self.external_textures.push(texture);
        }
    }

    pub fn set_pipeline(&mut self, pipeline: Handle<RenderPipeline>) -> Result<(), ValidationError> {
        let info = self.ctx.render_pipeline(pipeline)?;
        self.attachment_state
            .check_compatible(&info.attachment_state, "pipeline")?;
        self.bindings.set_pipeline(pipeline);
        self.record(Command::SetPipeline(pipeline));
        Ok(())
    }

    pub fn set_bind_group(&mut self, index: u32, group: Handle<BindGroup>) -> Result<(), ValidationError> {
        self.ctx.bind_group(group)?;
        self.bindings.set_bind_group(index, group)?;
        self.record(Command::SetBindGroup(SetBindGroup { index, group }));
        Ok(())
    }

    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: Handle<Buffer>,
        offset: u64,
    ) -> Result<(), ValidationError> {
        require_buffer_usage(self.ctx, buffer, BufferUsage::VERTEX)?;
        self.bindings
            .set_vertex_buffer(slot, BoundVertexBuffer { buffer, offset })?;
        self.record(Command::SetVertexBuffer(SetVertexBuffer {
            slot,
            buffer,
            offset,
        }));
        Ok(())
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: Handle<Buffer>,
        format: IndexType,
        offset: u64,
    ) -> Result<(), ValidationError> {
        require_buffer_usage(self.ctx, buffer, BufferUsage::INDEX)?;
        self.bindings.set_index_buffer(BoundIndexBuffer {
            buffer,
            format,
            offset,
        });
        self.record(Command::SetIndexBuffer(SetIndexBuffer {
            buffer,
            format,
            offset,
        }));
        Ok(())
    }

    pub fn draw(&mut self, cmd: &Draw) -> Result<(), ValidationError> {
        self.bindings.validate_draw(self.ctx)?;
        self.add_draw_usages(false, None)?;
        self.record(Command::Draw(*cmd));
        Ok(())
    }

    pub fn draw_indexed(&mut self, cmd: &DrawIndexed) -> Result<(), ValidationError> {
        self.bindings.validate_draw_indexed(self.ctx)?;
        self.add_draw_usages(true, None)?;
        self.record(Command::DrawIndexed(*cmd));
        Ok(())
    }

    pub fn draw_indirect(&mut self, cmd: &DrawIndirect) -> Result<(), ValidationError> {
        require_buffer_usage(self.ctx, cmd.buffer, BufferUsage::INDIRECT)?;
        self.bindings.validate_draw(self.ctx)?;
        self.add_draw_usages(false, Some(cmd.buffer))?;
        self.record(Command::DrawIndirect(*cmd));
        Ok(())
    }

    pub fn draw_indexed_indirect(&mut self, cmd: &DrawIndirect) -> Result<(), ValidationError> {
        require_buffer_usage(self.ctx, cmd.buffer, BufferUsage::INDIRECT)?;
        self.bindings.validate_draw_indexed(self.ctx)?;
        self.add_draw_usages(true, Some(cmd.buffer))?;
        self.record(Command::DrawIndexedIndirect(*cmd));
        Ok(())
    }

    /// Only the bindings the current pipeline reads are charged to the draw.
    fn add_draw_usages(
        &mut self,
        indexed: bool,
        indirect: Option<Handle<Buffer>>,
    ) -> Result<(), ValidationError> {
        let ctx = self.ctx;
        let origin = self.next_origin();
        let pipeline = self
            .bindings
            .pipeline()
            .ok_or(ValidationError::MissingPipeline)?;
        let pipeline = ctx.render_pipeline(pipeline)?;

        for index in 0..pipeline.bind_group_layouts.len() as u32 {
            let Some(group) = self.bindings.bind_group(index) else {
                continue;
            };
            let group = ctx.bind_group(group)?;
            for resource in &group.resources {
                match *resource {
                    BoundResource::Buffer { buffer, usage } => {
                        self.usage.add_buffer_usage(buffer, usage, origin)
                    }
                    BoundResource::Texture {
                        texture,
                        range,
                        usage,
                    } => self.usage.add_texture_usage(texture, range, usage, origin),
                }
            }
            for external in &group.external_textures {
                self.note_external_texture(*external);
            }
        }

        for slot in 0..pipeline.vertex_buffer_count {
            if let Some(bound) = self.bindings.vertex_buffer(slot) {
                self.usage
                    .add_buffer_usage(bound.buffer, ResourceUse::VertexInput, origin);
            }
        }

        if indexed {
            if let Some(bound) = self.bindings.index_buffer() {
                self.usage
                    .add_buffer_usage(bound.buffer, ResourceUse::IndexInput, origin);
            }
        }

        if let Some(buffer) = indirect {
            self.usage
                .add_buffer_usage(buffer, ResourceUse::IndirectArgument, origin);
        }

        Ok(())
    }

    /// Merges each bundle's frozen usages, then forgets every binding if any bundle ran.
    pub fn execute_bundles(&mut self, bundles: &[Arc<RenderBundle>]) -> Result<(), ValidationError> {
        for bundle in bundles {
            self.attachment_state
                .check_compatible(bundle.attachment_state(), "render bundle")?;
        }

        let origin = self.next_origin();
        for bundle in bundles {
            self.usage.merge(bundle.usage(), origin);
            for external in bundle.external_textures() {
                self.note_external_texture(*external);
            }
        }

        self.record(Command::ExecuteBundles(bundles.to_vec()));
        if !bundles.is_empty() {
            self.bindings.clear();
        }
        Ok(())
    }

    /// Runs hazard detection over everything recorded in the scope.
    pub fn finish(self) -> Result<ScopeOutput, ValidationError> {
        let usage = self.usage.finalize()?;
        Ok(ScopeOutput {
            commands: self.commands,
            usage,
            external_textures: self.external_textures,
        })
    }
}
