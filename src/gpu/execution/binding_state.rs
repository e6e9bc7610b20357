use bitflags::bitflags;

use crate::gpu::context::Context;
use crate::gpu::error::ValidationError;
use crate::gpu::structs::{MAX_BIND_GROUPS, MAX_VERTEX_BUFFERS};
use crate::utils::Handle;
use crate::{BindGroup, Buffer, IndexType, RenderPipeline};

bitflags! {
    /// Parts of the binding state that are known to be valid for drawing.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ValidationAspects: u8 {
        const PIPELINE       = 0x1;
        const BIND_GROUPS    = 0x2;
        const VERTEX_BUFFERS = 0x4;
        const INDEX_BUFFER   = 0x8;
    }
}

impl ValidationAspects {
    pub const DRAW: Self = Self::PIPELINE
        .union(Self::BIND_GROUPS)
        .union(Self::VERTEX_BUFFERS);
    pub const DRAW_INDEXED: Self = Self::DRAW.union(Self::INDEX_BUFFER);
    /// Recomputed on demand once a pipeline is known.
    pub const LAZY: Self = Self::BIND_GROUPS.union(Self::VERTEX_BUFFERS);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundVertexBuffer {
    pub buffer: Handle<Buffer>,
    pub offset: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundIndexBuffer {
    pub buffer: Handle<Buffer>,
    pub format: IndexType,
    pub offset: u64,
}

/// Pipeline, bind groups and vertex/index buffers currently bound in one recording
/// scope. Pass and bundle encoders each own one; it is never shared.
#[derive(Debug, Default, Clone)]
pub struct BindingState {
    pipeline: Option<Handle<RenderPipeline>>,
    bind_groups: [Option<Handle<BindGroup>>; MAX_BIND_GROUPS],
    vertex_buffers: [Option<BoundVertexBuffer>; MAX_VERTEX_BUFFERS],
    index_buffer: Option<BoundIndexBuffer>,
    aspects: ValidationAspects,
}

impl BindingState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn pipeline(&self) -> Option<Handle<RenderPipeline>> {
        self.pipeline
    }

    pub fn bind_group(&self, index: u32) -> Option<Handle<BindGroup>> {
        self.bind_groups.get(index as usize).copied().flatten()
    }

    pub fn vertex_buffer(&self, slot: u32) -> Option<BoundVertexBuffer> {
        self.vertex_buffers.get(slot as usize).copied().flatten()
    }

    pub fn index_buffer(&self) -> Option<BoundIndexBuffer> {
        self.index_buffer
    }

    pub fn set_pipeline(&mut self, pipeline: Handle<RenderPipeline>) {
        self.pipeline = Some(pipeline);
        self.aspects.insert(ValidationAspects::PIPELINE);
        self.aspects.remove(ValidationAspects::LAZY);
    }

    pub fn set_bind_group(
        &mut self,
        index: u32,
        group: Handle<BindGroup>,
    ) -> Result<(), ValidationError> {
        let slot = self.bind_groups.get_mut(index as usize).ok_or(
            ValidationError::BindGroupIndexOutOfRange {
                index,
                max: MAX_BIND_GROUPS as u32,
            },
        )?;
        *slot = Some(group);
        self.aspects.remove(ValidationAspects::BIND_GROUPS);
        Ok(())
    }

    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: BoundVertexBuffer,
    ) -> Result<(), ValidationError> {
        let entry = self.vertex_buffers.get_mut(slot as usize).ok_or(
            ValidationError::VertexSlotOutOfRange {
                slot,
                max: MAX_VERTEX_BUFFERS as u32,
            },
        )?;
        *entry = Some(buffer);
        self.aspects.remove(ValidationAspects::VERTEX_BUFFERS);
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: BoundIndexBuffer) {
        self.index_buffer = Some(buffer);
        self.aspects.insert(ValidationAspects::INDEX_BUFFER);
    }

    /// Forgets every binding, as if nothing had ever been set.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn validate_draw(&mut self, ctx: &Context) -> Result<(), ValidationError> {
        self.validate(ctx, ValidationAspects::DRAW)
    }

    pub fn validate_draw_indexed(&mut self, ctx: &Context) -> Result<(), ValidationError> {
        self.validate(ctx, ValidationAspects::DRAW_INDEXED)
    }

    fn validate(
        &mut self,
        ctx: &Context,
        required: ValidationAspects,
    ) -> Result<(), ValidationError> {
        let missing = required - self.aspects;
        if missing.is_empty() {
            return Ok(());
        }

        // Lazy aspects can only be recomputed against a pipeline.
        let eager = missing - ValidationAspects::LAZY;
        if !eager.is_empty() {
            return Err(self.aspect_error(ctx, eager));
        }

        self.recompute_lazy_aspects(ctx, missing);

        let missing = required - self.aspects;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.aspect_error(ctx, missing))
        }
    }

    fn recompute_lazy_aspects(&mut self, ctx: &Context, aspects: ValidationAspects) {
        let Some(pipeline) = self.pipeline.and_then(|p| ctx.render_pipeline(p).ok()) else {
            return;
        };

        if aspects.contains(ValidationAspects::BIND_GROUPS)
            && self.first_mismatched_bind_group(ctx, pipeline).is_none()
        {
            self.aspects.insert(ValidationAspects::BIND_GROUPS);
        }

        if aspects.contains(ValidationAspects::VERTEX_BUFFERS)
            && self.first_missing_vertex_slot(pipeline).is_none()
        {
            self.aspects.insert(ValidationAspects::VERTEX_BUFFERS);
        }
    }

    fn first_mismatched_bind_group(&self, ctx: &Context, pipeline: &RenderPipeline) -> Option<u32> {
        pipeline
            .bind_group_layouts
            .iter()
            .enumerate()
            .find(|(index, layout)| {
                let bound = self.bind_groups[*index].and_then(|g| ctx.bind_group(g).ok());
                bound.map(|g| g.layout != **layout).unwrap_or(true)
            })
            .map(|(index, _)| index as u32)
    }

    fn first_missing_vertex_slot(&self, pipeline: &RenderPipeline) -> Option<u32> {
        (0..pipeline.vertex_buffer_count).find(|slot| self.vertex_buffers[*slot as usize].is_none())
    }

    /// Missing index buffer wins over vertex buffers, then bind groups, then the pipeline.
    fn aspect_error(&self, ctx: &Context, missing: ValidationAspects) -> ValidationError {
        let pipeline = self.pipeline.and_then(|p| ctx.render_pipeline(p).ok());

        if missing.contains(ValidationAspects::INDEX_BUFFER) {
            return ValidationError::MissingIndexBuffer;
        }

        if missing.contains(ValidationAspects::VERTEX_BUFFERS) {
            if let Some(slot) = pipeline.and_then(|p| self.first_missing_vertex_slot(p)) {
                return ValidationError::MissingVertexBuffer { slot };
            }
        }

        if missing.contains(ValidationAspects::BIND_GROUPS) {
            if let Some(index) = pipeline.and_then(|p| self.first_mismatched_bind_group(ctx, p)) {
                return ValidationError::MissingBindGroup { index };
            }
        }

        ValidationError::MissingPipeline
    }
}
