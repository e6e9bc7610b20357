use thiserror::Error;

use crate::gpu::compat::AttachmentMismatch;
use crate::gpu::driver::state::{ResourceId, SubresourceRange};
use crate::gpu::driver::types::{BufferUsage, Format, TextureUsage, UsageBits};
use crate::gpu::structs::{ColorSpace, TextureViewDimension};

/// Which attachment of a pass descriptor an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttachmentSlot {
    Color(usize),
    Resolve(usize),
    DepthStencil,
}

/// Everything a recording context can reject. Latched by the first failing
/// call and returned from `finish()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no pipeline is set")]
    MissingPipeline,
    #[error("bind group {index} is missing or does not match the pipeline layout")]
    MissingBindGroup { index: u32 },
    #[error("vertex buffer slot {slot} required by the pipeline is not set")]
    MissingVertexBuffer { slot: u32 },
    #[error("no index buffer is set")]
    MissingIndexBuffer,
    #[error("bind group index {index} exceeds the maximum of {max}")]
    BindGroupIndexOutOfRange { index: u32, max: u32 },
    #[error("vertex buffer slot {slot} exceeds the maximum of {max}")]
    VertexSlotOutOfRange { slot: u32, max: u32 },

    #[error("{context} is incompatible with the attachments being recorded: {mismatch}")]
    IncompatibleAttachments {
        context: &'static str,
        mismatch: AttachmentMismatch,
    },
    #[error("{count} color attachments exceed the maximum of {max}")]
    TooManyColorAttachments { count: usize, max: usize },
    #[error("at least one color or depth-stencil attachment is required")]
    NoAttachments,
    #[error("sample count {count} is not supported")]
    InvalidSampleCount { count: u32 },
    #[error("attachment {slot:?}: {reason}")]
    InvalidAttachment {
        slot: AttachmentSlot,
        reason: &'static str,
    },
    #[error("attachment {slot:?}: format {format:?} cannot be used there")]
    InvalidAttachmentFormat { slot: AttachmentSlot, format: Format },

    #[error("{resource} ({range:?}) has conflicting usages {usages:?}, introduced by command {command}")]
    ResourceConflict {
        resource: ResourceId,
        range: SubresourceRange,
        usages: UsageBits,
        command: u32,
    },
    #[error("{resource} lacks required buffer usage {required:?}")]
    MissingBufferUsage {
        resource: ResourceId,
        required: BufferUsage,
    },
    #[error("{resource} lacks required texture usage {required:?}")]
    MissingTextureUsage {
        resource: ResourceId,
        required: TextureUsage,
    },
    #[error("{kind} handle is invalid or was released")]
    InvalidHandle { kind: &'static str },

    #[error("bind group has {found} entries but its layout declares {expected}")]
    BindGroupEntryCount { expected: usize, found: usize },
    #[error("bind group entry {binding} does not match its layout")]
    BindGroupEntryMismatch { binding: u32 },

    #[error("the recording context was already finished")]
    AlreadyFinished,
    #[error("the render pass was already ended")]
    PassAlreadyEnded,
    #[error("a render pass was begun but never ended")]
    PassNotEnded,

    #[error("external texture plane {plane}: {reason}")]
    InvalidExternalTexturePlane { plane: usize, reason: &'static str },
    #[error("external texture plane view dimension {dimension:?} is not 2D")]
    ExternalTexturePlaneDimension {
        plane: usize,
        dimension: TextureViewDimension,
    },
    #[error("external texture format {format:?} is not supported for a single plane")]
    UnsupportedExternalTextureFormat { format: Format },
    #[error("bi-planar external texture plane {plane} format {found:?} is not {expected:?}")]
    BiplanarFormat {
        plane: usize,
        found: Format,
        expected: Format,
    },
    #[error("bi-planar external texture color space {found:?} is not {expected:?}")]
    ExternalTextureColorSpace {
        found: ColorSpace,
        expected: ColorSpace,
    },
    #[error("bi-planar external textures are disabled")]
    BiplanarDisallowed,
    #[error("destroyed external texture is used in a submit")]
    DestroyedExternalTexture,
}

#[derive(Debug, Error)]
pub enum GPUError {
    #[error("Ran out of slots!")]
    SlotError,
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[cfg(feature = "recorder-serde")]
    #[error(transparent)]
    Config(#[from] crate::gpu::cfg::ConfigError),
}

/// Convenient crate-wide result type.
pub type Result<T, E = GPUError> = std::result::Result<T, E>;
