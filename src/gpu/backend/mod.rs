//! Backend-neutral description of a render pass and the per-backend translations of it.

pub mod d3d12;
#[cfg(feature = "recorder-vulkan")]
pub mod vulkan;

use crate::gpu::driver::types::{AspectMask, ComponentType, Format};
use crate::gpu::structs::{Color, Extent, NativeHandle, Operations, Texture};
use crate::gpu::driver::state::SubresourceRange;

/// How multisampled texels are reduced into the resolve destination.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    Average,
    Max,
}

/// Averaging is meaningless for integer texels, so those take the maximum sample.
///
/// # Panics
/// When handed a depth or stencil format. Only color attachments are ever resolved.
pub fn resolve_mode_for(format: Format) -> ResolveMode {
    assert!(
        format.is_color(),
        "non-color format {format:?} reached resolve mode selection"
    );
    match format.component_type() {
        ComponentType::Uint | ComponentType::Sint => ResolveMode::Max,
        ComponentType::Float => ResolveMode::Average,
        ComponentType::DepthComparison => {
            unreachable!("depth format {format:?} reached resolve mode selection")
        }
    }
}

/// Subresource index of the color plane at the base of `range`.
///
/// # Panics
/// When the texture is not a color texture.
pub fn color_subresource_index(texture: &Texture, range: &SubresourceRange) -> u32 {
    assert!(
        texture.format.aspects() == AspectMask::COLOR,
        "resolve destination must be a color texture"
    );
    texture.subresource_index(range.base_mip, range.base_layer, 0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveTarget {
    pub view: NativeHandle,
    pub texture: NativeHandle,
    pub format: Format,
    pub subresource: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedColorAttachment {
    pub view: NativeHandle,
    pub texture: NativeHandle,
    pub format: Format,
    pub ops: Operations<Color>,
    pub resolve: Option<ResolveTarget>,
}

/// `None` operations mean the aspect is not accessed by the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDepthStencil {
    pub view: NativeHandle,
    pub format: Format,
    pub depth_ops: Option<Operations<f32>>,
    pub stencil_ops: Option<Operations<u32>>,
}

/// A validated render pass with every view replaced by its native handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRenderPass {
    pub label: String,
    pub color_attachments: Vec<Option<ResolvedColorAttachment>>,
    pub depth_stencil: Option<ResolvedDepthStencil>,
    pub extent: Extent,
    pub sample_count: u32,
    /// Something in the pass writes a storage resource.
    pub has_uav_writes: bool,
}

impl ResolvedRenderPass {
    /// Highest populated color slot plus one. Trailing empty slots are never handed
    /// to a backend.
    pub fn color_attachment_count(&self) -> usize {
        self.color_attachments
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_formats_resolve_with_max() {
        assert_eq!(resolve_mode_for(Format::RGBA8Uint), ResolveMode::Max);
        assert_eq!(resolve_mode_for(Format::R8Sint), ResolveMode::Max);
        assert_eq!(resolve_mode_for(Format::RGBA8Unorm), ResolveMode::Average);
        assert_eq!(resolve_mode_for(Format::RGBA16Float), ResolveMode::Average);
    }

    #[test]
    fn depth_and_stencil_formats_never_resolve() {
        for format in [
            Format::Depth16Unorm,
            Format::Depth32Float,
            Format::Depth24PlusStencil8,
            Format::Stencil8,
        ] {
            let result = std::panic::catch_unwind(|| resolve_mode_for(format));
            assert!(result.is_err(), "{format:?} picked a resolve mode");
        }
    }

    #[test]
    fn trailing_empty_slots_are_trimmed() {
        let attachment = ResolvedColorAttachment {
            view: NativeHandle(1),
            texture: NativeHandle(2),
            format: Format::RGBA8Unorm,
            ops: Operations {
                load: crate::LoadOp::Load,
                store: crate::StoreOp::Store,
            },
            resolve: None,
        };
        let pass = ResolvedRenderPass {
            label: String::new(),
            color_attachments: vec![None, Some(attachment), None, None],
            depth_stencil: None,
            extent: Extent {
                width: 4,
                height: 4,
            },
            sample_count: 1,
            has_uav_writes: false,
        };
        assert_eq!(pass.color_attachment_count(), 2);
    }
}
