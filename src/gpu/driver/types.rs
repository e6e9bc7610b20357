use bitflags::bitflags;
pub use crate::utils::Handle;

#[cfg(feature = "recorder-serde")]
use serde::{Deserialize, Serialize};

/// How the texel components of a format are interpreted by the hardware.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    Uint,
    Sint,
    DepthComparison,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub enum Format {
    R8Unorm,
    R8Uint,
    R8Sint,
    RG8Unorm,
    RGBA8Unorm,
    RGBA8Uint,
    RGBA8Sint,
    BGRA8Unorm,
    RGBA16Float,
    RGBA32Float,
    R32Uint,
    Depth16Unorm,
    Depth32Float,
    Depth24PlusStencil8,
    Stencil8,
}

impl Format {
    pub fn component_type(self) -> ComponentType {
        match self {
            Format::R8Unorm
            | Format::RG8Unorm
            | Format::RGBA8Unorm
            | Format::BGRA8Unorm
            | Format::RGBA16Float
            | Format::RGBA32Float => ComponentType::Float,
            Format::R8Uint | Format::RGBA8Uint | Format::R32Uint | Format::Stencil8 => {
                ComponentType::Uint
            }
            Format::R8Sint | Format::RGBA8Sint => ComponentType::Sint,
            Format::Depth16Unorm | Format::Depth32Float | Format::Depth24PlusStencil8 => {
                ComponentType::DepthComparison
            }
        }
    }

    pub fn aspects(self) -> AspectMask {
        match self {
            Format::Depth16Unorm | Format::Depth32Float => AspectMask::DEPTH,
            Format::Depth24PlusStencil8 => AspectMask::DEPTH | AspectMask::STENCIL,
            Format::Stencil8 => AspectMask::STENCIL,
            _ => AspectMask::COLOR,
        }
    }

    pub fn is_color(self) -> bool {
        self.aspects() == AspectMask::COLOR
    }

    pub fn is_depth_stencil(self) -> bool {
        self.aspects()
            .intersects(AspectMask::DEPTH | AspectMask::STENCIL)
    }

    pub fn has_depth(self) -> bool {
        self.aspects().contains(AspectMask::DEPTH)
    }

    pub fn has_stencil(self) -> bool {
        self.aspects().contains(AspectMask::STENCIL)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub enum IndexType {
    U16,
    U32,
}

/// A single way a resource range is used by a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceUse {
    Sampled,
    UniformRead,
    StorageRead,
    StorageWrite,
    VertexInput,
    IndexInput,
    IndirectArgument,
    ColorAttachmentWrite,
    DepthStencilWrite,
    ResolveSource,
    ResolveDestination,
}

impl ResourceUse {
    pub const COUNT: usize = 11;
    pub const ALL: [ResourceUse; Self::COUNT] = [
        ResourceUse::Sampled,
        ResourceUse::UniformRead,
        ResourceUse::StorageRead,
        ResourceUse::StorageWrite,
        ResourceUse::VertexInput,
        ResourceUse::IndexInput,
        ResourceUse::IndirectArgument,
        ResourceUse::ColorAttachmentWrite,
        ResourceUse::DepthStencilWrite,
        ResourceUse::ResolveSource,
        ResourceUse::ResolveDestination,
    ];

    pub fn bits(self) -> UsageBits {
        match self {
            ResourceUse::Sampled => UsageBits::SAMPLED,
            ResourceUse::UniformRead => UsageBits::UNIFORM_READ,
            ResourceUse::StorageRead => UsageBits::STORAGE_READ,
            ResourceUse::StorageWrite => UsageBits::STORAGE_WRITE,
            ResourceUse::VertexInput => UsageBits::VERTEX_READ,
            ResourceUse::IndexInput => UsageBits::INDEX_READ,
            ResourceUse::IndirectArgument => UsageBits::INDIRECT_READ,
            ResourceUse::ColorAttachmentWrite => UsageBits::RT_WRITE,
            ResourceUse::DepthStencilWrite => UsageBits::DEPTH_WRITE,
            ResourceUse::ResolveSource => UsageBits::RESOLVE_SRC,
            ResourceUse::ResolveDestination => UsageBits::RESOLVE_DST,
        }
    }

    pub fn is_write(self) -> bool {
        UsageBits::WRITE.contains(self.bits())
    }
}

bitflags! {
    /// Set of [`ResourceUse`] kinds accumulated on one resource range.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UsageBits: u32 {
        const SAMPLED       = 0x1;
        const UNIFORM_READ  = 0x2;
        const STORAGE_READ  = 0x4;
        const STORAGE_WRITE = 0x8;
        const VERTEX_READ   = 0x10;
        const INDEX_READ    = 0x20;
        const INDIRECT_READ = 0x40;
        const RT_WRITE      = 0x80;
        const DEPTH_WRITE   = 0x100;
        const RESOLVE_SRC   = 0x200;
        const RESOLVE_DST   = 0x400;

        const READ = Self::SAMPLED.bits()
            | Self::UNIFORM_READ.bits()
            | Self::STORAGE_READ.bits()
            | Self::VERTEX_READ.bits()
            | Self::INDEX_READ.bits()
            | Self::INDIRECT_READ.bits()
            | Self::RESOLVE_SRC.bits();
        const WRITE = Self::STORAGE_WRITE.bits()
            | Self::RT_WRITE.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::RESOLVE_DST.bits();
    }
}

bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AspectMask: u8 {
        const COLOR   = 0x1;
        const DEPTH   = 0x2;
        const STENCIL = 0x4;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

bitflags! {
    /// Ways a buffer was allowed to be used when it was created.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX   = 0x1;
        const INDEX    = 0x2;
        const UNIFORM  = 0x4;
        const STORAGE  = 0x8;
        const INDIRECT = 0x10;
        const COPY_SRC = 0x20;
        const COPY_DST = 0x40;
    }
}

bitflags! {
    /// Ways a texture was allowed to be used when it was created.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const TEXTURE_BINDING   = 0x1;
        const STORAGE_BINDING   = 0x2;
        const RENDER_ATTACHMENT = 0x4;
        const COPY_SRC          = 0x8;
        const COPY_DST          = 0x10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_classes_partition_all_kinds() {
        assert!(UsageBits::READ.intersection(UsageBits::WRITE).is_empty());
        for usage in ResourceUse::ALL {
            let bits = usage.bits();
            assert_eq!(bits.bits().count_ones(), 1);
            assert!(UsageBits::READ.contains(bits) ^ UsageBits::WRITE.contains(bits));
        }
    }

    #[test]
    fn depth_formats_are_not_color() {
        assert!(Format::Depth24PlusStencil8.has_depth());
        assert!(Format::Depth24PlusStencil8.has_stencil());
        assert!(!Format::Depth32Float.has_stencil());
        assert!(!Format::Depth32Float.is_color());
        assert!(Format::RGBA8Uint.is_color());
        assert_eq!(
            Format::Depth16Unorm.component_type(),
            ComponentType::DepthComparison
        );
    }
}
