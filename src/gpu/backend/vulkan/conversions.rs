use ash::vk;

use crate::gpu::backend::ResolveMode;
use crate::gpu::driver::types::{ComponentType, Format};
use crate::{Color, LoadOp, StoreOp};

impl From<Format> for vk::Format {
    fn from(value: Format) -> Self {
        match value {
            Format::R8Unorm => vk::Format::R8_UNORM,
            Format::R8Uint => vk::Format::R8_UINT,
            Format::R8Sint => vk::Format::R8_SINT,
            Format::RG8Unorm => vk::Format::R8G8_UNORM,
            Format::RGBA8Unorm => vk::Format::R8G8B8A8_UNORM,
            Format::RGBA8Uint => vk::Format::R8G8B8A8_UINT,
            Format::RGBA8Sint => vk::Format::R8G8B8A8_SINT,
            Format::BGRA8Unorm => vk::Format::B8G8R8A8_UNORM,
            Format::RGBA16Float => vk::Format::R16G16B16A16_SFLOAT,
            Format::RGBA32Float => vk::Format::R32G32B32A32_SFLOAT,
            Format::R32Uint => vk::Format::R32_UINT,
            Format::Depth16Unorm => vk::Format::D16_UNORM,
            Format::Depth32Float => vk::Format::D32_SFLOAT,
            Format::Depth24PlusStencil8 => vk::Format::D24_UNORM_S8_UINT,
            Format::Stencil8 => vk::Format::S8_UINT,
        }
    }
}

impl From<ResolveMode> for vk::ResolveModeFlags {
    fn from(value: ResolveMode) -> Self {
        match value {
            ResolveMode::Average => vk::ResolveModeFlags::AVERAGE,
            ResolveMode::Max => vk::ResolveModeFlags::MAX,
        }
    }
}

impl<V> From<&LoadOp<V>> for vk::AttachmentLoadOp {
    fn from(value: &LoadOp<V>) -> Self {
        match value {
            LoadOp::Clear(_) => vk::AttachmentLoadOp::CLEAR,
            LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        }
    }
}

impl From<StoreOp> for vk::AttachmentStoreOp {
    fn from(value: StoreOp) -> Self {
        match value {
            StoreOp::Store => vk::AttachmentStoreOp::STORE,
            StoreOp::Discard => vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}

/// The clear union member is picked by how the format's texels are interpreted.
pub fn color_clear_value(color: &Color, format: Format) -> vk::ClearValue {
    let color = match format.component_type() {
        ComponentType::Float => vk::ClearColorValue {
            float32: [
                color.r as f32,
                color.g as f32,
                color.b as f32,
                color.a as f32,
            ],
        },
        ComponentType::Uint => vk::ClearColorValue {
            uint32: [
                color.r as u32,
                color.g as u32,
                color.b as u32,
                color.a as u32,
            ],
        },
        ComponentType::Sint => vk::ClearColorValue {
            int32: [
                color.r as i32,
                color.g as i32,
                color.b as i32,
                color.a as i32,
            ],
        },
        ComponentType::DepthComparison => {
            unreachable!("depth format {format:?} used as a color attachment")
        }
    };
    vk::ClearValue { color }
}

pub fn depth_stencil_clear_value(depth: f32, stencil: u32) -> vk::ClearValue {
    vk::ClearValue {
        depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
    }
}
