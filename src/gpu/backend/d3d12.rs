//! Direct3D 12 render pass descriptors.
//!
//! The types mirror `D3D12_RENDER_PASS_*` one for one so they can be handed to
//! `ID3D12GraphicsCommandList4::BeginRenderPass` by whoever owns the device.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use super::{resolve_mode_for, ResolveMode, ResolveTarget, ResolvedRenderPass};
use crate::gpu::driver::types::Format;
use crate::gpu::structs::{Color, LoadOp, StoreOp, MAX_COLOR_ATTACHMENTS};
use crate::gpu::Backend;

/// `DXGI_FORMAT`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DxgiFormat(pub u32);

impl DxgiFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R32G32B32A32_FLOAT: Self = Self(2);
    pub const R16G16B16A16_FLOAT: Self = Self(10);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UINT: Self = Self(30);
    pub const R8G8B8A8_SINT: Self = Self(32);
    pub const D32_FLOAT: Self = Self(40);
    pub const R32_UINT: Self = Self(42);
    pub const D24_UNORM_S8_UINT: Self = Self(45);
    pub const R8G8_UNORM: Self = Self(49);
    pub const D16_UNORM: Self = Self(55);
    pub const R8_UNORM: Self = Self(61);
    pub const R8_UINT: Self = Self(62);
    pub const R8_SINT: Self = Self(64);
    pub const B8G8R8A8_UNORM: Self = Self(87);
}

impl From<Format> for DxgiFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::R8Unorm => DxgiFormat::R8_UNORM,
            Format::R8Uint => DxgiFormat::R8_UINT,
            Format::R8Sint => DxgiFormat::R8_SINT,
            Format::RG8Unorm => DxgiFormat::R8G8_UNORM,
            Format::RGBA8Unorm => DxgiFormat::R8G8B8A8_UNORM,
            Format::RGBA8Uint => DxgiFormat::R8G8B8A8_UINT,
            Format::RGBA8Sint => DxgiFormat::R8G8B8A8_SINT,
            Format::BGRA8Unorm => DxgiFormat::B8G8R8A8_UNORM,
            Format::RGBA16Float => DxgiFormat::R16G16B16A16_FLOAT,
            Format::RGBA32Float => DxgiFormat::R32G32B32A32_FLOAT,
            Format::R32Uint => DxgiFormat::R32_UINT,
            Format::Depth16Unorm => DxgiFormat::D16_UNORM,
            Format::Depth32Float => DxgiFormat::D32_FLOAT,
            // Stencil-only textures are backed by a combined depth-stencil resource.
            Format::Depth24PlusStencil8 | Format::Stencil8 => DxgiFormat::D24_UNORM_S8_UINT,
        }
    }
}

/// `D3D12_CPU_DESCRIPTOR_HANDLE`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct CpuDescriptorHandle {
    pub ptr: u64,
}

/// Descriptor used for empty color slots below the highest populated one.
pub const NULL_RTV: CpuDescriptorHandle = CpuDescriptorHandle { ptr: 0 };

/// `ID3D12Resource*`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct ResourcePtr(pub u64);

#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BeginningAccessType {
    #[default]
    Discard = 0,
    Preserve = 1,
    Clear = 2,
    NoAccess = 3,
}

#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum EndingAccessType {
    #[default]
    Discard = 0,
    Preserve = 1,
    Resolve = 2,
    NoAccess = 3,
}

/// `D3D12_RESOLVE_MODE`.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum D3D12ResolveMode {
    Decompress = 0,
    Min = 1,
    Max = 2,
    Average = 3,
}

impl From<ResolveMode> for D3D12ResolveMode {
    fn from(value: ResolveMode) -> Self {
        match value {
            ResolveMode::Average => D3D12ResolveMode::Average,
            ResolveMode::Max => D3D12ResolveMode::Max,
        }
    }
}

bitflags! {
    /// `D3D12_RENDER_PASS_FLAGS`.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderPassFlags: u32 {
        const ALLOW_UAV_WRITES = 0x1;
        const SUSPENDING_PASS  = 0x2;
        const RESUMING_PASS    = 0x4;
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClearValueData {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

/// `D3D12_CLEAR_VALUE`: the union is tagged by the format it clears.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearValue {
    pub format: DxgiFormat,
    pub value: ClearValueData,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BeginningAccess {
    pub ty: BeginningAccessType,
    pub clear: Option<ClearValue>,
}

/// `D3D12_RECT`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// `D3D12_RENDER_PASS_ENDING_ACCESS_RESOLVE_SUBRESOURCE_PARAMETERS`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct ResolveSubresourceParameters {
    pub src_subresource: u32,
    pub dst_subresource: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    /// All zero: resolve the whole region.
    pub src_rect: Rect,
}

/// `D3D12_RENDER_PASS_ENDING_ACCESS_RESOLVE_PARAMETERS`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResolveParameters {
    pub src_resource: ResourcePtr,
    pub dst_resource: ResourcePtr,
    pub subresource_count: u32,
    pub subresource_parameters: ResolveSubresourceParameters,
    pub format: DxgiFormat,
    pub resolve_mode: D3D12ResolveMode,
    pub preserve_resolve_source: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EndingAccess {
    pub ty: EndingAccessType,
    pub resolve: Option<ResolveParameters>,
}

/// `D3D12_RENDER_PASS_RENDER_TARGET_DESC`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RenderTargetDesc {
    pub cpu_descriptor: CpuDescriptorHandle,
    pub beginning_access: BeginningAccess,
    pub ending_access: EndingAccess,
}

/// `D3D12_RENDER_PASS_DEPTH_STENCIL_DESC`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct DepthStencilDesc {
    pub cpu_descriptor: CpuDescriptorHandle,
    pub depth_beginning_access: BeginningAccess,
    pub stencil_beginning_access: BeginningAccess,
    pub depth_ending_access: EndingAccess,
    pub stencil_ending_access: EndingAccess,
}

fn beginning_access<V>(load: &LoadOp<V>, clear: impl FnOnce(&V) -> ClearValue) -> BeginningAccess {
    match load {
        LoadOp::Clear(value) => BeginningAccess {
            ty: BeginningAccessType::Clear,
            clear: Some(clear(value)),
        },
        LoadOp::Load => BeginningAccess {
            ty: BeginningAccessType::Preserve,
            clear: None,
        },
    }
}

fn ending_access_type(store: StoreOp) -> EndingAccessType {
    match store {
        StoreOp::Discard => EndingAccessType::Discard,
        StoreOp::Store => EndingAccessType::Preserve,
    }
}

const NO_ACCESS_BEGIN: BeginningAccess = BeginningAccess {
    ty: BeginningAccessType::NoAccess,
    clear: None,
};
const NO_ACCESS_END: EndingAccess = EndingAccess {
    ty: EndingAccessType::NoAccess,
    resolve: None,
};

/// Accumulates the native descriptors of one render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassBuilder {
    render_target_views: [CpuDescriptorHandle; MAX_COLOR_ATTACHMENTS],
    render_target_descs: [RenderTargetDesc; MAX_COLOR_ATTACHMENTS],
    depth_stencil_desc: Option<DepthStencilDesc>,
    flags: RenderPassFlags,
    highest_color_attachment_index_plus_one: usize,
    has_depth: bool,
}

impl RenderPassBuilder {
    pub fn new(has_uav: bool) -> Self {
        let mut builder = Self::default();
        if has_uav {
            builder.flags = RenderPassFlags::ALLOW_UAV_WRITES;
        }
        builder
    }

    pub fn set_render_target_view(
        &mut self,
        slot: usize,
        descriptor: CpuDescriptorHandle,
        is_null: bool,
    ) {
        self.render_target_views[slot] = descriptor;
        self.render_target_descs[slot].cpu_descriptor = descriptor;
        if !is_null {
            self.highest_color_attachment_index_plus_one =
                self.highest_color_attachment_index_plus_one.max(slot + 1);
        }
    }

    pub fn set_depth_stencil_view(&mut self, descriptor: CpuDescriptorHandle) {
        self.depth_stencil_desc
            .get_or_insert_with(Default::default)
            .cpu_descriptor = descriptor;
    }

    pub fn set_render_target_beginning_access(
        &mut self,
        slot: usize,
        load: &LoadOp<Color>,
        format: DxgiFormat,
    ) {
        self.render_target_descs[slot].beginning_access = beginning_access(load, |c| ClearValue {
            format,
            value: ClearValueData::Color([c.r as f32, c.g as f32, c.b as f32, c.a as f32]),
        });
    }

    pub fn set_render_target_ending_access(&mut self, slot: usize, store: StoreOp) {
        self.render_target_descs[slot].ending_access = EndingAccess {
            ty: ending_access_type(store),
            resolve: None,
        };
    }

    /// The store op decides whether the multisampled source survives the resolve.
    pub fn set_render_target_ending_access_resolve(
        &mut self,
        slot: usize,
        store: StoreOp,
        source: ResourcePtr,
        destination: &ResolveTarget,
    ) {
        let resolve = ResolveParameters {
            src_resource: source,
            dst_resource: ResourcePtr(destination.texture.0),
            subresource_count: 1,
            subresource_parameters: ResolveSubresourceParameters {
                src_subresource: 0,
                dst_subresource: destination.subresource,
                dst_x: 0,
                dst_y: 0,
                src_rect: Rect::default(),
            },
            format: destination.format.into(),
            resolve_mode: resolve_mode_for(destination.format).into(),
            preserve_resolve_source: store == StoreOp::Store,
        };

        self.render_target_descs[slot].ending_access = EndingAccess {
            ty: EndingAccessType::Resolve,
            resolve: Some(resolve),
        };
    }

    pub fn set_depth_access(&mut self, load: &LoadOp<f32>, store: StoreOp, format: DxgiFormat) {
        self.has_depth = true;
        let desc = self.depth_stencil_desc.get_or_insert_with(Default::default);
        desc.depth_beginning_access = beginning_access(load, |depth| ClearValue {
            format,
            value: ClearValueData::DepthStencil {
                depth: *depth,
                stencil: 0,
            },
        });
        desc.depth_ending_access = EndingAccess {
            ty: ending_access_type(store),
            resolve: None,
        };
    }

    /// Only the low eight bits of the clear value are kept.
    pub fn set_stencil_access(&mut self, load: &LoadOp<u32>, store: StoreOp, format: DxgiFormat) {
        let desc = self.depth_stencil_desc.get_or_insert_with(Default::default);
        desc.stencil_beginning_access = beginning_access(load, |stencil| ClearValue {
            format,
            value: ClearValueData::DepthStencil {
                depth: 0.0,
                stencil: (*stencil & 0xff) as u8,
            },
        });
        desc.stencil_ending_access = EndingAccess {
            ty: ending_access_type(store),
            resolve: None,
        };
    }

    pub fn set_depth_no_access(&mut self) {
        let desc = self.depth_stencil_desc.get_or_insert_with(Default::default);
        desc.depth_beginning_access = NO_ACCESS_BEGIN;
        desc.depth_ending_access = NO_ACCESS_END;
    }

    pub fn set_stencil_no_access(&mut self) {
        let desc = self.depth_stencil_desc.get_or_insert_with(Default::default);
        desc.stencil_beginning_access = NO_ACCESS_BEGIN;
        desc.stencil_ending_access = NO_ACCESS_END;
    }

    pub fn set_depth_stencil_no_access(&mut self) {
        self.set_depth_no_access();
        self.set_stencil_no_access();
    }

    pub fn highest_color_attachment_index_plus_one(&self) -> usize {
        self.highest_color_attachment_index_plus_one
    }

    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    /// Only the slots up to the highest real attachment.
    pub fn render_target_descriptors(&self) -> &[RenderTargetDesc] {
        &self.render_target_descs[..self.highest_color_attachment_index_plus_one]
    }

    pub fn render_target_views(&self) -> &[CpuDescriptorHandle] {
        &self.render_target_views[..self.highest_color_attachment_index_plus_one]
    }

    pub fn depth_stencil_descriptor(&self) -> Option<&DepthStencilDesc> {
        self.depth_stencil_desc.as_ref()
    }

    pub fn flags(&self) -> RenderPassFlags {
        self.flags
    }
}

/// Translation into `D3D12_RENDER_PASS_*` descriptors.
pub struct D3D12;

impl Backend for D3D12 {
    type RenderPass = RenderPassBuilder;

    fn translate_render_pass(pass: &ResolvedRenderPass) -> RenderPassBuilder {
        let mut builder = RenderPassBuilder::new(pass.has_uav_writes);

        let count = pass.color_attachment_count();
        for (slot, attachment) in pass.color_attachments[..count].iter().enumerate() {
            let Some(attachment) = attachment else {
                builder.set_render_target_view(slot, NULL_RTV, true);
                builder.render_target_descs[slot].beginning_access = NO_ACCESS_BEGIN;
                builder.render_target_descs[slot].ending_access = NO_ACCESS_END;
                continue;
            };

            builder.set_render_target_view(
                slot,
                CpuDescriptorHandle {
                    ptr: attachment.view.0,
                },
                false,
            );
            builder.set_render_target_beginning_access(
                slot,
                &attachment.ops.load,
                attachment.format.into(),
            );
            match &attachment.resolve {
                Some(target) => builder.set_render_target_ending_access_resolve(
                    slot,
                    attachment.ops.store,
                    ResourcePtr(attachment.texture.0),
                    target,
                ),
                None => builder.set_render_target_ending_access(slot, attachment.ops.store),
            }
        }

        if let Some(ds) = &pass.depth_stencil {
            let format = DxgiFormat::from(ds.format);
            builder.set_depth_stencil_view(CpuDescriptorHandle { ptr: ds.view.0 });
            match &ds.depth_ops {
                Some(ops) => builder.set_depth_access(&ops.load, ops.store, format),
                None => builder.set_depth_no_access(),
            }
            match &ds.stencil_ops {
                Some(ops) => builder.set_stencil_access(&ops.load, ops.store, format),
                None => builder.set_stencil_no_access(),
            }
        }

        builder
    }
}
