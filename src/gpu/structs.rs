use crate::gpu::compat::AttachmentState;
use crate::gpu::driver::state::SubresourceRange;
use crate::gpu::driver::types::{BufferUsage, Format, ResourceUse, TextureUsage};
use crate::utils::Handle;
use crate::ExternalTexture;

#[cfg(feature = "recorder-serde")]
use serde::{Deserialize, Serialize};

pub const MAX_COLOR_ATTACHMENTS: usize = 8;
pub const MAX_BIND_GROUPS: usize = 4;
pub const MAX_VERTEX_BUFFERS: usize = 8;

/// Opaque backend object (a `VkImageView`, an `ID3D12Resource*`, a CPU descriptor
/// handle) handed over by whoever allocated the resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(pub u64);

#[derive(Debug, Hash, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct BufferInfo<'a> {
    pub debug_name: &'a str,
    pub byte_size: u64,
    pub usage: BufferUsage,
    pub native: NativeHandle,
}

impl Default for BufferInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            byte_size: 1024,
            usage: BufferUsage::empty(),
            native: NativeHandle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub name: String,
    pub byte_size: u64,
    pub usage: BufferUsage,
    pub native: NativeHandle,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    D1,
    #[default]
    D2,
    D3,
}

#[derive(Debug, Clone)]
pub struct TextureInfo<'a> {
    pub debug_name: &'a str,
    pub dim: Extent,
    pub dimension: TextureDimension,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub format: Format,
    pub usage: TextureUsage,
    pub native: NativeHandle,
}

impl Default for TextureInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            dim: Extent {
                width: 1,
                height: 1,
            },
            dimension: TextureDimension::D2,
            array_layers: 1,
            mip_levels: 1,
            samples: 1,
            format: Format::RGBA8Unorm,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            native: NativeHandle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub dim: Extent,
    pub dimension: TextureDimension,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub format: Format,
    pub usage: TextureUsage,
    pub native: NativeHandle,
}

impl Texture {
    pub fn mip_extent(&self, level: u32) -> Extent {
        Extent {
            width: self.dim.width.checked_shr(level).unwrap_or(0).max(1),
            height: self.dim.height.checked_shr(level).unwrap_or(0).max(1),
        }
    }

    /// Flat subresource index: mips vary fastest, then layers, then planes.
    pub fn subresource_index(&self, mip: u32, layer: u32, plane: u32) -> u32 {
        mip + layer * self.mip_levels + plane * self.mip_levels * self.array_layers
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureViewDimension {
    D1,
    #[default]
    D2,
    D2Array,
    Cube,
    D3,
}

#[derive(Debug, Clone)]
pub struct TextureViewInfo<'a> {
    pub debug_name: &'a str,
    pub texture: Handle<Texture>,
    pub dimension: TextureViewDimension,
    /// Aspect is intersected with the texture format's aspects.
    pub range: SubresourceRange,
    pub native: NativeHandle,
}

impl Default for TextureViewInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            texture: Handle::default(),
            dimension: TextureViewDimension::D2,
            range: SubresourceRange::default(),
            native: NativeHandle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureView {
    pub name: String,
    pub texture: Handle<Texture>,
    pub format: Format,
    pub dimension: TextureViewDimension,
    pub range: SubresourceRange,
    pub native: NativeHandle,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer,
    ReadOnlyStorageBuffer,
    SampledTexture,
    StorageTexture,
    ExternalTexture,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub ty: BindingType,
}

#[derive(Debug, Clone, Default)]
pub struct BindGroupLayoutInfo<'a> {
    pub debug_name: &'a str,
    pub entries: &'a [BindGroupLayoutEntry],
}

#[derive(Debug, Clone)]
pub struct BindGroupLayout {
    pub name: String,
    pub entries: Vec<BindGroupLayoutEntry>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingResource {
    Buffer {
        buffer: Handle<Buffer>,
        offset: u64,
        size: u64,
    },
    TextureView(Handle<TextureView>),
    ExternalTexture(Handle<ExternalTexture>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

#[derive(Debug, Clone)]
pub struct BindGroupInfo<'a> {
    pub debug_name: &'a str,
    pub layout: Handle<BindGroupLayout>,
    pub entries: &'a [BindGroupEntry],
}

/// A resource access implied by a bind group entry, resolved when the group is made.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoundResource {
    Buffer {
        buffer: Handle<Buffer>,
        usage: ResourceUse,
    },
    Texture {
        texture: Handle<Texture>,
        range: SubresourceRange,
        usage: ResourceUse,
    },
}

#[derive(Debug, Clone)]
pub struct BindGroup {
    pub name: String,
    pub layout: Handle<BindGroupLayout>,
    pub entries: Vec<BindGroupEntry>,
    pub resources: Vec<BoundResource>,
    pub external_textures: Vec<Handle<ExternalTexture>>,
}

#[derive(Debug, Clone)]
pub struct RenderPipelineInfo<'a> {
    pub debug_name: &'a str,
    pub bind_group_layouts: &'a [Handle<BindGroupLayout>],
    /// Slots `0..vertex_buffer_count` must be bound before drawing.
    pub vertex_buffer_count: u32,
    pub color_formats: &'a [Option<Format>],
    pub depth_stencil_format: Option<Format>,
    pub sample_count: u32,
}

impl Default for RenderPipelineInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            bind_group_layouts: &[],
            vertex_buffer_count: 0,
            color_formats: &[],
            depth_stencil_format: None,
            sample_count: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipeline {
    pub name: String,
    pub bind_group_layouts: Vec<Handle<BindGroupLayout>>,
    pub vertex_buffer_count: u32,
    pub attachment_state: AttachmentState,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
}

/// Beginning access of an attachment. A clear always carries its value.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "recorder-serde", serde(rename_all = "snake_case"))]
pub enum LoadOp<V> {
    Clear(V),
    Load,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub enum StoreOp {
    #[default]
    Store,
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub struct Operations<V> {
    pub load: LoadOp<V>,
    pub store: StoreOp,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderPassColorAttachment {
    pub view: Handle<TextureView>,
    pub resolve_target: Option<Handle<TextureView>>,
    pub ops: Operations<Color>,
}

/// `None` for either aspect means the pass does not access it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderPassDepthStencilAttachment {
    pub view: Handle<TextureView>,
    pub depth_ops: Option<Operations<f32>>,
    pub stencil_ops: Option<Operations<u32>>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor<'a> {
    pub debug_name: &'a str,
    pub color_attachments: &'a [Option<RenderPassColorAttachment>],
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub struct RenderBundleEncoderDescriptor {
    #[cfg_attr(feature = "recorder-serde", serde(default))]
    pub debug_name: String,
    #[cfg_attr(feature = "recorder-serde", serde(default))]
    pub color_formats: Vec<Option<Format>>,
    #[cfg_attr(feature = "recorder-serde", serde(default))]
    pub depth_stencil_format: Option<Format>,
    #[cfg_attr(feature = "recorder-serde", serde(default = "default_sample_count"))]
    pub sample_count: u32,
}

#[cfg(feature = "recorder-serde")]
fn default_sample_count() -> u32 {
    1
}

impl Default for RenderBundleEncoderDescriptor {
    fn default() -> Self {
        Self {
            debug_name: String::new(),
            color_formats: Vec::new(),
            depth_stencil_format: None,
            sample_count: 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub enum ColorSpace {
    #[default]
    Srgb,
    DisplayP3,
}

#[derive(Debug, Clone)]
pub struct ExternalTextureInfo<'a> {
    pub debug_name: &'a str,
    pub plane0: Handle<TextureView>,
    pub plane1: Option<Handle<TextureView>>,
    pub color_space: ColorSpace,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextInfo {
    /// Rejects bi-planar external textures.
    pub disallow_unsafe_apis: bool,
}
