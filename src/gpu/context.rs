use log::debug;

use crate::gpu::cmd::{CommandBuffer, CommandEncoder, RenderBundleEncoder};
use crate::gpu::driver::state::REMAINING;
use crate::gpu::driver::types::{BufferUsage, ResourceUse, TextureUsage};
use crate::gpu::error::{GPUError, Result, ValidationError};
use crate::gpu::external_texture::{validate_external_texture, ExternalTexture};
use crate::gpu::structs::*;
use crate::gpu::compat::AttachmentState;
#[cfg(feature = "recorder-serde")]
use crate::gpu::cfg;
use crate::utils::{Handle, Pool};

/// Owns every object the recorder reasons about and hands out handles to them.
///
/// Objects are immutable once made, so recording contexts only ever borrow the
/// context shared. Several encoders may record on different threads at once.
pub struct Context {
    info: ContextInfo,
    buffers: Pool<Buffer>,
    textures: Pool<Texture>,
    texture_views: Pool<TextureView>,
    bind_group_layouts: Pool<BindGroupLayout>,
    bind_groups: Pool<BindGroup>,
    render_pipelines: Pool<RenderPipeline>,
    external_textures: Pool<ExternalTexture>,
}

/// A 32-bit extent has at most 32 mip levels.
const MAX_MIP_LEVELS: u32 = 32;

fn lookup<'a, T>(pool: &'a Pool<T>, handle: Handle<T>, kind: &'static str) -> Result<&'a T, ValidationError> {
    pool.get_ref(handle)
        .ok_or(ValidationError::InvalidHandle { kind })
}

impl Context {
    pub fn new(info: &ContextInfo) -> Self {
        Self {
            info: *info,
            buffers: Default::default(),
            textures: Default::default(),
            texture_views: Default::default(),
            bind_group_layouts: Default::default(),
            bind_groups: Default::default(),
            render_pipelines: Default::default(),
            external_textures: Default::default(),
        }
    }

    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    pub fn buffer(&self, handle: Handle<Buffer>) -> Result<&Buffer, ValidationError> {
        lookup(&self.buffers, handle, "buffer")
    }

    pub fn texture(&self, handle: Handle<Texture>) -> Result<&Texture, ValidationError> {
        lookup(&self.textures, handle, "texture")
    }

    pub fn texture_view(&self, handle: Handle<TextureView>) -> Result<&TextureView, ValidationError> {
        lookup(&self.texture_views, handle, "texture view")
    }

    pub fn bind_group_layout(
        &self,
        handle: Handle<BindGroupLayout>,
    ) -> Result<&BindGroupLayout, ValidationError> {
        lookup(&self.bind_group_layouts, handle, "bind group layout")
    }

    pub fn bind_group(&self, handle: Handle<BindGroup>) -> Result<&BindGroup, ValidationError> {
        lookup(&self.bind_groups, handle, "bind group")
    }

    pub fn render_pipeline(
        &self,
        handle: Handle<RenderPipeline>,
    ) -> Result<&RenderPipeline, ValidationError> {
        lookup(&self.render_pipelines, handle, "render pipeline")
    }

    pub fn external_texture(
        &self,
        handle: Handle<ExternalTexture>,
    ) -> Result<&ExternalTexture, ValidationError> {
        lookup(&self.external_textures, handle, "external texture")
    }

    pub fn make_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        if info.byte_size == 0 {
            return Err(GPUError::InvalidDescriptor("buffer size must be non-zero"));
        }

        self.buffers
            .insert(Buffer {
                name: info.debug_name.to_string(),
                byte_size: info.byte_size,
                usage: info.usage,
                native: info.native,
            })
            .ok_or(GPUError::SlotError)
    }

    pub fn make_texture(&mut self, info: &TextureInfo) -> Result<Handle<Texture>> {
        if info.mip_levels == 0 || info.array_layers == 0 {
            return Err(GPUError::InvalidDescriptor(
                "textures need at least one mip level and one array layer",
            ));
        }
        if info.mip_levels > MAX_MIP_LEVELS {
            return Err(GPUError::InvalidDescriptor("too many mip levels"));
        }
        if !matches!(info.samples, 1 | 4) {
            return Err(GPUError::InvalidDescriptor("sample count must be 1 or 4"));
        }
        if info.samples > 1 && info.mip_levels > 1 {
            return Err(GPUError::InvalidDescriptor(
                "multisampled textures cannot have mip levels",
            ));
        }

        self.textures
            .insert(Texture {
                name: info.debug_name.to_string(),
                dim: info.dim,
                dimension: info.dimension,
                array_layers: info.array_layers,
                mip_levels: info.mip_levels,
                samples: info.samples,
                format: info.format,
                usage: info.usage,
                native: info.native,
            })
            .ok_or(GPUError::SlotError)
    }

    /// `REMAINING` counts are resolved against the texture here.
    pub fn make_texture_view(&mut self, info: &TextureViewInfo) -> Result<Handle<TextureView>> {
        let texture = self.texture(info.texture)?;
        let mut range = info.range;

        range.aspect &= texture.format.aspects();
        if range.aspect.is_empty() {
            return Err(GPUError::InvalidDescriptor(
                "view aspect is not present in the texture format",
            ));
        }

        if range.base_mip >= texture.mip_levels || range.base_layer >= texture.array_layers {
            return Err(GPUError::InvalidDescriptor("view starts past the texture"));
        }
        if range.level_count == REMAINING {
            range.level_count = texture.mip_levels - range.base_mip;
        }
        if range.layer_count == REMAINING {
            range.layer_count = texture.array_layers - range.base_layer;
        }
        let fits = |base: u32, count: u32, total: u32| {
            count != 0 && base.checked_add(count).is_some_and(|end| end <= total)
        };
        if !fits(range.base_mip, range.level_count, texture.mip_levels)
            || !fits(range.base_layer, range.layer_count, texture.array_layers)
        {
            return Err(GPUError::InvalidDescriptor("view range exceeds the texture"));
        }

        let view = TextureView {
            name: info.debug_name.to_string(),
            texture: info.texture,
            format: texture.format,
            dimension: info.dimension,
            range,
            native: info.native,
        };

        self.texture_views.insert(view).ok_or(GPUError::SlotError)
    }

    pub fn make_bind_group_layout(
        &mut self,
        info: &BindGroupLayoutInfo,
    ) -> Result<Handle<BindGroupLayout>> {
        for (i, entry) in info.entries.iter().enumerate() {
            if info.entries[..i].iter().any(|e| e.binding == entry.binding) {
                return Err(GPUError::InvalidDescriptor("duplicate binding in layout"));
            }
        }

        self.bind_group_layouts
            .insert(BindGroupLayout {
                name: info.debug_name.to_string(),
                entries: info.entries.to_vec(),
            })
            .ok_or(GPUError::SlotError)
    }

    /// Resolves every entry into the resource usages a draw with this group implies.
    pub fn make_bind_group(&mut self, info: &BindGroupInfo) -> Result<Handle<BindGroup>> {
        let layout = self.bind_group_layout(info.layout)?;
        if layout.entries.len() != info.entries.len() {
            return Err(ValidationError::BindGroupEntryCount {
                expected: layout.entries.len(),
                found: info.entries.len(),
            }
            .into());
        }

        let mut resources = Vec::with_capacity(info.entries.len());
        let mut external_textures = Vec::new();
        for entry in info.entries {
            let declared = layout
                .entries
                .iter()
                .find(|e| e.binding == entry.binding)
                .ok_or(ValidationError::BindGroupEntryMismatch {
                    binding: entry.binding,
                })?;

            match (declared.ty, entry.resource) {
                (ty, BindingResource::Buffer { buffer, .. }) => {
                    let (usage, required) = match ty {
                        BindingType::UniformBuffer => (ResourceUse::UniformRead, BufferUsage::UNIFORM),
                        BindingType::StorageBuffer => (ResourceUse::StorageWrite, BufferUsage::STORAGE),
                        BindingType::ReadOnlyStorageBuffer => {
                            (ResourceUse::StorageRead, BufferUsage::STORAGE)
                        }
                        _ => {
                            return Err(ValidationError::BindGroupEntryMismatch {
                                binding: entry.binding,
                            }
                            .into())
                        }
                    };
                    if !self.buffer(buffer)?.usage.contains(required) {
                        return Err(ValidationError::MissingBufferUsage {
                            resource: crate::ResourceId::Buffer(buffer),
                            required,
                        }
                        .into());
                    }
                    resources.push(BoundResource::Buffer { buffer, usage });
                }
                (ty, BindingResource::TextureView(view)) => {
                    let (usage, required) = match ty {
                        BindingType::SampledTexture => {
                            (ResourceUse::Sampled, TextureUsage::TEXTURE_BINDING)
                        }
                        BindingType::StorageTexture => {
                            (ResourceUse::StorageWrite, TextureUsage::STORAGE_BINDING)
                        }
                        _ => {
                            return Err(ValidationError::BindGroupEntryMismatch {
                                binding: entry.binding,
                            }
                            .into())
                        }
                    };
                    let view = self.texture_view(view)?;
                    if !self.texture(view.texture)?.usage.contains(required) {
                        return Err(ValidationError::MissingTextureUsage {
                            resource: crate::ResourceId::Texture(view.texture),
                            required,
                        }
                        .into());
                    }
                    resources.push(BoundResource::Texture {
                        texture: view.texture,
                        range: view.range,
                        usage,
                    });
                }
                (BindingType::ExternalTexture, BindingResource::ExternalTexture(external)) => {
                    for plane in self.external_texture(external)?.plane_views() {
                        let view = self.texture_view(plane)?;
                        resources.push(BoundResource::Texture {
                            texture: view.texture,
                            range: view.range,
                            usage: ResourceUse::Sampled,
                        });
                    }
                    external_textures.push(external);
                }
                (_, BindingResource::ExternalTexture(_)) => {
                    return Err(ValidationError::BindGroupEntryMismatch {
                        binding: entry.binding,
                    }
                    .into())
                }
            }
        }

        self.bind_groups
            .insert(BindGroup {
                name: info.debug_name.to_string(),
                layout: info.layout,
                entries: info.entries.to_vec(),
                resources,
                external_textures,
            })
            .ok_or(GPUError::SlotError)
    }

    pub fn make_render_pipeline(
        &mut self,
        info: &RenderPipelineInfo,
    ) -> Result<Handle<RenderPipeline>> {
        if info.bind_group_layouts.len() > MAX_BIND_GROUPS {
            return Err(ValidationError::BindGroupIndexOutOfRange {
                index: info.bind_group_layouts.len() as u32 - 1,
                max: MAX_BIND_GROUPS as u32,
            }
            .into());
        }
        if info.vertex_buffer_count as usize > MAX_VERTEX_BUFFERS {
            return Err(ValidationError::VertexSlotOutOfRange {
                slot: info.vertex_buffer_count - 1,
                max: MAX_VERTEX_BUFFERS as u32,
            }
            .into());
        }
        if info.color_formats.len() > MAX_COLOR_ATTACHMENTS {
            return Err(ValidationError::TooManyColorAttachments {
                count: info.color_formats.len(),
                max: MAX_COLOR_ATTACHMENTS,
            }
            .into());
        }
        if info.color_formats.iter().flatten().any(|f| !f.is_color()) {
            return Err(GPUError::InvalidDescriptor("color target formats must be color"));
        }
        if info.depth_stencil_format.is_some_and(|f| !f.is_depth_stencil()) {
            return Err(GPUError::InvalidDescriptor(
                "depth-stencil format must have depth or stencil",
            ));
        }
        if info.sample_count == 0 {
            return Err(GPUError::InvalidDescriptor("sample count must be non-zero"));
        }
        for layout in info.bind_group_layouts {
            self.bind_group_layout(*layout)?;
        }

        self.render_pipelines
            .insert(RenderPipeline {
                name: info.debug_name.to_string(),
                bind_group_layouts: info.bind_group_layouts.to_vec(),
                vertex_buffer_count: info.vertex_buffer_count,
                attachment_state: AttachmentState::new(
                    info.color_formats,
                    info.depth_stencil_format,
                    info.sample_count,
                ),
            })
            .ok_or(GPUError::SlotError)
    }

    pub fn make_external_texture(
        &mut self,
        info: &ExternalTextureInfo,
    ) -> Result<Handle<ExternalTexture>> {
        validate_external_texture(self, &self.info, info)?;
        self.external_textures
            .insert(ExternalTexture::new(info))
            .ok_or(GPUError::SlotError)
    }

    /// The handle stays valid so later submits can report the destroyed state.
    /// Frees the slot. Recording that still names the buffer fails with `InvalidHandle`.
    pub fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        if self.buffers.release(handle).is_none() {
            debug!("destroy of stale buffer {handle:?} ignored");
        }
    }

    pub fn destroy_external_texture(&mut self, handle: Handle<ExternalTexture>) {
        if let Some(texture) = self.external_textures.get_mut_ref(handle) {
            texture.destroy();
        }
    }

    pub fn create_command_encoder(&self) -> CommandEncoder<'_> {
        CommandEncoder::new(self)
    }

    pub fn create_render_bundle_encoder(
        &self,
        desc: &RenderBundleEncoderDescriptor,
    ) -> RenderBundleEncoder<'_> {
        RenderBundleEncoder::new(self, desc)
    }

    #[cfg(feature = "recorder-serde")]
    pub fn create_render_bundle_encoder_from_yaml(
        &self,
        yaml_str: &str,
    ) -> Result<RenderBundleEncoder<'_>> {
        let cfg = cfg::RenderBundleCfg::from_yaml(yaml_str)?;
        Ok(self.create_render_bundle_encoder(&cfg.descriptor()))
    }

    #[cfg(feature = "recorder-serde")]
    pub fn create_render_bundle_encoder_from_yaml_file(
        &self,
        path: &str,
    ) -> anyhow::Result<RenderBundleEncoder<'_>> {
        let cfg = cfg::RenderBundleCfg::from_yaml_file(path)?;
        Ok(self.create_render_bundle_encoder(&cfg.descriptor()))
    }

    /// Rejects the submit if any command buffer references a destroyed external texture.
    pub fn submit(&self, buffers: &[CommandBuffer]) -> Result<()> {
        for buffer in buffers {
            for handle in buffer.external_textures() {
                self.external_texture(*handle)?
                    .validate_can_use_in_submit()?;
            }
        }
        debug!("submitted {} command buffer(s)", buffers.len());
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&ContextInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::driver::state::SubresourceRange;
    use crate::gpu::driver::types::{AspectMask, Format};

    #[test]
    fn remaining_counts_resolve_against_texture() {
        let mut ctx = Context::default();
        let texture = ctx
            .make_texture(&TextureInfo {
                mip_levels: 4,
                array_layers: 3,
                format: Format::Depth24PlusStencil8,
                ..Default::default()
            })
            .unwrap();
        let view = ctx
            .make_texture_view(&TextureViewInfo {
                texture,
                range: SubresourceRange::new(1, REMAINING, 0, REMAINING),
                ..Default::default()
            })
            .unwrap();

        let range = ctx.texture_view(view).unwrap().range;
        assert_eq!(range.level_count, 3);
        assert_eq!(range.layer_count, 3);
        assert_eq!(range.aspect, AspectMask::DEPTH | AspectMask::STENCIL);
    }

    #[test]
    fn bind_group_checks_declared_usage() {
        let mut ctx = Context::default();
        let layout = ctx
            .make_bind_group_layout(&BindGroupLayoutInfo {
                debug_name: "uniforms",
                entries: &[BindGroupLayoutEntry {
                    binding: 0,
                    ty: BindingType::UniformBuffer,
                }],
            })
            .unwrap();
        let vertex_only = ctx
            .make_buffer(&BufferInfo {
                usage: BufferUsage::VERTEX,
                ..Default::default()
            })
            .unwrap();

        let err = ctx.make_bind_group(&BindGroupInfo {
            debug_name: "bad",
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer {
                    buffer: vertex_only,
                    offset: 0,
                    size: 16,
                },
            }],
        });
        assert!(matches!(
            err,
            Err(GPUError::Validation(ValidationError::MissingBufferUsage { .. }))
        ));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let ctx = Context::default();
        assert_eq!(
            ctx.buffer(Handle::new(7, 0)).err(),
            Some(ValidationError::InvalidHandle { kind: "buffer" })
        );
    }

    #[test]
    fn destroyed_buffers_go_stale() {
        let mut ctx = Context::default();
        let buffer = ctx
            .make_buffer(&BufferInfo {
                usage: BufferUsage::VERTEX,
                ..Default::default()
            })
            .unwrap();
        ctx.destroy_buffer(buffer);
        ctx.destroy_buffer(buffer);
        assert_eq!(
            ctx.buffer(buffer).err(),
            Some(ValidationError::InvalidHandle { kind: "buffer" })
        );

        let reused = ctx
            .make_buffer(&BufferInfo {
                usage: BufferUsage::VERTEX,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(reused.slot, buffer.slot);
        assert!(ctx.buffer(reused).is_ok());
        assert!(ctx.buffer(buffer).is_err());
    }

    #[test]
    fn mip_count_is_bounded_by_the_extent_width() {
        let mut ctx = Context::default();
        let err = ctx.make_texture(&TextureInfo {
            mip_levels: 40,
            ..Default::default()
        });
        assert!(matches!(err, Err(GPUError::InvalidDescriptor(_))));

        let deepest = ctx
            .make_texture(&TextureInfo {
                mip_levels: 32,
                ..Default::default()
            })
            .unwrap();
        let texture = ctx.texture(deepest).unwrap();
        assert_eq!(texture.mip_extent(31).width, 1);
        assert_eq!(texture.mip_extent(33).height, 1);
    }

    #[test]
    fn huge_view_counts_are_rejected() {
        let mut ctx = Context::default();
        let texture = ctx
            .make_texture(&TextureInfo {
                mip_levels: 4,
                array_layers: 2,
                ..Default::default()
            })
            .unwrap();
        for range in [
            SubresourceRange::new(2, u32::MAX - 1, 0, 1),
            SubresourceRange::new(0, 1, 1, u32::MAX - 1),
        ] {
            let err = ctx.make_texture_view(&TextureViewInfo {
                texture,
                range,
                ..Default::default()
            });
            assert!(
                matches!(
                    err,
                    Err(GPUError::InvalidDescriptor("view range exceeds the texture"))
                ),
                "{range:?} should not fit"
            );
        }
    }
}
