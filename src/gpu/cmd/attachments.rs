use crate::gpu::backend::{
    color_subresource_index, ResolveTarget, ResolvedColorAttachment, ResolvedDepthStencil,
    ResolvedRenderPass,
};
use crate::gpu::compat::AttachmentState;
use crate::gpu::context::Context;
use crate::gpu::driver::state::{ResourceId, SubresourceRange};
use crate::gpu::driver::types::{AspectMask, ResourceUse, TextureUsage};
use crate::gpu::error::{AttachmentSlot, ValidationError};
use crate::gpu::structs::{
    Extent, RenderPassDescriptor, Texture, TextureView, MAX_COLOR_ATTACHMENTS,
};
use crate::utils::Handle;

/// A validated pass descriptor: its compatibility key, the backend-neutral pass and
/// the usages its attachments imply.
pub(crate) struct PassAttachments {
    pub state: AttachmentState,
    pub pass: ResolvedRenderPass,
    pub usages: Vec<(Handle<Texture>, SubresourceRange, ResourceUse)>,
}

#[derive(Default)]
struct Checker {
    samples: Option<u32>,
    extent: Option<Extent>,
    claimed: Vec<(Handle<Texture>, SubresourceRange)>,
}

fn invalid(slot: AttachmentSlot, reason: &'static str) -> ValidationError {
    ValidationError::InvalidAttachment { slot, reason }
}

impl Checker {
    fn view<'c>(
        &self,
        ctx: &'c Context,
        slot: AttachmentSlot,
        handle: Handle<TextureView>,
    ) -> Result<(&'c TextureView, &'c Texture), ValidationError> {
        let view = ctx.texture_view(handle)?;
        let texture = ctx.texture(view.texture)?;

        if !texture.usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            return Err(ValidationError::MissingTextureUsage {
                resource: ResourceId::Texture(view.texture),
                required: TextureUsage::RENDER_ATTACHMENT,
            });
        }
        if view.range.level_count != 1 || view.range.layer_count != 1 {
            return Err(invalid(
                slot,
                "view must cover one mip level and one array layer",
            ));
        }

        Ok((view, texture))
    }

    fn claim(
        &mut self,
        slot: AttachmentSlot,
        view: &TextureView,
    ) -> Result<(), ValidationError> {
        let taken = self
            .claimed
            .iter()
            .any(|(texture, range)| *texture == view.texture && range.overlaps(&view.range));
        if taken {
            return Err(invalid(slot, "subresource is attached more than once"));
        }
        self.claimed.push((view.texture, view.range));
        Ok(())
    }

    fn match_extent(
        &mut self,
        slot: AttachmentSlot,
        view: &TextureView,
        texture: &Texture,
    ) -> Result<(), ValidationError> {
        let extent = texture.mip_extent(view.range.base_mip);
        match self.extent {
            Some(expected) if expected != extent => Err(invalid(slot, "attachment sizes differ")),
            _ => {
                self.extent = Some(extent);
                Ok(())
            }
        }
    }

    fn match_samples(&mut self, slot: AttachmentSlot, texture: &Texture) -> Result<(), ValidationError> {
        match self.samples {
            Some(expected) if expected != texture.samples => {
                Err(invalid(slot, "attachment sample counts differ"))
            }
            _ => {
                self.samples = Some(texture.samples);
                Ok(())
            }
        }
    }
}

/// Validates `desc` against the objects in `ctx`.
pub(crate) fn resolve_render_pass(
    ctx: &Context,
    desc: &RenderPassDescriptor,
) -> Result<PassAttachments, ValidationError> {
    if desc.color_attachments.len() > MAX_COLOR_ATTACHMENTS {
        return Err(ValidationError::TooManyColorAttachments {
            count: desc.color_attachments.len(),
            max: MAX_COLOR_ATTACHMENTS,
        });
    }
    if desc.color_attachments.iter().all(Option::is_none) && desc.depth_stencil_attachment.is_none()
    {
        return Err(ValidationError::NoAttachments);
    }

    let mut checker = Checker::default();
    let mut usages = Vec::new();
    let mut color_formats = Vec::with_capacity(desc.color_attachments.len());
    let mut color_attachments = Vec::with_capacity(desc.color_attachments.len());

    for (index, attachment) in desc.color_attachments.iter().enumerate() {
        let Some(attachment) = attachment else {
            color_formats.push(None);
            color_attachments.push(None);
            continue;
        };

        let slot = AttachmentSlot::Color(index);
        let (view, texture) = checker.view(ctx, slot, attachment.view)?;
        if !view.format.is_color() {
            return Err(ValidationError::InvalidAttachmentFormat {
                slot,
                format: view.format,
            });
        }
        checker.match_samples(slot, texture)?;
        checker.match_extent(slot, view, texture)?;
        checker.claim(slot, view)?;
        usages.push((view.texture, view.range, ResourceUse::ColorAttachmentWrite));

        let resolve = match attachment.resolve_target {
            None => None,
            Some(target) => {
                let slot = AttachmentSlot::Resolve(index);
                let (target_view, target_texture) = checker.view(ctx, slot, target)?;
                if texture.samples == 1 {
                    return Err(invalid(slot, "resolve source is not multisampled"));
                }
                if target_texture.samples != 1 {
                    return Err(invalid(slot, "resolve target is multisampled"));
                }
                if target_view.format != view.format {
                    return Err(ValidationError::InvalidAttachmentFormat {
                        slot,
                        format: target_view.format,
                    });
                }
                checker.match_extent(slot, target_view, target_texture)?;
                checker.claim(slot, target_view)?;

                usages.push((view.texture, view.range, ResourceUse::ResolveSource));
                usages.push((
                    target_view.texture,
                    target_view.range,
                    ResourceUse::ResolveDestination,
                ));

                Some(ResolveTarget {
                    view: target_view.native,
                    texture: target_texture.native,
                    format: target_view.format,
                    subresource: color_subresource_index(target_texture, &target_view.range),
                })
            }
        };

        color_formats.push(Some(view.format));
        color_attachments.push(Some(ResolvedColorAttachment {
            view: view.native,
            texture: texture.native,
            format: view.format,
            ops: attachment.ops,
            resolve,
        }));
    }

    let depth_stencil = match &desc.depth_stencil_attachment {
        None => None,
        Some(attachment) => {
            let slot = AttachmentSlot::DepthStencil;
            let (view, texture) = checker.view(ctx, slot, attachment.view)?;
            if !view.format.is_depth_stencil() {
                return Err(ValidationError::InvalidAttachmentFormat {
                    slot,
                    format: view.format,
                });
            }
            if attachment.depth_ops.is_some() && !view.format.has_depth() {
                return Err(invalid(slot, "depth operations on a format without depth"));
            }
            if attachment.stencil_ops.is_some() && !view.format.has_stencil() {
                return Err(invalid(slot, "stencil operations on a format without stencil"));
            }
            checker.match_samples(slot, texture)?;
            checker.match_extent(slot, view, texture)?;
            checker.claim(slot, view)?;

            let mut accessed = AspectMask::empty();
            if attachment.depth_ops.is_some() {
                accessed |= AspectMask::DEPTH;
            }
            if attachment.stencil_ops.is_some() {
                accessed |= AspectMask::STENCIL;
            }
            accessed &= view.range.aspect;
            if accessed.is_empty() {
                return Err(invalid(
                    slot,
                    "depth-stencil attachment accesses no aspect of its view",
                ));
            }
            usages.push((
                view.texture,
                view.range.with_aspect(accessed),
                ResourceUse::DepthStencilWrite,
            ));

            Some(ResolvedDepthStencil {
                view: view.native,
                format: view.format,
                depth_ops: attachment.depth_ops,
                stencil_ops: attachment.stencil_ops,
            })
        }
    };

    let sample_count = checker.samples.unwrap_or(1);
    let state = AttachmentState {
        color_formats,
        depth_stencil_format: depth_stencil.map(|ds| ds.format),
        sample_count,
    };

    Ok(PassAttachments {
        state,
        pass: ResolvedRenderPass {
            label: desc.debug_name.to_string(),
            color_attachments,
            depth_stencil,
            extent: checker.extent.unwrap_or_default(),
            sample_count,
            has_uav_writes: false,
        },
        usages,
    })
}
