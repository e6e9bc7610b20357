//! Vulkan dynamic-rendering (`VK_KHR_dynamic_rendering` / 1.3) attachment descriptors.

mod conversions;

pub use conversions::*;

use ash::vk;
use ash::vk::Handle as _;

use super::{resolve_mode_for, ResolvedRenderPass};
use crate::gpu::Backend;
use crate::LoadOp;

/// Attachments of one pass in the shape `vkCmdBeginRendering` expects.
#[derive(Clone)]
pub struct VulkanRenderPass {
    pub render_area: vk::Rect2D,
    pub color_attachments: Vec<vk::RenderingAttachmentInfo>,
    /// Needed by `VkPipelineRenderingCreateInfo` of pipelines used in this pass.
    pub color_formats: Vec<vk::Format>,
    pub depth_attachment: Option<vk::RenderingAttachmentInfo>,
    pub stencil_attachment: Option<vk::RenderingAttachmentInfo>,
}

impl VulkanRenderPass {
    /// Borrows the attachment arrays; `self` must outlive the returned builder.
    pub fn rendering_info(&self) -> vk::RenderingInfoBuilder<'_> {
        let mut info = vk::RenderingInfo::builder()
            .render_area(self.render_area)
            .layer_count(1)
            .color_attachments(&self.color_attachments);
        if let Some(depth) = &self.depth_attachment {
            info = info.depth_attachment(depth);
        }
        if let Some(stencil) = &self.stencil_attachment {
            info = info.stencil_attachment(stencil);
        }
        info
    }
}

fn unused_color_slot() -> vk::RenderingAttachmentInfo {
    vk::RenderingAttachmentInfo::builder()
        .image_view(vk::ImageView::null())
        .image_layout(vk::ImageLayout::UNDEFINED)
        .load_op(vk::AttachmentLoadOp::DONT_CARE)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .build()
}

pub struct Vulkan;

impl Backend for Vulkan {
    type RenderPass = VulkanRenderPass;

    fn translate_render_pass(pass: &ResolvedRenderPass) -> VulkanRenderPass {
        let count = pass.color_attachment_count();
        let mut color_attachments = Vec::with_capacity(count);
        let mut color_formats = Vec::with_capacity(count);

        for attachment in &pass.color_attachments[..count] {
            let Some(attachment) = attachment else {
                color_attachments.push(unused_color_slot());
                color_formats.push(vk::Format::UNDEFINED);
                continue;
            };

            let mut info = vk::RenderingAttachmentInfo::builder()
                .image_view(vk::ImageView::from_raw(attachment.view.0))
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op((&attachment.ops.load).into())
                .store_op(attachment.ops.store.into());

            if let LoadOp::Clear(color) = &attachment.ops.load {
                info = info.clear_value(color_clear_value(color, attachment.format));
            }

            if let Some(target) = &attachment.resolve {
                info = info
                    .resolve_mode(resolve_mode_for(target.format).into())
                    .resolve_image_view(vk::ImageView::from_raw(target.view.0))
                    .resolve_image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
            }

            color_attachments.push(info.build());
            color_formats.push(attachment.format.into());
        }

        let mut depth_attachment = None;
        let mut stencil_attachment = None;
        if let Some(ds) = &pass.depth_stencil {
            let view = vk::ImageView::from_raw(ds.view.0);

            depth_attachment = ds.depth_ops.map(|ops| {
                let mut info = vk::RenderingAttachmentInfo::builder()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op((&ops.load).into())
                    .store_op(ops.store.into());
                if let LoadOp::Clear(depth) = ops.load {
                    info = info.clear_value(depth_stencil_clear_value(depth, 0));
                }
                info.build()
            });

            stencil_attachment = ds.stencil_ops.map(|ops| {
                let mut info = vk::RenderingAttachmentInfo::builder()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op((&ops.load).into())
                    .store_op(ops.store.into());
                if let LoadOp::Clear(stencil) = ops.load {
                    info = info.clear_value(depth_stencil_clear_value(0.0, stencil));
                }
                info.build()
            });
        }

        VulkanRenderPass {
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: pass.extent.width,
                    height: pass.extent.height,
                },
            },
            color_attachments,
            color_formats,
            depth_attachment,
            stencil_attachment,
        }
    }
}
