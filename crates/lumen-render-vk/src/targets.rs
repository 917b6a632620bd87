// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use lumen_render::{RenderError, RenderResult};

use crate::handles::Owned;

/// Render pass plus one framebuffer per swapchain image view. Rebuilt with the swapchain.
pub(crate) struct RenderTargets {
    framebuffers: Vec<Owned<vk::Framebuffer>>,
    render_pass: Owned<vk::RenderPass>,
}

impl RenderTargets {
    pub unsafe fn new(
        device: &ash::Device,
        format: vk::Format,
        extent: vk::Extent2D,
        views: impl Iterator<Item = vk::ImageView>,
    ) -> RenderResult<Self> {
        let render_pass = Owned::new(device, create_render_pass(device, format)?);

        let mut framebuffers = Vec::new();
        for view in views {
            let fb_info = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass: render_pass.raw(),
                attachment_count: 1,
                p_attachments: &view,
                width: extent.width,
                height: extent.height,
                layers: 1,
                ..Default::default()
            };
            let fb = device
                .create_framebuffer(&fb_info, None)
                .map_err(|e| RenderError::Construction(format!("vkCreateFramebuffer: {e}")))?;
            framebuffers.push(Owned::new(device, fb));
        }

        Ok(Self {
            framebuffers,
            render_pass,
        })
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.raw()
    }

    pub fn framebuffer(&self, image_index: u32) -> RenderResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Owned::raw)
            .ok_or(RenderError::ImageIndexOutOfRange {
                index: image_index,
                count: self.framebuffers.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }
}

unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> RenderResult<vk::RenderPass> {
    let color = vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    };
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &color_ref,
        ..Default::default()
    };

    // Acquire -> first color write, last color write -> present.
    let dependencies = [
        vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: vk::AccessFlags::empty(),
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ..Default::default()
        },
        vk::SubpassDependency {
            src_subpass: 0,
            dst_subpass: vk::SUBPASS_EXTERNAL,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_stage_mask: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            dst_access_mask: vk::AccessFlags::empty(),
            ..Default::default()
        },
    ];

    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color,
        subpass_count: 1,
        p_subpasses: &subpass,
        dependency_count: dependencies.len() as u32,
        p_dependencies: dependencies.as_ptr(),
        ..Default::default()
    };
    device
        .create_render_pass(&rp_info, None)
        .map_err(|e| RenderError::Construction(format!("vkCreateRenderPass: {e}")))
}
