// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use lumen_render::glam::Mat4;
use lumen_render::{
    AcquireOutcome, FrameBackend, PresentOutcome, RenderError, RenderResult, RenderSize,
    RendererCreateInfo, SceneSnapshot, SwapchainState,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};

use crate::context::VkContext;
use crate::frames::FrameSlots;
use crate::geometry::CubeMesh;
use crate::handles::Owned;
use crate::pipeline::{
    create_pipeline, push_stages, PipelineLayouts, PushConstants, SceneViewUniform, ShaderBinaries,
    ShaderModules,
};
use crate::surface::SurfaceSupport;
use crate::swapchain::{Swapchain, SwapchainCreateInfo};
use crate::targets::RenderTargets;

/// Native side of the frame loop.
///
/// Fields drop top to bottom: swapchain-dependent objects first, `ctx` last.
pub(crate) struct VkBackend {
    clear_color: [f32; 4],
    pipeline: Option<Owned<vk::Pipeline>>,
    targets: Option<RenderTargets>,
    swapchain: Swapchain,
    frames: FrameSlots,
    mesh: CubeMesh,
    layouts: PipelineLayouts,
    shaders: ShaderModules,
    command_pool: Owned<vk::CommandPool>,
    ctx: VkContext,
}

impl VkBackend {
    pub unsafe fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        info: &RendererCreateInfo,
    ) -> RenderResult<Self> {
        let raw_window = window.window_handle()?.as_raw();
        let raw_display = display.display_handle()?.as_raw();

        // Shaders first: a missing file should fail before any device work.
        let binaries = ShaderBinaries::load(info.shader_dir.as_deref())?;

        let ctx = VkContext::new(raw_display, raw_window, info.enable_validation)?;
        let device = &ctx.device;

        let pool_ci = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            queue_family_index: ctx.families.graphics,
            ..Default::default()
        };
        let command_pool = Owned::new(
            device,
            device
                .create_command_pool(&pool_ci, None)
                .map_err(|e| RenderError::api("vkCreateCommandPool", e))?,
        );

        let layouts = PipelineLayouts::new(device)?;
        let shaders = ShaderModules::new(device, &binaries)?;
        let mesh = CubeMesh::new(&ctx)?;
        let frames = FrameSlots::new(
            &ctx,
            command_pool.raw(),
            layouts.set_layout(),
            info.clamped_frames_in_flight(),
        )?;
        let swapchain = Swapchain::new(ctx.instance(), device);

        debug!("vk backend ready ({} frames in flight)", frames.len());

        Ok(Self {
            clear_color: info.clear_color,
            pipeline: None,
            targets: None,
            swapchain,
            frames,
            mesh,
            layouts,
            shaders,
            command_pool,
            ctx,
        })
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    fn device(&self) -> &ash::Device {
        &self.ctx.device
    }

    unsafe fn release_swapchain(&mut self) {
        self.pipeline = None;
        self.targets = None;
        self.swapchain.deinitialize();
    }
}

impl Drop for VkBackend {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
    }
}

impl FrameBackend for VkBackend {
    type Fence = vk::Fence;

    fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn in_flight_fence(&self, slot: usize) -> vk::Fence {
        self.frames.get(slot).in_flight.raw()
    }

    fn wait_for_fence(&mut self, fence: vk::Fence) -> RenderResult<()> {
        unsafe {
            self.device()
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| RenderError::api("vkWaitForFences", e))
        }
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> RenderResult<()> {
        unsafe {
            self.device()
                .reset_fences(&[fence])
                .map_err(|e| RenderError::api("vkResetFences", e))
        }
    }

    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome> {
        let semaphore = self.frames.get(slot).image_available.raw();
        let result = unsafe {
            self.swapchain.loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(RenderError::api("vkAcquireNextImageKHR", e)),
        }
    }

    fn write_frame_uniforms(&mut self, slot: usize, view_projection: &Mat4) -> RenderResult<()> {
        let ubo = SceneViewUniform {
            view_projection: view_projection.to_cols_array_2d(),
        };
        self.frames
            .get_mut(slot)
            .uniforms
            .write(bytemuck::bytes_of(&ubo));
        Ok(())
    }

    fn record_frame(
        &mut self,
        slot: usize,
        image_index: u32,
        extent: RenderSize,
        scene: &SceneSnapshot,
    ) -> RenderResult<()> {
        let targets = self.targets.as_ref().ok_or(RenderError::NotInitialized)?;
        let pipeline = self.pipeline.as_ref().ok_or(RenderError::NotInitialized)?.raw();
        let framebuffer = targets.framebuffer(image_index)?;
        let frame = self.frames.get(slot);
        let cmd = frame.cmd;
        let device = &self.ctx.device;
        let layout = self.layouts.layout();
        let area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: extent.width,
                height: extent.height,
            },
        };

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| RenderError::api("vkResetCommandBuffer", e))?;
            let begin = vk::CommandBufferBeginInfo {
                s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
                flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
                ..Default::default()
            };
            device
                .begin_command_buffer(cmd, &begin)
                .map_err(|e| RenderError::api("vkBeginCommandBuffer", e))?;

            let clear = vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            };
            let rp_begin = vk::RenderPassBeginInfo {
                s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
                render_pass: targets.render_pass(),
                framebuffer,
                render_area: area,
                clear_value_count: 1,
                p_clear_values: &clear,
                ..Default::default()
            };
            device.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[area]);

            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[frame.descriptor_set],
                &[],
            );
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.mesh.vertex_buffer()], &[0]);
            device.cmd_bind_index_buffer(cmd, self.mesh.index_buffer(), 0, vk::IndexType::UINT16);

            for instance in scene.drawable() {
                let push = PushConstants::from(instance);
                device.cmd_push_constants(cmd, layout, push_stages(), 0, bytemuck::bytes_of(&push));
                device.cmd_draw_indexed(cmd, self.mesh.index_count(), 1, 0, 0, 0);
            }

            device.cmd_end_render_pass(cmd);
            device
                .end_command_buffer(cmd)
                .map_err(|e| RenderError::api("vkEndCommandBuffer", e))
        }
    }

    fn submit_frame(&mut self, slot: usize) -> RenderResult<()> {
        let frame = self.frames.get(slot);
        let wait = [frame.image_available.raw()];
        let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal = [frame.render_finished.raw()];
        let submit = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            wait_semaphore_count: 1,
            p_wait_semaphores: wait.as_ptr(),
            p_wait_dst_stage_mask: stages.as_ptr(),
            command_buffer_count: 1,
            p_command_buffers: &frame.cmd,
            signal_semaphore_count: 1,
            p_signal_semaphores: signal.as_ptr(),
            ..Default::default()
        };
        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit], frame.in_flight.raw())
                .map_err(|e| RenderError::api("vkQueueSubmit", e))
        }
    }

    fn present_frame(&mut self, slot: usize, image_index: u32) -> RenderResult<PresentOutcome> {
        let wait = [self.frames.get(slot).render_finished.raw()];
        let chains = [self.swapchain.handle()];
        let indices = [image_index];
        let present = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: wait.as_ptr(),
            swapchain_count: 1,
            p_swapchains: chains.as_ptr(),
            p_image_indices: indices.as_ptr(),
            ..Default::default()
        };
        let result = unsafe {
            self.swapchain
                .loader()
                .queue_present(self.ctx.present_queue, &present)
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(RenderError::api("vkQueuePresentKHR", e)),
        }
    }

    fn rebuild_swapchain(&mut self, desired: RenderSize) -> RenderResult<SwapchainState> {
        unsafe {
            self.device()
                .device_wait_idle()
                .map_err(|e| RenderError::api("vkDeviceWaitIdle", e))?;
            self.release_swapchain();

            let support =
                SurfaceSupport::query(self.ctx.surface_loader(), self.ctx.phys, self.ctx.surface())?;
            if !support.has_area() {
                debug!("surface has no area; swapchain deferred");
                return Ok(SwapchainState {
                    extent: RenderSize::ZERO,
                    image_count: 0,
                });
            }

            let create = SwapchainCreateInfo {
                surface: self.ctx.surface(),
                extent: desired,
                graphics_family: self.ctx.families.graphics,
                present_family: self.ctx.families.present,
            };
            self.swapchain
                .initialize(self.ctx.surface_loader(), self.ctx.phys, &create)?;

            let extent = self.swapchain.extent();
            let targets = RenderTargets::new(
                &self.ctx.device,
                self.swapchain.format(),
                extent,
                self.swapchain.image_views(),
            )?;
            let pipeline = create_pipeline(
                &self.ctx.device,
                self.layouts.layout(),
                targets.render_pass(),
                &self.shaders,
            )?;
            info!(
                "render targets rebuilt: {}x{}, {} framebuffers",
                extent.width,
                extent.height,
                targets.len()
            );
            self.targets = Some(targets);
            self.pipeline = Some(pipeline);

            Ok(SwapchainState {
                extent: RenderSize::new(extent.width, extent.height),
                image_count: self.swapchain.image_count(),
            })
        }
    }
}
