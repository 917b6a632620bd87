// SPDX-License-Identifier: CEPL-1.0
//! Vulkan implementation of [`lumen_render::Renderer`].

use ash::vk;
use lumen_render::glam::Mat4;
use lumen_render::{
    FrameLoop, FrameStatus, InstanceData, RenderError, RenderResult, RenderSize, Renderer,
    RendererCreateInfo, ResizeSignal, SceneSnapshot,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{info, warn};

mod backend;
mod context;
mod debug;
mod frames;
mod geometry;
mod handles;
mod memory;
mod pipeline;
pub mod surface;
mod swapchain;
mod targets;

pub use context::{QueueFamilies, VkContext};
pub use pipeline::{
    decode_spirv, locate_shader, shader_search_paths, FRAGMENT_SHADER_FILE, VERTEX_SHADER_FILE,
};

use backend::VkBackend;

const DEFAULT_CLEAR: [f32; 4] = [0.02, 0.05, 0.09, 1.0];

pub struct VkRenderer {
    scene: SceneSnapshot,
    clear_color: [f32; 4],
    resize_signal: ResizeSignal,
    frame_loop: Option<FrameLoop<vk::Fence>>,
    // Declared last: the loop holds fence handles owned by the backend.
    backend: Option<VkBackend>,
}

impl VkRenderer {
    pub fn new() -> Self {
        Self {
            scene: SceneSnapshot::default(),
            clear_color: DEFAULT_CLEAR,
            resize_signal: ResizeSignal::default(),
            frame_loop: None,
            backend: None,
        }
    }

    /// Handle for posting sizes from another thread; drained at the start of each frame.
    pub fn resize_signal(&self) -> ResizeSignal {
        self.resize_signal.clone()
    }

    /// Rebuilds since `initialize`, or 0 when not initialized.
    pub fn swapchain_rebuilds(&self) -> u64 {
        self.frame_loop.as_ref().map_or(0, FrameLoop::rebuild_count)
    }
}

impl Default for VkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VkRenderer {
    fn drop(&mut self) {
        self.deinitialize();
    }
}

impl Renderer for VkRenderer {
    fn initialize(
        &mut self,
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        info: &RendererCreateInfo,
    ) -> RenderResult<()> {
        if self.is_initialized() {
            warn!("initialize on a live renderer; tearing down first");
            self.deinitialize();
        }

        let mut backend = unsafe { VkBackend::new(window, display, info)? };
        self.clear_color = info.clear_color;
        let mut frame_loop = FrameLoop::new(RenderSize::new(info.width, info.height));
        // A zero-area window is fine here; the first visible frame builds the chain.
        frame_loop.recreate_swapchain(&mut backend)?;

        info!(
            "vk renderer initialized ({}x{}, {} frames in flight)",
            info.width,
            info.height,
            info.clamped_frames_in_flight()
        );
        self.frame_loop = Some(frame_loop);
        self.backend = Some(backend);
        Ok(())
    }

    fn set_back_buffer_size(&mut self, width: u32, height: u32) {
        if let Some(frame_loop) = self.frame_loop.as_mut() {
            frame_loop.set_back_buffer_size(width, height);
        } else {
            // Kept for the next initialize via the mailbox.
            self.resize_signal.post(width, height);
        }
    }

    fn update_scene(&mut self, view_projection: Mat4, instances: &[InstanceData]) {
        self.scene.replace(view_projection, instances);
    }

    fn render_frame(&mut self) -> RenderResult<FrameStatus> {
        let (Some(frame_loop), Some(backend)) = (self.frame_loop.as_mut(), self.backend.as_mut())
        else {
            return Err(RenderError::NotInitialized);
        };
        if let Some(size) = self.resize_signal.take() {
            frame_loop.set_back_buffer_size(size.width, size.height);
        }
        backend.set_clear_color(self.clear_color);
        frame_loop.render_frame(backend, &self.scene)
    }

    fn deinitialize(&mut self) {
        self.frame_loop = None;
        if self.backend.take().is_some() {
            info!("vk renderer deinitialized");
        }
    }

    fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_render::ErrorKind;

    #[test]
    fn deinitialize_is_idempotent_before_initialize() {
        let mut r = VkRenderer::new();
        r.deinitialize();
        r.deinitialize();
        assert!(!r.is_initialized());
        assert_eq!(r.swapchain_rebuilds(), 0);
    }

    #[test]
    fn render_before_initialize_is_fatal_to_the_call() {
        let mut r = VkRenderer::default();
        let err = r.render_frame().unwrap_err();
        assert!(matches!(err, RenderError::NotInitialized));
        assert_eq!(err.kind(), ErrorKind::FatalToCall);
    }

    #[test]
    fn resize_before_initialize_lands_in_the_mailbox() {
        let mut r = VkRenderer::new();
        r.set_back_buffer_size(640, 480);
        r.set_back_buffer_size(0, 0);
        assert_eq!(r.resize_signal().take(), Some(RenderSize::ZERO));
        assert_eq!(r.resize_signal().take(), None);
    }

    #[test]
    fn scene_and_clear_color_are_accepted_uninitialized() {
        let mut r = VkRenderer::new();
        r.set_clear_color([1.0, 0.0, 0.0, 1.0]);
        r.update_scene(Mat4::IDENTITY, &[]);
        assert_eq!(r.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert!(r.scene.instances.is_empty());
    }
}
