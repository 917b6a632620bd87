// SPDX-License-Identifier: CEPL-1.0
use std::path::PathBuf;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

mod error;
pub mod frame;
mod resize;
pub mod scene;
mod sync;

pub use error::{ErrorKind, RenderError, RenderResult};
pub use frame::{
    AcquireOutcome, FrameBackend, FrameLoop, FrameStatus, PresentOutcome, SkipReason,
    SwapchainState,
};
pub use glam;
pub use resize::{ResizeSignal, ResizeState};
pub use scene::{BodyPalette, BodyState, InstanceData, SceneSnapshot};
pub use sync::ImagesInFlight;

/// Upper bound for `RendererCreateInfo::frames_in_flight`.
pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 3;
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const ZERO: RenderSize = RenderSize {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is 0, e.g. a minimized window.
    pub const fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Debug)]
pub struct RendererCreateInfo {
    pub width: u32,
    pub height: u32,
    pub enable_validation: bool,
    pub frames_in_flight: usize,
    pub clear_color: [f32; 4],
    pub shader_dir: Option<PathBuf>,
}

impl Default for RendererCreateInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            enable_validation: cfg!(debug_assertions),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            clear_color: [0.02, 0.05, 0.09, 1.0],
            shader_dir: None,
        }
    }
}

impl RendererCreateInfo {
    pub fn clamped_frames_in_flight(&self) -> usize {
        self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT_LIMIT)
    }
}

/// The render-frame contract the application loop drives.
///
/// All methods are called from the thread that owns the renderer. Window-event threads
/// that need to report a new size go through [`ResizeSignal`] instead.
pub trait Renderer {
    fn initialize(
        &mut self,
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        info: &RendererCreateInfo,
    ) -> RenderResult<()>;

    /// Records the desired back-buffer size; the swapchain follows on the next frame.
    fn set_back_buffer_size(&mut self, width: u32, height: u32);

    /// Replaces the scene the next `render_frame` draws.
    fn update_scene(&mut self, view_projection: glam::Mat4, instances: &[InstanceData]);

    fn render_frame(&mut self) -> RenderResult<FrameStatus>;

    /// Releases everything. Safe to call repeatedly or before `initialize`.
    fn deinitialize(&mut self);

    fn is_initialized(&self) -> bool;

    fn set_clear_color(&mut self, _rgba: [f32; 4]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_detects_either_side() {
        assert!(RenderSize::new(0, 10).is_zero_area());
        assert!(RenderSize::new(10, 0).is_zero_area());
        assert!(!RenderSize::new(1, 1).is_zero_area());
    }

    #[test]
    fn frames_in_flight_is_clamped() {
        let mut info = RendererCreateInfo {
            frames_in_flight: 0,
            ..Default::default()
        };
        assert_eq!(info.clamped_frames_in_flight(), 1);
        info.frames_in_flight = 8;
        assert_eq!(info.clamped_frames_in_flight(), MAX_FRAMES_IN_FLIGHT_LIMIT);
    }
}
