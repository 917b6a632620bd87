// SPDX-License-Identifier: CEPL-1.0
//! Windowing collaborator. winit lives here; the app reaches it through this crate.
pub use winit;

use tracing::debug;
use winit::dpi::LogicalSize;
use winit::window::{Window, WindowAttributes};

/// Attributes for the main window; sizes below 1 are raised to 1.
pub fn window_attributes(title: &str, width: u32, height: u32) -> WindowAttributes {
    Window::default_attributes()
        .with_title(title)
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
}

/// Current drawable size in physical pixels. A minimized window reports 0 on some platforms.
pub fn framebuffer_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    debug!("framebuffer size {}x{}", size.width, size.height);
    (size.width, size.height)
}
