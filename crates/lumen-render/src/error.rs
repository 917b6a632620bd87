// SPDX-License-Identifier: CEPL-1.0
use std::{io, path::PathBuf};

use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

/// How far a failure reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The current call failed; the caller stops rendering or tears down.
    FatalToCall,
    /// `initialize` failed and nothing it built is left alive.
    ConstructionFatal,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer is not initialized")]
    NotInitialized,

    #[error("a previous frame failed after resetting its fence; the renderer must be reinitialized")]
    Poisoned,

    #[error("{op} failed: {detail}")]
    Api { op: &'static str, detail: String },

    #[error("acquired image index {index} is out of range (swapchain has {count} images)")]
    ImageIndexOutOfRange { index: u32, count: usize },

    #[error("construction failed: {0}")]
    Construction(String),

    #[error("no physical device can render and present to this surface")]
    NoSuitableDevice,

    #[error("failed to read shader {}", path.display())]
    Shader {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid shader: {0}")]
    InvalidShader(String),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
}

impl RenderError {
    /// Wraps a native result code that is neither success nor a transient swapchain state.
    pub fn api(op: &'static str, detail: impl std::fmt::Display) -> Self {
        RenderError::Api {
            op,
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::NotInitialized
            | RenderError::Poisoned
            | RenderError::Api { .. }
            | RenderError::ImageIndexOutOfRange { .. } => ErrorKind::FatalToCall,
            RenderError::Construction(_)
            | RenderError::NoSuitableDevice
            | RenderError::Shader { .. }
            | RenderError::InvalidShader(_)
            | RenderError::WindowHandle(_) => ErrorKind::ConstructionFatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_fatal_to_call() {
        assert_eq!(RenderError::NotInitialized.kind(), ErrorKind::FatalToCall);
        assert_eq!(RenderError::Poisoned.kind(), ErrorKind::FatalToCall);
        assert_eq!(
            RenderError::api("vkQueueSubmit", "ERROR_DEVICE_LOST").kind(),
            ErrorKind::FatalToCall
        );
        assert_eq!(
            RenderError::ImageIndexOutOfRange { index: 4, count: 3 }.kind(),
            ErrorKind::FatalToCall
        );
    }

    #[test]
    fn build_errors_are_construction_fatal() {
        assert_eq!(
            RenderError::Construction("no formats".into()).kind(),
            ErrorKind::ConstructionFatal
        );
        assert_eq!(RenderError::NoSuitableDevice.kind(), ErrorKind::ConstructionFatal);
    }

    #[test]
    fn window_handle_error_converts_with_its_source() {
        use std::error::Error as _;
        let e: RenderError = raw_window_handle::HandleError::Unavailable.into();
        assert_eq!(e.kind(), ErrorKind::ConstructionFatal);
        assert!(e.source().is_some());
    }

    #[test]
    fn api_error_names_the_call() {
        let e = RenderError::api("vkAcquireNextImageKHR", "ERROR_SURFACE_LOST_KHR");
        assert_eq!(e.to_string(), "vkAcquireNextImageKHR failed: ERROR_SURFACE_LOST_KHR");
    }
}
