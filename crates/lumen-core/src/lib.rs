// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::time::{Duration, Instant};

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Counts presented frames and reports a rate once per window.
#[derive(Debug)]
pub struct FrameCounter {
    window: Duration,
    frames: u32,
    window_start: Instant,
}

impl FrameCounter {
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: Duration, now: Instant) -> Self {
        Self {
            window,
            frames: 0,
            window_start: now,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    /// Drops the current window, e.g. while paused.
    pub fn reset(&mut self, now: Instant) {
        self.frames = 0;
        self.window_start = now;
    }

    /// Returns frames-per-second once the window has elapsed, then starts a new window.
    pub fn poll(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.reset(now);
        Some(fps)
    }
}
