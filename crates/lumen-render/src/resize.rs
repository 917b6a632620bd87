// SPDX-License-Identifier: CEPL-1.0
use std::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};

use crate::RenderSize;

/// Desired vs current back-buffer extent.
///
/// `desired` follows the window, `current` is what the live swapchain was built with.
/// A rebuild is due whenever `pending` is set or `current` has a zero side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizeState {
    desired: RenderSize,
    current: RenderSize,
    pending: bool,
}

impl ResizeState {
    /// Starts with a pending build at `initial`, each side raised to at least 1.
    pub fn new(initial: RenderSize) -> Self {
        Self {
            desired: RenderSize::new(initial.width.max(1), initial.height.max(1)),
            current: RenderSize::ZERO,
            pending: true,
        }
    }

    /// A zero side is kept verbatim (minimized). An unchanged size is a no-op.
    pub fn set_back_buffer_size(&mut self, width: u32, height: u32) {
        let size = RenderSize::new(width, height);
        if size == self.desired {
            return;
        }
        self.desired = size;
        self.pending = true;
    }

    pub fn desired(&self) -> RenderSize {
        self.desired
    }

    pub fn current(&self) -> RenderSize {
        self.current
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_minimized(&self) -> bool {
        self.desired.is_zero_area()
    }

    pub fn needs_rebuild(&self) -> bool {
        self.pending || self.current.is_zero_area()
    }

    pub fn mark_pending(&mut self) {
        self.pending = true;
    }

    /// The swapchain was rebuilt at `actual`; the surface may have overridden `desired`.
    pub fn finish_rebuild(&mut self, actual: RenderSize) {
        self.current = actual;
        self.desired = actual;
        self.pending = false;
    }

    pub fn rebuild_failed(&mut self) {
        self.current = RenderSize::ZERO;
        self.pending = true;
    }
}

const EMPTY: u64 = u64::MAX;

fn pack(width: u32, height: u32) -> u64 {
    (u64::from(width) << 32) | u64::from(height)
}

fn unpack(v: u64) -> RenderSize {
    RenderSize::new((v >> 32) as u32, v as u32)
}

/// Latest-value mailbox for back-buffer sizes posted from another thread.
///
/// Only the newest posted size survives; `take` empties the mailbox. `u32::MAX × u32::MAX`
/// is reserved as the empty marker and is never a real window size.
#[derive(Clone, Debug)]
pub struct ResizeSignal {
    slot: Arc<AtomicU64>,
}

impl Default for ResizeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ResizeSignal {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(AtomicU64::new(EMPTY)),
        }
    }

    pub fn post(&self, width: u32, height: u32) {
        self.slot.store(pack(width, height), Ordering::Release);
    }

    pub fn take(&self) -> Option<RenderSize> {
        match self.slot.swap(EMPTY, Ordering::AcqRel) {
            EMPTY => None,
            v => Some(unpack(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built(w: u32, h: u32) -> ResizeState {
        let mut s = ResizeState::new(RenderSize::new(w, h));
        s.finish_rebuild(RenderSize::new(w, h));
        s
    }

    #[test]
    fn new_state_needs_a_build() {
        let s = ResizeState::new(RenderSize::new(0, 600));
        assert_eq!(s.desired(), RenderSize::new(1, 600));
        assert!(s.is_pending());
        assert!(s.needs_rebuild());
    }

    #[test]
    fn unchanged_size_is_a_noop() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(800, 600);
        assert!(!s.is_pending());
        assert!(!s.needs_rebuild());
    }

    #[test]
    fn changed_size_marks_pending() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(1024, 600);
        assert!(s.is_pending());
        assert_eq!(s.desired(), RenderSize::new(1024, 600));
    }

    #[test]
    fn zero_size_is_kept_as_minimized() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(0, 0);
        assert!(s.is_minimized());
        assert_eq!(s.desired(), RenderSize::ZERO);
        assert!(s.is_pending());
    }

    #[test]
    fn repeated_minimize_is_a_noop() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(0, 0);
        s.finish_rebuild(RenderSize::ZERO);
        assert!(!s.is_pending());
        s.set_back_buffer_size(0, 0);
        assert!(!s.is_pending());
        assert!(s.is_minimized());

        s.set_back_buffer_size(800, 600);
        assert!(s.is_pending());
    }

    #[test]
    fn failed_rebuild_stays_pending() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(640, 480);
        s.rebuild_failed();
        assert!(s.needs_rebuild());
        assert!(s.current().is_zero_area());
    }

    #[test]
    fn rebuild_adopts_the_actual_extent() {
        let mut s = built(800, 600);
        s.set_back_buffer_size(640, 480);
        s.finish_rebuild(RenderSize::new(640, 470));
        assert_eq!(s.desired(), RenderSize::new(640, 470));
        assert!(!s.needs_rebuild());
    }

    #[test]
    fn signal_keeps_only_the_latest_size() {
        let sig = ResizeSignal::new();
        assert_eq!(sig.take(), None);
        sig.post(1, 2);
        sig.post(0, 0);
        sig.post(1920, 1080);
        assert_eq!(sig.take(), Some(RenderSize::new(1920, 1080)));
        assert_eq!(sig.take(), None);
    }

    #[test]
    fn signal_carries_zero_sizes() {
        let sig = ResizeSignal::new();
        sig.post(0, 0);
        assert_eq!(sig.take(), Some(RenderSize::ZERO));
    }
}
