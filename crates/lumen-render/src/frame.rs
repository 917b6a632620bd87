// SPDX-License-Identifier: CEPL-1.0
//! The per-frame state machine, independent of the graphics API behind it.
//!
//! A [`FrameBackend`] performs the native calls; [`FrameLoop`] decides their order and keeps
//! the bookkeeping that has to survive between frames: the resize tracker, the
//! images-in-flight table and the ring slot index.
use std::fmt::Debug;

use glam::Mat4;
use tracing::{debug, info};

use crate::{ImagesInFlight, RenderError, RenderResult, RenderSize, ResizeState, SceneSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface and cannot be used.
    OutOfDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out-of-date or suboptimal: the image was consumed but the swapchain should be rebuilt.
    Stale,
}

/// What a swapchain rebuild actually produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainState {
    pub extent: RenderSize,
    pub image_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The window (or surface) has zero area.
    Minimized,
    /// The swapchain went out of date during acquire and was rebuilt instead of drawing.
    SwapchainRebuilt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Presented { slot: usize, image_index: u32 },
    Skipped(SkipReason),
}

impl FrameStatus {
    pub fn is_presented(&self) -> bool {
        matches!(self, FrameStatus::Presented { .. })
    }
}

/// Native operations one frame is made of.
///
/// `slot` is always in `0..frames_in_flight()`. Waits never time out.
pub trait FrameBackend {
    type Fence: Copy + Eq + Debug;

    /// Size of the slot ring; the loop takes its ring length from here.
    fn frames_in_flight(&self) -> usize;
    fn in_flight_fence(&self, slot: usize) -> Self::Fence;

    fn wait_for_fence(&mut self, fence: Self::Fence) -> RenderResult<()>;
    fn reset_fence(&mut self, fence: Self::Fence) -> RenderResult<()>;

    fn acquire_next_image(&mut self, slot: usize) -> RenderResult<AcquireOutcome>;
    fn write_frame_uniforms(&mut self, slot: usize, view_projection: &Mat4) -> RenderResult<()>;
    /// Draws every [`SceneSnapshot::drawable`] instance into the image at `image_index`.
    fn record_frame(
        &mut self,
        slot: usize,
        image_index: u32,
        extent: RenderSize,
        scene: &SceneSnapshot,
    ) -> RenderResult<()>;
    fn submit_frame(&mut self, slot: usize) -> RenderResult<()>;
    fn present_frame(&mut self, slot: usize, image_index: u32) -> RenderResult<PresentOutcome>;

    /// Waits for the device to go idle, then destroys and rebuilds everything that depends
    /// on the swapchain. Returns a zero extent without building when the surface has no area.
    fn rebuild_swapchain(&mut self, desired: RenderSize) -> RenderResult<SwapchainState>;
}

#[derive(Debug)]
pub struct FrameLoop<F> {
    resize: ResizeState,
    images_in_flight: ImagesInFlight<F>,
    frame_index: usize,
    rebuilds: u64,
    // A slot fence was reset but never submitted; waiting on it would block forever.
    poisoned: bool,
}

impl<F: Copy + Eq + Debug> FrameLoop<F> {
    pub fn new(initial: RenderSize) -> Self {
        Self {
            resize: ResizeState::new(initial),
            images_in_flight: ImagesInFlight::default(),
            frame_index: 0,
            rebuilds: 0,
            poisoned: false,
        }
    }

    pub fn set_back_buffer_size(&mut self, width: u32, height: u32) {
        self.resize.set_back_buffer_size(width, height);
    }

    pub fn resize(&self) -> &ResizeState {
        &self.resize
    }

    pub fn images_in_flight(&self) -> &ImagesInFlight<F> {
        &self.images_in_flight
    }

    /// Ring slot the next frame records into.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// True once a frame failed between fence reset and submit. Every later frame fails
    /// with [`RenderError::Poisoned`]; only a fresh loop and backend recover.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Stop-the-world rebuild at the desired extent.
    ///
    /// Returns `Ok(false)` when there is nothing to build because the desired extent or the
    /// surface has zero area. On error the loop stays pending with a zero current extent so
    /// no frame proceeds against partially built resources.
    pub fn recreate_swapchain<B>(&mut self, backend: &mut B) -> RenderResult<bool>
    where
        B: FrameBackend<Fence = F>,
    {
        let desired = self.resize.desired();
        if desired.is_zero_area() {
            return Ok(false);
        }

        let state = match backend.rebuild_swapchain(desired) {
            Ok(s) => s,
            Err(e) => {
                self.resize.rebuild_failed();
                self.images_in_flight.reset(0);
                return Err(e);
            }
        };

        if state.extent.is_zero_area() || state.image_count == 0 {
            debug!("surface has no area, swapchain rebuild deferred");
            self.resize.rebuild_failed();
            self.images_in_flight.reset(0);
            return Ok(false);
        }

        self.resize.finish_rebuild(state.extent);
        self.images_in_flight.reset(state.image_count);
        self.frame_index = 0;
        self.rebuilds += 1;
        info!(
            "swapchain ready: {}x{}, {} images (build #{})",
            state.extent.width, state.extent.height, state.image_count, self.rebuilds
        );
        Ok(true)
    }

    fn ensure_swapchain<B>(&mut self, backend: &mut B) -> RenderResult<bool>
    where
        B: FrameBackend<Fence = F>,
    {
        if !self.resize.needs_rebuild() {
            return Ok(true);
        }
        self.recreate_swapchain(backend)
    }

    pub fn render_frame<B>(&mut self, backend: &mut B, scene: &SceneSnapshot) -> RenderResult<FrameStatus>
    where
        B: FrameBackend<Fence = F>,
    {
        if self.poisoned {
            return Err(RenderError::Poisoned);
        }
        if self.resize.is_minimized() {
            debug!("frame skipped: minimized");
            return Ok(FrameStatus::Skipped(SkipReason::Minimized));
        }
        if !self.ensure_swapchain(backend)? {
            return Ok(FrameStatus::Skipped(SkipReason::Minimized));
        }

        let ring = backend.frames_in_flight().max(1);
        let slot = self.frame_index % ring;
        let fence = backend.in_flight_fence(slot);
        backend.wait_for_fence(fence)?;

        let image_index = match backend.acquire_next_image(slot)? {
            AcquireOutcome::OutOfDate => {
                debug!("frame skipped: swapchain out of date on acquire");
                self.resize.mark_pending();
                let reason = if self.ensure_swapchain(backend)? {
                    SkipReason::SwapchainRebuilt
                } else {
                    SkipReason::Minimized
                };
                return Ok(FrameStatus::Skipped(reason));
            }
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                if suboptimal {
                    debug!("swapchain suboptimal, rebuilding after this frame");
                    self.resize.mark_pending();
                }
                image_index
            }
        };

        if let Some(owner) = self.images_in_flight.conflicting(image_index, fence)? {
            backend.wait_for_fence(owner)?;
        }
        self.images_in_flight.claim(image_index, fence)?;

        let extent = self.resize.current();
        let submitted = backend
            .reset_fence(fence)
            .and_then(|()| backend.write_frame_uniforms(slot, &scene.view_projection))
            .and_then(|()| backend.record_frame(slot, image_index, extent, scene))
            .and_then(|()| backend.submit_frame(slot));
        if let Err(e) = submitted {
            self.poisoned = true;
            return Err(e);
        }

        let rebuilt = match backend.present_frame(slot, image_index)? {
            PresentOutcome::Presented => false,
            PresentOutcome::Stale => {
                debug!("swapchain stale on present");
                self.resize.mark_pending();
                self.ensure_swapchain(backend)?
            }
        };
        if !rebuilt {
            self.frame_index = (slot + 1) % ring;
        }

        Ok(FrameStatus::Presented { slot, image_index })
    }
}
