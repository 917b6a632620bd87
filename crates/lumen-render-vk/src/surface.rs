// SPDX-License-Identifier: CEPL-1.0
//! Surface capability query and the swapchain selection policy.
//!
//! The `choose_*` functions are pure over `ash::vk` value types and are the only place the
//! policy lives; `Swapchain::initialize` just applies them.
use ash::khr::surface;
use ash::vk;
use lumen_render::{RenderError, RenderResult, RenderSize};

/// Fallback when the surface gives no usable preference.
pub const DEFAULT_SURFACE_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;
pub const PREFERRED_SURFACE_FORMAT: vk::Format = vk::Format::B8G8R8A8_SRGB;

#[derive(Clone, Debug, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Empty format or present-mode lists are returned as is; only a failing query is an error.
    pub unsafe fn query(
        loader: &surface::Instance,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> RenderResult<Self> {
        let capabilities = loader
            .get_physical_device_surface_capabilities(phys, surface)
            .map_err(|e| RenderError::api("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
        let formats = loader
            .get_physical_device_surface_formats(phys, surface)
            .map_err(|e| RenderError::api("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
        let present_modes = loader
            .get_physical_device_surface_present_modes(phys, surface)
            .map_err(|e| RenderError::api("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;
        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// False while the surface reports a zero-sized current extent (minimized window).
    pub fn has_area(&self) -> bool {
        let e = self.capabilities.current_extent;
        e.width == u32::MAX || (e.width != 0 && e.height != 0)
    }
}

fn is_wide_gamut(cs: vk::ColorSpaceKHR) -> bool {
    matches!(
        cs,
        vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT | vk::ColorSpaceKHR::DCI_P3_NONLINEAR_EXT
    )
}

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let Some(&first) = formats.first() else {
        return vk::SurfaceFormatKHR {
            format: DEFAULT_SURFACE_FORMAT,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
    };

    if let Some(&exact) = formats.iter().find(|f| {
        f.format == PREFERRED_SURFACE_FORMAT && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    }) {
        return exact;
    }

    // An undefined format means "anything goes"; keep the reported color space unless it is
    // a wide-gamut one, which is swapped for plain sRGB.
    let mut chosen = first;
    if chosen.format == vk::Format::UNDEFINED {
        chosen.format = DEFAULT_SURFACE_FORMAT;
        if is_wide_gamut(chosen.color_space) {
            chosen.color_space = vk::ColorSpaceKHR::SRGB_NONLINEAR;
        }
    }
    chosen
}

pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by the maximum (0 means no cap).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

const COMPOSITE_ALPHA_PRIORITY: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];

/// First supported of opaque, pre-multiplied, post-multiplied, inherit. The order is fixed.
pub fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    COMPOSITE_ALPHA_PRIORITY
        .into_iter()
        .find(|&c| supported.contains(c))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::INHERIT)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueSharing {
    Exclusive,
    Concurrent([u32; 2]),
}

impl QueueSharing {
    pub fn mode(&self) -> vk::SharingMode {
        match self {
            QueueSharing::Exclusive => vk::SharingMode::EXCLUSIVE,
            QueueSharing::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    pub fn indices(&self) -> &[u32] {
        match self {
            QueueSharing::Exclusive => &[],
            QueueSharing::Concurrent(pair) => pair,
        }
    }
}

pub fn queue_sharing(graphics_family: u32, present_family: u32) -> QueueSharing {
    if graphics_family == present_family {
        QueueSharing::Exclusive
    } else {
        QueueSharing::Concurrent([graphics_family, present_family])
    }
}

// Info only
pub(crate) fn fmt_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM",
        _ => "OTHER",
    }
}

pub(crate) fn cs_name(cs: vk::ColorSpaceKHR) -> &'static str {
    match cs {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => "SRGB_NONLINEAR",
        vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT => "DISPLAY_P3_NONLINEAR",
        vk::ColorSpaceKHR::DCI_P3_NONLINEAR_EXT => "DCI_P3_NONLINEAR",
        _ => "OTHER",
    }
}

pub(crate) fn pm_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sf(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 64,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 2048,
            },
            ..Default::default()
        }
    }

    #[test]
    fn no_formats_uses_the_default() {
        let f = choose_surface_format(&[]);
        assert_eq!(f.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn single_undefined_keeps_its_color_space() {
        let f = choose_surface_format(&[sf(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        )]);
        assert_eq!(f.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT);
    }

    #[test]
    fn single_undefined_wide_gamut_is_normalized() {
        let f = choose_surface_format(&[sf(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
        )]);
        assert_eq!(f.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn exact_srgb_match_wins_over_order() {
        let formats = [
            sf(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            sf(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            sf(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let f = choose_surface_format(&formats);
        assert_eq!(f.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn otherwise_first_format_is_taken_verbatim() {
        let formats = [
            sf(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            sf(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let f = choose_surface_format(&formats);
        assert_eq!(f.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(f.color_space, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT);
    }

    #[test]
    fn mailbox_preferred_else_fifo() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::FIFO_RELAXED]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(choose_present_mode(&[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn current_extent_is_authoritative() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let e = choose_extent(&c, RenderSize::new(1920, 1080));
        assert_eq!((e.width, e.height), (800, 600));
    }

    #[test]
    fn undefined_extent_is_clamped_to_bounds() {
        let e = choose_extent(&caps(2, 3), RenderSize::new(10_000, 10));
        assert_eq!((e.width, e.height), (4096, 64));
    }

    #[test]
    fn image_count_is_min_plus_one_capped() {
        assert_eq!(choose_image_count(&caps(3, 3)), 3);
        assert_eq!(choose_image_count(&caps(2, 8)), 3);
        assert_eq!(choose_image_count(&caps(2, 0)), 3);
    }

    #[test]
    fn composite_alpha_follows_priority() {
        use vk::CompositeAlphaFlagsKHR as A;
        assert_eq!(choose_composite_alpha(A::INHERIT | A::OPAQUE), A::OPAQUE);
        assert_eq!(
            choose_composite_alpha(A::INHERIT | A::POST_MULTIPLIED | A::PRE_MULTIPLIED),
            A::PRE_MULTIPLIED
        );
        assert_eq!(choose_composite_alpha(A::INHERIT | A::POST_MULTIPLIED), A::POST_MULTIPLIED);
        assert_eq!(choose_composite_alpha(A::empty()), A::INHERIT);
    }

    #[test]
    fn different_families_share_concurrently() {
        let s = queue_sharing(0, 1);
        assert_eq!(s.mode(), vk::SharingMode::CONCURRENT);
        assert_eq!(s.indices(), &[0, 1]);
    }

    #[test]
    fn same_family_is_exclusive_without_indices() {
        let s = queue_sharing(2, 2);
        assert_eq!(s.mode(), vk::SharingMode::EXCLUSIVE);
        assert!(s.indices().is_empty());
    }

    #[test]
    fn zero_current_extent_has_no_area() {
        let mut support = SurfaceSupport {
            capabilities: caps(2, 3),
            ..Default::default()
        };
        assert!(support.has_area());
        support.capabilities.current_extent = vk::Extent2D { width: 0, height: 0 };
        assert!(!support.has_area());
    }
}
