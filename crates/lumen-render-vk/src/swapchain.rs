// SPDX-License-Identifier: CEPL-1.0
use ash::khr::{surface, swapchain};
use ash::vk;
use lumen_render::{RenderError, RenderResult, RenderSize};
use tracing::info;

use crate::handles::Owned;
use crate::surface::{
    choose_composite_alpha, choose_extent, choose_image_count, choose_present_mode,
    choose_surface_format, cs_name, fmt_name, pm_name, queue_sharing, SurfaceSupport,
};

#[derive(Clone, Copy, Debug)]
pub struct SwapchainCreateInfo {
    pub surface: vk::SurfaceKHR,
    pub extent: RenderSize,
    pub graphics_family: u32,
    pub present_family: u32,
}

/// The presentable images plus one view per image.
///
/// Images belong to the presentation engine; only the views and the chain handle are
/// destroyed here. `images.len() == views.len()` whenever the chain exists.
pub struct Swapchain {
    device: ash::Device,
    loader: swapchain::Device,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<Owned<vk::ImageView>>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    pub fn new(instance: &ash::Instance, device: &ash::Device) -> Self {
        Self {
            device: device.clone(),
            loader: swapchain::Device::new(instance, device),
            handle: vk::SwapchainKHR::null(),
            images: Vec::new(),
            views: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
        }
    }

    /// Builds the chain and its views. On failure nothing built here is left alive.
    pub unsafe fn initialize(
        &mut self,
        surface_loader: &surface::Instance,
        phys: vk::PhysicalDevice,
        info: &SwapchainCreateInfo,
    ) -> RenderResult<()> {
        debug_assert!(!self.is_initialized(), "swapchain already created");
        let result = self.build(surface_loader, phys, info);
        if result.is_err() {
            self.deinitialize();
        }
        result
    }

    unsafe fn build(
        &mut self,
        surface_loader: &surface::Instance,
        phys: vk::PhysicalDevice,
        info: &SwapchainCreateInfo,
    ) -> RenderResult<()> {
        let support = SurfaceSupport::query(surface_loader, phys, info.surface)?;
        if support.formats.is_empty() {
            return Err(RenderError::Construction("surface reports no formats".into()));
        }
        if support.present_modes.is_empty() {
            return Err(RenderError::Construction("surface reports no present modes".into()));
        }

        let caps = &support.capabilities;
        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(caps, info.extent);
        let image_count = choose_image_count(caps);
        let composite_alpha = choose_composite_alpha(caps.supported_composite_alpha);
        let sharing = queue_sharing(info.graphics_family, info.present_family);

        if extent.width == 0 || extent.height == 0 {
            return Err(RenderError::Construction("surface extent is 0".into()));
        }

        let indices = sharing.indices();
        let swap_info = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: info.surface,
            min_image_count: image_count,
            image_format: surface_format.format,
            image_color_space: surface_format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: sharing.mode(),
            queue_family_index_count: indices.len() as u32,
            p_queue_family_indices: if indices.is_empty() {
                std::ptr::null()
            } else {
                indices.as_ptr()
            },
            pre_transform: caps.current_transform,
            composite_alpha,
            present_mode,
            clipped: vk::TRUE,
            old_swapchain: vk::SwapchainKHR::null(),
            ..Default::default()
        };

        self.handle = self.loader.create_swapchain(&swap_info, None).map_err(|e| {
            RenderError::Construction(format!(
                "vkCreateSwapchainKHR: {e} (extent {}x{}, {} images, alpha {:?})",
                extent.width, extent.height, image_count, composite_alpha
            ))
        })?;

        self.images = self
            .loader
            .get_swapchain_images(self.handle)
            .map_err(|e| RenderError::Construction(format!("vkGetSwapchainImagesKHR: {e}")))?;
        if self.images.is_empty() {
            return Err(RenderError::Construction("swapchain has no images".into()));
        }

        self.views.reserve(self.images.len());
        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo {
                s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
                image,
                view_type: vk::ImageViewType::TYPE_2D,
                format: surface_format.format,
                components: vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                },
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                ..Default::default()
            };
            let view = self
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| RenderError::Construction(format!("vkCreateImageView: {e}")))?;
            self.views.push(Owned::new(&self.device, view));
        }

        self.format = surface_format.format;
        self.extent = extent;
        self.present_mode = present_mode;

        info!(
            "swapchain: format {} / {}, present_mode {}, extent {}x{}, images(min={} → requested={} → got={}), sharing {:?}",
            fmt_name(surface_format.format),
            cs_name(surface_format.color_space),
            pm_name(present_mode),
            extent.width,
            extent.height,
            caps.min_image_count,
            image_count,
            self.images.len(),
            sharing
        );
        Ok(())
    }

    /// Views first, then the chain. A no-op when nothing is built.
    pub fn deinitialize(&mut self) {
        self.views.clear();
        self.images.clear();
        if self.handle != vk::SwapchainKHR::null() {
            unsafe { self.loader.destroy_swapchain(self.handle, None) };
            self.handle = vk::SwapchainKHR::null();
        }
        self.extent = vk::Extent2D::default();
    }

    pub fn is_initialized(&self) -> bool {
        self.handle != vk::SwapchainKHR::null()
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub(crate) fn loader(&self) -> &swapchain::Device {
        &self.loader
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> impl Iterator<Item = vk::ImageView> + '_ {
        self.views.iter().map(Owned::raw)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.deinitialize();
    }
}
