// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, CStr};

use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::{vk, Entry, Instance};
use lumen_render::{RenderError, RenderResult};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::{info, warn};

use crate::debug::messenger_create_info;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Graphics and present queue families; they may be the same family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// One entry per distinct family.
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Picks the graphics family and a present family, preferring one that does both.
pub(crate) fn select_queue_families(
    flags: &[vk::QueueFlags],
    can_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let graphics = flags
        .iter()
        .position(|f| f.contains(vk::QueueFlags::GRAPHICS))? as u32;
    let present = if can_present(graphics) {
        graphics
    } else {
        (0..flags.len() as u32).find(|&i| can_present(i))?
    };
    Some(QueueFamilies { graphics, present })
}

/// Instance-level objects, destroyed surface first, then messenger, then instance.
struct InstanceHandles {
    entry: Entry,
    instance: Instance,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
}

impl Drop for InstanceHandles {
    fn drop(&mut self) {
        unsafe {
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Instance, surface, physical/logical device and queues for one window.
pub struct VkContext {
    pub(crate) phys: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) families: QueueFamilies,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    base: InstanceHandles,
}

impl Drop for VkContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
        }
        // `base` drops next: surface, messenger, instance
    }
}

impl VkContext {
    pub unsafe fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        enable_validation: bool,
    ) -> RenderResult<Self> {
        // STRICT ORDER: instance, then the surface from it, then devices queried against it.
        let entry = Entry::load()
            .map_err(|e| RenderError::Construction(format!("loading the Vulkan library: {e}")))?;

        let validation = enable_validation && has_validation_layer(&entry);
        if enable_validation && !validation {
            warn!("validation requested but {:?} is not installed", VALIDATION_LAYER);
        }

        let debug_utils_available = validation && has_instance_extension(&entry, debug_utils::NAME);
        let layers = InstanceLayers::select(validation, debug_utils_available);
        if validation && !layers.debug_utils {
            warn!("{:?} unavailable; validation messages will not be logged", debug_utils::NAME);
        }
        let instance = create_instance(&entry, display, &layers)?;
        let surface_loader = surface::Instance::new(&entry, &instance);
        let mut base = InstanceHandles {
            entry,
            instance,
            debug: None,
            surface_loader,
            surface: vk::SurfaceKHR::null(),
        };

        if layers.debug_utils {
            let loader = debug_utils::Instance::new(&base.entry, &base.instance);
            match loader.create_debug_utils_messenger(&messenger_create_info(), None) {
                Ok(m) => base.debug = Some((loader, m)),
                Err(e) => warn!("debug messenger unavailable: {e}"),
            }
        }

        base.surface = ash_window::create_surface(&base.entry, &base.instance, display, window, None)
            .map_err(|e| RenderError::Construction(format!("vkCreateSurfaceKHR: {e}")))?;

        let (phys, families) = pick_physical_device(&base.instance, &base.surface_loader, base.surface)?;
        let device = create_device(&base.instance, phys, families)?;
        let graphics_queue = device.get_device_queue(families.graphics, 0);
        let present_queue = device.get_device_queue(families.present, 0);

        let props = base.instance.get_physical_device_properties(phys);
        info!(
            "vk device: {} (graphics family {}, present family {}, validation={})",
            props
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            families.graphics,
            families.present,
            base.debug.is_some()
        );

        Ok(Self {
            phys,
            device,
            families,
            graphics_queue,
            present_queue,
            base,
        })
    }

    pub(crate) fn instance(&self) -> &Instance {
        &self.base.instance
    }

    pub(crate) fn surface_loader(&self) -> &surface::Instance {
        &self.base.surface_loader
    }

    pub(crate) fn surface(&self) -> vk::SurfaceKHR {
        self.base.surface
    }

    pub(crate) unsafe fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        self.base.instance.get_physical_device_memory_properties(self.phys)
    }
}

unsafe fn has_validation_layer(entry: &Entry) -> bool {
    entry
        .enumerate_instance_layer_properties()
        .unwrap_or_default()
        .iter()
        .any(|l| l.layer_name_as_c_str() == Ok(VALIDATION_LAYER))
}

unsafe fn has_instance_extension(entry: &Entry, name: &CStr) -> bool {
    entry
        .enumerate_instance_extension_properties(None)
        .unwrap_or_default()
        .iter()
        .any(|e| e.extension_name_as_c_str() == Ok(name))
}

/// Optional instance layers and extensions beyond what the window system requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InstanceLayers {
    validation: bool,
    /// The messenger may only be created when this extension was enabled.
    debug_utils: bool,
}

impl InstanceLayers {
    fn select(validation: bool, debug_utils_available: bool) -> Self {
        Self {
            validation,
            debug_utils: validation && debug_utils_available,
        }
    }

    fn layer_names(&self) -> Vec<*const c_char> {
        if self.validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        }
    }

    fn extension_names(&self) -> Vec<*const c_char> {
        if self.debug_utils {
            vec![debug_utils::NAME.as_ptr()]
        } else {
            Vec::new()
        }
    }
}

unsafe fn create_instance(
    entry: &Entry,
    display: RawDisplayHandle,
    optional: &InstanceLayers,
) -> RenderResult<Instance> {
    let app_name = c"lumen";
    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app_name.as_ptr(),
        application_version: 0,
        p_engine_name: app_name.as_ptr(),
        engine_version: 0,
        api_version: vk::API_VERSION_1_0,
        ..Default::default()
    };

    let mut extensions: Vec<*const c_char> = ash_window::enumerate_required_extensions(display)
        .map_err(|e| RenderError::Construction(format!("required surface extensions: {e}")))?
        .to_vec();
    extensions.extend(optional.extension_names());
    let layers = optional.layer_names();

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_application_info: &app_info,
        enabled_extension_count: extensions.len() as u32,
        pp_enabled_extension_names: extensions.as_ptr(),
        enabled_layer_count: layers.len() as u32,
        pp_enabled_layer_names: layers.as_ptr(),
        ..Default::default()
    };

    entry
        .create_instance(&create_info, None)
        .map_err(|e| RenderError::Construction(format!("vkCreateInstance: {e}")))
}

unsafe fn supports_swapchain(instance: &Instance, phys: vk::PhysicalDevice) -> bool {
    instance
        .enumerate_device_extension_properties(phys)
        .unwrap_or_default()
        .iter()
        .any(|e| e.extension_name_as_c_str() == Ok(swapchain::NAME))
}

unsafe fn pick_physical_device(
    instance: &Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
) -> RenderResult<(vk::PhysicalDevice, QueueFamilies)> {
    let devices = instance
        .enumerate_physical_devices()
        .map_err(|e| RenderError::api("vkEnumeratePhysicalDevices", e))?;

    for phys in devices {
        if !supports_swapchain(instance, phys) {
            continue;
        }
        let flags: Vec<vk::QueueFlags> = instance
            .get_physical_device_queue_family_properties(phys)
            .iter()
            .map(|q| q.queue_flags)
            .collect();
        let can_present = |i: u32| {
            surface_loader
                .get_physical_device_surface_support(phys, i, surface)
                .unwrap_or(false)
        };
        if let Some(families) = select_queue_families(&flags, can_present) {
            return Ok((phys, families));
        }
    }
    Err(RenderError::NoSuitableDevice)
}

unsafe fn create_device(
    instance: &Instance,
    phys: vk::PhysicalDevice,
    families: QueueFamilies,
) -> RenderResult<ash::Device> {
    let priorities = [1.0_f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique()
        .into_iter()
        .map(|family| vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index: family,
            queue_count: 1,
            p_queue_priorities: priorities.as_ptr(),
            ..Default::default()
        })
        .collect();

    let device_exts = [swapchain::NAME.as_ptr()];
    let create_info = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: queue_infos.len() as u32,
        p_queue_create_infos: queue_infos.as_ptr(),
        enabled_extension_count: device_exts.len() as u32,
        pp_enabled_extension_names: device_exts.as_ptr(),
        ..Default::default()
    };

    instance
        .create_device(phys, &create_info, None)
        .map_err(|e| RenderError::Construction(format!("vkCreateDevice: {e}")))
}
