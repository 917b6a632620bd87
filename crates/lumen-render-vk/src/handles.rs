// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

/// A device-level handle that knows how to destroy itself.
pub(crate) trait Destroy: Copy {
    /// # Safety
    /// `self` was created from `device` and is no longer in use by the GPU.
    unsafe fn destroy(self, device: &ash::Device);
}

macro_rules! impl_destroy {
    ($($ty:ty => $f:ident),* $(,)?) => {
        $(impl Destroy for $ty {
            unsafe fn destroy(self, device: &ash::Device) {
                device.$f(self, None);
            }
        })*
    };
}

impl_destroy! {
    vk::ImageView => destroy_image_view,
    vk::Framebuffer => destroy_framebuffer,
    vk::RenderPass => destroy_render_pass,
    vk::Pipeline => destroy_pipeline,
    vk::PipelineLayout => destroy_pipeline_layout,
    vk::Semaphore => destroy_semaphore,
    vk::Fence => destroy_fence,
    vk::DescriptorPool => destroy_descriptor_pool,
    vk::DescriptorSetLayout => destroy_descriptor_set_layout,
    vk::ShaderModule => destroy_shader_module,
    vk::CommandPool => destroy_command_pool,
    vk::Buffer => destroy_buffer,
    vk::DeviceMemory => free_memory,
}

/// Sole owner of one native handle; destroys it exactly once on drop.
///
/// Holds a clone of the device dispatch table, so every `Owned` must be dropped before the
/// `VkContext` that created the device.
pub(crate) struct Owned<T: Destroy> {
    device: ash::Device,
    raw: T,
}

impl<T: Destroy> Owned<T> {
    /// # Safety
    /// `raw` was created from `device` and nothing else destroys it.
    pub unsafe fn new(device: &ash::Device, raw: T) -> Self {
        Self {
            device: device.clone(),
            raw,
        }
    }

    pub fn raw(&self) -> T {
        self.raw
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }
}

impl<T: Destroy> Drop for Owned<T> {
    fn drop(&mut self) {
        unsafe { self.raw.destroy(&self.device) }
    }
}

impl<T: Destroy + std::fmt::Debug> std::fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Owned").field(&self.raw).finish()
    }
}
