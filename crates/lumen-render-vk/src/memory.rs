// SPDX-License-Identifier: CEPL-1.0
use std::ptr::NonNull;

use ash::vk;
use lumen_render::{RenderError, RenderResult};

use crate::context::VkContext;
use crate::handles::Owned;

pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    req: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count).find(|&i| {
        (type_bits & (1 << i)) != 0 && props.memory_types[i as usize].property_flags.contains(req)
    })
}

/// Host-visible, host-coherent buffer that stays mapped for its whole life.
pub(crate) struct HostBuffer {
    buffer: Owned<vk::Buffer>,
    memory: Owned<vk::DeviceMemory>,
    mapped: NonNull<u8>,
    size: usize,
}

impl HostBuffer {
    pub unsafe fn new(
        ctx: &VkContext,
        size: usize,
        usage: vk::BufferUsageFlags,
    ) -> RenderResult<Self> {
        let device = &ctx.device;
        let bci = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            size: size as vk::DeviceSize,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let buffer = Owned::new(
            device,
            device
                .create_buffer(&bci, None)
                .map_err(|e| RenderError::api("vkCreateBuffer", e))?,
        );

        let req = device.get_buffer_memory_requirements(buffer.raw());
        let wanted = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let mem_type = find_memory_type(&ctx.memory_properties(), req.memory_type_bits, wanted)
            .ok_or_else(|| RenderError::api("vkAllocateMemory", "no host-visible coherent memory type"))?;

        let mai = vk::MemoryAllocateInfo {
            s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
            allocation_size: req.size,
            memory_type_index: mem_type,
            ..Default::default()
        };
        let memory = Owned::new(
            device,
            device
                .allocate_memory(&mai, None)
                .map_err(|e| RenderError::api("vkAllocateMemory", e))?,
        );
        device
            .bind_buffer_memory(buffer.raw(), memory.raw(), 0)
            .map_err(|e| RenderError::api("vkBindBufferMemory", e))?;

        let ptr = device
            .map_memory(memory.raw(), 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            .map_err(|e| RenderError::api("vkMapMemory", e))?;
        let mapped = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| RenderError::api("vkMapMemory", "null mapping"))?;

        Ok(Self {
            buffer,
            memory,
            mapped,
            size,
        })
    }

    pub unsafe fn with_data(
        ctx: &VkContext,
        usage: vk::BufferUsageFlags,
        data: &[u8],
    ) -> RenderResult<Self> {
        let mut buf = Self::new(ctx, data.len(), usage)?;
        buf.write(data);
        Ok(buf)
    }

    /// Copies `data` to the start of the mapping. The caller makes sure the GPU is not reading it.
    pub fn write(&mut self, data: &[u8]) {
        let n = data.len().min(self.size);
        debug_assert_eq!(n, data.len(), "write past the end of a host buffer");
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), self.mapped.as_ptr(), n) }
    }

    pub fn raw(&self) -> vk::Buffer {
        self.buffer.raw()
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe { self.buffer.device().unmap_memory(self.memory.raw()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut p = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &f) in flags.iter().enumerate() {
            p.memory_types[i].property_flags = f;
        }
        p
    }

    #[test]
    fn picks_first_allowed_type_with_all_flags() {
        use vk::MemoryPropertyFlags as M;
        let p = props(&[M::DEVICE_LOCAL, M::HOST_VISIBLE, M::HOST_VISIBLE | M::HOST_COHERENT]);
        let want = M::HOST_VISIBLE | M::HOST_COHERENT;
        assert_eq!(find_memory_type(&p, 0b111, want), Some(2));
        assert_eq!(find_memory_type(&p, 0b011, want), None);
        assert_eq!(find_memory_type(&p, 0b111, M::HOST_VISIBLE), Some(1));
    }

    #[test]
    fn no_types_is_none() {
        let p = props(&[]);
        assert_eq!(find_memory_type(&p, u32::MAX, vk::MemoryPropertyFlags::empty()), None);
    }
}
