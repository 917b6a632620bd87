// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use lumen_render::{RenderError, RenderResult};

use crate::context::VkContext;
use crate::handles::Owned;
use crate::memory::HostBuffer;
use crate::pipeline::SceneViewUniform;

/// Everything one frame in flight records and synchronizes with.
pub(crate) struct FrameSlot {
    pub cmd: vk::CommandBuffer,
    pub image_available: Owned<vk::Semaphore>,
    pub render_finished: Owned<vk::Semaphore>,
    pub in_flight: Owned<vk::Fence>,
    pub uniforms: HostBuffer,
    pub descriptor_set: vk::DescriptorSet,
}

/// Fixed ring of frame slots. Created once, not touched by swapchain rebuilds.
///
/// Command buffers come from the backend's command pool and descriptor sets from `pool`;
/// both are freed with their pools.
pub(crate) struct FrameSlots {
    slots: Vec<FrameSlot>,
    pool: Owned<vk::DescriptorPool>,
}

impl FrameSlots {
    pub unsafe fn new(
        ctx: &VkContext,
        command_pool: vk::CommandPool,
        set_layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> RenderResult<Self> {
        let device = &ctx.device;
        let n = count as u32;

        let alloc_info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: n,
            ..Default::default()
        };
        let cmds = device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| RenderError::api("vkAllocateCommandBuffers", e))?;

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: n,
        }];
        let pool_ci = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            max_sets: n,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        let pool = Owned::new(
            device,
            device
                .create_descriptor_pool(&pool_ci, None)
                .map_err(|e| RenderError::api("vkCreateDescriptorPool", e))?,
        );

        let layouts = vec![set_layout; count];
        let set_alloc = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: pool.raw(),
            descriptor_set_count: n,
            p_set_layouts: layouts.as_ptr(),
            ..Default::default()
        };
        let sets = device
            .allocate_descriptor_sets(&set_alloc)
            .map_err(|e| RenderError::api("vkAllocateDescriptorSets", e))?;

        let sem_ci = vk::SemaphoreCreateInfo::default();
        // Signaled so the first wait on each slot returns at once.
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: vk::FenceCreateFlags::SIGNALED,
            ..Default::default()
        };
        let ubo_size = std::mem::size_of::<SceneViewUniform>();

        let mut slots = Vec::with_capacity(count);
        for (cmd, descriptor_set) in cmds.into_iter().zip(sets) {
            let image_available = Owned::new(
                device,
                device
                    .create_semaphore(&sem_ci, None)
                    .map_err(|e| RenderError::api("vkCreateSemaphore", e))?,
            );
            let render_finished = Owned::new(
                device,
                device
                    .create_semaphore(&sem_ci, None)
                    .map_err(|e| RenderError::api("vkCreateSemaphore", e))?,
            );
            let in_flight = Owned::new(
                device,
                device
                    .create_fence(&fence_ci, None)
                    .map_err(|e| RenderError::api("vkCreateFence", e))?,
            );
            let uniforms = HostBuffer::new(ctx, ubo_size, vk::BufferUsageFlags::UNIFORM_BUFFER)?;

            let buffer_info = vk::DescriptorBufferInfo {
                buffer: uniforms.raw(),
                offset: 0,
                range: ubo_size as vk::DeviceSize,
            };
            let write = vk::WriteDescriptorSet {
                s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                dst_set: descriptor_set,
                dst_binding: 0,
                descriptor_count: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                p_buffer_info: &buffer_info,
                ..Default::default()
            };
            device.update_descriptor_sets(std::slice::from_ref(&write), &[]);

            slots.push(FrameSlot {
                cmd,
                image_available,
                render_finished,
                in_flight,
                uniforms,
                descriptor_set,
            });
        }

        Ok(Self { slots, pool })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> &FrameSlot {
        &self.slots[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut FrameSlot {
        &mut self.slots[slot]
    }
}
