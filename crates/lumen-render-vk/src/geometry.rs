// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use lumen_render::RenderResult;

use crate::context::VkContext;
use crate::memory::HostBuffer;

/// Unit cube centred on the origin.
pub(crate) const CUBE_POSITIONS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

#[rustfmt::skip]
pub(crate) const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 2, 3, 0, // back
    4, 5, 6, 6, 7, 4, // front
    4, 5, 1, 1, 0, 4, // bottom
    7, 6, 2, 2, 3, 7, // top
    5, 6, 2, 2, 1, 5, // right
    4, 7, 3, 3, 0, 4, // left
];

pub(crate) const VERTEX_STRIDE: u32 = std::mem::size_of::<[f32; 3]>() as u32;

/// Vertex and index buffers for the cube. Built once, survives swapchain rebuilds.
pub(crate) struct CubeMesh {
    vertices: HostBuffer,
    indices: HostBuffer,
}

impl CubeMesh {
    pub unsafe fn new(ctx: &VkContext) -> RenderResult<Self> {
        let vertices = HostBuffer::with_data(
            ctx,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            bytemuck::cast_slice(&CUBE_POSITIONS),
        )?;
        let indices = HostBuffer::with_data(
            ctx,
            vk::BufferUsageFlags::INDEX_BUFFER,
            bytemuck::cast_slice(&CUBE_INDICES),
        )?;
        Ok(Self { vertices, indices })
    }

    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertices.raw()
    }

    pub fn index_buffer(&self) -> vk::Buffer {
        self.indices.raw()
    }

    pub fn index_count(&self) -> u32 {
        CUBE_INDICES.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_eight_corners_and_twelve_triangles() {
        assert_eq!(CUBE_POSITIONS.len(), 8);
        assert_eq!(CUBE_INDICES.len() / 3, 12);
        assert!(CUBE_INDICES.iter().all(|&i| (i as usize) < CUBE_POSITIONS.len()));
        assert_eq!(bytemuck::cast_slice::<_, u8>(&CUBE_POSITIONS).len(), 8 * VERTEX_STRIDE as usize);
    }

    #[test]
    fn every_corner_is_used() {
        for v in 0..CUBE_POSITIONS.len() as u16 {
            assert!(CUBE_INDICES.contains(&v), "corner {v} unused");
        }
    }
}
