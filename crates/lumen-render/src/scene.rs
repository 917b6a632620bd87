// SPDX-License-Identifier: CEPL-1.0
//! Scene data handed to the renderer once per `update_scene`.
use glam::{Mat4, Quat, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceData {
    pub model: Mat4,
    pub color: Vec4,
    /// Sleeping instances are kept in the snapshot but not drawn.
    pub sleeping: bool,
}

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            color: Vec4::ONE,
            sleeping: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneSnapshot {
    pub view_projection: Mat4,
    pub instances: Vec<InstanceData>,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            instances: Vec::new(),
        }
    }
}

impl SceneSnapshot {
    pub fn replace(&mut self, view_projection: Mat4, instances: &[InstanceData]) {
        self.view_projection = view_projection;
        self.instances.clear();
        self.instances.extend_from_slice(instances);
    }

    pub fn drawable(&self) -> impl Iterator<Item = &InstanceData> {
        self.instances.iter().filter(|i| !i.sleeping)
    }
}

/// A rigid body as reported by a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub sleeping: bool,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            sleeping: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyPalette {
    pub active: Vec4,
    pub sleeping: Vec4,
}

impl Default for BodyPalette {
    fn default() -> Self {
        Self {
            active: Vec4::new(0.95, 0.55, 0.25, 1.0),
            sleeping: Vec4::new(0.35, 0.5, 0.9, 1.0),
        }
    }
}

impl BodyPalette {
    pub const MIN_SCALE: f32 = 0.1;

    pub fn instance(&self, body: &BodyState) -> InstanceData {
        let scale = body.scale.max(Vec3::splat(Self::MIN_SCALE));
        InstanceData {
            model: Mat4::from_scale_rotation_translation(scale, body.rotation, body.position),
            color: if body.sleeping { self.sleeping } else { self.active },
            sleeping: body.sleeping,
        }
    }

    pub fn instances(&self, bodies: &[BodyState]) -> Vec<InstanceData> {
        bodies.iter().map(|b| self.instance(b)).collect()
    }
}
