// SPDX-License-Identifier: CEPL-1.0
//! A ring of spinning cubes standing in for simulation output.
use std::f32::consts::TAU;

use lumen_render::glam::{EulerRot, Mat4, Quat, Vec3, Vec4};
use lumen_render::{BodyPalette, BodyState, InstanceData};

use crate::config::SceneCfg;

const RING_RADIUS: f32 = 4.0;
const SPIN_RATE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct DemoScene {
    palette: BodyPalette,
    bodies: u32,
}

impl DemoScene {
    pub fn new(cfg: &SceneCfg) -> Self {
        Self {
            palette: BodyPalette {
                active: Vec4::from_array(cfg.active_color),
                sleeping: Vec4::from_array(cfg.sleeping_color),
            },
            bodies: cfg.bodies,
        }
    }

    /// Body `i` sits at angle `i / n` on the ring; every third one sleeps and does not spin.
    pub fn bodies(&self, t: f32) -> Vec<BodyState> {
        let n = self.bodies.max(1) as f32;
        (0..self.bodies)
            .map(|i| {
                let angle = i as f32 / n * TAU;
                let sleeping = i % 3 == 2;
                let spin = if sleeping { 0.0 } else { t * SPIN_RATE + angle };
                BodyState {
                    position: Vec3::new(angle.cos() * RING_RADIUS, 0.0, angle.sin() * RING_RADIUS),
                    rotation: Quat::from_euler(EulerRot::YXZ, spin, spin * 0.5, 0.0),
                    scale: Vec3::splat(0.6),
                    sleeping,
                }
            })
            .collect()
    }

    pub fn instances(&self, t: f32) -> Vec<InstanceData> {
        self.palette.instances(&self.bodies(t))
    }
}

/// Camera above the ring looking at the origin. Clip space is Vulkan's: y down, depth 0..1.
pub fn view_projection(width: u32, height: u32) -> Mat4 {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    let mut proj = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0);
    proj.y_axis.y *= -1.0;
    let view = Mat4::look_at_rh(Vec3::new(0.0, 6.0, 10.0), Vec3::ZERO, Vec3::Y);
    proj * view
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(bodies: u32) -> DemoScene {
        DemoScene::new(&SceneCfg {
            bodies,
            ..SceneCfg::default()
        })
    }

    #[test]
    fn every_third_body_sleeps() {
        let bodies = scene(9).bodies(0.0);
        let sleeping: Vec<usize> = bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.sleeping)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(sleeping, vec![2, 5, 8]);
    }

    #[test]
    fn bodies_sit_on_the_ring() {
        for b in scene(7).bodies(1.5) {
            assert!((b.position.length() - RING_RADIUS).abs() < 1e-4);
        }
    }

    #[test]
    fn sleeping_bodies_do_not_spin() {
        let s = scene(3);
        assert_eq!(s.bodies(0.0)[2].rotation, s.bodies(10.0)[2].rotation);
        assert_ne!(s.bodies(0.0)[0].rotation, s.bodies(10.0)[0].rotation);
    }

    #[test]
    fn instances_take_palette_colors() {
        let cfg = SceneCfg::default();
        let inst = scene(3).instances(0.0);
        assert_eq!(inst[0].color, Vec4::from_array(cfg.active_color));
        assert_eq!(inst[2].color, Vec4::from_array(cfg.sleeping_color));
        assert!(inst[2].sleeping);
    }

    #[test]
    fn empty_scene_is_empty() {
        assert!(scene(0).instances(0.0).is_empty());
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let clip = view_projection(1280, 720) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
