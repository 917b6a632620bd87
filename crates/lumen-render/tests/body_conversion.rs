// SPDX-License-Identifier: CEPL-1.0
use lumen_render::glam::{Mat4, Quat, Vec3, Vec4};
use lumen_render::{BodyPalette, BodyState, SceneSnapshot};

#[test]
fn frame_of_bodies_becomes_a_drawable_snapshot() {
    let palette = BodyPalette {
        active: Vec4::new(1.0, 0.0, 0.0, 1.0),
        sleeping: Vec4::new(0.0, 0.0, 1.0, 1.0),
    };
    let bodies: Vec<BodyState> = (0..6)
        .map(|i| BodyState {
            position: Vec3::new(i as f32, 0.0, 0.0),
            rotation: Quat::from_rotation_y(i as f32 * 0.5),
            scale: Vec3::splat(0.5),
            sleeping: i % 3 == 2,
        })
        .collect();

    let mut snapshot = SceneSnapshot::default();
    snapshot.replace(Mat4::IDENTITY, &palette.instances(&bodies));

    assert_eq!(snapshot.instances.len(), 6);
    assert_eq!(snapshot.drawable().count(), 4);
    assert!(snapshot.drawable().all(|i| i.color == palette.active));

    let p = snapshot.instances[4].model.transform_point3(Vec3::ZERO);
    assert!((p - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-5);
}
