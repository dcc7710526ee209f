//! Segment backed by a rapier2d rigid body

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::error::Result;
use crate::physics::{Damping, RapierWorld};
use crate::segment::{place_rings, Color, Material, Pose, Segment};

/// Segment backed by a rapier2d rigid body
///
/// Pose and velocities are cached here; the owning body copies them to and
/// from the world around each physics step.
#[derive(Debug, Clone)]
pub struct RigidSegment {
    handle: RigidBodyHandle,
    pose: Pose,
    linear_velocity: Vec2,
    angular_velocity: f32,
    rings: Vec<Vec<Vec2>>,
    color: Color,
    material: Material,
}

impl RigidSegment {
    /// Register a body with one convex collider per ring
    ///
    /// The body is removed again if any collider cannot be built.
    pub fn create(
        world: &mut RapierWorld,
        frame: Pose,
        rings: Vec<Vec<Vec2>>,
        material: Material,
        damping: Damping,
        collisions: bool,
        color: Color,
    ) -> Result<Self> {
        let (pose, rings) = place_rings(frame, rings)?;
        let handle = world.create_rigid_body(pose, damping);
        for ring in &rings {
            if let Err(e) = world.create_polygon_fixture(handle, ring, material, collisions) {
                world.destroy_body(handle);
                return Err(e);
            }
        }
        Ok(Self {
            handle,
            pose,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            rings,
            color,
            material,
        })
    }

    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }
}

impl Segment for RigidSegment {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec2) {
        self.linear_velocity = velocity;
    }

    fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, velocity: f32) {
        self.angular_velocity = velocity;
    }

    fn local_rings(&self) -> &[Vec<Vec2>] {
        &self.rings
    }

    // Colliders keep their construction shape
    fn rescale(&mut self, factor: f32) {
        for p in self.rings.iter_mut().flatten() {
            *p *= factor;
        }
    }

    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, rgb: [i32; 3]) {
        self.color = Color::clamped(rgb);
    }

    fn material(&self) -> Material {
        self.material
    }

    fn rigid_handle(&self) -> Option<RigidBodyHandle> {
        Some(self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyError;

    fn rect() -> Vec<Vec2> {
        vec![
            Vec2::new(1.0, 0.5),
            Vec2::new(-1.0, 0.5),
            Vec2::new(-1.0, -0.5),
            Vec2::new(1.0, -0.5),
        ]
    }

    #[test]
    fn test_create_registers_body() {
        let mut world = RapierWorld::new(0.1);
        let seg = RigidSegment::create(
            &mut world,
            Pose::new(Vec2::new(0.5, 0.0), 0.0),
            vec![rect()],
            Material::default(),
            Damping::default(),
            false,
            Color::default(),
        )
        .unwrap();
        assert!(world.contains_body(seg.handle()));
        assert_eq!(seg.rigid_handle(), Some(seg.handle()));
        let state = world.body_state(seg.handle()).unwrap();
        assert!((state.pose.position - seg.position()).length() < 1e-6);
    }

    #[test]
    fn test_failed_collider_removes_body() {
        let mut world = RapierWorld::new(0.1);
        let line = vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        let err = RigidSegment::create(
            &mut world,
            Pose::default(),
            vec![rect(), line],
            Material::default(),
            Damping::default(),
            false,
            Color::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BodyError::DegenerateOutline { .. }));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
    }
}
