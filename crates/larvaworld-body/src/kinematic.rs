//! Engine-free segment moved directly by the kinematic backend

use glam::Vec2;

use crate::error::Result;
use crate::segment::{place_rings, Color, Material, Pose, Segment};

/// Engine-free segment whose pose and velocities are plain state
#[derive(Debug, Clone)]
pub struct KinematicSegment {
    pose: Pose,
    linear_velocity: Vec2,
    angular_velocity: f32,
    rings: Vec<Vec<Vec2>>,
    color: Color,
    material: Material,
}

impl KinematicSegment {
    /// Create a segment from rings expressed in the `frame` pose
    pub fn create(frame: Pose, rings: Vec<Vec<Vec2>>, material: Material, color: Color) -> Result<Self> {
        let (pose, rings) = place_rings(frame, rings)?;
        Ok(Self {
            pose,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            rings,
            color,
            material,
        })
    }
}

impl Segment for KinematicSegment {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    fn rect() -> Vec<Vec2> {
        vec![
            Vec2::new(1.0, 0.5),
            Vec2::new(-1.0, 0.5),
            Vec2::new(-1.0, -0.5),
            Vec2::new(1.0, -0.5),
        ]
    }

    fn segment(pose: Pose) -> KinematicSegment {
        KinematicSegment::create(pose, vec![rect()], Material::default(), Color::default()).unwrap()
    }

    #[test]
    fn test_transform_round_trip() {
        let seg = segment(Pose::new(Vec2::new(3.0, -2.0), 0.7));
        let p = Vec2::new(0.3, -1.2);
        let back = seg.local_point(seg.world_point(p));
        assert!((back - p).length() < 1e-5);
        let v = Vec2::new(-2.0, 0.5);
        assert!((seg.local_vector(seg.world_vector(v)) - v).length() < 1e-5);

        let pose = Pose::new(seg.world_point(p), 0.7 + 0.2);
        let local = seg.local_pose(pose);
        assert!((local.position - p).length() < 1e-5);
        assert!((local.angle - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_facing_axis_and_ends() {
        let seg = segment(Pose::new(Vec2::ZERO, FRAC_PI_2));
        assert!((seg.world_facing_axis() - Vec2::Y).length() < 1e-6);
        assert_eq!(seg.local_front_end(), Vec2::new(1.0, 0.0));
        assert_eq!(seg.local_rear_end(), Vec2::new(-1.0, 0.0));
        let nose = seg.world_point(seg.local_front_end());
        assert!((nose - Vec2::new(0.0, 1.0)).length() < 1e-6);
        assert!((seg.area() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_orientation() {
        let mut seg = segment(Pose::default());
        seg.set_pose(Pose::new(Vec2::ZERO, -FRAC_PI_2));
        assert!((seg.normalized_orientation() - 1.5 * PI).abs() < 1e-5);
        seg.set_pose(Pose::new(Vec2::ZERO, 2.0 * TAU + 0.5));
        assert!((seg.normalized_orientation() - 0.5).abs() < 1e-5);
        assert!((seg.orientation() - (2.0 * TAU + 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_create_places_centroid() {
        let shifted: Vec<Vec2> = rect().into_iter().map(|p| p + Vec2::new(2.0, 0.0)).collect();
        let seg = KinematicSegment::create(
            Pose::new(Vec2::new(1.0, 1.0), FRAC_PI_2),
            vec![shifted],
            Material::default(),
            Color::default(),
        )
        .unwrap();
        assert!((seg.position() - Vec2::new(1.0, 3.0)).length() < 1e-5);
        assert_eq!(seg.local_rings()[0], rect());
    }

    #[test]
    fn test_color_and_rescale() {
        let mut seg = segment(Pose::default());
        seg.set_color([300, -1, 12]);
        assert_eq!(seg.color(), Color([255, 0, 12]));
        seg.rescale(2.0);
        assert!((seg.area() - 8.0).abs() < 1e-5);
        assert_eq!(seg.world_rings()[0][0], Vec2::new(2.0, 1.0));
    }
}
