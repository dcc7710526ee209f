//! Segment primitive shared by the kinematic and rigid-body backends

use std::f32::consts::TAU;

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::contour::{compute_centroid, polygon_area};
use crate::error::{BodyError, Result};

/// World position and orientation (radians, unwrapped)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
}

impl Pose {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}

/// RGB colour with channels clamped to `[0, 255]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const GREEN: Color = Color([0, 255, 0]);
    pub const RED: Color = Color([255, 0, 0]);

    pub fn clamped(rgb: [i32; 3]) -> Self {
        Color(rgb.map(|c| c.clamp(0, 255) as u8))
    }
}

/// Fixture material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 300.0,
            friction: 0.01,
            restitution: 0.0,
        }
    }
}

/// Validate rings and shift them so their area-weighted centroid is the origin
///
/// Returns the recentred rings and the centroid that was removed.
pub fn center_rings(rings: Vec<Vec<Vec2>>) -> Result<(Vec<Vec<Vec2>>, Vec2)> {
    if rings.is_empty() || rings.iter().any(|r| r.is_empty()) {
        return Err(BodyError::EmptyOutline);
    }
    let area: f32 = rings.iter().map(|r| polygon_area(r)).sum();
    let centroid = compute_centroid(&rings).ok_or(BodyError::DegenerateOutline { area })?;
    let local = rings
        .into_iter()
        .map(|r| r.into_iter().map(|p| p - centroid).collect())
        .collect();
    Ok((local, centroid))
}

/// Recentre `rings` given in a frame placed at `frame`
///
/// The returned pose sits at the rings' centroid with the frame's heading.
pub fn place_rings(frame: Pose, rings: Vec<Vec<Vec2>>) -> Result<(Pose, Vec<Vec<Vec2>>)> {
    let (local, centroid) = center_rings(rings)?;
    let position = frame.position + Vec2::from_angle(frame.angle).rotate(centroid);
    Ok((Pose::new(position, frame.angle), local))
}

/// A single polygon piece of a body
///
/// Implementors store their pose, velocities and local-frame rings; the
/// transforms and landmark queries are provided on top of that.
pub trait Segment: std::fmt::Debug {
    fn pose(&self) -> Pose;

    fn set_pose(&mut self, pose: Pose);

    fn linear_velocity(&self) -> Vec2;

    fn set_linear_velocity(&mut self, velocity: Vec2);

    fn angular_velocity(&self) -> f32;

    fn set_angular_velocity(&mut self, velocity: f32);

    /// Outline rings in the segment frame, centred on the segment centroid
    fn local_rings(&self) -> &[Vec<Vec2>];

    /// Scale the local rings about the segment origin
    fn rescale(&mut self, factor: f32);

    fn color(&self) -> Color;

    fn set_color(&mut self, rgb: [i32; 3]);

    fn material(&self) -> Material;

    /// Rigid body backing this segment, if any
    fn rigid_handle(&self) -> Option<RigidBodyHandle> {
        None
    }

    fn position(&self) -> Vec2 {
        self.pose().position
    }

    fn orientation(&self) -> f32 {
        self.pose().angle
    }

    /// Orientation folded into `[0, 2π)`
    fn normalized_orientation(&self) -> f32 {
        let a = self.orientation().rem_euclid(TAU);
        if a >= TAU {
            0.0
        } else {
            a
        }
    }

    fn world_point(&self, local: Vec2) -> Vec2 {
        let pose = self.pose();
        pose.position + Vec2::from_angle(pose.angle).rotate(local)
    }

    fn local_point(&self, world: Vec2) -> Vec2 {
        let pose = self.pose();
        Vec2::from_angle(-pose.angle).rotate(world - pose.position)
    }

    fn world_vector(&self, local: Vec2) -> Vec2 {
        Vec2::from_angle(self.orientation()).rotate(local)
    }

    fn local_vector(&self, world: Vec2) -> Vec2 {
        Vec2::from_angle(-self.orientation()).rotate(world)
    }

    fn local_orientation(&self, angle: f32) -> f32 {
        angle - self.orientation()
    }

    fn local_pose(&self, pose: Pose) -> Pose {
        Pose::new(self.local_point(pose.position), self.local_orientation(pose.angle))
    }

    /// Unit vector pointing forward along the segment
    fn world_facing_axis(&self) -> Vec2 {
        self.world_vector(Vec2::X)
    }

    fn world_rings(&self) -> Vec<Vec<Vec2>> {
        self.local_rings()
            .iter()
            .map(|ring| ring.iter().map(|p| self.world_point(*p)).collect())
            .collect()
    }

    /// Foremost midline point of the first ring
    fn local_front_end(&self) -> Vec2 {
        let x = self.local_rings()[0]
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max);
        Vec2::new(x, 0.0)
    }

    /// Hindmost midline point of the first ring
    fn local_rear_end(&self) -> Vec2 {
        let x = self.local_rings()[0]
            .iter()
            .map(|p| p.x)
            .fold(f32::INFINITY, f32::min);
        Vec2::new(x, 0.0)
    }

    fn area(&self) -> f32 {
        self.local_rings().iter().map(|r| polygon_area(r)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_clamped() {
        assert_eq!(Color::clamped([-20, 128, 300]), Color([0, 128, 255]));
    }

    #[test]
    fn test_center_rings() {
        let ring = vec![
            Vec2::new(2.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(2.0, -1.0),
        ];
        let (local, c) = center_rings(vec![ring]).unwrap();
        assert_eq!(c, Vec2::new(1.0, 0.0));
        assert_eq!(local[0][0], Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_center_rings_rejects_bad_outlines() {
        assert_eq!(center_rings(vec![]), Err(BodyError::EmptyOutline));
        assert_eq!(center_rings(vec![vec![]]), Err(BodyError::EmptyOutline));
        let flat = vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(matches!(
            center_rings(vec![flat]),
            Err(BodyError::DegenerateOutline { .. })
        ));
    }
}
