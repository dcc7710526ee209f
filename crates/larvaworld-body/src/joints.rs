//! Joints between consecutive segments

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rapier2d::prelude::{ImpulseJointHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::error::{BodyError, Result};
use crate::physics::RapierWorld;

/// How many attachment points a joint type uses per segment pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sides {
    #[default]
    None,
    /// A single joint on the midline
    One,
    /// A pair of joints at either body edge
    Two,
}

impl Sides {
    /// Lateral side of each joint, in units of the attachment distance
    fn signs(self) -> &'static [f32] {
        match self {
            Sides::None => &[],
            Sides::One => &[0.0],
            Sides::Two => &[1.0, -1.0],
        }
    }
}

/// Joint types to create between each pair of segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointTypes {
    pub distance: Sides,
    pub revolute: Sides,
}

impl Default for JointTypes {
    fn default() -> Self {
        Self {
            distance: Sides::Two,
            revolute: Sides::One,
        }
    }
}

/// Spring parameters of a distance joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceParams {
    pub rest_length: f32,
    pub frequency_hz: f32,
    pub damping_ratio: f32,
}

impl DistanceParams {
    pub fn for_segment_length(mean_segment_length: f32) -> Self {
        Self {
            rest_length: 0.01 * mean_segment_length,
            frequency_hz: 5.0,
            damping_ratio: 1.0,
        }
    }

    /// Stiffness per unit mass, `ω²`
    pub fn stiffness(&self) -> f32 {
        let omega = TAU * self.frequency_hz;
        omega * omega
    }

    /// Damping per unit mass, `2ζω`
    pub fn damping(&self) -> f32 {
        2.0 * self.damping_ratio * TAU * self.frequency_hz
    }
}

/// Limits and motor of a revolute joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevoluteParams {
    pub lower_angle: f32,
    pub upper_angle: f32,
    pub motor: bool,
    pub motor_speed: f32,
    pub motor_factor: f32,
    pub max_motor_torque: f32,
}

impl RevoluteParams {
    /// Bend limit of `±(π/2)/N` and a zero-speed holding motor
    pub fn for_segments(n: usize) -> Self {
        let limit = FRAC_PI_2 / n.max(1) as f32;
        Self {
            lower_angle: -limit,
            upper_angle: limit,
            motor: true,
            motor_speed: 0.0,
            motor_factor: 1.0,
            max_motor_torque: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    Distance(DistanceParams),
    Revolute(RevoluteParams),
}

/// A joint between segment `seg_a` and the segment behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSpec {
    pub seg_a: usize,
    pub seg_b: usize,
    /// Anchor in `seg_a`'s frame
    pub anchor_a: Vec2,
    /// Anchor in `seg_b`'s frame
    pub anchor_b: Vec2,
    pub kind: JointKind,
}

/// Lay out joints for an `n`-segment body
///
/// Anchors sit at half a mean segment length behind the centre of the front
/// segment and ahead of the centre of the rear one, shifted sideways by the
/// body half-width for two-sided joints.
pub fn plan_joints(
    n: usize,
    mean_segment_length: f32,
    width_to_length_ratio: f32,
    types: JointTypes,
) -> Vec<JointSpec> {
    if n < 2 {
        return Vec::new();
    }
    let lateral = width_to_length_ratio * n as f32 / 2.0;
    let l = mean_segment_length;
    let distance = DistanceParams::for_segment_length(l);
    let revolute = RevoluteParams::for_segments(n);

    let mut specs = Vec::new();
    for i in 0..n - 1 {
        let mut push = |sides: Sides, kind: JointKind| {
            for sign in sides.signs() {
                let y = sign * lateral * l;
                specs.push(JointSpec {
                    seg_a: i,
                    seg_b: i + 1,
                    anchor_a: Vec2::new(-0.5 * l, y),
                    anchor_b: Vec2::new(0.5 * l, y),
                    kind,
                });
            }
        };
        push(types.distance, JointKind::Distance(distance));
        push(types.revolute, JointKind::Revolute(revolute));
    }
    specs
}

/// Create the planned joints in `world`
///
/// `handles[i]` is the rigid body of segment `i`. Every endpoint is checked
/// before the first joint is inserted.
pub fn assemble_joints(
    world: &mut RapierWorld,
    handles: &[RigidBodyHandle],
    specs: &[JointSpec],
) -> Result<Vec<ImpulseJointHandle>> {
    let body = |i: usize| {
        handles
            .get(i)
            .copied()
            .filter(|h| world.contains_body(*h))
            .ok_or(BodyError::MissingSegment(i))
    };
    let endpoints = specs
        .iter()
        .map(|s| Ok((body(s.seg_a)?, body(s.seg_b)?)))
        .collect::<Result<Vec<_>>>()?;

    let joints = specs
        .iter()
        .zip(endpoints)
        .map(|(spec, (a, b))| match spec.kind {
            JointKind::Distance(p) => {
                world.create_distance_joint(a, b, spec.anchor_a, spec.anchor_b, p)
            }
            JointKind::Revolute(p) => {
                world.create_revolute_joint(a, b, spec.anchor_a, spec.anchor_b, p)
            }
        })
        .collect::<Vec<_>>();
    log::debug!("Created {} joints for {} segments", joints.len(), handles.len());
    Ok(joints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Damping;
    use crate::segment::Pose;

    fn count(specs: &[JointSpec], revolute: bool) -> usize {
        specs
            .iter()
            .filter(|s| matches!(s.kind, JointKind::Revolute(_)) == revolute)
            .count()
    }

    #[test]
    fn test_two_sided_revolute_only() {
        let types = JointTypes {
            distance: Sides::None,
            revolute: Sides::Two,
        };
        let specs = plan_joints(3, 1.0, 0.2, types);
        assert_eq!(specs.len(), 4);
        assert_eq!(count(&specs, true), 4);
        // Lateral offset is w2l * N / 2 mean lengths
        assert!((specs[0].anchor_a.y - 0.3).abs() < 1e-6);
        assert!((specs[1].anchor_a.y + 0.3).abs() < 1e-6);
        assert_eq!(specs[0].anchor_a.x, -0.5);
        assert_eq!(specs[0].anchor_b.x, 0.5);
    }

    #[test]
    fn test_one_sided_distance_only() {
        let types = JointTypes {
            distance: Sides::One,
            revolute: Sides::None,
        };
        let specs = plan_joints(3, 2.0, 0.2, types);
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().all(|s| s.anchor_a.y == 0.0));
        match specs[0].kind {
            JointKind::Distance(p) => assert!((p.rest_length - 0.02).abs() < 1e-6),
            JointKind::Revolute(_) => panic!("expected a distance joint"),
        }
        assert_eq!((specs[1].seg_a, specs[1].seg_b), (1, 2));
    }

    #[test]
    fn test_default_types() {
        let specs = plan_joints(4, 1.0, 0.2, JointTypes::default());
        assert_eq!(count(&specs, false), 6);
        assert_eq!(count(&specs, true), 3);
        assert!(plan_joints(1, 1.0, 0.2, JointTypes::default()).is_empty());
    }

    #[test]
    fn test_revolute_limits_and_spring_constants() {
        let p = RevoluteParams::for_segments(4);
        assert!((p.upper_angle - FRAC_PI_2 / 4.0).abs() < 1e-6);
        assert_eq!(p.lower_angle, -p.upper_angle);
        assert_eq!(p.motor_speed, 0.0);
        assert!((p.max_motor_torque - 0.1).abs() < 1e-6);

        let d = DistanceParams::for_segment_length(1.0);
        assert!((d.stiffness() - (TAU * 5.0).powi(2)).abs() < 1e-2);
        assert!((d.damping() - 2.0 * TAU * 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_assemble_missing_segment() {
        let mut world = RapierWorld::new(0.1);
        let a = world.create_rigid_body(Pose::default(), Damping::default());
        let specs = plan_joints(2, 1.0, 0.2, JointTypes::default());
        assert_eq!(
            assemble_joints(&mut world, &[a], &specs),
            Err(BodyError::MissingSegment(1))
        );
        assert_eq!(world.joint_count(), 0);

        let b = world.create_rigid_body(Pose::default(), Damping::default());
        let joints = assemble_joints(&mut world, &[a, b], &specs).unwrap();
        assert_eq!(joints.len(), 3);
        assert_eq!(world.joint_count(), 3);
    }
}
