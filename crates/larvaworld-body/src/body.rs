//! Segmented larva body

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rapier2d::prelude::ImpulseJointHandle;
use serde::{Deserialize, Serialize};

use crate::contour::{compute_centroid, compute_contour, DEFAULT_CONTOUR_POINTS, DEFAULT_CONTOUR_SEED};
use crate::error::{BodyError, Result};
use crate::joints::{assemble_joints, plan_joints, JointTypes, RevoluteParams};
use crate::kinematic::KinematicSegment;
use crate::physics::{BodyState, Damping, RapierWorld};
use crate::rigid::RigidSegment;
use crate::segment::{Color, Material, Pose, Segment};
use crate::shape::{segment_outlines, uniform_seg_ratio, validate_seg_ratio, SegmentLayout};

/// Which segment implementation a body is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyBackend {
    #[default]
    Kinematic,
    Rigid,
}

/// Construction parameters of a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub segment_count: usize,
    /// Length fractions per segment, uniform when absent
    pub seg_ratio: Option<Vec<f32>>,
    /// Length removed at each side of a segment junction, as a body fraction
    pub interval: f32,
    pub width_to_length_ratio: f32,
    /// Base density before rebalancing for the interval
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub joint_types: JointTypes,
    pub collisions: bool,
    pub damping: Damping,
    pub contour_points: usize,
    pub contour_seed: u64,
    pub backend: BodyBackend,
    pub default_color: [i32; 3],
}

impl Default for BodyConfig {
    fn default() -> Self {
        let material = Material::default();
        Self {
            segment_count: 2,
            seg_ratio: None,
            interval: 0.0,
            width_to_length_ratio: 0.2,
            density: material.density,
            friction: material.friction,
            restitution: material.restitution,
            joint_types: JointTypes::default(),
            collisions: false,
            damping: Damping::default(),
            contour_points: DEFAULT_CONTOUR_POINTS,
            contour_seed: DEFAULT_CONTOUR_SEED,
            backend: BodyBackend::Kinematic,
            default_color: [0, 0, 0],
        }
    }
}

impl BodyConfig {
    pub fn seg_ratio(&self) -> Vec<f32> {
        self.seg_ratio
            .clone()
            .unwrap_or_else(|| uniform_seg_ratio(self.segment_count))
    }
}

/// Wrap an angle difference into `[-π, π)`
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// An ordered chain of segments, head first
#[derive(Debug)]
pub struct LarvaBody {
    config: BodyConfig,
    seg_ratio: Vec<f32>,
    segments: Vec<Box<dyn Segment>>,
    /// Free gap between the rear of segment `i` and the front of `i + 1`
    rest_gaps: Vec<f32>,
    joints: Vec<ImpulseJointHandle>,
    real_length: f32,
    real_mass: f32,
    scaling_factor: f32,
    /// Simulated length the segment rings currently represent
    geometry_length: f32,
    density_multiplier: f32,
    contour: Vec<Vec2>,
}

impl LarvaBody {
    /// Build a body centred on `pose.position` and heading along `pose.angle`
    ///
    /// The rigid backend needs `world`; segments and joints are registered in
    /// it and removed again if construction fails part way.
    pub fn spawn(
        config: BodyConfig,
        real_length: f32,
        scaling_factor: f32,
        pose: Pose,
        world: Option<&mut RapierWorld>,
    ) -> Result<Self> {
        if !(real_length > 0.0) || !real_length.is_finite() {
            return Err(BodyError::InvalidLength(real_length));
        }
        let seg_ratio = config.seg_ratio();
        validate_seg_ratio(config.segment_count, &seg_ratio)?;
        let layout = segment_outlines(&seg_ratio, config.width_to_length_ratio, config.interval)?;
        let n = seg_ratio.len();
        let sim_length = real_length * scaling_factor;
        let scale = sim_length / n as f32;
        let material = Material {
            density: config.density * layout.density_multiplier,
            friction: config.friction,
            restitution: config.restitution,
        };

        let frames = segment_frames(&layout, sim_length, pose);
        let outlines: Vec<Vec<Vec2>> = layout
            .outlines
            .iter()
            .map(|o| o.iter().map(|p| *p * scale).collect())
            .collect();
        let colors = segment_colors(n, Color::clamped(config.default_color));

        let (segments, joints) = match config.backend {
            BodyBackend::Kinematic => {
                let segments = frames
                    .into_iter()
                    .zip(outlines)
                    .zip(colors)
                    .map(|((frame, outline), color)| {
                        KinematicSegment::create(frame, vec![outline], material, color)
                            .map(|s| Box::new(s) as Box<dyn Segment>)
                    })
                    .collect::<Result<Vec<_>>>()?;
                (segments, Vec::new())
            }
            BodyBackend::Rigid => {
                let world = world.ok_or(BodyError::MissingWorld)?;
                build_rigid(
                    world,
                    &config,
                    frames,
                    outlines,
                    colors,
                    material,
                    sim_length,
                )?
            }
        };

        let rest_gaps = segments
            .windows(2)
            .map(|pair| {
                let rear = pair[0].world_point(pair[0].local_rear_end());
                let front = pair[1].world_point(pair[1].local_front_end());
                rear.distance(front)
            })
            .collect();

        let mut body = Self {
            real_mass: config.density * real_length * real_length * config.width_to_length_ratio,
            config,
            seg_ratio,
            segments,
            rest_gaps,
            joints,
            real_length,
            scaling_factor,
            geometry_length: sim_length,
            density_multiplier: layout.density_multiplier,
            contour: Vec::new(),
        };
        body.update_contour();

        log::debug!(
            "Spawned {:?} body: {} segments, length {:.4}, mass {:.6}, {} joints",
            body.config.backend,
            n,
            real_length,
            body.real_mass,
            body.joints.len()
        );
        Ok(body)
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Box<dyn Segment>] {
        &self.segments
    }

    pub fn segment(&self, i: usize) -> Option<&dyn Segment> {
        self.segments.get(i).map(|s| s.as_ref())
    }

    pub fn segment_mut(&mut self, i: usize) -> Option<&mut Box<dyn Segment>> {
        self.segments.get_mut(i)
    }

    pub fn head(&self) -> &dyn Segment {
        self.segments[0].as_ref()
    }

    pub fn tail(&self) -> &dyn Segment {
        self.segments[self.segments.len() - 1].as_ref()
    }

    pub fn seg_ratio(&self) -> &[f32] {
        &self.seg_ratio
    }

    pub fn joints(&self) -> &[ImpulseJointHandle] {
        &self.joints
    }

    pub fn real_length(&self) -> f32 {
        self.real_length
    }

    pub fn real_mass(&self) -> f32 {
        self.real_mass
    }

    pub fn scaling_factor(&self) -> f32 {
        self.scaling_factor
    }

    pub fn sim_length(&self) -> f32 {
        self.real_length * self.scaling_factor
    }

    pub fn density_multiplier(&self) -> f32 {
        self.density_multiplier
    }

    pub fn segment_lengths(&self) -> Vec<f32> {
        let l = self.sim_length();
        self.seg_ratio.iter().map(|r| r * l).collect()
    }

    pub fn contour(&self) -> &[Vec2] {
        &self.contour
    }

    /// Recompute the contour from the current segment poses
    pub fn update_contour(&mut self) {
        let rings: Vec<Vec<Vec2>> = self
            .segments
            .iter()
            .map(|s| {
                let ring = &s.local_rings()[0];
                ring.iter().map(|p| s.world_point(*p)).collect()
            })
            .collect();
        let refs: Vec<&[Vec2]> = rings.iter().map(|r| r.as_slice()).collect();
        self.contour = compute_contour(&refs, self.config.contour_points, self.config.contour_seed);
    }

    pub fn global_front_end_of_head(&self) -> Vec2 {
        let head = self.head();
        head.world_point(head.local_front_end())
    }

    pub fn global_rear_end_of_head(&self) -> Vec2 {
        let head = self.head();
        head.world_point(head.local_rear_end())
    }

    /// Point half way down the spine
    pub fn global_midspine(&self) -> Vec2 {
        let n = self.segments.len();
        match n {
            1 => self.head().position(),
            2 => self.global_rear_end_of_head(),
            _ if n % 2 == 0 => {
                let seg = self.segments[n / 2].as_ref();
                seg.world_point(seg.local_front_end())
            }
            _ => self.segments[(n - 1) / 2].position(),
        }
    }

    pub fn global_rear_end_of_body(&self) -> Vec2 {
        let tail = self.tail();
        tail.world_point(tail.local_rear_end())
    }

    pub fn olfactor_position(&self) -> Vec2 {
        self.global_front_end_of_head()
    }

    /// Mean of the segment positions
    pub fn centroid_position(&self) -> Vec2 {
        let sum: Vec2 = self.segments.iter().map(|s| s.position()).sum();
        sum / self.segments.len() as f32
    }

    pub fn front_orientation(&self) -> f32 {
        self.head().orientation()
    }

    pub fn rear_orientation(&self) -> f32 {
        self.tail().orientation()
    }

    /// Head orientation relative to the tail, in `[-π, π)`
    pub fn body_bend(&self) -> f32 {
        wrap_angle(self.front_orientation() - self.rear_orientation())
    }

    /// Relative angle of each segment pair, head first
    pub fn spine_angles(&self) -> Vec<f32> {
        self.segments
            .windows(2)
            .map(|pair| wrap_angle(pair[0].orientation() - pair[1].orientation()))
            .collect()
    }

    /// Reset segment colours: green head and red tail for long bodies
    pub fn set_default_colors(&mut self, rgb: [i32; 3]) {
        let colors = segment_colors(self.segments.len(), Color::clamped(rgb));
        for (seg, color) in self.segments.iter_mut().zip(colors) {
            let Color([r, g, b]) = color;
            seg.set_color([r as i32, g as i32, b as i32]);
        }
    }

    /// Mass implied by the current real length
    pub fn compute_mass_from_length(&self) -> f32 {
        self.config.density
            * self.real_length
            * self.real_length
            * self.config.width_to_length_ratio
    }

    /// Real length implied by the current real mass
    pub fn adjust_shape_to_mass(&mut self) {
        self.real_length =
            (self.real_mass / (self.config.density * self.config.width_to_length_ratio)).sqrt();
    }

    pub fn set_real_length(&mut self, real_length: f32) -> Result<()> {
        if !(real_length > 0.0) || !real_length.is_finite() {
            return Err(BodyError::InvalidLength(real_length));
        }
        self.real_length = real_length;
        self.real_mass = self.compute_mass_from_length();
        self.adjust_body_vertices();
        Ok(())
    }

    pub fn set_real_mass(&mut self, real_mass: f32) -> Result<()> {
        if !(real_mass > 0.0) || !real_mass.is_finite() {
            return Err(BodyError::InvalidLength(real_mass));
        }
        self.real_mass = real_mass;
        self.adjust_shape_to_mass();
        self.adjust_body_vertices();
        Ok(())
    }

    /// Rescale segment outlines to the current length
    ///
    /// Segment positions and joints are left as they are.
    pub fn adjust_body_vertices(&mut self) {
        let target = self.sim_length();
        if self.geometry_length <= 0.0 || target == self.geometry_length {
            return;
        }
        let factor = target / self.geometry_length;
        for seg in &mut self.segments {
            seg.rescale(factor);
        }
        for gap in &mut self.rest_gaps {
            *gap *= factor;
        }
        self.geometry_length = target;
        self.update_contour();
        log::debug!("Rescaled body outlines by {:.4} to length {:.4}", factor, target);
    }

    /// Mass carried by the segments at the rebalanced density
    ///
    /// Equals `real_mass` for every segment count and interval.
    pub fn segmented_mass(&self) -> f32 {
        let n = self.segments.len() as f32;
        let kept = 1.0 - 2.0 * (n - 1.0) * self.config.interval;
        self.config.density
            * self.density_multiplier
            * self.config.width_to_length_ratio
            * self.real_length
            * self.real_length
            * kept
    }

    /// Sum of the rigid body masses, `None` for kinematic bodies
    pub fn total_rigid_mass(&self, world: &mut RapierWorld) -> Option<f32> {
        let mut total = 0.0;
        for seg in &self.segments {
            total += world.body_mass(seg.rigid_handle()?)?;
        }
        Some(total)
    }

    /// Drive the head forward at `lin` along its axis and turn it at `ang`
    pub fn apply_motion(&mut self, lin: f32, ang: f32) {
        let head = &mut self.segments[0];
        let axis = head.world_facing_axis();
        head.set_linear_velocity(axis * lin);
        head.set_angular_velocity(ang);
    }

    /// Integrate the head and drag the followers without a physics engine
    ///
    /// Each follower turns towards the rear end of the segment ahead, within
    /// the revolute limit, and keeps its rest gap to it.
    pub fn step_kinematic(&mut self, dt: f32) {
        let limit = RevoluteParams::for_segments(self.segments.len()).upper_angle;

        let head = &mut self.segments[0];
        let pose = head.pose();
        let angle = pose.angle + head.angular_velocity() * dt;
        let position = pose.position + head.linear_velocity() * dt;
        head.set_pose(Pose::new(position, angle));

        for i in 1..self.segments.len() {
            let (ahead, behind) = self.segments.split_at_mut(i);
            let leader = ahead[i - 1].as_ref();
            let seg = &mut behind[0];

            let target = leader.world_point(leader.local_rear_end());
            let rear = seg.world_point(seg.local_rear_end());
            let old = seg.pose();
            let direction = target - rear;
            let mut angle = old.angle;
            if direction.length_squared() > f32::EPSILON {
                let heading = direction.y.atan2(direction.x);
                let relative = wrap_angle(heading - leader.orientation()).clamp(-limit, limit);
                angle = leader.orientation() + relative;
            }
            let facing = Vec2::from_angle(angle);
            let front = target - facing * self.rest_gaps[i - 1];
            let position = front - facing.rotate(seg.local_front_end());
            seg.set_pose(Pose::new(position, angle));
            if dt > 0.0 {
                seg.set_linear_velocity((position - old.position) / dt);
                seg.set_angular_velocity((angle - old.angle) / dt);
            }
        }
        self.update_contour();
    }

    /// Write cached segment states into the world
    pub fn push_to_world(&self, world: &mut RapierWorld) {
        for seg in &self.segments {
            if let Some(handle) = seg.rigid_handle() {
                world.set_body_state(
                    handle,
                    BodyState {
                        pose: seg.pose(),
                        linear_velocity: seg.linear_velocity(),
                        angular_velocity: seg.angular_velocity(),
                    },
                );
            }
        }
    }

    /// Read segment states back from the world
    ///
    /// World rotations are folded, so orientations are unwrapped against the
    /// previous cached value.
    pub fn sync_from_world(&mut self, world: &RapierWorld) {
        for seg in &mut self.segments {
            let Some(state) = seg.rigid_handle().and_then(|h| world.body_state(h)) else {
                continue;
            };
            let previous = seg.orientation();
            let angle = previous + wrap_angle(state.pose.angle - previous);
            seg.set_pose(Pose::new(state.pose.position, angle));
            seg.set_linear_velocity(state.linear_velocity);
            seg.set_angular_velocity(state.angular_velocity);
        }
        self.update_contour();
    }

    /// Place every segment at a recorded pose and stop it
    ///
    /// Rigid segments are switched to kinematic bodies so the physics step
    /// leaves the recorded pose alone.
    pub fn set_replay_pose(&mut self, poses: &[Pose], world: Option<&mut RapierWorld>) -> Result<()> {
        if poses.len() != self.segments.len() {
            return Err(BodyError::ReplayMismatch {
                expected: self.segments.len(),
                got: poses.len(),
            });
        }
        for (seg, pose) in self.segments.iter_mut().zip(poses) {
            seg.set_pose(*pose);
            seg.set_linear_velocity(Vec2::ZERO);
            seg.set_angular_velocity(0.0);
        }
        if let Some(world) = world {
            for handle in self.segments.iter().filter_map(|s| s.rigid_handle()) {
                if !world.is_body_kinematic(handle) {
                    world.set_body_kinematic(handle, true);
                }
            }
            self.push_to_world(world);
        }
        self.update_contour();
        Ok(())
    }

    /// Remove the body from `world`, taking colliders and joints with it
    pub fn destroy(self, world: Option<&mut RapierWorld>) {
        let Some(world) = world else {
            return;
        };
        let removed = self
            .segments
            .iter()
            .filter_map(|s| s.rigid_handle())
            .filter(|h| world.destroy_body(*h))
            .count();
        log::debug!("Destroyed body: removed {} rigid bodies", removed);
    }
}

/// Midpoint frame of each segment in world space
fn segment_frames(layout: &SegmentLayout, sim_length: f32, pose: Pose) -> Vec<Pose> {
    let rotation = Vec2::from_angle(pose.angle);
    (0..layout.outlines.len())
        .map(|i| {
            let offset = Vec2::new(layout.axial_offset(i) * sim_length, 0.0);
            Pose::new(pose.position + rotation.rotate(offset), pose.angle)
        })
        .collect()
}

fn segment_colors(n: usize, default: Color) -> Vec<Color> {
    let mut colors = vec![default; n];
    if n > 5 {
        colors[0] = Color::GREEN;
        colors[n - 1] = Color::RED;
    }
    colors
}

fn build_rigid(
    world: &mut RapierWorld,
    config: &BodyConfig,
    frames: Vec<Pose>,
    outlines: Vec<Vec<Vec2>>,
    colors: Vec<Color>,
    material: Material,
    sim_length: f32,
) -> Result<(Vec<Box<dyn Segment>>, Vec<ImpulseJointHandle>)> {
    let n = frames.len();
    let centroid_offsets: Vec<Vec2> = outlines
        .iter()
        .map(|o| compute_centroid(std::slice::from_ref(o)).unwrap_or(Vec2::ZERO))
        .collect();
    let mut rigid = Vec::with_capacity(n);
    for ((frame, outline), color) in frames.into_iter().zip(outlines).zip(colors) {
        match RigidSegment::create(
            world,
            frame,
            vec![outline],
            material,
            config.damping,
            config.collisions,
            color,
        ) {
            Ok(seg) => rigid.push(seg),
            Err(e) => {
                for seg in &rigid {
                    world.destroy_body(seg.handle());
                }
                return Err(e);
            }
        }
    }

    // Anchors are planned around segment midpoints; bodies sit at centroids
    let mut specs = plan_joints(
        n,
        sim_length / n as f32,
        config.width_to_length_ratio,
        config.joint_types,
    );
    for spec in &mut specs {
        spec.anchor_a -= centroid_offsets[spec.seg_a];
        spec.anchor_b -= centroid_offsets[spec.seg_b];
    }
    let handles: Vec<_> = rigid.iter().map(|s| s.handle()).collect();
    let joints = match assemble_joints(world, &handles, &specs) {
        Ok(joints) => joints,
        Err(e) => {
            for h in handles {
                world.destroy_body(h);
            }
            return Err(e);
        }
    };

    let segments = rigid
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn Segment>)
        .collect();
    Ok((segments, joints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_6};

    fn config(n: usize) -> BodyConfig {
        BodyConfig {
            segment_count: n,
            ..Default::default()
        }
    }

    fn spawn(n: usize) -> LarvaBody {
        LarvaBody::spawn(config(n), 0.004, 1.0, Pose::default(), None).unwrap()
    }

    #[test]
    fn test_segmented_mass_matches_real_mass() {
        let reference = spawn(1).segmented_mass();
        for n in [2, 3, 5, 11] {
            for interval in [0.0, 0.01] {
                let body = LarvaBody::spawn(
                    BodyConfig {
                        interval,
                        ..config(n)
                    },
                    0.004,
                    1.0,
                    Pose::default(),
                    None,
                )
                .unwrap();
                let mass = body.segmented_mass();
                assert!((mass - reference).abs() / reference < 1e-5, "{} segments", n);
                assert!((body.real_mass() - reference).abs() / reference < 1e-5);
            }
        }
    }

    /// Mass the segment outlines actually carry at their rebalanced density
    fn outline_mass(n: usize, interval: f32) -> f32 {
        let body = LarvaBody::spawn(
            BodyConfig {
                interval,
                ..config(n)
            },
            1.0,
            1.0,
            Pose::default(),
            None,
        )
        .unwrap();
        body.segments()
            .iter()
            .map(|s| s.area() * s.material().density)
            .sum()
    }

    #[test]
    fn test_outline_mass_across_segment_counts() {
        // The single-segment outline is the coarse canonical polygon and
        // carries less area, so counts start at two
        let reference = outline_mass(2, 0.0);
        for n in [3, 5, 11, 12] {
            let mass = outline_mass(n, 0.0);
            assert!((mass - reference).abs() / reference < 0.01, "{} segments: {}", n, mass);
        }
        // Gaps cut away tapered rings, so the rebalanced mass drifts a little
        for n in [2, 5, 11] {
            let mass = outline_mass(n, 0.01);
            assert!((mass - reference).abs() / reference < 0.02, "{} segments: {}", n, mass);
        }
        assert!(outline_mass(1, 0.0) < reference);
    }

    #[test]
    fn test_real_size_bodies_spawn() {
        let mut world = RapierWorld::new(0.1);
        for n in [11, 12] {
            let body = spawn(n);
            assert_eq!(body.segment_count(), n);
            assert!(body.segments().iter().all(|s| s.area() > 0.0));

            let rigid = BodyConfig {
                backend: BodyBackend::Rigid,
                ..config(n)
            };
            let body = LarvaBody::spawn(rigid, 0.004, 1.0, Pose::default(), Some(&mut world)).unwrap();
            assert_eq!(world.body_count(), n);
            body.destroy(Some(&mut world));
        }
    }

    #[test]
    fn test_seg_ratio_must_match_segment_count() {
        let mismatched = BodyConfig {
            seg_ratio: Some(vec![0.5, 0.5]),
            ..config(3)
        };
        assert!(matches!(
            LarvaBody::spawn(mismatched, 0.004, 1.0, Pose::default(), None),
            Err(BodyError::InvalidSegmentRatio {
                expected: 3,
                len: 2,
                ..
            })
        ));
        let matching = BodyConfig {
            seg_ratio: Some(vec![0.25, 0.5, 0.25]),
            ..config(3)
        };
        let body = LarvaBody::spawn(matching, 0.004, 1.0, Pose::default(), None).unwrap();
        assert_eq!(body.seg_ratio(), &[0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_real_mass_from_base_density() {
        let body = spawn(3);
        let expected = 300.0 * 0.004 * 0.004 * 0.2;
        assert!((body.real_mass() - expected).abs() < 1e-9);
        assert!((body.compute_mass_from_length() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_segments_reproduce_silhouette() {
        let body = LarvaBody::spawn(config(4), 1.0, 1.0, Pose::default(), None).unwrap();
        let nose = body.global_front_end_of_head();
        let tail = body.global_rear_end_of_body();
        assert!((nose - Vec2::new(0.52 - 0.02, 0.0)).length() < 1e-4);
        assert!((tail - Vec2::new(-0.48 - 0.02, 0.0)).length() < 1e-4);
        assert!(body.body_bend().abs() < 1e-6);
        assert_eq!(body.spine_angles(), vec![0.0; 3]);
    }

    #[test]
    fn test_midspine() {
        let two = LarvaBody::spawn(config(2), 1.0, 1.0, Pose::default(), None).unwrap();
        assert!((two.global_midspine() - two.global_rear_end_of_head()).length() < 1e-6);

        let four = LarvaBody::spawn(config(4), 1.0, 1.0, Pose::default(), None).unwrap();
        let seg = four.segment(2).unwrap();
        assert!((four.global_midspine() - seg.world_point(seg.local_front_end())).length() < 1e-6);

        let three = LarvaBody::spawn(config(3), 1.0, 1.0, Pose::default(), None).unwrap();
        assert_eq!(three.global_midspine(), three.segment(1).unwrap().position());
    }

    #[test]
    fn test_colors() {
        let body = spawn(6);
        assert_eq!(body.head().color(), Color::GREEN);
        assert_eq!(body.tail().color(), Color::RED);
        assert_eq!(body.segment(2).unwrap().color(), Color([0, 0, 0]));
        assert_eq!(spawn(5).head().color(), Color([0, 0, 0]));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            LarvaBody::spawn(config(0), 1.0, 1.0, Pose::default(), None),
            Err(BodyError::InvalidSegmentCount(0))
        ));
        assert!(matches!(
            LarvaBody::spawn(config(2), 0.0, 1.0, Pose::default(), None),
            Err(BodyError::InvalidLength(_))
        ));
        let rigid = BodyConfig {
            backend: BodyBackend::Rigid,
            ..config(2)
        };
        assert!(matches!(
            LarvaBody::spawn(rigid, 1.0, 1.0, Pose::default(), None),
            Err(BodyError::MissingWorld)
        ));
    }

    #[test]
    fn test_growth_rescales_outlines() {
        let mut body = spawn(3);
        let area = body.segments().iter().map(|s| s.area()).sum::<f32>();
        let position = body.head().position();
        body.set_real_length(0.008).unwrap();
        let grown = body.segments().iter().map(|s| s.area()).sum::<f32>();
        assert!((grown / area - 4.0).abs() < 1e-3);
        assert_eq!(body.head().position(), position);
        assert!((body.real_mass() - 300.0 * 0.008 * 0.008 * 0.2).abs() < 1e-9);

        let mass = body.real_mass() * 0.25;
        body.set_real_mass(mass).unwrap();
        assert!((body.real_length() - 0.004).abs() < 1e-6);
    }

    #[test]
    fn test_kinematic_step_drives_head() {
        let mut body = LarvaBody::spawn(config(3), 1.0, 1.0, Pose::default(), None).unwrap();
        let gaps: Vec<f32> = body.rest_gaps.clone();
        body.apply_motion(0.5, 0.0);
        for _ in 0..10 {
            body.step_kinematic(0.1);
        }
        let start = LarvaBody::spawn(config(3), 1.0, 1.0, Pose::default(), None).unwrap();
        let travelled = body.head().position() - start.head().position();
        assert!((travelled - Vec2::new(0.5, 0.0)).length() < 1e-4);
        assert!(body.centroid_position().x - start.centroid_position().x > 0.45);
        for (i, gap) in gaps.iter().enumerate() {
            let rear = body.segments()[i].world_point(body.segments()[i].local_rear_end());
            let next = &body.segments()[i + 1];
            let front = next.world_point(next.local_front_end());
            assert!((rear.distance(front) - gap).abs() < 1e-4);
        }
    }

    #[test]
    fn test_kinematic_turn_respects_limit() {
        let mut body = LarvaBody::spawn(config(3), 1.0, 1.0, Pose::default(), None).unwrap();
        body.apply_motion(0.2, 3.0);
        for _ in 0..20 {
            body.step_kinematic(0.1);
            body.apply_motion(0.2, 3.0);
        }
        let limit = RevoluteParams::for_segments(3).upper_angle;
        for angle in body.spine_angles() {
            assert!(angle.abs() <= limit + 1e-4);
        }
    }

    #[test]
    fn test_replay_pose() {
        let mut body = spawn(2);
        let poses = [
            Pose::new(Vec2::new(1.0, 0.0), 0.3),
            Pose::new(Vec2::new(0.0, 0.0), 0.1),
        ];
        body.set_replay_pose(&poses, None).unwrap();
        assert_eq!(body.head().pose(), poses[0]);
        assert!((body.body_bend() - 0.2).abs() < 1e-6);
        assert_eq!(
            body.set_replay_pose(&poses[..1], None),
            Err(BodyError::ReplayMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_contour_size() {
        let body = spawn(11);
        assert_eq!(body.contour().len(), DEFAULT_CONTOUR_POINTS);
        let single = spawn(1);
        assert_eq!(single.contour().len(), 8);
    }

    #[test]
    fn test_rigid_spawn_and_destroy() {
        let mut world = RapierWorld::new(0.1);
        let rigid = BodyConfig {
            backend: BodyBackend::Rigid,
            ..config(3)
        };
        let body = LarvaBody::spawn(rigid, 1.0, 1.0, Pose::default(), Some(&mut world)).unwrap();
        assert_eq!(world.body_count(), 3);
        assert_eq!(world.collider_count(), 3);
        // Two distance joints and one revolute per pair
        assert_eq!(world.joint_count(), 6);
        assert_eq!(body.joints().len(), 6);

        let expected: f32 = body
            .segments()
            .iter()
            .map(|s| s.area() * s.material().density)
            .sum();
        let mass = body.total_rigid_mass(&mut world).unwrap();
        assert!((mass - expected).abs() / expected < 1e-3);
        assert!(spawn(3).total_rigid_mass(&mut world).is_none());

        body.destroy(Some(&mut world));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn test_rigid_sync_after_step() {
        let mut world = RapierWorld::new(0.05);
        let rigid = BodyConfig {
            backend: BodyBackend::Rigid,
            ..config(2)
        };
        let mut body = LarvaBody::spawn(rigid, 1.0, 1.0, Pose::default(), Some(&mut world)).unwrap();
        let start = body.head().position();
        for _ in 0..5 {
            body.apply_motion(1.0, 0.0);
            body.push_to_world(&mut world);
            world.step();
            body.sync_from_world(&world);
        }
        assert!(body.head().position().x > start.x);
        assert!(body.head().orientation().is_finite());
        body.destroy(Some(&mut world));
    }

    #[test]
    fn test_rigid_default_joints_step() {
        let mut world = RapierWorld::new(0.1);
        let rigid = BodyConfig {
            backend: BodyBackend::Rigid,
            ..config(3)
        };
        let mut body = LarvaBody::spawn(rigid, 0.004, 1.0, Pose::default(), Some(&mut world)).unwrap();
        for _ in 0..20 {
            body.apply_motion(0.001, 0.1);
            body.push_to_world(&mut world);
            world.step();
            body.sync_from_world(&world);
        }
        for seg in body.segments() {
            assert!(seg.position().is_finite());
            assert!(seg.orientation().is_finite());
        }
        // The chain stays connected
        for pair in body.segments().windows(2) {
            let rear = pair[0].world_point(pair[0].local_rear_end());
            let front = pair[1].world_point(pair[1].local_front_end());
            assert!(rear.distance(front) < 0.001);
        }
        body.destroy(Some(&mut world));
    }

    #[test]
    fn test_rigid_replay_pose_survives_step() {
        let mut world = RapierWorld::new(0.1);
        let rigid = BodyConfig {
            backend: BodyBackend::Rigid,
            ..config(2)
        };
        let mut body = LarvaBody::spawn(rigid, 0.004, 1.0, Pose::default(), Some(&mut world)).unwrap();
        let poses = [
            Pose::new(Vec2::new(0.0, 0.001), FRAC_PI_2),
            Pose::new(Vec2::new(0.001, -0.0007), FRAC_PI_6),
        ];
        body.set_replay_pose(&poses, Some(&mut world)).unwrap();
        for _ in 0..5 {
            world.step();
            body.sync_from_world(&world);
        }
        for (seg, pose) in body.segments().iter().zip(&poses) {
            assert!((seg.position() - pose.position).length() < 1e-6);
            assert!((seg.orientation() - pose.angle).abs() < 1e-5);
            assert!(world.is_body_kinematic(seg.rigid_handle().unwrap()));
        }
        body.destroy(Some(&mut world));
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-6);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
    }
}
