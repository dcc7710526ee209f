//! rapier2d world shared by all rigid-body larvae

use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::contour::{is_degenerate, polygon_area};
use crate::error::{BodyError, Result};
use crate::joints::{DistanceParams, RevoluteParams};
use crate::segment::{Material, Pose};

/// Velocity damping applied to every segment body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    pub linear: f32,
    pub angular: f32,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            linear: 1.0,
            angular: 1.0,
        }
    }
}

/// Pose and velocities of a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyState {
    pub pose: Pose,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
}

/// Manages the rapier2d sets for a top-down arena (no gravity)
pub struct RapierWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("dt", &self.integration_parameters.dt)
            .field("bodies", &self.rigid_body_set.len())
            .field("colliders", &self.collider_set.len())
            .field("joints", &self.impulse_joint_set.len())
            .finish()
    }
}

impl RapierWorld {
    pub fn new(dt: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt,
            ..Default::default()
        };

        log::debug!("Physics: Created world with dt={}", dt);

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Insert a dynamic body at `pose`
    pub fn create_rigid_body(&mut self, pose: Pose, damping: Damping) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![pose.position.x, pose.position.y])
            .rotation(pose.angle)
            .linear_damping(damping.linear)
            .angular_damping(damping.angular)
            .build();
        self.rigid_body_set.insert(body)
    }

    /// Attach a convex polygon collider to `body`
    ///
    /// With `collisions` off the collider joins no interaction group, so
    /// segments only interact through joints.
    pub fn create_polygon_fixture(
        &mut self,
        body: RigidBodyHandle,
        vertices: &[Vec2],
        material: Material,
        collisions: bool,
    ) -> Result<ColliderHandle> {
        if !self.rigid_body_set.contains(body) {
            return Err(BodyError::UnknownBody);
        }
        if is_degenerate(vertices) {
            return Err(BodyError::DegenerateOutline {
                area: polygon_area(vertices),
            });
        }
        let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y]).collect();
        let groups = if collisions {
            InteractionGroups::all()
        } else {
            InteractionGroups::none()
        };
        let collider = ColliderBuilder::convex_hull(&points)
            .ok_or(BodyError::InvalidConvexHull)?
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .collision_groups(groups)
            .build();
        Ok(self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set))
    }

    /// Spring/damper between two local anchors
    ///
    /// Built from independent position motors on both linear axes of a free
    /// generic joint. The motors pull `anchor_b` to `rest_length` behind
    /// `anchor_a` along body A's axis.
    pub fn create_distance_joint(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
        params: DistanceParams,
    ) -> ImpulseJointHandle {
        let stiffness = params.stiffness();
        let damping = params.damping();
        let joint = GenericJointBuilder::new(JointAxesMask::empty())
            .local_anchor1(point![anchor_a.x, anchor_a.y])
            .local_anchor2(point![anchor_b.x, anchor_b.y])
            .motor_position(JointAxis::X, -params.rest_length, stiffness, damping)
            .motor_model(JointAxis::X, MotorModel::AccelerationBased)
            .motor_position(JointAxis::Y, 0.0, stiffness, damping)
            .motor_model(JointAxis::Y, MotorModel::AccelerationBased)
            .contacts_enabled(false);
        self.impulse_joint_set.insert(body_a, body_b, joint, true)
    }

    /// Limited pivot with an optional velocity motor
    pub fn create_revolute_joint(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
        params: RevoluteParams,
    ) -> ImpulseJointHandle {
        let mut joint = RevoluteJointBuilder::new()
            .local_anchor1(point![anchor_a.x, anchor_a.y])
            .local_anchor2(point![anchor_b.x, anchor_b.y])
            .limits([params.lower_angle, params.upper_angle])
            .contacts_enabled(false);
        if params.motor {
            joint = joint
                .motor_velocity(params.motor_speed, params.motor_factor)
                .motor_max_force(params.max_motor_torque);
        }
        self.impulse_joint_set.insert(body_a, body_b, joint, true)
    }

    /// Remove a body together with its colliders and joints
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Advance the simulation by one `dt`
    pub fn step(&mut self) {
        let gravity = vector![0.0, 0.0];
        let physics_hooks = ();
        let event_handler = ();

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
    }

    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        let body = self.rigid_body_set.get(handle)?;
        let translation = body.translation();
        let linvel = body.linvel();
        Some(BodyState {
            pose: Pose::new(
                Vec2::new(translation.x, translation.y),
                body.rotation().angle(),
            ),
            linear_velocity: Vec2::new(linvel.x, linvel.y),
            angular_velocity: body.angvel(),
        })
    }

    /// Switch a body between dynamic and kinematic (position driven)
    ///
    /// Kinematic bodies ignore joints and forces and stay where
    /// [`RapierWorld::set_body_state`] puts them.
    pub fn set_body_kinematic(&mut self, handle: RigidBodyHandle, kinematic: bool) -> bool {
        let Some(body) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        let body_type = if kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Dynamic
        };
        body.set_body_type(body_type, true);
        true
    }

    pub fn is_body_kinematic(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map(|b| b.is_kinematic())
            .unwrap_or(false)
    }

    /// Overwrite pose and velocities, waking the body
    pub fn set_body_state(&mut self, handle: RigidBodyHandle, state: BodyState) -> bool {
        let Some(body) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        let p = state.pose.position;
        body.set_position(Isometry::new(vector![p.x, p.y], state.pose.angle), true);
        body.set_linvel(
            vector![state.linear_velocity.x, state.linear_velocity.y],
            true,
        );
        body.set_angvel(state.angular_velocity, true);
        true
    }

    /// Mass of a body from its attached colliders
    pub fn body_mass(&mut self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.rigid_body_set.get_mut(handle)?;
        body.recompute_mass_properties_from_colliders(&self.collider_set);
        Some(body.mass())
    }

    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }
}
