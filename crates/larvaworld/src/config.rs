//! Simulation configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `larvaworld.ron` in the working directory, or an explicit file
//! 3. Environment variables prefixed with `LARVAWORLD_`
//!
//! Example environment variable: `LARVAWORLD_SIMULATION__TICKS=600`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use glam::Vec2;
use larvaworld_body::{BodyBackend, BodyConfig, Damping, JointTypes};
use serde::{Deserialize, Serialize};

use crate::food::FoodPatch;

/// Main simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub body: BodySection,

    #[serde(default)]
    pub physics: PhysicsConfig,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub food: FoodConfig,
}

/// Clock and world scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds per tick
    pub dt: f32,
    /// Ticks to run
    pub ticks: u64,
    /// Real to simulated length factor
    pub scaling_factor: f32,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            ticks: 600,
            scaling_factor: 1.0,
            seed: 1,
        }
    }
}

/// Body shape and segmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodySection {
    pub segment_count: usize,
    pub seg_ratio: Option<Vec<f32>>,
    pub interval: f32,
    pub width_to_length_ratio: f32,
    pub density: f32,
    pub joint_types: JointTypes,
    pub contour_points: usize,
    pub contour_seed: u64,
    pub default_color: [i32; 3],
}

impl Default for BodySection {
    fn default() -> Self {
        let body = BodyConfig::default();
        Self {
            segment_count: body.segment_count,
            seg_ratio: body.seg_ratio,
            interval: body.interval,
            width_to_length_ratio: body.width_to_length_ratio,
            density: body.density,
            joint_types: body.joint_types,
            contour_points: body.contour_points,
            contour_seed: body.contour_seed,
            default_color: body.default_color,
        }
    }
}

/// Segment backend and material settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub backend: BodyBackend,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Let segments of different bodies collide
    pub collisions: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let body = BodyConfig::default();
        Self {
            backend: body.backend,
            linear_damping: body.damping.linear,
            angular_damping: body.damping.angular,
            friction: body.friction,
            restitution: body.restitution,
            collisions: body.collisions,
        }
    }
}

/// Population and default locomotion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub count: usize,
    /// Mean real body length (m)
    pub initial_length: f32,
    pub length_std: f32,
    /// Agents are placed uniformly within this distance of the origin (m)
    pub spawn_radius: f32,
    /// Forward head speed in body lengths per second
    pub crawl_speed: f32,
    /// Head angular velocity (rad/s)
    pub turn_rate: f32,
    pub feed: bool,
    /// Mouth reach as a fraction of simulated body length
    pub feed_radius: f32,
    /// Most food eaten per tick as a fraction of body mass
    pub max_feed_amount_ratio: f32,
    pub food_to_biomass_ratio: f32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            count: 1,
            initial_length: 0.004,
            length_std: 0.0,
            spawn_radius: 0.01,
            crawl_speed: 0.3,
            turn_rate: 0.0,
            feed: false,
            feed_radius: 0.1,
            max_feed_amount_ratio: 0.001,
            food_to_biomass_ratio: 0.3,
        }
    }
}

/// Parameter groups recorded per agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    /// Collection or combo names, e.g. `pose`, `olfactor`, `spatial`
    pub groups: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            groups: vec!["pose".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodPatchConfig {
    pub position: [f32; 2],
    pub radius: f32,
    pub amount: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FoodConfig {
    pub patches: Vec<FoodPatchConfig>,
}

impl FoodConfig {
    pub fn patches(&self) -> Vec<FoodPatch> {
        self.patches
            .iter()
            .map(|p| FoodPatch::new(Vec2::from(p.position), p.radius, p.amount))
            .collect()
    }
}

impl SimConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `path`, or `larvaworld.ron` if it exists
    /// 3. Environment variables prefixed with `LARVAWORLD_` (highest priority)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("larvaworld")
                .format(FileFormat::Ron)
                .required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("simulation.dt", 0.1)?
            .set_default("simulation.ticks", 600_i64)?
            .set_default("simulation.scaling_factor", 1.0)?
            .set_default("simulation.seed", 1_i64)?
            .set_default("agents.count", 1_i64)?
            .set_default("agents.initial_length", 0.004)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (LARVAWORLD_AGENTS__COUNT, etc.)
            .add_source(Environment::with_prefix("LARVAWORLD").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Body construction parameters assembled from the body and physics sections
    pub fn body_config(&self) -> BodyConfig {
        BodyConfig {
            segment_count: self.body.segment_count,
            seg_ratio: self.body.seg_ratio.clone(),
            interval: self.body.interval,
            width_to_length_ratio: self.body.width_to_length_ratio,
            density: self.body.density,
            friction: self.physics.friction,
            restitution: self.physics.restitution,
            joint_types: self.body.joint_types,
            collisions: self.physics.collisions,
            damping: Damping {
                linear: self.physics.linear_damping,
                angular: self.physics.angular_damping,
            },
            contour_points: self.body.contour_points,
            contour_seed: self.body.contour_seed,
            backend: self.physics.backend,
            default_color: self.body.default_color,
        }
    }
}
