//! Tick loop over a population of larvae

use std::f32::consts::TAU;

use glam::Vec2;
use larvaworld_body::{BodyBackend, LarvaBody, Pose, RapierWorld};
use larvaworld_params::{
    build_par_dict, collection::combo_collections, collection::collection_keys, AccessorTable,
    AgentCollector, Collection, Evaluator, ParError, ParRegistry,
};
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256StarStar;

use crate::agent::{AgentId, Driver, Feeder, LarvaAgent};
use crate::brain::{Brain, ConstantBrain};
use crate::config::SimConfig;
use crate::energetics::BiomassGain;
use crate::error::{Result, SimError};
use crate::food::FoodPatch;
use crate::replay::ReplayTrack;

/// Build one collector covering every configured group
///
/// A group is either a combo label (per-tick and end-of-run collections) or a
/// single per-tick collection name.
pub fn build_collector(groups: &[String], registry: &ParRegistry) -> Result<Option<AgentCollector>> {
    if groups.is_empty() {
        return Ok(None);
    }
    let mut step: Vec<&str> = Vec::new();
    let mut end: Vec<&str> = Vec::new();
    for group in groups {
        if let Some((s, e)) = combo_collections(group) {
            step.extend_from_slice(s);
            end.extend_from_slice(e);
        } else if collection_keys(group).is_some() {
            step.push(group.as_str());
        } else {
            return Err(ParError::UnknownCollection(group.clone()).into());
        }
    }
    let label = groups.join(",");
    Ok(Some(AgentCollector::new(
        Collection::merged(&label, &step, registry)?,
        Collection::merged(&label, &end, registry)?,
        registry,
    )))
}

/// A population of larvae sharing one clock, one food layer and (for the
/// rigid backend) one physics world
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    registry: ParRegistry,
    accessors: AccessorTable,
    world: Option<RapierWorld>,
    agents: Vec<LarvaAgent>,
    food: Vec<FoodPatch>,
    tick: u64,
    rng: Xoshiro256StarStar,
}

impl Simulation {
    /// Create the world and spawn `config.agents.count` brain-driven larvae
    pub fn new(config: SimConfig) -> Result<Self> {
        let registry = build_par_dict()?;
        let world = match config.physics.backend {
            BodyBackend::Rigid => Some(RapierWorld::new(config.simulation.dt)),
            BodyBackend::Kinematic => None,
        };
        let mut sim = Self {
            food: config.food.patches(),
            rng: Xoshiro256StarStar::seed_from_u64(config.simulation.seed),
            config,
            registry,
            accessors: AccessorTable::larva_defaults(),
            world,
            agents: Vec::new(),
            tick: 0,
        };

        for _ in 0..sim.config.agents.count {
            let length = sim.sample_length();
            let pose = sim.sample_pose();
            let agents = &sim.config.agents;
            let brain = ConstantBrain::new(
                agents.crawl_speed * length * sim.config.simulation.scaling_factor,
                agents.turn_rate,
                agents.feed,
            );
            sim.spawn_agent(Box::new(brain), length, pose)?;
        }

        info!(
            "Simulation ready: {} agents, {:?} backend, {} parameters",
            sim.agents.len(),
            sim.config.physics.backend,
            sim.registry.len()
        );
        Ok(sim)
    }

    fn sample_length(&mut self) -> f32 {
        let mean = self.config.agents.initial_length;
        let std = self.config.agents.length_std;
        if std <= 0.0 {
            return mean;
        }
        match Normal::new(mean, std) {
            Ok(dist) => {
                let length = dist.sample(&mut self.rng);
                if length > 0.0 {
                    length
                } else {
                    warn!("Sampled non-positive length {}, using mean {}", length, mean);
                    mean
                }
            }
            Err(e) => {
                warn!("Invalid length distribution ({}), using mean {}", e, mean);
                mean
            }
        }
    }

    fn sample_pose(&mut self) -> Pose {
        let radius = self.config.agents.spawn_radius.max(0.0);
        let r = radius * self.rng.gen::<f32>().sqrt();
        let theta = self.rng.gen::<f32>() * TAU;
        let angle = self.rng.gen::<f32>() * TAU;
        Pose::new(Vec2::from_angle(theta) * r, angle)
    }

    fn feeder(&self) -> Feeder {
        Feeder {
            radius: self.config.agents.feed_radius,
            max_feed_amount_ratio: self.config.agents.max_feed_amount_ratio,
        }
    }

    fn attach(&mut self, mut agent: LarvaAgent) -> Result<AgentId> {
        if let Some(collector) = build_collector(&self.config.collection.groups, &self.registry)? {
            agent = agent.with_collector(collector);
        }
        let id = agent.id();
        debug!("Added {} at {:?}", id, agent.position());
        self.agents.push(agent);
        Ok(id)
    }

    /// Add a larva driven by `brain`
    pub fn spawn_agent(&mut self, brain: Box<dyn Brain>, real_length: f32, pose: Pose) -> Result<AgentId> {
        let body = LarvaBody::spawn(
            self.config.body_config(),
            real_length,
            self.config.simulation.scaling_factor,
            pose,
            self.world.as_mut(),
        )?;
        let agent = LarvaAgent::new(body, Driver::Brain(brain), self.feeder()).with_energetics(
            Box::new(BiomassGain::new(self.config.agents.food_to_biomass_ratio)),
        );
        self.attach(agent)
    }

    /// Add a larva that replays `track`, with as many segments as the track has
    pub fn spawn_replay_agent(&mut self, track: ReplayTrack, real_length: f32) -> Result<AgentId> {
        let mut body_config = self.config.body_config();
        if body_config.segment_count != track.segments() {
            body_config.segment_count = track.segments();
            body_config.seg_ratio = None;
        }
        let mut body = LarvaBody::spawn(
            body_config,
            real_length,
            self.config.simulation.scaling_factor,
            Pose::default(),
            self.world.as_mut(),
        )?;
        // Start from the recorded pose so the initial position is the track's
        let poses = track.poses(self.tick as usize, &body.segment_lengths())?;
        if poses.iter().all(|p| p.position.is_finite() && p.angle.is_finite()) {
            body.set_replay_pose(&poses, self.world.as_mut())?;
        }
        let agent = LarvaAgent::new(body, Driver::Replay(track), self.feeder());
        self.attach(agent)
    }

    /// Remove an agent and its physics bodies
    pub fn remove_agent(&mut self, id: AgentId) -> Result<LarvaAgentSummary> {
        let i = self
            .agents
            .iter()
            .position(|a| a.id() == id)
            .ok_or(SimError::UnknownAgent(id))?;
        let mut agent = self.agents.remove(i);
        let eval = Evaluator::new(&self.registry, &self.accessors);
        let summary = LarvaAgentSummary {
            id,
            ticks: agent.collector().map(|c| c.ticks()).unwrap_or(0),
            amount_eaten: agent.amount_eaten(),
            end_values: agent.finalize(&eval, self.tick.saturating_sub(1), self.config.simulation.dt),
        };
        agent.body.destroy(self.world.as_mut());
        debug!("Removed {}", id);
        Ok(summary)
    }

    pub fn add_food(&mut self, patch: FoodPatch) {
        self.food.push(patch);
    }

    /// Advance every agent by one tick
    ///
    /// Drivers run first, then bodies move (kinematically or through the
    /// world), then growth is applied and each agent's row is collected.
    pub fn step(&mut self) -> Result<()> {
        let dt = self.config.simulation.dt;
        let tick = self.tick;

        for agent in &mut self.agents {
            agent.drive(tick, dt, &mut self.food, self.world.as_mut())?;
        }

        match &mut self.world {
            Some(world) => {
                for agent in self.agents.iter().filter(|a| !a.is_replay()) {
                    agent.body.push_to_world(world);
                }
                world.step();
                for agent in self.agents.iter_mut().filter(|a| !a.is_replay()) {
                    agent.body.sync_from_world(world);
                }
            }
            None => {
                for agent in self.agents.iter_mut().filter(|a| !a.is_replay()) {
                    agent.body.step_kinematic(dt);
                }
            }
        }

        let eval = Evaluator::new(&self.registry, &self.accessors);
        for agent in &mut self.agents {
            agent.finish_tick(dt)?;
            agent.collect(&eval, tick, dt);
        }
        self.tick += 1;
        Ok(())
    }

    /// Run `ticks` ticks, stopping early at the first error
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        info!("Ran {} ticks ({:.1} s simulated)", ticks, ticks as f32 * self.config.simulation.dt);
        Ok(())
    }

    /// End-of-run values per agent
    pub fn finalize(&mut self) -> Vec<(AgentId, Vec<(String, f64)>)> {
        let eval = Evaluator::new(&self.registry, &self.accessors);
        let tick = self.tick.saturating_sub(1);
        let dt = self.config.simulation.dt;
        self.agents
            .iter_mut()
            .map(|a| (a.id(), a.finalize(&eval, tick, dt)))
            .collect()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &ParRegistry {
        &self.registry
    }

    pub fn world(&self) -> Option<&RapierWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut RapierWorld> {
        self.world.as_mut()
    }

    pub fn agents(&self) -> &[LarvaAgent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&LarvaAgent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn food(&self) -> &[FoodPatch] {
        &self.food
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// What is left of an agent after removal
#[derive(Debug, Clone, PartialEq)]
pub struct LarvaAgentSummary {
    pub id: AgentId,
    pub ticks: usize,
    pub amount_eaten: f32,
    pub end_values: Vec<(String, f64)>,
}
