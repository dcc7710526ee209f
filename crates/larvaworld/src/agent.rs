//! Larva agents: a body plus whatever drives it

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use larvaworld_body::{LarvaBody, RapierWorld, Segment};
use larvaworld_params::{AgentCollector, AgentSnapshot, EvalCache, Evaluator};

use crate::brain::{Brain, BrainActivity, MotorCommand};
use crate::energetics::Energetics;
use crate::error::Result;
use crate::food::FoodPatch;
use crate::replay::ReplayTrack;

/// Unique identifier for agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u64);

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

impl AgentId {
    /// Generate a new unique agent ID
    pub fn new() -> Self {
        AgentId(NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Larva({})", self.0)
    }
}

/// What moves the body each tick
#[derive(Debug)]
pub enum Driver {
    Brain(Box<dyn Brain>),
    Replay(ReplayTrack),
}

/// Mouth reach and intake limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feeder {
    /// Fraction of simulated body length
    pub radius: f32,
    /// Fraction of real mass eaten at most per tick
    pub max_feed_amount_ratio: f32,
}

/// A simulated (or replayed) larva
#[derive(Debug)]
pub struct LarvaAgent {
    id: AgentId,
    pub body: LarvaBody,
    driver: Driver,
    energetics: Option<Box<dyn Energetics>>,
    feeder: Feeder,
    cache: EvalCache,
    collector: Option<AgentCollector>,
    initial_position: Vec2,
    position: Vec2,
    step_distance: f32,
    trajectory: Vec<Vec2>,
    amount_eaten: f32,
    feed_success_counter: u32,
}

impl LarvaAgent {
    pub fn new(body: LarvaBody, driver: Driver, feeder: Feeder) -> Self {
        let position = body.global_midspine();
        Self {
            id: AgentId::new(),
            body,
            driver,
            energetics: None,
            feeder,
            cache: EvalCache::new(),
            collector: None,
            initial_position: position,
            position,
            step_distance: f32::NAN,
            trajectory: vec![position],
            amount_eaten: 0.0,
            feed_success_counter: 0,
        }
    }

    pub fn with_energetics(mut self, energetics: Box<dyn Energetics>) -> Self {
        self.energetics = Some(energetics);
        self
    }

    pub fn with_collector(mut self, collector: AgentCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn trajectory(&self) -> &[Vec2] {
        &self.trajectory
    }

    pub fn amount_eaten(&self) -> f32 {
        self.amount_eaten
    }

    pub fn feed_success_counter(&self) -> u32 {
        self.feed_success_counter
    }

    pub fn collector(&self) -> Option<&AgentCollector> {
        self.collector.as_ref()
    }

    pub fn cache(&self) -> &EvalCache {
        &self.cache
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.driver, Driver::Replay(_))
    }

    /// Most food one feeding attempt may take
    pub fn max_feed_amount(&self) -> f32 {
        self.feeder.max_feed_amount_ratio * self.body.real_mass()
    }

    /// Run the driver and apply its output to the body
    ///
    /// Replay agents are posed directly; brain agents get head velocities and
    /// may attempt to feed.
    pub fn drive(
        &mut self,
        tick: u64,
        dt: f32,
        food: &mut [FoodPatch],
        world: Option<&mut RapierWorld>,
    ) -> Result<()> {
        let command = match &mut self.driver {
            Driver::Replay(track) => {
                let poses = track.poses(tick as usize, &self.body.segment_lengths())?;
                if poses.iter().any(|p| p.position.is_nan() || p.angle.is_nan()) {
                    log::debug!("{}: no pose recorded at tick {}", self.id, tick);
                    return Ok(());
                }
                self.body.set_replay_pose(&poses, world)?;
                return Ok(());
            }
            Driver::Brain(brain) => brain.step(tick, dt),
        };
        let MotorCommand { lin, ang, feed } = command;
        self.body.apply_motion(lin, ang);
        if feed {
            self.feed_attempt(food);
        }
        Ok(())
    }

    /// Eat from the first patch within reach of the mouth
    pub fn feed_attempt(&mut self, food: &mut [FoodPatch]) -> f32 {
        let mouth = self.body.olfactor_position();
        let reach = self.feeder.radius * self.body.sim_length();
        let max_amount = self.max_feed_amount();
        let Some(patch) = food.iter_mut().find(|p| p.reachable(mouth, reach)) else {
            return 0.0;
        };
        let eaten = patch.consume(max_amount);
        self.feed_success_counter += 1;
        self.amount_eaten += eaten;
        if let Some(energetics) = &mut self.energetics {
            energetics.feed(eaten);
        }
        eaten
    }

    /// Apply growth and record position after the physics step
    pub fn finish_tick(&mut self, dt: f32) -> Result<()> {
        if let Some(energetics) = &mut self.energetics {
            if let Some(mass) = energetics.update(dt, self.body.real_mass()) {
                self.body.set_real_mass(mass)?;
            }
        }
        let position = self.body.global_midspine();
        self.step_distance = self.position.distance(position);
        self.position = position;
        self.trajectory.push(position);
        Ok(())
    }

    /// Registry view of the agent at `tick`
    pub fn snapshot(&self, tick: u64, dt: f32) -> AgentSnapshot {
        let head = self.body.head();
        let tail = self.body.tail();
        let activity = match &self.driver {
            Driver::Brain(brain) => brain.activity(),
            Driver::Replay(_) => BrainActivity::default(),
        };
        AgentSnapshot {
            tick,
            dt: dt as f64,
            position: self.position.as_dvec2(),
            initial_position: self.initial_position.as_dvec2(),
            real_length: self.body.real_length() as f64,
            step_distance: self.step_distance as f64,
            front_orientation: head.normalized_orientation() as f64,
            rear_orientation: tail.normalized_orientation() as f64,
            front_orientation_unwrapped: head.orientation() as f64,
            rear_orientation_unwrapped: tail.orientation() as f64,
            bend: self.body.body_bend() as f64,
            odor_concentrations: [f64::NAN; 3],
            turner_output: activity.turner_output,
            turner_input: activity.turner_input,
            olfactory_activation: activity.olfactory_activation,
            energetics: self
                .energetics
                .as_ref()
                .and_then(|e| e.snapshot(self.body.real_length(), self.body.real_mass())),
        }
    }

    /// Append this tick's row to the collector
    pub fn collect(&mut self, eval: &Evaluator, tick: u64, dt: f32) {
        let snap = self.snapshot(tick, dt);
        if let Some(collector) = &mut self.collector {
            collector.collect(eval, &mut self.cache, &snap);
        }
    }

    /// End-of-run values of the collector
    pub fn finalize(&mut self, eval: &Evaluator, tick: u64, dt: f32) -> Vec<(String, f64)> {
        let snap = self.snapshot(tick, dt);
        match &self.collector {
            Some(collector) => collector.finalize(eval, &mut self.cache, &snap),
            None => Vec::new(),
        }
    }
}
