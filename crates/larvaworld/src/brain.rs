//! Locomotion controllers
//!
//! The full neural brain lives outside this crate; agents only need a
//! per-tick motor command and a few activity readouts.

use serde::{Deserialize, Serialize};

/// Motor output for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorCommand {
    /// Forward head velocity (m/s)
    pub lin: f32,
    /// Head angular velocity (rad/s)
    pub ang: f32,
    /// Attempt to feed at the mouth this tick
    pub feed: bool,
}

/// Module activities exposed to the parameter registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrainActivity {
    pub turner_output: f64,
    pub turner_input: f64,
    pub olfactory_activation: f64,
}

impl Default for BrainActivity {
    fn default() -> Self {
        Self {
            turner_output: f64::NAN,
            turner_input: f64::NAN,
            olfactory_activation: f64::NAN,
        }
    }
}

/// Per-tick motor controller
pub trait Brain: std::fmt::Debug {
    fn step(&mut self, tick: u64, dt: f32) -> MotorCommand;

    fn activity(&self) -> BrainActivity {
        BrainActivity::default()
    }
}

/// Issues the same command every tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantBrain {
    pub command: MotorCommand,
}

impl ConstantBrain {
    pub fn new(lin: f32, ang: f32, feed: bool) -> Self {
        Self {
            command: MotorCommand { lin, ang, feed },
        }
    }
}

impl Brain for ConstantBrain {
    fn step(&mut self, _tick: u64, _dt: f32) -> MotorCommand {
        self.command
    }

    fn activity(&self) -> BrainActivity {
        BrainActivity {
            turner_output: self.command.ang as f64,
            ..Default::default()
        }
    }
}

/// Plays back a fixed command sequence, then stops (or loops)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptedBrain {
    commands: Vec<MotorCommand>,
    looping: bool,
    last: MotorCommand,
}

impl ScriptedBrain {
    pub fn new(commands: Vec<MotorCommand>) -> Self {
        Self {
            commands,
            looping: false,
            last: MotorCommand::default(),
        }
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }
}

impl Brain for ScriptedBrain {
    fn step(&mut self, tick: u64, _dt: f32) -> MotorCommand {
        let i = tick as usize;
        self.last = match (self.commands.get(i), self.looping) {
            (Some(c), _) => *c,
            (None, true) if !self.commands.is_empty() => self.commands[i % self.commands.len()],
            _ => MotorCommand::default(),
        };
        self.last
    }

    fn activity(&self) -> BrainActivity {
        BrainActivity {
            turner_output: self.last.ang as f64,
            ..Default::default()
        }
    }
}
