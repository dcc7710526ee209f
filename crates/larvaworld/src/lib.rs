//! Larva locomotion simulation
//!
//! Agents pair a segmented [`larvaworld_body::LarvaBody`] with a driver (a
//! brain or a recorded track), optional energetics and a parameter collector
//! backed by the [`larvaworld_params`] registry.

pub mod agent;
pub mod brain;
pub mod config;
pub mod energetics;
pub mod error;
pub mod food;
pub mod replay;
pub mod simulation;

pub use agent::{AgentId, Driver, Feeder, LarvaAgent};
pub use brain::{Brain, BrainActivity, ConstantBrain, MotorCommand, ScriptedBrain};
pub use config::SimConfig;
pub use energetics::{BiomassGain, Energetics};
pub use error::{Result, SimError};
pub use food::FoodPatch;
pub use replay::ReplayTrack;
pub use simulation::{build_collector, LarvaAgentSummary, Simulation};
