//! Parameter registry for larva tracking quantities
//!
//! This crate implements:
//! - Multiplicative physical units and unit-tagged quantities
//! - Parameter descriptors with derivation rules (difference, cumulative, rate, aggregate, geometry)
//! - The default larva registry with RON description and reconstruction
//! - Per-entity evaluation caches over typed agent snapshots
//! - Named collections and per-agent collectors

pub mod collection;
pub mod error;
pub mod eval;
pub mod parameter;
pub mod registry;
pub mod units;

pub use collection::{AgentCollector, Collection};
pub use error::ParError;
pub use eval::{AccessorTable, AgentSnapshot, EnergeticsSnapshot, EvalCache, Evaluator};
pub use parameter::{AggregateOp, Derivation, Parameter, WrapMode};
pub use registry::{build_constants, build_deb_pars, build_par_dict, ParRegistry};
pub use units::{Quantity, Unit};
