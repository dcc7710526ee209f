//! Parameter evaluation against agent snapshots
//!
//! Raw values come from an [`AccessorTable`], a typed key → function mapping
//! over [`AgentSnapshot`]. Per-entity rolling state (last tick, current and
//! previous value, recorded history) lives in an [`EvalCache`] that the caller
//! owns and passes in, so one registry serves any number of agents.

use ahash::AHashMap;
use glam::DVec2;

use crate::error::{ParError, Result};
use crate::parameter::Derivation;
use crate::registry::ParRegistry;
use crate::units::Quantity;

/// Energetics state exposed to the registry, in the units the descriptors declare
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergeticsSnapshot {
    /// cm
    pub structural_length: f64,
    /// cm
    pub physical_length: f64,
    /// cm^3
    pub structural_volume: f64,
    /// g
    pub wet_weight: f64,
    /// days
    pub age: f64,
    pub hunger: f64,
    /// J
    pub reserve: f64,
    /// J
    pub maturity: f64,
    /// J
    pub reproduction_buffer: f64,
    pub model_assimilation: f64,
    pub sim_assimilation: f64,
    pub gut_assimilation: f64,
    pub reserve_density: f64,
    pub functional_response: f64,
    pub base_functional_response: f64,
    /// 1/day
    pub filtering_rate: f64,
    /// Hz
    pub feed_frequency: f64,
    pub pupation_buffer: f64,
}

impl Default for EnergeticsSnapshot {
    fn default() -> Self {
        Self {
            structural_length: f64::NAN,
            physical_length: f64::NAN,
            structural_volume: f64::NAN,
            wet_weight: f64::NAN,
            age: f64::NAN,
            hunger: f64::NAN,
            reserve: f64::NAN,
            maturity: f64::NAN,
            reproduction_buffer: f64::NAN,
            model_assimilation: f64::NAN,
            sim_assimilation: f64::NAN,
            gut_assimilation: f64::NAN,
            reserve_density: f64::NAN,
            functional_response: f64::NAN,
            base_functional_response: f64::NAN,
            filtering_rate: f64::NAN,
            feed_frequency: f64::NAN,
            pupation_buffer: f64::NAN,
        }
    }
}

/// Read-only view of one agent at one tick, in SI units (m, s, rad)
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub tick: u64,
    pub dt: f64,
    pub position: DVec2,
    pub initial_position: DVec2,
    pub real_length: f64,
    /// Distance travelled during the last tick
    pub step_distance: f64,
    /// Head orientation folded into `[0, 2π)`
    pub front_orientation: f64,
    /// Tail orientation folded into `[0, 2π)`
    pub rear_orientation: f64,
    pub front_orientation_unwrapped: f64,
    pub rear_orientation_unwrapped: f64,
    pub bend: f64,
    /// µM, NaN where no odor layer exists
    pub odor_concentrations: [f64; 3],
    pub turner_output: f64,
    pub turner_input: f64,
    pub olfactory_activation: f64,
    pub energetics: Option<EnergeticsSnapshot>,
}

impl Default for AgentSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            dt: f64::NAN,
            position: DVec2::ZERO,
            initial_position: DVec2::ZERO,
            real_length: f64::NAN,
            step_distance: f64::NAN,
            front_orientation: 0.0,
            rear_orientation: 0.0,
            front_orientation_unwrapped: 0.0,
            rear_orientation_unwrapped: 0.0,
            bend: 0.0,
            odor_concentrations: [f64::NAN; 3],
            turner_output: f64::NAN,
            turner_input: f64::NAN,
            olfactory_activation: f64::NAN,
            energetics: None,
        }
    }
}

/// Reads one raw value off a snapshot; `None` when the agent lacks it
pub type Accessor = fn(&AgentSnapshot) -> Option<f64>;

/// Typed mapping from raw parameter key to accessor
#[derive(Clone, Default)]
pub struct AccessorTable {
    map: AHashMap<String, Accessor>,
}

impl AccessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, accessor: Accessor) {
        self.map.insert(key.to_string(), accessor);
    }

    pub fn get(&self, key: &str) -> Option<Accessor> {
        self.map.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Accessors for every raw key of [`crate::build_par_dict`]
    pub fn larva_defaults() -> Self {
        let mut t = Self::new();
        t.insert("x0", |s| Some(s.initial_position.x));
        t.insert("y0", |s| Some(s.initial_position.y));
        t.insert("dt", |s| Some(s.dt));
        t.insert("l", |s| Some(s.real_length));
        t.insert("d", |s| Some(s.step_distance));
        t.insert("x", |s| Some(s.position.x * 1000.0));
        t.insert("y", |s| Some(s.position.y * 1000.0));
        t.insert("b", |s| Some(s.bend.to_degrees()));
        t.insert("fo", |s| Some(s.front_orientation.to_degrees()));
        t.insert("ro", |s| Some(s.rear_orientation.to_degrees()));
        t.insert("fou", |s| Some(s.front_orientation_unwrapped.to_degrees()));
        t.insert("rou", |s| Some(s.rear_orientation_unwrapped.to_degrees()));
        t.insert("c_odor1", |s| Some(s.odor_concentrations[0]));
        t.insert("c_odor2", |s| Some(s.odor_concentrations[1]));
        t.insert("c_odor3", |s| Some(s.odor_concentrations[2]));
        t.insert("Act_tur", |s| Some(s.turner_output));
        t.insert("A_tur", |s| Some(s.turner_input));
        t.insert("A_olf", |s| Some(s.olfactory_activation));

        t.insert("L", |s| s.energetics.map(|e| e.structural_length));
        t.insert("Lw", |s| s.energetics.map(|e| e.physical_length));
        t.insert("V", |s| s.energetics.map(|e| e.structural_volume));
        t.insert("Ww", |s| s.energetics.map(|e| e.wet_weight));
        t.insert("age", |s| s.energetics.map(|e| e.age));
        t.insert("H", |s| s.energetics.map(|e| e.hunger));
        t.insert("E", |s| s.energetics.map(|e| e.reserve));
        t.insert("E_H", |s| s.energetics.map(|e| e.maturity));
        t.insert("E_R", |s| s.energetics.map(|e| e.reproduction_buffer));
        t.insert("deb_p_A", |s| s.energetics.map(|e| e.model_assimilation));
        t.insert("sim_p_A", |s| s.energetics.map(|e| e.sim_assimilation));
        t.insert("gut_p_A", |s| s.energetics.map(|e| e.gut_assimilation));
        t.insert("e", |s| s.energetics.map(|e| e.reserve_density));
        t.insert("f", |s| s.energetics.map(|e| e.functional_response));
        t.insert("f0", |s| s.energetics.map(|e| e.base_functional_response));
        t.insert("[F]", |s| s.energetics.map(|e| e.filtering_rate));
        t.insert("fr_f", |s| s.energetics.map(|e| e.feed_frequency));
        t.insert("pupation", |s| s.energetics.map(|e| e.pupation_buffer));
        t
    }
}

impl std::fmt::Debug for AccessorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        f.debug_struct("AccessorTable").field("keys", &keys).finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    tick: u64,
    current: f64,
    previous: f64,
}

/// Rolling evaluation state for one entity
#[derive(Debug, Clone, Default)]
pub struct EvalCache {
    entries: AHashMap<String, CacheEntry>,
    history: AHashMap<String, Vec<f64>>,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value computed for `key`, one per evaluated tick
    pub fn history(&self, key: &str) -> &[f64] {
        self.history.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value cached for `key` at exactly `tick`
    pub fn cached(&self, key: &str, tick: u64) -> Option<f64> {
        self.entries
            .get(key)
            .filter(|e| e.tick == tick)
            .map(|e| e.current)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.history.clear();
    }

    fn previous(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|e| e.previous)
    }

    fn store(&mut self, key: &str, tick: u64, current: f64, previous: f64) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                tick,
                current,
                previous,
            },
        );
        self.history.entry(key.to_string()).or_default().push(current);
    }
}

/// Evaluates registry parameters for one snapshot at a time
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a ParRegistry,
    accessors: &'a AccessorTable,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a ParRegistry, accessors: &'a AccessorTable) -> Self {
        Self {
            registry,
            accessors,
        }
    }

    pub fn registry(&self) -> &'a ParRegistry {
        self.registry
    }

    /// Value of `key` at `snap.tick`, memoized per tick in `cache`
    pub fn get(&self, cache: &mut EvalCache, snap: &AgentSnapshot, key: &str) -> Result<f64> {
        if let Some(v) = cache.cached(key, snap.tick) {
            return Ok(v);
        }
        let par = self.registry.require(key)?;

        let raw = match &par.derivation {
            Derivation::Raw => {
                let accessor = self
                    .accessors
                    .get(key)
                    .ok_or_else(|| ParError::MissingAccessor(key.to_string()))?;
                accessor(snap).ok_or_else(|| ParError::Unavailable(key.to_string()))?
            }
            Derivation::Difference { k0 } | Derivation::Cumulative { k0 } => {
                self.get(cache, snap, k0)?
            }
            Derivation::Rate { num, den } => {
                let n = self.get(cache, snap, num)?;
                let d = self.get(cache, snap, den)?;
                if d == 0.0 || d.is_nan() {
                    f64::NAN
                } else {
                    n / d
                }
            }
            // Aggregates summarize a series and are not part of the per-tick state
            Derivation::Aggregate { op, k0 } => return Ok(op.apply(cache.history(k0))),
            Derivation::DistanceTo { source } => {
                let src = DVec2::new(source.0, source.1);
                snap.position.distance(src) / par.unit.factor()
            }
            Derivation::BearingTo { source } => {
                let to_source = DVec2::new(source.0, source.1) - snap.position;
                let angle = to_source.y.atan2(to_source.x);
                (snap.front_orientation - angle) / par.unit.factor()
            }
            Derivation::Dispersion => {
                snap.position.distance(snap.initial_position) / par.unit.factor()
            }
        };

        let (current, previous) = match &par.derivation {
            Derivation::Difference { .. } => {
                let prev = cache.previous(key).unwrap_or(f64::NAN);
                (raw - prev, raw)
            }
            Derivation::Cumulative { .. } => {
                let prev = cache.previous(key).unwrap_or(0.0);
                let sum = if raw.is_nan() { prev } else { prev + raw };
                (sum, sum)
            }
            _ => (par.wrap_value(raw), raw),
        };
        cache.store(key, snap.tick, current, previous);
        Ok(current)
    }

    /// Like [`Evaluator::get`] but tagged with the parameter's unit
    pub fn get_with_unit(
        &self,
        cache: &mut EvalCache,
        snap: &AgentSnapshot,
        key: &str,
    ) -> Result<Quantity> {
        let value = self.get(cache, snap, key)?;
        let unit = self.registry.require(key)?.unit.clone();
        Ok(Quantity::new(value, unit))
    }
}
