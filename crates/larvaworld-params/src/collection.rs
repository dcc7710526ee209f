//! Named parameter collections and per-agent collectors

use log::{debug, warn};

use crate::error::{ParError, Result};
use crate::eval::{AgentSnapshot, EvalCache, Evaluator};
use crate::parameter::Derivation;
use crate::registry::ParRegistry;

const SPATIAL: &[&str] = &[
    "dsp", "sdsp", "d", "sd", "v", "sv", "a", "sa", "D_x", "sD_x", "xv", "sxv", "xa", "sxa", "D_y",
    "sD_y", "yv", "syv", "ya", "sya", "cum_d", "scum_d", "cum_D_x", "scum_D_x", "cum_D_y",
    "scum_D_y",
];

/// Keys of a named collection
pub fn collection_keys(name: &str) -> Option<&'static [&'static str]> {
    let keys: &'static [&'static str] = match name {
        "basic" => &["x", "y", "b", "fo"],
        "bouts" => &[
            "x", "y", "b", "fou", "rou", "v", "sv", "d", "fov", "bv", "sd", "o_cent",
        ],
        "spatial" => SPATIAL,
        "angular" => &["b", "bv", "ba", "fo", "fov", "foa", "ro", "rov", "roa"],
        "chemorbit" => &["d_cent", "sd_cent", "o_cent"],
        "chemotax" => &["d_chem", "sd_chem", "o_chem"],
        "olfactor" => &["Act_tur", "A_tur", "A_olf"],
        "odors" => &[
            "c_odor1", "c_odor2", "c_odor3", "dc_odor1", "dc_odor2", "dc_odor3",
        ],
        "e_basic" => &["l_mu", "cum_d", "scum_d", "cum_t", "x", "y", "sv_mu"],
        "e_dispersion" => &["dsp", "sdsp", "dsp_max", "sdsp_max"],
        "e_chemorbit" => &[
            "d_cent", "d_cent_mu", "d_cent_std", "d_cent_max", "sd_cent", "sd_cent_mu",
            "sd_cent_std", "sd_cent_max",
        ],
        "e_chemotax" => &[
            "d_chem", "d_chem_mu", "d_chem_std", "d_chem_max", "sd_chem", "sd_chem_mu",
            "sd_chem_std", "sd_chem_max",
        ],
        _ => return None,
    };
    Some(keys)
}

/// Per-tick and end-of-run collection names grouped under one label
pub fn combo_collections(name: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    let combo: (&'static [&'static str], &'static [&'static str]) = match name {
        "pose" => (
            &["basic", "bouts", "spatial", "angular"],
            &["e_basic", "e_dispersion"],
        ),
        "source vincinity" => (&["chemorbit"], &["e_chemorbit"]),
        "source approach" => (&["chemotax"], &["e_chemotax"]),
        "olfactor" => (&["odors", "olfactor"], &[]),
        _ => return None,
    };
    Some(combo)
}

/// A validated set of parameter keys
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub name: String,
    pub keys: Vec<String>,
}

impl Collection {
    pub fn new(name: &str, registry: &ParRegistry) -> Result<Self> {
        let keys =
            collection_keys(name).ok_or_else(|| ParError::UnknownCollection(name.to_string()))?;
        Self::from_keys(name, keys.iter().copied(), registry)
    }

    pub fn from_keys<'k>(
        name: &str,
        keys: impl IntoIterator<Item = &'k str>,
        registry: &ParRegistry,
    ) -> Result<Self> {
        let keys = keys
            .into_iter()
            .map(|k| registry.require(k).map(|p| p.key.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            keys,
        })
    }

    /// Union of several named collections, first occurrence wins
    pub fn merged(label: &str, names: &[&str], registry: &ParRegistry) -> Result<Self> {
        let mut keys: Vec<String> = Vec::new();
        for name in names {
            for k in Collection::new(name, registry)?.keys {
                if !keys.contains(&k) {
                    keys.push(k);
                }
            }
        }
        Ok(Self {
            name: label.to_string(),
            keys,
        })
    }
}

/// Per-agent table of collected values, one column per parameter key
#[derive(Debug, Clone)]
pub struct AgentCollector {
    step: Collection,
    end: Collection,
    /// Aggregate inputs evaluated every tick so end-of-run statistics have a series
    tracked: Vec<String>,
    columns: Vec<(String, Vec<f64>)>,
    ticks: usize,
}

impl AgentCollector {
    pub fn new(step: Collection, end: Collection, registry: &ParRegistry) -> Self {
        let mut tracked = Vec::new();
        for key in &end.keys {
            if let Some(Derivation::Aggregate { k0, .. }) =
                registry.get(key).map(|p| &p.derivation)
            {
                if !tracked.contains(k0) {
                    tracked.push(k0.clone());
                }
            }
        }
        let columns = step.keys.iter().map(|k| (k.clone(), Vec::new())).collect();
        Self {
            step,
            end,
            tracked,
            columns,
            ticks: 0,
        }
    }

    /// Collector for a combo label such as `pose`
    pub fn for_combo(label: &str, registry: &ParRegistry) -> Result<Self> {
        let (step, end) =
            combo_collections(label).ok_or_else(|| ParError::UnknownCollection(label.to_string()))?;
        Ok(Self::new(
            Collection::merged(label, step, registry)?,
            Collection::merged(label, end, registry)?,
            registry,
        ))
    }

    /// Append one row; columns whose parameter cannot be evaluated are dropped
    pub fn collect(&mut self, eval: &Evaluator, cache: &mut EvalCache, snap: &AgentSnapshot) {
        for key in &self.tracked {
            if let Err(e) = eval.get(cache, snap, key) {
                debug!("Tracked parameter {} skipped: {}", key, e);
            }
        }
        self.columns.retain_mut(|(key, values)| match eval.get(cache, snap, key.as_str()) {
            Ok(v) => {
                values.push(v);
                true
            }
            Err(e) => {
                warn!("Dropping column {} from {}: {}", key, self.step.name, e);
                false
            }
        });
        self.ticks += 1;
    }

    /// End-of-run values; failing keys are left out
    pub fn finalize(
        &self,
        eval: &Evaluator,
        cache: &mut EvalCache,
        snap: &AgentSnapshot,
    ) -> Vec<(String, f64)> {
        self.end
            .keys
            .iter()
            .filter_map(|key| match eval.get(cache, snap, key) {
                Ok(v) => Some((key.clone(), v)),
                Err(e) => {
                    warn!("Skipping end value {}: {}", key, e);
                    None
                }
            })
            .collect()
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }
}
