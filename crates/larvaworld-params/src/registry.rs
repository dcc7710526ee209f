//! Parameter registry
//!
//! Parameters are registered in dependency order: a derived parameter can only
//! reference keys that are already present. The registry can be written out as
//! a RON description and rebuilt from it, which re-runs the same checks.

use ahash::AHashMap;
use log::debug;

use crate::error::{ParError, Result};
use crate::parameter::{AggregateOp, Derivation, Parameter, WrapMode};
use crate::units::Unit;

/// Position of the chemotaxis odor source in metres
pub const CHEMOTAX_SOURCE: (f64, f64) = (0.04, 0.0);

/// Arena centre in metres
pub const ARENA_CENTER: (f64, f64) = (0.0, 0.0);

/// Key → parameter mapping with unique keys and no forward references
#[derive(Debug, Clone, Default)]
pub struct ParRegistry {
    pars: Vec<Parameter>,
    index: AHashMap<String, usize>,
}

impl ParRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter, checking key uniqueness and dependencies
    pub fn add(&mut self, par: Parameter) -> Result<&mut Parameter> {
        if self.index.contains_key(&par.key) {
            return Err(ParError::DuplicateKey(par.key));
        }
        if let Some(missing) = par
            .derivation
            .dependencies()
            .into_iter()
            .find(|k| !self.index.contains_key(*k))
        {
            return Err(ParError::UnresolvedDependency {
                key: par.key.clone(),
                missing: missing.to_string(),
            });
        }
        let idx = self.pars.len();
        self.index.insert(par.key.clone(), idx);
        self.pars.push(par);
        Ok(&mut self.pars[idx])
    }

    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.index.get(key).map(|i| &self.pars[*i])
    }

    pub fn require(&self, key: &str) -> Result<&Parameter> {
        self.get(key)
            .ok_or_else(|| ParError::UnknownKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pars.is_empty()
    }

    /// Parameters in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.pars.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pars.iter().map(|p| p.key.as_str())
    }

    /// `D_{k0}`: change of `k0` since the previous tick
    pub fn add_diff_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        self.add(
            Parameter::derived(
                &format!("D_{}", k0),
                b.unit.clone(),
                Derivation::Difference { k0: k0.into() },
            )
            .with_name(&format!("D_{}", b.name))
            .with_display(&format!("{} change", b.display))
            .with_symbol(&format!("Δ{}", b.symbol)),
        )
    }

    /// `cum_{k0}` unless `key` is given: running sum of `k0`
    pub fn add_cum_par(&mut self, k0: &str, key: Option<&str>) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        let key = key.map(str::to_string).unwrap_or_else(|| format!("cum_{}", k0));
        self.add(
            Parameter::derived(&key, b.unit.clone(), Derivation::Cumulative { k0: k0.into() })
                .with_name(&format!("cum_{}", b.name))
                .with_display(&format!("total {}", b.display))
                .with_symbol(&format!("{}^cum", b.symbol)),
        )
    }

    /// `k = num / den`, with the unit derived from both operands
    pub fn add_rate_par(&mut self, num: &str, den: &str, key: &str) -> Result<&mut Parameter> {
        let n = self.require(num)?.clone();
        let d = self.require(den)?.clone();
        self.add(
            Parameter::derived(
                key,
                &n.unit / &d.unit,
                Derivation::Rate {
                    num: num.into(),
                    den: den.into(),
                },
            )
            .with_display(&format!("{} rate", n.display))
            .with_symbol(&format!("{}/{}", n.symbol, d.symbol)),
        )
    }

    /// Rate of change of `k0` over the change of `k_time` (`D_{k0} / D_{k_time}`)
    pub fn add_rate_of(&mut self, k0: &str, k_den: &str, key: Option<&str>) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        let key = key.map(str::to_string).unwrap_or_else(|| format!("d_{}", k0));
        let par = self.add_rate_par(&format!("D_{}", k0), k_den, &key)?;
        par.display = format!("{} rate", b.display);
        par.symbol = format!("d{}", b.symbol);
        Ok(par)
    }

    pub fn add_aggregate_par(&mut self, op: AggregateOp, k0: &str) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        let suffix = op.suffix();
        self.add(
            Parameter::derived(
                &format!("{}_{}", k0, suffix),
                b.unit.clone(),
                Derivation::Aggregate { op, k0: k0.into() },
            )
            .with_name(&format!("{}_{}", b.name, suffix))
            .with_display(&format!("{} {}", b.display, suffix))
            .with_symbol(&format!("{}_{}", b.symbol, suffix)),
        )
    }

    pub fn add_mean_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        self.add_aggregate_par(AggregateOp::Mean, k0)
    }

    pub fn add_std_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        self.add_aggregate_par(AggregateOp::Std, k0)
    }

    pub fn add_min_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        self.add_aggregate_par(AggregateOp::Min, k0)
    }

    pub fn add_max_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        self.add_aggregate_par(AggregateOp::Max, k0)
    }

    /// `s{k0}`: `k0` in body lengths
    pub fn add_scaled_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        let par = self.add_rate_par(k0, "l", &format!("s{}", k0))?;
        par.name = format!("scaled_{}", b.name);
        par.display = format!("scaled {}", b.display);
        par.symbol = format!("{}*", b.symbol);
        Ok(par)
    }

    /// `[k0]`: `k0` per unit structural volume
    pub fn add_vspec_par(&mut self, k0: &str) -> Result<&mut Parameter> {
        let b = self.require(k0)?.clone();
        let key = format!("[{}]", k0);
        let par = self.add_rate_par(k0, "V", &key)?;
        par.name = key.clone();
        par.display = format!("volume specific {}", b.display);
        par.symbol = format!("[{}]", b.symbol);
        Ok(par)
    }

    /// RON description of every parameter in registration order
    pub fn describe(&self) -> Result<String> {
        ron::ser::to_string_pretty(&self.pars, ron::ser::PrettyConfig::default())
            .map_err(|e| ParError::Serialization(e.to_string()))
    }

    /// Rebuild a registry from [`ParRegistry::describe`] output
    pub fn from_description(text: &str) -> Result<Self> {
        let pars: Vec<Parameter> =
            ron::from_str(text).map_err(|e| ParError::Serialization(e.to_string()))?;
        let mut reg = Self::new();
        for par in pars {
            reg.add(par)?;
        }
        Ok(reg)
    }
}

/// Per-agent constants: initial position, timestep and body length
pub fn build_constants() -> Result<ParRegistry> {
    let mut reg = ParRegistry::new();
    reg.add(Parameter::raw("x0", Unit::meter()).with_symbol("x_0"))?;
    reg.add(Parameter::raw("y0", Unit::meter()).with_symbol("y_0"))?;
    reg.add(Parameter::raw("dt", Unit::second()))?;
    reg.add(
        Parameter::raw("l", Unit::meter())
            .with_name("real_length")
            .with_display("length"),
    )?;
    Ok(reg)
}

/// Energetics descriptors and their derivatives over age
pub fn build_deb_pars(reg: &mut ParRegistry) -> Result<()> {
    let raw = |key: &str, unit: Unit, name: &str, display: &str| {
        Parameter::raw(key, unit).with_name(name).with_display(display)
    };
    reg.add(raw("L", Unit::centimeter(), "L", "structural length"))?;
    reg.add(raw("Lw", Unit::centimeter(), "Lw", "physical length").with_symbol("L_w"))?;
    reg.add(raw("V", Unit::centimeter().powi(3), "V", "structural volume"))?;
    reg.add(raw("Ww", Unit::gram(), "Ww", "wet weight").with_symbol("W_w"))?;
    reg.add(raw("age", Unit::day(), "age", "age"))?;
    reg.add(raw("H", Unit::dimensionless(), "hunger", "hunger drive"))?;
    reg.add(raw("E", Unit::joule(), "E", "reserve energy"))?;
    reg.add(raw("E_H", Unit::joule(), "E_H", "maturity energy"))?;
    reg.add(raw("E_R", Unit::joule(), "E_R", "reproduction buffer"))?;
    reg.add(raw("deb_p_A", Unit::joule(), "deb_p_A", "assimilation energy (model)"))?;
    reg.add(raw("sim_p_A", Unit::joule(), "sim_p_A", "assimilation energy (sim)"))?;
    reg.add(raw("gut_p_A", Unit::joule(), "gut_p_A", "assimilation energy (gut)"))?;
    reg.add(raw("e", Unit::dimensionless(), "e", "scaled reserve density"))?;
    reg.add(raw("f", Unit::dimensionless(), "f", "scaled functional response"))?;
    reg.add(
        raw("f0", Unit::dimensionless(), "base_f", "base scaled functional response")
            .with_symbol("f_0"),
    )?;
    reg.add(raw(
        "[F]",
        Unit::day().powi(-1),
        "F",
        "volume specific filtering rate",
    ))?;
    reg.add(raw("fr_f", Unit::hertz(), "fr_feed", "feed motion frequency (estimate)"))?;
    reg.add(raw("pupation", Unit::dimensionless(), "pupation_buffer", "pupation ratio"))?;

    reg.add_diff_par("age")?;
    for k0 in ["f", "e", "H"] {
        reg.add_diff_par(k0)?;
        reg.add_rate_of(k0, "D_age", None)?;
    }
    for k0 in ["E", "Ww", "E_R", "E_H"] {
        reg.add_vspec_par(k0)?;
    }
    Ok(())
}

/// The full larva parameter registry
pub fn build_par_dict() -> Result<ParRegistry> {
    let mut reg = build_constants()?;
    build_deb_pars(&mut reg)?;

    reg.add(Parameter::raw("d", Unit::meter()).with_name("dst").with_display("distance"))?;
    reg.add(
        Parameter::derived("dsp", Unit::meter(), Derivation::Dispersion)
            .with_name("dispersion")
            .with_display("dispersion"),
    )?;
    reg.add(
        Parameter::derived(
            "o_cent",
            Unit::degree(),
            Derivation::BearingTo {
                source: ARENA_CENTER,
            },
        )
        .with_name("bearing_to_center")
        .with_display("bearing to center")
        .with_symbol("θ_or^cen")
        .with_wrap(WrapMode::Zero),
    )?;
    reg.add(
        Parameter::derived(
            "o_chem",
            Unit::degree(),
            Derivation::BearingTo {
                source: CHEMOTAX_SOURCE,
            },
        )
        .with_name("bearing_to_source")
        .with_display("bearing to source")
        .with_symbol("θ_or^source")
        .with_wrap(WrapMode::Zero),
    )?;
    reg.add(
        Parameter::derived(
            "d_cent",
            Unit::meter(),
            Derivation::DistanceTo {
                source: ARENA_CENTER,
            },
        )
        .with_name("dst_to_center")
        .with_display("distance to center")
        .with_symbol("d_cen"),
    )?;
    reg.add(
        Parameter::derived(
            "d_chem",
            Unit::meter(),
            Derivation::DistanceTo {
                source: CHEMOTAX_SOURCE,
            },
        )
        .with_name("dst_to_source")
        .with_display("distance to source")
        .with_symbol("d_source"),
    )?;

    reg.add(Parameter::raw("x", Unit::millimeter()))?;
    reg.add(Parameter::raw("y", Unit::millimeter()))?;
    reg.add(
        Parameter::raw("b", Unit::degree())
            .with_name("bend")
            .with_display("bend")
            .with_symbol("θ_b")
            .with_wrap(WrapMode::Zero),
    )?;
    reg.add(
        Parameter::raw("fo", Unit::degree())
            .with_name("front_orientation")
            .with_display("front orientation")
            .with_symbol("θ_or_f")
            .with_wrap(WrapMode::Positive),
    )?;
    reg.add(
        Parameter::raw("ro", Unit::degree())
            .with_name("rear_orientation")
            .with_display("rear orientation")
            .with_symbol("θ_or_r")
            .with_wrap(WrapMode::Positive),
    )?;
    reg.add(
        Parameter::raw("fou", Unit::degree())
            .with_name("front_orientation_unwrapped")
            .with_display("unwrapped front orientation")
            .with_symbol("θ_or_f"),
    )?;
    reg.add(
        Parameter::raw("rou", Unit::degree())
            .with_name("rear_orientation_unwrapped")
            .with_display("unwrapped rear orientation")
            .with_symbol("θ_or_r"),
    )?;

    let cum_t = reg.add_cum_par("dt", Some("cum_t"))?;
    cum_t.name = "cum_dur".into();
    cum_t.display = "total duration".into();
    cum_t.symbol = "t_cum".into();

    // Velocity and acceleration chains; the unwrapped orientations are named after
    // the wrapped ones they track.
    for (k0, kv, ka, named_after) in [
        ("b", "bv", "ba", "b"),
        ("fou", "fov", "foa", "fo"),
        ("rou", "rov", "roa", "ro"),
        ("x", "xv", "xa", "x"),
        ("y", "yv", "ya", "y"),
    ] {
        let base = reg.require(named_after)?.display.clone();
        reg.add_diff_par(k0)?;
        reg.add_rate_of(k0, "dt", Some(kv))?.display = format!("{} velocity", base);
        reg.add_diff_par(kv)?;
        reg.add_rate_of(kv, "dt", Some(ka))?.display = format!("{} acceleration", base);
    }

    let v = reg.add_rate_par("d", "dt", "v")?;
    v.name = "velocity".into();
    v.display = "velocity".into();
    v.symbol = "v".into();
    let a = reg.add_rate_par("v", "dt", "a")?;
    a.name = "acceleration".into();
    a.display = "acceleration".into();
    a.symbol = "a".into();
    reg.add_cum_par("d", None)?;
    reg.add_cum_par("D_x", None)?;
    reg.add_cum_par("D_y", None)?;

    for k0 in [
        "d", "v", "a", "D_x", "xv", "xa", "D_y", "yv", "ya", "cum_d", "cum_D_x", "cum_D_y",
        "d_chem", "d_cent", "dsp",
    ] {
        reg.add_scaled_par(k0)?;
    }

    for k0 in ["dsp", "sdsp", "d_cent", "d_chem", "sd_cent", "sd_chem"] {
        reg.add_mean_par(k0)?;
        reg.add_std_par(k0)?;
        reg.add_min_par(k0)?;
        reg.add_max_par(k0)?;
    }
    for k0 in ["l", "sv"] {
        reg.add_mean_par(k0)?;
    }

    for (i, ordinal) in ["first", "second", "third"].iter().enumerate() {
        let k = format!("c_odor{}", i + 1);
        reg.add(
            Parameter::raw(&k, Unit::micromolar())
                .with_name(&format!("{}_odor_concentration", ordinal))
                .with_display(&format!("Odor {} Conc", i + 1))
                .with_symbol(&format!("C_{}", i + 1)),
        )?;
        reg.add_diff_par(&k)?;
        reg.add_rate_of(&k, "dt", Some(&format!("dc_odor{}", i + 1)))?.symbol =
            format!("dC_{}", i + 1);
    }

    reg.add(
        Parameter::raw("Act_tur", Unit::dimensionless())
            .with_name("ang_activity")
            .with_display("turner output")
            .with_symbol("A_tur^out"),
    )?;
    reg.add(
        Parameter::raw("A_tur", Unit::dimensionless())
            .with_name("turner_activation")
            .with_display("turner input")
            .with_symbol("A_tur^in")
            .with_lim(10.0, 40.0),
    )?;
    reg.add(
        Parameter::raw("A_olf", Unit::dimensionless())
            .with_name("olfactory_activation")
            .with_display("olfactory activation")
            .with_symbol("A_olf")
            .with_lim(-1.0, 1.0),
    )?;

    debug!("Built parameter registry with {} parameters", reg.len());
    Ok(reg)
}
