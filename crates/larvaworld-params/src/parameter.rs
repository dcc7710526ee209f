//! Parameter descriptors and derivation rules

use serde::{Deserialize, Serialize};

use crate::units::Unit;

/// How an angle-like value is folded back into its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    #[default]
    None,
    /// Fold into `[-range/2, range/2)`
    Zero,
    /// Fold into `[0, range)`
    Positive,
}

/// Statistic computed over an entity's recorded series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Mean,
    Std,
    Min,
    Max,
}

impl AggregateOp {
    pub fn suffix(&self) -> &'static str {
        match self {
            AggregateOp::Mean => "mu",
            AggregateOp::Std => "std",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }

    /// Apply to the non-NaN samples of `series`; empty input yields NaN
    pub fn apply(&self, series: &[f64]) -> f64 {
        let vs: Vec<f64> = series.iter().copied().filter(|v| !v.is_nan()).collect();
        if vs.is_empty() {
            return f64::NAN;
        }
        let n = vs.len() as f64;
        match self {
            AggregateOp::Mean => vs.iter().sum::<f64>() / n,
            AggregateOp::Std => {
                if vs.len() < 2 {
                    return f64::NAN;
                }
                let mean = vs.iter().sum::<f64>() / n;
                let ss: f64 = vs.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (n - 1.0)).sqrt()
            }
            AggregateOp::Min => vs.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateOp::Max => vs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Rule producing a parameter's value from an agent snapshot and other parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Derivation {
    /// Read through the accessor table
    Raw,
    /// `value(k0) - previous value(k0)`
    Difference { k0: String },
    /// Running sum of `value(k0)`, NaN samples skipped
    Cumulative { k0: String },
    /// `value(num) / value(den)`
    Rate { num: String, den: String },
    /// Statistic over the recorded series of `k0`
    Aggregate { op: AggregateOp, k0: String },
    /// Euclidean distance from the agent position to a fixed point (m)
    DistanceTo { source: (f64, f64) },
    /// Front orientation relative to the direction of a fixed point
    BearingTo { source: (f64, f64) },
    /// Distance from the agent's initial position
    Dispersion,
}

impl Derivation {
    /// Keys this rule reads, which must be registered first
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Derivation::Difference { k0 }
            | Derivation::Cumulative { k0 }
            | Derivation::Aggregate { k0, .. } => vec![k0.as_str()],
            Derivation::Rate { num, den } => vec![num.as_str(), den.as_str()],
            _ => Vec::new(),
        }
    }
}

/// A named, unit-tagged quantity descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub name: String,
    pub display: String,
    pub symbol: String,
    pub unit: Unit,
    #[serde(default)]
    pub lim: Option<(f64, f64)>,
    #[serde(default)]
    pub wrap: WrapMode,
    pub derivation: Derivation,
}

impl Parameter {
    /// Raw parameter whose name, display and symbol default to its key
    pub fn raw(key: &str, unit: Unit) -> Self {
        Self::derived(key, unit, Derivation::Raw)
    }

    pub fn derived(key: &str, unit: Unit, derivation: Derivation) -> Self {
        Self {
            key: key.to_string(),
            name: key.to_string(),
            display: key.to_string(),
            symbol: key.to_string(),
            unit,
            lim: None,
            wrap: WrapMode::None,
            derivation,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_display(mut self, display: &str) -> Self {
        self.display = display.to_string();
        self
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn with_lim(mut self, lo: f64, hi: f64) -> Self {
        self.lim = Some((lo, hi));
        self
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    /// Limits used for wrapping: explicit limits, else a full turn for angle units
    pub fn limits(&self) -> Option<(f64, f64)> {
        if self.lim.is_some() {
            return self.lim;
        }
        let turn = self.unit.full_turn()?;
        match self.wrap {
            WrapMode::None => None,
            WrapMode::Positive => Some((0.0, turn)),
            WrapMode::Zero => Some((-turn / 2.0, turn / 2.0)),
        }
    }

    pub fn range(&self) -> Option<f64> {
        self.limits().map(|(lo, hi)| hi - lo)
    }

    /// Fold `v` into the wrap range with true modular arithmetic
    pub fn wrap_value(&self, v: f64) -> f64 {
        if self.wrap == WrapMode::None || v.is_nan() {
            return v;
        }
        let Some((lo, hi)) = self.limits() else {
            return v;
        };
        let range = hi - lo;
        if range <= 0.0 {
            return v;
        }
        let wrapped = (v - lo).rem_euclid(range) + lo;
        // rem_euclid can round up to exactly `range` for tiny negative offsets
        if wrapped >= hi {
            wrapped - range
        } else {
            wrapped
        }
    }

    /// Human-readable label, e.g. `bend, θb (deg)`
    pub fn label(&self) -> String {
        let unit = self.unit.symbol();
        if unit.is_empty() {
            format!("{}, {}", self.display, self.symbol)
        } else {
            format!("{}, {} ({})", self.display, self.symbol, unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_wrap_degrees() {
        let p = Parameter::raw("fo", Unit::degree()).with_wrap(WrapMode::Positive);
        assert_eq!(p.limits(), Some((0.0, 360.0)));
        for x in [-725.0, -360.0, -1.0, 0.0, 359.9, 360.0, 1085.5] {
            let w = p.wrap_value(x);
            assert!((0.0..360.0).contains(&w), "{} -> {}", x, w);
            for k in [-3.0, -1.0, 1.0, 4.0] {
                let shifted = p.wrap_value(x + 360.0 * k);
                assert!((shifted - w).abs() < 1e-9, "{} vs {}", shifted, w);
            }
        }
    }

    #[test]
    fn test_zero_wrap_radians() {
        let p = Parameter::raw("b", Unit::radian()).with_wrap(WrapMode::Zero);
        let w = p.wrap_value(3.0 * std::f64::consts::PI + 0.5);
        assert!((w - (-std::f64::consts::PI + 0.5)).abs() < 1e-9);
        // Several turns beyond the limit
        let w = p.wrap_value(7.0 * std::f64::consts::TAU + 0.25);
        assert!((w - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_limits_override_unit() {
        let p = Parameter::raw("A_tur", Unit::dimensionless())
            .with_lim(10.0, 40.0)
            .with_wrap(WrapMode::Positive);
        assert_eq!(p.range(), Some(30.0));
        assert!((p.wrap_value(45.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_wrap_passthrough() {
        let p = Parameter::raw("fou", Unit::degree());
        assert_eq!(p.wrap_value(1000.0), 1000.0);
        assert!(p.limits().is_none());
    }

    #[test]
    fn test_aggregate_ops() {
        let s = [1.0, f64::NAN, 3.0, 5.0];
        assert_eq!(AggregateOp::Mean.apply(&s), 3.0);
        assert_eq!(AggregateOp::Min.apply(&s), 1.0);
        assert_eq!(AggregateOp::Max.apply(&s), 5.0);
        assert!((AggregateOp::Std.apply(&s) - 2.0).abs() < 1e-12);
        assert!(AggregateOp::Mean.apply(&[]).is_nan());
        assert!(AggregateOp::Max.apply(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_dependencies() {
        let d = Derivation::Rate {
            num: "d".into(),
            den: "dt".into(),
        };
        assert_eq!(d.dependencies(), vec!["d", "dt"]);
        assert!(Derivation::Dispersion.dependencies().is_empty());
    }
}
