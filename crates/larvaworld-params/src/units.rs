//! Multiplicative physical units
//!
//! A [`Unit`] is a scale factor relative to SI (with the radian as the base
//! angle) plus integer exponents over the base dimensions. Units compose
//! through `*`, `/` and [`Unit::powi`], and their display symbol is built from
//! the named terms that went into them, so `mm / s` prints as `mm/s`.

use std::fmt;
use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{ParError, Result};

/// Base dimensions tracked by [`Unit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length = 0,
    Time = 1,
    Mass = 2,
    Amount = 3,
    Angle = 4,
}

const DIMENSIONS: usize = 5;

/// A physical unit: factor relative to SI, dimension exponents and symbol terms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    factor: f64,
    dims: [i8; DIMENSIONS],
    terms: Vec<(String, i8)>,
}

impl Unit {
    fn named(symbol: &str, factor: f64, dims: &[(Dimension, i8)]) -> Self {
        let mut exps = [0; DIMENSIONS];
        for (dim, exp) in dims {
            exps[*dim as usize] += exp;
        }
        Self {
            factor,
            dims: exps,
            terms: vec![(symbol.to_string(), 1)],
        }
    }

    pub fn dimensionless() -> Self {
        Self {
            factor: 1.0,
            dims: [0; DIMENSIONS],
            terms: Vec::new(),
        }
    }

    pub fn meter() -> Self {
        Self::named("m", 1.0, &[(Dimension::Length, 1)])
    }

    pub fn centimeter() -> Self {
        Self::named("cm", 1e-2, &[(Dimension::Length, 1)])
    }

    pub fn millimeter() -> Self {
        Self::named("mm", 1e-3, &[(Dimension::Length, 1)])
    }

    pub fn second() -> Self {
        Self::named("s", 1.0, &[(Dimension::Time, 1)])
    }

    pub fn day() -> Self {
        Self::named("day", 86_400.0, &[(Dimension::Time, 1)])
    }

    pub fn kilogram() -> Self {
        Self::named("kg", 1.0, &[(Dimension::Mass, 1)])
    }

    pub fn gram() -> Self {
        Self::named("g", 1e-3, &[(Dimension::Mass, 1)])
    }

    pub fn radian() -> Self {
        Self::named("rad", 1.0, &[(Dimension::Angle, 1)])
    }

    pub fn degree() -> Self {
        Self::named("deg", std::f64::consts::PI / 180.0, &[(Dimension::Angle, 1)])
    }

    pub fn joule() -> Self {
        Self::named(
            "J",
            1.0,
            &[
                (Dimension::Mass, 1),
                (Dimension::Length, 2),
                (Dimension::Time, -2),
            ],
        )
    }

    pub fn hertz() -> Self {
        Self::named("Hz", 1.0, &[(Dimension::Time, -1)])
    }

    /// Micromole per litre (1e-3 mol/m^3)
    pub fn micromolar() -> Self {
        Self::named(
            "µM",
            1e-3,
            &[(Dimension::Amount, 1), (Dimension::Length, -3)],
        )
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn exponent(&self, dim: Dimension) -> i8 {
        self.dims[dim as usize]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.iter().all(|e| *e == 0)
    }

    /// True for plain angle units (rad, deg)
    pub fn is_angle(&self) -> bool {
        self.dims
            .iter()
            .enumerate()
            .all(|(i, e)| *e == if i == Dimension::Angle as usize { 1 } else { 0 })
    }

    pub fn same_dimension(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Full turn expressed in this unit (360 for deg, 2π for rad)
    pub fn full_turn(&self) -> Option<f64> {
        self.is_angle()
            .then(|| std::f64::consts::TAU / self.factor)
    }

    pub fn powi(&self, n: i8) -> Self {
        Self {
            factor: self.factor.powi(n as i32),
            dims: self.dims.map(|e| e * n),
            terms: self
                .terms
                .iter()
                .map(|(s, e)| (s.clone(), e * n))
                .filter(|(_, e)| *e != 0)
                .collect(),
        }
    }

    /// Multiplier turning a value in `self` into a value in `to`
    pub fn conversion_factor(&self, to: &Unit) -> Result<f64> {
        if !self.same_dimension(to) {
            return Err(ParError::IncompatibleUnits {
                from: self.symbol(),
                to: to.symbol(),
            });
        }
        Ok(self.factor / to.factor)
    }

    pub fn symbol(&self) -> String {
        let term = |(s, e): &(String, i8)| {
            if e.abs() == 1 {
                s.clone()
            } else {
                format!("{}^{}", s, e.abs())
            }
        };
        let num: Vec<String> = self.terms.iter().filter(|(_, e)| *e > 0).map(term).collect();
        let den: Vec<String> = self.terms.iter().filter(|(_, e)| *e < 0).map(term).collect();
        let den = if den.len() > 1 {
            format!("({})", den.join("*"))
        } else {
            den.join("*")
        };
        match (num.is_empty(), den.is_empty()) {
            (true, true) => String::new(),
            (false, true) => num.join("*"),
            (true, false) => format!("1/{}", den),
            (false, false) => format!("{}/{}", num.join("*"), den),
        }
    }

    fn combine(&self, rhs: &Unit, sign: i8) -> Unit {
        let mut terms = self.terms.clone();
        for (s, e) in &rhs.terms {
            match terms.iter_mut().find(|(name, _)| name == s) {
                Some(existing) => existing.1 += e * sign,
                None => terms.push((s.clone(), e * sign)),
            }
        }
        terms.retain(|(_, e)| *e != 0);

        let mut dims = self.dims;
        for (d, e) in dims.iter_mut().zip(rhs.dims.iter()) {
            *d += e * sign;
        }

        let factor = if sign > 0 {
            self.factor * rhs.factor
        } else {
            self.factor / rhs.factor
        };
        Unit {
            factor,
            dims,
            terms,
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && (self.factor - other.factor).abs() <= 1e-12 * self.factor.abs().max(other.factor.abs())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Mul for &Unit {
    type Output = Unit;

    fn mul(self, rhs: &Unit) -> Unit {
        self.combine(rhs, 1)
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        self.combine(&rhs, 1)
    }
}

impl Div for &Unit {
    type Output = Unit;

    fn div(self, rhs: &Unit) -> Unit {
        self.combine(rhs, -1)
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        self.combine(&rhs, -1)
    }
}

/// A numeric value tagged with its unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Express this quantity in another unit of the same dimension
    pub fn to(&self, target: &Unit) -> Result<Quantity> {
        let k = self.unit.conversion_factor(target)?;
        Ok(Quantity::new(self.value * k, target.clone()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.unit.symbol();
        if symbol.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, symbol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_symbol() {
        let v = Unit::millimeter() / Unit::second();
        assert_eq!(v.symbol(), "mm/s");
        let a = &v / &Unit::second();
        assert_eq!(a.symbol(), "mm/s^2");
        assert_eq!(a.exponent(Dimension::Time), -2);
    }

    #[test]
    fn test_same_symbol_cancels() {
        let r = Unit::meter() / Unit::meter();
        assert!(r.is_dimensionless());
        assert_eq!(r.symbol(), "");
        assert_eq!(r, Unit::dimensionless());
    }

    #[test]
    fn test_mixed_length_ratio_keeps_factor() {
        let r = Unit::millimeter() / Unit::meter();
        assert!(r.is_dimensionless());
        assert!((r.factor() - 1e-3).abs() < 1e-15);
        assert_ne!(r, Unit::dimensionless());
    }

    #[test]
    fn test_degree_conversion() {
        let q = Quantity::new(180.0, Unit::degree());
        let r = q.to(&Unit::radian()).unwrap();
        assert!((r.value - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(Unit::degree().full_turn(), Some(360.0));
        assert!(Unit::meter().full_turn().is_none());
    }

    #[test]
    fn test_incompatible_conversion() {
        let q = Quantity::new(1.0, Unit::meter());
        assert!(matches!(
            q.to(&Unit::second()),
            Err(ParError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_powi_and_joule() {
        let v = Unit::centimeter().powi(3);
        assert_eq!(v.symbol(), "cm^3");
        assert!((v.factor() - 1e-6).abs() < 1e-18);
        let j = Unit::kilogram() * Unit::meter().powi(2) / Unit::second().powi(2);
        assert_eq!(j, Unit::joule());
    }

    #[test]
    fn test_per_day() {
        let per_day = Unit::day().powi(-1);
        assert_eq!(per_day.symbol(), "1/day");
        assert!((per_day.factor() - 1.0 / 86_400.0).abs() < 1e-18);
    }
}
