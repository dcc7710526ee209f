//! Growth models driving body length and mass

use larvaworld_params::EnergeticsSnapshot;

/// Turns eaten food into body mass
///
/// The full DEB model is an external collaborator; it plugs in here and
/// reports its state variables through [`Energetics::snapshot`].
pub trait Energetics: std::fmt::Debug {
    /// Record food eaten during the current tick
    fn feed(&mut self, amount: f32);

    /// Close the tick and return the new real mass, if it changed
    fn update(&mut self, dt: f32, real_mass: f32) -> Option<f32>;

    fn snapshot(&self, _real_length: f32, _real_mass: f32) -> Option<EnergeticsSnapshot> {
        None
    }
}

/// Adds a fixed fraction of eaten food to body mass
#[derive(Debug, Clone, PartialEq)]
pub struct BiomassGain {
    pub food_to_biomass_ratio: f32,
    pending: f32,
    total_eaten: f32,
    age: f32,
}

impl BiomassGain {
    pub fn new(food_to_biomass_ratio: f32) -> Self {
        Self {
            food_to_biomass_ratio,
            pending: 0.0,
            total_eaten: 0.0,
            age: 0.0,
        }
    }

    pub fn total_eaten(&self) -> f32 {
        self.total_eaten
    }
}

impl Energetics for BiomassGain {
    fn feed(&mut self, amount: f32) {
        if amount > 0.0 {
            self.pending += amount;
            self.total_eaten += amount;
        }
    }

    fn update(&mut self, dt: f32, real_mass: f32) -> Option<f32> {
        self.age += dt;
        if self.pending <= 0.0 {
            return None;
        }
        let gained = self.pending * self.food_to_biomass_ratio;
        self.pending = 0.0;
        Some(real_mass + gained)
    }

    fn snapshot(&self, real_length: f32, real_mass: f32) -> Option<EnergeticsSnapshot> {
        Some(EnergeticsSnapshot {
            // m to cm, kg to g
            physical_length: real_length as f64 * 100.0,
            wet_weight: real_mass as f64 * 1000.0,
            // Seconds to days
            age: self.age as f64 / 86_400.0,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biomass_gain() {
        let mut gain = BiomassGain::new(0.3);
        assert_eq!(gain.update(0.1, 1.0), None);
        gain.feed(0.5);
        gain.feed(-1.0);
        let mass = gain.update(0.1, 1.0).unwrap();
        assert!((mass - 1.15).abs() < 1e-6);
        assert_eq!(gain.update(0.1, mass), None);
        assert_eq!(gain.total_eaten(), 0.5);
    }

    #[test]
    fn test_snapshot_reports_size() {
        let gain = BiomassGain::new(0.3);
        let snap = gain.snapshot(0.004, 1e-3).unwrap();
        assert!((snap.physical_length - 0.4).abs() < 1e-6);
        assert!(snap.reserve.is_nan());
    }
}
