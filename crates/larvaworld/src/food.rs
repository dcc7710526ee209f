use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A circular patch of food in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPatch {
    pub position: Vec2,
    pub radius: f32,
    pub amount: f32,
}

impl FoodPatch {
    pub fn new(position: Vec2, radius: f32, amount: f32) -> Self {
        Self {
            position,
            radius,
            amount,
        }
    }

    /// Whether a mouth at `point` with reach `reach` touches the patch
    pub fn reachable(&self, point: Vec2, reach: f32) -> bool {
        self.amount > 0.0 && self.position.distance(point) <= self.radius + reach
    }

    /// Remove up to `max_amount`, returning what was taken
    pub fn consume(&mut self, max_amount: f32) -> f32 {
        let taken = max_amount.clamp(0.0, self.amount);
        self.amount -= taken;
        taken
    }

    pub fn is_depleted(&self) -> bool {
        self.amount <= 0.0
    }
}
