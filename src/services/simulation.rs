//! Simulated route-assignment values
//!
//! Driver and route assignment is not optimized; these values are mocked.
//! The policy trait lets tests and demos pin them.

use crate::domain::types::PriorityLevel;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One parcel's worth of simulated fields
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedAssignment {
    /// 100..=999, rendered as `DRV-<n>`
    pub driver_number: u32,
    /// 10..=99, rendered as the route id suffix
    pub route_number: u32,
    /// 5..=15
    pub position_in_route: u32,
    pub priority: PriorityLevel,
    /// 0.85..=0.98, two decimals
    pub optimization_score: f64,
    /// 100..=999, rendered as `driver_<n>` in the custody chain
    pub custody_driver_number: u32,
    /// 800..=1500
    pub route_optimization_time_ms: u64,
    /// 10..=25
    pub api_response_time_ms: u64,
}

/// Source of simulated assignment values
pub trait SimulationPolicy: Send + Sync {
    fn assign(&mut self) -> SimulatedAssignment;
}

/// Uniformly random values from `rand`
pub struct RandomSimulation {
    rng: StdRng,
}

impl RandomSimulation {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Reproducible sequence for demos
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl SimulationPolicy for RandomSimulation {
    fn assign(&mut self) -> SimulatedAssignment {
        let rng = &mut self.rng;
        let priority =
            PriorityLevel::ALL.choose(rng).copied().unwrap_or(PriorityLevel::Standard);
        let score: f64 = rng.gen_range(0.85..=0.98);

        SimulatedAssignment {
            driver_number: rng.gen_range(100..=999),
            route_number: rng.gen_range(10..=99),
            position_in_route: rng.gen_range(5..=15),
            priority,
            optimization_score: crate::domain::types::round_to(score, 2),
            custody_driver_number: rng.gen_range(100..=999),
            route_optimization_time_ms: rng.gen_range(800..=1500),
            api_response_time_ms: rng.gen_range(10..=25),
        }
    }
}

/// Always returns the same assignment
#[derive(Debug, Clone)]
pub struct FixedSimulation(pub SimulatedAssignment);

impl SimulationPolicy for FixedSimulation {
    fn assign(&mut self) -> SimulatedAssignment {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_values_in_range() {
        let mut sim = RandomSimulation::seeded(42);
        for _ in 0..500 {
            let a = sim.assign();
            assert!((100..=999).contains(&a.driver_number));
            assert!((10..=99).contains(&a.route_number));
            assert!((5..=15).contains(&a.position_in_route));
            assert!((0.85..=0.98).contains(&a.optimization_score));
            assert!((100..=999).contains(&a.custody_driver_number));
            assert!((800..=1500).contains(&a.route_optimization_time_ms));
            assert!((10..=25).contains(&a.api_response_time_ms));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = RandomSimulation::seeded(7);
        let mut b = RandomSimulation::seeded(7);
        assert_eq!(a.assign(), b.assign());
        assert_eq!(a.assign(), b.assign());
    }

    #[test]
    fn test_all_priorities_reachable() {
        let mut sim = RandomSimulation::seeded(1);
        let seen: Vec<PriorityLevel> = (0..300).map(|_| sim.assign().priority).collect();
        for level in PriorityLevel::ALL {
            assert!(seen.contains(&level), "missing {}", level.as_str());
        }
    }
}
