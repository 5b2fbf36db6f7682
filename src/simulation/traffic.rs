//! Synthetic traffic feeding the detectors
//!
//! Stands in for moving vehicles: arrivals join an approach's detector zone,
//! and the head of the queue leaves only while the signal lets that axis
//! proceed. No physics, just a queue per approach.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};

use super::types::{Axis, DetectorId, IntersectionId, VehicleCategory, VehicleId};
use super::world::SimWorld;

/// Arrival rate per approach, in vehicles per time unit
pub const DEFAULT_ARRIVAL_RATE: f64 = 0.3;

/// Departure rate from an approach that may proceed
pub const DEFAULT_DISCHARGE_RATE: f64 = 0.5;

pub const DEFAULT_BUS_SHARE: f64 = 0.1;
pub const DEFAULT_EMERGENCY_SHARE: f64 = 0.02;

/// Generates vehicles entering and leaving detector zones
pub struct TrafficGenerator {
    pub arrival_rate: f64,
    pub discharge_rate: f64,
    pub bus_share: f64,
    pub emergency_share: f64,
    /// Optional seeded RNG for reproducible runs
    rng: Option<StdRng>,
    /// Vehicles waiting in each detector zone, oldest first
    queues: HashMap<DetectorId, VecDeque<VehicleId>>,
    pub spawned: usize,
    pub departed: usize,
}

impl Default for TrafficGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficGenerator {
    fn new_internal(rng: Option<StdRng>) -> Self {
        Self {
            arrival_rate: DEFAULT_ARRIVAL_RATE,
            discharge_rate: DEFAULT_DISCHARGE_RATE,
            bus_share: DEFAULT_BUS_SHARE,
            emergency_share: DEFAULT_EMERGENCY_SHARE,
            rng,
            queues: HashMap::new(),
            spawned: 0,
            departed: 0,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a generator with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    /// Get a random value in [0, 1), using seeded RNG if available
    fn roll(&mut self) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random_range(0.0..1.0),
            None => rand::rng().random_range(0.0..1.0),
        }
    }

    fn pick_category(&mut self) -> VehicleCategory {
        let roll = self.roll();
        if roll < self.emergency_share {
            VehicleCategory::Emergency
        } else if roll < self.emergency_share + self.bus_share {
            VehicleCategory::Bus
        } else {
            VehicleCategory::Car
        }
    }

    /// Vehicles currently queued at `detector`
    pub fn queued(&self, detector: DetectorId) -> usize {
        self.queues.get(&detector).map_or(0, |q| q.len())
    }

    /// Advance traffic by `delta` time units
    pub fn step(&mut self, world: &mut SimWorld, delta: f64) {
        let arrival_chance = (self.arrival_rate * delta).clamp(0.0, 1.0);
        let discharge_chance = (self.discharge_rate * delta).clamp(0.0, 1.0);

        let approaches: Vec<(IntersectionId, Axis, DetectorId)> = world
            .coordinator
            .controllers()
            .iter()
            .flat_map(|controller| {
                let pair = world.coordinator.pairing(controller.id);
                [
                    pair.north_south.map(|d| (controller.id, Axis::NorthSouth, d)),
                    pair.east_west.map(|d| (controller.id, Axis::EastWest, d)),
                ]
            })
            .flatten()
            .collect();

        for (intersection, axis, detector) in approaches {
            if world.can_proceed(intersection, axis) && self.roll() < discharge_chance {
                if let Some(vehicle) = self.queues.get_mut(&detector).and_then(|q| q.pop_front())
                {
                    world.exit(detector, vehicle);
                    self.departed += 1;
                }
            }

            if self.roll() < arrival_chance {
                let vehicle = world.next_vehicle_id();
                let category = self.pick_category();
                if world.enter(detector, vehicle, category) {
                    debug!("{:?} {:?} entered {}", category, vehicle.0, detector);
                    self.queues.entry(detector).or_default().push_back(vehicle);
                    self.spawned += 1;
                }
            }
        }
    }
}
