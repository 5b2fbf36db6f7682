//! Core types for the signal simulation
//!
//! These are plain value types shared by detectors, controllers and policies.

use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub SimId);

/// A wrapper type for detector (camera) IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectorId(pub SimId);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub SimId);

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0 .0)
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0 .0)
    }
}

/// Category of a detected vehicle. Exactly one per vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleCategory {
    Car,
    Bus,
    /// Ambulances, fire trucks and the like
    Emergency,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 3] = [
        VehicleCategory::Car,
        VehicleCategory::Bus,
        VehicleCategory::Emergency,
    ];

    /// Slot used by per-category counters
    pub(crate) fn slot(self) -> usize {
        match self {
            VehicleCategory::Car => 0,
            VehicleCategory::Bus => 1,
            VehicleCategory::Emergency => 2,
        }
    }
}

/// Filter used when asking a detector for a count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(VehicleCategory),
}

impl From<VehicleCategory> for CategoryFilter {
    fn from(category: VehicleCategory) -> Self {
        CategoryFilter::Only(category)
    }
}

/// Intersection-wide signal state, expressed from the north-south approach.
///
/// Green means north-south has right-of-way, Red means north-south is
/// stopped and east-west has right-of-way. Yellow stops both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalState {
    #[default]
    Red,
    Yellow,
    Green,
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalState::Red => "Red",
            SignalState::Yellow => "Yellow",
            SignalState::Green => "Green",
        };
        f.write_str(name)
    }
}

/// One axis of traffic through an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

/// Vehicles currently detected on each axis of one intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Demand {
    pub north_south: usize,
    pub east_west: usize,
}

impl Demand {
    pub fn new(north_south: usize, east_west: usize) -> Self {
        Self {
            north_south,
            east_west,
        }
    }

    pub fn total(&self) -> usize {
        self.north_south + self.east_west
    }
}

/// An accepted signal transition, as seen by the rendering side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub intersection: IntersectionId,
    pub state: SignalState,
    /// Simulation time at which the transition was accepted
    pub time: f64,
}

/// Control-cycle period in simulation time units
pub const DEFAULT_UPDATE_FREQUENCY: f64 = 1.0;

/// Coordination-tick period in simulation time units
pub const DEFAULT_COORDINATION_INTERVAL: f64 = 5.0;

/// Fixed-time green duration per axis
pub const DEFAULT_GREEN_DURATION: f64 = 30.0;

/// Fixed-time yellow duration after each green
pub const DEFAULT_YELLOW_DURATION: f64 = 3.0;
