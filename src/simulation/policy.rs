//! Signal policies applied once per control cycle
//!
//! A policy looks at one controller and the detectors watching its
//! approaches and returns the state the controller should adopt, or `None`
//! to leave it alone. Policies never touch controllers directly; the world
//! applies their decisions so every accepted transition is reported once.

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use super::config::SimConfig;
use super::detector::VehicleDetector;
use super::signal::SignalController;
use super::types::{Axis, CategoryFilter, Demand, SignalState, VehicleCategory};

/// Which policy drives the control cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Fixed-time cycling, independent of demand
    Fixed,
    /// Demand and emergency driven
    #[default]
    Adaptive,
}

/// The detectors watching an intersection's two axes.
/// A missing detector reads as zero vehicles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Approaches<'a> {
    pub north_south: Option<&'a VehicleDetector>,
    pub east_west: Option<&'a VehicleDetector>,
}

impl<'a> Approaches<'a> {
    pub fn detector(&self, axis: Axis) -> Option<&'a VehicleDetector> {
        match axis {
            Axis::NorthSouth => self.north_south,
            Axis::EastWest => self.east_west,
        }
    }

    pub fn count(&self, axis: Axis, filter: CategoryFilter) -> usize {
        self.detector(axis).map_or(0, |d| d.count(filter))
    }

    /// Current demand snapshot, all categories counted
    pub fn demand(&self) -> Demand {
        Demand::new(
            self.count(Axis::NorthSouth, CategoryFilter::All),
            self.count(Axis::EastWest, CategoryFilter::All),
        )
    }

    pub fn has_emergency(&self, axis: Axis) -> bool {
        self.count(axis, VehicleCategory::Emergency.into()) > 0
    }
}

/// Strategy deciding what state a controller should adopt this cycle
pub trait CoordinationPolicy {
    fn mode(&self) -> PolicyMode;

    /// Decide the target state for `controller` at simulation time `now`.
    /// `None` means no transition is issued.
    fn decide(
        &self,
        now: f64,
        controller: &SignalController,
        approaches: &Approaches<'_>,
    ) -> Option<SignalState>;
}

/// Fixed-time cycle: NS green, yellow, NS red (EW green), yellow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimePolicy {
    pub green_duration: f64,
    pub yellow_duration: f64,
}

impl FixedTimePolicy {
    pub fn new(green_duration: f64, yellow_duration: f64) -> Self {
        Self {
            green_duration,
            yellow_duration,
        }
    }

    /// Length of one full cycle
    pub fn period(&self) -> f64 {
        2.0 * (self.green_duration + self.yellow_duration)
    }

    /// The phase-derived state at `elapsed` time units into the simulation
    pub fn state_at(&self, elapsed: f64) -> SignalState {
        let t = elapsed.rem_euclid(self.period());
        let green = self.green_duration;
        let yellow = self.yellow_duration;

        if t < green {
            SignalState::Green
        } else if t < green + yellow {
            SignalState::Yellow
        } else if t < 2.0 * green + yellow {
            SignalState::Red
        } else {
            SignalState::Yellow
        }
    }
}

impl CoordinationPolicy for FixedTimePolicy {
    fn mode(&self) -> PolicyMode {
        PolicyMode::Fixed
    }

    fn decide(
        &self,
        now: f64,
        _controller: &SignalController,
        _approaches: &Approaches<'_>,
    ) -> Option<SignalState> {
        Some(self.state_at(now))
    }
}

/// Demand driven policy with emergency preemption.
///
/// Never enters Yellow on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptivePolicy {
    /// Break equal-demand ties with the controller's coordination bias
    pub bias_tie_break: bool,
}

impl AdaptivePolicy {
    pub fn new(bias_tie_break: bool) -> Self {
        Self { bias_tie_break }
    }
}

impl CoordinationPolicy for AdaptivePolicy {
    fn mode(&self) -> PolicyMode {
        PolicyMode::Adaptive
    }

    fn decide(
        &self,
        _now: f64,
        controller: &SignalController,
        approaches: &Approaches<'_>,
    ) -> Option<SignalState> {
        // NS emergency wins when both axes have one
        if approaches.has_emergency(Axis::NorthSouth) {
            debug!("Intersection {}: emergency on NS approach", controller.id);
            return Some(SignalState::Green);
        }
        if approaches.has_emergency(Axis::EastWest) {
            debug!("Intersection {}: emergency on EW approach", controller.id);
            return Some(SignalState::Red);
        }

        let demand = controller.demand();
        if demand.north_south > demand.east_west {
            Some(SignalState::Green)
        } else if demand.east_west > demand.north_south {
            Some(SignalState::Red)
        } else if self.bias_tie_break {
            let bias = controller.coordination_bias();
            if bias > 0.0 {
                Some(SignalState::Green)
            } else if bias < 0.0 {
                Some(SignalState::Red)
            } else {
                None
            }
        } else {
            None
        }
    }
}

/// Build the policy selected by `config`
pub fn build_policy(config: &SimConfig) -> Box<dyn CoordinationPolicy> {
    match config.policy_mode {
        PolicyMode::Fixed => Box::new(FixedTimePolicy::new(
            config.fixed_green_duration,
            config.fixed_yellow_duration,
        )),
        PolicyMode::Adaptive => Box::new(AdaptivePolicy::new(config.bias_tie_break)),
    }
}
