//! Signal controller for a single intersection
//!
//! The controller does not sequence itself. Whoever drives it (a policy or an
//! operator) decides the next state; the controller only records it.

use log::info;

use super::types::{Axis, Demand, IntersectionId, SignalState, StateChange};

/// Signal state machine of one intersection
#[derive(Debug, Clone)]
pub struct SignalController {
    pub id: IntersectionId,
    state: SignalState,
    demand: Demand,
    /// Network-wide preference in [-1, 1]; positive favors north-south
    bias: f64,
}

impl SignalController {
    /// A new controller starts Red with no demand and neutral bias
    pub fn new(id: IntersectionId) -> Self {
        Self {
            id,
            state: SignalState::Red,
            demand: Demand::default(),
            bias: 0.0,
        }
    }

    pub fn current_state(&self) -> SignalState {
        self.state
    }

    /// Move to `new_state`. Any state may follow any other.
    /// Returns the accepted transition, or `None` if the state did not change.
    pub fn set_state(&mut self, new_state: SignalState, time: f64) -> Option<StateChange> {
        if self.state == new_state {
            return None;
        }
        info!(
            "Intersection {}: {} -> {} at t={:.1}",
            self.id, self.state, new_state, time
        );
        self.state = new_state;
        Some(StateChange {
            intersection: self.id,
            state: new_state,
            time,
        })
    }

    /// Overwrite the cached demand
    pub fn update_demand(&mut self, north_south: usize, east_west: usize) {
        self.demand = Demand::new(north_south, east_west);
    }

    pub fn demand(&self) -> Demand {
        self.demand
    }

    /// Store the coordination bias. This never changes state by itself.
    pub fn apply_coordination_bias(&mut self, bias: f64) {
        self.bias = bias.clamp(-1.0, 1.0);
    }

    pub fn coordination_bias(&self) -> f64 {
        self.bias
    }

    /// Whether traffic on `axis` may enter the intersection right now
    pub fn can_proceed(&self, axis: Axis) -> bool {
        matches!(
            (self.state, axis),
            (SignalState::Green, Axis::NorthSouth) | (SignalState::Red, Axis::EastWest)
        )
    }
}
