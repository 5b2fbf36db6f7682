//! Network-level coordination across all registered intersections
//!
//! The coordinator owns the controller registry. On each coordination tick it
//! sums demand over the whole network and pushes a bias toward the busier axis
//! to every controller.

use anyhow::{bail, Result};
use log::{debug, info};
use std::collections::HashMap;

use super::signal::SignalController;
use super::types::{Demand, DetectorId, IntersectionId};

/// Detectors associated with one intersection's axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApproachPair {
    pub north_south: Option<DetectorId>,
    pub east_west: Option<DetectorId>,
}

/// Owner of the controller registry and the network bias
#[derive(Debug, Default)]
pub struct NetworkCoordinator {
    /// Controllers in registration order
    controllers: Vec<SignalController>,
    index: HashMap<IntersectionId, usize>,
    pairings: HashMap<IntersectionId, ApproachPair>,
    bias: f64,
    ticks: u64,
}

impl NetworkCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller to the registry.
    /// Returns false (and keeps the existing controller) for a duplicate id.
    pub fn register(&mut self, controller: SignalController) -> bool {
        if self.index.contains_key(&controller.id) {
            debug!("Intersection {} already registered", controller.id);
            return false;
        }
        self.index.insert(controller.id, self.controllers.len());
        self.controllers.push(controller);
        true
    }

    /// Associate detectors with a registered intersection's axes
    pub fn pair_detectors(
        &mut self,
        intersection: IntersectionId,
        north_south: Option<DetectorId>,
        east_west: Option<DetectorId>,
    ) -> Result<()> {
        if !self.index.contains_key(&intersection) {
            bail!("Intersection {} is not registered", intersection);
        }
        self.pairings.insert(
            intersection,
            ApproachPair {
                north_south,
                east_west,
            },
        );
        Ok(())
    }

    /// Detectors paired with `intersection`; unpaired axes are `None`
    pub fn pairing(&self, intersection: IntersectionId) -> ApproachPair {
        self.pairings
            .get(&intersection)
            .copied()
            .unwrap_or_default()
    }

    pub fn controller(&self, id: IntersectionId) -> Option<&SignalController> {
        self.index.get(&id).map(|&i| &self.controllers[i])
    }

    pub fn controller_mut(&mut self, id: IntersectionId) -> Option<&mut SignalController> {
        self.index.get(&id).map(|&i| &mut self.controllers[i])
    }

    pub fn controllers(&self) -> &[SignalController] {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut [SignalController] {
        &mut self.controllers
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Current network bias in [-1, 1]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Number of coordination ticks that did work
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sum of cached demand across the registry
    pub fn total_demand(&self) -> Demand {
        self.controllers
            .iter()
            .fold(Demand::default(), |acc, controller| {
                let demand = controller.demand();
                Demand::new(
                    acc.north_south + demand.north_south,
                    acc.east_west + demand.east_west,
                )
            })
    }

    /// Recompute the bias and broadcast it to every controller.
    /// Returns the new bias, or `None` when the registry is empty.
    pub fn tick(&mut self) -> Option<f64> {
        if self.controllers.is_empty() {
            return None;
        }

        let total = self.total_demand();
        let bias = bias_for(total);
        if bias != self.bias {
            info!(
                "Network bias {:+} -> {:+} (NS={}, EW={})",
                self.bias, bias, total.north_south, total.east_west
            );
        }
        self.bias = bias;
        self.ticks += 1;

        for controller in &mut self.controllers {
            controller.apply_coordination_bias(bias);
        }
        Some(bias)
    }
}

/// +1 favors north-south, -1 favors east-west, 0 when balanced
pub fn bias_for(total: Demand) -> f64 {
    use std::cmp::Ordering;

    match total.north_south.cmp(&total.east_west) {
        Ordering::Greater => 1.0,
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
    }
}
