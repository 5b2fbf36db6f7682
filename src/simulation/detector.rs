//! Vehicle detection zones ("cameras")
//!
//! A detector tracks which vehicles are currently inside its zone. Entering
//! and exiting are idempotent, so the same trigger firing twice is harmless.

use std::collections::HashMap;

use super::types::{CategoryFilter, DetectorId, VehicleCategory, VehicleId};

/// A detection zone covering one approach of an intersection
#[derive(Debug, Clone)]
pub struct VehicleDetector {
    pub id: DetectorId,
    /// Human readable name, e.g. "Camera_NS_0"
    pub name: String,
    /// Vehicles currently inside the zone
    present: HashMap<VehicleId, VehicleCategory>,
    /// Per-category counts, kept in step with `present`
    by_category: [usize; 3],
}

impl VehicleDetector {
    pub fn new(id: DetectorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            present: HashMap::new(),
            by_category: [0; 3],
        }
    }

    /// Record a vehicle entering the zone.
    /// Returns false if the vehicle was already present.
    pub fn on_enter(&mut self, vehicle: VehicleId, category: VehicleCategory) -> bool {
        if self.present.contains_key(&vehicle) {
            return false;
        }
        self.present.insert(vehicle, category);
        self.by_category[category.slot()] += 1;
        true
    }

    /// Record a vehicle leaving the zone.
    /// Returns false if the vehicle was not present.
    pub fn on_exit(&mut self, vehicle: VehicleId) -> bool {
        match self.present.remove(&vehicle) {
            Some(category) => {
                self.by_category[category.slot()] -= 1;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, filter: impl Into<CategoryFilter>) -> usize {
        match filter.into() {
            CategoryFilter::All => self.present.len(),
            CategoryFilter::Only(category) => self.by_category[category.slot()],
        }
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.present.contains_key(&vehicle)
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }
}
