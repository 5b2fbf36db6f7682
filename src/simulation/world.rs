//! Main simulation world that ties everything together
//!
//! The world owns the detectors, the network coordinator and the active
//! policy. Simulation time only moves through `tick`, which fires the control
//! cycle and the coordination tick whenever they fall due.

use anyhow::{Context, Result};
use log::{error, warn};
use std::collections::HashMap;

use super::config::SimConfig;
use super::coordinator::NetworkCoordinator;
use super::detector::VehicleDetector;
use super::policy::{build_policy, Approaches, CoordinationPolicy};
use super::schedule::PeriodicTimer;
use super::signal::SignalController;
use super::telemetry::{CsvSink, IntersectionQueues, Snapshot, TelemetryLog};
use super::types::{
    Axis, CategoryFilter, DetectorId, IntersectionId, SignalState, SimId, StateChange,
    VehicleCategory, VehicleId,
};

/// Receives every accepted signal transition (lamp rendering, etc.)
pub trait SignalListener {
    fn on_state_changed(&mut self, intersection: IntersectionId, state: SignalState);
}

impl<F> SignalListener for F
where
    F: FnMut(IntersectionId, SignalState),
{
    fn on_state_changed(&mut self, intersection: IntersectionId, state: SignalState) {
        self(intersection, state)
    }
}

/// The main simulation world
pub struct SimWorld {
    pub config: SimConfig,

    /// Controller registry and network bias
    pub coordinator: NetworkCoordinator,

    /// All detectors
    detectors: HashMap<DetectorId, VehicleDetector>,

    policy: Box<dyn CoordinationPolicy>,

    control_timer: PeriodicTimer,
    coordination_timer: PeriodicTimer,

    /// Snapshot history, one per control cycle
    pub telemetry: TelemetryLog,

    /// Accepted transitions since the last drain, oldest first
    state_changes: Vec<StateChange>,

    listener: Option<Box<dyn SignalListener>>,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time
    pub time: f64,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new_internal(SimConfig::default())
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig) -> Self {
        Self {
            policy: build_policy(&config),
            control_timer: PeriodicTimer::new(config.update_frequency),
            coordination_timer: PeriodicTimer::new(config.coordination_interval),
            config,
            coordinator: NetworkCoordinator::new(),
            detectors: HashMap::new(),
            telemetry: TelemetryLog::new(),
            state_changes: Vec::new(),
            listener: None,
            next_id: 0,
            time: 0.0,
        }
    }

    /// Create an empty world. Fails if `config` is malformed.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate().context("Invalid simulation config")?;
        Ok(Self::new_internal(config))
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Allocate a fresh vehicle id
    pub fn next_vehicle_id(&mut self) -> VehicleId {
        VehicleId(self.next_sim_id())
    }

    /// Add an intersection and register its controller
    pub fn add_intersection(&mut self) -> IntersectionId {
        let id = IntersectionId(self.next_sim_id());
        self.coordinator.register(SignalController::new(id));
        id
    }

    /// Add a detector zone
    pub fn add_detector(&mut self, name: impl Into<String>) -> DetectorId {
        let id = DetectorId(self.next_sim_id());
        self.detectors.insert(id, VehicleDetector::new(id, name));
        id
    }

    /// Associate detectors with an intersection's axes
    pub fn pair_detectors(
        &mut self,
        intersection: IntersectionId,
        north_south: Option<DetectorId>,
        east_west: Option<DetectorId>,
    ) -> Result<()> {
        for detector in north_south.iter().chain(east_west.iter()) {
            if !self.detectors.contains_key(detector) {
                warn!(
                    "Detector {} paired with {} does not exist; it will read as empty",
                    detector, intersection
                );
            }
        }
        self.coordinator
            .pair_detectors(intersection, north_south, east_west)
    }

    /// Attach the rendering collaborator
    pub fn set_listener(&mut self, listener: impl SignalListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Mirror telemetry snapshots to a CSV file
    pub fn set_telemetry_csv(&mut self, sink: CsvSink) {
        self.telemetry.set_sink(sink);
    }

    pub fn detector(&self, id: DetectorId) -> Option<&VehicleDetector> {
        self.detectors.get(&id)
    }

    /// A vehicle entered a detector zone. Unknown detectors are ignored.
    pub fn enter(
        &mut self,
        detector: DetectorId,
        vehicle: VehicleId,
        category: VehicleCategory,
    ) -> bool {
        match self.detectors.get_mut(&detector) {
            Some(d) => d.on_enter(vehicle, category),
            None => {
                warn!("Vehicle {:?} entered unknown detector {}", vehicle.0, detector);
                false
            }
        }
    }

    /// A vehicle left a detector zone. Unknown detectors are ignored.
    pub fn exit(&mut self, detector: DetectorId, vehicle: VehicleId) -> bool {
        match self.detectors.get_mut(&detector) {
            Some(d) => d.on_exit(vehicle),
            None => false,
        }
    }

    /// Vehicles in a detector zone; zero for unknown detectors
    pub fn count(&self, detector: DetectorId, filter: impl Into<CategoryFilter>) -> usize {
        self.detectors
            .get(&detector)
            .map_or(0, |d| d.count(filter))
    }

    pub fn signal_state(&self, intersection: IntersectionId) -> Option<SignalState> {
        self.coordinator
            .controller(intersection)
            .map(|c| c.current_state())
    }

    /// Whether traffic on `axis` may enter `intersection`.
    /// Intersections without a controller never stop traffic.
    pub fn can_proceed(&self, intersection: IntersectionId, axis: Axis) -> bool {
        self.coordinator
            .controller(intersection)
            .map_or(true, |c| c.can_proceed(axis))
    }

    /// Apply an explicit external transition (operator override)
    pub fn set_state(
        &mut self,
        intersection: IntersectionId,
        state: SignalState,
    ) -> Option<StateChange> {
        let time = self.time;
        let change = self
            .coordinator
            .controller_mut(intersection)?
            .set_state(state, time)?;
        self.dispatch(change);
        Some(change)
    }

    /// Accepted transitions not yet drained
    pub fn state_changes(&self) -> &[StateChange] {
        &self.state_changes
    }

    /// Take the accepted transitions recorded since the last drain
    pub fn drain_state_changes(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.state_changes)
    }

    /// Completed control cycles
    pub fn control_cycles(&self) -> u64 {
        self.control_timer.fired()
    }

    /// Completed coordination ticks
    pub fn coordination_ticks(&self) -> u64 {
        self.coordination_timer.fired()
    }

    /// Advance simulation time and run every callback that fell due.
    ///
    /// Due callbacks run in scheduled order; when both are due at the same
    /// instant the control cycle runs first.
    pub fn tick(&mut self, delta: f64) {
        if !delta.is_finite() || delta < 0.0 {
            warn!("Ignoring tick with invalid delta {}", delta);
            return;
        }
        self.time += delta;

        loop {
            let control_due = self
                .control_timer
                .is_due(self.time)
                .then(|| self.control_timer.next_due());
            let coordination_due = self
                .coordination_timer
                .is_due(self.time)
                .then(|| self.coordination_timer.next_due());

            match (control_due, coordination_due) {
                (Some(control), Some(coordination)) if control <= coordination => {
                    self.fire_control_cycle()
                }
                (_, Some(_)) => self.fire_coordination_tick(),
                (Some(_), None) => self.fire_control_cycle(),
                (None, None) => break,
            }
        }
    }

    fn fire_control_cycle(&mut self) {
        if let Some(scheduled) = self.control_timer.fire_if_due(self.time) {
            self.run_control_cycle(scheduled);
        }
    }

    fn fire_coordination_tick(&mut self) {
        if self.coordination_timer.fire_if_due(self.time).is_some() {
            self.coordinator.tick();
        }
    }

    /// Refresh demand, apply the policy to every controller and record a
    /// telemetry snapshot
    pub fn run_control_cycle(&mut self, now: f64) {
        let mut changes = Vec::new();

        for i in 0..self.coordinator.len() {
            let id = self.coordinator.controllers()[i].id;
            let pair = self.coordinator.pairing(id);
            let approaches = Approaches {
                north_south: pair.north_south.and_then(|d| self.detectors.get(&d)),
                east_west: pair.east_west.and_then(|d| self.detectors.get(&d)),
            };
            let demand = approaches.demand();

            let controller = &mut self.coordinator.controllers_mut()[i];
            controller.update_demand(demand.north_south, demand.east_west);

            if let Some(target) = self.policy.decide(now, controller, &approaches) {
                if let Some(change) = controller.set_state(target, now) {
                    changes.push(change);
                }
            }
        }

        for change in changes {
            self.dispatch(change);
        }

        let snapshot = self.snapshot(now);
        if let Err(e) = self.telemetry.record(snapshot) {
            error!("Failed to record telemetry: {:#}", e);
        }
    }

    fn dispatch(&mut self, change: StateChange) {
        if let Some(listener) = &mut self.listener {
            listener.on_state_changed(change.intersection, change.state);
        }
        self.state_changes.push(change);
    }

    /// Network-wide counts at time `now`
    pub fn snapshot(&self, now: f64) -> Snapshot {
        let mut snapshot = Snapshot {
            timestamp: now,
            total_vehicles: 0,
            emergency_count: 0,
            bus_count: 0,
            car_count: 0,
            per_intersection: Vec::with_capacity(self.coordinator.len()),
        };

        for detector in self.detectors.values() {
            snapshot.total_vehicles += detector.count(CategoryFilter::All);
            snapshot.emergency_count += detector.count(VehicleCategory::Emergency);
            snapshot.bus_count += detector.count(VehicleCategory::Bus);
            snapshot.car_count += detector.count(VehicleCategory::Car);
        }

        for controller in self.coordinator.controllers() {
            let demand = controller.demand();
            snapshot.per_intersection.push(IntersectionQueues {
                id: controller.id,
                ns_queue: demand.north_south,
                ew_queue: demand.east_west,
            });
        }

        snapshot
    }

    /// Create a 2x2 grid of signalled intersections, each watched by one
    /// north-south and one east-west camera
    pub fn create_test_world(config: SimConfig) -> Result<Self> {
        let mut world = Self::new(config)?;

        for n in 0..4 {
            let intersection = world.add_intersection();
            let ns = world.add_detector(format!("Camera_NS_{}", n));
            let ew = world.add_detector(format!("Camera_EW_{}", n));
            world.pair_detectors(intersection, Some(ns), Some(ew))?;
        }

        Ok(world)
    }

    /// Print a summary of the current simulation state
    pub fn print_summary(&self) {
        println!("=== Signal Simulation Summary ===");
        println!("Time: {:.2}", self.time);
        println!("Policy: {:?}", self.policy.mode());
        println!(
            "Intersections: {}, Detectors: {}",
            self.coordinator.len(),
            self.detectors.len()
        );
        println!(
            "Control cycles: {}, Coordination ticks: {}",
            self.control_cycles(),
            self.coordination_ticks()
        );
        println!("Network bias: {:+}", self.coordinator.bias());
        println!();

        println!("--- Intersections ---");
        for controller in self.coordinator.controllers() {
            let demand = controller.demand();
            println!(
                "  {}: {:<6} NS={} EW={} bias={:+}",
                controller.id,
                controller.current_state().to_string(),
                demand.north_south,
                demand.east_west,
                controller.coordination_bias()
            );
        }

        if let Some(latest) = self.telemetry.latest() {
            println!("--- Detected Vehicles ---");
            println!(
                "  total={} cars={} buses={} emergency={}",
                latest.total_vehicles, latest.car_count, latest.bus_count, latest.emergency_count
            );
        }
    }
}
