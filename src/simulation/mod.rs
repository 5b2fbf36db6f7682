//! Standalone signal coordination module
//!
//! This module contains the detector, controller, policy and coordination
//! logic. It runs without any rendering or physics attached; those sit on
//! the other side of `SignalListener` and the detector enter/exit calls.

mod config;
mod coordinator;
mod detector;
mod policy;
mod schedule;
mod signal;
mod telemetry;
mod traffic;
mod types;
mod world;

pub use config::SimConfig;
pub use coordinator::{bias_for, ApproachPair, NetworkCoordinator};
pub use detector::VehicleDetector;
pub use policy::{
    build_policy, AdaptivePolicy, Approaches, CoordinationPolicy, FixedTimePolicy, PolicyMode,
};
pub use schedule::PeriodicTimer;
pub use signal::SignalController;
pub use telemetry::{CsvSink, IntersectionQueues, Snapshot, TelemetryLog};
pub use traffic::{
    TrafficGenerator, DEFAULT_ARRIVAL_RATE, DEFAULT_BUS_SHARE, DEFAULT_DISCHARGE_RATE,
    DEFAULT_EMERGENCY_SHARE,
};
pub use types::{
    Axis, CategoryFilter, Demand, DetectorId, IntersectionId, SignalState, SimId, StateChange,
    VehicleCategory, VehicleId, DEFAULT_COORDINATION_INTERVAL, DEFAULT_GREEN_DURATION,
    DEFAULT_UPDATE_FREQUENCY, DEFAULT_YELLOW_DURATION,
};
pub use world::{SignalListener, SimWorld};
