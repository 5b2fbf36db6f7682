//! End-to-end tests of the control cycle, coordination tick and telemetry

use std::cell::RefCell;
use std::rc::Rc;

use signal_sim::simulation::{
    Axis, CategoryFilter, CsvSink, DetectorId, IntersectionId, PolicyMode, SignalState, SimConfig,
    SimId, SimWorld, VehicleCategory,
};

fn test_world(config: SimConfig) -> SimWorld {
    SimWorld::create_test_world(config).expect("test world should build")
}

fn intersections(world: &SimWorld) -> Vec<IntersectionId> {
    world.coordinator.controllers().iter().map(|c| c.id).collect()
}

fn detectors_of(world: &SimWorld, intersection: IntersectionId) -> (DetectorId, DetectorId) {
    let pair = world.coordinator.pairing(intersection);
    (pair.north_south.unwrap(), pair.east_west.unwrap())
}

fn add_vehicles(world: &mut SimWorld, detector: DetectorId, category: VehicleCategory, n: usize) {
    for _ in 0..n {
        let vehicle = world.next_vehicle_id();
        world.enter(detector, vehicle, category);
    }
}

#[test]
fn test_test_world_layout() {
    let world = test_world(SimConfig::default());
    assert_eq!(world.coordinator.len(), 4);
    for id in intersections(&world) {
        let (ns, ew) = detectors_of(&world, id);
        assert!(world.detector(ns).unwrap().name.starts_with("Camera_NS"));
        assert!(world.detector(ew).unwrap().name.starts_with("Camera_EW"));
        assert_eq!(world.signal_state(id), Some(SignalState::Red));
    }
}

#[test]
fn test_config_rejects_bad_periods() {
    let mut config = SimConfig::default();
    config.update_frequency = -1.0;
    assert!(SimWorld::new(config).is_err());

    let mut config = SimConfig::default();
    config.coordination_interval = 0.0;
    assert!(SimWorld::new(config).is_err());

    let mut config = SimConfig::default();
    config.fixed_green_duration = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = SimConfig::default();
    config.fixed_yellow_duration = -3.0;
    assert!(config.validate().is_err());

    let mut config = SimConfig::default();
    config.fixed_yellow_duration = 0.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_json() {
    let config =
        SimConfig::from_json_str(r#"{ "policyMode": "fixed", "fixedGreenDuration": 20 }"#)
            .unwrap();
    assert_eq!(config.policy_mode, PolicyMode::Fixed);
    assert_eq!(config.fixed_green_duration, 20.0);
    assert_eq!(config.fixed_yellow_duration, 3.0);
    assert_eq!(config.update_frequency, 1.0);
    assert_eq!(config.coordination_interval, 5.0);
    assert!(!config.bias_tie_break);

    assert!(SimConfig::from_json_str(r#"{ "updateFrequncy": 2 }"#).is_err());
    assert!(SimConfig::from_json_str(r#"{ "updateFrequency": -2 }"#).is_err());
}

#[test]
fn test_default_config_values() {
    let config = SimConfig::default();
    assert_eq!(config.update_frequency, 1.0);
    assert_eq!(config.coordination_interval, 5.0);
    assert_eq!(config.policy_mode, PolicyMode::Adaptive);
    assert_eq!(config.fixed_green_duration, 30.0);
    assert_eq!(config.fixed_yellow_duration, 3.0);
}

#[test]
fn test_adaptive_cycle_switches_busier_intersection_only() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);
    let (ns, _) = detectors_of(&world, ids[0]);
    add_vehicles(&mut world, ns, VehicleCategory::Car, 3);

    world.tick(1.0);

    assert_eq!(world.signal_state(ids[0]), Some(SignalState::Green));
    for id in &ids[1..] {
        assert_eq!(world.signal_state(*id), Some(SignalState::Red));
    }
    assert_eq!(world.state_changes().len(), 1);

    // Nothing changed, so no further transitions
    world.tick(1.0);
    assert_eq!(world.state_changes().len(), 1);
    assert!(world.can_proceed(ids[0], Axis::NorthSouth));
    assert!(!world.can_proceed(ids[0], Axis::EastWest));
}

#[test]
fn test_listener_sees_each_transition_once() {
    let seen: Rc<RefCell<Vec<(IntersectionId, SignalState)>>> = Rc::default();
    let mut world = test_world(SimConfig::default());
    let sink = Rc::clone(&seen);
    world.set_listener(move |id: IntersectionId, state: SignalState| {
        sink.borrow_mut().push((id, state))
    });

    let ids = intersections(&world);
    let (ns, ew) = detectors_of(&world, ids[1]);
    add_vehicles(&mut world, ns, VehicleCategory::Car, 2);
    world.tick(1.0);

    add_vehicles(&mut world, ew, VehicleCategory::Bus, 5);
    world.tick(1.0);
    world.tick(1.0);

    assert_eq!(
        *seen.borrow(),
        vec![(ids[1], SignalState::Green), (ids[1], SignalState::Red)]
    );
}

#[test]
fn test_emergency_preempts_demand() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);
    let (ns, ew) = detectors_of(&world, ids[2]);
    add_vehicles(&mut world, ns, VehicleCategory::Car, 6);
    world.tick(1.0);
    assert_eq!(world.signal_state(ids[2]), Some(SignalState::Green));

    add_vehicles(&mut world, ew, VehicleCategory::Emergency, 1);
    world.tick(1.0);
    assert_eq!(world.signal_state(ids[2]), Some(SignalState::Red));

    add_vehicles(&mut world, ns, VehicleCategory::Emergency, 1);
    world.tick(1.0);
    assert_eq!(world.signal_state(ids[2]), Some(SignalState::Green));
}

#[test]
fn test_missing_detector_reads_as_zero() {
    let mut world = SimWorld::new(SimConfig::default()).unwrap();
    let paired = world.add_intersection();
    let unpaired = world.add_intersection();
    let ns = world.add_detector("Camera_NS");
    world.pair_detectors(paired, Some(ns), None).unwrap();

    add_vehicles(&mut world, ns, VehicleCategory::Car, 1);
    world.tick(1.0);

    assert_eq!(world.signal_state(paired), Some(SignalState::Green));
    assert_eq!(world.signal_state(unpaired), Some(SignalState::Red));
    let demand = world.coordinator.controller(unpaired).unwrap().demand();
    assert_eq!(demand.total(), 0);
}

#[test]
fn test_unknown_detector_is_ignored() {
    let mut world = SimWorld::new(SimConfig::default()).unwrap();
    let vehicle = world.next_vehicle_id();
    let missing = DetectorId(SimId(999));

    assert!(!world.enter(missing, vehicle, VehicleCategory::Car));
    assert!(!world.exit(missing, vehicle));
    assert_eq!(world.count(missing, CategoryFilter::All), 0);
}

#[test]
fn test_fixed_time_through_world() {
    let config = SimConfig {
        policy_mode: PolicyMode::Fixed,
        ..SimConfig::default()
    };
    let mut world = test_world(config);
    let ids = intersections(&world);

    for _ in 0..66 {
        world.tick(1.0);
    }

    let first: Vec<(f64, SignalState)> = world
        .state_changes()
        .iter()
        .filter(|c| c.intersection == ids[0])
        .map(|c| (c.time, c.state))
        .collect();
    assert_eq!(
        first,
        vec![
            (1.0, SignalState::Green),
            (30.0, SignalState::Yellow),
            (33.0, SignalState::Red),
            (63.0, SignalState::Yellow),
            (66.0, SignalState::Green),
        ]
    );

    // Every controller follows the same phase
    assert_eq!(world.state_changes().len(), 5 * ids.len());
    let states: Vec<_> = ids.iter().map(|id| world.signal_state(*id)).collect();
    assert!(states.iter().all(|s| *s == Some(SignalState::Green)));
}

#[test]
fn test_coordination_tick_pushes_bias() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);
    let (ns0, _) = detectors_of(&world, ids[0]);
    let (ns1, ew1) = detectors_of(&world, ids[1]);
    add_vehicles(&mut world, ns0, VehicleCategory::Car, 6);
    add_vehicles(&mut world, ns1, VehicleCategory::Car, 4);
    add_vehicles(&mut world, ew1, VehicleCategory::Car, 4);

    for _ in 0..4 {
        world.tick(1.0);
    }
    assert_eq!(world.coordination_ticks(), 0);
    assert_eq!(world.coordinator.bias(), 0.0);

    world.tick(1.0);
    assert_eq!(world.coordination_ticks(), 1);
    assert_eq!(world.coordinator.bias(), 1.0);
    for controller in world.coordinator.controllers() {
        assert_eq!(controller.coordination_bias(), 1.0);
    }
}

#[test]
fn test_advisory_bias_leaves_ties_alone() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);
    let (ns0, _) = detectors_of(&world, ids[0]);
    add_vehicles(&mut world, ns0, VehicleCategory::Car, 3);

    for _ in 0..10 {
        world.tick(1.0);
    }

    assert_eq!(world.coordinator.bias(), 1.0);
    // Tied intersections stay Red even though the network favors NS
    for id in &ids[1..] {
        assert_eq!(world.signal_state(*id), Some(SignalState::Red));
    }
}

#[test]
fn test_bias_tie_break_moves_tied_intersections() {
    let config = SimConfig {
        bias_tie_break: true,
        ..SimConfig::default()
    };
    let mut world = test_world(config);
    let ids = intersections(&world);
    let (ns0, _) = detectors_of(&world, ids[0]);
    add_vehicles(&mut world, ns0, VehicleCategory::Car, 3);

    for _ in 0..5 {
        world.tick(1.0);
    }
    // Bias arrives on the tick at t=5, after that instant's control cycle
    assert_eq!(world.signal_state(ids[1]), Some(SignalState::Red));

    world.tick(1.0);
    for id in &ids {
        assert_eq!(world.signal_state(*id), Some(SignalState::Green));
    }
}

#[test]
fn test_late_ticks_are_deferred_not_dropped() {
    let mut world = test_world(SimConfig::default());

    world.tick(10.0);

    assert_eq!(world.control_cycles(), 10);
    assert_eq!(world.coordination_ticks(), 2);
    let stamps: Vec<f64> = world
        .telemetry
        .records()
        .iter()
        .map(|s| s.timestamp)
        .collect();
    assert_eq!(stamps, (1..=10).map(|t| t as f64).collect::<Vec<_>>());
}

#[test]
fn test_control_cycle_runs_before_coordination_at_same_instant() {
    let config = SimConfig {
        update_frequency: 5.0,
        coordination_interval: 5.0,
        ..SimConfig::default()
    };
    let mut world = test_world(config);
    let ids = intersections(&world);
    let (_, ew) = detectors_of(&world, ids[3]);
    add_vehicles(&mut world, ew, VehicleCategory::Car, 2);

    world.tick(5.0);

    // The tick saw demand refreshed by the cycle at the same instant
    assert_eq!(world.coordinator.bias(), -1.0);
}

#[test]
fn test_snapshot_counts() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);
    let (ns, ew) = detectors_of(&world, ids[0]);
    add_vehicles(&mut world, ns, VehicleCategory::Car, 2);
    add_vehicles(&mut world, ns, VehicleCategory::Emergency, 1);
    add_vehicles(&mut world, ew, VehicleCategory::Bus, 1);

    world.tick(1.0);

    let snapshot = world.telemetry.latest().unwrap();
    assert_eq!(snapshot.timestamp, 1.0);
    assert_eq!(snapshot.total_vehicles, 4);
    assert_eq!(snapshot.car_count, 2);
    assert_eq!(snapshot.bus_count, 1);
    assert_eq!(snapshot.emergency_count, 1);
    assert_eq!(snapshot.per_intersection.len(), 4);
    let first = snapshot.per_intersection[0];
    assert_eq!(first.id, ids[0]);
    assert_eq!((first.ns_queue, first.ew_queue), (3, 1));
}

#[test]
fn test_external_override_is_reported() {
    let mut world = test_world(SimConfig::default());
    let ids = intersections(&world);

    let change = world.set_state(ids[0], SignalState::Yellow).unwrap();
    assert_eq!(change.state, SignalState::Yellow);
    assert!(world.set_state(ids[0], SignalState::Yellow).is_none());
    assert_eq!(world.drain_state_changes().len(), 1);
    assert!(world.state_changes().is_empty());
}

#[test]
fn test_telemetry_csv_rows() {
    let path = std::env::temp_dir().join(format!(
        "signal_sim_telemetry_{}.csv",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let mut world = test_world(SimConfig::default());
    world.set_telemetry_csv(CsvSink::open(&path).unwrap());
    let ids = intersections(&world);
    let (ns, _) = detectors_of(&world, ids[0]);
    add_vehicles(&mut world, ns, VehicleCategory::Car, 2);

    world.tick(3.0);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "timestamp,total_vehicles,emergency_vehicles,buses,cars,intersection_data"
    );
    assert!(lines[1].contains(&format!("{}:2/0", ids[0])));

    // Reopening appends without a second header
    let mut sink = CsvSink::open(&path).unwrap();
    sink.write(world.telemetry.latest().unwrap()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 5);
    assert_eq!(contents.matches("timestamp").count(), 1);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_invalid_delta_does_not_advance_time() {
    let mut world = test_world(SimConfig::default());
    world.tick(2.0);

    world.tick(f64::INFINITY);
    world.tick(f64::NAN);
    world.tick(-1.0);

    assert_eq!(world.time, 2.0);
    assert_eq!(world.control_cycles(), 2);

    world.tick(1.0);
    assert_eq!(world.control_cycles(), 3);
}

#[test]
fn test_fractional_deltas_fire_on_time() {
    let mut world = test_world(SimConfig::default());

    for _ in 0..10 {
        world.tick(0.1);
    }
    assert_eq!(world.control_cycles(), 1);
    assert_eq!(world.telemetry.latest().unwrap().timestamp, 1.0);

    for _ in 0..40 {
        world.tick(0.1);
    }
    assert_eq!(world.control_cycles(), 5);
    assert_eq!(world.coordination_ticks(), 1);
}
