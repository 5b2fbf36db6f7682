//! Traffic Signal Coordination Library
//!
//! Simulates signal control at a network of intersections, driven by
//! vehicle counts from detection zones.

pub mod simulation;
