//! Periodic triggers driven by simulation time

/// Slack for time accumulated from fractional deltas
const TIME_EPSILON: f64 = 1e-9;

/// A re-armed periodic trigger.
///
/// The first firing is one period after the start. When simulation time jumps
/// past several due points, each missed firing is still delivered, one per
/// `fire_if_due` call, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTimer {
    period: f64,
    next_due: f64,
    fired: u64,
}

impl PeriodicTimer {
    pub fn new(period: f64) -> Self {
        Self {
            period,
            next_due: period,
            fired: 0,
        }
    }

    /// Time at which the next firing is due
    pub fn next_due(&self) -> f64 {
        self.next_due
    }

    /// Number of times the timer has fired
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.next_due <= now + TIME_EPSILON
    }

    /// Fire once if due, re-arming for the following period.
    /// Returns the scheduled time of the firing.
    pub fn fire_if_due(&mut self, now: f64) -> Option<f64> {
        if !self.is_due(now) {
            return None;
        }
        let scheduled = self.next_due;
        self.fired += 1;
        // Always an exact multiple of the period
        self.next_due = self.period * (self.fired + 1) as f64;
        Some(scheduled)
    }
}
