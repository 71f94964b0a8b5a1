use serde::{Deserialize, Serialize};

/// One row of the `[TimingPoints]` section.
///
/// Uninherited points carry the beat length in milliseconds. Inherited
/// points store a negative value that encodes the slider velocity
/// multiplier as `-100 / value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    pub time: f64,
    pub beat_length: f64,
    pub meter: u32,
    pub uninherited: bool,
}

impl TimingPoint {
    /// Slider velocity multiplier carried by an inherited point.
    pub fn sv_multiplier(&self) -> f64 {
        if self.uninherited || self.beat_length >= 0.0 {
            1.0
        } else {
            -100.0 / self.beat_length
        }
    }
}

/// Timing state active at a given map time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveTiming {
    pub beat_length: f64,
    pub sv_multiplier: f64,
}

impl Default for ActiveTiming {
    fn default() -> Self {
        Self {
            beat_length: 500.0,
            sv_multiplier: 1.0,
        }
    }
}

/// Resolve the beat length and slider velocity in effect at `time`.
///
/// Points are walked in order; each uninherited point resets the
/// velocity multiplier, inherited points after it override it.
pub fn timing_at(points: &[TimingPoint], time: f64) -> ActiveTiming {
    let mut active = ActiveTiming::default();
    let mut seen_uninherited = false;

    for point in points {
        // The first uninherited point also governs objects before it.
        if point.time > time && (seen_uninherited || !point.uninherited) {
            break;
        }
        if point.uninherited {
            active.beat_length = point.beat_length;
            active.sv_multiplier = 1.0;
            seen_uninherited = true;
            if point.time > time {
                break;
            }
        } else {
            active.sv_multiplier = point.sv_multiplier();
        }
    }

    active
}
