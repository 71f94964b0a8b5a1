//! Cursor kinematics and key timing metrics over standard replay data.

use crate::kinematics;

use super::replay_data::{KeyAction, StdReplayData};

/// Absolute cursor speed between consecutive frames.
pub fn cursor_velocity(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>) {
    let (t, x, y) = split(replay_data);
    if t.len() < 2 {
        return (Vec::new(), Vec::new());
    }
    (t[1..].to_vec(), kinematics::vel_2d(&x, &y, &t))
}

/// Absolute cursor acceleration between consecutive frames.
pub fn cursor_acceleration(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>) {
    let (t, x, y) = split(replay_data);
    if t.len() < 3 {
        return (Vec::new(), Vec::new());
    }
    (t[2..].to_vec(), kinematics::accel_2d(&x, &y, &t))
}

/// Absolute cursor jerk between consecutive frames.
pub fn cursor_jerk(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>) {
    let (times, accel) = cursor_acceleration(replay_data);
    if times.len() < 2 {
        return (Vec::new(), Vec::new());
    }
    let jerk = accel
        .windows(2)
        .zip(times.windows(2))
        .map(|(av, tv)| (av[1] - av[0]) / (tv[1] - tv[0]))
        .collect();
    (times[1..].to_vec(), jerk)
}

/// Per-axis cursor velocity between consecutive frames.
pub fn cursor_vel_xy(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let (t, x, y) = split(replay_data);
    if t.len() < 2 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    (
        t[1..].to_vec(),
        kinematics::vel_1d(&x, &t),
        kinematics::vel_1d(&y, &t),
    )
}

/// Per-axis cursor acceleration between consecutive frames.
pub fn cursor_accel_xy(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let (t, x, y) = split(replay_data);
    if t.len() < 3 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    (
        t[2..].to_vec(),
        kinematics::accel_1d(&x, &t),
        kinematics::accel_1d(&y, &t),
    )
}

/// Per-axis cursor jerk between consecutive frames.
pub fn cursor_jerk_xy(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let (times, ax, ay) = cursor_accel_xy(replay_data);
    if times.len() < 2 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let diff_over_dt = |vals: &[f64]| {
        vals.windows(2)
            .zip(times.windows(2))
            .map(|(vv, tv)| (vv[1] - vv[0]) / (tv[1] - tv[0]))
            .collect()
    };
    (times[1..].to_vec(), diff_over_dt(&ax), diff_over_dt(&ay))
}

/// Press-to-release durations for all buttons, intermixed and ordered
/// by release time.
pub fn press_intervals(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(i64, i64)> = Vec::new();

    for button in 0..4 {
        let mut press_time: Option<i64> = None;
        for event in &replay_data.events {
            match event.keys[button] {
                KeyAction::Press => press_time = Some(event.time),
                KeyAction::Release => {
                    if let Some(start) = press_time.take() {
                        pairs.push((event.time, start));
                    }
                }
                _ => {}
            }
        }
    }
    pairs.sort_unstable();

    let times = pairs.iter().map(|&(end, _)| end as f64).collect();
    let intervals = pairs.iter().map(|&(end, start)| (end - start) as f64).collect();
    (times, intervals)
}

fn split(replay_data: &StdReplayData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut t = Vec::with_capacity(replay_data.events.len());
    let mut x = Vec::with_capacity(replay_data.events.len());
    let mut y = Vec::with_capacity(replay_data.events.len());
    for e in &replay_data.events {
        t.push(e.time as f64);
        x.push(e.x);
        y.push(e.y);
    }
    (t, x, y)
}
