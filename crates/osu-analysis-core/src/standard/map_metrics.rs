//! Pattern metrics derived from standard map data. Every function
//! returns a `(times, values)` pair with the two sides aligned.

use crate::kinematics;

use super::map_data::StdMapData;

/// Timing difference between consecutive note starts.
pub fn tapping_intervals(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let t = map_data.start_times();
    let dt: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    (t[1.min(t.len())..].to_vec(), dt)
}

/// Notes per second based on the immediate interval between notes.
pub fn notes_per_sec(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let (times, intervals) = tapping_intervals(map_data);
    let nps = intervals.iter().map(|dt| 1000.0 / dt).collect();
    (times, nps)
}

/// Distance between consecutive aimpoints.
pub fn path_dist(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (t[1.min(t.len())..].to_vec(), kinematics::dists(&x, &y))
}

/// Velocity between consecutive aimpoints.
pub fn path_vel(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (
        t[1.min(t.len())..].to_vec(),
        kinematics::vel_2d(&x, &y, &t),
    )
}

/// Acceleration between consecutive aimpoints.
pub fn path_accel(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (
        t[2.min(t.len())..].to_vec(),
        kinematics::accel_2d(&x, &y, &t),
    )
}

/// Per-axis distance between consecutive aimpoints.
pub fn xy_dist(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    let dx = x.windows(2).map(|w| w[1] - w[0]).collect();
    let dy = y.windows(2).map(|w| w[1] - w[0]).collect();
    (t[1.min(t.len())..].to_vec(), dx, dy)
}

/// Per-axis velocity between consecutive aimpoints.
pub fn xy_vel(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (
        t[1.min(t.len())..].to_vec(),
        kinematics::vel_1d(&x, &t),
        kinematics::vel_1d(&y, &t),
    )
}

/// Per-axis acceleration between consecutive aimpoints.
pub fn xy_accel(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (
        t[2.min(t.len())..].to_vec(),
        kinematics::accel_1d(&x, &t),
        kinematics::accel_1d(&y, &t),
    )
}

/// Turn angle at each interior aimpoint.
pub fn angles(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    let t = map_data.all_times();
    let (x, y) = split_positions(map_data);
    (
        t[2.min(t.len())..].to_vec(),
        kinematics::angles(&x, &y),
    )
}

fn split_positions(map_data: &StdMapData) -> (Vec<f64>, Vec<f64>) {
    map_data.all_positions().into_iter().unzip()
}
