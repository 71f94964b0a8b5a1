//! Finite-difference kinematics over sampled paths, plus the small
//! statistics helpers shared by the metrics and score modules.

/// Distances between consecutive 2D points.
pub fn dists(x: &[f64], y: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| ((xs[1] - xs[0]).powi(2) + (ys[1] - ys[0]).powi(2)).sqrt())
        .collect()
}

/// 1D velocity from positions and times.
pub fn vel_1d(x: &[f64], t: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(t.windows(2))
        .map(|(xs, ts)| (xs[1] - xs[0]) / (ts[1] - ts[0]))
        .collect()
}

/// 2D speed from positions and times.
pub fn vel_2d(x: &[f64], y: &[f64], t: &[f64]) -> Vec<f64> {
    dists(x, y)
        .iter()
        .zip(t.windows(2))
        .map(|(d, ts)| d / (ts[1] - ts[0]))
        .collect()
}

/// 1D acceleration from positions and times.
pub fn accel_1d(x: &[f64], t: &[f64]) -> Vec<f64> {
    let vel = vel_1d(x, t);
    vel.windows(2)
        .zip(t.windows(2).skip(1))
        .map(|(vs, ts)| (vs[1] - vs[0]) / (ts[1] - ts[0]))
        .collect()
}

/// 2D acceleration from positions and times.
pub fn accel_2d(x: &[f64], y: &[f64], t: &[f64]) -> Vec<f64> {
    let vel = vel_2d(x, y, t);
    vel.windows(2)
        .zip(t.windows(2).skip(1))
        .map(|(vs, ts)| (vs[1] - vs[0]) / (ts[1] - ts[0]))
        .collect()
}

/// Signed turn angle at each interior point of a path.
///
/// Stationary segments (stacked points) inherit the previous segment's
/// direction so stacks read as zero angle change.
pub fn angles(x: &[f64], y: &[f64]) -> Vec<f64> {
    if x.len() < 3 {
        return Vec::new();
    }

    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();

    let mut theta: Vec<f64> = dx
        .iter()
        .zip(dy.iter())
        .map(|(&dx, &dy)| dy.atan2(dx))
        .collect();
    for i in 1..theta.len() {
        if dx[i] == 0.0 && dy[i] == 0.0 {
            theta[i] = theta[i - 1];
        }
    }

    theta
        .windows(2)
        .map(|w| {
            let diff = w[0] - w[1];
            diff.sin().atan2(diff.cos())
        })
        .collect()
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values.iter().copied());
    mean(values.iter().map(|v| (v - m).powi(2)))
}

/// Population standard deviation.
pub fn stdev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn prob_not(x: f64) -> f64 {
    1.0 - x
}

pub fn prob_and(x: f64, y: f64) -> f64 {
    x * y
}

pub fn prob_or(x: f64, y: f64) -> f64 {
    x + y - x * y
}

/// Odds of the event occurring at least once across repeated trials.
pub fn prob_trials(initial_prob: f64, trials: usize) -> f64 {
    let mut current = initial_prob;
    for _ in 0..trials {
        current = prob_or(current, initial_prob);
    }
    current
}
