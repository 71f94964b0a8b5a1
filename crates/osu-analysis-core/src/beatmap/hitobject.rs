use serde::{Deserialize, Serialize};

/// Playfield width in osu!px.
pub const PLAYFIELD_WIDTH: f32 = 512.0;

/// Playfield height in osu!px.
pub const PLAYFIELD_HEIGHT: f32 = 384.0;

/// Type bitmask in the `.osu` hit object line.
pub mod type_flags {
    pub const CIRCLE: u32 = 1 << 0;
    pub const SLIDER: u32 = 1 << 1;
    pub const NEW_COMBO: u32 = 1 << 2;
    pub const SPINNER: u32 = 1 << 3;
    pub const MANIA_HOLD: u32 = 1 << 7;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Linear,
    Bezier,
    PerfectCircle,
    Catmull,
}

impl CurveKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(Self::Linear),
            'B' => Some(Self::Bezier),
            'P' => Some(Self::PerfectCircle),
            'C' => Some(Self::Catmull),
            _ => None,
        }
    }
}

/// Slider path description: curve kind plus control points, head included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderCurve {
    pub kind: CurveKind,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HitObjectKind {
    Circle,
    Slider {
        curve: SliderCurve,
        /// Number of spans; 1 means the slider is traversed once.
        spans: u32,
        pixel_length: f64,
    },
    Spinner {
        end_time: f64,
    },
    /// osu!mania hold note.
    Hold {
        end_time: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitObject {
    pub time: f64,
    pub x: f32,
    pub y: f32,
    pub new_combo: bool,
    pub kind: HitObjectKind,
}

impl HitObject {
    pub fn is_circle(&self) -> bool {
        matches!(self.kind, HitObjectKind::Circle)
    }

    pub fn is_slider(&self) -> bool {
        matches!(self.kind, HitObjectKind::Slider { .. })
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner { .. })
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.kind, HitObjectKind::Hold { .. })
    }

    /// osu!mania column for this object given the key count.
    pub fn mania_column(&self, columns: usize) -> usize {
        let col = (self.x * columns as f32 / PLAYFIELD_WIDTH).floor() as isize;
        col.clamp(0, columns as isize - 1) as usize
    }
}

/// A slider path flattened to a polyline with an arc-length table.
#[derive(Debug, Clone)]
pub struct SliderPath {
    points: Vec<(f64, f64)>,
    cumulative: Vec<f64>,
}

impl SliderPath {
    /// Segments sampled per curve section when flattening.
    const CURVE_STEPS: usize = 50;

    pub fn from_curve(curve: &SliderCurve) -> Self {
        let pts: Vec<(f64, f64)> = curve
            .points
            .iter()
            .map(|&(x, y)| (f64::from(x), f64::from(y)))
            .collect();

        let flattened = match curve.kind {
            CurveKind::Linear => pts,
            CurveKind::Bezier => flatten_bezier(&pts),
            CurveKind::PerfectCircle => flatten_perfect_circle(&pts),
            CurveKind::Catmull => flatten_catmull(&pts),
        };

        Self::from_points(flattened)
    }

    fn from_points(points: Vec<(f64, f64)>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            total += ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    /// Total arc length of the flattened path.
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Position a given distance along the path, clamped to its ends.
    pub fn position_at_length(&self, dist: f64) -> (f64, f64) {
        if self.points.is_empty() {
            return (0.0, 0.0);
        }
        if self.points.len() == 1 || dist <= 0.0 {
            return self.points[0];
        }
        let total = self.length();
        if dist >= total {
            return self.points[self.points.len() - 1];
        }

        let idx = match self
            .cumulative
            .binary_search_by(|c| c.total_cmp(&dist))
        {
            Ok(i) => i,
            Err(i) => i,
        };
        let idx = idx.clamp(1, self.points.len() - 1);

        let seg_start = self.cumulative[idx - 1];
        let seg_len = self.cumulative[idx] - seg_start;
        let t = if seg_len > 0.0 {
            (dist - seg_start) / seg_len
        } else {
            0.0
        };

        let (x0, y0) = self.points[idx - 1];
        let (x1, y1) = self.points[idx];
        (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t)
    }

    /// Position at normalized progress `t` in `[0, 1]` along the first
    /// `pixel_length` of the path, reflecting across spans for repeats.
    pub fn position_at(&self, t: f64, pixel_length: f64, spans: u32) -> (f64, f64) {
        let span_len = pixel_length.min(self.length()).max(0.0);
        let spans = spans.max(1) as f64;

        // Progress across the whole slider expands to span-local progress
        // with ping-pong reflection.
        let scaled = (t.clamp(0.0, 1.0) * spans).min(spans);
        let span_idx = scaled.floor().min(spans - 1.0);
        let mut local = scaled - span_idx;
        if span_idx as u64 % 2 == 1 {
            local = 1.0 - local;
        }

        self.position_at_length(local * span_len)
    }
}

fn flatten_bezier(pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
    // Duplicated control points split the path into independent bezier
    // segments (osu convention).
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for (i, &p) in pts.iter().enumerate() {
        if !current.is_empty() && current.last() == Some(&p) && i < pts.len() - 1 {
            segments.push(std::mem::take(&mut current));
        }
        current.push(p);
    }
    if !current.is_empty() {
        segments.push(current);
    }

    let mut out = Vec::new();
    for segment in segments {
        for step in 0..=SliderPath::CURVE_STEPS {
            let t = step as f64 / SliderPath::CURVE_STEPS as f64;
            out.push(bezier_point(&segment, t));
        }
    }
    out
}

fn bezier_point(control: &[(f64, f64)], t: f64) -> (f64, f64) {
    // De Casteljau evaluation.
    let mut work: Vec<(f64, f64)> = control.to_vec();
    let n = work.len();
    for level in 1..n {
        for i in 0..n - level {
            work[i] = (
                work[i].0 + (work[i + 1].0 - work[i].0) * t,
                work[i].1 + (work[i + 1].1 - work[i].1) * t,
            );
        }
    }
    work[0]
}

fn flatten_perfect_circle(pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if pts.len() != 3 {
        return flatten_bezier(pts);
    }
    let (a, b, c) = (pts[0], pts[1], pts[2]);

    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-9 {
        // Collinear control points degenerate to a line.
        return pts.to_vec();
    }

    let a_sq = a.0 * a.0 + a.1 * a.1;
    let b_sq = b.0 * b.0 + b.1 * b.1;
    let c_sq = c.0 * c.0 + c.1 * c.1;

    let cx = (a_sq * (b.1 - c.1) + b_sq * (c.1 - a.1) + c_sq * (a.1 - b.1)) / d;
    let cy = (a_sq * (c.0 - b.0) + b_sq * (a.0 - c.0) + c_sq * (b.0 - a.0)) / d;
    let radius = ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt();

    let theta_start = (a.1 - cy).atan2(a.0 - cx);
    let mut theta_end = (c.1 - cy).atan2(c.0 - cx);

    // Pick the arc direction that passes through the middle point.
    let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
    if cross > 0.0 {
        while theta_end < theta_start {
            theta_end += std::f64::consts::TAU;
        }
    } else {
        while theta_end > theta_start {
            theta_end -= std::f64::consts::TAU;
        }
    }

    (0..=SliderPath::CURVE_STEPS)
        .map(|step| {
            let t = step as f64 / SliderPath::CURVE_STEPS as f64;
            let theta = theta_start + (theta_end - theta_start) * t;
            (cx + radius * theta.cos(), cy + radius * theta.sin())
        })
        .collect()
}

fn flatten_catmull(pts: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if pts.len() < 2 {
        return pts.to_vec();
    }

    let mut out = Vec::new();
    for i in 0..pts.len() - 1 {
        let p0 = if i == 0 { pts[0] } else { pts[i - 1] };
        let p1 = pts[i];
        let p2 = pts[i + 1];
        let p3 = if i + 2 < pts.len() {
            pts[i + 2]
        } else {
            pts[i + 1]
        };

        for step in 0..=SliderPath::CURVE_STEPS {
            let t = step as f64 / SliderPath::CURVE_STEPS as f64;
            out.push(catmull_point(p0, p1, p2, p3, t));
        }
    }
    out
}

fn catmull_point(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let t2 = t * t;
    let t3 = t2 * t;
    let f = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b + (c - a) * t + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (3.0 * b - a - 3.0 * c + d) * t3)
    };
    (f(p0.0, p1.0, p2.0, p3.0), f(p0.1, p1.1, p2.1, p3.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_path_length() {
        let curve = SliderCurve {
            kind: CurveKind::Linear,
            points: vec![(0.0, 0.0), (100.0, 0.0)],
        };
        let path = SliderPath::from_curve(&curve);
        assert!((path.length() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_position_at_length() {
        let curve = SliderCurve {
            kind: CurveKind::Linear,
            points: vec![(0.0, 0.0), (100.0, 0.0), (100.0, 50.0)],
        };
        let path = SliderPath::from_curve(&curve);

        let (x, y) = path.position_at_length(50.0);
        assert!((x - 50.0).abs() < 1e-9);
        assert!(y.abs() < 1e-9);

        let (x, y) = path.position_at_length(125.0);
        assert!((x - 100.0).abs() < 1e-9);
        assert!((y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_clamps_to_ends() {
        let curve = SliderCurve {
            kind: CurveKind::Linear,
            points: vec![(10.0, 20.0), (110.0, 20.0)],
        };
        let path = SliderPath::from_curve(&curve);

        assert_eq!(path.position_at_length(-5.0), (10.0, 20.0));
        assert_eq!(path.position_at_length(500.0), (110.0, 20.0));
    }

    #[test]
    fn test_repeat_reflection() {
        let curve = SliderCurve {
            kind: CurveKind::Linear,
            points: vec![(0.0, 0.0), (100.0, 0.0)],
        };
        let path = SliderPath::from_curve(&curve);

        // Two spans: t=0.5 is the far end, t=1.0 is back at the head.
        let (x, _) = path.position_at(0.5, 100.0, 2);
        assert!((x - 100.0).abs() < 1e-6);
        let (x, _) = path.position_at(1.0, 100.0, 2);
        assert!(x.abs() < 1e-6);
    }

    #[test]
    fn test_bezier_endpoints() {
        let curve = SliderCurve {
            kind: CurveKind::Bezier,
            points: vec![(0.0, 0.0), (50.0, 100.0), (100.0, 0.0)],
        };
        let path = SliderPath::from_curve(&curve);

        let (x0, y0) = path.position_at_length(0.0);
        assert!((x0 - 0.0).abs() < 1e-9 && y0.abs() < 1e-9);

        let (x1, y1) = path.position_at_length(path.length());
        assert!((x1 - 100.0).abs() < 1e-9 && y1.abs() < 1e-9);
    }

    #[test]
    fn test_perfect_circle_radius() {
        // Quarter circle around (0, 0) with radius 100.
        let curve = SliderCurve {
            kind: CurveKind::PerfectCircle,
            points: vec![
                (100.0, 0.0),
                (70.71067811865476, 70.71067811865476),
                (0.0, 100.0),
            ],
        };
        let path = SliderPath::from_curve(&curve);

        // Arc length of a quarter circle at r=100 is ~157.08.
        assert!((path.length() - 157.08).abs() < 0.5);

        // Every flattened point sits on the circle.
        let (x, y) = path.position_at_length(path.length() / 2.0);
        let r = (x * x + y * y).sqrt();
        assert!((r - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_mania_column() {
        let obj = HitObject {
            time: 0.0,
            x: 64.0,
            y: 192.0,
            new_combo: false,
            kind: HitObjectKind::Circle,
        };
        assert_eq!(obj.mania_column(4), 0);

        let obj = HitObject { x: 448.0, ..obj };
        assert_eq!(obj.mania_column(4), 3);
    }
}
