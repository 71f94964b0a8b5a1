use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beatmap::{Beatmap, HitObjectKind, SliderPath, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};

/// Shortest press a note can demand, in milliseconds. Circles release
/// this long after their press.
pub const MIN_PRESS_DURATION: f64 = 1.0;

/// What the player's key must be doing at an aimpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AimpointAction {
    Press = 1,
    Hold = 2,
    Release = 3,
}

/// Kind of note an aimpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NoteKind {
    Circle = 1,
    Slider = 2,
    Spinner = 3,
}

/// One row of standard map data: a point in time and space the player
/// must service with a key action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aimpoint {
    /// Index of the note this row belongs to.
    pub note: usize,
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub action: AimpointAction,
    pub kind: NoteKind,
}

/// Standard gamemode map data: the beatmap's hit objects flattened to a
/// time-ordered aimpoint table.
///
/// Circles produce a press and a release [`MIN_PRESS_DURATION`] apart.
/// Sliders produce a press at the head, holds at each tick, and a
/// release at the tail. Spinners produce a centered press and release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StdMapData {
    pub rows: Vec<Aimpoint>,
}

impl StdMapData {
    pub fn from_beatmap(beatmap: &Beatmap) -> Self {
        let mut rows = Vec::new();
        let mut note = 0;

        for obj in &beatmap.hit_objects {
            match &obj.kind {
                HitObjectKind::Circle => {
                    let (x, y) = (f64::from(obj.x), f64::from(obj.y));
                    rows.push(Aimpoint {
                        note,
                        time: obj.time,
                        x,
                        y,
                        action: AimpointAction::Press,
                        kind: NoteKind::Circle,
                    });
                    rows.push(Aimpoint {
                        note,
                        time: obj.time + MIN_PRESS_DURATION,
                        x,
                        y,
                        action: AimpointAction::Release,
                        kind: NoteKind::Circle,
                    });
                }
                HitObjectKind::Slider {
                    curve,
                    spans,
                    pixel_length,
                } => {
                    let path = SliderPath::from_curve(curve);
                    let end_time = beatmap.end_time(obj);
                    let duration = end_time - obj.time;
                    let tick_interval = beatmap.tick_interval(obj.time);

                    let mut times = vec![obj.time];
                    if tick_interval.is_finite() && tick_interval > 0.0 && duration > 0.0 {
                        let mut t = obj.time + tick_interval;
                        while t < end_time - MIN_PRESS_DURATION {
                            times.push(t);
                            t += tick_interval;
                        }
                    }
                    times.push(end_time.max(obj.time + MIN_PRESS_DURATION));

                    let last = times.len() - 1;
                    for (i, &t) in times.iter().enumerate() {
                        let progress = if duration > 0.0 {
                            (t - obj.time) / duration
                        } else {
                            0.0
                        };
                        let (x, y) = path.position_at(progress, *pixel_length, *spans);
                        let action = if i == 0 {
                            AimpointAction::Press
                        } else if i == last {
                            AimpointAction::Release
                        } else {
                            AimpointAction::Hold
                        };
                        rows.push(Aimpoint {
                            note,
                            time: t,
                            x,
                            y,
                            action,
                            kind: NoteKind::Slider,
                        });
                    }
                }
                HitObjectKind::Spinner { end_time } => {
                    let x = f64::from(PLAYFIELD_WIDTH) / 2.0;
                    let y = f64::from(PLAYFIELD_HEIGHT) / 2.0;
                    rows.push(Aimpoint {
                        note,
                        time: obj.time,
                        x,
                        y,
                        action: AimpointAction::Press,
                        kind: NoteKind::Spinner,
                    });
                    rows.push(Aimpoint {
                        note,
                        time: end_time.max(obj.time + MIN_PRESS_DURATION),
                        x,
                        y,
                        action: AimpointAction::Release,
                        kind: NoteKind::Spinner,
                    });
                }
                HitObjectKind::Hold { .. } => {
                    // Mania hold notes have no standard aimpoint form.
                    debug!(time = obj.time, "skipping hold note in standard map data");
                    continue;
                }
            }
            note += 1;
        }

        Self { rows }
    }

    pub fn num_notes(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.action == AimpointAction::Press)
            .count()
    }

    pub fn presses(&self) -> impl Iterator<Item = &Aimpoint> {
        self.rows
            .iter()
            .filter(|r| r.action == AimpointAction::Press)
    }

    pub fn releases(&self) -> impl Iterator<Item = &Aimpoint> {
        self.rows
            .iter()
            .filter(|r| r.action == AimpointAction::Release)
    }

    /// Press time of every note.
    pub fn start_times(&self) -> Vec<f64> {
        self.presses().map(|r| r.time).collect()
    }

    /// Release time of every note. Circles end where they start, give or
    /// take [`MIN_PRESS_DURATION`].
    pub fn end_times(&self) -> Vec<f64> {
        self.releases().map(|r| r.time).collect()
    }

    pub fn all_times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time).collect()
    }

    pub fn start_positions(&self) -> Vec<(f64, f64)> {
        self.presses().map(|r| (r.x, r.y)).collect()
    }

    pub fn end_positions(&self) -> Vec<(f64, f64)> {
        self.releases().map(|r| (r.x, r.y)).collect()
    }

    /// Note kind of every note, in press order.
    pub fn objects(&self) -> Vec<NoteKind> {
        self.presses().map(|r| r.kind).collect()
    }

    pub fn all_positions(&self) -> Vec<(f64, f64)> {
        self.rows.iter().map(|r| (r.x, r.y)).collect()
    }

    /// Aimpoints of notes on screen at `time`: pressed by now but not
    /// released more than `ar_ms` ago.
    pub fn visible_at(&self, time: f64, ar_ms: f64) -> Vec<&Aimpoint> {
        let visible: Vec<usize> = self
            .presses()
            .zip(self.releases())
            .filter(|(press, release)| press.time <= time && time - ar_ms < release.time)
            .map(|(press, _)| press.note)
            .collect();
        self.rows
            .iter()
            .filter(|r| visible.contains(&r.note))
            .collect()
    }

    /// Closest aimpoint strictly before `time`.
    pub fn scorepoint_before(&self, time: f64) -> Option<&Aimpoint> {
        self.rows.iter().rev().find(|r| r.time < time)
    }

    /// Closest aimpoint strictly after `time`.
    pub fn scorepoint_after(&self, time: f64) -> Option<&Aimpoint> {
        self.rows.iter().find(|r| r.time > time)
    }

    /// Closest note (press aimpoint) strictly before `time`.
    pub fn note_before(&self, time: f64) -> Option<&Aimpoint> {
        self.rows
            .iter()
            .rev()
            .find(|r| r.action == AimpointAction::Press && r.time < time)
    }

    /// Closest note (press aimpoint) strictly after `time`.
    pub fn note_after(&self, time: f64) -> Option<&Aimpoint> {
        self.rows
            .iter()
            .find(|r| r.action == AimpointAction::Press && r.time > time)
    }

    /// Aimpoints between `start_time` and `end_time`.
    pub fn time_slice(&self, start_time: f64, end_time: f64, exclusive: bool) -> Vec<&Aimpoint> {
        self.rows
            .iter()
            .filter(|r| {
                if exclusive {
                    start_time < r.time && r.time < end_time
                } else {
                    start_time <= r.time && r.time <= end_time
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::Beatmap;

    fn test_map() -> Beatmap {
        let text = "osu file format v14\n\
[General]\n\
Mode: 0\n\
[Difficulty]\n\
SliderMultiplier:1.0\n\
SliderTickRate:1\n\
[TimingPoints]\n\
0,500,4,2,0,60,1,0\n\
[HitObjects]\n\
256,192,1000,1,0\n\
0,0,2000,2,0,L|200:0,1,200\n\
256,192,4000,12,0,5000\n";
        Beatmap::from_str(text).unwrap()
    }

    #[test]
    fn test_circle_press_release_pair() {
        let data = StdMapData::from_beatmap(&test_map());
        assert_eq!(data.rows[0].action, AimpointAction::Press);
        assert_eq!(data.rows[0].time, 1000.0);
        assert_eq!(data.rows[1].action, AimpointAction::Release);
        assert_eq!(data.rows[1].time, 1001.0);
        assert_eq!(data.rows[0].kind, NoteKind::Circle);
    }

    #[test]
    fn test_slider_aimpoints() {
        let data = StdMapData::from_beatmap(&test_map());
        let slider: Vec<_> = data.rows.iter().filter(|r| r.note == 1).collect();

        // 200px at 100px/beat and 500ms/beat lasts 1000ms with a tick
        // at every 500ms.
        assert_eq!(slider[0].action, AimpointAction::Press);
        assert_eq!(slider[0].time, 2000.0);
        assert_eq!(slider[0].x, 0.0);

        assert_eq!(slider[1].action, AimpointAction::Hold);
        assert_eq!(slider[1].time, 2500.0);
        assert!((slider[1].x - 100.0).abs() < 1.0);

        let tail = slider.last().unwrap();
        assert_eq!(tail.action, AimpointAction::Release);
        assert_eq!(tail.time, 3000.0);
        assert!((tail.x - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_spinner_centered() {
        let data = StdMapData::from_beatmap(&test_map());
        let spinner: Vec<_> = data.rows.iter().filter(|r| r.note == 2).collect();
        assert_eq!(spinner.len(), 2);
        assert_eq!(spinner[0].x, 256.0);
        assert_eq!(spinner[0].y, 192.0);
        assert_eq!(spinner[1].time, 5000.0);
    }

    #[test]
    fn test_note_counts_and_times() {
        let data = StdMapData::from_beatmap(&test_map());
        assert_eq!(data.num_notes(), 3);
        assert_eq!(data.start_times(), vec![1000.0, 2000.0, 4000.0]);
        assert_eq!(data.end_times(), vec![1001.0, 3000.0, 5000.0]);
    }

    #[test]
    fn test_note_queries() {
        let data = StdMapData::from_beatmap(&test_map());

        let after = data.note_after(1000.0).unwrap();
        assert_eq!(after.time, 2000.0);

        let before = data.note_before(1500.0).unwrap();
        assert_eq!(before.time, 1000.0);

        assert!(data.note_after(4000.0).is_none());
    }

    #[test]
    fn test_time_slice() {
        let data = StdMapData::from_beatmap(&test_map());
        let slice = data.time_slice(1000.0, 2000.0, true);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].time, 1001.0);

        let slice = data.time_slice(1000.0, 2000.0, false);
        assert_eq!(slice.len(), 3);
    }
}
