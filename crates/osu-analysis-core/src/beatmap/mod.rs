//! `.osu` beatmap parsing.
//!
//! [`Beatmap::from_path`] reads the text format into metadata, difficulty
//! settings, timing points and hit objects. Timing-derived quantities
//! such as slider durations are resolved through methods on [`Beatmap`]
//! so hit objects stay plain data.

mod hitobject;
mod parser;
mod timing;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub use hitobject::{
    type_flags, CurveKind, HitObject, HitObjectKind, SliderCurve, SliderPath, PLAYFIELD_HEIGHT,
    PLAYFIELD_WIDTH,
};
pub use timing::{timing_at, ActiveTiming, TimingPoint};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[repr(u8)]
pub enum GameMode {
    #[strum(serialize = "osu")]
    Osu = 0,
    #[strum(serialize = "taiko")]
    Taiko = 1,
    #[strum(serialize = "catch")]
    Catch = 2,
    #[strum(serialize = "mania")]
    Mania = 3,
}

impl GameMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Osu),
            1 => Some(Self::Taiko),
            2 => Some(Self::Catch),
            3 => Some(Self::Mania),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub version: String,
    pub beatmap_id: Option<i64>,
    pub beatmap_set_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    pub hp: f32,
    pub cs: f32,
    pub od: f32,
    pub ar: f32,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            hp: 5.0,
            cs: 5.0,
            od: 5.0,
            ar: 5.0,
            slider_multiplier: 1.4,
            slider_tick_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    pub format_version: i32,
    pub mode: GameMode,
    pub metadata: Metadata,
    pub difficulty: DifficultySettings,
    pub timing_points: Vec<TimingPoint>,
    pub hit_objects: Vec<HitObject>,
}

impl Beatmap {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading beatmap");
        Self::from_str(&text)
    }

    pub fn from_str(text: &str) -> Result<Self> {
        parser::parse_beatmap(text)
    }

    /// Display name in the standard `Artist - Title (Creator) [Version]`
    /// form.
    pub fn name(&self) -> String {
        format!(
            "{} - {} ({}) [{}]",
            self.metadata.artist, self.metadata.title, self.metadata.creator, self.metadata.version
        )
    }

    pub fn is_mania(&self) -> bool {
        self.mode == GameMode::Mania
    }

    /// osu!mania key count, encoded in the circle size setting.
    pub fn column_count(&self) -> usize {
        (self.difficulty.cs.round() as usize).max(1)
    }

    /// Timing state in effect at a map time.
    pub fn timing_at(&self, time: f64) -> ActiveTiming {
        timing_at(&self.timing_points, time)
    }

    /// Duration in milliseconds of one slider span starting at `time`.
    pub fn slider_span_duration(&self, pixel_length: f64, time: f64) -> f64 {
        let active = self.timing_at(time);
        let velocity = 100.0 * self.difficulty.slider_multiplier * active.sv_multiplier;
        pixel_length / velocity * active.beat_length
    }

    /// Time at which an object ends. Circles end when they start.
    pub fn end_time(&self, obj: &HitObject) -> f64 {
        match &obj.kind {
            HitObjectKind::Circle => obj.time,
            HitObjectKind::Slider {
                spans,
                pixel_length,
                ..
            } => {
                let span = self.slider_span_duration(*pixel_length, obj.time);
                obj.time + span * f64::from(*spans)
            }
            HitObjectKind::Spinner { end_time } | HitObjectKind::Hold { end_time } => *end_time,
        }
    }

    /// Interval in milliseconds between slider ticks at a map time.
    pub fn tick_interval(&self, time: f64) -> f64 {
        self.timing_at(time).beat_length / self.difficulty.slider_tick_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_slider() -> Beatmap {
        let text = "osu file format v14\n\
[General]\n\
Mode: 0\n\
[Difficulty]\n\
SliderMultiplier:1.0\n\
SliderTickRate:2\n\
[TimingPoints]\n\
0,500,4,2,0,60,1,0\n\
2000,-50,4,2,0,60,0,0\n\
[HitObjects]\n\
0,0,1000,2,0,L|100:0,1,100\n\
0,0,2500,2,0,L|100:0,2,100\n";
        Beatmap::from_str(text).unwrap()
    }

    #[test]
    fn test_slider_duration_base_velocity() {
        let map = map_with_slider();
        // 100px at 100px/beat and 500ms/beat is one beat long.
        let obj = &map.hit_objects[0];
        assert!((map.end_time(obj) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_slider_duration_with_sv_and_repeats() {
        let map = map_with_slider();
        // SV doubled, so a span is 250ms; two spans.
        let obj = &map.hit_objects[1];
        assert!((map.end_time(obj) - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_interval() {
        let map = map_with_slider();
        assert!((map.tick_interval(1000.0) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_game_mode_from_u8() {
        assert_eq!(GameMode::from_u8(0), Some(GameMode::Osu));
        assert_eq!(GameMode::from_u8(3), Some(GameMode::Mania));
        assert_eq!(GameMode::from_u8(4), None);
    }

    #[test]
    fn test_name_format() {
        let mut map = map_with_slider();
        map.metadata = Metadata {
            title: "Song".into(),
            artist: "Artist".into(),
            creator: "mapper".into(),
            version: "Hard".into(),
            beatmap_id: None,
            beatmap_set_id: None,
        };
        assert_eq!(map.name(), "Artist - Song (mapper) [Hard]");
    }
}
