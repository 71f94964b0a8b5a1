//! Mass score statistics: many players' score tables for the same map,
//! regrouped per note.

use tracing::warn;

use super::score_data::StdScoreData;
use crate::standard::replay_data::KeyAction;

/// Per-note tap offsets across many plays of the same map.
///
/// Each entry is one note: its map time and the timing error every
/// player produced for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerNoteOffsets {
    pub notes: Vec<NoteOffsets>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteOffsets {
    pub time: f64,
    pub offsets: Vec<f64>,
}

impl PerNoteOffsets {
    /// Transpose per-player score tables into per-note offset groups.
    ///
    /// Press events are keyed by their map time; players that produced
    /// no event for a note simply contribute nothing to it.
    pub fn from_scores(scores: &[StdScoreData]) -> Self {
        let mut notes: Vec<NoteOffsets> = Vec::new();

        for score in scores {
            for event in &score.events {
                if event.action != KeyAction::Press || !event.map_time.is_finite() {
                    continue;
                }
                match notes.binary_search_by(|n| n.time.total_cmp(&event.map_time)) {
                    Ok(i) => notes[i].offsets.push(event.tap_offset()),
                    Err(i) => notes.insert(
                        i,
                        NoteOffsets {
                            time: event.map_time,
                            offsets: vec![event.tap_offset()],
                        },
                    ),
                }
            }
        }

        if notes.iter().any(|n| n.offsets.len() != scores.len()) {
            warn!("not every play produced an event for every note");
        }

        Self { notes }
    }

    /// Fraction of players that tapped the given note within `offset`.
    pub fn percent_below_offset(&self, note_idx: usize, offset: f64) -> f64 {
        let Some(note) = self.notes.get(note_idx) else {
            return 0.0;
        };
        if note.offsets.is_empty() {
            return 0.0;
        }
        let below = note.offsets.iter().filter(|o| o.abs() < offset).count();
        below as f64 / note.offsets.len() as f64
    }

    /// Fraction of players within `offset` for every note.
    pub fn percent_players_taps_all(&self, offset: f64) -> (Vec<f64>, Vec<f64>) {
        let times = self.notes.iter().map(|n| n.time).collect();
        let percents = (0..self.notes.len())
            .map(|i| self.percent_below_offset(i, offset))
            .collect();
        (times, percents)
    }

    /// Smallest whole-millisecond offset that `target_percent` of
    /// players hit better than, for one note.
    pub fn solve_for_hit_offset(&self, note_idx: usize, target_percent: f64) -> f64 {
        let target = target_percent.clamp(0.0, 1.0);
        let worst = self
            .notes
            .get(note_idx)
            .map(|n| n.offsets.iter().fold(0.0f64, |m, o| m.max(o.abs())))
            .unwrap_or(0.0);

        let mut offset = 0.0;
        while self.percent_below_offset(note_idx, offset) < target && offset <= worst + 1.0 {
            offset += 1.0;
        }
        offset
    }

    /// Offset 50% of players hit better than, for every note.
    pub fn solve_for_hit_offset_all(&self) -> (Vec<f64>, Vec<f64>) {
        let times = self.notes.iter().map(|n| n.time).collect();
        let offsets = (0..self.notes.len())
            .map(|i| self.solve_for_hit_offset(i, 0.5))
            .collect();
        (times, offsets)
    }
}
