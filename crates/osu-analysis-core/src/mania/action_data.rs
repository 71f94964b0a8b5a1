//! Per-column key action matrix for osu!mania maps and replays.
//!
//! Each row is one timestamp with a `KeyAction` per column. Map matrices
//! carry Press at a note's start and Release at its end, with the span in
//! between filled with Hold. Replay matrices record key state transitions
//! straight from the frame stream.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beatmap::Beatmap;
use crate::error::{Error, Result};
use crate::replay::Replay;
use crate::standard::KeyAction;

/// Press duration assumed for single notes, in ms.
const SINGLE_NOTE_DURATION: i64 = 1;

/// Largest key count the client supports (dual-stage 9K + 9K).
const MAX_KEYS: usize = 18;

/// One timestamp with the key state of every column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub time: i64,
    pub states: Vec<KeyAction>,
}

impl ActionRow {
    /// True when no column has an action at this timestamp.
    pub fn is_free(&self) -> bool {
        self.states.iter().all(|s| *s == KeyAction::Free)
    }
}

/// Column-major key action table, rows sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManiaActionData {
    pub rows: Vec<ActionRow>,
}

impl ManiaActionData {
    /// Builds the action matrix for a mania beatmap. Presses and releases
    /// come from note start/end times; holds are filled in between.
    pub fn from_beatmap(map: &Beatmap) -> Result<Self> {
        if !map.is_mania() {
            return Err(Error::NotMania);
        }
        if map.hit_objects.is_empty() {
            return Err(Error::EmptyBeatmap);
        }

        let columns = map.column_count();
        if !(1..=MAX_KEYS).contains(&columns) {
            return Err(Error::InvalidKeyCount(columns));
        }
        let mut rows: Vec<ActionRow> = Vec::new();

        for obj in &map.hit_objects {
            let col = obj.mania_column(columns);
            let start = obj.time.round() as i64;
            let end = (map.end_time(obj).round() as i64).max(start + SINGLE_NOTE_DURATION);

            set_state(&mut rows, columns, start, col, KeyAction::Press)?;
            set_state(&mut rows, columns, end, col, KeyAction::Release)?;
        }

        let mut data = ManiaActionData { rows };
        data.fill_holds()?;

        debug!(
            columns,
            rows = data.rows.len(),
            "built mania action data from beatmap"
        );
        Ok(data)
    }

    /// Builds the action matrix from a mania replay's frame stream. The
    /// column count is not stored in the replay; it comes from the
    /// beatmap's key count.
    pub fn from_replay(replay: &Replay, columns: usize) -> Result<Self> {
        if !replay.is_mania() {
            return Err(Error::NotMania);
        }
        if !(1..=MAX_KEYS).contains(&columns) {
            return Err(Error::InvalidKeyCount(columns));
        }

        let mut rows: Vec<ActionRow> = Vec::new();
        let mut hold_state = vec![false; columns];

        for frame in &replay.frames {
            // Mania frames carry the column bitmask in the x field.
            let keys = crate::replay::Keys(frame.x as u32);
            let is_key_hold: Vec<bool> = (0..columns).map(|col| keys.column(col)).collect();
            if is_key_hold == hold_state {
                continue;
            }

            let states = hold_state
                .iter()
                .zip(&is_key_hold)
                .map(|(was, now)| match (was, now) {
                    (false, true) => KeyAction::Press,
                    (true, true) => KeyAction::Hold,
                    (true, false) => KeyAction::Release,
                    (false, false) => KeyAction::Free,
                })
                .collect();

            rows.push(ActionRow {
                time: frame.time,
                states,
            });
            hold_state = is_key_hold;
        }

        rows.sort_by_key(|r| r.time);
        Ok(ManiaActionData { rows })
    }

    /// Number of columns in the matrix.
    pub fn num_keys(&self) -> usize {
        self.rows.first().map_or(0, |r| r.states.len())
    }

    /// Press timestamps in one column.
    pub fn press_times(&self, col: usize) -> Vec<i64> {
        self.times_of(col, KeyAction::Press)
    }

    /// Release timestamps in one column.
    pub fn release_times(&self, col: usize) -> Vec<i64> {
        self.times_of(col, KeyAction::Release)
    }

    fn times_of(&self, col: usize, action: KeyAction) -> Vec<i64> {
        self.rows
            .iter()
            .filter(|r| r.states.get(col) == Some(&action))
            .map(|r| r.time)
            .collect()
    }

    /// Drops rows where every column is free.
    pub fn filter_free(&self) -> Self {
        ManiaActionData {
            rows: self.rows.iter().filter(|r| !r.is_free()).cloned().collect(),
        }
    }

    /// Fills Hold between each Press and its Release, column by column.
    /// Errors if a column presses twice without releasing, or releases
    /// without a preceding press.
    pub fn fill_holds(&mut self) -> Result<()> {
        let columns = self.num_keys();

        for col in 0..columns {
            let mut holding = false;

            for row_idx in 0..self.rows.len() {
                let state = self.rows[row_idx].states[col];

                if holding {
                    match state {
                        KeyAction::Press => {
                            return Err(Error::InvalidActionSequence {
                                column: col,
                                row: row_idx,
                                message: "two consecutive hold starts".into(),
                            });
                        }
                        KeyAction::Release => holding = false,
                        KeyAction::Free => self.rows[row_idx].states[col] = KeyAction::Hold,
                        KeyAction::Hold => {}
                    }
                } else {
                    match state {
                        KeyAction::Press => holding = true,
                        KeyAction::Release => {
                            return Err(Error::InvalidActionSequence {
                                column: col,
                                row: row_idx,
                                message: "hold ended before it started".into(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Splits the matrix into left and right hand halves. `left_handed`
    /// gives the odd middle column to the left hand.
    pub fn split_by_hand(&self, left_handed: bool) -> (Self, Self) {
        let keys = self.num_keys();
        let left_half = if left_handed {
            keys.div_ceil(2)
        } else {
            keys / 2
        };

        let split = |range: std::ops::Range<usize>| ManiaActionData {
            rows: self
                .rows
                .iter()
                .map(|r| ActionRow {
                    time: r.time,
                    states: r.states[range.clone()].to_vec(),
                })
                .collect(),
        };

        (split(0..left_half), split(left_half..keys))
    }

    /// Counts cells matching any of `actions` across the whole matrix.
    pub fn count_actions(&self, actions: &[KeyAction]) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.states.iter())
            .filter(|s| actions.contains(s))
            .count()
    }

    /// Rows with `ms_start <= time <= ms_end`.
    pub fn actions_between(&self, ms_start: i64, ms_end: i64) -> &[ActionRow] {
        let lo = self.rows.partition_point(|r| r.time < ms_start);
        let hi = self.rows.partition_point(|r| r.time <= ms_end);
        &self.rows[lo..hi]
    }
}

/// Writes `action` for `col` into the row at `time`, inserting the row if
/// the timestamp is new.
fn set_state(
    rows: &mut Vec<ActionRow>,
    columns: usize,
    time: i64,
    col: usize,
    action: KeyAction,
) -> Result<()> {
    let idx = match rows.binary_search_by_key(&time, |r| r.time) {
        Ok(idx) => idx,
        Err(idx) => {
            rows.insert(
                idx,
                ActionRow {
                    time,
                    states: vec![KeyAction::Free; columns],
                },
            );
            idx
        }
    };

    if rows[idx].states[col] != KeyAction::Free {
        return Err(Error::InvalidActionSequence {
            column: col,
            row: idx,
            message: "overlapping notes at the same time".into(),
        });
    }

    rows[idx].states[col] = action;
    Ok(())
}
