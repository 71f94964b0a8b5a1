use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kinematics;

use super::map_data::{Aimpoint, AimpointAction, NoteKind, StdMapData};
use super::replay_data::{KeyAction, StdReplayData};

/// Scoring parameters.
///
/// Window invariants: `0 < hit range < hit miss range` on both sides.
/// Hits process inside the hit range, misses between the hit range and
/// the miss range, and nothing outside the miss range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSettings {
    /// Early press miss window boundary (ms).
    pub neg_hit_miss_range: f64,
    /// Early press hit window boundary (ms).
    pub neg_hit_range: f64,
    /// Late press hit window boundary (ms).
    pub pos_hit_range: f64,
    /// Late press miss window boundary (ms).
    pub pos_hit_miss_range: f64,

    pub neg_rel_miss_range: f64,
    pub neg_rel_range: f64,
    pub pos_rel_range: f64,
    pub pos_rel_miss_range: f64,

    pub neg_hld_range: f64,
    /// Late hold window (ms). Must not exceed `pos_rel_miss_range`.
    pub pos_hld_range: f64,

    /// Radius the cursor must be within for a tap to count.
    pub hitobject_radius: f64,
    /// Radius the cursor must be within for a release to count.
    pub release_radius: f64,
    /// Radius the cursor must be within for a hold to count.
    pub follow_radius: f64,

    /// How far back in time a note becomes visible (ms).
    pub ar_ms: f64,

    /// Record presses in empty space as empty hits.
    pub blank_miss: bool,
    /// Allow re-pressing a slider after letting go of it.
    pub recoverable_release: bool,
    /// Allow the cursor to wander off a slider and come back.
    pub recoverable_missaim: bool,
    /// Process the release miss window at all.
    pub release_miss: bool,
    /// Missing a slider aimpoint misses the rest of the slider.
    pub miss_slider: bool,
    /// Process the press miss window at all.
    pub press_miss: bool,

    /// Presses while holding another key do not register.
    pub press_block: bool,
    /// Releases while holding another key do not register.
    pub release_block: bool,

    pub require_tap_press: bool,
    pub require_tap_release: bool,
    pub require_tap_hold: bool,
    pub require_aim_press: bool,
    pub require_aim_release: bool,
    pub require_aim_hold: bool,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        Self {
            neg_hit_miss_range: 200.0,
            neg_hit_range: 100.0,
            pos_hit_range: 100.0,
            pos_hit_miss_range: 200.0,

            neg_rel_miss_range: 1000.0,
            neg_rel_range: 500.0,
            pos_rel_range: 500.0,
            pos_rel_miss_range: 1000.0,

            neg_hld_range: 0.0,
            pos_hld_range: 1000.0,

            hitobject_radius: 36.5,
            release_radius: 100.0,
            follow_radius: 100.0,

            ar_ms: 450.0,

            blank_miss: false,
            recoverable_release: true,
            recoverable_missaim: true,
            release_miss: true,
            miss_slider: true,
            press_miss: true,

            press_block: false,
            release_block: false,

            require_tap_press: true,
            require_tap_release: true,
            require_tap_hold: true,
            require_aim_press: true,
            require_aim_release: true,
            require_aim_hold: true,
        }
    }
}

impl ScoreSettings {
    /// Relax-like scoring: taps are not required anywhere.
    pub fn relax() -> Self {
        Self {
            require_tap_press: false,
            require_tap_release: false,
            require_tap_hold: false,
            blank_miss: false,
            ..Self::default()
        }
    }

    /// Autopilot-like scoring: aim is not required anywhere.
    pub fn autopilot() -> Self {
        Self {
            require_aim_press: false,
            require_aim_release: false,
            require_aim_hold: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = |hit: f64, miss: f64| 0.0 < hit && hit < miss && miss.is_finite();
        if !ordered(self.neg_hit_range, self.neg_hit_miss_range)
            || !ordered(self.pos_hit_range, self.pos_hit_miss_range)
        {
            return Err(Error::InvalidSettings(
                "press hit range must sit inside the miss range".to_string(),
            ));
        }
        if !ordered(self.neg_rel_range, self.neg_rel_miss_range)
            || !ordered(self.pos_rel_range, self.pos_rel_miss_range)
        {
            return Err(Error::InvalidSettings(
                "release hit range must sit inside the miss range".to_string(),
            ));
        }
        if self.pos_hld_range > self.pos_rel_miss_range {
            return Err(Error::InvalidSettings(
                "hold range must not exceed the late release miss range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome classification of one scored event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[repr(u8)]
pub enum HitType {
    /// A press hit with a note and offset associated with it.
    HitPress = 0,
    /// A release hit with a note and offset associated with it.
    HitRelease = 1,
    /// A hold on a slider aimpoint.
    AimHold = 2,
    /// A miss with a note but no offset associated with it.
    Miss = 3,
    /// A press into empty space, with neither note nor offset.
    Empty = 4,
}

impl HitType {
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::HitPress => "HITP",
            Self::HitRelease => "HITR",
            Self::AimHold => "AIMH",
            Self::Miss => "MISS",
            Self::Empty => "EMPTY",
        }
    }
}

/// One scored event: a replay action matched against a map aimpoint.
///
/// Map fields are NaN for [`HitType::Empty`] events, and replay
/// positions are NaN when the player never tapped near the note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub replay_time: f64,
    pub map_time: f64,
    pub replay_x: f64,
    pub replay_y: f64,
    pub map_x: f64,
    pub map_y: f64,
    pub hit_type: HitType,
    pub action: KeyAction,
}

impl ScoreEvent {
    pub fn tap_offset(&self) -> f64 {
        self.replay_time - self.map_time
    }

    pub fn pos_offset(&self) -> (f64, f64) {
        (self.replay_x - self.map_x, self.replay_y - self.map_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Nop,
    NextAimpoint,
    NextNote,
}

/// Score data for a standard play: every replay action matched against
/// the map's aimpoints and classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StdScoreData {
    pub events: Vec<ScoreEvent>,
}

impl StdScoreData {
    pub fn compute(
        replay_data: &StdReplayData,
        map_data: &StdMapData,
        settings: &ScoreSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let rows = filter_single_note_releases(&map_data.rows);
        if rows.is_empty() {
            return Err(Error::EmptyBeatmap);
        }

        let reduced = replay_data.reduce(settings.press_block, settings.release_block);
        debug!(
            aimpoints = rows.len(),
            replay_events = reduced.len(),
            "scoring play"
        );

        let map_time_max = rows.last().map(|r| r.time).unwrap_or(0.0);
        let mut map_time = rows[0].time;

        let mut events = Vec::new();
        let mut last_tap_pos = (f64::NAN, f64::NAN);

        let earliest_window = settings
            .neg_hit_miss_range
            .max(settings.neg_rel_miss_range)
            .max(settings.neg_hld_range);

        for event in &reduced {
            let replay_time = event.time as f64;
            let (replay_x, replay_y) = (event.x, event.y);

            // Map processing catches up through any scorepoints the
            // replay skipped over.
            loop {
                if map_time > map_time_max {
                    break;
                }
                if replay_time < map_time - earliest_window {
                    break;
                }

                let current: Vec<&Aimpoint> = rows.iter().filter(|r| r.time == map_time).collect();
                if current.is_empty() {
                    break;
                }

                let adv = process_free(
                    settings,
                    &mut events,
                    &current,
                    replay_time,
                    replay_x,
                    replay_y,
                    last_tap_pos,
                );
                if adv == Advance::Nop {
                    break;
                }
                last_tap_pos = (f64::NAN, f64::NAN);
                map_time = advance(&rows, map_time, adv);
            }

            // Scorepoints visible to the player: everything from the
            // first unprocessed one up to ar_ms ahead of now.
            let end_time = replay_time + settings.ar_ms;
            let visible: Vec<&Aimpoint> = rows
                .iter()
                .filter(|r| map_time <= r.time && r.time <= end_time)
                .collect();
            if visible.is_empty() {
                continue;
            }

            let adv = match event.action {
                KeyAction::Free => process_free(
                    settings,
                    &mut events,
                    &visible,
                    replay_time,
                    replay_x,
                    replay_y,
                    last_tap_pos,
                ),
                KeyAction::Press => process_press(
                    settings,
                    &mut events,
                    &visible,
                    replay_time,
                    replay_x,
                    replay_y,
                    &mut last_tap_pos,
                ),
                KeyAction::Hold => process_hold(
                    settings,
                    &mut events,
                    &visible,
                    replay_time,
                    replay_x,
                    replay_y,
                ),
                KeyAction::Release => process_release(
                    settings,
                    &mut events,
                    &visible,
                    replay_time,
                    replay_x,
                    replay_y,
                ),
            };

            if adv != Advance::Nop {
                last_tap_pos = (f64::NAN, f64::NAN);
            }
            map_time = advance(&rows, map_time, adv);
        }

        Ok(Self { events })
    }

    pub fn hits_of(&self, hit_type: HitType) -> impl Iterator<Item = &ScoreEvent> {
        self.events.iter().filter(move |e| e.hit_type == hit_type)
    }

    pub fn num_hits(&self, hit_type: HitType) -> usize {
        self.hits_of(hit_type).count()
    }

    /// Timing errors of hit presses.
    pub fn tap_press_offsets(&self) -> Vec<f64> {
        self.hits_of(HitType::HitPress)
            .map(ScoreEvent::tap_offset)
            .collect()
    }

    /// Timing errors of hit releases.
    pub fn tap_release_offsets(&self) -> Vec<f64> {
        self.hits_of(HitType::HitRelease)
            .map(ScoreEvent::tap_offset)
            .collect()
    }

    pub fn aim_x_offsets(&self) -> Vec<f64> {
        self.hits_of(HitType::HitPress)
            .map(|e| e.replay_x - e.map_x)
            .collect()
    }

    pub fn aim_y_offsets(&self) -> Vec<f64> {
        self.hits_of(HitType::HitPress)
            .map(|e| e.replay_y - e.map_y)
            .collect()
    }

    /// Cursor distances from aimpoints for everything except releases.
    pub fn aim_offsets(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter(|e| e.hit_type != HitType::HitRelease)
            .map(|e| {
                let (dx, dy) = e.pos_offset();
                (dx * dx + dy * dy).sqrt()
            })
            .collect()
    }

    pub fn tap_offset_mean(&self) -> f64 {
        kinematics::mean(self.tap_press_offsets())
    }

    pub fn tap_offset_var(&self) -> f64 {
        kinematics::variance(&self.tap_press_offsets())
    }

    pub fn tap_offset_stdev(&self) -> f64 {
        kinematics::stdev(&self.tap_press_offsets())
    }

    pub fn cursor_pos_offset_mean(&self) -> f64 {
        kinematics::mean(self.aim_offsets())
    }

    pub fn cursor_pos_offset_var(&self) -> f64 {
        kinematics::variance(&self.aim_offsets())
    }

    pub fn cursor_pos_offset_stdev(&self) -> f64 {
        kinematics::stdev(&self.aim_offsets())
    }

    /// Odds a random hit's timing error lands within `offset` ms, under
    /// a gaussian fit of this play's tap offsets.
    pub fn odds_some_tap_within(&self, offset: f64) -> f64 {
        let offsets = self.tap_press_offsets();
        gaussian_window_prob(
            kinematics::mean(offsets.iter().copied()),
            kinematics::stdev(&offsets),
            offset,
        )
    }

    /// Odds a random hit's cursor error lands within the square spanning
    /// `-offset..offset` on both axes, treating the axes as independent
    /// gaussians.
    pub fn odds_some_cursor_within(&self, offset: f64) -> f64 {
        let xs = self.aim_x_offsets();
        let ys = self.aim_y_offsets();

        let px = gaussian_window_prob(
            kinematics::mean(xs.iter().copied()),
            kinematics::stdev(&xs),
            offset,
        );
        let py = gaussian_window_prob(
            kinematics::mean(ys.iter().copied()),
            kinematics::stdev(&ys),
            offset,
        );
        px * py
    }

    /// Odds every hit of the play lands within `offset` ms.
    pub fn odds_all_tap_within(&self, offset: f64) -> f64 {
        self.odds_some_tap_within(offset)
            .powi(self.num_hits(HitType::HitPress) as i32)
    }

    /// Odds every cursor position of the play lands within `offset`.
    pub fn odds_all_cursor_within(&self, offset: f64) -> f64 {
        self.odds_some_cursor_within(offset)
            .powi(self.num_hits(HitType::HitPress) as i32)
    }

    /// Odds of consistently tapping and aiming within the given bounds
    /// for the entire play.
    pub fn odds_all_conditions_within(&self, tap_offset: f64, cursor_offset: f64) -> f64 {
        self.odds_all_tap_within(tap_offset) * self.odds_all_cursor_within(cursor_offset)
    }
}

/// Probability a gaussian sample lands in `-offset..=offset`.
fn gaussian_window_prob(mean: f64, stdev: f64, offset: f64) -> f64 {
    if stdev == 0.0 {
        return if -offset <= mean && mean <= offset {
            1.0
        } else {
            0.0
        };
    }
    match Normal::new(mean, stdev) {
        Ok(dist) => dist.cdf(offset) - dist.cdf(-offset),
        Err(_) => f64::NAN,
    }
}

/// Drop the release row of single-note press/release pairs so circles
/// carry no release scoring.
fn filter_single_note_releases(rows: &[Aimpoint]) -> Vec<Aimpoint> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let synthetic = i > 0 && {
            let prev = &rows[i - 1];
            prev.action == AimpointAction::Press
                && row.action == AimpointAction::Release
                && row.time - prev.time == 1.0
                && row.x == prev.x
                && row.y == prev.y
        };
        if !synthetic {
            out.push(*row);
        }
    }
    out
}

fn advance(rows: &[Aimpoint], map_time: f64, adv: Advance) -> f64 {
    let past_end = || rows.last().map(|r| r.time + 1.0).unwrap_or(map_time);
    match adv {
        Advance::Nop => map_time,
        Advance::NextAimpoint => rows
            .iter()
            .find(|r| r.time > map_time)
            .map(|r| r.time)
            .unwrap_or_else(past_end),
        Advance::NextNote => rows
            .iter()
            .find(|r| r.action == AimpointAction::Press && r.time > map_time)
            .map(|r| r.time)
            .unwrap_or_else(past_end),
    }
}

fn push(
    events: &mut Vec<ScoreEvent>,
    replay_time: f64,
    map_time: f64,
    replay_pos: (f64, f64),
    map_pos: (f64, f64),
    hit_type: HitType,
    action: KeyAction,
) {
    events.push(ScoreEvent {
        replay_time,
        map_time,
        replay_x: replay_pos.0,
        replay_y: replay_pos.1,
        map_x: map_pos.0,
        map_y: map_pos.1,
        hit_type,
        action,
    });
}

/// Handle scorepoints the player let pass without a relevant action.
fn process_free(
    s: &ScoreSettings,
    events: &mut Vec<ScoreEvent>,
    aimpoints: &[&Aimpoint],
    replay_time: f64,
    replay_x: f64,
    replay_y: f64,
    last_tap_pos: (f64, f64),
) -> Advance {
    let aim = aimpoints[0];

    // Free only looks at timings that have passed.
    if replay_time < aim.time {
        return Advance::Nop;
    }

    let time_offset = replay_time - aim.time;
    let pos_offset = ((replay_x - aim.x).powi(2) + (replay_y - aim.y).powi(2)).sqrt();
    let aim_pos = (aim.x, aim.y);

    match aim.action {
        AimpointAction::Press => {
            let is_late = time_offset > s.pos_hit_miss_range;
            let is_miss_aim = pos_offset > s.hitobject_radius;

            match (s.require_aim_press, s.require_tap_press) {
                (_, true) => {
                    if is_late {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            last_tap_pos,
                            aim_pos,
                            HitType::Miss,
                            KeyAction::Press,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
                (true, false) => {
                    if is_miss_aim {
                        if is_late {
                            push(
                                events,
                                replay_time,
                                aim.time,
                                (replay_x, replay_y),
                                aim_pos,
                                HitType::Miss,
                                KeyAction::Press,
                            );
                            Advance::NextNote
                        } else {
                            Advance::Nop
                        }
                    } else if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            (replay_x, replay_y),
                            aim_pos,
                            HitType::HitPress,
                            KeyAction::Press,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
                (false, false) => {
                    if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            aim_pos,
                            aim_pos,
                            HitType::HitPress,
                            KeyAction::Press,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
            }
        }
        AimpointAction::Release => {
            let rec = if s.require_aim_release {
                (replay_x, replay_y)
            } else {
                aim_pos
            };
            let is_late = time_offset > s.pos_rel_miss_range;
            let is_miss_aim = pos_offset > s.release_radius;

            match (s.require_aim_release, s.require_tap_release) {
                (_, true) => {
                    if is_late {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::Miss,
                            KeyAction::Release,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
                (true, false) => {
                    if is_miss_aim {
                        if is_late {
                            push(
                                events,
                                replay_time,
                                aim.time,
                                rec,
                                aim_pos,
                                HitType::Miss,
                                KeyAction::Release,
                            );
                            Advance::NextNote
                        } else {
                            Advance::Nop
                        }
                    } else if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::HitRelease,
                            KeyAction::Release,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
                (false, false) => {
                    if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::HitRelease,
                            KeyAction::Release,
                        );
                        Advance::NextNote
                    } else {
                        Advance::Nop
                    }
                }
            }
        }
        AimpointAction::Hold => {
            let is_late = if s.recoverable_release {
                time_offset > s.pos_hld_range
            } else {
                time_offset > 0.0
            };
            let is_miss_aim = pos_offset > s.release_radius;
            let rec = if s.require_aim_hold {
                (replay_x, replay_y)
            } else {
                aim_pos
            };
            let miss_adv = if s.miss_slider {
                Advance::NextNote
            } else {
                Advance::NextAimpoint
            };

            match (s.require_aim_hold, s.require_tap_hold) {
                (_, true) => {
                    if is_late {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::Miss,
                            KeyAction::Hold,
                        );
                        miss_adv
                    } else {
                        Advance::Nop
                    }
                }
                (true, false) => {
                    if is_miss_aim {
                        if is_late {
                            push(
                                events,
                                replay_time,
                                aim.time,
                                rec,
                                aim_pos,
                                HitType::Miss,
                                KeyAction::Hold,
                            );
                            miss_adv
                        } else {
                            Advance::Nop
                        }
                    } else if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::AimHold,
                            KeyAction::Hold,
                        );
                        Advance::NextAimpoint
                    } else {
                        Advance::Nop
                    }
                }
                (false, false) => {
                    if time_offset >= 0.0 {
                        push(
                            events,
                            replay_time,
                            aim.time,
                            rec,
                            aim_pos,
                            HitType::AimHold,
                            KeyAction::Hold,
                        );
                        Advance::NextAimpoint
                    } else {
                        Advance::Nop
                    }
                }
            }
        }
    }
}

/// Handle a key press against the first visible scorepoint.
fn process_press(
    s: &ScoreSettings,
    events: &mut Vec<ScoreEvent>,
    aimpoints: &[&Aimpoint],
    replay_time: f64,
    replay_x: f64,
    replay_y: f64,
    last_tap_pos: &mut (f64, f64),
) -> Advance {
    let aim = aimpoints[0];
    if aim.action != AimpointAction::Press {
        return Advance::Nop;
    }

    let time_offset = replay_time - aim.time;
    let pos_offset = ((replay_x - aim.x).powi(2) + (replay_y - aim.y).powi(2)).sqrt();

    let (is_miss_aim, rec) = if s.require_aim_press {
        (pos_offset > s.hitobject_radius, (replay_x, replay_y))
    } else {
        (false, (aim.x, aim.y))
    };

    let (in_neg_nothing, in_neg_miss, in_hit, in_pos_miss) = if s.require_tap_press {
        (
            time_offset <= -s.neg_hit_miss_range,
            -s.neg_hit_miss_range < time_offset && time_offset <= -s.neg_hit_range,
            -s.neg_hit_range < time_offset && time_offset <= s.pos_hit_range,
            s.pos_hit_range < time_offset && time_offset <= s.pos_hit_miss_range,
        )
    } else {
        (
            s.blank_miss && time_offset <= -s.neg_hit_miss_range,
            false,
            time_offset >= 0.0,
            false,
        )
    };

    if is_miss_aim {
        if s.blank_miss {
            push(
                events,
                replay_time,
                f64::NAN,
                (replay_x, replay_y),
                (f64::NAN, f64::NAN),
                HitType::Empty,
                KeyAction::Press,
            );
        }
        // Remember where the player tapped into empty space.
        *last_tap_pos = (replay_x, replay_y);
        return Advance::Nop;
    }

    if in_neg_nothing {
        if s.blank_miss {
            push(
                events,
                replay_time,
                f64::NAN,
                rec,
                (f64::NAN, f64::NAN),
                HitType::Empty,
                KeyAction::Press,
            );
        }
        return Advance::Nop;
    }

    if in_neg_miss {
        if s.press_miss {
            push(
                events,
                replay_time,
                aim.time,
                rec,
                (aim.x, aim.y),
                HitType::Miss,
                KeyAction::Press,
            );
            return Advance::NextNote;
        }
        return Advance::Nop;
    }

    if in_hit {
        push(
            events,
            replay_time,
            aim.time,
            rec,
            (aim.x, aim.y),
            HitType::HitPress,
            KeyAction::Press,
        );
        return if aim.kind == NoteKind::Slider {
            Advance::NextAimpoint
        } else {
            Advance::NextNote
        };
    }

    if in_pos_miss {
        if s.press_miss {
            push(
                events,
                replay_time,
                aim.time,
                rec,
                (aim.x, aim.y),
                HitType::Miss,
                KeyAction::Press,
            );
            return Advance::NextNote;
        }
        return Advance::Nop;
    }

    // Way late taps read as never pressed; free processing handles it.
    Advance::Nop
}

/// Handle a held key against the first visible scorepoint.
fn process_hold(
    s: &ScoreSettings,
    events: &mut Vec<ScoreEvent>,
    aimpoints: &[&Aimpoint],
    replay_time: f64,
    replay_x: f64,
    replay_y: f64,
) -> Advance {
    let aim = aimpoints[0];
    if aim.action != AimpointAction::Hold {
        return Advance::Nop;
    }

    let time_offset = replay_time - aim.time;
    let pos_offset = ((replay_x - aim.x).powi(2) + (replay_y - aim.y).powi(2)).sqrt();

    let (is_miss_aim, rec) = if s.require_aim_hold {
        (pos_offset > s.follow_radius, (replay_x, replay_y))
    } else {
        (false, (aim.x, aim.y))
    };

    let (in_neg_nothing, in_hold) = if s.require_tap_hold {
        (
            time_offset <= -s.neg_hld_range,
            -s.neg_hld_range < time_offset && time_offset <= s.pos_hld_range,
        )
    } else {
        (false, time_offset >= 0.0)
    };

    let miss_adv = if s.miss_slider {
        Advance::NextNote
    } else {
        Advance::NextAimpoint
    };

    if is_miss_aim {
        if s.recoverable_missaim {
            if s.pos_hld_range < time_offset {
                push(
                    events,
                    replay_time,
                    aim.time,
                    rec,
                    (aim.x, aim.y),
                    HitType::Miss,
                    KeyAction::Hold,
                );
                return miss_adv;
            }
            return Advance::Nop;
        }
        push(
            events,
            replay_time,
            aim.time,
            rec,
            (aim.x, aim.y),
            HitType::Miss,
            KeyAction::Hold,
        );
        return miss_adv;
    }

    if in_neg_nothing {
        return Advance::Nop;
    }

    if in_hold {
        push(
            events,
            replay_time,
            aim.time,
            rec,
            (aim.x, aim.y),
            HitType::AimHold,
            KeyAction::Hold,
        );
        return Advance::NextAimpoint;
    }

    Advance::Nop
}

/// Handle a key release against the first visible scorepoint.
fn process_release(
    s: &ScoreSettings,
    events: &mut Vec<ScoreEvent>,
    aimpoints: &[&Aimpoint],
    replay_time: f64,
    replay_x: f64,
    replay_y: f64,
) -> Advance {
    let aim = aimpoints[0];
    if aim.action == AimpointAction::Press {
        return Advance::Nop;
    }

    let time_offset = replay_time - aim.time;
    let pos_offset = ((replay_x - aim.x).powi(2) + (replay_y - aim.y).powi(2)).sqrt();

    let (is_miss_aim, rec) = if s.require_aim_release {
        (pos_offset > s.release_radius, (replay_x, replay_y))
    } else {
        (false, (aim.x, aim.y))
    };

    let (in_neg_nothing, in_neg_miss, in_rel, in_pos_miss) = if s.require_tap_release {
        (
            time_offset <= -s.neg_rel_miss_range,
            -s.neg_rel_miss_range < time_offset && time_offset <= -s.neg_rel_range,
            -s.neg_rel_range < time_offset && time_offset <= s.pos_rel_range,
            s.pos_rel_range < time_offset && time_offset <= s.pos_rel_miss_range,
        )
    } else {
        (false, false, time_offset >= 0.0, false)
    };

    // Letting go mid-slider either drops the slider or is forgiven,
    // depending on whether releases are recoverable.
    if aim.action == AimpointAction::Hold {
        if s.require_tap_hold {
            if s.recoverable_release {
                return Advance::Nop;
            }
            push(
                events,
                replay_time,
                aim.time,
                rec,
                (aim.x, aim.y),
                HitType::Miss,
                KeyAction::Hold,
            );
            return if s.miss_slider {
                Advance::NextNote
            } else {
                Advance::NextAimpoint
            };
        }
        return Advance::Nop;
    }

    if is_miss_aim {
        push(
            events,
            replay_time,
            aim.time,
            rec,
            (aim.x, aim.y),
            HitType::Miss,
            KeyAction::Release,
        );
        return Advance::NextNote;
    }

    if in_neg_nothing {
        return Advance::Nop;
    }

    if in_neg_miss {
        if s.release_miss {
            push(
                events,
                replay_time,
                aim.time,
                rec,
                (aim.x, aim.y),
                HitType::Miss,
                KeyAction::Release,
            );
            return Advance::NextNote;
        }
        return Advance::Nop;
    }

    if in_rel {
        push(
            events,
            replay_time,
            aim.time,
            rec,
            (aim.x, aim.y),
            HitType::HitRelease,
            KeyAction::Release,
        );
        return Advance::NextNote;
    }

    if in_pos_miss {
        if s.release_miss {
            push(
                events,
                replay_time,
                aim.time,
                rec,
                (aim.x, aim.y),
                HitType::Miss,
                KeyAction::Release,
            );
            return Advance::NextNote;
        }
        return Advance::Nop;
    }

    // Way late releases read as never released.
    Advance::Nop
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{Keys, ReplayFrame};
    use crate::standard::map_data::{Aimpoint, AimpointAction, NoteKind};

    fn circle_map(times: &[f64]) -> StdMapData {
        let mut rows = Vec::new();
        for (note, &t) in times.iter().enumerate() {
            rows.push(Aimpoint {
                note,
                time: t,
                x: 256.0,
                y: 192.0,
                action: AimpointAction::Press,
                kind: NoteKind::Circle,
            });
            rows.push(Aimpoint {
                note,
                time: t + 1.0,
                x: 256.0,
                y: 192.0,
                action: AimpointAction::Release,
                kind: NoteKind::Circle,
            });
        }
        StdMapData { rows }
    }

    fn tap_replay(taps: &[(i64, f32, f32)]) -> StdReplayData {
        let mut frames = vec![ReplayFrame {
            delta: 0,
            time: 0,
            x: 0.0,
            y: 0.0,
            keys: Keys(0),
        }];
        for &(t, x, y) in taps {
            frames.push(ReplayFrame {
                delta: 0,
                time: t,
                x,
                y,
                keys: Keys(Keys::K1),
            });
            frames.push(ReplayFrame {
                delta: 0,
                time: t + 50,
                x,
                y,
                keys: Keys(0),
            });
        }
        frames.push(ReplayFrame {
            delta: 0,
            time: 1_000_000,
            x: 0.0,
            y: 0.0,
            keys: Keys(0),
        });
        StdReplayData::from_frames(&frames)
    }

    #[test]
    fn test_perfect_tap_is_hit_press() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1000, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 1);
        assert_eq!(score.num_hits(HitType::Miss), 0);
        assert_eq!(score.events[0].tap_offset(), 0.0);
    }

    #[test]
    fn test_late_tap_offset_recorded() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1080, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 1);
        assert_eq!(score.events[0].tap_offset(), 80.0);
    }

    #[test]
    fn test_early_tap_in_miss_window() {
        let map = circle_map(&[1000.0]);
        // 150ms early sits between the hit window (100) and the miss
        // window (200).
        let replay = tap_replay(&[(850, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::Miss), 1);
        assert_eq!(score.events[0].action, KeyAction::Press);
    }

    #[test]
    fn test_very_early_tap_ignored_then_note_missed() {
        let map = circle_map(&[1000.0]);
        // 400ms early is outside all windows; the note then times out.
        let replay = tap_replay(&[(600, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 0);
        assert_eq!(score.num_hits(HitType::Miss), 1);
    }

    #[test]
    fn test_no_tap_becomes_miss() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::Miss), 1);
        // The player never tapped, so the recorded position is absent.
        assert!(score.events[0].replay_x.is_nan());
    }

    #[test]
    fn test_tap_off_target_does_not_count() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1000, 50.0, 50.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 0);
        assert_eq!(score.num_hits(HitType::Miss), 1);
    }

    #[test]
    fn test_blank_miss_records_empty_event() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1000, 50.0, 50.0)]);
        let settings = ScoreSettings {
            blank_miss: true,
            ..ScoreSettings::default()
        };
        let score = StdScoreData::compute(&replay, &map, &settings).unwrap();

        let empty: Vec<_> = score.hits_of(HitType::Empty).collect();
        assert_eq!(empty.len(), 1);
        assert!(empty[0].map_time.is_nan());
        assert_eq!(empty[0].replay_x, 50.0);
    }

    #[test]
    fn test_two_circles_both_hit() {
        let map = circle_map(&[1000.0, 2000.0]);
        let replay = tap_replay(&[(1010, 256.0, 192.0), (1995, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 2);
        let offsets = score.tap_press_offsets();
        assert_eq!(offsets, vec![10.0, -5.0]);
    }

    #[test]
    fn test_relax_hits_without_tapping() {
        let map = circle_map(&[1000.0]);

        // Cursor passes over the note with no key down.
        let frames = vec![
            ReplayFrame {
                delta: 0,
                time: 0,
                x: 0.0,
                y: 0.0,
                keys: Keys(0),
            },
            ReplayFrame {
                delta: 0,
                time: 1000,
                x: 256.0,
                y: 192.0,
                keys: Keys(0),
            },
            ReplayFrame {
                delta: 0,
                time: 2000,
                x: 256.0,
                y: 192.0,
                keys: Keys(0),
            },
        ];
        let replay = StdReplayData::from_frames(&frames);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::relax()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 1);
    }

    #[test]
    fn test_autopilot_hits_without_aiming() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1000, 0.0, 0.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::autopilot()).unwrap();

        assert_eq!(score.num_hits(HitType::HitPress), 1);
    }

    #[test]
    fn test_stats_on_known_offsets() {
        let map = circle_map(&[1000.0, 2000.0, 3000.0]);
        let replay = tap_replay(&[
            (1010, 256.0, 192.0),
            (2020, 256.0, 192.0),
            (3030, 256.0, 192.0),
        ]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert!((score.tap_offset_mean() - 20.0).abs() < 1e-9);
        assert!((score.tap_offset_stdev() - (200.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_odds_zero_stdev() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[(1010, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        assert_eq!(score.odds_some_tap_within(20.0), 1.0);
        assert_eq!(score.odds_some_tap_within(5.0), 0.0);
    }

    #[test]
    fn test_odds_gaussian() {
        let map = circle_map(&[1000.0, 2000.0]);
        let replay = tap_replay(&[(990, 256.0, 192.0), (2010, 256.0, 192.0)]);
        let score = StdScoreData::compute(&replay, &map, &ScoreSettings::default()).unwrap();

        // Mean 0, stdev 10; one sigma both ways is ~68.3%.
        let odds = score.odds_some_tap_within(10.0);
        assert!((odds - 0.6827).abs() < 0.001);
        assert!((score.odds_all_tap_within(10.0) - odds * odds).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let map = circle_map(&[1000.0]);
        let replay = tap_replay(&[]);
        let settings = ScoreSettings {
            neg_hit_range: 300.0,
            ..ScoreSettings::default()
        };
        assert!(StdScoreData::compute(&replay, &map, &settings).is_err());
    }

    #[test]
    fn test_single_note_release_filtered() {
        let rows = circle_map(&[1000.0]).rows;
        let filtered = filter_single_note_releases(&rows);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].action, AimpointAction::Press);
    }
}
