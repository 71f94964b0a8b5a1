//! Replay-to-map alignment and judgement modelling for osu!mania.
//!
//! Each column is scored independently: the map's press/release event
//! stream is walked against the replay's press/release event stream under
//! separate hit and release timing windows.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, ContinuousCDF, DiscreteCDF, Normal};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kinematics;
use crate::standard::{HitType, KeyAction};

use super::action_data::ManiaActionData;

/// Hit offsets defining the OD8 judgement boundaries, in ms.
const OD8_MAX: f64 = 16.5;
const OD8_300: f64 = 40.5;
const OD8_200: f64 = 73.5;
const OD8_100: f64 = 103.5;
const OD8_50: f64 = 127.5;

/// Mania scoring parameters. All windows are in ms on either side of the
/// scorepoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManiaScoreSettings {
    pub pos_hit: i64,
    pub neg_hit: i64,
    pub pos_hit_miss: i64,
    pub neg_hit_miss: i64,

    pub pos_rel: i64,
    pub neg_rel: i64,
    pub pos_rel_miss: i64,
    pub neg_rel_miss: i64,

    /// Record taps landing in blank space as empty events.
    pub blank_miss: bool,

    /// Ignore hold note release timing entirely.
    pub lazy_sliders: bool,
}

impl Default for ManiaScoreSettings {
    fn default() -> Self {
        ManiaScoreSettings {
            pos_hit: 100,
            neg_hit: 100,
            pos_hit_miss: 200,
            neg_hit_miss: 200,

            pos_rel: 300,
            neg_rel: 300,
            pos_rel_miss: 500,
            neg_rel_miss: 500,

            blank_miss: false,
            lazy_sliders: false,
        }
    }
}

impl ManiaScoreSettings {
    pub fn validate(&self) -> Result<()> {
        if self.pos_hit > self.pos_hit_miss || self.neg_hit > self.neg_hit_miss {
            return Err(Error::InvalidSettings(
                "hit window cannot exceed the hit miss window".into(),
            ));
        }
        if self.pos_rel > self.pos_rel_miss || self.neg_rel > self.neg_rel_miss {
            return Err(Error::InvalidSettings(
                "release window cannot exceed the release miss window".into(),
            ));
        }
        Ok(())
    }
}

/// One scored event in a column.
///
/// `map_time` is `None` for empty events, which have no scorepoint
/// associated with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManiaScoreEvent {
    pub replay_time: i64,
    pub map_time: Option<i64>,
    pub column: usize,
    pub hit_type: HitType,
}

impl ManiaScoreEvent {
    /// Tap error in ms, for events tied to a scorepoint.
    pub fn tap_offset(&self) -> Option<f64> {
        self.map_time.map(|t| (self.replay_time - t) as f64)
    }
}

/// Scored alignment of a mania replay against a mania map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManiaScoreData {
    pub events: Vec<ManiaScoreEvent>,
}

impl ManiaScoreData {
    pub fn compute(
        map_data: &ManiaActionData,
        replay_data: &ManiaActionData,
        settings: &ManiaScoreSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let map_cols = map_data.num_keys();
        let replay_cols = replay_data.num_keys();
        if map_cols != replay_cols {
            return Err(Error::ColumnMismatch {
                map: map_cols,
                replay: replay_cols,
            });
        }

        let mut events = Vec::new();
        for col in 0..map_cols {
            score_column(&mut events, map_data, replay_data, settings, col);
        }

        debug!(
            columns = map_cols,
            events = events.len(),
            "computed mania score data"
        );
        Ok(ManiaScoreData { events })
    }

    pub fn hits_of(&self, hit_type: HitType) -> impl Iterator<Item = &ManiaScoreEvent> {
        self.events.iter().filter(move |e| e.hit_type == hit_type)
    }

    pub fn num_hits(&self, hit_type: HitType) -> usize {
        self.hits_of(hit_type).count()
    }

    /// Tap errors of every event tied to a scorepoint.
    pub fn tap_offsets(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter(|e| e.hit_type != HitType::Empty)
            .filter_map(|e| e.tap_offset())
            .collect()
    }

    /// Number of scored events, empties excluded.
    pub fn num_scorable(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.hit_type != HitType::Empty)
            .count()
    }

    pub fn tap_offset_mean(&self) -> f64 {
        kinematics::mean(self.tap_offsets())
    }

    pub fn tap_offset_var(&self) -> f64 {
        kinematics::variance(&self.tap_offsets())
    }

    pub fn tap_offset_stdev(&self) -> f64 {
        kinematics::stdev(&self.tap_offsets())
    }

    /// Odds a random tap error lands within `-offset..offset`, under a
    /// gaussian fitted to the observed offsets.
    pub fn odds_some_tap_within(&self, offset: f64) -> f64 {
        model_offset_prob(self.tap_offset_mean(), self.tap_offset_stdev(), offset)
    }

    /// Odds every tap error lands within `-offset..offset`.
    pub fn odds_all_tap_within(&self, offset: f64) -> f64 {
        self.odds_some_tap_within(offset)
            .powi(self.num_scorable() as i32)
    }

    /// Odds of `odds_all_tap_within` happening at least once in `trials`
    /// attempts.
    pub fn odds_all_tap_within_trials(&self, offset: f64, trials: usize) -> f64 {
        kinematics::prob_trials(self.odds_all_tap_within(offset), trials)
    }

    /// Accuracy expected from the fitted tap distribution under the OD8
    /// judgement model.
    pub fn model_ideal_acc_data(&self) -> f64 {
        model_ideal_acc(
            self.tap_offset_mean(),
            self.tap_offset_stdev(),
            self.num_scorable() as f64,
        )
    }

    /// Odds of achieving `target_acc` under the OD8 judgement model.
    ///
    /// A gaussian is fitted to the target accuracy by adjusting the
    /// stdev, the resulting judgement counts are taken as the requirement,
    /// and the odds of the observed distribution meeting each judgement
    /// count are combined.
    pub fn odds_acc(&self, target_acc: f64) -> f64 {
        let num_notes = self.num_scorable();
        let mean = self.tap_offset_mean();
        let stdev = self.tap_offset_stdev();

        let fitted_stdev = solve_stdev_for_acc(mean, stdev, num_notes as f64, target_acc);
        let [num_max, num_300, num_200, num_100, num_50, _] =
            model_num_hits(mean, fitted_stdev, num_notes as f64);

        let n = num_notes as u64;
        let within = |offset| model_offset_prob(mean, stdev, offset);

        binom_sf(num_max - 1.0, n, within(OD8_MAX))
            * binom_sf(num_max + num_300 - 1.0, n, within(OD8_300))
            * binom_sf(num_max + num_300 + num_200 - 1.0, n, within(OD8_200))
            * binom_sf(num_max + num_300 + num_200 + num_100 - 1.0, n, within(OD8_100))
            * binom_sf(
                num_max + num_300 + num_200 + num_100 + num_50 - 1.0,
                n,
                within(OD8_50),
            )
    }
}

/// Probability a gaussian sample lands within `-offset..offset`.
pub fn model_offset_prob(mean: f64, stdev: f64, offset: f64) -> f64 {
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

/// Expected accuracy of `num_notes` taps drawn from the given gaussian,
/// scored with OD8 judgement windows.
pub fn model_ideal_acc(mean: f64, stdev: f64, num_notes: f64) -> f64 {
    let [num_max, num_300, num_200, num_100, num_50, num_miss] =
        model_num_hits(mean, stdev, num_notes);

    let points =
        num_50 * 50.0 + num_100 * 100.0 + num_200 * 200.0 + num_300 * 300.0 + num_max * 300.0;
    let hit_fraction = (num_notes - num_miss) / num_notes;

    points * hit_fraction / (num_notes * 300.0)
}

/// Expected judgement counts `[max, 300, 200, 100, 50, miss]` of
/// `num_notes` taps drawn from the given gaussian.
pub fn model_num_hits(mean: f64, stdev: f64, num_notes: f64) -> [f64; 6] {
    let within_max = model_offset_prob(mean, stdev, OD8_MAX);
    let within_300 = model_offset_prob(mean, stdev, OD8_300);
    let within_200 = model_offset_prob(mean, stdev, OD8_200);
    let within_100 = model_offset_prob(mean, stdev, OD8_100);
    let within_50 = model_offset_prob(mean, stdev, OD8_50);

    [
        within_max * num_notes,
        (within_300 - within_max) * num_notes,
        (within_200 - within_300) * num_notes,
        (within_100 - within_200) * num_notes,
        (within_50 - within_100) * num_notes,
        (1.0 - within_50) * num_notes,
    ]
}

/// Fits the gaussian stdev producing `target_acc` under the OD8 model,
/// stepping proportionally to the accuracy error.
fn solve_stdev_for_acc(mean: f64, mut stdev: f64, num_notes: f64, target_acc: f64) -> f64 {
    let round3 = |x: f64| (x * 1000.0).round() / 1000.0;

    let mut cost = round3(target_acc) - round3(model_ideal_acc(mean, stdev, num_notes));
    let mut steps = 0;

    while cost != 0.0 && steps < 100_000 {
        stdev -= cost;
        cost = round3(target_acc) - round3(model_ideal_acc(mean, stdev, num_notes));
        steps += 1;
    }

    stdev
}

/// Survival function of a binomial: odds of more than `k` successes out
/// of `n` trials with per-trial probability `p`.
fn binom_sf(k: f64, n: u64, p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    let Ok(dist) = Binomial::new(p, n) else {
        return f64::NAN;
    };
    if k < 0.0 {
        return 1.0;
    }
    dist.sf(k.floor() as u64)
}

/// Merged press/release event stream of one column, sorted by time with
/// presses before releases at equal times.
fn column_events(data: &ManiaActionData, col: usize) -> Vec<(i64, KeyAction)> {
    let mut events: Vec<(i64, KeyAction)> = data
        .press_times(col)
        .into_iter()
        .map(|t| (t, KeyAction::Press))
        .chain(
            data.release_times(col)
                .into_iter()
                .map(|t| (t, KeyAction::Release)),
        )
        .collect();
    events.sort_by_key(|&(t, a)| (t, a as u8));
    events
}

fn score_column(
    events: &mut Vec<ManiaScoreEvent>,
    map_data: &ManiaActionData,
    replay_data: &ManiaActionData,
    settings: &ManiaScoreSettings,
    col: usize,
) {
    let map_events = column_events(map_data, col);
    let replay_events = column_events(replay_data, col);

    let mut map_idx = 0usize;
    let mut note_type = map_events.first().map_or(KeyAction::Free, |e| e.1);
    let mut last_replay_time = map_events.first().map_or(0, |e| e.0);

    for &(replay_time, replay_type) in &replay_events {
        last_replay_time = replay_time;

        // Sweep scorepoints the replay skipped past entirely.
        loop {
            let adv = process_free(events, settings, col, note_type, replay_time, &map_events, map_idx);
            if adv == 0 {
                break;
            }
            map_idx += adv;
            note_type = map_events.get(map_idx).map_or(KeyAction::Free, |e| e.1);
        }

        if replay_type == KeyAction::Press && note_type == KeyAction::Press {
            map_idx += process_press(events, settings, col, replay_time, &map_events, map_idx);
            note_type = map_events.get(map_idx).map_or(KeyAction::Free, |e| e.1);
            continue;
        }

        if replay_type == KeyAction::Release && note_type == KeyAction::Release {
            map_idx += process_release(events, settings, col, replay_time, &map_events, map_idx);
            note_type = map_events.get(map_idx).map_or(KeyAction::Free, |e| e.1);
        }
    }

    // Scorepoints left after the player's last input in this column.
    for &(map_time, _) in &map_events[map_idx.min(map_events.len())..] {
        events.push(ManiaScoreEvent {
            replay_time: last_replay_time,
            map_time: Some(map_time),
            column: col,
            hit_type: HitType::Empty,
        });
    }
}

fn process_press(
    events: &mut Vec<ManiaScoreEvent>,
    settings: &ManiaScoreSettings,
    col: usize,
    replay_time: i64,
    map_events: &[(i64, KeyAction)],
    map_idx: usize,
) -> usize {
    let map_time = map_events[map_idx].0;
    let offset = replay_time - map_time;

    // A press event is always followed by its release event.
    let is_single_note = map_events[map_idx + 1].0 - map_time <= 1;

    // Way early tap, no scorepoint in reach.
    if offset <= -settings.neg_hit_miss {
        if settings.blank_miss {
            push_empty(events, col, replay_time);
        }
        return 0;
    }

    // Early miss.
    if offset <= -settings.neg_hit {
        push(events, col, replay_time, map_time, HitType::Miss);
        return 2;
    }

    if offset <= settings.pos_hit {
        push(events, col, replay_time, map_time, HitType::HitPress);
        // Single notes and lazy scoring skip the release scorepoint.
        return if is_single_note || settings.lazy_sliders {
            2
        } else {
            1
        };
    }

    // Late miss.
    if offset <= settings.pos_hit_miss {
        push(events, col, replay_time, map_time, HitType::Miss);
        return 2;
    }

    // Way late tap.
    if settings.blank_miss {
        push_empty(events, col, replay_time);
    }
    0
}

fn process_release(
    events: &mut Vec<ManiaScoreEvent>,
    settings: &ManiaScoreSettings,
    col: usize,
    replay_time: i64,
    map_events: &[(i64, KeyAction)],
    map_idx: usize,
) -> usize {
    if settings.lazy_sliders {
        return 1;
    }

    let map_time = map_events[map_idx].0;
    let offset = replay_time - map_time;

    // Single notes have no release timing.
    let is_single_note = map_time - map_events[map_idx - 1].0 <= 1;
    if is_single_note {
        return 1;
    }

    if offset <= -settings.neg_rel_miss {
        if settings.blank_miss {
            push_empty(events, col, replay_time);
        }
        return 0;
    }

    if offset <= -settings.neg_rel {
        push(events, col, replay_time, map_time, HitType::Miss);
        return 1;
    }

    if offset <= settings.pos_rel {
        push(events, col, replay_time, map_time, HitType::HitRelease);
        return 1;
    }

    if offset <= settings.pos_rel_miss {
        push(events, col, replay_time, map_time, HitType::Miss);
        return 1;
    }

    if settings.blank_miss {
        push_empty(events, col, replay_time);
    }
    0
}

fn process_free(
    events: &mut Vec<ManiaScoreEvent>,
    settings: &ManiaScoreSettings,
    col: usize,
    note_type: KeyAction,
    replay_time: i64,
    map_events: &[(i64, KeyAction)],
    map_idx: usize,
) -> usize {
    if map_idx >= map_events.len() {
        return 0;
    }

    let map_time = map_events[map_idx].0;
    let offset = replay_time - map_time;

    match note_type {
        KeyAction::Press => {
            if offset > settings.pos_hit_miss {
                push(events, col, replay_time, map_time, HitType::Miss);
                return 2;
            }
            0
        }
        KeyAction::Release => {
            if offset > settings.pos_rel_miss {
                let is_single_note = map_time - map_events[map_idx - 1].0 <= 1;
                if !is_single_note && !settings.lazy_sliders {
                    push(events, col, replay_time, map_time, HitType::Miss);
                }
                return 1;
            }
            0
        }
        _ => 1,
    }
}

fn push(
    events: &mut Vec<ManiaScoreEvent>,
    col: usize,
    replay_time: i64,
    map_time: i64,
    hit_type: HitType,
) {
    events.push(ManiaScoreEvent {
        replay_time,
        map_time: Some(map_time),
        column: col,
        hit_type,
    });
}

fn push_empty(events: &mut Vec<ManiaScoreEvent>, col: usize, replay_time: i64) {
    events.push(ManiaScoreEvent {
        replay_time,
        map_time: None,
        column: col,
        hit_type: HitType::Empty,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mania::action_data::ActionRow;

    /// One column with notes at the given (start, end) times, holds
    /// filled in.
    fn one_col_map(notes: &[(i64, i64)]) -> ManiaActionData {
        let mut rows: Vec<ActionRow> = Vec::new();
        for &(start, end) in notes {
            rows.push(ActionRow {
                time: start,
                states: vec![KeyAction::Press],
            });
            rows.push(ActionRow {
                time: end,
                states: vec![KeyAction::Release],
            });
        }
        rows.sort_by_key(|r| r.time);
        let mut data = ManiaActionData { rows };
        data.fill_holds().unwrap();
        data
    }

    /// One column with a press/release pair per (press, release) time.
    fn one_col_replay(taps: &[(i64, i64)]) -> ManiaActionData {
        one_col_map(taps)
    }

    #[test]
    fn test_perfect_single_note_hit() {
        let map = one_col_map(&[(1000, 1001)]);
        let replay = one_col_replay(&[(1000, 1050)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        assert_eq!(score.num_hits(HitType::HitPress), 1);
        assert_eq!(score.num_hits(HitType::Miss), 0);
        // Single notes carry no release scorepoint.
        assert_eq!(score.num_hits(HitType::HitRelease), 0);
    }

    #[test]
    fn test_hold_note_press_and_release() {
        let map = one_col_map(&[(1000, 2000)]);
        let replay = one_col_replay(&[(1020, 1990)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        assert_eq!(score.num_hits(HitType::HitPress), 1);
        assert_eq!(score.num_hits(HitType::HitRelease), 1);

        let offsets = score.tap_offsets();
        assert_eq!(offsets, vec![20.0, -10.0]);
    }

    #[test]
    fn test_early_miss_press() {
        let map = one_col_map(&[(1000, 1001)]);
        let replay = one_col_replay(&[(850, 860)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        assert_eq!(score.num_hits(HitType::Miss), 1);
        assert_eq!(score.num_hits(HitType::HitPress), 0);
    }

    #[test]
    fn test_way_early_tap_ignored_unless_blank_miss() {
        let map = one_col_map(&[(1000, 1001)]);
        let replay = one_col_replay(&[(100, 110)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        assert_eq!(score.num_hits(HitType::Miss), 0);
        // The note is never reached again, so it ends as an empty.
        assert_eq!(score.num_hits(HitType::Empty), 2);

        let settings = ManiaScoreSettings {
            blank_miss: true,
            ..Default::default()
        };
        let score = ManiaScoreData::compute(&map, &replay, &settings).unwrap();
        assert!(score
            .events
            .iter()
            .any(|e| e.hit_type == HitType::Empty && e.map_time.is_none()));
    }

    #[test]
    fn test_untouched_note_swept_as_miss_by_later_press() {
        let map = one_col_map(&[(1000, 1001), (2000, 2001)]);
        let replay = one_col_replay(&[(2000, 2010)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        // First note swept as a miss when the tap at 2000 arrives.
        assert_eq!(score.num_hits(HitType::Miss), 1);
        assert_eq!(score.num_hits(HitType::HitPress), 1);
    }

    #[test]
    fn test_lazy_sliders_skip_release_judgement() {
        let map = one_col_map(&[(1000, 2000)]);
        // Release 900ms late, far past the release miss window.
        let replay = one_col_replay(&[(1000, 2900)]);

        let settings = ManiaScoreSettings {
            lazy_sliders: true,
            ..Default::default()
        };
        let score = ManiaScoreData::compute(&map, &replay, &settings).unwrap();
        assert_eq!(score.num_hits(HitType::HitPress), 1);
        assert_eq!(score.num_hits(HitType::Miss), 0);
    }

    #[test]
    fn test_column_mismatch() {
        let map = one_col_map(&[(1000, 1001)]);
        let replay = ManiaActionData {
            rows: vec![ActionRow {
                time: 0,
                states: vec![KeyAction::Press, KeyAction::Free],
            }],
        };
        assert!(matches!(
            ManiaScoreData::compute(&map, &replay, &Default::default()),
            Err(Error::ColumnMismatch { map: 1, replay: 2 })
        ));
    }

    #[test]
    fn test_tap_offset_stats() {
        let map = one_col_map(&[(1000, 1001), (2000, 2001), (3000, 3001)]);
        let replay = one_col_replay(&[(1010, 1020), (2020, 2030), (3030, 3040)]);

        let score = ManiaScoreData::compute(&map, &replay, &Default::default()).unwrap();
        assert!((score.tap_offset_mean() - 20.0).abs() < 1e-9);
        assert!((score.tap_offset_var() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_offset_prob_degenerate() {
        assert_eq!(model_offset_prob(0.0, 0.0, 10.0), 1.0);
        assert_eq!(model_offset_prob(50.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_model_offset_prob_gaussian() {
        // One stdev either side of a centered distribution.
        let p = model_offset_prob(0.0, 10.0, 10.0);
        assert!((p - 0.6827).abs() < 1e-3);
    }

    #[test]
    fn test_model_num_hits_sums_to_num_notes() {
        let counts = model_num_hits(0.0, 30.0, 100.0);
        let total: f64 = counts.iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_ideal_acc_tight_distribution() {
        // Nearly all taps inside the max window.
        let acc = model_ideal_acc(0.0, 5.0, 100.0);
        assert!(acc > 0.99);

        // A sloppy distribution scores worse.
        let sloppy = model_ideal_acc(0.0, 80.0, 100.0);
        assert!(sloppy < acc);
    }

    #[test]
    fn test_binom_sf() {
        // Odds of more than 0 successes in 10 fair trials.
        let p = binom_sf(0.0, 10, 0.5);
        assert!((p - (1.0 - 0.5f64.powi(10))).abs() < 1e-9);

        assert_eq!(binom_sf(-1.0, 10, 0.5), 1.0);
        assert!(binom_sf(0.0, 10, 1.5).is_nan());
    }
}
