use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::replay::ReplayFrame;

/// State of one key across consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyAction {
    Free = 0,
    Press = 1,
    Hold = 2,
    Release = 3,
}

/// Buttons tracked per event, in order: M1, M2, K1, K2, smoke.
pub const NUM_KEYS: usize = 5;

/// One replay frame with raw key bitmasks converted to per-key actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub time: i64,
    pub x: f64,
    pub y: f64,
    pub keys: [KeyAction; NUM_KEYS],
}

/// A row of the reduced single-key stream fed to score processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducedEvent {
    pub time: i64,
    pub x: f64,
    pub y: f64,
    pub action: KeyAction,
}

/// Standard gamemode replay data: cursor events with each button's
/// press state tracked across frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StdReplayData {
    pub events: Vec<ActionEvent>,
}

impl StdReplayData {
    pub fn from_frames(frames: &[ReplayFrame]) -> Self {
        let mut by_time: BTreeMap<i64, ActionEvent> = BTreeMap::new();
        let mut hold_state = [false; NUM_KEYS];

        for frame in frames {
            let down = [
                frame.keys.m1(),
                frame.keys.m2(),
                frame.keys.k1(),
                frame.keys.k2(),
                frame.keys.smoke(),
            ];

            let mut keys = [KeyAction::Free; NUM_KEYS];
            for i in 0..NUM_KEYS {
                keys[i] = match (hold_state[i], down[i]) {
                    (false, true) => KeyAction::Press,
                    (true, true) => KeyAction::Hold,
                    (true, false) => KeyAction::Release,
                    (false, false) => KeyAction::Free,
                };
            }
            hold_state = down;

            // Autoplay replays can emit several frames at the same
            // timestamp; bump until the slot is free.
            let mut time = frame.time;
            while by_time.contains_key(&time) {
                time += 1;
            }

            by_time.insert(
                time,
                ActionEvent {
                    time,
                    x: f64::from(frame.x),
                    y: f64::from(frame.y),
                    keys,
                },
            );
        }

        Self {
            events: by_time.into_values().collect(),
        }
    }

    /// Times at which any of the given buttons were pressed.
    pub fn press_times(&self, buttons: &[usize]) -> Vec<i64> {
        self.times_with_action(buttons, KeyAction::Press)
    }

    /// Times at which any of the given buttons were released.
    pub fn release_times(&self, buttons: &[usize]) -> Vec<i64> {
        self.times_with_action(buttons, KeyAction::Release)
    }

    fn times_with_action(&self, buttons: &[usize], action: KeyAction) -> Vec<i64> {
        self.events
            .iter()
            .filter(|e| buttons.iter().any(|&b| e.keys[b] == action))
            .map(|e| e.time)
            .collect()
    }

    /// Merge the four tap buttons into one key and drop idle stretches.
    ///
    /// Frames where no button is active are filtered out, except ones
    /// directly adjacent to activity. A hold rolling straight into a
    /// press gets a release synthesized one millisecond earlier, and two
    /// presses in a row collapse into a hold.
    pub fn reduce(&self, press_block: bool, release_block: bool) -> Vec<ReducedEvent> {
        let kept = self.filter_idle();

        let mut out: Vec<ReducedEvent> = Vec::with_capacity(kept.len());
        let mut key_state = KeyAction::Free;

        for event in kept {
            let mut new_state = merged_key_state(key_state, &event.keys, press_block, release_block);

            if key_state == KeyAction::Hold && new_state == KeyAction::Press {
                out.push(ReducedEvent {
                    time: event.time - 1,
                    x: event.x,
                    y: event.y,
                    action: KeyAction::Release,
                });
            }

            // Left and right keys pressing one frame apart produce two
            // consecutive presses, which is effectively a hold.
            if key_state == KeyAction::Press && new_state == KeyAction::Press {
                new_state = KeyAction::Hold;
            }
            key_state = new_state;

            out.push(ReducedEvent {
                time: event.time,
                x: event.x,
                y: event.y,
                action: new_state,
            });
        }

        out
    }

    fn filter_idle(&self) -> Vec<&ActionEvent> {
        let active: Vec<bool> = self
            .events
            .iter()
            .map(|e| e.keys[..4].iter().any(|&k| k != KeyAction::Free))
            .collect();

        self.events
            .iter()
            .enumerate()
            .filter(|&(i, _)| {
                if i == 0 || i == self.events.len() - 1 {
                    return true;
                }
                active[i] || active[i - 1] || active[i + 1]
            })
            .map(|(_, e)| e)
            .collect()
    }
}

/// Resolve the four tap buttons into one master key state.
fn merged_key_state(
    master: KeyAction,
    keys: &[KeyAction; NUM_KEYS],
    press_block: bool,
    release_block: bool,
) -> KeyAction {
    let taps = &keys[..4];

    if taps.iter().any(|&k| k == KeyAction::Press) {
        let press_reg = !press_block || master != KeyAction::Hold;
        if press_reg {
            return KeyAction::Press;
        }
    }

    if taps.iter().any(|&k| k == KeyAction::Release) {
        let mut release_reg = !release_block || taps.iter().all(|&k| k != KeyAction::Hold);
        release_reg &= master != KeyAction::Free && master != KeyAction::Release;
        if release_reg {
            return KeyAction::Release;
        }
    }

    let any_hold = taps.iter().any(|&k| k == KeyAction::Hold);
    if (any_hold && master != KeyAction::Release) || master == KeyAction::Hold {
        return KeyAction::Hold;
    }

    KeyAction::Free
}
