//! Pattern metrics derived from mania action data.

use crate::standard::KeyAction;

use super::action_data::ManiaActionData;

/// Presses per second in a trailing window, sampled at every row. When
/// `col` is given only that column's presses are counted.
pub fn press_rate(
    data: &ManiaActionData,
    col: Option<usize>,
    window_ms: i64,
) -> (Vec<i64>, Vec<f64>) {
    let mut times = Vec::with_capacity(data.rows.len());
    let mut rates = Vec::with_capacity(data.rows.len());

    for row in &data.rows {
        let in_range = data.actions_between(row.time - window_ms, row.time);
        let presses: usize = in_range
            .iter()
            .map(|r| match col {
                Some(c) => (r.states.get(c) == Some(&KeyAction::Press)) as usize,
                None => r.states.iter().filter(|s| **s == KeyAction::Press).count(),
            })
            .sum();

        times.push(row.time);
        rates.push(1000.0 * presses as f64 / window_ms as f64);
    }

    (times, rates)
}

/// Interval between consecutive note starts in one column. Times are the
/// later note of each pair.
pub fn note_intervals(data: &ManiaActionData, col: usize) -> (Vec<i64>, Vec<f64>) {
    let presses = data.press_times(col);
    if presses.len() < 2 {
        return (Vec::new(), Vec::new());
    }

    let intervals = presses.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    (presses[1..].to_vec(), intervals)
}

/// Highest single-column press rate in a trailing window, sampled at
/// every row.
pub fn max_press_rate_per_column(data: &ManiaActionData, window_ms: i64) -> (Vec<i64>, Vec<f64>) {
    let columns = data.num_keys();
    let mut times = Vec::with_capacity(data.rows.len());
    let mut rates = Vec::with_capacity(data.rows.len());

    for row in &data.rows {
        let in_range = data.actions_between(row.time - window_ms, row.time);
        let max_presses = (0..columns)
            .map(|c| {
                in_range
                    .iter()
                    .filter(|r| r.states.get(c) == Some(&KeyAction::Press))
                    .count()
            })
            .max()
            .unwrap_or(0);

        times.push(row.time);
        rates.push(1000.0 * max_presses as f64 / window_ms as f64);
    }

    (times, rates)
}

/// Row-by-row mask of press and release cells belonging to hold notes.
/// Single notes (press to release within 1ms) are masked out.
pub fn hold_note_mask(data: &ManiaActionData) -> Vec<Vec<bool>> {
    let columns = data.num_keys();
    let mut mask = vec![vec![false; columns]; data.rows.len()];

    for col in 0..columns {
        let presses = data.press_times(col);
        let releases = data.release_times(col);

        for (press, release) in presses.iter().zip(&releases) {
            if release - press <= 1 {
                continue;
            }
            for t in [*press, *release] {
                if let Ok(idx) = data.rows.binary_search_by_key(&t, |r| r.time) {
                    mask[idx][col] = true;
                }
            }
        }
    }

    mask
}

/// Hold durations placed at each release row, column by column. Single
/// note press/release pairs are included with their 1ms duration.
pub fn hold_durations(data: &ManiaActionData) -> Vec<Vec<f64>> {
    let columns = data.num_keys();
    let mut durations = vec![vec![0.0; columns]; data.rows.len()];

    for col in 0..columns {
        let presses = data.press_times(col);
        let releases = data.release_times(col);

        for (press, release) in presses.iter().zip(&releases) {
            if let Ok(idx) = data.rows.binary_search_by_key(release, |r| r.time) {
                durations[idx][col] = (release - press) as f64;
            }
        }
    }

    durations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mania::action_data::ActionRow;

    /// Two columns: single notes at 0 and 500 in column 0, a hold note
    /// 0..1000 in column 1.
    fn two_col_data() -> ManiaActionData {
        let mut data = ManiaActionData {
            rows: vec![
                ActionRow {
                    time: 0,
                    states: vec![KeyAction::Press, KeyAction::Press],
                },
                ActionRow {
                    time: 1,
                    states: vec![KeyAction::Release, KeyAction::Free],
                },
                ActionRow {
                    time: 500,
                    states: vec![KeyAction::Press, KeyAction::Free],
                },
                ActionRow {
                    time: 501,
                    states: vec![KeyAction::Release, KeyAction::Free],
                },
                ActionRow {
                    time: 1000,
                    states: vec![KeyAction::Free, KeyAction::Release],
                },
            ],
        };
        data.fill_holds().unwrap();
        data
    }

    #[test]
    fn test_press_rate_overall_and_per_column() {
        let data = two_col_data();

        let (times, rates) = press_rate(&data, None, 1000);
        assert_eq!(times.len(), data.rows.len());
        // At t=500 the window covers all three presses.
        assert_eq!(rates[2], 3.0);

        let (_, col1_rates) = press_rate(&data, Some(1), 1000);
        // Column 1 has its one press in every window up to t=1000.
        assert_eq!(col1_rates[0], 1.0);
        assert_eq!(col1_rates[4], 1.0);
    }

    #[test]
    fn test_note_intervals() {
        let data = two_col_data();
        let (times, intervals) = note_intervals(&data, 0);
        assert_eq!(times, vec![500]);
        assert_eq!(intervals, vec![500.0]);

        let (times, intervals) = note_intervals(&data, 1);
        assert!(times.is_empty() && intervals.is_empty());
    }

    #[test]
    fn test_max_press_rate_per_column() {
        let data = two_col_data();
        let (_, rates) = max_press_rate_per_column(&data, 1000);
        // Column 0 dominates with two presses in the window at t=500.
        assert_eq!(rates[2], 2.0);
    }

    #[test]
    fn test_hold_note_mask_excludes_single_notes() {
        let data = two_col_data();
        let mask = hold_note_mask(&data);

        // Hold note press at row 0 and release at row 4 in column 1.
        assert!(mask[0][1]);
        assert!(mask[4][1]);

        // Single notes in column 0 are not marked.
        assert!(mask.iter().all(|row| !row[0]));
    }

    #[test]
    fn test_hold_durations() {
        let data = two_col_data();
        let durations = hold_durations(&data);

        assert_eq!(durations[4][1], 1000.0);
        assert_eq!(durations[1][0], 1.0);
        assert_eq!(durations[3][0], 1.0);
    }
}
