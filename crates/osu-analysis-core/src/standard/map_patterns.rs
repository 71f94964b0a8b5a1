//! Pattern recognition over standard map data.

use super::map_data::{AimpointAction, StdMapData};

/// Mask of notes whose start and end are within `cs_px` of each other,
/// close enough that the player need not move to complete them.
pub fn detect_short_sliders_dist(map_data: &StdMapData, cs_px: f64) -> Vec<bool> {
    map_data
        .start_positions()
        .iter()
        .zip(map_data.end_positions())
        .map(|(&(xs, ys), (xe, ye))| ((xe - xs).powi(2) + (ye - ys).powi(2)).sqrt() < cs_px)
        .collect()
}

/// Mask of notes brief enough that the player need not hold them.
pub fn detect_short_sliders_time(map_data: &StdMapData, min_time: f64) -> Vec<bool> {
    map_data
        .start_times()
        .iter()
        .zip(map_data.end_times())
        .map(|(&start, end)| end - start < min_time)
        .collect()
}

/// Reinterpret short sliders as single notes by dropping everything but
/// their press aimpoint.
pub fn reinterpret_short_sliders(map_data: &StdMapData, min_time: f64, cs_px: f64) -> StdMapData {
    let short_time = detect_short_sliders_time(map_data, min_time);
    let short_dist = detect_short_sliders_dist(map_data, cs_px);

    let rows = map_data
        .rows
        .iter()
        .filter(|r| {
            let is_short = short_time.get(r.note).copied().unwrap_or(false)
                || short_dist.get(r.note).copied().unwrap_or(false);
            !is_short || r.action == AimpointAction::Press
        })
        .copied()
        .collect();

    StdMapData { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::map_data::{Aimpoint, AimpointAction, NoteKind};

    fn slider(note: usize, start: f64, end: f64, x_end: f64) -> Vec<Aimpoint> {
        vec![
            Aimpoint {
                note,
                time: start,
                x: 0.0,
                y: 0.0,
                action: AimpointAction::Press,
                kind: NoteKind::Slider,
            },
            Aimpoint {
                note,
                time: end,
                x: x_end,
                y: 0.0,
                action: AimpointAction::Release,
                kind: NoteKind::Slider,
            },
        ]
    }

    fn two_sliders() -> StdMapData {
        let mut rows = slider(0, 1000.0, 1040.0, 10.0);
        rows.extend(slider(1, 2000.0, 2600.0, 300.0));
        StdMapData { rows }
    }

    #[test]
    fn test_detect_by_distance() {
        let mask = detect_short_sliders_dist(&two_sliders(), 36.5);
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn test_detect_by_time() {
        let mask = detect_short_sliders_time(&two_sliders(), 50.0);
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn test_reinterpret_drops_short_slider_tail() {
        let data = reinterpret_short_sliders(&two_sliders(), 50.0, 36.5);

        let note0: Vec<_> = data.rows.iter().filter(|r| r.note == 0).collect();
        assert_eq!(note0.len(), 1);
        assert_eq!(note0[0].action, AimpointAction::Press);

        // The long slider keeps its release.
        let note1: Vec<_> = data.rows.iter().filter(|r| r.note == 1).collect();
        assert_eq!(note1.len(), 2);
    }
}
