use tracing::warn;

use crate::error::{Error, Result};

use super::hitobject::{type_flags, CurveKind, HitObject, HitObjectKind, SliderCurve};
use super::timing::TimingPoint;
use super::{Beatmap, DifficultySettings, GameMode, Metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    General,
    Metadata,
    Difficulty,
    TimingPoints,
    HitObjects,
    Other,
}

pub fn parse_beatmap(text: &str) -> Result<Beatmap> {
    let mut format_version = 14;
    let mut mode = GameMode::Osu;
    let mut metadata = Metadata::default();
    let mut difficulty = DifficultySettings::default();
    let mut approach_rate: Option<f32> = None;
    let mut timing_points: Vec<TimingPoint> = Vec::new();
    let mut hit_objects: Vec<HitObject> = Vec::new();

    let mut section = Section::None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if section == Section::None && line.starts_with("osu file format v") {
            let version = line.trim_start_matches("osu file format v");
            format_version = version.parse().map_err(|_| Error::BeatmapParse {
                line: line_no,
                message: format!("invalid format version: {version}"),
            })?;
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = match &line[1..line.len() - 1] {
                "General" => Section::General,
                "Metadata" => Section::Metadata,
                "Difficulty" => Section::Difficulty,
                "TimingPoints" => Section::TimingPoints,
                "HitObjects" => Section::HitObjects,
                _ => Section::Other,
            };
            continue;
        }

        match section {
            Section::General => {
                let Some((key, value)) = split_key_value(line) else {
                    continue;
                };
                if key == "Mode" {
                    let raw: u8 = value.parse().map_err(|_| Error::BeatmapParse {
                        line: line_no,
                        message: format!("invalid mode: {value}"),
                    })?;
                    mode = GameMode::from_u8(raw).ok_or_else(|| Error::BeatmapParse {
                        line: line_no,
                        message: format!("unknown mode: {raw}"),
                    })?;
                }
            }
            Section::Metadata => {
                let Some((key, value)) = split_key_value(line) else {
                    continue;
                };
                match key {
                    "Title" => metadata.title = value.to_string(),
                    "Artist" => metadata.artist = value.to_string(),
                    "Creator" => metadata.creator = value.to_string(),
                    "Version" => metadata.version = value.to_string(),
                    "BeatmapID" => metadata.beatmap_id = value.parse().ok(),
                    "BeatmapSetID" => metadata.beatmap_set_id = value.parse().ok(),
                    _ => {}
                }
            }
            Section::Difficulty => {
                let Some((key, value)) = split_key_value(line) else {
                    continue;
                };
                let parsed = value.parse::<f32>().map_err(|_| Error::BeatmapParse {
                    line: line_no,
                    message: format!("invalid {key}: {value}"),
                })?;
                match key {
                    "HPDrainRate" => difficulty.hp = parsed,
                    "CircleSize" => difficulty.cs = parsed,
                    "OverallDifficulty" => difficulty.od = parsed,
                    "ApproachRate" => approach_rate = Some(parsed),
                    "SliderMultiplier" => difficulty.slider_multiplier = f64::from(parsed),
                    "SliderTickRate" => difficulty.slider_tick_rate = f64::from(parsed),
                    _ => {}
                }
            }
            Section::TimingPoints => {
                timing_points.push(parse_timing_point(line, line_no)?);
            }
            Section::HitObjects => {
                hit_objects.push(parse_hit_object(line, line_no)?);
            }
            Section::None | Section::Other => {}
        }
    }

    if hit_objects.is_empty() {
        return Err(Error::EmptyBeatmap);
    }

    // Old format versions omit ApproachRate and use OverallDifficulty.
    difficulty.ar = approach_rate.unwrap_or(difficulty.od);

    hit_objects.sort_by(|a, b| a.time.total_cmp(&b.time));
    timing_points.sort_by(|a, b| a.time.total_cmp(&b.time));

    Ok(Beatmap {
        format_version,
        mode,
        metadata,
        difficulty,
        timing_points,
        hit_objects,
    })
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

fn parse_timing_point(line: &str, line_no: usize) -> Result<TimingPoint> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        return Err(Error::BeatmapParse {
            line: line_no,
            message: format!("timing point needs at least 2 fields: {line}"),
        });
    }

    let time = parse_f64(fields[0], line_no, "timing point time")?;
    let beat_length = parse_f64(fields[1], line_no, "beat length")?;
    let meter = fields
        .get(2)
        .and_then(|f| f.trim().parse().ok())
        .unwrap_or(4);
    // Field 7 flags the point as uninherited; old two-field rows are
    // always uninherited.
    let uninherited = match fields.get(6) {
        Some(f) => f.trim() == "1",
        None => true,
    };

    Ok(TimingPoint {
        time,
        beat_length,
        meter,
        uninherited,
    })
}

fn parse_hit_object(line: &str, line_no: usize) -> Result<HitObject> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        return Err(Error::BeatmapParse {
            line: line_no,
            message: format!("hit object needs at least 4 fields: {line}"),
        });
    }

    let x = parse_f64(fields[0], line_no, "x")? as f32;
    let y = parse_f64(fields[1], line_no, "y")? as f32;
    let time = parse_f64(fields[2], line_no, "time")?;
    let type_bits: u32 = fields[3].trim().parse().map_err(|_| Error::BeatmapParse {
        line: line_no,
        message: format!("invalid type bits: {}", fields[3]),
    })?;
    let new_combo = type_bits & type_flags::NEW_COMBO != 0;

    let kind = if type_bits & type_flags::CIRCLE != 0 {
        HitObjectKind::Circle
    } else if type_bits & type_flags::SLIDER != 0 {
        parse_slider_params(&fields, x, y, line_no)?
    } else if type_bits & type_flags::SPINNER != 0 {
        let end_time = fields
            .get(5)
            .map(|f| parse_f64(f, line_no, "spinner end time"))
            .transpose()?
            .unwrap_or(time);
        HitObjectKind::Spinner { end_time }
    } else if type_bits & type_flags::MANIA_HOLD != 0 {
        // Hold end time is the part before the first colon of field 5.
        let end_field = fields.get(5).ok_or_else(|| Error::BeatmapParse {
            line: line_no,
            message: "hold note missing end time".to_string(),
        })?;
        let end_str = end_field.split(':').next().unwrap_or(end_field);
        let end_time = parse_f64(end_str, line_no, "hold end time")?;
        HitObjectKind::Hold { end_time }
    } else {
        return Err(Error::BeatmapParse {
            line: line_no,
            message: format!("unrecognized hit object type: {type_bits}"),
        });
    };

    Ok(HitObject {
        time,
        x,
        y,
        new_combo,
        kind,
    })
}

fn parse_slider_params(fields: &[&str], x: f32, y: f32, line_no: usize) -> Result<HitObjectKind> {
    let curve_field = fields.get(5).ok_or_else(|| Error::BeatmapParse {
        line: line_no,
        message: "slider missing curve data".to_string(),
    })?;

    let mut parts = curve_field.split('|');
    let kind_str = parts.next().unwrap_or("");
    let kind = kind_str
        .chars()
        .next()
        .and_then(CurveKind::from_char)
        .ok_or_else(|| Error::BeatmapParse {
            line: line_no,
            message: format!("unknown curve type: {kind_str}"),
        })?;

    let mut points = vec![(x, y)];
    for part in parts {
        let (px, py) = part.split_once(':').ok_or_else(|| Error::BeatmapParse {
            line: line_no,
            message: format!("invalid curve point: {part}"),
        })?;
        let px = parse_f64(px, line_no, "curve point x")? as f32;
        let py = parse_f64(py, line_no, "curve point y")? as f32;
        points.push((px, py));
    }

    let spans: u32 = fields
        .get(6)
        .and_then(|f| f.trim().parse().ok())
        .unwrap_or(1);
    let pixel_length = match fields.get(7) {
        Some(f) => parse_f64(f, line_no, "slider length")?,
        None => {
            warn!(line = line_no, "slider without pixel length, assuming 0");
            0.0
        }
    };

    Ok(HitObjectKind::Slider {
        curve: SliderCurve { kind, points },
        spans: spans.max(1),
        pixel_length,
    })
}

fn parse_f64(field: &str, line_no: usize, what: &str) -> Result<f64> {
    field.trim().parse().map_err(|_| Error::BeatmapParse {
        line: line_no,
        message: format!("invalid {what}: {field}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_MAP: &str = "osu file format v14\n\
\n\
[General]\n\
AudioFilename: audio.mp3\n\
Mode: 0\n\
\n\
[Metadata]\n\
Title:Test Song\n\
Artist:Test Artist\n\
Creator:mapper\n\
Version:Insane\n\
BeatmapID:123456\n\
\n\
[Difficulty]\n\
HPDrainRate:5\n\
CircleSize:4\n\
OverallDifficulty:8\n\
ApproachRate:9\n\
SliderMultiplier:1.6\n\
SliderTickRate:1\n\
\n\
[TimingPoints]\n\
0,400,4,2,0,60,1,0\n\
1000,-50,4,2,0,60,0,0\n\
\n\
[HitObjects]\n\
256,192,500,1,0,0:0:0:0:\n\
100,100,1000,2,0,L|200:100,1,100\n\
256,192,2000,12,0,3000,0:0:0:0:\n";

    #[test]
    fn test_parse_minimal_map() {
        let map = parse_beatmap(MINIMAL_MAP).unwrap();
        assert_eq!(map.format_version, 14);
        assert_eq!(map.mode, GameMode::Osu);
        assert_eq!(map.metadata.title, "Test Song");
        assert_eq!(map.metadata.beatmap_id, Some(123456));
        assert_eq!(map.difficulty.od, 8.0);
        assert_eq!(map.difficulty.ar, 9.0);
        assert_eq!(map.difficulty.slider_multiplier, 1.6);
        assert_eq!(map.timing_points.len(), 2);
        assert_eq!(map.hit_objects.len(), 3);
    }

    #[test]
    fn test_parse_hit_object_kinds() {
        let map = parse_beatmap(MINIMAL_MAP).unwrap();
        assert!(map.hit_objects[0].is_circle());
        assert!(map.hit_objects[1].is_slider());
        assert!(map.hit_objects[2].is_spinner());

        if let HitObjectKind::Slider {
            curve,
            spans,
            pixel_length,
        } = &map.hit_objects[1].kind
        {
            assert_eq!(curve.kind, CurveKind::Linear);
            assert_eq!(curve.points, vec![(100.0, 100.0), (200.0, 100.0)]);
            assert_eq!(*spans, 1);
            assert_eq!(*pixel_length, 100.0);
        } else {
            panic!("expected slider");
        }
    }

    #[test]
    fn test_ar_defaults_to_od() {
        let text = MINIMAL_MAP.replace("ApproachRate:9\n", "");
        let map = parse_beatmap(&text).unwrap();
        assert_eq!(map.difficulty.ar, 8.0);
    }

    #[test]
    fn test_empty_beatmap_rejected() {
        let text = "osu file format v14\n[HitObjects]\n";
        assert!(matches!(parse_beatmap(text), Err(Error::EmptyBeatmap)));
    }

    #[test]
    fn test_hit_objects_sorted_by_time() {
        let text = "osu file format v14\n\
[HitObjects]\n\
0,0,2000,1,0\n\
0,0,1000,1,0\n";
        let map = parse_beatmap(text).unwrap();
        assert_eq!(map.hit_objects[0].time, 1000.0);
        assert_eq!(map.hit_objects[1].time, 2000.0);
    }

    #[test]
    fn test_mania_hold_parsing() {
        let text = "osu file format v14\n\
[General]\n\
Mode: 3\n\
[Difficulty]\n\
CircleSize:4\n\
[HitObjects]\n\
64,192,1000,128,0,2000:0:0:0:0:\n";
        let map = parse_beatmap(text).unwrap();
        assert_eq!(map.mode, GameMode::Mania);
        assert_eq!(
            map.hit_objects[0].kind,
            HitObjectKind::Hold { end_time: 2000.0 }
        );
    }

    #[test]
    fn test_invalid_line_reports_position() {
        let text = "osu file format v14\n\
[HitObjects]\n\
not,a,hit,object\n";
        let err = parse_beatmap(text).unwrap_err();
        match err {
            Error::BeatmapParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
