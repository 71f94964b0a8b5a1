//! Score command: align a standard replay against its beatmap.

use std::path::Path;

use anyhow::{Result, bail};
use osu_analysis_core::standard::{
    HitType, ScoreSettings, StdMapData, StdReplayData, StdScoreData,
};
use osu_analysis_core::{Beatmap, GameMode, Replay};
use owo_colors::OwoColorize;
use tracing::{info, warn};

pub fn run(map_path: &Path, replay_path: &Path, json: bool, summary: bool) -> Result<()> {
    let map = Beatmap::from_path(map_path)?;
    let replay = Replay::from_path(replay_path)?;

    if map.mode != GameMode::Osu {
        warn!("Beatmap {:?} has mode {}", map_path, map.mode);
        bail!("'{}' is not an osu!standard beatmap", map.name());
    }
    if replay.mode != GameMode::Osu {
        warn!("Replay {:?} has mode {}", replay_path, replay.mode);
        bail!("replay by {} is not an osu!standard play", replay.player_name);
    }

    let map_data = StdMapData::from_beatmap(&map);
    let replay_data = StdReplayData::from_frames(&replay.frames);
    let score = StdScoreData::compute(&replay_data, &map_data, &ScoreSettings::default())?;
    info!(
        "Aligned {} replay events against {} scorepoints",
        score.events.len(),
        map_data.rows.len()
    );

    if summary {
        print!("{}", format_summary(&map, &replay, &score));
        println!();
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&score.events)?);
        return Ok(());
    }

    println!("replay_t\tmap_t\treplay_x\treplay_y\tmap_x\tmap_y\ttype");
    for event in &score.events {
        println!(
            "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
            event.replay_time,
            event.map_time,
            event.replay_x,
            event.replay_y,
            event.map_x,
            event.map_y,
            event.hit_type.short_name()
        );
    }
    Ok(())
}

fn format_summary(map: &Beatmap, replay: &Replay, score: &StdScoreData) -> String {
    use std::fmt::Write as _;

    let border = "━".repeat(50);
    let border = border.dimmed();
    let mut out = String::new();

    let _ = writeln!(out, "{}", border);
    let _ = writeln!(out, "  {} - {}", replay.player_name.bold(), map.name());
    let _ = writeln!(out, "{}", border);
    let _ = writeln!(
        out,
        "  HITS   : {} press / {} release / {} hold",
        score.num_hits(HitType::HitPress).green(),
        score.num_hits(HitType::HitRelease).green(),
        score.num_hits(HitType::AimHold).cyan(),
    );
    let _ = writeln!(
        out,
        "  MISSES : {} ({} empty)",
        score.num_hits(HitType::Miss).red(),
        score.num_hits(HitType::Empty),
    );
    let _ = writeln!(
        out,
        "  TAP    : {:+.2} ms mean, {:.2} ms stdev",
        score.tap_offset_mean(),
        score.tap_offset_stdev(),
    );
    let _ = writeln!(
        out,
        "  AIM    : {:.2} px mean, {:.2} px stdev",
        score.cursor_pos_offset_mean(),
        score.cursor_pos_offset_stdev(),
    );
    let _ = writeln!(
        out,
        "  ODDS   : {:.4} all taps within 20ms",
        score.odds_all_tap_within(20.0),
    );
    let _ = write!(out, "{}", border);

    out
}
