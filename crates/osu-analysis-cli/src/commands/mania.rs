//! Mania score command: align a mania replay against its beatmap.

use std::path::Path;

use anyhow::Result;
use osu_analysis_core::mania::{ManiaActionData, ManiaScoreData, ManiaScoreSettings};
use osu_analysis_core::standard::HitType;
use osu_analysis_core::{Beatmap, Replay};
use owo_colors::OwoColorize;
use tracing::info;

pub fn run(map_path: &Path, replay_path: &Path, json: bool, summary: bool) -> Result<()> {
    let map = Beatmap::from_path(map_path)?;
    let replay = Replay::from_path(replay_path)?;
    info!(
        "Loaded {}K beatmap and replay by {}",
        map.column_count(),
        replay.player_name
    );

    let map_data = ManiaActionData::from_beatmap(&map)?;
    let replay_data = ManiaActionData::from_replay(&replay, map.column_count())?;
    let score = ManiaScoreData::compute(&map_data, &replay_data, &ManiaScoreSettings::default())?;
    info!("Scored {} events across {} columns", score.events.len(), map.column_count());

    if summary {
        print!("{}", format_summary(&map, &replay, &score));
        println!();
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&score.events)?);
        return Ok(());
    }

    println!("replay_t\tmap_t\tcol\ttype");
    for event in &score.events {
        let map_t = event
            .map_time
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        println!(
            "{}\t{}\t{}\t{}",
            event.replay_time,
            map_t,
            event.column,
            event.hit_type.short_name()
        );
    }
    Ok(())
}

fn format_summary(map: &Beatmap, replay: &Replay, score: &ManiaScoreData) -> String {
    use std::fmt::Write as _;

    let border = "━".repeat(50);
    let border = border.dimmed();
    let mut out = String::new();

    let _ = writeln!(out, "{}", border);
    let _ = writeln!(
        out,
        "  {} - {} [{}K]",
        replay.player_name.bold(),
        map.name(),
        map.column_count()
    );
    let _ = writeln!(out, "{}", border);
    let _ = writeln!(
        out,
        "  HITS   : {} press / {} release",
        score.num_hits(HitType::HitPress).green(),
        score.num_hits(HitType::HitRelease).green(),
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
        "  MODEL  : {:.2}% ideal acc (OD8)",
        100.0 * score.model_ideal_acc_data(),
    );
    let _ = write!(out, "{}", border);

    out
}
