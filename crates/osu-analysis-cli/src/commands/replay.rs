//! Replay command: parse a replay and print its frame table or header.

use std::path::Path;

use anyhow::Result;
use osu_analysis_core::Replay;
use owo_colors::OwoColorize;
use tracing::info;

pub fn run(file: &Path, json: bool, summary: bool) -> Result<()> {
    let replay = Replay::from_path(file)?;
    info!(
        "Loaded replay by {} ({} frames) from {:?}",
        replay.player_name,
        replay.frames.len(),
        file
    );

    if summary {
        print!("{}", format_summary(&replay));
        println!();
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&replay)?);
        return Ok(());
    }

    println!("time\tx\ty\tkeys");
    for frame in &replay.frames {
        println!("{}\t{}\t{}\t{}", frame.time, frame.x, frame.y, frame.keys.0);
    }
    Ok(())
}

fn format_summary(replay: &Replay) -> String {
    use std::fmt::Write as _;

    let border = "━".repeat(50);
    let border = border.dimmed();
    let mut out = String::new();

    let _ = writeln!(out, "{}", border);
    let _ = writeln!(
        out,
        "  {} [{} mode]",
        replay.player_name.bold(),
        replay.mode
    );
    let _ = writeln!(out, "{}", border);
    let _ = writeln!(out, "  DATE   : {}", replay.timestamp);
    let _ = writeln!(out, "  SCORE  : {} (combo {})", replay.score, replay.max_combo);
    let _ = writeln!(
        out,
        "  JUDGE  : {}/{}/{}/{}",
        replay.count_300.cyan(),
        replay.count_100.green(),
        replay.count_50.yellow(),
        replay.count_miss.red(),
    );
    let _ = writeln!(
        out,
        "  ACC    : {:.2}%",
        100.0 * replay.accuracy()
    );
    let _ = writeln!(out, "  MODS   : {}", replay.mods);
    let _ = writeln!(out, "  FRAMES : {}", replay.frames.len());
    let _ = write!(out, "{}", border);

    out
}
