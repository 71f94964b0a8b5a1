//! Map command: parse a beatmap and print its scorepoint table.

use std::path::Path;

use anyhow::Result;
use osu_analysis_core::Beatmap;
use osu_analysis_core::mania::ManiaActionData;
use osu_analysis_core::standard::StdMapData;
use tracing::info;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let map = Beatmap::from_path(file)?;
    info!("Loaded beatmap from {:?}", file);
    eprintln!("{} [{} mode, {} objects]", map.name(), map.mode, map.hit_objects.len());

    if map.is_mania() {
        print_mania(&map, json)
    } else {
        print_standard(&map, json)
    }
}

fn print_standard(map: &Beatmap, json: bool) -> Result<()> {
    let data = StdMapData::from_beatmap(map);

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("note\ttime\tx\ty\taction\tkind");
    for row in &data.rows {
        println!(
            "{}\t{}\t{:.2}\t{:.2}\t{:?}\t{:?}",
            row.note, row.time, row.x, row.y, row.action, row.kind
        );
    }
    Ok(())
}

fn print_mania(map: &Beatmap, json: bool) -> Result<()> {
    let data = ManiaActionData::from_beatmap(map)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let columns: Vec<String> = (0..data.num_keys()).map(|c| format!("col{}", c)).collect();
    println!("time\t{}", columns.join("\t"));
    for row in &data.rows {
        let states: Vec<String> = row.states.iter().map(|s| (*s as u8).to_string()).collect();
        println!("{}\t{}", row.time, states.join("\t"));
    }
    Ok(())
}
