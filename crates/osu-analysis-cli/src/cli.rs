//! CLI argument definitions for osu-analysis.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "osu-analysis")]
#[command(about = "osu! beatmap and replay analysis", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a beatmap and print its scorepoint table
    Map {
        /// Path to the .osu file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a replay and print its input event table
    Replay {
        /// Path to the .osr file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print header metadata instead of the frame table
        #[arg(long)]
        summary: bool,
    },
    /// Score a standard replay against its beatmap
    Score {
        /// Path to the .osu file
        #[arg(short, long)]
        map: PathBuf,
        /// Path to the .osr file
        #[arg(short, long)]
        replay: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print hit counts and offset statistics instead of the table
        #[arg(long)]
        summary: bool,
    },
    /// Score a mania replay against its beatmap
    ManiaScore {
        /// Path to the .osu file
        #[arg(short, long)]
        map: PathBuf,
        /// Path to the .osr file
        #[arg(short, long)]
        replay: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print hit counts and offset statistics instead of the table
        #[arg(long)]
        summary: bool,
    },
}
