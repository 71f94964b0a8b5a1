mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("osu_analysis_cli=warn,osu_analysis_core=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match args.command {
        Command::Map { file, json } => commands::map::run(&file, json),
        Command::Replay {
            file,
            json,
            summary,
        } => commands::replay::run(&file, json, summary),
        Command::Score {
            map,
            replay,
            json,
            summary,
        } => commands::score::run(&map, &replay, json, summary),
        Command::ManiaScore {
            map,
            replay,
            json,
            summary,
        } => commands::mania::run(&map, &replay, json, summary),
    }
}
