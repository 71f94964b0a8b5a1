//! Core analysis library for osu! game files.
//!
//! Parses `.osu` beatmaps and `.osr` replays into tabular data, aligns
//! replay inputs against map scorepoints to classify hits and misses,
//! and derives timing and cursor statistics from the result.

pub mod beatmap;
pub mod error;
pub mod kinematics;
pub mod mania;
pub mod replay;
pub mod standard;

pub use beatmap::{Beatmap, DifficultySettings, GameMode, HitObject, Metadata, TimingPoint};
pub use error::{Error, Result};
pub use mania::{ManiaActionData, ManiaScoreData, ManiaScoreSettings};
pub use replay::{Keys, Mods, Replay, ReplayFrame};
pub use standard::{
    HitType, ScoreEvent, ScoreSettings, StdMapData, StdReplayData, StdScoreData,
};
