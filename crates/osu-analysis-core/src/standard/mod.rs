//! Standard gamemode analysis: aimpoint tables, replay action tables,
//! the score alignment engine, and metrics over each.

pub mod map_data;
pub mod map_metrics;
pub mod map_patterns;
pub mod replay_data;
pub mod replay_metrics;
pub mod score_data;
pub mod score_metrics;

pub use map_data::{Aimpoint, AimpointAction, NoteKind, StdMapData};
pub use replay_data::{ActionEvent, KeyAction, ReducedEvent, StdReplayData};
pub use score_data::{HitType, ScoreEvent, ScoreSettings, StdScoreData};
pub use score_metrics::PerNoteOffsets;
