//! osu!mania analysis: per-column action matrices, replay-to-map
//! alignment, and judgement probability modelling.

pub mod action_data;
pub mod map_metrics;
pub mod score_data;

pub use action_data::{ActionRow, ManiaActionData};
pub use score_data::{
    ManiaScoreData, ManiaScoreEvent, ManiaScoreSettings, model_ideal_acc, model_num_hits,
    model_offset_prob,
};
