use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read buffer at position {position}: {message}")]
    BufferReadFailed { position: usize, message: String },

    #[error("Invalid replay file: {0}")]
    ReplayParse(String),

    #[error("Failed to decompress replay frames: {0}")]
    ReplayDecompress(String),

    #[error("Invalid beatmap file (line {line}): {message}")]
    BeatmapParse { line: usize, message: String },

    #[error("Beatmap has no hit objects")]
    EmptyBeatmap,

    #[error("Not an osu!mania beatmap or replay")]
    NotMania,

    #[error("Unsupported key count: {0} (mania plays use 1-18 keys)")]
    InvalidKeyCount(usize),

    #[error("Column count mismatch: map has {map} columns, replay has {replay}")]
    ColumnMismatch { map: usize, replay: usize },

    #[error("Invalid column action sequence at column {column}, row {row}: {message}")]
    InvalidActionSequence {
        column: usize,
        row: usize,
        message: String,
    },

    #[error("Invalid score settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
