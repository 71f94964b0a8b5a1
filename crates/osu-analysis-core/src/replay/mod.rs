//! `.osr` replay file parsing.
//!
//! A replay file is a sequence of little-endian primitives and
//! ULEB128-prefixed strings, followed by an LZMA-compressed frame stream.
//! `Replay::from_path` reads the whole file in one pass.

mod bytes;
mod frame;
mod mods;
mod parser;

pub use bytes::ByteReader;
pub use frame::{Keys, ReplayFrame};
pub use mods::Mods;
pub use parser::Replay;
