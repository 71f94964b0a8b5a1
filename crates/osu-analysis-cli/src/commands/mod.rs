//! CLI command implementations.

pub mod mania;
pub mod map;
pub mod replay;
pub mod score;
