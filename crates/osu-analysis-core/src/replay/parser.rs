use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beatmap::GameMode;
use crate::error::{Error, Result};
use crate::replay::{ByteReader, Keys, Mods, ReplayFrame};

/// Offset between the .NET epoch (0001-01-01) and the Unix epoch, in ticks.
const DOTNET_UNIX_OFFSET_TICKS: i64 = 621_355_968_000_000_000;

/// Ticks per second in .NET timestamps.
const DOTNET_TICKS_PER_SEC: i64 = 10_000_000;

/// Frame delta marking the RNG seed trailer appended by newer clients.
const SEED_FRAME_DELTA: i64 = -12345;

/// A parsed `.osr` replay file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub mode: GameMode,
    pub game_version: i32,
    pub beatmap_hash: String,
    pub player_name: String,
    pub replay_hash: String,
    pub count_300: u16,
    pub count_100: u16,
    pub count_50: u16,
    pub count_geki: u16,
    pub count_katu: u16,
    pub count_miss: u16,
    pub score: i32,
    pub max_combo: u16,
    pub perfect: bool,
    pub mods: Mods,
    pub life_graph: String,
    pub timestamp: DateTime<Utc>,
    pub frames: Vec<ReplayFrame>,
    pub score_id: Option<i64>,
}

impl Replay {
    /// Reads and parses a replay file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parses a replay from raw `.osr` bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut buf = ByteReader::new(data);

        let mode_byte = buf.read_u8()?;
        let mode = GameMode::from_u8(mode_byte)
            .ok_or_else(|| Error::ReplayParse(format!("Unknown game mode {}", mode_byte)))?;

        let game_version = buf.read_i32()?;
        let beatmap_hash = buf.read_osu_string()?;
        let player_name = buf.read_osu_string()?;
        let replay_hash = buf.read_osu_string()?;

        let count_300 = buf.read_u16()?;
        let count_100 = buf.read_u16()?;
        let count_50 = buf.read_u16()?;
        let count_geki = buf.read_u16()?;
        let count_katu = buf.read_u16()?;
        let count_miss = buf.read_u16()?;

        let score = buf.read_i32()?;
        let max_combo = buf.read_u16()?;
        let perfect = buf.read_u8()? != 0;
        let mods = Mods(buf.read_i32()? as u32);
        let life_graph = buf.read_osu_string()?;
        let timestamp = ticks_to_datetime(buf.read_i64()?)?;

        let compressed_len = buf.read_i32()?;
        if compressed_len < 0 {
            return Err(Error::ReplayParse(format!(
                "Negative frame data length {}",
                compressed_len
            )));
        }
        let compressed = buf.read_bytes(compressed_len as usize)?;
        let frames = parse_frames(compressed)?;

        // Online score id is absent in very old replays.
        let score_id = if buf.remaining() >= 8 {
            Some(buf.read_i64()?)
        } else {
            None
        };

        Ok(Self {
            mode,
            game_version,
            beatmap_hash,
            player_name,
            replay_hash,
            count_300,
            count_100,
            count_50,
            count_geki,
            count_katu,
            count_miss,
            score,
            max_combo,
            perfect,
            mods,
            life_graph,
            timestamp,
            frames,
            score_id,
        })
    }

    /// Total judged notes recorded in the header.
    pub fn total_hits(&self) -> u32 {
        u32::from(self.count_300)
            + u32::from(self.count_100)
            + u32::from(self.count_50)
            + u32::from(self.count_miss)
    }

    /// Header accuracy in `[0, 1]`, weighted the way the client reports it.
    pub fn accuracy(&self) -> f64 {
        let total = self.total_hits();
        if total == 0 {
            return 1.0;
        }
        let points = 300.0 * f64::from(self.count_300)
            + 100.0 * f64::from(self.count_100)
            + 50.0 * f64::from(self.count_50);
        points / (300.0 * f64::from(total))
    }

    pub fn is_mania(&self) -> bool {
        self.mode == GameMode::Mania
    }
}

fn ticks_to_datetime(ticks: i64) -> Result<DateTime<Utc>> {
    let unix_ticks = ticks - DOTNET_UNIX_OFFSET_TICKS;
    let secs = unix_ticks.div_euclid(DOTNET_TICKS_PER_SEC);
    let nanos = (unix_ticks.rem_euclid(DOTNET_TICKS_PER_SEC) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| Error::ReplayParse(format!("Timestamp out of range: {} ticks", ticks)))
}

/// Decompresses and parses the LZMA frame stream.
///
/// Frames are comma-separated `delta|x|y|keys` records; the running sum of
/// deltas gives the absolute frame time.
fn parse_frames(compressed: &[u8]) -> Result<Vec<ReplayFrame>> {
    let mut decompressed = Vec::new();
    lzma_rs::lzma_decompress(&mut &compressed[..], &mut decompressed)
        .map_err(|e| Error::ReplayDecompress(format!("{:?}", e)))?;

    let text = String::from_utf8(decompressed)
        .map_err(|e| Error::ReplayDecompress(format!("Frame stream is not UTF-8: {}", e)))?;

    let mut frames = Vec::new();
    let mut time: i64 = 0;

    for record in text.split(',') {
        if record.is_empty() {
            continue;
        }

        let mut fields = record.split('|');
        let (Some(w), Some(x), Some(y), Some(z)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::ReplayParse(format!("Malformed frame '{}'", record)));
        };

        let delta: i64 = w
            .parse()
            .map_err(|_| Error::ReplayParse(format!("Bad frame delta '{}'", w)))?;

        if delta == SEED_FRAME_DELTA {
            debug!("Skipping RNG seed frame: {}", record);
            continue;
        }

        let x: f32 = x
            .parse()
            .map_err(|_| Error::ReplayParse(format!("Bad frame x '{}'", x)))?;
        let y: f32 = y
            .parse()
            .map_err(|_| Error::ReplayParse(format!("Bad frame y '{}'", y)))?;
        let keys: u32 = z
            .parse()
            .map_err(|_| Error::ReplayParse(format!("Bad frame keys '{}'", z)))?;

        time += delta;
        frames.push(ReplayFrame {
            delta,
            time,
            x,
            y,
            keys: Keys(keys),
        });
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_to_datetime_unix_epoch() {
        let dt = ticks_to_datetime(DOTNET_UNIX_OFFSET_TICKS).unwrap();
        assert_eq!(dt.timestamp(), 0);
    }

    #[test]
    fn test_ticks_to_datetime_known_date() {
        // 2020-01-01 00:00:00 UTC = 1577836800 Unix seconds
        let ticks = DOTNET_UNIX_OFFSET_TICKS + 1_577_836_800 * DOTNET_TICKS_PER_SEC;
        let dt = ticks_to_datetime(ticks).unwrap();
        assert_eq!(dt.timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_parse_frames_accumulates_time() {
        let text = "0|256|192|0,16|260|190|1,15|264|188|1,";
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut text.as_bytes(), &mut compressed).unwrap();

        let frames = parse_frames(&compressed).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].time, 0);
        assert_eq!(frames[1].time, 16);
        assert_eq!(frames[2].time, 31);
        assert!(frames[1].keys.m1());
    }

    #[test]
    fn test_parse_frames_drops_seed() {
        let text = "0|256|192|0,-12345|0|0|12345678,";
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut text.as_bytes(), &mut compressed).unwrap();

        let frames = parse_frames(&compressed).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_parse_frames_bad_record() {
        let text = "0|256|192,";
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut text.as_bytes(), &mut compressed).unwrap();

        assert!(parse_frames(&compressed).is_err());
    }

    #[test]
    fn test_from_bytes_truncated() {
        let data = [0x00, 0x01];
        assert!(Replay::from_bytes(&data).is_err());
    }

    #[test]
    fn test_accuracy_all_300() {
        let replay = test_replay(100, 0, 0, 0);
        assert!((replay.accuracy() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_mixed() {
        let replay = test_replay(50, 50, 0, 0);
        // (50*300 + 50*100) / (100*300)
        assert!((replay.accuracy() - 2.0 / 3.0).abs() < 1e-9);
    }

    fn test_replay(n300: u16, n100: u16, n50: u16, miss: u16) -> Replay {
        Replay {
            mode: GameMode::Osu,
            game_version: 20200101,
            beatmap_hash: String::new(),
            player_name: "test".to_string(),
            replay_hash: String::new(),
            count_300: n300,
            count_100: n100,
            count_50: n50,
            count_geki: 0,
            count_katu: 0,
            count_miss: miss,
            score: 0,
            max_combo: 0,
            perfect: false,
            mods: Mods(0),
            life_graph: String::new(),
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            frames: Vec::new(),
            score_id: None,
        }
    }
}
