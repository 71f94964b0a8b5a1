use serde::{Deserialize, Serialize};

/// Key bitmask recorded in a replay frame.
///
/// M1/M2 are mouse buttons, K1/K2 are keyboard keys. The client sets the
/// mouse bit together with the keyboard bit when a keyboard key is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Keys(pub u32);

impl Keys {
    pub const M1: u32 = 1 << 0;
    pub const M2: u32 = 1 << 1;
    pub const K1: u32 = 1 << 2;
    pub const K2: u32 = 1 << 3;
    pub const SMOKE: u32 = 1 << 4;

    pub fn m1(self) -> bool {
        self.0 & Self::M1 != 0
    }

    pub fn m2(self) -> bool {
        self.0 & Self::M2 != 0
    }

    pub fn k1(self) -> bool {
        self.0 & Self::K1 != 0
    }

    pub fn k2(self) -> bool {
        self.0 & Self::K2 != 0
    }

    pub fn smoke(self) -> bool {
        self.0 & Self::SMOKE != 0
    }

    /// True if any button other than smoke is down.
    pub fn any_button(self) -> bool {
        self.0 & (Self::M1 | Self::M2 | Self::K1 | Self::K2) != 0
    }

    /// True if the mania column `col` is held (frames store the column
    /// bitmask in place of the key flags for mania replays). Columns
    /// past the bitmask width read as released.
    pub fn column(self, col: usize) -> bool {
        col < u32::BITS as usize && self.0 & (1 << col) != 0
    }
}

/// A single input event from the replay frame stream.
///
/// `time` is the absolute time in ms accumulated from the per-frame deltas.
/// For mania replays `x` carries the column bitmask and `y` is unused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub delta: i64,
    pub time: i64,
    pub x: f32,
    pub y: f32,
    pub keys: Keys,
}
