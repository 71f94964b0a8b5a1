use std::fmt;

use serde::{Deserialize, Serialize};

/// Mod bitmask from the `.osr` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mods(pub u32);

impl Mods {
    pub const NO_FAIL: u32 = 1 << 0;
    pub const EASY: u32 = 1 << 1;
    pub const TOUCH_DEVICE: u32 = 1 << 2;
    pub const HIDDEN: u32 = 1 << 3;
    pub const HARD_ROCK: u32 = 1 << 4;
    pub const SUDDEN_DEATH: u32 = 1 << 5;
    pub const DOUBLE_TIME: u32 = 1 << 6;
    pub const RELAX: u32 = 1 << 7;
    pub const HALF_TIME: u32 = 1 << 8;
    pub const NIGHTCORE: u32 = 1 << 9;
    pub const FLASHLIGHT: u32 = 1 << 10;
    pub const AUTOPLAY: u32 = 1 << 11;
    pub const SPUN_OUT: u32 = 1 << 12;
    pub const AUTOPILOT: u32 = 1 << 13;
    pub const PERFECT: u32 = 1 << 14;

    const NAMES: [(u32, &'static str); 15] = [
        (Self::NO_FAIL, "NF"),
        (Self::EASY, "EZ"),
        (Self::TOUCH_DEVICE, "TD"),
        (Self::HIDDEN, "HD"),
        (Self::HARD_ROCK, "HR"),
        (Self::SUDDEN_DEATH, "SD"),
        (Self::DOUBLE_TIME, "DT"),
        (Self::RELAX, "RX"),
        (Self::HALF_TIME, "HT"),
        (Self::NIGHTCORE, "NC"),
        (Self::FLASHLIGHT, "FL"),
        (Self::AUTOPLAY, "AT"),
        (Self::SPUN_OUT, "SO"),
        (Self::AUTOPILOT, "AP"),
        (Self::PERFECT, "PF"),
    ];

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Playback rate implied by the speed mods.
    pub fn speed_multiplier(self) -> f64 {
        if self.contains(Self::DOUBLE_TIME) || self.contains(Self::NIGHTCORE) {
            1.5
        } else if self.contains(Self::HALF_TIME) {
            0.75
        } else {
            1.0
        }
    }
}

impl fmt::Display for Mods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "None");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}
