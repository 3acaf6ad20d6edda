//! Volume scale conversion
//!
//! The player stores volume as a fraction in [0, 1]; the engine takes an
//! integer percentage in 0..=100.

/// Maximum engine-scale volume
pub const ENGINE_VOLUME_MAX: u8 = 100;

/// Validated volume fraction in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Volume(f64);

impl Volume {
    pub const FULL: Volume = Volume(1.0);

    /// Returns `None` for values outside [0, 1] (NaN included)
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// `round(volume * 100)`
    pub fn to_engine(self) -> u8 {
        (self.0 * f64::from(ENGINE_VOLUME_MAX)).round() as u8
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::FULL
    }
}
