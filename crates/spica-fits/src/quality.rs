use serde::{Deserialize, Serialize};

/// Kepler/K2 cadence quality flags as stored in the `QUALITY` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityFlag {
    AttitudeTweak = 1,
    SafeMode = 2,
    CoarsePoint = 4,
    EarthPoint = 8,
    Argabrightening = 16,
    Desat = 32,
    ApertureCosmic = 64,
    ManualExclude = 128,
    Discontinuity = 256,
    ImpulsiveOutlier = 512,
    CollateralCosmic = 1024,
    Straylight = 2048,
    Straylight2 = 4096,
    PlanetSearchExclude = 8192,
    BadCalibrationExclude = 16384,
    InsufficientTargets = 32768,
}

impl QualityFlag {
    pub const fn bit(self) -> i64 {
        self as i64
    }
}

const DEFAULT_FLAGS: [QualityFlag; 6] = [
    QualityFlag::AttitudeTweak,
    QualityFlag::SafeMode,
    QualityFlag::CoarsePoint,
    QualityFlag::EarthPoint,
    QualityFlag::Desat,
    QualityFlag::ManualExclude,
];

const HARD_EXTRA_FLAGS: [QualityFlag; 4] = [
    QualityFlag::ApertureCosmic,
    QualityFlag::CollateralCosmic,
    QualityFlag::Straylight,
    QualityFlag::Straylight2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBitmask {
    None,
    #[default]
    Default,
    Hard,
    Hardest,
}

impl QualityBitmask {
    pub fn bits(self) -> i64 {
        let combine = |flags: &[QualityFlag]| flags.iter().fold(0, |acc, f| acc | f.bit());
        match self {
            QualityBitmask::None => 0,
            QualityBitmask::Default => combine(&DEFAULT_FLAGS),
            QualityBitmask::Hard => combine(&DEFAULT_FLAGS) | combine(&HARD_EXTRA_FLAGS),
            QualityBitmask::Hardest => i64::from(u16::MAX),
        }
    }

    /// True when the cadence should be kept.
    pub fn accepts(self, quality: i64) -> bool {
        quality & self.bits() == 0
    }
}
