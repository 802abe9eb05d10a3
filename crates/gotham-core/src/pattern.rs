//! Pure mapping from a [`Stimulus`] to a [`CelebrationPattern`].
//!
//! Nothing here performs I/O. Payment amounts select a [`Tier`] by inclusive
//! lower bound; subscriber milestones are first converted to a dollar
//! equivalent and then reuse the same tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DeviceError;
use crate::milestone;
use crate::stimulus::{Stimulus, StimulusKind};

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const GOLD: Rgb = Rgb::new(255, 215, 0);
    pub const PURPLE: Rgb = Rgb::new(138, 43, 226);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0xRRGGBB`, the vendor's wire format.
    pub fn to_packed(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn from_packed(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parses `#rrggbb` or `rrggbb`.
impl FromStr for Rgb {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DeviceError::InvalidInput(format!(
                "color must be #rrggbb, got {s:?}"
            )));
        }
        let packed = u32::from_str_radix(hex, 16)
            .map_err(|e| DeviceError::InvalidInput(format!("color {s:?}: {e}")))?;
        Ok(Rgb::from_packed(packed))
    }
}

// ---------------------------------------------------------------------------
// Steps and patterns
// ---------------------------------------------------------------------------

/// One timed frame of a celebration. A brightness of 0 is an off-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternStep {
    pub color: Rgb,
    pub brightness: u8,
    #[serde(rename = "hold_secs", with = "secs")]
    pub hold: Duration,
}

impl PatternStep {
    pub const fn new(color: Rgb, brightness: u8, hold_ms: u64) -> Self {
        Self {
            color,
            brightness,
            hold: Duration::from_millis(hold_ms),
        }
    }

    pub fn is_off(&self) -> bool {
        self.brightness == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelebrationPattern {
    pub name: String,
    #[serde(rename = "total_duration_secs", with = "secs")]
    pub total_duration: Duration,
    pub steps: Vec<PatternStep>,
}

impl CelebrationPattern {
    /// Duration of a single pass over the steps.
    pub fn cycle_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.hold).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Mini,
    Standard,
    Major,
    Premium,
}

impl Tier {
    /// Highest tier whose inclusive lower bound is met. Negative and
    /// non-finite amounts fall through to `Mini`.
    pub fn for_amount(amount: f64) -> Tier {
        if amount >= 100.0 {
            Tier::Premium
        } else if amount >= 50.0 {
            Tier::Major
        } else if amount >= 20.0 {
            Tier::Standard
        } else {
            Tier::Mini
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Mini => "Mini",
            Tier::Standard => "Standard",
            Tier::Major => "Major",
            Tier::Premium => "Premium",
        }
    }

    pub fn pattern(self) -> CelebrationPattern {
        let (secs, steps) = match self {
            Tier::Premium => (
                30,
                vec![
                    PatternStep::new(Rgb::GOLD, 100, 2_000),
                    PatternStep::new(Rgb::PURPLE, 100, 2_000),
                    PatternStep::new(Rgb::WHITE, 100, 1_000),
                    PatternStep::new(Rgb::GOLD, 100, 2_000),
                ],
            ),
            Tier::Major => (
                20,
                vec![
                    PatternStep::new(Rgb::GREEN, 100, 2_000),
                    PatternStep::new(Rgb::YELLOW, 100, 2_000),
                    PatternStep::new(Rgb::WHITE, 100, 1_000),
                ],
            ),
            Tier::Standard => (
                15,
                vec![
                    PatternStep::new(Rgb::GREEN, 80, 3_000),
                    PatternStep::new(Rgb::WHITE, 80, 1_000),
                ],
            ),
            Tier::Mini => (
                10,
                vec![
                    PatternStep::new(Rgb::GREEN, 60, 2_000),
                    PatternStep::new(Rgb::WHITE, 60, 1_000),
                ],
            ),
        };
        CelebrationPattern {
            name: self.name().to_string(),
            total_duration: Duration::from_secs(secs),
            steps,
        }
    }
}

pub const CALENDAR_PATTERN_NAME: &str = "Calendar Reminder";

fn calendar_pattern() -> CelebrationPattern {
    CelebrationPattern {
        name: CALENDAR_PATTERN_NAME.to_string(),
        total_duration: Duration::from_secs(10),
        steps: vec![
            PatternStep::new(Rgb::BLUE, 100, 2_000),
            PatternStep::new(Rgb::BLACK, 0, 1_000),
        ],
    }
}

/// Pattern for a payment-sized amount.
pub fn for_amount(amount: f64) -> CelebrationPattern {
    Tier::for_amount(amount).pattern()
}

/// Select the pattern a stimulus should play.
pub fn select(stimulus: &Stimulus) -> CelebrationPattern {
    match stimulus.kind {
        StimulusKind::Payment => for_amount(stimulus.magnitude),
        StimulusKind::SubscriberMilestone => {
            let threshold = if stimulus.magnitude.is_finite() && stimulus.magnitude > 0.0 {
                stimulus.magnitude as u64
            } else {
                0
            };
            // Thresholds outside the table fall back to the Mini tier.
            let amount = milestone::amount_for_threshold(threshold).unwrap_or(0.0);
            for_amount(amount)
        }
        StimulusKind::CalendarEvent => calendar_pattern(),
    }
}

/// Serialize a `Duration` as fractional seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
