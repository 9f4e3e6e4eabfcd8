//! Thumbnail encoding ladder settings.
//!
//! Quality follows the FFmpeg `-qscale:v` convention: lower values mean
//! higher visual fidelity and larger files.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Best quality the ladder ever asks for.
pub const MIN_QUALITY: u8 = 3;
/// Worst quality the ladder ever asks for.
pub const MAX_QUALITY: u8 = 40;
/// Quality increment between ladder attempts.
pub const QUALITY_STEP: u8 = 3;
/// Starting quality in normal mode.
pub const DEFAULT_START_QUALITY: u8 = 3;
/// Starting quality in aggressive mode.
pub const AGGRESSIVE_START_QUALITY: u8 = 5;
/// Quality of the single full-resolution fallback encode.
pub const FALLBACK_QUALITY: u8 = 25;

/// Attempts after which the ladder drops to tier 1.
pub const TIER_1_AFTER_ATTEMPTS: usize = 3;
/// Attempts after which the ladder drops to tier 2.
pub const TIER_2_AFTER_ATTEMPTS: usize = 5;

/// Tier 0 bound in normal mode.
pub const TIER_0_NORMAL: ResolutionBound = ResolutionBound::new(1280, 720);
/// Tier 0 bound in aggressive mode.
pub const TIER_0_AGGRESSIVE: ResolutionBound = ResolutionBound::new(854, 480);
/// Tier 1 bound.
pub const TIER_1: ResolutionBound = ResolutionBound::new(640, 360);
/// Tier 2 bound.
pub const TIER_2: ResolutionBound = ResolutionBound::new(480, 270);

/// Deepest tier in the ladder.
pub const LAST_TIER: u8 = 2;

/// Box the output image must fit in. Aspect ratio is preserved and images
/// are never upscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResolutionBound {
    pub max_width: u32,
    pub max_height: u32,
}

impl ResolutionBound {
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Bound for a ladder tier. Tiers past [`LAST_TIER`] stay at the last one.
    pub fn for_tier(tier: u8, aggressive: bool) -> Self {
        match tier {
            0 if aggressive => TIER_0_AGGRESSIVE,
            0 => TIER_0_NORMAL,
            1 => TIER_1,
            _ => TIER_2,
        }
    }

    /// Total pixel area of the bounding box.
    pub fn area(&self) -> u64 {
        u64::from(self.max_width) * u64::from(self.max_height)
    }

    /// FFmpeg scale filter that shrinks into this box.
    pub fn to_scale_filter(&self) -> String {
        format!(
            "scale=min({},iw):min({},ih):force_original_aspect_ratio=decrease",
            self.max_width, self.max_height
        )
    }
}

impl fmt::Display for ResolutionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.max_width, self.max_height)
    }
}

/// Stage of a transcode an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EncodePhase {
    /// First ladder pass using the budget's own mode.
    Ladder,
    /// Single full-resolution re-encode of the source.
    Fallback,
    /// Extra ladder pass in forced-aggressive mode over the fallback output.
    AggressiveLadder,
}

impl EncodePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodePhase::Ladder => "ladder",
            EncodePhase::Fallback => "fallback",
            EncodePhase::AggressiveLadder => "aggressive_ladder",
        }
    }
}

/// One encoder invocation recorded during a transcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncodeAttempt {
    pub phase: EncodePhase,
    /// Ladder tier, `None` for the full-resolution fallback
    pub resolution_tier: Option<u8>,
    /// Bounding box, `None` for the full-resolution fallback
    pub bound: Option<ResolutionBound>,
    /// FFmpeg quality scalar (lower is better)
    pub quality: u8,
    /// Size of the produced artifact, `None` when nothing was written
    pub output_size_bytes: Option<u64>,
    /// Whether the artifact fit the working goal
    pub succeeded: bool,
}

/// Final classification of a transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeOutcome {
    /// An artifact within the hard cap was produced
    Success,
    /// An artifact exists but is larger than the hard cap
    BudgetExceeded,
    /// No artifact was produced at all
    EncodeFailure,
}

impl TranscodeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeOutcome::Success => "success",
            TranscodeOutcome::BudgetExceeded => "budget_exceeded",
            TranscodeOutcome::EncodeFailure => "encode_failure",
        }
    }
}

impl fmt::Display for TranscodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
