//! Resolution/quality ladder stepping.

use blaze_models::encoding::{
    AGGRESSIVE_START_QUALITY, DEFAULT_START_QUALITY, LAST_TIER, MAX_QUALITY, QUALITY_STEP,
    TIER_1_AFTER_ATTEMPTS, TIER_2_AFTER_ATTEMPTS,
};
use blaze_models::ResolutionBound;

/// Settings for one ladder attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rung {
    pub tier: u8,
    pub bound: ResolutionBound,
    pub quality: u8,
}

/// Walks the ladder for a single pass.
///
/// Tier never goes back up and quality never goes back down, so each pass
/// is bounded by the quality range.
#[derive(Debug, Clone)]
pub(crate) struct Ladder {
    aggressive: bool,
    tier: u8,
    quality: u8,
    attempts: usize,
}

impl Ladder {
    pub fn new(aggressive: bool) -> Self {
        let quality = if aggressive {
            AGGRESSIVE_START_QUALITY
        } else {
            DEFAULT_START_QUALITY
        };
        Self {
            aggressive,
            tier: 0,
            quality,
            attempts: 0,
        }
    }

    /// The opening rung. Counts as the first attempt of the pass.
    pub fn first(&mut self) -> Rung {
        self.attempts = 1;
        self.rung()
    }

    /// Next rung after an attempt that missed the goal, `None` once quality
    /// is exhausted.
    pub fn next(&mut self) -> Option<Rung> {
        if self.quality >= MAX_QUALITY {
            return None;
        }

        self.quality = (self.quality + QUALITY_STEP).min(MAX_QUALITY);

        let tier = if self.attempts >= TIER_2_AFTER_ATTEMPTS {
            2
        } else if self.attempts >= TIER_1_AFTER_ATTEMPTS {
            1
        } else {
            self.tier
        };
        self.tier = tier.max(self.tier).min(LAST_TIER);
        self.attempts += 1;

        Some(self.rung())
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    fn rung(&self) -> Rung {
        Rung {
            tier: self.tier,
            bound: ResolutionBound::for_tier(self.tier, self.aggressive),
            quality: self.quality,
        }
    }
}
