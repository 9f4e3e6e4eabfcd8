//! Thumbnail size budget.

use schemars::JsonSchema;
use serde::Serialize;

/// Upper bound for the soft target size.
pub const MAX_TARGET_KB: u32 = 2000;
/// Default soft target size.
pub const DEFAULT_TARGET_KB: u32 = 2000;
/// Default upload ceiling for thumbnails.
pub const DEFAULT_HARD_CAP_KB: u32 = 200;

/// Byte-size constraints a transcode must satisfy.
///
/// Values are fixed at construction; `target_kb` is clamped to
/// [`MAX_TARGET_KB`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SizeBudget {
    target_kb: u32,
    hard_cap_kb: u32,
    aggressive: bool,
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_KB, DEFAULT_HARD_CAP_KB, false)
    }
}

impl SizeBudget {
    /// Create a new budget, clamping the target to [`MAX_TARGET_KB`].
    pub fn new(target_kb: u32, hard_cap_kb: u32, aggressive: bool) -> Self {
        Self {
            target_kb: target_kb.min(MAX_TARGET_KB),
            hard_cap_kb,
            aggressive,
        }
    }

    /// Returns a copy with aggressive mode forced on.
    pub fn forced_aggressive(self) -> Self {
        Self {
            aggressive: true,
            ..self
        }
    }

    /// Soft goal in KiB.
    pub fn target_kb(&self) -> u32 {
        self.target_kb
    }

    /// Upload ceiling in KiB.
    pub fn hard_cap_kb(&self) -> u32 {
        self.hard_cap_kb
    }

    /// Whether the ladder starts from the smaller tier.
    pub fn aggressive(&self) -> bool {
        self.aggressive
    }

    /// The size the ladder works towards: the target, never above the cap.
    pub fn working_goal_kb(&self) -> u32 {
        self.target_kb.min(self.hard_cap_kb)
    }

    pub fn working_goal_bytes(&self) -> u64 {
        kb_to_bytes(self.working_goal_kb())
    }

    pub fn hard_cap_bytes(&self) -> u64 {
        kb_to_bytes(self.hard_cap_kb)
    }

    /// Check whether a payload of `size` bytes fits under the hard cap.
    pub fn fits_hard_cap(&self, size: u64) -> bool {
        size <= self.hard_cap_bytes()
    }
}

fn kb_to_bytes(kb: u32) -> u64 {
    u64::from(kb) * 1024
}
