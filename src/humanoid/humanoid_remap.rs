//! Version boundaries of the humanoid muscle enumeration.
//!
//! Old engines numbered muscles and translation-DoF bones without UpperChest
//! and with a different TDoF bone order. Each rule shifts codes at or above
//! `from` by `shift` when the clip was authored before `before`. Rules of one
//! stage apply in order, each seeing the output of the previous one.

use crate::version::EngineVersion;

use super::{MUSCLES, TDOF_BONES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapStage {
    Muscle,
    TDoF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapRule {
    pub stage: RemapStage,
    /// Applies to versions strictly below this (major, minor)
    pub before: (i32, i32),
    pub from: u32,
    pub shift: u32,
}

pub const REMAP_RULES: &[RemapRule] = &[
    // UpperChest muscles inserted in 5.6
    RemapRule { stage: RemapStage::Muscle, before: (5, 6), from: 6, shift: 3 },
    // UpperChest TDoF bone inserted in 5.6
    RemapRule { stage: RemapStage::TDoF, before: (5, 6), from: 2, shift: 1 },
    // TDoF bone list reordered in 2017.3
    RemapRule { stage: RemapStage::TDoF, before: (2017, 3), from: 4, shift: 1 },
    RemapRule { stage: RemapStage::TDoF, before: (2017, 3), from: 6, shift: 3 },
    RemapRule { stage: RemapStage::TDoF, before: (2017, 3), from: 10, shift: 3 },
    RemapRule { stage: RemapStage::TDoF, before: (2017, 3), from: 14, shift: 3 },
    RemapRule { stage: RemapStage::TDoF, before: (2017, 3), from: 18, shift: 3 },
];

fn apply_stage(stage: RemapStage, value: u32, version: EngineVersion) -> u32 {
    REMAP_RULES
        .iter()
        .filter(|rule| rule.stage == stage && version.below(rule.before.0, rule.before.1))
        .fold(value, |v, rule| if v >= rule.from { v + rule.shift } else { v })
}

/// Maps a raw attribute code authored with `version` onto the current
/// enumeration. Codes below the muscle block never move.
pub fn remap(code: u32, version: EngineVersion) -> u32 {
    if code < MUSCLES {
        return code;
    }

    let code = MUSCLES + apply_stage(RemapStage::Muscle, code - MUSCLES, version);
    if code < TDOF_BONES {
        return code;
    }

    TDOF_BONES + apply_stage(RemapStage::TDoF, code - TDOF_BONES, version)
}
