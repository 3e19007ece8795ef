//! Humanoid muscle-space attribute codes.
//!
//! Animator bindings on humanoid clips carry a flat code that indexes, in
//! order: the motion transform, the root transform, four limb goals, the
//! named muscles, the finger DoFs of both hands and the translation DoFs of
//! the body bones.

pub mod humanoid_remap;

use crate::version::EngineVersion;

pub const MOTION: u32 = 0;
pub const ROOT: u32 = MOTION + 7;
pub const LIMBS: u32 = ROOT + 7;
pub const MUSCLES: u32 = LIMBS + LIMB_BONES.len() as u32 * 7;
pub const FINGERS: u32 = MUSCLES + MUSCLE_NAMES.len() as u32;
pub const TDOF_BONES: u32 =
    FINGERS + (ARM_BONES.len() * FINGER_NAMES.len() * FINGER_DOF_NAMES.len()) as u32;
pub const LAST: u32 = TDOF_BONES + TDOF_BONE_NAMES.len() as u32 * 3;

const TRANSFORM_POSTFIX: [&str; 7] = ["T.x", "T.y", "T.z", "Q.x", "Q.y", "Q.z", "Q.w"];
const TDOF_POSTFIX: [&str; 3] = ["TDOF.x", "TDOF.y", "TDOF.z"];

const LIMB_BONES: [&str; 4] = ["LeftFoot", "RightFoot", "LeftHand", "RightHand"];
const ARM_BONES: [&str; 2] = ["LeftHand", "RightHand"];
const FINGER_NAMES: [&str; 5] = ["Thumb", "Index", "Middle", "Ring", "Little"];
const FINGER_DOF_NAMES: [&str; 4] = ["1 Stretched", "Spread", "2 Stretched", "3 Stretched"];

const TDOF_BONE_NAMES: [&str; 21] = [
    "Spine",
    "Chest",
    "UpperChest",
    "Neck",
    "Head",
    "LeftUpperLeg",
    "LeftLowerLeg",
    "LeftFoot",
    "LeftToes",
    "RightUpperLeg",
    "RightLowerLeg",
    "RightFoot",
    "RightToes",
    "LeftShoulder",
    "LeftUpperArm",
    "LeftLowerArm",
    "LeftHand",
    "RightShoulder",
    "RightUpperArm",
    "RightLowerArm",
    "RightHand",
];

const MUSCLE_NAMES: [&str; 55] = [
    "Spine Front-Back",
    "Spine Left-Right",
    "Spine Twist Left-Right",
    "Chest Front-Back",
    "Chest Left-Right",
    "Chest Twist Left-Right",
    "UpperChest Front-Back",
    "UpperChest Left-Right",
    "UpperChest Twist Left-Right",
    "Neck Nod Down-Up",
    "Neck Tilt Left-Right",
    "Neck Turn Left-Right",
    "Head Nod Down-Up",
    "Head Tilt Left-Right",
    "Head Turn Left-Right",
    "Left Eye Down-Up",
    "Left Eye In-Out",
    "Right Eye Down-Up",
    "Right Eye In-Out",
    "Jaw Close",
    "Jaw Left-Right",
    "Left Upper Leg Front-Back",
    "Left Upper Leg In-Out",
    "Left Upper Leg Twist In-Out",
    "Left Lower Leg Stretch",
    "Left Lower Leg Twist In-Out",
    "Left Foot Up-Down",
    "Left Foot Twist In-Out",
    "Left Toes Up-Down",
    "Right Upper Leg Front-Back",
    "Right Upper Leg In-Out",
    "Right Upper Leg Twist In-Out",
    "Right Lower Leg Stretch",
    "Right Lower Leg Twist In-Out",
    "Right Foot Up-Down",
    "Right Foot Twist In-Out",
    "Right Toes Up-Down",
    "Left Shoulder Down-Up",
    "Left Shoulder Front-Back",
    "Left Arm Down-Up",
    "Left Arm Front-Back",
    "Left Arm Twist In-Out",
    "Left Forearm Stretch",
    "Left Forearm Twist In-Out",
    "Left Hand Down-Up",
    "Left Hand In-Out",
    "Right Shoulder Down-Up",
    "Right Shoulder Front-Back",
    "Right Arm Down-Up",
    "Right Arm Front-Back",
    "Right Arm Twist In-Out",
    "Right Forearm Stretch",
    "Right Forearm Twist In-Out",
    "Right Hand Down-Up",
    "Right Hand In-Out",
];

/// Block of the enumeration a code falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuscleSection {
    Motion,
    Root,
    Limb,
    Muscle,
    Finger,
    TDoF,
}

/// A humanoid attribute code in the current numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HumanoidMuscle(u32);

impl HumanoidMuscle {
    /// Remaps a code stored by a clip authored with `version`.
    pub fn from_raw(code: u32, version: EngineVersion) -> Self {
        Self(humanoid_remap::remap(code, version))
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    pub fn section(&self) -> Option<MuscleSection> {
        match self.0 {
            c if c < ROOT => Some(MuscleSection::Motion),
            c if c < LIMBS => Some(MuscleSection::Root),
            c if c < MUSCLES => Some(MuscleSection::Limb),
            c if c < FINGERS => Some(MuscleSection::Muscle),
            c if c < TDOF_BONES => Some(MuscleSection::Finger),
            c if c < LAST => Some(MuscleSection::TDoF),
            _ => None,
        }
    }

    /// Attribute name used by animator float curves, e.g. `RootT.x`,
    /// `Spine Front-Back` or `LeftHand.Index.Spread`.
    pub fn attribute_name(&self) -> Option<String> {
        let code = self.0;
        let name = match self.section()? {
            MuscleSection::Motion => format!("Motion{}", TRANSFORM_POSTFIX[(code - MOTION) as usize % 7]),
            MuscleSection::Root => format!("Root{}", TRANSFORM_POSTFIX[(code - ROOT) as usize % 7]),
            MuscleSection::Limb => {
                let delta = (code - LIMBS) as usize;
                format!("{}{}", LIMB_BONES[delta / 7], TRANSFORM_POSTFIX[delta % 7])
            }
            MuscleSection::Muscle => MUSCLE_NAMES[(code - MUSCLES) as usize].to_string(),
            MuscleSection::Finger => {
                let dof_size = FINGER_DOF_NAMES.len();
                let arm_size = FINGER_NAMES.len() * dof_size;
                let delta = (code - FINGERS) as usize;
                format!(
                    "{}.{}.{}",
                    ARM_BONES[delta / arm_size],
                    FINGER_NAMES[delta % arm_size / dof_size],
                    FINGER_DOF_NAMES[delta % dof_size]
                )
            }
            MuscleSection::TDoF => {
                let delta = (code - TDOF_BONES) as usize;
                format!("{}{}", TDOF_BONE_NAMES[delta / 3], TDOF_POSTFIX[delta % 3])
            }
        };
        Some(name)
    }
}
