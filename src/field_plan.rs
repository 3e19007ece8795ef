//! Version- and variant-keyed field plan.
//!
//! Every optional field of the clip layout is listed here exactly once with the
//! bracket it appears in. Readers consult the plan instead of comparing version
//! numbers inline, so a new format revision is a one-line change to this table.

use serde::Serialize;

use crate::version::{EngineVersion, GameVariant};

/// Presence and width decisions for one `(version, variant)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldPlan {
    pub version: EngineVersion,
    pub variant: GameVariant,

    // AnimationClip header flags
    /// `m_Legacy` stored as a bool (5.0 and up)
    pub legacy_flag: bool,
    /// `m_AnimationType` stored as an int (4.x only)
    pub animation_type: bool,
    /// `m_UseHighQualityCurve` (4.3 and up)
    pub high_quality_curve: bool,

    // Curve arrays
    /// Keyframe weighted mode and in/out weights (2018 and up)
    pub keyframe_weights: bool,
    /// `m_RotationOrder` after the wrap modes (5.3 and up)
    pub curve_rotation_order: bool,
    /// `m_EulerCurves` array (5.3 and up)
    pub euler_curves: bool,
    /// `m_PPtrCurves` array (4.3 and up)
    pub pptr_curves: bool,
    /// 64-bit pointer path ids (5.0 and up)
    pub pptr_path_id_64: bool,

    // Clip-level sections
    /// `m_Bounds` (3.4 and up)
    pub bounds: bool,
    /// `m_MuscleClipSize` + `m_MuscleClip` (4.0 and up)
    pub muscle_clip: bool,
    /// `m_ClipBindingConstant` (4.3 and up)
    pub binding_constant: bool,
    /// Clip-level ACL blob with its own bindings and range (SR, 4.3 and up)
    pub clip_level_acl: bool,
    /// `m_HasGenericRootTransform` / `m_HasMotionFloatCurves` (2018.3 and up)
    pub root_motion_flags: bool,
    /// `intParameter` in animation events (3.0 and up)
    pub event_int_parameter: bool,
    /// Align after the event list (2017 and up)
    pub trailing_align: bool,

    // Inner Clip
    /// `m_ConstantClip` (4.3 and up)
    pub constant_clip: bool,
    /// ACL clip directly after the dense clip (SR)
    pub acl_after_dense: bool,
    /// ACL clip after the constant clip (every fork except SR and TOT)
    pub acl_after_constant: bool,
    /// ACL payload stored as 32-bit words plus a const-curve count (SR)
    pub acl_word_data: bool,
    /// Legacy `ValueArrayConstant` bindings (below 2018.3)
    pub value_array_binding: bool,
    /// `m_TypeID` in `ValueConstant` (below 5.5)
    pub value_constant_type_id: bool,

    // Bindings
    /// 32-bit class id in `GenericBinding` (5.6 and up, 16-bit before)
    pub binding_class_id_32: bool,

    // Muscle clip
    /// Three-component vectors in xforms and poses (5.4 and up, 4-vectors before)
    pub vector3_xform: bool,
    /// Hint position and weight in `HumanGoal` (5.0 and up)
    pub goal_hint: bool,
    /// `m_TDoFArray` in `HumanPose` (5.2 and up)
    pub tdof_array: bool,
    /// `m_StopX` (5.5 and up)
    pub muscle_stop_x: bool,
    /// `m_MotionStartX` / `m_MotionStopX` (below 5.0)
    pub motion_xforms: bool,
    /// `m_AdditionalCurveIndexArray` (below 4.3)
    pub additional_curve_index: bool,
    /// `m_ValueArrayReferencePose` (5.3 and up)
    pub reference_pose: bool,
    /// `m_LoopTime` (4.3 and up)
    pub loop_time: bool,
    /// `m_StartAtOrigin` (5.5 and up)
    pub start_at_origin: bool,
}

impl FieldPlan {
    pub fn new(version: EngineVersion, variant: GameVariant) -> Self {
        let v = version;
        let sr = variant == GameVariant::SR;
        let tot = variant == GameVariant::TOT;

        Self {
            version,
            variant,

            legacy_flag: v.at_least(5, 0),
            animation_type: v.at_least(4, 0) && v.below(5, 0),
            high_quality_curve: v.at_least(4, 3),

            keyframe_weights: v.at_least(2018, 0),
            curve_rotation_order: v.at_least(5, 3),
            euler_curves: v.at_least(5, 3),
            pptr_curves: v.at_least(4, 3),
            pptr_path_id_64: v.at_least(5, 0),

            bounds: v.at_least(3, 4),
            muscle_clip: v.at_least(4, 0),
            binding_constant: v.at_least(4, 3),
            clip_level_acl: sr && v.at_least(4, 3),
            root_motion_flags: v.at_least(2018, 3),
            event_int_parameter: v.at_least(3, 0),
            trailing_align: v.at_least(2017, 0),

            constant_clip: v.at_least(4, 3),
            acl_after_dense: sr,
            acl_after_constant: !sr && !tot,
            acl_word_data: sr,
            value_array_binding: v.below(2018, 3),
            value_constant_type_id: v.below(5, 5),

            binding_class_id_32: v.at_least(5, 6),

            vector3_xform: v.at_least(5, 4),
            goal_hint: v.at_least(5, 0),
            tdof_array: v.at_least(5, 2),
            muscle_stop_x: v.at_least(5, 5),
            motion_xforms: v.below(5, 0),
            additional_curve_index: v.below(4, 3),
            reference_pose: v.at_least(5, 3),
            loop_time: v.at_least(4, 3),
            start_at_origin: v.at_least(5, 5),
        }
    }

    /// Clips older than 4.0 carry no legacy flag and are always legacy.
    pub fn implicit_legacy(&self) -> bool {
        !self.legacy_flag && !self.animation_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(major: i32, minor: i32, variant: GameVariant) -> FieldPlan {
        FieldPlan::new(EngineVersion::new(major, minor, 0), variant)
    }

    #[test]
    fn test_legacy_header_brackets() {
        let old = plan(3, 5, GameVariant::Standard);
        assert!(old.implicit_legacy());
        assert!(old.bounds);
        assert!(!old.muscle_clip);

        let four = plan(4, 2, GameVariant::Standard);
        assert!(four.animation_type);
        assert!(!four.legacy_flag);
        assert!(!four.high_quality_curve);
        assert!(four.additional_curve_index);

        let five = plan(5, 0, GameVariant::Standard);
        assert!(five.legacy_flag);
        assert!(!five.animation_type);
    }

    #[test]
    fn test_2018_3_boundary() {
        let before = plan(2018, 2, GameVariant::Standard);
        let after = plan(2018, 3, GameVariant::Standard);
        assert!(before.value_array_binding);
        assert!(!before.root_motion_flags);
        assert!(!after.value_array_binding);
        assert!(after.root_motion_flags);
        assert!(before.keyframe_weights && after.keyframe_weights);
    }

    #[test]
    fn test_acl_gates_are_independent() {
        let standard = plan(2019, 4, GameVariant::Standard);
        assert!(!standard.acl_after_dense);
        assert!(standard.acl_after_constant);
        assert!(!standard.clip_level_acl);

        let sr = plan(2019, 4, GameVariant::SR);
        assert!(sr.acl_after_dense);
        assert!(!sr.acl_after_constant);
        assert!(sr.acl_word_data);
        assert!(sr.clip_level_acl);

        let tot = plan(2019, 4, GameVariant::TOT);
        assert!(!tot.acl_after_dense);
        assert!(!tot.acl_after_constant);

        // Clip-level ACL is version gated, the inner one is not.
        let old_sr = plan(4, 2, GameVariant::SR);
        assert!(old_sr.acl_after_dense);
        assert!(!old_sr.clip_level_acl);
    }

    #[test]
    fn test_binding_widths() {
        assert!(!plan(5, 5, GameVariant::Standard).binding_class_id_32);
        assert!(plan(5, 6, GameVariant::Standard).binding_class_id_32);
        assert!(plan(5, 4, GameVariant::Standard).value_constant_type_id);
        assert!(!plan(5, 5, GameVariant::Standard).value_constant_type_id);
    }
}
