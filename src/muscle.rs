//! Muscle-space clip constant of humanoid (and generic) clips.

use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    binary::BinaryReader,
    clip::Clip,
    document::{Node, ToDocument},
    error::Result,
    field_plan::FieldPlan,
    shared_formats::{Vector3, Vector4, XForm},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandPose {
    pub grab_x: XForm,
    pub dof_array: Vec<f32>,
    pub override_: f32,
    pub close_open: f32,
    pub in_out: f32,
    pub grab: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumanGoal {
    pub x: XForm,
    pub weight_t: f32,
    pub weight_r: f32,
    pub hint_t: Vector3,
    pub hint_weight_t: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumanPose {
    pub root_x: XForm,
    pub look_at_position: Vector3,
    pub look_at_weight: Vector4,
    pub goals: Vec<HumanGoal>,
    pub left_hand_pose: HandPose,
    pub right_hand_pose: HandPose,
    pub dof_array: Vec<f32>,
    pub tdof_array: Vec<Vector3>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueDelta {
    pub start: f32,
    pub stop: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipMuscleConstant {
    pub delta_pose: HumanPose,
    pub start_x: XForm,
    pub stop_x: XForm,
    pub left_foot_start_x: XForm,
    pub right_foot_start_x: XForm,
    pub motion_start_x: XForm,
    pub motion_stop_x: XForm,
    pub average_speed: Vector3,
    pub clip: Clip,
    pub start_time: f32,
    pub stop_time: f32,
    pub orientation_offset_y: f32,
    pub level: f32,
    pub cycle_offset: f32,
    pub average_angular_speed: f32,
    pub index_array: Vec<i32>,
    pub additional_curve_index_array: Vec<i32>,
    pub value_array_delta: Vec<ValueDelta>,
    pub value_array_reference_pose: Vec<f32>,
    pub mirror: bool,
    pub loop_time: bool,
    pub loop_blend: bool,
    pub loop_blend_orientation: bool,
    pub loop_blend_position_y: bool,
    pub loop_blend_position_xz: bool,
    pub start_at_origin: bool,
    pub keep_original_orientation: bool,
    pub keep_original_position_y: bool,
    pub keep_original_position_xz: bool,
    pub height_from_feet: bool,
}

impl HandPose {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            grab_x: XForm::read_from(br, plan)?,
            dof_array: br.read_f32_array()?,
            override_: br.read_f32()?,
            close_open: br.read_f32()?,
            in_out: br.read_f32()?,
            grab: br.read_f32()?,
        })
    }
}

impl HumanGoal {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let x = XForm::read_from(br, plan)?;
        let weight_t = br.read_f32()?;
        let weight_r = br.read_f32()?;
        let (hint_t, hint_weight_t) = if plan.goal_hint {
            (Vector3::read_versioned(br, plan)?, br.read_f32()?)
        } else {
            (Vector3::default(), 0.0)
        };

        Ok(Self {
            x,
            weight_t,
            weight_r,
            hint_t,
            hint_weight_t,
        })
    }
}

impl HumanPose {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let root_x = XForm::read_from(br, plan)?;
        let look_at_position = Vector3::read_versioned(br, plan)?;
        let look_at_weight = Vector4::read_from(br)?;

        let count = br.read_count(40)?;
        let mut goals = Vec::with_capacity(count);
        for _ in 0..count {
            goals.push(HumanGoal::read_from(br, plan)?);
        }

        let left_hand_pose = HandPose::read_from(br, plan)?;
        let right_hand_pose = HandPose::read_from(br, plan)?;
        let dof_array = br.read_f32_array()?;

        let mut tdof_array = Vec::new();
        if plan.tdof_array {
            let count = br.read_count(12)?;
            tdof_array.reserve(count);
            for _ in 0..count {
                tdof_array.push(Vector3::read_versioned(br, plan)?);
            }
        }

        Ok(Self {
            root_x,
            look_at_position,
            look_at_weight,
            goals,
            left_hand_pose,
            right_hand_pose,
            dof_array,
            tdof_array,
        })
    }
}

impl ValueDelta {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            start: br.read_f32()?,
            stop: br.read_f32()?,
        })
    }
}

impl ClipMuscleConstant {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let mut muscle = Self {
            delta_pose: HumanPose::read_from(br, plan)?,
            start_x: XForm::read_from(br, plan)?,
            ..Default::default()
        };
        if plan.muscle_stop_x {
            muscle.stop_x = XForm::read_from(br, plan)?;
        }
        muscle.left_foot_start_x = XForm::read_from(br, plan)?;
        muscle.right_foot_start_x = XForm::read_from(br, plan)?;
        if plan.motion_xforms {
            muscle.motion_start_x = XForm::read_from(br, plan)?;
            muscle.motion_stop_x = XForm::read_from(br, plan)?;
        }
        muscle.average_speed = Vector3::read_versioned(br, plan)?;

        muscle.clip = Clip::read_from(br, plan)?;

        muscle.start_time = br.read_f32()?;
        muscle.stop_time = br.read_f32()?;
        muscle.orientation_offset_y = br.read_f32()?;
        muscle.level = br.read_f32()?;
        muscle.cycle_offset = br.read_f32()?;
        muscle.average_angular_speed = br.read_f32()?;

        muscle.index_array = br.read_i32_array()?;
        if plan.additional_curve_index {
            muscle.additional_curve_index_array = br.read_i32_array()?;
        }

        let count = br.read_count(8)?;
        muscle.value_array_delta.reserve(count);
        for _ in 0..count {
            muscle.value_array_delta.push(ValueDelta::read_from(br)?);
        }
        if plan.reference_pose {
            muscle.value_array_reference_pose = br.read_f32_array()?;
        }

        muscle.mirror = br.read_bool()?;
        if plan.loop_time {
            muscle.loop_time = br.read_bool()?;
        }
        muscle.loop_blend = br.read_bool()?;
        muscle.loop_blend_orientation = br.read_bool()?;
        muscle.loop_blend_position_y = br.read_bool()?;
        muscle.loop_blend_position_xz = br.read_bool()?;
        if plan.start_at_origin {
            muscle.start_at_origin = br.read_bool()?;
        }
        muscle.keep_original_orientation = br.read_bool()?;
        muscle.keep_original_position_y = br.read_bool()?;
        muscle.keep_original_position_xz = br.read_bool()?;
        muscle.height_from_feet = br.read_bool()?;
        br.align_to_4()?;

        debug!(
            offset = br.position(),
            goals = muscle.delta_pose.goals.len(),
            indices = muscle.index_array.len(),
            "decoded muscle clip"
        );
        Ok(muscle)
    }
}

impl ToDocument for ClipMuscleConstant {
    /// Rendered as the clip settings block.
    fn to_document(&self) -> Node {
        Node::mapping()
            .add_serialized_version(2)
            .add("m_StartTime", self.start_time)
            .add("m_StopTime", self.stop_time)
            .add("m_OrientationOffsetY", self.orientation_offset_y)
            .add("m_Level", self.level)
            .add("m_CycleOffset", self.cycle_offset)
            .add("m_LoopTime", self.loop_time)
            .add("m_LoopBlend", self.loop_blend)
            .add("m_LoopBlendOrientation", self.loop_blend_orientation)
            .add("m_LoopBlendPositionY", self.loop_blend_position_y)
            .add("m_LoopBlendPositionXZ", self.loop_blend_position_xz)
            .add("m_KeepOriginalOrientation", self.keep_original_orientation)
            .add("m_KeepOriginalPositionY", self.keep_original_position_y)
            .add("m_KeepOriginalPositionXZ", self.keep_original_position_xz)
            .add("m_HeightFromFeet", self.height_from_feet)
            .add("m_Mirror", self.mirror)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::binary::{BinaryWriter, Endian};
    use crate::version::{EngineVersion, GameVariant};
    use std::io::{Cursor, Seek, Write};

    fn write_vector<W: Write + Seek>(bw: &mut BinaryWriter<W>, plan: &FieldPlan, v: [f32; 3]) {
        for c in v {
            bw.write_f32(c).unwrap();
        }
        if !plan.vector3_xform {
            bw.write_f32(0.0).unwrap();
        }
    }

    fn write_xform<W: Write + Seek>(bw: &mut BinaryWriter<W>, plan: &FieldPlan) {
        write_vector(bw, plan, [0.0; 3]);
        for c in [0.0, 0.0, 0.0, 1.0] {
            bw.write_f32(c).unwrap();
        }
        write_vector(bw, plan, [1.0; 3]);
    }

    /// Writes a muscle constant with an empty pose; `write_clip` supplies the
    /// embedded clip.
    pub(crate) fn write_muscle<W: Write + Seek>(
        bw: &mut BinaryWriter<W>,
        plan: &FieldPlan,
        write_clip: impl FnOnce(&mut BinaryWriter<W>),
    ) {
        // delta pose
        write_xform(bw, plan);
        write_vector(bw, plan, [0.0; 3]);
        for _ in 0..4 {
            bw.write_f32(0.0).unwrap();
        }
        bw.write_i32(1).unwrap();
        write_xform(bw, plan);
        bw.write_f32(1.0).unwrap();
        bw.write_f32(1.0).unwrap();
        if plan.goal_hint {
            write_vector(bw, plan, [0.5; 3]);
            bw.write_f32(0.0).unwrap();
        }
        for _ in 0..2 {
            write_xform(bw, plan);
            bw.write_f32_array(&[0.1, 0.2]).unwrap();
            for _ in 0..4 {
                bw.write_f32(0.0).unwrap();
            }
        }
        bw.write_f32_array(&[0.0; 3]).unwrap();
        if plan.tdof_array {
            bw.write_i32(1).unwrap();
            write_vector(bw, plan, [0.0; 3]);
        }

        write_xform(bw, plan);
        if plan.muscle_stop_x {
            write_xform(bw, plan);
        }
        write_xform(bw, plan);
        write_xform(bw, plan);
        if plan.motion_xforms {
            write_xform(bw, plan);
            write_xform(bw, plan);
        }
        write_vector(bw, plan, [0.0, 0.0, 1.5]);

        write_clip(bw);

        for v in [0.0, 2.0, 0.0, 0.0, 0.0, 0.0] {
            bw.write_f32(v).unwrap();
        }
        bw.write_i32_array(&[0, 1, -1]).unwrap();
        if plan.additional_curve_index {
            bw.write_i32_array(&[]).unwrap();
        }
        bw.write_i32(1).unwrap();
        bw.write_f32(0.0).unwrap();
        bw.write_f32(1.0).unwrap();
        if plan.reference_pose {
            bw.write_f32_array(&[0.5]).unwrap();
        }
        bw.write_bool(false).unwrap();
        if plan.loop_time {
            bw.write_bool(true).unwrap();
        }
        for _ in 0..4 {
            bw.write_bool(false).unwrap();
        }
        if plan.start_at_origin {
            bw.write_bool(false).unwrap();
        }
        for _ in 0..4 {
            bw.write_bool(true).unwrap();
        }
        bw.align_to_4().unwrap();
    }

    fn write_empty_clip<W: Write + Seek>(bw: &mut BinaryWriter<W>, plan: &FieldPlan) {
        bw.write_u32_array(&[]).unwrap();
        bw.write_u32(0).unwrap();
        bw.write_i32(0).unwrap();
        bw.write_u32(0).unwrap();
        bw.write_f32(30.0).unwrap();
        bw.write_f32(0.0).unwrap();
        bw.write_f32_array(&[]).unwrap();
        if plan.acl_after_dense {
            bw.write_u32_array(&[]).unwrap();
            bw.write_u32(0).unwrap();
            bw.write_u32(0).unwrap();
        }
        if plan.constant_clip {
            bw.write_f32_array(&[]).unwrap();
        }
        if plan.acl_after_constant {
            bw.write_u8_array(&[]).unwrap();
            bw.align_to_4().unwrap();
            bw.write_u32(0).unwrap();
        }
        if plan.value_array_binding {
            bw.write_i32(0).unwrap();
        }
    }

    fn roundtrip(major: i32, minor: i32) -> ClipMuscleConstant {
        let plan = FieldPlan::new(EngineVersion::new(major, minor, 0), GameVariant::Standard);
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        write_muscle(&mut bw, &plan, |bw| write_empty_clip(bw, &plan));
        let bytes = bw.into_inner().into_inner();

        let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little).unwrap();
        let muscle = ClipMuscleConstant::read_from(&mut br, &plan).unwrap();
        assert_eq!(br.bytes_left(), 0, "{}.{}", major, minor);
        muscle
    }

    #[test]
    fn test_muscle_constant_current_layout() {
        let muscle = roundtrip(2019, 4);
        assert_eq!(muscle.delta_pose.goals.len(), 1);
        assert_eq!(muscle.delta_pose.goals[0].hint_t, Vector3::splat(0.5));
        assert_eq!(muscle.delta_pose.tdof_array.len(), 1);
        assert_eq!(muscle.delta_pose.left_hand_pose.dof_array, vec![0.1, 0.2]);
        assert_eq!(muscle.average_speed, Vector3::new(0.0, 0.0, 1.5));
        assert_eq!(muscle.stop_time, 2.0);
        assert_eq!(muscle.index_array, vec![0, 1, -1]);
        assert_eq!(muscle.value_array_delta, vec![ValueDelta { start: 0.0, stop: 1.0 }]);
        assert_eq!(muscle.value_array_reference_pose, vec![0.5]);
        assert!(muscle.loop_time);
        assert!(muscle.height_from_feet);
    }

    #[test]
    fn test_muscle_constant_old_layouts() {
        for (major, minor) in [(4, 2), (4, 7), (5, 0), (5, 3), (5, 4), (5, 6), (2018, 2)] {
            let muscle = roundtrip(major, minor);
            assert_eq!(muscle.stop_time, 2.0);
            assert!(muscle.keep_original_orientation);
        }
    }

    #[test]
    fn test_settings_document() {
        let muscle = roundtrip(2019, 4);
        let doc = muscle.to_document();
        assert_eq!(doc.get("m_LoopTime"), Some(&Node::Bool(true)));
        assert_eq!(doc.keys().last(), Some(&"m_Mirror"));
    }
}
