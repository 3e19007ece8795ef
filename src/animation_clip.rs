//! The `AnimationClip` object: header flags, the keyframed curve arrays, the
//! muscle clip with its bindings, and timeline events.

use std::borrow::Cow;
use std::io::{Read, Seek};
use std::mem;

use tracing::{debug, warn};

use crate::{
    binary::BinaryReader,
    binding::{AnimationClipBindingConstant, GenericBinding},
    converter::ClipConverter,
    curve::{
        union_curves, CompressedAnimationCurve, FloatCurve, PPtrCurve, QuaternionCurve,
        Vector3Curve,
    },
    document::{Node, ToDocument},
    error::Result,
    field_plan::FieldPlan,
    muscle::ClipMuscleConstant,
    shared_formats::{Aabb, PPtr},
    tos::TosTable,
    version::{EngineVersion, GameVariant},
};

/// `m_AnimationType` of 4.x clips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationType {
    Legacy = 1,
    Generic = 2,
    Humanoid = 3,
}

impl AnimationType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(AnimationType::Legacy),
            2 => Some(AnimationType::Generic),
            3 => Some(AnimationType::Humanoid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationEvent {
    pub time: f32,
    pub function_name: String,
    pub data: String,
    pub object_reference_parameter: PPtr,
    pub float_parameter: f32,
    pub int_parameter: i32,
    pub message_options: i32,
}

impl AnimationEvent {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let time = br.read_f32()?;
        let function_name = br.read_aligned_string()?;
        let data = br.read_aligned_string()?;
        let object_reference_parameter = PPtr::read_from(br, plan)?;
        let float_parameter = br.read_f32()?;
        let int_parameter = if plan.event_int_parameter {
            br.read_i32()?
        } else {
            0
        };
        let message_options = br.read_i32()?;

        Ok(Self {
            time,
            function_name,
            data,
            object_reference_parameter,
            float_parameter,
            int_parameter,
            message_options,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub version: EngineVersion,
    pub variant: GameVariant,
    pub name: String,
    pub animation_type: Option<AnimationType>,
    pub legacy: bool,
    pub compressed: bool,
    pub use_high_quality_curve: bool,
    pub rotation_curves: Vec<QuaternionCurve>,
    pub compressed_rotation_curves: Vec<CompressedAnimationCurve>,
    pub euler_curves: Vec<Vector3Curve>,
    pub position_curves: Vec<Vector3Curve>,
    pub scale_curves: Vec<Vector3Curve>,
    pub float_curves: Vec<FloatCurve>,
    pub pptr_curves: Vec<PPtrCurve>,
    pub sample_rate: f32,
    pub wrap_mode: i32,
    pub bounds: Option<Aabb>,
    pub muscle_clip_size: u32,
    pub muscle_clip: Option<ClipMuscleConstant>,
    pub acl_clip_data: Vec<u8>,
    pub acl_bindings: Vec<GenericBinding>,
    pub acl_range: Option<(f32, f32)>,
    pub binding_constant: Option<AnimationClipBindingConstant>,
    pub has_generic_root_transform: bool,
    pub has_motion_float_curves: bool,
    pub events: Vec<AnimationEvent>,
}

fn read_array<R, T>(
    br: &mut BinaryReader<R>,
    min_item_size: u64,
    mut read: impl FnMut(&mut BinaryReader<R>) -> Result<T>,
) -> Result<Vec<T>>
where
    R: Read + Seek,
{
    let count = br.read_count(min_item_size)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read(br)?);
    }
    Ok(items)
}

impl AnimationClip {
    /// Reads the clip in a single forward pass; which sections exist is
    /// decided by `plan` alone.
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let mut clip = Self {
            version: plan.version,
            variant: plan.variant,
            name: br.read_aligned_string()?,
            ..Default::default()
        };

        if plan.legacy_flag {
            clip.legacy = br.read_bool()?;
        } else if plan.animation_type {
            let raw = br.read_i32()?;
            clip.animation_type = AnimationType::from_i32(raw);
            if clip.animation_type.is_none() {
                warn!(animation_type = raw, "unknown animation type");
            }
            clip.legacy = clip.animation_type == Some(AnimationType::Legacy);
        } else {
            clip.legacy = plan.implicit_legacy();
        }
        clip.compressed = br.read_bool()?;
        if plan.high_quality_curve {
            clip.use_high_quality_curve = br.read_bool()?;
        }
        br.align_to_4()?;

        clip.rotation_curves = read_array(br, 16, |br| QuaternionCurve::read_from(br, plan))?;
        clip.compressed_rotation_curves = read_array(br, 16, CompressedAnimationCurve::read_from)?;
        if plan.euler_curves {
            clip.euler_curves = read_array(br, 16, |br| Vector3Curve::read_from(br, plan))?;
        }
        clip.position_curves = read_array(br, 16, |br| Vector3Curve::read_from(br, plan))?;
        clip.scale_curves = read_array(br, 16, |br| Vector3Curve::read_from(br, plan))?;
        clip.float_curves = read_array(br, 16, |br| FloatCurve::read_from(br, plan))?;
        if plan.pptr_curves {
            clip.pptr_curves = read_array(br, 16, |br| PPtrCurve::read_from(br, plan))?;
        }
        debug!(
            offset = br.position(),
            name = %clip.name,
            rotations = clip.rotation_curves.len(),
            positions = clip.position_curves.len(),
            floats = clip.float_curves.len(),
            "decoded curve arrays"
        );

        clip.sample_rate = br.read_f32()?;
        clip.wrap_mode = br.read_i32()?;
        if plan.bounds {
            clip.bounds = Some(Aabb::read_from(br)?);
        }
        if plan.muscle_clip {
            clip.muscle_clip_size = br.read_u32()?;
            clip.muscle_clip = Some(ClipMuscleConstant::read_from(br, plan)?);
        }
        if plan.clip_level_acl {
            clip.acl_clip_data = br.read_u8_array()?;
            clip.acl_bindings = read_array(br, 12, |br| GenericBinding::read_from(br, plan))?;
            clip.acl_range = Some((br.read_f32()?, br.read_f32()?));
        }
        if plan.binding_constant {
            clip.binding_constant = Some(AnimationClipBindingConstant::read_from(br, plan)?);
        }
        if plan.root_motion_flags {
            clip.has_generic_root_transform = br.read_bool()?;
            clip.has_motion_float_curves = br.read_bool()?;
            br.align_to_4()?;
        }
        clip.events = read_array(br, 24, |br| AnimationEvent::read_from(br, plan))?;
        if plan.trailing_align {
            br.align_to_4()?;
        }

        debug!(
            offset = br.position(),
            name = %clip.name,
            events = clip.events.len(),
            "decoded animation clip"
        );
        Ok(clip)
    }

    /// Bindings describing the muscle clip's channels: the stored binding
    /// constant, or the one converted from the legacy value table.
    pub fn bindings(&self) -> Cow<'_, AnimationClipBindingConstant> {
        if let Some(constant) = &self.binding_constant {
            return Cow::Borrowed(constant);
        }
        let legacy = self
            .muscle_clip
            .as_ref()
            .and_then(|muscle| muscle.clip.convert_legacy_bindings());
        Cow::Owned(legacy.unwrap_or_default())
    }

    /// Checks that the bindings account for every stored channel. A mismatch
    /// is logged, not raised.
    pub fn check_channel_coverage(&self) -> bool {
        let Some(muscle) = &self.muscle_clip else {
            return true;
        };
        let channels = muscle.clip.total_channel_count();
        let slots = self.bindings().total_slot_count();
        if channels != slots {
            warn!(
                name = %self.name,
                channels,
                slots,
                "binding slots do not cover the clip's channels"
            );
            return false;
        }
        true
    }

    /// Appends the curves synthesized from the muscle clip, and the expanded
    /// compressed rotations, to the curve arrays. Synthesized curves win over
    /// stored curves with the same target.
    pub fn convert(&mut self, tos: &TosTable) -> Result<()> {
        let mut converted = ClipConverter::process(self, tos)?;
        for compressed in &self.compressed_rotation_curves {
            converted.rotations.push(compressed.decompress()?);
        }

        self.rotation_curves = union_curves(converted.rotations, mem::take(&mut self.rotation_curves));
        self.euler_curves = union_curves(converted.eulers, mem::take(&mut self.euler_curves));
        self.position_curves = union_curves(converted.translations, mem::take(&mut self.position_curves));
        self.scale_curves = union_curves(converted.scales, mem::take(&mut self.scale_curves));
        self.float_curves = union_curves(converted.floats, mem::take(&mut self.float_curves));
        self.pptr_curves = union_curves(converted.pptrs, mem::take(&mut self.pptr_curves));
        Ok(())
    }

    /// Everything in [`ToDocument::to_document`] plus the raw muscle clip and
    /// clip-level ACL data.
    pub fn to_raw_document(&self) -> Node {
        let mut node = self
            .to_document()
            .add("m_MuscleClipSize", self.muscle_clip_size);
        if let Some(muscle) = &self.muscle_clip {
            node = node.add("m_MuscleClip", muscle.clip.to_document());
        }
        if let Some((start, stop)) = self.acl_range {
            node = node
                .add("m_AclClipData", self.acl_clip_data.as_slice())
                .add("m_AclBindings", self.acl_bindings.to_document())
                .add("m_AclRange", Node::mapping().add("x", start).add("y", stop));
        }
        node.add("m_HasGenericRootTransform", self.has_generic_root_transform)
            .add("m_HasMotionFloatCurves", self.has_motion_float_curves)
    }
}

impl ToDocument for AnimationEvent {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("time", self.time)
            .add("functionName", self.function_name.as_str())
            .add("data", self.data.as_str())
            .add("objectReferenceParameter", self.object_reference_parameter.to_document())
            .add("floatParameter", self.float_parameter)
            .add("intParameter", self.int_parameter)
            .add("messageOptions", self.message_options)
    }
}

impl ToDocument for AnimationClip {
    fn to_document(&self) -> Node {
        let settings = match &self.muscle_clip {
            Some(muscle) => muscle.to_document(),
            None => ClipMuscleConstant::default().to_document(),
        };

        Node::mapping()
            .add("m_Name", self.name.as_str())
            .add_serialized_version(6)
            .add("m_Legacy", self.legacy)
            .add("m_Compressed", self.compressed)
            .add("m_UseHighQualityCurve", self.use_high_quality_curve)
            .add("m_RotationCurves", self.rotation_curves.to_document())
            .add("m_CompressedRotationCurves", self.compressed_rotation_curves.to_document())
            .add("m_EulerCurves", self.euler_curves.to_document())
            .add("m_PositionCurves", self.position_curves.to_document())
            .add("m_ScaleCurves", self.scale_curves.to_document())
            .add("m_FloatCurves", self.float_curves.to_document())
            .add("m_PPtrCurves", self.pptr_curves.to_document())
            .add("m_SampleRate", self.sample_rate)
            .add("m_WrapMode", self.wrap_mode)
            .add("m_Bounds", self.bounds.unwrap_or_default().to_document())
            .add("m_ClipBindingConstant", self.bindings().to_document())
            .add("m_AnimationClipSettings", settings)
            .add("m_Events", self.events.to_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryWriter, Endian};
    use crate::binding::TransformType;
    use crate::clip::POSITION_TYPE_ID;
    use crate::muscle::tests::write_muscle;
    use crate::shared_formats::{class_ids, Quaternion, Vector3};
    use crate::tos::{path_hash, TosMap};
    use std::io::{Cursor, Seek, Write};

    fn plan(major: i32, minor: i32) -> FieldPlan {
        FieldPlan::new(EngineVersion::new(major, minor, 0), GameVariant::Standard)
    }

    fn write_pptr<W: Write + Seek>(bw: &mut BinaryWriter<W>, path_id: i64) {
        bw.write_i32(0).unwrap();
        bw.write_i64(path_id).unwrap();
    }

    fn write_rotation_curve<W: Write + Seek>(bw: &mut BinaryWriter<W>, path: &str) {
        bw.write_i32(1).unwrap();
        bw.write_f32(0.0).unwrap();
        for value in [0.0, 0.0, 0.0, 1.0] {
            bw.write_f32(value).unwrap();
        }
        for _ in 0..8 {
            bw.write_f32(0.0).unwrap();
        }
        // weights
        bw.write_i32(0).unwrap();
        for _ in 0..8 {
            bw.write_f32(1.0 / 3.0).unwrap();
        }
        bw.write_i32(2).unwrap();
        bw.write_i32(2).unwrap();
        bw.write_i32(4).unwrap();
        bw.write_aligned_string(path).unwrap();
    }

    /// A 2019.4 clip: one stored rotation curve, a constant position triple
    /// bound to `Hips`, and one event.
    fn current_clip_bytes() -> Vec<u8> {
        let plan = plan(2019, 4);
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        bw.write_aligned_string("Walk").unwrap();
        bw.write_bool(false).unwrap();
        bw.write_bool(false).unwrap();
        bw.write_bool(true).unwrap();
        bw.align_to_4().unwrap();

        bw.write_i32(1).unwrap();
        write_rotation_curve(&mut bw, "Root");
        // compressed, euler, position, scale, float, pptr
        for _ in 0..6 {
            bw.write_i32(0).unwrap();
        }
        bw.write_f32(30.0).unwrap();
        bw.write_i32(0).unwrap();
        for value in [0.0, 1.0, 0.0, 0.5, 1.0, 0.5] {
            bw.write_f32(value).unwrap();
        }

        bw.write_u32(128).unwrap();
        write_muscle(&mut bw, &plan, |bw| {
            bw.write_u32_array(&[]).unwrap();
            bw.write_u32(0).unwrap();
            bw.write_i32(0).unwrap();
            bw.write_u32(0).unwrap();
            bw.write_f32(30.0).unwrap();
            bw.write_f32(0.0).unwrap();
            bw.write_f32_array(&[]).unwrap();
            bw.write_f32_array(&[1.0, 2.0, 3.0]).unwrap();
            bw.write_u8_array(&[]).unwrap();
            bw.align_to_4().unwrap();
            bw.write_u32(0).unwrap();
        });

        // binding constant
        bw.write_i32(1).unwrap();
        bw.write_u32(path_hash("Hips")).unwrap();
        bw.write_u32(TransformType::Translation as u32).unwrap();
        write_pptr(&mut bw, 0);
        bw.write_i32(class_ids::TRANSFORM).unwrap();
        bw.write_u8(0).unwrap();
        bw.write_u8(0).unwrap();
        bw.align_to_4().unwrap();
        bw.write_i32(0).unwrap();

        bw.write_bool(true).unwrap();
        bw.write_bool(false).unwrap();
        bw.align_to_4().unwrap();

        bw.write_i32(1).unwrap();
        bw.write_f32(0.5).unwrap();
        bw.write_aligned_string("OnStep").unwrap();
        bw.write_aligned_string("left").unwrap();
        write_pptr(&mut bw, 0);
        bw.write_f32(1.5).unwrap();
        bw.write_i32(3).unwrap();
        bw.write_i32(0).unwrap();
        bw.align_to_4().unwrap();

        bw.into_inner().into_inner()
    }

    fn read(bytes: Vec<u8>, plan: &FieldPlan) -> AnimationClip {
        let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little).unwrap();
        let clip = AnimationClip::read_from(&mut br, plan).unwrap();
        assert_eq!(br.bytes_left(), 0);
        clip
    }

    #[test]
    fn test_read_current_clip() {
        let clip = read(current_clip_bytes(), &plan(2019, 4));
        assert_eq!(clip.name, "Walk");
        assert!(!clip.legacy);
        assert!(clip.use_high_quality_curve);
        assert_eq!(clip.rotation_curves.len(), 1);
        assert_eq!(clip.rotation_curves[0].path, "Root");
        assert_eq!(clip.rotation_curves[0].curve.keys[0].value, Quaternion::IDENTITY);
        assert_eq!(clip.sample_rate, 30.0);
        assert_eq!(clip.bounds.unwrap().extent, Vector3::new(0.5, 1.0, 0.5));
        assert_eq!(clip.muscle_clip_size, 128);
        assert!(clip.has_generic_root_transform);
        assert_eq!(clip.events.len(), 1);
        assert_eq!(clip.events[0].function_name, "OnStep");
        assert_eq!(clip.events[0].int_parameter, 3);
        assert!(clip.check_channel_coverage());
    }

    #[test]
    fn test_truncated_clip_fails() {
        let mut bytes = current_clip_bytes();
        bytes.truncate(bytes.len() - 10);
        let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little).unwrap();
        let err = AnimationClip::read_from(&mut br, &plan(2019, 4)).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_convert_adds_synthesized_curves() {
        let mut clip = read(current_clip_bytes(), &plan(2019, 4));
        let mut map = TosMap::new();
        map.insert(path_hash("Hips"), "Hips".to_string());
        clip.convert(&TosTable::from_map(map)).unwrap();

        assert_eq!(clip.position_curves.len(), 1);
        let position = &clip.position_curves[0];
        assert_eq!(position.path, "Hips");
        assert_eq!(position.curve.keys[0].value, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(clip.rotation_curves.len(), 1);

        // converting twice does not duplicate curves
        let mut map = TosMap::new();
        map.insert(path_hash("Hips"), "Hips".to_string());
        clip.convert(&TosTable::from_map(map)).unwrap();
        assert_eq!(clip.position_curves.len(), 1);
    }

    #[test]
    fn test_document_shape() {
        let clip = read(current_clip_bytes(), &plan(2019, 4));
        let doc = clip.to_document();
        let keys = doc.keys();
        assert_eq!(keys[0], "m_Name");
        assert_eq!(keys[1], "serializedVersion");
        assert_eq!(keys.last(), Some(&"m_Events"));
        assert_eq!(doc.get("m_Name").and_then(Node::as_str), Some("Walk"));
        let bindings = doc
            .get("m_ClipBindingConstant")
            .and_then(|n| n.get("genericBindings"))
            .and_then(Node::as_sequence)
            .unwrap();
        assert_eq!(bindings.len(), 1);

        let raw = clip.to_raw_document();
        assert!(raw.get("m_MuscleClip").is_some());
        assert!(raw.get("m_AclRange").is_none());
    }

    #[test]
    fn test_legacy_4x_clip_uses_value_table() {
        let plan = plan(4, 2);
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        bw.write_aligned_string("Idle").unwrap();
        bw.write_i32(AnimationType::Generic as i32).unwrap();
        bw.write_bool(false).unwrap();
        bw.align_to_4().unwrap();
        // rotation, compressed, position, scale, float
        for _ in 0..5 {
            bw.write_i32(0).unwrap();
        }
        bw.write_f32(60.0).unwrap();
        bw.write_i32(0).unwrap();
        for _ in 0..6 {
            bw.write_f32(0.0).unwrap();
        }
        bw.write_u32(0).unwrap();
        write_muscle(&mut bw, &plan, |bw| {
            bw.write_u32_array(&[]).unwrap();
            bw.write_u32(0).unwrap();
            bw.write_i32(0).unwrap();
            bw.write_u32(0).unwrap();
            bw.write_f32(60.0).unwrap();
            bw.write_f32(0.0).unwrap();
            bw.write_f32_array(&[]).unwrap();
            bw.write_u8_array(&[]).unwrap();
            bw.align_to_4().unwrap();
            bw.write_u32(0).unwrap();
            bw.write_i32(3).unwrap();
            for type_id in [POSITION_TYPE_ID, 0, 0] {
                bw.write_u32(path_hash("Hips")).unwrap();
                bw.write_u32(type_id).unwrap();
                bw.write_u32(0).unwrap();
                bw.write_u32(0).unwrap();
            }
        });
        bw.write_i32(0).unwrap();

        let clip = read(bw.into_inner().into_inner(), &plan);
        assert_eq!(clip.animation_type, Some(AnimationType::Generic));
        assert!(!clip.legacy);
        assert!(clip.binding_constant.is_none());

        let bindings = clip.bindings();
        assert_eq!(bindings.bindings.len(), 1);
        assert_eq!(bindings.bindings[0].path, path_hash("Hips"));
        // three bindings slots, but the clip stores no channels
        assert!(!clip.check_channel_coverage());
    }
}
