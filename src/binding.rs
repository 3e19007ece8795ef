//! Generic bindings: what each run of flat channels animates.

use std::io::{Read, Seek};

use hashbrown::HashSet;

use crate::{
    binary::BinaryReader,
    document::{Node, ToDocument},
    error::{ClipError, Result},
    field_plan::FieldPlan,
    humanoid::{HumanoidMuscle, LAST},
    shared_formats::{class_ids, PPtr},
    version::EngineVersion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformType {
    Translation = 1,
    Rotation = 2,
    Scaling = 3,
    EulerRotation = 4,
}

impl TransformType {
    pub fn from_attribute(attribute: u32) -> Option<Self> {
        match attribute {
            1 => Some(Self::Translation),
            2 => Some(Self::Rotation),
            3 => Some(Self::Scaling),
            4 => Some(Self::EulerRotation),
            _ => None,
        }
    }

    /// Number of consecutive channels the property spans.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Rotation => 4,
            _ => 3,
        }
    }
}

/// Owner kind stored in `GenericBinding::custom_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BindingCustomType {
    None = 0,
    Transform = 4,
    AnimatorMuscle = 8,
    BlendShape = 20,
    Renderer = 21,
    RendererMaterial = 22,
    SpriteRenderer = 23,
    MonoBehaviour = 24,
    Light = 25,
    RendererShadows = 26,
    ParticleSystem = 27,
    RectTransform = 28,
    LineRenderer = 29,
    TrailRenderer = 30,
    PositionConstraint = 31,
    RotationConstraint = 32,
    ScaleConstraint = 33,
    AimConstraint = 34,
    ParentConstraint = 35,
    LookAtConstraint = 36,
    Camera = 37,
}

impl BindingCustomType {
    pub fn from_u8(value: u8) -> Option<Self> {
        use BindingCustomType::*;
        Some(match value {
            0 => None,
            4 => Transform,
            8 => AnimatorMuscle,
            20 => BlendShape,
            21 => Renderer,
            22 => RendererMaterial,
            23 => SpriteRenderer,
            24 => MonoBehaviour,
            25 => Light,
            26 => RendererShadows,
            27 => ParticleSystem,
            28 => RectTransform,
            29 => LineRenderer,
            30 => TrailRenderer,
            31 => PositionConstraint,
            32 => RotationConstraint,
            33 => ScaleConstraint,
            34 => AimConstraint,
            35 => ParentConstraint,
            36 => LookAtConstraint,
            37 => Camera,
            _ => return Option::None,
        })
    }

    pub fn name(&self) -> &'static str {
        use BindingCustomType::*;
        match self {
            None => "None",
            Transform => "Transform",
            AnimatorMuscle => "AnimatorMuscle",
            BlendShape => "BlendShape",
            Renderer => "Renderer",
            RendererMaterial => "RendererMaterial",
            SpriteRenderer => "SpriteRenderer",
            MonoBehaviour => "MonoBehaviour",
            Light => "Light",
            RendererShadows => "RendererShadows",
            ParticleSystem => "ParticleSystem",
            RectTransform => "RectTransform",
            LineRenderer => "LineRenderer",
            TrailRenderer => "TrailRenderer",
            PositionConstraint => "PositionConstraint",
            RotationConstraint => "RotationConstraint",
            ScaleConstraint => "ScaleConstraint",
            AimConstraint => "AimConstraint",
            ParentConstraint => "ParentConstraint",
            LookAtConstraint => "LookAtConstraint",
            Camera => "Camera",
        }
    }
}

/// Semantic classification of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Transform(TransformType),
    Muscle(HumanoidMuscle),
    PPtr,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenericBinding {
    pub path: u32,
    pub attribute: u32,
    pub script: PPtr,
    pub class_id: i32,
    pub custom_type: u8,
    pub is_pptr_curve: u8,
}

impl GenericBinding {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let path = br.read_u32()?;
        let attribute = br.read_u32()?;
        let script = PPtr::read_from(br, plan)?;
        let class_id = if plan.binding_class_id_32 {
            br.read_i32()?
        } else {
            br.read_u16()? as i32
        };
        let custom_type = br.read_u8()?;
        let is_pptr_curve = br.read_u8()?;
        br.align_to_4()?;

        Ok(Self {
            path,
            attribute,
            script,
            class_id,
            custom_type,
            is_pptr_curve,
        })
    }

    pub fn transform_type(&self) -> Option<TransformType> {
        TransformType::from_attribute(self.attribute)
    }

    pub fn is_transform(&self) -> bool {
        self.class_id == class_ids::TRANSFORM
            || (self.class_id == class_ids::RECT_TRANSFORM && self.transform_type().is_some())
    }

    /// Channels consumed: 3 for position/scale/euler, 4 for rotation, 1 otherwise.
    pub fn slot_count(&self) -> usize {
        if self.is_transform() {
            self.transform_type().map_or(1, |t| t.dimension())
        } else {
            1
        }
    }

    pub fn custom(&self) -> Option<BindingCustomType> {
        BindingCustomType::from_u8(self.custom_type)
    }

    /// Classifies the binding. Muscle codes are remapped from the numbering
    /// used by `version`.
    pub fn kind(&self, version: EngineVersion) -> BindingKind {
        if self.is_transform() {
            if let Some(t) = self.transform_type() {
                return BindingKind::Transform(t);
            }
        }
        if self.is_pptr_curve != 0 {
            return BindingKind::PPtr;
        }
        let muscle_owner = matches!(
            self.custom(),
            Some(BindingCustomType::None | BindingCustomType::AnimatorMuscle)
        );
        if self.class_id == class_ids::ANIMATOR && muscle_owner {
            let muscle = HumanoidMuscle::from_raw(self.attribute, version);
            if muscle.code() < LAST {
                return BindingKind::Muscle(muscle);
            }
        }
        BindingKind::Generic
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClipBindingConstant {
    pub bindings: Vec<GenericBinding>,
    pub pptr_curve_mapping: Vec<PPtr>,
}

impl AnimationClipBindingConstant {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let count = br.read_count(12)?;
        let mut bindings = Vec::with_capacity(count);
        for _ in 0..count {
            bindings.push(GenericBinding::read_from(br, plan)?);
        }

        let count = br.read_count(8)?;
        let mut pptr_curve_mapping = Vec::with_capacity(count);
        for _ in 0..count {
            pptr_curve_mapping.push(PPtr::read_from(br, plan)?);
        }

        Ok(Self {
            bindings,
            pptr_curve_mapping,
        })
    }

    pub fn total_slot_count(&self) -> usize {
        self.bindings.iter().map(GenericBinding::slot_count).sum()
    }

    /// Binding covering channel `index`, together with the first channel
    /// index of that binding.
    pub fn find_binding_slot(&self, index: usize) -> Result<(&GenericBinding, usize)> {
        let mut curves = 0;
        for binding in &self.bindings {
            let start = curves;
            curves += binding.slot_count();
            if curves > index {
                return Ok((binding, start));
            }
        }
        Err(ClipError::ChannelIndexOutOfRange {
            index: index as i64,
            total: curves,
        })
    }

    pub fn find_binding(&self, index: usize) -> Result<&GenericBinding> {
        self.find_binding_slot(index).map(|(binding, _)| binding)
    }

    /// Path hashes referenced by the bindings, in first-seen order.
    pub fn distinct_paths(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        self.bindings
            .iter()
            .map(|b| b.path)
            .filter(|path| seen.insert(*path))
            .collect()
    }
}

impl ToDocument for GenericBinding {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add_serialized_version(2)
            .add("path", self.path)
            .add("attribute", self.attribute)
            .add("script", self.script.to_document())
            .add("classID", self.class_id)
            .add("customType", self.custom_type)
            .add("isPPtrCurve", self.is_pptr_curve)
    }
}

impl ToDocument for AnimationClipBindingConstant {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("genericBindings", self.bindings.to_document())
            .add("pptrCurveMapping", self.pptr_curve_mapping.to_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryWriter, Endian};
    use crate::version::GameVariant;
    use std::io::Cursor;

    fn binding(class_id: i32, attribute: u32) -> GenericBinding {
        GenericBinding {
            path: attribute * 10,
            attribute,
            class_id,
            ..Default::default()
        }
    }

    fn constant() -> AnimationClipBindingConstant {
        AnimationClipBindingConstant {
            bindings: vec![
                binding(class_ids::TRANSFORM, 1),
                binding(class_ids::TRANSFORM, 2),
                binding(class_ids::ANIMATOR, 50),
                binding(class_ids::RECT_TRANSFORM, 4),
                binding(class_ids::RECT_TRANSFORM, 9),
            ],
            pptr_curve_mapping: Vec::new(),
        }
    }

    #[test]
    fn test_slot_counts() {
        let c = constant();
        let slots: Vec<usize> = c.bindings.iter().map(GenericBinding::slot_count).collect();
        assert_eq!(slots, vec![3, 4, 1, 3, 1]);
        assert_eq!(c.total_slot_count(), 12);
    }

    #[test]
    fn test_rect_transform_counts_like_transform() {
        let version = EngineVersion::new(2019, 4, 0);
        let rotation = binding(class_ids::RECT_TRANSFORM, TransformType::Rotation as u32);
        assert!(rotation.is_transform());
        assert_eq!(rotation.slot_count(), 4);
        assert_eq!(
            rotation.kind(version),
            BindingKind::Transform(TransformType::Rotation)
        );

        let position = binding(class_ids::RECT_TRANSFORM, TransformType::Translation as u32);
        assert_eq!(position.slot_count(), 3);

        // anchors and sizes are single float channels
        let anchor = binding(class_ids::RECT_TRANSFORM, 9);
        assert!(!anchor.is_transform());
        assert_eq!(anchor.slot_count(), 1);
        assert_eq!(anchor.kind(version), BindingKind::Generic);

        let c = AnimationClipBindingConstant {
            bindings: vec![rotation, position, anchor],
            pptr_curve_mapping: Vec::new(),
        };
        assert_eq!(c.find_binding_slot(4).unwrap().1, 4);
        assert_eq!(c.find_binding_slot(7).unwrap().1, 7);
    }

    #[test]
    fn test_find_binding() {
        let c = constant();
        assert_eq!(c.find_binding(0).unwrap().attribute, 1);
        assert_eq!(c.find_binding(2).unwrap().attribute, 1);
        assert_eq!(c.find_binding(3).unwrap().attribute, 2);
        assert_eq!(c.find_binding_slot(6).unwrap().1, 3);
        assert_eq!(c.find_binding(7).unwrap().attribute, 50);
        assert_eq!(c.find_binding(11).unwrap().attribute, 9);
        assert!(matches!(
            c.find_binding(12),
            Err(ClipError::ChannelIndexOutOfRange { index: 12, total: 12 })
        ));
    }

    #[test]
    fn test_empty_constant_rejects_index_zero() {
        let c = AnimationClipBindingConstant::default();
        assert!(c.find_binding(0).is_err());
    }

    #[test]
    fn test_kind() {
        let version = EngineVersion::new(2019, 4, 0);
        assert_eq!(
            binding(class_ids::TRANSFORM, 2).kind(version),
            BindingKind::Transform(TransformType::Rotation)
        );
        assert!(matches!(
            binding(class_ids::ANIMATOR, 50).kind(version),
            BindingKind::Muscle(_)
        ));
        assert_eq!(binding(class_ids::ANIMATOR, 5000).kind(version), BindingKind::Generic);
        let pptr = GenericBinding {
            is_pptr_curve: 1,
            class_id: 212,
            ..Default::default()
        };
        assert_eq!(pptr.kind(version), BindingKind::PPtr);
    }

    #[test]
    fn test_distinct_paths() {
        let mut c = constant();
        c.bindings.push(binding(class_ids::TRANSFORM, 1));
        assert_eq!(c.distinct_paths(), vec![10, 20, 500, 40, 90]);
    }

    #[test]
    fn test_read_binding_class_id_width() {
        let old = FieldPlan::new(EngineVersion::new(5, 5, 0), GameVariant::Standard);
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        bw.write_u32(77).unwrap();
        bw.write_u32(2).unwrap();
        bw.write_i32(0).unwrap();
        bw.write_i64(0).unwrap();
        bw.write_u16(4).unwrap();
        bw.write_u8(0).unwrap();
        bw.write_u8(0).unwrap();
        let bytes = bw.into_inner().into_inner();

        let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little).unwrap();
        let b = GenericBinding::read_from(&mut br, &old).unwrap();
        assert_eq!(br.bytes_left(), 0);
        assert_eq!(b.path, 77);
        assert_eq!(b.class_id, class_ids::TRANSFORM);
        assert_eq!(b.slot_count(), 4);
    }
}
