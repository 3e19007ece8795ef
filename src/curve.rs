//! Keyframed curves and the per-target curve arrays of a clip.

use std::io::{Read, Seek};

use hashbrown::HashSet;

use crate::{
    binary::BinaryReader,
    document::{Node, ToDocument},
    error::{ClipError, Result},
    field_plan::FieldPlan,
    packed::{PackedFloatVector, PackedIntVector, PackedQuatVector},
    shared_formats::{Float, PPtr, Quaternion, Vector3},
};

/// Wrap mode code written for curves synthesized by the converter
pub const DEFAULT_WRAP_MODE: i32 = 2;
/// Rotation order code written for curves synthesized by the converter
pub const DEFAULT_ROTATION_ORDER: i32 = 4;
/// Compressed key times are integer ticks of this many seconds
pub const COMPRESSED_TIME_STEP: f32 = 0.01;

/// Value type a keyframe can carry.
pub trait CurveValue: Copy + PartialEq + ToDocument {
    fn read<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self>;

    /// Additive identity, used for unset slopes.
    fn zero() -> Self;

    /// Weight assumed when the format does not store one.
    fn default_weight() -> Self;
}

impl CurveValue for Float {
    fn read<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Float(br.read_f32()?))
    }

    fn zero() -> Self {
        Float(0.0)
    }

    fn default_weight() -> Self {
        Float(1.0 / 3.0)
    }
}

impl CurveValue for Vector3 {
    fn read<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Vector3::read_from(br)
    }

    fn zero() -> Self {
        Vector3::splat(0.0)
    }

    fn default_weight() -> Self {
        Vector3::splat(1.0 / 3.0)
    }
}

impl CurveValue for Quaternion {
    fn read<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Quaternion::read_from(br)
    }

    fn zero() -> Self {
        Quaternion::splat(0.0)
    }

    fn default_weight() -> Self {
        Quaternion::splat(1.0 / 3.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    pub in_slope: T,
    pub out_slope: T,
    pub weighted_mode: i32,
    pub in_weight: T,
    pub out_weight: T,
    pub tangent_mode: i32,
}

impl<T: CurveValue> Keyframe<T> {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let time = br.read_f32()?;
        let value = T::read(br)?;
        let in_slope = T::read(br)?;
        let out_slope = T::read(br)?;

        let (weighted_mode, in_weight, out_weight) = if plan.keyframe_weights {
            (br.read_i32()?, T::read(br)?, T::read(br)?)
        } else {
            (0, T::default_weight(), T::default_weight())
        };

        Ok(Self {
            time,
            value,
            in_slope,
            out_slope,
            weighted_mode,
            in_weight,
            out_weight,
            tangent_mode: 0,
        })
    }

    /// Flat key with zero slopes.
    pub fn new(time: f32, value: T) -> Self {
        Self {
            tangent_mode: 0,
            ..Self::with_slopes(time, value, T::zero(), T::zero())
        }
    }

    pub fn with_slopes(time: f32, value: T, in_slope: T, out_slope: T) -> Self {
        Self {
            time,
            value,
            in_slope,
            out_slope,
            weighted_mode: 0,
            in_weight: T::default_weight(),
            out_weight: T::default_weight(),
            tangent_mode: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCurve<T> {
    pub keys: Vec<Keyframe<T>>,
    pub pre_infinity: i32,
    pub post_infinity: i32,
    pub rotation_order: i32,
}

impl<T> Default for AnimationCurve<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            pre_infinity: DEFAULT_WRAP_MODE,
            post_infinity: DEFAULT_WRAP_MODE,
            rotation_order: DEFAULT_ROTATION_ORDER,
        }
    }
}

impl<T: CurveValue> AnimationCurve<T> {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let count = br.read_count(4)?;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(Keyframe::read_from(br, plan)?);
        }

        let pre_infinity = br.read_i32()?;
        let post_infinity = br.read_i32()?;
        let rotation_order = if plan.curve_rotation_order {
            br.read_i32()?
        } else {
            0
        };

        Ok(Self {
            keys,
            pre_infinity,
            post_infinity,
            rotation_order,
        })
    }

    pub fn from_keys(keys: Vec<Keyframe<T>>) -> Self {
        Self {
            keys,
            ..Self::default()
        }
    }
}

/// Identity of a curve within a clip: two curves with the same target
/// animate the same property and are merged rather than duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurveTarget {
    pub path: String,
    pub attribute: String,
    pub class_id: i32,
}

pub trait TargetedCurve {
    fn target(&self) -> CurveTarget;
}

/// Merges two curve arrays by target. Curves from `first` win and keep
/// their position ahead of the survivors of `second`.
pub fn union_curves<C: TargetedCurve>(first: Vec<C>, second: Vec<C>) -> Vec<C> {
    let mut seen: HashSet<CurveTarget> = first.iter().map(TargetedCurve::target).collect();
    let mut merged = first;
    for curve in second {
        if seen.insert(curve.target()) {
            merged.push(curve);
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuaternionCurve {
    pub curve: AnimationCurve<Quaternion>,
    pub path: String,
}

/// Used for euler, position and scale curves
#[derive(Debug, Clone, PartialEq)]
pub struct Vector3Curve {
    pub curve: AnimationCurve<Vector3>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatCurve {
    pub curve: AnimationCurve<Float>,
    pub attribute: String,
    pub path: String,
    pub class_id: i32,
    pub script: PPtr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PPtrKeyframe {
    pub time: f32,
    pub value: PPtr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PPtrCurve {
    pub curve: Vec<PPtrKeyframe>,
    pub attribute: String,
    pub path: String,
    pub class_id: i32,
    pub script: PPtr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressedAnimationCurve {
    pub path: String,
    pub times: PackedIntVector,
    pub values: PackedQuatVector,
    pub slopes: PackedFloatVector,
    pub pre_infinity: i32,
    pub post_infinity: i32,
}

impl QuaternionCurve {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            curve: AnimationCurve::read_from(br, plan)?,
            path: br.read_aligned_string()?,
        })
    }

    pub fn new(path: impl Into<String>, keys: Vec<Keyframe<Quaternion>>) -> Self {
        Self {
            curve: AnimationCurve::from_keys(keys),
            path: path.into(),
        }
    }
}

impl Vector3Curve {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            curve: AnimationCurve::read_from(br, plan)?,
            path: br.read_aligned_string()?,
        })
    }

    pub fn new(path: impl Into<String>, keys: Vec<Keyframe<Vector3>>) -> Self {
        Self {
            curve: AnimationCurve::from_keys(keys),
            path: path.into(),
        }
    }
}

impl FloatCurve {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            curve: AnimationCurve::read_from(br, plan)?,
            attribute: br.read_aligned_string()?,
            path: br.read_aligned_string()?,
            class_id: br.read_i32()?,
            script: PPtr::read_from(br, plan)?,
        })
    }

    pub fn new(
        path: impl Into<String>,
        attribute: impl Into<String>,
        class_id: i32,
        script: PPtr,
        keys: Vec<Keyframe<Float>>,
    ) -> Self {
        Self {
            curve: AnimationCurve::from_keys(keys),
            attribute: attribute.into(),
            path: path.into(),
            class_id,
            script,
        }
    }
}

impl PPtrKeyframe {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            time: br.read_f32()?,
            value: PPtr::read_from(br, plan)?,
        })
    }
}

impl PPtrCurve {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let count = br.read_count(8)?;
        let mut curve = Vec::with_capacity(count);
        for _ in 0..count {
            curve.push(PPtrKeyframe::read_from(br, plan)?);
        }

        Ok(Self {
            curve,
            attribute: br.read_aligned_string()?,
            path: br.read_aligned_string()?,
            class_id: br.read_i32()?,
            script: PPtr::read_from(br, plan)?,
        })
    }
}

impl CompressedAnimationCurve {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            path: br.read_aligned_string()?,
            times: PackedIntVector::read_from(br)?,
            values: PackedQuatVector::read_from(br)?,
            slopes: PackedFloatVector::read_from(br)?,
            pre_infinity: br.read_i32()?,
            post_infinity: br.read_i32()?,
        })
    }

    /// Expands the packed keys into a regular rotation curve.
    pub fn decompress(&self) -> Result<QuaternionCurve> {
        let times = self.times.unpack_ints()?;
        let values = self.values.unpack_quats()?;
        if times.len() != values.len() {
            return Err(ClipError::InvalidLength {
                offset: 0,
                count: values.len() as i64,
            });
        }

        let slopes = if self.slopes.num_items as usize == times.len() * 8 && !times.is_empty() {
            self.slopes.unpack_all()?
        } else {
            Vec::new()
        };

        let keys = times
            .iter()
            .zip(&values)
            .enumerate()
            .map(|(i, (&tick, &value))| {
                let time = tick as f32 * COMPRESSED_TIME_STEP;
                match slopes.get(i * 8..i * 8 + 8) {
                    Some(s) => Keyframe::with_slopes(
                        time,
                        value,
                        Quaternion::from_slice(&s[..4]),
                        Quaternion::from_slice(&s[4..]),
                    ),
                    None => Keyframe::new(time, value),
                }
            })
            .collect();

        let mut curve = AnimationCurve::from_keys(keys);
        curve.pre_infinity = self.pre_infinity;
        curve.post_infinity = self.post_infinity;

        Ok(QuaternionCurve {
            curve,
            path: self.path.clone(),
        })
    }
}

impl TargetedCurve for QuaternionCurve {
    fn target(&self) -> CurveTarget {
        CurveTarget {
            path: self.path.clone(),
            attribute: String::new(),
            class_id: 0,
        }
    }
}

impl TargetedCurve for Vector3Curve {
    fn target(&self) -> CurveTarget {
        CurveTarget {
            path: self.path.clone(),
            attribute: String::new(),
            class_id: 0,
        }
    }
}

impl TargetedCurve for FloatCurve {
    fn target(&self) -> CurveTarget {
        CurveTarget {
            path: self.path.clone(),
            attribute: self.attribute.clone(),
            class_id: self.class_id,
        }
    }
}

impl TargetedCurve for PPtrCurve {
    fn target(&self) -> CurveTarget {
        CurveTarget {
            path: self.path.clone(),
            attribute: self.attribute.clone(),
            class_id: self.class_id,
        }
    }
}

impl<T: CurveValue> ToDocument for Keyframe<T> {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add_serialized_version(3)
            .add("time", self.time)
            .add("value", self.value.to_document())
            .add("inSlope", self.in_slope.to_document())
            .add("outSlope", self.out_slope.to_document())
            .add("tangentMode", self.tangent_mode)
            .add("weightedMode", self.weighted_mode)
            .add("inWeight", self.in_weight.to_document())
            .add("outWeight", self.out_weight.to_document())
    }
}

impl<T: CurveValue> ToDocument for AnimationCurve<T> {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add_serialized_version(2)
            .add("m_Curve", self.keys.to_document())
            .add("m_PreInfinity", self.pre_infinity)
            .add("m_PostInfinity", self.post_infinity)
            .add("m_RotationOrder", self.rotation_order)
    }
}

impl ToDocument for QuaternionCurve {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("curve", self.curve.to_document())
            .add("path", self.path.as_str())
    }
}

impl ToDocument for Vector3Curve {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("curve", self.curve.to_document())
            .add("path", self.path.as_str())
    }
}

impl ToDocument for FloatCurve {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("curve", self.curve.to_document())
            .add("attribute", self.attribute.as_str())
            .add("path", self.path.as_str())
            .add("classID", self.class_id)
            .add("script", self.script.to_document())
    }
}

impl ToDocument for PPtrKeyframe {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("time", self.time)
            .add("value", self.value.to_document())
    }
}

impl ToDocument for PPtrCurve {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("curve", self.curve.to_document())
            .add("attribute", self.attribute.as_str())
            .add("path", self.path.as_str())
            .add("classID", self.class_id)
            .add("script", self.script.to_document())
    }
}

impl ToDocument for CompressedAnimationCurve {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_Path", self.path.as_str())
            .add("m_Times", self.times.to_document())
            .add("m_Values", self.values.to_document())
            .add("m_Slopes", self.slopes.to_document())
            .add("m_PreInfinity", self.pre_infinity)
            .add("m_PostInfinity", self.post_infinity)
    }
}
