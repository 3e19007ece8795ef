//! Rebuilds editor-style curves from the channel data of a muscle clip.
//!
//! Streamed, dense and constant channels are walked in index order; each
//! channel finds its binding and the values of a binding's consecutive
//! channels are merged into one key of the matching curve type.

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::{
    animation_clip::AnimationClip,
    binding::{AnimationClipBindingConstant, BindingCustomType, BindingKind, GenericBinding, TransformType},
    clip::Clip,
    curve::{
        CurveTarget, CurveValue, FloatCurve, Keyframe, PPtrCurve, PPtrKeyframe, QuaternionCurve,
        TargetedCurve, Vector3Curve,
    },
    error::{ClipError, Result},
    shared_formats::{class_ids, Float, PPtr, Quaternion, Vector3},
    streamed::StreamedFrame,
    tos::{path_hash, TosTable},
    version::EngineVersion,
};

/// Property names recognised from their hashed attribute code.
const KNOWN_ATTRIBUTES: [&str; 7] = [
    "m_IsActive",
    "m_Enabled",
    "m_Sprite",
    "m_Color.r",
    "m_Color.g",
    "m_Color.b",
    "m_Color.a",
];

/// Curves synthesized from one clip, grouped like the clip's own arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedCurves {
    pub rotations: Vec<QuaternionCurve>,
    pub eulers: Vec<Vector3Curve>,
    pub translations: Vec<Vector3Curve>,
    pub scales: Vec<Vector3Curve>,
    pub floats: Vec<FloatCurve>,
    pub pptrs: Vec<PPtrCurve>,
}

impl ConvertedCurves {
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
            && self.eulers.is_empty()
            && self.translations.is_empty()
            && self.scales.is_empty()
            && self.floats.is_empty()
            && self.pptrs.is_empty()
    }
}

/// Curves in first-touched order, looked up by target.
struct CurveSet<C> {
    curves: Vec<C>,
    index: HashMap<CurveTarget, usize>,
}

impl<C> Default for CurveSet<C> {
    fn default() -> Self {
        Self {
            curves: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<C: TargetedCurve> CurveSet<C> {
    fn entry(&mut self, target: CurveTarget, make: impl FnOnce() -> C) -> &mut C {
        let next = self.curves.len();
        let i = *self.index.entry(target).or_insert(next);
        if i == next {
            self.curves.push(make());
        }
        &mut self.curves[i]
    }
}

/// Values of one binding at one point in time.
struct Sample<'v> {
    time: f32,
    values: &'v [f32],
    /// In and out slopes per channel; empty for flat keys
    in_slopes: &'v [f32],
    out_slopes: &'v [f32],
}

impl Sample<'_> {
    fn key<T: CurveValue>(&self, make: impl Fn(&[f32]) -> T) -> Keyframe<T> {
        if self.in_slopes.is_empty() {
            Keyframe::new(self.time, make(self.values))
        } else {
            Keyframe::with_slopes(
                self.time,
                make(self.values),
                make(self.in_slopes),
                make(self.out_slopes),
            )
        }
    }
}

pub struct ClipConverter<'a> {
    version: EngineVersion,
    bindings: &'a AnimationClipBindingConstant,
    tos: &'a TosTable,
    rotations: CurveSet<QuaternionCurve>,
    eulers: CurveSet<Vector3Curve>,
    translations: CurveSet<Vector3Curve>,
    scales: CurveSet<Vector3Curve>,
    floats: CurveSet<FloatCurve>,
    pptrs: CurveSet<PPtrCurve>,
}

impl<'a> ClipConverter<'a> {
    fn new(
        version: EngineVersion,
        bindings: &'a AnimationClipBindingConstant,
        tos: &'a TosTable,
    ) -> Self {
        Self {
            version,
            bindings,
            tos,
            rotations: CurveSet::default(),
            eulers: CurveSet::default(),
            translations: CurveSet::default(),
            scales: CurveSet::default(),
            floats: CurveSet::default(),
            pptrs: CurveSet::default(),
        }
    }

    /// Synthesizes the curves stored in `clip`'s muscle clip. Clips without
    /// one convert to nothing.
    pub fn process(clip: &AnimationClip, tos: &TosTable) -> Result<ConvertedCurves> {
        let Some(muscle) = &clip.muscle_clip else {
            return Ok(ConvertedCurves::default());
        };
        let bindings = clip.bindings();
        let mut converter = ClipConverter::new(clip.version, &bindings, tos);
        converter.convert_clip(&muscle.clip)?;
        Ok(converter.finish())
    }

    fn convert_clip(&mut self, clip: &Clip) -> Result<()> {
        let frames = clip.streamed.read_data()?;
        let streamed_count = clip.streamed.curve_count as usize;
        let dense_count = clip.dense.curve_count as usize;

        let last_streamed = match frames.len() {
            n if n >= 2 => frames[n - 2].time,
            _ => 0.0,
        };
        let last_frame = clip.dense.last_frame_time().max(last_streamed);

        self.process_streams(&frames)?;
        self.process_dense(clip, streamed_count)?;
        if let Some(constant) = &clip.constant {
            self.process_constant(&constant.data, streamed_count + dense_count, last_frame)?;
        }
        if clip.acl.as_ref().is_some_and(|acl| acl.is_set()) {
            debug!("ACL channels left to the external codec");
        }
        Ok(())
    }

    fn process_streams(&mut self, frames: &[StreamedFrame]) -> Result<()> {
        // frame 0 and the final frame are bookends
        let inner = match frames.len() {
            n if n > 2 => &frames[1..n - 1],
            _ => return Ok(()),
        };

        for frame in inner {
            let mut i = 0;
            while i < frame.keys.len() {
                let key = &frame.keys[i];
                let index = usize::try_from(key.index).map_err(|_| ClipError::ChannelIndexOutOfRange {
                    index: i64::from(key.index),
                    total: self.bindings.total_slot_count(),
                })?;
                let (binding, start) = self.bindings.find_binding_slot(index)?;
                let binding = *binding;
                if start != index {
                    warn!(index, start, "streamed key does not start its binding, skipped");
                    i += 1;
                    continue;
                }

                let dim = binding.slot_count();
                let Some(keys) = frame.keys.get(i..i + dim) else {
                    warn!(index, dim, time = frame.time, "streamed frame ends inside a binding");
                    break;
                };
                let values: Vec<f32> = keys.iter().map(|k| k.value).collect();
                let in_slopes: Vec<f32> = keys.iter().map(|k| k.in_slope).collect();
                let out_slopes: Vec<f32> = keys.iter().map(|k| k.out_slope).collect();
                self.add_sample(
                    &binding,
                    Sample {
                        time: frame.time,
                        values: &values,
                        in_slopes: &in_slopes,
                        out_slopes: &out_slopes,
                    },
                );
                i += dim;
            }
        }
        Ok(())
    }

    fn process_dense(&mut self, clip: &Clip, streamed_count: usize) -> Result<()> {
        let dense = &clip.dense;
        let curve_count = dense.curve_count as usize;
        if curve_count == 0 || dense.sample_rate <= 0.0 {
            return Ok(());
        }

        for frame in 0..dense.frame_count.max(0) as usize {
            let time = dense.begin_time + frame as f32 / dense.sample_rate;
            let row = frame * curve_count;
            let mut curve = 0;
            while curve < curve_count {
                let index = streamed_count + curve;
                let binding = *self.bindings.find_binding(index)?;
                let dim = binding.slot_count();
                let values = dense
                    .sample_array
                    .get(row + curve..row + curve + dim)
                    .ok_or(ClipError::InvalidLength {
                        offset: 0,
                        count: dense.sample_array.len() as i64,
                    })?;
                self.add_sample(&binding, Sample { time, values, in_slopes: &[], out_slopes: &[] });
                curve += dim;
            }
        }
        Ok(())
    }

    fn process_constant(&mut self, data: &[f32], base: usize, last_frame: f32) -> Result<()> {
        for time in [0.0, last_frame] {
            let mut i = 0;
            while i < data.len() {
                let binding = *self.bindings.find_binding(base + i)?;
                let dim = binding.slot_count();
                let values = data.get(i..i + dim).ok_or(ClipError::InvalidLength {
                    offset: 0,
                    count: data.len() as i64,
                })?;
                self.add_sample(&binding, Sample { time, values, in_slopes: &[], out_slopes: &[] });
                i += dim;
            }
        }
        Ok(())
    }

    fn add_sample(&mut self, binding: &GenericBinding, sample: Sample<'_>) {
        match binding.kind(self.version) {
            BindingKind::Transform(kind) => self.add_transform(binding, kind, &sample),
            BindingKind::Muscle(muscle) => {
                let Some(attribute) = muscle.attribute_name() else {
                    return;
                };
                let target = CurveTarget {
                    path: String::new(),
                    attribute,
                    class_id: class_ids::ANIMATOR,
                };
                self.add_float(target, PPtr::default(), &sample);
            }
            BindingKind::PPtr => self.add_pptr(binding, &sample),
            BindingKind::Generic => {
                let target = CurveTarget {
                    path: self.tos.path(binding.path),
                    attribute: self.attribute_name(binding),
                    class_id: binding.class_id,
                };
                self.add_float(target, binding.script, &sample);
            }
        }
    }

    fn add_transform(&mut self, binding: &GenericBinding, kind: TransformType, sample: &Sample<'_>) {
        let path = self.tos.path(binding.path);
        let target = CurveTarget {
            path: path.clone(),
            attribute: String::new(),
            class_id: 0,
        };
        if kind == TransformType::Rotation {
            let key = sample.key(Quaternion::from_slice);
            self.rotations
                .entry(target, || QuaternionCurve::new(path, Vec::new()))
                .curve
                .keys
                .push(key);
            return;
        }

        let set = match kind {
            TransformType::Translation => &mut self.translations,
            TransformType::Scaling => &mut self.scales,
            _ => &mut self.eulers,
        };
        let key = sample.key(Vector3::from_slice);
        set.entry(target, || Vector3Curve::new(path, Vec::new()))
            .curve
            .keys
            .push(key);
    }

    fn add_float(&mut self, target: CurveTarget, script: PPtr, sample: &Sample<'_>) {
        let key = sample.key(|v| Float(v[0]));
        let CurveTarget {
            path,
            attribute,
            class_id,
        } = target.clone();
        self.floats
            .entry(target, || FloatCurve::new(path, attribute, class_id, script, Vec::new()))
            .curve
            .keys
            .push(key);
    }

    fn add_pptr(&mut self, binding: &GenericBinding, sample: &Sample<'_>) {
        let slot = sample.values[0] as usize;
        let Some(&value) = self.bindings.pptr_curve_mapping.get(slot) else {
            warn!(slot, mapped = self.bindings.pptr_curve_mapping.len(), "pointer key outside curve mapping, skipped");
            return;
        };
        let target = CurveTarget {
            path: self.tos.path(binding.path),
            attribute: self.attribute_name(binding),
            class_id: binding.class_id,
        };
        let CurveTarget {
            path,
            attribute,
            class_id,
        } = target.clone();
        self.pptrs
            .entry(target, || PPtrCurve {
                curve: Vec::new(),
                attribute,
                path,
                class_id,
                script: binding.script,
            })
            .curve
            .push(PPtrKeyframe {
                time: sample.time,
                value,
            });
    }

    /// Readable name of a generic property. Only hashes of a few well-known
    /// properties can be reversed; the rest keep their numeric code.
    fn attribute_name(&self, binding: &GenericBinding) -> String {
        if let Some(name) = KNOWN_ATTRIBUTES
            .iter()
            .find(|name| path_hash(name) == binding.attribute)
        {
            return name.to_string();
        }
        match binding.custom() {
            Some(BindingCustomType::None) => format!("attribute_{}", binding.attribute),
            Some(custom) => format!("{}.{}", custom.name(), binding.attribute),
            None => {
                warn!(
                    custom_type = binding.custom_type,
                    attribute = binding.attribute,
                    "unknown binding custom type"
                );
                format!("attribute_{}", binding.attribute)
            }
        }
    }

    fn finish(self) -> ConvertedCurves {
        let curves = ConvertedCurves {
            rotations: self.rotations.curves,
            eulers: self.eulers.curves,
            translations: self.translations.curves,
            scales: self.scales.curves,
            floats: self.floats.curves,
            pptrs: self.pptrs.curves,
        };
        debug!(
            rotations = curves.rotations.len(),
            translations = curves.translations.len(),
            floats = curves.floats.len(),
            pptrs = curves.pptrs.len(),
            "converted clip curves"
        );
        curves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{ConstantClip, DenseClip};
    use crate::humanoid::MUSCLES;
    use crate::muscle::ClipMuscleConstant;
    use crate::streamed::StreamedClip;
    use crate::tos::TosMap;

    fn transform(path: &str, kind: TransformType) -> GenericBinding {
        GenericBinding {
            path: path_hash(path),
            attribute: kind as u32,
            class_id: class_ids::TRANSFORM,
            ..Default::default()
        }
    }

    fn clip_with(inner: Clip, bindings: Vec<GenericBinding>) -> AnimationClip {
        AnimationClip {
            version: EngineVersion::new(2019, 4, 0),
            muscle_clip: Some(ClipMuscleConstant {
                clip: inner,
                ..Default::default()
            }),
            binding_constant: Some(AnimationClipBindingConstant {
                bindings,
                pptr_curve_mapping: vec![PPtr { file_id: 0, path_id: 42 }],
            }),
            ..Default::default()
        }
    }

    fn tos(paths: &[&str]) -> TosTable {
        let map: TosMap = paths.iter().map(|p| (path_hash(p), p.to_string())).collect();
        TosTable::from_map(map)
    }

    #[test]
    fn test_dense_position_curve() {
        let inner = Clip {
            dense: DenseClip {
                frame_count: 2,
                curve_count: 3,
                sample_rate: 10.0,
                begin_time: 0.5,
                sample_array: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            },
            ..Default::default()
        };
        let clip = clip_with(inner, vec![transform("Hips", TransformType::Translation)]);
        let curves = ClipConverter::process(&clip, &tos(&["Hips"])).unwrap();

        assert_eq!(curves.translations.len(), 1);
        let curve = &curves.translations[0];
        assert_eq!(curve.path, "Hips");
        let keys = &curve.curve.keys;
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].time, 0.5);
        assert_eq!(keys[0].value, Vector3::new(1.0, 2.0, 3.0));
        assert!((keys[1].time - 0.6).abs() < 1e-6);
        assert_eq!(keys[1].value, Vector3::new(4.0, 5.0, 6.0));
        assert!(curves.rotations.is_empty());
    }

    #[test]
    fn test_constant_rotation_spans_clip() {
        let inner = Clip {
            dense: DenseClip {
                frame_count: 4,
                curve_count: 1,
                sample_rate: 2.0,
                begin_time: 0.0,
                sample_array: vec![0.0; 4],
            },
            constant: Some(ConstantClip {
                data: vec![0.0, 0.0, 0.0, 1.0],
            }),
            ..Default::default()
        };
        let generic = GenericBinding {
            path: path_hash("Light"),
            attribute: 7,
            class_id: 108,
            ..Default::default()
        };
        let clip = clip_with(inner, vec![generic, transform("Hips/Spine", TransformType::Rotation)]);
        let curves = ClipConverter::process(&clip, &TosTable::default()).unwrap();

        let rotation = &curves.rotations[0];
        // unresolved hashes fall back to their decimal text
        assert_eq!(rotation.path, path_hash("Hips/Spine").to_string());
        let times: Vec<f32> = rotation.curve.keys.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 2.0]);
        assert_eq!(rotation.curve.keys[1].value, Quaternion::IDENTITY);

        assert_eq!(curves.floats.len(), 1);
        assert_eq!(curves.floats[0].attribute, "attribute_7");
        assert_eq!(curves.floats[0].curve.keys.len(), 4);
    }

    #[test]
    fn test_muscle_channel_becomes_animator_float() {
        let inner = Clip {
            constant: Some(ConstantClip { data: vec![0.25] }),
            ..Default::default()
        };
        let muscle = GenericBinding {
            attribute: MUSCLES,
            class_id: class_ids::ANIMATOR,
            ..Default::default()
        };
        let clip = clip_with(inner, vec![muscle]);
        let curves = ClipConverter::process(&clip, &TosTable::default()).unwrap();

        let curve = &curves.floats[0];
        assert_eq!(curve.path, "");
        assert_eq!(curve.attribute, "Spine Front-Back");
        assert_eq!(curve.class_id, class_ids::ANIMATOR);
        assert_eq!(curve.curve.keys[0].value, Float(0.25));
    }

    #[test]
    fn test_pptr_channel_uses_mapping() {
        let inner = Clip {
            constant: Some(ConstantClip { data: vec![0.0] }),
            ..Default::default()
        };
        let sprite = GenericBinding {
            path: 0,
            attribute: path_hash("m_Sprite"),
            class_id: 212,
            custom_type: BindingCustomType::SpriteRenderer as u8,
            is_pptr_curve: 1,
            ..Default::default()
        };
        let clip = clip_with(inner, vec![sprite]);
        let curves = ClipConverter::process(&clip, &TosTable::default()).unwrap();

        let curve = &curves.pptrs[0];
        assert_eq!(curve.attribute, "m_Sprite");
        assert_eq!(curve.curve.len(), 2);
        assert_eq!(curve.curve[0].value.path_id, 42);
    }

    #[test]
    fn test_unbound_channel_is_an_error() {
        let inner = Clip {
            constant: Some(ConstantClip { data: vec![1.0, 2.0] }),
            ..Default::default()
        };
        let clip = clip_with(inner, vec![transform("", TransformType::Translation)]);
        let err = ClipConverter::process(&clip, &TosTable::default()).unwrap_err();
        assert!(matches!(err, ClipError::InvalidLength { .. }));

        let inner = Clip {
            constant: Some(ConstantClip { data: vec![1.0, 2.0] }),
            ..Default::default()
        };
        let clip = clip_with(inner, vec![GenericBinding::default()]);
        let err = ClipConverter::process(&clip, &TosTable::default()).unwrap_err();
        assert!(matches!(
            err,
            ClipError::ChannelIndexOutOfRange { index: 1, total: 1 }
        ));
    }

    #[test]
    fn test_negative_streamed_index_is_reported() {
        let words = vec![
            0.0f32.to_bits(),
            0,
            1.0f32.to_bits(),
            1,
            -3i32 as u32,
            0,
            0,
            0,
            0,
            2.0f32.to_bits(),
            0,
        ];
        let inner = Clip {
            streamed: StreamedClip {
                data: words,
                curve_count: 1,
            },
            ..Default::default()
        };
        let clip = clip_with(inner, vec![GenericBinding::default()]);
        let err = ClipConverter::process(&clip, &TosTable::default()).unwrap_err();
        assert!(matches!(
            err,
            ClipError::ChannelIndexOutOfRange { index: -3, total: 1 }
        ));
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_clip_without_muscle_converts_to_nothing() {
        let clip = AnimationClip::default();
        assert!(ClipConverter::process(&clip, &TosTable::default()).unwrap().is_empty());
    }
}
