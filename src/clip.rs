//! The inner `Clip`: one logical animation spread across up to four physical
//! encodings, plus the legacy flat binding table of older formats.

use std::io::{Read, Seek};

use tracing::debug;

use crate::{
    binary::BinaryReader,
    binding::{AnimationClipBindingConstant, GenericBinding, TransformType},
    document::{Node, ToDocument},
    error::Result,
    field_plan::FieldPlan,
    shared_formats::{class_ids, PPtr},
    streamed::StreamedClip,
};

/// `ValueConstant::type_id` of a position triple (CRC of "PositionX")
pub const POSITION_TYPE_ID: u32 = 4174552735;
/// `ValueConstant::type_id` of a rotation quadruple (CRC of "QuaternionX")
pub const ROTATION_TYPE_ID: u32 = 2211994246;
/// `ValueConstant::type_id` of a scale triple (CRC of "ScaleX")
pub const SCALE_TYPE_ID: u32 = 1512518241;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseClip {
    pub frame_count: i32,
    pub curve_count: u32,
    pub sample_rate: f32,
    pub begin_time: f32,
    pub sample_array: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantClip {
    pub data: Vec<f32>,
}

/// Payload of an ACL-compressed clip. Decoding it belongs to an external codec.
#[derive(Debug, Clone, PartialEq)]
pub enum AclData {
    Bytes(Vec<u8>),
    Words(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AclClip {
    pub data: AclData,
    pub curve_count: u32,
    pub const_curve_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueConstant {
    pub id: u32,
    pub type_id: u32,
    pub value_type: u32,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueArrayConstant {
    pub values: Vec<ValueConstant>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clip {
    pub streamed: StreamedClip,
    pub dense: DenseClip,
    pub constant: Option<ConstantClip>,
    pub acl: Option<AclClip>,
    pub binding: Option<ValueArrayConstant>,
}

/// Physical encoding backing a run of channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    Streamed,
    Dense,
    Constant,
    Acl,
}

/// A contiguous run of channel indices served by one encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpan {
    pub source: ChannelSource,
    pub start: usize,
    pub count: usize,
}

impl ChannelSpan {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.count
    }
}

impl DenseClip {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            frame_count: br.read_i32()?,
            curve_count: br.read_u32()?,
            sample_rate: br.read_f32()?,
            begin_time: br.read_f32()?,
            sample_array: br.read_f32_array()?,
        })
    }

    /// Time of the last sampled frame, zero for an empty clip.
    pub fn last_frame_time(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.frame_count as f32 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Value of `curve` at `frame`, if the sample array holds it.
    pub fn sample(&self, frame: usize, curve: usize) -> Option<f32> {
        self.sample_array
            .get(frame * self.curve_count as usize + curve)
            .copied()
    }
}

impl ConstantClip {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            data: br.read_f32_array()?,
        })
    }
}

impl AclClip {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let data = if plan.acl_word_data {
            AclData::Words(br.read_u32_array()?)
        } else {
            let bytes = br.read_u8_array()?;
            br.align_to_4()?;
            AclData::Bytes(bytes)
        };
        let curve_count = br.read_u32()?;
        let const_curve_count = if plan.acl_word_data {
            Some(br.read_u32()?)
        } else {
            None
        };

        Ok(Self {
            data,
            curve_count,
            const_curve_count,
        })
    }

    pub fn is_set(&self) -> bool {
        match &self.data {
            AclData::Bytes(b) => !b.is_empty(),
            AclData::Words(w) => !w.is_empty(),
        }
    }
}

impl ValueConstant {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let id = br.read_u32()?;
        let type_id = if plan.value_constant_type_id {
            br.read_u32()?
        } else {
            0
        };
        Ok(Self {
            id,
            type_id,
            value_type: br.read_u32()?,
            index: br.read_u32()?,
        })
    }
}

impl ValueArrayConstant {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let count = br.read_count(12)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(ValueConstant::read_from(br, plan)?);
        }
        Ok(Self { values })
    }

    /// Turns the flat value table into semantic bindings.
    ///
    /// Position and scale triples and rotation quadruples are recognised by
    /// their type id and collapse into a single transform binding; anything
    /// else is one generic animator channel keyed by its raw id.
    pub fn to_generic_bindings(&self) -> Vec<GenericBinding> {
        let mut bindings = Vec::new();
        let mut i = 0;
        while i < self.values.len() {
            let value = &self.values[i];
            let (transform, advance) = match value.type_id {
                POSITION_TYPE_ID => (Some(TransformType::Translation), 3),
                ROTATION_TYPE_ID => (Some(TransformType::Rotation), 4),
                SCALE_TYPE_ID => (Some(TransformType::Scaling), 3),
                _ => (None, 1),
            };

            bindings.push(match transform {
                Some(kind) => GenericBinding {
                    path: value.id,
                    attribute: kind as u32,
                    script: PPtr::default(),
                    class_id: class_ids::TRANSFORM,
                    custom_type: 0,
                    is_pptr_curve: 0,
                },
                None => GenericBinding {
                    path: 0,
                    attribute: value.id,
                    script: PPtr::default(),
                    class_id: class_ids::ANIMATOR,
                    custom_type: 0,
                    is_pptr_curve: 0,
                },
            });
            i += advance;
        }
        bindings
    }
}

impl Clip {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let streamed = StreamedClip::read_from(br)?;
        let dense = DenseClip::read_from(br)?;

        let mut acl = None;
        if plan.acl_after_dense {
            acl = Some(AclClip::read_from(br, plan)?);
        }
        let constant = if plan.constant_clip {
            Some(ConstantClip::read_from(br)?)
        } else {
            None
        };
        if plan.acl_after_constant {
            acl = Some(AclClip::read_from(br, plan)?);
        }
        let binding = if plan.value_array_binding {
            Some(ValueArrayConstant::read_from(br, plan)?)
        } else {
            None
        };

        debug!(
            offset = br.position(),
            streamed = streamed.curve_count,
            dense = dense.curve_count,
            constant = constant.as_ref().map_or(0, |c| c.data.len()),
            acl = acl.as_ref().map_or(0, |a| a.curve_count),
            "decoded clip"
        );

        Ok(Self {
            streamed,
            dense,
            constant,
            acl,
            binding,
        })
    }

    /// Binding constant derived from the legacy value table, if this clip has one.
    pub fn convert_legacy_bindings(&self) -> Option<AnimationClipBindingConstant> {
        self.binding.as_ref().map(|values| AnimationClipBindingConstant {
            bindings: values.to_generic_bindings(),
            pptr_curve_mapping: Vec::new(),
        })
    }

    pub fn constant_count(&self) -> usize {
        self.constant.as_ref().map_or(0, |c| c.data.len())
    }

    /// Channel index space: streamed, then dense, then constant, then ACL.
    pub fn channel_layout(&self) -> Vec<ChannelSpan> {
        let counts = [
            (ChannelSource::Streamed, self.streamed.curve_count as usize),
            (ChannelSource::Dense, self.dense.curve_count as usize),
            (ChannelSource::Constant, self.constant_count()),
            (
                ChannelSource::Acl,
                self.acl.as_ref().map_or(0, |a| a.curve_count as usize),
            ),
        ];

        let mut start = 0;
        counts
            .into_iter()
            .map(|(source, count)| {
                let span = ChannelSpan {
                    source,
                    start,
                    count,
                };
                start += count;
                span
            })
            .collect()
    }

    pub fn total_channel_count(&self) -> usize {
        self.channel_layout().iter().map(|s| s.count).sum()
    }

    /// Which encoding serves `index`, and the index within that encoding.
    pub fn locate_channel(&self, index: usize) -> Option<(ChannelSource, usize)> {
        self.channel_layout()
            .into_iter()
            .find(|span| span.contains(index))
            .map(|span| (span.source, index - span.start))
    }
}

impl ToDocument for DenseClip {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_FrameCount", self.frame_count)
            .add("m_CurveCount", self.curve_count)
            .add("m_SampleRate", self.sample_rate)
            .add("m_BeginTime", self.begin_time)
            .add("m_SampleArray", self.sample_array.as_slice())
    }
}

impl ToDocument for ConstantClip {
    fn to_document(&self) -> Node {
        Node::mapping().add("data", self.data.as_slice())
    }
}

impl ToDocument for AclClip {
    fn to_document(&self) -> Node {
        let data = match &self.data {
            AclData::Bytes(b) => Node::from(b.as_slice()),
            AclData::Words(w) => Node::Sequence(w.iter().map(|&x| Node::from(x)).collect()),
        };
        let node = Node::mapping()
            .add("m_ClipData", data)
            .add("m_CurveCount", self.curve_count);
        match self.const_curve_count {
            Some(count) => node.add("m_ConstCurveCount", count),
            None => node,
        }
    }
}

impl ToDocument for ValueConstant {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_ID", self.id)
            .add("m_TypeID", self.type_id)
            .add("m_Type", self.value_type)
            .add("m_Index", self.index)
    }
}

impl ToDocument for Clip {
    fn to_document(&self) -> Node {
        let mut node = Node::mapping()
            .add("m_StreamedClip", self.streamed.to_document())
            .add("m_DenseClip", self.dense.to_document());
        if let Some(constant) = &self.constant {
            node = node.add("m_ConstantClip", constant.to_document());
        }
        if let Some(acl) = &self.acl {
            node = node.add("m_ACLClip", acl.to_document());
        }
        if let Some(binding) = &self.binding {
            node = node.add(
                "m_Binding",
                Node::mapping().add("m_ValueArray", binding.values.to_document()),
            );
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryWriter, Endian};
    use crate::version::{EngineVersion, GameVariant};
    use std::io::Cursor;

    fn plan(major: i32, minor: i32, variant: GameVariant) -> FieldPlan {
        FieldPlan::new(EngineVersion::new(major, minor, 0), variant)
    }

    fn write_clip(bw: &mut BinaryWriter<Cursor<Vec<u8>>>, plan: &FieldPlan) {
        // streamed: no words, 2 curves
        bw.write_u32_array(&[]).unwrap();
        bw.write_u32(2).unwrap();
        // dense: 2 frames of 3 curves
        bw.write_i32(2).unwrap();
        bw.write_u32(3).unwrap();
        bw.write_f32(30.0).unwrap();
        bw.write_f32(0.0).unwrap();
        bw.write_f32_array(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        if plan.acl_after_dense {
            bw.write_u32_array(&[7, 8]).unwrap();
            bw.write_u32(4).unwrap();
            bw.write_u32(1).unwrap();
        }
        if plan.constant_clip {
            bw.write_f32_array(&[9.0]).unwrap();
        }
        if plan.acl_after_constant {
            bw.write_u8_array(&[1, 2, 3]).unwrap();
            bw.align_to_4().unwrap();
            bw.write_u32(0).unwrap();
        }
        if plan.value_array_binding {
            bw.write_i32(0).unwrap();
        }
    }

    fn read(plan: &FieldPlan) -> Clip {
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        write_clip(&mut bw, plan);
        let bytes = bw.into_inner().into_inner();
        let mut br = BinaryReader::new(Cursor::new(bytes), Endian::Little).unwrap();
        let clip = Clip::read_from(&mut br, plan).unwrap();
        assert_eq!(br.bytes_left(), 0);
        clip
    }

    #[test]
    fn test_standard_clip_layout() {
        let clip = read(&plan(2019, 4, GameVariant::Standard));
        assert!(clip.binding.is_none());
        let acl = clip.acl.as_ref().unwrap();
        assert_eq!(acl.data, AclData::Bytes(vec![1, 2, 3]));
        assert_eq!(acl.const_curve_count, None);

        let layout = clip.channel_layout();
        assert_eq!(layout[0], ChannelSpan { source: ChannelSource::Streamed, start: 0, count: 2 });
        assert_eq!(layout[1], ChannelSpan { source: ChannelSource::Dense, start: 2, count: 3 });
        assert_eq!(layout[2], ChannelSpan { source: ChannelSource::Constant, start: 5, count: 1 });
        assert_eq!(clip.total_channel_count(), 6);
        assert_eq!(clip.locate_channel(4), Some((ChannelSource::Dense, 2)));
        assert_eq!(clip.locate_channel(6), None);
        assert_eq!(clip.dense.sample(1, 2), Some(5.0));
    }

    #[test]
    fn test_sr_clip_reads_word_acl_after_dense() {
        let clip = read(&plan(2019, 4, GameVariant::SR));
        let acl = clip.acl.as_ref().unwrap();
        assert_eq!(acl.data, AclData::Words(vec![7, 8]));
        assert_eq!(acl.const_curve_count, Some(1));
        assert_eq!(clip.total_channel_count(), 2 + 3 + 1 + 4);
    }

    #[test]
    fn test_tot_clip_has_no_acl() {
        let clip = read(&plan(2019, 4, GameVariant::TOT));
        assert!(clip.acl.is_none());
    }

    #[test]
    fn test_old_clip_has_legacy_table() {
        let clip = read(&plan(4, 2, GameVariant::Standard));
        assert!(clip.constant.is_none());
        assert!(clip.binding.is_some());
        assert!(clip.convert_legacy_bindings().is_some());
    }

    #[test]
    fn test_legacy_conversion_advances_by_type() {
        let value = |id, type_id| ValueConstant {
            id,
            type_id,
            value_type: 0,
            index: 0,
        };
        let table = ValueArrayConstant {
            values: vec![
                value(10, POSITION_TYPE_ID),
                value(10, 0),
                value(10, 0),
                value(11, ROTATION_TYPE_ID),
                value(11, 0),
                value(11, 0),
                value(11, 0),
                value(55, 1),
                value(12, SCALE_TYPE_ID),
                value(12, 0),
                value(12, 0),
            ],
        };
        let bindings = table.to_generic_bindings();
        assert_eq!(bindings.len(), 4);

        assert_eq!((bindings[0].path, bindings[0].attribute), (10, 1));
        assert_eq!((bindings[1].path, bindings[1].attribute), (11, 2));
        assert_eq!(bindings[2].class_id, class_ids::ANIMATOR);
        assert_eq!((bindings[2].path, bindings[2].attribute), (0, 55));
        assert_eq!((bindings[3].path, bindings[3].attribute), (12, 3));

        let slots: Vec<usize> = bindings.iter().map(GenericBinding::slot_count).collect();
        assert_eq!(slots, vec![3, 4, 1, 3]);
        assert_eq!(slots.iter().sum::<usize>(), table.values.len());
    }
}
