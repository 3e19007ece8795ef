//! Delta-streamed curve encoding.
//!
//! The payload is a word buffer holding a run of frames, each frame a time and
//! a sparse list of Hermite keys. Inbound slopes are not stored and are
//! inferred from the nearest earlier key on the same curve.

use std::io::{Cursor, Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::{
    binary::{BinaryReader, Endian},
    document::{Node, ToDocument},
    error::Result,
};

/// Smallest time delta used when inferring a slope
const MIN_SLOPE_DX: f32 = 0.0001;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamedClip {
    pub data: Vec<u32>,
    pub curve_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamedCurveKey {
    pub index: i32,
    pub coeff: [f32; 4],
    pub value: f32,
    pub out_slope: f32,
    pub in_slope: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamedFrame {
    pub time: f32,
    pub keys: Vec<StreamedCurveKey>,
}

impl StreamedCurveKey {
    pub fn new(index: i32, coeff: [f32; 4]) -> Self {
        Self {
            index,
            coeff,
            value: coeff[3],
            out_slope: coeff[2],
            in_slope: 0.0,
        }
    }

    fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        let index = br.read_i32()?;
        let mut coeff = [0.0; 4];
        for c in coeff.iter_mut() {
            *c = br.read_f32()?;
        }
        Ok(Self::new(index, coeff))
    }

    /// A key whose cubic, quadratic and linear terms are all zero holds its
    /// value until the next key.
    pub fn is_stepped(&self) -> bool {
        self.coeff[0] == 0.0 && self.coeff[1] == 0.0 && self.coeff[2] == 0.0
    }

    /// Inbound slope of `next`, the following key on the same curve `dx`
    /// seconds later.
    pub fn next_in_slope(&self, dx: f32, next: &StreamedCurveKey) -> f32 {
        if self.is_stepped() {
            return f32::INFINITY;
        }

        let dx = dx.max(MIN_SLOPE_DX);
        let dy = next.value - self.value;
        let length = 1.0 / (dx * dx);
        let d1 = self.out_slope * dx;
        let d2 = dy + dy + dy - d1 - d1 - self.coeff[1] / length;
        d2 / dx
    }
}

impl StreamedFrame {
    fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        let time = br.read_f32()?;
        let count = br.read_count(20)?;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(StreamedCurveKey::read_from(br)?);
        }
        Ok(Self { time, keys })
    }

    pub fn key(&self, index: i32) -> Option<&StreamedCurveKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}

impl StreamedClip {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            data: br.read_u32_array()?,
            curve_count: br.read_u32()?,
        })
    }

    /// Decodes every frame in the buffer and fills in inferred inbound slopes.
    pub fn read_data(&self) -> Result<Vec<StreamedFrame>> {
        let mut buffer = vec![0u8; self.data.len() * 4];
        LittleEndian::write_u32_into(&self.data, &mut buffer);

        let mut br = BinaryReader::new(Cursor::new(buffer), Endian::Little)?;
        let mut frames = Vec::new();
        while br.bytes_left() > 0 {
            frames.push(StreamedFrame::read_from(&mut br)?);
        }

        infer_in_slopes(&mut frames);
        Ok(frames)
    }
}

/// Frames 0, 1 and the last frame are bookends and keep their stored slope.
fn infer_in_slopes(frames: &mut [StreamedFrame]) {
    let count = frames.len();
    for frame_index in 2..count.saturating_sub(1) {
        let (earlier, rest) = frames.split_at_mut(frame_index);
        let frame = &mut rest[0];
        let time = frame.time;
        for key in frame.keys.iter_mut() {
            let found = earlier
                .iter()
                .rev()
                .find_map(|pre| pre.key(key.index).map(|pre_key| (pre.time, *pre_key)));
            if let Some((pre_time, pre_key)) = found {
                key.in_slope = pre_key.next_in_slope(time - pre_time, key);
                trace!(
                    frame = frame_index,
                    index = key.index,
                    in_slope = key.in_slope,
                    "inferred streamed slope"
                );
            }
        }
    }
}

impl ToDocument for StreamedClip {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add(
                "data",
                self.data.iter().map(|&w| Node::from(w)).collect::<Vec<_>>(),
            )
            .add("curveCount", self.curve_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryWriter;

    fn encode(frames: &[(f32, Vec<(i32, [f32; 4])>)]) -> StreamedClip {
        let mut bw = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
        for (time, keys) in frames {
            bw.write_f32(*time).unwrap();
            bw.write_i32(keys.len() as i32).unwrap();
            for (index, coeff) in keys {
                bw.write_i32(*index).unwrap();
                for c in coeff {
                    bw.write_f32(*c).unwrap();
                }
            }
        }
        let bytes = bw.into_inner().into_inner();
        let mut data = vec![0u32; bytes.len() / 4];
        LittleEndian::read_u32_into(&bytes, &mut data);
        StreamedClip {
            data,
            curve_count: 1,
        }
    }

    #[test]
    fn test_two_frames_have_no_inferred_slopes() {
        let clip = encode(&[
            (0.0, vec![(0, [0.0, 0.0, 1.0, 5.0])]),
            (1.0, vec![(0, [0.0, 0.0, 2.0, 7.0])]),
        ]);
        let frames = clip.read_data().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].keys[0].value, 5.0);
        assert_eq!(frames[1].keys[0].out_slope, 2.0);
        assert!(frames.iter().all(|f| f.keys[0].in_slope == 0.0));
    }

    #[test]
    fn test_five_frames_infer_from_previous_frame() {
        let clip = encode(&[
            (0.0, vec![(0, [0.0, 0.0, 1.0, 5.0])]),
            (0.5, vec![(0, [0.5, 0.25, 2.0, 6.0])]),
            (1.0, vec![(0, [0.0, 0.0, 3.0, 7.5])]),
            (1.5, vec![(0, [0.0, 0.0, 1.0, 8.0])]),
            (2.0, vec![(0, [0.0, 0.0, 0.0, 8.0])]),
        ]);
        let frames = clip.read_data().unwrap();
        assert_eq!(frames.len(), 5);

        // Predecessor is frame 1: value 6, out slope 2, coeff[1] 0.25.
        let dx = 0.5f32;
        let dy = 7.5f32 - 6.0;
        let expected = (3.0 * dy - 2.0 * (2.0 * dx) - 0.25 * dx * dx) / dx;
        assert!((frames[2].keys[0].in_slope - expected).abs() < 1e-5);

        assert_eq!(frames[0].keys[0].in_slope, 0.0);
        assert_eq!(frames[1].keys[0].in_slope, 0.0);
        assert_eq!(frames[4].keys[0].in_slope, 0.0);
        assert_ne!(frames[3].keys[0].in_slope, 0.0);
    }

    #[test]
    fn test_stepped_key_gives_infinite_slope() {
        let clip = encode(&[
            (0.0, vec![(0, [0.0, 0.0, 0.0, 1.0])]),
            (0.0, vec![(0, [0.0, 0.0, 0.0, 1.0]), (1, [0.0, 0.0, 0.0, 2.0])]),
            (1.0, vec![(1, [0.0, 0.0, 1.0, 2.0])]),
            (2.0, vec![(0, [0.0, 0.0, 0.0, 3.0]), (1, [0.0, 0.0, 0.0, 4.0])]),
            (3.0, vec![]),
        ]);
        let frames = clip.read_data().unwrap();

        // Curve 1 is stepped in frame 1, so frame 2 sees +inf.
        assert_eq!(frames[2].keys[0].in_slope, f32::INFINITY);
        // Curve 0 skips frame 2 and finds its stepped predecessor in frame 1.
        assert_eq!(frames[3].key(0).unwrap().in_slope, f32::INFINITY);
        // Curve 1 in frame 3 follows a smooth key.
        assert!(frames[3].key(1).unwrap().in_slope.is_finite());
    }

    #[test]
    fn test_missing_predecessor_keeps_default() {
        let clip = encode(&[
            (0.0, vec![(0, [0.0, 0.0, 1.0, 1.0])]),
            (0.0, vec![(0, [0.0, 0.0, 1.0, 1.0])]),
            (0.5, vec![(7, [0.0, 0.0, 1.0, 1.0])]),
            (1.0, vec![]),
        ]);
        let frames = clip.read_data().unwrap();
        assert_eq!(frames[2].keys[0].in_slope, 0.0);
    }

    #[test]
    fn test_truncated_frame_fails() {
        let mut clip = encode(&[(0.0, vec![(0, [0.0, 0.0, 1.0, 1.0])])]);
        clip.data.pop();
        assert!(clip.read_data().is_err());
    }
}
