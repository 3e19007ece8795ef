//! Bit-packed vectors.
//!
//! Packed vectors keep their raw byte buffer; unpacking is a pure function of
//! the buffer, the bit width, the item count and the layout parameters, and is
//! only done when a caller asks for values.

mod packed_util;

use std::io::{Read, Seek};

use crate::{
    binary::BinaryReader,
    document::{Node, ToDocument},
    error::{ClipError, Result},
    shared_formats::Quaternion,
};

use packed_util::{check_bit_size, mask, BitCursor};

#[cfg(test)]
pub(crate) use packed_util::BitPacker;

/// Quantized floats: `value = raw / ((2^bit_size - 1) / range) + start`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedFloatVector {
    pub num_items: u32,
    pub range: f32,
    pub start: f32,
    pub data: Vec<u8>,
    pub bit_size: u8,
}

/// Unsigned integers of a fixed bit width
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedIntVector {
    pub num_items: u32,
    pub data: Vec<u8>,
    pub bit_size: u8,
}

/// Unit quaternions stored as a 3-bit selector plus three 9/10-bit components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedQuatVector {
    pub num_items: u32,
    pub data: Vec<u8>,
}

impl PackedFloatVector {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        let num_items = br.read_u32()?;
        let range = br.read_f32()?;
        let start = br.read_f32()?;
        let data = br.read_u8_array()?;
        br.align_to_4()?;
        let bit_size = br.read_u8()?;
        br.align_to_4()?;

        Ok(Self {
            num_items,
            range,
            start,
            data,
            bit_size,
        })
    }

    /// Unpacks every item as one chunk of one item.
    pub fn unpack_all(&self) -> Result<Vec<f32>> {
        self.unpack_floats(1, 4, 0, None)
    }

    /// Unpacks `num_chunks` chunks of `item_count_in_chunk` items starting at
    /// item `start`. `chunk_stride` is in bytes; interleaved layouts (e.g.
    /// position and scale packed together) pass a stride covering both.
    pub fn unpack_floats(
        &self,
        item_count_in_chunk: usize,
        chunk_stride: usize,
        start: usize,
        num_chunks: Option<usize>,
    ) -> Result<Vec<f32>> {
        if self.num_items == 0 || item_count_in_chunk == 0 {
            return Ok(Vec::new());
        }
        let bit_size = check_bit_size(self.bit_size)?;
        let step = chunk_stride / 4;
        if step == 0 {
            return Err(ClipError::InvalidLength {
                offset: 0,
                count: chunk_stride as i64,
            });
        }

        let num_chunks = num_chunks.unwrap_or(self.num_items as usize / item_count_in_chunk);
        let end = chunk_stride * num_chunks / 4;
        let scale = 1.0 / self.range;
        let max = mask(bit_size) as f32;

        let mut cursor = BitCursor::new(&self.data, bit_size as usize * start);
        let mut values = Vec::with_capacity(num_chunks * item_count_in_chunk);
        for _ in (0..end).step_by(step) {
            for _ in 0..item_count_in_chunk {
                let x = cursor.read(bit_size)?;
                values.push(x as f32 / (scale * max) + self.start);
            }
        }
        Ok(values)
    }
}

impl PackedIntVector {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        let num_items = br.read_u32()?;
        let data = br.read_u8_array()?;
        br.align_to_4()?;
        let bit_size = br.read_u8()?;
        br.align_to_4()?;

        Ok(Self {
            num_items,
            data,
            bit_size,
        })
    }

    pub fn unpack_ints(&self) -> Result<Vec<i32>> {
        unpack_ints(&self.data, self.bit_size, self.num_items as usize)
    }
}

/// Reads `count` integers of `bit_size` bits each from the start of `data`.
pub fn unpack_ints(data: &[u8], bit_size: u8, count: usize) -> Result<Vec<i32>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let bit_size = check_bit_size(bit_size)?;
    let mut cursor = BitCursor::new(data, 0);
    (0..count)
        .map(|_| cursor.read(bit_size).map(|x| x as i32))
        .collect()
}

impl PackedQuatVector {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        let num_items = br.read_u32()?;
        let data = br.read_u8_array()?;
        br.align_to_4()?;

        Ok(Self { num_items, data })
    }

    pub fn unpack_quats(&self) -> Result<Vec<Quaternion>> {
        unpack_quaternions(&self.data, self.num_items as usize)
    }
}

/// Smallest-three style quaternion unpacking.
///
/// Bits 0-1 of the selector name the omitted component, bit 2 is its sign.
/// The component right after the omitted one (cyclically) is stored in 9 bits,
/// the other two in 10 bits, so each item fills exactly 32 bits on disk.
/// Stored components whose squares sum past 1 are rescaled onto the unit
/// sphere with the omitted component at 0.
pub fn unpack_quaternions(data: &[u8], count: usize) -> Result<Vec<Quaternion>> {
    let mut cursor = BitCursor::new(data, 0);
    let mut quats = Vec::with_capacity(count);

    for _ in 0..count {
        let flags = cursor.read(3)?;
        let omitted = (flags & 3) as usize;

        let mut q = Quaternion::splat(0.0);
        let mut sum = 0.0f32;
        for j in 0..4 {
            if j == omitted {
                continue;
            }
            let bit_size = if (omitted + 1) % 4 == j { 9 } else { 10 };
            let x = cursor.read(bit_size)?;
            let v = x as f32 / (0.5 * mask(bit_size) as f32) - 1.0;
            q.set_component(j, v);
            sum += v * v;
        }

        if sum > 1.0 {
            let scale = 1.0 / sum.sqrt();
            for j in (0..4).filter(|&j| j != omitted) {
                q.set_component(j, q.component(j) * scale);
            }
            q.set_component(omitted, 0.0);
        } else {
            let mut last = (1.0 - sum).sqrt();
            if flags & 4 != 0 {
                last = -last;
            }
            q.set_component(omitted, last);
        }
        quats.push(q);
    }

    Ok(quats)
}

impl ToDocument for PackedFloatVector {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_NumItems", self.num_items)
            .add("m_Range", self.range)
            .add("m_Start", self.start)
            .add("m_Data", self.data.as_slice())
            .add("m_BitSize", self.bit_size)
    }
}

impl ToDocument for PackedIntVector {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_NumItems", self.num_items)
            .add("m_Data", self.data.as_slice())
            .add("m_BitSize", self.bit_size)
    }
}

impl ToDocument for PackedQuatVector {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_NumItems", self.num_items)
            .add("m_Data", self.data.as_slice())
    }
}
