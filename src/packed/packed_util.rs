use crate::error::{ClipError, Result};

/// Little-endian bit cursor: bits are consumed from the low end of each byte
/// and accumulated into the output from its low end upward.
pub(crate) struct BitCursor<'a> {
    data: &'a [u8],
    index: usize,
    bit: u32,
}

impl<'a> BitCursor<'a> {
    pub(crate) fn new(data: &'a [u8], start_bit: usize) -> Self {
        Self {
            data,
            index: start_bit / 8,
            bit: (start_bit % 8) as u32,
        }
    }

    pub(crate) fn read(&mut self, bit_size: u32) -> Result<u32> {
        let mut x: u64 = 0;
        let mut bits = 0;
        while bits < bit_size {
            let byte = *self
                .data
                .get(self.index)
                .ok_or(ClipError::BufferUnderrun {
                    offset: self.index as u64,
                    wanted: 1,
                    available: 0,
                })?;
            x |= ((byte >> self.bit) as u64) << bits;
            let num = (bit_size - bits).min(8 - self.bit);
            self.bit += num;
            bits += num;
            if self.bit == 8 {
                self.index += 1;
                self.bit = 0;
            }
        }
        Ok((x & mask(bit_size)) as u32)
    }
}

pub(crate) fn mask(bit_size: u32) -> u64 {
    (1u64 << bit_size) - 1
}

pub(crate) fn check_bit_size(bit_size: u8) -> Result<u32> {
    match bit_size {
        1..=32 => Ok(bit_size as u32),
        _ => Err(ClipError::InvalidBitWidth {
            bit_size: bit_size as u32,
        }),
    }
}

/// Inverse of `BitCursor::read`, used to build fixtures.
#[cfg(test)]
pub(crate) struct BitPacker {
    pub(crate) data: Vec<u8>,
    bit: usize,
}

#[cfg(test)]
impl BitPacker {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            bit: 0,
        }
    }

    pub(crate) fn push(&mut self, value: u32, bit_size: u32) {
        for i in 0..bit_size {
            if self.bit % 8 == 0 {
                self.data.push(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.data.len() - 1;
                self.data[last] |= 1 << (self.bit % 8);
            }
            self.bit += 1;
        }
    }
}
