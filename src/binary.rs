use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{ClipError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Random-access cursor over one object's serialized bytes.
///
/// The stream length is captured up front so every read can check the
/// remaining bytes and fail with `BufferUnderrun` instead of a bare EOF.
pub struct BinaryReader<R: Read + Seek> {
    inner: R,
    default_endian: Endian,
    position: u64,
    len: u64,
}

pub struct BinaryWriter<W: Write + Seek> {
    inner: W,
    default_endian: Endian,
    position: u64,
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(mut reader: R, endian: Endian) -> Result<Self> {
        let position = reader.stream_position()?;
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;
        Ok(Self {
            inner: reader,
            default_endian: endian,
            position,
            len,
        })
    }

    pub fn endian(&self) -> Endian {
        self.default_endian
    }

    fn ensure(&self, wanted: u64) -> Result<()> {
        let available = self.bytes_left();
        if wanted > available {
            return Err(ClipError::BufferUnderrun {
                offset: self.position,
                wanted,
                available,
            });
        }
        Ok(())
    }

    pub fn read_exact<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.position += N as u64;
        Ok(buf)
    }

    pub fn read_with_endian<const N: usize>(&mut self, endian: Endian) -> Result<[u8; N]> {
        let mut buf = self.read_exact::<N>()?;
        if endian != Endian::Little {
            buf.reverse();
        }
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let buf = self.read_with_endian::<2>(self.default_endian)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let buf = self.read_with_endian::<4>(self.default_endian)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let buf = self.read_with_endian::<4>(self.default_endian)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let buf = self.read_with_endian::<8>(self.default_endian)?;
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Element count prefix. Negative counts, or counts that could not fit in
    /// the remaining bytes at `min_item_size` each, are rejected before any
    /// allocation happens.
    pub fn read_count(&mut self, min_item_size: u64) -> Result<usize> {
        let offset = self.position;
        let count = self.read_i32()?;
        if count < 0 || (count as u64).saturating_mul(min_item_size) > self.bytes_left() {
            return Err(ClipError::InvalidLength {
                offset,
                count: count as i64,
            });
        }
        Ok(count as usize)
    }

    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure(len as u64)?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        self.position += len as u64;
        Ok(buf)
    }

    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let buf = self.read_vec(len)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Length-prefixed string followed by padding to the next 4-byte boundary.
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let len = self.read_count(1)?;
        let text = self.read_string(len)?;
        self.align_to_4()?;
        Ok(text)
    }

    pub fn read_u8_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_count(1)?;
        self.read_vec(len)
    }

    pub fn read_f32_array(&mut self) -> Result<Vec<f32>> {
        let len = self.read_count(4)?;
        (0..len).map(|_| self.read_f32()).collect()
    }

    pub fn read_i32_array(&mut self) -> Result<Vec<i32>> {
        let len = self.read_count(4)?;
        (0..len).map(|_| self.read_i32()).collect()
    }

    pub fn read_u32_array(&mut self) -> Result<Vec<u32>> {
        let len = self.read_count(4)?;
        (0..len).map(|_| self.read_u32()).collect()
    }

    pub fn align_to_4(&mut self) -> Result<()> {
        let pad = (4 - self.position % 4) % 4;
        if pad > 0 {
            // Trailing padding may be cut off at the very end of an object.
            let pad = pad.min(self.bytes_left());
            self.seek(SeekFrom::Current(pad as i64))?;
        }
        Ok(())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes_left(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }
}

impl<W: Write + Seek> BinaryWriter<W> {
    pub fn new(writer: W, endian: Endian) -> Self {
        Self {
            inner: writer,
            default_endian: endian,
            position: 0,
        }
    }

    fn write_with_endian<const N: usize>(&mut self, mut buf: [u8; N], endian: Endian) -> Result<()> {
        if endian != Endian::Little {
            buf.reverse();
        }
        self.write_vec(&buf)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_vec(&[value])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_with_endian(value.to_le_bytes(), self.default_endian)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_with_endian(value.to_le_bytes(), self.default_endian)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_with_endian(value.to_le_bytes(), self.default_endian)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_with_endian(value.to_le_bytes(), self.default_endian)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_u32(value.to_bits())
    }

    pub fn write_vec(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    pub fn write_aligned_string(&mut self, s: &str) -> Result<()> {
        self.write_i32(s.len() as i32)?;
        self.write_vec(s.as_bytes())?;
        self.align_to_4()
    }

    pub fn write_u8_array(&mut self, data: &[u8]) -> Result<()> {
        self.write_i32(data.len() as i32)?;
        self.write_vec(data)
    }

    pub fn write_f32_array(&mut self, data: &[f32]) -> Result<()> {
        self.write_i32(data.len() as i32)?;
        data.iter().try_for_each(|&v| self.write_f32(v))
    }

    pub fn write_i32_array(&mut self, data: &[i32]) -> Result<()> {
        self.write_i32(data.len() as i32)?;
        data.iter().try_for_each(|&v| self.write_i32(v))
    }

    pub fn write_u32_array(&mut self, data: &[u32]) -> Result<()> {
        self.write_i32(data.len() as i32)?;
        data.iter().try_for_each(|&v| self.write_u32(v))
    }

    pub fn align_to_4(&mut self) -> Result<()> {
        let pad = ((4 - self.position % 4) % 4) as usize;
        self.write_vec(&[0u8; 3][..pad])
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
