use std::io::{self, Read, Seek, SeekFrom};

use nom::number::{complete as number, Endianness};

use crate::macho::{MachOErr, MachOResult};

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Endian-aware cursor over a seekable byte source.
///
/// Fixed-width reads either succeed completely or fail with
/// [`MachOErr::Truncated`]; a partial value is never returned. Peeks restore
/// the cursor, so only the `read*`, `skip` and `seek` calls move it.
pub struct ByteReader<T: Read + Seek> {
    source: T,
    endian: Endianness,
    len: u64,
    pos: u64,
}

impl<T: Read + Seek> ByteReader<T> {
    pub fn new(mut source: T, endian: Endianness) -> MachOResult<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Ok(Self {
            source,
            endian,
            len,
            pos: 0,
        })
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endianness) {
        self.endian = endian;
    }

    /// Total size of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.len
    }

    pub fn seek(&mut self, pos: u64) -> MachOResult<()> {
        self.source.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: u64) -> MachOResult<()> {
        self.seek(self.pos.saturating_add(count))
    }

    /// Read as many bytes as are available into `buf`, stopping early only at
    /// end of stream.
    fn fill(&mut self, buf: &mut [u8]) -> MachOResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += filled as u64;
        Ok(filled)
    }

    fn read_array<const N: usize>(&mut self) -> MachOResult<[u8; N]> {
        let offset = self.pos;
        let mut buf = [0u8; N];
        if self.fill(&mut buf)? < N {
            return Err(MachOErr::Truncated { offset, wanted: N });
        }
        Ok(buf)
    }

    /// Read up to `max_len` bytes. Fewer are returned at end of stream.
    pub fn read(&mut self, max_len: usize) -> MachOResult<Vec<u8>> {
        let len = max_len.min(self.remaining() as usize);
        let mut buf = vec![0u8; len];
        let filled = self.fill(&mut buf)?;
        buf.truncate(filled);
        Ok(buf)
    }

    /// Read exactly `len` bytes or fail with `Truncated`.
    pub fn read_exact(&mut self, len: usize) -> MachOResult<Vec<u8>> {
        let offset = self.pos;
        let buf = self.read(len)?;
        if buf.len() < len {
            return Err(MachOErr::Truncated { offset, wanted: len });
        }
        Ok(buf)
    }

    pub fn read_byte(&mut self) -> MachOResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> MachOResult<u16> {
        let bytes = self.read_array::<2>()?;
        let (_, value) = number::u16::<_, NomError>(self.endian)(&bytes[..])?;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> MachOResult<u32> {
        let bytes = self.read_array::<4>()?;
        let (_, value) = number::u32::<_, NomError>(self.endian)(&bytes[..])?;
        Ok(value)
    }

    pub fn read_u64(&mut self) -> MachOResult<u64> {
        let bytes = self.read_array::<8>()?;
        let (_, value) = number::u64::<_, NomError>(self.endian)(&bytes[..])?;
        Ok(value)
    }

    /// Next byte without consuming it, or `None` at end of stream.
    pub fn peek_byte(&mut self) -> MachOResult<Option<u8>> {
        if self.at_end() {
            return Ok(None);
        }
        let pos = self.pos;
        let byte = self.read_byte()?;
        self.seek(pos)?;
        Ok(Some(byte))
    }

    /// True iff the next `pattern.len()` bytes equal `pattern`. Never consumes.
    pub fn peek_pattern(&mut self, pattern: &[u8]) -> MachOResult<bool> {
        if (pattern.len() as u64) > self.remaining() {
            return Ok(false);
        }
        let pos = self.pos;
        let mut buf = vec![0u8; pattern.len()];
        let filled = self.fill(&mut buf)?;
        self.seek(pos)?;
        Ok(filled == pattern.len() && buf == pattern)
    }
}
