use std::io::{self, Read, Seek, SeekFrom};

use crate::macho::{MachOErr, MachOResult};

/// A window of a seekable source, used to view one architecture slice of a
/// fat archive as if it were a standalone file. Offsets inside the slice are
/// relative to its start.
pub struct FileSubset<'a, T: Read + Seek> {
    file: &'a mut T,
    start_offset: u64,
    size: u64,
    /// Position relative to `start_offset`.
    position: u64,
}

impl<'a, T: Read + Seek> FileSubset<'a, T> {
    pub fn new(file: &'a mut T, start_offset: u64, size: u64) -> MachOResult<Self> {
        let source_size = file.seek(SeekFrom::End(0))?;
        let end = start_offset.checked_add(size);
        if end.map_or(true, |end| end > source_size) {
            return Err(MachOErr::InvalidValue(format!(
                "slice at offset {:#x} with size {:#x} exceeds source size {:#x}",
                start_offset, size, source_size
            )));
        }

        file.seek(SeekFrom::Start(start_offset))?;
        Ok(Self {
            file,
            start_offset,
            size,
            position: 0,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }
}

impl<'a, T: Read + Seek> Read for FileSubset<'a, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.size.saturating_sub(self.position);
        let to_read = (buf.len() as u64).min(remaining) as usize;
        if to_read == 0 {
            return Ok(0);
        }

        let bytes_read = self.file.read(&mut buf[..to_read])?;
        self.position += bytes_read as u64;
        Ok(bytes_read)
    }
}

impl<'a, T: Read + Seek> Seek for FileSubset<'a, T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
        };

        let new_pos = new_pos.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "attempted to seek before the start of the slice",
            )
        })?;

        // Seeking past the end is allowed, as for files; reads there return 0.
        self.file.seek(SeekFrom::Start(self.start_offset + new_pos))?;
        self.position = new_pos;
        Ok(self.position)
    }
}
