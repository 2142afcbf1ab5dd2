use std::ops::Range;

use strum_macros::Display;

use crate::macho::{MachOErr, MachOResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SectionKind {
    Text,
    #[strum(serialize = "C-String")]
    CString,
    String,
    #[strum(serialize = "Function Starts")]
    FunctionStarts,
    #[strum(serialize = "Code Signature")]
    CodeSignature,
}

/// A retained region of an image. Created with its location known and its
/// bytes empty; the parser fills `data` once the command walk is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub name: String,
    /// Load address, or 0 for link-edit data with no mapping of its own.
    pub address: u64,
    pub size: u64,
    pub file_offset: u64,
    data: Vec<u8>,
    modified: Vec<Range<usize>>,
}

impl Section {
    pub fn new(kind: SectionKind, name: &str, address: u64, size: u64, file_offset: u64) -> Self {
        Self {
            kind,
            name: name.to_string(),
            address,
            size,
            file_offset,
            data: Vec::new(),
            modified: Vec::new(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Overwrite `bytes.len()` bytes starting at `offset` and remember the
    /// range for a later write-back.
    pub fn set_sub_range(&mut self, bytes: &[u8], offset: usize) -> MachOResult<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                MachOErr::InvalidValue(format!(
                    "range {:#x}+{:#x} outside section {} of {:#x} bytes",
                    offset,
                    bytes.len(),
                    self.name,
                    self.data.len()
                ))
            })?;

        self.data[offset..end].copy_from_slice(bytes);
        self.modified.push(offset..end);
        Ok(())
    }

    pub fn modified_regions(&self) -> &[Range<usize>] {
        &self.modified
    }

    pub fn is_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Split a C-string pool at its terminators. Each entry carries the load
    /// address of its first byte. Empty strings are skipped.
    pub fn c_strings(&self) -> Vec<(u64, String)> {
        let mut strings = Vec::new();
        let mut offset = 0;
        for chunk in self.data.split(|&b| b == 0) {
            if !chunk.is_empty() {
                strings.push((
                    self.address + offset as u64,
                    String::from_utf8_lossy(chunk).into_owned(),
                ));
            }
            offset += chunk.len() + 1;
        }
        strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstring_section() -> Section {
        let mut sec = Section::new(SectionKind::CString, "__cstring", 0x3f80, 20, 0x3f80);
        sec.set_data(b"Hello\0\0world!\0tail".to_vec());
        sec
    }

    #[test]
    fn test_c_strings() {
        let strings = cstring_section().c_strings();
        assert_eq!(
            strings,
            vec![
                (0x3f80, "Hello".to_string()),
                (0x3f87, "world!".to_string()),
                (0x3f8e, "tail".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_sub_range() {
        let mut sec = cstring_section();
        assert!(!sec.is_modified());

        sec.set_sub_range(b"J", 0).unwrap();
        sec.set_sub_range(b"W", 7).unwrap();
        assert_eq!(&sec.data()[..8], b"Jello\0\0W");
        assert_eq!(sec.modified_regions(), &[0..1, 7..8]);
        assert!(sec.is_modified());
    }

    #[test]
    fn test_set_sub_range_out_of_bounds() {
        let mut sec = cstring_section();
        assert!(matches!(
            sec.set_sub_range(b"abc", 17),
            Err(MachOErr::InvalidValue(_))
        ));
        assert!(sec.set_sub_range(b"a", usize::MAX).is_err());
        assert!(!sec.is_modified());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SectionKind::CString.to_string(), "C-String");
        assert_eq!(SectionKind::Text.to_string(), "Text");
    }
}
