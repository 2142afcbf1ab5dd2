use std::io::{Read, Seek};

use nom::number::Endianness;
use num_derive::FromPrimitive;

use crate::{
    command::Serialize,
    helpers::{put_u32, put_u64},
    machine::{CpuSubType, CpuType},
    macho::{MachOErr, MachOResult},
    reader::ByteReader,
};

/// Universal-archive magics. Fat headers are big-endian whatever the
/// contained architectures are.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FatMagic {
    Fat = 0xcafebabe,
    Fat64 = 0xcafebabf,
}

impl FatMagic {
    pub fn from_raw(raw: u32) -> Option<FatMagic> {
        num::FromPrimitive::from_u32(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatArch {
    pub cputype: CpuType,
    pub cpusubtype: CpuSubType,
    pub offset: u64,
    pub size: u64,
    /// Power-of-two exponent.
    pub align: u32,
    /// Only present in `fat_arch_64` records.
    pub reserved: u32,
}

impl FatArch {
    pub fn parse<T: Read + Seek>(reader: &mut ByteReader<T>, magic: FatMagic) -> MachOResult<Self> {
        let cputype = CpuType::from_raw(reader.read_u32()?);
        let cpusubtype = CpuSubType::from_raw(reader.read_u32()?, cputype);
        let (offset, size) = match magic {
            FatMagic::Fat => (reader.read_u32()? as u64, reader.read_u32()? as u64),
            FatMagic::Fat64 => (reader.read_u64()?, reader.read_u64()?),
        };
        let align = reader.read_u32()?;
        let reserved = match magic {
            FatMagic::Fat => 0,
            FatMagic::Fat64 => reader.read_u32()?,
        };

        Ok(FatArch {
            cputype,
            cpusubtype,
            offset,
            size,
            align,
            reserved,
        })
    }

    fn serialize_as(&self, magic: FatMagic) -> Vec<u8> {
        let endian = Endianness::Big;
        let mut bytes = Vec::new();
        put_u32(&mut bytes, self.cputype.raw(), endian);
        put_u32(&mut bytes, self.cpusubtype.raw(), endian);
        match magic {
            FatMagic::Fat => {
                put_u32(&mut bytes, self.offset as u32, endian);
                put_u32(&mut bytes, self.size as u32, endian);
            }
            FatMagic::Fat64 => {
                put_u64(&mut bytes, self.offset, endian);
                put_u64(&mut bytes, self.size, endian);
            }
        }
        put_u32(&mut bytes, self.align, endian);
        if magic == FatMagic::Fat64 {
            put_u32(&mut bytes, self.reserved, endian);
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatHeader {
    pub magic: FatMagic,
    pub archs: Vec<FatArch>,
}

impl FatHeader {
    /// Parse the archive header and its architecture table from the start of
    /// the reader. The reader is switched to big-endian.
    pub fn parse<T: Read + Seek>(reader: &mut ByteReader<T>) -> MachOResult<FatHeader> {
        reader.seek(0)?;
        reader.set_endian(Endianness::Big);

        let raw_magic = reader.read_u32()?;
        let magic = FatMagic::from_raw(raw_magic).ok_or(MachOErr::UnknownMagic(raw_magic))?;
        let nfat_arch = reader.read_u32()?;

        let mut archs = Vec::new();
        for _ in 0..nfat_arch {
            archs.push(FatArch::parse(reader, magic)?);
        }

        Ok(FatHeader { magic, archs })
    }
}

impl Serialize for FatHeader {
    /// Fat headers ignore `endian`; they are always big-endian.
    fn serialize(&self, _endian: Endianness) -> Vec<u8> {
        let mut bytes = Vec::new();
        put_u32(&mut bytes, self.magic as u32, Endianness::Big);
        put_u32(&mut bytes, self.archs.len() as u32, Endianness::Big);
        for arch in &self.archs {
            bytes.extend(arch.serialize_as(self.magic));
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{CpuSubTypeI386, CpuSubTypeX86};
    use std::io::Cursor;

    fn archs() -> Vec<FatArch> {
        vec![
            FatArch {
                cputype: CpuType::I386,
                cpusubtype: CpuSubType::I386(CpuSubTypeI386::All),
                offset: 0x1000,
                size: 0x2345,
                align: 12,
                reserved: 0,
            },
            FatArch {
                cputype: CpuType::X86_64,
                cpusubtype: CpuSubType::X86(CpuSubTypeX86::All),
                offset: 0x4000,
                size: 0x5000,
                align: 14,
                reserved: 0,
            },
        ]
    }

    #[test]
    fn test_parse_fat() {
        let hdr = FatHeader {
            magic: FatMagic::Fat,
            archs: archs(),
        };
        let bytes = hdr.serialize(Endianness::Little);
        assert_eq!(&bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);
        assert_eq!(bytes.len(), 8 + 2 * 20);

        let mut reader = ByteReader::new(Cursor::new(&bytes[..]), Endianness::Little).unwrap();
        let parsed = FatHeader::parse(&mut reader).unwrap();
        assert_eq!(parsed, hdr);
        assert_eq!(parsed.archs[1].offset, 0x4000);
    }

    #[test]
    fn test_parse_fat64() {
        let mut archs = archs();
        archs[1].offset = 0x1_0000_0000;
        let hdr = FatHeader {
            magic: FatMagic::Fat64,
            archs,
        };
        let bytes = hdr.serialize(Endianness::Big);
        assert_eq!(bytes.len(), 8 + 2 * 32);

        let mut reader = ByteReader::new(Cursor::new(&bytes[..]), Endianness::Big).unwrap();
        let parsed = FatHeader::parse(&mut reader).unwrap();
        assert_eq!(parsed.archs[1].offset, 0x1_0000_0000);
        assert_eq!(parsed.archs[0].align, 12);
    }

    #[test]
    fn test_truncated_arch_table() {
        let hdr = FatHeader {
            magic: FatMagic::Fat,
            archs: archs(),
        };
        let bytes = hdr.serialize(Endianness::Big);
        let mut reader = ByteReader::new(Cursor::new(&bytes[..30]), Endianness::Big).unwrap();
        assert!(matches!(
            FatHeader::parse(&mut reader),
            Err(MachOErr::Truncated { .. })
        ));
    }
}
