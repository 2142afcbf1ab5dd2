use std::io::{Read, Seek};

use nom::number::Endianness;
use num_derive::FromPrimitive;
use strum_macros::Display;
use tracing::trace;

use crate::{
    command::Serialize,
    helpers::put_u32,
    machine::{CpuSubType, CpuType},
    macho::{MachOErr, MachOResult},
    reader::ByteReader,
};

/// Thin-image magics as they read when the first four bytes are taken
/// little-endian. The `Cigam` variants are byte-swapped images.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum MHMagic {
    MhMagic = 0xfeedface,
    MhMagic64 = 0xfeedfacf,
    MhCigam = 0xcefaedfe,
    MhCigam64 = 0xcffaedfe,
}

impl MHMagic {
    pub fn from_raw(raw: u32) -> Option<MHMagic> {
        num::FromPrimitive::from_u32(raw)
    }

    pub fn is_64(&self) -> bool {
        matches!(self, MHMagic::MhMagic64 | MHMagic::MhCigam64)
    }

    pub fn endian(&self) -> Endianness {
        match self {
            MHMagic::MhMagic | MHMagic::MhMagic64 => Endianness::Little,
            MHMagic::MhCigam | MHMagic::MhCigam64 => Endianness::Big,
        }
    }

    pub fn address_width(&self) -> u8 {
        if self.is_64() {
            64
        } else {
            32
        }
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MHFlags: u32 {
        const MH_NOUNDEFS = 0x1;
        const MH_INCRLINK = 0x2;
        const MH_DYLDLINK = 0x4;
        const MH_BINDATLOAD = 0x8;
        const MH_PREBOUND = 0x10;
        const MH_SPLIT_SEGS = 0x20;
        const MH_LAZY_INIT = 0x40;
        const MH_TWOLEVEL = 0x80;
        const MH_FORCE_FLAT = 0x100;
        const MH_NOMULTIDEFS = 0x200;
        const MH_NOFIXPREBINDING = 0x400;
        const MH_PREBINDABLE = 0x800;
        const MH_ALLMODSBOUND = 0x1000;
        const MH_SUBSECTIONS_VIA_SYMBOLS = 0x2000;
        const MH_CANONICAL = 0x4000;
        const MH_WEAK_DEFINES = 0x8000;
        const MH_BINDS_TO_WEAK = 0x10000;
        const MH_ALLOW_STACK_EXECUTION = 0x20000;
        const MH_ROOT_SAFE = 0x40000;
        const MH_SETUID_SAFE = 0x80000;
        const MH_NO_REEXPORTED_DYLIBS = 0x100000;
        const MH_PIE = 0x200000;
        const MH_DEAD_STRIPPABLE_DYLIB = 0x400000;
        const MH_HAS_TLV_DESCRIPTORS = 0x800000;
        const MH_NO_HEAP_EXECUTION = 0x1000000;
        const MH_APP_EXTENSION_SAFE = 0x02000000;
        const MH_NLIST_OUTOFSYNC_WITH_DYLDINFO = 0x04000000;
        const MH_SIM_SUPPORT = 0x08000000;
        const MH_IMPLICIT_PAGEZERO = 0x10000000;
        const MH_DYLIB_IN_CACHE = 0x80000000;
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum MHFileType {
    #[strum(serialize = "Object")]
    MhObject = 0x1,
    #[strum(serialize = "Executable")]
    MhExecute = 0x2,
    #[strum(serialize = "Fixed VM Library")]
    MhFvmlib = 0x3,
    #[strum(serialize = "Core")]
    MhCore = 0x4,
    #[strum(serialize = "Preloaded Program")]
    MhPreload = 0x5,
    #[strum(serialize = "Dylib")]
    MhDylib = 0x6,
    #[strum(serialize = "Dylinker")]
    MhDylinker = 0x7,
    #[strum(serialize = "Bundle")]
    MhBundle = 0x8,
    #[strum(serialize = "Dylib Stub")]
    MhDylibStub = 0x9,
    #[strum(serialize = "dSYM")]
    MhDsym = 0xa,
    #[strum(serialize = "Kext Bundle")]
    MhKextBundle = 0xb,
    #[strum(serialize = "Fileset")]
    MhFileset = 0xc,
    #[strum(serialize = "GPU Executable")]
    MhGpuExecute = 0xd,
    #[strum(serialize = "GPU Dylib")]
    MhGpuDylib = 0xe,
    #[strum(serialize = "Metal Library")]
    MhMetalLib = 0x262,
    #[strum(serialize = "Unknown")]
    Unknown = !0,
}

impl MHFileType {
    pub fn from_raw(raw: u32) -> MHFileType {
        num::FromPrimitive::from_u32(raw).unwrap_or(MHFileType::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader {
    pub magic: MHMagic,
    pub cputype: CpuType,
    pub cpusubtype: CpuSubType,
    pub filetype: MHFileType,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: MHFlags,
    /// Padding word present only in 64-bit headers.
    pub reserved: u32,
}

impl MachHeader {
    pub const SIZE_32: u8 = 28;
    pub const SIZE_64: u8 = 32;

    /// Parse a thin header at the reader's current position.
    ///
    /// The magic is always read little-endian; the reader is then switched
    /// to the byte order the magic announces and left there for the
    /// load commands that follow.
    pub fn parse<T: Read + Seek>(reader: &mut ByteReader<T>) -> MachOResult<MachHeader> {
        reader.set_endian(Endianness::Little);
        let raw_magic = reader.read_u32()?;
        let magic = MHMagic::from_raw(raw_magic).ok_or(MachOErr::UnknownMagic(raw_magic))?;
        reader.set_endian(magic.endian());

        let cputype = CpuType::from_raw(reader.read_u32()?);
        let cpusubtype = CpuSubType::from_raw(reader.read_u32()?, cputype);
        let filetype = MHFileType::from_raw(reader.read_u32()?);
        let ncmds = reader.read_u32()?;
        let sizeofcmds = reader.read_u32()?;
        let flags = MHFlags::from_bits_truncate(reader.read_u32()?);
        let reserved = if magic.is_64() { reader.read_u32()? } else { 0 };

        trace!(?magic, %cputype, %filetype, ncmds, sizeofcmds, "parsed mach header");

        Ok(MachHeader {
            magic,
            cputype,
            cpusubtype,
            filetype,
            ncmds,
            sizeofcmds,
            flags,
            reserved,
        })
    }

    pub fn size(&self) -> u8 {
        if self.magic.is_64() {
            Self::SIZE_64
        } else {
            Self::SIZE_32
        }
    }

    pub fn endian(&self) -> Endianness {
        self.magic.endian()
    }

    /// 64 for 64-bit images and for any x86_64 image, 32 otherwise.
    pub fn address_width(&self) -> u8 {
        if self.cputype == CpuType::X86_64 {
            64
        } else {
            self.magic.address_width()
        }
    }
}

impl Serialize for MachHeader {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut bytes = Vec::new();
        // The magic's own byte order carries the image's endianness.
        bytes.extend((self.magic as u32).to_le_bytes());
        put_u32(&mut bytes, self.cputype.raw(), endian);
        put_u32(&mut bytes, self.cpusubtype.raw(), endian);
        put_u32(&mut bytes, self.filetype as u32, endian);
        put_u32(&mut bytes, self.ncmds, endian);
        put_u32(&mut bytes, self.sizeofcmds, endian);
        put_u32(&mut bytes, self.flags.bits(), endian);
        if self.magic.is_64() {
            put_u32(&mut bytes, self.reserved, endian);
        }
        bytes
    }
}
