use nom::{
    multi,
    number::{complete as number, Endianness},
    IResult,
};
use num_derive::FromPrimitive;

use crate::helpers::{put_name16, put_u32, put_u64};

use super::{name16, pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protection: u32 {
        const NONE = 0x00;
        const READ = 0x01;
        const WRITE = 0x02;
        const EXECUTE = 0x04;
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SGFlags: u32 {
        const HIGHVM = 0x1;
        const FVMLIB = 0x2;
        const NORELOC = 0x4;
        const PROTECTED_VERSION_1 = 0x8;
        const READ_ONLY = 0x10;
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SectionType {
    SRegular = 0x0,
    SZeroFill = 0x1,
    SCstringLiterals = 0x2,
    S4ByteLiterals = 0x3,
    S8ByteLiterals = 0x4,
    SLiteralPointers = 0x5,
    SNonLazySymbolPointers = 0x6,
    SLazySymbolPointers = 0x7,
    SSymbolStubs = 0x8,
    SModInitFuncPointers = 0x9,
    SModTermFuncPointers = 0xa,
    SCoalesced = 0xb,
    SGbZeroFill = 0xc,
    SInterposing = 0xd,
    S16ByteLiterals = 0xe,
    SDtraceDof = 0xf,
    SLazyDylibSymbolPointers = 0x10,
    SThreadLocalRegular = 0x11,
    SThreadLocalZeroFill = 0x12,
    SThreadLocalVariables = 0x13,
    SThreadLocalVariablePointers = 0x14,
    SThreadLocalInitFunctionPointers = 0x15,
    SInitFuncOffsets = 0x16,
}

impl SectionType {
    pub const SECTION_TYPE_MASK: u32 = 0x000000ff;

    pub fn from_flags(flags: u32) -> Option<SectionType> {
        num::FromPrimitive::from_u32(flags & Self::SECTION_TYPE_MASK)
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionAttributes: u32 {
        const PURE_INSTRUCTIONS = 0x80000000;
        const NO_TOC = 0x40000000;
        const STRIP_STATIC_SYMS = 0x20000000;
        const NO_DEAD_STRIP = 0x10000000;
        const LIVE_SUPPORT = 0x08000000;
        const SELF_MODIFYING_CODE = 0x04000000;
        const DEBUG = 0x02000000;
        const SOME_INSTRUCTIONS = 0x00000400;
        const EXT_RELOC = 0x00000200;
        const LOC_RELOC = 0x00000100;
    }
}

impl SectionAttributes {
    pub fn from_flags(flags: u32) -> SectionAttributes {
        SectionAttributes::from_bits_truncate(flags)
    }
}

/// A `section`/`section_64` record. Address and size are widened to 64 bits;
/// `is_64` records which layout it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub sectname: String,
    pub segname: String,
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
    pub reserved1: u32,
    pub reserved2: u32,
    /// Only present in 64-bit records.
    pub reserved3: u32,
    pub is_64: bool,
}

impl SectionHeader {
    pub const SIZE_32: u32 = 68;
    pub const SIZE_64: u32 = 80;

    pub fn parse(bytes: &[u8], endian: Endianness, is_64: bool) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let u64e = number::u64(endian);

        let (bytes, sectname) = name16(bytes)?;
        let (bytes, segname) = name16(bytes)?;
        let (bytes, (addr, size)) = if is_64 {
            let (bytes, addr) = u64e(bytes)?;
            let (bytes, size) = u64e(bytes)?;
            (bytes, (addr, size))
        } else {
            let (bytes, addr) = u32e(bytes)?;
            let (bytes, size) = u32e(bytes)?;
            (bytes, (addr as u64, size as u64))
        };
        let (bytes, offset) = u32e(bytes)?;
        let (bytes, align) = u32e(bytes)?;
        let (bytes, reloff) = u32e(bytes)?;
        let (bytes, nreloc) = u32e(bytes)?;
        let (bytes, flags) = u32e(bytes)?;
        let (bytes, reserved1) = u32e(bytes)?;
        let (bytes, reserved2) = u32e(bytes)?;
        let (bytes, reserved3) = if is_64 { u32e(bytes)? } else { (bytes, 0) };

        Ok((
            bytes,
            SectionHeader {
                sectname,
                segname,
                addr,
                size,
                offset,
                align,
                reloff,
                nreloc,
                flags,
                reserved1,
                reserved2,
                reserved3,
                is_64,
            },
        ))
    }

    pub fn section_type(&self) -> Option<SectionType> {
        SectionType::from_flags(self.flags)
    }

    pub fn attributes(&self) -> SectionAttributes {
        SectionAttributes::from_flags(self.flags)
    }
}

impl Serialize for SectionHeader {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut bytes = Vec::new();
        put_name16(&mut bytes, &self.sectname);
        put_name16(&mut bytes, &self.segname);
        if self.is_64 {
            put_u64(&mut bytes, self.addr, endian);
            put_u64(&mut bytes, self.size, endian);
        } else {
            put_u32(&mut bytes, self.addr as u32, endian);
            put_u32(&mut bytes, self.size as u32, endian);
        }
        for field in [
            self.offset,
            self.align,
            self.reloff,
            self.nreloc,
            self.flags,
            self.reserved1,
            self.reserved2,
        ] {
            put_u32(&mut bytes, field, endian);
        }
        if self.is_64 {
            put_u32(&mut bytes, self.reserved3, endian);
        }
        bytes
    }
}

/// `LC_SEGMENT` or `LC_SEGMENT_64` with its inline section records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub segname: String,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: Protection,
    pub initprot: Protection,
    pub nsects: u32,
    pub flags: SGFlags,
    pub sections: Vec<SectionHeader>,
}

impl SegmentCommand {
    pub fn is_64(&self) -> bool {
        self.cmd == LCLoadCommand::LcSegment64
    }

    /// Size of the command with `nsects` section records.
    pub fn command_size(is_64: bool, nsects: u32) -> u32 {
        if is_64 {
            72 + nsects * SectionHeader::SIZE_64
        } else {
            56 + nsects * SectionHeader::SIZE_32
        }
    }
}

impl LoadCommandParser for SegmentCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let u64e = number::u64(endian);

        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let is_64 = base.cmd == LCLoadCommand::LcSegment64;
        let (cursor, segname) = name16(cursor)?;

        let (cursor, (vmaddr, vmsize, fileoff, filesize)) = if is_64 {
            let (cursor, vmaddr) = u64e(cursor)?;
            let (cursor, vmsize) = u64e(cursor)?;
            let (cursor, fileoff) = u64e(cursor)?;
            let (cursor, filesize) = u64e(cursor)?;
            (cursor, (vmaddr, vmsize, fileoff, filesize))
        } else {
            let (cursor, vmaddr) = u32e(cursor)?;
            let (cursor, vmsize) = u32e(cursor)?;
            let (cursor, fileoff) = u32e(cursor)?;
            let (cursor, filesize) = u32e(cursor)?;
            (
                cursor,
                (vmaddr as u64, vmsize as u64, fileoff as u64, filesize as u64),
            )
        };

        let (cursor, maxprot) = u32e(cursor)?;
        let (cursor, initprot) = u32e(cursor)?;
        let (cursor, nsects) = u32e(cursor)?;
        let (cursor, flags) = u32e(cursor)?;

        let (cursor, sections) = multi::count(
            |input| SectionHeader::parse(input, endian, is_64),
            nsects as usize,
        )(cursor)?;

        Ok((
            cursor,
            SegmentCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                segname,
                vmaddr,
                vmsize,
                fileoff,
                filesize,
                maxprot: Protection::from_bits_truncate(maxprot),
                initprot: Protection::from_bits_truncate(initprot),
                nsects,
                flags: SGFlags::from_bits_truncate(flags),
                sections,
            },
        ))
    }
}

impl Serialize for SegmentCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut bytes = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        put_name16(&mut bytes, &self.segname);
        for field in [self.vmaddr, self.vmsize, self.fileoff, self.filesize] {
            if self.is_64() {
                put_u64(&mut bytes, field, endian);
            } else {
                put_u32(&mut bytes, field as u32, endian);
            }
        }
        put_u32(&mut bytes, self.maxprot.bits(), endian);
        put_u32(&mut bytes, self.initprot.bits(), endian);
        put_u32(&mut bytes, self.nsects, endian);
        put_u32(&mut bytes, self.flags.bits(), endian);
        for sect in &self.sections {
            bytes.extend(sect.serialize(endian));
        }
        pad_to_size(&mut bytes, self.cmdsize as usize);
        bytes
    }
}
