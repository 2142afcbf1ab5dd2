pub mod build_version;
pub mod dyld_info;
pub mod dylib;
pub mod dylinker;
pub mod dysymtab;
pub mod entry_point;
pub mod linkedit_data;
pub mod rpath;
pub mod segment;
pub mod source_version;
pub mod symtab;
pub mod thread;
pub mod uuid;
pub mod version_min;

use std::io::{Read, Seek};

use nom::{
    bytes::complete::take,
    error::{Error, ErrorKind},
    number::{complete as number, Endianness},
    Err::Failure,
    IResult,
};
use nom_derive::{Nom, Parse};
use num_derive::FromPrimitive;
use tracing::debug;

use crate::{
    header::MachHeader,
    helpers::{put_u32, string_upto_null_terminator},
    macho::{MachOErr, MachOResult},
    reader::ByteReader,
};

pub use build_version::BuildVersionCommand;
pub use dyld_info::DyldInfoCommand;
pub use dylib::DylibCommand;
pub use dylinker::DylinkerCommand;
pub use dysymtab::DysymtabCommand;
pub use entry_point::EntryPointCommand;
pub use linkedit_data::LinkeditDataCommand;
pub use rpath::RpathCommand;
pub use segment::{SectionHeader, SegmentCommand};
pub use source_version::SourceVersionCommand;
pub use symtab::{Nlist, SymtabCommand};
pub use thread::ThreadCommand;
pub use uuid::UuidCommand;
pub use version_min::VersionMinCommand;

/// Parsing of one complete load command, header included.
pub trait LoadCommandParser: Sized {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self>;

    fn parse(ldcmd: &[u8], endian: Endianness) -> MachOResult<Self> {
        let (_, cmd) = Self::parse_fields(ldcmd, endian)?;
        Ok(cmd)
    }
}

/// Byte layout of a record as it appears in an image of the given byte order.
pub trait Serialize {
    fn serialize(&self, endian: Endianness) -> Vec<u8>;
}

pub(crate) fn pad_to_size(buf: &mut Vec<u8>, size: usize) {
    if buf.len() < size {
        buf.resize(size, 0);
    }
}

/// Resolve an `lc_str`: a string stored at `offset` bytes from the start of
/// its command.
pub(crate) fn lc_str(ldcmd: &[u8], offset: u32) -> IResult<&[u8], String> {
    match ldcmd.get(offset as usize..) {
        Some(tail) => string_upto_null_terminator(tail),
        None => Err(Failure(Error::new(ldcmd, ErrorKind::Eof))),
    }
}

/// Fixed 16-byte, NUL-padded name field.
pub(crate) fn name16(bytes: &[u8]) -> IResult<&[u8], String> {
    let (bytes, field) = take(16usize)(bytes)?;
    let (_, name) = string_upto_null_terminator(field)?;
    Ok((bytes, name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCommandBase {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
}

impl LoadCommandBase {
    pub const SIZE: u32 = 8;

    pub fn parse(bytes: &[u8], endian: Endianness) -> IResult<&[u8], LoadCommandBase> {
        let (bytes, cmd) = match endian {
            Endianness::Big => LCLoadCommand::parse_be(bytes)?,
            _ => LCLoadCommand::parse_le(bytes)?,
        };
        let (bytes, cmdsize) = number::u32(endian)(bytes)?;

        Ok((bytes, LoadCommandBase { cmd, cmdsize }))
    }
}

impl Serialize for LoadCommandBase {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, self.cmd as u32, endian);
        put_u32(&mut buf, self.cmdsize, endian);
        buf
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom, FromPrimitive)]
pub enum LCLoadCommand {
    LcSegment = 0x1,
    LcSymtab = 0x2,
    LcSymseg = 0x3,
    LcThread = 0x4,
    LcUnixThread = 0x5,
    LcDysymtab = 0xb,
    LcLoadDylib = 0xc,
    LcIdDylib = 0xd,
    LcLoadDylinker = 0xe,
    LcIdDylinker = 0xf,
    LcPreboundDylib = 0x10,
    LcRoutines = 0x11,
    LcSubFramework = 0x12,
    LcSubUmbrella = 0x13,
    LcSubClient = 0x14,
    LcSubLibrary = 0x15,
    LcTwolevelHints = 0x16,
    LcPrebindCksum = 0x17,
    LcLoadWeakDylib = 0x18 | Self::LC_REQ_DYLD,
    LcSegment64 = 0x19,
    LcRoutines64 = 0x1a,
    LcUuid = 0x1b,
    LcRpath = 0x1c | Self::LC_REQ_DYLD,
    LcCodeSignature = 0x1d,
    LcSegmentSplitInfo = 0x1e,
    LcReexportDylib = 0x1f | Self::LC_REQ_DYLD,
    LcLazyLoadDylib = 0x20,
    LcEncryptionInfo = 0x21,
    LcDyldInfo = 0x22,
    LcDyldInfoOnly = 0x22 | Self::LC_REQ_DYLD,
    LcLoadUpwardDylib = 0x23 | Self::LC_REQ_DYLD,
    LcVersionMinMacosx = 0x24,
    LcVersionMinIphoneos = 0x25,
    LcFunctionStarts = 0x26,
    LcDyldEnvironment = 0x27,
    LcMain = 0x28 | Self::LC_REQ_DYLD,
    LcDataInCode = 0x29,
    LcSourceVersion = 0x2A,
    LcDylibCodeSignDrs = 0x2B,
    LcEncryptionInfo64 = 0x2C,
    LcLinkerOption = 0x2D,
    LcLinkerOptimizationHint = 0x2E,
    LcVersionMinTvos = 0x2F,
    LcVersionMinWatchos = 0x30,
    LcNote = 0x31,
    LcBuildVersion = 0x32,
    LcDyldExportsTrie = 0x33 | Self::LC_REQ_DYLD,
    LcDyldChainedFixups = 0x34 | Self::LC_REQ_DYLD,
    LcFilesetEntry = 0x35 | Self::LC_REQ_DYLD,
    LcAtomInfo = 0x36,
}

impl LCLoadCommand {
    pub const LC_REQ_DYLD: u32 = 0x80000000;

    pub fn from_raw(raw: u32) -> Option<LCLoadCommand> {
        num::FromPrimitive::from_u32(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadCommand {
    Segment(SegmentCommand),
    Symtab(SymtabCommand),
    Dysymtab(DysymtabCommand),
    DyldInfo(DyldInfoCommand),
    Dylib(DylibCommand),
    Dylinker(DylinkerCommand),
    Rpath(RpathCommand),
    Uuid(UuidCommand),
    VersionMin(VersionMinCommand),
    SourceVersion(SourceVersionCommand),
    EntryPoint(EntryPointCommand),
    LinkeditData(LinkeditDataCommand),
    Thread(ThreadCommand),
    BuildVersion(BuildVersionCommand),
    /// A command this parser does not interpret. It was skipped by size.
    Unknown { cmd: u32, cmdsize: u32 },
}

impl LoadCommand {
    /// Interpret one complete command. `Ok(None)` means the type is not one
    /// this parser models and the command should be kept as `Unknown`.
    pub fn parse(ldcmd: &[u8], endian: Endianness) -> MachOResult<Option<LoadCommand>> {
        let (_, base) = match LoadCommandBase::parse(ldcmd, endian) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(None),
        };

        let cmd = match base.cmd {
            LCLoadCommand::LcSegment | LCLoadCommand::LcSegment64 => {
                LoadCommand::Segment(SegmentCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcSymtab => LoadCommand::Symtab(SymtabCommand::parse(ldcmd, endian)?),
            LCLoadCommand::LcDysymtab => {
                LoadCommand::Dysymtab(DysymtabCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcDyldInfo | LCLoadCommand::LcDyldInfoOnly => {
                LoadCommand::DyldInfo(DyldInfoCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcLoadDylib
            | LCLoadCommand::LcIdDylib
            | LCLoadCommand::LcLoadWeakDylib
            | LCLoadCommand::LcReexportDylib
            | LCLoadCommand::LcLazyLoadDylib
            | LCLoadCommand::LcLoadUpwardDylib => {
                LoadCommand::Dylib(DylibCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcLoadDylinker
            | LCLoadCommand::LcIdDylinker
            | LCLoadCommand::LcDyldEnvironment => {
                LoadCommand::Dylinker(DylinkerCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcRpath => LoadCommand::Rpath(RpathCommand::parse(ldcmd, endian)?),
            LCLoadCommand::LcUuid => LoadCommand::Uuid(UuidCommand::parse(ldcmd, endian)?),
            LCLoadCommand::LcVersionMinMacosx
            | LCLoadCommand::LcVersionMinIphoneos
            | LCLoadCommand::LcVersionMinTvos
            | LCLoadCommand::LcVersionMinWatchos => {
                LoadCommand::VersionMin(VersionMinCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcSourceVersion => {
                LoadCommand::SourceVersion(SourceVersionCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcMain => {
                LoadCommand::EntryPoint(EntryPointCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcFunctionStarts
            | LCLoadCommand::LcCodeSignature
            | LCLoadCommand::LcDataInCode
            | LCLoadCommand::LcDylibCodeSignDrs
            | LCLoadCommand::LcSegmentSplitInfo
            | LCLoadCommand::LcLinkerOptimizationHint
            | LCLoadCommand::LcDyldExportsTrie
            | LCLoadCommand::LcDyldChainedFixups
            | LCLoadCommand::LcAtomInfo => {
                LoadCommand::LinkeditData(LinkeditDataCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcThread | LCLoadCommand::LcUnixThread => {
                LoadCommand::Thread(ThreadCommand::parse(ldcmd, endian)?)
            }
            LCLoadCommand::LcBuildVersion => {
                LoadCommand::BuildVersion(BuildVersionCommand::parse(ldcmd, endian)?)
            }
            _ => return Ok(None),
        };

        Ok(Some(cmd))
    }

    /// Walk the command stream that follows `header`.
    ///
    /// The reader must be positioned just past the header. Each command is
    /// read in full using its declared size, so the cursor always lands on
    /// the next command whatever the typed layout consumed.
    pub fn parse_all<T: Read + Seek>(
        reader: &mut ByteReader<T>,
        header: &MachHeader,
    ) -> MachOResult<Vec<LoadCommand>> {
        let endian = header.endian();
        reader.set_endian(endian);
        let mut cmds = Vec::new();

        for index in 0..header.ncmds {
            let start = reader.position();
            let cmd = reader.read_u32()?;
            let cmdsize = reader.read_u32()?;
            if cmdsize < LoadCommandBase::SIZE {
                return Err(MachOErr::InvalidValue(format!(
                    "load command {} at {:#x} declares size {}",
                    index, start, cmdsize
                )));
            }

            reader.seek(start)?;
            let ldcmd = reader.read_exact(cmdsize as usize)?;

            match LoadCommand::parse(&ldcmd, endian)? {
                Some(parsed) => cmds.push(parsed),
                None => {
                    debug!(index, cmd, cmdsize, "skipping load command");
                    cmds.push(LoadCommand::Unknown { cmd, cmdsize });
                }
            }
        }

        Ok(cmds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn command_bytes(cmd: u32, body: &[u8], endian: Endianness) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, cmd, endian);
        put_u32(&mut buf, 8 + body.len() as u32, endian);
        buf.extend(body);
        buf
    }

    #[test]
    fn test_base_both_byte_orders() {
        let le = command_bytes(LCLoadCommand::LcMain as u32, &[], Endianness::Little);
        let be = command_bytes(LCLoadCommand::LcMain as u32, &[], Endianness::Big);

        let (_, base) = LoadCommandBase::parse(&le, Endianness::Little).unwrap();
        assert_eq!(base.cmd, LCLoadCommand::LcMain);
        assert_eq!(base.cmdsize, 8);
        let (_, base) = LoadCommandBase::parse(&be, Endianness::Big).unwrap();
        assert_eq!(base.cmd, LCLoadCommand::LcMain);
    }

    #[test]
    fn test_unknown_command_is_skipped_by_size() {
        let mut stream = command_bytes(0x7777, &[0xaa; 12], Endianness::Little);
        stream.extend(command_bytes(
            LCLoadCommand::LcSourceVersion as u32,
            &0x0000_0100_0000_0000u64.to_le_bytes(),
            Endianness::Little,
        ));
        // A known but unmodelled command is skipped the same way.
        stream.extend(command_bytes(LCLoadCommand::LcSymseg as u32, &[0; 8], Endianness::Little));

        let header = crate::fixtures::header64(3, stream.len() as u32, Endianness::Little);
        let mut reader = ByteReader::new(Cursor::new(&stream[..]), Endianness::Little).unwrap();
        let cmds = LoadCommand::parse_all(&mut reader, &header).unwrap();

        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], LoadCommand::Unknown { cmd: 0x7777, cmdsize: 20 });
        match &cmds[1] {
            LoadCommand::SourceVersion(sv) => assert_eq!(sv.version, "1.0.0.0.0"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            cmds[2],
            LoadCommand::Unknown { cmd: LCLoadCommand::LcSymseg as u32, cmdsize: 16 }
        );
        assert!(reader.at_end());
    }

    #[test]
    fn test_undersized_command_is_invalid() {
        let stream = {
            let mut buf = Vec::new();
            put_u32(&mut buf, LCLoadCommand::LcUuid as u32, Endianness::Little);
            put_u32(&mut buf, 4, Endianness::Little);
            buf
        };
        let header = crate::fixtures::header64(1, 8, Endianness::Little);
        let mut reader = ByteReader::new(Cursor::new(&stream[..]), Endianness::Little).unwrap();
        assert!(matches!(
            LoadCommand::parse_all(&mut reader, &header),
            Err(MachOErr::InvalidValue(_))
        ));
    }

    #[test]
    fn test_command_running_past_end_is_truncated() {
        let mut stream = command_bytes(LCLoadCommand::LcUuid as u32, &[0; 16], Endianness::Big);
        stream.truncate(20);
        let header = crate::fixtures::header64(1, 24, Endianness::Big);
        let mut reader = ByteReader::new(Cursor::new(&stream[..]), Endianness::Big).unwrap();
        assert!(matches!(
            LoadCommand::parse_all(&mut reader, &header),
            Err(MachOErr::Truncated { offset: 0, wanted: 24 })
        ));
    }

    #[test]
    fn test_lc_str_out_of_range() {
        assert!(lc_str(b"abc", 10).is_err());
        assert_eq!(lc_str(b"xx/usr/lib/dyld\0", 2).unwrap().1, "/usr/lib/dyld");
    }
}
