use std::io::{self, Read, Seek};

use nom::{multi, number::Endianness};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::{
    command::{
        DysymtabCommand, LCLoadCommand, LinkeditDataCommand, LoadCommand, Nlist, SegmentCommand,
        SymtabCommand,
    },
    fat::{FatHeader, FatMagic},
    file_subset::FileSubset,
    header::{MHMagic, MachHeader},
    object::{BinaryObject, Segment},
    reader::ByteReader,
    section::{Section, SectionKind},
    symbols::{SymbolEntry, SymbolTable},
};

#[derive(Debug, Error)]
pub enum MachOErr {
    #[error("I/O error: {0}")]
    IOError(#[from] io::Error),

    #[error("truncated read at offset {offset:#x}: wanted {wanted} bytes")]
    Truncated { offset: u64, wanted: usize },

    #[error("unknown magic {0:#010x}")]
    UnknownMagic(u32),

    #[error("parsing error: {0}")]
    ParsingError(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for MachOErr {
    fn from(err: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match err {
            nom::Err::Incomplete(needed) => MachOErr::ParsingError(format!("{:?}", needed)),
            nom::Err::Error(e) | nom::Err::Failure(e) => MachOErr::ParsingError(format!(
                "{:?} with {} bytes remaining",
                e.code,
                e.input.len()
            )),
        }
    }
}

pub type MachOResult<T> = Result<T, MachOErr>;

/// What the first four bytes of a source announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Thin(MHMagic),
    Fat(FatMagic),
}

/// (segment, section) pairs that become `Section`s. All others are dropped.
const RETAINED_SECTIONS: &[(&str, &str, SectionKind)] = &[
    ("__TEXT", "__text", SectionKind::Text),
    ("__TEXT", "__cstring", SectionKind::CString),
];

/// A parsed container: one object per architecture slice, in file order.
#[derive(Debug)]
pub struct MachO {
    pub container: Container,
    pub fat_header: Option<FatHeader>,
    pub objects: Vec<BinaryObject>,
}

impl MachO {
    /// Identify the container without parsing it. Sources shorter than a
    /// magic are simply not recognized.
    pub fn detect<T: Read + Seek>(source: &mut T) -> MachOResult<Option<Container>> {
        let mut reader = ByteReader::new(source, Endianness::Little)?;
        if reader.len() < 4 {
            return Ok(None);
        }

        let raw = reader.read_u32()?;
        if let Some(magic) = MHMagic::from_raw(raw) {
            return Ok(Some(Container::Thin(magic)));
        }
        Ok(FatMagic::from_raw(raw.swap_bytes()).map(Container::Fat))
    }

    pub fn parse<T: Read + Seek>(source: &mut T) -> MachOResult<MachO> {
        let container = match Self::detect(source)? {
            Some(container) => container,
            None => {
                let mut reader = ByteReader::new(&mut *source, Endianness::Little)?;
                return Err(MachOErr::UnknownMagic(reader.read_u32()?));
            }
        };

        match container {
            Container::Thin(_) => {
                let object = Self::parse_arch(&mut *source)?;
                Ok(MachO {
                    container,
                    fat_header: None,
                    objects: vec![object],
                })
            }
            Container::Fat(_) => {
                let fat_header = {
                    let mut reader = ByteReader::new(&mut *source, Endianness::Big)?;
                    FatHeader::parse(&mut reader)?
                };
                debug!(archs = fat_header.archs.len(), "parsing fat archive");

                let mut objects = Vec::new();
                for arch in &fat_header.archs {
                    trace!(cputype = %arch.cputype, offset = arch.offset, size = arch.size, "fat slice");
                    let slice = FileSubset::new(&mut *source, arch.offset, arch.size)?;
                    objects.push(Self::parse_arch(slice)?);
                }

                Ok(MachO {
                    container,
                    fat_header: Some(fat_header),
                    objects,
                })
            }
        }
    }

    pub fn into_objects(self) -> Vec<BinaryObject> {
        self.objects
    }

    /// Parse one thin image. Offsets are relative to the start of `source`.
    fn parse_arch<T: Read + Seek>(source: T) -> MachOResult<BinaryObject> {
        let mut reader = ByteReader::new(source, Endianness::Little)?;
        let header = MachHeader::parse(&mut reader)?;
        let load_commands = LoadCommand::parse_all(&mut reader, &header)?;
        info!(
            cputype = %header.cputype,
            filetype = %header.filetype,
            ncmds = load_commands.len(),
            "parsed architecture"
        );

        let mut segments = Vec::new();
        let mut sections = Vec::new();
        let mut symtab = None;
        let mut dysymtab = None;

        for lc in &load_commands {
            match lc {
                LoadCommand::Segment(seg) => {
                    segments.push(Segment::from(seg));
                    sections.extend(retained_sections(seg));
                }
                LoadCommand::Symtab(cmd) => {
                    sections.push(Section::new(
                        SectionKind::String,
                        "String Table",
                        0,
                        cmd.strsize as u64,
                        cmd.stroff as u64,
                    ));
                    symtab = Some(cmd);
                }
                LoadCommand::Dysymtab(cmd) => dysymtab = Some(cmd),
                LoadCommand::LinkeditData(cmd) => {
                    if let Some(section) = linkedit_section(cmd) {
                        sections.push(section);
                    }
                }
                _ => {}
            }
        }

        for section in sections.iter_mut() {
            reader.seek(section.file_offset)?;
            section.set_data(reader.read_exact(section.size as usize)?);
        }

        let symbol_table = match symtab {
            Some(cmd) => {
                let strtab = sections
                    .iter()
                    .find(|sec| sec.kind == SectionKind::String)
                    .map(|sec| sec.data())
                    .unwrap_or_default();
                let nlists = read_nlists(&mut reader, cmd, header.magic.is_64())?;
                SymbolTable::from_nlists(&nlists, strtab)
            }
            None => SymbolTable::new(),
        };

        let dyn_symbol_table = match dysymtab {
            Some(cmd) => read_indirect_symbols(&mut reader, cmd, &symbol_table)?,
            None => SymbolTable::new(),
        };

        Ok(BinaryObject {
            cpu_type: header.cputype,
            cpu_subtype: header.cpusubtype,
            is_little_endian: header.endian() == Endianness::Little,
            address_width: header.address_width(),
            file_kind: header.filetype,
            sections,
            symbol_table,
            dyn_symbol_table,
            segments,
            load_commands,
        })
    }
}

fn retained_sections(seg: &SegmentCommand) -> Vec<Section> {
    let mut sections = Vec::new();
    for header in &seg.sections {
        let kind = RETAINED_SECTIONS
            .iter()
            .find(|(segname, sectname, _)| *segname == header.segname && *sectname == header.sectname)
            .map(|(_, _, kind)| *kind);

        match kind {
            Some(kind) => sections.push(Section::new(
                kind,
                &header.sectname,
                header.addr,
                header.size,
                header.offset as u64,
            )),
            None => debug!(
                segname = %header.segname,
                sectname = %header.sectname,
                "skipping section"
            ),
        }
    }
    sections
}

fn linkedit_section(cmd: &LinkeditDataCommand) -> Option<Section> {
    let (kind, name) = match cmd.cmd {
        LCLoadCommand::LcFunctionStarts => (SectionKind::FunctionStarts, "Function Starts"),
        LCLoadCommand::LcCodeSignature => (SectionKind::CodeSignature, "Code Signature"),
        _ => return None,
    };
    Some(Section::new(
        kind,
        name,
        0,
        cmd.datasize as u64,
        cmd.dataoff as u64,
    ))
}

fn read_nlists<T: Read + Seek>(
    reader: &mut ByteReader<T>,
    cmd: &SymtabCommand,
    is_64: bool,
) -> MachOResult<Vec<Nlist>> {
    let size = (cmd.nsyms as usize)
        .checked_mul(Nlist::size(is_64))
        .ok_or_else(|| MachOErr::InvalidValue(format!("symbol count {}", cmd.nsyms)))?;

    reader.seek(cmd.symoff as u64)?;
    let bytes = reader.read_exact(size)?;
    let endian = reader.endian();
    let (_, nlists) =
        multi::count(|b| Nlist::parse(b, endian, is_64), cmd.nsyms as usize)(&bytes[..])?;
    Ok(nlists)
}

/// Resolve the indirect symbol table through `symbols`. Entries marked
/// LOCAL or ABS, or pointing past the table, are dropped.
fn read_indirect_symbols<T: Read + Seek>(
    reader: &mut ByteReader<T>,
    cmd: &DysymtabCommand,
    symbols: &SymbolTable,
) -> MachOResult<SymbolTable> {
    let mut table = SymbolTable::new();
    if cmd.nindirectsyms == 0 {
        return Ok(table);
    }

    let size = (cmd.nindirectsyms as usize)
        .checked_mul(4)
        .ok_or_else(|| MachOErr::InvalidValue(format!("indirect count {}", cmd.nindirectsyms)))?;
    reader.seek(cmd.indirectsymoff as u64)?;
    let bytes = reader.read_exact(size)?;
    let (_, indirect) = DysymtabCommand::parse_indirect_table(&bytes, reader.endian())?;

    for entry in indirect {
        if !DysymtabCommand::is_symbol_index(entry) {
            continue;
        }
        match symbols.entries().get(entry as usize) {
            Some(sym) => table.push(SymbolEntry {
                index: entry,
                value: sym.value,
                string: sym.string.clone(),
            }),
            None => debug!(entry, "indirect symbol out of range"),
        }
    }
    Ok(table)
}
