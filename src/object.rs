use tracing::warn;
use uuid::Uuid;

use crate::{
    command::{
        segment::{Protection, SGFlags},
        LoadCommand, SegmentCommand,
    },
    header::MHFileType,
    helpers::read_uleb_many,
    machine::{CpuSubType, CpuType},
    macho::MachOResult,
    section::{Section, SectionKind},
    symbols::SymbolTable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: Protection,
    pub initprot: Protection,
    pub flags: SGFlags,
}

impl From<&SegmentCommand> for Segment {
    fn from(cmd: &SegmentCommand) -> Self {
        Segment {
            name: cmd.segname.clone(),
            vmaddr: cmd.vmaddr,
            vmsize: cmd.vmsize,
            fileoff: cmd.fileoff,
            filesize: cmd.filesize,
            maxprot: cmd.maxprot,
            initprot: cmd.initprot,
            flags: cmd.flags,
        }
    }
}

/// Everything parsed out of one architecture slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryObject {
    pub cpu_type: CpuType,
    pub cpu_subtype: CpuSubType,
    pub is_little_endian: bool,
    /// 32 or 64.
    pub address_width: u8,
    pub file_kind: MHFileType,
    pub sections: Vec<Section>,
    pub symbol_table: SymbolTable,
    /// Symbols reached through the indirect symbol table.
    pub dyn_symbol_table: SymbolTable,
    pub segments: Vec<Segment>,
    pub load_commands: Vec<LoadCommand>,
}

impl BinaryObject {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|sec| sec.kind == kind)
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> Option<&mut Section> {
        self.sections.iter_mut().find(|sec| sec.kind == kind)
    }

    pub fn sections_by_kind(&self, kind: SectionKind) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(move |sec| sec.kind == kind)
    }

    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|seg| seg.name == name)
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.load_commands.iter().find_map(|lc| match lc {
            LoadCommand::Uuid(cmd) => Some(cmd.uuid),
            _ => None,
        })
    }

    /// Decode the function-starts table into load addresses. The table is a
    /// ULEB128 delta stream based at `__TEXT`'s vmaddr and ends at the first
    /// zero delta.
    pub fn function_starts(&self) -> MachOResult<Vec<u64>> {
        let Some(section) = self.section(SectionKind::FunctionStarts) else {
            return Ok(Vec::new());
        };
        let Some(text) = self.segment("__TEXT") else {
            warn!("function starts present without a __TEXT segment");
            return Ok(Vec::new());
        };

        let (_, deltas) = read_uleb_many(section.data())?;
        let mut addr = text.vmaddr;
        let mut starts = Vec::new();
        for delta in deltas.into_iter().take_while(|delta| *delta != 0) {
            addr = addr.wrapping_add(delta);
            starts.push(addr);
        }
        Ok(starts)
    }
}
