//! In-memory Mach-O images for tests.

use nom::number::Endianness;
use uuid::Uuid;

use crate::{
    command::{
        segment::{Protection, SGFlags},
        DysymtabCommand, LCLoadCommand, LinkeditDataCommand, Nlist, SectionHeader,
        SegmentCommand, Serialize, SymtabCommand, UuidCommand,
    },
    fat::{FatArch, FatHeader, FatMagic},
    header::{MHFileType, MHFlags, MHMagic, MachHeader},
    helpers::put_u32,
    machine::{CpuSubType, CpuType},
};

/// File offset of `__text` in every generated image.
pub const TEXT_OFFSET: u64 = 0x400;

pub fn header64(ncmds: u32, sizeofcmds: u32, endian: Endianness) -> MachHeader {
    MachHeader {
        magic: match endian {
            Endianness::Big => MHMagic::MhCigam64,
            _ => MHMagic::MhMagic64,
        },
        cputype: CpuType::X86_64,
        cpusubtype: CpuSubType::from_raw(3, CpuType::X86_64),
        filetype: MHFileType::MhExecute,
        ncmds,
        sizeofcmds,
        flags: MHFlags::MH_PIE,
        reserved: 0,
    }
}

pub struct ImageSpec {
    pub cputype: CpuType,
    pub is_64: bool,
    pub big_endian: bool,
    pub vmbase: u64,
    pub text_addr: u64,
    pub text: Vec<u8>,
    pub cstrings: Vec<u8>,
    /// Name and value of each symbol, in table order.
    pub symbols: Vec<(&'static str, u64)>,
}

impl ImageSpec {
    fn new(cputype: CpuType, is_64: bool, vmbase: u64) -> Self {
        let text_addr = vmbase + TEXT_OFFSET;
        ImageSpec {
            cputype,
            is_64,
            big_endian: false,
            vmbase,
            text_addr,
            // call +0; ret; push %ebp; ret
            text: vec![0xe8, 0x00, 0x00, 0x00, 0x00, 0xc3, 0x55, 0xc3],
            cstrings: b"hello\0world\0".to_vec(),
            symbols: vec![("_main", text_addr), ("_helper", text_addr + 5), ("_puts", 0)],
        }
    }

    pub fn x86_64() -> Self {
        Self::new(CpuType::X86_64, true, 0x1_0000_0000)
    }

    pub fn i386() -> Self {
        Self::new(CpuType::I386, false, 0x1000)
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn endian(&self) -> Endianness {
        if self.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    fn magic(&self) -> MHMagic {
        match (self.is_64, self.big_endian) {
            (true, false) => MHMagic::MhMagic64,
            (true, true) => MHMagic::MhCigam64,
            (false, false) => MHMagic::MhMagic,
            (false, true) => MHMagic::MhCigam,
        }
    }

    fn header_size(&self) -> usize {
        if self.is_64 {
            MachHeader::SIZE_64 as usize
        } else {
            MachHeader::SIZE_32 as usize
        }
    }

    /// Offset of the first byte after the load commands.
    pub fn commands_end(&self) -> usize {
        self.header_size() + self.commands().iter().map(Vec::len).sum::<usize>()
    }

    fn commands(&self) -> Vec<Vec<u8>> {
        let endian = self.endian();
        let layout = self.layout();

        let section = |sectname: &str, addr: u64, size: usize, offset: u64| SectionHeader {
            sectname: sectname.to_string(),
            segname: "__TEXT".to_string(),
            addr,
            size: size as u64,
            offset: offset as u32,
            align: 0,
            reloff: 0,
            nreloc: 0,
            flags: 0,
            reserved1: 0,
            reserved2: 0,
            reserved3: 0,
            is_64: self.is_64,
        };
        let sections = vec![
            section("__text", self.text_addr, self.text.len(), TEXT_OFFSET),
            section(
                "__cstring",
                self.vmbase + layout.cstring_off,
                self.cstrings.len(),
                layout.cstring_off,
            ),
            // Not retained by the parser.
            section("__unwind_info", self.vmbase + layout.fstarts_off, 0, 0),
        ];
        let segment = SegmentCommand {
            cmd: if self.is_64 {
                LCLoadCommand::LcSegment64
            } else {
                LCLoadCommand::LcSegment
            },
            cmdsize: SegmentCommand::command_size(self.is_64, sections.len() as u32),
            segname: "__TEXT".to_string(),
            vmaddr: self.vmbase,
            vmsize: layout.end,
            fileoff: 0,
            filesize: layout.end,
            maxprot: Protection::READ | Protection::EXECUTE,
            initprot: Protection::READ | Protection::EXECUTE,
            nsects: sections.len() as u32,
            flags: SGFlags::empty(),
            sections,
        };

        let symtab = SymtabCommand {
            cmd: LCLoadCommand::LcSymtab,
            cmdsize: SymtabCommand::SIZE,
            symoff: layout.symoff as u32,
            nsyms: self.symbols.len() as u32,
            stroff: layout.stroff as u32,
            strsize: self.strtab().len() as u32,
        };

        let dysymtab = DysymtabCommand {
            cmd: LCLoadCommand::LcDysymtab,
            cmdsize: DysymtabCommand::SIZE,
            ilocalsym: 0,
            nlocalsym: 0,
            iextdefsym: 0,
            nextdefsym: 2,
            iundefsym: 2,
            nundefsym: 1,
            tocoff: 0,
            ntoc: 0,
            modtaboff: 0,
            nmodtab: 0,
            extrefsymoff: 0,
            nextrefsyms: 0,
            indirectsymoff: layout.indirect_off as u32,
            nindirectsyms: self.indirect_table().len() as u32,
            extreloff: 0,
            nextrel: 0,
            locreloff: 0,
            nlocrel: 0,
        };

        let fstarts = LinkeditDataCommand {
            cmd: LCLoadCommand::LcFunctionStarts,
            cmdsize: LinkeditDataCommand::SIZE,
            dataoff: layout.fstarts_off as u32,
            datasize: self.function_starts().len() as u32,
        };

        let uuid = UuidCommand {
            cmd: LCLoadCommand::LcUuid,
            cmdsize: 24,
            uuid: Uuid::from_u128(0x0123_4567_89ab_cdef_0011_2233_4455_6677),
        };

        vec![
            segment.serialize(endian),
            symtab.serialize(endian),
            dysymtab.serialize(endian),
            fstarts.serialize(endian),
            uuid.serialize(endian),
        ]
    }

    fn strtab(&self) -> Vec<u8> {
        let mut strtab = vec![b' ', 0];
        for (name, _) in &self.symbols {
            strtab.extend(name.as_bytes());
            strtab.push(0);
        }
        strtab
    }

    fn nlists(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut strx = 2;
        for (name, value) in &self.symbols {
            let nlist = Nlist {
                n_strx: strx,
                n_type: Nlist::N_EXT | 0x0e,
                n_sect: 1,
                n_desc: 0,
                n_value: *value,
            };
            bytes.extend(nlist.serialize(self.endian(), self.is_64));
            strx += name.len() as u32 + 1;
        }
        bytes
    }

    fn indirect_table(&self) -> Vec<u32> {
        vec![2, DysymtabCommand::INDIRECT_SYMBOL_LOCAL]
    }

    /// Two function starts: the start of `__text` and five bytes in.
    fn function_starts(&self) -> Vec<u8> {
        let mut bytes = uleb(TEXT_OFFSET);
        bytes.extend(uleb(5));
        bytes.resize(8, 0);
        bytes
    }

    fn layout(&self) -> Layout {
        let cstring_off = TEXT_OFFSET + self.text.len() as u64;
        let fstarts_off = cstring_off + self.cstrings.len() as u64;
        let symoff = fstarts_off + self.function_starts().len() as u64;
        let indirect_off = symoff + self.nlists().len() as u64;
        let stroff = indirect_off + 4 * self.indirect_table().len() as u64;
        let end = stroff + self.strtab().len() as u64;
        Layout {
            cstring_off,
            fstarts_off,
            symoff,
            indirect_off,
            stroff,
            end,
        }
    }
}

struct Layout {
    cstring_off: u64,
    fstarts_off: u64,
    symoff: u64,
    indirect_off: u64,
    stroff: u64,
    end: u64,
}

fn uleb(mut value: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            bytes.push(byte);
            return bytes;
        }
        bytes.push(byte | 0x80);
    }
}

/// A complete thin image: header, commands, then the data they point at.
pub fn thin_image(spec: &ImageSpec) -> Vec<u8> {
    let endian = spec.endian();
    let commands = spec.commands();
    let header = MachHeader {
        magic: spec.magic(),
        cputype: spec.cputype,
        cpusubtype: CpuSubType::from_raw(3, spec.cputype),
        filetype: MHFileType::MhExecute,
        ncmds: commands.len() as u32,
        sizeofcmds: commands.iter().map(Vec::len).sum::<usize>() as u32,
        flags: MHFlags::MH_NOUNDEFS | MHFlags::MH_PIE,
        reserved: 0,
    };

    let mut image = header.serialize(endian);
    for cmd in commands {
        image.extend(cmd);
    }
    image.resize(TEXT_OFFSET as usize, 0);
    image.extend(&spec.text);
    image.extend(&spec.cstrings);
    image.extend(spec.function_starts());
    image.extend(spec.nlists());
    for entry in spec.indirect_table() {
        put_u32(&mut image, entry, endian);
    }
    image.extend(spec.strtab());
    image
}

/// A fat archive of either layout with one page-aligned slice per spec.
pub fn fat_image(magic: FatMagic, specs: &[ImageSpec]) -> Vec<u8> {
    const ALIGN: u32 = 12;
    let slices: Vec<Vec<u8>> = specs.iter().map(thin_image).collect();

    let mut archs = Vec::new();
    let mut offset = 1u64 << ALIGN;
    for (spec, slice) in specs.iter().zip(&slices) {
        archs.push(FatArch {
            cputype: spec.cputype,
            cpusubtype: CpuSubType::from_raw(3, spec.cputype),
            offset,
            size: slice.len() as u64,
            align: ALIGN,
            reserved: 0,
        });
        offset += (slice.len() as u64).next_multiple_of(1 << ALIGN);
    }

    let header = FatHeader { magic, archs };
    let mut image = header.serialize(Endianness::Big);
    for (arch, slice) in header.archs.iter().zip(&slices) {
        image.resize(arch.offset as usize, 0);
        image.extend(slice);
    }
    image
}
