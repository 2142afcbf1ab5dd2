use nom::{
    multi,
    number::{complete as number, Endianness},
    sequence, IResult,
};

use crate::helpers::put_u32;

use super::{pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DysymtabCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub ilocalsym: u32,
    pub nlocalsym: u32,
    pub iextdefsym: u32,
    pub nextdefsym: u32,
    pub iundefsym: u32,
    pub nundefsym: u32,
    pub tocoff: u32,
    pub ntoc: u32,
    pub modtaboff: u32,
    pub nmodtab: u32,
    pub extrefsymoff: u32,
    pub nextrefsyms: u32,
    pub indirectsymoff: u32,
    pub nindirectsyms: u32,
    pub extreloff: u32,
    pub nextrel: u32,
    pub locreloff: u32,
    pub nlocrel: u32,
}

impl DysymtabCommand {
    pub const SIZE: u32 = 80;
    pub const INDIRECT_SYMBOL_LOCAL: u32 = 0x80000000;
    pub const INDIRECT_SYMBOL_ABS: u32 = 0x40000000;

    /// Whether an indirect-table entry refers to a real symbol-table index
    /// rather than one of the LOCAL/ABS markers.
    pub fn is_symbol_index(entry: u32) -> bool {
        entry & (Self::INDIRECT_SYMBOL_LOCAL | Self::INDIRECT_SYMBOL_ABS) == 0
    }

    /// Decode the raw indirect symbol table read from `indirectsymoff`.
    pub fn parse_indirect_table(bytes: &[u8], endian: Endianness) -> IResult<&[u8], Vec<u32>> {
        multi::many0(number::u32(endian))(bytes)
    }

    fn fields(&self) -> [u32; 18] {
        [
            self.ilocalsym,
            self.nlocalsym,
            self.iextdefsym,
            self.nextdefsym,
            self.iundefsym,
            self.nundefsym,
            self.tocoff,
            self.ntoc,
            self.modtaboff,
            self.nmodtab,
            self.extrefsymoff,
            self.nextrefsyms,
            self.indirectsymoff,
            self.nindirectsyms,
            self.extreloff,
            self.nextrel,
            self.locreloff,
            self.nlocrel,
        ]
    }
}

impl LoadCommandParser for DysymtabCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (
            cursor,
            (
                ilocalsym,
                nlocalsym,
                iextdefsym,
                nextdefsym,
                iundefsym,
                nundefsym,
                tocoff,
                ntoc,
                modtaboff,
                nmodtab,
                extrefsymoff,
                nextrefsyms,
            ),
        ) = sequence::tuple((
            u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e,
        ))(cursor)?;
        let (cursor, (indirectsymoff, nindirectsyms, extreloff, nextrel, locreloff, nlocrel)) =
            sequence::tuple((u32e, u32e, u32e, u32e, u32e, u32e))(cursor)?;

        Ok((
            cursor,
            DysymtabCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                ilocalsym,
                nlocalsym,
                iextdefsym,
                nextdefsym,
                iundefsym,
                nundefsym,
                tocoff,
                ntoc,
                modtaboff,
                nmodtab,
                extrefsymoff,
                nextrefsyms,
                indirectsymoff,
                nindirectsyms,
                extreloff,
                nextrel,
                locreloff,
                nlocrel,
            },
        ))
    }
}

impl Serialize for DysymtabCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        for field in self.fields() {
            put_u32(&mut buf, field, endian);
        }
        pad_to_size(&mut buf, self.cmdsize as usize);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dysymtab(indirectsymoff: u32, nindirectsyms: u32) -> DysymtabCommand {
        DysymtabCommand {
            cmd: LCLoadCommand::LcDysymtab,
            cmdsize: DysymtabCommand::SIZE,
            ilocalsym: 0,
            nlocalsym: 1,
            iextdefsym: 1,
            nextdefsym: 2,
            iundefsym: 3,
            nundefsym: 1,
            tocoff: 0,
            ntoc: 0,
            modtaboff: 0,
            nmodtab: 0,
            extrefsymoff: 0,
            nextrefsyms: 0,
            indirectsymoff,
            nindirectsyms,
            extreloff: 0,
            nextrel: 0,
            locreloff: 0,
            nlocrel: 0,
        }
    }

    #[test]
    fn test_parse_dysymtab() {
        let cmd = dysymtab(0x3000, 4);
        let bytes = cmd.serialize(Endianness::Big);
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[..4], &[0, 0, 0, 0x0b]);
        let parsed = DysymtabCommand::parse(&bytes, Endianness::Big).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_indirect_markers() {
        assert!(DysymtabCommand::is_symbol_index(7));
        assert!(!DysymtabCommand::is_symbol_index(
            DysymtabCommand::INDIRECT_SYMBOL_LOCAL
        ));
        assert!(!DysymtabCommand::is_symbol_index(
            DysymtabCommand::INDIRECT_SYMBOL_ABS | DysymtabCommand::INDIRECT_SYMBOL_LOCAL
        ));

        let raw = [2u32.to_le_bytes(), 0x8000_0000u32.to_le_bytes()].concat();
        let (_, table) = DysymtabCommand::parse_indirect_table(&raw, Endianness::Little).unwrap();
        assert_eq!(table, vec![2, 0x8000_0000]);
    }
}
