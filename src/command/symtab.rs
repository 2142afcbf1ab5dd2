use nom::{
    number::{complete as number, Endianness},
    IResult,
};
use num_derive::FromPrimitive;

use crate::helpers::{put_u32, put_u64};

use super::{pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum NlistTypeType {
    Undefined = 0x0,
    Absolute = 0x2,
    Indirect = 0xa,
    PreboundUndefined = 0xc,
    Section = 0xe,
}

/// One `nlist`/`nlist_64` entry. The name stays an offset into the string
/// table until the table itself is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nlist {
    pub n_strx: u32,
    pub n_type: u8,
    pub n_sect: u8,
    pub n_desc: u16,
    pub n_value: u64,
}

impl Nlist {
    pub const SIZE: u8 = 16;
    pub const SIZE_32: u8 = 12;

    pub const N_STAB: u8 = 0xe0;
    pub const N_PEXT: u8 = 0x10;
    pub const N_TYPE: u8 = 0x0e;
    pub const N_EXT: u8 = 0x01;

    pub fn size(is_64: bool) -> usize {
        if is_64 {
            Self::SIZE as usize
        } else {
            Self::SIZE_32 as usize
        }
    }

    pub fn parse(bytes: &[u8], endian: Endianness, is_64: bool) -> IResult<&[u8], Self> {
        let (cursor, n_strx) = number::u32(endian)(bytes)?;
        let (cursor, n_type) = number::u8(cursor)?;
        let (cursor, n_sect) = number::u8(cursor)?;
        let (cursor, n_desc) = number::u16(endian)(cursor)?;
        let (cursor, n_value) = if is_64 {
            number::u64(endian)(cursor)?
        } else {
            let (cursor, value) = number::u32(endian)(cursor)?;
            (cursor, value as u64)
        };

        Ok((
            cursor,
            Nlist {
                n_strx,
                n_type,
                n_sect,
                n_desc,
                n_value,
            },
        ))
    }

    pub fn is_stab(&self) -> bool {
        self.n_type & Self::N_STAB != 0
    }

    pub fn is_external(&self) -> bool {
        self.n_type & Self::N_EXT != 0
    }

    pub fn type_type(&self) -> Option<NlistTypeType> {
        num::FromPrimitive::from_u8(self.n_type & Self::N_TYPE)
    }

    pub fn serialize(&self, endian: Endianness, is_64: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, self.n_strx, endian);
        buf.push(self.n_type);
        buf.push(self.n_sect);
        match endian {
            Endianness::Big => buf.extend(self.n_desc.to_be_bytes()),
            _ => buf.extend(self.n_desc.to_le_bytes()),
        }
        if is_64 {
            put_u64(&mut buf, self.n_value, endian);
        } else {
            put_u32(&mut buf, self.n_value as u32, endian);
        }
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymtabCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

impl SymtabCommand {
    pub const SIZE: u32 = 24;
}

impl LoadCommandParser for SymtabCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, symoff) = u32e(cursor)?;
        let (cursor, nsyms) = u32e(cursor)?;
        let (cursor, stroff) = u32e(cursor)?;
        let (cursor, strsize) = u32e(cursor)?;

        Ok((
            cursor,
            SymtabCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                symoff,
                nsyms,
                stroff,
                strsize,
            },
        ))
    }
}

impl Serialize for SymtabCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        for field in [self.symoff, self.nsyms, self.stroff, self.strsize] {
            put_u32(&mut buf, field, endian);
        }
        pad_to_size(&mut buf, self.cmdsize as usize);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symtab_be() {
        let data: Vec<u8> = [2u32, 24, 0x2000, 3, 0x2030, 0x40]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let symtab = SymtabCommand::parse(&data, Endianness::Big).unwrap();
        assert_eq!(symtab.cmd, LCLoadCommand::LcSymtab);
        assert_eq!(symtab.symoff, 0x2000);
        assert_eq!(symtab.nsyms, 3);
        assert_eq!(symtab.stroff, 0x2030);
        assert_eq!(symtab.strsize, 0x40);
    }

    #[test]
    fn test_parse_nlist_32_and_64() {
        let mut data = vec![0x04, 0, 0, 0, 0x0f, 0x01, 0x00, 0x00];
        data.extend(0x1005u32.to_le_bytes());
        let (rest, sym) = Nlist::parse(&data, Endianness::Little, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(sym.n_strx, 4);
        assert_eq!(sym.n_value, 0x1005);
        assert!(sym.is_external());
        assert!(!sym.is_stab());
        assert_eq!(sym.type_type(), Some(NlistTypeType::Section));

        let sym64 = Nlist {
            n_value: 0x1_0000_0f00,
            ..sym
        };
        let bytes = sym64.serialize(Endianness::Big, true);
        assert_eq!(bytes.len(), Nlist::SIZE as usize);
        let (_, parsed) = Nlist::parse(&bytes, Endianness::Big, true).unwrap();
        assert_eq!(parsed, sym64);
    }
}
