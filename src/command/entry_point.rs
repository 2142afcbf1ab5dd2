use nom::{
    number::{complete as number, Endianness},
    IResult,
};

use crate::helpers::put_u64;

use super::{pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

/// `LC_MAIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    /// File offset of `main`, relative to the start of `__TEXT`.
    pub entryoff: u64,
    pub stacksize: u64,
}

impl LoadCommandParser for EntryPointCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, entryoff) = number::u64(endian)(cursor)?;
        let (cursor, stacksize) = number::u64(endian)(cursor)?;

        Ok((
            cursor,
            EntryPointCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                entryoff,
                stacksize,
            },
        ))
    }
}

impl Serialize for EntryPointCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        put_u64(&mut buf, self.entryoff, endian);
        put_u64(&mut buf, self.stacksize, endian);
        pad_to_size(&mut buf, self.cmdsize as usize);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_point() {
        let cmd = EntryPointCommand {
            cmd: LCLoadCommand::LcMain,
            cmdsize: 24,
            entryoff: 0x3f20,
            stacksize: 0,
        };
        let buf = cmd.serialize(Endianness::Little);
        assert_eq!(buf.len(), 24);
        assert_eq!(&buf[..4], &[0x28, 0, 0, 0x80]);
        assert_eq!(EntryPointCommand::parse(&buf, Endianness::Little).unwrap(), cmd);
    }
}
