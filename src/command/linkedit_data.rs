use nom::{
    number::{complete as number, Endianness},
    IResult,
};

use crate::helpers::put_u32;

use super::{pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

/// A `linkedit_data_command`: a blob in `__LINKEDIT` named by file offset and
/// size. Function starts and the code signature both use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkeditDataCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub dataoff: u32,
    pub datasize: u32,
}

impl LinkeditDataCommand {
    pub const SIZE: u32 = 16;
}

impl LoadCommandParser for LinkeditDataCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, dataoff) = number::u32(endian)(cursor)?;
        let (cursor, datasize) = number::u32(endian)(cursor)?;

        Ok((
            cursor,
            LinkeditDataCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                dataoff,
                datasize,
            },
        ))
    }
}

impl Serialize for LinkeditDataCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        put_u32(&mut buf, self.dataoff, endian);
        put_u32(&mut buf, self.datasize, endian);
        pad_to_size(&mut buf, self.cmdsize as usize);
        buf
    }
}
