use nom::{
    number::{complete as number, Endianness},
    IResult,
};
use uuid::Uuid;

use super::{pad_to_size, LCLoadCommand, LoadCommandBase, LoadCommandParser, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub uuid: Uuid,
}

impl LoadCommandParser for UuidCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        // Raw byte string; not affected by the image byte order.
        let (cursor, uuid) = number::le_u128(cursor)?;

        Ok((
            cursor,
            UuidCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                uuid: Uuid::from_u128_le(uuid),
            },
        ))
    }
}

impl Serialize for UuidCommand {
    fn serialize(&self, endian: Endianness) -> Vec<u8> {
        let mut buf = LoadCommandBase {
            cmd: self.cmd,
            cmdsize: self.cmdsize,
        }
        .serialize(endian);
        buf.extend(self.uuid.as_bytes());
        pad_to_size(&mut buf, self.cmdsize as usize);
        buf
    }
}
