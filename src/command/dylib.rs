use nom::{
    number::{complete as number, Endianness},
    sequence, IResult,
};

use crate::helpers::version_string;

use super::{lc_str, LCLoadCommand, LoadCommandBase, LoadCommandParser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylibCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub name: String,
    pub timestamp: u32,
    pub current_version: String,
    pub compatibility_version: String,
}

impl LoadCommandParser for DylibCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, (name_offset, timestamp, current_version, compatibility_version)) =
            sequence::tuple((u32e, u32e, u32e, u32e))(cursor)?;
        let (_, name) = lc_str(ldcmd, name_offset)?;

        Ok((
            cursor,
            DylibCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                name,
                timestamp,
                current_version: version_string(current_version),
                compatibility_version: version_string(compatibility_version),
            },
        ))
    }
}
