use nom::{
    number::{complete as number, Endianness},
    sequence, IResult,
};

use super::{LCLoadCommand, LoadCommandBase, LoadCommandParser};

/// `LC_DYLD_INFO` / `LC_DYLD_INFO_ONLY`. Only the table locations are kept;
/// the opcode streams are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DyldInfoCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub rebase_off: u32,
    pub rebase_size: u32,
    pub bind_off: u32,
    pub bind_size: u32,
    pub weak_bind_off: u32,
    pub weak_bind_size: u32,
    pub lazy_bind_off: u32,
    pub lazy_bind_size: u32,
    pub export_off: u32,
    pub export_size: u32,
}

impl LoadCommandParser for DyldInfoCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (
            cursor,
            (
                rebase_off,
                rebase_size,
                bind_off,
                bind_size,
                weak_bind_off,
                weak_bind_size,
                lazy_bind_off,
                lazy_bind_size,
                export_off,
                export_size,
            ),
        ) = sequence::tuple((u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e, u32e))(
            cursor,
        )?;

        Ok((
            cursor,
            DyldInfoCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                rebase_off,
                rebase_size,
                bind_off,
                bind_size,
                weak_bind_off,
                weak_bind_size,
                lazy_bind_off,
                lazy_bind_size,
                export_off,
                export_size,
            },
        ))
    }
}
