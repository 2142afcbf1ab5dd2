use nom::{
    number::{complete as number, Endianness},
    IResult,
};

use super::{lc_str, LCLoadCommand, LoadCommandBase, LoadCommandParser};

/// `LC_LOAD_DYLINKER`, `LC_ID_DYLINKER` and `LC_DYLD_ENVIRONMENT` share this
/// layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylinkerCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub name: String,
}

impl LoadCommandParser for DylinkerCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, name_offset) = number::u32(endian)(cursor)?;
        let (_, name) = lc_str(ldcmd, name_offset)?;

        Ok((
            cursor,
            DylinkerCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                name,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::put_u32;

    #[test]
    fn test_dylinker_be() {
        let mut data = Vec::new();
        for v in [0xe, 32, 12] {
            put_u32(&mut data, v, Endianness::Big);
        }
        data.extend(b"/usr/lib/dyld\0");
        data.resize(32, 0);

        let cmd = DylinkerCommand::parse(&data, Endianness::Big).unwrap();
        assert_eq!(cmd.cmd, LCLoadCommand::LcLoadDylinker);
        assert_eq!(cmd.name, "/usr/lib/dyld");
    }
}
