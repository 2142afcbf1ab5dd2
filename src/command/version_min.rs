use nom::{
    number::{complete as number, Endianness},
    IResult,
};

use crate::helpers::version_string;

use super::{LCLoadCommand, LoadCommandBase, LoadCommandParser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMinCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub version: String,
    pub sdk: String,
}

impl LoadCommandParser for VersionMinCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, version) = number::u32(endian)(cursor)?;
        let (cursor, sdk) = number::u32(endian)(cursor)?;

        Ok((
            cursor,
            VersionMinCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                version: version_string(version),
                sdk: version_string(sdk),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::put_u32;

    #[test]
    fn test_version_min() {
        let mut buf = Vec::new();
        for v in [0x24, 16, 0x000a_0f00, 0x000a_0f06] {
            put_u32(&mut buf, v, Endianness::Little);
        }
        let cmd = VersionMinCommand::parse(&buf, Endianness::Little).unwrap();
        assert_eq!(cmd.cmd, LCLoadCommand::LcVersionMinMacosx);
        assert_eq!(cmd.version, "10.15.0");
        assert_eq!(cmd.sdk, "10.15.6");
    }
}
