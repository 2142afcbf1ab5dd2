use nom::{
    number::{complete as number, Endianness},
    IResult,
};

use super::{LCLoadCommand, LoadCommandBase, LoadCommandParser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVersionCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    /// A.B.C.D.E packed as a24.b10.c10.d10.e10.
    pub version: String,
}

impl LoadCommandParser for SourceVersionCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, version) = number::u64(endian)(cursor)?;

        let a = version >> 40;
        let b = (version >> 30) & 0x3ff;
        let c = (version >> 20) & 0x3ff;
        let d = (version >> 10) & 0x3ff;
        let e = version & 0x3ff;

        Ok((
            cursor,
            SourceVersionCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                version: format!("{}.{}.{}.{}.{}", a, b, c, d, e),
            },
        ))
    }
}
