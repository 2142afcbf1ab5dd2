use nom::{
    multi,
    number::{complete as number, Endianness},
    IResult,
};

use super::{LCLoadCommand, LoadCommandBase, LoadCommandParser};

/// One register-state record. The words are kept raw; their meaning depends
/// on the CPU and `flavor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadState {
    pub flavor: u32,
    pub count: u32,
    pub state: Vec<u32>,
}

impl ThreadState {
    pub fn parse(bytes: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (bytes, flavor) = number::u32(endian)(bytes)?;
        let (bytes, count) = number::u32(endian)(bytes)?;
        let (bytes, state) = multi::count(number::u32(endian), count as usize)(bytes)?;

        Ok((
            bytes,
            ThreadState {
                flavor,
                count,
                state,
            },
        ))
    }
}

/// `LC_THREAD` / `LC_UNIXTHREAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub threads: Vec<ThreadState>,
}

impl LoadCommandParser for ThreadCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (mut cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;

        // States run to the end of the command.
        let mut threads = Vec::new();
        while !cursor.is_empty() {
            let (next, thread) = ThreadState::parse(cursor, endian)?;
            threads.push(thread);
            cursor = next;
        }

        Ok((
            cursor,
            ThreadCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                threads,
            },
        ))
    }
}
