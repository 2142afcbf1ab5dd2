use nom::{
    number::{complete as number, Endianness},
    IResult,
};
use num_derive::FromPrimitive;
use strum_macros::Display;

use crate::helpers::version_string;

use super::{LCLoadCommand, LoadCommandBase, LoadCommandParser};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum Tool {
    Clang = 1,
    Swift = 2,
    Ld = 3,
    Lld = 4,
    Metal = 1024,
    Airlld = 1025,
    Airnt = 1026,
    AirntPlugin = 1027,
    Airpack = 1028,
    Gpuarchiver = 1031,
    MetalFramework = 1032,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum Platform {
    Unknown = 0,
    Any = 0xFFFFFFFF,
    MacOS = 1,
    IOS = 2,
    TvOS = 3,
    WatchOS = 4,
    BridgeOS = 5,
    MacCatalyst = 6,
    IOSSimulator = 7,
    TvOSSimulator = 8,
    WatchOSSimulator = 9,
    DriverKit = 10,
    VisionOS = 11,
    VisionOSSimulator = 12,
    Firmware = 13,
    SepOS = 14,
}

impl Platform {
    pub fn from_raw(raw: u32) -> Platform {
        num::FromPrimitive::from_u32(raw).unwrap_or(Platform::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildToolVersion {
    /// `None` for tool ids this parser does not name.
    pub tool: Option<Tool>,
    pub raw_tool: u32,
    pub version: String,
}

impl BuildToolVersion {
    pub fn parse(bytes: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let (bytes, raw_tool) = number::u32(endian)(bytes)?;
        let (bytes, version) = number::u32(endian)(bytes)?;

        Ok((
            bytes,
            BuildToolVersion {
                tool: num::FromPrimitive::from_u32(raw_tool),
                raw_tool,
                version: version_string(version),
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersionCommand {
    pub cmd: LCLoadCommand,
    pub cmdsize: u32,
    pub platform: Platform,
    pub minos: String,
    pub sdk: String,
    pub ntools: u32,
    pub tools: Vec<BuildToolVersion>,
}

impl LoadCommandParser for BuildVersionCommand {
    fn parse_fields(ldcmd: &[u8], endian: Endianness) -> IResult<&[u8], Self> {
        let u32e = number::u32(endian);
        let (cursor, base) = LoadCommandBase::parse(ldcmd, endian)?;
        let (cursor, platform) = u32e(cursor)?;
        let (cursor, minos) = u32e(cursor)?;
        let (cursor, sdk) = u32e(cursor)?;
        let (mut cursor, ntools) = u32e(cursor)?;

        let mut tools = Vec::new();
        for _ in 0..ntools {
            let (next, tool) = BuildToolVersion::parse(cursor, endian)?;
            tools.push(tool);
            cursor = next;
        }

        Ok((
            cursor,
            BuildVersionCommand {
                cmd: base.cmd,
                cmdsize: base.cmdsize,
                platform: Platform::from_raw(platform),
                minos: version_string(minos),
                sdk: version_string(sdk),
                ntools,
                tools,
            },
        ))
    }
}
