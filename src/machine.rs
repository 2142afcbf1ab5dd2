use std::fmt;

use num_derive::FromPrimitive;
use strum_macros::Display;

#[repr(u32)]
#[derive(Debug, Copy, Clone, FromPrimitive)]
pub enum CpuABI {
    ABI64 = 0x01000000,
    ABI64_32 = 0x02000000,
}

impl CpuABI {
    pub const MASK: u32 = 0xff000000;
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, FromPrimitive, PartialEq, Eq, Hash, Display)]
pub enum CpuType {
    #[strum(serialize = "Any")]
    Any = 0,
    #[strum(serialize = "VAX")]
    Vax = 1,
    #[strum(serialize = "MC680x0")]
    Mc680x0 = 6,
    #[strum(serialize = "x86")]
    I386 = 7,
    #[strum(serialize = "x86_64")]
    X86_64 = 7 | CpuABI::ABI64 as u32,
    #[strum(serialize = "MC98000")]
    Mc98000 = 10,
    #[strum(serialize = "HPPA")]
    Hppa = 11,
    #[strum(serialize = "ARM")]
    Arm = 12,
    #[strum(serialize = "ARM64")]
    Arm64 = 12 | CpuABI::ABI64 as u32,
    #[strum(serialize = "ARM64_32")]
    Arm64_32 = 12 | CpuABI::ABI64_32 as u32,
    #[strum(serialize = "MC88000")]
    Mc88000 = 13,
    #[strum(serialize = "SPARC")]
    Sparc = 14,
    #[strum(serialize = "i860")]
    I860 = 15,
    #[strum(serialize = "PowerPC")]
    PowerPC = 18,
    #[strum(serialize = "PowerPC 64")]
    PowerPC64 = 18 | CpuABI::ABI64 as u32,
    #[strum(serialize = "Unknown")]
    Unknown = !0,
}

impl CpuType {
    pub fn from_raw(raw: u32) -> CpuType {
        num::FromPrimitive::from_u32(raw).unwrap_or(CpuType::Unknown)
    }

    pub fn raw(&self) -> u32 {
        *self as u32
    }

    /// Whether the 64-bit ABI bit is part of the code.
    pub fn is_64(&self) -> bool {
        *self != CpuType::Unknown && self.raw() & CpuABI::ABI64 as u32 != 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CpuSubType {
    I386(CpuSubTypeI386),
    X86(CpuSubTypeX86),
    Arm(CpuSubTypeArm),
    Arm64(CpuSubTypeArm64),
    /// A code with no name in the table for its cpu type.
    Other(u32),
}

impl CpuSubType {
    pub const CPU_SUBTYPE_MASK: u32 = 0xff000000;
    pub const CPU_SUBTYPE_LIB64: u32 = 0x80000000;

    /// Map a raw subtype code. The capability bits in the top byte are masked
    /// off before lookup.
    pub fn from_raw(raw: u32, cpu: CpuType) -> CpuSubType {
        let code = raw & !Self::CPU_SUBTYPE_MASK;
        let named = match cpu {
            CpuType::I386 => num::FromPrimitive::from_u32(code).map(CpuSubType::I386),
            CpuType::X86_64 => num::FromPrimitive::from_u32(code).map(CpuSubType::X86),
            CpuType::Arm => num::FromPrimitive::from_u32(code).map(CpuSubType::Arm),
            CpuType::Arm64 => num::FromPrimitive::from_u32(code).map(CpuSubType::Arm64),
            _ => None,
        };
        named.unwrap_or(CpuSubType::Other(code))
    }

    pub fn raw(&self) -> u32 {
        match self {
            CpuSubType::I386(s) => *s as u32,
            CpuSubType::X86(s) => *s as u32,
            CpuSubType::Arm(s) => *s as u32,
            CpuSubType::Arm64(s) => *s as u32,
            CpuSubType::Other(code) => *code,
        }
    }
}

impl fmt::Display for CpuSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuSubType::I386(s) => write!(f, "{}", s),
            CpuSubType::X86(s) => write!(f, "{}", s),
            CpuSubType::Arm(s) => write!(f, "{}", s),
            CpuSubType::Arm64(s) => write!(f, "{}", s),
            CpuSubType::Other(code) => write!(f, "0x{:x}", code),
        }
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Display)]
pub enum CpuSubTypeI386 {
    #[strum(serialize = "i386")]
    All = 3,
    #[strum(serialize = "i486")]
    I486 = 4,
    #[strum(serialize = "i486 SX")]
    I486SX = 4 + (8 << 4),
    #[strum(serialize = "Pentium")]
    Pent = 5,
    #[strum(serialize = "Pentium Pro")]
    PentPro = 6 + (1 << 4),
    #[strum(serialize = "Pentium II M3")]
    PentIIM3 = 6 + (3 << 4),
    #[strum(serialize = "Pentium II M5")]
    PentIIM5 = 6 + (5 << 4),
    #[strum(serialize = "Celeron")]
    Cel = 7 + (6 << 4),
    #[strum(serialize = "Celeron Mobile")]
    CelMobile = 7 + (7 << 4),
    #[strum(serialize = "Pentium 3")]
    Pent3 = 8,
    #[strum(serialize = "Pentium 3 M")]
    Pent3M = 8 + (1 << 4),
    #[strum(serialize = "Pentium 3 Xeon")]
    Pent3Xeon = 8 + (2 << 4),
    #[strum(serialize = "Pentium M")]
    PentM = 9,
    #[strum(serialize = "Pentium 4")]
    Pent4 = 10,
    #[strum(serialize = "Pentium 4 M")]
    Pent4M = 10 + (1 << 4),
    #[strum(serialize = "Itanium")]
    Itanium = 11,
    #[strum(serialize = "Itanium 2")]
    Itanium2 = 11 + (1 << 4),
    #[strum(serialize = "Xeon")]
    Xeon = 12,
    #[strum(serialize = "Xeon MP")]
    XeonMP = 12 + (1 << 4),
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Display)]
pub enum CpuSubTypeX86 {
    #[strum(serialize = "x86_64")]
    All = 3,
    #[strum(serialize = "x86 arch1")]
    X86Arch1 = 4,
    #[strum(serialize = "x86_64h")]
    X86_64H = 8,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Display)]
pub enum CpuSubTypeArm {
    All = 0,
    V4T = 5,
    V6 = 6,
    V5TEJ = 7,
    XScale = 8,
    V7 = 9,
    V7F = 10,
    V7S = 11,
    V7K = 12,
    V8 = 13,
    V6M = 14,
    V7M = 15,
    V7EM = 16,
    V8M = 17,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Display)]
pub enum CpuSubTypeArm64 {
    All = 0,
    V8 = 1,
    ARM64E = 2,
}
