use std::fmt;

/// Operand width. Also selects the AT&T mnemonic suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    None,
    Byte,
    Word,
    Dword,
    Qword,
}

impl Width {
    pub fn suffix(&self) -> &'static str {
        match self {
            Width::None => "",
            Width::Byte => "b",
            Width::Word => "w",
            Width::Dword => "l",
            Width::Qword => "q",
        }
    }

    pub fn mask(&self) -> u64 {
        match self {
            Width::Byte => 0xff,
            Width::Word => 0xffff,
            Width::Dword => 0xffff_ffff,
            Width::Qword | Width::None => u64::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    /// Legacy byte registers; indices 4-7 are the high halves.
    R8,
    /// Byte registers when a REX prefix is present.
    R8Rex,
    R16,
    R32,
    R64,
    Segment,
    Rip,
}

const REGS_8: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];
const REGS_8_REX: [&str; 16] = [
    "al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b", "r12b",
    "r13b", "r14b", "r15b",
];
const REGS_16: [&str; 16] = [
    "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w", "r12w", "r13w",
    "r14w", "r15w",
];
const REGS_32: [&str; 16] = [
    "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d", "r12d",
    "r13d", "r14d", "r15d",
];
const REGS_64: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15",
];
const REGS_SEGMENT: [&str; 6] = ["es", "cs", "ss", "ds", "fs", "gs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub class: RegClass,
    pub index: u8,
}

impl Register {
    pub fn new(class: RegClass, index: u8) -> Self {
        Register { class, index }
    }

    /// General-purpose register of `width`. `rex` picks the REX byte set.
    pub fn gpr(width: Width, index: u8, rex: bool) -> Self {
        let class = match width {
            Width::Byte if rex => RegClass::R8Rex,
            Width::Byte => RegClass::R8,
            Width::Word => RegClass::R16,
            Width::Qword => RegClass::R64,
            Width::Dword | Width::None => RegClass::R32,
        };
        Register { class, index }
    }

    pub fn name(&self) -> &'static str {
        let index = self.index as usize;
        let name = match self.class {
            RegClass::R8 => REGS_8.get(index),
            RegClass::R8Rex => REGS_8_REX.get(index),
            RegClass::R16 => REGS_16.get(index),
            RegClass::R32 => REGS_32.get(index),
            RegClass::R64 => REGS_64.get(index),
            RegClass::Segment => REGS_SEGMENT.get(index),
            RegClass::Rip => Some(&"rip"),
        };
        name.copied().unwrap_or("?")
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name())
    }
}

/// `segment:disp(base,index,scale)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub segment: Option<Register>,
    pub base: Option<Register>,
    pub index: Option<Register>,
    pub scale: u8,
    pub disp: i64,
    /// The encoding carried a displacement, even if it is zero.
    pub has_disp: bool,
    /// Address size. Bounds an absolute address.
    pub width: Width,
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(segment) = self.segment {
            write!(f, "{}:", segment)?;
        }

        if self.base.is_none() && self.index.is_none() {
            // Absolute address.
            return write!(f, "0x{:x}", self.disp as u64 & self.width.mask());
        }

        if self.disp != 0 || self.has_disp || self.base.is_none() {
            if self.disp < 0 {
                write!(f, "-0x{:x}", self.disp.unsigned_abs())?;
            } else {
                write!(f, "0x{:x}", self.disp)?;
            }
        }

        write!(f, "(")?;
        if let Some(base) = self.base {
            write!(f, "{}", base)?;
        }
        if let Some(index) = self.index {
            write!(f, ",{},{}", index, self.scale)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Memory(Memory),
    Immediate { value: u64, width: Width },
    /// Absolute target of a relative branch.
    Address(u64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Memory(mem) => write!(f, "{}", mem),
            Operand::Immediate { value, width } => write!(f, "$0x{:x}", value & width.mask()),
            Operand::Address(addr) => write!(f, "0x{:x}", addr),
        }
    }
}
