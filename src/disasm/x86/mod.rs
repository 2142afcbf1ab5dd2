//! x86 and x86-64 decoder producing AT&T syntax.

pub mod instruction;
pub mod operand;

use std::io::Cursor;

use nom::number::Endianness;
use tracing::trace;

use crate::{reader::ByteReader, symbols::SymbolTable};

use self::{
    instruction::Instruction,
    operand::{Memory, Operand, RegClass, Register, Width},
};
use super::{Decoder, DisasmError, DisasmResult, Disassembly};

type Reader<'a> = ByteReader<Cursor<&'a [u8]>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 32-bit code.
    Protected,
    /// 64-bit code. Enables REX prefixes and RIP-relative addressing.
    Long,
}

/// Padding sequences emitted by compilers, matched before normal decoding.
/// Ordered longest first so a prefix of a longer idiom never wins.
const NOP_IDIOMS: [(&[u8], &str); 8] = [
    (
        &[0x66, 0x2e, 0x0f, 0x1f, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        "nopw %cs:0L(%eax,%eax,1)",
    ),
    (
        &[0x66, 0x0f, 0x1f, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        "nopw 0L(%eax,%eax,1)",
    ),
    (
        &[0x0f, 0x1f, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        "nopl 0L(%eax,%eax,1)",
    ),
    (&[0x0f, 0x1f, 0x80, 0x00, 0x00, 0x00, 0x00], "nopl 0L(%eax)"),
    (
        &[0x66, 0x0f, 0x1f, 0x44, 0x00, 0x00],
        "nopw 0x0(%eax,%eax,1)",
    ),
    (&[0x0f, 0x1f, 0x44, 0x00, 0x00], "nopl 0x0(%eax,%eax,1)"),
    (&[0x0f, 0x1f, 0x00], "nopl 0x0(%eax)"),
    (&[0x66, 0x90], "xchg %ax,%ax"),
];

const ALU_OPS: [&str; 8] = ["add", "or", "adc", "sbb", "and", "sub", "xor", "cmp"];
const SHIFT_OPS: [&str; 8] = ["rol", "ror", "rcl", "rcr", "shl", "shr", "sal", "sar"];
const UNARY_OPS: [&str; 8] = ["test", "test", "not", "neg", "mul", "imul", "div", "idiv"];
const CONDITIONS: [&str; 16] = [
    "o", "no", "b", "ae", "e", "ne", "be", "a", "s", "ns", "p", "np", "l", "ge", "le", "g",
];

fn condition(opcode: u8) -> &'static str {
    CONDITIONS[(opcode & 0x0f) as usize]
}

fn segment_register(prefix: u8) -> Register {
    let index = match prefix {
        0x26 => 0,
        0x2e => 1,
        0x36 => 2,
        0x3e => 3,
        0x64 => 4,
        _ => 5,
    };
    Register::new(RegClass::Segment, index)
}

/// Try each padding idiom at the current position. Redundant `66` bytes in
/// front of an idiom are absorbed into it.
fn match_nop(reader: &mut Reader) -> DisasmResult<Option<&'static str>> {
    let start = reader.position();
    while reader.peek_pattern(&[0x66, 0x66])? {
        reader.skip(1)?;
    }

    for (pattern, text) in NOP_IDIOMS {
        if reader.peek_pattern(pattern)? {
            reader.skip(pattern.len() as u64)?;
            return Ok(Some(text));
        }
    }

    reader.seek(start)?;
    Ok(None)
}

#[derive(Debug, Clone, Copy, Default)]
struct Rex {
    present: bool,
    w: bool,
    r: bool,
    x: bool,
    b: bool,
}

impl Rex {
    fn from_byte(byte: u8) -> Self {
        Rex {
            present: true,
            w: byte & 0x8 != 0,
            r: byte & 0x4 != 0,
            x: byte & 0x2 != 0,
            b: byte & 0x1 != 0,
        }
    }

    fn bit(set: bool) -> u8 {
        if set {
            8
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Prefixes {
    operand_size: bool,
    segment: Option<Register>,
    rex: Rex,
}

#[derive(Debug, Clone, Copy)]
struct ModRm {
    mode: u8,
    reg: u8,
    rm: u8,
}

impl ModRm {
    fn from_byte(byte: u8) -> Self {
        ModRm {
            mode: byte >> 6,
            reg: (byte >> 3) & 7,
            rm: byte & 7,
        }
    }
}

/// Decoding state for a single instruction.
struct InstructionDecoder<'r, 'a> {
    reader: &'r mut Reader<'a>,
    mode: Mode,
    address: u64,
    prefixes: Prefixes,
}

impl<'r, 'a> InstructionDecoder<'r, 'a> {
    fn new(reader: &'r mut Reader<'a>, mode: Mode, address: u64) -> Self {
        InstructionDecoder {
            reader,
            mode,
            address,
            prefixes: Prefixes::default(),
        }
    }

    fn read_prefixes(&mut self) -> DisasmResult<u8> {
        loop {
            let byte = self.reader.read_byte()?;
            match byte {
                0x66 => {
                    self.prefixes.operand_size = true;
                    self.prefixes.rex = Rex::default();
                }
                0x26 | 0x2e | 0x36 | 0x3e | 0x64 | 0x65 => {
                    self.prefixes.segment = Some(segment_register(byte));
                    self.prefixes.rex = Rex::default();
                }
                0x40..=0x4f if self.mode == Mode::Long => {
                    self.prefixes.rex = Rex::from_byte(byte);
                }
                _ => return Ok(byte),
            }
        }
    }

    fn operand_width(&self) -> Width {
        if self.prefixes.rex.w {
            Width::Qword
        } else if self.prefixes.operand_size {
            Width::Word
        } else {
            Width::Dword
        }
    }

    /// Width of push, pop and near branches through a register.
    fn stack_width(&self) -> Width {
        match (self.mode, self.prefixes.operand_size) {
            (_, true) => Width::Word,
            (Mode::Long, false) => Width::Qword,
            (Mode::Protected, false) => Width::Dword,
        }
    }

    fn address_width(&self) -> Width {
        match self.mode {
            Mode::Long => Width::Qword,
            Mode::Protected => Width::Dword,
        }
    }

    fn truncated(&self) -> DisasmError {
        DisasmError::Truncated {
            offset: self.reader.position(),
        }
    }

    fn read_modrm(&mut self) -> DisasmResult<ModRm> {
        Ok(ModRm::from_byte(self.reader.read_byte()?))
    }

    /// The `reg` field of the upcoming ModRM byte, without consuming it.
    fn peek_modrm_reg(&mut self) -> DisasmResult<u8> {
        match self.reader.peek_byte()? {
            Some(byte) => Ok(ModRm::from_byte(byte).reg),
            None => Err(self.truncated()),
        }
    }

    fn peek_modrm_mode(&mut self) -> DisasmResult<u8> {
        match self.reader.peek_byte()? {
            Some(byte) => Ok(ModRm::from_byte(byte).mode),
            None => Err(self.truncated()),
        }
    }

    fn read_disp32(&mut self) -> DisasmResult<i64> {
        Ok(self.reader.read_u32()? as i32 as i64)
    }

    fn gpr(&self, width: Width, index: u8) -> Operand {
        Operand::Register(Register::gpr(width, index, self.prefixes.rex.present))
    }

    fn reg_operand(&self, modrm: &ModRm, width: Width) -> Operand {
        self.gpr(width, modrm.reg | Rex::bit(self.prefixes.rex.r))
    }

    fn rm_operand(&mut self, modrm: &ModRm, width: Width) -> DisasmResult<Operand> {
        let rex = self.prefixes.rex;
        if modrm.mode == 3 {
            return Ok(self.gpr(width, modrm.rm | Rex::bit(rex.b)));
        }

        let addr = self.address_width();
        let reg = |index: u8| Some(Register::gpr(addr, index, false));
        let mut mem = Memory {
            segment: self.prefixes.segment,
            base: None,
            index: None,
            scale: 1,
            disp: 0,
            has_disp: false,
            width: addr,
        };

        if modrm.rm == 4 {
            let sib = self.reader.read_byte()?;
            let index = ((sib >> 3) & 7) | Rex::bit(rex.x);
            let base = sib & 7;
            if index != 4 {
                mem.index = reg(index);
                mem.scale = 1 << (sib >> 6);
            }
            if base == 5 && modrm.mode == 0 {
                mem.disp = self.read_disp32()?;
                mem.has_disp = true;
            } else {
                mem.base = reg(base | Rex::bit(rex.b));
            }
        } else if modrm.rm == 5 && modrm.mode == 0 {
            mem.disp = self.read_disp32()?;
            mem.has_disp = true;
            if self.mode == Mode::Long {
                mem.base = Some(Register::new(RegClass::Rip, 0));
            }
        } else {
            mem.base = reg(modrm.rm | Rex::bit(rex.b));
        }

        match modrm.mode {
            1 => mem.disp = self.reader.read_byte()? as i8 as i64,
            2 => mem.disp = self.read_disp32()?,
            _ => {}
        }
        mem.has_disp |= modrm.mode == 1 || modrm.mode == 2;
        Ok(Operand::Memory(mem))
    }

    /// Immediate of `width`. A 64-bit operand takes a sign-extended imm32.
    fn read_imm(&mut self, width: Width) -> DisasmResult<Operand> {
        let value = match width {
            Width::Byte => self.reader.read_byte()? as u64,
            Width::Word => self.reader.read_u16()? as u64,
            Width::Qword => self.reader.read_u32()? as i32 as i64 as u64,
            Width::Dword | Width::None => self.reader.read_u32()? as u64,
        };
        Ok(Operand::Immediate { value, width })
    }

    /// Sign-extended imm8 shown at `width`.
    fn read_imm8(&mut self, width: Width) -> DisasmResult<Operand> {
        let value = self.reader.read_byte()? as i8 as i64 as u64;
        Ok(Operand::Immediate { value, width })
    }

    /// Absolute target of a branch whose displacement was just read.
    fn target(&self, disp: i64) -> Operand {
        let next = self.address.wrapping_add(self.reader.position());
        let target = next.wrapping_add(disp as u64);
        Operand::Address(match self.mode {
            Mode::Long => target,
            Mode::Protected => target & 0xffff_ffff,
        })
    }

    fn rel8(&mut self) -> DisasmResult<Operand> {
        let disp = self.reader.read_byte()? as i8 as i64;
        Ok(self.target(disp))
    }

    fn rel32(&mut self) -> DisasmResult<Operand> {
        let disp = self.read_disp32()?;
        Ok(self.target(disp))
    }

    /// `op G, E` in source-first order.
    fn reg_to_rm(&mut self, name: &str, width: Width) -> DisasmResult<Instruction> {
        let modrm = self.read_modrm()?;
        let dst = self.rm_operand(&modrm, width)?;
        Ok(Instruction::new(name, width)
            .with(self.reg_operand(&modrm, width))
            .with(dst))
    }

    /// `op E, G` in source-first order.
    fn rm_to_reg(&mut self, name: &str, width: Width) -> DisasmResult<Instruction> {
        let modrm = self.read_modrm()?;
        let src = self.rm_operand(&modrm, width)?;
        Ok(Instruction::new(name, width)
            .with(src)
            .with(self.reg_operand(&modrm, width)))
    }

    fn byte_or(&self, opcode: u8) -> Width {
        if opcode & 1 == 0 {
            Width::Byte
        } else {
            self.operand_width()
        }
    }

    fn decode(mut self) -> DisasmResult<Instruction> {
        let opcode = self.read_prefixes()?;
        let width = self.operand_width();
        let rex_b = Rex::bit(self.prefixes.rex.b);

        let inst = match opcode {
            0x0f => return self.decode_escape(),
            0x00..=0x3f if opcode & 7 < 6 => self.alu(opcode)?,
            0x50..=0x57 => {
                let stack = self.stack_width();
                Instruction::new("push", stack).with(self.gpr(stack, (opcode & 7) | rex_b))
            }
            0x58..=0x5f => {
                let stack = self.stack_width();
                Instruction::new("pop", stack).with(self.gpr(stack, (opcode & 7) | rex_b))
            }
            0x63 if self.mode == Mode::Long && self.prefixes.rex.w => {
                let modrm = self.read_modrm()?;
                let src = self.rm_operand(&modrm, Width::Dword)?;
                Instruction::new("movslq", Width::None)
                    .with(src)
                    .with(self.reg_operand(&modrm, Width::Qword))
            }
            0x68 => {
                let stack = self.stack_width();
                let imm = self.read_imm(stack)?;
                Instruction::new("push", stack).with(imm)
            }
            0x6a => {
                let stack = self.stack_width();
                let imm = self.read_imm8(stack)?;
                Instruction::new("push", stack).with(imm)
            }
            0x69 | 0x6b => {
                let modrm = self.read_modrm()?;
                let src = self.rm_operand(&modrm, width)?;
                let imm = if opcode == 0x69 {
                    self.read_imm(width)?
                } else {
                    self.read_imm8(width)?
                };
                Instruction::new("imul", width)
                    .with(imm)
                    .with(src)
                    .with(self.reg_operand(&modrm, width))
            }
            0x70..=0x7f => {
                let target = self.rel8()?;
                Instruction::new(&format!("j{}", condition(opcode)), Width::None).with(target)
            }
            0x80 | 0x81 | 0x83 => {
                let modrm = self.read_modrm()?;
                let width = self.byte_or(opcode);
                let dst = self.rm_operand(&modrm, width)?;
                let imm = match opcode {
                    0x81 => self.read_imm(width)?,
                    0x83 => self.read_imm8(width)?,
                    _ => self.read_imm(Width::Byte)?,
                };
                Instruction::new(ALU_OPS[modrm.reg as usize], width)
                    .with(imm)
                    .with(dst)
            }
            0x84 | 0x85 => self.reg_to_rm("test", self.byte_or(opcode))?,
            0x86 | 0x87 => self.reg_to_rm("xchg", self.byte_or(opcode))?,
            0x88 | 0x89 => self.reg_to_rm("mov", self.byte_or(opcode))?,
            0x8a | 0x8b => self.rm_to_reg("mov", self.byte_or(opcode))?,
            0x8d => {
                if self.peek_modrm_mode()? == 3 {
                    return Ok(self.unsupported(&[opcode]));
                }
                self.rm_to_reg("lea", width)?
            }
            0x8f => {
                if self.peek_modrm_reg()? != 0 {
                    return Ok(self.unsupported(&[opcode]));
                }
                let modrm = self.read_modrm()?;
                let stack = self.stack_width();
                let dst = self.rm_operand(&modrm, stack)?;
                Instruction::new("pop", stack).with(dst)
            }
            0x90 if rex_b == 0 => Instruction::new("nop", Width::None),
            0x90..=0x97 => Instruction::new("xchg", width)
                .with(self.gpr(width, 0))
                .with(self.gpr(width, (opcode & 7) | rex_b)),
            0x98 => Instruction::new(
                match width {
                    Width::Qword => "cltq",
                    Width::Word => "cbtw",
                    _ => "cwtl",
                },
                Width::None,
            ),
            0x99 => Instruction::new(
                match width {
                    Width::Qword => "cqto",
                    Width::Word => "cwtd",
                    _ => "cltd",
                },
                Width::None,
            ),
            0xa8 | 0xa9 => {
                let width = self.byte_or(opcode);
                let imm = self.read_imm(width)?;
                Instruction::new("test", width)
                    .with(imm)
                    .with(self.gpr(width, 0))
            }
            0xb0..=0xb7 => {
                let imm = self.read_imm(Width::Byte)?;
                Instruction::new("mov", Width::Byte)
                    .with(imm)
                    .with(self.gpr(Width::Byte, (opcode & 7) | rex_b))
            }
            0xb8..=0xbf if self.prefixes.rex.w => {
                let value = self.reader.read_u64()?;
                Instruction::new("movabs", Width::Qword)
                    .with(Operand::Immediate {
                        value,
                        width: Width::Qword,
                    })
                    .with(self.gpr(Width::Qword, (opcode & 7) | rex_b))
            }
            0xb8..=0xbf => {
                let imm = self.read_imm(width)?;
                Instruction::new("mov", width)
                    .with(imm)
                    .with(self.gpr(width, (opcode & 7) | rex_b))
            }
            0xc0 | 0xc1 | 0xd0..=0xd3 => {
                let modrm = self.read_modrm()?;
                let width = self.byte_or(opcode);
                let dst = self.rm_operand(&modrm, width)?;
                let inst = Instruction::new(SHIFT_OPS[modrm.reg as usize], width);
                match opcode {
                    0xc0 | 0xc1 => {
                        let count = self.read_imm(Width::Byte)?;
                        inst.with(count).with(dst)
                    }
                    0xd0 | 0xd1 => inst.with(dst),
                    _ => inst.with(self.gpr(Width::Byte, 1)).with(dst),
                }
            }
            0xc2 => {
                let value = self.reader.read_u16()? as u64;
                Instruction::new("ret", Width::None).with(Operand::Immediate {
                    value,
                    width: Width::Word,
                })
            }
            0xc3 => Instruction::new("ret", Width::None),
            0xc6 | 0xc7 => {
                if self.peek_modrm_reg()? != 0 {
                    return Ok(self.unsupported(&[opcode]));
                }
                let modrm = self.read_modrm()?;
                let width = self.byte_or(opcode);
                let dst = self.rm_operand(&modrm, width)?;
                let imm = self.read_imm(width)?;
                Instruction::new("mov", width).with(imm).with(dst)
            }
            0xc9 => Instruction::new("leave", Width::None),
            0xcc => Instruction::new("int3", Width::None),
            0xe8 => {
                let target = self.rel32()?;
                let mut inst = Instruction::new("call", self.address_width()).with(target);
                inst.call = true;
                inst
            }
            0xe9 => {
                let target = self.rel32()?;
                Instruction::new("jmp", Width::None).with(target)
            }
            0xeb => {
                let target = self.rel8()?;
                Instruction::new("jmp", Width::None).with(target)
            }
            0xf4 => Instruction::new("hlt", Width::None),
            0xf6 | 0xf7 => {
                let modrm = self.read_modrm()?;
                let width = self.byte_or(opcode);
                let dst = self.rm_operand(&modrm, width)?;
                let inst = Instruction::new(UNARY_OPS[modrm.reg as usize], width);
                if modrm.reg < 2 {
                    let imm = self.read_imm(width)?;
                    inst.with(imm).with(dst)
                } else {
                    inst.with(dst)
                }
            }
            0xfe => {
                let reg = self.peek_modrm_reg()?;
                if reg > 1 {
                    return Ok(self.unsupported(&[opcode]));
                }
                let modrm = self.read_modrm()?;
                let dst = self.rm_operand(&modrm, Width::Byte)?;
                Instruction::new(if reg == 0 { "inc" } else { "dec" }, Width::Byte).with(dst)
            }
            0xff => return self.group5(width),
            _ => self.unsupported(&[opcode]),
        };
        Ok(inst)
    }

    fn alu(&mut self, opcode: u8) -> DisasmResult<Instruction> {
        let name = ALU_OPS[(opcode >> 3) as usize];
        let width = self.byte_or(opcode);
        match opcode & 7 {
            0 | 1 => self.reg_to_rm(name, width),
            2 | 3 => self.rm_to_reg(name, width),
            _ => {
                let imm = self.read_imm(width)?;
                Ok(Instruction::new(name, width)
                    .with(imm)
                    .with(self.gpr(width, 0)))
            }
        }
    }

    fn group5(&mut self, width: Width) -> DisasmResult<Instruction> {
        let reg = self.peek_modrm_reg()?;
        if reg == 7 {
            return Ok(self.unsupported(&[0xff]));
        }
        let modrm = self.read_modrm()?;
        let (name, inst_width, operand_width, indirect) = match reg {
            0 => ("inc", width, width, false),
            1 => ("dec", width, width, false),
            2 => ("call", self.stack_width(), self.stack_width(), true),
            3 => ("lcall", Width::None, width, true),
            4 => ("jmp", Width::None, self.stack_width(), true),
            5 => ("ljmp", Width::None, width, true),
            _ => ("push", self.stack_width(), self.stack_width(), false),
        };
        let operand = self.rm_operand(&modrm, operand_width)?;
        let mut inst = Instruction::new(name, inst_width).with(operand);
        inst.indirect = indirect;
        Ok(inst)
    }

    fn decode_escape(&mut self) -> DisasmResult<Instruction> {
        let opcode = self.reader.read_byte()?;
        let width = self.operand_width();

        let inst = match opcode {
            0x05 => Instruction::new("syscall", Width::None),
            0x0b => Instruction::new("ud2", Width::None),
            0x1f => {
                let modrm = self.read_modrm()?;
                let dst = self.rm_operand(&modrm, width)?;
                Instruction::new("nop", width).with(dst)
            }
            0x40..=0x4f => {
                let modrm = self.read_modrm()?;
                let src = self.rm_operand(&modrm, width)?;
                Instruction::new(&format!("cmov{}", condition(opcode)), Width::None)
                    .with(src)
                    .with(self.reg_operand(&modrm, width))
            }
            0x80..=0x8f => {
                let target = self.rel32()?;
                Instruction::new(&format!("j{}", condition(opcode)), Width::None).with(target)
            }
            0x90..=0x9f => {
                let modrm = self.read_modrm()?;
                let dst = self.rm_operand(&modrm, Width::Byte)?;
                Instruction::new(&format!("set{}", condition(opcode)), Width::None).with(dst)
            }
            0xa2 => Instruction::new("cpuid", Width::None),
            0xaf => self.rm_to_reg("imul", width)?,
            0xb6 | 0xb7 | 0xbe | 0xbf => {
                let src_width = if opcode & 1 == 0 {
                    Width::Byte
                } else {
                    Width::Word
                };
                let base = if opcode < 0xbe { "movz" } else { "movs" };
                let modrm = self.read_modrm()?;
                let src = self.rm_operand(&modrm, src_width)?;
                Instruction::new(&format!("{}{}", base, src_width.suffix()), width)
                    .with(src)
                    .with(self.reg_operand(&modrm, width))
            }
            _ => self.unsupported(&[0x0f, opcode]),
        };
        Ok(inst)
    }

    fn unsupported(&self, opcode: &[u8]) -> Instruction {
        trace!(
            offset = self.reader.position(),
            opcode = ?opcode,
            "unsupported opcode"
        );
        Instruction::unsupported(opcode)
    }
}

/// Decoder for 32-bit and 64-bit x86 code.
#[derive(Debug, Clone, Copy)]
pub struct X86Decoder {
    mode: Mode,
}

impl X86Decoder {
    pub fn new(mode: Mode) -> Self {
        X86Decoder { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Decoder for X86Decoder {
    fn decode(
        &self,
        data: &[u8],
        address: u64,
        symbols: Option<&SymbolTable>,
    ) -> DisasmResult<Disassembly> {
        let mut reader = ByteReader::new(Cursor::new(data), Endianness::Little)?;
        let mut out = Disassembly::default();

        while !reader.at_end() {
            let start = reader.position();
            let text = match match_nop(&mut reader)? {
                Some(text) => text.to_string(),
                None => InstructionDecoder::new(&mut reader, self.mode, address)
                    .decode()?
                    .text(symbols),
            };
            out.push(text, (reader.position() - start) as usize);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolEntry;

    fn decode(mode: Mode, hex_text: &str, address: u64) -> Vec<(String, usize)> {
        let compact: String = hex_text.split_whitespace().collect();
        let data = hex::decode(compact).unwrap();
        X86Decoder::new(mode)
            .decode(&data, address, None)
            .unwrap()
            .lines
            .into_iter()
            .map(|line| (line.text, line.bytes_consumed))
            .collect()
    }

    fn one32(hex_text: &str) -> String {
        let lines = decode(Mode::Protected, hex_text, 0x1000);
        assert_eq!(lines.len(), 1, "{:?}", lines);
        lines[0].0.clone()
    }

    fn one64(hex_text: &str) -> String {
        let lines = decode(Mode::Long, hex_text, 0x1000);
        assert_eq!(lines.len(), 1, "{:?}", lines);
        lines[0].0.clone()
    }

    #[test]
    fn test_prologue_32() {
        let lines = decode(Mode::Protected, "55 89 e5 83 ec 18 c9 c3", 0x1000);
        assert_eq!(
            lines,
            vec![
                ("pushl %ebp".to_string(), 1),
                ("movl %esp,%ebp".to_string(), 2),
                ("subl $0x18,%esp".to_string(), 3),
                ("leave".to_string(), 1),
                ("ret".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_memory_operands_32() {
        assert_eq!(one32("8b 45 08"), "movl 0x8(%ebp),%eax");
        assert_eq!(one32("8b 45 f8"), "movl -0x8(%ebp),%eax");
        assert_eq!(one32("8d 04 8d 00 00 00 00"), "leal 0x0(,%ecx,4),%eax");
        assert_eq!(one32("c7 45 fc 00 00 00 00"), "movl $0x0,-0x4(%ebp)");
        assert_eq!(one32("65 8b 05 14 00 00 00"), "movl %gs:0x14,%eax");
        assert_eq!(one32("89 04 24"), "movl %eax,(%esp)");
        assert_eq!(one32("8b 04 25 f0 ff ff ff"), "movl 0xfffffff0,%eax");
    }

    #[test]
    fn test_zero_displacement_is_shown() {
        assert_eq!(
            decode(Mode::Protected, "8b 45 00", 0),
            vec![("movl 0x0(%ebp),%eax".to_string(), 3)]
        );
        assert_eq!(
            decode(Mode::Protected, "8b 85 00 00 00 00", 0),
            vec![("movl 0x0(%ebp),%eax".to_string(), 6)]
        );
        assert_eq!(one64("4c 8b 6c 24 00"), "movq 0x0(%rsp),%r13");
        assert_eq!(one32("8b 00"), "movl (%eax),%eax");
    }

    #[test]
    fn test_branches_32() {
        assert_eq!(one32("e8 00 00 00 00"), "calll 0x1005");
        assert_eq!(one32("e8 fb ff ff ff"), "calll 0x1000");
        assert_eq!(one32("74 05"), "je 0x1007");
        assert_eq!(one32("eb fe"), "jmp 0x1000");
        assert_eq!(one32("0f 84 10 00 00 00"), "je 0x1016");
        assert_eq!(one32("ff d0"), "calll *%eax");
        assert_eq!(one32("ff 24 85 00 20 00 00"), "jmp *0x2000(,%eax,4)");
    }

    #[test]
    fn test_misc_32() {
        assert_eq!(one32("31 c0"), "xorl %eax,%eax");
        assert_eq!(one32("0f b6 c0"), "movzbl %al,%eax");
        assert_eq!(one32("0f bf c8"), "movswl %ax,%ecx");
        assert_eq!(one32("0f 94 c0"), "sete %al");
        assert_eq!(one32("66 89 c8"), "movw %cx,%ax");
        assert_eq!(one32("c1 e0 04"), "shll $0x4,%eax");
        assert_eq!(one32("d1 f8"), "sarl %eax");
        assert_eq!(one32("6b c0 0c"), "imull $0xc,%eax,%eax");
        assert_eq!(one32("f7 d8"), "negl %eax");
        assert_eq!(one32("85 c0"), "testl %eax,%eax");
        assert_eq!(one32("b8 01 00 00 00"), "movl $0x1,%eax");
        assert_eq!(one32("6a ff"), "pushl $0xffffffff");
        assert_eq!(one32("99"), "cltd");
    }

    #[test]
    fn test_call_annotation() {
        let mut table = SymbolTable::new();
        table.push(SymbolEntry {
            index: 0,
            value: 0x1005,
            string: Some("_helper".to_string()),
        });
        let data = [0xe8, 0x00, 0x00, 0x00, 0x00, 0xff, 0xd0];
        let out = X86Decoder::new(Mode::Protected)
            .decode(&data, 0x1000, Some(&table))
            .unwrap();
        assert_eq!(out.lines[0].text, "calll 0x1005 (_helper)");
        // Indirect calls have no static target to name.
        assert_eq!(out.lines[1].text, "calll *%eax");
    }

    #[test]
    fn test_nop_idioms() {
        let cases: [(&str, &str, usize); 8] = [
            ("66 2e 0f 1f 84 00 00 00 00 00", "nopw %cs:0L(%eax,%eax,1)", 10),
            ("66 0f 1f 84 00 00 00 00 00", "nopw 0L(%eax,%eax,1)", 9),
            ("0f 1f 84 00 00 00 00 00", "nopl 0L(%eax,%eax,1)", 8),
            ("0f 1f 80 00 00 00 00", "nopl 0L(%eax)", 7),
            ("66 0f 1f 44 00 00", "nopw 0x0(%eax,%eax,1)", 6),
            ("0f 1f 44 00 00", "nopl 0x0(%eax,%eax,1)", 5),
            ("0f 1f 00", "nopl 0x0(%eax)", 3),
            ("66 90", "xchg %ax,%ax", 2),
        ];
        for mode in [Mode::Protected, Mode::Long] {
            for (hex_text, text, len) in cases {
                assert_eq!(
                    decode(mode, hex_text, 0),
                    vec![(text.to_string(), len)],
                    "{}",
                    hex_text
                );
            }
        }
        assert_eq!(one32("90"), "nop");
    }

    #[test]
    fn test_redundant_operand_size_prefixes() {
        assert_eq!(
            decode(Mode::Long, "66 66 2e 0f 1f 84 00 00 00 00 00", 0),
            vec![("nopw %cs:0L(%eax,%eax,1)".to_string(), 11)]
        );
        assert_eq!(
            decode(Mode::Protected, "66 66 66 90", 0),
            vec![("xchg %ax,%ax".to_string(), 4)]
        );
    }

    #[test]
    fn test_rex_64() {
        let lines = decode(Mode::Long, "55 48 89 e5 48 83 ec 10 41 57 c3", 0x1000);
        let texts: Vec<&str> = lines.iter().map(|(text, _)| text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "pushq %rbp",
                "movq %rsp,%rbp",
                "subq $0x10,%rsp",
                "pushq %r15",
                "ret"
            ]
        );
        assert_eq!(one64("45 31 c0"), "xorl %r8d,%r8d");
        assert_eq!(one64("40 88 c6"), "movb %al,%sil");
        assert_eq!(one64("48 63 c7"), "movslq %edi,%rax");
        assert_eq!(one64("48 c7 c0 ff ff ff ff"), "movq $0xffffffffffffffff,%rax");
        assert_eq!(
            one64("48 b8 88 77 66 55 44 33 22 11"),
            "movabsq $0x1122334455667788,%rax"
        );
        assert_eq!(one64("48 98"), "cltq");
        assert_eq!(one64("0f 05"), "syscall");
    }

    #[test]
    fn test_rip_relative_64() {
        assert_eq!(one64("48 8b 05 10 00 00 00"), "movq 0x10(%rip),%rax");
        assert_eq!(one64("48 8d 3d f0 ff ff ff"), "leaq -0x10(%rip),%rdi");
        assert_eq!(one64("ff 25 00 10 00 00"), "jmp *0x1000(%rip)");
        assert_eq!(one64("ff 15 00 10 00 00"), "callq *0x1000(%rip)");
    }

    #[test]
    fn test_absolute_address_64() {
        assert_eq!(
            one64("48 8b 04 25 f0 ff ff ff"),
            "movq 0xfffffffffffffff0,%rax"
        );
        assert_eq!(one64("8b 04 25 00 10 00 00"), "movl 0x1000,%eax");
    }

    #[test]
    fn test_call_64() {
        let lines = decode(Mode::Long, "e8 00 00 00 00", 0x1_0000_0f00);
        assert_eq!(lines, vec![("callq 0x100000f05".to_string(), 5)]);
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(
            decode(Mode::Protected, "0e 0f a3 c3", 0),
            vec![
                ("Unsupported: 0E".to_string(), 1),
                ("Unsupported: 0F A3".to_string(), 2),
                ("ret".to_string(), 1),
            ]
        );
        assert_eq!(decode(Mode::Protected, "40", 0)[0].0, "Unsupported: 40");
        assert_eq!(
            decode(Mode::Protected, "ff ff c3", 0),
            vec![
                ("Unsupported: FF".to_string(), 1),
                ("incl %ebx".to_string(), 2),
            ]
        );
        assert_eq!(
            decode(Mode::Protected, "8d c3", 0),
            vec![
                ("Unsupported: 8D".to_string(), 1),
                ("ret".to_string(), 1),
            ]
        );
        assert_eq!(one32("8d 00"), "leal (%eax),%eax");
    }

    #[test]
    fn test_truncated() {
        let decoder = X86Decoder::new(Mode::Protected);
        match decoder.decode(&[0x55, 0xe8, 0x00, 0x00], 0, None) {
            Err(DisasmError::Truncated { offset }) => assert_eq!(offset, 2),
            other => panic!("expected truncation, got {:?}", other),
        }
        assert!(matches!(
            decoder.decode(&[0x8b], 0, None),
            Err(DisasmError::Truncated { .. })
        ));
    }

    #[test]
    fn test_deterministic_and_complete() {
        let data = hex::decode("5589e583ec18e8000000000f1f4400008b4508c9c3").unwrap();
        let decoder = X86Decoder::new(Mode::Protected);
        let first = decoder.decode(&data, 0x1f00, None).unwrap();
        let second = decoder.decode(&data, 0x1f00, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_bytes(), data.len());
    }
}
