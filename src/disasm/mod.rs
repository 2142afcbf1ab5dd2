pub mod x86;

use thiserror::Error;

use crate::{
    machine::CpuType,
    macho::MachOErr,
    object::BinaryObject,
    section::Section,
    symbols::SymbolTable,
};

use self::x86::{Mode, X86Decoder};

#[derive(Debug, Error)]
pub enum DisasmError {
    #[error("no decoder available for {0}")]
    NoDecoder(CpuType),

    #[error("instruction truncated at offset {offset:#x}")]
    Truncated { offset: u64 },

    #[error("invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error(transparent)]
    Reader(MachOErr),
}

impl From<MachOErr> for DisasmError {
    fn from(err: MachOErr) -> Self {
        match err {
            MachOErr::Truncated { offset, .. } => DisasmError::Truncated { offset },
            other => DisasmError::Reader(other),
        }
    }
}

pub type DisasmResult<T> = Result<T, DisasmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Name relative call targets found in the symbol table.
    pub annotate_symbols: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            annotate_symbols: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub bytes_consumed: usize,
}

/// Decoded lines in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disassembly {
    pub lines: Vec<Line>,
}

impl Disassembly {
    pub fn push(&mut self, text: String, bytes_consumed: usize) {
        self.lines.push(Line {
            text,
            bytes_consumed,
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.lines.iter().map(|line| line.bytes_consumed).sum()
    }

    /// Lines paired with the address of their first byte.
    pub fn with_addresses(&self, base: u64) -> Vec<(u64, &Line)> {
        let mut addr = base;
        self.lines
            .iter()
            .map(|line| {
                let at = addr;
                addr = addr.wrapping_add(line.bytes_consumed as u64);
                (at, line)
            })
            .collect()
    }
}

/// An instruction-set decoder.
pub trait Decoder {
    /// Decode all of `data`, which is loaded at `address`. A short read
    /// aborts the whole decode.
    fn decode(
        &self,
        data: &[u8],
        address: u64,
        symbols: Option<&SymbolTable>,
    ) -> DisasmResult<Disassembly>;
}

/// Picks a decoder for an object's architecture and runs it over that
/// object's bytes.
pub struct Disassembler<'a> {
    object: &'a BinaryObject,
    decoder: Box<dyn Decoder>,
    options: DecodeOptions,
}

impl<'a> Disassembler<'a> {
    pub fn new(object: &'a BinaryObject) -> DisasmResult<Self> {
        let decoder: Box<dyn Decoder> = match object.cpu_type {
            CpuType::I386 | CpuType::X86_64 => {
                let mode = if object.address_width == 64 {
                    Mode::Long
                } else {
                    Mode::Protected
                };
                Box::new(X86Decoder::new(mode))
            }
            other => return Err(DisasmError::NoDecoder(other)),
        };

        Ok(Disassembler {
            object,
            decoder,
            options: DecodeOptions::default(),
        })
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn disassemble(&self, section: &Section) -> DisasmResult<Disassembly> {
        self.disassemble_bytes(section.data(), section.address)
    }

    pub fn disassemble_bytes(&self, data: &[u8], address: u64) -> DisasmResult<Disassembly> {
        let symbols = if self.options.annotate_symbols {
            Some(&self.object.symbol_table)
        } else {
            None
        };
        self.decoder.decode(data, address, symbols)
    }

    /// Decode hex text such as `"55 89 e5"`. Whitespace is ignored.
    pub fn disassemble_hex(&self, text: &str, address: u64) -> DisasmResult<Disassembly> {
        let compact: String = text.split_whitespace().collect();
        let data = hex::decode(compact)?;
        self.disassemble_bytes(&data, address)
    }
}
