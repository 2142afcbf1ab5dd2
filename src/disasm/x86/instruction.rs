use crate::symbols::SymbolTable;

use super::operand::{Operand, Width};

/// One decoded instruction. Operands are kept in AT&T order, source first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: String,
    pub width: Width,
    pub operands: Vec<Operand>,
    /// Relative call whose target may be named from the symbol table.
    pub call: bool,
    /// Indirect branch; the operand prints with a leading `*`.
    pub indirect: bool,
}

impl Instruction {
    pub fn new(mnemonic: &str, width: Width) -> Self {
        Instruction {
            mnemonic: mnemonic.to_string(),
            width,
            operands: Vec::new(),
            call: false,
            indirect: false,
        }
    }

    /// Placeholder for an opcode the decoder does not know. `opcode` is the
    /// escape byte (if any) followed by the opcode byte.
    pub fn unsupported(opcode: &[u8]) -> Self {
        let bytes: Vec<String> = opcode.iter().map(|b| format!("{:02X}", b)).collect();
        Instruction::new(&format!("Unsupported: {}", bytes.join(" ")), Width::None)
    }

    pub fn with(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    /// Absolute target of a relative branch, if this is one.
    pub fn target(&self) -> Option<u64> {
        match self.operands.first() {
            Some(Operand::Address(addr)) => Some(*addr),
            _ => None,
        }
    }

    pub fn text(&self, symbols: Option<&SymbolTable>) -> String {
        let mut text = format!("{}{}", self.mnemonic, self.width.suffix());
        if !self.operands.is_empty() {
            let operands: Vec<String> = self.operands.iter().map(|op| op.to_string()).collect();
            text.push(' ');
            if self.indirect {
                text.push('*');
            }
            text.push_str(&operands.join(","));
        }

        if self.call {
            let name = self
                .target()
                .and_then(|target| symbols.and_then(|table| table.lookup(target)));
            if let Some(name) = name {
                text.push_str(&format!(" ({})", name));
            }
        }
        text
    }
}
