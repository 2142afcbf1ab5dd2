pub mod command;
pub mod disasm;
pub mod fat;
pub mod file_subset;
pub mod header;
pub mod helpers;
pub mod logging;
pub mod machine;
pub mod macho;
pub mod object;
pub mod reader;
pub mod section;
pub mod symbols;

#[cfg(test)]
mod fixtures;

pub use disasm::{DecodeOptions, Disassembler, Disassembly, DisasmError, DisasmResult};
pub use macho::{Container, MachO, MachOErr, MachOResult};
pub use object::BinaryObject;
pub use section::{Section, SectionKind};
pub use symbols::SymbolTable;
