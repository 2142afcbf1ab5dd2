use crate::{command::Nlist, helpers::string_upto_null_terminator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub index: u32,
    /// Address the symbol names.
    pub value: u64,
    pub string: Option<String>,
}

/// Symbols in table order. Lookups scan linearly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve each record's name against the raw string table. A zero or
    /// out-of-range string index leaves the entry unnamed.
    pub fn from_nlists(nlists: &[Nlist], strtab: &[u8]) -> Self {
        let mut table = SymbolTable::new();
        for (index, nlist) in nlists.iter().enumerate() {
            let string = match strtab.get(nlist.n_strx as usize..) {
                Some(tail) if nlist.n_strx != 0 => string_upto_null_terminator(tail)
                    .ok()
                    .map(|(_, name)| name)
                    .filter(|name| !name.is_empty()),
                _ => None,
            };
            table.push(SymbolEntry {
                index: index as u32,
                value: nlist.n_value,
                string,
            });
        }
        table
    }

    pub fn push(&mut self, entry: SymbolEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the first entry at `value` that has one.
    pub fn lookup(&self, value: u64) -> Option<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.value == value)
            .find_map(|entry| entry.string.as_deref().filter(|s| !s.is_empty()))
    }
}
