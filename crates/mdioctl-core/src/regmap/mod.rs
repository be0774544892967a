//! Register field maps
//!
//! A register map describes named bitfields of paged PHY registers. It is
//! built in two phases:
//!
//! 1. A tabular description is parsed into a [`RegisterMap`], a list of
//!    [`FieldDescriptor`] values with no behaviour attached.
//! 2. [`FieldAccessors::compile`] turns each descriptor into get/set/doc
//!    accessors that run against anything implementing [`RegisterIo`].
//!
//! Maps can also be exported as markdown documentation, as a Rust
//! accessor module, or to/from TOML.

mod compile;
mod dump;
mod field;
mod parser;
mod toml;

pub use compile::{AccessorKind, CompiledField, FieldAccessors, FieldGetter, FieldSetter, RegisterIo};
pub use dump::{generate_code, generate_doc};
pub use field::{BitRange, FieldDescriptor, PAGE_SIZE, REGISTER_BITS};
pub use parser::parse_csv;

use crate::error::{Error, FramingError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parsed register map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    /// Value of the `$ TAG:` row, if any
    pub tag: Option<String>,
    /// File the map was loaded from
    pub source: Option<String>,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl RegisterMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a map from a CSV file
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut map = parse_csv(&content)?;
        map.source = Some(path.display().to_string());
        log::debug!(
            "Loaded {} fields from {}",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    /// Parse a map from CSV text
    pub fn from_csv_str(content: &str) -> Result<Self> {
        parse_csv(content)
    }

    /// Append a field; names must be unique
    pub fn push(&mut self, field: FieldDescriptor) -> Result<()> {
        if self.index.contains_key(&field.name) {
            return Err(FramingError::DuplicateField(field.name).into());
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Look up a field by (case-insensitive) name
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.fields[i])
    }

    /// Fields in table order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct register addresses in ascending order
    pub fn addresses(&self) -> Vec<u16> {
        let mut addrs: Vec<u16> = self.fields.iter().map(|f| f.addr).collect();
        addrs.sort_unstable();
        addrs.dedup();
        addrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ",# addr = 0x20").unwrap();
        writeln!(file, ",[1:0],0x0,,speed").unwrap();
        writeln!(file, ",# addr = 0x3").unwrap();
        writeln!(file, ",[4],0x0,,loop").unwrap();

        let map = RegisterMap::from_csv_file(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.addresses(), vec![0x3, 0x20]);
        assert!(map.source.is_some());
        assert_eq!(map.get("SPEED").map(|f| f.addr), Some(0x20));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RegisterMap::from_csv_file("/nonexistent/regfile.csv"),
            Err(Error::Io { .. })
        ));
    }
}
