//! Field accessor compiler
//!
//! Turns [`FieldDescriptor`]s into boxed getter/setter closures keyed by
//! field name. Accessors run against a [`RegisterIo`], which the MDIO
//! capability implements with page-select-then-access semantics.

use std::collections::HashMap;

use super::field::FieldDescriptor;
use super::RegisterMap;
use crate::error::{Error, FramingError, RegisterAccessError, Result};

/// Paged register access used by field accessors
pub trait RegisterIo {
    /// Select `page`, then read register `reg`
    fn read_paged(&mut self, page: u16, reg: u16) -> Result<u16>;

    /// Select `page`, then write register `reg`
    fn write_paged(&mut self, page: u16, reg: u16, value: u16) -> Result<()>;
}

/// Compiled field getter
pub type FieldGetter = Box<dyn Fn(&mut dyn RegisterIo) -> Result<u16> + Send + Sync>;

/// Compiled field setter: `(io, value, raw)`
pub type FieldSetter = Box<dyn Fn(&mut dyn RegisterIo, u16, bool) -> Result<()> + Send + Sync>;

/// Kind of a generated accessor name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
    Doc,
}

impl AccessorKind {
    fn prefix(self) -> &'static str {
        match self {
            AccessorKind::Get => "get_",
            AccessorKind::Set => "set_",
            AccessorKind::Doc => "doc_",
        }
    }
}

fn make_getter(field: &FieldDescriptor) -> FieldGetter {
    let (page, reg) = (field.page(), field.offset());
    let (bitmask, shift) = (field.bitmask, field.shift);
    Box::new(move |io: &mut dyn RegisterIo| -> Result<u16> {
        let raw = io.read_paged(page, reg)?;
        Ok((raw & bitmask) >> shift)
    })
}

fn make_setter(field: &FieldDescriptor) -> FieldSetter {
    let (page, reg) = (field.page(), field.offset());
    let (bitmask, shift) = (field.bitmask, field.shift);
    Box::new(move |io: &mut dyn RegisterIo, value: u16, raw: bool| -> Result<()> {
        let current = if raw || bitmask == 0xFFFF {
            0
        } else {
            io.read_paged(page, reg)?
        };
        let bits = ((u32::from(value) << shift) as u16) & bitmask;
        io.write_paged(page, reg, (current & !bitmask) | bits)
    })
}

/// One field with its compiled accessors
pub struct CompiledField {
    descriptor: FieldDescriptor,
    getter: FieldGetter,
    setter: Option<FieldSetter>,
}

impl CompiledField {
    /// Compile a descriptor; readonly fields get no setter
    pub fn compile(descriptor: &FieldDescriptor) -> Self {
        Self {
            getter: make_getter(descriptor),
            setter: (!descriptor.readonly).then(|| make_setter(descriptor)),
            descriptor: descriptor.clone(),
        }
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the field, `None` if the register read failed
    pub fn get(&self, io: &mut dyn RegisterIo) -> Option<u16> {
        match (self.getter)(io) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("get_{}: {}", self.descriptor.name, e);
                None
            }
        }
    }

    /// Read the field, reporting why a failed read failed
    pub fn try_get(&self, io: &mut dyn RegisterIo) -> Result<u16> {
        (self.getter)(io).map_err(|e| self.access_error(e))
    }

    /// Write the field; returns `false` if the read or write failed
    ///
    /// Unless `raw` is set or the field spans the whole register, the
    /// other bits of the register are preserved.
    pub fn set(&self, io: &mut dyn RegisterIo, value: u16, raw: bool) -> Result<bool> {
        match self.try_set(io, value, raw) {
            Ok(()) => Ok(true),
            Err(Error::RegisterAccess(RegisterAccessError::Failed { source, .. })) => {
                log::debug!("set_{}: {}", self.descriptor.name, source);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Write the field, reporting why a failed access failed
    pub fn try_set(&self, io: &mut dyn RegisterIo, value: u16, raw: bool) -> Result<()> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| RegisterAccessError::ReadOnly(self.descriptor.name.clone()))?;
        setter(io, value, raw).map_err(|e| self.access_error(e))
    }

    /// Field description
    pub fn doc(&self) -> &str {
        &self.descriptor.desc
    }

    fn access_error(&self, source: Error) -> Error {
        RegisterAccessError::Failed {
            field: self.descriptor.name.clone(),
            source: Box::new(source),
        }
        .into()
    }
}

impl std::fmt::Debug for CompiledField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledField")
            .field("descriptor", &self.descriptor)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Accessors for every field of a register map
#[derive(Debug, Default)]
pub struct FieldAccessors {
    tag: Option<String>,
    fields: Vec<CompiledField>,
    index: HashMap<String, usize>,
}

impl FieldAccessors {
    /// Compile accessors for all fields of `map`
    pub fn compile(map: &RegisterMap) -> Result<Self> {
        let mut accessors = Self {
            tag: map.tag.clone(),
            ..Default::default()
        };
        for descriptor in map.fields() {
            if accessors.index.contains_key(&descriptor.name) {
                return Err(FramingError::DuplicateField(descriptor.name.clone()).into());
            }
            accessors
                .index
                .insert(descriptor.name.clone(), accessors.fields.len());
            accessors.fields.push(CompiledField::compile(descriptor));
        }
        log::debug!("Compiled accessors for {} fields", accessors.fields.len());
        Ok(accessors)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledField> {
        self.fields.iter()
    }

    /// Look up a field by (case-insensitive) name
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.fields[i])
    }

    fn require(&self, name: &str) -> Result<&CompiledField> {
        self.field(name)
            .ok_or_else(|| RegisterAccessError::UnknownField(name.to_string()).into())
    }

    /// `get_<name>`: `Ok(None)` when the register read failed
    pub fn get(&self, io: &mut dyn RegisterIo, name: &str) -> Result<Option<u16>> {
        Ok(self.require(name)?.get(io))
    }

    /// `set_<name>`: read-modify-write, `Ok(false)` when an access failed
    pub fn set(&self, io: &mut dyn RegisterIo, name: &str, value: u16) -> Result<bool> {
        self.require(name)?.set(io, value, false)
    }

    /// `set_<name>` with `raw`: write without reading the register first
    pub fn set_raw(&self, io: &mut dyn RegisterIo, name: &str, value: u16) -> Result<bool> {
        self.require(name)?.set(io, value, true)
    }

    /// `doc_<name>`
    pub fn doc(&self, name: &str) -> Result<&str> {
        Ok(self.require(name)?.doc())
    }

    /// Names of all generated accessors (`get_*`, `set_*`, `doc_*`)
    pub fn accessor_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.fields.len() * 3);
        for field in &self.fields {
            names.push(format!("get_{}", field.name()));
            if field.is_writable() {
                names.push(format!("set_{}", field.name()));
            }
            names.push(format!("doc_{}", field.name()));
        }
        names
    }

    /// Resolve a generated accessor name such as `set_tx1_mode`
    pub fn lookup(&self, accessor: &str) -> Option<(AccessorKind, &CompiledField)> {
        [AccessorKind::Get, AccessorKind::Set, AccessorKind::Doc]
            .into_iter()
            .find_map(|kind| {
                let name = accessor.strip_prefix(kind.prefix())?;
                let field = self.field(name)?;
                if kind == AccessorKind::Set && !field.is_writable() {
                    return None;
                }
                Some((kind, field))
            })
    }

    fn wide_parts(&self, base: &str) -> Result<[&CompiledField; 3]> {
        Ok([
            self.require(&format!("{}_hi", base))?,
            self.require(&format!("{}_mi", base))?,
            self.require(&format!("{}_lo", base))?,
        ])
    }

    /// Read a 48-bit counter split over `<base>_hi`, `_mi` and `_lo`
    pub fn get_wide(&self, io: &mut dyn RegisterIo, base: &str) -> Result<Option<u64>> {
        let mut value = 0u64;
        for part in self.wide_parts(base)? {
            match part.get(io) {
                Some(v) => value = (value << 16) | u64::from(v),
                None => return Ok(None),
            }
        }
        Ok(Some(value))
    }

    /// Write a 48-bit value split over `<base>_hi`, `_mi` and `_lo`
    pub fn set_wide(&self, io: &mut dyn RegisterIo, base: &str, value: u64) -> Result<bool> {
        let parts = self.wide_parts(base)?;
        for (part, shift) in parts.into_iter().zip([32u32, 16, 0]) {
            if !part.set(io, ((value >> shift) & 0xFFFF) as u16, false)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
