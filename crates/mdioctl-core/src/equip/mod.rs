//! Capability composition
//!
//! A capability is a named bundle of operations (paged MDIO access, raw
//! passthrough, register fields, firmware loading). Capabilities are
//! described in a [`CapabilityRegistry`] together with their dependencies,
//! and [`CapabilityRegistry::equip`] composes a requested set into one
//! [`Equipment`] bound to a single [`Driver`].
//!
//! Exactly one capability in a composition owns the driver. When none of
//! the resolved capabilities does, a bare [`DriverHandle`] is added; two or
//! more is an error.

mod equipment;
mod fields;
mod mdio;
mod raw;
mod sram;

pub use equipment::Equipment;
pub use fields::RegFields;
pub use mdio::{DriverHandle, Mdio, DEFAULT_PHY, REG_PAGE};
pub use raw::Raw;
pub use sram::SramLoader;

use std::any::Any;
use std::collections::HashMap;

use crate::driver::Driver;
use crate::error::{FramingError, Result};
use crate::firmware::FirmwareVariant;
use crate::regmap::RegisterMap;

/// A composable unit of behaviour
pub trait Capability: Any {
    /// Registered name
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A capability that holds the driver handle
pub trait DriverOwner: Capability {
    fn driver(&self) -> &Driver;

    fn driver_mut(&mut self) -> &mut Driver;
}

/// Inputs capabilities may need at construction time
#[derive(Debug, Default)]
pub struct EquipContext {
    /// Register map for `reg_fields`
    pub register_map: Option<RegisterMap>,
    /// Initial phy address for `mdio`
    pub phy: Option<u8>,
}

/// How a capability is instantiated
#[derive(Clone, Copy)]
pub enum Constructor {
    /// Takes ownership of the driver
    Owner(fn(Driver, &EquipContext) -> Box<dyn DriverOwner>),
    /// Works through the owner
    Plain(fn(&EquipContext) -> Result<Box<dyn Capability>>),
}

impl Constructor {
    pub fn owns_driver(&self) -> bool {
        matches!(self, Constructor::Owner(_))
    }
}

/// Registry entry for a capability
#[derive(Clone)]
pub struct CapabilityDescriptor {
    /// Lowercased name
    pub name: String,
    /// Names of capabilities this one needs
    pub deps: Vec<String>,
    /// Capabilities sharing a group cannot be combined
    pub group: Option<&'static str>,
    pub constructor: Constructor,
}

impl CapabilityDescriptor {
    pub fn new(name: &str, deps: &[&str], constructor: Constructor) -> Self {
        Self {
            name: name.to_lowercase(),
            deps: deps.iter().map(|d| d.to_lowercase()).collect(),
            group: None,
            constructor,
        }
    }

    pub fn exclusive(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }
}

impl std::fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("group", &self.group)
            .field("owns_driver", &self.constructor.owns_driver())
            .finish()
    }
}

fn new_mdio(driver: Driver, ctx: &EquipContext) -> Box<dyn DriverOwner> {
    Box::new(Mdio::with_phy(driver, ctx.phy.unwrap_or(DEFAULT_PHY)))
}

fn new_raw(_ctx: &EquipContext) -> Result<Box<dyn Capability>> {
    Ok(Box::new(Raw))
}

fn new_reg_fields(ctx: &EquipContext) -> Result<Box<dyn Capability>> {
    let map = ctx
        .register_map
        .as_ref()
        .ok_or_else(|| FramingError::MissingInput {
            capability: "reg_fields".to_string(),
            what: "a register map",
        })?;
    Ok(Box::new(RegFields::new(map)?))
}

fn new_sram_loader(_ctx: &EquipContext) -> Result<Box<dyn Capability>> {
    Ok(Box::new(SramLoader::new(FirmwareVariant::Block)))
}

fn new_sram_loader_tiny(_ctx: &EquipContext) -> Result<Box<dyn Capability>> {
    Ok(Box::new(SramLoader::new(FirmwareVariant::Paired)))
}

/// Named capability descriptors
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in capabilities
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtin = [
            CapabilityDescriptor::new("mdio", &[], Constructor::Owner(new_mdio)),
            CapabilityDescriptor::new("raw", &["mdio"], Constructor::Plain(new_raw)),
            CapabilityDescriptor::new("reg_fields", &["mdio"], Constructor::Plain(new_reg_fields)),
            CapabilityDescriptor::new("sram-loader", &["mdio"], Constructor::Plain(new_sram_loader))
                .exclusive("sram"),
            CapabilityDescriptor::new(
                "sram-loader-tiny",
                &["mdio"],
                Constructor::Plain(new_sram_loader_tiny),
            )
            .exclusive("sram"),
        ];
        for descriptor in builtin {
            if let Err(e) = registry.register(descriptor) {
                log::warn!("{}", e);
            }
        }
        registry
    }

    /// Add a capability; names are unique (case-insensitive)
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(FramingError::DuplicateCapability(descriptor.name).into());
        }
        self.index
            .insert(descriptor.name.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Registered names in registration order
    pub fn list(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.descriptors[i])
    }

    /// Dependency closure of `names`, dependencies first
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<&CapabilityDescriptor>> {
        let mut order = Vec::new();
        let mut stack = Vec::new();
        for name in names {
            self.visit(name, &mut order, &mut stack)?;
        }

        let resolved: Vec<&CapabilityDescriptor> =
            order.into_iter().map(|i| &self.descriptors[i]).collect();

        for (i, a) in resolved.iter().enumerate() {
            for b in &resolved[i + 1..] {
                if a.group.is_some() && a.group == b.group {
                    return Err(FramingError::ConflictingCapabilities {
                        first: a.name.clone(),
                        second: b.name.clone(),
                    }
                    .into());
                }
            }
        }

        Ok(resolved)
    }

    fn visit(&self, name: &str, order: &mut Vec<usize>, stack: &mut Vec<usize>) -> Result<()> {
        let key = name.to_lowercase();
        let &index = self
            .index
            .get(&key)
            .ok_or_else(|| FramingError::UnknownCapability(key.clone()))?;

        if order.contains(&index) {
            return Ok(());
        }
        if stack.contains(&index) {
            return Err(FramingError::DependencyCycle(key).into());
        }

        stack.push(index);
        for dep in &self.descriptors[index].deps {
            self.visit(dep, order, stack)?;
        }
        stack.pop();
        order.push(index);
        Ok(())
    }

    /// Compose `names` (plus dependencies) into an [`Equipment`] bound to `driver`
    ///
    /// All validation happens before the driver is touched, so a failed
    /// composition performs no I/O.
    pub fn equip(&self, driver: Driver, names: &[&str], ctx: &EquipContext) -> Result<Equipment> {
        let resolved = self.resolve(names)?;

        let owners: Vec<&CapabilityDescriptor> = resolved
            .iter()
            .copied()
            .filter(|d| d.constructor.owns_driver())
            .collect();
        if owners.len() > 1 {
            return Err(FramingError::MultipleDriverOwners(
                owners.iter().map(|d| d.name.clone()).collect(),
            )
            .into());
        }

        let mut caps = Vec::new();
        for descriptor in &resolved {
            if let Constructor::Plain(ctor) = descriptor.constructor {
                caps.push(ctor(ctx)?);
            }
        }

        let owner = match owners.first().map(|d| d.constructor) {
            Some(Constructor::Owner(ctor)) => ctor(driver, ctx),
            _ => {
                log::debug!("No driver-owning capability requested, adding default");
                Box::new(DriverHandle::new(driver)) as Box<dyn DriverOwner>
            }
        };

        let names = resolved.iter().map(|d| d.name.clone()).collect();
        Ok(Equipment::new(owner, caps, names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryBus;
    use crate::error::Error;

    fn driver() -> Driver {
        Driver::new(Box::new(MemoryBus::default()))
    }

    fn new_handle(driver: Driver, _ctx: &EquipContext) -> Box<dyn DriverOwner> {
        Box::new(DriverHandle::new(driver))
    }

    #[test]
    fn test_resolve_closure() {
        let registry = CapabilityRegistry::with_defaults();
        let names: Vec<&str> = registry
            .resolve(&["RAW", "sram-loader"])
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["mdio", "raw", "sram-loader"]);
    }

    #[test]
    fn test_defaults_are_all_registered() {
        let registry = CapabilityRegistry::with_defaults();
        assert_eq!(
            registry.list(),
            vec!["mdio", "raw", "reg_fields", "sram-loader", "sram-loader-tiny"]
        );
    }

    #[test]
    fn test_duplicate_capability() {
        let mut registry = CapabilityRegistry::with_defaults();
        let err = registry
            .register(CapabilityDescriptor::new("Raw", &[], Constructor::Plain(new_raw)))
            .unwrap_err();
        assert!(matches!(err, Error::Framing(FramingError::DuplicateCapability(_))));
    }

    #[test]
    fn test_unknown_capability() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(matches!(
            registry.equip(driver(), &["jtag"], &EquipContext::default()),
            Err(Error::Framing(FramingError::UnknownCapability(_)))
        ));
    }

    #[test]
    fn test_dependency_cycle() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(CapabilityDescriptor::new("a", &["b"], Constructor::Plain(new_raw)))
            .unwrap();
        registry
            .register(CapabilityDescriptor::new("b", &["a"], Constructor::Plain(new_raw)))
            .unwrap();
        assert!(matches!(
            registry.resolve(&["a"]),
            Err(Error::Framing(FramingError::DependencyCycle(_)))
        ));
    }

    #[test]
    fn test_two_owners_rejected() {
        let mut registry = CapabilityRegistry::with_defaults();
        registry
            .register(CapabilityDescriptor::new("handle", &[], Constructor::Owner(new_handle)))
            .unwrap();
        let err = registry
            .equip(driver(), &["raw", "handle"], &EquipContext::default())
            .unwrap_err();
        match err {
            Error::Framing(FramingError::MultipleDriverOwners(names)) => {
                assert_eq!(names, vec!["mdio".to_string(), "handle".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_default_owner_added() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(CapabilityDescriptor::new("raw", &[], Constructor::Plain(new_raw)))
            .unwrap();
        let mut equipment = registry
            .equip(driver(), &["raw"], &EquipContext::default())
            .unwrap();
        assert_eq!(equipment.owner_name(), "driver");

        equipment.open().unwrap();
        equipment.raw_write(2, 3, 0x44).unwrap();
        assert_eq!(equipment.raw_read(2, 3).unwrap(), 0x44);
        assert!(matches!(
            equipment.read(3, None),
            Err(Error::Framing(FramingError::NotEquipped("mdio")))
        ));
    }

    #[test]
    fn test_loader_variants_exclusive() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(matches!(
            registry.equip(
                driver(),
                &["sram-loader", "sram-loader-tiny"],
                &EquipContext::default()
            ),
            Err(Error::Framing(FramingError::ConflictingCapabilities { .. }))
        ));
    }

    #[test]
    fn test_reg_fields_needs_map() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(matches!(
            registry.equip(driver(), &["reg_fields"], &EquipContext::default()),
            Err(Error::Framing(FramingError::MissingInput { .. }))
        ));
    }
}
