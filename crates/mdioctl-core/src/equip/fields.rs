use std::any::Any;

use super::Capability;
use crate::error::Result;
use crate::regmap::{FieldAccessors, RegisterMap};

/// Compiled register field accessors
pub struct RegFields {
    accessors: FieldAccessors,
}

impl RegFields {
    pub fn new(map: &RegisterMap) -> Result<Self> {
        Ok(Self {
            accessors: FieldAccessors::compile(map)?,
        })
    }

    pub fn accessors(&self) -> &FieldAccessors {
        &self.accessors
    }
}

impl Capability for RegFields {
    fn name(&self) -> &'static str {
        "reg_fields"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
