use std::any::Any;

use super::Capability;

/// Marker for direct `(phy, reg)` access that bypasses the page register
#[derive(Debug, Default)]
pub struct Raw;

impl Capability for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
