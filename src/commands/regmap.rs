//! Register map conversion commands

use super::{emit, CmdResult};
use mdioctl_core::regmap::{generate_code, generate_doc, RegisterMap};
use std::path::Path;

pub fn cmd_doc(map: &RegisterMap, output: Option<&Path>) -> CmdResult {
    emit(&generate_doc(map), output)
}

pub fn cmd_code(map: &RegisterMap, output: Option<&Path>) -> CmdResult {
    emit(&generate_code(map), output)
}

pub fn cmd_toml(map: &RegisterMap, output: Option<&Path>) -> CmdResult {
    match output {
        Some(path) => {
            map.to_toml_file(path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        None => emit(&map.to_toml_string(), None),
    }
}
