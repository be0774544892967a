//! TOML register map files
//!
//! Register maps can be exchanged as TOML:
//!
//! ```toml
//! [regmap]
//! tag = "stream-v2"
//!
//! [[field]]
//! name = "tx1_mode"
//! addr = 0x245
//! bits = "[11:10]"
//! default = 0x1
//! desc = "Mode select"
//!
//! [[field]]
//! name = "chip_ver"
//! addr = 0x001
//! bits = "[15:0]"
//! readonly = true
//! ```

use std::fs;
use std::path::Path;

use super::field::{BitRange, FieldDescriptor};
use super::RegisterMap;
use crate::error::{Error, FramingError, Result};

/// TOML register map file structure
#[derive(Debug, serde::Deserialize)]
struct TomlMapFile {
    regmap: Option<TomlMapMeta>,
    #[serde(default)]
    field: Vec<TomlField>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlMapMeta {
    tag: Option<String>,
}

/// Field definition in TOML
#[derive(Debug, serde::Deserialize)]
struct TomlField {
    name: String,
    #[serde(deserialize_with = "deserialize_hex_u16")]
    addr: u16,
    bits: String,
    #[serde(default, deserialize_with = "deserialize_hex_u16")]
    default: u16,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    desc: String,
}

/// Deserialize a u16 that can be hex (0x...) or decimal
fn deserialize_hex_u16<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u16),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u16, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

impl RegisterMap {
    /// Load a register map from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut map = Self::from_toml_str(&content)?;
        map.source = Some(path.display().to_string());
        Ok(map)
    }

    /// Parse a register map from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlMapFile = toml::from_str(content).map_err(|e| FramingError::MalformedRow {
            line: e.span().map(|s| line_of(content, s.start)).unwrap_or(0),
            message: e.message().to_string(),
        })?;

        let mut map = RegisterMap::new();
        map.tag = file.regmap.and_then(|meta| meta.tag);

        for field in file.field {
            let bits = BitRange::parse(&field.bits).ok_or_else(|| FramingError::MalformedRow {
                line: 0,
                message: format!("field '{}': invalid bit range '{}'", field.name, field.bits),
            })?;
            map.push(
                FieldDescriptor::new(&field.name, field.addr, bits)
                    .default_value(field.default)
                    .readonly(field.readonly)
                    .desc(&field.desc),
            )?;
        }

        Ok(map)
    }

    /// Save the register map to a TOML file
    pub fn to_toml_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml_string()).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Convert the register map to a TOML string
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();

        output.push_str("[regmap]\n");
        if let Some(tag) = &self.tag {
            output.push_str(&format!("tag = {}\n", quote(tag)));
        }
        output.push('\n');

        for field in self.fields() {
            output.push_str("[[field]]\n");
            output.push_str(&format!("name = {}\n", quote(&field.name)));
            output.push_str(&format!("addr = 0x{:03X}\n", field.addr));
            output.push_str(&format!("bits = \"{}\"\n", field.bits));
            if field.default != 0 {
                output.push_str(&format!("default = 0x{:X}\n", field.default));
            }
            if field.readonly {
                output.push_str("readonly = true\n");
            }
            if !field.desc.is_empty() {
                output.push_str(&format!("desc = {}\n", quote(&field.desc)));
            }
            output.push('\n');
        }

        output
    }
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[regmap]
tag = "stream-v2"

[[field]]
name = "TX1_Mode"
addr = 0x245
bits = "[11:10]"
default = "0x1"
desc = "Mode select"

[[field]]
name = "chip_ver"
addr = 1
bits = "[15:0]"
readonly = true
"#;
        let map = RegisterMap::from_toml_str(toml).unwrap();
        assert_eq!(map.tag.as_deref(), Some("stream-v2"));
        assert_eq!(map.len(), 2);

        let mode = map.get("tx1_mode").unwrap();
        assert_eq!(mode.bitmask, 0x0C00);
        assert_eq!(mode.default, 1);
        assert_eq!(mode.desc, "Mode select");
        assert!(map.get("chip_ver").unwrap().readonly);
    }

    #[test]
    fn test_export_and_reload() {
        let csv = "$ TAG: t\n,# addr = 0x245\n,[11:10],0x1,,tx1_mode,\"say \"\"hi\"\"\"\n,[15],0x0,RD,busy\n";
        let map = RegisterMap::from_csv_str(csv).unwrap();
        let text = map.to_toml_string();
        assert!(text.contains("bits = \"[11:10]\""));
        assert!(text.contains("readonly = true"));

        let reloaded = RegisterMap::from_toml_str(&text).unwrap();
        assert_eq!(reloaded.fields(), map.fields());
        assert_eq!(reloaded.tag, map.tag);
    }

    #[test]
    fn test_bad_bits() {
        let toml = "[[field]]\nname = \"x\"\naddr = 1\nbits = \"[1:2]\"\n";
        assert!(RegisterMap::from_toml_str(toml).is_err());
    }
}
