//! Register map documentation and code generators

use super::field::FieldDescriptor;
use super::RegisterMap;

fn title(map: &RegisterMap) -> String {
    map.tag.clone().unwrap_or_else(|| "untagged".to_string())
}

fn field_doc(field: &FieldDescriptor) -> String {
    let mut doc = format!(
        "### `{}`\n\naddr: 0x{:03x} (page 0x{:02x}, offset 0x{:02x}), bits: {}, shift: {}, bitmask: 0x{:04x}  \nreadonly: {}, default: 0x{:x}\n",
        field.name,
        field.addr,
        field.page(),
        field.offset(),
        field.bits,
        field.shift,
        field.bitmask,
        field.readonly,
        field.default
    );
    if !field.desc.is_empty() {
        doc.push('\n');
        doc.push_str(&field.desc);
        doc.push('\n');
    }
    doc
}

/// Render markdown documentation for every field of a map
pub fn generate_doc(map: &RegisterMap) -> String {
    let mut out = format!("# Register map: {}\n\n", title(map));
    if let Some(source) = &map.source {
        out.push_str(&format!("Source: `{}`\n\n", source));
    }

    out.push_str("## Function list\n\n");
    out.push_str("- `get_<field>`: read a field\n");
    out.push_str("- `set_<field>`: write a field, preserving the other register bits\n");
    out.push_str("- `doc_<field>`: field description\n\n");

    out.push_str("## Register list\n");
    for field in map.fields() {
        out.push('\n');
        out.push_str(&field_doc(field));
    }

    out.replace("\r\n", "\n")
}

fn doc_comment(desc: &str) -> String {
    desc.lines()
        .map(|line| format!("/// {}\n", line).replace("/// \n", "///\n"))
        .collect()
}

/// Render a Rust module with one accessor function per field
///
/// The generated functions run against
/// `mdioctl_core::regmap::RegisterIo` and mirror the compiled accessors.
pub fn generate_code(map: &RegisterMap) -> String {
    let mut out = format!("//! Register accessors for `{}`\n", title(map));
    if let Some(source) = &map.source {
        out.push_str(&format!("//!\n//! Generated by mdioctl from `{}`.\n", source));
    }
    out.push_str("\n#![allow(dead_code)]\n\n");
    out.push_str("use mdioctl_core::regmap::RegisterIo;\n");
    out.push_str("use mdioctl_core::Result;\n");

    for field in map.fields() {
        let (page, reg) = (field.page(), field.offset());
        let docs = doc_comment(&field.desc);

        out.push('\n');
        out.push_str(&docs);
        out.push_str(&format!(
            "pub fn get_{}(io: &mut dyn RegisterIo) -> Result<u16> {{\n    let raw = io.read_paged(0x{:02x}, 0x{:02x})?;\n    Ok((raw & 0x{:04x}) >> {})\n}}\n",
            field.name, page, reg, field.bitmask, field.shift
        ));

        if field.readonly {
            continue;
        }

        out.push('\n');
        out.push_str(&docs);
        if field.is_full_width() {
            out.push_str(&format!(
                "pub fn set_{}(io: &mut dyn RegisterIo, value: u16) -> Result<()> {{\n    io.write_paged(0x{:02x}, 0x{:02x}, value)\n}}\n",
                field.name, page, reg
            ));
        } else {
            out.push_str(&format!(
                "pub fn set_{}(io: &mut dyn RegisterIo, value: u16) -> Result<()> {{\n    let raw = io.read_paged(0x{:02x}, 0x{:02x})?;\n    let bits = (u32::from(value) << {}) as u16 & 0x{:04x};\n    io.write_paged(0x{:02x}, 0x{:02x}, (raw & !0x{:04x}) | bits)\n}}\n",
                field.name, page, reg, field.shift, field.bitmask, page, reg, field.bitmask
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> RegisterMap {
        RegisterMap::from_csv_str(
            "$ TAG: demo\n,# addr = 0x245\n,[11:10],0x1,,tx1_mode,Mode select\n,# addr = 0x1\n,[15:0],0x0,RD,chip_ver,\n,# addr = 0x2\n,[15:0],0x0,,scratch,\n",
        )
        .unwrap()
    }

    #[test]
    fn test_generate_doc() {
        let doc = generate_doc(&map());
        assert!(doc.starts_with("# Register map: demo"));
        assert!(doc.contains("### `tx1_mode`"));
        assert!(doc.contains("shift: 10, bitmask: 0x0c00"));
        assert!(doc.contains("Mode select"));
    }

    #[test]
    fn test_generate_code() {
        let code = generate_code(&map());
        assert!(code.contains("/// Mode select\npub fn get_tx1_mode("));
        assert!(code.contains("io.read_paged(0x12, 0x05)"));
        assert!(code.contains("pub fn set_tx1_mode("));
        assert!(code.contains("pub fn get_chip_ver("));
        assert!(!code.contains("pub fn set_chip_ver("));
        assert!(code.contains("    io.write_paged(0x00, 0x02, value)\n"));
    }
}
