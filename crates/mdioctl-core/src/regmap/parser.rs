//! Tabular (CSV) register map parser
//!
//! The register map is a comma-separated table. Each row is one of:
//!
//! ```text
//! ,,,,                                  empty
//! #,free text                           comment
//! $ TAG: stream-v2                      tag (at most one per file)
//! ,# addr = 0x245                       header: register for following rows
//! ,[11:10],0x0,RD,tx1_mode,description  function: one field
//! ```
//!
//! A function row carries the bit range, default value (hex), an `RD`
//! marker for readonly fields, the field name and an optional description.
//! Rows of any other shape are skipped.

use super::field::{BitRange, FieldDescriptor};
use super::RegisterMap;
use crate::error::{FramingError, Result};

/// Column indices of a function row
const COL_TAG: usize = 0;
const COL_BITS: usize = 1;
const COL_DEFAULT: usize = 2;
const COL_FLAGS: usize = 3;
const COL_NAME: usize = 4;
const COL_DESC: usize = 5;

/// Marker in the flags column for readonly fields
const READONLY_MARKER: &str = "RD";

/// Classification of one table row
#[derive(Debug, Clone, PartialEq, Eq)]
enum Row {
    Empty,
    Comment,
    Tag(String),
    Header(u16),
    Function,
    Unknown,
}

/// Split CSV text into records of fields
///
/// Handles double-quoted fields with embedded commas, newlines and `""`
/// escapes. Each record carries the 1-based line number it starts on.
fn split_records(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => record.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' => {
                line += 1;
                if in_quotes {
                    field.push('\n');
                } else {
                    record.push(std::mem::take(&mut field));
                    records.push((record_line, std::mem::take(&mut record)));
                    record_line = line;
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }

    records
}

/// Find the first `0x`-prefixed hex number in a string
fn extract_hex(s: &str) -> Option<u16> {
    let start = s.find("0x").or_else(|| s.find("0X"))?;
    let digits: String = s[start + 2..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    u16::from_str_radix(&digits, 16).ok()
}

fn column(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

fn classify(row: &[String]) -> Row {
    if row.iter().all(|s| s.trim().is_empty()) {
        return Row::Empty;
    }

    let first = column(row, COL_TAG);
    if first.starts_with('#') {
        return Row::Comment;
    }
    if let Some(tag) = first.strip_prefix("$ TAG:") {
        return Row::Tag(tag.trim().to_string());
    }

    let bits = column(row, COL_BITS);
    if let Some(rest) = bits.strip_prefix('#') {
        let rest = rest.trim_start();
        if rest.starts_with("addr") && rest.contains('=') {
            return match extract_hex(rest) {
                Some(addr) => Row::Header(addr),
                None => Row::Unknown,
            };
        }
    }
    if bits.starts_with('[') && bits.ends_with(']') {
        return Row::Function;
    }

    Row::Unknown
}

fn parse_function(line: usize, addr: u16, row: &[String]) -> Result<FieldDescriptor> {
    let malformed = |message: String| FramingError::MalformedRow { line, message };

    let bits_str = column(row, COL_BITS);
    let bits = BitRange::parse(bits_str)
        .ok_or_else(|| malformed(format!("invalid bit range '{}'", bits_str)))?;

    let default_str = column(row, COL_DEFAULT);
    let default = if default_str.is_empty() {
        0
    } else {
        extract_hex(default_str)
            .ok_or_else(|| malformed(format!("invalid default value '{}'", default_str)))?
    };

    let name = column(row, COL_NAME);
    if name.is_empty() {
        return Err(malformed("missing field name".to_string()).into());
    }

    Ok(FieldDescriptor::new(name, addr, bits)
        .default_value(default)
        .readonly(column(row, COL_FLAGS) == READONLY_MARKER)
        .desc(column(row, COL_DESC)))
}

/// Parse a register map from CSV text
pub fn parse_csv(text: &str) -> Result<RegisterMap> {
    let mut map = RegisterMap::default();
    let mut addr: Option<u16> = None;

    for (line, row) in split_records(text) {
        match classify(&row) {
            Row::Empty | Row::Comment => {}
            Row::Tag(tag) => {
                if let Some(existing) = &map.tag {
                    return Err(FramingError::DuplicateTag {
                        line,
                        existing: existing.clone(),
                    }
                    .into());
                }
                map.tag = Some(tag);
            }
            Row::Header(a) => addr = Some(a),
            Row::Function => {
                let addr = addr.ok_or_else(|| FramingError::MalformedRow {
                    line,
                    message: "field row before any register header".to_string(),
                })?;
                map.push(parse_function(line, addr, &row)?)?;
            }
            Row::Unknown => log::debug!("Register map line {}: skipping unrecognized row", line),
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const MAP: &str = "\
$ TAG: stream-v2
#,transmit control
,# addr = 0x245,,,,
,[0],0x0,,tx1_enable,Enable TX path 1
,[11:10],0x1,,TX1_Mode,\"Mode select, see table\"
,,,,,
,# addr = 0x1,,,,
,[15:0],0x2211,RD,chip_ver,
";

    #[test]
    fn test_split_records_quotes() {
        let records = split_records("a,\"b,c\",\"d\"\"e\"\r\nf,\"g\nh\"\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, vec!["a", "b,c", "d\"e"]);
        assert_eq!(records[1].0, 2);
        assert_eq!(records[1].1, vec!["f", "g\nh"]);
    }

    #[test]
    fn test_parse_map() {
        let map = parse_csv(MAP).unwrap();
        assert_eq!(map.tag.as_deref(), Some("stream-v2"));
        assert_eq!(map.len(), 3);

        let mode = map.get("tx1_mode").unwrap();
        assert_eq!(mode.addr, 0x245);
        assert_eq!(mode.bitmask, 0x0C00);
        assert_eq!(mode.shift, 10);
        assert_eq!(mode.default, 1);
        assert_eq!(mode.desc, "Mode select, see table");
        assert!(!mode.readonly);

        let ver = map.get("chip_ver").unwrap();
        assert_eq!(ver.addr, 0x1);
        assert!(ver.readonly);
        assert!(ver.is_full_width());
    }

    #[test]
    fn test_duplicate_field_name() {
        let text = ",# addr = 0x10\n,[0],0x0,,en\n,[1],0x0,,EN\n";
        assert!(matches!(
            parse_csv(text),
            Err(Error::Framing(FramingError::DuplicateField(name))) if name == "en"
        ));
    }

    #[test]
    fn test_duplicate_tag() {
        let text = "$ TAG: a\n$ TAG: b\n";
        assert!(matches!(
            parse_csv(text),
            Err(Error::Framing(FramingError::DuplicateTag { line: 2, .. }))
        ));
    }

    #[test]
    fn test_field_before_header() {
        assert!(parse_csv(",[0],0x0,,en\n").is_err());
    }

    #[test]
    fn test_bad_bit_range() {
        let text = ",# addr = 0x10\n,[3:5],0x0,,en\n";
        assert!(matches!(
            parse_csv(text),
            Err(Error::Framing(FramingError::MalformedRow { line: 2, .. }))
        ));
    }
}
