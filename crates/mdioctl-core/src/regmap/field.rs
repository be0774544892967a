//! Field descriptors and bit ranges

use std::fmt;

/// Width of a PHY register in bits
pub const REGISTER_BITS: u8 = 16;

/// Registers per page in page/offset addressing
pub const PAGE_SIZE: u16 = 32;

/// Inclusive bit range `[high:low]` inside a 16-bit register
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BitRange {
    pub high: u8,
    pub low: u8,
}

impl BitRange {
    /// Create a range, `None` if `low > high` or `high` is past bit 15
    pub fn new(high: u8, low: u8) -> Option<Self> {
        if low > high || high >= REGISTER_BITS {
            return None;
        }
        Some(Self { high, low })
    }

    /// Single-bit range
    pub fn bit(bit: u8) -> Option<Self> {
        Self::new(bit, bit)
    }

    /// Parse `[x]` or `[x:y]`
    pub fn parse(s: &str) -> Option<Self> {
        let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
        match inner.split_once(':') {
            Some((high, low)) => Self::new(high.trim().parse().ok()?, low.trim().parse().ok()?),
            None => Self::bit(inner.trim().parse().ok()?),
        }
    }

    pub fn width(&self) -> u8 {
        self.high - self.low + 1
    }

    /// Mask with bits `low..=high` set
    pub fn mask(&self) -> u16 {
        (self.low..=self.high).fold(0u16, |mask, bit| mask | (1 << bit))
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.high == self.low {
            write!(f, "[{}]", self.high)
        } else {
            write!(f, "[{}:{}]", self.high, self.low)
        }
    }
}

/// One named bitfield of a paged register
///
/// Pure data: accessors are built from descriptors by
/// [`FieldAccessors::compile`](super::FieldAccessors::compile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Lowercase field name, unique within a map
    pub name: String,
    /// Logical register address, `page * 32 + offset`
    pub addr: u16,
    pub bits: BitRange,
    /// Mask of the field inside its register, never zero
    pub bitmask: u16,
    /// Index of the lowest bit of `bitmask`
    pub shift: u8,
    pub readonly: bool,
    pub default: u16,
    pub desc: String,
}

impl FieldDescriptor {
    /// Create a descriptor; the mask and shift are derived from `bits`
    pub fn new(name: &str, addr: u16, bits: BitRange) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            addr,
            bits,
            bitmask: bits.mask(),
            shift: bits.low,
            readonly: false,
            default: 0,
            desc: String::new(),
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn default_value(mut self, default: u16) -> Self {
        self.default = default;
        self
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.desc = desc.trim().to_string();
        self
    }

    /// Page holding the register (`addr >> 5`)
    pub fn page(&self) -> u16 {
        self.addr >> 5
    }

    /// Register offset inside the page (`addr & 0x1f`)
    pub fn offset(&self) -> u16 {
        self.addr & (PAGE_SIZE - 1)
    }

    pub fn width(&self) -> u8 {
        self.bits.width()
    }

    /// Largest value the field can hold
    pub fn max_value(&self) -> u16 {
        self.bitmask >> self.shift
    }

    /// Whether the field covers the whole register
    pub fn is_full_width(&self) -> bool {
        self.bitmask == 0xFFFF
    }

    /// Field value from a raw register value
    pub fn extract(&self, raw: u16) -> u16 {
        (raw & self.bitmask) >> self.shift
    }

    /// Replace the field bits of `raw` with `value`, truncated to the field
    pub fn insert(&self, raw: u16, value: u16) -> u16 {
        let bits = ((u32::from(value) << self.shift) as u16) & self.bitmask;
        (raw & !self.bitmask) | bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bit_ranges() {
        assert_eq!(BitRange::parse("[3]"), Some(BitRange { high: 3, low: 3 }));
        assert_eq!(BitRange::parse("[15:8]"), Some(BitRange { high: 15, low: 8 }));
        assert_eq!(BitRange::parse(" [ 7 : 4 ] "), Some(BitRange { high: 7, low: 4 }));
        assert_eq!(BitRange::parse("[4:7]"), None);
        assert_eq!(BitRange::parse("[16]"), None);
        assert_eq!(BitRange::parse("3"), None);
    }

    #[test]
    fn test_mask_and_shift_for_all_ranges() {
        for high in 0..16u8 {
            for low in 0..=high {
                let bits = BitRange::new(high, low).unwrap();
                let field = FieldDescriptor::new("f", 0, bits);
                assert_eq!(field.bitmask.count_ones() as u8, high - low + 1);
                assert_eq!(field.bitmask.trailing_zeros() as u8, low);
                assert_eq!(field.shift, low);
            }
        }
    }

    #[test]
    fn test_page_and_offset() {
        let field = FieldDescriptor::new("f", 0x245, BitRange::bit(0).unwrap());
        assert_eq!(field.page(), 0x12);
        assert_eq!(field.offset(), 0x05);
    }

    #[test]
    fn test_insert_truncates_to_mask() {
        let field = FieldDescriptor::new("f", 0, BitRange::new(11, 10).unwrap());
        assert_eq!(field.insert(0xFFFF, 0), 0xF3FF);
        assert_eq!(field.insert(0x0000, 0xFF), 0x0C00);
        assert_eq!(field.extract(0x0C00), 3);

        let top = FieldDescriptor::new("top", 0, BitRange::bit(15).unwrap());
        assert_eq!(top.insert(0, 0x3), 0x8000);
    }

    #[test]
    fn test_display() {
        assert_eq!(BitRange::new(7, 4).unwrap().to_string(), "[7:4]");
        assert_eq!(BitRange::bit(2).unwrap().to_string(), "[2]");
    }
}
