//! Bit fields inside an 8-bit register.
//!
//! Bit 7 is the most significant bit. A field is named by its highest bit
//! (`bit_start`) and counts `length` bits downwards from there, so bits
//! `bit_start ..= bit_start + 1 - length` belong to the field.

/// Mask and position of a field within a register byte
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    mask: u8,
    shift: u8,
}

impl Field {
    /// Returns `None` unless `bit_start <= 7` and `length <= bit_start + 1`.
    pub fn new(bit_start: u8, length: u8) -> Option<Self> {
        if bit_start > 7 || length > bit_start + 1 {
            return None;
        }
        let shift = bit_start + 1 - length;
        // u16 so a zero-length field above bit 7 stays well defined
        let mask = (((1u16 << length) - 1) << shift) as u8;
        Some(Self { mask, shift })
    }

    /// Single-bit field at `bit`
    pub fn bit(bit: u8) -> Option<Self> {
        Self::new(bit, 1)
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Replace the field bits of `byte` with `value`; bits of `value` that do
    /// not fit in the field are dropped.
    pub fn insert(&self, byte: u8, value: u8) -> u8 {
        let value = ((u16::from(value) << self.shift) as u8) & self.mask;
        (byte & !self.mask) | value
    }

    pub fn extract(&self, byte: u8) -> u8 {
        (u16::from(byte & self.mask) >> self.shift) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_count_down_from_bit_start() {
        let field = Field::new(4, 3).unwrap();
        assert_eq!(field.mask(), 0b0001_1100);
        assert_eq!(field.shift(), 2);

        assert_eq!(Field::new(7, 8).unwrap().mask(), 0xFF);
        assert_eq!(Field::bit(0).unwrap().mask(), 0x01);
        assert_eq!(Field::bit(7).unwrap().mask(), 0x80);
    }

    #[test]
    fn rejects_fields_that_run_past_bit_zero() {
        assert_eq!(Field::new(2, 4), None);
        assert_eq!(Field::new(8, 1), None);
        assert_eq!(Field::bit(8), None);
    }

    #[test]
    fn zero_length_field_is_empty() {
        let field = Field::new(7, 0).unwrap();
        assert_eq!(field.mask(), 0);
        assert_eq!(field.insert(0xA5, 0xFF), 0xA5);
        assert_eq!(field.extract(0xFF), 0);
    }

    #[test]
    fn insert_keeps_other_bits() {
        let field = Field::new(5, 2).unwrap();
        assert_eq!(field.insert(0b1111_1111, 0b01), 0b1101_1111);
        assert_eq!(field.insert(0b0000_0000, 0b10), 0b0010_0000);
        // oversized value is truncated to the field width
        assert_eq!(field.insert(0b0000_0000, 0b111), 0b0011_0000);
    }

    #[test]
    fn every_field_reads_back_what_was_inserted() {
        for bit_start in 0..8u8 {
            for length in 0..=bit_start + 1 {
                let field = Field::new(bit_start, length).unwrap();
                let max = ((1u16 << length) - 1) as u8;
                for value in [0, max, max / 2, 0x55 & max] {
                    for byte in [0x00u8, 0xFF, 0xA5] {
                        let written = field.insert(byte, value);
                        assert_eq!(field.extract(written), value);
                        assert_eq!(written & !field.mask(), byte & !field.mask());
                    }
                }
            }
        }
    }
}
