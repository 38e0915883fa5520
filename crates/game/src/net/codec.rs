//! Bit-level field codec.
//!
//! Fields are packed most-significant bit first into a byte buffer; the last
//! byte is zero-padded. The writer never fails: values wider than the field
//! keep only their low bits. The reader fails with [`CodecError::Truncated`]
//! instead of inventing a default when a field runs past the payload.

/// Width of the header in front of a variable-width integer.
pub const VAR_HEADER_BITS: u32 = 4;
/// Longest string the 16-bit length prefix can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("read of {wanted} bits at bit {position} runs past {available}-bit payload")]
    Truncated {
        wanted: u32,
        position: usize,
        available: usize,
    },
    #[error("field width {0} outside 1..=32")]
    InvalidWidth(u32),
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
    #[error("value {value} out of range for {field}")]
    OutOfRange { field: &'static str, value: u32 },
}

#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    fn push_bit(&mut self, bit: bool) {
        let byte = self.bit_len / 8;
        if byte == self.buf.len() {
            self.buf.push(0);
        }
        if bit {
            self.buf[byte] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Append the low `width` bits of `value`.
    pub fn write_bits(&mut self, value: u32, width: u32) {
        debug_assert!((1..=32).contains(&width), "bad field width {width}");
        for shift in (0..width.min(32)).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.push_bit(value);
    }

    /// Variable-width unsigned integer: a 4-bit header `h` followed by
    /// `2 * (h + 1)` value bits.
    pub fn write_var_u32(&mut self, value: u32) {
        let significant = 32 - value.leading_zeros();
        let pairs = significant.div_ceil(2).max(1);
        self.write_bits(pairs - 1, VAR_HEADER_BITS);
        self.write_bits(value, pairs * 2);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bits(value as u32, 32);
    }

    /// 16-bit byte length, then each byte as an 8-bit field. Strings longer
    /// than [`MAX_STRING_LEN`] are cut at the last char boundary that fits.
    pub fn write_string(&mut self, value: &str) {
        let mut end = value.len().min(MAX_STRING_LEN);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &value.as_bytes()[..end];
        self.write_bits(bytes.len() as u32, 16);
        for &b in bytes {
            self.write_bits(b as u32, 8);
        }
    }

    /// Continuation-flagged sequence: `true` before every element, `false`
    /// after the last one.
    pub fn write_list<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T)) {
        for item in items {
            self.write_bool(true);
            write(self, item);
        }
        self.write_bool(false);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.position
    }

    pub fn read_bits(&mut self, width: u32) -> Result<u32, CodecError> {
        if !(1..=32).contains(&width) {
            return Err(CodecError::InvalidWidth(width));
        }
        if width as usize > self.remaining_bits() {
            return Err(CodecError::Truncated {
                wanted: width,
                position: self.position,
                available: self.data.len() * 8,
            });
        }
        let mut value = 0u32;
        for _ in 0..width {
            let byte = self.data[self.position / 8];
            let bit = (byte >> (7 - self.position % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.position += 1;
        }
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_var_u32(&mut self) -> Result<u32, CodecError> {
        let pairs = self.read_bits(VAR_HEADER_BITS)? + 1;
        self.read_bits(pairs * 2)
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(self.read_bits(32)? as i32)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_bits(16)? as usize;
        if len * 8 > self.remaining_bits() {
            return Err(CodecError::Truncated {
                wanted: (len * 8) as u32,
                position: self.position,
                available: self.data.len() * 8,
            });
        }
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(self.read_bits(8)? as u8);
        }
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn read_list<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, CodecError>,
    ) -> Result<Vec<T>, CodecError> {
        let mut items = Vec::new();
        while self.read_bool()? {
            items.push(read(self)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_boundaries() {
        let mut w = BitWriter::new();
        for width in 1..=32u32 {
            let max = if width == 32 { u32::MAX } else { (1 << width) - 1 };
            w.write_bits(0, width);
            w.write_bits(max, width);
        }
        let bytes = w.into_bytes();

        let mut r = BitReader::new(&bytes);
        for width in 1..=32u32 {
            let max = if width == 32 { u32::MAX } else { (1 << width) - 1 };
            assert_eq!(r.read_bits(width).unwrap(), 0);
            assert_eq!(r.read_bits(width).unwrap(), max);
        }
    }

    #[test]
    fn test_msb_first_and_padding() {
        let mut w = BitWriter::new();
        w.write_bool(true);
        w.write_bits(0b01, 2);
        assert_eq!(w.bit_len(), 3);
        assert_eq!(w.into_bytes(), vec![0b1010_0000]);
    }

    #[test]
    fn test_var_u32_boundaries() {
        let values = [0u32, 1, 3, 4, 255, 256, 65_535, 1 << 30, u32::MAX];
        let mut w = BitWriter::new();
        for &v in &values {
            w.write_var_u32(v);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        for &v in &values {
            assert_eq!(r.read_var_u32().unwrap(), v);
        }
    }

    #[test]
    fn test_var_u32_small_values_are_compact() {
        let mut w = BitWriter::new();
        w.write_var_u32(3);
        assert_eq!(w.bit_len(), 6);

        let mut w = BitWriter::new();
        w.write_var_u32(u32::MAX);
        assert_eq!(w.bit_len(), 36);
    }

    #[test]
    fn test_signed_values() {
        let mut w = BitWriter::new();
        for v in [0, -1, i32::MIN, i32::MAX, -296] {
            w.write_i32(v);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        for v in [0, -1, i32::MIN, i32::MAX, -296] {
            assert_eq!(r.read_i32().unwrap(), v);
        }
    }

    #[test]
    fn test_strings() {
        let long = "x".repeat(MAX_STRING_LEN);
        let mut w = BitWriter::new();
        w.write_string("");
        w.write_string("Felbridge ✓");
        w.write_string(&long);
        let bytes = w.into_bytes();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.read_string().unwrap(), "Felbridge ✓");
        assert_eq!(r.read_string().unwrap(), long);
    }

    #[test]
    fn test_oversized_string_is_cut_on_char_boundary() {
        let value = "é".repeat(MAX_STRING_LEN);
        let mut w = BitWriter::new();
        w.write_string(&value);
        let bytes = w.into_bytes();
        let decoded = BitReader::new(&bytes).read_string().unwrap();
        assert!(decoded.len() <= MAX_STRING_LEN);
        assert!(decoded.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_list() {
        let items = vec![7u32, 0, 19];
        let mut w = BitWriter::new();
        w.write_list(&items, |w, v| w.write_bits(*v, 5));
        w.write_list::<u32>(&[], |w, v| w.write_bits(*v, 5));
        let bytes = w.into_bytes();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_list(|r| r.read_bits(5)).unwrap(), items);
        assert!(r.read_list(|r| r.read_bits(5)).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_reads_fail() {
        let mut r = BitReader::new(&[0xFF]);
        assert!(r.read_bits(8).is_ok());
        assert!(matches!(r.read_bool(), Err(CodecError::Truncated { .. })));

        let mut r = BitReader::new(&[]);
        assert!(matches!(r.read_var_u32(), Err(CodecError::Truncated { .. })));

        // Length prefix claims 5 bytes, only 1 present.
        let mut r = BitReader::new(&[0x00, 0x05, b'a']);
        assert!(matches!(r.read_string(), Err(CodecError::Truncated { .. })));

        // List never terminated.
        let mut r = BitReader::new(&[0xFF]);
        assert!(r.read_list(|r| r.read_bool()).is_err());
    }

    #[test]
    fn test_invalid_width() {
        let mut r = BitReader::new(&[0; 8]);
        assert_eq!(r.read_bits(0), Err(CodecError::InvalidWidth(0)));
        assert_eq!(r.read_bits(33), Err(CodecError::InvalidWidth(33)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut w = BitWriter::new();
        w.write_bits(1, 16);
        w.write_bits(0xFF, 8);
        let bytes = w.into_bytes();
        assert_eq!(
            BitReader::new(&bytes).read_string(),
            Err(CodecError::InvalidUtf8)
        );
    }
}
