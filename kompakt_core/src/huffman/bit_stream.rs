//! MSB-first bit packing.

/// Packs bits into bytes, most significant bit first.
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    current: u8,
    bit_count: u8,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | u8::from(bit);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.buffer.push(self.current);
            self.current = 0;
            self.bit_count = 0;
        }
    }

    /// Append a sequence of bits.
    pub fn write_code(&mut self, bits: &[bool]) {
        for &bit in bits {
            self.write_bit(bit);
        }
    }

    /// Flush the partial byte (zero-padded on the right) and return the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.current <<= 8 - self.bit_count;
            self.buffer.push(self.current);
        }
        self.buffer
    }
}

/// Reads bits back in the order [`BitWriter`] wrote them.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_index: usize,
    bit_index: u8,
}

impl<'a> BitReader<'a> {
    /// Read from `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_index: 0,
            bit_index: 0,
        }
    }

    /// Next bit, or `None` once the data is exhausted.
    pub fn read_bit(&mut self) -> Option<bool> {
        let current = *self.data.get(self.byte_index)?;
        let bit = (current >> (7 - self.bit_index)) & 1 == 1;

        self.bit_index += 1;
        if self.bit_index == 8 {
            self.bit_index = 0;
            self.byte_index += 1;
        }
        Some(bit)
    }
}
