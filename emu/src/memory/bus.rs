/// Memory seen from the CPU core.
///
/// The core does no bounds checking, alignment enforcement or device
/// dispatch; it only pre-masks and pre-rotates misaligned accesses where
/// the hardware does. Reads take `&mut self` because device-backed
/// addresses may have side effects.
pub trait Bus {
    fn read_byte(&mut self, address: u32) -> u8;
    fn write_byte(&mut self, address: u32, value: u8);

    fn read_half_word(&mut self, address: u32) -> u16 {
        let low = self.read_byte(address);
        let high = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    fn write_half_word(&mut self, address: u32, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(address, low);
        self.write_byte(address.wrapping_add(1), high);
    }

    fn read_word(&mut self, address: u32) -> u32 {
        let low = self.read_half_word(address);
        let high = self.read_half_word(address.wrapping_add(2));
        u32::from(low) | (u32::from(high) << 16)
    }

    fn write_word(&mut self, address: u32, value: u32) {
        self.write_half_word(address, value as u16);
        self.write_half_word(address.wrapping_add(2), (value >> 16) as u16);
    }
}

/// Flat little-endian RAM that mirrors across the address space, the
/// simplest bus and the one the execution tests run against.
pub struct LinearRam {
    data: Vec<u8>,
}

impl LinearRam {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "RAM cannot be empty");
        Self {
            data: vec![0; size],
        }
    }

    fn index(&self, address: u32) -> usize {
        address as usize % self.data.len()
    }
}

impl Default for LinearRam {
    fn default() -> Self {
        Self::new(0x1_0000)
    }
}

impl Bus for LinearRam {
    fn read_byte(&mut self, address: u32) -> u8 {
        self.data[self.index(address)]
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        let index = self.index(address);
        self.data[index] = value;
    }
}
