use std::ops::RangeInclusive;

/// Bit manipulation helpers shared by the decoder, the executors and the
/// I/O register file. Bit indices count from the least significant bit.
pub trait Bits: Copy {
    /// Number of bits in the implementing type.
    const WIDTH: u8;

    fn get_bit(self, index: u8) -> bool;
    fn set_bit(&mut self, index: u8, value: bool);

    /// Extracts the inclusive bit range right-aligned to bit 0.
    fn get_bits(self, range: RangeInclusive<u8>) -> Self;

    fn get_byte(self, nth: u8) -> u8;
    fn set_byte(&mut self, nth: u8, value: u8);

    /// Sign-extends the low `bits` bits over the full width of the type.
    fn sign_extended(self, bits: u8) -> Self;
}

macro_rules! impl_bits {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {$(
        impl Bits for $unsigned {
            const WIDTH: u8 = <$unsigned>::BITS as u8;

            fn get_bit(self, index: u8) -> bool {
                debug_assert!(index < Self::WIDTH);
                (self >> index) & 1 != 0
            }

            fn set_bit(&mut self, index: u8, value: bool) {
                debug_assert!(index < Self::WIDTH);
                let mask = 1 << index;
                if value {
                    *self |= mask;
                } else {
                    *self &= !mask;
                }
            }

            fn get_bits(self, range: RangeInclusive<u8>) -> Self {
                let (start, end) = (*range.start(), *range.end());
                debug_assert!(start <= end && end < Self::WIDTH);
                let shifted = self >> start;
                let width = end - start + 1;
                if width == Self::WIDTH {
                    shifted
                } else {
                    shifted & ((1 << width) - 1)
                }
            }

            fn get_byte(self, nth: u8) -> u8 {
                debug_assert!(nth < Self::WIDTH / 8);
                (self >> (nth * 8)) as u8
            }

            fn set_byte(&mut self, nth: u8, value: u8) {
                debug_assert!(nth < Self::WIDTH / 8);
                let shift = nth * 8;
                *self = (*self & !((0xFF as $unsigned) << shift))
                    | ((value as $unsigned) << shift);
            }

            fn sign_extended(self, bits: u8) -> Self {
                debug_assert!(0 < bits && bits <= Self::WIDTH);
                let unused = Self::WIDTH - bits;
                (((self << unused) as $signed) >> unused) as $unsigned
            }
        }
    )*};
}

impl_bits!(u8 => i8, u16 => i16, u32 => i32, u64 => i64);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    #[test]
    fn get_bit() {
        let b = 0b1011_0011_1110_u32;
        assert!(b.get_bit(1));
        assert!(!b.get_bit(0));
        assert!(b.get_bit(11));
        assert!(!b.get_bit(31));
    }

    #[test]
    fn set_bit() {
        let mut b = 0b1100110_u32;
        b.set_bit(0, true);
        b.set_bit(1, true);
        b.set_bit(2, false);
        b.set_bit(3, false);
        assert_eq!(b, 0b1100011);
    }

    #[test]
    fn set_then_clear_every_bit() {
        let original: u32 = rand::rng().random();
        let mut value = original;
        for i in 0..32 {
            value.set_bit(i, true);
        }
        assert_eq!(value, u32::MAX);
        for i in 0..32 {
            value.set_bit(i, original.get_bit(i));
        }
        assert_eq!(value, original);
    }

    #[test]
    fn get_bits() {
        let b = 0b10_1100_1110_u32;
        assert_eq!(b.get_bits(0..=3), 0b1110);
        assert_eq!(b.get_bits(1..=1), 0b1);
        assert_eq!(b.get_bits(4..=7), 0b1100);
        assert_eq!(b.get_bits(8..=9), 0b10);
        assert_eq!(b.get_bits(0..=31), 0b10_1100_1110);
        assert_eq!(b.get_bits(28..=31), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn get_bits_inverted_range() {
        let b = 0_u32;
        b.get_bits(4..=2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn get_bit_out_of_range() {
        let b = 0_u32;
        b.get_bit(32);
    }

    #[test]
    fn bytes() {
        let mut b: u32 = 0x0122_0448;
        assert_eq!(b.get_byte(0), 0x48);
        assert_eq!(b.get_byte(1), 0x04);
        assert_eq!(b.get_byte(2), 0x22);
        assert_eq!(b.get_byte(3), 0x01);

        b.set_byte(1, 0xAA);
        assert_eq!(b, 0x0122_AA48);
        b.set_byte(3, 0x00);
        assert_eq!(b, 0x0022_AA48);
    }

    #[test]
    fn sign_extended() {
        let a: u32 = 0b1001; // -7 in i4
        assert_eq!(a.sign_extended(4) as i32, -7);
        assert_eq!(0b0111_u32.sign_extended(4), 0b0111);
        assert_eq!(0x00FF_FFFE_u32.sign_extended(24), 0xFFFF_FFFE);
        assert_eq!(u32::MAX.sign_extended(32), u32::MAX);
    }
}
