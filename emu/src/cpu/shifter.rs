use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Shift applied to a second operand, from bits 5-6 of the instruction.
/// `RotatedImmediate` is the pseudo-kind used for the 8-bit immediate
/// operand form: a plain rotate with no rotate-through-carry special case.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
    RotatedImmediate,
}

impl From<u32> for ShiftKind {
    fn from(op: u32) -> Self {
        match op {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            3 => Self::Ror,
            _ => unreachable!("shift kind is a 2-bit field"),
        }
    }
}

/// Whether the shift amount came from an immediate field or a register.
/// A literal zero immediate amount is redefined by the architecture for
/// LSR/ASR (shift by 32) and ROR (rotate through carry); a register that
/// happens to hold zero leaves the operand and carry untouched instead.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum ShiftSource {
    Immediate,
    Register,
}

/// Shifted operand plus the shifter's carry-out. `carry` is `None` when the
/// shift leaves the carry flag unchanged.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct ShiftResult {
    pub value: u32,
    pub carry: Option<bool>,
}

/// The barrel shifter. Register-sourced amounts are used at their full
/// 32-bit width; only amounts 0 through 32 and "more than 32" behave
/// distinctly.
pub fn shift(
    kind: ShiftKind,
    amount: u32,
    value: u32,
    source: ShiftSource,
    carry_in: bool,
) -> ShiftResult {
    if amount == 0 {
        return match (kind, source) {
            // LSL #0 and any register-held zero amount: operand and carry
            // pass through untouched.
            (ShiftKind::Lsl | ShiftKind::RotatedImmediate, _)
            | (_, ShiftSource::Register) => ShiftResult {
                value,
                carry: None,
            },
            // LSR #0 / ASR #0 encode a shift by 32.
            (ShiftKind::Lsr | ShiftKind::Asr, ShiftSource::Immediate) => {
                shift(kind, 32, value, source, carry_in)
            }
            // ROR #0 encodes rotate-right through carry.
            (ShiftKind::Ror, ShiftSource::Immediate) => ShiftResult {
                value: (value >> 1) | (u32::from(carry_in) << 31),
                carry: Some(value.get_bit(0)),
            },
        };
    }

    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => ShiftResult {
                value: value << amount,
                carry: Some(value.get_bit(32 - amount as u8)),
            },
            32 => ShiftResult {
                value: 0,
                carry: Some(value.get_bit(0)),
            },
            _ => ShiftResult {
                value: 0,
                carry: Some(false),
            },
        },
        ShiftKind::Lsr => match amount {
            1..=31 => ShiftResult {
                value: value >> amount,
                carry: Some(value.get_bit(amount as u8 - 1)),
            },
            32 => ShiftResult {
                value: 0,
                carry: Some(value.get_bit(31)),
            },
            _ => ShiftResult {
                value: 0,
                carry: Some(false),
            },
        },
        ShiftKind::Asr => match amount {
            1..=31 => ShiftResult {
                value: ((value as i32) >> amount) as u32,
                carry: Some(value.get_bit(amount as u8 - 1)),
            },
            // ASR saturates to the sign bit for amounts of 32 and beyond.
            _ => {
                let sign = value.get_bit(31);
                ShiftResult {
                    value: if sign { u32::MAX } else { 0 },
                    carry: Some(sign),
                }
            }
        },
        ShiftKind::Ror | ShiftKind::RotatedImmediate => {
            let reduced = amount % 32;
            if reduced == 0 {
                ShiftResult {
                    value,
                    carry: Some(value.get_bit(31)),
                }
            } else {
                ShiftResult {
                    value: value.rotate_right(reduced),
                    carry: Some(value.get_bit(reduced as u8 - 1)),
                }
            }
        }
    }
}
