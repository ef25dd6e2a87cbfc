use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::CpuError;
use crate::cpu::condition::Condition;
use crate::cpu::cpu_modes::Mode;

/// Program status register (CPSR or a banked SPSR).
///
/// Layout: N/Z/C/V in bits 31-28, IRQ/FIQ disable in bits 7/6, the Thumb
/// state bit in bit 5 and the mode in bits 4-0.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

/// Active instruction set, selected by bit 5 of the CPSR.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum CpuState {
    Arm,
    Thumb,
}

impl From<bool> for CpuState {
    fn from(state_bit: bool) -> Self {
        if state_bit { Self::Thumb } else { Self::Arm }
    }
}

/// One atomic flag commit. `carry`/`overflow` left as `None` keep the
/// current flag value, mirroring instructions that do not define them.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct FlagsUpdate {
    pub sign: bool,
    pub zero: bool,
    pub carry: Option<bool>,
    pub overflow: Option<bool>,
}

impl Psr {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    pub fn state(self) -> CpuState {
        self.0.get_bit(5).into()
    }

    pub fn set_state(&mut self, state: CpuState) {
        self.0.set_bit(5, state == CpuState::Thumb);
    }

    /// Current privilege mode from bits 4-0.
    ///
    /// Panics on an encoding that names no mode: the CPSR is only ever
    /// written through this type or an MSR executor, so garbage mode bits
    /// mean privileged code wrote a value the real CPU would choke on too.
    pub fn mode(self) -> Mode {
        Mode::try_from(self.0.get_bits(0..=4))
            .unwrap_or_else(|raw| panic!("PSR holds invalid mode bits {raw:#07b}"))
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !0b11111) | u32::from(mode);
    }

    /// Evaluates a condition code against the current flags.
    ///
    /// `AL`/`NV` are rejected: the always case belongs to the dispatcher
    /// and 0xF is reserved for software-interrupt dispatch upstream.
    pub fn can_execute(self, condition: Condition) -> Result<bool, CpuError> {
        let (n, z) = (self.sign_flag(), self.zero_flag());
        let (c, v) = (self.carry_flag(), self.overflow_flag());
        match condition {
            Condition::EQ => Ok(z),
            Condition::NE => Ok(!z),
            Condition::CS => Ok(c),
            Condition::CC => Ok(!c),
            Condition::MI => Ok(n),
            Condition::PL => Ok(!n),
            Condition::VS => Ok(v),
            Condition::VC => Ok(!v),
            Condition::HI => Ok(c && !z),
            Condition::LS => Ok(!c || z),
            Condition::GE => Ok(n == v),
            Condition::LT => Ok(n != v),
            Condition::GT => Ok(!z && n == v),
            Condition::LE => Ok(z || n != v),
            Condition::AL | Condition::NV => {
                Err(CpuError::ReservedCondition(condition as u8))
            }
        }
    }

    /// Commits one [`FlagsUpdate`] atomically.
    pub fn set_flags(&mut self, update: FlagsUpdate) {
        self.set_sign_flag(update.sign);
        self.set_zero_flag(update.zero);
        if let Some(carry) = update.carry {
            self.set_carry_flag(carry);
        }
        if let Some(overflow) = update.overflow {
            self.set_overflow_flag(overflow);
        }
    }
}
