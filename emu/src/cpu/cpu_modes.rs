use serde::{Deserialize, Serialize};

/// Processor privilege modes, with their raw 5-bit CPSR encodings.
///
/// The mode selects which physical bank a banked register name resolves to
/// (see [`crate::cpu::registers::RegisterFile`]).
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum Mode {
    /// The normal program execution state. Unprivileged: no SPSR, and
    /// status-register control fields cannot be written.
    User = 0b10000,

    /// Fast interrupt. Banks R8-R14 and the SPSR.
    Fiq = 0b10001,

    /// General-purpose interrupt handling. Banks R13-R14 and the SPSR.
    Irq = 0b10010,

    /// Protected mode for software interrupts.
    Supervisor = 0b10011,

    /// Entered after a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when an undefined instruction is executed.
    Undefined = 0b11011,

    /// Privileged variant of User; shares all of User's banks (no SPSR).
    System = 0b11111,
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = u32;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(n),
        }
    }
}
