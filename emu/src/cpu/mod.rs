pub mod arm;
pub mod arm7tdmi;
pub mod condition;
pub mod cpu_modes;
pub mod flags;
pub mod psr;
pub mod registers;
pub mod shifter;

use thiserror::Error;

use crate::cpu::cpu_modes::Mode;

/// Failures raised by the decode/execute core.
///
/// Every variant is a synchronous, fatal condition: either the instruction
/// stream is unsupported or the caller broke a contract. The core never
/// retries or recovers; the surrounding loop decides what to do.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum CpuError {
    /// The instruction word matches no known encoding pattern.
    #[error("unknown instruction: {0:#010X}")]
    UnknownInstruction(u32),

    /// Condition code 0xE or 0xF reached the evaluator. The dispatcher
    /// handles the always case itself; these codes are reserved upstream.
    #[error("reserved condition code {0:#X} reached the evaluator")]
    ReservedCondition(u8),

    /// SPSR access in a mode that has no banked SPSR (User/System).
    #[error("no SPSR is banked for {0:?} mode")]
    NoSpsr(Mode),

    /// Dispatch index outside [0, 78]. Unreachable from `decode`, kept as a
    /// defensive check for index-driven callers.
    #[error("opcode index {0} is outside the dispatch table")]
    UnknownOpcodeIndex(u8),
}
