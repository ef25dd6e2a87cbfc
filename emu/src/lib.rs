//! ARM-state instruction execution core for a Game Boy Advance class CPU:
//! decoder, executors, mode-banked registers, the bus contract and the
//! memory-mapped I/O register accessors.

pub mod bitwise;
pub mod cpu;
pub mod memory;
