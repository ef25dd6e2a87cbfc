use serde::{Deserialize, Serialize};

use crate::cpu::CpuError;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;

pub const REG_SP: usize = 13;
pub const REG_LR: usize = 14;
pub const REG_PROGRAM_COUNTER: usize = 15;
pub const REG_CPSR: usize = 16;
pub const REG_SPSR: usize = 17;

/// Bank column per slot. Column 0 is the User/System set, then one column
/// per exception mode that banks the slot.
const COLUMN_USER: usize = 0;
const COLUMN_FIQ: usize = 1;
const COLUMN_IRQ: usize = 2;
const COLUMN_SVC: usize = 3;
const COLUMN_ABT: usize = 4;
const COLUMN_UND: usize = 5;

const BANKS: usize = 6;
const SLOTS: usize = 18;
const MODES: usize = 7;

/// No banked cell here; only reachable for the SPSR slot in User/System.
const NONE: i8 = -1;

/// `COLUMN_FOR[mode][slot]` resolves a register slot to its bank column for
/// one mode. Slots 0-15 are R0-R15, 16 the CPSR, 17 the SPSR. R15 and the
/// CPSR are never banked; FIQ banks R8-R14, the other exception modes bank
/// R13-R14, and every exception mode has its own SPSR.
#[rustfmt::skip]
const COLUMN_FOR: [[i8; SLOTS]; MODES] = [
    // User
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, NONE],
    // Fiq
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 0, 1],
    // Irq
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 0, 0, 2],
    // Supervisor
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 3, 0, 0, 3],
    // Abort
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 4, 0, 0, 4],
    // Undefined
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 5, 0, 0, 5],
    // System
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, NONE],
];

const fn mode_row(mode: Mode) -> usize {
    match mode {
        Mode::User => 0,
        Mode::Fiq => 1,
        Mode::Irq => 2,
        Mode::Supervisor => 3,
        Mode::Abort => 4,
        Mode::Undefined => 5,
        Mode::System => 6,
    }
}

/// The full banked register set: 18 slots by 6 bank columns, addressed
/// through the column table so every access goes straight to the right
/// physical cell without copying on mode switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    cells: [[u32; BANKS]; SLOTS],
}

impl Default for RegisterFile {
    fn default() -> Self {
        let mut cells = [[0; BANKS]; SLOTS];
        cells[REG_CPSR][COLUMN_USER] = u32::from(Mode::System);
        Self { cells }
    }
}

impl RegisterFile {
    fn column(mode: Mode, slot: usize) -> i8 {
        COLUMN_FOR[mode_row(mode)][slot]
    }

    /// Reads R0-R15 as seen from `mode`.
    pub fn register_at(&self, mode: Mode, index: usize) -> u32 {
        assert!(
            index <= REG_PROGRAM_COUNTER,
            "not a general register: {index}"
        );
        // Columns for R0-R15 are always valid.
        self.cells[index][Self::column(mode, index) as usize]
    }

    pub fn set_register_at(&mut self, mode: Mode, index: usize, value: u32) {
        assert!(
            index <= REG_PROGRAM_COUNTER,
            "not a general register: {index}"
        );
        self.cells[index][Self::column(mode, index) as usize] = value;
    }

    /// R15 is unbanked, so it needs no mode.
    pub fn program_counter(&self) -> u32 {
        self.cells[REG_PROGRAM_COUNTER][COLUMN_USER]
    }

    pub fn set_program_counter(&mut self, value: u32) {
        self.cells[REG_PROGRAM_COUNTER][COLUMN_USER] = value;
    }

    pub fn cpsr(&self) -> Psr {
        Psr::new(self.cells[REG_CPSR][COLUMN_USER])
    }

    pub fn set_cpsr(&mut self, psr: Psr) {
        self.cells[REG_CPSR][COLUMN_USER] = psr.raw();
    }

    /// Reads the CPSR or the SPSR banked for `mode`. User and System have
    /// no SPSR, which is a hard failure rather than a silent CPSR alias.
    pub fn psr(&self, mode: Mode, slot: usize) -> Result<Psr, CpuError> {
        assert!(
            slot == REG_CPSR || slot == REG_SPSR,
            "not a status register slot: {slot}"
        );
        let column = Self::column(mode, slot);
        if column == NONE {
            return Err(CpuError::NoSpsr(mode));
        }
        Ok(Psr::new(self.cells[slot][column as usize]))
    }

    pub fn set_psr(&mut self, mode: Mode, slot: usize, psr: Psr) -> Result<(), CpuError> {
        assert!(
            slot == REG_CPSR || slot == REG_SPSR,
            "not a status register slot: {slot}"
        );
        let column = Self::column(mode, slot);
        if column == NONE {
            return Err(CpuError::NoSpsr(mode));
        }
        self.cells[slot][column as usize] = psr.raw();
        Ok(())
    }

    pub fn spsr(&self, mode: Mode) -> Result<Psr, CpuError> {
        self.psr(mode, REG_SPSR)
    }

    pub fn set_spsr(&mut self, mode: Mode, psr: Psr) -> Result<(), CpuError> {
        self.set_psr(mode, REG_SPSR, psr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_mode_is_system() {
        let registers = RegisterFile::default();
        assert_eq!(registers.cpsr().mode(), Mode::System);
    }

    #[test]
    fn low_registers_are_shared() {
        let mut registers = RegisterFile::default();
        registers.set_register_at(Mode::User, 0, 0xCAFE);
        for mode in [
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ] {
            assert_eq!(registers.register_at(mode, 0), 0xCAFE);
        }
    }

    #[test]
    fn stack_pointers_are_banked() {
        let mut registers = RegisterFile::default();
        registers.set_register_at(Mode::User, REG_SP, 0x0300_7F00);
        registers.set_register_at(Mode::Irq, REG_SP, 0x0300_7FA0);
        registers.set_register_at(Mode::Supervisor, REG_SP, 0x0300_7FE0);

        assert_eq!(registers.register_at(Mode::User, REG_SP), 0x0300_7F00);
        assert_eq!(registers.register_at(Mode::Irq, REG_SP), 0x0300_7FA0);
        assert_eq!(registers.register_at(Mode::Supervisor, REG_SP), 0x0300_7FE0);
        // System shares the User bank.
        assert_eq!(registers.register_at(Mode::System, REG_SP), 0x0300_7F00);
    }

    #[test]
    fn fiq_banks_r8_through_r14() {
        let mut registers = RegisterFile::default();
        for index in 8..=14 {
            registers.set_register_at(Mode::User, index, index as u32);
            registers.set_register_at(Mode::Fiq, index, 0xF000 + index as u32);
        }
        for index in 8..=14 {
            assert_eq!(registers.register_at(Mode::User, index), index as u32);
            assert_eq!(
                registers.register_at(Mode::Fiq, index),
                0xF000 + index as u32
            );
        }
        // R8-R12 are only banked for FIQ.
        assert_eq!(registers.register_at(Mode::Irq, 8), 8);
    }

    #[test]
    fn program_counter_is_unbanked() {
        let mut registers = RegisterFile::default();
        registers.set_register_at(Mode::Fiq, REG_PROGRAM_COUNTER, 0x0800_0004);
        assert_eq!(registers.program_counter(), 0x0800_0004);
        assert_eq!(
            registers.register_at(Mode::User, REG_PROGRAM_COUNTER),
            0x0800_0004
        );
    }

    #[test]
    fn spsr_is_banked_per_exception_mode() {
        let mut registers = RegisterFile::default();
        registers
            .set_spsr(Mode::Irq, Psr::new(0x1000_0012))
            .unwrap();
        registers
            .set_spsr(Mode::Supervisor, Psr::new(0x2000_0013))
            .unwrap();

        assert_eq!(registers.spsr(Mode::Irq).unwrap().raw(), 0x1000_0012);
        assert_eq!(
            registers.spsr(Mode::Supervisor).unwrap().raw(),
            0x2000_0013
        );
    }

    #[test]
    fn no_spsr_in_user_or_system() {
        let mut registers = RegisterFile::default();
        assert_eq!(registers.spsr(Mode::User), Err(CpuError::NoSpsr(Mode::User)));
        assert_eq!(
            registers.spsr(Mode::System),
            Err(CpuError::NoSpsr(Mode::System))
        );
        assert_eq!(
            registers.set_spsr(Mode::System, Psr::new(0)),
            Err(CpuError::NoSpsr(Mode::System))
        );
    }

    #[test]
    #[should_panic]
    fn register_at_rejects_psr_slots() {
        RegisterFile::default().register_at(Mode::User, REG_CPSR);
    }
}
