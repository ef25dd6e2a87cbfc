use crate::bitwise::Bits;
use crate::cpu::CpuError;
use crate::cpu::arm::decode::{ArmOpcode, decode};
use crate::cpu::arm::operations::{AluInstruction, OperandForm};
use crate::cpu::condition::Condition;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{HalfwordKind, Indexing, OperandKind};
use crate::cpu::psr::{CpuState, FlagsUpdate, Psr};
use crate::cpu::registers::RegisterFile;
use crate::memory::bus::Bus;

/// The CPU core: banked registers plus whatever sits on the other side of
/// the bus. Decode and execution are driven from outside, one instruction
/// word at a time.
pub struct Arm7tdmi<B: Bus> {
    pub registers: RegisterFile,
    pub bus: B,
}

impl<B: Bus + Default> Default for Arm7tdmi<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Bus> Arm7tdmi<B> {
    pub fn new(bus: B) -> Self {
        Self {
            registers: RegisterFile::default(),
            bus,
        }
    }

    pub fn cpsr(&self) -> Psr {
        self.registers.cpsr()
    }

    pub fn set_cpsr(&mut self, psr: Psr) {
        self.registers.set_cpsr(psr);
    }

    pub fn mode(&self) -> Mode {
        self.cpsr().mode()
    }

    /// Commits N/Z and optionally C/V in one step.
    pub fn set_nzcv(&mut self, update: FlagsUpdate) {
        let mut cpsr = self.cpsr();
        cpsr.set_flags(update);
        self.set_cpsr(cpsr);
    }

    pub fn change_state(&mut self, state: CpuState) {
        let mut cpsr = self.cpsr();
        cpsr.set_state(state);
        self.set_cpsr(cpsr);
    }

    pub fn change_mode(&mut self, mode: Mode) {
        let mut cpsr = self.cpsr();
        cpsr.set_mode(mode);
        self.set_cpsr(cpsr);
    }

    /// Decodes and executes one ARM-state instruction word.
    pub fn execute_arm(&mut self, instr: u32) -> Result<(), CpuError> {
        let opcode = decode(instr)?;
        self.execute(instr, opcode)
    }

    /// Runs an already-decoded instruction. The condition check is hoisted
    /// here: no executor touches any state when it fails, so checking once
    /// before dispatch is observationally the same as checking inside each
    /// executor. `AL` short-circuits; the evaluator itself treats it as
    /// reserved.
    pub fn execute(&mut self, instr: u32, opcode: ArmOpcode) -> Result<(), CpuError> {
        let condition = Condition::from(instr.get_bits(28..=31) as u8);
        if condition != Condition::AL && !self.cpsr().can_execute(condition)? {
            return Ok(());
        }

        use ArmOpcode::*;
        match opcode {
            MultiplyLong => self.multiply_long(instr),
            Multiply => self.multiply(instr),
            StoreHalfwordPostRegister => self.halfword_transfer(
                instr,
                HalfwordKind::StoreHalfword,
                Indexing::Post,
                OperandKind::Register,
            ),
            LoadHalfwordPostRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadHalfword,
                Indexing::Post,
                OperandKind::Register,
            ),
            StoreHalfwordPostImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::StoreHalfword,
                Indexing::Post,
                OperandKind::Immediate,
            ),
            LoadHalfwordPostImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadHalfword,
                Indexing::Post,
                OperandKind::Immediate,
            ),
            LoadSignedBytePostRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedByte,
                Indexing::Post,
                OperandKind::Register,
            ),
            LoadSignedBytePostImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedByte,
                Indexing::Post,
                OperandKind::Immediate,
            ),
            LoadSignedHalfwordPostRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedHalfword,
                Indexing::Post,
                OperandKind::Register,
            ),
            LoadSignedHalfwordPostImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedHalfword,
                Indexing::Post,
                OperandKind::Immediate,
            ),
            AndShiftRegister => {
                self.data_processing(instr, AluInstruction::And, OperandForm::ShiftRegister)
            }
            EorShiftRegister => {
                self.data_processing(instr, AluInstruction::Eor, OperandForm::ShiftRegister)
            }
            SubShiftRegister => {
                self.data_processing(instr, AluInstruction::Sub, OperandForm::ShiftRegister)
            }
            RsbShiftRegister => {
                self.data_processing(instr, AluInstruction::Rsb, OperandForm::ShiftRegister)
            }
            AddShiftRegister => {
                self.data_processing(instr, AluInstruction::Add, OperandForm::ShiftRegister)
            }
            AdcShiftRegister => {
                self.data_processing(instr, AluInstruction::Adc, OperandForm::ShiftRegister)
            }
            SbcShiftRegister => {
                self.data_processing(instr, AluInstruction::Sbc, OperandForm::ShiftRegister)
            }
            RscShiftRegister => {
                self.data_processing(instr, AluInstruction::Rsc, OperandForm::ShiftRegister)
            }
            AndShiftImmediate => {
                self.data_processing(instr, AluInstruction::And, OperandForm::ShiftImmediate)
            }
            EorShiftImmediate => {
                self.data_processing(instr, AluInstruction::Eor, OperandForm::ShiftImmediate)
            }
            SubShiftImmediate => {
                self.data_processing(instr, AluInstruction::Sub, OperandForm::ShiftImmediate)
            }
            RsbShiftImmediate => {
                self.data_processing(instr, AluInstruction::Rsb, OperandForm::ShiftImmediate)
            }
            AddShiftImmediate => {
                self.data_processing(instr, AluInstruction::Add, OperandForm::ShiftImmediate)
            }
            AdcShiftImmediate => {
                self.data_processing(instr, AluInstruction::Adc, OperandForm::ShiftImmediate)
            }
            SbcShiftImmediate => {
                self.data_processing(instr, AluInstruction::Sbc, OperandForm::ShiftImmediate)
            }
            RscShiftImmediate => {
                self.data_processing(instr, AluInstruction::Rsc, OperandForm::ShiftImmediate)
            }
            TstShiftRegister => {
                self.data_processing(instr, AluInstruction::Tst, OperandForm::ShiftRegister)
            }
            TeqShiftRegister => {
                self.data_processing(instr, AluInstruction::Teq, OperandForm::ShiftRegister)
            }
            BranchAndExchange => self.branch_and_exchange(instr),
            CmpShiftRegister => {
                self.data_processing(instr, AluInstruction::Cmp, OperandForm::ShiftRegister)
            }
            CmnShiftRegister => {
                self.data_processing(instr, AluInstruction::Cmn, OperandForm::ShiftRegister)
            }
            OrrShiftRegister => {
                self.data_processing(instr, AluInstruction::Orr, OperandForm::ShiftRegister)
            }
            MovShiftRegister => {
                self.data_processing(instr, AluInstruction::Mov, OperandForm::ShiftRegister)
            }
            BicShiftRegister => {
                self.data_processing(instr, AluInstruction::Bic, OperandForm::ShiftRegister)
            }
            MvnShiftRegister => {
                self.data_processing(instr, AluInstruction::Mvn, OperandForm::ShiftRegister)
            }
            SingleDataSwap => self.single_data_swap(instr),
            StoreHalfwordPreRegister => self.halfword_transfer(
                instr,
                HalfwordKind::StoreHalfword,
                Indexing::Pre,
                OperandKind::Register,
            ),
            LoadHalfwordPreRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadHalfword,
                Indexing::Pre,
                OperandKind::Register,
            ),
            StoreHalfwordPreImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::StoreHalfword,
                Indexing::Pre,
                OperandKind::Immediate,
            ),
            LoadHalfwordPreImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadHalfword,
                Indexing::Pre,
                OperandKind::Immediate,
            ),
            LoadSignedBytePreRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedByte,
                Indexing::Pre,
                OperandKind::Register,
            ),
            LoadSignedBytePreImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedByte,
                Indexing::Pre,
                OperandKind::Immediate,
            ),
            LoadSignedHalfwordPreRegister => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedHalfword,
                Indexing::Pre,
                OperandKind::Register,
            ),
            LoadSignedHalfwordPreImmediate => self.halfword_transfer(
                instr,
                HalfwordKind::LoadSignedHalfword,
                Indexing::Pre,
                OperandKind::Immediate,
            ),
            Mrs => self.status_to_register(instr),
            MsrRegister => self.register_to_status(instr, OperandKind::Register),
            TstShiftImmediate => {
                self.data_processing(instr, AluInstruction::Tst, OperandForm::ShiftImmediate)
            }
            TeqShiftImmediate => {
                self.data_processing(instr, AluInstruction::Teq, OperandForm::ShiftImmediate)
            }
            CmpShiftImmediate => {
                self.data_processing(instr, AluInstruction::Cmp, OperandForm::ShiftImmediate)
            }
            CmnShiftImmediate => {
                self.data_processing(instr, AluInstruction::Cmn, OperandForm::ShiftImmediate)
            }
            OrrShiftImmediate => {
                self.data_processing(instr, AluInstruction::Orr, OperandForm::ShiftImmediate)
            }
            MovShiftImmediate => {
                self.data_processing(instr, AluInstruction::Mov, OperandForm::ShiftImmediate)
            }
            BicShiftImmediate => {
                self.data_processing(instr, AluInstruction::Bic, OperandForm::ShiftImmediate)
            }
            MvnShiftImmediate => {
                self.data_processing(instr, AluInstruction::Mvn, OperandForm::ShiftImmediate)
            }
            AndImmediate => {
                self.data_processing(instr, AluInstruction::And, OperandForm::RotatedImmediate)
            }
            EorImmediate => {
                self.data_processing(instr, AluInstruction::Eor, OperandForm::RotatedImmediate)
            }
            SubImmediate => {
                self.data_processing(instr, AluInstruction::Sub, OperandForm::RotatedImmediate)
            }
            RsbImmediate => {
                self.data_processing(instr, AluInstruction::Rsb, OperandForm::RotatedImmediate)
            }
            AddImmediate => {
                self.data_processing(instr, AluInstruction::Add, OperandForm::RotatedImmediate)
            }
            AdcImmediate => {
                self.data_processing(instr, AluInstruction::Adc, OperandForm::RotatedImmediate)
            }
            SbcImmediate => {
                self.data_processing(instr, AluInstruction::Sbc, OperandForm::RotatedImmediate)
            }
            RscImmediate => {
                self.data_processing(instr, AluInstruction::Rsc, OperandForm::RotatedImmediate)
            }
            TstImmediate => {
                self.data_processing(instr, AluInstruction::Tst, OperandForm::RotatedImmediate)
            }
            MsrImmediate => self.register_to_status(instr, OperandKind::Immediate),
            TeqImmediate => {
                self.data_processing(instr, AluInstruction::Teq, OperandForm::RotatedImmediate)
            }
            CmpImmediate => {
                self.data_processing(instr, AluInstruction::Cmp, OperandForm::RotatedImmediate)
            }
            CmnImmediate => {
                self.data_processing(instr, AluInstruction::Cmn, OperandForm::RotatedImmediate)
            }
            OrrImmediate => {
                self.data_processing(instr, AluInstruction::Orr, OperandForm::RotatedImmediate)
            }
            MovImmediate => {
                self.data_processing(instr, AluInstruction::Mov, OperandForm::RotatedImmediate)
            }
            BicImmediate => {
                self.data_processing(instr, AluInstruction::Bic, OperandForm::RotatedImmediate)
            }
            MvnImmediate => {
                self.data_processing(instr, AluInstruction::Mvn, OperandForm::RotatedImmediate)
            }
            SingleDataTransferImmediate => {
                self.single_data_transfer(instr, OperandKind::Immediate)
            }
            SingleDataTransferRegister => self.single_data_transfer(instr, OperandKind::Register),
            BlockDataTransfer => self.block_data_transfer(instr),
            Branch => self.branch(instr),
            CoprocessorDataTransfer | CoprocessorDataOperation | CoprocessorRegisterTransfer => {
                self.coprocessor(instr)
            }
            SoftwareInterrupt => self.software_interrupt(instr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::bus::LinearRam;
    use pretty_assertions::assert_eq;

    fn cpu() -> Arm7tdmi<LinearRam> {
        Arm7tdmi::new(LinearRam::new(0x1000))
    }

    #[test]
    fn mov_immediate_end_to_end() {
        let mut cpu = cpu();
        let before = cpu.cpsr();
        cpu.execute_arm(0xE3A0_0005).unwrap();
        assert_eq!(cpu.registers.register_at(Mode::System, 0), 5);
        // S clear: flags untouched.
        assert_eq!(cpu.cpsr(), before);
    }

    #[test]
    fn failed_condition_is_a_no_op() {
        let mut cpu = cpu();
        // MOVEQ R0, #5 with Z clear.
        cpu.execute_arm(0x03A0_0005).unwrap();
        assert_eq!(cpu.registers.register_at(Mode::System, 0), 0);

        // MOVNE R0, #5 with Z clear runs.
        cpu.execute_arm(0x13A0_0005).unwrap();
        assert_eq!(cpu.registers.register_at(Mode::System, 0), 5);
    }

    #[test]
    fn reserved_condition_fails() {
        let mut cpu = cpu();
        // Condition field 0xF on a data-processing pattern reaches the
        // evaluator and must error out rather than silently pass.
        let instr = 0xF3A0_0005;
        assert_eq!(
            cpu.execute_arm(instr),
            Err(CpuError::ReservedCondition(0xF))
        );
    }

    #[test]
    fn mode_and_state_changes() {
        let mut cpu = cpu();
        assert_eq!(cpu.mode(), Mode::System);
        cpu.change_mode(Mode::Irq);
        assert_eq!(cpu.mode(), Mode::Irq);
        cpu.change_state(CpuState::Thumb);
        assert_eq!(cpu.cpsr().state(), CpuState::Thumb);
        assert_eq!(cpu.mode(), Mode::Irq);
    }

    #[test]
    fn set_nzcv_commits_atomically() {
        let mut cpu = cpu();
        cpu.set_nzcv(FlagsUpdate {
            sign: true,
            zero: true,
            carry: Some(true),
            overflow: None,
        });
        let cpsr = cpu.cpsr();
        assert!(cpsr.sign_flag());
        assert!(cpsr.zero_flag());
        assert!(cpsr.carry_flag());
        assert!(!cpsr.overflow_flag());
    }
}
