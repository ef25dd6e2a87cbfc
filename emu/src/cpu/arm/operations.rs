//! Executor bodies for the ARM-state instruction families. Every method
//! here runs after the dispatcher's condition check and mutates the
//! register file and the bus directly.

use tracing::debug;

use crate::bitwise::Bits;
use crate::cpu::CpuError;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{
    HalfwordKind, Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind,
};
use crate::cpu::psr::{CpuState, FlagsUpdate, Psr};
use crate::cpu::registers::REG_LR;
use crate::cpu::shifter::{ShiftKind, ShiftResult, ShiftSource, shift};
use crate::memory::bus::Bus;

/// The sixteen data-processing operations from bits 21-24.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AluInstruction {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

/// How the second operand of a data-processing instruction is encoded.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum OperandForm {
    /// Register shifted by a 5-bit immediate amount.
    ShiftImmediate,
    /// Register shifted by the value of another register.
    ShiftRegister,
    /// 8-bit immediate rotated right by twice the 4-bit rotate field.
    RotatedImmediate,
}

struct ArithmeticResult {
    value: u32,
    carry: bool,
    overflow: bool,
}

const fn sign_of(value: u32) -> u32 {
    value >> 31
}

/// The overflow discriminator sums the sign bit of both operands and the
/// inverted sign bit of the result; exactly 0 or 3 means the result sign
/// disagrees with two same-signed operands. Subtraction-class operations
/// feed the subtrahend in with its sign inverted.
const fn overflows(first_sign: u32, second_sign: u32, result_sign: u32) -> bool {
    let discriminator = first_sign + second_sign + (result_sign ^ 1);
    discriminator == 0 || discriminator == 3
}

fn add_values(first: u32, second: u32) -> ArithmeticResult {
    let value = first.wrapping_add(second);
    ArithmeticResult {
        value,
        carry: value < first,
        overflow: overflows(sign_of(first), sign_of(second), sign_of(value)),
    }
}

fn adc_values(first: u32, second: u32, carry_in: bool) -> ArithmeticResult {
    let wide = u64::from(first) + u64::from(second) + u64::from(carry_in);
    let value = wide as u32;
    ArithmeticResult {
        value,
        carry: wide.get_bit(32),
        overflow: overflows(sign_of(first), sign_of(second), sign_of(value)),
    }
}

fn sub_values(first: u32, second: u32) -> ArithmeticResult {
    let value = first.wrapping_sub(second);
    ArithmeticResult {
        value,
        // Carry means "no borrow occurred".
        carry: second <= first,
        overflow: overflows(sign_of(first), sign_of(second) ^ 1, sign_of(value)),
    }
}

fn sbc_values(first: u32, second: u32, carry_in: bool) -> ArithmeticResult {
    // The borrow folds into the subtrahend before the carry comparison and
    // the overflow term alike.
    let adjusted = i64::from(second) + 1 - i64::from(carry_in);
    let value = (i64::from(first) - adjusted) as u32;
    ArithmeticResult {
        value,
        carry: adjusted <= i64::from(first),
        overflow: overflows(sign_of(first), sign_of(adjusted as u32) ^ 1, sign_of(value)),
    }
}

impl<B: Bus> Arm7tdmi<B> {
    /// Resolves the second operand through the barrel shifter.
    fn alu_operand(&self, instr: u32, form: OperandForm) -> ShiftResult {
        let mode = self.mode();
        let carry_in = self.cpsr().carry_flag();
        match form {
            OperandForm::RotatedImmediate => {
                let value = instr.get_bits(0..=7);
                let amount = instr.get_bits(8..=11) << 1;
                shift(
                    ShiftKind::RotatedImmediate,
                    amount,
                    value,
                    ShiftSource::Immediate,
                    carry_in,
                )
            }
            OperandForm::ShiftImmediate => {
                let value = self.registers.register_at(mode, instr.get_bits(0..=3) as usize);
                let kind = ShiftKind::from(instr.get_bits(5..=6));
                let amount = instr.get_bits(7..=11);
                shift(kind, amount, value, ShiftSource::Immediate, carry_in)
            }
            OperandForm::ShiftRegister => {
                let value = self.registers.register_at(mode, instr.get_bits(0..=3) as usize);
                let kind = ShiftKind::from(instr.get_bits(5..=6));
                // The full register value, not just its low byte.
                let amount = self.registers.register_at(mode, instr.get_bits(8..=11) as usize);
                shift(kind, amount, value, ShiftSource::Register, carry_in)
            }
        }
    }

    pub(crate) fn data_processing(
        &mut self,
        instr: u32,
        operation: AluInstruction,
        form: OperandForm,
    ) -> Result<(), CpuError> {
        let mode = self.mode();
        let set_flags = instr.get_bit(20);
        let rn = instr.get_bits(16..=19) as usize;
        let rd = instr.get_bits(12..=15) as usize;
        let first = self.registers.register_at(mode, rn);
        let operand = self.alu_operand(instr, form);
        let second = operand.value;
        let carry_in = self.cpsr().carry_flag();

        let arithmetic =
            |result: ArithmeticResult| (result.value, Some(result.carry), Some(result.overflow));

        // (result, carry, overflow); logical operations take the shifter's
        // carry-out and leave overflow alone.
        let (value, carry, overflow) = match operation {
            AluInstruction::And | AluInstruction::Tst => (first & second, operand.carry, None),
            AluInstruction::Eor | AluInstruction::Teq => (first ^ second, operand.carry, None),
            AluInstruction::Sub | AluInstruction::Cmp => arithmetic(sub_values(first, second)),
            AluInstruction::Rsb => arithmetic(sub_values(second, first)),
            AluInstruction::Add | AluInstruction::Cmn => arithmetic(add_values(first, second)),
            AluInstruction::Adc => arithmetic(adc_values(first, second, carry_in)),
            AluInstruction::Sbc => arithmetic(sbc_values(first, second, carry_in)),
            AluInstruction::Rsc => arithmetic(sbc_values(second, first, carry_in)),
            AluInstruction::Orr => (first | second, operand.carry, None),
            AluInstruction::Mov => (second, operand.carry, None),
            AluInstruction::Bic => (first & !second, operand.carry, None),
            AluInstruction::Mvn => (!second, operand.carry, None),
        };

        let comparison = matches!(
            operation,
            AluInstruction::Tst | AluInstruction::Teq | AluInstruction::Cmp | AluInstruction::Cmn
        );
        if set_flags || comparison {
            self.set_nzcv(FlagsUpdate {
                sign: value.get_bit(31),
                zero: value == 0,
                carry,
                overflow,
            });
        }
        if !comparison {
            self.registers.set_register_at(mode, rd, value);
        }
        Ok(())
    }

    pub(crate) fn multiply(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let accumulate = instr.get_bit(21);
        let set_flags = instr.get_bit(20);
        let rd = instr.get_bits(16..=19) as usize;
        let rn = instr.get_bits(12..=15) as usize;
        let rs = instr.get_bits(8..=11) as usize;
        let rm = instr.get_bits(0..=3) as usize;

        let product = u64::from(self.registers.register_at(mode, rm))
            * u64::from(self.registers.register_at(mode, rs));
        let mut value = product as u32;
        if accumulate {
            value = value.wrapping_add(self.registers.register_at(mode, rn));
        }
        self.registers.set_register_at(mode, rd, value);

        if set_flags {
            self.set_nzcv(FlagsUpdate {
                sign: value.get_bit(31),
                zero: value == 0,
                carry: None,
                overflow: None,
            });
        }
        Ok(())
    }

    /// 64-bit multiply into a register pair. Bit 22 nominally selects a
    /// signed product; both encodings run the unsigned path here.
    pub(crate) fn multiply_long(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let accumulate = instr.get_bit(21);
        let set_flags = instr.get_bit(20);
        let rd_high = instr.get_bits(16..=19) as usize;
        let rd_low = instr.get_bits(12..=15) as usize;
        let rs = instr.get_bits(8..=11) as usize;
        let rm = instr.get_bits(0..=3) as usize;

        let mut product = u64::from(self.registers.register_at(mode, rm))
            * u64::from(self.registers.register_at(mode, rs));
        if accumulate {
            let existing = (u64::from(self.registers.register_at(mode, rd_high)) << 32)
                | u64::from(self.registers.register_at(mode, rd_low));
            product = product.wrapping_add(existing);
        }
        self.registers.set_register_at(mode, rd_high, (product >> 32) as u32);
        self.registers.set_register_at(mode, rd_low, product as u32);

        if set_flags {
            self.set_nzcv(FlagsUpdate {
                sign: product.get_bit(63),
                zero: product == 0,
                carry: None,
                overflow: None,
            });
        }
        Ok(())
    }

    fn read_rotated_half_word(&mut self, address: u32) -> u32 {
        let value = u32::from(self.bus.read_half_word(address & !1));
        if address.get_bit(0) {
            value.rotate_right(8)
        } else {
            value
        }
    }

    fn read_rotated_word(&mut self, address: u32) -> u32 {
        let value = self.bus.read_word(address & !0b11);
        value.rotate_right((address & 0b11) * 8)
    }

    pub(crate) fn halfword_transfer(
        &mut self,
        instr: u32,
        kind: HalfwordKind,
        indexing: Indexing,
        offset_kind: OperandKind,
    ) -> Result<(), CpuError> {
        let mode = self.mode();
        let offsetting = Offsetting::from(instr.get_bit(23));
        let writeback = instr.get_bit(21);
        let rn = instr.get_bits(16..=19) as usize;
        let rd = instr.get_bits(12..=15) as usize;

        let offset = match offset_kind {
            OperandKind::Immediate => (instr.get_bits(8..=11) << 4) | instr.get_bits(0..=3),
            OperandKind::Register => {
                self.registers.register_at(mode, instr.get_bits(0..=3) as usize)
            }
        };
        let base = self.registers.register_at(mode, rn);
        let stepped = match offsetting {
            Offsetting::Up => base.wrapping_add(offset),
            Offsetting::Down => base.wrapping_sub(offset),
        };
        let address = match indexing {
            Indexing::Pre => stepped,
            Indexing::Post => base,
        };

        match kind {
            HalfwordKind::StoreHalfword => {
                let value = self.registers.register_at(mode, rd);
                self.bus.write_half_word(address & !1, value as u16);
            }
            HalfwordKind::LoadHalfword => {
                let value = self.read_rotated_half_word(address);
                self.registers.set_register_at(mode, rd, value);
            }
            HalfwordKind::LoadSignedByte => {
                let value = u32::from(self.bus.read_byte(address)).sign_extended(8);
                self.registers.set_register_at(mode, rd, value);
            }
            HalfwordKind::LoadSignedHalfword => {
                let extended =
                    u32::from(self.bus.read_half_word(address & !1)).sign_extended(16);
                // An odd address degrades the load to its sign-extended top
                // byte, replicated through the high bits.
                let value = if address.get_bit(0) {
                    (extended >> 8) | (extended.get_bits(16..=23) << 24)
                } else {
                    extended
                };
                self.registers.set_register_at(mode, rd, value);
            }
        }

        // Post-indexed forms always write the stepped base back.
        if indexing == Indexing::Post || writeback {
            self.registers.set_register_at(mode, rn, stepped);
        }
        Ok(())
    }

    pub(crate) fn single_data_transfer(
        &mut self,
        instr: u32,
        offset_kind: OperandKind,
    ) -> Result<(), CpuError> {
        let mode = self.mode();
        let indexing = Indexing::from(instr.get_bit(24));
        let offsetting = Offsetting::from(instr.get_bit(23));
        let size = ReadWriteKind::from(instr.get_bit(22));
        let writeback = instr.get_bit(21);
        let kind = LoadStoreKind::from(instr.get_bit(20));
        let rn = instr.get_bits(16..=19) as usize;
        let rd = instr.get_bits(12..=15) as usize;

        let offset = match offset_kind {
            OperandKind::Immediate => instr.get_bits(0..=11),
            OperandKind::Register => {
                let value = self.registers.register_at(mode, instr.get_bits(0..=3) as usize);
                let kind = ShiftKind::from(instr.get_bits(5..=6));
                let amount = instr.get_bits(7..=11);
                shift(
                    kind,
                    amount,
                    value,
                    ShiftSource::Immediate,
                    self.cpsr().carry_flag(),
                )
                .value
            }
        };
        let base = self.registers.register_at(mode, rn);
        let stepped = match offsetting {
            Offsetting::Up => base.wrapping_add(offset),
            Offsetting::Down => base.wrapping_sub(offset),
        };
        let address = match indexing {
            Indexing::Pre => stepped,
            Indexing::Post => base,
        };

        match (kind, size) {
            (LoadStoreKind::Load, ReadWriteKind::Word) => {
                let value = self.read_rotated_word(address);
                self.registers.set_register_at(mode, rd, value);
            }
            (LoadStoreKind::Load, ReadWriteKind::Byte) => {
                let value = u32::from(self.bus.read_byte(address));
                self.registers.set_register_at(mode, rd, value);
            }
            (LoadStoreKind::Store, ReadWriteKind::Word) => {
                let value = self.registers.register_at(mode, rd);
                self.bus.write_word(address & !0b11, value);
            }
            (LoadStoreKind::Store, ReadWriteKind::Byte) => {
                let value = self.registers.register_at(mode, rd);
                self.bus.write_byte(address, value as u8);
            }
        }

        if indexing == Indexing::Post || writeback {
            self.registers.set_register_at(mode, rn, stepped);
        }
        Ok(())
    }

    pub(crate) fn block_data_transfer(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let indexing = Indexing::from(instr.get_bit(24));
        let offsetting = Offsetting::from(instr.get_bit(23));
        // Bit 22 (user-bank transfer) is accepted and ignored.
        let writeback = instr.get_bit(21);
        let kind = LoadStoreKind::from(instr.get_bit(20));
        let rn = instr.get_bits(16..=19) as usize;
        let list = instr.get_bits(0..=15);

        let base = self.registers.register_at(mode, rn);
        let count = list.count_ones();

        // The address only advances for registers actually in the list;
        // direction decides the iteration order so the lowest register
        // always lands at the lowest address.
        let mut address = base;
        match offsetting {
            Offsetting::Up => {
                for index in 0..16_u8 {
                    if !list.get_bit(index) {
                        continue;
                    }
                    if indexing == Indexing::Pre {
                        address = address.wrapping_add(4);
                    }
                    self.transfer_block_register(mode, kind, index as usize, address);
                    if indexing == Indexing::Post {
                        address = address.wrapping_add(4);
                    }
                }
            }
            Offsetting::Down => {
                for index in (0..16_u8).rev() {
                    if !list.get_bit(index) {
                        continue;
                    }
                    if indexing == Indexing::Pre {
                        address = address.wrapping_sub(4);
                    }
                    self.transfer_block_register(mode, kind, index as usize, address);
                    if indexing == Indexing::Post {
                        address = address.wrapping_sub(4);
                    }
                }
            }
        }

        // Applied after the loop, so on a load it overrides a base register
        // that was also in the list.
        if writeback {
            let stepped = match offsetting {
                Offsetting::Up => base.wrapping_add(4 * count),
                Offsetting::Down => base.wrapping_sub(4 * count),
            };
            self.registers.set_register_at(mode, rn, stepped);
        }
        Ok(())
    }

    fn transfer_block_register(
        &mut self,
        mode: Mode,
        kind: LoadStoreKind,
        index: usize,
        address: u32,
    ) {
        match kind {
            LoadStoreKind::Load => {
                let value = self.bus.read_word(address);
                self.registers.set_register_at(mode, index, value);
            }
            LoadStoreKind::Store => {
                let value = self.registers.register_at(mode, index);
                self.bus.write_word(address, value);
            }
        }
    }

    pub(crate) fn branch(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let link = instr.get_bit(24);
        let offset = instr.get_bits(0..=23).sign_extended(24) << 2;
        let pc = self.registers.program_counter();

        if link {
            self.registers.set_register_at(mode, REG_LR, pc.wrapping_sub(4));
        }
        self.registers.set_program_counter(pc.wrapping_add(offset));
        Ok(())
    }

    pub(crate) fn branch_and_exchange(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let target = self.registers.register_at(mode, instr.get_bits(0..=3) as usize);

        if target.get_bit(0) {
            self.registers.set_program_counter(target.wrapping_sub(1));
            self.change_state(CpuState::Thumb);
        } else {
            self.registers.set_program_counter(target & !0b11);
        }
        Ok(())
    }

    pub(crate) fn status_to_register(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let rd = instr.get_bits(12..=15) as usize;
        let value = if instr.get_bit(22) {
            self.registers.spsr(mode)?.raw()
        } else {
            self.cpsr().raw()
        };
        self.registers.set_register_at(mode, rd, value);
        Ok(())
    }

    pub(crate) fn register_to_status(
        &mut self,
        instr: u32,
        operand_kind: OperandKind,
    ) -> Result<(), CpuError> {
        let mode = self.mode();
        let to_spsr = instr.get_bit(22);
        let value = match operand_kind {
            OperandKind::Register => {
                self.registers.register_at(mode, instr.get_bits(0..=3) as usize)
            }
            OperandKind::Immediate => {
                let immediate = instr.get_bits(0..=7);
                let amount = instr.get_bits(8..=11) << 1;
                shift(
                    ShiftKind::RotatedImmediate,
                    amount,
                    immediate,
                    ShiftSource::Immediate,
                    self.cpsr().carry_flag(),
                )
                .value
            }
        };

        // The f/s/x/c field bits gate one byte each; the flags byte writes
        // in any mode, the rest only outside User.
        let privileged = mode != Mode::User;
        let mut mask = 0_u32;
        for byte in 0..4_u8 {
            if instr.get_bit(16 + byte) && (byte == 3 || privileged) {
                mask |= 0xFF << (u32::from(byte) * 8);
            }
        }

        let current = if to_spsr {
            self.registers.spsr(mode)?.raw()
        } else {
            self.cpsr().raw()
        };
        let merged = Psr::new((current & !mask) | (value & mask));
        if to_spsr {
            self.registers.set_spsr(mode, merged)?;
        } else {
            self.set_cpsr(merged);
        }
        Ok(())
    }

    pub(crate) fn single_data_swap(&mut self, instr: u32) -> Result<(), CpuError> {
        let mode = self.mode();
        let byte = instr.get_bit(22);
        let rn = instr.get_bits(16..=19) as usize;
        let rd = instr.get_bits(12..=15) as usize;
        let rm = instr.get_bits(0..=3) as usize;
        let address = self.registers.register_at(mode, rn);

        // Rd is written before Rm is read, so Rd == Rm swaps the loaded
        // value straight back into memory.
        if byte {
            let loaded = u32::from(self.bus.read_byte(address));
            self.registers.set_register_at(mode, rd, loaded);
            let value = self.registers.register_at(mode, rm);
            self.bus.write_byte(address, value as u8);
        } else {
            let loaded = self.read_rotated_word(address);
            self.registers.set_register_at(mode, rd, loaded);
            let value = self.registers.register_at(mode, rm);
            self.bus.write_word(address & !0b11, value);
        }
        Ok(())
    }

    /// LDC/STC, CDP and MRC/MCR never occur on this hardware family.
    pub(crate) fn coprocessor(&mut self, instr: u32) -> Result<(), CpuError> {
        debug!("ignoring coprocessor instruction {instr:#010X}");
        Ok(())
    }

    /// Exception entry is handled by the layer that owns the fetch loop.
    pub(crate) fn software_interrupt(&mut self, instr: u32) -> Result<(), CpuError> {
        debug!(
            "software interrupt {:#08X} left to the exception layer",
            instr.get_bits(0..=23)
        );
        Ok(())
    }
}
