use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::CpuError;

/// The 79 ARM-state encoding slots. Discriminants are the dispatch indices:
/// a decoded word maps to exactly one slot and the index is stable for a
/// given encoding.
///
/// Slot granularity follows the encoding table, so an instruction that
/// exists in several addressing forms occupies one slot per form (e.g. AND
/// appears as `AndShiftRegister`, `AndShiftImmediate` and `AndImmediate`).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum ArmOpcode {
    MultiplyLong = 0,
    Multiply = 1,
    StoreHalfwordPostRegister = 2,
    LoadHalfwordPostRegister = 3,
    StoreHalfwordPostImmediate = 4,
    LoadHalfwordPostImmediate = 5,
    LoadSignedBytePostRegister = 6,
    LoadSignedBytePostImmediate = 7,
    LoadSignedHalfwordPostRegister = 8,
    LoadSignedHalfwordPostImmediate = 9,
    AndShiftRegister = 10,
    EorShiftRegister = 11,
    SubShiftRegister = 12,
    RsbShiftRegister = 13,
    AddShiftRegister = 14,
    AdcShiftRegister = 15,
    SbcShiftRegister = 16,
    RscShiftRegister = 17,
    AndShiftImmediate = 18,
    EorShiftImmediate = 19,
    SubShiftImmediate = 20,
    RsbShiftImmediate = 21,
    AddShiftImmediate = 22,
    AdcShiftImmediate = 23,
    SbcShiftImmediate = 24,
    RscShiftImmediate = 25,
    TstShiftRegister = 26,
    TeqShiftRegister = 27,
    BranchAndExchange = 28,
    CmpShiftRegister = 29,
    CmnShiftRegister = 30,
    OrrShiftRegister = 31,
    MovShiftRegister = 32,
    BicShiftRegister = 33,
    MvnShiftRegister = 34,
    SingleDataSwap = 35,
    StoreHalfwordPreRegister = 36,
    LoadHalfwordPreRegister = 37,
    StoreHalfwordPreImmediate = 38,
    LoadHalfwordPreImmediate = 39,
    LoadSignedBytePreRegister = 40,
    LoadSignedBytePreImmediate = 41,
    LoadSignedHalfwordPreRegister = 42,
    LoadSignedHalfwordPreImmediate = 43,
    Mrs = 44,
    MsrRegister = 45,
    TstShiftImmediate = 46,
    TeqShiftImmediate = 47,
    CmpShiftImmediate = 48,
    CmnShiftImmediate = 49,
    OrrShiftImmediate = 50,
    MovShiftImmediate = 51,
    BicShiftImmediate = 52,
    MvnShiftImmediate = 53,
    AndImmediate = 54,
    EorImmediate = 55,
    SubImmediate = 56,
    RsbImmediate = 57,
    AddImmediate = 58,
    AdcImmediate = 59,
    SbcImmediate = 60,
    RscImmediate = 61,
    TstImmediate = 62,
    MsrImmediate = 63,
    TeqImmediate = 64,
    CmpImmediate = 65,
    CmnImmediate = 66,
    OrrImmediate = 67,
    MovImmediate = 68,
    BicImmediate = 69,
    MvnImmediate = 70,
    SingleDataTransferImmediate = 71,
    SingleDataTransferRegister = 72,
    BlockDataTransfer = 73,
    Branch = 74,
    CoprocessorDataTransfer = 75,
    CoprocessorDataOperation = 76,
    CoprocessorRegisterTransfer = 77,
    SoftwareInterrupt = 78,
}

impl ArmOpcode {
    /// Every slot, in dispatch-index order.
    pub const ALL: [Self; 79] = [
        Self::MultiplyLong,
        Self::Multiply,
        Self::StoreHalfwordPostRegister,
        Self::LoadHalfwordPostRegister,
        Self::StoreHalfwordPostImmediate,
        Self::LoadHalfwordPostImmediate,
        Self::LoadSignedBytePostRegister,
        Self::LoadSignedBytePostImmediate,
        Self::LoadSignedHalfwordPostRegister,
        Self::LoadSignedHalfwordPostImmediate,
        Self::AndShiftRegister,
        Self::EorShiftRegister,
        Self::SubShiftRegister,
        Self::RsbShiftRegister,
        Self::AddShiftRegister,
        Self::AdcShiftRegister,
        Self::SbcShiftRegister,
        Self::RscShiftRegister,
        Self::AndShiftImmediate,
        Self::EorShiftImmediate,
        Self::SubShiftImmediate,
        Self::RsbShiftImmediate,
        Self::AddShiftImmediate,
        Self::AdcShiftImmediate,
        Self::SbcShiftImmediate,
        Self::RscShiftImmediate,
        Self::TstShiftRegister,
        Self::TeqShiftRegister,
        Self::BranchAndExchange,
        Self::CmpShiftRegister,
        Self::CmnShiftRegister,
        Self::OrrShiftRegister,
        Self::MovShiftRegister,
        Self::BicShiftRegister,
        Self::MvnShiftRegister,
        Self::SingleDataSwap,
        Self::StoreHalfwordPreRegister,
        Self::LoadHalfwordPreRegister,
        Self::StoreHalfwordPreImmediate,
        Self::LoadHalfwordPreImmediate,
        Self::LoadSignedBytePreRegister,
        Self::LoadSignedBytePreImmediate,
        Self::LoadSignedHalfwordPreRegister,
        Self::LoadSignedHalfwordPreImmediate,
        Self::Mrs,
        Self::MsrRegister,
        Self::TstShiftImmediate,
        Self::TeqShiftImmediate,
        Self::CmpShiftImmediate,
        Self::CmnShiftImmediate,
        Self::OrrShiftImmediate,
        Self::MovShiftImmediate,
        Self::BicShiftImmediate,
        Self::MvnShiftImmediate,
        Self::AndImmediate,
        Self::EorImmediate,
        Self::SubImmediate,
        Self::RsbImmediate,
        Self::AddImmediate,
        Self::AdcImmediate,
        Self::SbcImmediate,
        Self::RscImmediate,
        Self::TstImmediate,
        Self::MsrImmediate,
        Self::TeqImmediate,
        Self::CmpImmediate,
        Self::CmnImmediate,
        Self::OrrImmediate,
        Self::MovImmediate,
        Self::BicImmediate,
        Self::MvnImmediate,
        Self::SingleDataTransferImmediate,
        Self::SingleDataTransferRegister,
        Self::BlockDataTransfer,
        Self::Branch,
        Self::CoprocessorDataTransfer,
        Self::CoprocessorDataOperation,
        Self::CoprocessorRegisterTransfer,
        Self::SoftwareInterrupt,
    ];

    /// Dispatch index in [0, 78].
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Defensive entry point for index-driven callers; `decode` can only
    /// ever produce indices this accepts.
    pub fn from_index(index: u8) -> Result<Self, CpuError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(CpuError::UnknownOpcodeIndex(index))
    }
}

/// Maps a raw instruction word to its encoding slot.
///
/// Fixed-priority nested dispatch: bits 27-24 select the group, then bits 7
/// and 4, bits 4-7, bits 20-23 or bits 21-23 disambiguate within it. The
/// decoder validates nothing beyond the pattern itself; reserved fields the
/// hardware family never checks are accepted as-is. Only a word matching no
/// pattern at all is an error.
pub fn decode(instr: u32) -> Result<ArmOpcode, CpuError> {
    use ArmOpcode::*;

    let opcode = match instr.get_bits(24..=27) {
        0b0000 => {
            if instr.get_bit(4) {
                if instr.get_bit(7) {
                    // Multiplies and post-indexed halfword/signed loads.
                    match instr.get_bits(4..=7) {
                        0b1001 => {
                            if instr.get_bit(23) {
                                MultiplyLong
                            } else {
                                Multiply
                            }
                        }
                        // Sub-key is L plus the W and offset-kind bits; W set
                        // on a post-indexed form matches nothing.
                        0b1011 => match instr.get_bits(20..=22) {
                            0b000 => StoreHalfwordPostRegister,
                            0b001 => LoadHalfwordPostRegister,
                            0b100 => StoreHalfwordPostImmediate,
                            0b101 => LoadHalfwordPostImmediate,
                            _ => return Err(CpuError::UnknownInstruction(instr)),
                        },
                        0b1101 => match instr.get_bits(20..=22) {
                            0b001 => LoadSignedBytePostRegister,
                            0b101 => LoadSignedBytePostImmediate,
                            _ => return Err(CpuError::UnknownInstruction(instr)),
                        },
                        0b1111 => match instr.get_bits(20..=22) {
                            0b001 => LoadSignedHalfwordPostRegister,
                            0b101 => LoadSignedHalfwordPostImmediate,
                            _ => return Err(CpuError::UnknownInstruction(instr)),
                        },
                        _ => unreachable!("bits 4 and 7 are both set"),
                    }
                } else {
                    // Data processing, operand shifted by register.
                    match instr.get_bits(21..=23) {
                        0b000 => AndShiftRegister,
                        0b001 => EorShiftRegister,
                        0b010 => SubShiftRegister,
                        0b011 => RsbShiftRegister,
                        0b100 => AddShiftRegister,
                        0b101 => AdcShiftRegister,
                        0b110 => SbcShiftRegister,
                        _ => RscShiftRegister,
                    }
                }
            } else {
                // Data processing, operand shifted by immediate.
                match instr.get_bits(21..=23) {
                    0b000 => AndShiftImmediate,
                    0b001 => EorShiftImmediate,
                    0b010 => SubShiftImmediate,
                    0b011 => RsbShiftImmediate,
                    0b100 => AddShiftImmediate,
                    0b101 => AdcShiftImmediate,
                    0b110 => SbcShiftImmediate,
                    _ => RscShiftImmediate,
                }
            }
        }
        0b0001 => {
            if instr.get_bit(4) {
                if instr.get_bit(7) {
                    // Swap and pre-indexed halfword/signed loads.
                    match instr.get_bits(4..=7) {
                        0b1001 => SingleDataSwap,
                        0b1011 => match (instr.get_bit(20), instr.get_bit(22)) {
                            (false, false) => StoreHalfwordPreRegister,
                            (true, false) => LoadHalfwordPreRegister,
                            (false, true) => StoreHalfwordPreImmediate,
                            (true, true) => LoadHalfwordPreImmediate,
                        },
                        0b1101 => match (instr.get_bit(20), instr.get_bit(22)) {
                            (true, false) => LoadSignedBytePreRegister,
                            (true, true) => LoadSignedBytePreImmediate,
                            _ => return Err(CpuError::UnknownInstruction(instr)),
                        },
                        0b1111 => match (instr.get_bit(20), instr.get_bit(22)) {
                            (true, false) => LoadSignedHalfwordPreRegister,
                            (true, true) => LoadSignedHalfwordPreImmediate,
                            _ => return Err(CpuError::UnknownInstruction(instr)),
                        },
                        _ => unreachable!("bits 4 and 7 are both set"),
                    }
                } else {
                    // Comparison-class and logical ops shifted by register;
                    // BX shares the TEQ slot with S clear.
                    match instr.get_bits(21..=23) {
                        0b000 => TstShiftRegister,
                        0b001 => {
                            if instr.get_bit(20) {
                                TeqShiftRegister
                            } else {
                                BranchAndExchange
                            }
                        }
                        0b010 => CmpShiftRegister,
                        0b011 => CmnShiftRegister,
                        0b100 => OrrShiftRegister,
                        0b101 => MovShiftRegister,
                        0b110 => BicShiftRegister,
                        _ => MvnShiftRegister,
                    }
                }
            } else {
                // Status-register transfers occupy the S=0 comparison slots.
                match instr.get_bits(20..=23) {
                    0b0000 | 0b0100 => Mrs,
                    0b0010 | 0b0110 => MsrRegister,
                    0b0001 => TstShiftImmediate,
                    0b0011 => TeqShiftImmediate,
                    0b0101 => CmpShiftImmediate,
                    0b0111 => CmnShiftImmediate,
                    0b1000 | 0b1001 => OrrShiftImmediate,
                    0b1010 | 0b1011 => MovShiftImmediate,
                    0b1100 | 0b1101 => BicShiftImmediate,
                    _ => MvnShiftImmediate,
                }
            }
        }
        0b0010 => match instr.get_bits(21..=23) {
            0b000 => AndImmediate,
            0b001 => EorImmediate,
            0b010 => SubImmediate,
            0b011 => RsbImmediate,
            0b100 => AddImmediate,
            0b101 => AdcImmediate,
            0b110 => SbcImmediate,
            _ => RscImmediate,
        },
        0b0011 => match instr.get_bits(21..=23) {
            0b000 => TstImmediate,
            0b001 => {
                if instr.get_bit(20) {
                    TeqImmediate
                } else {
                    MsrImmediate
                }
            }
            0b010 => CmpImmediate,
            0b011 => {
                if instr.get_bit(20) {
                    CmnImmediate
                } else {
                    MsrImmediate
                }
            }
            0b100 => OrrImmediate,
            0b101 => MovImmediate,
            0b110 => BicImmediate,
            _ => MvnImmediate,
        },
        0b0100 | 0b0101 => SingleDataTransferImmediate,
        0b0110 | 0b0111 => SingleDataTransferRegister,
        0b1000 | 0b1001 => BlockDataTransfer,
        0b1010 | 0b1011 => Branch,
        0b1100 | 0b1101 => CoprocessorDataTransfer,
        0b1110 => {
            if instr.get_bit(4) {
                CoprocessorRegisterTransfer
            } else {
                CoprocessorDataOperation
            }
        }
        _ => SoftwareInterrupt,
    };
    Ok(opcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// One encoding pattern per slot. Bit 31 is the leftmost character;
    /// `0`/`1` are the bits the decoder keys on, letters are free fields.
    /// Underscores are padding.
    const PATTERNS: [(&str, ArmOpcode); 79] = [
        ("cccc_0000_1uas_nnnn_dddd_ssss_1001_mmmm", ArmOpcode::MultiplyLong),
        ("cccc_0000_00as_nnnn_dddd_ssss_1001_mmmm", ArmOpcode::Multiply),
        ("cccc_0000_u000_nnnn_dddd_yyyy_1011_mmmm", ArmOpcode::StoreHalfwordPostRegister),
        ("cccc_0000_u001_nnnn_dddd_yyyy_1011_mmmm", ArmOpcode::LoadHalfwordPostRegister),
        ("cccc_0000_u100_nnnn_dddd_iiii_1011_iiii", ArmOpcode::StoreHalfwordPostImmediate),
        ("cccc_0000_u101_nnnn_dddd_iiii_1011_iiii", ArmOpcode::LoadHalfwordPostImmediate),
        ("cccc_0000_u001_nnnn_dddd_yyyy_1101_mmmm", ArmOpcode::LoadSignedBytePostRegister),
        ("cccc_0000_u101_nnnn_dddd_iiii_1101_iiii", ArmOpcode::LoadSignedBytePostImmediate),
        ("cccc_0000_u001_nnnn_dddd_yyyy_1111_mmmm", ArmOpcode::LoadSignedHalfwordPostRegister),
        ("cccc_0000_u101_nnnn_dddd_iiii_1111_iiii", ArmOpcode::LoadSignedHalfwordPostImmediate),
        ("cccc_0000_000s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::AndShiftRegister),
        ("cccc_0000_001s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::EorShiftRegister),
        ("cccc_0000_010s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::SubShiftRegister),
        ("cccc_0000_011s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::RsbShiftRegister),
        ("cccc_0000_100s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::AddShiftRegister),
        ("cccc_0000_101s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::AdcShiftRegister),
        ("cccc_0000_110s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::SbcShiftRegister),
        ("cccc_0000_111s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::RscShiftRegister),
        ("cccc_0000_000s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::AndShiftImmediate),
        ("cccc_0000_001s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::EorShiftImmediate),
        ("cccc_0000_010s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::SubShiftImmediate),
        ("cccc_0000_011s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::RsbShiftImmediate),
        ("cccc_0000_100s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::AddShiftImmediate),
        ("cccc_0000_101s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::AdcShiftImmediate),
        ("cccc_0000_110s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::SbcShiftImmediate),
        ("cccc_0000_111s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::RscShiftImmediate),
        ("cccc_0001_000s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::TstShiftRegister),
        ("cccc_0001_0011_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::TeqShiftRegister),
        ("cccc_0001_0010_ffff_ffff_ffff_0tt1_mmmm", ArmOpcode::BranchAndExchange),
        ("cccc_0001_010s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::CmpShiftRegister),
        ("cccc_0001_011s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::CmnShiftRegister),
        ("cccc_0001_100s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::OrrShiftRegister),
        ("cccc_0001_101s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::MovShiftRegister),
        ("cccc_0001_110s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::BicShiftRegister),
        ("cccc_0001_111s_nnnn_dddd_rrrr_0tt1_mmmm", ArmOpcode::MvnShiftRegister),
        ("cccc_0001_ffff_nnnn_dddd_yyyy_1001_mmmm", ArmOpcode::SingleDataSwap),
        ("cccc_0001_u0w0_nnnn_dddd_yyyy_1011_mmmm", ArmOpcode::StoreHalfwordPreRegister),
        ("cccc_0001_u0w1_nnnn_dddd_yyyy_1011_mmmm", ArmOpcode::LoadHalfwordPreRegister),
        ("cccc_0001_u1w0_nnnn_dddd_iiii_1011_iiii", ArmOpcode::StoreHalfwordPreImmediate),
        ("cccc_0001_u1w1_nnnn_dddd_iiii_1011_iiii", ArmOpcode::LoadHalfwordPreImmediate),
        ("cccc_0001_u0w1_nnnn_dddd_yyyy_1101_mmmm", ArmOpcode::LoadSignedBytePreRegister),
        ("cccc_0001_u1w1_nnnn_dddd_iiii_1101_iiii", ArmOpcode::LoadSignedBytePreImmediate),
        ("cccc_0001_u0w1_nnnn_dddd_yyyy_1111_mmmm", ArmOpcode::LoadSignedHalfwordPreRegister),
        ("cccc_0001_u1w1_nnnn_dddd_iiii_1111_iiii", ArmOpcode::LoadSignedHalfwordPreImmediate),
        ("cccc_0001_0d00_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::Mrs),
        ("cccc_0001_0d10_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::MsrRegister),
        ("cccc_0001_0001_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::TstShiftImmediate),
        ("cccc_0001_0011_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::TeqShiftImmediate),
        ("cccc_0001_0101_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::CmpShiftImmediate),
        ("cccc_0001_0111_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::CmnShiftImmediate),
        ("cccc_0001_100s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::OrrShiftImmediate),
        ("cccc_0001_101s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::MovShiftImmediate),
        ("cccc_0001_110s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::BicShiftImmediate),
        ("cccc_0001_111s_nnnn_dddd_iiii_itt0_mmmm", ArmOpcode::MvnShiftImmediate),
        ("cccc_0010_000s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::AndImmediate),
        ("cccc_0010_001s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::EorImmediate),
        ("cccc_0010_010s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::SubImmediate),
        ("cccc_0010_011s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::RsbImmediate),
        ("cccc_0010_100s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::AddImmediate),
        ("cccc_0010_101s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::AdcImmediate),
        ("cccc_0010_110s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::SbcImmediate),
        ("cccc_0010_111s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::RscImmediate),
        ("cccc_0011_000s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::TstImmediate),
        ("cccc_0011_0d10_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::MsrImmediate),
        ("cccc_0011_0011_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::TeqImmediate),
        ("cccc_0011_010s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::CmpImmediate),
        ("cccc_0011_0111_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::CmnImmediate),
        ("cccc_0011_100s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::OrrImmediate),
        ("cccc_0011_101s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::MovImmediate),
        ("cccc_0011_110s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::BicImmediate),
        ("cccc_0011_111s_nnnn_dddd_rrrr_iiii_iiii", ArmOpcode::MvnImmediate),
        ("cccc_010p_ubwl_nnnn_dddd_iiii_iiii_iiii", ArmOpcode::SingleDataTransferImmediate),
        ("cccc_011p_ubwl_nnnn_dddd_iiii_ittt_mmmm", ArmOpcode::SingleDataTransferRegister),
        ("cccc_100p_uswl_nnnn_rrrr_rrrr_rrrr_rrrr", ArmOpcode::BlockDataTransfer),
        ("cccc_101l_oooo_oooo_oooo_oooo_oooo_oooo", ArmOpcode::Branch),
        ("cccc_110p_unwl_nnnn_dddd_pppp_oooo_oooo", ArmOpcode::CoprocessorDataTransfer),
        ("cccc_1110_oooo_nnnn_dddd_pppp_qqq0_mmmm", ArmOpcode::CoprocessorDataOperation),
        ("cccc_1110_oool_nnnn_dddd_pppp_qqq1_mmmm", ArmOpcode::CoprocessorRegisterTransfer),
        ("cccc_1111_iiii_iiii_iiii_iiii_iiii_iiii", ArmOpcode::SoftwareInterrupt),
    ];

    /// Builds a concrete word from a pattern, filling free fields with the
    /// given bit.
    fn instantiate(pattern: &str, fill: bool) -> u32 {
        let mut word = 0_u32;
        let mut bit = 32;
        for c in pattern.chars() {
            if c == '_' {
                continue;
            }
            bit -= 1;
            let value = match c {
                '0' => false,
                '1' => true,
                _ => fill,
            };
            word.set_bit(bit, value);
        }
        assert_eq!(bit, 0, "pattern must cover 32 bits: {pattern}");
        word
    }

    /// Two patterns overlap when no position fixes differing bits.
    fn overlap(a: &str, b: &str) -> bool {
        a.chars()
            .filter(|c| *c != '_')
            .zip(b.chars().filter(|c| *c != '_'))
            .all(|(x, y)| {
                !matches!((x, y), ('0', '1') | ('1', '0'))
            })
    }

    #[test]
    fn patterns_do_not_conflict() {
        for (i, (a, slot_a)) in PATTERNS.iter().enumerate() {
            for (b, slot_b) in PATTERNS.iter().skip(i + 1) {
                assert!(
                    !overlap(a, b),
                    "{slot_a:?} and {slot_b:?} overlap:\n  {a}\n  {b}"
                );
            }
        }
    }

    #[test]
    fn every_pattern_decodes_to_its_slot() {
        for (pattern, slot) in PATTERNS {
            for fill in [false, true] {
                let word = instantiate(pattern, fill);
                assert_eq!(
                    decode(word),
                    Ok(slot),
                    "pattern {pattern} (fill={fill}) as {word:#010X}"
                );
            }
        }
    }

    #[test]
    fn decode_is_deterministic() {
        let word = 0xE3A0_0005;
        assert_eq!(decode(word), decode(word));
        assert_eq!(decode(word), Ok(ArmOpcode::MovImmediate));
    }

    #[test]
    fn spot_checks() {
        // MOV R0, #5
        assert_eq!(decode(0xE3A0_0005), Ok(ArmOpcode::MovImmediate));
        // BX R1
        assert_eq!(decode(0xE12F_FF11), Ok(ArmOpcode::BranchAndExchange));
        // TEQ R15, R1, LSL R2 keeps the S bit set.
        assert_eq!(
            decode(0b1110_0001_0011_1111_0000_0010_0001_0001),
            Ok(ArmOpcode::TeqShiftRegister)
        );
        // MUL R1, R2, R3
        assert_eq!(
            decode(0b1110_0000_0000_0001_0000_0011_1001_0010),
            Ok(ArmOpcode::Multiply)
        );
        // UMULL R0, R1, R2, R3
        assert_eq!(
            decode(0b1110_0000_1000_0001_0000_0011_1001_0010),
            Ok(ArmOpcode::MultiplyLong)
        );
        // LDMIA R13!, {R0-R3}
        assert_eq!(
            decode(0b1110_1000_1011_1101_0000_0000_0000_1111),
            Ok(ArmOpcode::BlockDataTransfer)
        );
        // SWI #0
        assert_eq!(
            decode(0b1110_1111_0000_0000_0000_0000_0000_0000),
            Ok(ArmOpcode::SoftwareInterrupt)
        );
        // MSR CPSR_flg, #0xF0000000 occupies the S=0 TEQ-immediate slot.
        assert_eq!(
            decode(0b1110_0011_0010_1000_1111_0010_0000_1111),
            Ok(ArmOpcode::MsrImmediate)
        );
    }

    #[test]
    fn undefined_combinations_fail() {
        // Post-indexed halfword store with the writeback bit set.
        let word = 0b1110_0000_0010_0000_0000_0000_1011_0000;
        assert_eq!(decode(word), Err(CpuError::UnknownInstruction(word)));
        // Signed-byte "store" (L=0) has no encoding, post nor pre.
        let word = 0b1110_0000_0000_0000_0000_0000_1101_0000;
        assert_eq!(decode(word), Err(CpuError::UnknownInstruction(word)));
        let word = 0b1110_0001_0000_0000_0000_0000_1101_0000;
        assert_eq!(decode(word), Err(CpuError::UnknownInstruction(word)));
    }

    #[test]
    fn index_round_trip() {
        for (i, slot) in ArmOpcode::ALL.iter().enumerate() {
            assert_eq!(slot.index() as usize, i);
            assert_eq!(ArmOpcode::from_index(slot.index()), Ok(*slot));
        }
        assert_eq!(
            ArmOpcode::from_index(79),
            Err(CpuError::UnknownOpcodeIndex(79))
        );
    }
}
