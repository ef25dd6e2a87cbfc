//! Two-valued instruction fields, each mapped from the single bit that
//! encodes it.

use serde::{Deserialize, Serialize};

/// When the offset is applied relative to the transfer (bit 24).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Indexing {
    /// Offset applied after the transfer; writeback is implicit.
    Post,
    /// Offset applied before the transfer; writeback only with the W bit.
    Pre,
}

impl From<bool> for Indexing {
    fn from(state: bool) -> Self {
        if state { Self::Pre } else { Self::Post }
    }
}

/// Offset direction (bit 23).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Offsetting {
    Down,
    Up,
}

impl From<bool> for Offsetting {
    fn from(state: bool) -> Self {
        if state { Self::Up } else { Self::Down }
    }
}

/// Transfer direction (bit 20).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum LoadStoreKind {
    Store,
    Load,
}

impl From<bool> for LoadStoreKind {
    fn from(state: bool) -> Self {
        if state { Self::Load } else { Self::Store }
    }
}

/// Transfer size of a single data transfer (bit 22).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum ReadWriteKind {
    Word,
    Byte,
}

impl From<bool> for ReadWriteKind {
    fn from(state: bool) -> Self {
        if state { Self::Byte } else { Self::Word }
    }
}

/// Origin of a second operand or transfer offset.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum OperandKind {
    Immediate,
    Register,
}

impl From<bool> for OperandKind {
    fn from(state: bool) -> Self {
        if state { Self::Immediate } else { Self::Register }
    }
}

/// Which halfword/signed transfer an encoding selects (SH bits plus L).
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum HalfwordKind {
    StoreHalfword,
    LoadHalfword,
    LoadSignedByte,
    LoadSignedHalfword,
}
