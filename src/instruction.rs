//! The decoded instruction output type.

use crate::mnemonic::Mnemonic;
use crate::operand::Operand;
use crate::Vec;

/// The string-repeat prefix in effect for an instruction, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatMode {
    None,
    /// `REP`/`REPE` (`0xF3`).
    Equal,
    /// `REPNE` (`0xF2`).
    NotEqual,
}

/// A single decoded IA-32 instruction.
///
/// Immutable after construction; produced exclusively by
/// [`crate::Decoder::disassemble`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedInstruction {
    /// The byte offset at which decoding began.
    pub address: u64,
    /// The number of bytes consumed from the stream to produce this
    /// instruction.
    pub length: u8,
    /// The decoded mnemonic. Never `Mnemonic::Invalid` (invariant I4).
    pub opcode: Mnemonic,
    /// Whether a legal `LOCK` prefix preceded the opcode.
    pub locked: bool,
    /// Distinguishes the near vs far variants of `RET`/`CALL`/`JMP`.
    pub near: bool,
    /// The string-repeat prefix in effect, if any.
    pub repeat: RepeatMode,
    /// The instruction's 0 to 3 operands, in encoding order.
    pub operands: Vec<Operand>,
}

impl DecodedInstruction {
    /// The number of operands (`0..=3`).
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }
}
