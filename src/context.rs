//! Per-instruction mutable decode state (component B).

use bitflags::bitflags;

use crate::byte_stream::ByteStream;
use crate::instruction::{DecodedInstruction, RepeatMode};
use crate::mnemonic::Mnemonic;
use crate::operand::Operand;
use crate::segment::Segment;
use crate::status::{decode_error, Result};
use crate::width::Width;
use crate::Vec;

bitflags! {
    /// Tracks which one-shot prefix categories have already been seen, so
    /// the prefix collector can enforce invariant I3 ("each category may
    /// transition false -> true at most once").
    ///
    /// `LOCK`, `REPNE` and `REP`/`REPE` are modeled as three independent
    /// categories (as the prefix table in the spec enumerates them), even
    /// though on real hardware they share a single prefix group; the
    /// decoder only rejects a *repeated* occurrence of the same byte
    /// category, not a mix of different ones.
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct SeenPrefixes: u8 {
        const OPERAND_SIZE = 1 << 0;
        const ADDRESS_SIZE = 1 << 1;
        const SEGMENT      = 1 << 2;
        const LOCK         = 1 << 3;
        const REPNE        = 1 << 4;
        const REPEAT_EQUAL = 1 << 5;
    }
}

/// Per-instruction mutable state threaded through the whole decode session.
///
/// Owned exclusively by a single `disassemble` call; reset at its start and
/// discarded at its end ("stack-allocated context owned by `disassemble`",
/// per the redesign notes).
pub(crate) struct DecodeContext {
    pub(crate) operand_size: Width,
    pub(crate) address_size: Width,
    pub(crate) segment_override: Option<Segment>,
    pub(crate) locked: bool,
    pub(crate) repeat: RepeatMode,
    pub(crate) near: bool,
    pub(crate) opcode: Mnemonic,
    operands: Vec<Operand>,
    modrm: Option<u8>,
    seen: SeenPrefixes,
    start_address: u64,
    bytes_read: u32,
}

impl DecodeContext {
    pub(crate) fn new(default_width: Width, start_address: u64) -> Self {
        DecodeContext {
            operand_size: default_width,
            address_size: default_width,
            segment_override: None,
            locked: false,
            repeat: RepeatMode::None,
            near: true,
            opcode: Mnemonic::Invalid,
            operands: Vec::with_capacity(3),
            modrm: None,
            seen: SeenPrefixes::empty(),
            start_address,
            bytes_read: 0,
        }
    }

    pub(crate) fn start_address(&self) -> u64 {
        self.start_address
    }

    pub(crate) fn length(&self) -> u32 {
        self.bytes_read
    }

    /// Reads the next raw byte from `stream`, bumping the consumed-length
    /// counter. Every byte the decoder consumes (prefix, opcode, ModR/M,
    /// SIB, displacement or immediate) goes through this one method.
    pub(crate) fn read_byte(&mut self, stream: &mut dyn ByteStream) -> Result<u8> {
        let byte = stream.next_byte()?;
        self.bytes_read += 1;
        Ok(byte)
    }

    fn read_u16(&mut self, stream: &mut dyn ByteStream) -> Result<u16> {
        let lo = self.read_byte(stream)? as u16;
        let hi = self.read_byte(stream)? as u16;
        Ok(lo | (hi << 8))
    }

    fn read_u32(&mut self, stream: &mut dyn ByteStream) -> Result<u32> {
        let lo = self.read_u16(stream)? as u32;
        let hi = self.read_u16(stream)? as u32;
        Ok(lo | (hi << 16))
    }

    pub(crate) fn read_i8(&mut self, stream: &mut dyn ByteStream) -> Result<i8> {
        Ok(self.read_byte(stream)? as i8)
    }

    pub(crate) fn read_i16(&mut self, stream: &mut dyn ByteStream) -> Result<i16> {
        Ok(self.read_u16(stream)? as i16)
    }

    pub(crate) fn read_i32(&mut self, stream: &mut dyn ByteStream) -> Result<i32> {
        Ok(self.read_u32(stream)? as i32)
    }

    pub(crate) fn read_u8(&mut self, stream: &mut dyn ByteStream) -> Result<u8> {
        self.read_byte(stream)
    }

    pub(crate) fn read_u16_value(&mut self, stream: &mut dyn ByteStream) -> Result<u16> {
        self.read_u16(stream)
    }

    pub(crate) fn read_u32_value(&mut self, stream: &mut dyn ByteStream) -> Result<u32> {
        self.read_u32(stream)
    }

    /// Reads an operand-size-dependent value (`Iz`/`Iv`/`Jv`): a 16-bit
    /// value under `Width::Bits16`, a 32-bit value under `Width::Bits32`,
    /// sign-extended into an `i64`.
    pub(crate) fn read_sized(&mut self, stream: &mut dyn ByteStream, width: Width) -> Result<i64> {
        match width {
            Width::Bits16 => Ok(self.read_i16(stream)? as i64),
            Width::Bits32 => Ok(self.read_i32(stream)? as i64),
        }
    }

    /// Reads the ModR/M byte on first demand and reuses the cached value
    /// thereafter (invariant I5).
    pub(crate) fn modrm(&mut self, stream: &mut dyn ByteStream) -> Result<u8> {
        if let Some(byte) = self.modrm {
            return Ok(byte);
        }
        let byte = self.read_byte(stream)?;
        self.modrm = Some(byte);
        Ok(byte)
    }

    /// `true` once the ModR/M byte has been consumed for this instruction.
    pub(crate) fn has_modrm(&self) -> bool {
        self.modrm.is_some()
    }

    pub(crate) fn set_opcode(&mut self, mnemonic: Mnemonic) {
        self.opcode = mnemonic;
    }

    pub(crate) fn set_near(&mut self, near: bool) {
        self.near = near;
    }

    /// Appends an operand, enforcing constraint C1 (at most three
    /// operands).
    pub(crate) fn push_operand(&mut self, operand: Operand) -> Result<()> {
        if self.operands.len() >= 3 {
            return Err(decode_error!(
                InvalidOpcode,
                "instruction pattern produced more than three operands"
            ));
        }
        self.operands.push(operand);
        Ok(())
    }

    pub(crate) fn operand_count(&self) -> usize {
        self.operands.len()
    }

    // -- prefix collector -----------------------------------------------

    pub(crate) fn set_operand_size_override(&mut self) -> Result<()> {
        self.mark_once(SeenPrefixes::OPERAND_SIZE, "multiple operand-size prefixes")?;
        self.operand_size = self.operand_size.toggled();
        Ok(())
    }

    pub(crate) fn set_address_size_override(&mut self) -> Result<()> {
        self.mark_once(SeenPrefixes::ADDRESS_SIZE, "multiple address-size prefixes")?;
        self.address_size = self.address_size.toggled();
        Ok(())
    }

    pub(crate) fn set_segment_override(&mut self, segment: Segment) -> Result<()> {
        self.mark_once(SeenPrefixes::SEGMENT, "multiple segment prefixes")?;
        self.segment_override = Some(segment);
        Ok(())
    }

    pub(crate) fn set_locked(&mut self) -> Result<()> {
        self.mark_once(SeenPrefixes::LOCK, "multiple LOCK prefixes")?;
        self.locked = true;
        Ok(())
    }

    pub(crate) fn set_repeat_not_equal(&mut self) -> Result<()> {
        self.mark_once(SeenPrefixes::REPNE, "multiple REPNE prefixes")?;
        self.repeat = RepeatMode::NotEqual;
        Ok(())
    }

    pub(crate) fn set_repeat_equal(&mut self) -> Result<()> {
        self.mark_once(SeenPrefixes::REPEAT_EQUAL, "multiple REP/REPE prefixes")?;
        self.repeat = RepeatMode::Equal;
        Ok(())
    }

    fn mark_once(&mut self, flag: SeenPrefixes, message: &'static str) -> Result<()> {
        if self.seen.contains(flag) {
            return Err(decode_error!(DuplicatePrefix, message));
        }
        self.seen.insert(flag);
        Ok(())
    }

    /// Validates and consumes the context into the finished operand list,
    /// enforcing constraints C2, C3 and C4.
    pub(crate) fn finish_operands(&mut self) -> Result<Vec<Operand>> {
        if self.locked {
            if let Some(first) = self.operands.first() {
                if first.is_bare_register() {
                    return Err(decode_error!(
                        IllegalLock,
                        "invalid use of LOCK prefix: register destination"
                    ));
                }
            }
            if !self.opcode.allows_lock() {
                return Err(decode_error!(
                    IllegalLock,
                    "invalid use of LOCK prefix: mnemonic does not support locking"
                ));
            }
        }

        match self.repeat {
            RepeatMode::None => {}
            RepeatMode::Equal => {
                if !self.opcode.allows_repeat_equal() {
                    return Err(decode_error!(
                        IllegalRepeat,
                        "invalid use of REP/REPE prefix"
                    ));
                }
            }
            RepeatMode::NotEqual => {
                if !self.opcode.allows_repeat_not_equal() {
                    return Err(decode_error!(IllegalRepeat, "invalid use of REPNE prefix"));
                }
            }
        }

        Ok(core::mem::take(&mut self.operands))
    }

    /// Validates the finished context and materialises the
    /// [`DecodedInstruction`] (invariant I4: `opcode` must not be
    /// `Invalid`).
    pub(crate) fn finish(mut self) -> Result<DecodedInstruction> {
        if self.opcode == Mnemonic::Invalid {
            return Err(decode_error!(InvalidOpcode, "invalid opcode"));
        }
        let operands = self.finish_operands()?;
        Ok(DecodedInstruction {
            address: self.start_address,
            length: self.bytes_read as u8,
            opcode: self.opcode,
            locked: self.locked,
            near: self.near,
            repeat: self.repeat,
            operands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::SliceStream;
    use crate::operand::Operand;

    fn new_ctx() -> DecodeContext {
        DecodeContext::new(Width::Bits32, 0)
    }

    #[test]
    fn repeated_prefix_category_is_rejected() {
        let mut ctx = new_ctx();
        ctx.set_operand_size_override().unwrap();
        let err = ctx.set_operand_size_override().unwrap_err();
        assert_eq!(err.kind(), crate::status::DecodeErrorKind::DuplicatePrefix);
    }

    #[test]
    fn operand_size_override_toggles_width() {
        let mut ctx = new_ctx();
        assert_eq!(ctx.operand_size, Width::Bits32);
        ctx.set_operand_size_override().unwrap();
        assert_eq!(ctx.operand_size, Width::Bits16);
    }

    #[test]
    fn more_than_three_operands_is_rejected() {
        let mut ctx = new_ctx();
        ctx.push_operand(Operand::Register(crate::register::Register::Al)).unwrap();
        ctx.push_operand(Operand::Register(crate::register::Register::Al)).unwrap();
        ctx.push_operand(Operand::Register(crate::register::Register::Al)).unwrap();
        let err = ctx.push_operand(Operand::Register(crate::register::Register::Al)).unwrap_err();
        assert_eq!(err.kind(), crate::status::DecodeErrorKind::InvalidOpcode);
    }

    #[test]
    fn modrm_byte_is_cached_across_calls() {
        let mut ctx = new_ctx();
        let mut stream = SliceStream::new(&[0xAB, 0xCD], 0);
        let first = ctx.modrm(&mut stream).unwrap();
        let second = ctx.modrm(&mut stream).unwrap();
        assert_eq!(first, 0xAB);
        assert_eq!(second, 0xAB);
        assert_eq!(stream.consumed(), 1);
    }

    #[test]
    fn read_sized_sign_extends_per_width() {
        let mut ctx = new_ctx();
        let mut stream = SliceStream::new(&[0xFF, 0xFF], 0);
        let value = ctx.read_sized(&mut stream, Width::Bits16).unwrap();
        assert_eq!(value, -1);
    }

    #[test]
    fn lock_requires_a_lockable_mnemonic() {
        let mut ctx = new_ctx();
        ctx.set_locked().unwrap();
        ctx.set_opcode(Mnemonic::Mov);
        ctx.push_operand(Operand::Register(crate::register::Register::Eax)).unwrap();
        let err = ctx.finish_operands().unwrap_err();
        assert_eq!(err.kind(), crate::status::DecodeErrorKind::IllegalLock);
    }
}
