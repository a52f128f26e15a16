//! The prefix collector (component C, spec §4.2).

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::segment::Segment;
use crate::status::Result;

/// Reads legacy prefixes until a non-prefix byte arrives, folding each one
/// into `ctx`, then returns that byte (the primary opcode).
///
/// Each prefix category may only appear once; a repeat is rejected by the
/// `DecodeContext` setters themselves (invariant I3), so this loop just
/// keeps reading as long as the byte it sees is a recognized prefix.
pub(crate) fn collect(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<u8> {
    loop {
        let byte = ctx.read_byte(stream)?;
        match byte {
            0x26 => ctx.set_segment_override(Segment::Es)?,
            0x2E => ctx.set_segment_override(Segment::Cs)?,
            0x36 => ctx.set_segment_override(Segment::Ss)?,
            0x3E => ctx.set_segment_override(Segment::Ds)?,
            0x64 => ctx.set_segment_override(Segment::Fs)?,
            0x65 => ctx.set_segment_override(Segment::Gs)?,
            0x66 => ctx.set_operand_size_override()?,
            0x67 => ctx.set_address_size_override()?,
            0xF0 => ctx.set_locked()?,
            0xF2 => ctx.set_repeat_not_equal()?,
            0xF3 => ctx.set_repeat_equal()?,
            _ => return Ok(byte),
        }
    }
}
