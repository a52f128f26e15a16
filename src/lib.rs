//! A streaming IA-32 (x86, 16/32-bit legacy mode) machine-code instruction
//! decoder.
//!
//! The crate turns a byte stream into one [`DecodedInstruction`] at a time:
//! legacy prefixes, the one-byte opcode map, the `0x0F` two-byte escape map,
//! the x87 `ESC` maps and the nine ModR/M "group" sub-tables. It does not
//! render assembly text, load object-file formats, or reconstruct control
//! flow; those are left to callers built on top of it.
//!
//! ```
//! use ia32_decode::{ByteStream, Decoder, SliceStream, Width};
//!
//! let decoder = Decoder::new(Width::Bits32);
//! let mut source = SliceStream::new(&[0x90], 0x1000);
//! let insn = decoder.disassemble(&mut source).unwrap();
//! assert_eq!(insn.opcode.name(), "nop");
//! assert_eq!(insn.length, 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
pub(crate) use std::{boxed::Box, vec::Vec};

#[cfg(all(feature = "alloc", not(feature = "std")))]
pub(crate) use alloc::{boxed::Box, vec::Vec};

mod byte_stream;
mod context;
mod instruction;
mod mnemonic;
mod modrm;
mod operand;
mod prefix;
mod register;
mod segment;
mod status;
mod tables;
mod width;

pub use byte_stream::{ByteStream, SliceStream};
pub use instruction::{DecodedInstruction, RepeatMode};
pub use mnemonic::Mnemonic;
pub use operand::{DataSize, Operand};
pub use register::Register;
pub use segment::Segment;
pub use status::{DecodeError, DecodeErrorKind, Result};
pub use width::Width;

use context::DecodeContext;

/// Decodes one [`DecodedInstruction`] at a time from a [`ByteStream`].
///
/// A `Decoder` carries exactly one piece of state: the default operand and
/// address width new instructions start from, before any `0x66`/`0x67`
/// override is applied. It holds nothing stream-specific, so the same
/// `Decoder` can freely be reused, shared across threads, or used to
/// decode several independent streams at different default widths.
#[derive(Clone, Copy, Debug)]
pub struct Decoder {
    default_width: Width,
}

impl Decoder {
    /// Creates a decoder whose instructions start at `default_width` unless
    /// overridden by a `0x66`/`0x67` prefix.
    pub fn new(default_width: Width) -> Decoder {
        Decoder { default_width }
    }

    /// Decodes a single instruction starting at `source`'s current
    /// position.
    ///
    /// On success, `source` has advanced by exactly
    /// [`DecodedInstruction::length`] bytes. On failure, `source` has been
    /// advanced by however many bytes were consumed before the error was
    /// detected; the decoder does not rewind, so a failed call should not
    /// be retried against the same stream.
    pub fn disassemble(&self, source: &mut dyn ByteStream) -> Result<DecodedInstruction> {
        let start = source.current_address();
        let mut ctx = DecodeContext::new(self.default_width, start);
        let opcode_byte = prefix::collect(&mut ctx, source)?;
        tables::primary::dispatch(&mut ctx, source, opcode_byte)?;
        ctx.finish()
    }

    /// Returns an iterator that decodes successive instructions from
    /// `source` until the stream is exhausted or a decode error occurs.
    ///
    /// The iterator stops (returning `None`) on a `Truncated` error, since
    /// that's the expected way a well-formed buffer ends; any other error
    /// is yielded once as `Some(Err(..))` and then the iterator stops.
    pub fn disassemble_all<'d, 's>(&'d self, source: &'s mut dyn ByteStream) -> InstructionIterator<'d, 's> {
        InstructionIterator {
            decoder: self,
            source,
            done: false,
        }
    }
}

/// Iterator over successive instructions decoded from a single
/// [`ByteStream`], returned by [`Decoder::disassemble_all`].
pub struct InstructionIterator<'d, 's> {
    decoder: &'d Decoder,
    source: &'s mut dyn ByteStream,
    done: bool,
}

impl<'d, 's> Iterator for InstructionIterator<'d, 's> {
    type Item = Result<DecodedInstruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.disassemble(self.source) {
            Ok(insn) => Some(Ok(insn)),
            Err(e) if e.kind() == DecodeErrorKind::Truncated => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
