//! The byte-source adapter interface.

use crate::status::{decode_error, Result};

/// The decoder's only collaborator: a single-pass source of bytes that also
/// reports its current address, so that relative operands can be rebased by
/// the caller.
///
/// The decoder never peeks, it calls [`next_byte`](ByteStream::next_byte)
/// exactly once per byte it consumes, in order, and never re-reads a byte
/// once returned. Reading past the end of the underlying data is reported
/// as a `Truncated` [`crate::DecodeError`] by the implementation.
pub trait ByteStream {
    /// Produces the next byte in the stream, advancing the stream's
    /// internal position.
    fn next_byte(&mut self) -> Result<u8>;

    /// The address of the byte that the *next* call to
    /// [`next_byte`](ByteStream::next_byte) will return.
    fn current_address(&self) -> u64;
}

/// A minimal [`ByteStream`] over an in-memory slice.
///
/// This is the one concrete adapter the crate ships; it exists so the
/// decoder is independently testable and usable for the common case of
/// "I already have the bytes in memory". Richer adapters (memory-mapped
/// files, live process memory, section readers) are the caller's concern.
#[derive(Clone, Copy, Debug)]
pub struct SliceStream<'a> {
    bytes: &'a [u8],
    position: usize,
    base_address: u64,
}

impl<'a> SliceStream<'a> {
    /// Creates a stream over `bytes`, reporting `base_address` as the
    /// address of `bytes[0]`.
    pub fn new(bytes: &'a [u8], base_address: u64) -> Self {
        SliceStream {
            bytes,
            position: 0,
            base_address,
        }
    }

    /// The number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// The bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }
}

impl<'a> ByteStream for SliceStream<'a> {
    fn next_byte(&mut self) -> Result<u8> {
        match self.bytes.get(self.position) {
            Some(&byte) => {
                self.position += 1;
                Ok(byte)
            }
            None => Err(decode_error!(Truncated, "truncated")),
        }
    }

    fn current_address(&self) -> u64 {
        self.base_address + self.position as u64
    }
}
