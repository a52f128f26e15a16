//! Error handling for the decoder.

use core::fmt;

/// A convenience alias for a `Result`, holding either a value or a
/// [`DecodeError`].
pub type Result<T> = core::result::Result<T, DecodeError>;

/// The programmatic discriminant of a [`DecodeError`].
///
/// Every fatal decode condition described by the decoder falls into exactly
/// one of these kinds, so callers can match on the kind instead of the
/// human-readable message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// The byte source was exhausted mid-instruction.
    Truncated,
    /// An unallocated primary, secondary or group opcode cell.
    InvalidOpcode,
    /// An impossible SIB scale/base combination (`base == 5`, `scale == 3`).
    InvalidSibByte,
    /// A legacy prefix category occurred twice before the opcode byte.
    DuplicatePrefix,
    /// A ModR/M operand that must be memory resolved to a register.
    ExpectedMemory,
    /// A ModR/M operand that must be a register resolved to memory.
    ExpectedRegister,
    /// `LOCK` preceded a mnemonic that does not support locking, or the
    /// destination operand under `LOCK` was a bare register.
    IllegalLock,
    /// `REP`/`REPE`/`REPNE` preceded a mnemonic outside the string-op subset
    /// that supports the given repeat kind.
    IllegalRepeat,
    /// A ModR/M/opcode register-index field was out of range.
    InvalidRegister,
    /// A ModR/M `reg` field used as a segment selector was out of range.
    InvalidSegmentRegister,
    /// A ModR/M `reg` field used as a control-register selector was out of
    /// range (only `CR0`-`CR3` are modeled).
    InvalidControlRegister,
}

/// A fatal error produced while decoding a single instruction.
///
/// Every invariant violation documented by the decoder raises exactly one
/// `DecodeError`; there is no retry and no partial result.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeError {
    kind: DecodeErrorKind,
    message: &'static str,
}

impl DecodeError {
    pub(crate) const fn new(kind: DecodeErrorKind, message: &'static str) -> Self {
        DecodeError { kind, message }
    }

    /// Returns the programmatic discriminant of this error.
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

macro_rules! decode_error {
    ($kind:ident, $message:expr) => {
        $crate::status::DecodeError::new($crate::status::DecodeErrorKind::$kind, $message)
    };
}

pub(crate) use decode_error;
