//! The two operand/address widths the legacy decoder ever operates in.

/// An effective operand or address width.
///
/// IA-32 never decodes at any width other than these two; the decoder
/// construction parameter and the per-instruction effective sizes all live
/// in this type (invariant I1 of the decode context).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Width {
    /// 16-bit.
    Bits16,
    /// 32-bit.
    Bits32,
}

impl Width {
    /// Toggles between the two widths, as the `0x66`/`0x67` override
    /// prefixes do.
    pub(crate) fn toggled(self) -> Width {
        match self {
            Width::Bits16 => Width::Bits32,
            Width::Bits32 => Width::Bits16,
        }
    }

    /// The width, in bits.
    pub fn bits(self) -> u16 {
        match self {
            Width::Bits16 => 16,
            Width::Bits32 => 32,
        }
    }
}
