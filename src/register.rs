//! Register operands.

use crate::status::{decode_error, DecodeError};
use crate::width::Width;

/// A general-purpose, control or debug register.
///
/// Covers the IA-32 GPRs at all three encodable widths (`AL`..`DIL` width
/// here is always the legacy byte set, never REX-extended), plus `CR0`-
/// `CR3` and `DR0`-`DR7`. 64-bit registers, `CR4`+ and the SSE/AVX register
/// files are out of scope (Non-goals).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Register {
    Al,
    Cl,
    Dl,
    Bl,
    Ah,
    Ch,
    Dh,
    Bh,

    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,

    Eax,
    Ecx,
    Edx,
    Ebx,
    Esp,
    Ebp,
    Esi,
    Edi,

    Cr0,
    Cr1,
    Cr2,
    Cr3,

    Dr0,
    Dr1,
    Dr2,
    Dr3,
    Dr4,
    Dr5,
    Dr6,
    Dr7,
}

const GPR8: [Register; 8] = [
    Register::Al,
    Register::Cl,
    Register::Dl,
    Register::Bl,
    Register::Ah,
    Register::Ch,
    Register::Dh,
    Register::Bh,
];

const GPR16: [Register; 8] = [
    Register::Ax,
    Register::Cx,
    Register::Dx,
    Register::Bx,
    Register::Sp,
    Register::Bp,
    Register::Si,
    Register::Di,
];

const GPR32: [Register; 8] = [
    Register::Eax,
    Register::Ecx,
    Register::Edx,
    Register::Ebx,
    Register::Esp,
    Register::Ebp,
    Register::Esi,
    Register::Edi,
];

const DEBUG: [Register; 8] = [
    Register::Dr0,
    Register::Dr1,
    Register::Dr2,
    Register::Dr3,
    Register::Dr4,
    Register::Dr5,
    Register::Dr6,
    Register::Dr7,
];

impl Register {
    /// Decodes a three-bit register-index field at byte width (`AL`..`BH`).
    pub(crate) fn gpr8(index: u8) -> Register {
        GPR8[(index & 0b111) as usize]
    }

    /// Decodes a three-bit register-index field at the given effective
    /// operand width.
    pub(crate) fn gpr(index: u8, width: Width) -> Register {
        let idx = (index & 0b111) as usize;
        match width {
            Width::Bits16 => GPR16[idx],
            Width::Bits32 => GPR32[idx],
        }
    }

    /// Decodes a two-bit control-register field (`CR0`-`CR3`).
    ///
    /// `CR4` and above are out of scope for the legacy decoder; an
    /// out-of-range `reg` field raises `invalid control register`.
    pub(crate) fn control(index: u8) -> Result<Register, DecodeError> {
        match index {
            0 => Ok(Register::Cr0),
            1 => Ok(Register::Cr1),
            2 => Ok(Register::Cr2),
            3 => Ok(Register::Cr3),
            _ => Err(decode_error!(
                InvalidControlRegister,
                "invalid control register"
            )),
        }
    }

    /// Decodes a three-bit debug-register field (`DR0`-`DR7`).
    pub(crate) fn debug(index: u8) -> Register {
        DEBUG[(index & 0b111) as usize]
    }

    /// The effective width of this register, in bits.
    pub fn width(self) -> u16 {
        use Register::*;
        match self {
            Al | Cl | Dl | Bl | Ah | Ch | Dh | Bh => 8,
            Ax | Cx | Dx | Bx | Sp | Bp | Si | Di => 16,
            Eax | Ecx | Edx | Ebx | Esp | Ebp | Esi | Edi => 32,
            Cr0 | Cr1 | Cr2 | Cr3 => 32,
            Dr0 | Dr1 | Dr2 | Dr3 | Dr4 | Dr5 | Dr6 | Dr7 => 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr8_wraps_at_eight_entries() {
        assert_eq!(Register::gpr8(0), Register::Al);
        assert_eq!(Register::gpr8(7), Register::Bh);
        assert_eq!(Register::gpr8(8), Register::Al);
    }

    #[test]
    fn gpr_picks_table_by_width() {
        assert_eq!(Register::gpr(3, Width::Bits16), Register::Bx);
        assert_eq!(Register::gpr(3, Width::Bits32), Register::Ebx);
    }

    #[test]
    fn control_register_rejects_out_of_range_index() {
        assert_eq!(Register::control(3).unwrap(), Register::Cr3);
        let err = Register::control(4).unwrap_err();
        assert_eq!(err.kind(), crate::status::DecodeErrorKind::InvalidControlRegister);
    }

    #[test]
    fn debug_register_table_lookup() {
        assert_eq!(Register::debug(6), Register::Dr6);
    }

    #[test]
    fn width_reports_bits_per_class() {
        assert_eq!(Register::Al.width(), 8);
        assert_eq!(Register::Ax.width(), 16);
        assert_eq!(Register::Eax.width(), 32);
        assert_eq!(Register::Cr0.width(), 32);
    }
}
