//! The ModR/M + SIB decoder (component F).

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::operand::{DataSize, Operand};
use crate::register::Register;
use crate::segment::Segment;
use crate::status::{decode_error, DecodeError, Result};
use crate::width::Width;

/// `mod`/`reg`/`rm` split of a raw ModR/M byte.
#[derive(Clone, Copy)]
pub(crate) struct ModRm {
    pub(crate) md: u8,
    pub(crate) reg: u8,
    pub(crate) rm: u8,
}

impl ModRm {
    pub(crate) fn split(byte: u8) -> ModRm {
        ModRm {
            md: byte >> 6,
            reg: (byte >> 3) & 0b111,
            rm: byte & 0b111,
        }
    }

    pub(crate) fn is_register_form(self) -> bool {
        self.md == 0b11
    }
}

/// Reads (and caches) the ModR/M byte and splits it into its three fields.
pub(crate) fn read_modrm(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<ModRm> {
    let byte = ctx.modrm(stream)?;
    Ok(ModRm::split(byte))
}

/// Decodes the `reg` field as a GPR at the given width (`G`-operand).
pub(crate) fn reg_gpr(modrm: ModRm, width: Width) -> Operand {
    Operand::Register(Register::gpr(modrm.reg, width))
}

/// Decodes the `reg` field as a byte-width GPR (`Gb`).
pub(crate) fn reg_gpr8(modrm: ModRm) -> Operand {
    Operand::Register(Register::gpr8(modrm.reg))
}

/// Decodes the `reg` field as a segment register (`Sw`).
pub(crate) fn reg_segment(modrm: ModRm) -> Result<Operand> {
    Segment::from_sw(modrm.reg)
        .map(Operand::Segment)
        .ok_or_else(|| decode_error!(InvalidSegmentRegister, "invalid segment register"))
}

/// Decodes the `reg` field as a control register (`CR0`-`CR3`).
pub(crate) fn reg_control(modrm: ModRm) -> Result<Operand> {
    Register::control(modrm.reg).map(Operand::Register)
}

/// Decodes the `reg` field as a debug register (`DR0`-`DR7`).
pub(crate) fn reg_debug(modrm: ModRm) -> Operand {
    Operand::Register(Register::debug(modrm.reg))
}

/// Options for decoding the `r/m` side of a ModR/M byte (the `E`-operand),
/// independent of the register width used for the `mod == 3` case (that is
/// a separate parameter to [`decode_rm`]/[`decode_rm8`] since it differs by
/// call site: word/dword for most instructions, always-byte for the `Eb`
/// forms).
pub(crate) struct RmOptions {
    /// Access-width tag attached to the `Indirect` wrapper when a memory
    /// form is produced.
    pub(crate) data_size: DataSize,
    /// `MustBeMemory`: a register-direct form (`mod == 3`) is a decode
    /// error.
    pub(crate) must_be_memory: bool,
    /// `DontDereference`: return the computed address expression directly,
    /// without wrapping it in `Indirect` (used by `LEA` and far loads).
    /// Implies `must_be_memory`, since there is no address to compute for
    /// a register-direct form.
    pub(crate) dereference: bool,
}

impl RmOptions {
    pub(crate) fn memory(data_size: DataSize) -> Self {
        RmOptions {
            data_size,
            must_be_memory: true,
            dereference: true,
        }
    }

    pub(crate) fn either(data_size: DataSize) -> Self {
        RmOptions {
            data_size,
            must_be_memory: false,
            dereference: true,
        }
    }

    pub(crate) fn address_only() -> Self {
        RmOptions {
            data_size: DataSize::Dword,
            must_be_memory: true,
            dereference: false,
        }
    }
}

/// Decodes the `r/m` side of a ModR/M byte at word/dword register width
/// under the given options (component F's "modrmOperand" path).
pub(crate) fn decode_rm(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
    width: Width,
    opts: RmOptions,
) -> Result<Operand> {
    if modrm.is_register_form() {
        if opts.must_be_memory {
            return Err(decode_error!(ExpectedMemory, "expected memory operand"));
        }
        return Ok(Operand::Register(Register::gpr(modrm.rm, width)));
    }
    finish_memory(ctx, stream, modrm, opts)
}

/// As [`decode_rm`], but the `mod == 3` register form is always a byte GPR
/// (the `Eb` forms).
pub(crate) fn decode_rm8(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
    opts: RmOptions,
) -> Result<Operand> {
    if modrm.is_register_form() {
        if opts.must_be_memory {
            return Err(decode_error!(ExpectedMemory, "expected memory operand"));
        }
        return Ok(Operand::Register(Register::gpr8(modrm.rm)));
    }
    finish_memory(ctx, stream, modrm, opts)
}

fn finish_memory(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
    opts: RmOptions,
) -> Result<Operand> {
    let address = decode_memory_address(ctx, stream, modrm)?;

    if opts.dereference {
        Ok(Operand::indirect(
            address,
            opts.data_size,
            ctx.segment_override,
        ))
    } else {
        Ok(address)
    }
}

/// Materialises the address expression for a memory-form ModR/M, under the
/// current effective address size.
fn decode_memory_address(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
) -> Result<Operand> {
    match ctx.address_size {
        Width::Bits16 => decode_address_16(ctx, stream, modrm),
        Width::Bits32 => decode_address_32(ctx, stream, modrm),
    }
}

fn gpr32(index: u8) -> Operand {
    Operand::Register(Register::gpr(index, Width::Bits32))
}

fn gpr16(index: u8) -> Operand {
    Operand::Register(Register::gpr(index, Width::Bits16))
}

fn decode_address_16(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
) -> Result<Operand> {
    let mut address = match modrm.rm {
        0 => Some(Operand::addition(gpr16(3), gpr16(6))), // BX+SI
        1 => Some(Operand::addition(gpr16(3), gpr16(7))), // BX+DI
        2 => Some(Operand::addition(gpr16(5), gpr16(6))), // BP+SI
        3 => Some(Operand::addition(gpr16(5), gpr16(7))), // BP+DI
        4 => Some(gpr16(6)),                               // SI
        5 => Some(gpr16(7)),                               // DI
        6 => {
            if modrm.md == 0 {
                None // replaced by a 16-bit displacement below
            } else {
                Some(gpr16(5)) // BP
            }
        }
        7 => Some(gpr16(3)), // BX
        _ => unreachable!("rm is a 3-bit field"),
    };

    match modrm.md {
        0 => {
            if modrm.rm == 6 {
                let disp = ctx.read_i16(stream)? as i64;
                address = Some(displacement(disp, DataSize::Word));
            }
        }
        1 => {
            let disp = ctx.read_i8(stream)? as i64;
            address = Some(combine_with_displacement(address, disp, DataSize::Word));
        }
        2 => {
            let disp = ctx.read_i16(stream)? as i64;
            address = Some(combine_with_displacement(address, disp, DataSize::Word));
        }
        _ => unreachable!("mod == 3 handled by decode_rm"),
    }

    Ok(address.expect("16-bit address form always yields an expression"))
}

fn decode_address_32(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
) -> Result<Operand> {
    if modrm.rm == 4 {
        return decode_sib(ctx, stream, modrm.md);
    }

    if modrm.rm == 5 && modrm.md == 0 {
        let disp = ctx.read_i32(stream)? as i64;
        return Ok(displacement(disp, DataSize::Dword));
    }

    let mut address = gpr32(modrm.rm);

    match modrm.md {
        0 => {}
        1 => {
            let disp = ctx.read_i8(stream)? as i64;
            address = combine_with_displacement(Some(address), disp, DataSize::Dword);
        }
        2 => {
            let disp = ctx.read_i32(stream)? as i64;
            address = combine_with_displacement(Some(address), disp, DataSize::Dword);
        }
        _ => unreachable!("mod == 3 handled by decode_rm"),
    }

    Ok(address)
}

fn decode_sib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, md: u8) -> Result<Operand> {
    let byte = ctx.read_byte(stream)?;
    let scale_bits = byte >> 6;
    let index = (byte >> 3) & 0b111;
    let base = byte & 0b111;

    let index_expr = if index == 4 {
        None
    } else {
        Some(Operand::scale(gpr32(index), 1u8 << scale_bits))
    };

    if base != 5 {
        let base_expr = gpr32(base);
        let combined = match index_expr {
            Some(scaled) => Operand::addition(base_expr, scaled),
            None => base_expr,
        };

        return Ok(match md {
            0 => combined,
            1 => {
                let disp = ctx.read_i8(stream)? as i64;
                Operand::addition(combined, displacement(disp, DataSize::Byte))
            }
            2 => {
                let disp = ctx.read_i32(stream)? as i64;
                Operand::addition(combined, displacement(disp, DataSize::Dword))
            }
            _ => return Err(invalid_sib()),
        });
    }

    // `base == 5`: a bare EBP encoding is unavailable here, Intel instead
    // dedicates this SIB.base value to a mandatory displacement. Which
    // displacement width is read, and whether EBP still contributes as a
    // base register, is driven by the ModR/M `mod` field (not SIB's own
    // scale bits, despite how a literal reading of some specs phrases it):
    // mod==0 has no base register and a mandatory disp32; mod==1/2 use EBP
    // as the base register with the usual disp8/disp32 step.
    match md {
        0 => {
            let disp = ctx.read_i32(stream)? as i64;
            let disp_expr = displacement(disp, DataSize::Dword);
            Ok(match index_expr {
                Some(scaled) => Operand::addition(disp_expr, scaled),
                None => disp_expr,
            })
        }
        1 => {
            let base_expr = gpr32(5); // EBP
            let combined = match index_expr {
                Some(scaled) => Operand::addition(base_expr, scaled),
                None => base_expr,
            };
            let disp = ctx.read_i8(stream)? as i64;
            Ok(Operand::addition(combined, displacement(disp, DataSize::Byte)))
        }
        2 => {
            let base_expr = gpr32(5); // EBP
            let combined = match index_expr {
                Some(scaled) => Operand::addition(base_expr, scaled),
                None => base_expr,
            };
            let disp = ctx.read_i32(stream)? as i64;
            Ok(Operand::addition(combined, displacement(disp, DataSize::Dword)))
        }
        _ => Err(invalid_sib()),
    }
}

fn invalid_sib() -> DecodeError {
    decode_error!(InvalidSibByte, "invalid sib byte")
}

fn displacement(value: i64, size: DataSize) -> Operand {
    Operand::Immediate { value, size }
}

fn combine_with_displacement(base: Option<Operand>, disp: i64, size: DataSize) -> Operand {
    match base {
        Some(base) => Operand::addition(base, displacement(disp, size)),
        None => displacement(disp, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::SliceStream;
    use crate::width::Width;

    #[test]
    fn split_extracts_mod_reg_rm() {
        let modrm = ModRm::split(0b11_010_101);
        assert_eq!(modrm.md, 0b11);
        assert_eq!(modrm.reg, 0b010);
        assert_eq!(modrm.rm, 0b101);
        assert!(modrm.is_register_form());
    }

    #[test]
    fn address_16_bx_si_base_combination() {
        let mut ctx = DecodeContext::new(Width::Bits16, 0);
        let mut stream = SliceStream::new(&[], 0);
        let modrm = ModRm { md: 0, reg: 0, rm: 0 };
        let addr = decode_address_16(&mut ctx, &mut stream, modrm).unwrap();
        assert_eq!(
            addr,
            Operand::addition(
                Operand::Register(Register::Bx),
                Operand::Register(Register::Si),
            )
        );
    }

    #[test]
    fn address_16_disp16_only_when_mod_zero_rm_six() {
        let mut ctx = DecodeContext::new(Width::Bits16, 0);
        let mut stream = SliceStream::new(&[0x34, 0x12], 0);
        let modrm = ModRm { md: 0, reg: 0, rm: 6 };
        let addr = decode_address_16(&mut ctx, &mut stream, modrm).unwrap();
        assert_eq!(addr, Operand::Immediate { value: 0x1234, size: DataSize::Word });
    }

    #[test]
    fn sib_base_five_mod_zero_has_no_base_register() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        // SIB byte: scale=0, index=4 (none), base=5; followed by a disp32.
        let mut stream = SliceStream::new(&[0b00_100_101, 0x78, 0x56, 0x34, 0x12], 0);
        let addr = decode_sib(&mut ctx, &mut stream, 0).unwrap();
        assert_eq!(addr, Operand::Immediate { value: 0x12345678, size: DataSize::Dword });
    }

    #[test]
    fn sib_base_five_mod_one_uses_ebp_with_disp8() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        // SIB byte: scale=0, index=4 (none), base=5; followed by a disp8.
        let mut stream = SliceStream::new(&[0b00_100_101, 0x10], 0);
        let addr = decode_sib(&mut ctx, &mut stream, 1).unwrap();
        assert_eq!(
            addr,
            Operand::addition(
                Operand::Register(Register::Ebp),
                Operand::Immediate { value: 0x10, size: DataSize::Byte },
            )
        );
    }
}
