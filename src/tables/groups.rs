//! The nine ModR/M-`reg`-keyed "group" sub-tables (component E, §4.5).

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::mnemonic::Mnemonic;
use crate::modrm::{self, ModRm, RmOptions};
use crate::operand::DataSize;
use crate::status::{decode_error, Result};
use crate::width::Width;

/// Group 1: the shared `ADD/OR/ADC/SBB/AND/SUB/XOR/CMP` reg-field mapping
/// used by opcodes `80`/`81`/`83`. All eight cells are allocated.
pub(crate) fn group1_mnemonic(reg: u8) -> Mnemonic {
    match reg {
        0 => Mnemonic::Add,
        1 => Mnemonic::Or,
        2 => Mnemonic::Adc,
        3 => Mnemonic::Sbb,
        4 => Mnemonic::And,
        5 => Mnemonic::Sub,
        6 => Mnemonic::Xor,
        7 => Mnemonic::Cmp,
        _ => unreachable!("reg is a 3-bit field"),
    }
}

/// Group 2: shift/rotate reg-field mapping used by `C0`/`C1`/`D0`-`D3`.
/// Cell 6 is unallocated.
pub(crate) fn group2_mnemonic(reg: u8) -> Result<Mnemonic> {
    Ok(match reg {
        0 => Mnemonic::Rol,
        1 => Mnemonic::Ror,
        2 => Mnemonic::Rcl,
        3 => Mnemonic::Rcr,
        4 => Mnemonic::Shl,
        5 => Mnemonic::Shr,
        7 => Mnemonic::Sar,
        _ => return Err(decode_error!(InvalidOpcode, "unallocated group 2 cell")),
    })
}

/// Group 3: unary `F6`/`F7` reg-field mapping. Cell 1 is unallocated; cell
/// 0 (`TEST`) additionally reads an immediate, handled by the caller.
pub(crate) fn group3_mnemonic(reg: u8) -> Result<Mnemonic> {
    Ok(match reg {
        0 => Mnemonic::Test,
        2 => Mnemonic::Not,
        3 => Mnemonic::Neg,
        4 => Mnemonic::Mul,
        5 => Mnemonic::Imul,
        6 => Mnemonic::Div,
        7 => Mnemonic::Idiv,
        _ => return Err(decode_error!(InvalidOpcode, "unallocated group 3 cell")),
    })
}

/// Group 4: `FE /r` reg-field mapping. Only `INC`/`DEC` are allocated.
pub(crate) fn group4_mnemonic(reg: u8) -> Result<Mnemonic> {
    Ok(match reg {
        0 => Mnemonic::Inc,
        1 => Mnemonic::Dec,
        _ => return Err(decode_error!(InvalidOpcode, "unallocated group 4 cell")),
    })
}

/// Group 5: `FF /r`. Operand shapes differ per cell (register/memory
/// `Ev` for `INC`/`DEC`/near `CALL`/`JMP`/`PUSH`, memory-only far pointer
/// for far `CALL`/`JMP`), so the whole group is decoded here rather than
/// factored through a shared reg-field table.
pub(crate) fn group5(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, modrm: ModRm) -> Result<()> {
    let width = ctx.operand_size;
    match modrm.reg {
        0 => {
            ctx.set_opcode(Mnemonic::Inc);
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        1 => {
            ctx.set_opcode(Mnemonic::Dec);
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        2 => {
            ctx.set_opcode(Mnemonic::Call);
            ctx.set_near(true);
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        3 => {
            ctx.set_opcode(Mnemonic::Call);
            ctx.set_near(false);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                width,
                RmOptions::memory(far_data_size(width)),
            )?;
            ctx.push_operand(rm)
        }
        4 => {
            ctx.set_opcode(Mnemonic::Jmp);
            ctx.set_near(true);
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        5 => {
            ctx.set_opcode(Mnemonic::Jmp);
            ctx.set_near(false);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                width,
                RmOptions::memory(far_data_size(width)),
            )?;
            ctx.push_operand(rm)
        }
        6 => {
            ctx.set_opcode(Mnemonic::Push);
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        _ => Err(decode_error!(InvalidOpcode, "unallocated group 5 cell")),
    }
}

/// Group 1A: `8F /0`, `POP Ev`. Reg field 0 is the only allocated cell.
pub(crate) fn group1a(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, modrm: ModRm) -> Result<()> {
    if modrm.reg != 0 {
        return Err(decode_error!(InvalidOpcode, "unallocated group 1a cell"));
    }
    ctx.set_opcode(Mnemonic::Pop);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
    ctx.push_operand(rm)
}

/// Group 6: `0F 00 /r`, `Ew`. Reg field 1 is `STR` (store task register)
/// and reg field 2 is `LLDT`, distinct from Group 7's `SIDT`/`LGDT` at
/// the same reg values.
pub(crate) fn group6(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, modrm: ModRm) -> Result<()> {
    let mnemonic = match modrm.reg {
        0 => Mnemonic::Sldt,
        1 => Mnemonic::Str,
        2 => Mnemonic::Lldt,
        3 => Mnemonic::Ltr,
        4 => Mnemonic::Verr,
        5 => Mnemonic::Verw,
        _ => return Err(decode_error!(InvalidOpcode, "unallocated group 6 cell")),
    };
    ctx.set_opcode(mnemonic);
    let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
    ctx.push_operand(rm)
}

/// Group 7: `0F 01 /r`, `Ms`/`Ew`. `SMSW` additionally allows a register
/// destination; the rest are memory-only descriptor-table forms.
pub(crate) fn group7(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, modrm: ModRm) -> Result<()> {
    match modrm.reg {
        0 => {
            ctx.set_opcode(Mnemonic::Sgdt);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                Width::Bits16,
                RmOptions::memory(DataSize::PseudoDescriptor6),
            )?;
            ctx.push_operand(rm)
        }
        1 => {
            ctx.set_opcode(Mnemonic::Sidt);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                Width::Bits16,
                RmOptions::memory(DataSize::PseudoDescriptor6),
            )?;
            ctx.push_operand(rm)
        }
        2 => {
            ctx.set_opcode(Mnemonic::Lgdt);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                Width::Bits16,
                RmOptions::memory(DataSize::PseudoDescriptor6),
            )?;
            ctx.push_operand(rm)
        }
        3 => {
            ctx.set_opcode(Mnemonic::Lidt);
            let rm = modrm::decode_rm(
                ctx,
                stream,
                modrm,
                Width::Bits16,
                RmOptions::memory(DataSize::PseudoDescriptor6),
            )?;
            ctx.push_operand(rm)
        }
        4 => {
            ctx.set_opcode(Mnemonic::Smsw);
            let width = ctx.operand_size;
            let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
            ctx.push_operand(rm)
        }
        6 => {
            ctx.set_opcode(Mnemonic::Lmsw);
            let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
            ctx.push_operand(rm)
        }
        _ => Err(decode_error!(InvalidOpcode, "unallocated group 7 cell")),
    }
}

/// Group 8: `0F BA /r, Ib`, `Ev, Ib`. Cells 0-3 are unallocated.
pub(crate) fn group8(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, modrm: ModRm) -> Result<()> {
    let mnemonic = match modrm.reg {
        4 => Mnemonic::Bt,
        5 => Mnemonic::Bts,
        6 => Mnemonic::Btr,
        7 => Mnemonic::Btc,
        _ => return Err(decode_error!(InvalidOpcode, "unallocated group 8 cell")),
    };
    ctx.set_opcode(mnemonic);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(data_size(width)))?;
    ctx.push_operand(rm)?;
    let imm = ctx.read_i8(stream)? as i64;
    ctx.push_operand(crate::operand::Operand::Immediate {
        value: imm,
        size: DataSize::Byte,
    })
}

pub(crate) fn data_size(width: Width) -> DataSize {
    match width {
        Width::Bits16 => DataSize::Word,
        Width::Bits32 => DataSize::Dword,
    }
}

pub(crate) fn far_data_size(width: Width) -> DataSize {
    match width {
        Width::Bits16 => DataSize::Far16,
        Width::Bits32 => DataSize::Far32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::SliceStream;

    #[test]
    fn group1_covers_all_eight_cells() {
        assert_eq!(group1_mnemonic(0), Mnemonic::Add);
        assert_eq!(group1_mnemonic(7), Mnemonic::Cmp);
    }

    #[test]
    fn group2_cell_six_is_unallocated() {
        assert!(group2_mnemonic(5).is_ok());
        let err = group2_mnemonic(6).unwrap_err();
        assert_eq!(err.kind(), crate::status::DecodeErrorKind::InvalidOpcode);
    }

    #[test]
    fn group3_cell_one_is_unallocated() {
        assert_eq!(group3_mnemonic(0).unwrap(), Mnemonic::Test);
        assert!(group3_mnemonic(1).is_err());
    }

    #[test]
    fn group4_only_inc_dec_allocated() {
        assert_eq!(group4_mnemonic(0).unwrap(), Mnemonic::Inc);
        assert_eq!(group4_mnemonic(1).unwrap(), Mnemonic::Dec);
        assert!(group4_mnemonic(2).is_err());
    }

    #[test]
    fn group5_reg_two_is_near_call_register_form() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(&[], 0);
        let modrm = ModRm { md: 0b11, reg: 2, rm: 0 };
        group5(&mut ctx, &mut stream, modrm).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Call);
        assert!(ctx.near);
    }

    #[test]
    fn group7_reg_four_smsw_allows_register_destination() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(&[], 0);
        let modrm = ModRm { md: 0b11, reg: 4, rm: 0 };
        group7(&mut ctx, &mut stream, modrm).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Smsw);
    }

    #[test]
    fn group8_reads_trailing_immediate_byte() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(&[0x05], 0);
        let modrm = ModRm { md: 0b11, reg: 4, rm: 0 }; // BT Ev, Ib
        group8(&mut ctx, &mut stream, modrm).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Bt);
        assert_eq!(ctx.operand_count(), 2);
    }
}
