//! The `0x0F` two-byte escape map (component D, spec §4.4).

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::mnemonic::Mnemonic;
use crate::modrm::{self, RmOptions};
use crate::operand::{DataSize, Operand};
use crate::register::Register;
use crate::segment::Segment;
use crate::status::{decode_error, Result};
use crate::tables::groups;
use crate::width::Width;

use Mnemonic::*;

const JCC: [Mnemonic; 16] = [
    Jo, Jno, Jb, Jnb, Jz, Jnz, Jbe, Jnbe, Js, Jns, Jp, Jnp, Jl, Jnl, Jle, Jnle,
];

const SETCC: [Mnemonic; 16] = [
    Seto, Setno, Setb, Setnb, Setz, Setnz, Setbe, Setnbe, Sets, Setns, Setp, Setnp, Setl, Setnl,
    Setle, Setnle,
];

/// Dispatches the second byte of a `0x0F`-escaped opcode.
pub(crate) fn dispatch(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let byte = ctx.read_byte(stream)?;
    match byte {
        0x00 => {
            let modrm = modrm::read_modrm(ctx, stream)?;
            groups::group6(ctx, stream, modrm)
        }
        0x01 => {
            let modrm = modrm::read_modrm(ctx, stream)?;
            groups::group7(ctx, stream, modrm)
        }
        0x02 => lar_lsl(ctx, stream, Lar),
        0x03 => lar_lsl(ctx, stream, Lsl),
        0x06 => nullary(ctx, Clts),

        0x20 => mov_from_system_reg(ctx, stream, SystemReg::Control),
        0x21 => mov_from_system_reg(ctx, stream, SystemReg::Debug),
        0x22 => mov_to_system_reg(ctx, stream, SystemReg::Control),
        0x23 => mov_to_system_reg(ctx, stream, SystemReg::Debug),

        0x80..=0x8F => jcc_near(ctx, stream, byte - 0x80),
        0x90..=0x9F => setcc(ctx, stream, byte - 0x90),

        0xA0 => push_segment(ctx, Segment::Fs),
        0xA1 => pop_segment(ctx, Segment::Fs),
        0xA3 => bit_ev_gv(ctx, stream, Bt),
        0xA4 => shift_double_ib(ctx, stream, Shld),
        0xA5 => shift_double_cl(ctx, stream, Shld),
        0xAB => bit_ev_gv(ctx, stream, Bts),
        0xAF => gv_ev(ctx, stream, Imul),
        0xAC => shift_double_ib(ctx, stream, Shrd),
        0xAD => shift_double_cl(ctx, stream, Shrd),
        0xA8 => push_segment(ctx, Segment::Gs),
        0xA9 => pop_segment(ctx, Segment::Gs),
        0xB2 => far_load(ctx, stream, Lss),
        0xB3 => bit_ev_gv(ctx, stream, Btr),
        0xB4 => far_load(ctx, stream, Lfs),
        0xB5 => far_load(ctx, stream, Lgs),
        0xB6 => mov_extend(ctx, stream, Movzx, DataSize::Byte),
        0xB7 => mov_extend(ctx, stream, Movzx, DataSize::Word),
        0xBA => {
            let modrm = modrm::read_modrm(ctx, stream)?;
            groups::group8(ctx, stream, modrm)
        }
        0xBB => bit_ev_gv(ctx, stream, Btc),
        0xBC => gv_ev(ctx, stream, Bsf),
        0xBD => gv_ev(ctx, stream, Bsr),
        0xBE => mov_extend(ctx, stream, Movsx, DataSize::Byte),
        // `MOVSX Gv, Ew`: §9's resolved "apparent bug" (some source variants
        // instead dispatch this cell to `BSF`).
        0xBF => mov_extend(ctx, stream, Movsx, DataSize::Word),

        _ => Err(decode_error!(InvalidOpcode, "invalid opcode")),
    }
}

fn nullary(ctx: &mut DecodeContext, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    Ok(())
}

fn push_segment(ctx: &mut DecodeContext, segment: Segment) -> Result<()> {
    ctx.set_opcode(Push);
    ctx.push_operand(Operand::Segment(segment))
}

fn pop_segment(ctx: &mut DecodeContext, segment: Segment) -> Result<()> {
    ctx.set_opcode(Pop);
    ctx.push_operand(Operand::Segment(segment))
}

/// `LSS`/`LFS`/`LGS Gv, Mp`: a far-pointer memory load into a GPR plus its
/// segment register, same shape as `LES`/`LDS` in the one-byte map.
fn far_load(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(
        ctx,
        stream,
        modrm,
        width,
        RmOptions::memory(groups::far_data_size(width)),
    )?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

/// `LAR`/`LSL Gv, Ew`: the source is always a 16-bit selector.
fn lar_lsl(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::SliceStream;
    use crate::context::DecodeContext;
    use crate::width::Width;

    fn run(bytes: &[u8]) -> DecodeContext {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(bytes, 0);
        dispatch(&mut ctx, &mut stream).unwrap();
        ctx
    }

    #[test]
    fn push_pop_fs_gs_push_the_segment_operand() {
        let ctx = run(&[0xA0]);
        assert_eq!(ctx.opcode, Push);
        assert_eq!(ctx.operand_count(), 1);

        let ctx = run(&[0xA9]);
        assert_eq!(ctx.opcode, Pop);
        assert_eq!(ctx.operand_count(), 1);
    }

    #[test]
    fn lss_lfs_lgs_are_far_memory_loads() {
        // modrm = mod 00, reg 0 (EAX), rm 0 (EAX) -> [EAX]
        let ctx = run(&[0xB2, 0x00]);
        assert_eq!(ctx.opcode, Lss);
        assert_eq!(ctx.operand_count(), 2);

        let ctx = run(&[0xB4, 0x00]);
        assert_eq!(ctx.opcode, Lfs);

        let ctx = run(&[0xB5, 0x00]);
        assert_eq!(ctx.opcode, Lgs);
    }

    #[test]
    fn movsx_bf_is_not_the_bsf_alias() {
        let ctx = run(&[0xBF, 0xC0]);
        assert_eq!(ctx.opcode, Movsx);
    }
}

enum SystemReg {
    Control,
    Debug,
}

/// `MOV r32, CRn`/`MOV r32, DRn`: the `mod` field is ignored by real
/// hardware, so the `r/m` side is always read as a bare 32-bit GPR.
fn mov_from_system_reg(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, which: SystemReg) -> Result<()> {
    ctx.set_opcode(Mov);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let src = match which {
        SystemReg::Control => modrm::reg_control(modrm)?,
        SystemReg::Debug => modrm::reg_debug(modrm),
    };
    let dest = Operand::Register(Register::gpr(modrm.rm, Width::Bits32));
    ctx.push_operand(dest)?;
    ctx.push_operand(src)
}

fn mov_to_system_reg(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, which: SystemReg) -> Result<()> {
    ctx.set_opcode(Mov);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let dest = match which {
        SystemReg::Control => modrm::reg_control(modrm)?,
        SystemReg::Debug => modrm::reg_debug(modrm),
    };
    let src = Operand::Register(Register::gpr(modrm.rm, Width::Bits32));
    ctx.push_operand(dest)?;
    ctx.push_operand(src)
}

fn jcc_near(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, index: u8) -> Result<()> {
    ctx.set_opcode(JCC[index as usize]);
    let width = ctx.operand_size;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn setcc(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, index: u8) -> Result<()> {
    ctx.set_opcode(SETCC[index as usize]);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)
}

/// The `BT`/`BTS`/`BTR`/`BTC Ev, Gv` direct forms (as opposed to the `Ev,
/// Ib` forms reached through Group 8).
fn bit_ev_gv(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    let reg = modrm::reg_gpr(modrm, width);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)
}

fn gv_ev(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

fn shift_double_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    let reg = modrm::reg_gpr(modrm, width);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn shift_double_cl(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    let reg = modrm::reg_gpr(modrm, width);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)?;
    ctx.push_operand(Operand::Register(Register::Cl))
}

/// `MOVZX`/`MOVSX Gv, Eb`/`Ew`: the source width is fixed by the opcode
/// cell, independent of the current operand-size override; only the
/// destination tracks it.
fn mov_extend(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic, src_size: DataSize) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = match src_size {
        DataSize::Byte => modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?,
        _ => modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?,
    };
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}
