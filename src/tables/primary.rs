//! The one-byte opcode map (component D, spec §4.3).
//!
//! Legacy prefixes (`26/2E/36/3E/64/65/66/67/F0/F2/F3`) never reach this
//! dispatcher, the prefix collector consumes them before handing off the
//! first non-prefix byte.

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::mnemonic::Mnemonic;
use crate::modrm::{self, RmOptions};
use crate::operand::{DataSize, Operand};
use crate::register::Register;
use crate::segment::Segment;
use crate::status::{decode_error, Result};
use crate::tables::{groups, secondary, x87};
use crate::width::Width;

use Mnemonic::*;

/// Dispatches the primary opcode `byte` (the first non-prefix byte of the
/// instruction).
pub(crate) fn dispatch(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, byte: u8) -> Result<()> {
    match byte {
        // The eight-way ADD/OR/ADC/SBB/AND/SUB/XOR/CMP block, six patterns
        // per mnemonic (§4.3).
        0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {
            eb_gb(ctx, stream, arith_mnemonic(byte))
        }
        0x01 | 0x09 | 0x11 | 0x19 | 0x21 | 0x29 | 0x31 | 0x39 => {
            ev_gv(ctx, stream, arith_mnemonic(byte))
        }
        0x02 | 0x0A | 0x12 | 0x1A | 0x22 | 0x2A | 0x32 | 0x3A => {
            gb_eb(ctx, stream, arith_mnemonic(byte))
        }
        0x03 | 0x0B | 0x13 | 0x1B | 0x23 | 0x2B | 0x33 | 0x3B => {
            gv_ev(ctx, stream, arith_mnemonic(byte))
        }
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            al_ib(ctx, stream, arith_mnemonic(byte))
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            eax_iv(ctx, stream, arith_mnemonic(byte))
        }

        0x06 => push_segment(ctx, Segment::Es),
        0x07 => pop_segment(ctx, Segment::Es),
        0x0E => push_segment(ctx, Segment::Cs),
        0x16 => push_segment(ctx, Segment::Ss),
        0x17 => pop_segment(ctx, Segment::Ss),
        0x1E => push_segment(ctx, Segment::Ds),
        0x1F => pop_segment(ctx, Segment::Ds),

        0x27 => nullary(ctx, Daa),
        0x2F => nullary(ctx, Das),
        0x37 => nullary(ctx, Aaa),
        0x3F => nullary(ctx, Aas),

        0x40..=0x47 => inc_reg(ctx, byte - 0x40),
        0x48..=0x4F => dec_reg(ctx, byte - 0x48),
        0x50..=0x57 => push_reg(ctx, byte - 0x50),
        0x58..=0x5F => pop_reg(ctx, byte - 0x58),

        0x60 => nullary(ctx, Pusha),
        0x61 => nullary(ctx, Popa),
        0x62 => bound(ctx, stream),
        0x63 => arpl(ctx, stream),

        0x68 => push_iz(ctx, stream),
        0x69 => imul_gv_ev_iz(ctx, stream),
        0x6A => push_ib(ctx, stream),
        0x6B => imul_gv_ev_ib(ctx, stream),
        0x6C => ins(ctx, stream, DataSize::Byte),
        0x6D => {
            let size = groups::data_size(ctx.operand_size);
            ins(ctx, stream, size)
        }
        0x6E => outs(ctx, stream, DataSize::Byte),
        0x6F => {
            let size = groups::data_size(ctx.operand_size);
            outs(ctx, stream, size)
        }

        0x70..=0x7F => jcc_short(ctx, stream, byte - 0x70),

        0x80 => group1_eb_ib(ctx, stream),
        0x81 => group1_ev_iz(ctx, stream),
        0x82 => Err(decode_error!(InvalidOpcode, "invalid opcode")),
        0x83 => group1_ev_ib(ctx, stream),
        0x84 => ev_gv_byte(ctx, stream, Test),
        0x85 => ev_gv(ctx, stream, Test),
        0x86 => eb_gb(ctx, stream, Xchg),
        0x87 => ev_gv(ctx, stream, Xchg),
        0x88 => eb_gb(ctx, stream, Mov),
        0x89 => ev_gv(ctx, stream, Mov),
        0x8A => gb_eb(ctx, stream, Mov),
        0x8B => gv_ev(ctx, stream, Mov),
        0x8C => mov_ew_sw(ctx, stream),
        0x8D => lea(ctx, stream),
        0x8E => mov_sw_ew(ctx, stream),
        0x8F => group1a(ctx, stream),

        0x90 => nullary(ctx, Nop),
        0x91..=0x97 => xchg_eax_reg(ctx, byte - 0x90),

        0x98 => nullary(ctx, if ctx.operand_size == Width::Bits16 { Cbw } else { Cwde }),
        0x99 => nullary(ctx, if ctx.operand_size == Width::Bits16 { Cwd } else { Cdq }),
        0x9A => call_ap(ctx, stream),
        0x9B => nullary(ctx, Wait),
        0x9C => nullary(ctx, Pushf),
        0x9D => nullary(ctx, Popf),
        0x9E => nullary(ctx, Sahf),
        0x9F => nullary(ctx, Lahf),

        0xA0 => mov_al_ob(ctx, stream),
        0xA1 => mov_eax_ov(ctx, stream),
        0xA2 => mov_ob_al(ctx, stream),
        0xA3 => mov_ov_eax(ctx, stream),
        0xA4 => movs(ctx, DataSize::Byte),
        0xA5 => {
            let size = groups::data_size(ctx.operand_size);
            movs(ctx, size)
        }
        0xA6 => cmps(ctx, DataSize::Byte),
        0xA7 => {
            let size = groups::data_size(ctx.operand_size);
            cmps(ctx, size)
        }
        0xA8 => test_al_ib(ctx, stream),
        0xA9 => test_eax_iz(ctx, stream),
        0xAA => stos(ctx, DataSize::Byte),
        0xAB => {
            let size = groups::data_size(ctx.operand_size);
            stos(ctx, size)
        }
        0xAC => lods(ctx, DataSize::Byte),
        0xAD => {
            let size = groups::data_size(ctx.operand_size);
            lods(ctx, size)
        }
        0xAE => scas(ctx, DataSize::Byte),
        0xAF => {
            let size = groups::data_size(ctx.operand_size);
            scas(ctx, size)
        }

        0xB0..=0xB7 => mov_reg8_ib(ctx, stream, byte - 0xB0),
        0xB8..=0xBF => mov_reg_iv(ctx, stream, byte - 0xB8),

        0xC0 => group2_eb_ib(ctx, stream),
        0xC1 => group2_ev_ib(ctx, stream),
        0xC2 => ret_iw(ctx, stream, true),
        0xC3 => nullary_near(ctx, Ret, true),
        0xC4 => far_load(ctx, stream, Les),
        0xC5 => far_load(ctx, stream, Lds),
        0xC6 => mov_eb_ib(ctx, stream),
        0xC7 => mov_ev_iz(ctx, stream),
        0xC8 => enter(ctx, stream),
        0xC9 => nullary(ctx, Leave),
        0xCA => ret_iw(ctx, stream, false),
        0xCB => nullary_near(ctx, Ret, false),
        0xCC => nullary(ctx, Int3),
        0xCD => int_ib(ctx, stream),
        0xCE => nullary(ctx, Into),
        0xCF => nullary(ctx, Iret),

        0xD0 => group2_eb_1(ctx, stream),
        0xD1 => group2_ev_1(ctx, stream),
        0xD2 => group2_eb_cl(ctx, stream),
        0xD3 => group2_ev_cl(ctx, stream),
        0xD4 => aam_aad(ctx, stream, Aam),
        0xD5 => aam_aad(ctx, stream, Aad),
        0xD6 => Err(decode_error!(InvalidOpcode, "invalid opcode")),
        0xD7 => xlat(ctx),
        0xD8..=0xDF => x87::dispatch(ctx, stream, byte - 0xD8),

        0xE0 => rel8(ctx, stream, Loopne),
        0xE1 => rel8(ctx, stream, Loope),
        0xE2 => rel8(ctx, stream, Loop),
        0xE3 => rel8(ctx, stream, Jcxz),
        0xE4 => in_al_ib(ctx, stream),
        0xE5 => in_eax_ib(ctx, stream),
        0xE6 => out_ib_al(ctx, stream),
        0xE7 => out_ib_eax(ctx, stream),
        0xE8 => call_jz(ctx, stream),
        0xE9 => jmp_jz(ctx, stream),
        0xEA => jmp_ap(ctx, stream),
        0xEB => jmp_jb(ctx, stream),
        0xEC => in_al_dx(ctx),
        0xED => in_eax_dx(ctx),
        0xEE => out_dx_al(ctx),
        0xEF => out_dx_eax(ctx),

        0xF1 => Err(decode_error!(InvalidOpcode, "invalid opcode")),
        0xF4 => nullary(ctx, Hlt),
        0xF5 => nullary(ctx, Cmc),
        0xF6 => group3_eb(ctx, stream),
        0xF7 => group3_ev(ctx, stream),
        0xF8 => nullary(ctx, Clc),
        0xF9 => nullary(ctx, Stc),
        0xFA => nullary(ctx, Cli),
        0xFB => nullary(ctx, Sti),
        0xFC => nullary(ctx, Cld),
        0xFD => nullary(ctx, Std),
        0xFE => group4(ctx, stream),
        0xFF => group5(ctx, stream),

        0x0F => secondary::dispatch(ctx, stream),

        _ => Err(decode_error!(InvalidOpcode, "invalid opcode")),
    }
}

fn arith_mnemonic(byte: u8) -> Mnemonic {
    match byte & 0xF8 {
        0x00 => Add,
        0x08 => Or,
        0x10 => Adc,
        0x18 => Sbb,
        0x20 => And,
        0x28 => Sub,
        0x30 => Xor,
        0x38 => Cmp,
        _ => unreachable!("masked to one of the eight block bases"),
    }
}

fn eax(ctx: &DecodeContext) -> Operand {
    Operand::Register(Register::gpr(0, ctx.operand_size))
}

fn al() -> Operand {
    Operand::Register(Register::Al)
}

fn eb_gb(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    let reg = modrm::reg_gpr8(modrm);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)
}

fn gb_eb(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let reg = modrm::reg_gpr8(modrm);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

fn ev_gv(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    let reg = modrm::reg_gpr(modrm, width);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)
}

/// As [`ev_gv`], but used by `TEST Ev,Gv` where the "byte" variant (`84`)
/// must share the same helper shape as `85`; kept distinct only for the
/// call site's clarity since `TEST` never writes back its destination.
fn ev_gv_byte(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    eb_gb(ctx, stream, mnemonic)
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

fn al_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    ctx.push_operand(al())?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn eax_iv(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let width = ctx.operand_size;
    ctx.push_operand(eax(ctx))?;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn push_segment(ctx: &mut DecodeContext, segment: Segment) -> Result<()> {
    ctx.set_opcode(Push);
    ctx.push_operand(Operand::Segment(segment))
}

fn pop_segment(ctx: &mut DecodeContext, segment: Segment) -> Result<()> {
    ctx.set_opcode(Pop);
    ctx.push_operand(Operand::Segment(segment))
}

fn nullary(ctx: &mut DecodeContext, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    Ok(())
}

fn nullary_near(ctx: &mut DecodeContext, mnemonic: Mnemonic, near: bool) -> Result<()> {
    ctx.set_opcode(mnemonic);
    ctx.set_near(near);
    Ok(())
}

fn inc_reg(ctx: &mut DecodeContext, index: u8) -> Result<()> {
    ctx.set_opcode(Inc);
    let width = ctx.operand_size;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))
}

fn dec_reg(ctx: &mut DecodeContext, index: u8) -> Result<()> {
    ctx.set_opcode(Dec);
    let width = ctx.operand_size;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))
}

fn push_reg(ctx: &mut DecodeContext, index: u8) -> Result<()> {
    ctx.set_opcode(Push);
    let width = ctx.operand_size;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))
}

fn pop_reg(ctx: &mut DecodeContext, index: u8) -> Result<()> {
    ctx.set_opcode(Pop);
    let width = ctx.operand_size;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))
}

fn bound(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Bound);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::memory(groups::data_size(width)))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

/// `ARPL` always operates on 16-bit selectors, regardless of the current
/// operand-size override.
fn arpl(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Arpl);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
    let reg = modrm::reg_gpr(modrm, Width::Bits16);
    ctx.push_operand(rm)?;
    ctx.push_operand(reg)
}

/// `PUSH Iz`: the immediate's width tracks the effective operand size
/// (§9's resolved "apparent bug": some source variants instead read a
/// fixed-width immediate here).
fn push_iz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Push);
    let width = ctx.operand_size;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn push_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Push);
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn imul_gv_ev_iz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Imul);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)?;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn imul_gv_ev_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Imul);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)?;
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

/// `ES:[EDI]`/`ES:[DI]`, the non-overridable string-op destination.
fn string_dest(ctx: &DecodeContext, size: DataSize) -> Operand {
    let base = Operand::Register(Register::gpr(7, ctx.address_size));
    Operand::indirect(base, size, Some(Segment::Es))
}

/// `[DS:]ESI`/`[DS:]SI`, the overridable string-op source.
fn string_src(ctx: &DecodeContext, size: DataSize) -> Operand {
    let base = Operand::Register(Register::gpr(6, ctx.address_size));
    Operand::indirect(base, size, ctx.segment_override)
}

fn ins(ctx: &mut DecodeContext, _stream: &mut dyn ByteStream, size: DataSize) -> Result<()> {
    ctx.set_opcode(Ins);
    let dest = string_dest(ctx, size);
    ctx.push_operand(dest)?;
    ctx.push_operand(Operand::Register(Register::Dx))
}

fn outs(ctx: &mut DecodeContext, _stream: &mut dyn ByteStream, size: DataSize) -> Result<()> {
    ctx.set_opcode(Outs);
    ctx.push_operand(Operand::Register(Register::Dx))?;
    let src = string_src(ctx, size);
    ctx.push_operand(src)
}

const JCC: [Mnemonic; 16] = [
    Jo, Jno, Jb, Jnb, Jz, Jnz, Jbe, Jnbe, Js, Jns, Jp, Jnp, Jl, Jnl, Jle, Jnle,
];

fn jcc_short(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, index: u8) -> Result<()> {
    ctx.set_opcode(JCC[index as usize]);
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn group1_eb_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group1_mnemonic(modrm.reg));
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn group1_ev_iz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group1_mnemonic(modrm.reg));
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

/// `Group 1, Ev, Ib`: the byte immediate is sign-extended to the effective
/// operand size but the encoded (and reported) width stays byte.
fn group1_ev_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group1_mnemonic(modrm.reg));
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn mov_ew_sw(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
    let seg = modrm::reg_segment(modrm)?;
    ctx.push_operand(rm)?;
    ctx.push_operand(seg)
}

fn mov_sw_ew(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let seg = modrm::reg_segment(modrm)?;
    let rm = modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::either(DataSize::Word))?;
    ctx.push_operand(seg)?;
    ctx.push_operand(rm)
}

fn lea(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Lea);
    let modrm = modrm::read_modrm(ctx, stream)?;
    let width = ctx.operand_size;
    let reg = modrm::reg_gpr(modrm, width);
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::address_only())?;
    ctx.push_operand(reg)?;
    ctx.push_operand(rm)
}

fn group1a(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    groups::group1a(ctx, stream, modrm)
}

fn xchg_eax_reg(ctx: &mut DecodeContext, index: u8) -> Result<()> {
    ctx.set_opcode(Xchg);
    let width = ctx.operand_size;
    ctx.push_operand(eax(ctx))?;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))
}

/// `CALL Ap`: a far pointer immediate, never dereferenced.
fn call_ap(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Call);
    ctx.set_near(false);
    let width = ctx.operand_size;
    let offset = match width {
        Width::Bits16 => ctx.read_u16_value(stream)? as u32,
        Width::Bits32 => ctx.read_u32_value(stream)?,
    };
    let segment = ctx.read_u16_value(stream)?;
    ctx.push_operand(Operand::Call { segment, offset, size: groups::far_data_size(width) })
}

fn jmp_ap(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Jmp);
    ctx.set_near(false);
    let width = ctx.operand_size;
    let offset = match width {
        Width::Bits16 => ctx.read_u16_value(stream)? as u32,
        Width::Bits32 => ctx.read_u32_value(stream)?,
    };
    let segment = ctx.read_u16_value(stream)?;
    ctx.push_operand(Operand::Call { segment, offset, size: groups::far_data_size(width) })
}

fn moffs_size(address_size: Width) -> DataSize {
    match address_size {
        Width::Bits16 => DataSize::Word,
        Width::Bits32 => DataSize::Dword,
    }
}

fn moffs_address(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<Operand> {
    let address_size = ctx.address_size;
    let value = match address_size {
        Width::Bits16 => ctx.read_u16_value(stream)? as i64,
        Width::Bits32 => ctx.read_u32_value(stream)? as i64,
    };
    Ok(Operand::Immediate { value, size: moffs_size(address_size) })
}

fn mov_al_ob(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    ctx.push_operand(al())?;
    let addr = moffs_address(ctx, stream)?;
    let segment = ctx.segment_override;
    ctx.push_operand(Operand::indirect(addr, DataSize::Byte, segment))
}

fn mov_eax_ov(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    ctx.push_operand(eax(ctx))?;
    let addr = moffs_address(ctx, stream)?;
    let segment = ctx.segment_override;
    let size = groups::data_size(ctx.operand_size);
    ctx.push_operand(Operand::indirect(addr, size, segment))
}

fn mov_ob_al(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    let addr = moffs_address(ctx, stream)?;
    let segment = ctx.segment_override;
    ctx.push_operand(Operand::indirect(addr, DataSize::Byte, segment))?;
    ctx.push_operand(al())
}

fn mov_ov_eax(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Mov);
    let addr = moffs_address(ctx, stream)?;
    let segment = ctx.segment_override;
    let size = groups::data_size(ctx.operand_size);
    ctx.push_operand(Operand::indirect(addr, size, segment))?;
    ctx.push_operand(eax(ctx))
}

fn movs(ctx: &mut DecodeContext, size: DataSize) -> Result<()> {
    ctx.set_opcode(Movs);
    let dest = string_dest(ctx, size);
    let src = string_src(ctx, size);
    ctx.push_operand(dest)?;
    ctx.push_operand(src)
}

fn cmps(ctx: &mut DecodeContext, size: DataSize) -> Result<()> {
    ctx.set_opcode(Cmps);
    let src = string_src(ctx, size);
    let dest = string_dest(ctx, size);
    ctx.push_operand(src)?;
    ctx.push_operand(dest)
}

fn test_al_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    al_ib(ctx, stream, Test)
}

fn test_eax_iz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    eax_iv(ctx, stream, Test)
}

fn stos(ctx: &mut DecodeContext, size: DataSize) -> Result<()> {
    ctx.set_opcode(Stos);
    let dest = string_dest(ctx, size);
    ctx.push_operand(dest)?;
    if size == DataSize::Byte {
        ctx.push_operand(al())
    } else {
        ctx.push_operand(eax(ctx))
    }
}

fn lods(ctx: &mut DecodeContext, size: DataSize) -> Result<()> {
    ctx.set_opcode(Lods);
    if size == DataSize::Byte {
        ctx.push_operand(al())?;
    } else {
        ctx.push_operand(eax(ctx))?;
    }
    let src = string_src(ctx, size);
    ctx.push_operand(src)
}

fn scas(ctx: &mut DecodeContext, size: DataSize) -> Result<()> {
    ctx.set_opcode(Scas);
    if size == DataSize::Byte {
        ctx.push_operand(al())?;
    } else {
        ctx.push_operand(eax(ctx))?;
    }
    let dest = string_dest(ctx, size);
    ctx.push_operand(dest)
}

fn mov_reg8_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, index: u8) -> Result<()> {
    ctx.set_opcode(Mov);
    ctx.push_operand(Operand::Register(Register::gpr8(index)))?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn mov_reg_iv(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, index: u8) -> Result<()> {
    ctx.set_opcode(Mov);
    let width = ctx.operand_size;
    ctx.push_operand(Operand::Register(Register::gpr(index, width)))?;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn group2_eb_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn group2_ev_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn group2_eb_1(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)
}

fn group2_ev_1(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)
}

fn group2_eb_cl(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)?;
    ctx.push_operand(Operand::Register(Register::Cl))
}

fn group2_ev_cl(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group2_mnemonic(modrm.reg)?);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    ctx.push_operand(Operand::Register(Register::Cl))
}

fn ret_iw(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, near: bool) -> Result<()> {
    ctx.set_opcode(Ret);
    ctx.set_near(near);
    let value = ctx.read_u16_value(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Word })
}

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

/// `MOV Eb, Ib`: reg field must be `0`; the other seven cells of this byte
/// are unallocated (Intel calls this "Group 11", but the spec's nine named
/// groups don't include it, so it's handled inline here).
fn mov_eb_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    if modrm.reg != 0 {
        return Err(decode_error!(InvalidOpcode, "unallocated mov-immediate cell"));
    }
    ctx.set_opcode(Mov);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn mov_ev_iz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    if modrm.reg != 0 {
        return Err(decode_error!(InvalidOpcode, "unallocated mov-immediate cell"));
    }
    ctx.set_opcode(Mov);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

fn enter(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Enter);
    let frame_size = ctx.read_u16_value(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value: frame_size, size: DataSize::Word })?;
    let nesting = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value: nesting, size: DataSize::Byte })
}

fn int_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Int);
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn aam_aad(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

/// `XLAT`: Intel documents an implicit `[BX+AL]` source; this decoder makes
/// that operand explicit rather than emitting zero operands (§9's resolved
/// Open Question).
fn xlat(ctx: &mut DecodeContext) -> Result<()> {
    ctx.set_opcode(Xlat);
    let base = Operand::Register(Register::gpr(3, ctx.address_size));
    let addr = Operand::addition(base, al());
    let segment = ctx.segment_override;
    ctx.push_operand(Operand::indirect(addr, DataSize::Byte, segment))
}

fn rel8(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, mnemonic: Mnemonic) -> Result<()> {
    ctx.set_opcode(mnemonic);
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn in_al_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(In);
    ctx.push_operand(al())?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn in_eax_ib(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(In);
    ctx.push_operand(eax(ctx))?;
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn out_ib_al(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Out);
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })?;
    ctx.push_operand(al())
}

fn out_ib_eax(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Out);
    let value = ctx.read_u8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })?;
    ctx.push_operand(eax(ctx))
}

fn call_jz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Call);
    ctx.set_near(true);
    let width = ctx.operand_size;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

/// `JMP Jz`: §9's resolved "apparent bug" (some source variants dispatch
/// this cell to `JNP`).
fn jmp_jz(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Jmp);
    ctx.set_near(true);
    let width = ctx.operand_size;
    let value = ctx.read_sized(stream, width)?;
    ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })
}

/// `JMP Jb`: see [`jmp_jz`].
fn jmp_jb(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    ctx.set_opcode(Jmp);
    ctx.set_near(true);
    let value = ctx.read_i8(stream)? as i64;
    ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })
}

fn in_al_dx(ctx: &mut DecodeContext) -> Result<()> {
    ctx.set_opcode(In);
    ctx.push_operand(al())?;
    ctx.push_operand(Operand::Register(Register::Dx))
}

fn in_eax_dx(ctx: &mut DecodeContext) -> Result<()> {
    ctx.set_opcode(In);
    ctx.push_operand(eax(ctx))?;
    ctx.push_operand(Operand::Register(Register::Dx))
}

fn out_dx_al(ctx: &mut DecodeContext) -> Result<()> {
    ctx.set_opcode(Out);
    ctx.push_operand(Operand::Register(Register::Dx))?;
    ctx.push_operand(al())
}

fn out_dx_eax(ctx: &mut DecodeContext) -> Result<()> {
    ctx.set_opcode(Out);
    ctx.push_operand(Operand::Register(Register::Dx))?;
    ctx.push_operand(eax(ctx))
}

fn group3_eb(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    let mnemonic = groups::group3_mnemonic(modrm.reg)?;
    ctx.set_opcode(mnemonic);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)?;
    if mnemonic == Test {
        let value = ctx.read_u8(stream)? as i64;
        ctx.push_operand(Operand::Immediate { value, size: DataSize::Byte })?;
    }
    Ok(())
}

fn group3_ev(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    let mnemonic = groups::group3_mnemonic(modrm.reg)?;
    ctx.set_opcode(mnemonic);
    let width = ctx.operand_size;
    let rm = modrm::decode_rm(ctx, stream, modrm, width, RmOptions::either(groups::data_size(width)))?;
    ctx.push_operand(rm)?;
    if mnemonic == Test {
        let value = ctx.read_sized(stream, width)?;
        ctx.push_operand(Operand::Immediate { value, size: groups::data_size(width) })?;
    }
    Ok(())
}

fn group4(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    ctx.set_opcode(groups::group4_mnemonic(modrm.reg)?);
    let rm = modrm::decode_rm8(ctx, stream, modrm, RmOptions::either(DataSize::Byte))?;
    ctx.push_operand(rm)
}

fn group5(ctx: &mut DecodeContext, stream: &mut dyn ByteStream) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    groups::group5(ctx, stream, modrm)
}
