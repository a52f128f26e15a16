//! The eight x87 ESC (`D8`-`DF`) maps (component E, §4.6).

use crate::byte_stream::ByteStream;
use crate::context::DecodeContext;
use crate::mnemonic::Mnemonic;
use crate::modrm::{self, ModRm, RmOptions};
use crate::operand::{DataSize, Operand};
use crate::status::{decode_error, Result};
use crate::width::Width;

fn st(index: u8) -> Operand {
    Operand::FloatingPointStack(index)
}

fn env_size(width: Width) -> DataSize {
    match width {
        Width::Bits16 => DataSize::FpuEnvironment14,
        Width::Bits32 => DataSize::FpuEnvironment28,
    }
}

fn state_size(width: Width) -> DataSize {
    match width {
        Width::Bits16 => DataSize::FpuState94,
        Width::Bits32 => DataSize::FpuState108,
    }
}

/// Reads a memory `r/m` operand at the given data size. Always used from
/// the x87 maps with `MustBeMemory`, since the register-form cells are
/// handled by the caller before this is ever reached.
fn mem_operand(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    modrm: ModRm,
    size: DataSize,
) -> Result<Operand> {
    modrm::decode_rm(ctx, stream, modrm, Width::Bits16, RmOptions::memory(size))
}

/// Dispatches one of the eight ESC bytes (`0xD8`-`0xDF`). `escape` is
/// `byte - 0xD8`, i.e. `0..=7`.
pub(crate) fn dispatch(ctx: &mut DecodeContext, stream: &mut dyn ByteStream, escape: u8) -> Result<()> {
    let modrm = modrm::read_modrm(ctx, stream)?;
    if modrm.is_register_form() {
        register_form(ctx, stream, escape, modrm)
    } else {
        memory_form(ctx, stream, escape, modrm)
    }
}

fn register_form(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    escape: u8,
    modrm: ModRm,
) -> Result<()> {
    let reg = modrm.reg;
    let rm = modrm.rm;
    match escape {
        // D8: FADD/FMUL/FCOM/FCOMP/FSUB/FSUBR/FDIV/FDIVR ST(0), ST(i)
        0 => {
            let mnemonic = match reg {
                0 => Mnemonic::Fadd,
                1 => Mnemonic::Fmul,
                2 => Mnemonic::Fcom,
                3 => Mnemonic::Fcomp,
                4 => Mnemonic::Fsub,
                5 => Mnemonic::Fsubr,
                6 => Mnemonic::Fdiv,
                7 => Mnemonic::Fdivr,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        // D9
        1 => d9_register(ctx, reg, rm),
        // DA: FCMOVcc ST(0), ST(i); DA/E9 = FUCOMPP
        2 => {
            if reg == 5 && rm == 1 {
                ctx.set_opcode(Mnemonic::Fucompp);
                return Ok(());
            }
            let mnemonic = match reg {
                0 => Mnemonic::Fcmovb,
                1 => Mnemonic::Fcmove,
                2 => Mnemonic::Fcmovbe,
                3 => Mnemonic::Fcmovu,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        // DB: FCMOVNcc ST(0), ST(i); FCLEX/FINIT; FUCOMI/FCOMI
        3 => db_register(ctx, reg, rm),
        // DC: reversed arithmetic ST(i), ST(0)
        4 => {
            let mnemonic = match reg {
                0 => Mnemonic::Fadd,
                1 => Mnemonic::Fmul,
                2 => Mnemonic::Fcom,
                3 => Mnemonic::Fcomp,
                4 => Mnemonic::Fsubr,
                5 => Mnemonic::Fsub,
                6 => Mnemonic::Fdivr,
                7 => Mnemonic::Fdiv,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(rm))?;
            ctx.push_operand(st(0))
        }
        // DD: FFREE/FST/FSTP/FUCOM/FUCOMP ST(i)
        5 => {
            let mnemonic = match reg {
                0 => Mnemonic::Ffree,
                2 => Mnemonic::Fst,
                3 => Mnemonic::Fstp,
                4 => Mnemonic::Fucom,
                5 => Mnemonic::Fucomp,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(rm))
        }
        // DE: popping reversed arithmetic ST(i), ST(0); DE/D9 = FCOMPP
        6 => {
            if reg == 3 && rm == 1 {
                ctx.set_opcode(Mnemonic::Fcompp);
                return Ok(());
            }
            let mnemonic = match reg {
                0 => Mnemonic::Faddp,
                1 => Mnemonic::Fmulp,
                4 => Mnemonic::Fsubrp,
                5 => Mnemonic::Fsubp,
                6 => Mnemonic::Fdivrp,
                7 => Mnemonic::Fdivp,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(rm))?;
            ctx.push_operand(st(0))
        }
        // DF: FSTSW AX; FUCOMIP/FCOMIP ST(0), ST(i)
        7 => {
            if reg == 4 && rm == 0 {
                ctx.set_opcode(Mnemonic::Fstsw);
                return ctx.push_operand(Operand::Register(crate::register::Register::Ax));
            }
            let mnemonic = match reg {
                5 => Mnemonic::Fucomip,
                6 => Mnemonic::Fcomip,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        _ => unreachable!("escape is 0..=7"),
    }
}

fn d9_register(ctx: &mut DecodeContext, reg: u8, rm: u8) -> Result<()> {
    match reg {
        0 => {
            ctx.set_opcode(Mnemonic::Fld);
            ctx.push_operand(st(rm))
        }
        1 => {
            ctx.set_opcode(Mnemonic::Fxch);
            ctx.push_operand(st(rm))
        }
        2 if rm == 0 => {
            ctx.set_opcode(Mnemonic::Fnop);
            Ok(())
        }
        4 => {
            let mnemonic = match rm {
                0 => Mnemonic::Fchs,
                1 => Mnemonic::Fabs,
                4 => Mnemonic::Ftst,
                5 => Mnemonic::Fxam,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            Ok(())
        }
        5 => {
            let mnemonic = match rm {
                0 => Mnemonic::Fld1,
                1 => Mnemonic::Fldl2t,
                2 => Mnemonic::Fldl2e,
                3 => Mnemonic::Fldpi,
                4 => Mnemonic::Fldlg2,
                5 => Mnemonic::Fldln2,
                6 => Mnemonic::Fldz,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            Ok(())
        }
        6 => {
            let mnemonic = match rm {
                0 => Mnemonic::F2xm1,
                1 => Mnemonic::Fyl2x,
                2 => Mnemonic::Fptan,
                3 => Mnemonic::Fpatan,
                4 => Mnemonic::Fxtract,
                5 => Mnemonic::Fprem1,
                6 => Mnemonic::Fdecstp,
                7 => Mnemonic::Fincstp,
                _ => unreachable!("rm is a 3-bit field"),
            };
            ctx.set_opcode(mnemonic);
            Ok(())
        }
        7 => {
            let mnemonic = match rm {
                0 => Mnemonic::Fprem,
                2 => Mnemonic::Fsqrt,
                3 => Mnemonic::Fsincos,
                4 => Mnemonic::Frndint,
                5 => Mnemonic::Fscale,
                6 => Mnemonic::Fsin,
                7 => Mnemonic::Fcos,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            Ok(())
        }
        _ => Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
    }
}

fn db_register(ctx: &mut DecodeContext, reg: u8, rm: u8) -> Result<()> {
    match reg {
        0 => {
            ctx.set_opcode(Mnemonic::Fcmovnb);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        1 => {
            ctx.set_opcode(Mnemonic::Fcmovne);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        2 => {
            ctx.set_opcode(Mnemonic::Fcmovnbe);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        3 => {
            ctx.set_opcode(Mnemonic::Fcmovnu);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        4 => {
            let mnemonic = match rm {
                2 => Mnemonic::Fclex,
                3 => Mnemonic::Finit,
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            Ok(())
        }
        5 => {
            ctx.set_opcode(Mnemonic::Fucomi);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        6 => {
            ctx.set_opcode(Mnemonic::Fcomi);
            ctx.push_operand(st(0))?;
            ctx.push_operand(st(rm))
        }
        _ => Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
    }
}

fn memory_form(
    ctx: &mut DecodeContext,
    stream: &mut dyn ByteStream,
    escape: u8,
    modrm: ModRm,
) -> Result<()> {
    let width = ctx.operand_size;
    match escape {
        0 => {
            let mnemonic = match modrm.reg {
                0 => Mnemonic::Fadd,
                1 => Mnemonic::Fmul,
                2 => Mnemonic::Fcom,
                3 => Mnemonic::Fcomp,
                4 => Mnemonic::Fsub,
                5 => Mnemonic::Fsubr,
                6 => Mnemonic::Fdiv,
                7 => Mnemonic::Fdivr,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            let mem = mem_operand(ctx, stream, modrm, DataSize::Single)?;
            ctx.push_operand(mem)
        }
        1 => {
            let (mnemonic, size) = match modrm.reg {
                0 => (Mnemonic::Fld, DataSize::Single),
                2 => (Mnemonic::Fst, DataSize::Single),
                3 => (Mnemonic::Fstp, DataSize::Single),
                4 => (Mnemonic::Fldenv, env_size(width)),
                5 => (Mnemonic::Fldcw, DataSize::ByteByte),
                6 => (Mnemonic::Fstenv, env_size(width)),
                7 => (Mnemonic::Fstcw, DataSize::ByteByte),
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            let mem = mem_operand(ctx, stream, modrm, size)?;
            ctx.push_operand(mem)
        }
        2 => {
            let mnemonic = match modrm.reg {
                0 => Mnemonic::Fiadd,
                1 => Mnemonic::Fimul,
                2 => Mnemonic::Ficom,
                3 => Mnemonic::Ficomp,
                4 => Mnemonic::Fisub,
                5 => Mnemonic::Fisubr,
                6 => Mnemonic::Fidiv,
                7 => Mnemonic::Fidivr,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            let mem = mem_operand(ctx, stream, modrm, DataSize::Dword)?;
            ctx.push_operand(mem)
        }
        3 => {
            let (mnemonic, size) = match modrm.reg {
                0 => (Mnemonic::Fild, DataSize::Dword),
                1 => (Mnemonic::Fisttp, DataSize::Dword),
                2 => (Mnemonic::Fist, DataSize::Dword),
                3 => (Mnemonic::Fistp, DataSize::Dword),
                5 => (Mnemonic::Fld, DataSize::ExtendedReal),
                7 => (Mnemonic::Fstp, DataSize::ExtendedReal),
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            let mem = mem_operand(ctx, stream, modrm, size)?;
            ctx.push_operand(mem)
        }
        4 => {
            let mnemonic = match modrm.reg {
                0 => Mnemonic::Fadd,
                1 => Mnemonic::Fmul,
                2 => Mnemonic::Fcom,
                3 => Mnemonic::Fcomp,
                4 => Mnemonic::Fsub,
                5 => Mnemonic::Fsubr,
                6 => Mnemonic::Fdiv,
                7 => Mnemonic::Fdivr,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            let mem = mem_operand(ctx, stream, modrm, DataSize::Double)?;
            ctx.push_operand(mem)
        }
        5 => {
            let (mnemonic, size) = match modrm.reg {
                0 => (Mnemonic::Fld, DataSize::Double),
                1 => (Mnemonic::Fisttp, DataSize::Qword),
                2 => (Mnemonic::Fst, DataSize::Double),
                3 => (Mnemonic::Fstp, DataSize::Double),
                4 => (Mnemonic::Frstor, state_size(width)),
                6 => (Mnemonic::Fsave, state_size(width)),
                7 => (Mnemonic::Fstsw, DataSize::ByteByte),
                _ => return Err(decode_error!(InvalidOpcode, "unallocated x87 cell")),
            };
            ctx.set_opcode(mnemonic);
            let mem = mem_operand(ctx, stream, modrm, size)?;
            ctx.push_operand(mem)
        }
        6 => {
            let mnemonic = match modrm.reg {
                0 => Mnemonic::Fiadd,
                1 => Mnemonic::Fimul,
                2 => Mnemonic::Ficom,
                3 => Mnemonic::Ficomp,
                4 => Mnemonic::Fisub,
                5 => Mnemonic::Fisubr,
                6 => Mnemonic::Fidiv,
                7 => Mnemonic::Fidivr,
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            ctx.push_operand(st(0))?;
            let mem = mem_operand(ctx, stream, modrm, DataSize::Word)?;
            ctx.push_operand(mem)
        }
        7 => {
            let (mnemonic, size) = match modrm.reg {
                0 => (Mnemonic::Fild, DataSize::Word),
                1 => (Mnemonic::Fisttp, DataSize::Word),
                2 => (Mnemonic::Fist, DataSize::Word),
                3 => (Mnemonic::Fistp, DataSize::Word),
                4 => (Mnemonic::Fbld, DataSize::PackedBcd),
                5 => (Mnemonic::Fild, DataSize::Qword),
                6 => (Mnemonic::Fbstp, DataSize::PackedBcd),
                7 => (Mnemonic::Fistp, DataSize::Qword),
                _ => unreachable!(),
            };
            ctx.set_opcode(mnemonic);
            let mem = mem_operand(ctx, stream, modrm, size)?;
            ctx.push_operand(mem)
        }
        _ => unreachable!("escape is 0..=7"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_stream::SliceStream;

    #[test]
    fn fld1_is_a_bare_register_form_opcode() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(&[0xE8], 0); // D9 E8, escape 1
        dispatch(&mut ctx, &mut stream, 1).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Fld1);
        assert_eq!(ctx.operand_count(), 0);
    }

    #[test]
    fn fucompp_is_the_da_e9_special_case() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        let mut stream = SliceStream::new(&[0xE9], 0); // DA E9, escape 2
        dispatch(&mut ctx, &mut stream, 2).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Fucompp);
        assert_eq!(ctx.operand_count(), 0);
    }

    #[test]
    fn memory_form_fadd_pushes_st0_and_memory_operand() {
        let mut ctx = DecodeContext::new(Width::Bits32, 0);
        // D8 /0, mod=00 rm=000 (register-indirect [EAX]).
        let mut stream = SliceStream::new(&[0x00], 0);
        dispatch(&mut ctx, &mut stream, 0).unwrap();
        assert_eq!(ctx.opcode, Mnemonic::Fadd);
        assert_eq!(ctx.operand_count(), 2);
    }
}
