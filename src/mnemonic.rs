//! The closed enumeration of mnemonics the decoder can produce.

/// An IA-32 mnemonic.
///
/// `Invalid` is the decode context's starting value (invariant I4: a
/// successfully finished instruction never carries it). Every other variant
/// is one the decoder is able to reach from the one-byte map, the 0x0F
/// two-byte map, a group sub-table, or one of the eight x87 ESC maps.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Invalid,

    // Arithmetic / logic (Group 1 and the 0x00-0x3D block).
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Xor,
    Cmp,

    Inc,
    Dec,
    Neg,
    Not,
    Mul,
    Imul,
    Div,
    Idiv,
    Test,

    // Shifts/rotates (Group 2).
    Rol,
    Ror,
    Rcl,
    Rcr,
    Shl,
    Shr,
    Sar,
    Shld,
    Shrd,

    // Data movement.
    Mov,
    Movzx,
    Movsx,
    Lea,
    Xchg,
    Push,
    Pop,
    Pusha,
    Popa,
    Pushf,
    Popf,
    Les,
    Lds,
    Lfs,
    Lgs,
    Lss,
    Bound,
    Arpl,

    // Conversions.
    Cbw,
    Cwde,
    Cwd,
    Cdq,

    // Flags.
    Sahf,
    Lahf,
    Clc,
    Stc,
    Cli,
    Sti,
    Cld,
    Std,
    Cmc,

    // String ops.
    Movs,
    Cmps,
    Stos,
    Lods,
    Scas,
    Ins,
    Outs,
    Xlat,

    // Control transfer.
    Call,
    Jmp,
    Ret,
    Enter,
    Leave,
    Int,
    Into,
    Int3,
    Iret,
    Loop,
    Loope,
    Loopne,
    Jcxz,
    Hlt,
    Nop,
    Wait,

    // BCD adjust.
    Aaa,
    Aas,
    Daa,
    Das,
    Aam,
    Aad,

    // Port I/O.
    In,
    Out,

    // Jcc (0x70-7F and 0x0F 0x80-8F).
    Jo,
    Jno,
    Jb,
    Jnb,
    Jz,
    Jnz,
    Jbe,
    Jnbe,
    Js,
    Jns,
    Jp,
    Jnp,
    Jl,
    Jnl,
    Jle,
    Jnle,

    // SETcc (0x0F 0x90-9F).
    Seto,
    Setno,
    Setb,
    Setnb,
    Setz,
    Setnz,
    Setbe,
    Setnbe,
    Sets,
    Setns,
    Setp,
    Setnp,
    Setl,
    Setnl,
    Setle,
    Setnle,

    // Two-byte (0x0F) misc.
    Lar,
    Lsl,
    Clts,
    Bt,
    Bts,
    Btr,
    Btc,
    Bsf,
    Bsr,

    // System / privileged (Groups 6 and 7).
    Sldt,
    Str,
    Lldt,
    Sgdt,
    Sidt,
    Lgdt,
    Lidt,
    Ltr,
    Verr,
    Verw,
    Smsw,
    Lmsw,

    // x87 FPU: arithmetic.
    Fadd,
    Fmul,
    Fcom,
    Fcomp,
    Fsub,
    Fsubr,
    Fdiv,
    Fdivr,
    Faddp,
    Fmulp,
    Fcompp,
    Fsubrp,
    Fsubp,
    Fdivrp,
    Fdivp,

    // x87 FPU: integer arithmetic.
    Fiadd,
    Fimul,
    Ficom,
    Ficomp,
    Fisub,
    Fisubr,
    Fidiv,
    Fidivr,

    // x87 FPU: data movement.
    Fld,
    Fst,
    Fstp,
    Fxch,
    Ffree,
    Fild,
    Fist,
    Fistp,
    Fisttp,
    Fbld,
    Fbstp,

    // x87 FPU: conditional move / compare.
    Fcmovb,
    Fcmove,
    Fcmovbe,
    Fcmovu,
    Fcmovnb,
    Fcmovne,
    Fcmovnbe,
    Fcmovnu,
    Fucom,
    Fucomp,
    Fucompp,
    Fcomi,
    Fcomip,
    Fucomi,
    Fucomip,

    // x87 FPU: environment / state.
    Fldenv,
    Fstenv,
    Frstor,
    Fsave,
    Fstsw,
    Fstcw,
    Fldcw,
    Fclex,
    Finit,
    Fnop,

    // x87 FPU: constant loads.
    Fld1,
    Fldl2t,
    Fldl2e,
    Fldpi,
    Fldlg2,
    Fldln2,
    Fldz,

    // x87 FPU: transcendental / misc arithmetic.
    F2xm1,
    Fyl2x,
    Fptan,
    Fpatan,
    Fxtract,
    Fprem,
    Fprem1,
    Fdecstp,
    Fincstp,
    Fsqrt,
    Fsincos,
    Frndint,
    Fscale,
    Fsin,
    Fcos,
    Fchs,
    Fabs,
    Ftst,
    Fxam,
}

impl Default for Mnemonic {
    fn default() -> Self {
        Mnemonic::Invalid
    }
}

impl Mnemonic {
    /// Returns a short, lowercase textual name for this mnemonic.
    ///
    /// This is a plain identifier lookup, not assembly-syntax rendering
    /// (operand formatting is out of scope). It exists for the same reason
    /// the teacher crate exposes `Mnemonic::get_string`: tests, logs and
    /// debug output want a stable short name without pulling in a formatter.
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Invalid => "invalid",
            Add => "add",
            Or => "or",
            Adc => "adc",
            Sbb => "sbb",
            And => "and",
            Sub => "sub",
            Xor => "xor",
            Cmp => "cmp",
            Inc => "inc",
            Dec => "dec",
            Neg => "neg",
            Not => "not",
            Mul => "mul",
            Imul => "imul",
            Div => "div",
            Idiv => "idiv",
            Test => "test",
            Rol => "rol",
            Ror => "ror",
            Rcl => "rcl",
            Rcr => "rcr",
            Shl => "shl",
            Shr => "shr",
            Sar => "sar",
            Shld => "shld",
            Shrd => "shrd",
            Mov => "mov",
            Movzx => "movzx",
            Movsx => "movsx",
            Lea => "lea",
            Xchg => "xchg",
            Push => "push",
            Pop => "pop",
            Pusha => "pusha",
            Popa => "popa",
            Pushf => "pushf",
            Popf => "popf",
            Les => "les",
            Lds => "lds",
            Lfs => "lfs",
            Lgs => "lgs",
            Lss => "lss",
            Bound => "bound",
            Arpl => "arpl",
            Cbw => "cbw",
            Cwde => "cwde",
            Cwd => "cwd",
            Cdq => "cdq",
            Sahf => "sahf",
            Lahf => "lahf",
            Clc => "clc",
            Stc => "stc",
            Cli => "cli",
            Sti => "sti",
            Cld => "cld",
            Std => "std",
            Cmc => "cmc",
            Movs => "movs",
            Cmps => "cmps",
            Stos => "stos",
            Lods => "lods",
            Scas => "scas",
            Ins => "ins",
            Outs => "outs",
            Xlat => "xlat",
            Call => "call",
            Jmp => "jmp",
            Ret => "ret",
            Enter => "enter",
            Leave => "leave",
            Int => "int",
            Into => "into",
            Int3 => "int3",
            Iret => "iret",
            Loop => "loop",
            Loope => "loope",
            Loopne => "loopne",
            Jcxz => "jcxz",
            Hlt => "hlt",
            Nop => "nop",
            Wait => "wait",
            Aaa => "aaa",
            Aas => "aas",
            Daa => "daa",
            Das => "das",
            Aam => "aam",
            Aad => "aad",
            In => "in",
            Out => "out",
            Jo => "jo",
            Jno => "jno",
            Jb => "jb",
            Jnb => "jnb",
            Jz => "jz",
            Jnz => "jnz",
            Jbe => "jbe",
            Jnbe => "jnbe",
            Js => "js",
            Jns => "jns",
            Jp => "jp",
            Jnp => "jnp",
            Jl => "jl",
            Jnl => "jnl",
            Jle => "jle",
            Jnle => "jnle",
            Seto => "seto",
            Setno => "setno",
            Setb => "setb",
            Setnb => "setnb",
            Setz => "setz",
            Setnz => "setnz",
            Setbe => "setbe",
            Setnbe => "setnbe",
            Sets => "sets",
            Setns => "setns",
            Setp => "setp",
            Setnp => "setnp",
            Setl => "setl",
            Setnl => "setnl",
            Setle => "setle",
            Setnle => "setnle",
            Lar => "lar",
            Lsl => "lsl",
            Clts => "clts",
            Bt => "bt",
            Bts => "bts",
            Btr => "btr",
            Btc => "btc",
            Bsf => "bsf",
            Bsr => "bsr",
            Sldt => "sldt",
            Str => "str",
            Lldt => "lldt",
            Sgdt => "sgdt",
            Sidt => "sidt",
            Lgdt => "lgdt",
            Lidt => "lidt",
            Ltr => "ltr",
            Verr => "verr",
            Verw => "verw",
            Smsw => "smsw",
            Lmsw => "lmsw",
            Fadd => "fadd",
            Fmul => "fmul",
            Fcom => "fcom",
            Fcomp => "fcomp",
            Fsub => "fsub",
            Fsubr => "fsubr",
            Fdiv => "fdiv",
            Fdivr => "fdivr",
            Faddp => "faddp",
            Fmulp => "fmulp",
            Fcompp => "fcompp",
            Fsubrp => "fsubrp",
            Fsubp => "fsubp",
            Fdivrp => "fdivrp",
            Fdivp => "fdivp",
            Fiadd => "fiadd",
            Fimul => "fimul",
            Ficom => "ficom",
            Ficomp => "ficomp",
            Fisub => "fisub",
            Fisubr => "fisubr",
            Fidiv => "fidiv",
            Fidivr => "fidivr",
            Fld => "fld",
            Fst => "fst",
            Fstp => "fstp",
            Fxch => "fxch",
            Ffree => "ffree",
            Fild => "fild",
            Fist => "fist",
            Fistp => "fistp",
            Fisttp => "fisttp",
            Fbld => "fbld",
            Fbstp => "fbstp",
            Fcmovb => "fcmovb",
            Fcmove => "fcmove",
            Fcmovbe => "fcmovbe",
            Fcmovu => "fcmovu",
            Fcmovnb => "fcmovnb",
            Fcmovne => "fcmovne",
            Fcmovnbe => "fcmovnbe",
            Fcmovnu => "fcmovnu",
            Fucom => "fucom",
            Fucomp => "fucomp",
            Fucompp => "fucompp",
            Fcomi => "fcomi",
            Fcomip => "fcomip",
            Fucomi => "fucomi",
            Fucomip => "fucomip",
            Fldenv => "fldenv",
            Fstenv => "fstenv",
            Frstor => "frstor",
            Fsave => "fsave",
            Fstsw => "fstsw",
            Fstcw => "fstcw",
            Fldcw => "fldcw",
            Fclex => "fclex",
            Finit => "finit",
            Fnop => "fnop",
            Fld1 => "fld1",
            Fldl2t => "fldl2t",
            Fldl2e => "fldl2e",
            Fldpi => "fldpi",
            Fldlg2 => "fldlg2",
            Fldln2 => "fldln2",
            Fldz => "fldz",
            F2xm1 => "f2xm1",
            Fyl2x => "fyl2x",
            Fptan => "fptan",
            Fpatan => "fpatan",
            Fxtract => "fxtract",
            Fprem => "fprem",
            Fprem1 => "fprem1",
            Fdecstp => "fdecstp",
            Fincstp => "fincstp",
            Fsqrt => "fsqrt",
            Fsincos => "fsincos",
            Frndint => "frndint",
            Fscale => "fscale",
            Fsin => "fsin",
            Fcos => "fcos",
            Fchs => "fchs",
            Fabs => "fabs",
            Ftst => "ftst",
            Fxam => "fxam",
        }
    }

    /// Whether `LOCK` (`0xF0`) is legal on this mnemonic (constraint C3).
    pub(crate) fn allows_lock(self) -> bool {
        matches!(
            self,
            Mnemonic::Add
                | Mnemonic::Adc
                | Mnemonic::And
                | Mnemonic::Btc
                | Mnemonic::Btr
                | Mnemonic::Bts
                | Mnemonic::Dec
                | Mnemonic::Inc
                | Mnemonic::Neg
                | Mnemonic::Not
                | Mnemonic::Or
                | Mnemonic::Sbb
                | Mnemonic::Sub
                | Mnemonic::Xor
                | Mnemonic::Xchg
        )
    }

    /// Whether `REP`/`REPE` (`0xF3`) is legal on this mnemonic (constraint
    /// C4).
    pub(crate) fn allows_repeat_equal(self) -> bool {
        matches!(
            self,
            Mnemonic::Ins
                | Mnemonic::Outs
                | Mnemonic::Movs
                | Mnemonic::Lods
                | Mnemonic::Stos
                | Mnemonic::Cmps
                | Mnemonic::Scas
        )
    }

    /// Whether `REPNE` (`0xF2`) is legal on this mnemonic (constraint C4).
    pub(crate) fn allows_repeat_not_equal(self) -> bool {
        matches!(self, Mnemonic::Cmps | Mnemonic::Scas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid() {
        assert_eq!(Mnemonic::default(), Mnemonic::Invalid);
    }

    #[test]
    fn name_spot_checks() {
        assert_eq!(Mnemonic::Add.name(), "add");
        assert_eq!(Mnemonic::Movzx.name(), "movzx");
        assert_eq!(Mnemonic::Fld1.name(), "fld1");
        assert_eq!(Mnemonic::Jmp.name(), "jmp");
    }

    #[test]
    fn lock_is_limited_to_read_modify_write_arithmetic() {
        assert!(Mnemonic::Add.allows_lock());
        assert!(Mnemonic::Xchg.allows_lock());
        assert!(!Mnemonic::Mov.allows_lock());
        assert!(!Mnemonic::Cmp.allows_lock());
    }

    #[test]
    fn repeat_equal_is_limited_to_string_ops() {
        assert!(Mnemonic::Movs.allows_repeat_equal());
        assert!(Mnemonic::Scas.allows_repeat_equal());
        assert!(!Mnemonic::Add.allows_repeat_equal());
    }

    #[test]
    fn repeat_not_equal_is_limited_to_compare_and_scan() {
        assert!(Mnemonic::Cmps.allows_repeat_not_equal());
        assert!(Mnemonic::Scas.allows_repeat_not_equal());
        assert!(!Mnemonic::Movs.allows_repeat_not_equal());
    }
}
