//! Concrete end-to-end decode scenarios (S1-S15).

use ia32_decode::{
    DataSize, DecodeErrorKind, Decoder, Operand, Register, RepeatMode, SliceStream, Width,
};

fn decode(bytes: &[u8], width: Width) -> ia32_decode::Result<ia32_decode::DecodedInstruction> {
    let decoder = Decoder::new(width);
    let mut source = SliceStream::new(bytes, 0);
    decoder.disassemble(&mut source)
}

fn decode32(bytes: &[u8]) -> ia32_decode::DecodedInstruction {
    decode(bytes, Width::Bits32).expect("expected a successful decode")
}

// S1
#[test]
fn nop_has_no_operands() {
    let insn = decode32(&[0x90]);
    assert_eq!(insn.opcode.name(), "nop");
    assert_eq!(insn.length, 1);
    assert_eq!(insn.operand_count(), 0);
}

// S2
#[test]
fn ret_is_near_with_no_operands() {
    let insn = decode32(&[0xC3]);
    assert_eq!(insn.opcode.name(), "ret");
    assert!(insn.near);
    assert_eq!(insn.operand_count(), 0);
}

// S3
#[test]
fn hlt_decodes() {
    let insn = decode32(&[0xF4]);
    assert_eq!(insn.opcode.name(), "hlt");
}

// S4
#[test]
fn add_register_form() {
    let insn = decode32(&[0x03, 0xC3]);
    assert_eq!(insn.opcode.name(), "add");
    assert_eq!(insn.operands, vec![
        Operand::Register(Register::Eax),
        Operand::Register(Register::Ebx),
    ]);
}

// S5
#[test]
fn operand_size_override_toggles_to_16_bit() {
    let insn = decode32(&[0x66, 0x03, 0xC3]);
    assert_eq!(insn.opcode.name(), "add");
    assert_eq!(insn.operands, vec![
        Operand::Register(Register::Ax),
        Operand::Register(Register::Bx),
    ]);
}

// S6
#[test]
fn lock_on_memory_destination_is_legal() {
    let insn = decode32(&[0xF0, 0x01, 0x00]);
    assert_eq!(insn.opcode.name(), "add");
    assert!(insn.locked);
    assert_eq!(
        insn.operands[0],
        Operand::Indirect {
            inner: Box::new(Operand::Register(Register::Eax)),
            size: DataSize::Dword,
            segment: None,
        }
    );
    assert_eq!(insn.operands[1], Operand::Register(Register::Eax));
}

// S7
#[test]
fn lock_on_register_destination_is_illegal() {
    let err = decode(&[0xF0, 0x89, 0xC3], Width::Bits32).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::IllegalLock);
}

// S8
#[test]
fn lea_never_wraps_in_indirect() {
    let insn = decode32(&[0x8D, 0x04, 0x19]);
    assert_eq!(insn.opcode.name(), "lea");
    assert_eq!(insn.operands[0], Operand::Register(Register::Eax));
    assert_eq!(
        insn.operands[1],
        Operand::Addition(
            Box::new(Operand::Register(Register::Ecx)),
            Box::new(Operand::Scale {
                index: Box::new(Operand::Register(Register::Ebx)),
                scale: 1,
            }),
        )
    );
}

// S9
#[test]
fn sib_with_8_bit_displacement() {
    let insn = decode32(&[0x8B, 0x44, 0x8A, 0x10]);
    assert_eq!(insn.opcode.name(), "mov");
    assert_eq!(insn.operands[0], Operand::Register(Register::Eax));
    let expected_address = Operand::Addition(
        Box::new(Operand::Addition(
            Box::new(Operand::Register(Register::Edx)),
            Box::new(Operand::Scale {
                index: Box::new(Operand::Register(Register::Ecx)),
                scale: 4,
            }),
        )),
        Box::new(Operand::Immediate { value: 0x10, size: DataSize::Byte }),
    );
    assert_eq!(
        insn.operands[1],
        Operand::Indirect {
            inner: Box::new(expected_address),
            size: DataSize::Dword,
            segment: None,
        }
    );
}

// S10
#[test]
fn repne_cmps_is_legal() {
    let insn = decode32(&[0xF2, 0xA6]);
    assert_eq!(insn.opcode.name(), "cmps");
    assert_eq!(insn.repeat, RepeatMode::NotEqual);
}

// S11
#[test]
fn repne_on_nop_is_illegal() {
    let err = decode(&[0xF2, 0x90], Width::Bits32).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::IllegalRepeat);
}

// S12
#[test]
fn short_jump_sign_extends_negative_displacement() {
    let insn = decode32(&[0xEB, 0xFE]);
    assert_eq!(insn.opcode.name(), "jmp");
    assert!(insn.near);
    assert_eq!(insn.operands[0], Operand::Immediate { value: -2, size: DataSize::Byte });
}

// S13
#[test]
fn x87_register_form_fld1() {
    let insn = decode32(&[0xD9, 0xE8]);
    assert_eq!(insn.opcode.name(), "fld1");
    assert_eq!(insn.operand_count(), 0);
}

// S14
#[test]
fn movzx_byte_source() {
    let insn = decode32(&[0x0F, 0xB6, 0xC3]);
    assert_eq!(insn.opcode.name(), "movzx");
    assert_eq!(insn.operands[0], Operand::Register(Register::Eax));
    assert_eq!(insn.operands[1], Operand::Register(Register::Bl));
}

#[test]
fn imul_gv_ev_register_form() {
    let insn = decode32(&[0x0F, 0xAF, 0xC3]);
    assert_eq!(insn.opcode.name(), "imul");
    assert_eq!(insn.operands[0], Operand::Register(Register::Eax));
    assert_eq!(insn.operands[1], Operand::Register(Register::Ebx));
}

#[test]
fn group6_str_and_lldt_are_distinct_from_group7_sidt_and_lgdt() {
    // Group 6 (`0F 00`), register form: reg=1 is STR, reg=2 is LLDT.
    let str_insn = decode32(&[0x0F, 0x00, 0xC8]);
    assert_eq!(str_insn.opcode.name(), "str");

    let lldt_insn = decode32(&[0x0F, 0x00, 0xD0]);
    assert_eq!(lldt_insn.opcode.name(), "lldt");

    // Group 7 (`0F 01`), memory form (`SIDT`/`LGDT` are memory-only):
    // mod=0, rm=0 -> `[EAX]`; reg=1 is SIDT, reg=2 is LGDT.
    let sidt_insn = decode32(&[0x0F, 0x01, 0x08]);
    assert_eq!(sidt_insn.opcode.name(), "sidt");

    let lgdt_insn = decode32(&[0x0F, 0x01, 0x10]);
    assert_eq!(lgdt_insn.opcode.name(), "lgdt");
}

// S15
#[test]
fn default_16_bit_address_with_displacement_only() {
    let insn = decode(&[0x03, 0x06, 0x34, 0x12], Width::Bits16).unwrap();
    assert_eq!(insn.opcode.name(), "add");
    assert_eq!(insn.operands[0], Operand::Register(Register::Ax));
    assert_eq!(
        insn.operands[1],
        Operand::Indirect {
            inner: Box::new(Operand::Immediate { value: 0x1234, size: DataSize::Word }),
            size: DataSize::Word,
            segment: None,
        }
    );
}
