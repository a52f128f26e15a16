//! General decoder properties (P1-P10), each checked via a concrete
//! representative case rather than exhaustive quantification.

use ia32_decode::{
    DataSize, DecodeErrorKind, Decoder, Operand, Register, RepeatMode, SliceStream, Width,
};

fn decoder32() -> Decoder {
    Decoder::new(Width::Bits32)
}

// P1: determinism.
#[test]
fn same_bytes_decode_identically_twice() {
    let decoder = decoder32();
    let bytes = [0x03, 0xC3];

    let mut a = SliceStream::new(&bytes, 0);
    let first = decoder.disassemble(&mut a).unwrap();

    let mut b = SliceStream::new(&bytes, 0);
    let second = decoder.disassemble(&mut b).unwrap();

    assert_eq!(first, second);
}

// P2: consumed length matches the documented encoded length.
#[test]
fn consumed_length_matches_encoding() {
    let decoder = decoder32();

    // ADD Eb, Gb, register form: opcode + modrm, no displacement/immediate.
    let mut s = SliceStream::new(&[0x00, 0xC1], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.length, 2);
    assert_eq!(s.consumed(), 2);

    // MOV Eb, Ib: opcode + modrm + immediate byte.
    let mut s = SliceStream::new(&[0xC6, 0x00, 0x7F], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.length, 3);
}

// P3: an unallocated primary opcode byte raises `invalid opcode` after
// consuming exactly one byte.
#[test]
fn unallocated_primary_opcode_consumes_one_byte() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0x82, 0x00], 0);
    let err = decoder.disassemble(&mut s).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::InvalidOpcode);
    assert_eq!(s.consumed(), 1);
}

// P4: a repeated prefix category raises `multiple ... prefixes`.
#[test]
fn duplicate_operand_size_prefix_is_rejected() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0x66, 0x66, 0x90], 0);
    let err = decoder.disassemble(&mut s).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::DuplicatePrefix);
}

// P5: LOCK on a mnemonic outside the legal set is rejected even when the
// destination is memory (distinct from the register-destination case).
#[test]
fn lock_on_non_lockable_mnemonic_is_illegal() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0xF0, 0x89, 0x00], 0);
    let err = decoder.disassemble(&mut s).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::IllegalLock);
}

// P6: REP/REPE on a mnemonic outside the string-op subset is rejected.
#[test]
fn repeat_equal_on_non_string_op_is_illegal() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0xF3, 0x01, 0xC3], 0);
    let err = decoder.disassemble(&mut s).unwrap_err();
    assert_eq!(err.kind(), DecodeErrorKind::IllegalRepeat);
}

// P7: the ModR/M byte is read once and reused for both the `reg` and
// `r/m` fields; a double read would mis-consume the stream and produce
// the wrong length / wrong operands.
#[test]
fn modrm_byte_is_read_only_once() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0x00, 0xC1], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.length, 2);
    assert_eq!(insn.operands[0], Operand::Register(Register::Cl));
    assert_eq!(insn.operands[1], Operand::Register(Register::Al));
}

// P8: operands land in append order and operand_count matches the list.
#[test]
fn operand_count_matches_pushed_operands() {
    let decoder = decoder32();

    let mut s = SliceStream::new(&[0x90], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.operand_count(), 0);

    let mut s = SliceStream::new(&[0xC6, 0x00, 0x7F], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.operand_count(), 2);

    let mut s = SliceStream::new(&[0x69, 0xC0, 0x10, 0x00, 0x00, 0x00], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.operand_count(), 3);
}

// P9: a `DontDereference` r/m form (LEA) never wraps its result in
// `Indirect`.
#[test]
fn lea_operand_is_never_indirect() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0x8D, 0x04, 0x19], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert!(!matches!(insn.operands[1], Operand::Indirect { .. }));
}

// P10: register/segment operands compare equal by value across
// independent decodes.
#[test]
fn register_operands_compare_by_value_across_decodes() {
    let decoder = decoder32();

    let mut first = SliceStream::new(&[0x50], 0); // PUSH EAX
    let insn1 = decoder.disassemble(&mut first).unwrap();

    let mut second = SliceStream::new(&[0x50], 0x1000);
    let insn2 = decoder.disassemble(&mut second).unwrap();

    assert_eq!(insn1.operands[0], insn2.operands[0]);
    assert_eq!(insn1.operands[0], Operand::Register(Register::Eax));
}

#[test]
fn repeat_mode_defaults_to_none() {
    let decoder = decoder32();
    let mut s = SliceStream::new(&[0x90], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(insn.repeat, RepeatMode::None);
}

#[test]
fn far_immediate_moffs_size_tracks_address_size() {
    let decoder = decoder32();
    // MOV AL, [0x00001234] (absolute moffs address, 32-bit default address size).
    let mut s = SliceStream::new(&[0xA0, 0x34, 0x12, 0x00, 0x00], 0);
    let insn = decoder.disassemble(&mut s).unwrap();
    assert_eq!(
        insn.operands[1],
        Operand::Indirect {
            inner: Box::new(Operand::Immediate { value: 0x1234, size: DataSize::Dword }),
            size: DataSize::Byte,
            segment: None,
        }
    );
}
