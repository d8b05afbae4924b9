use super::{hash_map, run_test, set_in_state, ExpectedState, ALL_REGISTERS};

use crate::cpu::registers::CpuRegister;

#[test]
fn ld_register_immediate() {
    for r in ALL_REGISTERS {
        let load_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let load_opcode_hex = format!("{load_opcode:02x}");

        let mut expected_state = ExpectedState::empty();
        set_in_state(&mut expected_state, r, 0x7E);

        // LD <r>, 0x7E
        run_test(&format!("{load_opcode_hex}7E"), &expected_state);
    }
}

#[test]
fn ld_register_register() {
    for r in ALL_REGISTERS {
        let load_opcode = 0x78 | r.to_opcode_bits();
        let load_opcode_hex = format!("{load_opcode:02x}");

        let set_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let set_opcode_hex = format!("{set_opcode:02x}");

        // LD <r>, 0x93; LD A, <r>
        run_test(
            &format!("{set_opcode_hex}93{load_opcode_hex}"),
            &ExpectedState { a: Some(0x93), ..ExpectedState::empty() },
        );
    }
}

#[test]
fn ld_indirect_hl() {
    run_test(
        // LD HL, 0xC0A0; LD (HL), 0x42
        "21A0C03642",
        &ExpectedState { memory: hash_map!(0xC0A0: 0x42), ..ExpectedState::empty() },
    );

    run_test(
        // LD HL, 0xC0A0; LD (HL), 0x42; LD A, (HL)
        "21A0C036427E",
        &ExpectedState { a: Some(0x42), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_indirect_hl_inc_dec() {
    run_test(
        // LD HL, 0xC0A0; LD A, 0x99; LD (HL+), A
        "21A0C03E9922",
        &ExpectedState {
            h: Some(0xC0),
            l: Some(0xA1),
            memory: hash_map!(0xC0A0: 0x99),
            ..ExpectedState::empty()
        },
    );

    run_test(
        // LD HL, 0xC0A0; LD A, 0x99; LD (HL-), A
        "21A0C03E9932",
        &ExpectedState {
            h: Some(0xC0),
            l: Some(0x9F),
            memory: hash_map!(0xC0A0: 0x99),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_indirect_bc_de() {
    run_test(
        // LD BC, 0xC0A0; LD A, 0x55; LD (BC), A; LD A, 0x00; LD A, (BC)
        "01A0C03E55023E000A",
        &ExpectedState {
            a: Some(0x55),
            memory: hash_map!(0xC0A0: 0x55),
            ..ExpectedState::empty()
        },
    );

    run_test(
        // LD DE, 0xC0B0; LD A, 0x66; LD (DE), A; LD A, 0x00; LD A, (DE)
        "11B0C03E66123E001A",
        &ExpectedState {
            a: Some(0x66),
            memory: hash_map!(0xC0B0: 0x66),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ldh_direct() {
    run_test(
        // LD A, 0x77; LDH (0x80), A
        "3E77E080",
        &ExpectedState { memory: hash_map!(0xFF80: 0x77), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x77; LDH (0x80), A; LD A, 0x00; LDH A, (0x80)
        "3E77E0803E00F080",
        &ExpectedState { a: Some(0x77), ..ExpectedState::empty() },
    );
}

#[test]
fn ldh_indirect_c() {
    run_test(
        // LD C, 0x81; LD A, 0x5A; LD (0xFF00+C), A
        "0E813E5AE2",
        &ExpectedState { memory: hash_map!(0xFF81: 0x5A), ..ExpectedState::empty() },
    );

    run_test(
        // LD C, 0x81; LD A, 0x5A; LD (0xFF00+C), A; LD A, 0x00; LD A, (0xFF00+C)
        "0E813E5AE23E00F2",
        &ExpectedState { a: Some(0x5A), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_direct() {
    run_test(
        // LD A, 0x42; LD (0xC800), A
        "3E42EA00C8",
        &ExpectedState { memory: hash_map!(0xC800: 0x42), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x42; LD (0xC800), A; LD A, 0x00; LD A, (0xC800)
        "3E42EA00C83E00FA00C8",
        &ExpectedState { a: Some(0x42), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_register_pair_immediate() {
    run_test(
        // LD BC, 0x1234
        "013412",
        &ExpectedState { b: Some(0x12), c: Some(0x34), ..ExpectedState::empty() },
    );

    run_test(
        // LD SP, 0xDFFE
        "31FEDF",
        &ExpectedState { sp: Some(0xDFFE), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_direct_stack_pointer() {
    run_test(
        // LD SP, 0xDFFE; LD (0xC800), SP
        "31FEDF0800C8",
        &ExpectedState {
            memory: hash_map!(0xC800: 0xFE, 0xC801: 0xDF),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn ld_sp_hl() {
    run_test(
        // LD HL, 0xDDAA; LD SP, HL
        "21AADDF9",
        &ExpectedState { sp: Some(0xDDAA), ..ExpectedState::empty() },
    );
}

#[test]
fn push_pop() {
    run_test(
        // LD BC, 0xABCD; PUSH BC; POP HL
        "01CDABC5E1",
        &ExpectedState {
            h: Some(0xAB),
            l: Some(0xCD),
            sp: Some(0xFFFE),
            memory: hash_map!(0xFFFC: 0xCD, 0xFFFD: 0xAB),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn pop_af_masks_low_flag_bits() {
    run_test(
        // LD BC, 0xAA3F; PUSH BC; POP AF
        "013FAAC5F1",
        &ExpectedState { a: Some(0xAA), f: Some(0x30), ..ExpectedState::empty() },
    );

    // Pushing AF back and popping into BC shows the masked value
    run_test(
        // LD BC, 0xAA3F; PUSH BC; POP AF; PUSH AF; POP BC
        "013FAAC5F1F5C1",
        &ExpectedState { b: Some(0xAA), c: Some(0x30), ..ExpectedState::empty() },
    );
}
