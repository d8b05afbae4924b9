use super::{run_test, ExpectedState, ALL_REGISTERS};

use crate::cpu::registers::CpuRegister;

#[test]
fn add_immediate() {
    run_test(
        // LD A, 0x05; ADD 0xDE
        "3E05C6DE",
        &ExpectedState { a: Some(0xE3), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x01; ADD 0x03
        "3E01C603",
        &ExpectedState { a: Some(0x04), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x55; ADD 0xAB
        "3E55C6AB",
        &ExpectedState { a: Some(0x00), f: Some(0xB0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xFF; ADD 0x12
        "3EFFC612",
        &ExpectedState { a: Some(0x11), f: Some(0x30), ..ExpectedState::empty() },
    );

    // The carry flag does not affect plain ADD
    run_test(
        // LD A, 0xFF; SCF; ADD 0x12
        "3EFF37C612",
        &ExpectedState { a: Some(0x11), f: Some(0x30), ..ExpectedState::empty() },
    );
}

#[test]
fn add_half_carry() {
    run_test(
        // LD A, 0x0F; LD B, 0x01; ADD B
        "3E0F060180",
        &ExpectedState { a: Some(0x10), f: Some(0x20), ..ExpectedState::empty() },
    );
}

#[test]
fn add_register() {
    for r in ALL_REGISTERS {
        let load_opcode = 0x06 | (r.to_opcode_bits() << 3);
        let load_opcode_hex = format!("{load_opcode:02x}");

        let add_opcode = 0x80 | r.to_opcode_bits();
        let add_opcode_hex = format!("{add_opcode:02x}");

        let (expected_a, expected_f) = match r {
            CpuRegister::A => (0x68, 0x10),
            _ => (0xEA, 0x00),
        };

        run_test(
            // LD A, 0x36; LD <r>, 0xB4; ADD <r>
            &format!("3E36{load_opcode_hex}B4{add_opcode_hex}"),
            &ExpectedState {
                a: Some(expected_a),
                f: Some(expected_f),
                ..ExpectedState::empty()
            },
        );
    }
}

#[test]
fn add_indirect_hl() {
    run_test(
        // LD HL, 0xCDA4; LD (HL), 0x3B; LD A, 0xA1; ADD (HL)
        "21A4CD363B3EA186",
        &ExpectedState { a: Some(0xDC), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn adc_immediate() {
    run_test(
        // LD A, 0xBC; ADC 0x15
        "3EBCCE15",
        &ExpectedState { a: Some(0xD1), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xBC; SCF; ADC 0x15
        "3EBC37CE15",
        &ExpectedState { a: Some(0xD2), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xFE; SCF; ADC 0x01
        "3EFE37CE01",
        &ExpectedState { a: Some(0x00), f: Some(0xB0), ..ExpectedState::empty() },
    );
}

#[test]
fn sub_immediate() {
    run_test(
        // LD A, 0x3E; SUB 0x3E
        "3E3ED63E",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3E; SUB 0x40
        "3E3ED640",
        &ExpectedState { a: Some(0xFE), f: Some(0x50), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x3E; SUB 0x0F
        "3E3ED60F",
        &ExpectedState { a: Some(0x2F), f: Some(0x60), ..ExpectedState::empty() },
    );
}

#[test]
fn sbc_immediate() {
    run_test(
        // LD A, 0x3E; SCF; SBC 0x0F
        "3E3E37DE0F",
        &ExpectedState { a: Some(0x2E), f: Some(0x60), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x00; SCF; SBC 0x00
        "3E0037DE00",
        &ExpectedState { a: Some(0xFF), f: Some(0x70), ..ExpectedState::empty() },
    );
}

#[test]
fn cp_immediate() {
    // CP discards the result, only flags change
    run_test(
        // LD A, 0x11; CP 0x22
        "3E11FE22",
        &ExpectedState { a: Some(0x11), f: Some(0x70), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x11; CP 0x11
        "3E11FE11",
        &ExpectedState { a: Some(0x11), f: Some(0xC0), ..ExpectedState::empty() },
    );
}

#[test]
fn inc_register() {
    run_test(
        // LD A, 0x0F; OR A; INC A
        "3E0FB73C",
        &ExpectedState { a: Some(0x10), f: Some(0x20), ..ExpectedState::empty() },
    );

    // INC preserves the carry flag
    run_test(
        // LD A, 0xFF; SCF; INC A
        "3EFF373C",
        &ExpectedState { a: Some(0x00), f: Some(0xB0), ..ExpectedState::empty() },
    );
}

#[test]
fn dec_register() {
    run_test(
        // LD A, 0x10; OR A; DEC A
        "3E10B73D",
        &ExpectedState { a: Some(0x0F), f: Some(0x60), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x01; OR A; DEC A
        "3E01B73D",
        &ExpectedState { a: Some(0x00), f: Some(0xC0), ..ExpectedState::empty() },
    );
}

#[test]
fn and_or_xor_immediate() {
    run_test(
        // LD A, 0x0F; AND 0x55
        "3E0FE655",
        &ExpectedState { a: Some(0x05), f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0xF0; AND 0x0F
        "3EF0E60F",
        &ExpectedState { a: Some(0x00), f: Some(0xA0), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x0F; OR 0x55
        "3E0FF655",
        &ExpectedState { a: Some(0x5F), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x5F; XOR 0x5F
        "3E5FEE5F",
        &ExpectedState { a: Some(0x00), f: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn daa_after_add() {
    run_test(
        // LD A, 0x45; LD B, 0x38; ADD B; DAA
        "3E4506388027",
        &ExpectedState { a: Some(0x83), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x99; LD B, 0x01; ADD B; DAA
        "3E9906018027",
        &ExpectedState { a: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );
}

#[test]
fn daa_after_sub() {
    run_test(
        // LD A, 0x45; LD B, 0x38; SUB B; DAA
        "3E4506389027",
        &ExpectedState { a: Some(0x07), f: Some(0x40), ..ExpectedState::empty() },
    );
}

#[test]
fn cpl() {
    // CPL sets N and H and preserves Z and C (both set at power-up)
    run_test(
        // LD A, 0x55; CPL
        "3E552F",
        &ExpectedState { a: Some(0xAA), f: Some(0xF0), ..ExpectedState::empty() },
    );

    // Applying CPL twice restores the original value
    run_test(
        // LD A, 0x55; CPL; CPL
        "3E552F2F",
        &ExpectedState { a: Some(0x55), f: Some(0xF0), ..ExpectedState::empty() },
    );
}

#[test]
fn scf_ccf() {
    // Z is preserved (set at power-up)
    run_test("37", &ExpectedState { f: Some(0x90), ..ExpectedState::empty() });

    run_test(
        // SCF; CCF
        "373F",
        &ExpectedState { f: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn add_hl_register_pair() {
    run_test(
        // LD HL, 0x0FFF; LD BC, 0x0001; ADD HL, BC
        "21FF0F01010009",
        &ExpectedState {
            h: Some(0x10),
            l: Some(0x00),
            // Z is preserved (set at power-up), N cleared, H set, C clear
            f: Some(0xA0),
            ..ExpectedState::empty()
        },
    );

    run_test(
        // LD HL, 0x8000; LD DE, 0x8000; ADD HL, DE
        "21008011008019",
        &ExpectedState { h: Some(0x00), l: Some(0x00), f: Some(0x90), ..ExpectedState::empty() },
    );
}

#[test]
fn inc_dec_register_pair() {
    run_test(
        // LD BC, 0x00FF; INC BC
        "01FF0003",
        &ExpectedState { b: Some(0x01), c: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD DE, 0x0100; DEC DE
        "1100011B",
        &ExpectedState { d: Some(0x00), e: Some(0xFF), ..ExpectedState::empty() },
    );
}

#[test]
fn add_sp_immediate() {
    run_test(
        // LD SP, 0x0A00; ADD SP, +1
        "31000AE801",
        &ExpectedState { sp: Some(0x0A01), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD SP, 0xD001; ADD SP, -1
        "3101D0E8FF",
        &ExpectedState { sp: Some(0xD000), f: Some(0x30), ..ExpectedState::empty() },
    );

    run_test(
        // LD SP, 0xD000; ADD SP, -1
        "3100D0E8FF",
        &ExpectedState { sp: Some(0xCFFF), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn ld_hl_sp_offset() {
    run_test(
        // LD SP, 0xCFFF; LDHL SP, +1
        "31FFCFF801",
        &ExpectedState {
            h: Some(0xD0),
            l: Some(0x00),
            sp: Some(0xCFFF),
            f: Some(0x30),
            ..ExpectedState::empty()
        },
    );
}
