use super::{hash_map, run_test, ExpectedState};

#[test]
fn rlca_forces_z_clear() {
    run_test(
        // LD A, 0x80; RLCA
        "3E8007",
        &ExpectedState { a: Some(0x01), f: Some(0x10), ..ExpectedState::empty() },
    );

    // A rotate result of zero still leaves Z clear
    run_test(
        // LD A, 0x00; RLCA
        "3E0007",
        &ExpectedState { a: Some(0x00), f: Some(0x00), ..ExpectedState::empty() },
    );
}

#[test]
fn rrca() {
    run_test(
        // LD A, 0x01; RRCA
        "3E010F",
        &ExpectedState { a: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn rla_uses_carry() {
    run_test(
        // LD A, 0x80; SCF; RLA
        "3E803717",
        &ExpectedState { a: Some(0x01), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn rra_uses_carry() {
    run_test(
        // LD A, 0x01; SCF; RRA
        "3E01371F",
        &ExpectedState { a: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn rlc_register() {
    run_test(
        // LD B, 0x80; RLC B
        "0680CB00",
        &ExpectedState { b: Some(0x01), f: Some(0x10), ..ExpectedState::empty() },
    );

    // Unlike RLCA, the CB-prefixed rotate computes Z
    run_test(
        // LD B, 0x00; RLC B
        "0600CB00",
        &ExpectedState { b: Some(0x00), f: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn rrc_register() {
    run_test(
        // LD C, 0x01; RRC C
        "0E01CB09",
        &ExpectedState { c: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn rl_rr_register() {
    run_test(
        // LD D, 0x80; SCF; RL D
        "168037CB12",
        &ExpectedState { d: Some(0x01), f: Some(0x10), ..ExpectedState::empty() },
    );

    run_test(
        // LD E, 0x01; SCF; RR E
        "1E0137CB1B",
        &ExpectedState { e: Some(0x80), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn sla_register() {
    run_test(
        // LD B, 0x81; SLA B
        "0681CB20",
        &ExpectedState { b: Some(0x02), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn sra_preserves_sign_bit() {
    run_test(
        // LD B, 0x81; SRA B
        "0681CB28",
        &ExpectedState { b: Some(0xC0), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn srl_register() {
    run_test(
        // LD B, 0x81; SRL B
        "0681CB38",
        &ExpectedState { b: Some(0x40), f: Some(0x10), ..ExpectedState::empty() },
    );
}

#[test]
fn swap_register() {
    run_test(
        // LD A, 0xAB; SWAP A
        "3EABCB37",
        &ExpectedState { a: Some(0xBA), f: Some(0x00), ..ExpectedState::empty() },
    );

    // Applying SWAP twice restores the original value
    run_test(
        // LD A, 0xAB; SWAP A; SWAP A
        "3EABCB37CB37",
        &ExpectedState { a: Some(0xAB), f: Some(0x00), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x00; SWAP A
        "3E00CB37",
        &ExpectedState { a: Some(0x00), f: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn bit_test() {
    run_test(
        // LD A, 0x08; OR A; BIT 3, A
        "3E08B7CB5F",
        &ExpectedState { f: Some(0x20), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x08; OR A; BIT 4, A
        "3E08B7CB67",
        &ExpectedState { f: Some(0xA0), ..ExpectedState::empty() },
    );

    // BIT preserves the carry flag
    run_test(
        // LD A, 0x08; SCF; BIT 3, A
        "3E0837CB5F",
        &ExpectedState { f: Some(0x30), ..ExpectedState::empty() },
    );
}

#[test]
fn res_set_bit() {
    run_test(
        // LD A, 0xFF; RES 0, A
        "3EFFCB87",
        &ExpectedState { a: Some(0xFE), ..ExpectedState::empty() },
    );

    run_test(
        // LD A, 0x00; SET 7, A
        "3E00CBFF",
        &ExpectedState { a: Some(0x80), ..ExpectedState::empty() },
    );
}

#[test]
fn rotate_indirect_hl() {
    run_test(
        // LD HL, 0xC0A0; LD (HL), 0x81; RLC (HL)
        "21A0C03681CB06",
        &ExpectedState {
            f: Some(0x10),
            memory: hash_map!(0xC0A0: 0x03),
            ..ExpectedState::empty()
        },
    );

    run_test(
        // LD HL, 0xC0A0; LD (HL), 0x01; SRL (HL)
        "21A0C03601CB3E",
        &ExpectedState {
            f: Some(0x90),
            memory: hash_map!(0xC0A0: 0x00),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn set_indirect_hl() {
    run_test(
        // LD HL, 0xC0A0; LD (HL), 0x00; SET 5, (HL)
        "21A0C03600CBEE",
        &ExpectedState { memory: hash_map!(0xC0A0: 0x20), ..ExpectedState::empty() },
    );
}
