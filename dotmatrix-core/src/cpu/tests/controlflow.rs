use super::{run_test, ExpectedState};

use crate::cpu::instructions::parse_next_instruction;
use crate::cpu::CpuRegisters;
use crate::memory::{AddressSpace, Cartridge};

#[test]
fn jp_absolute() {
    run_test(
        // LD A, 0x11; JP 0x0157; LD A, 0x22
        "3E11C357013E22",
        &ExpectedState { a: Some(0x11), ..ExpectedState::empty() },
    );
}

#[test]
fn jp_hl() {
    run_test(
        // LD A, 0x11; LD HL, 0x0158; JP HL; LD A, 0x22
        "3E11215801E93E22",
        &ExpectedState { a: Some(0x11), ..ExpectedState::empty() },
    );
}

#[test]
fn jp_conditional() {
    // Z set: jump taken, skipping the second load
    run_test(
        // LD A, 0x00; OR A; JP Z, 0x0158; LD A, 0x22
        "3E00B7CA58013E22",
        &ExpectedState { a: Some(0x00), ..ExpectedState::empty() },
    );

    // Z clear: jump not taken
    run_test(
        // LD A, 0x01; OR A; JP Z, 0x0158; LD A, 0x22
        "3E01B7CA58013E22",
        &ExpectedState { a: Some(0x22), ..ExpectedState::empty() },
    );
}

#[test]
fn jr_relative() {
    run_test(
        // LD A, 0x11; JR +2; LD A, 0x22
        "3E1118023E22",
        &ExpectedState { a: Some(0x11), ..ExpectedState::empty() },
    );
}

#[test]
fn jr_conditional() {
    // XOR A sets Z, so the jump is taken
    run_test(
        // XOR A; JR Z, +2; LD A, 0x22
        "AF28023E22",
        &ExpectedState { a: Some(0x00), ..ExpectedState::empty() },
    );

    // NZ is false after XOR A, so the load executes
    run_test(
        // XOR A; JR NZ, +2; LD A, 0x22
        "AF20023E22",
        &ExpectedState { a: Some(0x22), ..ExpectedState::empty() },
    );
}

#[test]
fn call_and_return() {
    run_test(
        // CALL 0x0158; LD A, 0x99; JP 0x015B; [0x0158] LD B, 0x42; RET
        "CD58013E99C35B010642C9",
        &ExpectedState {
            a: Some(0x99),
            b: Some(0x42),
            sp: Some(0xFFFE),
            ..ExpectedState::empty()
        },
    );
}

#[test]
fn conditional_call_not_taken() {
    run_test(
        // LD A, 0x01; OR A; CALL Z, 0x0160; LD B, 0x11
        "3E01B7CC60010611",
        &ExpectedState { b: Some(0x11), sp: Some(0xFFFE), ..ExpectedState::empty() },
    );
}

#[test]
fn conditional_return() {
    run_test(
        // CALL 0x0158; JP 0x015E; [0x0158] LD B, 0x42; XOR A; RET Z; LD B, 0x11
        "CD5801C35E0100000642AFC80611",
        &ExpectedState { b: Some(0x42), sp: Some(0xFFFE), ..ExpectedState::empty() },
    );
}

fn new_address_space_with_program(program: &[u8]) -> AddressSpace {
    let mut rom = vec![0; 0x4000];
    rom[0x150..0x150 + program.len()].copy_from_slice(program);
    AddressSpace::new(Cartridge::new(rom).expect("synthesized test ROM should be valid"))
}

fn execute_one(address_space: &mut AddressSpace, cpu_registers: &mut CpuRegisters) -> u32 {
    let (instruction, pc) = parse_next_instruction(address_space, cpu_registers.pc);
    cpu_registers.pc = pc;
    let cycles = instruction.cycles_required(cpu_registers);
    instruction.execute(address_space, cpu_registers);
    cycles
}

#[test]
fn rst_pushes_and_jumps() {
    // RST 0x08
    let mut address_space = new_address_space_with_program(&[0xCF]);
    let mut cpu_registers = CpuRegisters::new();
    cpu_registers.pc = 0x0150;

    let cycles = execute_one(&mut address_space, &mut cpu_registers);

    assert_eq!(16, cycles);
    assert_eq!(0x0008, cpu_registers.pc);
    assert_eq!(0xFFFC, cpu_registers.sp);
    // Return address is the instruction after the RST
    assert_eq!(0x0151, address_space.read_address_u16(0xFFFC));
}

#[test]
fn reti_sets_ime() {
    // RETI with a return address of 0xC123 on the stack
    let mut address_space = new_address_space_with_program(&[0xD9]);
    let mut cpu_registers = CpuRegisters::new();
    cpu_registers.pc = 0x0150;
    cpu_registers.sp = 0xFFFC;
    cpu_registers.ime = false;
    address_space.write_address_u16(0xFFFC, 0xC123);

    let cycles = execute_one(&mut address_space, &mut cpu_registers);

    assert_eq!(16, cycles);
    assert_eq!(0xC123, cpu_registers.pc);
    assert_eq!(0xFFFE, cpu_registers.sp);
    assert!(cpu_registers.ime);
}

#[test]
fn halt_sets_halt_flag() {
    let mut address_space = new_address_space_with_program(&[0x76]);
    let mut cpu_registers = CpuRegisters::new();
    cpu_registers.pc = 0x0150;

    let cycles = execute_one(&mut address_space, &mut cpu_registers);

    assert_eq!(4, cycles);
    assert!(cpu_registers.halted);
}

#[test]
fn di_ei_toggle_ime() {
    // DI; EI
    let mut address_space = new_address_space_with_program(&[0xF3, 0xFB]);
    let mut cpu_registers = CpuRegisters::new();
    cpu_registers.pc = 0x0150;
    cpu_registers.ime = true;

    execute_one(&mut address_space, &mut cpu_registers);
    assert!(!cpu_registers.ime);

    execute_one(&mut address_space, &mut cpu_registers);
    assert!(cpu_registers.ime);
    // EI takes effect after the following instruction
    assert!(cpu_registers.interrupt_delay);
}

#[test]
fn invalid_opcode_is_four_cycle_noop() {
    let mut address_space = new_address_space_with_program(&[0xD3]);
    let mut cpu_registers = CpuRegisters::new();
    cpu_registers.pc = 0x0150;
    let snapshot = cpu_registers.clone();

    let cycles = execute_one(&mut address_space, &mut cpu_registers);

    assert_eq!(4, cycles);
    assert_eq!(0x0151, cpu_registers.pc);
    assert_eq!(snapshot.accumulator, cpu_registers.accumulator);
    assert_eq!(snapshot.flags, cpu_registers.flags);
    assert_eq!(snapshot.sp, cpu_registers.sp);
}
