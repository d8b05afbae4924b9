pub(crate) mod instructions;
mod registers;


pub use registers::{CpuRegister, CpuRegisters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    VBlank,
    LcdStatus,
    Timer,
    Serial,
    Joypad,
}

impl InterruptType {
    /// All interrupt types, ordered from highest to lowest priority.
    pub const ALL: [Self; 5] =
        [Self::VBlank, Self::LcdStatus, Self::Timer, Self::Serial, Self::Joypad];

    /// The bit representing this interrupt in the IF and IE registers.
    pub fn bit(self) -> u8 {
        match self {
            Self::VBlank => 1 << 0,
            Self::LcdStatus => 1 << 1,
            Self::Timer => 1 << 2,
            Self::Serial => 1 << 3,
            Self::Joypad => 1 << 4,
        }
    }

    /// The fixed address of this interrupt's service routine.
    pub fn handler_address(self) -> u16 {
        match self {
            Self::VBlank => 0x0040,
            Self::LcdStatus => 0x0048,
            Self::Timer => 0x0050,
            Self::Serial => 0x0058,
            Self::Joypad => 0x0060,
        }
    }
}

use crate::memory::ioregisters::IoRegister;
use crate::memory::AddressSpace;

/// Cycles consumed by jumping to an interrupt service routine.
pub const ISR_CYCLES_REQUIRED: u32 = 20;

/// Whether the CPU should jump to an interrupt service routine before
/// executing the next instruction.
pub fn interrupt_triggered(cpu_registers: &CpuRegisters, address_space: &AddressSpace) -> bool {
    cpu_registers.ime
        && !cpu_registers.interrupt_delay
        && interrupt_triggered_no_ime_check(address_space)
}

/// Whether any enabled interrupt is requested, regardless of the IME flag.
/// A pending interrupt wakes the CPU from HALT even while IME is clear.
pub fn interrupt_triggered_no_ime_check(address_space: &AddressSpace) -> bool {
    let if_value = address_space.get_io_registers().read_register(IoRegister::IF);
    let ie_value = address_space.get_ie_register();
    if_value & ie_value & 0x1F != 0
}

/// Jump to the service routine for the highest-priority pending interrupt:
/// clear IME and that interrupt's IF bit, push PC, and jump to the fixed
/// handler address.
pub fn execute_interrupt_service_routine(
    cpu_registers: &mut CpuRegisters,
    address_space: &mut AddressSpace,
) {
    let io_registers = address_space.get_io_registers_mut();
    let Some(interrupt_type) = io_registers.highest_priority_interrupt() else {
        return;
    };

    io_registers.interrupt_flags().clear(interrupt_type);

    cpu_registers.halted = false;
    cpu_registers.ime = false;

    cpu_registers.sp = cpu_registers.sp.wrapping_sub(2);
    address_space.write_address_u16(cpu_registers.sp, cpu_registers.pc);

    log::trace!(
        "Servicing {interrupt_type:?} interrupt, jumping from {:04X} to {:04X}",
        cpu_registers.pc,
        interrupt_type.handler_address()
    );

    cpu_registers.pc = interrupt_type.handler_address();
}

#[cfg(test)]
mod interrupt_tests {
    use super::*;
    use crate::memory::Cartridge;

    fn new_address_space() -> AddressSpace {
        AddressSpace::new(Cartridge::new(vec![0; 0x8000]).expect("test ROM should be valid"))
    }

    #[test]
    fn vblank_dispatch() {
        let mut address_space = new_address_space();
        let mut cpu_registers = CpuRegisters::new();

        cpu_registers.ime = true;
        cpu_registers.pc = 0x1234;
        cpu_registers.sp = 0xFFFE;

        address_space.write_address_u8(0xFFFF, 0x01);
        address_space.get_io_registers_mut().write_register(IoRegister::IF, 0x01);

        assert!(interrupt_triggered(&cpu_registers, &address_space));
        execute_interrupt_service_routine(&mut cpu_registers, &mut address_space);

        assert_eq!(0xFFFC, cpu_registers.sp);
        assert_eq!(0x34, address_space.read_address_u8(0xFFFC));
        assert_eq!(0x12, address_space.read_address_u8(0xFFFD));
        assert_eq!(0x0040, cpu_registers.pc);
        assert!(!cpu_registers.ime);
        assert_eq!(0x00, address_space.get_io_registers().read_register(IoRegister::IF));
    }

    #[test]
    fn priority_order_and_flag_clearing() {
        let mut address_space = new_address_space();
        let mut cpu_registers = CpuRegisters::new();

        cpu_registers.ime = true;

        address_space.write_address_u8(0xFFFF, 0x1F);
        address_space.get_io_registers_mut().write_register(IoRegister::IF, 0x06);

        execute_interrupt_service_routine(&mut cpu_registers, &mut address_space);
        assert_eq!(InterruptType::LcdStatus.handler_address(), cpu_registers.pc);
        assert_eq!(0x04, address_space.get_io_registers().read_register(IoRegister::IF));

        // Timer bit is still pending but IME was cleared by the dispatch
        assert!(!interrupt_triggered(&cpu_registers, &address_space));
        assert!(interrupt_triggered_no_ime_check(&address_space));
    }

    #[test]
    fn masked_interrupts_do_not_trigger() {
        let mut address_space = new_address_space();
        let mut cpu_registers = CpuRegisters::new();

        cpu_registers.ime = true;

        address_space.get_io_registers_mut().write_register(IoRegister::IF, 0x10);
        address_space.write_address_u8(0xFFFF, 0x0F);

        assert!(!interrupt_triggered(&cpu_registers, &address_space));
        assert!(!interrupt_triggered_no_ime_check(&address_space));
    }
}
