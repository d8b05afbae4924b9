pub mod address;
pub mod ioregisters;

use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{fs, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartridgeLoadError {
    #[error("cartridge image should be at least 16384 bytes, was {rom_len} bytes")]
    FileTooShort { rom_len: usize },
    #[error("unsupported cartridge type byte in header: {mapper_byte:02X}, only 00 (ROM) and 01 (MBC1) are supported")]
    UnsupportedCartridge { mapper_byte: u8 },
    #[error("error reading data from {file_path}: {source}")]
    FileRead {
        file_path: String,
        #[source]
        source: io::Error,
    },
}

const ROM_BANK_SIZE: usize = 0x4000;
const EXTERNAL_RAM_SIZE: usize = 8192;

/// An MBC1 cartridge: the ROM image, up to 8 KiB of external RAM, and the
/// mapper registers that bank switch on writes to the ROM address range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cartridge {
    #[serde(skip)]
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_enabled: bool,
    rom_bank_low: u8,
    bank_high: u8,
    banking_mode: u8,
}

impl Cartridge {
    /// Create a new Cartridge value from the given ROM image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is shorter than one 16 KiB bank or the
    /// cartridge type byte in the header is not 0x00 (ROM only) or 0x01
    /// (MBC1).
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeLoadError> {
        if rom.len() < ROM_BANK_SIZE {
            return Err(CartridgeLoadError::FileTooShort { rom_len: rom.len() });
        }

        let mapper_byte = rom[address::MAPPER as usize];
        if mapper_byte != 0x00 && mapper_byte != 0x01 {
            return Err(CartridgeLoadError::UnsupportedCartridge { mapper_byte });
        }

        log::info!(
            "Loaded cartridge: type {mapper_byte:02X}, ROM size code {:02X}, RAM size code {:02X}",
            rom[address::ROM_SIZE as usize],
            rom[address::RAM_SIZE as usize]
        );

        Ok(Self {
            rom,
            ram: vec![0; EXTERNAL_RAM_SIZE],
            ram_enabled: false,
            rom_bank_low: 1,
            bank_high: 0,
            banking_mode: 0,
        })
    }

    pub fn from_file(file_path: &str) -> Result<Self, CartridgeLoadError> {
        log::info!("Loading cartridge from '{file_path}'");

        let rom = fs::read(Path::new(file_path)).map_err(|source| {
            CartridgeLoadError::FileRead { file_path: file_path.into(), source }
        })?;

        Self::new(rom)
    }

    /// The ROM bank currently mapped at 0x4000-0x7FFF. Never 0: writing a
    /// bank number with all-zero low bits selects the next bank up, so banks
    /// 0x00/0x20/0x40/0x60 map to 0x01/0x21/0x41/0x61.
    fn rom_bank(&self) -> u32 {
        let mut bank = u32::from(self.rom_bank_low);
        if self.banking_mode == 0 {
            bank |= u32::from(self.bank_high) << 5;
        }
        bank
    }

    /// Read a value from the cartridge ROM address range (0x0000-0x7FFF).
    pub fn read_rom_address(&self, address: u16) -> u8 {
        let mapped_address = match address {
            0x0000..=0x3FFF => usize::from(address),
            _ => self.rom_bank() as usize * ROM_BANK_SIZE + usize::from(address - 0x4000),
        };
        self.rom.get(mapped_address).copied().unwrap_or(0xFF)
    }

    /// Write to the cartridge ROM address range, which sets MBC1 mapper
    /// registers rather than modifying ROM.
    pub fn write_rom_address(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => {
                self.ram_enabled = value & 0x0F == 0x0A;
            }
            0x2000..=0x3FFF => {
                let bank = value & 0x1F;
                self.rom_bank_low = if bank == 0 { 1 } else { bank };
                log::trace!("ROM bank {} selected", self.rom_bank());
            }
            0x4000..=0x5FFF => {
                // Upper ROM bank bits in mode 0, RAM bank in mode 1; with
                // only 8 KiB of external RAM the RAM bank is always 0
                self.bank_high = value & 0x03;
            }
            _ => {
                self.banking_mode = value & 0x01;
            }
        }
    }

    /// Read from the external RAM window (0xA000-0xBFFF). Returns 0xFF while
    /// RAM is disabled.
    pub fn read_ram_address(&self, address: u16) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }
        self.ram[usize::from(address - address::EXTERNAL_RAM_START)]
    }

    /// Write to the external RAM window. Dropped while RAM is disabled.
    pub fn write_ram_address(&mut self, address: u16, value: u8) {
        if !self.ram_enabled {
            log::trace!("ignoring external RAM write to {address:04X}, RAM disabled");
            return;
        }
        self.ram[usize::from(address - address::EXTERNAL_RAM_START)] = value;
    }
}

/// The full 16-bit address space: routes CPU and PPU accesses to the
/// cartridge, VRAM, WRAM, OAM, HRAM, or the I/O register dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpace {
    cartridge: Cartridge,
    #[serde(
        serialize_with = "crate::serialize::serialize_array",
        deserialize_with = "crate::serialize::deserialize_array"
    )]
    vram: [u8; 8192],
    #[serde(
        serialize_with = "crate::serialize::serialize_array",
        deserialize_with = "crate::serialize::deserialize_array"
    )]
    working_ram: [u8; 8192],
    #[serde(
        serialize_with = "crate::serialize::serialize_array",
        deserialize_with = "crate::serialize::deserialize_array"
    )]
    oam: [u8; 160],
    io_registers: IoRegisters,
    #[serde(
        serialize_with = "crate::serialize::serialize_array",
        deserialize_with = "crate::serialize::deserialize_array"
    )]
    hram: [u8; 127],
}

impl AddressSpace {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            vram: [0; 8192],
            working_ram: [0; 8192],
            oam: [0; 160],
            io_registers: IoRegisters::new(),
            hram: [0; 127],
        }
    }

    /// Read the value at the given address. Unmapped addresses read as 0xFF.
    pub fn read_address_u8(&self, address: u16) -> u8 {
        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.read_rom_address(address)
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[usize::from(address - address::VRAM_START)]
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.read_ram_address(address)
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[usize::from(address - address::WORKING_RAM_START)]
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[usize::from(address - address::ECHO_RAM_START)]
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[usize::from(address - address::OAM_START)]
            }
            address::UNUSABLE_START..=address::UNUSABLE_END => 0xFF,
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.read_address(address)
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[usize::from(address - address::HRAM_START)]
            }
            address::IE_REGISTER => self.io_registers.read_ie_register(),
        }
    }

    /// Read the value at the given address and the following address as a
    /// little-endian 16-bit value.
    pub fn read_address_u16(&self, address: u16) -> u16 {
        let lsb = self.read_address_u8(address);
        let msb = self.read_address_u8(address.wrapping_add(1));
        u16::from_le_bytes([lsb, msb])
    }

    /// Read the value at the given address without side effects. The normal
    /// read path has none either, but the disassembly/trace code goes through
    /// this method so that the guarantee is explicit at the call site.
    pub fn peek_address_u8(&self, address: u16) -> u8 {
        self.read_address_u8(address)
    }

    pub fn peek_address_u16(&self, address: u16) -> u16 {
        self.read_address_u16(address)
    }

    /// Assign a value to the given address. Writes to unmapped addresses are
    /// dropped. A write to the DMA register performs the full 160-byte OAM
    /// transfer from `value << 8` before returning.
    pub fn write_address_u8(&mut self, address: u16, value: u8) {
        if address == IoRegister::DMA.to_address() {
            self.io_registers.write_address(address, value);
            self.run_oam_dma_transfer(value);
            return;
        }

        match address {
            address @ address::ROM_START..=address::ROM_END => {
                self.cartridge.write_rom_address(address, value);
            }
            address @ address::VRAM_START..=address::VRAM_END => {
                self.vram[usize::from(address - address::VRAM_START)] = value;
            }
            address @ address::EXTERNAL_RAM_START..=address::EXTERNAL_RAM_END => {
                self.cartridge.write_ram_address(address, value);
            }
            address @ address::WORKING_RAM_START..=address::WORKING_RAM_END => {
                self.working_ram[usize::from(address - address::WORKING_RAM_START)] = value;
            }
            address @ address::ECHO_RAM_START..=address::ECHO_RAM_END => {
                self.working_ram[usize::from(address - address::ECHO_RAM_START)] = value;
            }
            address @ address::OAM_START..=address::OAM_END => {
                self.oam[usize::from(address - address::OAM_START)] = value;
            }
            address::UNUSABLE_START..=address::UNUSABLE_END => {
                log::trace!("ignoring write to unusable address {address:04X}");
            }
            address @ address::IO_REGISTERS_START..=address::IO_REGISTERS_END => {
                self.io_registers.write_address(address, value);
            }
            address @ address::HRAM_START..=address::HRAM_END => {
                self.hram[usize::from(address - address::HRAM_START)] = value;
            }
            address::IE_REGISTER => {
                self.io_registers.write_address(address, value);
            }
        }
    }

    /// Assign a 16-bit value to the given address and the following address,
    /// using little-endian.
    pub fn write_address_u16(&mut self, address: u16, value: u16) {
        let [lsb, msb] = value.to_le_bytes();
        self.write_address_u8(address, lsb);
        self.write_address_u8(address.wrapping_add(1), msb);
    }

    fn run_oam_dma_transfer(&mut self, source_page: u8) {
        let source_address = u16::from(source_page) << 8;
        for offset in 0..0xA0 {
            self.oam[usize::from(offset)] =
                self.read_address_u8(source_address.wrapping_add(offset));
        }
    }

    pub fn get_io_registers(&self) -> &IoRegisters {
        &self.io_registers
    }

    pub fn get_io_registers_mut(&mut self) -> &mut IoRegisters {
        &mut self.io_registers
    }

    /// Retrieve the current value of the IE register (interrupts enabled).
    pub fn get_ie_register(&self) -> u8 {
        self.io_registers.read_ie_register()
    }

    /// Take the ROM image from another address space. Used when restoring a
    /// save state, since ROM contents are not serialized.
    pub fn move_cartridge_rom_from(&mut self, mut other: AddressSpace) {
        self.cartridge.rom = std::mem::take(&mut other.cartridge.rom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_address_space() -> AddressSpace {
        AddressSpace::new(Cartridge::new(vec![0; 0x8000]).expect("test ROM should be valid"))
    }

    #[test]
    fn cartridge_load_validation() {
        assert!(matches!(
            Cartridge::new(vec![0; 100]),
            Err(CartridgeLoadError::FileTooShort { rom_len: 100 })
        ));

        let mut rom = vec![0; 0x4000];
        rom[usize::from(address::MAPPER)] = 0x03;
        assert!(matches!(
            Cartridge::new(rom),
            Err(CartridgeLoadError::UnsupportedCartridge { mapper_byte: 0x03 })
        ));

        let mut rom = vec![0; 0x4000];
        rom[usize::from(address::MAPPER)] = 0x01;
        assert!(Cartridge::new(rom).is_ok());
    }

    #[test]
    fn working_ram_u16_round_trip() {
        let mut address_space = new_address_space();

        address_space.write_address_u16(0xC123, 0xBEEF);
        assert_eq!(0xBEEF, address_space.read_address_u16(0xC123));
        assert_eq!(0xEF, address_space.read_address_u8(0xC123));
        assert_eq!(0xBE, address_space.read_address_u8(0xC124));
    }

    #[test]
    fn hram_u16_round_trip() {
        let mut address_space = new_address_space();

        address_space.write_address_u16(0xFF80, 0x1234);
        assert_eq!(0x1234, address_space.read_address_u16(0xFF80));
    }

    #[test]
    fn echo_ram_mirrors_working_ram() {
        let mut address_space = new_address_space();

        address_space.write_address_u8(0xC100, 0x5C);
        assert_eq!(0x5C, address_space.read_address_u8(0xE100));

        address_space.write_address_u8(0xF000, 0x77);
        assert_eq!(0x77, address_space.read_address_u8(0xD000));
    }

    #[test]
    fn unusable_range_reads_ff() {
        let mut address_space = new_address_space();

        address_space.write_address_u8(0xFEA0, 0x12);
        assert_eq!(0xFF, address_space.read_address_u8(0xFEA0));
        assert_eq!(0xFF, address_space.read_address_u8(0xFEFF));
    }

    #[test]
    fn peek_does_not_mutate() {
        let mut address_space = new_address_space();

        address_space.write_address_u8(0xC000, 0x42);
        let before = address_space.clone();

        let _ = address_space.peek_address_u8(0xC000);
        let _ = address_space.peek_address_u8(0xFF46);
        let _ = address_space.peek_address_u16(0xFFFE);

        assert_eq!(before.working_ram, address_space.working_ram);
        assert_eq!(before.oam, address_space.oam);
        assert_eq!(before.vram, address_space.vram);
    }

    #[test]
    fn oam_dma_copies_160_bytes() {
        let mut address_space = new_address_space();

        for offset in 0..0xA0_u16 {
            address_space.write_address_u8(0xC000 + offset, offset as u8);
        }

        address_space.write_address_u8(0xFF46, 0xC0);

        for offset in 0..0xA0_u16 {
            assert_eq!(offset as u8, address_space.read_address_u8(0xFE00 + offset));
        }
    }

    #[test]
    fn mbc1_rom_banking() {
        // 256 KiB image with the bank number stamped at the start of each bank
        let mut rom = vec![0; 0x40000];
        rom[usize::from(address::MAPPER)] = 0x01;
        for bank in 0..16 {
            rom[bank * 0x4000] = bank as u8;
        }

        let mut cartridge = Cartridge::new(rom).expect("test ROM should be valid");

        // Bank 0 fixed at 0x0000, bank 1 selected at power-up
        assert_eq!(0x00, cartridge.read_rom_address(0x0000));
        assert_eq!(0x01, cartridge.read_rom_address(0x4000));

        cartridge.write_rom_address(0x2000, 0x05);
        assert_eq!(0x05, cartridge.read_rom_address(0x4000));

        // Writing 0 selects bank 1
        cartridge.write_rom_address(0x2000, 0x00);
        assert_eq!(0x01, cartridge.read_rom_address(0x4000));
    }

    #[test]
    fn mbc1_upper_bank_bits() {
        let mut rom = vec![0; 0x100000];
        rom[usize::from(address::MAPPER)] = 0x01;
        for bank in 0..64 {
            rom[bank * 0x4000] = bank as u8;
        }

        let mut cartridge = Cartridge::new(rom).expect("test ROM should be valid");

        cartridge.write_rom_address(0x2000, 0x02);
        cartridge.write_rom_address(0x4000, 0x01);
        assert_eq!(0x22, cartridge.read_rom_address(0x4000));

        // In banking mode 1 the upper bits apply to RAM instead
        cartridge.write_rom_address(0x6000, 0x01);
        assert_eq!(0x02, cartridge.read_rom_address(0x4000));
    }

    #[test]
    fn mbc1_ram_enable() {
        let mut rom = vec![0; 0x8000];
        rom[usize::from(address::MAPPER)] = 0x01;
        let mut cartridge = Cartridge::new(rom).expect("test ROM should be valid");

        // Disabled RAM reads 0xFF and drops writes
        cartridge.write_ram_address(0xA000, 0x12);
        assert_eq!(0xFF, cartridge.read_ram_address(0xA000));

        // Only low nibble 0x0A enables
        cartridge.write_rom_address(0x0000, 0x01);
        assert_eq!(0xFF, cartridge.read_ram_address(0xA000));

        cartridge.write_rom_address(0x0000, 0x0A);
        cartridge.write_ram_address(0xA000, 0x12);
        assert_eq!(0x12, cartridge.read_ram_address(0xA000));

        cartridge.write_rom_address(0x0000, 0x00);
        assert_eq!(0xFF, cartridge.read_ram_address(0xA000));

        // Contents survive a disable/enable cycle
        cartridge.write_rom_address(0x0000, 0x1A);
        assert_eq!(0x12, cartridge.read_ram_address(0xA000));
    }
}
