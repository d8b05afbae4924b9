use crate::cpu::InterruptType;
use crate::memory::ioregisters::IoRegister;
use crate::memory::AddressSpace;
use serde::{Deserialize, Serialize};

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// 160x144 ARGB8888 pixels, alpha always 0xFF.
pub type FrameBuffer = [[u32; SCREEN_WIDTH]; SCREEN_HEIGHT];

const OAM_SCAN_CYCLES: u32 = 80;
// Fixed point inside the variable 168-291 dot range that mode 3 can take on
// hardware; 80 + 200 + 176 = 456 dots per line
const RENDERING_CYCLES: u32 = 200;
const HBLANK_CYCLES: u32 = 176;
const CYCLES_PER_LINE: u32 = 456;

const FIRST_VBLANK_LINE: u8 = 144;
const LAST_LINE: u8 = 153;

const MAX_SPRITES_PER_LINE: usize = 10;
const OAM_SPRITE_COUNT: u16 = 40;

// DMG LCD shades from lightest to darkest, the green-tinted bgb palette
const SHADE_TO_ARGB: [u32; 4] = [0xFFE0F8D0, 0xFF88C070, 0xFF346856, 0xFF081820];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PpuMode {
    HBlank,
    VBlank,
    ScanningOam,
    Rendering,
}

impl PpuMode {
    /// The mode number exposed in STAT bits 0-1.
    fn stat_bits(self) -> u8 {
        match self {
            Self::HBlank => 0,
            Self::VBlank => 1,
            Self::ScanningOam => 2,
            Self::Rendering => 3,
        }
    }
}

/// A sprite kept by the OAM scan, with its screen position already offset
/// from the raw OAM coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SpriteData {
    x: i16,
    y: i16,
    tile_number: u8,
    flags: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpuState {
    mode: PpuMode,
    state_cycles: u32,
    window_line: u8,
    sprites: Vec<SpriteData>,
    #[serde(
        serialize_with = "crate::serialize::serialize_array",
        deserialize_with = "crate::serialize::deserialize_array"
    )]
    line_colors: [u8; SCREEN_WIDTH],
    #[serde(
        serialize_with = "crate::serialize::serialize_boxed_2d_array",
        deserialize_with = "crate::serialize::deserialize_boxed_2d_array"
    )]
    frame_buffer: Box<FrameBuffer>,
    frame_ready: bool,
}

impl PpuState {
    pub fn new() -> Self {
        Self {
            mode: PpuMode::ScanningOam,
            state_cycles: 0,
            window_line: 0,
            sprites: Vec::with_capacity(MAX_SPRITES_PER_LINE),
            line_colors: [0; SCREEN_WIDTH],
            frame_buffer: Box::new([[SHADE_TO_ARGB[0]; SCREEN_WIDTH]; SCREEN_HEIGHT]),
            frame_ready: false,
        }
    }

    pub fn mode(&self) -> PpuMode {
        self.mode
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    /// Returns true exactly once per completed frame; the flag is cleared by
    /// reading it.
    pub fn poll_frame_ready(&mut self) -> bool {
        let ready = self.frame_ready;
        self.frame_ready = false;
        ready
    }
}

/// Advance the video unit by the given number of clock cycles.
pub fn tick(ppu_state: &mut PpuState, address_space: &mut AddressSpace, cycles: u32) {
    ppu_state.state_cycles += cycles;

    loop {
        match ppu_state.mode {
            PpuMode::ScanningOam => {
                if ppu_state.state_cycles < OAM_SCAN_CYCLES {
                    break;
                }
                ppu_state.state_cycles -= OAM_SCAN_CYCLES;

                let line = current_line(address_space);
                scan_sprites(ppu_state, address_space, line);
                render_scanline(ppu_state, address_space, line);
                set_mode(ppu_state, address_space, PpuMode::Rendering);
            }
            PpuMode::Rendering => {
                if ppu_state.state_cycles < RENDERING_CYCLES {
                    break;
                }
                ppu_state.state_cycles -= RENDERING_CYCLES;

                set_mode(ppu_state, address_space, PpuMode::HBlank);

                let stat = address_space.get_io_registers().ppu_read_register(IoRegister::STAT);
                if stat & (1 << 3) != 0 {
                    flag_interrupt(address_space, InterruptType::LcdStatus);
                }
            }
            PpuMode::HBlank => {
                if ppu_state.state_cycles < HBLANK_CYCLES {
                    break;
                }
                ppu_state.state_cycles -= HBLANK_CYCLES;

                let line = current_line(address_space) + 1;
                set_line(address_space, line);

                if line == FIRST_VBLANK_LINE {
                    set_mode(ppu_state, address_space, PpuMode::VBlank);
                    flag_interrupt(address_space, InterruptType::VBlank);

                    let stat =
                        address_space.get_io_registers().ppu_read_register(IoRegister::STAT);
                    if stat & (1 << 4) != 0 {
                        flag_interrupt(address_space, InterruptType::LcdStatus);
                    }
                } else {
                    enter_oam_scan(ppu_state, address_space);
                }
            }
            PpuMode::VBlank => {
                if ppu_state.state_cycles < CYCLES_PER_LINE {
                    break;
                }
                ppu_state.state_cycles -= CYCLES_PER_LINE;

                let line = current_line(address_space) + 1;
                if line > LAST_LINE {
                    set_line(address_space, 0);
                    ppu_state.window_line = 0;
                    ppu_state.frame_ready = true;
                    enter_oam_scan(ppu_state, address_space);
                } else {
                    set_line(address_space, line);
                }
            }
        }
    }
}

fn current_line(address_space: &AddressSpace) -> u8 {
    address_space.get_io_registers().ppu_read_register(IoRegister::LY)
}

/// Update LY and run the LY=LYC comparison, maintaining the coincidence bit
/// in STAT and raising the LCD status interrupt if the compare source is
/// enabled.
fn set_line(address_space: &mut AddressSpace, line: u8) {
    let io_registers = address_space.get_io_registers_mut();
    io_registers.ppu_write_register(IoRegister::LY, line);

    let lyc = io_registers.ppu_read_register(IoRegister::LYC);
    let stat = io_registers.ppu_read_register(IoRegister::STAT);

    let coincidence = line == lyc;
    let new_stat = (stat & !(1 << 2)) | (u8::from(coincidence) << 2);
    io_registers.ppu_write_register(IoRegister::STAT, new_stat);

    if coincidence && new_stat & (1 << 6) != 0 {
        io_registers.interrupt_flags().set(InterruptType::LcdStatus);
    }
}

fn set_mode(ppu_state: &mut PpuState, address_space: &mut AddressSpace, mode: PpuMode) {
    ppu_state.mode = mode;

    let io_registers = address_space.get_io_registers_mut();
    let stat = io_registers.ppu_read_register(IoRegister::STAT);
    io_registers.ppu_write_register(IoRegister::STAT, (stat & 0xFC) | mode.stat_bits());
}

fn enter_oam_scan(ppu_state: &mut PpuState, address_space: &mut AddressSpace) {
    set_mode(ppu_state, address_space, PpuMode::ScanningOam);

    let stat = address_space.get_io_registers().ppu_read_register(IoRegister::STAT);
    if stat & (1 << 5) != 0 {
        flag_interrupt(address_space, InterruptType::LcdStatus);
    }
}

fn flag_interrupt(address_space: &mut AddressSpace, interrupt_type: InterruptType) {
    address_space.get_io_registers_mut().interrupt_flags().set(interrupt_type);
}

fn sprite_height(lcdc: u8) -> i16 {
    if lcdc & (1 << 2) != 0 {
        16
    } else {
        8
    }
}

/// Scan the 40 OAM entries and keep up to 10 sprites overlapping the given
/// line, in OAM order.
fn scan_sprites(ppu_state: &mut PpuState, address_space: &AddressSpace, line: u8) {
    let lcdc = address_space.get_io_registers().ppu_read_register(IoRegister::LCDC);
    let height = sprite_height(lcdc);

    ppu_state.sprites.clear();

    let line = i16::from(line);
    for sprite_index in 0..OAM_SPRITE_COUNT {
        let oam_address = crate::memory::address::OAM_START + 4 * sprite_index;

        let y = i16::from(address_space.read_address_u8(oam_address)) - 16;
        if !(y..y + height).contains(&line) {
            continue;
        }

        let x = i16::from(address_space.read_address_u8(oam_address + 1)) - 8;
        let tile_number = address_space.read_address_u8(oam_address + 2);
        let flags = address_space.read_address_u8(oam_address + 3);

        ppu_state.sprites.push(SpriteData { x, y, tile_number, flags });
        if ppu_state.sprites.len() == MAX_SPRITES_PER_LINE {
            break;
        }
    }
}

/// Decode one pixel from a pair of tile data bytes. The second byte holds
/// the high bit of the 2-bit color number.
fn tile_pixel_color(b1: u8, b2: u8, bit: u8) -> u8 {
    (((b2 >> bit) & 1) << 1) | ((b1 >> bit) & 1)
}

/// Map a 2-bit color number through a palette register to an LCD shade.
fn palette_shade(palette: u8, color: u8) -> u8 {
    (palette >> (2 * color)) & 0x03
}

fn tile_data_address(lcdc: u8, tile_number: u8) -> u16 {
    if lcdc & (1 << 4) != 0 {
        0x8000 + 16 * u16::from(tile_number)
    } else {
        // Signed tile numbers relative to 0x9000
        (0x9000_i32 + 16 * i32::from(tile_number as i8)) as u16
    }
}

/// Render the full current scanline (background, window, then sprites) into
/// the frame buffer. Runs once per line, on the transition out of OAM scan.
fn render_scanline(ppu_state: &mut PpuState, address_space: &AddressSpace, line: u8) {
    if line >= FIRST_VBLANK_LINE {
        return;
    }

    let io_registers = address_space.get_io_registers();
    let lcdc = io_registers.ppu_read_register(IoRegister::LCDC);
    let scy = io_registers.ppu_read_register(IoRegister::SCY);
    let scx = io_registers.ppu_read_register(IoRegister::SCX);
    let bgp = io_registers.ppu_read_register(IoRegister::BGP);
    let wy = io_registers.ppu_read_register(IoRegister::WY);
    let wx = io_registers.ppu_read_register(IoRegister::WX);

    ppu_state.line_colors = [0; SCREEN_WIDTH];
    let mut line_pixels = [SHADE_TO_ARGB[0]; SCREEN_WIDTH];

    // Background layer
    if lcdc & (1 << 0) != 0 {
        let bg_map: u16 = if lcdc & (1 << 3) != 0 { 0x9C00 } else { 0x9800 };
        let bg_y = line.wrapping_add(scy);

        for x in 0..SCREEN_WIDTH {
            let bg_x = (x as u8).wrapping_add(scx);
            let tile_number = address_space.read_address_u8(
                bg_map + 32 * u16::from(bg_y / 8) + u16::from(bg_x / 8),
            );

            let row_address =
                tile_data_address(lcdc, tile_number) + 2 * u16::from(bg_y % 8);
            let b1 = address_space.read_address_u8(row_address);
            let b2 = address_space.read_address_u8(row_address + 1);

            let color = tile_pixel_color(b1, b2, 7 - (bg_x % 8));
            ppu_state.line_colors[x] = color;
            line_pixels[x] = SHADE_TO_ARGB[usize::from(palette_shade(bgp, color))];
        }
    }

    // Window layer
    if lcdc & (1 << 5) != 0 && lcdc & (1 << 0) != 0 && line >= wy && wx <= 166 {
        let window_map: u16 = if lcdc & (1 << 6) != 0 { 0x9C00 } else { 0x9800 };
        let window_y = ppu_state.window_line;
        let window_start = i32::from(wx) - 7;
        let mut drew_window = false;

        for x in 0..SCREEN_WIDTH {
            let window_x = x as i32 - window_start;
            if window_x < 0 {
                continue;
            }
            drew_window = true;

            let tile_number = address_space.read_address_u8(
                window_map + 32 * u16::from(window_y / 8) + (window_x as u16) / 8,
            );

            let row_address =
                tile_data_address(lcdc, tile_number) + 2 * u16::from(window_y % 8);
            let b1 = address_space.read_address_u8(row_address);
            let b2 = address_space.read_address_u8(row_address + 1);

            let color = tile_pixel_color(b1, b2, 7 - (window_x as u8 % 8));
            ppu_state.line_colors[x] = color;
            line_pixels[x] = SHADE_TO_ARGB[usize::from(palette_shade(bgp, color))];
        }

        // The window keeps its own line counter so it resumes correctly if
        // it is disabled and re-enabled mid-frame
        if drew_window {
            ppu_state.window_line += 1;
        }
    }

    // Object layer; reverse OAM-scan order so the earliest entry wins
    // overlaps
    if lcdc & (1 << 1) != 0 {
        let height = sprite_height(lcdc);
        let obp0 = io_registers.ppu_read_register(IoRegister::OBP0);
        let obp1 = io_registers.ppu_read_register(IoRegister::OBP1);

        for sprite in ppu_state.sprites.iter().rev() {
            let mut row = i16::from(line) - sprite.y;
            if sprite.flags & (1 << 6) != 0 {
                row = height - 1 - row;
            }

            let tile_number = if height == 16 {
                sprite.tile_number & 0xFE
            } else {
                sprite.tile_number
            };
            let row_address = 0x8000 + 16 * u16::from(tile_number) + 2 * row as u16;
            let b1 = address_space.read_address_u8(row_address);
            let b2 = address_space.read_address_u8(row_address + 1);

            let palette = if sprite.flags & (1 << 4) != 0 { obp1 } else { obp0 };

            for pixel in 0..8_i16 {
                let screen_x = sprite.x + pixel;
                if !(0..SCREEN_WIDTH as i16).contains(&screen_x) {
                    continue;
                }

                let bit = if sprite.flags & (1 << 5) != 0 { pixel } else { 7 - pixel };
                let color = tile_pixel_color(b1, b2, bit as u8);
                // Sprite color 0 is transparent
                if color == 0 {
                    continue;
                }

                // OBJ-behind-BG priority: hide behind background colors 1-3
                if sprite.flags & (1 << 7) != 0
                    && ppu_state.line_colors[screen_x as usize] != 0
                {
                    continue;
                }

                line_pixels[screen_x as usize] =
                    SHADE_TO_ARGB[usize::from(palette_shade(palette, color))];
            }
        }
    }

    ppu_state.frame_buffer[usize::from(line)] = line_pixels;
}
