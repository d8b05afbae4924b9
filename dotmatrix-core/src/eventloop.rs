use crate::audio::AudioError;
use crate::cpu::{self, instructions, CpuRegisters};
use crate::graphics::GraphicsError;
use crate::input::{Hotkey, HotkeyMap, JoypadState, KeyMap, KeyMapError};
use crate::memory::AddressSpace;
use crate::serialize::SaveStateError;
use crate::startup::{EmulationState, SdlState};
use crate::timer::TimerCounter;
use crate::{apu, audio, graphics, input, ppu, serialize, timer, RunConfig};
use sdl2::event::Event;
use std::ffi::OsStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("rendering error: {source}")]
    Rendering {
        #[from]
        source: GraphicsError,
    },
    #[error("audio playback error: {source}")]
    AudioPlayback {
        #[from]
        source: AudioError,
    },
    #[error("error processing input config: {source}")]
    InputConfig {
        #[from]
        source: KeyMapError,
    },
    #[error("error saving/loading save state: {source}")]
    SaveState {
        #[from]
        source: SaveStateError,
    },
}

/// Start and run the emulator until it terminates, either by closing it or
/// due to an error.
pub fn run(
    emulation_state: EmulationState,
    sdl_state: SdlState,
    run_config: &RunConfig,
) -> Result<(), RunError> {
    log::info!("Running with config:\n{run_config}");

    let EmulationState {
        mut address_space,
        mut cpu_registers,
        mut ppu_state,
        mut apu_state,
    } = emulation_state;

    // The subsystem handles are bound so they stay alive until the function
    // returns; they are not used directly past this point
    let SdlState {
        audio_playback_queue,
        mut canvas,
        mut event_pump,
        sdl: _sdl,
        video: _video,
        audio: _audio,
    } = sdl_state;

    let texture_creator = canvas.texture_creator();
    let mut texture = graphics::create_frame_texture(&texture_creator)?;

    let mut joypad_state = JoypadState::new();
    let mut timer_counter = TimerCounter::new();

    let key_map = KeyMap::from_config(&run_config.input_config)?;
    let hotkey_map = HotkeyMap::from_config(&run_config.hotkey_config)?;

    let save_state_path = serialize::determine_save_state_path(&run_config.gb_file_path);
    let save_state_file_name =
        save_state_path.file_name().and_then(OsStr::to_str).unwrap_or("<Unknown>");

    loop {
        input::update_joyp_register(&joypad_state, address_space.get_io_registers_mut());

        // Read TMA before executing anything in case the instruction updates
        // the register mid-overflow
        let timer_modulo = timer::read_timer_modulo(address_space.get_io_registers());

        let cycles = tick_cpu(&mut address_space, &mut cpu_registers);

        timer::update_timer_registers(
            address_space.get_io_registers_mut(),
            &mut timer_counter,
            timer_modulo,
            u64::from(cycles),
        );
        ppu::tick(&mut ppu_state, &mut address_space, cycles);
        apu::tick(&mut apu_state, address_space.get_io_registers_mut(), cycles);

        if !ppu_state.poll_frame_ready() {
            continue;
        }

        graphics::render_frame(&ppu_state, &mut canvas, &mut texture, run_config)?;

        if let Some(audio_device_queue) = &audio_playback_queue {
            audio::push_samples(audio_device_queue, &mut apu_state, run_config)?;
        }

        for event in event_pump.poll_iter() {
            log::debug!("Received SDL event: {event:?}");
            match event {
                Event::Quit { .. } => {
                    return Ok(());
                }
                Event::KeyDown { keycode: Some(keycode), .. } => {
                    joypad_state.key_down(keycode, &key_map);

                    match input::check_for_hotkey(keycode, &hotkey_map) {
                        Some(Hotkey::Exit) => {
                            return Ok(());
                        }
                        Some(Hotkey::ToggleFullscreen) => {
                            graphics::toggle_fullscreen(&mut canvas)?;
                        }
                        Some(Hotkey::SaveState) => {
                            let state = EmulationState {
                                address_space,
                                cpu_registers,
                                ppu_state,
                                apu_state,
                            };

                            serialize::save_state(&state, &save_state_path)?;
                            log::info!("Saved state to {save_state_file_name}");

                            address_space = state.address_space;
                            cpu_registers = state.cpu_registers;
                            ppu_state = state.ppu_state;
                            apu_state = state.apu_state;
                        }
                        Some(Hotkey::LoadState) => {
                            match serialize::load_state(&save_state_path, address_space) {
                                Ok(state) => {
                                    address_space = state.address_space;
                                    cpu_registers = state.cpu_registers;
                                    ppu_state = state.ppu_state;
                                    apu_state = state.apu_state;

                                    log::info!("Loaded state from {save_state_file_name}");
                                }
                                Err((err, old_address_space)) => {
                                    log::error!("error loading save state: {err}");

                                    address_space = *old_address_space;
                                }
                            }
                        }
                        None => {}
                    }
                }
                Event::KeyUp { keycode: Some(keycode), .. } => {
                    joypad_state.key_up(keycode, &key_map);
                }
                _ => {}
            }
        }
    }
}

/// Execute one CPU step and return the number of clock cycles it consumed:
/// an interrupt service routine jump, one instruction, or an idle HALT step.
fn tick_cpu(address_space: &mut AddressSpace, cpu_registers: &mut CpuRegisters) -> u32 {
    if cpu::interrupt_triggered(cpu_registers, address_space) {
        cpu::execute_interrupt_service_routine(cpu_registers, address_space);
        return cpu::ISR_CYCLES_REQUIRED;
    }

    if cpu_registers.halted {
        if cpu::interrupt_triggered_no_ime_check(address_space) {
            // A pending interrupt ends HALT even with IME cleared
            cpu_registers.halted = false;
        } else {
            // The halted CPU idles in 4-cycle steps
            return 4;
        }
    }

    if log::log_enabled!(log::Level::Trace) {
        log::trace!(
            "Executing opcode {:02X} at {:04X}, registers: {cpu_registers:02X?}",
            address_space.peek_address_u8(cpu_registers.pc),
            cpu_registers.pc
        );
    }

    let (instruction, pc) = instructions::parse_next_instruction(address_space, cpu_registers.pc);
    cpu_registers.pc = pc;

    let cycles_required = instruction.cycles_required(cpu_registers);
    instruction.execute(address_space, cpu_registers);

    cycles_required
}
