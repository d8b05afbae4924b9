use crate::memory::ioregisters::{IoRegister, IoRegisters};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::collections::VecDeque;

pub const OUTPUT_FREQUENCY: u64 = 48000;

const APU_CLOCK_SPEED: u64 = 4_194_304;

// 4194304 / 8192 = 512 Hz, the rate at which length counters, envelopes,
// and the pulse sweep are stepped
const FRAME_SEQUENCER_PERIOD: u32 = 8192;

const MAX_QUEUED_SAMPLES: usize = 8192;

const NOISE_DIVISORS: [u32; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum DutyCycle {
    OneEighth,
    OneFourth,
    OneHalf,
    ThreeFourths,
}

impl DutyCycle {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => Self::OneEighth,
            0x01 => Self::OneFourth,
            0x02 => Self::OneHalf,
            _ => Self::ThreeFourths,
        }
    }

    fn waveform(self) -> [u8; 8] {
        match self {
            Self::OneEighth => [0, 0, 0, 0, 0, 0, 0, 1],
            Self::OneFourth => [1, 0, 0, 0, 0, 0, 0, 1],
            Self::OneHalf => [1, 0, 0, 0, 0, 1, 1, 1],
            Self::ThreeFourths => [0, 1, 1, 1, 1, 1, 1, 0],
        }
    }
}

trait Channel {
    // Digital sample in the range [0, 15], or None if the DAC is disabled
    fn sample_digital(&self) -> Option<u8>;

    // "Analog" sample in the range [-1, 1]
    fn sample_analog(&self) -> f64 {
        let Some(digital_sample) = self.sample_digital() else {
            return 0.0;
        };

        (f64::from(digital_sample) - 7.5) / 7.5
    }
}

/// Clock a length counter. Disables the channel when an enabled counter
/// runs out.
fn clock_length_counter(length_counter: &mut u16, length_enabled: bool, enabled: &mut bool) {
    if *length_counter > 0 {
        *length_counter -= 1;
        if *length_counter == 0 && length_enabled {
            *enabled = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Envelope {
    initial_volume: u8,
    current_volume: u8,
    add_mode: bool,
    period: u8,
    timer: u8,
}

impl Envelope {
    fn new() -> Self {
        Self { initial_volume: 0, current_volume: 0, add_mode: false, period: 0, timer: 0 }
    }

    fn update_from_register(&mut self, value: u8) {
        self.initial_volume = value >> 4;
        self.add_mode = value & 0x08 != 0;
        self.period = value & 0x07;
    }

    fn trigger(&mut self) {
        self.timer = self.period;
        self.current_volume = self.initial_volume;
    }

    fn clock(&mut self) {
        if self.period == 0 {
            return;
        }

        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            self.timer = self.period;
            self.current_volume = if self.add_mode {
                cmp::min(0x0F, self.current_volume + 1)
            } else {
                self.current_volume.saturating_sub(1)
            };
        }
    }
}

/// Square wave channel. Channel 1 additionally runs the frequency sweep;
/// channel 2 is the same circuit without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PulseChannel {
    enabled: bool,
    dac_on: bool,
    duty_cycle: DutyCycle,
    duty_position: u8,
    length_counter: u16,
    length_enabled: bool,
    envelope: Envelope,
    frequency: u16,
    period_timer: u32,
    has_sweep: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_timer: u8,
    sweep_shadow: u16,
    sweep_enabled: bool,
    nr0: Option<IoRegister>,
    nr1: IoRegister,
    nr2: IoRegister,
    nr3: IoRegister,
    nr4: IoRegister,
}

impl PulseChannel {
    fn new(
        nr0: Option<IoRegister>,
        nr1: IoRegister,
        nr2: IoRegister,
        nr3: IoRegister,
        nr4: IoRegister,
    ) -> Self {
        Self {
            enabled: false,
            dac_on: false,
            duty_cycle: DutyCycle::OneEighth,
            duty_position: 0,
            length_counter: 0,
            length_enabled: false,
            envelope: Envelope::new(),
            frequency: 0,
            period_timer: 0,
            has_sweep: nr0.is_some(),
            sweep_period: 0,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_timer: 0,
            sweep_shadow: 0,
            sweep_enabled: false,
            nr0,
            nr1,
            nr2,
            nr3,
            nr4,
        }
    }

    fn new_channel_1() -> Self {
        Self::new(
            Some(IoRegister::NR10),
            IoRegister::NR11,
            IoRegister::NR12,
            IoRegister::NR13,
            IoRegister::NR14,
        )
    }

    fn new_channel_2() -> Self {
        Self::new(None, IoRegister::NR21, IoRegister::NR22, IoRegister::NR23, IoRegister::NR24)
    }

    fn period(&self) -> u32 {
        4 * (2048 - u32::from(self.frequency))
    }

    fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr1_value = io_registers.apu_read_register(self.nr1);
        let nr2_value = io_registers.apu_read_register(self.nr2);
        let nr3_value = io_registers.apu_read_register(self.nr3);
        let nr4_value = io_registers.apu_read_register(self.nr4);

        if let Some(nr0) = self.nr0 {
            let nr0_value = io_registers.apu_read_register(nr0);
            self.sweep_period = (nr0_value >> 4) & 0x07;
            self.sweep_negate = nr0_value & 0x08 != 0;
            self.sweep_shift = nr0_value & 0x07;
        }

        self.duty_cycle = DutyCycle::from_bits(nr1_value >> 6);
        if io_registers.is_register_dirty(self.nr1) {
            io_registers.clear_dirty_bit(self.nr1);
            self.length_counter = 64 - u16::from(nr1_value & 0x3F);
        }

        self.envelope.update_from_register(nr2_value);

        self.frequency = (u16::from(nr4_value & 0x07) << 8) | u16::from(nr3_value);
        self.length_enabled = nr4_value & 0x40 != 0;

        if nr4_value & 0x80 != 0 {
            // Clear the trigger flag so the trigger fires once per write
            io_registers.apu_write_register(self.nr4, nr4_value & 0x7F);
            self.trigger();
        }

        self.dac_on = nr2_value & 0xF8 != 0;
        if !self.dac_on {
            self.enabled = false;
        }
    }

    fn trigger(&mut self) {
        self.enabled = true;
        if self.length_counter == 0 {
            self.length_counter = 64;
        }
        self.period_timer = self.period();
        self.envelope.trigger();
        self.duty_position = 0;

        if self.has_sweep {
            self.sweep_shadow = self.frequency;
            self.sweep_timer = if self.sweep_period != 0 { self.sweep_period } else { 8 };
            self.sweep_enabled = self.sweep_period != 0 || self.sweep_shift != 0;
            if self.sweep_shift != 0 && self.next_sweep_frequency() > 2047 {
                self.enabled = false;
            }
        }
    }

    fn tick_frequency_timer(&mut self, cycles: u32) {
        let mut cycles = cycles;
        if self.period_timer == 0 {
            self.period_timer = self.period();
        }

        while cycles >= self.period_timer {
            cycles -= self.period_timer;
            self.period_timer = self.period();
            self.duty_position = (self.duty_position + 1) % 8;
        }
        self.period_timer -= cycles;
    }

    fn clock_length(&mut self) {
        clock_length_counter(&mut self.length_counter, self.length_enabled, &mut self.enabled);
    }

    fn next_sweep_frequency(&self) -> u16 {
        let delta = self.sweep_shadow >> self.sweep_shift;
        if self.sweep_negate {
            self.sweep_shadow.saturating_sub(delta)
        } else {
            self.sweep_shadow + delta
        }
    }

    fn clock_sweep(&mut self, io_registers: &mut IoRegisters) {
        if self.sweep_timer > 0 {
            self.sweep_timer -= 1;
        }
        if self.sweep_timer > 0 {
            return;
        }

        self.sweep_timer = if self.sweep_period != 0 { self.sweep_period } else { 8 };

        if !self.sweep_enabled || self.sweep_period == 0 {
            return;
        }

        let new_frequency = self.next_sweep_frequency();
        if new_frequency > 2047 {
            self.enabled = false;
            return;
        }

        if self.sweep_shift != 0 {
            self.sweep_shadow = new_frequency;
            self.frequency = new_frequency;

            // Write the new frequency back so readbacks stay consistent
            io_registers.apu_write_register(self.nr3, (new_frequency & 0xFF) as u8);
            let nr4_value = io_registers.apu_read_register(self.nr4);
            io_registers.apu_write_register(
                self.nr4,
                (nr4_value & 0xF8) | ((new_frequency >> 8) & 0x07) as u8,
            );

            if self.next_sweep_frequency() > 2047 {
                self.enabled = false;
            }
        }
    }
}

impl Channel for PulseChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.enabled {
            return Some(0);
        }

        let wave_step = self.duty_cycle.waveform()[usize::from(self.duty_position)];
        Some(wave_step * self.envelope.current_volume)
    }
}

/// Wave channel: plays 32 4-bit samples out of wave RAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WaveChannel {
    enabled: bool,
    dac_on: bool,
    length_counter: u16,
    length_enabled: bool,
    volume_code: u8,
    frequency: u16,
    period_timer: u32,
    sample_index: u8,
    last_sample: u8,
}

impl WaveChannel {
    fn new() -> Self {
        Self {
            enabled: false,
            dac_on: false,
            length_counter: 0,
            length_enabled: false,
            volume_code: 0,
            frequency: 0,
            period_timer: 0,
            sample_index: 0,
            last_sample: 0,
        }
    }

    fn period(&self) -> u32 {
        2 * (2048 - u32::from(self.frequency))
    }

    fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr30_value = io_registers.apu_read_register(IoRegister::NR30);
        let nr31_value = io_registers.apu_read_register(IoRegister::NR31);
        let nr32_value = io_registers.apu_read_register(IoRegister::NR32);
        let nr33_value = io_registers.apu_read_register(IoRegister::NR33);
        let nr34_value = io_registers.apu_read_register(IoRegister::NR34);

        if io_registers.is_register_dirty(IoRegister::NR31) {
            io_registers.clear_dirty_bit(IoRegister::NR31);
            self.length_counter = 256 - u16::from(nr31_value);
        }

        self.volume_code = (nr32_value >> 5) & 0x03;
        self.frequency = (u16::from(nr34_value & 0x07) << 8) | u16::from(nr33_value);
        self.length_enabled = nr34_value & 0x40 != 0;

        if nr34_value & 0x80 != 0 {
            io_registers.apu_write_register(IoRegister::NR34, nr34_value & 0x7F);

            self.enabled = true;
            if self.length_counter == 0 {
                self.length_counter = 256;
            }
            self.period_timer = self.period();
            self.sample_index = 0;
        }

        self.dac_on = nr30_value & 0x80 != 0;
        if !self.dac_on {
            self.enabled = false;
        }
    }

    fn tick_frequency_timer(&mut self, cycles: u32, io_registers: &IoRegisters) {
        let mut cycles = cycles;
        if self.period_timer == 0 {
            self.period_timer = self.period();
        }

        while cycles >= self.period_timer {
            cycles -= self.period_timer;
            self.period_timer = self.period();

            self.sample_index = (self.sample_index + 1) % 32;
            let sample_pair =
                io_registers.read_address(0xFF30 + u16::from(self.sample_index / 2));
            self.last_sample = if self.sample_index % 2 == 0 {
                sample_pair >> 4
            } else {
                sample_pair & 0x0F
            };
        }
        self.period_timer -= cycles;
    }

    fn clock_length(&mut self) {
        clock_length_counter(&mut self.length_counter, self.length_enabled, &mut self.enabled);
    }
}

impl Channel for WaveChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.enabled || self.volume_code == 0 {
            return Some(0);
        }

        Some(self.last_sample >> (self.volume_code - 1))
    }
}

/// Noise channel: a 15-bit (or 7-bit) linear feedback shift register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NoiseChannel {
    enabled: bool,
    dac_on: bool,
    length_counter: u16,
    length_enabled: bool,
    envelope: Envelope,
    clock_shift: u8,
    short_mode: bool,
    divisor_code: u8,
    lfsr: u16,
    period_timer: u32,
}

impl NoiseChannel {
    fn new() -> Self {
        Self {
            enabled: false,
            dac_on: false,
            length_counter: 0,
            length_enabled: false,
            envelope: Envelope::new(),
            clock_shift: 0,
            short_mode: false,
            divisor_code: 0,
            lfsr: 0,
            period_timer: 0,
        }
    }

    fn period(&self) -> u32 {
        NOISE_DIVISORS[usize::from(self.divisor_code)] << self.clock_shift
    }

    fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        let nr41_value = io_registers.apu_read_register(IoRegister::NR41);
        let nr42_value = io_registers.apu_read_register(IoRegister::NR42);
        let nr43_value = io_registers.apu_read_register(IoRegister::NR43);
        let nr44_value = io_registers.apu_read_register(IoRegister::NR44);

        if io_registers.is_register_dirty(IoRegister::NR41) {
            io_registers.clear_dirty_bit(IoRegister::NR41);
            self.length_counter = 64 - u16::from(nr41_value & 0x3F);
        }

        self.envelope.update_from_register(nr42_value);

        self.clock_shift = nr43_value >> 4;
        self.short_mode = nr43_value & 0x08 != 0;
        self.divisor_code = nr43_value & 0x07;

        self.length_enabled = nr44_value & 0x40 != 0;

        if nr44_value & 0x80 != 0 {
            io_registers.apu_write_register(IoRegister::NR44, nr44_value & 0x7F);

            self.enabled = true;
            if self.length_counter == 0 {
                self.length_counter = 64;
            }
            self.period_timer = self.period();
            self.envelope.trigger();
            self.lfsr = 0;
        }

        self.dac_on = nr42_value & 0xF8 != 0;
        if !self.dac_on {
            self.enabled = false;
        }
    }

    fn tick_frequency_timer(&mut self, cycles: u32) {
        let mut cycles = cycles;
        if self.period_timer == 0 {
            self.period_timer = self.period();
        }

        while cycles >= self.period_timer {
            cycles -= self.period_timer;
            self.period_timer = self.period();

            let bit_1 = (self.lfsr >> 1) & 0x01;
            let bit_0 = self.lfsr & 0x01;
            let new_bit = !(bit_1 ^ bit_0) & 0x01;

            let new_lfsr = if self.short_mode {
                (new_bit << 15) | (new_bit << 7) | (self.lfsr & 0x7F7F)
            } else {
                (new_bit << 15) | (self.lfsr & 0x7FFF)
            };
            self.lfsr = new_lfsr >> 1;
        }
        self.period_timer -= cycles;
    }

    fn clock_length(&mut self) {
        clock_length_counter(&mut self.length_counter, self.length_enabled, &mut self.enabled);
    }
}

impl Channel for NoiseChannel {
    fn sample_digital(&self) -> Option<u8> {
        if !self.dac_on {
            return None;
        }

        if !self.enabled {
            return Some(0);
        }

        if self.lfsr & 0x0001 != 0 {
            Some(self.envelope.current_volume)
        } else {
            Some(0)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApuState {
    enabled: bool,
    sequencer_step: u8,
    sequencer_counter: u32,
    clock_ticks: u64,
    channel_1: PulseChannel,
    channel_2: PulseChannel,
    channel_3: WaveChannel,
    channel_4: NoiseChannel,
    #[serde(skip)]
    sample_queue: VecDeque<i16>,
}

impl ApuState {
    pub fn new() -> Self {
        Self {
            enabled: true,
            sequencer_step: 0,
            sequencer_counter: 0,
            clock_ticks: 0,
            channel_1: PulseChannel::new_channel_1(),
            channel_2: PulseChannel::new_channel_2(),
            channel_3: WaveChannel::new(),
            channel_4: NoiseChannel::new(),
            sample_queue: VecDeque::new(),
        }
    }

    pub fn get_sample_queue_mut(&mut self) -> &mut VecDeque<i16> {
        &mut self.sample_queue
    }

    fn reset_channels(&mut self) {
        self.channel_1 = PulseChannel::new_channel_1();
        self.channel_2 = PulseChannel::new_channel_2();
        self.channel_3 = WaveChannel::new();
        self.channel_4 = NoiseChannel::new();
    }

    fn process_register_updates(&mut self, io_registers: &mut IoRegisters) {
        self.channel_1.process_register_updates(io_registers);
        self.channel_2.process_register_updates(io_registers);
        self.channel_3.process_register_updates(io_registers);
        self.channel_4.process_register_updates(io_registers);
    }

    fn tick_frequency_timers(&mut self, cycles: u32, io_registers: &IoRegisters) {
        self.channel_1.tick_frequency_timer(cycles);
        self.channel_2.tick_frequency_timer(cycles);
        self.channel_3.tick_frequency_timer(cycles, io_registers);
        self.channel_4.tick_frequency_timer(cycles);
    }

    fn clock_frame_sequencer(&mut self, io_registers: &mut IoRegisters) {
        let step = self.sequencer_step;

        // Steps 0, 2, 4, 6 clock length counters; 2 and 6 clock the sweep;
        // 7 clocks the volume envelopes
        if step % 2 == 0 {
            self.channel_1.clock_length();
            self.channel_2.clock_length();
            self.channel_3.clock_length();
            self.channel_4.clock_length();
        }

        if step == 2 || step == 6 {
            self.channel_1.clock_sweep(io_registers);
        }

        if step == 7 {
            self.channel_1.envelope.clock();
            self.channel_2.envelope.clock();
            self.channel_4.envelope.clock();
        }

        self.sequencer_step = (step + 1) % 8;
    }

    fn sample(&self, nr50_value: u8, nr51_value: u8) -> (i16, i16) {
        let mut sample_l = 0.0;
        let mut sample_r = 0.0;

        let channels: [(&dyn Channel, u8, u8); 4] = [
            (&self.channel_1, 0x10, 0x01),
            (&self.channel_2, 0x20, 0x02),
            (&self.channel_3, 0x40, 0x04),
            (&self.channel_4, 0x80, 0x08),
        ];
        for (channel, l_mask, r_mask) in channels {
            let sample = channel.sample_analog();
            if nr51_value & l_mask != 0 {
                sample_l += sample;
            }
            if nr51_value & r_mask != 0 {
                sample_r += sample;
            }
        }

        let l_volume = ((nr50_value & 0x70) >> 4) + 1;
        let r_volume = (nr50_value & 0x07) + 1;

        // Map [-4, 4] to [-30000, 30000] and apply L/R master volumes
        let sample_l = (sample_l / 4.0 * 30000.0 * f64::from(l_volume) / 8.0).round() as i16;
        let sample_r = (sample_r / 4.0 * 30000.0 * f64::from(r_volume) / 8.0).round() as i16;

        (sample_l, sample_r)
    }

    fn push_sample(&mut self, sample_l: i16, sample_r: i16) {
        self.sample_queue.push_back(sample_l);
        self.sample_queue.push_back(sample_r);

        while self.sample_queue.len() > MAX_QUEUED_SAMPLES {
            self.sample_queue.pop_front();
        }
    }
}

fn should_sample(prev_clock_ticks: u64, clock_ticks: u64) -> bool {
    prev_clock_ticks * OUTPUT_FREQUENCY / APU_CLOCK_SPEED
        != clock_ticks * OUTPUT_FREQUENCY / APU_CLOCK_SPEED
}

/// Advance the audio unit by the given number of clock cycles, pushing
/// stereo samples to the queue at the output rate.
pub fn tick(apu_state: &mut ApuState, io_registers: &mut IoRegisters, cycles: u32) {
    let prev_clock = apu_state.clock_ticks;
    apu_state.clock_ticks += u64::from(cycles);

    let nr52_value = io_registers.apu_read_register(IoRegister::NR52);
    let apu_powered = nr52_value & 0x80 != 0;

    if !apu_powered {
        if apu_state.enabled {
            // The register file was cleared by the NR52 write; drop all
            // channel state as well
            apu_state.reset_channels();
            apu_state.enabled = false;
        }

        if should_sample(prev_clock, apu_state.clock_ticks) {
            apu_state.push_sample(0, 0);
        }

        return;
    }

    if !apu_state.enabled {
        // Power-up restarts the frame sequencer from step 0
        apu_state.enabled = true;
        apu_state.sequencer_step = 0;
        apu_state.sequencer_counter = 0;
    }

    apu_state.process_register_updates(io_registers);

    apu_state.tick_frequency_timers(cycles, io_registers);

    apu_state.sequencer_counter += cycles;
    while apu_state.sequencer_counter >= FRAME_SEQUENCER_PERIOD {
        apu_state.sequencer_counter -= FRAME_SEQUENCER_PERIOD;
        apu_state.clock_frame_sequencer(io_registers);
    }

    // Mirror channel status into the NR52 readback bits
    let new_nr52_value = 0x80
        | (u8::from(apu_state.channel_4.enabled) << 3)
        | (u8::from(apu_state.channel_3.enabled) << 2)
        | (u8::from(apu_state.channel_2.enabled) << 1)
        | u8::from(apu_state.channel_1.enabled);
    io_registers.apu_write_register(IoRegister::NR52, new_nr52_value);

    if should_sample(prev_clock, apu_state.clock_ticks) {
        let (sample_l, sample_r) = apu_state.sample(
            io_registers.apu_read_register(IoRegister::NR50),
            io_registers.apu_read_register(IoRegister::NR51),
        );
        apu_state.push_sample(sample_l, sample_r);
    }
}
