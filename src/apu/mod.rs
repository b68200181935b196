//! The audio processing unit.
//!
//! Five channels clocked off the CPU, mixed with the usual non-linear formula and resampled
//! to the host's sample rate.
mod dmc;
mod envelope;
mod length_counter;
mod noise;
mod pulse;
mod triangle;

pub use dmc::{DmcRegister, DMC_RATES};
pub use envelope::Envelope;
pub use length_counter::LengthCounter;
pub use noise::NoiseRegister;
pub use pulse::{PulseChannel, PulseRegister};
pub use triangle::TriangleRegister;

use std::collections::VecDeque;
use std::fmt::Debug;

use log::*;

use crate::CPU_CLOCK_SPEED;

// Frame sequencer steps, in CPU cycles since the sequencer was reset
const QUARTER_1: u32 = 7457;
const HALF_1: u32 = 14913;
const QUARTER_3: u32 = 22371;
const FOUR_STEP_IRQ: u32 = 29828;
const FOUR_STEP_HALF_2: u32 = 29829;
const FOUR_STEP_PERIOD: u32 = 29830;
const FIVE_STEP_HALF_2: u32 = 37281;
const FIVE_STEP_PERIOD: u32 = 37282;

// About 1.5 seconds at 44.1kHz
const MAX_QUEUE_LEN: usize = 1 << 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SequencerMode {
    FourStep,
    FiveStep,
}

/// The APU of the NES.
///
/// Clocked once per CPU cycle by [Nes][crate::Nes]. Samples are pulled with [Apu::take_samples].
#[derive(Clone)]
pub struct Apu {
    pub pulse_registers: [PulseRegister; 2],
    pub triangle_register: TriangleRegister,
    pub noise_register: NoiseRegister,
    pub dmc_register: DmcRegister,
    mode: SequencerMode,
    irq_inhibit: bool,
    irq_flag: bool,
    // CPU cycles since the frame sequencer was last reset
    frame_cycle: u32,
    // Cycles until a write to $4017 resets the sequencer
    pending_reset: Option<u8>,
    // Total CPU cycles, its parity decides when pulse timers are clocked
    cycles: u64,
    sample_rate: u32,
    // Resampler state, see Apu::resample
    phase: u64,
    sample_sum: f32,
    sample_count: u32,
    queue: VecDeque<f32>,
}

impl Debug for Apu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pulse 1: {:?}", self.pulse_registers[0])?;
        writeln!(f, "pulse 2: {:?}", self.pulse_registers[1])?;
        writeln!(f, "triangle: {:?}", self.triangle_register)?;
        writeln!(f, "noise: {:?}", self.noise_register)?;
        writeln!(f, "dmc: {:?}", self.dmc_register)?;
        write!(
            f,
            "sequencer: {:?} cycle={} irq={} inhibit={}",
            self.mode, self.frame_cycle, self.irq_flag, self.irq_inhibit
        )
    }
}

impl Default for Apu {
    fn default() -> Self {
        Apu::new(44_100)
    }
}

impl Apu {
    pub fn new(sample_rate: u32) -> Apu {
        Apu {
            pulse_registers: [
                PulseRegister::new(PulseChannel::One),
                PulseRegister::new(PulseChannel::Two),
            ],
            triangle_register: TriangleRegister::default(),
            noise_register: NoiseRegister::default(),
            dmc_register: DmcRegister::default(),
            mode: SequencerMode::FourStep,
            irq_inhibit: false,
            irq_flag: false,
            frame_cycle: 0,
            pending_reset: None,
            cycles: 0,
            sample_rate,
            phase: 0,
            sample_sum: 0.0,
            sample_count: 0,
            queue: VecDeque::new(),
        }
    }
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }
    /// Write a byte of data to the APU given its address in CPU memory space
    pub fn write_register(&mut self, addr: usize, value: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse_registers[0].write(addr - 0x4000, value),
            0x4004..=0x4007 => self.pulse_registers[1].write(addr - 0x4004, value),
            0x4008..=0x400B => self.triangle_register.write(addr - 0x4008, value),
            0x400C..=0x400F => self.noise_register.write(addr - 0x400C, value),
            0x4010..=0x4013 => self.dmc_register.write(addr - 0x4010, value),
            0x4015 => {
                self.pulse_registers[0].set_enabled((value & 0x01) != 0);
                self.pulse_registers[1].set_enabled((value & 0x02) != 0);
                self.triangle_register.set_enabled((value & 0x04) != 0);
                self.noise_register.set_enabled((value & 0x08) != 0);
                self.dmc_register.set_enabled((value & 0x10) != 0);
            }
            0x4017 => {
                self.mode = if (value & 0x80) == 0 {
                    SequencerMode::FourStep
                } else {
                    SequencerMode::FiveStep
                };
                self.irq_inhibit = (value & 0x40) != 0;
                if self.irq_inhibit {
                    self.irq_flag = false;
                }
                // Takes effect after 3 cycles if written on an even cycle, 4 if odd
                self.pending_reset = Some(if self.cycles % 2 == 0 { 3 } else { 4 });
                if self.mode == SequencerMode::FiveStep {
                    self.on_quarter_frame();
                    self.on_half_frame();
                }
            }
            _ => debug!("Ignoring write of {:02X} to APU address {:04X}", value, addr),
        }
    }
    /// Read `$4015`, clearing the frame IRQ flag
    pub fn read_status(&mut self) -> u8 {
        let v = self.peek_status();
        self.irq_flag = false;
        v
    }
    /// Read `$4015` without side effects
    pub fn peek_status(&self) -> u8 {
        macro_rules! bit_flag {
            ($flag: expr, $bit: literal) => {
                if $flag {
                    0x01 << $bit
                } else {
                    0x00
                }
            };
        }
        bit_flag!(self.dmc_register.irq_flag, 7)
            | bit_flag!(self.irq_flag, 6)
            | bit_flag!(self.dmc_register.bytes_remaining > 0, 4)
            | bit_flag!(self.noise_register.length_counter.is_active(), 3)
            | bit_flag!(self.triangle_register.length_counter.is_active(), 2)
            | bit_flag!(self.pulse_registers[1].length_counter.is_active(), 1)
            | bit_flag!(self.pulse_registers[0].length_counter.is_active(), 0)
    }
    /// Whether the APU is asserting the CPU's IRQ line
    pub fn irq(&self) -> bool {
        self.irq_flag || self.dmc_register.irq_flag
    }
    /// Address the DMC wants read from CPU memory space, if any
    pub fn dmc_dma_request(&self) -> Option<u16> {
        self.dmc_register.dma_request()
    }
    pub fn dmc_fill_buffer(&mut self, value: u8) {
        self.dmc_register.fill_buffer(value);
    }
    /// Advance the APU by a single CPU cycle
    pub fn clock(&mut self) {
        self.cycles += 1;
        self.clock_sequencer();
        // Pulse timers run at half the CPU clock
        if self.cycles % 2 == 0 {
            self.pulse_registers
                .iter_mut()
                .for_each(|p| p.clock_timer());
        }
        self.triangle_register.clock_timer();
        self.noise_register.clock_timer();
        self.dmc_register.clock_timer();
        self.resample();
    }
    fn clock_sequencer(&mut self) {
        if let Some(n) = self.pending_reset {
            if n <= 1 {
                self.pending_reset = None;
                self.frame_cycle = 0;
            } else {
                self.pending_reset = Some(n - 1);
            }
        }
        self.frame_cycle += 1;
        match (self.mode, self.frame_cycle) {
            (_, QUARTER_1) | (_, QUARTER_3) => self.on_quarter_frame(),
            (_, HALF_1) => {
                self.on_quarter_frame();
                self.on_half_frame();
            }
            (SequencerMode::FourStep, FOUR_STEP_IRQ) => self.set_frame_irq(),
            (SequencerMode::FourStep, FOUR_STEP_HALF_2) => {
                self.on_quarter_frame();
                self.on_half_frame();
                self.set_frame_irq();
            }
            (SequencerMode::FourStep, FOUR_STEP_PERIOD) => {
                self.set_frame_irq();
                self.frame_cycle = 0;
            }
            (SequencerMode::FiveStep, FIVE_STEP_HALF_2) => {
                self.on_quarter_frame();
                self.on_half_frame();
            }
            (SequencerMode::FiveStep, FIVE_STEP_PERIOD) => self.frame_cycle = 0,
            _ => {}
        }
    }
    fn set_frame_irq(&mut self) {
        if !self.irq_inhibit {
            self.irq_flag = true;
        }
    }
    fn on_quarter_frame(&mut self) {
        self.pulse_registers.iter_mut().for_each(|reg| {
            reg.envelope.clock(reg.length_counter.halt);
        });
        self.noise_register
            .envelope
            .clock(self.noise_register.length_counter.halt);
        self.triangle_register.clock_linear_counter();
    }
    fn on_half_frame(&mut self) {
        self.pulse_registers
            .iter_mut()
            .for_each(|reg| reg.clock_half_frame());
        self.triangle_register.length_counter.clock();
        self.noise_register.length_counter.clock();
    }
    /// The current output from the mixer, between 0 and 1
    pub fn mixer_output(&self) -> f32 {
        let pulse: u32 = self.pulse_registers.iter().map(|p| p.value() as u32).sum();
        let pulse_out = if pulse == 0 {
            0.0
        } else {
            95.88 / ((8128.0 / pulse as f32) + 100.0)
        };
        let t = self.triangle_register.value() as f32;
        let n = self.noise_register.value() as f32;
        let d = self.dmc_register.value() as f32;
        let tnd_out = if t + n + d == 0.0 {
            0.0
        } else {
            159.79 / (1.0 / (t / 8227.0 + n / 12241.0 + d / 22638.0) + 100.0)
        };
        pulse_out + tnd_out
    }
    // Box filter the mixer output down to the sample rate.
    // Each CPU cycle adds sample_rate to the phase, a sample is due every CPU_CLOCK_SPEED
    fn resample(&mut self) {
        self.sample_sum += self.mixer_output();
        self.sample_count += 1;
        self.phase += self.sample_rate as u64;
        if self.phase >= CPU_CLOCK_SPEED as u64 {
            self.phase -= CPU_CLOCK_SPEED as u64;
            if self.queue.len() >= MAX_QUEUE_LEN {
                warn!("Audio queue full, dropping oldest sample");
                self.queue.pop_front();
            }
            self.queue
                .push_back(self.sample_sum / self.sample_count as f32);
            self.sample_sum = 0.0;
            self.sample_count = 0;
        }
    }
    /// Drain the queued audio samples
    pub fn take_samples(&mut self) -> Vec<f32> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_irq() {
        let mut apu = Apu::default();
        (0..FOUR_STEP_IRQ - 1).for_each(|_| apu.clock());
        assert!(!apu.irq());
        apu.clock();
        assert!(apu.irq());
        assert_eq!(apu.read_status() & 0x40, 0x40);
        assert!(!apu.irq());
        assert_eq!(apu.peek_status() & 0x40, 0x00);
    }
    #[test]
    fn test_irq_inhibit() {
        let mut apu = Apu::default();
        apu.write_register(0x4017, 0x40);
        (0..FOUR_STEP_PERIOD * 2).for_each(|_| apu.clock());
        assert!(!apu.irq());
        // Five step mode never raises the IRQ
        apu.write_register(0x4017, 0x80);
        (0..FIVE_STEP_PERIOD * 2).for_each(|_| apu.clock());
        assert!(!apu.irq());
    }
    #[test]
    fn test_length_counter_status() {
        let mut apu = Apu::default();
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0x10);
        // Length index 0, 10 half frames
        apu.write_register(0x4003, 0x00);
        assert_eq!(apu.peek_status() & 0x01, 0x01);
        // Two half frames per four step sequence
        (0..FOUR_STEP_PERIOD * 5 + 10).for_each(|_| apu.clock());
        assert_eq!(apu.peek_status() & 0x01, 0x00);
        // Disabling clears the counter immediately
        apu.write_register(0x4003, 0x00);
        apu.write_register(0x4015, 0x00);
        assert_eq!(apu.peek_status() & 0x1F, 0x00);
    }
    #[test]
    fn test_resampler_rate() {
        let mut apu = Apu::new(44_100);
        (0..CPU_CLOCK_SPEED).for_each(|_| apu.clock());
        assert_eq!(apu.take_samples().len(), 44_100);
        assert!(apu.take_samples().is_empty());
    }
    #[test]
    fn test_mixer_range() {
        let mut apu = Apu::default();
        // The triangle idles at 15
        assert!(apu.mixer_output() > 0.0);
        apu.write_register(0x4011, 0x7F);
        apu.noise_register.shift = 0;
        apu.noise_register.enabled = true;
        apu.noise_register.length_counter.value = 1;
        apu.noise_register.envelope.write(0x1F);
        assert!(apu.mixer_output() < 1.0);
    }
}
