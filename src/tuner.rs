//! Radio tuner.
//!
//! This module contains the userspace driver for the radio tuner peripheral,
//! which holds the two DDS oscillators: the fake ADC, which synthesizes the
//! test signal, and the tuner, which down-converts it.

use crate::mmio::RegisterAccess;
use radio_pac::radio_tuner;

pub mod constants;

/// DDS oscillator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Oscillator {
    /// Fake ADC oscillator, which generates the signal.
    Adc,
    /// Tuner oscillator, which mixes the signal down to baseband.
    Tuner,
}

impl Oscillator {
    fn register(self) -> usize {
        match self {
            Oscillator::Adc => radio_tuner::ADC_PINC,
            Oscillator::Tuner => radio_tuner::TUNER_PINC,
        }
    }

    // The tuner runs at the negative frequency so that it down-converts.
    fn sign(self) -> f64 {
        match self {
            Oscillator::Adc => 1.0,
            Oscillator::Tuner => -1.0,
        }
    }
}

impl std::fmt::Display for Oscillator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Oscillator::Adc => write!(f, "fake ADC"),
            Oscillator::Tuner => write!(f, "tuner"),
        }
    }
}

/// Computes the phase increment for an oscillator.
///
/// The `frequency` is given in Hz. The result is truncated towards zero, and
/// saturates if `frequency` is so large that it does not fit in an `i32`.
/// There is no range check: callers are expected to clamp the frequency to
/// `[MIN_FREQUENCY, MAX_FREQUENCY]`.
pub fn phase_increment(oscillator: Oscillator, frequency: f64) -> i32 {
    let scale = (1u32 << constants::PHASE_INCREMENT_BITS) as f64;
    (oscillator.sign() * frequency * scale / constants::CLOCK_FREQUENCY) as i32
}

/// Sets the frequency of an oscillator.
///
/// Writes the phase increment corresponding to `frequency` (in Hz) to the
/// oscillator register and returns it. See [`phase_increment`].
pub fn set_oscillator_frequency<R: RegisterAccess>(
    registers: &R,
    oscillator: Oscillator,
    frequency: f64,
) -> i32 {
    let pinc = phase_increment(oscillator, frequency);
    registers.write(oscillator.register(), pinc as u32);
    pinc
}

/// Radio tuner peripheral.
///
/// This owns the register window of the peripheral. It is not cloneable, so
/// whoever owns the `RadioTuner` is the only writer of the oscillator and
/// control registers.
#[derive(Debug)]
pub struct RadioTuner<R> {
    registers: R,
}

/// Result of a register read throughput benchmark.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Benchmark {
    /// Number of fabric clock cycles that the reads took.
    pub clocks: u32,
    /// Number of bytes read.
    pub bytes: usize,
}

impl<R: RegisterAccess> RadioTuner<R> {
    /// Creates a radio tuner from its register window.
    pub fn new(registers: R) -> RadioTuner<R> {
        RadioTuner { registers }
    }

    /// Sets the frequency of an oscillator.
    ///
    /// Returns the phase increment written to the register.
    pub fn set_frequency(&mut self, oscillator: Oscillator, frequency: f64) -> i32 {
        let pinc = set_oscillator_frequency(&self.registers, oscillator, frequency);
        tracing::debug!(%oscillator, frequency, pinc, "set oscillator frequency");
        pinc
    }

    /// Asserts or releases the reset of the DDS oscillators.
    pub fn set_reset(&mut self, value: bool) {
        self.registers.write(
            radio_tuner::CONTROL,
            if value {
                radio_tuner::CONTROL_RESET
            } else {
                radio_tuner::CONTROL_RUN
            },
        );
    }

    /// Pulses the reset of the DDS oscillators.
    ///
    /// Asserts and immediately releases the reset.
    pub fn reset(&mut self) {
        self.set_reset(true);
        self.set_reset(false);
    }

    /// Reads the free-running cycle counter.
    pub fn cycle_counter(&self) -> u32 {
        self.registers.read(radio_tuner::TIMER)
    }

    /// Measures the throughput of register reads.
    ///
    /// Reads the cycle counter `num_reads` times and measures how many clock
    /// cycles elapsed.
    pub fn benchmark(&self, num_reads: usize) -> Benchmark {
        let start = self.cycle_counter();
        let mut stop = start;
        for _ in 0..num_reads {
            stop = self.cycle_counter();
        }
        Benchmark {
            clocks: stop.wrapping_sub(start),
            bytes: num_reads * std::mem::size_of::<u32>(),
        }
    }
}

impl Benchmark {
    /// Gives the duration of the benchmark in seconds.
    pub fn seconds(&self) -> f64 {
        f64::from(self.clocks) / constants::CLOCK_FREQUENCY
    }

    /// Gives the measured throughput in MiB/s.
    ///
    /// Returns `None` if no clock cycles elapsed, which happens if the cycle
    /// counter is not running.
    pub fn throughput(&self) -> Option<f64> {
        if self.clocks == 0 {
            return None;
        }
        Some(self.bytes as f64 / (1u32 << 20) as f64 / self.seconds())
    }
}

impl std::fmt::Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.throughput() {
            Some(throughput) => write!(
                f,
                "read {} bytes in {} clocks ({:.6} s), throughput {:.3} MiB/s",
                self.bytes,
                self.clocks,
                self.seconds(),
                throughput
            ),
            None => write!(
                f,
                "read {} bytes with no elapsed clocks; is the cycle counter running?",
                self.bytes
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mmio::sim::SimRadio;

    fn expected(sign: f64, frequency: f64) -> i32 {
        (sign * frequency * 134217728.0 / 125e6).trunc() as i32
    }

    #[test]
    fn phase_increment_values() {
        assert_eq!(phase_increment(Oscillator::Adc, 0.0), 0);
        // 125 MHz is one full cycle per clock
        assert_eq!(phase_increment(Oscillator::Adc, 125e6), 1 << 27);
        assert_eq!(phase_increment(Oscillator::Tuner, 125e6), -(1 << 27));
        // 1 kHz is 1073.74... and truncates to 1073
        assert_eq!(phase_increment(Oscillator::Adc, 1000.0), 1073);
        assert_eq!(phase_increment(Oscillator::Tuner, 1000.0), -1073);
    }

    #[test]
    fn phase_increment_sweep() {
        let mut frequency = 0.0;
        while frequency <= 125e6 {
            for (oscillator, sign) in [(Oscillator::Adc, 1.0), (Oscillator::Tuner, -1.0)] {
                assert_eq!(
                    phase_increment(oscillator, frequency),
                    expected(sign, frequency),
                    "{oscillator} at {frequency} Hz"
                );
            }
            frequency += 12_345.0;
        }
    }

    #[test]
    fn tuner_is_negated_adc() {
        for frequency in [1.0, 100.0, 12_345_678.0, 99_999_999.0] {
            assert_eq!(
                phase_increment(Oscillator::Tuner, frequency),
                -phase_increment(Oscillator::Adc, frequency)
            );
        }
    }

    #[test]
    fn set_frequency_writes_one_register() {
        let radio = SimRadio::default();
        let mut tuner = RadioTuner::new(radio.clone());
        let pinc = tuner.set_frequency(Oscillator::Tuner, 10e6);
        assert_eq!(pinc, -10737418);
        assert_eq!(
            radio.writes(),
            vec![(radio_tuner::TUNER_PINC, (-10737418i32) as u32)]
        );
        tuner.set_frequency(Oscillator::Adc, 10e6);
        assert_eq!(radio.last_write(radio_tuner::ADC_PINC), Some(10737418));
    }

    #[test]
    fn reset_pulse() {
        let radio = SimRadio::default();
        let mut tuner = RadioTuner::new(radio.clone());
        tuner.reset();
        assert_eq!(
            radio.writes(),
            vec![(radio_tuner::CONTROL, 1), (radio_tuner::CONTROL, 0)]
        );
    }

    #[test]
    fn benchmark() {
        let radio = SimRadio::with_clocks_per_read(5, u32::MAX - 100);
        let tuner = RadioTuner::new(radio);
        let result = tuner.benchmark(2048);
        assert_eq!(result.clocks, 2048 * 5);
        assert_eq!(result.bytes, 8192);
        assert!((result.seconds() - 2048.0 * 5.0 * 8e-9).abs() < 1e-12);
        let throughput = 8192.0 / 1048576.0 / result.seconds();
        assert!((result.throughput().unwrap() - throughput).abs() < 1e-9);
    }

    #[test]
    fn benchmark_with_stalled_counter() {
        let radio = SimRadio::with_clocks_per_read(0, 1234);
        let result = RadioTuner::new(radio).benchmark(2048);
        assert_eq!(result.clocks, 0);
        assert_eq!(result.throughput(), None);
        let text = result.to_string();
        assert_eq!(
            text,
            "read 8192 bytes with no elapsed clocks; is the cycle counter running?"
        );
        assert!(!text.contains("inf"));
    }
}
