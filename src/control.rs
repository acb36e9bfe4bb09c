//! Control path.
//!
//! The [`Controller`] implements the operations that reconfigure the radio:
//! oscillator frequencies, the DDS reset, and the streaming state and
//! destination. It owns the [`RadioTuner`], so it is the only writer of the
//! radio registers, and it shares the [`StreamConfig`] with the streamer.

use crate::{
    config::{clamp_frequency, StreamConfig},
    mmio::RegisterAccess,
    tuner::{Benchmark, Oscillator, RadioTuner},
};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Large frequency step for the fake ADC, in Hz.
pub const COARSE_STEP: f64 = 1000.0;

/// Small frequency step for the fake ADC, in Hz.
pub const FINE_STEP: f64 = 100.0;

/// Number of register reads done by [`Controller::benchmark`].
pub const BENCHMARK_READS: usize = 2048;

/// Outcome of a frequency change.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrequencyUpdate {
    /// Oscillator that was changed.
    pub oscillator: Oscillator,
    /// Frequency that was requested, in Hz.
    pub requested: f64,
    /// Frequency that was applied after clamping, in Hz.
    pub frequency: f64,
    /// Phase increment written to the oscillator.
    pub phase_increment: i32,
}

impl FrequencyUpdate {
    /// Returns `true` if the requested frequency was out of range.
    pub fn clamped(&self) -> bool {
        self.requested != self.frequency
    }
}

impl std::fmt::Display for FrequencyUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.clamped() {
            writeln!(
                f,
                "Frequency {} Hz out of range, clamped to {} Hz",
                self.requested, self.frequency
            )?;
        }
        write!(
            f,
            "{} frequency set to {} Hz (DDS phase increment {})",
            self.oscillator, self.frequency, self.phase_increment
        )
    }
}

/// Radio controller.
#[derive(Debug)]
pub struct Controller<R> {
    tuner: RadioTuner<R>,
    config: StreamConfig,
}

impl<R: RegisterAccess> Controller<R> {
    /// Creates a controller.
    ///
    /// The oscillators are not written until a frequency is set. The reset of
    /// the DDS is released.
    pub fn new(mut tuner: RadioTuner<R>, config: StreamConfig) -> Controller<R> {
        tuner.set_reset(false);
        Controller { tuner, config }
    }

    /// Gives access to the stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Sets the frequency of an oscillator.
    ///
    /// The frequency is clamped to the valid range. The clamped value is
    /// recorded in the configuration and written to the hardware.
    pub fn set_frequency(&mut self, oscillator: Oscillator, requested: f64) -> FrequencyUpdate {
        let frequency = clamp_frequency(requested);
        let phase_increment = self.tuner.set_frequency(oscillator, frequency);
        self.config.set_frequency(oscillator, frequency);
        let update = FrequencyUpdate {
            oscillator,
            requested,
            frequency,
            phase_increment,
        };
        if update.clamped() {
            tracing::warn!(%oscillator, requested, frequency, "frequency clamped");
        }
        tracing::info!(%oscillator, frequency, phase_increment, "frequency set");
        update
    }

    /// Changes the fake ADC frequency by `step` Hz.
    ///
    /// The result is clamped to the valid range.
    pub fn step_adc_frequency(&mut self, step: f64) -> FrequencyUpdate {
        let current = self.config.frequency(Oscillator::Adc);
        self.set_frequency(Oscillator::Adc, current + step)
    }

    /// Pulses the reset of the DDS oscillators.
    pub fn reset(&mut self) {
        self.tuner.reset();
        tracing::info!("DDS reset");
    }

    /// Toggles streaming, returning whether it is now enabled.
    pub fn toggle_streaming(&mut self) -> bool {
        let streaming = self.config.toggle_streaming();
        tracing::info!(streaming, "toggled streaming");
        streaming
    }

    /// Sets the IP address of the stream destination.
    pub fn set_destination(&mut self, address: Ipv4Addr) -> SocketAddrV4 {
        let destination = self.config.set_destination(address);
        tracing::info!(%destination, "stream destination changed");
        destination
    }

    /// Measures the throughput of reads from the radio registers.
    pub fn benchmark(&self) -> Benchmark {
        let benchmark = self.tuner.benchmark(BENCHMARK_READS);
        tracing::info!(clocks = benchmark.clocks, bytes = benchmark.bytes, "benchmark");
        benchmark
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mmio::sim::SimRadio;
    use crate::tuner::phase_increment;
    use radio_pac::radio_tuner;

    fn controller() -> (Controller<SimRadio>, SimRadio) {
        let radio = SimRadio::default();
        let config = StreamConfig::new(Ipv4Addr::LOCALHOST);
        (Controller::new(RadioTuner::new(radio.clone()), config), radio)
    }

    #[test]
    fn new_releases_reset() {
        let (_, radio) = controller();
        assert_eq!(radio.writes(), vec![(radio_tuner::CONTROL, 0)]);
    }

    #[test]
    fn set_tuner_frequency() {
        let (mut controller, radio) = controller();
        let update = controller.set_frequency(Oscillator::Tuner, 20e6);
        assert!(!update.clamped());
        assert_eq!(update.phase_increment, phase_increment(Oscillator::Tuner, 20e6));
        assert_eq!(controller.config().frequency(Oscillator::Tuner), 20e6);
        assert_eq!(
            radio.last_write(radio_tuner::TUNER_PINC),
            Some(update.phase_increment as u32)
        );
        assert_eq!(radio.last_write(radio_tuner::ADC_PINC), None);
    }

    #[test]
    fn above_range_is_clamped() {
        let (mut controller, radio) = controller();
        let max = controller.set_frequency(Oscillator::Adc, 125e6);
        let max_write = radio.last_write(radio_tuner::ADC_PINC);
        let above = controller.set_frequency(Oscillator::Adc, 200e6);
        assert!(above.clamped());
        assert_eq!(above.frequency, max.frequency);
        assert_eq!(above.phase_increment, max.phase_increment);
        assert_eq!(radio.last_write(radio_tuner::ADC_PINC), max_write);
        assert_eq!(controller.config().frequency(Oscillator::Adc), 125e6);
    }

    #[test]
    fn steps() {
        let (mut controller, _) = controller();
        controller.step_adc_frequency(COARSE_STEP);
        controller.step_adc_frequency(FINE_STEP);
        controller.step_adc_frequency(FINE_STEP);
        assert_eq!(controller.config().frequency(Oscillator::Adc), 1200.0);
        controller.step_adc_frequency(-COARSE_STEP);
        assert_eq!(controller.config().frequency(Oscillator::Adc), 200.0);
    }

    #[test]
    fn step_below_zero_is_clamped() {
        let (mut controller, radio) = controller();
        controller.set_frequency(Oscillator::Adc, 500.0);
        let update = controller.step_adc_frequency(-COARSE_STEP);
        assert!(update.clamped());
        assert_eq!(update.frequency, 0.0);
        assert_eq!(update.phase_increment, 0);
        assert_eq!(radio.last_write(radio_tuner::ADC_PINC), Some(0));
    }

    #[test]
    fn step_above_max_is_clamped() {
        let (mut controller, _) = controller();
        controller.set_frequency(Oscillator::Adc, 125e6 - 50.0);
        let update = controller.step_adc_frequency(FINE_STEP);
        assert_eq!(update.frequency, 125e6);
    }

    #[test]
    fn reset_and_streaming() {
        let (mut controller, radio) = controller();
        controller.reset();
        assert_eq!(
            radio.writes(),
            vec![
                (radio_tuner::CONTROL, 0),
                (radio_tuner::CONTROL, 1),
                (radio_tuner::CONTROL, 0)
            ]
        );
        assert!(!controller.toggle_streaming());
        assert!(!controller.config().streaming());
        assert!(controller.toggle_streaming());
    }

    #[test]
    fn destination() {
        let (mut controller, _) = controller();
        let destination = controller.set_destination(Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(destination, "10.0.0.7:25344".parse().unwrap());
        assert_eq!(controller.config().destination(), destination);
    }

    #[test]
    fn update_display() {
        let (mut controller, _) = controller();
        let update = controller.set_frequency(Oscillator::Adc, 1000.0);
        assert_eq!(
            update.to_string(),
            "fake ADC frequency set to 1000 Hz (DDS phase increment 1073)"
        );
        let update = controller.set_frequency(Oscillator::Tuner, 130e6);
        assert_eq!(
            update.to_string(),
            "Frequency 130000000 Hz out of range, clamped to 125000000 Hz\n\
             tuner frequency set to 125000000 Hz (DDS phase increment -134217728)"
        );
    }
}
