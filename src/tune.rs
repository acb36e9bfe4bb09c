//! Demo tune.
//!
//! Plays a short melody by stepping the fake ADC oscillator through a
//! sequence of notes. Each note is an offset from the current fake ADC
//! frequency, so the melody can be heard after down-conversion by the tuner.

use crate::{control::Controller, mmio::RegisterAccess, tuner::Oscillator};
use std::time::Duration;

/// Notes of the tune, as `(frequency offset in Hz, duration in beats)`.
///
/// An offset of zero is a rest.
pub const NOTES: [(f64, f64); 16] = [
    (1760.0, 1.0),
    (1567.98, 1.0),
    (1396.91, 1.0),
    (1318.51, 1.0),
    (1174.66, 1.0),
    (1318.51, 1.0),
    (1396.91, 1.0),
    (1567.98, 1.0),
    (1760.0, 0.5),
    (0.0, 0.0001),
    (1760.0, 0.5),
    (0.0, 0.0001),
    (1760.0, 1.0),
    (1975.53, 1.0),
    (2093.0, 2.0),
    (0.0, 0.0001),
];

/// Default duration of a beat.
pub const BEAT: Duration = Duration::from_millis(500);

/// Plays the tune.
///
/// The fake ADC frequency in use when the tune starts is restored when it
/// finishes.
pub async fn play<R: RegisterAccess>(controller: &mut Controller<R>, beat: Duration) {
    let base = controller.config().frequency(Oscillator::Adc);
    tracing::info!(base, "playing tune");
    for (offset, beats) in NOTES {
        controller.set_frequency(Oscillator::Adc, base + offset);
        tokio::time::sleep(beat.mul_f64(beats)).await;
    }
    controller.set_frequency(Oscillator::Adc, base);
}
