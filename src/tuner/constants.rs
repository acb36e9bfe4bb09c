//! Radio tuner implementation constants.
//!
//! This module contains constants that define the characteristics of the DDS
//! oscillators in the FPGA.

/// Clock frequency at which the DDS oscillators run.
pub const CLOCK_FREQUENCY: f64 = 125e6;

/// Number of fractional bits of the phase increment.
///
/// A phase increment of `1 << PHASE_INCREMENT_BITS` advances the phase by one
/// full cycle per clock.
pub const PHASE_INCREMENT_BITS: u32 = 27;

/// Highest frequency that the control path accepts, in Hz.
pub const MAX_FREQUENCY: f64 = CLOCK_FREQUENCY;

/// Lowest frequency that the control path accepts, in Hz.
pub const MIN_FREQUENCY: f64 = 0.0;
