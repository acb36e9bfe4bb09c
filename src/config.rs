//! Stream configuration.
//!
//! This module contains [`StreamConfig`], the state shared between the
//! control path and the streamer.

use crate::tuner::{constants, Oscillator};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};

/// UDP port to which the sample stream is sent.
pub const STREAM_PORT: u16 = 25344;

/// Stream configuration.
///
/// This struct gives shared access to getters and setters for the
/// destination of the stream, the streaming flag, and the frequencies of the
/// oscillators. It is cheaply clonable and clones refer to the same
/// configuration. All the fields are guarded by the same mutex, so readers
/// always see a consistent snapshot.
#[derive(Debug, Clone)]
pub struct StreamConfig(Arc<Mutex<Config>>);

/// Snapshot of the stream configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Destination of the UDP stream.
    pub destination: SocketAddrV4,
    /// Whether streaming is enabled.
    pub streaming: bool,
    /// Frequency of the fake ADC oscillator in Hz.
    pub adc_frequency: f64,
    /// Frequency of the tuner oscillator in Hz.
    pub tuner_frequency: f64,
}

/// Clamps a frequency to the range accepted by the oscillators.
///
/// Returns the clamped frequency, in Hz.
pub fn clamp_frequency(frequency: f64) -> f64 {
    frequency.clamp(constants::MIN_FREQUENCY, constants::MAX_FREQUENCY)
}

impl StreamConfig {
    /// Creates a new stream configuration.
    ///
    /// Streaming starts enabled, sending to `destination`, with both
    /// oscillators at 0 Hz.
    pub fn new(destination: Ipv4Addr) -> StreamConfig {
        StreamConfig(Arc::new(Mutex::new(Config {
            destination: SocketAddrV4::new(destination, STREAM_PORT),
            streaming: true,
            adc_frequency: 0.0,
            tuner_frequency: 0.0,
        })))
    }

    /// Returns a snapshot of the whole configuration.
    pub fn snapshot(&self) -> Config {
        *self.0.lock().unwrap()
    }

    /// Returns the stream destination if streaming is enabled.
    ///
    /// Both fields are read under the same lock.
    pub fn stream_target(&self) -> Option<SocketAddr> {
        let conf = self.0.lock().unwrap();
        conf.streaming.then_some(SocketAddr::V4(conf.destination))
    }

    /// Returns the stream destination.
    pub fn destination(&self) -> SocketAddrV4 {
        self.0.lock().unwrap().destination
    }

    /// Sets the IP address of the stream destination.
    ///
    /// The port is always [`STREAM_PORT`]. Returns the new destination.
    pub fn set_destination(&self, address: Ipv4Addr) -> SocketAddrV4 {
        let destination = SocketAddrV4::new(address, STREAM_PORT);
        self.0.lock().unwrap().destination = destination;
        destination
    }

    /// Returns whether streaming is enabled.
    pub fn streaming(&self) -> bool {
        self.0.lock().unwrap().streaming
    }

    /// Enables or disables streaming.
    pub fn set_streaming(&self, streaming: bool) {
        self.0.lock().unwrap().streaming = streaming;
    }

    /// Toggles streaming, returning the new state.
    pub fn toggle_streaming(&self) -> bool {
        let mut conf = self.0.lock().unwrap();
        conf.streaming = !conf.streaming;
        conf.streaming
    }

    /// Returns the frequency of an oscillator in Hz.
    pub fn frequency(&self, oscillator: Oscillator) -> f64 {
        let conf = self.0.lock().unwrap();
        match oscillator {
            Oscillator::Adc => conf.adc_frequency,
            Oscillator::Tuner => conf.tuner_frequency,
        }
    }

    /// Records the frequency of an oscillator in Hz.
    ///
    /// This only updates the configuration; it does not touch the hardware.
    pub fn set_frequency(&self, oscillator: Oscillator, frequency: f64) {
        let mut conf = self.0.lock().unwrap();
        match oscillator {
            Oscillator::Adc => conf.adc_frequency = frequency,
            Oscillator::Tuner => conf.tuner_frequency = frequency,
        }
    }
}
