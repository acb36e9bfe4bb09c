//! radio-streamer CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the
//! radio-streamer application.

use crate::mmio::WindowLocation;
use clap::Parser;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default physical address of the radio tuner peripheral.
pub const RADIO_ADDRESS: usize = 0x43c0_0000;

/// Default physical address of the sample FIFO peripheral.
pub const FIFO_ADDRESS: usize = 0x43c1_0000;

/// radio-streamer CLI arguments.
#[derive(Parser, Debug, Clone, Eq, PartialEq, Hash)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Destination IPv4 address for the UDP sample stream
    pub destination: Ipv4Addr,
    /// Physical address of the radio tuner registers
    #[clap(long, value_parser = parse_address, default_value_t = RADIO_ADDRESS)]
    pub radio_address: usize,
    /// Name of the radio tuner UIO device (overrides --radio-address)
    #[clap(long)]
    pub radio_uio: Option<String>,
    /// Physical address of the sample FIFO registers
    #[clap(long, value_parser = parse_address, default_value_t = FIFO_ADDRESS)]
    pub fifo_address: usize,
    /// Name of the sample FIFO UIO device (overrides --fifo-address)
    #[clap(long)]
    pub fifo_uio: Option<String>,
    /// Sleep between FIFO polls in microseconds (0 spins)
    #[clap(long, default_value_t = 0)]
    pub poll_interval_us: u64,
    /// Sleep between cycles while streaming is off, in microseconds
    #[clap(long, default_value_t = 1000)]
    pub idle_interval_us: u64,
}

impl Args {
    /// Location of the radio tuner registers.
    pub fn radio_window(&self) -> WindowLocation {
        Self::location(self.radio_uio.as_ref(), self.radio_address)
    }

    /// Location of the sample FIFO registers.
    pub fn fifo_window(&self) -> WindowLocation {
        Self::location(self.fifo_uio.as_ref(), self.fifo_address)
    }

    /// Sleep between FIFO polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// Sleep between cycles while streaming is off.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_micros(self.idle_interval_us)
    }

    fn location(uio: Option<&String>, address: usize) -> WindowLocation {
        match uio {
            Some(name) => WindowLocation::Uio(name.clone()),
            None => WindowLocation::Physical(address),
        }
    }
}

fn parse_address(s: &str) -> Result<usize, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(&hex.replace('_', ""), 16),
        None => s.parse(),
    }
}
