//! radio-streamer drives a software-defined radio implemented in a Zynq FPGA
//! and streams its IQ samples over the network. It controls the frequencies
//! of the two DDS oscillators of the radio (a fake ADC and a tuner) from an
//! operator console, and continuously drains the sample FIFO of the FPGA,
//! sending each burst of 256 samples as a numbered UDP datagram.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod config;
pub mod console;
pub mod control;
pub mod fifo;
pub mod frame;
pub mod mmio;
pub mod sink;
pub mod streamer;
pub mod tune;
pub mod tuner;
pub mod uio;
