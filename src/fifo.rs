//! Sample FIFO.
//!
//! Userspace driver for the sample FIFO peripheral, which buffers the IQ
//! samples produced by the FPGA until software reads them.

use crate::mmio::RegisterAccess;
use radio_pac::simple_fifo;

/// Sample FIFO peripheral.
///
/// This owns the register window of the FIFO. It is not cloneable, so the
/// owner of the `SampleFifo` is the only reader that can pop words.
#[derive(Debug)]
pub struct SampleFifo<R> {
    registers: R,
}

impl<R: RegisterAccess> SampleFifo<R> {
    /// Creates a sample FIFO from its register window.
    pub fn new(registers: R) -> SampleFifo<R> {
        SampleFifo { registers }
    }

    /// Returns the number of words currently held in the FIFO.
    pub fn occupancy(&self) -> usize {
        self.registers.read(simple_fifo::COUNT) as usize
    }

    /// Pops one word from the FIFO.
    ///
    /// The caller must have checked with [`SampleFifo::occupancy`] that the
    /// FIFO is not empty.
    pub fn pop(&mut self) -> u32 {
        self.registers.read(simple_fifo::DATA)
    }
}
