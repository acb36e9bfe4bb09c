//! Peripheral access crate for the radio tuner and sample FIFO.
//!
//! The FPGA design exposes two AXI-Lite peripherals, each formed by a few
//! consecutive 32-bit registers. This crate describes their layout. The
//! register blocks are meant to be overlaid on a memory-mapped IO region; all
//! accesses go through [`VolatileCell`], so they are never cached or
//! reordered by the compiler.

#![no_std]
#![warn(missing_docs)]

pub use vcell::VolatileCell;

/// Block of `N` consecutive 32-bit registers.
#[repr(C)]
pub struct RegisterBlock<const N: usize> {
    registers: [VolatileCell<u32>; N],
}

impl<const N: usize> RegisterBlock<N> {
    /// Number of registers in the block.
    pub const LEN: usize = N;

    /// Size of the block in bytes.
    pub const SIZE: usize = N * core::mem::size_of::<u32>();

    /// Returns the register at `index`.
    ///
    /// Returns `None` if `index` lies outside the block.
    pub fn register(&self, index: usize) -> Option<&VolatileCell<u32>> {
        self.registers.get(index)
    }
}

impl<const N: usize> core::fmt::Debug for RegisterBlock<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterBlock").field("len", &N).finish()
    }
}

/// Radio tuner peripheral.
///
/// Contains the phase increment registers of the two DDS oscillators (the
/// fake ADC and the tuner), the control register and a free-running counter
/// clocked at the fabric clock.
pub mod radio_tuner {
    /// Fake ADC DDS phase increment (write only).
    pub const ADC_PINC: usize = 0;
    /// Tuner DDS phase increment (write only).
    pub const TUNER_PINC: usize = 1;
    /// Control register.
    pub const CONTROL: usize = 2;
    /// Free-running cycle counter (read only).
    pub const TIMER: usize = 3;

    /// Number of registers in the peripheral.
    pub const NUM_REGISTERS: usize = 4;

    /// Control register value that holds the DDS oscillators in reset.
    pub const CONTROL_RESET: u32 = 1;
    /// Control register value that releases the reset.
    pub const CONTROL_RUN: u32 = 0;

    /// Radio tuner register block.
    pub type RegisterBlock = super::RegisterBlock<NUM_REGISTERS>;
}

/// Sample FIFO peripheral.
///
/// Each read of the data register pops one 32-bit sample word from the FIFO.
pub mod simple_fifo {
    /// Data register. Reading pops one word.
    pub const DATA: usize = 0;
    /// Number of words currently held in the FIFO.
    pub const COUNT: usize = 1;

    /// Number of registers in the peripheral.
    pub const NUM_REGISTERS: usize = 2;

    /// Sample FIFO register block.
    pub type RegisterBlock = super::RegisterBlock<NUM_REGISTERS>;
}
