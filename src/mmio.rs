//! Register access.
//!
//! This module defines the [`RegisterAccess`] trait, which is how the rest of
//! the crate reads and writes peripheral registers, and [`Window`], its
//! implementation over a memory-mapped register block.

use crate::uio::{Mapping, Uio};
use anyhow::{Context, Result};

/// Index-based access to a block of 32-bit registers.
///
/// Register indices count 32-bit words from the base of the block. Accesses
/// are volatile: every call results in exactly one bus transaction, in
/// program order.
pub trait RegisterAccess {
    /// Reads the register at `index`.
    fn read(&self, index: usize) -> u32;

    /// Writes `value` to the register at `index`.
    fn write(&self, index: usize, value: u32);
}

/// Location of a register window.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum WindowLocation {
    /// First mapping of the UIO device with this name.
    Uio(String),
    /// Physical address, mapped through `/dev/mem`.
    Physical(usize),
}

impl std::fmt::Display for WindowLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowLocation::Uio(name) => write!(f, "UIO {name}"),
            WindowLocation::Physical(addr) => write!(f, "{addr:#010x}"),
        }
    }
}

/// Memory-mapped window of `N` registers.
///
/// Accesses outside of the `N` registers are rejected with a panic, so a
/// window can never touch memory beyond the peripheral it maps.
#[derive(Debug)]
pub struct Window<const N: usize>(Mapping);

// The mapping is only accessed through volatile register reads and writes.
unsafe impl<const N: usize> Send for Window<N> {}

impl<const N: usize> Window<N> {
    /// Creates a window over a mapping.
    ///
    /// Fails if the mapping is smaller than `N` registers.
    pub fn new(mapping: Mapping) -> Result<Window<N>> {
        if mapping.len() < radio_pac::RegisterBlock::<N>::SIZE {
            anyhow::bail!(
                "mapping of {} bytes cannot hold {} registers",
                mapping.len(),
                N
            );
        }
        Ok(Window(mapping))
    }

    /// Maps the window at the given location.
    pub async fn open(location: &WindowLocation) -> Result<Window<N>> {
        let mapping = match location {
            WindowLocation::Uio(name) => {
                let uio = Uio::from_name(name)
                    .await
                    .with_context(|| format!("failed to open {name} UIO"))?;
                uio.map_mapping(0)
                    .await
                    .with_context(|| format!("failed to map {name} UIO"))?
            }
            WindowLocation::Physical(addr) => {
                Mapping::from_phys_addr(*addr, radio_pac::RegisterBlock::<N>::SIZE).await?
            }
        };
        Window::new(mapping)
    }

    /// Gives the physical address of the first register.
    pub fn phys_addr(&self) -> usize {
        self.0.phys_addr()
    }

    fn block(&self) -> &radio_pac::RegisterBlock<N> {
        unsafe { &*(self.0.addr() as *const radio_pac::RegisterBlock<N>) }
    }

    fn register(&self, index: usize) -> &radio_pac::VolatileCell<u32> {
        match self.block().register(index) {
            Some(register) => register,
            None => panic!("register index {index} out of range for a window of {N} registers"),
        }
    }
}

impl<const N: usize> RegisterAccess for Window<N> {
    fn read(&self, index: usize) -> u32 {
        self.register(index).get()
    }

    fn write(&self, index: usize, value: u32) {
        self.register(index).set(value)
    }
}
