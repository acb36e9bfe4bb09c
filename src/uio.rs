//! Memory-mapped IO regions.
//!
//! This module maps the register windows of the FPGA peripherals into the
//! address space of the process. A window can be obtained either from an UIO
//! device, or directly from `/dev/mem` given its physical address.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tokio::fs;

/// UIO device.
///
/// This struct represents an UIO device.
#[derive(Debug)]
pub struct Uio {
    num: usize,
    file: fs::File,
}

/// Memory-mapped IO region.
///
/// This struct corresponds to a memory-mapped IO region and gives access to
/// it. Dropping this struct unmaps the region.
#[derive(Debug)]
pub struct Mapping {
    base: *mut libc::c_void,
    effective: *mut libc::c_void,
    map_size: usize,
    len: usize,
    phys_addr: usize,
}

impl Uio {
    /// Opens an UIO using its number.
    ///
    /// This function opens the UIO device `/dev/uio<num>`, where `num` is the
    /// parameter indicating the UIO device number.
    pub async fn from_num(num: usize) -> Result<Uio> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(format!("/dev/uio{num}"))
            .await?;
        Ok(Uio { num, file })
    }

    /// Opens an UIO using its name.
    ///
    /// This function searches in `/sys/class/uio` an UIO device whose name
    /// matches the indicated one and opens it.
    pub async fn from_name(name: &str) -> Result<Uio> {
        match Self::find_by_name(name).await? {
            Some(num) => Self::from_num(num).await,
            None => anyhow::bail!("UIO device {name} not found"),
        }
    }

    async fn find_by_name(name: &str) -> Result<Option<usize>> {
        let mut entries = fs::read_dir(Path::new("/sys/class/uio")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let uio = file_name
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("file name is not valid UTF8"))?;
            if let Some(num) = uio
                .strip_prefix("uio")
                .and_then(|a| a.parse::<usize>().ok())
            {
                let mut path = entry.path();
                path.push("name");
                let this_name = fs::read_to_string(path).await?;
                if this_name.trim_end() == name {
                    return Ok(Some(num));
                }
            }
        }
        Ok(None)
    }

    /// Maps a memory mapping of an UIO device.
    ///
    /// The `mapping` number is the number that corresponds to the mapping, as
    /// listed in `/sys/class/uio/uio*/maps/map<mapping>`. Devices that only
    /// support one mapping use `0` as the value for `mapping`.
    pub async fn map_mapping(&self, mapping: usize) -> Result<Mapping> {
        let offset = mapping * page_size::get();
        let fd = self.file.as_raw_fd();
        let map_size = self.map_size(mapping).await?;
        let phys_addr = self.map_addr(mapping).await?;

        let base = unsafe {
            match libc::mmap(
                std::ptr::null_mut::<libc::c_void>(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            ) {
                libc::MAP_FAILED => anyhow::bail!("mmap UIO failed"),
                x => x,
            }
        };
        let effective_offset = self.map_offset(mapping).await?;
        let effective = unsafe { base.add(effective_offset) };
        Ok(Mapping {
            base,
            effective,
            map_size,
            len: map_size.saturating_sub(effective_offset),
            phys_addr,
        })
    }

    async fn read_mapping_hex(&self, mapping: usize, fname: &str) -> Result<usize> {
        let n = fs::read_to_string(format!(
            "/sys/class/uio/uio{}/maps/map{}/{}",
            self.num, mapping, fname
        ))
        .await?;
        Ok(usize::from_str_radix(
            n.strip_prefix("0x")
                .ok_or_else(|| anyhow::anyhow!("prefix 0x not present"))?
                .trim_end(),
            16,
        )?)
    }

    /// Gives the size of a UIO mapping.
    pub async fn map_size(&self, mapping: usize) -> Result<usize> {
        self.read_mapping_hex(mapping, "size").await
    }

    /// Gives the offset of a UIO mapping.
    pub async fn map_offset(&self, mapping: usize) -> Result<usize> {
        self.read_mapping_hex(mapping, "offset").await
    }

    /// Gives the physical address of a UIO mapping.
    pub async fn map_addr(&self, mapping: usize) -> Result<usize> {
        self.read_mapping_hex(mapping, "addr").await
    }
}

impl Mapping {
    /// Maps a physical address range through `/dev/mem`.
    ///
    /// The device is opened with `O_SYNC`, so that the mapping is not cached.
    /// `phys_addr` does not need to be page aligned. The mapping covers at
    /// least `len` bytes starting at `phys_addr`.
    pub async fn from_phys_addr(phys_addr: usize, len: usize) -> Result<Mapping> {
        let page = page_size::get();
        let page_base = phys_addr & !(page - 1);
        let effective_offset = phys_addr - page_base;
        let map_size = (effective_offset + len).div_ceil(page) * page;
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .await
            .context("failed to open /dev/mem")?;
        let base = unsafe {
            match libc::mmap(
                std::ptr::null_mut::<libc::c_void>(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                page_base as libc::off_t,
            ) {
                libc::MAP_FAILED => anyhow::bail!("mmap /dev/mem at {phys_addr:#010x} failed"),
                x => x,
            }
        };
        // the mapping stays valid after the file is closed
        let effective = unsafe { base.add(effective_offset) };
        Ok(Mapping {
            base,
            effective,
            map_size,
            len: map_size - effective_offset,
            phys_addr,
        })
    }

    /// Gives the virtual address of the mapping.
    ///
    /// This function returns a pointer to the beginning of the virtual address
    /// space to which the device IO is mapped.
    pub fn addr(&self) -> *mut libc::c_void {
        self.effective
    }

    /// Gives the number of bytes that can be accessed from [`Mapping::addr`].
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the mapping gives access to no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gives the physical address that corresponds to [`Mapping::addr`].
    pub fn phys_addr(&self) -> usize {
        self.phys_addr
    }
}

/// Unmaps the region.
impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base, self.map_size);
        }
    }
}
