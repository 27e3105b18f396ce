//! Register mapper
//!
//! Maps the GPIO block from `/dev/mem` into the process. The device is
//! opened with `O_RDWR | O_SYNC` so stores are not cached, and the block is
//! mapped `MAP_SHARED` so writes reach the peripheral immediately and are
//! visible to every other mapper of the same range. The device file is
//! closed as soon as the mapping exists; the mapping does not depend on it.

use crate::config::MapConfig;
use crate::error::{GpioError, Result};
use crate::registers::{RegisterBlock, WordOffset};
use log::{debug, trace, warn};
use std::fs::OpenOptions;
use std::io;
use std::mem::ManuallyDrop;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::{self, NonNull};

/// An owned mapping of the GPIO register block.
///
/// Valid from a successful [`open_mapping`] until [`close_mapping`] (or
/// drop). Register accesses are volatile; no memory barrier is issued.
///
/// `Mapping` is `Send` but not `Sync`. Function-select updates are
/// read-modify-write, so two threads (or processes) changing pins that share
/// a GPFSEL word can lose updates. Callers that share a mapping need their
/// own lock around it.
#[derive(Debug)]
pub struct Mapping {
    base: NonNull<u32>,
    len: usize,
    phys: u64,
}

// The mapping is plain process memory; moving the owner between threads is fine.
unsafe impl Send for Mapping {}

impl Mapping {
    /// Mapped length in bytes
    pub fn block_len(&self) -> usize {
        self.len
    }

    /// Physical address the mapping starts at
    pub fn physical_base(&self) -> u64 {
        self.phys
    }

    fn word_ptr(&self, offset: WordOffset) -> *mut u32 {
        assert!(
            offset.byte_offset() + 4 <= self.len,
            "{} outside {}-byte GPIO mapping",
            offset,
            self.len
        );
        // SAFETY: bounds checked above; base is a live mapping of `len` bytes.
        unsafe { self.base.as_ptr().add(offset.index()) }
    }

    fn unmap(&mut self) -> io::Result<()> {
        // SAFETY: base/len describe exactly the region returned by mmap.
        let rc = unsafe { libc::munmap(self.base.as_ptr().cast(), self.len) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl RegisterBlock for Mapping {
    fn read(&self, offset: WordOffset) -> u32 {
        // SAFETY: word_ptr points into the live mapping and is 4-byte aligned.
        unsafe { ptr::read_volatile(self.word_ptr(offset)) }
    }

    fn write(&mut self, offset: WordOffset, value: u32) {
        trace!("gpio write {} = {:#010X}", offset, value);
        // SAFETY: as in read.
        unsafe { ptr::write_volatile(self.word_ptr(offset), value) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        warn!(
            "GPIO mapping at {:#X} dropped without close_mapping, unmapping",
            self.phys
        );
        if let Err(e) = self.unmap() {
            warn!("munmap failed: {}", e);
        }
    }
}

/// Open the physical-memory device and map the GPIO block described by
/// `config`.
///
/// Fails with [`GpioError::DeviceOpenFailed`] when the device cannot be
/// opened (usually not running as root) and with
/// [`GpioError::MappingFailed`] when `mmap` rejects the request.
pub fn open_mapping(config: &MapConfig) -> Result<Mapping> {
    config.validate()?;

    let phys = config.gpio_base();
    let offset = libc::off_t::try_from(phys)
        .map_err(|_| GpioError::InvalidConfig(format!("GPIO base {:#X} out of range", phys)))?;

    let device = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(&config.device_path)
        .map_err(|source| GpioError::DeviceOpenFailed {
            path: config.device_path.clone(),
            source,
        })?;

    debug!(
        "mapping {} bytes at {:#X} from {}",
        config.block_len,
        phys,
        config.device_path.display()
    );

    // SAFETY: fresh mapping chosen by the kernel; fd stays open for the call.
    let map = unsafe {
        libc::mmap(
            ptr::null_mut(),
            config.block_len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            device.as_raw_fd(),
            offset,
        )
    };

    if map == libc::MAP_FAILED {
        let code = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(GpioError::MappingFailed { code });
    }

    drop(device);

    let base = NonNull::new(map.cast::<u32>()).ok_or(GpioError::MappingFailed { code: libc::EFAULT })?;
    debug!("GPIO block mapped at {:p}", base);

    Ok(Mapping {
        base,
        len: config.block_len,
        phys,
    })
}

/// Unmap a block returned by [`open_mapping`].
///
/// Consumes the mapping, so it can only be closed once.
pub fn close_mapping(mapping: Mapping) -> Result<()> {
    let mut mapping = ManuallyDrop::new(mapping);
    debug!("unmapping GPIO block at {:#X}", mapping.phys);
    mapping.unmap().map_err(|e| GpioError::UnmapFailed {
        code: e.raw_os_error().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::regs;
    use std::fs;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn page_file() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        file
    }

    fn file_config(path: &Path) -> MapConfig {
        MapConfig {
            peripheral_base: 0,
            gpio_offset: 0,
            ..MapConfig::with_device(path)
        }
    }

    #[test]
    fn test_open_close_reopen() {
        let file = page_file();
        let config = file_config(file.path());

        let mapping = open_mapping(&config).unwrap();
        assert_eq!(mapping.block_len(), 4096);
        assert_eq!(mapping.physical_base(), 0);
        close_mapping(mapping).unwrap();

        let mapping = open_mapping(&config).unwrap();
        close_mapping(mapping).unwrap();
    }

    #[test]
    fn test_writes_reach_backing_memory() {
        let file = page_file();
        let mut mapping = open_mapping(&file_config(file.path())).unwrap();

        mapping.write(regs::GPSET0, 0xDEAD_BEEF);
        assert_eq!(mapping.read(regs::GPSET0), 0xDEAD_BEEF);
        close_mapping(mapping).unwrap();

        let bytes = fs::read(file.path()).unwrap();
        let at = regs::GPSET0.byte_offset();
        let word = u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        assert_eq!(word, 0xDEAD_BEEF);
    }

    #[test]
    fn test_missing_device() {
        let config = MapConfig::with_device("/nonexistent/mem");
        let err = open_mapping(&config).unwrap_err();
        assert!(matches!(err, GpioError::DeviceOpenFailed { .. }));
    }

    #[test]
    fn test_misaligned_offset_fails_mapping() {
        let file = page_file();
        let config = MapConfig {
            gpio_offset: 0x100,
            ..file_config(file.path())
        };

        match open_mapping(&config) {
            Err(GpioError::MappingFailed { code }) => assert_eq!(code, libc::EINVAL),
            other => panic!("expected MappingFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_open() {
        let config = MapConfig {
            block_len: 16,
            ..MapConfig::with_device("/nonexistent/mem")
        };
        assert!(matches!(open_mapping(&config), Err(GpioError::InvalidConfig(_))));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_read_past_mapping_panics() {
        let file = page_file();
        let mapping = open_mapping(&file_config(file.path())).unwrap();
        mapping.read(WordOffset::new(1024));
    }
}
