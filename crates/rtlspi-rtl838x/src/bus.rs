//! Register access for the SPIF block
//!
//! `RegisterBus` is the narrow seam the protocol engine talks through, so
//! the same driver code runs against real memory-mapped hardware or the
//! register simulator in [`crate::sim`]. The SPIF block is 32-bit
//! registers only, so the bus carries a single access width.
//!
//! # Safety
//!
//! Mapping physical memory needs root and a kernel that exposes
//! `/dev/mem`, and is inherently unsafe. The mapping code keeps the
//! window page-aligned and uncached.

/// Raw access to the controller's register window
///
/// Offsets are byte offsets from the controller base. Reads can have
/// hardware side effects (the data register clocks the bus), hence
/// `&mut self` on both directions. The poll delay lives here so fake
/// buses can skip real sleeps.
pub trait RegisterBus {
    /// Read the 32-bit register at `reg`
    fn read(&mut self, reg: usize) -> u32;

    /// Write the 32-bit register at `reg`
    fn write(&mut self, reg: usize, val: u32);

    /// Hold off for roughly `us` microseconds between status polls
    fn delay_us(&mut self, us: u32);
}

/// A register window memory-mapped from physical address space
#[cfg(all(feature = "std", target_os = "linux"))]
pub struct MmioBus {
    /// Pointer to the first register, inside the mapped pages
    ptr: *mut u8,
    /// Size of the mapping, rounded to whole pages
    size: usize,
    /// Physical address of the first register
    phys_addr: u64,
}

#[cfg(all(feature = "std", target_os = "linux"))]
impl MmioBus {
    /// Map `size` bytes of registers at physical address `phys_addr`
    ///
    /// # Safety
    ///
    /// The caller must ensure that the address range really is the
    /// controller's register window and that nothing else is driving it.
    pub fn map(phys_addr: u64, size: usize) -> crate::error::Result<Self> {
        use crate::error::Rtl838xError;
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        // O_SYNC keeps the mapping uncached, which MMIO requires
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(Rtl838xError::DevMemOpen)?;

        // The window rarely starts on a page boundary; map whole pages and
        // keep the offset back to the first register
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (size + offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(Rtl838xError::Map {
                address: phys_addr,
                size,
                source: std::io::Error::last_os_error(),
            });
        }

        let adjusted_ptr = unsafe { (ptr as *mut u8).add(offset) };

        Ok(Self {
            ptr: adjusted_ptr,
            size: map_size,
            phys_addr,
        })
    }

    /// Get the physical address of this mapping
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u32) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u32, value) }
    }
}

#[cfg(all(feature = "std", target_os = "linux"))]
impl RegisterBus for MmioBus {
    fn read(&mut self, reg: usize) -> u32 {
        self.read32(reg)
    }

    fn write(&mut self, reg: usize, val: u32) {
        self.write32(reg, val);
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

#[cfg(all(feature = "std", target_os = "linux"))]
impl Drop for MmioBus {
    fn drop(&mut self) {
        // Recover the page-aligned pointer the mapping started at
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let offset = (self.phys_addr as usize) & (page_size - 1);
        let original_ptr = unsafe { self.ptr.sub(offset) };

        unsafe {
            libc::munmap(original_ptr as *mut libc::c_void, self.size);
        }
    }
}

// Send + Sync are safe because this wraps MMIO registers, which don't
// have the usual memory aliasing concerns
#[cfg(all(feature = "std", target_os = "linux"))]
unsafe impl Send for MmioBus {}
#[cfg(all(feature = "std", target_os = "linux"))]
unsafe impl Sync for MmioBus {}

// Stub for non-Linux platforms
#[cfg(all(feature = "std", not(target_os = "linux")))]
pub struct MmioBus {
    _private: (),
}

#[cfg(all(feature = "std", not(target_os = "linux")))]
impl MmioBus {
    pub fn map(_phys_addr: u64, _size: usize) -> crate::error::Result<Self> {
        Err(crate::error::Rtl838xError::NotSupported(
            "memory-mapped register access is only supported on Linux",
        ))
    }

    pub fn phys_addr(&self) -> u64 {
        0
    }
}

#[cfg(all(feature = "std", not(target_os = "linux")))]
impl RegisterBus for MmioBus {
    fn read(&mut self, _reg: usize) -> u32 {
        0
    }

    fn write(&mut self, _reg: usize, _val: u32) {}

    fn delay_us(&mut self, _us: u32) {}
}
