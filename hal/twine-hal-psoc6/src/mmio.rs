//! Volatile register access

use twine_hal::RegisterAccess;

/// Handle to the memory-mapped peripheral space
///
/// Every access is a single 32-bit volatile load or store at the given
/// address, in program order.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create the handle
    ///
    /// # Safety
    ///
    /// Only addresses of existing, word-aligned PSoC 6 registers may be
    /// passed to the returned handle, and the caller must make sure no
    /// other code drives the same peripherals at the same time.
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read(&mut self, address: u32) -> u32 {
        // SAFETY: valid register addresses are a precondition of `steal`
        unsafe { core::ptr::read_volatile(address as usize as *const u32) }
    }

    #[inline]
    fn write(&mut self, address: u32, value: u32) {
        // SAFETY: valid register addresses are a precondition of `steal`
        unsafe { core::ptr::write_volatile(address as usize as *mut u32, value) }
    }
}
