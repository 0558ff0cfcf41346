//! Bounded register polling
//!
//! Every wait in the engine is a poll of one register bit with an
//! iteration budget. What happens between polls is a [`WaitStrategy`],
//! so firmware can spin while tests count steps deterministically.

use twine_hal::RegisterAccess;

/// What to do between two polls of a register
pub trait WaitStrategy {
    /// Called after every unsuccessful poll
    fn relax(&mut self);
}

impl<T: WaitStrategy + ?Sized> WaitStrategy for &mut T {
    fn relax(&mut self) {
        (**self).relax()
    }
}

/// Busy-wait with a spin-loop hint
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl WaitStrategy for Spin {
    #[inline]
    fn relax(&mut self) {
        core::hint::spin_loop();
    }
}

/// Counts relaxations without delaying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounter {
    pub steps: u32,
}

impl WaitStrategy for StepCounter {
    fn relax(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }
}

/// Bit state a wait is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Expect {
    /// At least one bit of the mask reads as one
    Set,
    /// Every bit of the mask reads as zero
    Clear,
}

impl Expect {
    #[inline]
    fn matches(self, value: u32, mask: u32) -> bool {
        match self {
            Expect::Set => value & mask != 0,
            Expect::Clear => value & mask == 0,
        }
    }
}

/// Poll `address` until `mask` is in the `expect` state
///
/// Reads the register at most `budget` times and relaxes after every
/// miss. Returns `false` once the budget is spent; a zero budget never
/// reads the register.
pub fn wait_until<R, W>(
    regs: &mut R,
    wait: &mut W,
    address: u32,
    mask: u32,
    expect: Expect,
    budget: u32,
) -> bool
where
    R: RegisterAccess + ?Sized,
    W: WaitStrategy + ?Sized,
{
    for _ in 0..budget {
        if expect.matches(regs.read(address), mask) {
            return true;
        }
        wait.relax();
    }
    false
}
