//! Poll pacing for the CM4 core

use twine_core::WaitStrategy;

/// Stall a fixed number of core cycles between polls
///
/// Stretches every timeout budget by `cycles` per iteration, so budgets
/// can be sized against the bus clock instead of the poll loop speed.
#[derive(Debug, Clone, Copy)]
pub struct CycleWait {
    cycles: u32,
}

impl CycleWait {
    pub const fn new(cycles: u32) -> Self {
        Self { cycles }
    }
}

impl WaitStrategy for CycleWait {
    #[inline]
    fn relax(&mut self) {
        cortex_m::asm::delay(self.cycles);
    }
}
