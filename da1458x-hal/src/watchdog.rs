//! Watchdog timer control.
//!
//! The counter is frozen through `SET_FREEZE_REG` and released through
//! `RESET_FREEZE_REG`; writing `WATCHDOG_REG` reloads it.

use crate::regs::{freeze, Reg, Registers};

/// Reload value after reset (about 2.6 s at 100 Hz).
pub const DEFAULT_PERIOD: u32 = 0xFF;

/// Stop the watchdog counter.
pub fn freeze(bus: &mut impl Registers) {
    bus.write(Reg::SetFreeze, freeze::WDOG);
}

/// Let the watchdog counter run again.
pub fn resume(bus: &mut impl Registers) {
    bus.write(Reg::ResetFreeze, freeze::WDOG);
}

/// Reload the counter with `period` ticks.
pub fn reload(bus: &mut impl Registers, period: u32) {
    bus.write(Reg::Watchdog, period & 0xFF);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipVariant;
    use crate::mock::MockChip;

    #[test]
    fn freeze_and_resume_toggle_the_counter() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        assert!(!chip.watchdog_frozen());
        freeze(&mut chip);
        assert!(chip.watchdog_frozen());
        resume(&mut chip);
        assert!(!chip.watchdog_frozen());
    }

    #[test]
    fn reload_keeps_eight_bits() {
        let mut chip = MockChip::new(ChipVariant::Da14585);
        reload(&mut chip, 0x1C8);
        assert_eq!(chip.read(Reg::Watchdog), 0xC8);
    }
}
