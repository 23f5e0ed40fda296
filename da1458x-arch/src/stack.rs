//! Interface to the BLE protocol stack.

use da1458x_hal::ram::RamSlice;

use crate::sleep::SleepMode;

/// Last event reported by the link-layer scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleEvent {
    None,
    /// A connection or advertising event just ended.
    EventEnd,
    Other,
}

/// What the main loop needs from the BLE stack.
pub trait BleStack {
    /// `false` for builds without a radio.
    const PRESENT: bool = true;

    /// The BLE core is clocked and may have work pending.
    fn radio_powered(&self) -> bool;

    /// Run the stack's kernel scheduler once.
    fn schedule(&mut self);

    /// Ask the stack how deep it can sleep. Programs the BLE wakeup timer when
    /// the answer is an extended mode.
    fn power_down(&mut self, sleep_enabled: bool, ext_wakeup_only: bool) -> SleepMode;

    fn last_event(&self) -> BleEvent;

    /// Heap area that is not retained by default. `None` or empty when unused.
    fn non_retained_heap(&self) -> Option<RamSlice>;

    /// BLE base time, in half-slots (27 bits).
    fn time_halfslots(&self) -> u32;

    /// Half-slots until the next scheduled radio activity.
    fn idle_halfslots(&self) -> u32;

    fn calibrate_radio(&mut self);

    /// Re-initialise the radio after its power domain was off.
    fn reinit_radio(&mut self);

    /// Resume the link-layer driver after stateful hibernation.
    fn resume_lld(&mut self);
}

/// Stack for builds without BLE.
///
/// Never powered; sleeps as deep as the policy allows.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRadio;

impl BleStack for NoRadio {
    const PRESENT: bool = false;

    fn radio_powered(&self) -> bool {
        false
    }

    fn schedule(&mut self) {}

    fn power_down(&mut self, sleep_enabled: bool, _ext_wakeup_only: bool) -> SleepMode {
        if sleep_enabled {
            SleepMode::ExtSleep
        } else {
            SleepMode::Idle
        }
    }

    fn last_event(&self) -> BleEvent {
        BleEvent::None
    }

    fn non_retained_heap(&self) -> Option<RamSlice> {
        None
    }

    fn time_halfslots(&self) -> u32 {
        0
    }

    fn idle_halfslots(&self) -> u32 {
        u32::MAX
    }

    fn calibrate_radio(&mut self) {}

    fn reinit_radio(&mut self) {}

    fn resume_lld(&mut self) {}
}
