//! Application hooks called from the main loop.
//!
//! Every method has a default, so an application implements only the hooks it
//! needs. The defaults let the device sleep whenever the stack allows.

use crate::sleep::SleepMode;

/// Answer of the powered hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Run another pass without sleeping.
    KeepPowered,
    /// Proceed towards sleep.
    GotoSleep,
}

pub trait AppCallbacks {
    /// After each BLE scheduler pass while the radio is powered.
    fn on_ble_powered(&mut self) -> Action {
        Action::GotoSleep
    }

    /// Once the radio loop is left, before the sleep decision.
    fn on_system_powered(&mut self) -> Action {
        Action::GotoSleep
    }

    /// With interrupts disabled, before the stack is asked for a sleep mode.
    fn before_sleep(&mut self) {}

    /// May lower an extended mode chosen by the stack.
    fn validate_sleep(&mut self, mode: SleepMode) -> SleepMode {
        mode
    }

    /// Last call before the wait, peripherals already off.
    fn going_to_sleep(&mut self, _mode: SleepMode) {}

    /// First call after extended sleep, peripherals back on.
    fn resume_from_sleep(&mut self) {}

    /// Configure pads and peripherals after power-up or wakeup.
    fn init_peripherals(&mut self) {}
}

/// Application without hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallbacks;

impl AppCallbacks for NoCallbacks {}
