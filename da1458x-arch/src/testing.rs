//! Scripted stack and recording application for host tests.

use da1458x_hal::ram::RamSlice;

use crate::app::{Action, AppCallbacks};
use crate::sleep::SleepMode;
use crate::stack::{BleEvent, BleStack};

/// BLE stack that stays powered for `radio_passes` scheduler passes, then
/// answers `mode` to every sleep request.
#[derive(Debug)]
pub struct FakeStack {
    pub mode: SleepMode,
    pub radio_passes: u32,
    pub last_event: BleEvent,
    pub heap: Option<RamSlice>,
    pub time: u32,
    pub idle: u32,
    pub schedules: u32,
    pub calibrations: u32,
    pub radio_reinits: u32,
    pub lld_resumes: u32,
    pub power_down_args: Vec<(bool, bool)>,
}

impl FakeStack {
    pub fn sleeping(mode: SleepMode) -> Self {
        Self {
            mode,
            radio_passes: 0,
            last_event: BleEvent::None,
            heap: None,
            time: 0,
            idle: 0,
            schedules: 0,
            calibrations: 0,
            radio_reinits: 0,
            lld_resumes: 0,
            power_down_args: Vec::new(),
        }
    }
}

impl BleStack for FakeStack {
    fn radio_powered(&self) -> bool {
        self.radio_passes > 0
    }

    fn schedule(&mut self) {
        self.radio_passes = self.radio_passes.saturating_sub(1);
        self.schedules += 1;
    }

    fn power_down(&mut self, sleep_enabled: bool, ext_wakeup_only: bool) -> SleepMode {
        self.power_down_args.push((sleep_enabled, ext_wakeup_only));
        self.mode
    }

    fn last_event(&self) -> BleEvent {
        self.last_event
    }

    fn non_retained_heap(&self) -> Option<RamSlice> {
        self.heap
    }

    fn time_halfslots(&self) -> u32 {
        self.time
    }

    fn idle_halfslots(&self) -> u32 {
        self.idle
    }

    fn calibrate_radio(&mut self) {
        self.calibrations += 1;
    }

    fn reinit_radio(&mut self) {
        self.radio_reinits += 1;
    }

    fn resume_lld(&mut self) {
        self.lld_resumes += 1;
    }
}

/// Application recording every hook call.
#[derive(Debug, Default)]
pub struct RecordingApp {
    pub calls: Vec<&'static str>,
    /// Modes passed to `validate_sleep`.
    pub validated: Vec<SleepMode>,
    /// Answer of `validate_sleep`, the proposed mode when `None`.
    pub validate_to: Option<SleepMode>,
    /// `on_ble_powered` answers `KeepPowered` this many times.
    pub keep_ble_powered: u32,
}

impl AppCallbacks for RecordingApp {
    fn on_ble_powered(&mut self) -> Action {
        self.calls.push("ble_powered");
        if self.keep_ble_powered > 0 {
            self.keep_ble_powered -= 1;
            Action::KeepPowered
        } else {
            Action::GotoSleep
        }
    }

    fn on_system_powered(&mut self) -> Action {
        self.calls.push("system_powered");
        Action::GotoSleep
    }

    fn before_sleep(&mut self) {
        self.calls.push("before_sleep");
    }

    fn validate_sleep(&mut self, mode: SleepMode) -> SleepMode {
        self.calls.push("validate_sleep");
        self.validated.push(mode);
        self.validate_to.unwrap_or(mode)
    }

    fn going_to_sleep(&mut self, _mode: SleepMode) {
        self.calls.push("going_to_sleep");
    }

    fn resume_from_sleep(&mut self) {
        self.calls.push("resume_from_sleep");
    }

    fn init_peripherals(&mut self) {
        self.calls.push("init_peripherals");
    }
}
