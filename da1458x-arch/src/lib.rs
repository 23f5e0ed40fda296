#![cfg_attr(not(test), no_std)]
#![doc = "Architecture layer for Renesas/Dialog DA1458x BLE SoCs."]
#![doc = ""]
#![doc = "Sleep-mode policy, ROM setup and patching, RAM retention, hibernation and"]
#![doc = "deep sleep, and the main loop that ties the BLE stack and the application"]
#![doc = "to them."]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod calibration;
pub mod config;
pub mod error;
pub mod hibernation;
pub mod retention;
pub mod rom;
pub mod scheduler;
pub mod sleep;
pub mod stack;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{Action, AppCallbacks, NoCallbacks};
pub use calibration::CalibrationConfig;
pub use config::{ArchConfig, RetentionPolicy, RngPolicy, RomCfg, RomHooks};
pub use error::{LayoutError, PatchError, PowerModeError, RomError};
pub use hibernation::{
    DeepSleepConfig, HibernationConfig, StatefulHibernationConfig, SuspendKind, Suspended,
};
pub use scheduler::Arch;
pub use sleep::{ActiveGuard, PowerManager, SleepMode, SleepPolicy, SleepState};
pub use stack::{BleEvent, BleStack, NoRadio};
