#![cfg_attr(not(any(test, feature = "mock")), no_std)]
#![doc = "Hardware access layer for Renesas/Dialog DA1458x BLE SoCs."]
#![doc = ""]
#![doc = "Register file, Cortex-M core control, RAM retention and the ROM patch unit,"]
#![doc = "behind small traits so the power-management code above it also runs on a host."]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod chip;
pub mod cpu;
pub mod patch;
pub mod ram;
pub mod regs;
pub mod sysctrl;
pub mod watchdog;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_arch = "arm")]
mod mmio;
#[cfg(target_arch = "arm")]
pub use mmio::Mmio;

pub use chip::{ChipVariant, Family};
pub use cpu::{Cpu, CpuContext};
pub use ram::{Memory, MemoryLayout, RetentionMask};
pub use regs::{Reg, Registers};

/// Everything the power-management layer drives.
pub trait Hardware: Registers + Cpu + Memory {}

impl<T: Registers + Cpu + Memory> Hardware for T {}
