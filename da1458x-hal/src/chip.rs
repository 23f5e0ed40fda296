//! Chip variant identification.
//!
//! The DA1458x parts come in two families that differ in RAM banking,
//! power-control registers and low-power entry procedures:
//!
//! | family     | parts              | RAM blocks | deepest mode          |
//! |------------|--------------------|------------|-----------------------|
//! | low-power  | DA14531, DA14535   | 3          | hibernation           |
//! | full       | DA14585, DA14586   | 4          | deep sleep            |

use crate::ram::memory_map::{self, MemoryLayout};
use crate::regs::{self, Reg, Registers};

/// Chip variant the firmware runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipVariant {
    /// DA14531 / DA14535 (Cortex-M0+, 48 KiB RAM in three blocks).
    Da14531,
    /// DA14585 / DA14586 (Cortex-M0, 96 KiB RAM in four blocks).
    Da14585,
}

/// Power-architecture family of a [`ChipVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Family {
    /// Per-block RAM power control, hibernation, boost/buck DC-DC.
    LowPower,
    /// Retention nibble in `PMU_CTRL`, deep sleep with reset on wakeup.
    Full,
}

impl ChipVariant {
    /// Power-architecture family.
    pub const fn family(self) -> Family {
        match self {
            Self::Da14531 => Family::LowPower,
            Self::Da14585 => Family::Full,
        }
    }

    /// Link-time memory layout of this variant.
    pub const fn layout(self) -> &'static MemoryLayout {
        match self {
            Self::Da14531 => &memory_map::DA14531,
            Self::Da14585 => &memory_map::DA14585,
        }
    }

    /// Number of physical RAM blocks.
    pub const fn ram_blocks(self) -> usize {
        self.layout().ram_blocks.len()
    }

    /// Decode the `CHIP_ID` register value.
    pub const fn from_chip_id(id: u32) -> Option<Self> {
        match id & regs::chip_id::FAMILY_MASK {
            regs::chip_id::DA14531 => Some(Self::Da14531),
            regs::chip_id::DA14585 => Some(Self::Da14585),
            _ => None,
        }
    }
}

/// Identify the chip from its ID register.
pub fn detect(bus: &impl Registers) -> Option<ChipVariant> {
    let id = bus.read(Reg::ChipId);
    let variant = ChipVariant::from_chip_id(id);
    if variant.is_none() {
        warn!("Unknown chip id {:#010x}", id);
    }
    variant
}
