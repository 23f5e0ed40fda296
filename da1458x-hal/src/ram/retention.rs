//! RAM retention: which physical blocks keep power during the next sleep.
//!
//! This is the mechanism only. Deciding *which* blocks to keep belongs to the
//! caller; a wrong mask silently loses heap or code content across sleep.

use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::chip::Family;
use crate::regs::{pmu_ctrl, ram_pwr_ctrl, Reg, Registers};

/// Set of RAM blocks, bit `n` = block `n` (RAM1 is bit 0).
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetentionMask(u8);

impl RetentionMask {
    pub const NONE: Self = Self(0);
    pub const RAM1: Self = Self(1 << 0);
    pub const RAM2: Self = Self(1 << 1);
    pub const RAM3: Self = Self(1 << 2);
    /// Full family only.
    pub const RAM4: Self = Self(1 << 3);

    /// Mask with only block `index` (0-based).
    pub const fn block(index: usize) -> Self {
        Self(1 << index)
    }

    /// The first `count` blocks.
    pub const fn first(count: usize) -> Self {
        Self(((1u16 << count) - 1) as u8)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn contains_block(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the indices of the blocks in the set.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..8).filter(move |i| self.contains_block(*i))
    }
}

impl core::fmt::Debug for RetentionMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RetentionMask({:#06b})", self.0)
    }
}

impl BitOr for RetentionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RetentionMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RetentionMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for RetentionMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Program the retention register for the next sleep.
pub fn set_retention_mode(bus: &mut impl Registers, family: Family, mask: RetentionMask) {
    trace!("RAM retention mask: {:#x}", mask.bits());
    match family {
        Family::LowPower => {
            let mut value = 0;
            for block in 0..3 {
                let state = if mask.contains_block(block) {
                    ram_pwr_ctrl::RETAINED
                } else {
                    ram_pwr_ctrl::OFF
                };
                value |= state << (ram_pwr_ctrl::FIELD_BITS * block as u32);
            }
            bus.write(Reg::RamPwrCtrl, value);
        }
        Family::Full => {
            bus.set_field(Reg::PmuCtrl, pmu_ctrl::RETENTION_MODE, mask.bits() as u32 & 0xF);
        }
    }
}

/// Read back the programmed retention set.
pub fn retention_mode(bus: &impl Registers, family: Family) -> RetentionMask {
    match family {
        Family::LowPower => {
            let value = bus.read(Reg::RamPwrCtrl);
            (0..3)
                .filter(|block| {
                    (value >> (ram_pwr_ctrl::FIELD_BITS * *block as u32)) & ram_pwr_ctrl::FIELD_MASK
                        == ram_pwr_ctrl::RETAINED
                })
                .fold(RetentionMask::NONE, |mask, block| mask | RetentionMask::block(block))
        }
        Family::Full => {
            RetentionMask::from_bits(bus.field(Reg::PmuCtrl, pmu_ctrl::RETENTION_MODE) as u8)
        }
    }
}

/// Return every block to normal operation after wakeup (low-power family).
pub fn set_all_normal(bus: &mut impl Registers, family: Family) {
    if family == Family::LowPower {
        bus.write(Reg::RamPwrCtrl, ram_pwr_ctrl::NORMAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipVariant;
    use crate::mock::MockChip;

    #[test]
    fn low_power_family_uses_two_bit_fields() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        set_retention_mode(&mut chip, Family::LowPower, RetentionMask::RAM1 | RetentionMask::RAM3);
        assert_eq!(chip.read(Reg::RamPwrCtrl), 0b01_10_01);
        assert_eq!(
            retention_mode(&chip, Family::LowPower),
            RetentionMask::RAM1 | RetentionMask::RAM3
        );
    }

    #[test]
    fn full_family_uses_pmu_nibble_and_keeps_other_bits() {
        let mut chip = MockChip::new(ChipVariant::Da14585);
        chip.write(Reg::PmuCtrl, pmu_ctrl::RADIO_SLEEP);
        set_retention_mode(&mut chip, Family::Full, RetentionMask::RAM2 | RetentionMask::RAM4);
        assert_eq!(chip.read(Reg::PmuCtrl), pmu_ctrl::RADIO_SLEEP | (0b1010 << 4));
        assert_eq!(
            retention_mode(&chip, Family::Full),
            RetentionMask::RAM2 | RetentionMask::RAM4
        );
    }

    #[test]
    fn set_algebra() {
        let all = RetentionMask::first(4);
        assert_eq!(all.bits(), 0xF);
        assert!(all.contains(RetentionMask::RAM2 | RetentionMask::RAM4));
        assert!(!RetentionMask::RAM1.contains(RetentionMask::RAM2));
        assert_eq!((all & !RetentionMask::RAM1).iter().collect::<Vec<_>>(), [1, 2, 3]);
    }
}
