//! ROM patch hardware.
//!
//! Each patch slot pairs a match register (`PATCH_ADDRn`) holding the ROM
//! address to intercept with an entry of the patch value table in retained
//! RAM. A table entry is two words: the replacement, then a reserved zero word
//! kept for the stride the fetch unit expects. `PATCH_VALID` enables the
//! programmed slots.
//!
//! # Example
//! ```ignore
//! use da1458x_hal::patch::{self, PatchEntry};
//!
//! static PATCHES: [PatchEntry; 1] = [PatchEntry::function(0x0000_3A10, 0x07FC_1235)];
//! patch::install(&mut hw, layout, &PATCHES)?;
//! ```

use crate::ram::{Memory, MemoryLayout, RamSlice};
use crate::regs::{Reg, Registers, PATCH_ADDR_REGS};

/// Bytes per patch value table entry.
pub const ENTRY_STRIDE: usize = 8;

/// Address bits compared by a match register (bits 18:2).
const PATCH_ADDR_MASK: u32 = 0x0007_FFFC;

/// What a patch slot substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatchKind {
    /// Redirect a ROM function; the replacement is a code address.
    Function,
    /// Override a literal-pool word read by ROM code.
    Data,
}

/// One patch slot: ROM address and its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatchEntry {
    pub kind: PatchKind,
    pub original: u32,
    pub replacement: u32,
}

impl PatchEntry {
    pub const fn function(original: u32, replacement: u32) -> Self {
        Self {
            kind: PatchKind::Function,
            original,
            replacement,
        }
    }

    pub const fn data(original: u32, value: u32) -> Self {
        Self {
            kind: PatchKind::Data,
            original,
            replacement: value,
        }
    }

    /// Value written to the patch value table.
    ///
    /// Function replacements always execute in Thumb state.
    pub const fn table_value(&self) -> u32 {
        match self.kind {
            PatchKind::Function => self.replacement | 1,
            PatchKind::Data => self.replacement,
        }
    }

    /// Value written to the match register.
    pub const fn match_value(&self) -> u32 {
        self.original & PATCH_ADDR_MASK
    }
}

/// Patch installation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// More entries than the family has slots.
    TooManyEntries {
        /// Number of entries requested.
        count: usize,
        /// Slots available.
        slots: usize,
    },
    /// Original address not aligned to a word.
    UnalignedOriginal {
        /// Offending slot.
        slot: usize,
        /// Its ROM address.
        address: u32,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TooManyEntries { count, slots } => {
                write!(f, "{} patch entries for {} slots", count, slots)
            }
            Error::UnalignedOriginal { slot, address } => {
                write!(f, "patch slot {} address {:#010x} is not word aligned", slot, address)
            }
        }
    }
}

/// Check a patch table against the family's slot count.
pub fn validate(layout: &MemoryLayout, entries: &[PatchEntry]) -> Result<(), Error> {
    let slots = layout.patch_slots.min(PATCH_ADDR_REGS);
    if entries.len() > slots {
        return Err(Error::TooManyEntries {
            count: entries.len(),
            slots,
        });
    }
    if let Some((slot, entry)) = entries
        .iter()
        .enumerate()
        .find(|(_, e)| e.original & 0x3 != 0)
    {
        return Err(Error::UnalignedOriginal {
            slot,
            address: entry.original,
        });
    }
    Ok(())
}

/// Patch value table of a layout.
pub const fn value_table(layout: &MemoryLayout) -> RamSlice {
    RamSlice::new(layout.patch_table_base, layout.patch_slots * ENTRY_STRIDE)
}

/// Program every patch slot.
///
/// Slots past the end of `entries` are cleared, so installing the same table
/// again leaves registers and RAM unchanged.
pub fn install<H>(hw: &mut H, layout: &MemoryLayout, entries: &[PatchEntry]) -> Result<(), Error>
where
    H: Registers + Memory,
{
    validate(layout, entries)?;

    // Matching stays off while slots are rewritten.
    hw.write(Reg::PatchValid, 0);

    let table = value_table(layout);
    for slot in 0..layout.patch_slots {
        let (addr, value) = match entries.get(slot) {
            Some(entry) => (entry.match_value(), entry.table_value()),
            None => (0, 0),
        };
        hw.write(Reg::PatchAddr(slot as u8), addr);
        table.write_words(hw, slot * ENTRY_STRIDE, &[value, 0]);
    }

    let valid = if entries.is_empty() {
        0
    } else {
        u32::MAX >> (32 - entries.len())
    };
    hw.write(Reg::PatchValid, valid);

    debug!("ROM patches installed: {} of {} slots", entries.len(), layout.patch_slots);
    Ok(())
}
