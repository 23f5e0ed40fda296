//! Error types of the architecture layer.
//!
//! Every error here is fatal at its entry point; the typed values exist so the
//! checks can run ahead of time (at start-up, or in host tests).

use core::fmt;

use da1458x_hal::sysctrl::Remap;
use da1458x_hal::{Family, RetentionMask};

pub use da1458x_hal::patch::Error as PatchError;

/// Exchange-memory area checked by the layout self-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmArea {
    ControlStructures,
    TxDescriptors,
    RxDescriptors,
    TxBuffers,
    RxBuffers,
    End,
}

/// The linked exchange-memory layout disagrees with what the ROM computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum LayoutError {
    /// An area starts at a different offset than the ROM expects.
    Mismatch {
        area: EmArea,
        /// Offset computed from the buffer geometry.
        expected: usize,
        /// Offset in the linked image.
        linked: usize,
    },
    /// The areas do not fit the reserved exchange memory.
    Overflow { end: usize, size: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch {
                area,
                expected,
                linked,
            } => write!(
                f,
                "EM {:?} linked at {:#x}, ROM expects {:#x}",
                area, linked, expected
            ),
            Self::Overflow { end, size } => {
                write!(f, "EM ends at {:#x}, only {:#x} reserved", end, size)
            }
        }
    }
}

/// ROM setup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum RomError {
    Layout(LayoutError),
    Patch(PatchError),
    /// Function, configuration and handler tables exceed their RAM area.
    TablesOverflow { needed: usize, available: usize },
}

impl From<LayoutError> for RomError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<PatchError> for RomError {
    fn from(err: PatchError) -> Self {
        Self::Patch(err)
    }
}

impl fmt::Display for RomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "exchange memory: {}", err),
            Self::Patch(err) => write!(f, "patch table: {}", err),
            Self::TablesOverflow { needed, available } => write!(
                f,
                "ROM tables need {} bytes, {} available",
                needed, available
            ),
        }
    }
}

/// Invalid low-power mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum PowerModeError {
    /// The mode does not exist on this chip family.
    WrongFamily { required: Family },
    /// Wake pins outside P0_1..P0_5.
    WakePinsOutOfRange(u8),
    /// Address 0 would be remapped to a block that loses power.
    RemapNotRetained(Remap),
    /// Stateful hibernation must resume from RAM.
    RemapNotRam(Remap),
    /// Blocks holding ROM data, exchange memory, the program image or
    /// configured retained content would lose power.
    MandatoryNotRetained { missing: RetentionMask },
}

impl fmt::Display for PowerModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongFamily { required } => write!(f, "mode needs a {:?} family chip", required),
            Self::WakePinsOutOfRange(pins) => {
                write!(f, "wake pin mask {:#04x} outside P0_1..P0_5", pins)
            }
            Self::RemapNotRetained(remap) => write!(f, "remap target {:?} is not retained", remap),
            Self::RemapNotRam(remap) => write!(f, "remap target {:?} is not RAM", remap),
            Self::MandatoryNotRetained { missing } => {
                write!(f, "required blocks {:?} not retained", missing)
            }
        }
    }
}
