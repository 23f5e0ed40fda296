//! Chip-wide RAM accessors, retention control and memory map constants.
//!
//! - [`RamSlice`]: bounds-checked accessor over a [`Memory`] backend
//! - [`retention`]: which RAM blocks keep power during sleep
//! - [`memory_map`]: layout constants generated from `memory_layout.toml`
pub mod memory_map;
pub mod ram_slice;
pub mod retention;

pub use memory_map::{MemoryLayout, RamRegion};
pub use ram_slice::{Memory, RamSlice, SystemRam};
pub use retention::RetentionMask;
