//! Which RAM blocks to keep powered for a given sleep mode.

use da1458x_hal::ram::{MemoryLayout, RamSlice};
use da1458x_hal::RetentionMask;

use crate::config::RetentionPolicy;
use crate::sleep::SleepMode;

/// Blocks to retain before looking at the heap.
///
/// The mandatory blocks (ROM data, exchange memory, patch and ROM tables) are
/// always present. The program image blocks and the configured ones are
/// present too, except OTP-mirrored blocks in OTP-copy sleep.
pub fn required_blocks(
    layout: &MemoryLayout,
    policy: &RetentionPolicy,
    mode: SleepMode,
) -> RetentionMask {
    let mandatory = layout.mandatory_blocks();
    let mut optional = layout.image_blocks() | (policy.retained & layout.all_blocks());
    if mode == SleepMode::ExtSleepOtpCopy {
        optional = optional & !policy.otp_mirrored;
    }
    mandatory | optional
}

/// Retention mask for `mode`, with every block backing a non-empty
/// non-retained heap added.
pub fn compute(
    layout: &MemoryLayout,
    policy: &RetentionPolicy,
    mode: SleepMode,
    heap: Option<RamSlice>,
) -> RetentionMask {
    let mut mask = required_blocks(layout, policy, mode);
    if let Some(heap) = heap.filter(|h| !h.is_empty()) {
        mask |= layout.blocks_covering(heap.addr(), heap.len());
    }
    mask
}
