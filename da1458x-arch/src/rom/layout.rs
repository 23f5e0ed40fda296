//! Exchange-memory self-check.
//!
//! The ROM link-layer driver locates the exchange-memory areas by computing
//! their offsets from the buffer geometry. The image places them at link time.
//! Both must agree, or the radio reads descriptors from the wrong place.

use da1458x_hal::ram::memory_map::{EmGeometry, EmOffsets};
use da1458x_hal::ram::MemoryLayout;

use crate::error::{EmArea, LayoutError};

/// Exchange table at the start of EM.
const ET_SIZE: usize = 0x40;
/// One control structure per connection, plus one for advertising/scanning.
const CS_SIZE: usize = 0x60;
const TX_DESC_SIZE: usize = 0xC;
const RX_DESC_SIZE: usize = 0x10;

/// Offsets the ROM derives from `geometry`.
pub const fn rom_offsets(geometry: &EmGeometry) -> EmOffsets {
    let cs = ET_SIZE;
    let tx_desc = cs + (geometry.connections + 1) * CS_SIZE;
    let rx_desc = tx_desc + geometry.tx_buffers * TX_DESC_SIZE;
    let tx_buf = rx_desc + geometry.rx_buffers * RX_DESC_SIZE;
    let rx_buf = tx_buf + geometry.tx_buffers * geometry.tx_buf_size;
    let end = rx_buf + geometry.rx_buffers * geometry.rx_buf_size;
    EmOffsets {
        cs,
        tx_desc,
        rx_desc,
        tx_buf,
        rx_buf,
        end,
    }
}

/// Compare linked offsets with the ROM's and check the reserved size.
pub fn check(geometry: &EmGeometry, linked: &EmOffsets, em_size: usize) -> Result<(), LayoutError> {
    let expected = rom_offsets(geometry);
    let areas = [
        (EmArea::ControlStructures, expected.cs, linked.cs),
        (EmArea::TxDescriptors, expected.tx_desc, linked.tx_desc),
        (EmArea::RxDescriptors, expected.rx_desc, linked.rx_desc),
        (EmArea::TxBuffers, expected.tx_buf, linked.tx_buf),
        (EmArea::RxBuffers, expected.rx_buf, linked.rx_buf),
        (EmArea::End, expected.end, linked.end),
    ];
    for (area, expected, linked) in areas {
        if expected != linked {
            return Err(LayoutError::Mismatch {
                area,
                expected,
                linked,
            });
        }
    }
    if linked.end > em_size {
        return Err(LayoutError::Overflow {
            end: linked.end,
            size: em_size,
        });
    }
    Ok(())
}

/// [`check`] for a family layout.
pub fn check_layout(layout: &MemoryLayout) -> Result<(), LayoutError> {
    check(&layout.em_geometry, &layout.em_linked, layout.em_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use da1458x_hal::ChipVariant;

    #[test]
    fn shipped_layouts_match_the_rom() {
        for variant in [ChipVariant::Da14531, ChipVariant::Da14585] {
            assert_eq!(check_layout(variant.layout()), Ok(()));
        }
    }

    #[test]
    fn extra_connection_shifts_every_area() {
        let layout = ChipVariant::Da14531.layout();
        let mut geometry = layout.em_geometry;
        geometry.connections += 1;
        assert_eq!(
            check(&geometry, &layout.em_linked, layout.em_size),
            Err(LayoutError::Mismatch {
                area: EmArea::TxDescriptors,
                expected: layout.em_linked.tx_desc + CS_SIZE,
                linked: layout.em_linked.tx_desc,
            })
        );
    }

    #[test]
    fn oversized_buffers_overflow_the_region() {
        let layout = ChipVariant::Da14585.layout();
        let mut geometry = layout.em_geometry;
        geometry.rx_buffers += 4;
        let linked = rom_offsets(&geometry);
        assert_eq!(
            check(&geometry, &linked, layout.em_size),
            Err(LayoutError::Overflow {
                end: linked.end,
                size: layout.em_size,
            })
        );
    }
}
