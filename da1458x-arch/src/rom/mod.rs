//! ROM setup.
//!
//! Prepares the RAM the ROM code relies on, at cold boot and again after
//! stateful hibernation:
//!
//! 1. zero exchange memory and the ROM data region, keeping or seeding the
//!    ROM random generator state
//! 2. copy the HCI tables of the chip family
//! 3. place the function, configuration and message-handler tables and point
//!    the ROM variables at them
//! 4. install the ROM patches
//!
//! The exchange-memory layout and table sizes are checked before anything is
//! written. Running the setup again yields the same RAM and register contents.

pub mod layout;
pub mod tables;

use da1458x_hal::patch::{self, PatchEntry};
use da1458x_hal::ram::{Memory, MemoryLayout, RamSlice};
use da1458x_hal::Registers;

use crate::config::{ArchConfig, RngPolicy, RomHooks};
use crate::error::RomError;

/// Words per message-handler entry.
const HANDLER_WORDS: usize = 2;

/// Bytes taken in the arch table area by `hooks` and the configuration table.
pub const fn tables_size(hooks: &RomHooks, cfg_words: usize) -> usize {
    4 * (hooks.functions.len() + cfg_words + HANDLER_WORDS * (hooks.handlers.len() + 1))
}

/// Run the ROM setup.
///
/// # Panics
///
/// Panics when [`try_init`] fails; the ROM cannot run on a wrong layout.
pub fn init<H: Registers + Memory>(hw: &mut H, layout: &MemoryLayout, config: &ArchConfig) {
    if let Err(err) = try_init(hw, layout, config) {
        panic!("ROM setup failed: {:?}", err);
    }
}

/// Run the ROM setup, reporting layout or table errors instead of panicking.
pub fn try_init<H: Registers + Memory>(
    hw: &mut H,
    layout: &MemoryLayout,
    config: &ArchConfig,
) -> Result<(), RomError> {
    layout::check_layout(layout)?;
    patch::validate(layout, config.patches)?;
    let cfg = config.rom_cfg.words();
    let needed = tables_size(&config.hooks, cfg.len());
    if needed > layout.arch_tables_size {
        return Err(RomError::TablesOverflow {
            needed,
            available: layout.arch_tables_size,
        });
    }

    clear_rom_data(hw, layout, config.rng);
    copy_hci_tables(hw, layout, config);
    place_arch_tables(hw, layout, &config.hooks, &cfg);
    patch_func(hw, layout, config.patches)?;

    info!("ROM setup done ({:?})", config.variant);
    Ok(())
}

fn clear_rom_data(hw: &mut impl Memory, layout: &MemoryLayout, rng: RngPolicy) {
    let saved = hw.read_u32(layout.rom_rand_state);

    layout.em().clear(hw);
    layout.rom_data().clear(hw);

    let state = match rng {
        RngPolicy::Preserve => saved,
        RngPolicy::Reseed(seed) => seed,
    };
    hw.write_u32(layout.rom_rand_state, state);
}

fn copy_hci_tables(hw: &mut impl Memory, layout: &MemoryLayout, config: &ArchConfig) {
    let hci = tables::for_family(config.variant.family());

    let root = RamSlice::from_range(layout.hci_cmd_desc_tab, layout.llm_local_cmds);
    for (i, entry) in hci.cmd_desc_root.iter().enumerate() {
        root.write_words(hw, 8 * i, &entry.words());
    }
    RamSlice::new(layout.llm_local_cmds, tables::SUPPORTED_CMDS_LEN).copy_at(
        hw,
        0,
        &hci.supported_cmds,
    );
    RamSlice::new(layout.llm_local_le_feats, 8).copy_at(hw, 0, &hci.le_features);
    RamSlice::new(layout.llm_local_le_states, 8).copy_at(hw, 0, &hci.le_states);
}

fn place_arch_tables(hw: &mut impl Memory, layout: &MemoryLayout, hooks: &RomHooks, cfg: &[u32]) {
    let area = layout.arch_tables();
    area.clear(hw);

    let functions = area.addr();
    area.write_words(hw, 0, hooks.functions);

    let cfg_offset = 4 * hooks.functions.len();
    area.write_words(hw, cfg_offset, cfg);

    let handlers_offset = cfg_offset + 4 * cfg.len();
    for (i, h) in hooks.handlers.iter().enumerate() {
        let word = h.task as u32 | (h.msg_id as u32) << 16;
        area.write_words(hw, handlers_offset + 8 * i, &[word, h.handler]);
    }
    // The cleared area already holds the zero terminator.

    hw.write_u32(layout.rom_func_addr_table_var, functions as u32);
    hw.write_u32(layout.rom_cfg_table_var, (functions + cfg_offset) as u32);
    hw.write_u32(layout.custom_msg_handlers_var, (functions + handlers_offset) as u32);
}

/// Install the ROM patch table.
pub fn patch_func<H: Registers + Memory>(
    hw: &mut H,
    layout: &MemoryLayout,
    patches: &[PatchEntry],
) -> Result<(), RomError> {
    patch::install(hw, layout, patches)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MsgHandler, RomCfg};
    use crate::error::{EmArea, LayoutError};
    use da1458x_hal::mock::MockChip;
    use da1458x_hal::{ChipVariant, Reg};

    static FUNCTIONS: [u32; 3] = [0x07FC_0101, 0x07FC_0201, 0x07FC_0301];
    static HANDLERS: [MsgHandler; 1] = [MsgHandler {
        task: 0x0C,
        msg_id: 0x0C05,
        handler: 0x07FC_0401,
    }];
    static PATCHES: [PatchEntry; 2] = [
        PatchEntry::function(0x0000_4A30, 0x07FC_0500),
        PatchEntry::data(0x0001_0004, 0x0000_0040),
    ];

    fn config(variant: ChipVariant) -> ArchConfig {
        ArchConfig::new(variant)
            .hooks(RomHooks {
                functions: &FUNCTIONS,
                handlers: &HANDLERS,
            })
            .patches(&PATCHES)
    }

    #[test]
    fn wipes_rom_data_and_keeps_rng_state() {
        let variant = ChipVariant::Da14531;
        let layout = variant.layout();
        let mut chip = MockChip::new(variant);
        chip.fill(layout.em_base, layout.ram_end - layout.em_base, 0xA5);
        chip.write_u32(layout.rom_rand_state, 0xCAFE_BABE);

        init(&mut chip, layout, &config(variant));

        assert_eq!(chip.read_u32(layout.rom_rand_state), 0xCAFE_BABE);
        assert!(chip.bytes(layout.em_base, layout.em_linked.end).iter().all(|b| *b == 0));
        let tail = layout.rom_rand_state + 4;
        assert!(chip.bytes(tail, layout.ram_end - tail).iter().all(|b| *b == 0));
    }

    #[test]
    fn reseed_overrides_rng_state() {
        let variant = ChipVariant::Da14585;
        let layout = variant.layout();
        let mut chip = MockChip::new(variant);
        chip.write_u32(layout.rom_rand_state, 0xCAFE_BABE);

        init(&mut chip, layout, &config(variant).rng(RngPolicy::Reseed(42)));

        assert_eq!(chip.read_u32(layout.rom_rand_state), 42);
    }

    #[test]
    fn rom_variables_point_at_the_tables() {
        let variant = ChipVariant::Da14531;
        let layout = variant.layout();
        let mut chip = MockChip::new(variant);
        init(&mut chip, layout, &config(variant));

        let functions = chip.read_u32(layout.rom_func_addr_table_var) as usize;
        assert_eq!(functions, layout.arch_tables_base);
        assert_eq!(chip.read_u32(functions + 8), 0x07FC_0301);

        let cfg = chip.read_u32(layout.rom_cfg_table_var) as usize;
        assert_eq!(cfg, functions + 12);
        assert_eq!(chip.read_u32(cfg), RomCfg::DEFAULT.max_sleep_halfslots);

        let handlers = chip.read_u32(layout.custom_msg_handlers_var) as usize;
        assert_eq!(handlers, cfg + 16);
        assert_eq!(chip.read_u32(handlers), 0x0C05_000C);
        assert_eq!(chip.read_u32(handlers + 4), 0x07FC_0401);
        assert_eq!(chip.read_u32(handlers + 8), 0);
        assert_eq!(chip.read_u32(handlers + 12), 0);

        let hci = tables::for_family(variant.family());
        assert_eq!(chip.bytes(layout.llm_local_le_feats, 8), &hci.le_features);
        assert_eq!(chip.read_u32(layout.hci_cmd_desc_tab + 4), hci.cmd_desc_root[0].table);
        assert_eq!(chip.read(Reg::PatchValid), 0b11);
    }

    #[test]
    fn second_run_changes_nothing() {
        let variant = ChipVariant::Da14585;
        let layout = variant.layout();
        let cfg = config(variant);

        let mut once = MockChip::new(variant);
        init(&mut once, layout, &cfg);
        let mut twice = once.clone();
        init(&mut twice, layout, &cfg);

        assert_eq!(once.registers(), twice.registers());
        let span = layout.ram_end - layout.arch_tables_base;
        assert_eq!(
            once.bytes(layout.arch_tables_base, span),
            twice.bytes(layout.arch_tables_base, span)
        );
    }

    #[test]
    fn mismatched_layout_is_rejected_before_writing() {
        let variant = ChipVariant::Da14531;
        let mut layout = *variant.layout();
        layout.em_linked.rx_buf += 4;
        let mut chip = MockChip::new(variant);
        chip.write_u32(layout.rom_rand_state, 7);

        assert_eq!(
            try_init(&mut chip, &layout, &config(variant)),
            Err(RomError::Layout(LayoutError::Mismatch {
                area: EmArea::RxBuffers,
                expected: layout.em_linked.rx_buf - 4,
                linked: layout.em_linked.rx_buf,
            }))
        );
        assert_eq!(chip.read_u32(layout.rom_rand_state), 7);
    }

    #[test]
    #[should_panic(expected = "ROM setup failed")]
    fn oversized_tables_are_fatal() {
        static MANY: [u32; 0x100] = [0x07FC_0001; 0x100];
        let variant = ChipVariant::Da14531;
        let mut chip = MockChip::new(variant);
        let cfg = ArchConfig::new(variant).hooks(RomHooks {
            functions: &MANY,
            handlers: &[],
        });
        init(&mut chip, variant.layout(), &cfg);
    }
}
