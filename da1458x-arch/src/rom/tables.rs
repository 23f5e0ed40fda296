//! HCI tables the ROM host interface reads from RAM.

use da1458x_hal::Family;

/// Size of the supported-commands bitmap (HCI Read Local Supported Commands).
pub const SUPPORTED_CMDS_LEN: usize = 64;

/// Root entry of the HCI command descriptor table: one per opcode group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdDescRoot {
    pub ogf: u8,
    pub count: u8,
    /// ROM address of the group's descriptor array.
    pub table: u32,
}

impl CmdDescRoot {
    const fn new(ogf: u8, count: u8, table: u32) -> Self {
        Self { ogf, count, table }
    }

    /// In-memory form: `ogf | count << 8`, then the table address.
    pub const fn words(&self) -> [u32; 2] {
        [self.ogf as u32 | (self.count as u32) << 8, self.table]
    }
}

/// Per-family HCI tables.
#[derive(Debug, Clone, Copy)]
pub struct HciTables {
    pub cmd_desc_root: &'static [CmdDescRoot],
    pub supported_cmds: [u8; SUPPORTED_CMDS_LEN],
    pub le_features: [u8; 8],
    pub le_states: [u8; 8],
}

/// Set bit `bit` of octet `octet` in each `(octet, bit)` pair.
const fn bitmap(bits: &[(usize, u8)]) -> [u8; SUPPORTED_CMDS_LEN] {
    let mut map = [0; SUPPORTED_CMDS_LEN];
    let mut i = 0;
    while i < bits.len() {
        let (octet, bit) = bits[i];
        map[octet] |= 1 << bit;
        i += 1;
    }
    map
}

/// Commands common to both ROMs.
const COMMON_CMDS: [(usize, u8); 34] = [
    (0, 5),  // Disconnect
    (2, 7),  // Read Remote Version Information
    (5, 6),  // Set Event Mask
    (5, 7),  // Reset
    (10, 2), // Read Transmit Power Level
    (14, 3), // Read Local Version Information
    (14, 5), // Read Local Supported Features
    (15, 1), // Read BD_ADDR
    (15, 5), // Read RSSI
    (25, 0), // LE Set Event Mask
    (25, 1), // LE Read Buffer Size
    (25, 2), // LE Read Local Supported Features
    (25, 4), // LE Set Random Address
    (25, 5), // LE Set Advertising Parameters
    (25, 6), // LE Read Advertising Channel Tx Power
    (25, 7), // LE Set Advertising Data
    (26, 0), // LE Set Scan Response Data
    (26, 1), // LE Set Advertise Enable
    (26, 2), // LE Set Scan Parameters
    (26, 3), // LE Set Scan Enable
    (26, 4), // LE Create Connection
    (26, 5), // LE Create Connection Cancel
    (26, 6), // LE Read White List Size
    (26, 7), // LE Clear White List
    (27, 0), // LE Add Device To White List
    (27, 1), // LE Remove Device From White List
    (27, 2), // LE Connection Update
    (27, 3), // LE Set Host Channel Classification
    (27, 4), // LE Read Channel Map
    (27, 5), // LE Read Remote Used Features
    (27, 6), // LE Encrypt
    (27, 7), // LE Rand
    (28, 0), // LE Start Encryption
    (28, 3), // LE Read Supported States
];

/// Bluetooth 4.2 additions (data length, privacy) present in both ROMs.
const V42_CMDS: [(usize, u8); 12] = [
    (33, 4), // LE Remote Connection Parameter Request Reply
    (33, 5), // LE Remote Connection Parameter Request Negative Reply
    (33, 6), // LE Set Data Length
    (33, 7), // LE Read Suggested Default Data Length
    (34, 0), // LE Write Suggested Default Data Length
    (34, 3), // LE Add Device To Resolving List
    (34, 4), // LE Remove Device From Resolving List
    (34, 5), // LE Clear Resolving List
    (34, 6), // LE Read Resolving List Size
    (35, 1), // LE Set Address Resolution Enable
    (35, 2), // LE Set Resolvable Private Address Timeout
    (35, 3), // LE Read Maximum Data Length
];

/// Bluetooth 5.x additions of the low-power family ROM.
const V5_CMDS: [(usize, u8); 4] = [
    (35, 4), // LE Read PHY
    (35, 5), // LE Set Default PHY
    (35, 6), // LE Set PHY
    (39, 2), // LE Set Privacy Mode
];

const fn concat<const A: usize, const B: usize, const C: usize, const N: usize>(
    a: [(usize, u8); A],
    b: [(usize, u8); B],
    c: [(usize, u8); C],
) -> [(usize, u8); N] {
    let mut out = [(0, 0); N];
    let mut i = 0;
    while i < A {
        out[i] = a[i];
        i += 1;
    }
    while i < A + B {
        out[i] = b[i - A];
        i += 1;
    }
    while i < N {
        out[i] = c[i - A - B];
        i += 1;
    }
    out
}

const LOW_POWER_CMDS: [(usize, u8); 50] = concat(COMMON_CMDS, V42_CMDS, V5_CMDS);
const FULL_CMDS: [(usize, u8); 46] = concat(COMMON_CMDS, V42_CMDS, []);

static LOW_POWER_ROOT: [CmdDescRoot; 5] = [
    CmdDescRoot::new(0x01, 1, 0x0001_E8A4),
    CmdDescRoot::new(0x03, 4, 0x0001_E8B0),
    CmdDescRoot::new(0x04, 3, 0x0001_E8E0),
    CmdDescRoot::new(0x05, 1, 0x0001_E904),
    CmdDescRoot::new(0x08, 44, 0x0001_E910),
];

static FULL_ROOT: [CmdDescRoot; 5] = [
    CmdDescRoot::new(0x01, 1, 0x0003_2C10),
    CmdDescRoot::new(0x03, 4, 0x0003_2C1C),
    CmdDescRoot::new(0x04, 3, 0x0003_2C4C),
    CmdDescRoot::new(0x05, 1, 0x0003_2C70),
    CmdDescRoot::new(0x08, 38, 0x0003_2C7C),
];

static LOW_POWER: HciTables = HciTables {
    cmd_desc_root: &LOW_POWER_ROOT,
    supported_cmds: bitmap(&LOW_POWER_CMDS),
    // Encryption, CPR, extended reject, slave features, ping, DLE, privacy,
    // extended scanner filter policies; 2M PHY.
    le_features: [0xFF, 0x01, 0, 0, 0, 0, 0, 0],
    le_states: [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x03, 0, 0],
};

static FULL: HciTables = HciTables {
    cmd_desc_root: &FULL_ROOT,
    supported_cmds: bitmap(&FULL_CMDS),
    le_features: [0x3F, 0, 0, 0, 0, 0, 0, 0],
    le_states: [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x03, 0, 0],
};

/// Tables matching the ROM of `family`.
pub fn for_family(family: Family) -> &'static HciTables {
    match family {
        Family::LowPower => &LOW_POWER,
        Family::Full => &FULL,
    }
}
