//! Wire-level constants: broadcast/targeted command opcodes and store layout.

/// Reference firmware's broadcast enumerate opcode (`backpack.c`).
pub const BC_CMD_ENUMERATE_FIRMWARE: u8 = 0xaa;
/// `protocol.h`'s broadcast enumerate opcode, kept distinct per the spec's
/// open question about which header is authoritative on the wire.
pub const BC_CMD_ENUMERATE_HEADER: u8 = 0xff;

/// Targeted command: read a byte from the store.
pub const CMD_READ_EEPROM: u8 = 0x01;
/// Targeted command: write a byte to the store.
pub const CMD_WRITE_EEPROM: u8 = 0x02;

/// Sentinel bus address meaning "not yet enumerated".
pub const UNASSIGNED_ADDRESS: u8 = 0xff;

/// Wire-level and store-layout configuration for one slave.
///
/// Bundled so a deployment can choose the `0xAA` vs `0xFF` broadcast opcode
/// (see the spec's open question) and the store layout without forking the
/// crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Protocol {
    /// Address byte that starts bus enumeration.
    pub broadcast_enumerate: u8,
    /// Offset of the immutable unique ID within the store.
    pub id_offset: u8,
    /// Size in bytes of the immutable unique ID.
    pub id_size: u8,
}

impl Protocol {
    /// Reference firmware layout: 4-byte ID at offset 0, `0xAA` broadcast opcode.
    pub const fn reference() -> Self {
        Protocol {
            broadcast_enumerate: BC_CMD_ENUMERATE_FIRMWARE,
            id_offset: 0,
            id_size: 4,
        }
    }

    /// Same layout as [`Self::reference`] but using `protocol.h`'s `0xFF`
    /// broadcast opcode instead of the firmware's `0xAA`.
    pub const fn with_header_broadcast_opcode() -> Self {
        Protocol {
            broadcast_enumerate: BC_CMD_ENUMERATE_HEADER,
            ..Self::reference()
        }
    }

    /// First byte past the immutable ID range.
    pub const fn id_end(&self) -> u8 {
        self.id_offset + self.id_size
    }

    /// Whether `offset` falls inside the immutable ID range.
    pub const fn is_id_offset(&self, offset: u8) -> bool {
        offset >= self.id_offset && offset < self.id_end()
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::reference()
    }
}
