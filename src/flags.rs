//! Protocol state flags.
//!
//! A plain bit-set, not the register-resident packed byte the reference
//! firmware uses — the packing was an AVR code-size optimization, not part
//! of the protocol's semantics.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Flags: u8 {
        /// Set between a detected arbitration loss and the ACK/NACK boundary
        /// that ends the current byte. Never survives a bus reset.
        const MUTE = 1 << 0;
        /// Running (odd) parity of bits sent or received since the last byte
        /// boundary. Cleared at each ACK/NACK edge.
        const PARITY = 1 << 1;
        /// Survives bus reset: set once this slave has won an enumeration round.
        const ENUMERATED = 1 << 2;
        /// Enumeration in progress: sample while sending to detect collisions.
        const CHECK_COLLISION = 1 << 3;
        /// The framer is transmitting `byte_buf` rather than receiving into it.
        const SEND = 1 << 4;
        /// After the next ACK/NACK boundary, go idle rather than continue.
        const IDLE_AFTER_ACK = 1 << 5;
        /// Clear [`Self::MUTE`] exactly once, at the next ACK/NACK boundary.
        const CLEAR_MUTE_AFTER_ACK = 1 << 6;
        /// Set when `byte_buf` was loaded from a failed `Store` read: the
        /// byte is sent as-is (whatever the read left in `byte_buf`), but
        /// the parity bit is deliberately chosen wrong so the byte lands on
        /// `Nack1` instead of `Ack1` at its own ACK/NACK boundary. Cleared
        /// as soon as that boundary is reached.
        const FORCE_BAD_PARITY = 1 << 7;

        const _ = !0;
    }
}

impl Flags {
    /// Flags cleared on every bus reset. `ENUMERATED` is deliberately absent.
    pub const RESET_CLEARS: Flags = Flags::MUTE
        .union(Flags::PARITY)
        .union(Flags::CHECK_COLLISION)
        .union(Flags::SEND)
        .union(Flags::IDLE_AFTER_ACK)
        .union(Flags::CLEAR_MUTE_AFTER_ACK)
        .union(Flags::FORCE_BAD_PARITY);

    /// Apply a bus reset: clear every flag except `ENUMERATED`.
    pub fn reset(&mut self) {
        *self &= !Self::RESET_CLEARS;
    }
}
