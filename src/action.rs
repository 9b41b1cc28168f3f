//! The bit-layer [`Action`].
//!
//! The reference firmware packs the action into a byte: a 4-bit action
//! value plus `AF_SAMPLE`/`AF_LINE_LOW` flag bits, chosen to save
//! instructions on an AVR with no spare registers. That packing carries no
//! protocol meaning, so here it is a plain tagged enum; which alarms get
//! armed for a given bit is computed from the enum variant plus the current
//! bit value and flags (see [`crate::bit`] and [`crate::framer`]), not
//! stored redundantly on the action itself.

/// The live action for the current bit window. Exactly one is active at a
/// time; transitions happen only at bit boundaries (interrupt context) or
/// from the foreground loop when `action == Stall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Not participating on the bus until the next reset.
    Idle,
    /// Transmitting `byte_buf`, MSB first, then the parity bit.
    Send,
    /// Receiving into `byte_buf`, MSB first, then the parity bit.
    Receive,
    /// First bit of an ACK pair: drive low.
    Ack1,
    /// Second bit of an ACK pair: release.
    Ack2,
    /// First bit of a NACK pair: release.
    Nack1,
    /// Second bit of a NACK pair: drive low.
    Nack2,
    /// Listening on the Ready/stall-check bit; re-samples until the line
    /// goes high, then branches to `Ack1` or `Nack1` on current parity.
    Ready,
    /// Holding the line low while the foreground transaction FSM decides
    /// the next action. Cleared only by the foreground loop.
    Stall,
}
