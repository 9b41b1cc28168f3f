//! Crate-wide error type surfaced to the embedding firmware for logging.
//!
//! None of these propagate onto the wire: the bit engine and transaction
//! FSM encode every failure into ACK/NACK or `Action::Idle` (see the error
//! handling section of the protocol spec). This type exists purely so a
//! caller driving [`crate::Engine`] from the foreground can log or count
//! failures; the protocol itself never inspects it.
use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError<E> {
    /// A store access failed while the FSM was servicing a read or write.
    #[error("store access failed")]
    Store(E),
}
