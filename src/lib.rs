//! Slave-side protocol engine for a single-wire, master-arbitrated backpack
//! bus.
//!
//! The bus is a single open-drain data line shared by a master and a
//! population of slaves. Every slave carries an immutable unique ID and a
//! small byte-addressable persistent store; the master drives every timing
//! edge, slaves only ever pull the line low against a pull-up. This crate
//! implements the slave side only: [`Engine`] consumes a [`LineDriver`] and
//! a [`Store`] and runs the bit-level and transaction-level state machines
//! described in the module docs below.
//!
//! Physical line driving, edge detection, the two-alarm bit timer, and
//! persistent storage are all out of scope here and abstracted behind the
//! [`LineDriver`] and [`Store`] traits; an embedding firmware supplies both
//! and drives [`Engine`] from its interrupt handlers and foreground loop.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod action;
mod bit;
mod engine;
mod error;
mod flags;
mod framer;
mod fsm;
mod global;
mod line;
mod protocol;
mod state;
mod store;
mod time;
mod timing;

#[cfg(any(test, feature = "std"))]
pub mod testing;

pub use action::Action;
pub use engine::Engine;
pub use error::EngineError;
pub use flags::Flags;
pub use global::EngineCell;
pub use line::{Level, LineDriver};
pub use protocol::{Protocol, BC_CMD_ENUMERATE_FIRMWARE, BC_CMD_ENUMERATE_HEADER, UNASSIGNED_ADDRESS};
pub use state::State;
pub use store::Store;
pub use time::{Hertz, Micros};
pub use timing::Timing;
