//! A single process-wide binding for one [`Engine`], installed once at
//! startup and shared between the foreground loop and interrupt handlers.
//!
//! The reference firmware reaches for the engine state as register-resident
//! globals, accessible from every interrupt handler with no indirection.
//! The equivalent here is a single `static` owned by the embedding firmware
//! (declared with a concrete [`LineDriver`]/[`Store`] pair, since statics
//! can't be generic), guarded by [`critical_section::Mutex`] so interrupt
//! and foreground access can never overlap:
//!
//! ```ignore
//! static ENGINE: EngineCell<MyLine, MyStore> = EngineCell::new();
//!
//! fn main() {
//!     ENGINE.init(Engine::new(line, store, Protocol::default(), Timing::default()));
//!     loop {
//!         ENGINE.with(|engine| engine.poll());
//!     }
//! }
//!
//! #[interrupt]
//! fn falling_edge() {
//!     ENGINE.with(|engine| engine.on_falling_edge());
//! }
//! ```
use core::cell::RefCell;

use critical_section::Mutex;

use crate::engine::Engine;
use crate::line::LineDriver;
use crate::store::Store;

/// Holds one [`Engine`] behind a critical section, for use as a `static`.
pub struct EngineCell<L: LineDriver, S: Store> {
    inner: Mutex<RefCell<Option<Engine<L, S>>>>,
}

impl<L: LineDriver, S: Store> EngineCell<L, S> {
    /// An empty cell, suitable for a `static` initializer.
    pub const fn new() -> Self {
        EngineCell {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the engine. Call once, before any interrupt that might call
    /// [`Self::with`] is unmasked.
    pub fn init(&self, engine: Engine<L, S>) {
        critical_section::with(|cs| {
            *self.inner.borrow(cs).borrow_mut() = Some(engine);
        });
    }

    /// Run `f` with exclusive access to the engine. Panics if [`Self::init`]
    /// has not run yet.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<L, S>) -> R) -> R {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).borrow_mut();
            let engine = slot.as_mut().expect("EngineCell::init was not called");
            f(engine)
        })
    }
}

impl<L: LineDriver, S: Store> Default for EngineCell<L, S> {
    fn default() -> Self {
        Self::new()
    }
}
