//! Test doubles for [`crate::LineDriver`] and [`crate::Store`], used by this
//! crate's own tests and available to downstream crates under the `std`
//! feature for their own integration tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::line::{Level, LineDriver};
use crate::store::Store;

#[derive(Debug)]
struct Inner {
    driven_low: bool,
    external_level: Level,
    scheduled_sample: Option<u32>,
    scheduled_release: Option<u32>,
    reset_watchdog: Option<u32>,
    wake_edge_triggered: bool,
    idle_sleeps: u32,
    deep_sleeps: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            driven_low: false,
            external_level: Level::High,
            scheduled_sample: None,
            scheduled_release: None,
            reset_watchdog: None,
            wake_edge_triggered: true,
            idle_sleeps: 0,
            deep_sleeps: 0,
        }
    }
}

/// A line driver that records every call instead of touching hardware.
///
/// Cloning a [`MockLine`] shares the same underlying state (it's a `Rc`
/// handle), so a test can hand one clone to an [`crate::Engine`] and keep
/// another to play the master: set the level the bus is carrying, then
/// invoke whichever `Engine` callback the scenario calls for. The mock never
/// fires its own alarms; tests control timing explicitly instead of racing
/// a real clock.
#[derive(Debug, Clone, Default)]
pub struct MockLine {
    inner: Rc<RefCell<Inner>>,
}

impl MockLine {
    pub fn new() -> Self {
        MockLine::default()
    }

    /// Set the level as driven by everything *other* than this engine (the
    /// master, or another slave on the wired-AND bus).
    pub fn set_external_level(&self, level: Level) {
        self.inner.borrow_mut().external_level = level;
    }

    pub fn scheduled_sample(&self) -> Option<u32> {
        self.inner.borrow().scheduled_sample
    }

    pub fn scheduled_release(&self) -> Option<u32> {
        self.inner.borrow().scheduled_release
    }

    pub fn reset_watchdog(&self) -> Option<u32> {
        self.inner.borrow().reset_watchdog
    }

    pub fn is_driven_low(&self) -> bool {
        self.inner.borrow().driven_low
    }

    pub fn idle_sleeps(&self) -> u32 {
        self.inner.borrow().idle_sleeps
    }

    pub fn deep_sleeps(&self) -> u32 {
        self.inner.borrow().deep_sleeps
    }

    pub fn is_wake_edge_triggered(&self) -> bool {
        self.inner.borrow().wake_edge_triggered
    }
}

impl LineDriver for MockLine {
    fn drive_low(&mut self) {
        self.inner.borrow_mut().driven_low = true;
    }

    fn release(&mut self) {
        self.inner.borrow_mut().driven_low = false;
    }

    fn sample(&mut self) -> Level {
        let inner = self.inner.borrow();
        if inner.driven_low {
            Level::Low
        } else {
            inner.external_level
        }
    }

    fn schedule_sample(&mut self, ticks: u32) {
        self.inner.borrow_mut().scheduled_sample = Some(ticks);
    }

    fn schedule_release(&mut self, ticks: u32) {
        self.inner.borrow_mut().scheduled_release = Some(ticks);
    }

    fn cancel_alarms(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.scheduled_sample = None;
        inner.scheduled_release = None;
    }

    fn arm_reset_watchdog(&mut self, ticks: u32) {
        self.inner.borrow_mut().reset_watchdog = Some(ticks);
    }

    fn sleep_idle(&mut self) {
        self.inner.borrow_mut().idle_sleeps += 1;
    }

    fn sleep_deep(&mut self) {
        self.inner.borrow_mut().deep_sleeps += 1;
    }

    fn set_wake_edge_triggered(&mut self) {
        self.inner.borrow_mut().wake_edge_triggered = true;
    }

    fn set_wake_level_triggered(&mut self) {
        self.inner.borrow_mut().wake_edge_triggered = false;
    }
}

/// A persistent store backed by an in-memory byte vector.
#[derive(Debug, Clone)]
pub struct MockStore {
    bytes: Vec<u8>,
}

/// Error returned by [`MockStore`] when an offset falls outside the backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("offset {0} out of range")]
pub struct OutOfRange(pub u8);

impl MockStore {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        MockStore {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Store for MockStore {
    type Error = OutOfRange;

    fn read(&mut self, offset: u8) -> Result<u8, Self::Error> {
        self.bytes
            .get(offset as usize)
            .copied()
            .ok_or(OutOfRange(offset))
    }

    fn write(&mut self, offset: u8, value: u8) -> Result<(), Self::Error> {
        let slot = self
            .bytes
            .get_mut(offset as usize)
            .ok_or(OutOfRange(offset))?;
        *slot = value;
        Ok(())
    }
}
