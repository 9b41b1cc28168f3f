//! The physical line and timer, abstracted away from the protocol engine.
//!
//! Line driving, edge detection and the two-alarm timer are hardware
//! concerns owned by the embedding firmware. This trait is the seam: the
//! engine only ever calls these methods, and only from the bit-window
//! ordering documented on each method.

/// Instantaneous read of the shared data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    #[default]
    High,
}

impl Level {
    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// Hardware collaborator for one bus line.
///
/// Implementations own a GPIO pin wired open-drain against a pull-up and a
/// free-running timer with two independent one-shot compare outputs
/// (`ALARM_SAMPLE`, `ALARM_RELEASE`) plus an overflow event. The engine
/// never schedules both alarms for the same tick count; `schedule_release`
/// is always called with a smaller tick count than any concurrently pending
/// `schedule_sample`, matching the ordering guarantee in the spec
/// (`ALARM_RELEASE < ALARM_SAMPLE + margin` if both are scheduled, overflow
/// greater than both).
pub trait LineDriver {
    /// Pull the line low. Idempotent.
    fn drive_low(&mut self);

    /// Release the line to high-impedance input. Idempotent, and safe to
    /// call from the release alarm as well as from the foreground loop.
    fn release(&mut self);

    /// Instantaneous read of the line at the scheduled sample point.
    fn sample(&mut self) -> Level;

    /// Arm `ALARM_SAMPLE` to fire `ticks` after this call.
    fn schedule_sample(&mut self, ticks: u32);

    /// Arm `ALARM_RELEASE` to fire `ticks` after this call.
    fn schedule_release(&mut self, ticks: u32);

    /// Disarm both `ALARM_SAMPLE` and `ALARM_RELEASE` without firing them.
    fn cancel_alarms(&mut self);

    /// Re-seed the reset watchdog so its overflow event fires `ticks` after
    /// this call unless a new falling edge arrives first. Called at the
    /// start of every bit window.
    fn arm_reset_watchdog(&mut self, ticks: u32);

    /// Enter idle sleep. Requires the wake source to be edge-triggered.
    ///
    /// Must atomically re-enable interrupts and suspend, so that an
    /// interrupt pending at the moment of the call is not lost; the engine
    /// calls this only from within an interrupts-disabled scope.
    fn sleep_idle(&mut self);

    /// Enter deep sleep. Requires the wake source to be level-triggered.
    /// Same atomicity contract as [`Self::sleep_idle`].
    fn sleep_deep(&mut self);

    /// Switch the wake interrupt to edge-triggered (normal operation).
    fn set_wake_edge_triggered(&mut self);

    /// Switch the wake interrupt to level-triggered (required before deep sleep).
    fn set_wake_level_triggered(&mut self);
}
