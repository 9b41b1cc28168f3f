use crate::action::Action;
use crate::flags::Flags;
use crate::line::LineDriver;
use crate::protocol::Protocol;
use crate::state::State;
use crate::store::Store;
use crate::timing::Timing;

/// One-hot mask for the most significant bit of a byte; the starting value
/// of `next_bit` for every new byte, per the MSB-first bit ordering.
pub(crate) const MSB: u8 = 0x80;

/// The slave-side protocol engine.
///
/// Owns every piece of protocol state described in the spec's data model
/// (bus address, flags, action, transaction state, byte buffer and bit/byte
/// cursors) plus the two collaborators it drives: a [`LineDriver`] and a
/// [`Store`]. Interrupt-context callbacks (`on_falling_edge`,
/// `on_alarm_sample`, `on_alarm_release`, `on_timer_overflow`) and the
/// foreground entry point (`poll`) are the entire public surface the
/// embedding firmware needs to wire up.
pub struct Engine<L: LineDriver, S: Store> {
    pub(crate) line: L,
    pub(crate) store: S,
    pub(crate) protocol: Protocol,
    pub(crate) timing: Timing,

    pub(crate) flags: Flags,
    pub(crate) action: Action,
    pub(crate) state: State,

    pub(crate) bus_addr: u8,
    pub(crate) byte_buf: u8,
    pub(crate) next_bit: u8,
    pub(crate) next_byte: u8,

    /// Most recent [`Store`] error, recorded for foreground inspection. See
    /// [`crate::error::EngineError`].
    pub(crate) last_store_error: Option<S::Error>,
}

impl<L: LineDriver, S: Store> Engine<L, S> {
    /// Build a new engine. Equivalent to the reference firmware's `setup()`:
    /// unassigned address, no flags, idle everywhere.
    pub fn new(line: L, store: S, protocol: Protocol, timing: Timing) -> Self {
        Engine {
            line,
            store,
            protocol,
            timing,
            flags: Flags::empty(),
            action: Action::Idle,
            state: State::Idle,
            bus_addr: crate::protocol::UNASSIGNED_ADDRESS,
            byte_buf: 0,
            next_bit: MSB,
            next_byte: 0,
            last_store_error: None,
        }
    }

    /// Current bus address. Only meaningful while [`Self::is_enumerated`].
    pub fn bus_addr(&self) -> u8 {
        self.bus_addr
    }

    /// Whether this slave has won an enumeration round since the last reset.
    pub fn is_enumerated(&self) -> bool {
        self.flags.contains(Flags::ENUMERATED)
    }

    /// Current transaction state, for diagnostics/tests.
    pub fn state(&self) -> State {
        self.state
    }

    /// Current bit-layer action, for diagnostics/tests.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Current flag set, for diagnostics/tests.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Take the last recorded store error, if any.
    pub fn take_last_store_error(&mut self) -> Option<S::Error> {
        self.last_store_error.take()
    }

    /// Give the collaborators back to the caller.
    pub fn release(self) -> (L, S) {
        (self.line, self.store)
    }

    pub(crate) fn is_parity_slot(&self) -> bool {
        self.next_bit == 0
    }

    pub(crate) fn advance_bit_cursor(&mut self) {
        self.next_bit >>= 1;
    }

    pub(crate) fn reset_bit_cursor(&mut self) {
        self.next_bit = MSB;
    }

    /// Apply a bus reset: forces `State::ReceiveAddress`, starts receiving
    /// a fresh byte, and clears every flag except `ENUMERATED`. Called from
    /// `on_timer_overflow` when the line is still low after `RESET_SAMPLE`
    /// ticks, per the spec's power/reset watchdog.
    pub(crate) fn apply_bus_reset(&mut self) {
        self.state = State::ReceiveAddress;
        self.action = Action::Receive;
        self.byte_buf = 0;
        self.reset_bit_cursor();
        self.flags.reset();
    }

    /// Falling-edge interrupt entry point. Clears any sample/release alarm
    /// left pending from the previous bit window (a device violating the
    /// protocol can make one arrive before that window's own alarm fired),
    /// re-arms the reset watchdog, and restores edge-triggered wake (in case
    /// the previous window ended in deep sleep), then dispatches on the
    /// current action.
    pub fn on_falling_edge(&mut self) {
        self.line.cancel_alarms();
        self.line.set_wake_edge_triggered();
        self.line.arm_reset_watchdog(self.timing.reset_sample);
        match self.action {
            Action::Idle => {}
            Action::Receive | Action::Send => self.dispatch_bit_falling_edge(),
            Action::Ack1 | Action::Ack2 | Action::Nack1 | Action::Nack2 | Action::Ready | Action::Stall => {
                self.dispatch_framer_falling_edge()
            }
        }
    }

    /// `ALARM_SAMPLE` interrupt entry point.
    pub fn on_alarm_sample(&mut self) {
        match self.action {
            Action::Receive | Action::Send => self.bit_on_alarm_sample(),
            Action::Ready => self.framer_on_alarm_sample(),
            _ => {}
        }
    }

    /// `ALARM_RELEASE` interrupt entry point.
    pub fn on_alarm_release(&mut self) {
        self.line.release();
    }

    /// Timer-overflow interrupt entry point: no falling edge arrived within
    /// `RESET_SAMPLE` ticks of the last one.
    pub fn on_timer_overflow(&mut self) {
        match self.line.sample() {
            crate::line::Level::Low => self.apply_bus_reset(),
            crate::line::Level::High => {
                self.line.set_wake_level_triggered();
                self.line.sleep_deep();
            }
        }
    }

    /// Foreground entry point. Runs the transaction FSM to completion (it
    /// may chain through several states without an intervening bit event,
    /// e.g. loading the next Store byte right after acking an offset), then
    /// suspends until the next interrupt.
    ///
    /// Deep sleep (for bus quiescence) is entered directly from
    /// `on_timer_overflow`; this is the ordinary between-bits idle sleep,
    /// which requires the wake interrupt to stay edge-triggered.
    ///
    /// The suspend follows the mandatory check-and-sleep dance: interrupts
    /// are disabled before the `Action == Stall` check and stay disabled
    /// until the sleep instruction itself (assumed, per [`LineDriver`]'s
    /// contract, to atomically re-enable interrupts as it suspends), so a
    /// bit event arriving between the check and the sleep can't be lost.
    pub fn poll(&mut self) {
        while self.action == Action::Stall {
            self.fsm_step();
        }
        critical_section::with(|_| {
            if self.action != Action::Stall {
                self.line.sleep_idle();
            }
        });
    }
}
