//! Per-bit dispatch: drives the line, samples it, and tracks parity for
//! `Action::Idle` / `Send` / `Receive`. The Ack/Nack/Ready phases live in
//! [`crate::framer`]; the transaction FSM in [`crate::fsm`] only ever sees
//! `Action::Stall`.

use crate::action::Action;
use crate::engine::Engine;
use crate::flags::Flags;
use crate::line::{Level, LineDriver};
use crate::store::Store;

impl<L: LineDriver, S: Store> Engine<L, S> {
    /// XOR `bit` into the running parity accumulator. Applied uniformly to
    /// data bits and the parity bit itself, for both directions: a sender
    /// picks the parity bit's value so this always leaves `PARITY` set by
    /// the time the byte is done, a receiver just folds in whatever arrived.
    fn accumulate_parity(&mut self, bit: bool) {
        let parity = self.flags.contains(Flags::PARITY) ^ bit;
        self.flags.set(Flags::PARITY, parity);
    }

    /// The bit value to transmit for the current `next_bit` position: a data
    /// bit from `byte_buf`, or, in the parity slot, whatever value makes the
    /// running parity come out odd — unless `FORCE_BAD_PARITY` is set (a
    /// `Store` read failed while loading this byte), in which case the
    /// parity slot deliberately repeats the running parity instead, so the
    /// byte ends up with bad parity and gets NACKed.
    fn current_send_bit_high(&self) -> bool {
        if self.is_parity_slot() {
            let running = self.flags.contains(Flags::PARITY);
            if self.flags.contains(Flags::FORCE_BAD_PARITY) {
                running
            } else {
                !running
            }
        } else {
            self.byte_buf & self.next_bit != 0
        }
    }

    /// Advance past the bit just processed. Returns `true` if that bit was
    /// the parity bit, i.e. the byte just completed.
    fn advance_past_bit(&mut self) -> bool {
        if self.is_parity_slot() {
            true
        } else {
            self.advance_bit_cursor();
            false
        }
    }

    /// Dispatch the start of a new bit window for `Idle`/`Send`/`Receive`.
    /// The Ack/Nack/Ready/Stall actions are handled by
    /// [`crate::framer`]; see [`Engine::on_falling_edge`] for the split.
    pub(crate) fn dispatch_bit_falling_edge(&mut self) {
        match self.action {
            Action::Receive => {
                self.line.schedule_sample(self.timing.data_sample);
            }
            Action::Send => {
                if self.flags.contains(Flags::MUTE) {
                    self.finish_send_bit();
                    return;
                }
                if self.current_send_bit_high() {
                    self.line.release();
                    if self.flags.contains(Flags::CHECK_COLLISION) {
                        self.line.schedule_sample(self.timing.data_sample);
                    }
                } else {
                    self.line.drive_low();
                    self.line.schedule_release(self.timing.data_write);
                }
                self.finish_send_bit();
            }
            _ => {}
        }
    }

    /// `Send`'s own transmitted bit is already decided on the falling edge,
    /// so its parity/cursor update happens here rather than at
    /// `on_alarm_sample`.
    fn finish_send_bit(&mut self) {
        let bit = self.current_send_bit_high();
        self.accumulate_parity(bit);
        if self.advance_past_bit() {
            self.flags.remove(Flags::FORCE_BAD_PARITY);
            self.action = Action::Stall;
        }
    }

    /// Handles `ALARM_SAMPLE` for `Receive` and collision-checking `Send`.
    /// `Ready`'s sample handling lives in [`crate::framer`].
    pub(crate) fn bit_on_alarm_sample(&mut self) {
        match self.action {
            Action::Receive => {
                let bit = self.line.sample().is_high();
                if bit {
                    self.byte_buf |= self.next_bit;
                }
                self.accumulate_parity(bit);
                if self.advance_past_bit() {
                    self.action = if self.flags.contains(Flags::PARITY) {
                        Action::Stall
                    } else {
                        self.flags.insert(Flags::IDLE_AFTER_ACK);
                        Action::Ready
                    };
                }
            }
            Action::Send => {
                if self.flags.contains(Flags::MUTE) {
                    return;
                }
                if self.line.sample() == Level::Low {
                    self.flags.insert(Flags::MUTE);
                }
            }
            _ => {}
        }
    }

    /// `ALARM_RELEASE` fired: whichever action scheduled it wanted the line
    /// released at this point.
    pub(crate) fn on_alarm_release(&mut self) {
        self.line.release();
    }
}
