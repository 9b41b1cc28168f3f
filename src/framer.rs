//! The byte framer: the Ready turnaround bit and the two-bit Ack/Nack
//! handshake that close out every byte, plus the bookkeeping that decides
//! whether the next byte is sent, received, or the slave goes idle.
//!
//! ACK is the wire pattern (low, high); NACK is (high, low). Whichever side
//! received the byte just finished judges parity and drives this pattern;
//! a side that just sent a byte always finds its own parity good (it chose
//! the parity bit to make it so), so this path doubles as the turnaround
//! handshake after a send with no separate "wait for remote ack" action.

use crate::action::Action;
use crate::engine::{Engine, MSB};
use crate::flags::Flags;
use crate::line::{Level, LineDriver};
use crate::store::Store;

impl<L: LineDriver, S: Store> Engine<L, S> {
    pub(crate) fn dispatch_framer_falling_edge(&mut self) {
        match self.action {
            Action::Ack1 | Action::Nack2 => {
                if !self.flags.contains(Flags::MUTE) {
                    self.line.drive_low();
                    self.line.schedule_release(self.timing.data_write);
                }
                self.action = match self.action {
                    Action::Ack1 => Action::Ack2,
                    _ => {
                        self.finish_ack_nack_bookkeeping();
                        return;
                    }
                };
            }
            Action::Nack1 => {
                self.action = Action::Nack2;
            }
            Action::Ack2 => {
                self.finish_ack_nack_bookkeeping();
            }
            Action::Ready => {
                self.line.schedule_sample(self.timing.data_sample);
            }
            Action::Stall => {
                self.line.drive_low();
            }
            _ => {}
        }
    }

    /// `ALARM_SAMPLE` handling for `Ready`: re-samples until the line is
    /// released, then branches to the Ack/Nack pair per the parity this
    /// slave is currently holding.
    pub(crate) fn framer_on_alarm_sample(&mut self) {
        if self.action != Action::Ready {
            return;
        }
        if self.line.sample() == Level::Low {
            return;
        }
        self.action = if self.flags.contains(Flags::PARITY) {
            Action::Ack1
        } else {
            Action::Nack1
        };
    }

    /// Runs once the Ack/Nack pair for a byte has finished: clears parity,
    /// resets the bit cursor to MSB, and reads the directive the FSM left
    /// behind (`IDLE_AFTER_ACK`, `SEND`, or the default "keep receiving").
    fn finish_ack_nack_bookkeeping(&mut self) {
        self.flags.remove(Flags::PARITY);
        self.next_bit = MSB;
        if self.flags.contains(Flags::CLEAR_MUTE_AFTER_ACK) {
            self.flags.remove(Flags::MUTE | Flags::CLEAR_MUTE_AFTER_ACK);
        }
        if self.flags.contains(Flags::IDLE_AFTER_ACK) {
            self.flags.remove(Flags::IDLE_AFTER_ACK);
            self.action = Action::Idle;
        } else if self.flags.contains(Flags::SEND) {
            self.action = Action::Send;
        } else {
            self.byte_buf = 0;
            self.action = Action::Receive;
        }
    }
}
