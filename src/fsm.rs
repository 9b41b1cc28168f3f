//! The transaction FSM: runs only while `Action == Stall`, inspects `State`
//! and `byte_buf`, and decides what happens next. See [`crate::engine::Engine::poll`]
//! for the foreground loop that drives it.

use crate::action::Action;
use crate::flags::Flags;
use crate::line::LineDriver;
use crate::state::State;
use crate::store::Store;

use crate::engine::Engine;

impl<L: LineDriver, S: Store> Engine<L, S> {
    /// One step of the transaction FSM. May leave `Action == Stall`, in
    /// which case [`Engine::poll`]'s loop calls this again immediately
    /// (e.g. `ReceiveAddress`'s broadcast-enumerate branch falls straight
    /// into the first round of `Enumerate`).
    pub(crate) fn fsm_step(&mut self) {
        match self.state {
            State::Idle => {
                // Unreachable from the foreground; only a reset enters or
                // leaves this state.
            }
            State::ReceiveAddress => self.fsm_receive_address(),
            State::Enumerate => self.fsm_enumerate(),
            State::ReceiveCommand => self.fsm_receive_command(),
            State::ReadEepromReceiveAddr => {
                self.next_byte = self.byte_buf;
                self.flags.insert(Flags::SEND);
                self.state = State::ReadEepromSendData;
                // stays Stall: immediately re-enters on the next loop pass
            }
            State::ReadEepromSendData => self.fsm_read_eeprom_send_data(),
            State::WriteEepromReceiveAddr => {
                self.next_byte = self.byte_buf;
                self.state = State::WriteEepromReceiveData;
                self.action = Action::Ready;
            }
            State::WriteEepromReceiveData => self.fsm_write_eeprom_receive_data(),
        }
    }

    fn fsm_receive_address(&mut self) {
        if self.byte_buf == self.protocol.broadcast_enumerate {
            self.state = State::Enumerate;
            self.flags.insert(Flags::CHECK_COLLISION | Flags::SEND);
            self.flags.remove(Flags::ENUMERATED);
            self.next_byte = self.protocol.id_offset;
            self.bus_addr = 0;
            // stays Stall: immediately falls into the first Enumerate round
        } else if self.is_enumerated() && self.byte_buf == self.bus_addr {
            self.state = State::ReceiveCommand;
            self.action = Action::Ready;
        } else {
            self.action = Action::Idle;
        }
    }

    fn fsm_receive_command(&mut self) {
        self.action = match self.byte_buf {
            crate::protocol::CMD_READ_EEPROM => {
                self.state = State::ReadEepromReceiveAddr;
                Action::Ready
            }
            crate::protocol::CMD_WRITE_EEPROM => {
                self.state = State::WriteEepromReceiveAddr;
                Action::Ready
            }
            _ => Action::Idle,
        };
    }

    /// Load `Store[next_byte]` into `byte_buf` and advance the cursor,
    /// unless muted (a slave that just lost arbitration only consumes the
    /// wire, it doesn't drive its own ID bytes anymore this round). A
    /// failed read still gets sent (there's nothing better to put on the
    /// wire), but `FORCE_BAD_PARITY` makes sure it gets NACKed once it's
    /// done, rather than silently ACKed like a good byte.
    fn load_next_send_byte(&mut self) {
        if !self.flags.contains(Flags::MUTE) {
            match self.store.read(self.next_byte) {
                Ok(byte) => self.byte_buf = byte,
                Err(e) => {
                    self.last_store_error = Some(e);
                    self.byte_buf = 0;
                    self.flags.insert(Flags::FORCE_BAD_PARITY);
                }
            }
        }
        self.next_byte = self.next_byte.wrapping_add(1);
        self.action = Action::Ready;
    }

    fn fsm_read_eeprom_send_data(&mut self) {
        self.load_next_send_byte();
    }

    fn fsm_write_eeprom_receive_data(&mut self) {
        if !self.protocol.is_id_offset(self.next_byte) {
            if let Err(e) = self.store.write(self.next_byte, self.byte_buf) {
                self.last_store_error = Some(e);
            }
        }
        self.next_byte = self.next_byte.wrapping_add(1);
        self.action = Action::Ready;
    }

    fn fsm_enumerate(&mut self) {
        if self.next_byte == self.protocol.id_end() {
            if self.flags.contains(Flags::MUTE) {
                self.next_byte = self.protocol.id_offset;
                self.bus_addr = self.bus_addr.wrapping_add(1);
                self.flags.insert(Flags::CLEAR_MUTE_AFTER_ACK);
                // stays Stall: immediately starts the next ID repetition
            } else {
                self.state = State::Idle;
                self.flags.insert(Flags::IDLE_AFTER_ACK | Flags::ENUMERATED);
                self.action = Action::Ready;
            }
        } else {
            // Same shape as ReadEepromSendData: the original firmware falls
            // through from Enumerate into this case, sharing one code path.
            // Here it is its own named helper instead.
            self.load_next_send_byte();
        }
    }
}
