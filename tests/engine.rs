//! End-to-end tests driving [`backpack_bus::Engine`] against the mock
//! collaborators, one falling edge / alarm at a time, the way the real
//! interrupt handlers would. The test plays the master: it sets the level
//! the bus carries and calls whichever `Engine` callback the scenario calls
//! for, never reaching into the engine's private state.

use backpack_bus::testing::{MockLine, MockStore};
use backpack_bus::{Engine, Level, Protocol, Timing};

type Bus = Engine<MockLine, MockStore>;

fn new_bus(store_bytes: &[u8]) -> (Bus, MockLine) {
    let line = MockLine::new();
    let bus = Engine::new(
        line.clone(),
        MockStore::new(store_bytes.to_vec()),
        Protocol::reference(),
        Timing::reference(),
    );
    (bus, line)
}

/// Drive a bus reset the way the watchdog really detects one: the line is
/// low when the overflow fires.
fn reset(bus: &mut Bus, line: &MockLine) {
    line.set_external_level(Level::Low);
    bus.on_timer_overflow();
}

fn odd_parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// One bit window in which the master drives a value and the engine
/// receives it.
fn master_send_bit(bus: &mut Bus, line: &MockLine, bit: bool) {
    line.set_external_level(if bit { Level::High } else { Level::Low });
    bus.on_falling_edge();
    bus.on_alarm_sample();
}

fn master_send_byte(bus: &mut Bus, line: &MockLine, byte: u8, bad_parity: bool) {
    for i in (0..8).rev() {
        master_send_bit(bus, line, (byte >> i) & 1 != 0);
    }
    let mut parity = odd_parity_bit(byte);
    if bad_parity {
        parity = !parity;
    }
    master_send_bit(bus, line, parity);
}

/// Read one bit the engine is driving (or releasing) for `Action::Send`.
/// A driven-low '0' bit is only a short pulse: `ALARM_RELEASE` fires well
/// before the next falling edge, so the test fires it immediately after
/// observing the bit, the way real hardware would before the window ends.
fn read_sent_bit(bus: &mut Bus, line: &MockLine) -> bool {
    bus.on_falling_edge();
    let high = !line.is_driven_low();
    if !high {
        bus.on_alarm_release();
    }
    high
}

fn read_sent_byte(bus: &mut Bus, line: &MockLine) -> u8 {
    let mut byte = 0u8;
    for _ in 0..8 {
        byte <<= 1;
        if read_sent_bit(bus, line) {
            byte |= 1;
        }
    }
    let _parity = read_sent_bit(bus, line);
    byte
}

/// Ready bit (master releases) followed by the two-bit Ack/Nack pair. Which
/// pattern comes out is entirely up to the engine's own parity bookkeeping.
/// Returns whether the engine acked: ACK is (low, high), NACK is (high,
/// low), and only the first bit ever gets driven low by `Ack1`/`Nack2` (the
/// other half of each pair never drives), so the first bit alone tells them
/// apart. Releases any driven bit immediately, the way `ALARM_RELEASE`
/// would before the window ends.
fn ready_and_read_ack(bus: &mut Bus, line: &MockLine) -> bool {
    line.set_external_level(Level::High);
    bus.on_falling_edge();
    bus.on_alarm_sample();
    bus.on_falling_edge();
    let first_low = line.is_driven_low();
    if first_low {
        bus.on_alarm_release();
    }
    bus.on_falling_edge();
    if line.is_driven_low() {
        bus.on_alarm_release();
    }
    first_low
}

fn ready_and_ack(bus: &mut Bus, line: &MockLine) {
    ready_and_read_ack(bus, line);
}

/// Release a bit the engine just drove low, if it drove one. Shared by the
/// two-node arbitration test's hand-rolled bit loops, which (unlike
/// `read_sent_bit`/`ready_and_read_ack`) step two engines in lockstep and so
/// can't reuse those single-engine helpers directly.
fn release_if_low(bus: &mut Bus, line: &MockLine) {
    if line.is_driven_low() {
        bus.on_alarm_release();
    }
}

const BC_ENUMERATE: u8 = 0xaa;
const CMD_READ: u8 = 0x01;
const CMD_WRITE: u8 = 0x02;

/// Each ID (or store) byte is preceded by a Ready/Ack window: the first one
/// consumes the carried-over parity from whatever byte ended the previous
/// phase, and `byte_buf` is already loaded with the next byte to send by the
/// time the engine reaches `Action::Send`.
fn enumerate_single_node(bus: &mut Bus, line: &MockLine, id: [u8; 4]) {
    reset(bus, line);
    master_send_byte(bus, line, BC_ENUMERATE, false);
    bus.poll();
    for (i, &expected) in id.iter().enumerate() {
        ready_and_ack(bus, line);
        let got = read_sent_byte(bus, line);
        assert_eq!(got, expected, "id byte {i}");
        bus.poll();
    }
    ready_and_ack(bus, line);
}

#[test]
fn single_node_enumerate_assigns_address_zero() {
    let id = [0x01, 0x02, 0x03, 0x04];
    let mut store = id.to_vec();
    store.extend_from_slice(&[0u8; 4]);
    let (mut bus, line) = new_bus(&store);

    enumerate_single_node(&mut bus, &line, id);

    assert!(bus.is_enumerated());
    assert_eq!(bus.bus_addr(), 0);
}

#[test]
fn enumerated_node_echoes_its_id_on_read() {
    let id = [0x01, 0x02, 0x03, 0x04];
    let mut store = id.to_vec();
    store.extend_from_slice(&[0u8; 4]);
    let (mut bus, line) = new_bus(&store);
    enumerate_single_node(&mut bus, &line, id);

    // A fresh transaction starts with a reset, the same as the master would
    // issue before addressing any already-enumerated slave.
    reset(&mut bus, &line);
    master_send_byte(&mut bus, &line, bus.bus_addr(), false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, CMD_READ, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, 0, false);
    bus.poll();

    for &expected in &id {
        ready_and_ack(&mut bus, &line);
        let got = read_sent_byte(&mut bus, &line);
        assert_eq!(got, expected);
        bus.poll();
    }
}

#[test]
fn parity_fault_on_address_byte_nacks_and_goes_idle() {
    let id = [0x01, 0x02, 0x03, 0x04];
    let mut store = id.to_vec();
    store.extend_from_slice(&[0u8; 4]);
    let (mut bus, line) = new_bus(&store);
    enumerate_single_node(&mut bus, &line, id);

    reset(&mut bus, &line);
    master_send_byte(&mut bus, &line, bus.bus_addr(), true);

    // Bad parity bypasses the FSM entirely: straight to Ready+NACK, then idle.
    ready_and_ack(&mut bus, &line);
    assert_eq!(bus.action(), backpack_bus::Action::Idle);

    // Further bits are ignored until the next reset.
    master_send_byte(&mut bus, &line, CMD_READ, false);
    assert_eq!(bus.action(), backpack_bus::Action::Idle);
}

#[test]
fn id_range_write_is_acked_but_not_persisted() {
    let id = [0x01, 0x02, 0x03, 0x04];
    let mut store = id.to_vec();
    store.extend_from_slice(&[0u8; 4]);
    let (mut bus, line) = new_bus(&store);
    enumerate_single_node(&mut bus, &line, id);

    reset(&mut bus, &line);
    master_send_byte(&mut bus, &line, bus.bus_addr(), false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, CMD_WRITE, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, 0, false); // offset 0: inside the ID range
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, 0xff, false); // attempted overwrite
    bus.poll();
    // Write is still ACKed even though it's refused.
    ready_and_ack(&mut bus, &line);

    assert_eq!(bus.action(), backpack_bus::Action::Receive);

    let (_, store) = bus.release();
    assert_eq!(store.bytes()[0], id[0]);
}

#[test]
fn reset_mid_frame_preserves_enumeration() {
    let id = [0x01, 0x02, 0x03, 0x04];
    let mut store = id.to_vec();
    store.extend_from_slice(&[0u8; 4]);
    let (mut bus, line) = new_bus(&store);
    enumerate_single_node(&mut bus, &line, id);
    let addr = bus.bus_addr();

    reset(&mut bus, &line);
    master_send_byte(&mut bus, &line, addr, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);
    master_send_byte(&mut bus, &line, CMD_WRITE, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);
    master_send_byte(&mut bus, &line, 4, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    // Reset before the data byte arrives.
    reset(&mut bus, &line);

    assert!(bus.is_enumerated());
    assert_eq!(bus.bus_addr(), addr);

    // A fresh broadcast enumerate still treats this slave as already
    // enumerated: it re-participates and can win again since it's alone.
    master_send_byte(&mut bus, &line, BC_ENUMERATE, false);
    bus.poll();
    for &expected in &id {
        ready_and_ack(&mut bus, &line);
        let got = read_sent_byte(&mut bus, &line);
        assert_eq!(got, expected);
        bus.poll();
    }
    ready_and_ack(&mut bus, &line);
    assert!(bus.is_enumerated());
}

#[test]
fn read_past_store_end_is_rejected() {
    let store = vec![0x01, 0x02, 0x03, 0x04];
    let (mut bus, line) = new_bus(&store);
    enumerate_single_node(&mut bus, &line, [0x01, 0x02, 0x03, 0x04]);

    reset(&mut bus, &line);
    master_send_byte(&mut bus, &line, bus.bus_addr(), false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    master_send_byte(&mut bus, &line, CMD_READ, false);
    bus.poll();
    ready_and_ack(&mut bus, &line);

    // Offset 4 is one past the end of this 4-byte store.
    master_send_byte(&mut bus, &line, 4, false);
    bus.poll();
    assert!(bus.take_last_store_error().is_some());

    // The failed read still gets sent (there's nothing better to put on
    // the wire), but it must come back NACKed rather than silently ACKed
    // like a good byte.
    assert!(ready_and_read_ack(&mut bus, &line));
    read_sent_byte(&mut bus, &line);
    bus.poll();
    assert!(!ready_and_read_ack(&mut bus, &line));
}

/// Two slaves share one wired-AND line: whichever drives low wins a bit, so
/// a released ('1') bit can be overridden by a competitor's low ('0') bit.
/// This models that by combining both mocks' driven state into what each
/// side observes as the line's external level.
fn sync_wired_and(a: &MockLine, b: &MockLine) {
    let a_sees = if b.is_driven_low() {
        Level::Low
    } else {
        Level::High
    };
    let b_sees = if a.is_driven_low() {
        Level::Low
    } else {
        Level::High
    };
    a.set_external_level(a_sees);
    b.set_external_level(b_sees);
}

#[test]
fn two_node_enumeration_lowest_id_wins_arbitration() {
    // The IDs differ only in the top bit of the first byte, so arbitration
    // resolves on the very first bit sent: `hi` loses immediately and mutes
    // itself for the rest of this round.
    let id_lo = [0x00u8, 0x11, 0x22, 0x33];
    let id_hi = [0x80u8, 0x99, 0xaa, 0xbb];

    let mut store_lo = id_lo.to_vec();
    store_lo.extend_from_slice(&[0u8; 4]);
    let mut store_hi = id_hi.to_vec();
    store_hi.extend_from_slice(&[0u8; 4]);

    let line_lo = MockLine::new();
    let line_hi = MockLine::new();
    let mut lo = Engine::new(
        line_lo.clone(),
        MockStore::new(store_lo),
        Protocol::reference(),
        Timing::reference(),
    );
    let mut hi = Engine::new(
        line_hi.clone(),
        MockStore::new(store_hi),
        Protocol::reference(),
        Timing::reference(),
    );

    line_lo.set_external_level(Level::Low);
    line_hi.set_external_level(Level::Low);
    lo.on_timer_overflow();
    hi.on_timer_overflow();

    // Master's broadcast enumerate command, identical on both lines.
    for i in (0..8).rev() {
        let level = if (BC_ENUMERATE >> i) & 1 != 0 {
            Level::High
        } else {
            Level::Low
        };
        line_lo.set_external_level(level);
        line_hi.set_external_level(level);
        lo.on_falling_edge();
        hi.on_falling_edge();
        lo.on_alarm_sample();
        hi.on_alarm_sample();
    }
    let level = if odd_parity_bit(BC_ENUMERATE) {
        Level::High
    } else {
        Level::Low
    };
    line_lo.set_external_level(level);
    line_hi.set_external_level(level);
    lo.on_falling_edge();
    hi.on_falling_edge();
    lo.on_alarm_sample();
    hi.on_alarm_sample();
    lo.poll();
    hi.poll();

    for (i, (&lo_byte, &hi_byte)) in id_lo.iter().zip(id_hi.iter()).enumerate() {
        // Ready/Ack window before this byte.
        line_lo.set_external_level(Level::High);
        line_hi.set_external_level(Level::High);
        lo.on_falling_edge();
        hi.on_falling_edge();
        lo.on_alarm_sample();
        hi.on_alarm_sample();
        lo.on_falling_edge();
        hi.on_falling_edge();
        release_if_low(&mut lo, &line_lo);
        release_if_low(&mut hi, &line_hi);
        lo.on_falling_edge();
        hi.on_falling_edge();
        release_if_low(&mut lo, &line_lo);
        release_if_low(&mut hi, &line_hi);

        if i == 0 {
            // MSB: lo sends 0 (drives low), hi sends 1 (releases, then
            // samples to check for a collision).
            assert_eq!(lo_byte & 0x80, 0);
            assert_ne!(hi_byte & 0x80, 0);
            lo.on_falling_edge();
            hi.on_falling_edge();
            sync_wired_and(&line_lo, &line_hi);
            hi.on_alarm_sample();
            assert!(hi.flags().contains(backpack_bus::Flags::MUTE));
            release_if_low(&mut lo, &line_lo);

            // Remaining 7 data bits + parity: hi is muted and drives
            // nothing, lo keeps sending its own (all-zero) bits.
            for _ in 0..8 {
                lo.on_falling_edge();
                hi.on_falling_edge();
                release_if_low(&mut lo, &line_lo);
                release_if_low(&mut hi, &line_hi);
            }
        } else {
            for _ in 0..9 {
                lo.on_falling_edge();
                hi.on_falling_edge();
                release_if_low(&mut lo, &line_lo);
                release_if_low(&mut hi, &line_hi);
            }
        }
        lo.poll();
        hi.poll();
    }

    // Final Ready/Ack window: finalizes `lo`'s last byte (winner, goes
    // idle+enumerated) and `hi`'s mute-clearing bookkeeping (its address
    // bumps and it's ready to retry in a fresh round).
    line_lo.set_external_level(Level::High);
    line_hi.set_external_level(Level::High);
    lo.on_falling_edge();
    hi.on_falling_edge();
    lo.on_alarm_sample();
    hi.on_alarm_sample();
    lo.on_falling_edge();
    hi.on_falling_edge();
    release_if_low(&mut lo, &line_lo);
    release_if_low(&mut hi, &line_hi);
    lo.on_falling_edge();
    hi.on_falling_edge();
    release_if_low(&mut lo, &line_lo);
    release_if_low(&mut hi, &line_hi);

    assert!(lo.is_enumerated());
    assert_eq!(lo.bus_addr(), 0);
    assert_eq!(lo.action(), backpack_bus::Action::Idle);

    assert!(!hi.is_enumerated());
    assert_eq!(hi.bus_addr(), 1);
    assert!(!hi.flags().contains(backpack_bus::Flags::MUTE));
}

#[test]
fn idle_line_enters_deep_sleep_and_restores_edge_wake_on_next_edge() {
    let (mut bus, line) = new_bus(&[0u8; 8]);

    line.set_external_level(Level::High);
    bus.on_timer_overflow();

    assert_eq!(line.deep_sleeps(), 1);
    assert!(!line.is_wake_edge_triggered());

    // Any subsequent falling edge restores edge-triggered wake before
    // dispatching, regardless of what action it finds the engine in.
    line.set_external_level(Level::Low);
    bus.on_falling_edge();
    assert!(line.is_wake_edge_triggered());
}
