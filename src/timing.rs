//! Bit-window timing, expressed in ticks of the platform's free-running timer.
//!
//! The reference firmware derives these from a 75 kHz tick (a prescaled AVR
//! clock): `DATA_WRITE` ~= 600 us, `DATA_SAMPLE` ~= 300 us (write/2),
//! `RESET_SAMPLE` ~= 1400 us (~2.3x write). [`Timing::from_tick_rate`]
//! preserves those ratios for any tick rate so the engine isn't tied to one
//! platform's clock tree.

use crate::time::Hertz;

/// Number of timer ticks spent driving a '0' bit, an Ack/Nack-low bit, or a
/// stall signal low.
const REFERENCE_DATA_WRITE_US: u32 = 600;
/// Offset from the falling edge, in timer ticks, at which the line is sampled.
const REFERENCE_DATA_SAMPLE_US: u32 = 300;
/// Continuous-low duration, in timer ticks, that is interpreted as a bus reset.
const REFERENCE_RESET_SAMPLE_US: u32 = 1400;
/// Reference tick rate the above constants were measured against.
const REFERENCE_TICK_HZ: u32 = 75_000;

/// Tick counts for one bit window, scaled to a given timer tick rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Ticks into the bit window at which `ALARM_RELEASE` fires.
    pub data_write: u32,
    /// Ticks into the bit window at which `ALARM_SAMPLE` fires.
    pub data_sample: u32,
    /// Ticks of continuous low, with no falling edge, that signal a bus reset.
    pub reset_sample: u32,
}

impl Timing {
    /// Reference timing (75 kHz tick, `DATA_WRITE` ~= 600 us).
    pub const fn reference() -> Self {
        Timing {
            data_write: ticks_for(REFERENCE_DATA_WRITE_US, REFERENCE_TICK_HZ),
            data_sample: ticks_for(REFERENCE_DATA_SAMPLE_US, REFERENCE_TICK_HZ),
            reset_sample: ticks_for(REFERENCE_RESET_SAMPLE_US, REFERENCE_TICK_HZ),
        }
    }

    /// Derive tick counts for an arbitrary timer tick rate, preserving the
    /// reference ratios (sample ~= write/2, reset ~= 2.3x write).
    pub fn from_tick_rate(tick_hz: Hertz) -> Self {
        let hz = tick_hz.raw();
        Timing {
            data_write: ticks_for(REFERENCE_DATA_WRITE_US, hz),
            data_sample: ticks_for(REFERENCE_DATA_SAMPLE_US, hz),
            reset_sample: ticks_for(REFERENCE_RESET_SAMPLE_US, hz),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::reference()
    }
}

const fn ticks_for(us: u32, tick_hz: u32) -> u32 {
    // tick_hz is in Hz, us in microseconds: ticks = us * tick_hz / 1_000_000
    ((us as u64 * tick_hz as u64) / 1_000_000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_matches_firmware_constants() {
        let t = Timing::reference();
        assert_eq!(t.data_write, 45);
        assert_eq!(t.data_sample, 22);
        assert_eq!(t.reset_sample, 105);
    }

    #[test]
    fn ratios_preserved_at_other_tick_rates() {
        let t = Timing::from_tick_rate(Hertz::from_raw(1_000_000));
        assert_eq!(t.data_write, 600);
        assert_eq!(t.data_sample, 300);
        assert_eq!(t.reset_sample, 1400);
    }
}
