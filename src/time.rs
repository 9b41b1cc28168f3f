//! Small time helpers shared by the bit engine and its timing configuration.

pub use fugit::HertzU32 as Hertz;
pub use fugit::MicrosDurationU32 as Micros;
