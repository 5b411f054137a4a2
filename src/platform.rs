//! Hardware binding.
//!
//! A board names its concrete peripheral types once, in a [`Platform`] implementation, and
//! the [`Source`](crate::source::Source) and [`Recorder`](crate::recorder::Recorder)
//! variants pick them up from there.
//!
//! ```rust,ignore
//! struct Board;
//!
//! impl Platform for Board {
//!     type PulseCounter = &'static PulseCount;
//!     type InstrumentPort = Usart2;
//!     type RxBuffer = &'static mut [u8; RX_BUFFER_LEN];
//!     type WiFiPort = Usart1;
//!     type DirectPort = Usart3;
//!     type SdCard = FatFs;
//! }
//! ```

use core::fmt::Debug;

use crate::pulse::PulseCounter;
use crate::sdcard::SdCard;
use crate::serial::SerialPort;

/// The peripheral types of one board.
pub trait Platform {
    /// Count behind each BNC input.
    type PulseCounter: PulseCounter + Debug;
    /// Serial link to the attached instrument.
    type InstrumentPort: SerialPort + Debug;
    /// Receive buffer for the instrument link.
    type RxBuffer: AsRef<[u8]> + AsMut<[u8]> + Debug;
    /// Serial link to the WiFi companion chip.
    type WiFiPort: SerialPort + Debug;
    /// Serial port that measurements are written to unframed.
    type DirectPort: SerialPort + Debug;
    /// SD card with its filesystem.
    type SdCard: SdCard + Debug;
}
