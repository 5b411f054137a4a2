//! Constants used across the measurement pipeline.
//!
//! This module defines the wire-frame field widths, the buffer sizes derived from them,
//! registry capacities and driver timeouts. Everything here is fixed at build time; there
//! is no runtime configuration beyond constructor arguments.
//!
//! ## Frame layout
//!
//! ```text
//! +-------------+-----------+------------------+--------------+
//! | Length (BE) | Source    | Value (LE)       | CRC32 (BE)   |
//! | 2 bytes     | 1 byte    | 1, 2 or 4 bytes  | 4 bytes      |
//! +-------------+-----------+------------------+--------------+
//! ```
//!
//! `Length` counts the whole frame, itself and the CRC included. The CRC covers
//! `Length`, `Source` and `Value`. The frame is COBS-stuffed and terminated by a single
//! `0x00` delimiter before it goes out on a byte stream.

use crate::cobs::max_encoded_len;
use crate::measurement::MeasurementDeviceId;

/// Width (in bytes) of the big-endian length field at the start of every frame.
pub const FRAME_LENGTH_FIELD_LEN: usize = 2;

/// Width (in bytes) of the source identifier field.
pub const FRAME_SOURCE_FIELD_LEN: usize = 1;

/// Width (in bytes) of the big-endian CRC32 trailer.
pub const FRAME_CRC_FIELD_LEN: usize = 4;

/// Widest measurement value that can be carried by a frame (a `u32`).
pub const FRAME_MAX_VALUE_LEN: usize = 4;

/// Bytes of a frame that are not measurement value: length, source and CRC.
pub const FRAME_OVERHEAD_LEN: usize =
    FRAME_LENGTH_FIELD_LEN + FRAME_SOURCE_FIELD_LEN + FRAME_CRC_FIELD_LEN;

/// Smallest decoded byte count the receiver will even try to verify (length field plus CRC).
pub const FRAME_MIN_LEN: usize = FRAME_LENGTH_FIELD_LEN + FRAME_CRC_FIELD_LEN;

/// Largest frame the serializer can produce.
pub const FRAME_MAX_LEN: usize = FRAME_OVERHEAD_LEN + FRAME_MAX_VALUE_LEN;

/// Largest number of non-zero bytes a single COBS block can carry.
pub const COBS_MAX_BLOCK_LEN: usize = 254;

/// The frame delimiter. Never present inside a COBS-stuffed body.
pub const FRAME_DELIMITER: u8 = 0x00;

/// Worst case size of a stuffed and delimited frame. Sizes the transmit scratch buffer.
pub const ENCODED_FRAME_MAX_LEN: usize = max_encoded_len(FRAME_MAX_LEN);

/// Size of the receive buffer the frame receiver works in.
pub const RX_BUFFER_LEN: usize = 128;

/// Timeout handed to the serial driver for a single frame transmission.
pub const SERIAL_TX_TIMEOUT_MS: u32 = 1_000;

/// Maximum number of measurement sources the coordinator can poll.
pub const MAX_SOURCES: usize = MeasurementDeviceId::COUNT;

/// Maximum number of recorders the data store can notify.
pub const MAX_RECORDERS: usize = 4;

/// File the SD card recorder appends to.
pub const SD_LOG_FILE_NAME: &str = "0:/DAT01.TXT";

/// Capacity of the text line the SD card recorder formats in CSV mode.
pub const SD_CSV_LINE_LEN: usize = 24;
