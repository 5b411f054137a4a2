//! CRC-32 (ISO-HDLC) used to protect every frame.
//!
//! **Polynomial**: 0x04C11DB7, processed reflected as 0xEDB88320
//! **Initial value**: 0xFFFFFFFF, **final xor**: 0xFFFFFFFF
//!
//! The transmitter and the receiver must agree bit for bit, so both sides go through
//! [`crc32`].

use ::crc::{CRC_32_ISO_HDLC, Crc};

const FRAME_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Computes the CRC-32 of `data`. Pure, no internal state.
pub fn crc32(data: &[u8]) -> u32 {
    FRAME_CRC.checksum(data)
}
