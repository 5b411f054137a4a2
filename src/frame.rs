//! Length/source/value frame codec.
//!
//! A frame carries exactly one [`Measurement`]:
//!
//! ```text
//! [ Length u16 BE ][ Source u8 ][ Value 1|2|4 bytes LE ][ CRC32 u32 BE ]
//! ```
//!
//! `Length` is the size of the whole frame. The CRC covers every byte in front of it.
//!
//! ## Functions
//!
//! - [`serialize`]: writes a frame for a measurement, all or nothing
//! - [`verify`]: checks the length field and the CRC of a decoded frame
//! - [`parse`]: verifies a frame and turns it back into a [`Measurement`]

use crate::consts::{
    FRAME_CRC_FIELD_LEN, FRAME_LENGTH_FIELD_LEN, FRAME_MIN_LEN, FRAME_OVERHEAD_LEN,
    FRAME_SOURCE_FIELD_LEN,
};
use crate::crc::crc32;
use crate::error::FrameError;
use crate::measurement::{Measurement, MeasurementDeviceId, MeasurementValue};

const SOURCE_OFFSET: usize = FRAME_LENGTH_FIELD_LEN;
const VALUE_OFFSET: usize = SOURCE_OFFSET + FRAME_SOURCE_FIELD_LEN;

/// Size of the frame that [`serialize`] produces for `measurement`.
pub const fn frame_len(measurement: &Measurement) -> usize {
    FRAME_OVERHEAD_LEN + measurement.value.width()
}

/// Writes the frame for `measurement` to the front of `out`.
///
/// # Arguments
/// * `measurement` - the measurement to encode
/// * `out` - destination buffer
///
/// # Returns
/// The frame length in bytes.
///
/// # Errors
/// [`FrameError::BufferTooSmall`] if `out` cannot hold the frame. `out` is not touched.
pub fn serialize(measurement: &Measurement, out: &mut [u8]) -> Result<usize, FrameError> {
    let len = frame_len(measurement);
    if out.len() < len {
        return Err(FrameError::BufferTooSmall {
            required: len,
            available: out.len(),
        });
    }

    // `len` is at most FRAME_MAX_LEN, well inside u16.
    out[..SOURCE_OFFSET].copy_from_slice(&(len as u16).to_be_bytes());
    out[SOURCE_OFFSET] = measurement.source.as_u8();
    let crc_offset = VALUE_OFFSET + measurement.value.write_le(&mut out[VALUE_OFFSET..]);
    let crc = crc32(&out[..crc_offset]);
    out[crc_offset..len].copy_from_slice(&crc.to_be_bytes());
    Ok(len)
}

/// Checks a decoded frame and returns its value bytes.
///
/// # Errors
/// - [`FrameError::LengthMismatch`] if the frame is shorter than [`FRAME_MIN_LEN`] or the
///   length field disagrees with `frame.len()`
/// - [`FrameError::CrcMismatch`] if the trailer does not match the content
pub fn verify(frame: &[u8]) -> Result<&[u8], FrameError> {
    if frame.len() < FRAME_MIN_LEN {
        return Err(FrameError::LengthMismatch {
            declared: FRAME_MIN_LEN,
            actual: frame.len(),
        });
    }
    let declared = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    if declared != frame.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: frame.len(),
        });
    }

    let (content, trailer) = frame.split_at(frame.len() - FRAME_CRC_FIELD_LEN);
    let received = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = crc32(content);
    if received != computed {
        return Err(FrameError::CrcMismatch { received, computed });
    }
    Ok(content.get(VALUE_OFFSET..).unwrap_or(&[]))
}

/// Verifies a decoded frame and rebuilds the measurement it carries.
///
/// # Errors
/// Everything [`verify`] reports, plus [`FrameError::UnknownSource`] and
/// [`FrameError::UnsupportedWidth`].
pub fn parse(frame: &[u8]) -> Result<Measurement, FrameError> {
    let value = verify(frame)?;
    // A minimum-length frame has neither source nor value.
    if frame.len() == FRAME_MIN_LEN {
        return Err(FrameError::UnsupportedWidth(0));
    }
    let source = MeasurementDeviceId::try_from(frame[SOURCE_OFFSET])?;
    Ok(Measurement {
        source,
        value: MeasurementValue::from_le(value)?,
    })
}
