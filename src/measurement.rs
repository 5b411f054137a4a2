//! Measurement model.
//!
//! A [`Measurement`] is a small value type: which device produced it and what it read.
//! Sources create them, the coordinator copies them to every recorder, and nothing keeps
//! them beyond a single cycle.

use crate::error::FrameError;

/// Identifies the device a measurement came from.
///
/// The discriminants are the on-wire source byte and the index into per-device caches.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasurementDeviceId {
    /// First BNC pulse counter input.
    PulseCounter1 = 0,
    /// Second BNC pulse counter input.
    PulseCounter2 = 1,
    /// Third BNC pulse counter input.
    PulseCounter3 = 2,
    /// Fourth BNC pulse counter input.
    PulseCounter4 = 3,
    /// Instrument attached over the serial link.
    Serial1 = 4,
}

impl MeasurementDeviceId {
    /// Number of devices. Sizes every per-device array.
    pub const COUNT: usize = Self::ALL.len();

    /// Every device, in wire-id order.
    pub const ALL: [MeasurementDeviceId; 5] = [
        Self::PulseCounter1,
        Self::PulseCounter2,
        Self::PulseCounter3,
        Self::PulseCounter4,
        Self::Serial1,
    ];

    /// The wire byte for this device.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Position of this device in per-device arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for MeasurementDeviceId {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(FrameError::UnknownSource(id))
    }
}

/// A measured value. Its variant decides how many bytes it takes on the wire.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum MeasurementValue {
    /// 8-bit reading.
    U8(u8),
    /// 16-bit reading.
    U16(u16),
    /// 32-bit reading.
    U32(u32),
}

impl MeasurementValue {
    /// Byte width of the active variant.
    pub const fn width(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    /// The value widened to `u32`.
    pub const fn as_u32(&self) -> u32 {
        match *self {
            Self::U8(v) => v as u32,
            Self::U16(v) => v as u32,
            Self::U32(v) => v,
        }
    }

    /// Writes the value little-endian into the front of `out` and returns the byte count.
    ///
    /// `out` must hold at least [`width`](Self::width) bytes.
    pub(crate) fn write_le(&self, out: &mut [u8]) -> usize {
        match *self {
            Self::U8(v) => out[0] = v,
            Self::U16(v) => out[..2].copy_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
        }
        self.width()
    }

    /// Reads a little-endian value whose width is the length of `bytes`.
    pub(crate) fn from_le(bytes: &[u8]) -> Result<Self, FrameError> {
        match *bytes {
            [b] => Ok(Self::U8(b)),
            [b0, b1] => Ok(Self::U16(u16::from_le_bytes([b0, b1]))),
            [b0, b1, b2, b3] => Ok(Self::U32(u32::from_le_bytes([b0, b1, b2, b3]))),
            _ => Err(FrameError::UnsupportedWidth(bytes.len())),
        }
    }
}

impl From<u8> for MeasurementValue {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for MeasurementValue {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for MeasurementValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

/// One reading from one device.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Measurement {
    /// Device that produced the value.
    pub source: MeasurementDeviceId,
    /// The value itself.
    pub value: MeasurementValue,
}

impl Measurement {
    /// Creates a measurement.
    pub fn new(source: MeasurementDeviceId, value: impl Into<MeasurementValue>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }
}
