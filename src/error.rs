//! Error types for the measurement pipeline.
//!
//! Every operation in this crate reports failure through one of these enums instead of
//! panicking. They are all `Copy`, carry no heap data and work without `std`.

use thiserror::Error;

use crate::lifecycle::ComponentState;

/// A lifecycle request that was refused. The component state is unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LifecycleError {
    /// The requested transition is not legal from the current state.
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// State the component was in.
        from: ComponentState,
        /// State that was requested.
        to: ComponentState,
    },
    /// The component's hook reported failure, so the transition was abandoned.
    #[error("hook failed while moving to {target:?}")]
    HookFailed {
        /// State that was requested.
        target: ComponentState,
    },
    /// Periodic work was requested while the component was not running.
    #[error("component is not running (state {state:?})")]
    NotRunning {
        /// State the component was in.
        state: ComponentState,
    },
}

/// COBS encoding or decoding failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CobsError {
    /// The output buffer cannot hold the worst case result.
    #[error("output buffer too small: need {required} bytes, have {available}")]
    OutputTooSmall {
        /// Bytes the operation needs.
        required: usize,
        /// Bytes the caller provided.
        available: usize,
    },
    /// There was nothing to decode.
    #[error("empty input")]
    Empty,
    /// A zero byte, possibly a zero code byte, was found inside the stuffed body.
    #[error("unexpected zero byte at offset {offset}")]
    UnexpectedZero {
        /// Offset of the zero byte in the input.
        offset: usize,
    },
    /// A code byte runs past the end of the stuffed body.
    #[error("malformed stuffed data")]
    Malformed,
}

/// Frame serialization or validation failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameError {
    /// The output buffer cannot hold the frame.
    #[error("buffer too small: frame needs {required} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes the frame needs.
        required: usize,
        /// Bytes the caller provided.
        available: usize,
    },
    /// The frame is too short, or its length field disagrees with its size.
    #[error("length mismatch: header says {declared}, frame has {actual}")]
    LengthMismatch {
        /// Value of the length field, or the minimum length if the field is missing.
        declared: usize,
        /// Number of bytes actually present.
        actual: usize,
    },
    /// The CRC trailer does not match the frame content.
    #[error("CRC mismatch: frame carries {received:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// CRC carried in the frame.
        received: u32,
        /// CRC computed over the frame content.
        computed: u32,
    },
    /// The value field is not 1, 2 or 4 bytes wide.
    #[error("unsupported value width {0}")]
    UnsupportedWidth(usize),
    /// The source byte does not name a known device.
    #[error("unknown source id {0}")]
    UnknownSource(u8),
    /// No verified frame is available.
    #[error("no complete frame")]
    Incomplete,
}

/// A fixed-capacity registry refused an operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RegistryError {
    /// Every slot is taken.
    #[error("registry full ({capacity} entries)")]
    Full {
        /// Compile-time capacity of the registry.
        capacity: usize,
    },
}

/// Non-`Ok` outcomes of a serial driver exchange.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SerialError {
    /// The HAL reported an error.
    #[error("error reported by the HAL")]
    ErrorFromHal,
    /// The peripheral is busy with another transfer.
    #[error("peripheral busy")]
    Busy,
    /// The exchange did not finish within its timeout.
    #[error("timed out")]
    Timeout,
    /// The driver is not in a mode that allows the exchange.
    #[error("driver in incorrect mode")]
    DriverInIncorrectMode,
    /// Anything else.
    #[error("unknown serial error")]
    ErrorUnknown,
}

/// Non-`Ok` outcomes of an SD card driver call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SdCardError {
    /// Empty file name or empty write.
    #[error("invalid parameter")]
    InvalidParameter,
    /// The filesystem is not mounted.
    #[error("filesystem not mounted")]
    NotMounted,
    /// Another file is already open.
    #[error("a file is already open")]
    AlreadyOpen,
    /// No file is open.
    #[error("no file open")]
    NoFileOpen,
    /// The file could not be opened.
    #[error("failed to open file")]
    OpenFailed,
    /// The file could not be closed.
    #[error("failed to close file")]
    CloseFailed,
    /// The write failed.
    #[error("write failed")]
    WriteFailed,
    /// Fewer bytes were written than requested.
    #[error("write incomplete")]
    WriteIncomplete,
    /// Flushing to the card failed.
    #[error("sync failed")]
    SyncFailed,
}

/// A recorder could not act on a measurement.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RecordError {
    /// The recorder is not running.
    #[error("recorder not running (state {0:?})")]
    NotRunning(ComponentState),
    /// The measurement could not be serialized.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The frame could not be stuffed.
    #[error(transparent)]
    Cobs(#[from] CobsError),
    /// The serial driver refused the transfer.
    #[error(transparent)]
    Serial(#[from] SerialError),
    /// The SD card driver refused the write.
    #[error(transparent)]
    SdCard(#[from] SdCardError),
    /// The text record did not fit its line buffer.
    #[error("record line overflow")]
    LineOverflow,
}
