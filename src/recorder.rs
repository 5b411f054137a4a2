//! Measurement recorders.
//!
//! A recorder consumes one measurement at a time and forwards, stores or caches it. The
//! data store drives them through the closed [`Recorder`] enum:
//!
//! | Recorder            | Sink                | Wire form                        |
//! |---------------------|---------------------|----------------------------------|
//! | [`WiFiRecorder`]    | WiFi companion chip | `0x00`, COBS(frame), `0x00`      |
//! | [`SerialRecorder`]  | direct serial port  | raw frame                        |
//! | [`SdCardRecorder`]  | log file on SD card | raw frame or `source,value\n`    |
//! | [`CacheRecorder`]   | memory              | latest value per device          |
//!
//! Every recorder is a [`Component`] and refuses measurements unless it is running.

use core::fmt::Write;

use heapless::String;

use crate::cobs;
use crate::consts::{
    ENCODED_FRAME_MAX_LEN, FRAME_DELIMITER, FRAME_MAX_LEN, SD_CSV_LINE_LEN, SD_LOG_FILE_NAME,
    SERIAL_TX_TIMEOUT_MS,
};
use crate::error::RecordError;
use crate::frame;
use crate::lifecycle::{Component, ComponentState, StateMachine};
use crate::measurement::{Measurement, MeasurementDeviceId};
use crate::platform::Platform;
use crate::sdcard::{FileOpenMode, SdCard};
use crate::serial::SerialPort;

fn ensure_running<C: Component + ?Sized>(c: &C) -> Result<(), RecordError> {
    match c.state() {
        ComponentState::Running => Ok(()),
        state => Err(RecordError::NotRunning(state)),
    }
}

macro_rules! passive_hooks {
    () => {
        fn on_init(&mut self) -> bool {
            true
        }

        fn on_start(&mut self) -> bool {
            true
        }

        fn on_stop(&mut self) -> bool {
            true
        }

        fn on_reset(&mut self) -> bool {
            true
        }
    };
}

/// Sends each measurement to the WiFi companion chip.
///
/// The frame is COBS-stuffed and sent between two delimiters in a single blocking transfer.
/// A failed transfer is reported and not retried.
#[derive(Debug)]
pub struct WiFiRecorder<S> {
    sm: StateMachine,
    port: S,
    timeout_ms: u32,
}

impl<S: SerialPort> WiFiRecorder<S> {
    /// Creates a recorder using [`SERIAL_TX_TIMEOUT_MS`].
    pub fn new(port: S) -> Self {
        Self::with_timeout(port, SERIAL_TX_TIMEOUT_MS)
    }

    /// Creates a recorder with its own transmit timeout.
    pub fn with_timeout(port: S, timeout_ms: u32) -> Self {
        Self {
            sm: StateMachine::new(),
            port,
            timeout_ms,
        }
    }

    /// The serial port.
    pub fn port(&self) -> &S {
        &self.port
    }

    /// The serial port, mutably.
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Serializes, stuffs and sends `measurement`.
    pub fn notify(&mut self, measurement: &Measurement) -> Result<(), RecordError> {
        ensure_running(self)?;
        let mut raw = [0u8; FRAME_MAX_LEN];
        let n = frame::serialize(measurement, &mut raw)?;
        let mut wire = [0u8; ENCODED_FRAME_MAX_LEN + 1];
        wire[0] = FRAME_DELIMITER;
        let k = cobs::encode(&raw[..n], &mut wire[1..])?;
        self.port.transmit(&wire[..=k], self.timeout_ms)?;
        Ok(())
    }
}

impl<S: SerialPort> Component for WiFiRecorder<S> {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    passive_hooks!();
}

/// Writes each measurement as a raw frame to a serial port.
#[derive(Debug)]
pub struct SerialRecorder<S> {
    sm: StateMachine,
    port: S,
    timeout_ms: u32,
}

impl<S: SerialPort> SerialRecorder<S> {
    /// Creates a recorder using [`SERIAL_TX_TIMEOUT_MS`].
    pub fn new(port: S) -> Self {
        Self {
            sm: StateMachine::new(),
            port,
            timeout_ms: SERIAL_TX_TIMEOUT_MS,
        }
    }

    /// The serial port.
    pub fn port(&self) -> &S {
        &self.port
    }

    /// The serial port, mutably.
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Serializes and sends `measurement`.
    pub fn notify(&mut self, measurement: &Measurement) -> Result<(), RecordError> {
        ensure_running(self)?;
        let mut raw = [0u8; FRAME_MAX_LEN];
        let n = frame::serialize(measurement, &mut raw)?;
        self.port.transmit(&raw[..n], self.timeout_ms)?;
        Ok(())
    }
}

impl<S: SerialPort> Component for SerialRecorder<S> {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    passive_hooks!();
}

/// What the SD card recorder writes per measurement.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SdRecordFormat {
    /// The serialized frame, as sent over serial.
    #[default]
    Frame,
    /// A text line `source,value\n`.
    Csv,
}

/// Appends each measurement to [`SD_LOG_FILE_NAME`].
///
/// The card is mounted on init and unmounted on reset; the file is open exactly while the
/// recorder is running. Resetting a running recorder closes the file before unmounting.
#[derive(Debug)]
pub struct SdCardRecorder<D> {
    sm: StateMachine,
    card: D,
    format: SdRecordFormat,
}

impl<D: SdCard> SdCardRecorder<D> {
    /// Creates a recorder writing `format` records to `card`.
    pub fn new(card: D, format: SdRecordFormat) -> Self {
        Self {
            sm: StateMachine::new(),
            card,
            format,
        }
    }

    /// The SD card.
    pub fn card(&self) -> &D {
        &self.card
    }

    /// The SD card, mutably.
    pub fn card_mut(&mut self) -> &mut D {
        &mut self.card
    }

    /// Writes one record for `measurement`.
    pub fn notify(&mut self, measurement: &Measurement) -> Result<(), RecordError> {
        ensure_running(self)?;
        match self.format {
            SdRecordFormat::Frame => {
                let mut raw = [0u8; FRAME_MAX_LEN];
                let n = frame::serialize(measurement, &mut raw)?;
                self.card.write(&raw[..n])?;
            }
            SdRecordFormat::Csv => {
                let mut line: String<SD_CSV_LINE_LEN> = String::new();
                writeln!(
                    line,
                    "{},{}",
                    measurement.source.as_u8(),
                    measurement.value.as_u32()
                )
                .map_err(|_| RecordError::LineOverflow)?;
                self.card.write(line.as_bytes())?;
            }
        }
        Ok(())
    }
}

impl<D: SdCard> Component for SdCardRecorder<D> {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    fn on_init(&mut self) -> bool {
        self.card
            .mount()
            .map_err(|e| warn!("sd recorder: mount failed, {:?}", e))
            .is_ok()
    }

    fn on_start(&mut self) -> bool {
        self.card
            .open_file(SD_LOG_FILE_NAME, FileOpenMode::Append)
            .map_err(|e| warn!("sd recorder: open failed, {:?}", e))
            .is_ok()
    }

    fn on_stop(&mut self) -> bool {
        self.card
            .close_file()
            .map_err(|e| warn!("sd recorder: close failed, {:?}", e))
            .is_ok()
    }

    fn on_reset(&mut self) -> bool {
        if self.state() == ComponentState::Running {
            if let Err(e) = self.card.close_file() {
                warn!("sd recorder: close before unmount failed, {:?}", e);
            }
        }
        self.card
            .unmount()
            .map_err(|e| warn!("sd recorder: unmount failed, {:?}", e))
            .is_ok()
    }
}

/// Read access to the latest value seen per device.
pub trait MeasurementReader {
    /// Latest value from `source` widened to `u32`, or 0 if none was seen.
    fn latest_measurement(&self, source: MeasurementDeviceId) -> u32;
}

/// Keeps the latest value of every device for the display.
#[derive(Debug, Default)]
pub struct CacheRecorder {
    sm: StateMachine,
    latest: [u32; MeasurementDeviceId::COUNT],
}

impl CacheRecorder {
    /// Creates an empty cache.
    pub const fn new() -> Self {
        Self {
            sm: StateMachine::new(),
            latest: [0; MeasurementDeviceId::COUNT],
        }
    }

    /// Stores `measurement` as the latest value of its device.
    pub fn notify(&mut self, measurement: &Measurement) -> Result<(), RecordError> {
        ensure_running(self)?;
        self.latest[measurement.source.index()] = measurement.value.as_u32();
        Ok(())
    }
}

impl MeasurementReader for CacheRecorder {
    fn latest_measurement(&self, source: MeasurementDeviceId) -> u32 {
        self.latest[source.index()]
    }
}

impl Component for CacheRecorder {
    fn state_machine(&self) -> &StateMachine {
        &self.sm
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.sm
    }

    fn on_init(&mut self) -> bool {
        true
    }

    fn on_start(&mut self) -> bool {
        true
    }

    fn on_stop(&mut self) -> bool {
        true
    }

    fn on_reset(&mut self) -> bool {
        self.latest = [0; MeasurementDeviceId::COUNT];
        true
    }
}

/// Which kind of recorder a [`Recorder`] wraps.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RecorderKind {
    /// [`WiFiRecorder`].
    WiFi,
    /// [`SerialRecorder`].
    Serial,
    /// [`SdCardRecorder`].
    SdCard,
    /// [`CacheRecorder`].
    Cache,
}

/// A recorder registered with the data store.
#[derive(Debug)]
pub enum Recorder<'a, P: Platform> {
    /// Forwards to the WiFi companion chip.
    WiFi(&'a mut WiFiRecorder<P::WiFiPort>),
    /// Writes raw frames to a serial port.
    Serial(&'a mut SerialRecorder<P::DirectPort>),
    /// Appends to the SD card log.
    SdCard(&'a mut SdCardRecorder<P::SdCard>),
    /// Caches the latest values.
    Cache(&'a mut CacheRecorder),
}

impl<P: Platform> Recorder<'_, P> {
    /// The wrapped recorder's kind.
    pub fn kind(&self) -> RecorderKind {
        match self {
            Self::WiFi(_) => RecorderKind::WiFi,
            Self::Serial(_) => RecorderKind::Serial,
            Self::SdCard(_) => RecorderKind::SdCard,
            Self::Cache(_) => RecorderKind::Cache,
        }
    }

    /// Hands `measurement` to the wrapped recorder.
    pub fn notify(&mut self, measurement: &Measurement) -> Result<(), RecordError> {
        match self {
            Self::WiFi(r) => r.notify(measurement),
            Self::Serial(r) => r.notify(measurement),
            Self::SdCard(r) => r.notify(measurement),
            Self::Cache(r) => r.notify(measurement),
        }
    }

    /// The cache, if this is a cache recorder.
    pub fn as_reader(&self) -> Option<&dyn MeasurementReader> {
        match self {
            Self::Cache(r) => Some(&**r),
            Self::WiFi(_) | Self::Serial(_) | Self::SdCard(_) => None,
        }
    }
}

impl<P: Platform> Component for Recorder<'_, P> {
    fn state_machine(&self) -> &StateMachine {
        match self {
            Self::WiFi(r) => r.state_machine(),
            Self::Serial(r) => r.state_machine(),
            Self::SdCard(r) => r.state_machine(),
            Self::Cache(r) => r.state_machine(),
        }
    }

    fn state_machine_mut(&mut self) -> &mut StateMachine {
        match self {
            Self::WiFi(r) => r.state_machine_mut(),
            Self::Serial(r) => r.state_machine_mut(),
            Self::SdCard(r) => r.state_machine_mut(),
            Self::Cache(r) => r.state_machine_mut(),
        }
    }

    fn on_init(&mut self) -> bool {
        match self {
            Self::WiFi(r) => r.on_init(),
            Self::Serial(r) => r.on_init(),
            Self::SdCard(r) => r.on_init(),
            Self::Cache(r) => r.on_init(),
        }
    }

    fn on_start(&mut self) -> bool {
        match self {
            Self::WiFi(r) => r.on_start(),
            Self::Serial(r) => r.on_start(),
            Self::SdCard(r) => r.on_start(),
            Self::Cache(r) => r.on_start(),
        }
    }

    fn on_stop(&mut self) -> bool {
        match self {
            Self::WiFi(r) => r.on_stop(),
            Self::Serial(r) => r.on_stop(),
            Self::SdCard(r) => r.on_stop(),
            Self::Cache(r) => r.on_stop(),
        }
    }

    fn on_reset(&mut self) -> bool {
        match self {
            Self::WiFi(r) => r.on_reset(),
            Self::Serial(r) => r.on_reset(),
            Self::SdCard(r) => r.on_reset(),
            Self::Cache(r) => r.on_reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SdCardError, SerialError};
    use crate::mocks::{MockSdCard, MockSerial, TestPlatform};

    fn running<C: Component>(c: &mut C) {
        c.init().unwrap();
        c.start().unwrap();
    }

    fn sample() -> Measurement {
        Measurement::new(MeasurementDeviceId::PulseCounter2, 0x1234u16)
    }

    #[test]
    fn test_wifi_sends_delimited_cobs_frame() {
        let mut rec = WiFiRecorder::new(MockSerial::new());
        running(&mut rec);
        rec.notify(&sample()).unwrap();

        let sent = rec.port().sent();
        assert_eq!(sent.first(), Some(&0x00));
        assert_eq!(sent.last(), Some(&0x00));
        assert!(!sent[1..sent.len() - 1].contains(&0x00));
        assert_eq!(rec.port().last_timeout_ms, Some(SERIAL_TX_TIMEOUT_MS));

        let mut decoded = [0u8; FRAME_MAX_LEN];
        let n = cobs::decode(&sent[1..], &mut decoded).unwrap();
        assert_eq!(frame::parse(&decoded[..n]), Ok(sample()));
    }

    #[test]
    fn test_wifi_reports_transmit_failure() {
        let mut rec = WiFiRecorder::with_timeout(MockSerial::new(), 5);
        running(&mut rec);
        rec.port_mut().fail_transmit = Some(SerialError::Busy);
        assert_eq!(
            rec.notify(&sample()),
            Err(RecordError::Serial(SerialError::Busy))
        );
        assert_eq!(rec.port().last_timeout_ms, Some(5));
    }

    #[test]
    fn test_recorders_refuse_until_running() {
        let mut rec = SerialRecorder::new(MockSerial::new());
        assert_eq!(
            rec.notify(&sample()),
            Err(RecordError::NotRunning(ComponentState::Reset))
        );
        assert_eq!(rec.port().transmits, 0);
        running(&mut rec);
        rec.notify(&sample()).unwrap();
        assert_eq!(rec.port().sent().len(), 9);
        assert_eq!(rec.port().sent()[2], 0x01);
    }

    #[test]
    fn test_sd_card_lifecycle_drives_card() {
        let mut rec = SdCardRecorder::new(MockSdCard::new(), SdRecordFormat::Frame);
        rec.init().unwrap();
        assert!(rec.card().mounted);
        rec.start().unwrap();
        assert_eq!(rec.card().open, Some(FileOpenMode::Append));
        assert_eq!(rec.card().name.as_str(), SD_LOG_FILE_NAME);
        rec.notify(&sample()).unwrap();
        assert_eq!(rec.card().data.len(), 9);
        rec.stop().unwrap();
        assert_eq!(rec.card().open, None);
        rec.reset().unwrap();
        assert!(!rec.card().mounted);
    }

    #[test]
    fn test_sd_card_reset_while_running_closes_and_unmounts() {
        let mut rec = SdCardRecorder::new(MockSdCard::new(), SdRecordFormat::Frame);
        running(&mut rec);
        rec.reset().unwrap();
        assert_eq!(rec.state(), ComponentState::Reset);
        assert_eq!(rec.card().open, None);
        assert!(!rec.card().mounted);
    }

    #[test]
    fn test_sd_card_failed_stop_recovers_through_reset() {
        let mut rec = SdCardRecorder::new(MockSdCard::new(), SdRecordFormat::Frame);
        running(&mut rec);
        rec.card_mut().fail_close = true;
        assert!(rec.stop().is_err());
        assert_eq!(rec.state(), ComponentState::Running);

        rec.card_mut().fail_close = false;
        rec.reset().unwrap();
        assert_eq!(rec.state(), ComponentState::Reset);
        assert!(!rec.card().mounted);

        running(&mut rec);
        assert_eq!(rec.card().open, Some(FileOpenMode::Append));
    }

    #[test]
    fn test_sd_card_csv_line() {
        let mut rec = SdCardRecorder::new(MockSdCard::new(), SdRecordFormat::Csv);
        running(&mut rec);
        rec.notify(&sample()).unwrap();
        rec.notify(&Measurement::new(MeasurementDeviceId::Serial1, u32::MAX))
            .unwrap();
        assert_eq!(rec.card().data.as_slice(), b"1,4660\n4,4294967295\n");
    }

    #[test]
    fn test_sd_card_mount_failure_blocks_init() {
        let mut card = MockSdCard::new();
        card.fail_mount = true;
        let mut rec = SdCardRecorder::new(card, SdRecordFormat::Frame);
        assert!(rec.init().is_err());
        assert_eq!(rec.state(), ComponentState::Reset);
    }

    #[test]
    fn test_sd_card_write_error_surfaces() {
        let mut card = MockSdCard::new();
        card.fail_write = Some(SdCardError::SyncFailed);
        let mut rec = SdCardRecorder::new(card, SdRecordFormat::Frame);
        running(&mut rec);
        assert_eq!(
            rec.notify(&sample()),
            Err(RecordError::SdCard(SdCardError::SyncFailed))
        );
    }

    #[test]
    fn test_cache_keeps_latest_per_device() {
        let mut cache = CacheRecorder::new();
        running(&mut cache);
        cache.notify(&sample()).unwrap();
        cache
            .notify(&Measurement::new(MeasurementDeviceId::PulseCounter2, 7u8))
            .unwrap();
        cache
            .notify(&Measurement::new(MeasurementDeviceId::Serial1, 99u32))
            .unwrap();
        assert_eq!(cache.latest_measurement(MeasurementDeviceId::PulseCounter2), 7);
        assert_eq!(cache.latest_measurement(MeasurementDeviceId::Serial1), 99);
        assert_eq!(cache.latest_measurement(MeasurementDeviceId::PulseCounter1), 0);

        cache.stop().unwrap();
        cache.reset().unwrap();
        assert_eq!(cache.latest_measurement(MeasurementDeviceId::Serial1), 0);
    }

    #[test]
    fn test_recorder_enum_kind_and_reader() {
        let mut cache = CacheRecorder::new();
        let mut wifi = WiFiRecorder::new(MockSerial::new());
        let mut recorders: [Recorder<'_, TestPlatform>; 2] =
            [Recorder::Cache(&mut cache), Recorder::WiFi(&mut wifi)];
        assert_eq!(recorders[0].kind(), RecorderKind::Cache);
        assert_eq!(recorders[1].kind(), RecorderKind::WiFi);
        assert!(recorders[1].as_reader().is_none());
        for r in recorders.iter_mut() {
            running(r);
            r.notify(&sample()).unwrap();
        }
        let reader = recorders[0].as_reader().unwrap();
        assert_eq!(reader.latest_measurement(MeasurementDeviceId::PulseCounter2), 0x1234);
    }
}
