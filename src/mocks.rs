//! In-memory serial and SD card doubles for unit tests.

#![allow(dead_code)]

use heapless::{Deque, String, Vec};

use crate::consts::RX_BUFFER_LEN;
use crate::error::{SdCardError, SerialError};
use crate::platform::Platform;
use crate::pulse::PulseCount;
use crate::sdcard::{FileOpenMode, SdCard};
use crate::serial::SerialPort;

/// Serial port backed by a receive queue and a transmit log.
#[derive(Debug, Default)]
pub(crate) struct MockSerial {
    rx: Deque<u8, 512>,
    tx: Vec<u8, 512>,
    pub transmits: u32,
    pub last_timeout_ms: Option<u32>,
    pub fail_transmit: Option<SerialError>,
    pub fail_read: Option<SerialError>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.rx.push_back(b).unwrap();
        }
    }

    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl SerialPort for MockSerial {
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), SerialError> {
        self.transmits += 1;
        self.last_timeout_ms = Some(timeout_ms);
        if let Some(err) = self.fail_transmit {
            return Err(err);
        }
        self.tx.extend_from_slice(bytes).unwrap();
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), SerialError> {
        self.last_timeout_ms = Some(timeout_ms);
        if self.rx.len() < buf.len() {
            return Err(SerialError::Timeout);
        }
        for slot in buf.iter_mut() {
            *slot = self.rx.pop_front().unwrap();
        }
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, SerialError> {
        if let Some(err) = self.fail_read {
            return Err(nb::Error::Other(err));
        }
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// SD card holding a single file in memory.
#[derive(Debug, Default)]
pub(crate) struct MockSdCard {
    pub mounted: bool,
    pub open: Option<FileOpenMode>,
    pub name: String<16>,
    pub data: Vec<u8, 256>,
    pub writes: u32,
    pub fail_mount: bool,
    pub fail_close: bool,
    pub fail_write: Option<SdCardError>,
}

impl MockSdCard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SdCard for MockSdCard {
    fn mount(&mut self) -> Result<(), SdCardError> {
        if self.fail_mount {
            return Err(SdCardError::NotMounted);
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), SdCardError> {
        if self.open.is_some() {
            return Err(SdCardError::AlreadyOpen);
        }
        self.mounted = false;
        Ok(())
    }

    fn open_file(&mut self, name: &str, mode: FileOpenMode) -> Result<(), SdCardError> {
        if name.is_empty() {
            return Err(SdCardError::InvalidParameter);
        }
        if !self.mounted {
            return Err(SdCardError::NotMounted);
        }
        if self.open.is_some() {
            return Err(SdCardError::AlreadyOpen);
        }
        self.name.clear();
        self.name
            .push_str(name)
            .map_err(|_| SdCardError::OpenFailed)?;
        if mode == FileOpenMode::Overwrite {
            self.data.clear();
        }
        self.open = Some(mode);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SdCardError> {
        self.writes += 1;
        if self.open.is_none() {
            return Err(SdCardError::NoFileOpen);
        }
        if let Some(err) = self.fail_write {
            return Err(err);
        }
        self.data
            .extend_from_slice(bytes)
            .map_err(|_| SdCardError::WriteIncomplete)
    }

    fn close_file(&mut self) -> Result<(), SdCardError> {
        if self.fail_close {
            return Err(SdCardError::CloseFailed);
        }
        self.open.take().map(|_| ()).ok_or(SdCardError::NoFileOpen)
    }
}

/// Host-side hardware binding built from the doubles above.
#[derive(Debug)]
pub(crate) struct TestPlatform;

impl Platform for TestPlatform {
    type PulseCounter = PulseCount;
    type InstrumentPort = MockSerial;
    type RxBuffer = [u8; RX_BUFFER_LEN];
    type WiFiPort = MockSerial;
    type DirectPort = MockSerial;
    type SdCard = MockSdCard;
}
