//! Byte-incremental frame receiver.
//!
//! [`FrameReceiver`] reassembles COBS-stuffed frames from a [`SerialPort`] without ever
//! blocking. Each [`tick()`](FrameReceiver::tick) drains the bytes that are already waiting,
//! or advances the pipeline by one stage:
//!
//! ```text
//!  open() ─▶ Idle ──byte≠0──▶ Receiving ──0x00──▶ Decoding ──▶ Verifying ──▶ Complete
//!                               │                   │             │
//!                               └───────────────────┴─────────────┴──────▶ Fault
//! ```
//!
//! ## Status
//!
//! The caller watches two axes:
//! - [`RxStatus`]: whether to keep ticking (`Active`) or look at the outcome (`Finished`)
//! - [`RxSubstatus`]: why the receiver finished
//!
//! Neither `Complete` nor `Fault` is sticky across [`open()`](FrameReceiver::open): the caller
//! reads the result and re-arms the receiver. After a fault in the middle of a frame the
//! receiver drops bytes until the next `0x00` before it accepts a new frame.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut rx = FrameReceiver::new(uart, Some([0u8; RX_BUFFER_LEN]), Some(50));
//! rx.open();
//! loop {
//!     if rx.tick() == RxStatus::Finished {
//!         if let Ok(m) = rx.measurement() {
//!             // use m
//!         }
//!         rx.open();
//!     }
//! }
//! ```

use crate::cobs;
use crate::consts::FRAME_DELIMITER;
use crate::error::FrameError;
use crate::frame;
use crate::measurement::Measurement;
use crate::serial::SerialPort;

/// Internal stage of the receiver.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxState {
    /// Closed. Ticks do nothing.
    #[default]
    Inactive,
    /// Waiting for the first byte of a frame. Delimiters are skipped.
    Idle,
    /// Buffering stuffed bytes until a delimiter.
    Receiving,
    /// A full stuffed frame is buffered.
    Decoding,
    /// The frame is decoded and waiting for its length and CRC check.
    Verifying,
    /// A verified frame is held in the buffer.
    Complete,
    /// Something went wrong; see [`RxSubstatus`].
    Fault,
}

/// Coarse status: keep polling or look at the result.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxStatus {
    /// The receiver is closed.
    #[default]
    Inactive,
    /// A frame is being received or checked.
    Active,
    /// A frame is complete, or a fault occurred.
    Finished,
}

/// Fine status: why the receiver finished.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxSubstatus {
    /// A verified frame is available.
    Ok,
    /// Nothing to report yet.
    #[default]
    NoData,
    /// The line went quiet in the middle of a frame.
    Timeout,
    /// The stuffed bytes were malformed.
    CobsDecodeFail,
    /// The frame was too short or its length field was wrong.
    LengthMismatch,
    /// The CRC trailer did not match.
    CrcMismatch,
    /// The frame did not fit the receive buffer.
    Overflow,
    /// No receive buffer is attached.
    NoRxBuffer,
    /// The serial driver reported an error.
    UnknownError,
}

/// Incremental receiver for frames arriving on `S`, buffered in `B`.
#[derive(Debug)]
pub struct FrameReceiver<S, B> {
    port: S,
    buf: Option<B>,
    state: RxState,
    substatus: RxSubstatus,
    len: usize,
    frame_len: usize,
    quiet_ticks: u32,
    timeout_ticks: Option<u32>,
    resyncing: bool,
}

impl<S, B> FrameReceiver<S, B>
where
    S: SerialPort,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Creates a closed receiver.
    ///
    /// # Arguments
    /// * `port` - serial port the frames arrive on
    /// * `buf` - receive buffer; frames whose stuffed form is longer than it overflow
    /// * `timeout_ticks` - ticks without a byte after which a partial frame is abandoned;
    ///   `None` waits forever
    pub fn new(port: S, buf: Option<B>, timeout_ticks: Option<u32>) -> Self {
        Self {
            port,
            buf,
            state: RxState::Inactive,
            substatus: RxSubstatus::NoData,
            len: 0,
            frame_len: 0,
            quiet_ticks: 0,
            timeout_ticks,
            resyncing: false,
        }
    }

    /// Current stage.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Coarse status derived from the stage.
    pub fn status(&self) -> RxStatus {
        match self.state {
            RxState::Inactive => RxStatus::Inactive,
            RxState::Idle | RxState::Receiving | RxState::Decoding | RxState::Verifying => {
                RxStatus::Active
            }
            RxState::Complete | RxState::Fault => RxStatus::Finished,
        }
    }

    /// Why the receiver finished, or [`RxSubstatus::NoData`] while it is still working.
    pub fn substatus(&self) -> RxSubstatus {
        self.substatus
    }

    /// Discards any partial or completed frame and waits for a new one.
    ///
    /// A frame cut short here has its remaining bytes dropped up to the next delimiter.
    /// Without a receive buffer this ends in `Fault` with [`RxSubstatus::NoRxBuffer`].
    pub fn open(&mut self) {
        if self.state == RxState::Receiving {
            self.resyncing = true;
        }
        self.len = 0;
        self.frame_len = 0;
        self.quiet_ticks = 0;
        if self.buf.is_none() {
            self.fault(RxSubstatus::NoRxBuffer);
            return;
        }
        self.state = RxState::Idle;
        self.substatus = RxSubstatus::NoData;
    }

    /// Stops receiving. Bytes stay in the port until the next `open()`.
    pub fn close(&mut self) {
        if self.state == RxState::Receiving {
            self.resyncing = true;
        }
        self.state = RxState::Inactive;
        self.substatus = RxSubstatus::NoData;
        self.len = 0;
        self.frame_len = 0;
    }

    /// Attaches a receive buffer and returns the previous one. Closes the receiver.
    pub fn set_rx_buffer(&mut self, buf: B) -> Option<B> {
        self.close();
        self.buf.replace(buf)
    }

    /// Detaches the receive buffer. Closes the receiver.
    pub fn take_rx_buffer(&mut self) -> Option<B> {
        self.close();
        self.buf.take()
    }

    /// Mutable access to the serial port.
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Advances the receiver. Never blocks.
    ///
    /// # Returns
    /// The coarse status after this tick.
    pub fn tick(&mut self) -> RxStatus {
        match self.state {
            RxState::Idle | RxState::Receiving => self.receive(),
            RxState::Decoding => self.decode(),
            RxState::Verifying => self.verify(),
            RxState::Inactive | RxState::Complete | RxState::Fault => {}
        }
        self.status()
    }

    /// The verified frame, once the receiver is `Complete`.
    pub fn frame(&self) -> Option<&[u8]> {
        match (&self.buf, self.state) {
            (Some(buf), RxState::Complete) => buf.as_ref().get(..self.frame_len),
            _ => None,
        }
    }

    /// The measurement carried by the verified frame.
    ///
    /// # Errors
    /// [`FrameError::Incomplete`] if no verified frame is held, or what [`frame::parse`]
    /// reports for it.
    pub fn measurement(&self) -> Result<Measurement, FrameError> {
        self.frame().ok_or(FrameError::Incomplete).and_then(frame::parse)
    }

    fn fault(&mut self, why: RxSubstatus) {
        warn!("receiver: fault {:?} in {:?}", why, self.state);
        self.resyncing = matches!(
            why,
            RxSubstatus::Overflow | RxSubstatus::Timeout | RxSubstatus::UnknownError
        ) && self.state == RxState::Receiving;
        self.state = RxState::Fault;
        self.substatus = why;
    }

    fn receive(&mut self) {
        let buf: &mut [u8] = match self.buf.as_mut() {
            Some(buf) => buf.as_mut(),
            None => {
                self.fault(RxSubstatus::NoRxBuffer);
                return;
            }
        };

        let mut got_bytes = false;
        let outcome = loop {
            let byte = match self.port.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => break None,
                Err(nb::Error::Other(_)) => break Some(RxSubstatus::UnknownError),
            };
            got_bytes = true;

            if byte == FRAME_DELIMITER {
                if self.state == RxState::Idle {
                    self.resyncing = false;
                    continue;
                }
                if let Some(slot) = buf.get_mut(self.len) {
                    *slot = FRAME_DELIMITER;
                    self.len += 1;
                }
                self.state = RxState::Decoding;
                break None;
            }

            if self.state == RxState::Idle {
                if self.resyncing {
                    continue;
                }
                self.state = RxState::Receiving;
                self.len = 0;
            }
            match buf.get_mut(self.len) {
                Some(slot) => {
                    *slot = byte;
                    self.len += 1;
                }
                None => break Some(RxSubstatus::Overflow),
            }
        };

        if got_bytes {
            self.quiet_ticks = 0;
        }
        match outcome {
            Some(why) => self.fault(why),
            None if !got_bytes && self.state == RxState::Receiving => {
                self.quiet_ticks = self.quiet_ticks.saturating_add(1);
                if let Some(limit) = self.timeout_ticks {
                    if self.quiet_ticks >= limit {
                        self.fault(RxSubstatus::Timeout);
                    }
                }
            }
            None => {}
        }
    }

    fn decode(&mut self) {
        let result = match self.buf.as_mut() {
            Some(buf) => cobs::decode_in_place(&mut buf.as_mut()[..self.len]),
            None => return self.fault(RxSubstatus::NoRxBuffer),
        };
        match result {
            Ok(n) => {
                self.frame_len = n;
                self.state = RxState::Verifying;
            }
            Err(_) => self.fault(RxSubstatus::CobsDecodeFail),
        }
    }

    fn verify(&mut self) {
        let result = match self.buf.as_ref() {
            Some(buf) => frame::verify(&buf.as_ref()[..self.frame_len]).map(|_| ()),
            None => return self.fault(RxSubstatus::NoRxBuffer),
        };
        match result {
            Ok(()) => {
                debug!("receiver: frame complete, {} bytes", self.frame_len);
                self.state = RxState::Complete;
                self.substatus = RxSubstatus::Ok;
            }
            Err(FrameError::LengthMismatch { .. }) => self.fault(RxSubstatus::LengthMismatch),
            Err(FrameError::CrcMismatch { .. }) => self.fault(RxSubstatus::CrcMismatch),
            Err(_) => self.fault(RxSubstatus::UnknownError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ENCODED_FRAME_MAX_LEN, FRAME_MAX_LEN, RX_BUFFER_LEN};
    use crate::error::SerialError;
    use crate::measurement::{MeasurementDeviceId, MeasurementValue};
    use crate::mocks::MockSerial;

    type Rx = FrameReceiver<MockSerial, [u8; RX_BUFFER_LEN]>;

    fn receiver() -> Rx {
        let mut rx = FrameReceiver::new(MockSerial::new(), Some([0u8; RX_BUFFER_LEN]), Some(3));
        rx.open();
        rx
    }

    fn wire(m: &Measurement) -> heapless::Vec<u8, ENCODED_FRAME_MAX_LEN> {
        let mut raw = [0u8; FRAME_MAX_LEN];
        let n = frame::serialize(m, &mut raw).unwrap();
        let mut out = [0u8; ENCODED_FRAME_MAX_LEN];
        let k = cobs::encode(&raw[..n], &mut out).unwrap();
        heapless::Vec::from_slice(&out[..k]).unwrap()
    }

    fn run(rx: &mut Rx, ticks: usize) -> RxStatus {
        for _ in 0..ticks {
            if rx.tick() == RxStatus::Finished {
                break;
            }
        }
        rx.status()
    }

    #[test]
    fn test_frame_round_trip_every_width() {
        for m in [
            Measurement::new(MeasurementDeviceId::PulseCounter1, 0x00u8),
            Measurement::new(MeasurementDeviceId::PulseCounter2, 0x1234u16),
            Measurement::new(MeasurementDeviceId::Serial1, 0x0000_ff00u32),
        ] {
            let mut rx = receiver();
            rx.port_mut().feed(&[0x00]);
            rx.port_mut().feed(&wire(&m));
            assert_eq!(run(&mut rx, 10), RxStatus::Finished);
            assert_eq!(rx.state(), RxState::Complete);
            assert_eq!(rx.substatus(), RxSubstatus::Ok);
            assert_eq!(rx.measurement(), Ok(m));
        }
    }

    #[test]
    fn test_one_stage_per_tick() {
        let mut rx = receiver();
        let m = Measurement::new(MeasurementDeviceId::PulseCounter3, 7u8);
        rx.port_mut().feed(&wire(&m));
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.state(), RxState::Decoding);
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.state(), RxState::Verifying);
        assert_eq!(rx.tick(), RxStatus::Finished);
        assert_eq!(rx.frame().map(<[u8]>::len), Some(8));
    }

    #[test]
    fn test_bytes_arriving_across_ticks() {
        let mut rx = receiver();
        let m = Measurement::new(MeasurementDeviceId::PulseCounter4, 0xbeefu16);
        let bytes = wire(&m);
        for &b in bytes.iter() {
            assert_eq!(rx.status(), RxStatus::Active);
            rx.port_mut().feed(&[b]);
            let _ = rx.tick();
        }
        assert_eq!(run(&mut rx, 4), RxStatus::Finished);
        assert_eq!(rx.measurement(), Ok(m));
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let mut rx = receiver();
        let a = Measurement::new(MeasurementDeviceId::PulseCounter1, 1u8);
        let b = Measurement::new(MeasurementDeviceId::PulseCounter2, 2u32);
        rx.port_mut().feed(&wire(&a));
        rx.port_mut().feed(&wire(&b));
        let _ = run(&mut rx, 5);
        assert_eq!(rx.measurement(), Ok(a));
        rx.open();
        let _ = run(&mut rx, 5);
        assert_eq!(rx.measurement(), Ok(b));
    }

    #[test]
    fn test_overflow_then_reopen() {
        let mut rx = receiver();
        rx.port_mut().feed(&[0x5a; RX_BUFFER_LEN + 1]);
        assert_eq!(rx.tick(), RxStatus::Finished);
        assert_eq!(rx.state(), RxState::Fault);
        assert_eq!(rx.substatus(), RxSubstatus::Overflow);

        // Holds the fault until reopened.
        assert_eq!(rx.tick(), RxStatus::Finished);

        rx.open();
        assert_eq!(rx.state(), RxState::Idle);
        assert_eq!(rx.status(), RxStatus::Active);

        // The tail of the oversized frame is dropped, the next frame is accepted.
        let m = Measurement::new(MeasurementDeviceId::Serial1, 42u8);
        rx.port_mut().feed(&[0x5a, 0x5a, 0x00]);
        rx.port_mut().feed(&wire(&m));
        let _ = run(&mut rx, 6);
        assert_eq!(rx.substatus(), RxSubstatus::Ok);
        assert_eq!(rx.measurement(), Ok(m));
    }

    #[test]
    fn test_crc_mismatch() {
        let mut rx = receiver();
        let mut raw = [0u8; FRAME_MAX_LEN];
        let m = Measurement::new(MeasurementDeviceId::PulseCounter2, 0x1234u16);
        let n = frame::serialize(&m, &mut raw).unwrap();
        raw[4] ^= 0x01;
        let mut out = [0u8; ENCODED_FRAME_MAX_LEN];
        let k = cobs::encode(&raw[..n], &mut out).unwrap();
        rx.port_mut().feed(&out[..k]);
        assert_eq!(run(&mut rx, 5), RxStatus::Finished);
        assert_eq!(rx.substatus(), RxSubstatus::CrcMismatch);
        assert_eq!(rx.frame(), None);
        assert_eq!(rx.measurement(), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_length_mismatch() {
        let mut rx = receiver();
        let mut out = [0u8; 16];
        let k = cobs::encode(&[0x00, 0x09, 0x01, 0x02], &mut out).unwrap();
        rx.port_mut().feed(&out[..k]);
        let _ = run(&mut rx, 5);
        assert_eq!(rx.substatus(), RxSubstatus::LengthMismatch);
    }

    #[test]
    fn test_cobs_decode_fail() {
        let mut rx = receiver();
        rx.port_mut().feed(&[0x09, 0x01, 0x02, 0x00]);
        let _ = run(&mut rx, 5);
        assert_eq!(rx.state(), RxState::Fault);
        assert_eq!(rx.substatus(), RxSubstatus::CobsDecodeFail);
    }

    #[test]
    fn test_timeout_mid_frame() {
        let mut rx = receiver();
        rx.port_mut().feed(&[0x03, 0x01]);
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.tick(), RxStatus::Finished);
        assert_eq!(rx.substatus(), RxSubstatus::Timeout);
    }

    #[test]
    fn test_idle_does_not_time_out() {
        let mut rx = receiver();
        for _ in 0..10 {
            assert_eq!(rx.tick(), RxStatus::Active);
        }
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_no_rx_buffer() {
        let mut rx: Rx = FrameReceiver::new(MockSerial::new(), None, None);
        rx.open();
        assert_eq!(rx.status(), RxStatus::Finished);
        assert_eq!(rx.substatus(), RxSubstatus::NoRxBuffer);

        assert!(rx.set_rx_buffer([0u8; RX_BUFFER_LEN]).is_none());
        assert_eq!(rx.status(), RxStatus::Inactive);
        rx.open();
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn test_read_error_is_unknown_error() {
        let mut rx = receiver();
        rx.port_mut().fail_read = Some(SerialError::ErrorFromHal);
        assert_eq!(rx.tick(), RxStatus::Finished);
        assert_eq!(rx.substatus(), RxSubstatus::UnknownError);
    }

    #[test]
    fn test_reopen_mid_frame_drops_the_tail() {
        let mut rx = receiver();
        rx.port_mut().feed(&[0x03, 0x01]);
        assert_eq!(rx.tick(), RxStatus::Active);
        assert_eq!(rx.state(), RxState::Receiving);

        rx.open();
        let m = Measurement::new(MeasurementDeviceId::PulseCounter3, 0xbeefu16);
        rx.port_mut().feed(&[0x02, 0x00]);
        rx.port_mut().feed(&wire(&m));
        let _ = run(&mut rx, 6);
        assert_eq!(rx.substatus(), RxSubstatus::Ok);
        assert_eq!(rx.measurement(), Ok(m));
    }

    #[test]
    fn test_close_is_inactive() {
        let mut rx = receiver();
        rx.port_mut().feed(&[0x02, 0x01]);
        let _ = rx.tick();
        rx.close();
        assert_eq!(rx.status(), RxStatus::Inactive);
        assert_eq!(rx.substatus(), RxSubstatus::NoData);
        assert_eq!(rx.tick(), RxStatus::Inactive);
    }

    #[test]
    fn test_value_of_recovered_measurement_is_bit_exact() {
        let mut rx = receiver();
        let m = Measurement::new(MeasurementDeviceId::PulseCounter1, u32::MAX);
        rx.port_mut().feed(&wire(&m));
        let _ = run(&mut rx, 5);
        assert_eq!(
            rx.measurement().map(|m| m.value),
            Ok(MeasurementValue::U32(u32::MAX))
        );
    }
}
