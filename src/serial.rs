//! Serial driver boundary.
//!
//! The pipeline never touches a UART directly. It talks to a [`SerialPort`], which the
//! board support code implements on top of its HAL. Two styles of access are offered:
//!
//! - blocking, bounded transfers ([`SerialPort::transmit`], [`SerialPort::receive`]) used
//!   by the recorders, each with a caller-supplied timeout in milliseconds
//! - a non-blocking single byte read ([`SerialPort::read`]) used by the frame receiver,
//!   which must never stall a tick
//!
//! Every non-`Ok` driver status maps onto one [`SerialError`] variant.

use crate::error::SerialError;

/// A serial peripheral as seen by the measurement pipeline.
pub trait SerialPort {
    /// Sends all of `bytes`, giving up after `timeout_ms`.
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), SerialError>;

    /// Fills all of `buf`, giving up after `timeout_ms`.
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), SerialError>;

    /// Returns the next received byte, or [`nb::Error::WouldBlock`] if none is pending.
    fn read(&mut self) -> nb::Result<u8, SerialError>;
}

impl<T: SerialPort + ?Sized> SerialPort for &mut T {
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), SerialError> {
        T::transmit(self, bytes, timeout_ms)
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), SerialError> {
        T::receive(self, buf, timeout_ms)
    }

    fn read(&mut self) -> nb::Result<u8, SerialError> {
        T::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSerial;

    fn send_through<S: SerialPort>(mut port: S, bytes: &[u8]) -> Result<(), SerialError> {
        port.transmit(bytes, 10)
    }

    #[test]
    fn test_mut_ref_forwards() {
        let mut port = MockSerial::new();
        send_through(&mut port, &[1, 2, 3]).unwrap();
        assert_eq!(port.sent(), &[1, 2, 3]);
        assert_eq!(port.last_timeout_ms, Some(10));
    }

    #[test]
    fn test_read_would_block_when_empty() {
        let mut port = MockSerial::new();
        assert_eq!(port.read(), Err(nb::Error::WouldBlock));
        port.feed(&[0x42]);
        assert_eq!(nb::block!(port.read()), Ok(0x42));
    }

    #[test]
    fn test_receive_fills_buffer() {
        let mut port = MockSerial::new();
        port.feed(&[1, 2, 3, 4]);
        let mut buf = [0u8; 3];
        port.receive(&mut buf, 100).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(port.receive(&mut buf, 100), Err(SerialError::Timeout));
    }
}
