//! Transport abstraction
//!
//! The session talks to the terminal through [`Transport`] so that the same
//! exchange logic runs over a serial port or over the in-process simulator.
//! Closing is tied to `Drop`: whoever owns the transport releases it on every
//! exit path.

use std::time::Duration;

use super::ProtocolError;

/// Byte-oriented duplex channel to the terminal. All calls block the calling thread.
pub trait Transport {
    /// Write all bytes and flush them to the line
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> Result<usize, ProtocolError>;

    /// Read up to `n` bytes that are already available
    fn read_available(&mut self, n: usize) -> Result<Vec<u8>, ProtocolError>;

    /// Block until one byte arrives, or `None` once `timeout` elapses
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, ProtocolError>;

    /// Suspend the calling thread between polls
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize, ProtocolError> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, n: usize) -> Result<Vec<u8>, ProtocolError> {
        (**self).read_available(n)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, ProtocolError> {
        (**self).read_byte(timeout)
    }

    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}
