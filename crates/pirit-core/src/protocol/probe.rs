//! Liveness probe
//!
//! A one-byte ENQ/ACK exchange outside the framed protocol.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ProtocolError, Transport, ACK, ENQ};

/// Check that the terminal is online.
///
/// Sends ENQ, waits `wait`, then expects exactly one byte equal to ACK.
/// Any other byte count or value is reported as `Ok(false)`; only I/O
/// failures are errors.
pub fn probe<T: Transport + ?Sized>(
    transport: &mut T,
    wait: Duration,
) -> Result<bool, ProtocolError> {
    info!("Sending liveness check (0x{:02X})", ENQ);
    transport.write_all(&[ENQ])?;
    transport.sleep(wait);

    let available = transport.bytes_available()?;
    if available != 1 {
        warn!(
            "Liveness check: expected 1 byte after {} ms, {} available",
            wait.as_millis(),
            available
        );
        return Ok(false);
    }

    let reply = transport.read_available(1)?;
    debug!("Liveness check reply: {:02X?}", reply);
    match reply.first() {
        Some(&ACK) => {
            info!("Terminal is online");
            Ok(true)
        }
        Some(other) => {
            warn!("Liveness check: unexpected reply 0x{:02X}", other);
            Ok(false)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{SimulatedTerminal, TerminalEvent};

    const WAIT: Duration = Duration::from_millis(1000);

    #[test]
    fn test_probe_ack() {
        let mut terminal = SimulatedTerminal::new();
        assert!(probe(&mut terminal, WAIT).unwrap());
        assert_eq!(terminal.log(), &[TerminalEvent::Received(vec![ENQ])]);
        assert_eq!(terminal.slept(), WAIT);
    }

    #[test]
    fn test_probe_no_reply() {
        let mut terminal = SimulatedTerminal::new().with_probe_reply(vec![]);
        assert!(!probe(&mut terminal, WAIT).unwrap());
    }

    #[test]
    fn test_probe_too_many_bytes() {
        let mut terminal = SimulatedTerminal::new().with_probe_reply(vec![ACK, ACK]);
        assert!(!probe(&mut terminal, WAIT).unwrap());
        // Nothing is consumed when the count is wrong
        assert_eq!(terminal.bytes_available().unwrap(), 2);
    }

    #[test]
    fn test_probe_wrong_byte() {
        let mut terminal = SimulatedTerminal::new().with_probe_reply(vec![0x15]);
        assert!(!probe(&mut terminal, WAIT).unwrap());
    }
}
