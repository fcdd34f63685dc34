//! Demo Mode - Simulated Pirit terminal
//!
//! Answers the liveness probe, status and settings queries, and accepts design and
//! logo uploads, so the upload sequence can run without hardware. Every byte the
//! host writes and every readiness byte it reads is kept in an event log.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::config::DEFAULT_PASSWORD;
use crate::protocol::packet::encode_response;
use crate::protocol::{Command, ProtocolError, Transport, ACK, ENQ, ETX, FS, STX, SUCCESS_CODE};

/// Error code returned for requests the simulator cannot parse or does not know
pub const INVALID_REQUEST: &str = "01";

/// Something the host did to the simulated terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Bytes written by the host in one call
    Received(Vec<u8>),
    /// Single-byte blocking read by the host and its result
    ByteRead(Option<u8>),
}

#[derive(Debug)]
struct PendingPayload {
    command: Command,
    packet_id: u8,
    expected: usize,
    buffer: Vec<u8>,
}

/// In-process stand-in for a terminal behind a serial port
#[derive(Debug)]
pub struct SimulatedTerminal {
    password: String,
    shift_open: bool,
    organization_name: String,
    probe_reply: Vec<u8>,
    error_codes: HashMap<Command, String>,
    ready_reply: Option<u8>,
    upload_result: String,
    silent: bool,

    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
    pending_payload: Option<PendingPayload>,
    payloads: Vec<(Command, Vec<u8>)>,
    commands: Vec<Command>,
    log: Vec<TerminalEvent>,
    slept: Duration,
}

impl Default for SimulatedTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTerminal {
    /// A healthy terminal with a closed shift and a centered organization name
    pub fn new() -> Self {
        Self {
            password: DEFAULT_PASSWORD.to_string(),
            shift_open: false,
            organization_name: "   DEMO TRADING LLC   ".to_string(),
            probe_reply: vec![ACK],
            error_codes: HashMap::new(),
            ready_reply: Some(ACK),
            upload_result: SUCCESS_CODE.to_string(),
            silent: false,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            pending_payload: None,
            payloads: Vec::new(),
            commands: Vec::new(),
            log: Vec::new(),
            slept: Duration::ZERO,
        }
    }

    /// Expect a different password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    /// Report the shift as open or closed
    pub fn with_shift_open(mut self, open: bool) -> Self {
        self.shift_open = open;
        self
    }

    /// Set the first organization name line (ASCII)
    pub fn with_organization_name(mut self, name: &str) -> Self {
        self.organization_name = name.to_string();
        self
    }

    /// Bytes sent back for the liveness probe
    pub fn with_probe_reply(mut self, reply: Vec<u8>) -> Self {
        self.probe_reply = reply;
        self
    }

    /// Answer `command` with `code` instead of processing it
    pub fn with_error(mut self, command: Command, code: &str) -> Self {
        self.error_codes.insert(command, code.to_string());
        self
    }

    /// Readiness byte sent after a payload announcement, `None` for silence
    pub fn with_ready_reply(mut self, reply: Option<u8>) -> Self {
        self.ready_reply = reply;
        self
    }

    /// Error code of the confirmation sent after a payload
    pub fn with_upload_result(mut self, code: &str) -> Self {
        self.upload_result = code.to_string();
        self
    }

    /// Never answer framed requests (the probe is still answered)
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Everything the host did, in order
    pub fn log(&self) -> &[TerminalEvent] {
        &self.log
    }

    /// Framed commands received, in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Payloads received after a successful announcement
    pub fn payloads(&self) -> &[(Command, Vec<u8>)] {
        &self.payloads
    }

    /// Total time the host spent sleeping on this transport
    pub fn slept(&self) -> Duration {
        self.slept
    }

    fn receive_payload(&mut self, bytes: &[u8]) {
        let Some(mut pending) = self.pending_payload.take() else {
            return;
        };
        pending.buffer.extend_from_slice(bytes);
        if pending.buffer.len() < pending.expected {
            self.pending_payload = Some(pending);
            return;
        }
        pending.buffer.truncate(pending.expected);
        self.payloads.push((pending.command, pending.buffer));
        let result = self.upload_result.clone();
        self.reply(pending.packet_id, pending.command.code(), &result, &[]);
    }

    /// Pop one complete STX..ETX+checksum frame from the inbox
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let start = self.inbox.iter().position(|&b| b == STX)?;
        let etx = start + self.inbox[start..].iter().position(|&b| b == ETX)?;
        let end = etx + 3;
        if self.inbox.len() < end {
            return None;
        }
        let frame = self.inbox[start..end].to_vec();
        self.inbox.drain(..end);
        Some(frame)
    }

    fn handle_request(&mut self, frame: &[u8]) {
        // STX + password(4) + id + code(2) + ETX + crc(2)
        if frame.len() < 11 {
            return;
        }
        let packet_id = frame[5];
        let code = String::from_utf8_lossy(&frame[6..8]).into_owned();
        let params: Vec<String> = frame[8..frame.len() - 3]
            .split(|&b| b == FS)
            .filter(|f| !f.is_empty())
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();

        if self.silent {
            return;
        }
        if &frame[1..5] != self.password.as_bytes() {
            self.reply(packet_id, &code, INVALID_REQUEST, &[]);
            return;
        }
        let Some(command) = Command::from_code(&code) else {
            self.reply(packet_id, &code, INVALID_REQUEST, &[]);
            return;
        };
        self.commands.push(command);

        if let Some(error) = self.error_codes.get(&command).cloned() {
            self.reply(packet_id, &code, &error, &[]);
            return;
        }

        match command {
            Command::StatusFlags => {
                let flags = if self.shift_open { "4" } else { "0" };
                self.reply(packet_id, &code, SUCCESS_CODE, &["0", flags, "0"]);
            }
            Command::ReadSettings => {
                let name = self.organization_name.clone();
                self.reply(packet_id, &code, SUCCESS_CODE, &[name.as_str()]);
            }
            Command::LoadDesign | Command::LoadLogo => {
                let Some(size) = params.first().and_then(|p| p.parse::<usize>().ok()) else {
                    self.reply(packet_id, &code, INVALID_REQUEST, &[]);
                    return;
                };
                if let Some(ready) = self.ready_reply {
                    self.outbox.push_back(ready);
                    if ready == ACK {
                        self.pending_payload = Some(PendingPayload {
                            command,
                            packet_id,
                            expected: size,
                            buffer: Vec::new(),
                        });
                    }
                }
            }
        }
    }

    fn reply(&mut self, packet_id: u8, code: &str, error: &str, params: &[&str]) {
        self.outbox.extend(encode_response(packet_id, code, error, params));
    }
}

impl Transport for SimulatedTerminal {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.log.push(TerminalEvent::Received(bytes.to_vec()));

        if self.pending_payload.is_some() {
            self.receive_payload(bytes);
            return Ok(());
        }
        if bytes == [ENQ] {
            self.outbox.extend(self.probe_reply.iter().copied());
            return Ok(());
        }

        self.inbox.extend_from_slice(bytes);
        while let Some(frame) = self.take_frame() {
            self.handle_request(&frame);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ProtocolError> {
        Ok(self.outbox.len())
    }

    fn read_available(&mut self, n: usize) -> Result<Vec<u8>, ProtocolError> {
        let n = n.min(self.outbox.len());
        Ok(self.outbox.drain(..n).collect())
    }

    fn read_byte(&mut self, _timeout: Duration) -> Result<Option<u8>, ProtocolError> {
        let byte = self.outbox.pop_front();
        self.log.push(TerminalEvent::ByteRead(byte));
        Ok(byte)
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
    }
}
