//! Flow-controlled line transport to a GRBL controller
//!
//! GRBL acknowledges every line once it has been pulled out of its serial
//! input buffer. The transport keeps one byte reservation per unacknowledged
//! line and only sends a new line when the reservations plus the new line
//! stay below the buffer size. Acknowledgements retire reservations strictly
//! in send order.
//!
//! # States
//! `Disconnected → Homing → Ready ⇄ Sending`, with `Faulted` entered on any
//! alarm. Only a new homing cycle leaves `Faulted`.

use crate::communication::serial::SerialPort;
use crate::firmware::ControllerResponse;
use paintkit_core::constants::MAX_BUFFER_SIZE;
use paintkit_core::{Result, TransportError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Transport life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Homing,
    Ready,
    Sending,
    Faulted,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Homing => "homing",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::Faulted => "faulted",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for the buffered transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Size of the controller's serial input buffer in bytes
    pub buffer_size: usize,
    /// Bytes sent to wake the controller after opening the port
    pub wake_sequence: String,
    /// Wait after waking before stale input is discarded, in milliseconds
    pub settle_ms: u64,
    /// Wait between status polls while homing, in milliseconds
    pub status_poll_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            buffer_size: MAX_BUFFER_SIZE,
            wake_sequence: "\r\n\r\n".to_string(),
            settle_ms: 5000,
            status_poll_ms: 250,
        }
    }
}

impl TransportConfig {
    /// Same flow control with no waits, for dry runs and tests
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            status_poll_ms: 0,
            ..Self::default()
        }
    }
}

/// Byte-windowed writer over a [`SerialPort`]
pub struct BufferedTransport {
    port: Box<dyn SerialPort>,
    config: TransportConfig,
    state: TransportState,
    /// Bytes of each sent, unacknowledged line, oldest first
    reservations: VecDeque<usize>,
    lines_sent: u64,
    lines_acknowledged: u64,
}

impl BufferedTransport {
    pub fn new(port: Box<dyn SerialPort>, config: TransportConfig) -> Self {
        Self {
            port,
            config,
            state: TransportState::Disconnected,
            reservations: VecDeque::new(),
            lines_sent: 0,
            lines_acknowledged: 0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == TransportState::Ready
    }

    /// Bytes currently believed to sit in the controller buffer
    pub fn outstanding_bytes(&self) -> usize {
        self.reservations.iter().sum()
    }

    /// Lines sent but not yet acknowledged
    pub fn pending_lines(&self) -> usize {
        self.reservations.len()
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }

    pub fn lines_acknowledged(&self) -> u64 {
        self.lines_acknowledged
    }

    pub fn port_name(&self) -> String {
        self.port.name()
    }

    /// Wake the controller, drop its banner and home the machine
    pub fn connect(&mut self) -> Result<()> {
        tracing::info!("Connecting to controller on {}", self.port.name());
        let wake = self.config.wake_sequence.clone();
        self.port.write_raw(wake.as_bytes()).map_err(io_error)?;
        pause(self.config.settle_ms);
        self.port.clear_input().map_err(io_error)?;
        self.home()
    }

    /// Run a homing cycle and wait for the controller to report `Idle`
    pub fn home(&mut self) -> Result<()> {
        self.state = TransportState::Homing;
        self.reservations.clear();
        tracing::info!("Homing");

        self.send_control("$H")?;
        loop {
            self.send_control("$?")?;
            if self.wait_for_status()? {
                break;
            }
            pause(self.config.status_poll_ms);
        }

        self.state = TransportState::Ready;
        tracing::info!("Controller idle, transport ready");
        Ok(())
    }

    /// Send lines in order without overrunning the controller buffer
    ///
    /// Fails without sending anything further on the first alarm.
    pub fn safe_write<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        if self.state != TransportState::Ready {
            return Err(TransportError::NotReady {
                state: self.state.to_string(),
            }
            .into());
        }
        self.state = TransportState::Sending;

        for line in lines {
            if let Err(e) = self.send_line(line.as_ref().trim()) {
                if self.state == TransportState::Sending {
                    self.state = TransportState::Ready;
                }
                return Err(e);
            }
        }

        self.state = TransportState::Ready;
        Ok(())
    }

    /// Wait until every sent line has been acknowledged
    pub fn flush(&mut self) -> Result<()> {
        while !self.reservations.is_empty() {
            self.read_response()?;
        }
        Ok(())
    }

    /// Close the port; the transport has to be connected again afterwards
    pub fn close(&mut self) -> Result<()> {
        self.state = TransportState::Disconnected;
        self.reservations.clear();
        self.port.close().map_err(io_error)?;
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let need = line.len() + 1;
        let bound = self.config.buffer_size.saturating_sub(1);
        if need >= bound {
            return Err(TransportError::LineTooLong {
                length: need,
                buffer_size: self.config.buffer_size,
            }
            .into());
        }

        while self.outstanding_bytes() + need >= bound
            || self.port.input_pending().map_err(io_error)?
        {
            self.read_response()?;
        }

        self.port.write_line(line).map_err(io_error)?;
        self.reservations.push_back(need);
        self.lines_sent += 1;
        tracing::trace!("> {}", line);
        Ok(())
    }

    /// Read one line and account for it
    fn read_response(&mut self) -> Result<ControllerResponse> {
        let line = match self.port.read_line().map_err(io_error)? {
            Some(line) => line,
            None => {
                self.state = TransportState::Disconnected;
                return Err(TransportError::Closed.into());
            }
        };

        let response = ControllerResponse::parse(&line);
        match &response {
            ControllerResponse::Alarm(message) => {
                tracing::error!("Controller alarm: {}", message);
                self.state = TransportState::Faulted;
                return Err(TransportError::Alarm {
                    message: message.clone(),
                }
                .into());
            }
            ControllerResponse::Ok | ControllerResponse::Error(_) => {
                if let ControllerResponse::Error(e) = &response {
                    tracing::warn!("Controller rejected a line: {}", e);
                }
                if self.reservations.pop_front().is_some() {
                    self.lines_acknowledged += 1;
                }
            }
            other => tracing::debug!("Debug: {}", other),
        }
        Ok(response)
    }

    /// Send a control string outside the flow-control window and wait for its ack
    fn send_control(&mut self, command: &str) -> Result<()> {
        self.port.write_line(command).map_err(io_error)?;
        if command == "$?" {
            return Ok(());
        }
        loop {
            if self.read_response()?.is_ack() {
                return Ok(());
            }
        }
    }

    /// Read until a status report arrives; true if it reports `Idle`
    fn wait_for_status(&mut self) -> Result<bool> {
        loop {
            if let ControllerResponse::Status { state, .. } = self.read_response()? {
                tracing::debug!("Controller state: {}", state);
                return Ok(state == "Idle");
            }
        }
    }
}

fn io_error(e: std::io::Error) -> TransportError {
    TransportError::Io {
        reason: e.to_string(),
    }
}

fn pause(ms: u64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
