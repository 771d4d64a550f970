//! Serial port access
//!
//! The transport talks to the controller through the [`SerialPort`] trait so
//! the same flow control runs against real hardware, a dry-run sink or a test
//! double.

use paintkit_core::{Error, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

/// Default baud rate of the controller's USB serial link.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Status line the dry-run port answers `$?` with.
const DRY_RUN_IDLE: &str = "<Idle|MPos:0.000,0.000,0.000|FS:0,0>";

/// Line-oriented port interface
pub trait SerialPort: Send {
    /// Write raw bytes
    fn write_raw(&mut self, data: &[u8]) -> io::Result<()>;

    /// Write one line followed by a newline
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.write_raw(&data)
    }

    /// Block until a full line arrives; `None` once the port is closed
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// True if received data is waiting to be read
    fn input_pending(&mut self) -> io::Result<bool>;

    /// Discard everything received so far
    fn clear_input(&mut self) -> io::Result<()>;

    /// Get the port name
    fn name(&self) -> String;

    /// Close the port
    fn close(&mut self) -> io::Result<()>;
}

/// Available serial ports that look like motion controllers
pub fn list_ports() -> Result<Vec<String>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .into_iter()
            .map(|p| p.port_name)
            .filter(|name| is_controller_port(name))
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

fn is_controller_port(name: &str) -> bool {
    if let Some(number) = name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }
    name.starts_with("/dev/ttyUSB")
        || name.starts_with("/dev/ttyACM")
        || name.starts_with("/dev/cu.usbserial-")
        || name.starts_with("/dev/cu.usbmodem")
}

/// Hardware port backed by the `serialport` crate
///
/// [`close`](SerialPort::close) releases the device; later writes fail with
/// `NotConnected` and reads report end of stream.
pub struct RealSerialPort {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
    pending: Vec<u8>,
}

impl RealSerialPort {
    /// Open `path` at `baud_rate`
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        match serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
        {
            Ok(port) => {
                tracing::info!("Opened {} at {} baud", path, baud_rate);
                Ok(Self::from_port(port, path))
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", path, e);
                Err(Error::other(format!("Failed to open port {}: {}", path, e)))
            }
        }
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn serialport::SerialPort>, name: &str) -> Self {
        Self {
            port: Some(port),
            name: name.to_string(),
            pending: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port is closed"))
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl SerialPort for RealSerialPort {
    fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            let Some(port) = self.port.as_mut() else {
                return Ok(None);
            };
            match port.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                // No response timeout: a silent controller blocks here
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn input_pending(&mut self) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        match self.port.as_mut() {
            Some(port) => Ok(port.bytes_to_read()? > 0),
            None => Ok(false),
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        if let Some(port) = self.port.as_mut() {
            port.clear(serialport::ClearBuffer::Input)?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.port.take() {
            Some(mut port) => {
                tracing::info!("Closing {}", self.name);
                port.flush()
            }
            None => Ok(()),
        }
    }
}

/// Port that acknowledges every line without any hardware attached
///
/// Lines can be recorded to a writer, typically a `.gcode` file. `$?` is
/// answered with an `Idle` status report, every other line with `ok`.
pub struct DryRunPort {
    responses: VecDeque<String>,
    sink: Option<Box<dyn Write + Send>>,
    lines_written: usize,
}

impl DryRunPort {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            sink: None,
            lines_written: 0,
        }
    }

    /// Record every line sent to `path`
    pub fn with_output(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            sink: Some(Box::new(BufWriter::new(file))),
            ..Self::new()
        })
    }

    /// Record every line sent to an arbitrary writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Some(writer),
            ..Self::new()
        }
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }
}

impl Default for DryRunPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialPort for DryRunPort {
    fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(data);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(sink) = self.sink.as_mut() {
                writeln!(sink, "{}", line)?;
            }
            self.lines_written += 1;
            let reply = if line == "$?" { DRY_RUN_IDLE } else { "ok" };
            self.responses.push_back(reply.to_string());
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.responses.pop_front())
    }

    fn input_pending(&mut self) -> io::Result<bool> {
        Ok(!self.responses.is_empty())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.responses.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "dry-run".to_string()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}
