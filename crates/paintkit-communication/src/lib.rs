//! # PaintKit Communication
//!
//! Serial link to the GRBL motion controller: port access, response
//! classification and the byte-windowed transport that keeps the controller's
//! input buffer from overflowing.

pub mod communication;
pub mod firmware;

pub use communication::{
    list_ports, BufferedTransport, DryRunPort, RealSerialPort, SerialPort, TransportConfig,
    TransportState, DEFAULT_BAUD_RATE,
};
pub use firmware::ControllerResponse;
