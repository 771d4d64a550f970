//! Controller link: serial ports and the flow-controlled transport

pub mod buffered;
pub mod serial;

pub use buffered::{BufferedTransport, TransportConfig, TransportState};
pub use serial::{list_ports, DryRunPort, RealSerialPort, SerialPort, DEFAULT_BAUD_RATE};
