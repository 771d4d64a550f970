//! # PaintKit
//!
//! Controller for a gantry painting machine driven by GRBL firmware:
//! - stroke samples become `G1` motion through an ingestion and adapter pipeline
//! - brushes are swapped between holder stations and refilled from paint pots
//! - every batch is checked against the bed envelope before it is sent
//! - lines are streamed over a byte-windowed serial transport
//!
//! ## Architecture
//!
//! PaintKit is organized as a workspace with multiple crates:
//!
//! 1. **paintkit-core** - Commands, tags, machine constants, errors
//! 2. **paintkit-resources** - Pots, brushes, holders, the hand and refill scheduling
//! 3. **paintkit-pipeline** - Ingestion, point reduction, feed scaling, adapters
//! 4. **paintkit-communication** - Serial ports, response parsing, flow control
//! 5. **paintkit-settings** - Configuration files
//! 6. **paintkit** - Stroke sources, the painting session and the dispatch loop

pub mod dispatch;
pub mod session;
pub mod source;
pub mod stroke;

pub use dispatch::{run_producer, DispatchReport, Dispatcher, ShutdownSignal};
pub use session::PaintSession;
pub use source::{FileSource, StrokeSource, WebSocketSource};
pub use stroke::{StrokeBatch, WireError};

pub use paintkit_communication::{
    list_ports, BufferedTransport, DryRunPort, RealSerialPort, SerialPort, TransportConfig,
    TransportState,
};
pub use paintkit_core::{
    CommandBatch, CommandIdGenerator, Error, MotionCommand, Position, Result, Tag,
};
pub use paintkit_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Console output, pretty or JSON
/// - RUST_LOG environment variable support
/// - Thread ids and names, since the consumer runs on its own thread
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
