//! Error handling for PaintKit
//!
//! Provides error types for every layer of the painting controller:
//! - Stroke errors (sample parsing, bed envelope, adapter combinations)
//! - Resource errors (holder/brush/pot lookups)
//! - Transport errors (controller link and flow control)
//! - Configuration errors
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Stroke processing error type
///
/// Raised while turning samples into motion commands. Any of these aborts the
/// stroke before a single line reaches the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrokeError {
    /// A sample line had a missing or malformed numeric field
    #[error("Malformed sample at line {line_number}: {reason}")]
    Parse {
        /// Zero-based index of the offending sample line.
        line_number: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// A command left the machine's safe travel volume
    #[error("Command outside of bed limits on {axis}: {value:.3} not in [{min:.3}, {max:.3}]")]
    BoundsViolation {
        /// The axis that violated the envelope.
        axis: char,
        /// The offending extent in machine space.
        value: f64,
        /// Lower bound of the envelope on that axis.
        min: f64,
        /// Upper bound of the envelope on that axis.
        max: f64,
    },

    /// Two adapters that cannot be chained were requested together
    #[error("Unsupported adapter combination: {reason}")]
    UnsupportedCombination {
        /// Why the combination was rejected.
        reason: String,
    },

    /// An operation that needs at least one contact point got none
    #[error("Stroke has no contact points")]
    EmptyBatch,
}

/// Resource lookup error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// Requested color/size has no matching holder or brush slot
    #[error("No brush for color index {color_index} and slot {slot_index}")]
    LookupMiss {
        /// Requested holder/color index.
        color_index: i64,
        /// Requested holder slot index.
        slot_index: i64,
    },

    /// The workshop was built without any holder station
    #[error("No brush holders configured")]
    NoHolders,

    /// A holder references a paint pot that does not exist
    #[error("Holder {holder_index} references missing paint pot")]
    PotMissing {
        /// Index of the holder station.
        holder_index: usize,
    },

    /// A stroke was scheduled before any brush was mounted
    #[error("No brush mounted on the head")]
    NoBrushMounted,
}

/// Transport error type
///
/// Represents errors on the line protocol to the motion controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The controller raised an alarm; the current batch is abandoned
    #[error("Controller alarm: {message}")]
    Alarm {
        /// The raw alarm line reported by the controller.
        message: String,
    },

    /// The transport is not in a state that accepts motion lines
    #[error("Transport not ready (state: {state})")]
    NotReady {
        /// Current transport state name.
        state: String,
    },

    /// A single line is larger than the controller input buffer
    #[error("Line of {length} bytes can never fit the {buffer_size} byte controller buffer")]
    LineTooLong {
        /// Length of the line including its terminator.
        length: usize,
        /// Configured controller buffer size.
        buffer_size: usize,
    },

    /// Underlying port I/O failed
    #[error("Port I/O error: {reason}")]
    Io {
        /// The reason for the I/O failure.
        reason: String,
    },

    /// The port was closed while a response was expected
    #[error("Port closed")]
    Closed,
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file could not be read or written
    #[error("Failed to access config file {path}: {reason}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// The underlying reason.
        reason: String,
    },

    /// Configuration file contents could not be decoded
    #[error("Failed to parse config {path}: {reason}")]
    Parse {
        /// Path of the configuration file.
        path: String,
        /// The underlying reason.
        reason: String,
    },

    /// Configuration decoded but is not usable
    #[error("Invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the configuration.
        reason: String,
    },
}

/// Main error type for PaintKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Stroke processing error
    #[error(transparent)]
    Stroke(#[from] StrokeError),

    /// Resource error
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error means the controller is in a fault state
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Alarm { .. }))
    }

    /// Check if this is a stroke processing error
    pub fn is_stroke_error(&self) -> bool {
        matches!(self, Error::Stroke(_))
    }

    /// Check if this is a resource error
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Error::Resource(_))
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
