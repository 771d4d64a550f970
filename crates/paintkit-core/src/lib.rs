//! # PaintKit Core
//!
//! Core types, errors, and machine constants for PaintKit.
//! Provides the motion command model shared by the stroke pipeline,
//! the resource manager and the controller transport.

pub mod command;
pub mod constants;
pub mod data;
pub mod error;

pub use command::{CommandBatch, CommandId, CommandIdGenerator, MotionCommand, Tag, TagSet};
pub use constants::BedEnvelope;
pub use data::Position;
pub use error::{ConfigError, Error, ResourceError, Result, StrokeError, TransportError};
