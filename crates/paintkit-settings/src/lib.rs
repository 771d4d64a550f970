//! # PaintKit Settings
//!
//! Application configuration plus the holder and pot files that describe the
//! physical workshop.

pub mod config;
pub mod holders;

pub use config::{Config, ConnectionSettings, PipelineSettings, SessionSettings, SourceKind};
pub use holders::{load_holders, load_pots};
