//! # PaintKit Pipeline
//!
//! Turns raw stroke samples into motion commands:
//! - ingestion of `"x y pressure velocity"` samples
//! - greedy point reduction over a grid index
//! - feed rate normalization
//! - batch adapters (lifts, mirroring, lead-in, envelope check, styles)

pub mod adapters;
pub mod dedup;
pub mod feed;
pub mod ingest;
pub mod spatial;

pub use adapters::{
    AdapterChain, AdapterHandle, AdapterKind, AdapterOptions, CheckLimits, CommandAdapter,
    LeadIn, MirrorOnY, Pointillism, SpeedUp, StartAndEndLift, Wavy,
};
pub use dedup::{exclude_points_within, DEFAULT_MERGE_RADIUS};
pub use feed::{normalize_feed, DEFAULT_FEED_FACTOR};
pub use ingest::{parse_sample, parse_samples};
pub use spatial::PointIndex;

use paintkit_core::{CommandBatch, CommandIdGenerator, StrokeError};
use serde::{Deserialize, Serialize};

/// Stages run on every stroke before refill scheduling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessor {
    /// Points closer than this are merged
    pub merge_radius: f64,
    /// Multiplier applied to sampled feed rates
    pub feed_factor: f64,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            merge_radius: DEFAULT_MERGE_RADIUS,
            feed_factor: DEFAULT_FEED_FACTOR,
        }
    }
}

impl Preprocessor {
    /// Parse, reduce and normalize one stroke
    pub fn run<S: AsRef<str>>(
        &self,
        ids: &CommandIdGenerator,
        lines: &[S],
    ) -> Result<CommandBatch, StrokeError> {
        let parsed = parse_samples(ids, lines)?;
        let parsed_len = parsed.len();
        let reduced = exclude_points_within(parsed, self.merge_radius);
        tracing::info!(
            "Preprocessed {} commands -> {}",
            parsed_len,
            reduced.len()
        );
        Ok(normalize_feed(reduced, self.feed_factor))
    }
}
