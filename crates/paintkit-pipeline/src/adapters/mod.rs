//! Command adapters and the adapter chain
//!
//! An adapter takes a whole command batch and returns a new one. Adapters run
//! in the order they are registered; the first failure aborts the chain so no
//! partially adapted batch ever reaches the controller.

mod limits;
mod motion;
mod style;

pub use limits::CheckLimits;
pub use motion::{LeadIn, MirrorOnY, SpeedUp, StartAndEndLift};
pub use style::{Pointillism, Wavy};

use paintkit_core::{BedEnvelope, CommandBatch, CommandIdGenerator, StrokeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Trait for batch-level command transforms
pub trait CommandAdapter: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &str;

    /// Short description of the transform
    fn description(&self) -> &str;

    /// Transform a batch
    ///
    /// `ids` hands out creation ids for any command the adapter synthesizes.
    fn apply(
        &self,
        batch: CommandBatch,
        ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError>;
}

/// Arc-wrapped adapter for sharing across threads
pub type AdapterHandle = Arc<dyn CommandAdapter>;

/// Adapters selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterKind {
    StartAndEndLift,
    SpeedUp,
    MirrorOnY,
    LeadIn,
    CheckLimits,
    Pointillism,
    Wavy,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 7] = [
        Self::StartAndEndLift,
        Self::SpeedUp,
        Self::MirrorOnY,
        Self::LeadIn,
        Self::CheckLimits,
        Self::Pointillism,
        Self::Wavy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartAndEndLift => "startAndEndLift",
            Self::SpeedUp => "speedUp",
            Self::MirrorOnY => "mirrorOnY",
            Self::LeadIn => "leadIn",
            Self::CheckLimits => "checkLimits",
            Self::Pointillism => "pointillism",
            Self::Wavy => "wavy",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown adapter '{}'", s))
    }
}

/// Tunables for adapters built from an [`AdapterKind`] list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Safe travel volume checked by `checkLimits`
    pub envelope: BedEnvelope,
    /// Where rejected batches are written; nothing is written when unset
    pub dump_dir: Option<PathBuf>,
    pub lead_in_steps: usize,
    pub pointillism_radius: f64,
    pub wavy_max_oscillation: f64,
    /// Fixed oscillation count; derived from the point count when unset
    pub wavy_oscillations: Option<usize>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            envelope: BedEnvelope::default(),
            dump_dir: None,
            lead_in_steps: motion::DEFAULT_LEAD_IN_STEPS,
            pointillism_radius: style::DEFAULT_DAB_RADIUS,
            wavy_max_oscillation: style::DEFAULT_MAX_OSCILLATION,
            wavy_oscillations: None,
        }
    }
}

/// Ordered list of adapters applied to every stroke
#[derive(Clone, Default)]
pub struct AdapterChain {
    adapters: Vec<AdapterHandle>,
}

impl AdapterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain of the given kinds, in order
    pub fn from_kinds(kinds: &[AdapterKind], options: &AdapterOptions) -> Self {
        let mut chain = Self::new();
        for kind in kinds {
            let adapter: AdapterHandle = match kind {
                AdapterKind::StartAndEndLift => Arc::new(StartAndEndLift),
                AdapterKind::SpeedUp => Arc::new(SpeedUp),
                AdapterKind::MirrorOnY => Arc::new(MirrorOnY),
                AdapterKind::LeadIn => Arc::new(LeadIn::new(options.lead_in_steps)),
                AdapterKind::CheckLimits => Arc::new(CheckLimits::new(
                    options.envelope,
                    options.dump_dir.clone(),
                )),
                AdapterKind::Pointillism => {
                    Arc::new(Pointillism::new(options.pointillism_radius))
                }
                AdapterKind::Wavy => Arc::new(Wavy::new(
                    options.wavy_max_oscillation,
                    options.wavy_oscillations,
                )),
            };
            chain.register(adapter);
        }
        chain
    }

    /// Append an adapter to the end of the chain
    pub fn register(&mut self, adapter: AdapterHandle) -> &mut Self {
        self.adapters.push(adapter);
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Names and descriptions, in execution order
    pub fn list_adapters(&self) -> Vec<(&str, &str)> {
        self.adapters
            .iter()
            .map(|a| (a.name(), a.description()))
            .collect()
    }

    /// Run every adapter over the batch
    pub fn apply(
        &self,
        mut batch: CommandBatch,
        ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        for adapter in &self.adapters {
            batch = adapter.apply(batch, ids).map_err(|e| {
                tracing::warn!("Adapter '{}' rejected batch: {}", adapter.name(), e);
                e
            })?;
            tracing::debug!(
                "Adapter '{}' applied -> {} commands",
                adapter.name(),
                batch.len()
            );
        }
        Ok(batch)
    }
}

impl fmt::Debug for AdapterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in AdapterKind::ALL {
            assert_eq!(kind.as_str().parse::<AdapterKind>(), Ok(kind));
        }
        assert_eq!("MIRRORONY".parse::<AdapterKind>(), Ok(AdapterKind::MirrorOnY));
        assert!("blur".parse::<AdapterKind>().is_err());
    }

    #[test]
    fn test_chain_from_kinds_keeps_order() {
        let chain = AdapterChain::from_kinds(
            &[
                AdapterKind::StartAndEndLift,
                AdapterKind::MirrorOnY,
                AdapterKind::CheckLimits,
            ],
            &AdapterOptions::default(),
        );
        let names: Vec<&str> = chain.list_adapters().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["startAndEndLift", "mirrorOnY", "checkLimits"]);
    }
}
