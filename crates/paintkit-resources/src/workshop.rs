//! Resource arena: holder stations, brushes and paint pots
//!
//! Resources refer to each other through integer handles into the
//! [`Workshop`]'s vectors. A brush knows its holder and pot by id, a holder
//! knows its brushes by id, and the hand points at the mounted brush by id.

use crate::brush::Brush;
use crate::pot::{PaintPot, PotState, PotVariant};
use paintkit_core::constants::{DEFAULT_POT_COUNT, HOLDER_SLOTS};
use paintkit_core::{CommandBatch, CommandIdGenerator, ConfigError, ResourceError, Result};
use serde::{Deserialize, Serialize};

/// Handle of a holder station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(pub usize);

/// Handle of a brush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrushId(pub usize);

/// Handle of a paint pot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PotId(pub usize);

/// One brush entry of a holder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushConfig {
    pub size: String,
}

/// One holder station as found in the holder configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderConfig {
    /// Position on the holder rail; also selects the pot the brushes use
    pub index: usize,
    /// Color label the station serves
    #[serde(rename = "colorIdx")]
    pub color_idx: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub brushes: Vec<BrushConfig>,
}

/// One pot as found in the pot configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotConfig {
    pub index: usize,
    #[serde(default)]
    pub color: Option<String>,
}

/// A holder station with up to three brushes
#[derive(Debug, Clone)]
pub struct HolderStation {
    pub index: usize,
    pub color_idx: String,
    pub x: f64,
    pub y: f64,
    pub brushes: Vec<BrushId>,
}

/// Per-stroke mutable state of a [`Workshop`]
#[derive(Debug, Clone)]
pub struct WorkshopCheckpoint {
    used: Vec<bool>,
    pots: Vec<PotState>,
}

/// Owner of every holder, brush and pot
#[derive(Debug, Clone, Default)]
pub struct Workshop {
    holders: Vec<HolderStation>,
    brushes: Vec<Brush>,
    pots: Vec<PaintPot>,
}

impl Workshop {
    /// Build the arena from configuration
    ///
    /// With no pot entries, [`DEFAULT_POT_COUNT`] unlabelled pots are created.
    /// Each holder's brushes dip into the pot at the holder's `index`.
    pub fn build(
        ids: &CommandIdGenerator,
        holders: &[HolderConfig],
        pots: &[PotConfig],
        variant: PotVariant,
    ) -> Result<Self> {
        let pots: Vec<PaintPot> = if pots.is_empty() {
            (0..DEFAULT_POT_COUNT)
                .map(|i| PaintPot::new(ids, i, None, variant))
                .collect()
        } else {
            pots.iter()
                .map(|p| PaintPot::new(ids, p.index, p.color.clone(), variant))
                .collect()
        };
        Self::with_pots(ids, holders, pots)
    }

    /// Build the arena around an already constructed set of pots
    pub fn with_pots(
        ids: &CommandIdGenerator,
        holders: &[HolderConfig],
        pots: Vec<PaintPot>,
    ) -> Result<Self> {
        let mut workshop = Self {
            holders: Vec::with_capacity(holders.len()),
            brushes: Vec::new(),
            pots,
        };

        for config in holders {
            if config.brushes.len() > HOLDER_SLOTS {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "holder {} lists {} brushes, only {} slots exist",
                        config.index,
                        config.brushes.len(),
                        HOLDER_SLOTS
                    ),
                }
                .into());
            }
            let holder_id = HolderId(workshop.holders.len());
            let pot_id = PotId(config.index);
            let pot = workshop
                .pots
                .get(config.index)
                .ok_or(ResourceError::PotMissing {
                    holder_index: config.index,
                })?;
            let pot_center = (pot.x, pot.y);

            let mut brush_ids = Vec::with_capacity(config.brushes.len());
            for (slot, brush) in config.brushes.iter().enumerate() {
                let brush = Brush::new(
                    ids,
                    brush.size.clone(),
                    holder_id,
                    (config.x, config.y),
                    slot,
                    pot_id,
                    pot_center,
                )
                .ok_or_else(|| ConfigError::Invalid {
                    reason: format!("holder {} has no slot {}", config.index, slot),
                })?;
                brush_ids.push(BrushId(workshop.brushes.len()));
                workshop.brushes.push(brush);
            }

            tracing::debug!(
                "Holder {} ({}) at ({:.1}, {:.1}) with {} brushes",
                config.index,
                config.color_idx,
                config.x,
                config.y,
                brush_ids.len()
            );
            workshop.holders.push(HolderStation {
                index: config.index,
                color_idx: config.color_idx.clone(),
                x: config.x,
                y: config.y,
                brushes: brush_ids,
            });
        }

        Ok(workshop)
    }

    pub fn holders(&self) -> &[HolderStation] {
        &self.holders
    }

    pub fn pots(&self) -> &[PaintPot] {
        &self.pots
    }

    pub fn holder(&self, id: HolderId) -> &HolderStation {
        &self.holders[id.0]
    }

    pub fn brush(&self, id: BrushId) -> &Brush {
        &self.brushes[id.0]
    }

    pub fn brush_mut(&mut self, id: BrushId) -> &mut Brush {
        &mut self.brushes[id.0]
    }

    pub fn pot(&self, id: PotId) -> &PaintPot {
        &self.pots[id.0]
    }

    pub fn pot_mut(&mut self, id: PotId) -> &mut PaintPot {
        &mut self.pots[id.0]
    }

    /// Find the brush in `slot_index` of the holder whose index is `color_index`
    pub fn find_brush(
        &self,
        color_index: i64,
        slot_index: i64,
    ) -> std::result::Result<BrushId, ResourceError> {
        let miss = ResourceError::LookupMiss {
            color_index,
            slot_index,
        };
        let holder = self
            .holders
            .iter()
            .find(|h| h.index as i64 == color_index)
            .ok_or_else(|| miss.clone())?;
        usize::try_from(slot_index)
            .ok()
            .and_then(|slot| holder.brushes.get(slot))
            .copied()
            .ok_or(miss)
    }

    /// First brush of the first holder; the fallback for lookup misses
    pub fn default_brush(&self) -> std::result::Result<BrushId, ResourceError> {
        self.holders
            .first()
            .and_then(|h| h.brushes.first())
            .copied()
            .ok_or(ResourceError::NoHolders)
    }

    pub fn checkpoint(&self) -> WorkshopCheckpoint {
        WorkshopCheckpoint {
            used: self.brushes.iter().map(|b| b.used).collect(),
            pots: self.pots.iter().map(PaintPot::state).collect(),
        }
    }

    /// Undo brush usage and pot motion since `checkpoint`
    pub fn restore(&mut self, checkpoint: WorkshopCheckpoint) {
        for (brush, used) in self.brushes.iter_mut().zip(checkpoint.used) {
            brush.used = used;
        }
        for (pot, state) in self.pots.iter_mut().zip(checkpoint.pots) {
            pot.restore(state);
        }
    }

    /// Refill motion at the pot of `brush`
    pub fn refill(
        &mut self,
        ids: &CommandIdGenerator,
        brush: BrushId,
        resume_at: Option<(f64, f64)>,
    ) -> CommandBatch {
        let pot = self.brushes[brush.0].pot;
        self.pots[pot.0].use_pot(ids, resume_at)
    }
}
