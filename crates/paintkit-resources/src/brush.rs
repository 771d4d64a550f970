//! Brushes and their holder slot waypoints
//!
//! Each holder station has three slots. A slot is reached through its entrance
//! at the mouth of the holder plates, then a corner, then the seat where the
//! brush rests. The pickup and drop sequences for a brush are computed once
//! from those waypoints.

use crate::workshop::{HolderId, PotId};
use paintkit_core::constants::{
    BASE_FEED_RATE, BRUSH_HOLDER_ENTRY_Z, HALF_ARM_WIDTH, HOLDER_FEED_RATE, HOLDER_MOUTH_Y,
    HOLDER_SAFE_Y, HOLDER_SLOTS, MAX_STROKE_LENGTHS,
};
use paintkit_core::{CommandBatch, CommandIdGenerator, MotionCommand, Tag};

const PICKUP_TAGS: &[Tag] = &[Tag::Required, Tag::BrushChange, Tag::Pickup];
const DROP_TAGS: &[Tag] = &[Tag::Required, Tag::BrushChange, Tag::Drop];

/// Approach, turn and rest points of one holder slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotWaypoints {
    pub entrance: (f64, f64),
    pub corner: (f64, f64),
    pub seat: (f64, f64),
}

impl SlotWaypoints {
    /// Waypoints for `slot` of a holder whose origin is at `(hx, hy)`
    pub fn for_slot(slot: usize, hx: f64, hy: f64) -> Option<Self> {
        let arm = HALF_ARM_WIDTH;
        let waypoints = match slot {
            0 => Self {
                entrance: (hx + 25.0 + arm, hy + 40.0),
                corner: (hx + 25.0 + arm, hy - 2.0),
                seat: (hx + 10.0 + arm, hy - 2.0),
            },
            1 => Self {
                entrance: (hx + 64.0 + arm, hy + 40.0),
                corner: (hx + 64.0 + arm, hy - 2.0),
                seat: (hx + 51.0 + arm, hy - 2.0),
            },
            2 => Self {
                entrance: (hx + 96.3 + arm, hy + 40.0),
                corner: (hx + 96.3 + arm, hy + 1.77),
                seat: (hx + 86.3 + arm - 3.0, hy + 1.77),
            },
            _ => return None,
        };
        Some(waypoints)
    }
}

/// A brush seated in one holder slot
#[derive(Debug, Clone)]
pub struct Brush {
    /// Nominal brush size label
    pub size: String,
    /// Station this brush lives in
    pub holder: HolderId,
    /// Slot position within the station
    pub slot: usize,
    /// Pot this brush dips into
    pub pot: PotId,
    pub waypoints: SlotWaypoints,
    /// Paint budget in mm of contact path between refills
    pub max_stroke_length: f64,
    /// Set once the brush has been picked up
    pub used: bool,
    pickup: CommandBatch,
    drop: CommandBatch,
}

impl Brush {
    /// Build a brush and precompute its holder sequences
    ///
    /// Returns `None` if `slot` is not a valid holder slot.
    pub fn new(
        ids: &CommandIdGenerator,
        size: impl Into<String>,
        holder: HolderId,
        holder_origin: (f64, f64),
        slot: usize,
        pot: PotId,
        pot_center: (f64, f64),
    ) -> Option<Self> {
        if slot >= HOLDER_SLOTS {
            return None;
        }
        let waypoints = SlotWaypoints::for_slot(slot, holder_origin.0, holder_origin.1)?;
        Some(Self {
            size: size.into(),
            holder,
            slot,
            pot,
            waypoints,
            max_stroke_length: MAX_STROKE_LENGTHS[slot],
            used: false,
            pickup: pickup_sequence(ids, &waypoints, pot_center),
            drop: drop_sequence(ids, &waypoints, pot_center),
        })
    }

    /// Commands that take this brush out of its slot and park at its pot
    ///
    /// The first pickup of a session starts with a setup move to a known
    /// height.
    pub fn pickup(&self, is_first: bool) -> CommandBatch {
        if is_first {
            self.pickup.clone()
        } else {
            self.pickup.iter().skip(1).cloned().collect()
        }
    }

    /// Commands that put this brush back into its slot
    pub fn drop_sequence(&self) -> CommandBatch {
        self.drop.clone()
    }
}

fn pickup_sequence(
    ids: &CommandIdGenerator,
    w: &SlotWaypoints,
    pot_center: (f64, f64),
) -> CommandBatch {
    let base = |ids: &CommandIdGenerator| ids.motion(BASE_FEED_RATE);
    let holder = |ids: &CommandIdGenerator| ids.motion(HOLDER_FEED_RATE);

    let commands: Vec<MotionCommand> = vec![
        base(ids).with_y(300.0).with_z(-45.0),
        base(ids).with_z(0.0),
        base(ids).with_xy(pot_center.0, pot_center.1),
        base(ids).with_xy(w.seat.0, HOLDER_SAFE_Y),
        base(ids).with_z(BRUSH_HOLDER_ENTRY_Z),
        holder(ids).with_xy(w.seat.0, w.seat.1),
        holder(ids).with_xy(w.corner.0, w.corner.1),
        holder(ids).with_y(HOLDER_MOUTH_Y),
        base(ids).with_xy(w.entrance.0, HOLDER_SAFE_Y),
        base(ids).with_z(0.0),
        base(ids).with_xy(pot_center.0, pot_center.1),
    ];
    commands.into_iter().map(|c| c.tagged(PICKUP_TAGS)).collect()
}

fn drop_sequence(
    ids: &CommandIdGenerator,
    w: &SlotWaypoints,
    pot_center: (f64, f64),
) -> CommandBatch {
    let base = |ids: &CommandIdGenerator| ids.motion(BASE_FEED_RATE);
    let holder = |ids: &CommandIdGenerator| ids.motion(HOLDER_FEED_RATE);

    let commands: Vec<MotionCommand> = vec![
        base(ids).with_z(0.0),
        base(ids).with_xy(w.entrance.0, HOLDER_SAFE_Y),
        base(ids).with_z(BRUSH_HOLDER_ENTRY_Z),
        holder(ids).with_y(HOLDER_MOUTH_Y),
        holder(ids).with_xy(w.entrance.0, w.corner.1),
        holder(ids).with_xy(w.seat.0, w.seat.1),
        // release the brush below the plate
        holder(ids).with_z(BRUSH_HOLDER_ENTRY_Z - 2.25),
        base(ids).with_y(HOLDER_SAFE_Y),
        base(ids).with_z(0.0),
        base(ids).with_xy(pot_center.0, pot_center.1),
    ];
    commands.into_iter().map(|c| c.tagged(DROP_TAGS)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brush(slot: usize) -> Brush {
        let ids = CommandIdGenerator::new();
        Brush::new(
            &ids,
            "1",
            HolderId(0),
            (100.0, 20.0),
            slot,
            PotId(0),
            (186.0, 183.0),
        )
        .expect("valid slot")
    }

    #[test]
    fn test_slot_table() {
        let w = SlotWaypoints::for_slot(2, 100.0, 20.0).unwrap();
        assert!((w.entrance.0 - 203.3).abs() < 1e-9);
        assert!((w.corner.1 - 21.77).abs() < 1e-9);
        assert!((w.seat.0 - 190.3).abs() < 1e-9);
        assert!(SlotWaypoints::for_slot(3, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_max_stroke_length_by_slot() {
        assert_eq!(brush(0).max_stroke_length, 650.0);
        assert_eq!(brush(1).max_stroke_length, 300.0);
        assert_eq!(brush(2).max_stroke_length, 150.0);
    }

    #[test]
    fn test_pickup_setup_only_first_time() {
        let b = brush(1);
        let first = b.pickup(true);
        let later = b.pickup(false);
        assert_eq!(first.len(), 11);
        assert_eq!(later.len(), 10);
        assert_eq!(first[0].y, Some(300.0));
        assert_eq!(later[0].z, Some(0.0));
        assert!(first
            .iter()
            .all(|c| c.has_tag(Tag::Required) && c.has_tag(Tag::Pickup)));
    }

    #[test]
    fn test_drop_releases_below_entry() {
        let b = brush(0);
        let drop = b.drop_sequence();
        assert_eq!(drop.len(), 10);
        let release = &drop[6];
        assert_eq!(release.z, Some(BRUSH_HOLDER_ENTRY_Z - 2.25));
        assert_eq!(release.feed, HOLDER_FEED_RATE);
        assert!(drop.iter().all(|c| c.has_tag(Tag::Drop)));
        // ends parked over the pot
        assert_eq!(drop[9].xy(), Some((186.0, 183.0)));
    }

    #[test]
    fn test_invalid_slot() {
        let ids = CommandIdGenerator::new();
        assert!(Brush::new(&ids, "1", HolderId(0), (0.0, 0.0), 3, PotId(0), (0.0, 0.0)).is_none());
    }
}
