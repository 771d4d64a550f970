//! # PaintKit Resources
//!
//! Physical consumables of the painting machine: holder stations and their
//! brushes, paint pots, the tool head, the paint usage tracker and the refill
//! scheduler that splices pot dips into strokes.

pub mod brush;
pub mod hand;
pub mod pot;
pub mod scheduler;
pub mod tracker;
pub mod workshop;

pub use brush::{Brush, SlotWaypoints};
pub use hand::{BrushRequest, Hand};
pub use pot::{spiral_points, PaintPot, PotState, PotVariant};
pub use scheduler::{schedule_for_brush, schedule_refills};
pub use tracker::{Tracker, TrackerCheckpoint};
pub use workshop::{
    BrushConfig, BrushId, HolderConfig, HolderId, HolderStation, PotConfig, PotId, Workshop,
    WorkshopCheckpoint,
};
