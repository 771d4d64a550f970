//! The tool head and brush swapping

use crate::tracker::Tracker;
use crate::workshop::{BrushId, PotId, Workshop};
use paintkit_core::{CommandBatch, CommandIdGenerator, MotionCommand, Position, Result};

/// Brush wanted by an incoming stroke, as indices into the workshop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushRequest {
    /// Holder index serving the color
    pub color_index: i64,
    /// Slot within the holder
    pub slot_index: i64,
}

impl BrushRequest {
    /// Decode the wire labels
    ///
    /// The color label starts with a one-based holder number, the size label
    /// with a size number where 3 is the largest brush in slot 0.
    pub fn from_labels(color: &str, size: &str) -> Option<Self> {
        let color_number: i64 = leading_number(color)?;
        let size_number: i64 = leading_number(size)?;
        Some(Self {
            color_index: color_number - 1,
            slot_index: 3 - size_number,
        })
    }
}

fn leading_number(label: &str) -> Option<i64> {
    label.split_whitespace().next()?.parse().ok()
}

/// Head of the machine
#[derive(Debug, Clone, Default)]
pub struct Hand {
    /// Last commanded position
    pub position: Position,
    /// Brush on the gripper, if any
    pub current_brush: Option<BrushId>,
    /// Pot the head last refilled from
    pub current_pot: Option<PotId>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the mounted brush differs from the one `request` selects
    ///
    /// The color side is compared against the index of the pot the mounted
    /// brush dips into.
    pub fn needs_swap(&self, workshop: &Workshop, request: BrushRequest) -> bool {
        match self.current_brush {
            None => true,
            Some(id) => {
                let brush = workshop.brush(id);
                let pot = workshop.pot(brush.pot);
                brush.slot as i64 != request.slot_index || pot.index as i64 != request.color_index
            }
        }
    }

    /// Drop the mounted brush, pick up the requested one and refill it
    ///
    /// A request with no matching brush falls back to the first brush of the
    /// first holder.
    pub fn swap_brush(
        &mut self,
        workshop: &mut Workshop,
        tracker: &mut Tracker,
        ids: &CommandIdGenerator,
        request: BrushRequest,
    ) -> Result<CommandBatch> {
        let mut commands = CommandBatch::new();
        let is_first = self.current_brush.is_none();
        if let Some(current) = self.current_brush.take() {
            commands.extend(workshop.brush(current).drop_sequence());
        }

        let next = match workshop.find_brush(request.color_index, request.slot_index) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("{}; falling back to the default brush", e);
                workshop.default_brush()?
            }
        };

        let brush = workshop.brush_mut(next);
        brush.used = true;
        tracing::info!(
            "Mounting brush {} (slot {}, pot {})",
            brush.size,
            brush.slot,
            brush.pot.0
        );
        let pot = brush.pot;
        commands.extend(brush.pickup(is_first));
        commands.extend(workshop.refill(ids, next, None));

        self.current_brush = Some(next);
        self.current_pot = Some(pot);
        tracker.reset();
        Ok(commands)
    }

    /// Put the mounted brush back, if any
    pub fn release_brush(&mut self, workshop: &Workshop) -> CommandBatch {
        match self.current_brush.take() {
            Some(id) => workshop.brush(id).drop_sequence(),
            None => CommandBatch::new(),
        }
    }

    /// Follow a batch that was sent to the controller
    pub fn follow(&mut self, commands: &[MotionCommand]) {
        for command in commands {
            self.position.apply(command);
        }
    }
}
