//! Data models for head position tracking

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::MotionCommand;

/// Head position in software space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
}

impl Position {
    /// Create a new position with X, Y, Z coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Apply the axes a command moves, leaving the others unchanged
    pub fn apply(&mut self, command: &MotionCommand) {
        if let Some(x) = command.x {
            self.x = x;
        }
        if let Some(y) = command.y {
            self.y = y;
        }
        if let Some(z) = command.z {
            self.z = z;
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandIdGenerator;

    #[test]
    fn test_apply_keeps_unset_axes() {
        let ids = CommandIdGenerator::new();
        let mut pos = Position::new(1.0, 2.0, 3.0);
        pos.apply(&ids.motion(100.0).with_z(-10.0));
        assert_eq!(pos, Position::new(1.0, 2.0, -10.0));
        pos.apply(&ids.motion(100.0).with_xy(5.0, 6.0));
        assert_eq!(pos, Position::new(5.0, 6.0, -10.0));
    }
}
