//! Fixed machine constants
//!
//! Physical dimensions of the painting gantry, its pot board and brush
//! holders. Coordinates are in millimetres, feed rates in mm/min. Bed limits
//! are expressed in machine space (x and y negated relative to software
//! space).

/// Size in bytes of the controller's serial input buffer.
pub const MAX_BUFFER_SIZE: usize = 128;
/// Highest feed rate the controller is ever asked for.
pub const MAX_FEED_RATE: f64 = 14000.0;

/// Pot board corner nearest home, X.
pub const POT_BOARD_CORNER_X: f64 = 128.5;
/// Pot board corner nearest home, Y.
pub const POT_BOARD_CORNER_Y: f64 = 128.0;
pub const POT_BOARD_WIDTH: f64 = 110.0;
pub const POT_BOARD_THICKNESS: f64 = 8.0;
pub const POT_DIAMETER: f64 = 75.0;
pub const POT_HEIGHT: f64 = 45.0;
pub const POT_DEPTH: f64 = 30.0;
/// Centre-to-centre distance between neighbouring pots.
pub const POT_SPACING: f64 = 117.3;

/// Z at which the brush tip touches the canvas.
pub const BRUSH_TIP_Z_OFFSET: f64 = -58.0;
/// Safe height for the gripper to slide between the holder plates.
pub const BRUSH_HOLDER_ENTRY_Z: f64 = -45.16;
/// Safe height for the brush to lift at the end of a stroke.
pub const BRUSH_BACKOFF_Z: f64 = -15.0;
/// Half the width of the gripper arm, used by the holder slot table.
pub const HALF_ARM_WIDTH: f64 = 7.0;
/// Y of the holder plate mouth, relative to the board origin.
pub const HOLDER_MOUTH_Y: f64 = 60.0 + 38.0;
/// Y the head retreats to in front of the holder plates.
pub const HOLDER_SAFE_Y: f64 = HOLDER_MOUTH_Y + 15.0;

pub const BED_MAX_X: f64 = 0.0;
pub const BED_MIN_X: f64 = -800.0;
pub const BED_MAX_Y: f64 = -65.0;
pub const BED_MIN_Y: f64 = -1198.0;
pub const BED_MAX_Z: f64 = 0.0;
pub const BED_MIN_Z: f64 = -80.0;

/// Feed rate for free travel and procedural motion.
pub const BASE_FEED_RATE: f64 = 12000.0;
/// Feed rate inside the brush holder plates.
pub const HOLDER_FEED_RATE: f64 = 6000.0;
/// Feed rate used by the speed-up and lead-in adapters.
pub const FAST_FEED_RATE: f64 = 8000.0;
/// Feed rate of pointillism dabs.
pub const DAB_FEED_RATE: f64 = 10000.0;

/// Stroke length budget per holder slot, largest brush first.
pub const MAX_STROKE_LENGTHS: [f64; 3] = [650.0, 300.0, 150.0];

/// Number of brush slots in one holder station.
pub const HOLDER_SLOTS: usize = 3;

/// Number of pots assumed when no pot configuration is supplied.
pub const DEFAULT_POT_COUNT: usize = 6;

/// Axis-aligned safe travel volume, in machine space.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BedEnvelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl BedEnvelope {
    /// Bounds for the given axis letter.
    pub fn axis(&self, axis: char) -> (f64, f64) {
        match axis {
            'X' => (self.min_x, self.max_x),
            'Y' => (self.min_y, self.max_y),
            _ => (self.min_z, self.max_z),
        }
    }
}

impl Default for BedEnvelope {
    fn default() -> Self {
        Self {
            min_x: BED_MIN_X,
            max_x: BED_MAX_X,
            min_y: BED_MIN_Y,
            max_y: BED_MAX_Y,
            min_z: BED_MIN_Z,
            max_z: BED_MAX_Z,
        }
    }
}
