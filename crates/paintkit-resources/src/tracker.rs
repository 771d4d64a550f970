//! Paint usage tracker
//!
//! Counts the planar distance painted since the last refill and, optionally,
//! draws every contact segment on an in-memory canvas that can be written out
//! as a PNG for inspection.
//!
//! Segments are only drawn on [`Tracker::commit`], so a stroke that is rolled
//! back through a [`TrackerCheckpoint`] never reaches the canvas.

use image::{Rgb, RgbImage};
use paintkit_core::constants::{BED_MAX_Y, BED_MIN_X, BED_MIN_Y};
use paintkit_core::{MotionCommand, Result, Tag};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 96, 0]);

/// Distance painted since the last refill
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    length: f64,
    moves: Vec<(f64, f64)>,
    last: Option<(f64, f64)>,
    pending: Vec<((f64, f64), (f64, f64))>,
    canvas: Option<RgbImage>,
}

/// Tracker state to return to when a planned stroke is abandoned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerCheckpoint {
    length: f64,
    moves: usize,
    last: Option<(f64, f64)>,
    pending: usize,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that also draws contact segments, one pixel per millimetre
    pub fn with_canvas() -> Self {
        let width = (-BED_MIN_X).ceil() as u32;
        let height = (BED_MAX_Y - BED_MIN_Y).ceil() as u32;
        Self {
            canvas: Some(RgbImage::from_pixel(width, height, BACKGROUND)),
            ..Self::default()
        }
    }

    /// Painted distance since the last refill
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn add_length(&mut self, distance: f64) {
        self.length += distance;
    }

    /// Brush was just refilled
    pub fn reset(&mut self) {
        self.length = 0.0;
    }

    /// Contact positions recorded so far, in order
    pub fn moves(&self) -> &[(f64, f64)] {
        &self.moves
    }

    /// Lift the pen; the next recorded point starts a new segment
    pub fn begin_stroke(&mut self) {
        self.last = None;
    }

    /// Log a contact command and draw the segment from the previous one
    pub fn record(&mut self, command: &MotionCommand) {
        if !command.has_tag(Tag::Contact) {
            return;
        }
        let Some(point) = command.xy() else {
            return;
        };
        self.moves.push(point);
        if let (Some(_), Some(from)) = (&self.canvas, self.last) {
            self.pending.push((from, point));
        }
        self.last = Some(point);
    }

    pub fn checkpoint(&self) -> TrackerCheckpoint {
        TrackerCheckpoint {
            length: self.length,
            moves: self.moves.len(),
            last: self.last,
            pending: self.pending.len(),
        }
    }

    /// Forget everything recorded since `checkpoint`
    pub fn restore(&mut self, checkpoint: TrackerCheckpoint) {
        self.length = checkpoint.length;
        self.moves.truncate(checkpoint.moves);
        self.last = checkpoint.last;
        self.pending.truncate(checkpoint.pending);
    }

    /// Draw the segments recorded since the last commit
    pub fn commit(&mut self) {
        if let Some(canvas) = self.canvas.as_mut() {
            for (from, to) in self.pending.drain(..) {
                draw_line(canvas, from, to);
            }
        }
    }

    pub fn canvas(&self) -> Option<&RgbImage> {
        self.canvas.as_ref()
    }

    /// Write the canvas as an image; a tracker without a canvas writes nothing
    pub fn save_canvas(&self, path: &Path) -> Result<()> {
        if let Some(canvas) = &self.canvas {
            canvas.save(path).map_err(|e| {
                paintkit_core::Error::other(format!(
                    "Failed to save tracker canvas to {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!("Saved tracker canvas to {}", path.display());
        }
        Ok(())
    }
}

fn draw_line(canvas: &mut RgbImage, from: (f64, f64), to: (f64, f64)) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = from.0 + (to.0 - from.0) * t;
        let y = from.1 + (to.1 - from.1) * t;
        if x < 0.0 || y < 0.0 {
            continue;
        }
        let (px, py) = (x.round() as u32, y.round() as u32);
        if px < canvas.width() && py < canvas.height() {
            canvas.put_pixel(px, py, INK);
        }
    }
}
