//! Geometric adapters: lifts, speed, mirroring and lead-in paths

use super::CommandAdapter;
use nalgebra::{DMatrix, DVector};
use paintkit_core::constants::{
    BASE_FEED_RATE, BED_MIN_Y, BRUSH_HOLDER_ENTRY_Z, BRUSH_TIP_Z_OFFSET, FAST_FEED_RATE,
};
use paintkit_core::{CommandBatch, CommandIdGenerator, StrokeError, Tag};

pub(super) const DEFAULT_LEAD_IN_STEPS: usize = 20;

/// Lift to z=0 before and after the stroke, entering above the first point
#[derive(Debug, Clone, Copy, Default)]
pub struct StartAndEndLift;

impl CommandAdapter for StartAndEndLift {
    fn name(&self) -> &str {
        "startAndEndLift"
    }

    fn description(&self) -> &str {
        "Lift before and after the stroke"
    }

    fn apply(
        &self,
        batch: CommandBatch,
        ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        let (x, y) = batch
            .iter()
            .find_map(|c| c.xy())
            .ok_or(StrokeError::EmptyBatch)?;

        let mut out = CommandBatch::with_capacity(batch.len() + 3);
        out.push(
            ids.motion(BASE_FEED_RATE)
                .with_z(0.0)
                .tagged(&[Tag::Adapter, Tag::Lift]),
        );
        out.push(
            ids.motion(BASE_FEED_RATE)
                .with_xyz(x, y, 0.0)
                .tagged(&[Tag::Contact]),
        );
        out.extend(batch);
        out.push(
            ids.motion(BASE_FEED_RATE)
                .with_z(0.0)
                .tagged(&[Tag::Adapter, Tag::Lift]),
        );
        Ok(out)
    }
}

/// Fixed fast feed with coordinates rounded to hundredths
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedUp;

impl CommandAdapter for SpeedUp {
    fn name(&self) -> &str {
        "speedUp"
    }

    fn description(&self) -> &str {
        "Force a fast feed rate"
    }

    fn apply(
        &self,
        mut batch: CommandBatch,
        _ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        let round = |v: f64| (v * 100.0).round() / 100.0;
        for command in batch.iter_mut() {
            command.feed = FAST_FEED_RATE;
            command.x = command.x.map(round);
            command.y = command.y.map(round);
        }
        Ok(batch)
    }
}

/// Flip contact Y into the far side of the bed: `y' = |BED_MIN_Y + y|`
///
/// Not an involution; applying it twice does not restore the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorOnY;

impl CommandAdapter for MirrorOnY {
    fn name(&self) -> &str {
        "mirrorOnY"
    }

    fn description(&self) -> &str {
        "Mirror contact points on Y"
    }

    fn apply(
        &self,
        mut batch: CommandBatch,
        _ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        for command in batch.iter_mut().filter(|c| c.has_tag(Tag::Contact)) {
            if let Some(y) = command.y {
                command.y = Some((BED_MIN_Y + y).abs());
                command.tags.extend(&[Tag::MirrorOnY, Tag::Adapter]);
            }
        }
        Ok(batch)
    }
}

/// Quadratic approach path extrapolated from the start of the stroke
#[derive(Debug, Clone, Copy)]
pub struct LeadIn {
    steps: usize,
}

impl LeadIn {
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }
}

impl Default for LeadIn {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_IN_STEPS)
    }
}

impl CommandAdapter for LeadIn {
    fn name(&self) -> &str {
        "leadIn"
    }

    fn description(&self) -> &str {
        "Prepend a curved lead-in path"
    }

    fn apply(
        &self,
        batch: CommandBatch,
        ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        if batch.has_tag(Tag::Pointillism) {
            return Err(StrokeError::UnsupportedCombination {
                reason: "lead-in cannot follow pointillism".to_string(),
            });
        }
        let mut steps = self.steps;
        if batch.len() < steps * 2 {
            steps = batch.len() / 10;
        }
        let samples: Vec<(f64, f64)> = batch.iter().filter_map(|c| c.xy()).take(steps).collect();
        let Some(&(start_x, _)) = samples.first() else {
            return Ok(batch);
        };
        if steps == 0 {
            return Ok(batch);
        }
        let Some(coefficients) = fit_quadratic(&samples) else {
            tracing::warn!("Lead-in fit failed, leaving stroke unchanged");
            return Ok(batch);
        };

        let mut out = CommandBatch::with_capacity(batch.len() + steps);
        for (i, x) in linspace(start_x, start_x + steps as f64, steps).enumerate() {
            let z = if i == 0 {
                BRUSH_HOLDER_ENTRY_Z
            } else {
                BRUSH_TIP_Z_OFFSET
            };
            let y = coefficients[0] * x * x + coefficients[1] * x + coefficients[2];
            out.push(
                ids.motion(FAST_FEED_RATE)
                    .with_xyz(x, y, z)
                    .tagged(&[Tag::Adapter, Tag::LeadIn]),
            );
        }
        out.extend(batch);
        Ok(out)
    }
}

/// Least-squares `y = a·x² + b·x + c`; returns `[a, b, c]`
pub fn fit_quadratic(points: &[(f64, f64)]) -> Option<[f64; 3]> {
    let design = DMatrix::from_fn(points.len(), 3, |r, c| points[r].0.powi(2 - c as i32));
    let targets = DVector::from_iterator(points.len(), points.iter().map(|p| p.1));
    let solution = design.svd(true, true).solve(&targets, 1e-12).ok()?;
    let coefficients = [solution[0], solution[1], solution[2]];
    coefficients
        .iter()
        .all(|c| c.is_finite())
        .then_some(coefficients)
}

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(move |i| {
        if n == 1 {
            start
        } else {
            start + (end - start) * i as f64 / (n - 1) as f64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_line(ids: &CommandIdGenerator, n: usize) -> CommandBatch {
        (0..n)
            .map(|i| {
                let x = i as f64;
                ids.motion(6000.0)
                    .with_xyz(x, 0.5 * x * x + 2.0, -58.0)
                    .tagged(&[Tag::Contact])
            })
            .collect()
    }

    #[test]
    fn test_start_and_end_lift() {
        let ids = CommandIdGenerator::new();
        let out = StartAndEndLift.apply(contact_line(&ids, 3), &ids).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[0].to_gcode(), "G1 Z0.000 F12000");
        assert!(out[0].has_tag(Tag::Lift));
        assert_eq!(out[1].xy(), Some((0.0, 2.0)));
        assert_eq!(out[1].z, Some(0.0));
        assert!(out[1].has_tag(Tag::Contact));
        assert!(out[5].has_tag(Tag::Lift) && out[5].x.is_none());
    }

    #[test]
    fn test_start_and_end_lift_needs_a_point() {
        let ids = CommandIdGenerator::new();
        let err = StartAndEndLift.apply(CommandBatch::new(), &ids).unwrap_err();
        assert_eq!(err, StrokeError::EmptyBatch);
    }

    #[test]
    fn test_speed_up_rounds() {
        let ids = CommandIdGenerator::new();
        let batch: CommandBatch = vec![ids.motion(100.0).with_xy(1.23456, 7.899)].into();
        let out = SpeedUp.apply(batch, &ids).unwrap();
        assert_eq!(out[0].feed, FAST_FEED_RATE);
        assert_eq!(out[0].xy(), Some((1.23, 7.9)));
    }

    #[test]
    fn test_mirror_is_not_involutive() {
        let ids = CommandIdGenerator::new();
        let batch: CommandBatch = vec![
            ids.motion(100.0).with_xy(10.0, 50.0).tagged(&[Tag::Contact]),
            ids.motion(100.0).with_xy(10.0, 50.0).tagged(&[Tag::Required]),
        ]
        .into();
        let once = MirrorOnY.apply(batch, &ids).unwrap();
        assert_eq!(once[0].y, Some(1148.0));
        assert!(once[0].has_tag(Tag::MirrorOnY) && once[0].has_tag(Tag::Adapter));
        assert_eq!(once[1].y, Some(50.0));

        let twice = MirrorOnY.apply(once, &ids).unwrap();
        assert_eq!(twice[0].y, Some(50.0));
        assert_ne!(twice[0].y, Some(1148.0));
    }

    #[test]
    fn test_fit_quadratic_recovers_parabola() {
        let points: Vec<(f64, f64)> = (0..10)
            .map(|i| {
                let x = i as f64;
                (x, 0.5 * x * x - 3.0 * x + 2.0)
            })
            .collect();
        let [a, b, c] = fit_quadratic(&points).unwrap();
        assert!((a - 0.5).abs() < 1e-6);
        assert!((b + 3.0).abs() < 1e-6);
        assert!((c - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_lead_in_prepends_steps() {
        let ids = CommandIdGenerator::new();
        let out = LeadIn::default().apply(contact_line(&ids, 50), &ids).unwrap();
        assert_eq!(out.len(), 70);
        assert_eq!(out[0].z, Some(BRUSH_HOLDER_ENTRY_Z));
        assert!(out[1..20].iter().all(|c| c.z == Some(BRUSH_TIP_Z_OFFSET)));
        assert!(out[..20]
            .iter()
            .all(|c| c.has_tag(Tag::LeadIn) && c.feed == FAST_FEED_RATE));
        // follows the fitted parabola
        let (x, y) = out[19].xy().unwrap();
        assert!((x - 20.0).abs() < 1e-9);
        assert!((y - (0.5 * 400.0 + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_lead_in_short_batch_reduces_steps() {
        let ids = CommandIdGenerator::new();
        let out = LeadIn::default().apply(contact_line(&ids, 30), &ids).unwrap();
        assert_eq!(out.len(), 33);

        let tiny = LeadIn::default().apply(contact_line(&ids, 5), &ids).unwrap();
        assert_eq!(tiny.len(), 5);
    }

    #[test]
    fn test_lead_in_rejects_pointillism() {
        let ids = CommandIdGenerator::new();
        let batch: CommandBatch = vec![ids
            .motion(100.0)
            .with_xy(0.0, 0.0)
            .tagged(&[Tag::Pointillism])]
        .into();
        let err = LeadIn::default().apply(batch, &ids).unwrap_err();
        assert!(matches!(err, StrokeError::UnsupportedCombination { .. }));
    }
}
