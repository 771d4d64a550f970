//! Bed envelope check

use super::CommandAdapter;
use paintkit_core::{BedEnvelope, CommandBatch, CommandIdGenerator, StrokeError};
use std::fs;
use std::path::{Path, PathBuf};

/// Reject any batch that leaves the safe travel volume
///
/// Extents are taken in machine space over every axis value present in the
/// batch. A rejected batch is written to the dump directory, when one is set.
#[derive(Debug, Clone, Default)]
pub struct CheckLimits {
    envelope: BedEnvelope,
    dump_dir: Option<PathBuf>,
}

impl CheckLimits {
    pub fn new(envelope: BedEnvelope, dump_dir: Option<PathBuf>) -> Self {
        Self { envelope, dump_dir }
    }

    /// First envelope violation in the batch, if any
    pub fn violation(&self, batch: &CommandBatch) -> Option<StrokeError> {
        let coords: Vec<_> = batch.iter().map(|c| c.machine_coords()).collect();
        let axes: [(char, Vec<f64>); 3] = [
            ('X', coords.iter().filter_map(|c| c.0).collect()),
            ('Y', coords.iter().filter_map(|c| c.1).collect()),
            ('Z', coords.iter().filter_map(|c| c.2).collect()),
        ];

        for (axis, values) in axes {
            if values.is_empty() {
                continue;
            }
            let (min, max) = self.envelope.axis(axis);
            if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
                return Some(StrokeError::BoundsViolation {
                    axis,
                    value,
                    min,
                    max,
                });
            }
            let low = values.iter().copied().fold(f64::INFINITY, f64::min);
            let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let value = if low < min {
                low
            } else if high > max {
                high
            } else {
                continue;
            };
            return Some(StrokeError::BoundsViolation {
                axis,
                value,
                min,
                max,
            });
        }
        None
    }

    fn dump(&self, dir: &Path, batch: &CommandBatch) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let path = dir.join(format!("limits-{}.gcode", stamp));
        let mut text = String::new();
        for command in batch.iter() {
            let tags: Vec<String> = command.tags.iter().map(|t| t.to_string()).collect();
            text.push_str(&format!("{} ; {} [{}]\n", command, command.id, tags.join(",")));
        }
        fs::write(&path, text)?;
        Ok(path)
    }
}

impl CommandAdapter for CheckLimits {
    fn name(&self) -> &str {
        "checkLimits"
    }

    fn description(&self) -> &str {
        "Reject commands outside the bed envelope"
    }

    fn apply(
        &self,
        batch: CommandBatch,
        _ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        let Some(violation) = self.violation(&batch) else {
            return Ok(batch);
        };
        tracing::error!("{}", violation);
        if let Some(dir) = &self.dump_dir {
            match self.dump(dir, &batch) {
                Ok(path) => tracing::error!("Rejected batch written to {}", path.display()),
                Err(e) => tracing::warn!("Failed to dump rejected batch: {}", e),
            }
        }
        Err(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintkit_core::constants::{BED_MAX_Y, BED_MIN_X, BED_MIN_Y, BED_MIN_Z};

    fn point(ids: &CommandIdGenerator, x: f64, y: f64, z: f64) -> CommandBatch {
        vec![ids.motion(100.0).with_xyz(x, y, z)].into()
    }

    #[test]
    fn test_inside_passes_unchanged() {
        let ids = CommandIdGenerator::new();
        // software space: x in [0, 800], y in [65, 1198]
        let mut batch = point(&ids, 0.0, -BED_MAX_Y, 0.0);
        batch.extend(point(&ids, -BED_MIN_X, -BED_MIN_Y, BED_MIN_Z));
        batch.push(ids.motion(100.0).with_z(-10.0));
        let out = CheckLimits::default().apply(batch.clone(), &ids).unwrap();
        assert_eq!(out, batch);
    }

    #[test]
    fn test_one_unit_outside_each_axis() {
        let ids = CommandIdGenerator::new();
        let limits = CheckLimits::default();
        let cases = [
            (point(&ids, -1.0, 100.0, -10.0), 'X'),
            (point(&ids, 801.0, 100.0, -10.0), 'X'),
            (point(&ids, 10.0, 64.0, -10.0), 'Y'),
            (point(&ids, 10.0, 1199.0, -10.0), 'Y'),
            (point(&ids, 10.0, 100.0, -81.0), 'Z'),
            (point(&ids, 10.0, 100.0, 1.0), 'Z'),
        ];
        for (batch, expected) in cases {
            match limits.apply(batch, &ids) {
                Err(StrokeError::BoundsViolation { axis, .. }) => assert_eq!(axis, expected),
                other => panic!("expected violation on {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_non_finite_coordinate_is_violation() {
        let ids = CommandIdGenerator::new();
        let limits = CheckLimits::default();
        let cases = [
            (point(&ids, f64::NAN, 100.0, -10.0), 'X'),
            (point(&ids, 10.0, f64::INFINITY, -10.0), 'Y'),
            (point(&ids, 10.0, 100.0, f64::NEG_INFINITY), 'Z'),
        ];
        for (mut batch, expected) in cases {
            // an otherwise valid point ahead of the bad one
            batch.prepend(point(&ids, 10.0, 100.0, -10.0));
            match limits.apply(batch, &ids) {
                Err(StrokeError::BoundsViolation { axis, value, .. }) => {
                    assert_eq!(axis, expected);
                    assert!(!value.is_finite());
                }
                other => panic!("expected violation on {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_violation_dumps_batch() {
        let ids = CommandIdGenerator::new();
        let dir = tempfile::tempdir().unwrap();
        let limits = CheckLimits::new(BedEnvelope::default(), Some(dir.path().join("dumps")));
        assert!(limits.apply(point(&ids, 10.0, 1199.0, 0.0), &ids).is_err());

        let files: Vec<_> = fs::read_dir(dir.path().join("dumps")).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("G1 X-10.000 Y-1199.000 Z0.000 F100"));
    }
}
