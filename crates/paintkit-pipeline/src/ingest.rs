//! Stroke sample ingestion
//!
//! A sample line reads `"x y pressure velocity"`. Pressure pushes the brush
//! below the tip height, velocity (mm/s) becomes a feed rate in mm/min.

use paintkit_core::constants::{BED_MIN_Z, BRUSH_TIP_Z_OFFSET, MAX_FEED_RATE};
use paintkit_core::{CommandBatch, CommandIdGenerator, MotionCommand, StrokeError, Tag};

/// Brush depth for a sample pressure, never below the bed floor
pub fn depth_for_pressure(pressure: f64) -> f64 {
    (BRUSH_TIP_Z_OFFSET - pressure).max(BED_MIN_Z)
}

/// Feed rate for a sample velocity, capped at the controller maximum
pub fn feed_for_velocity(velocity: f64) -> f64 {
    (velocity * 60.0).round().min(MAX_FEED_RATE)
}

/// Parse one sample line
pub fn parse_sample(
    ids: &CommandIdGenerator,
    line_number: usize,
    line: &str,
) -> Result<MotionCommand, StrokeError> {
    let mut fields = line.split_whitespace();
    let mut next = |name: &str| -> Result<f64, StrokeError> {
        let raw = fields.next().ok_or_else(|| StrokeError::Parse {
            line_number,
            reason: format!("missing {} field", name),
        })?;
        let value = raw.parse::<f64>().map_err(|e| StrokeError::Parse {
            line_number,
            reason: format!("invalid {} '{}': {}", name, raw, e),
        })?;
        if !value.is_finite() {
            return Err(StrokeError::Parse {
                line_number,
                reason: format!("{} '{}' is not a finite number", name, raw),
            });
        }
        Ok(value)
    };
    let x = next("x")?;
    let y = next("y")?;
    let pressure = next("pressure")?;
    let velocity = next("velocity")?;

    Ok(ids
        .motion(feed_for_velocity(velocity))
        .with_xyz(x, y, depth_for_pressure(pressure))
        .tagged(&[Tag::Contact]))
}

/// Convert sample lines into contact commands
///
/// Blank lines are skipped. Any malformed line fails the whole batch.
pub fn parse_samples<S: AsRef<str>>(
    ids: &CommandIdGenerator,
    lines: &[S],
) -> Result<CommandBatch, StrokeError> {
    let batch = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.as_ref().trim().is_empty())
        .map(|(i, line)| parse_sample(ids, i, line.as_ref()))
        .collect::<Result<CommandBatch, StrokeError>>()?;
    tracing::debug!("Parsed {} samples into {} commands", lines.len(), batch.len());
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_two_samples() {
        let ids = CommandIdGenerator::new();
        let batch = parse_samples(&ids, &["0 0 0 100", "10 0 0 100"]).unwrap();
        assert_eq!(batch.len(), 2);
        for cmd in batch.iter() {
            assert_eq!(cmd.feed, 6000.0);
            assert_eq!(cmd.z, Some(-58.0));
            assert!(cmd.has_tag(Tag::Contact));
        }
        assert_eq!(batch[1].xy(), Some((10.0, 0.0)));
    }

    #[test]
    fn test_feed_and_depth_clamp() {
        assert_eq!(feed_for_velocity(1000.0), MAX_FEED_RATE);
        assert_eq!(feed_for_velocity(1.0126), 61.0);
        assert_eq!(depth_for_pressure(50.0), BED_MIN_Z);
        assert_eq!(depth_for_pressure(0.5), -58.5);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let ids = CommandIdGenerator::new();
        let batch = parse_samples(&ids, &["", "1 2 0 10", "   "]).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_malformed_line_fails_batch() {
        let ids = CommandIdGenerator::new();
        let err = parse_samples(&ids, &["1 2 0 10", "1 two 0 10"]).unwrap_err();
        assert!(matches!(err, StrokeError::Parse { line_number: 1, .. }));

        let err = parse_samples(&ids, &["1 2 0"]).unwrap_err();
        assert!(matches!(err, StrokeError::Parse { line_number: 0, .. }));
    }

    #[test]
    fn test_non_finite_fields_rejected() {
        let ids = CommandIdGenerator::new();
        for line in ["nan 100 0 100", "10 inf 0 100", "10 100 -inf 100", "10 100 0 NaN"] {
            let err = parse_samples(&ids, &["1 2 0 10", line]).unwrap_err();
            assert!(
                matches!(err, StrokeError::Parse { line_number: 1, .. }),
                "{} gave {:?}",
                line,
                err
            );
        }
    }

    proptest! {
        #[test]
        fn prop_ingestion_preserves_count_and_order(
            samples in prop::collection::vec(
                (-500.0..500.0f64, -500.0..500.0f64, 0.0..100.0f64, 0.0..500.0f64),
                0..50,
            )
        ) {
            let ids = CommandIdGenerator::new();
            let lines: Vec<String> = samples
                .iter()
                .map(|(x, y, p, v)| format!("{} {} {} {}", x, y, p, v))
                .collect();
            let batch = parse_samples(&ids, &lines).unwrap();
            prop_assert_eq!(batch.len(), samples.len());
            for (cmd, (x, y, _, _)) in batch.iter().zip(samples.iter()) {
                prop_assert_eq!(cmd.xy(), Some((*x, *y)));
                prop_assert!(cmd.z.unwrap() >= BED_MIN_Z);
                prop_assert!(cmd.feed <= MAX_FEED_RATE);
            }
        }
    }
}
