//! Feed rate normalization

use paintkit_core::constants::MAX_FEED_RATE;
use paintkit_core::CommandBatch;

/// Default factor applied to sampled feed rates
pub const DEFAULT_FEED_FACTOR: f64 = 0.6;

/// Scale every feed rate by `factor`, capped at [`MAX_FEED_RATE`]
pub fn normalize_feed(mut batch: CommandBatch, factor: f64) -> CommandBatch {
    for command in batch.iter_mut() {
        command.feed = (command.feed * factor).min(MAX_FEED_RATE);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintkit_core::CommandIdGenerator;

    #[test]
    fn test_scale_and_clamp() {
        let ids = CommandIdGenerator::new();
        let batch: CommandBatch = vec![ids.motion(10000.0), ids.motion(14000.0)].into();
        let out = normalize_feed(batch, DEFAULT_FEED_FACTOR);
        assert_eq!(out[0].feed, 6000.0);
        assert_eq!(out[1].feed, 8400.0);

        let fast = normalize_feed(out, 3.0);
        assert_eq!(fast[0].feed, MAX_FEED_RATE);
    }
}
