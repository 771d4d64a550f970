//! Point reduction
//!
//! Samples from the drawing surface arrive far denser than a brush can
//! resolve. Points closer than a radius are merged greedily, in input order,
//! into one point at the mean of the cluster. The pass is order dependent on
//! purpose: a different traversal can merge different clusters.

use crate::spatial::PointIndex;
use paintkit_core::CommandBatch;

/// Default merge radius in millimetres
pub const DEFAULT_MERGE_RADIUS: f64 = 1.0;

/// Merge points within `radius` of each other
///
/// A cluster is represented by its first member moved to the mean xy of all
/// members; z, feed and tags of that first member are kept. Commands without
/// a full xy pair, or with a NaN coordinate, are kept unchanged.
pub fn exclude_points_within(batch: CommandBatch, radius: f64) -> CommandBatch {
    let input_len = batch.len();
    let points: Vec<(f64, f64)> = batch
        .iter()
        .map(|c| c.xy().unwrap_or((f64::NAN, f64::NAN)))
        .collect();
    let index = PointIndex::new(points, radius);
    let mut absorbed = vec![false; input_len];
    let mut output = CommandBatch::with_capacity(input_len);

    for (i, mut command) in batch.into_iter().enumerate() {
        if absorbed[i] {
            continue;
        }
        let (x, y) = index.point(i);
        if x.is_nan() || y.is_nan() {
            output.push(command);
            continue;
        }

        let members = index.within(x, y, radius);
        if members.len() > 1 {
            let n = members.len() as f64;
            let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(sx, sy), &m| {
                let (mx, my) = index.point(m);
                (sx + mx, sy + my)
            });
            command.x = Some(sum_x / n);
            command.y = Some(sum_y / n);
            for m in members {
                absorbed[m] = true;
            }
        }
        absorbed[i] = true;
        output.push(command);
    }

    tracing::debug!("Reduced {} commands to {}", input_len, output.len());
    output
}
