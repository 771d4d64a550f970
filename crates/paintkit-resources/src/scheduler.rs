//! Refill scheduling
//!
//! Decides where to splice pot dips into a stroke so the mounted brush never
//! paints further than its budget `L` on one load of paint. Unpainted distance
//! carries over in the [`Tracker`] between strokes, so a refill can land in a
//! later stroke than the one that used most of the paint.
//!
//! Input is the raw contact path after ingestion and point reduction, before
//! any adapter has added lifts or lead-ins. Distances are measured between
//! consecutive points of the batch only; travel between strokes is free.

use crate::tracker::Tracker;
use crate::workshop::{BrushId, Workshop};
use paintkit_core::{CommandBatch, CommandIdGenerator, MotionCommand, Tag};

/// Share of the budget below which a trailing remainder is not worth a refill
const DEFER_FRACTION: f64 = 0.25;
/// Band around the budget in which one refill at the end is enough
const NEAR_BUDGET_LOW: f64 = 0.9;
const NEAR_BUDGET_HIGH: f64 = 1.1;

/// Splice refills into `batch` for a brush with budget `limit`
///
/// `refill` produces the pot motion and, when given a point, ends with a
/// travel move back to it.
pub fn schedule_refills<F>(
    tracker: &mut Tracker,
    batch: CommandBatch,
    limit: f64,
    mut refill: F,
) -> CommandBatch
where
    F: FnMut(Option<(f64, f64)>) -> CommandBatch,
{
    let total_len = batch.len();
    let points: Vec<MotionCommand> = batch
        .into_iter()
        .filter(|c| c.has_tag(Tag::Contact))
        .collect();
    if points.len() != total_len {
        tracing::warn!(
            "Scheduler ignored {} non-contact commands",
            total_len - points.len()
        );
    }
    let Some(first_xy) = points.first().and_then(MotionCommand::xy) else {
        return points.into();
    };
    let finite = points
        .iter()
        .filter_map(MotionCommand::xy)
        .all(|(x, y)| x.is_finite() && y.is_finite());
    if !finite {
        tracing::warn!("Stroke has non-finite coordinates, scheduling skipped");
        return points.into();
    }

    tracker.begin_stroke();
    let mut output = CommandBatch::with_capacity(points.len());

    let carried_refill = tracker.length() > limit;
    if carried_refill {
        tracing::info!(
            "Carried length {:.1} exceeds budget {:.1}, refilling before stroke",
            tracker.length(),
            limit
        );
        output.extend(refill(Some(first_xy)));
        tracker.reset();
    }

    let steps: Vec<f64> = std::iter::once(0.0)
        .chain(points.windows(2).map(|w| w[0].distance_to(&w[1]).unwrap_or(0.0)))
        .collect();
    let stroke_length: f64 = steps.iter().sum();
    let total = tracker.length() + stroke_length;

    if !carried_refill && total > NEAR_BUDGET_LOW * limit && total < NEAR_BUDGET_HIGH * limit {
        tracing::debug!("Stroke ends near budget ({:.1}), refilling after it", total);
        for point in &points {
            tracker.record(point);
        }
        output.extend(points);
        output.extend(refill(None));
        tracker.reset();
        return output;
    }

    if total <= limit {
        for point in &points {
            tracker.record(point);
        }
        tracker.add_length(stroke_length);
        output.extend(points);
        return output;
    }

    // Refill placed in front of the whole stroke, if any
    let mut head = CommandBatch::new();
    let mut start_refill_issued = false;
    let mut travelled = 0.0;
    let mut deferred = false;

    for (i, point) in points.into_iter().enumerate() {
        tracker.add_length(steps[i]);
        tracker.record(&point);
        travelled += steps[i];

        if !deferred && tracker.length() > limit {
            let remaining: f64 = steps[i + 1..].iter().sum();
            if remaining < DEFER_FRACTION * limit {
                tracing::debug!(
                    "Remaining {:.1} below {:.0}% of budget, deferring refill",
                    remaining,
                    DEFER_FRACTION * 100.0
                );
                deferred = true;
            } else if travelled < DEFER_FRACTION * stroke_length && !start_refill_issued {
                tracing::debug!("Budget crossed early at point {}, refilling before stroke", i);
                head = refill(Some(first_xy));
                tracker.reset();
                start_refill_issued = true;
            } else {
                tracing::debug!("Budget crossed at point {}, refilling", i);
                output.extend(refill(point.xy()));
                tracker.reset();
            }
        }
        output.push(point);
    }

    output.prepend(head);
    output
}

/// Schedule refills for the brush currently mounted, dipping into its pot
pub fn schedule_for_brush(
    workshop: &mut Workshop,
    tracker: &mut Tracker,
    ids: &CommandIdGenerator,
    brush: BrushId,
    batch: CommandBatch,
) -> CommandBatch {
    let limit = workshop.brush(brush).max_stroke_length;
    schedule_refills(tracker, batch, limit, |resume_at| {
        workshop.refill(ids, brush, resume_at)
    })
}
