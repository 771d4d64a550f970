//! Stylization adapters
//!
//! These rewrite the contact path for a look rather than for machine motion.
//! Commands tagged `required` (pot and holder motion) are never touched.

use super::CommandAdapter;
use crate::spatial::PointIndex;
use paintkit_core::constants::{BRUSH_HOLDER_ENTRY_Z, BRUSH_TIP_Z_OFFSET, DAB_FEED_RATE};
use paintkit_core::{CommandBatch, CommandIdGenerator, StrokeError, Tag};
use std::f64::consts::PI;

pub(super) const DEFAULT_DAB_RADIUS: f64 = 8.0;
pub(super) const DEFAULT_MAX_OSCILLATION: f64 = 30.0;

const DAB_TAGS: &[Tag] = &[Tag::Adapter, Tag::Style, Tag::Pointillism];
const DAB_CONTACT_TAGS: &[Tag] = &[Tag::Contact, Tag::Adapter, Tag::Style, Tag::Pointillism];

/// Replace the stroke by dabs at the densest points
///
/// Contact points are ranked once by how many neighbours lie within the
/// radius. Walking that ranking, each point not yet covered becomes a dab and
/// covers its neighbours. Dabs are emitted in stroke order.
#[derive(Debug, Clone, Copy)]
pub struct Pointillism {
    radius: f64,
}

impl Pointillism {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Indices (into `points`) chosen as dab centres, ascending
    pub fn select_centres(&self, points: &[(f64, f64)]) -> Vec<usize> {
        let index = PointIndex::new(points.to_vec(), self.radius);
        let neighbours: Vec<Vec<usize>> = points
            .iter()
            .map(|&(x, y)| index.within(x, y, self.radius))
            .collect();

        let mut ranking: Vec<usize> = (0..points.len()).collect();
        ranking.sort_by(|&a, &b| neighbours[b].len().cmp(&neighbours[a].len()));

        let mut covered = vec![false; points.len()];
        let mut remaining = points.len();
        let mut centres = Vec::new();
        for i in ranking {
            if remaining == 0 {
                break;
            }
            if covered[i] {
                continue;
            }
            centres.push(i);
            for &n in neighbours[i].iter().chain(std::iter::once(&i)) {
                if !covered[n] {
                    covered[n] = true;
                    remaining -= 1;
                }
            }
        }
        centres.sort_unstable();
        centres
    }
}

impl Default for Pointillism {
    fn default() -> Self {
        Self::new(DEFAULT_DAB_RADIUS)
    }
}

impl CommandAdapter for Pointillism {
    fn name(&self) -> &str {
        "pointillism"
    }

    fn description(&self) -> &str {
        "Paint the stroke as a set of dabs"
    }

    fn apply(
        &self,
        batch: CommandBatch,
        ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        let is_point = |c: &paintkit_core::MotionCommand| {
            c.has_tag(Tag::Contact) && !c.has_tag(Tag::Required) && c.xy().is_some()
        };
        let points: Vec<(f64, f64)> = batch
            .iter()
            .filter(|&c| is_point(c))
            .filter_map(|c| c.xy())
            .collect();
        let mut centres = self.select_centres(&points).into_iter().peekable();

        let mut out = CommandBatch::with_capacity(batch.len());
        let mut ordinal = 0;
        for command in batch {
            if !is_point(&command) {
                out.push(command);
                continue;
            }
            let this = ordinal;
            ordinal += 1;
            if centres.next_if_eq(&this).is_none() {
                continue;
            }
            let (x, y) = points[this];
            out.push(
                ids.motion(DAB_FEED_RATE)
                    .with_xyz(x, y, BRUSH_HOLDER_ENTRY_Z)
                    .tagged(DAB_TAGS),
            );
            out.push(
                ids.motion(DAB_FEED_RATE)
                    .with_xyz(x, y, BRUSH_TIP_Z_OFFSET - 2.0)
                    .tagged(DAB_CONTACT_TAGS),
            );
            out.push(
                ids.motion(DAB_FEED_RATE)
                    .with_xyz(x, y, BRUSH_HOLDER_ENTRY_Z)
                    .tagged(DAB_TAGS),
            );
        }
        Ok(out)
    }
}

/// Sideways sinusoidal wobble along the stroke
#[derive(Debug, Clone, Copy)]
pub struct Wavy {
    max_oscillation: f64,
    oscillations: Option<usize>,
}

impl Wavy {
    pub fn new(max_oscillation: f64, oscillations: Option<usize>) -> Self {
        Self {
            max_oscillation,
            oscillations,
        }
    }

    /// Whole-millimetre x offsets for `count` points
    pub fn offsets(&self, count: usize) -> Vec<f64> {
        let periods = self
            .oscillations
            .unwrap_or_else(|| ((count as f64 / 66.6) as usize).max(1));
        let span = periods as f64 * PI;
        (0..count)
            .map(|i| {
                let phase = if count > 1 {
                    span * i as f64 / (count - 1) as f64
                } else {
                    0.0
                };
                (phase.sin() * self.max_oscillation / 2.0).floor()
            })
            .collect()
    }
}

impl Default for Wavy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OSCILLATION, None)
    }
}

impl CommandAdapter for Wavy {
    fn name(&self) -> &str {
        "wavy"
    }

    fn description(&self) -> &str {
        "Add a sinusoidal wobble to contact points"
    }

    fn apply(
        &self,
        mut batch: CommandBatch,
        _ids: &CommandIdGenerator,
    ) -> Result<CommandBatch, StrokeError> {
        let count = batch
            .iter()
            .filter(|c| c.has_tag(Tag::Contact) && !c.has_tag(Tag::Required))
            .count();
        let offsets = self.offsets(count);
        let contacts = batch
            .iter_mut()
            .filter(|c| c.has_tag(Tag::Contact) && !c.has_tag(Tag::Required));
        for (command, offset) in contacts.zip(offsets) {
            command.x = command.x.map(|x| x + offset);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts(ids: &CommandIdGenerator, points: &[(f64, f64)]) -> CommandBatch {
        points
            .iter()
            .map(|&(x, y)| ids.motion(6000.0).with_xyz(x, y, -58.0).tagged(&[Tag::Contact]))
            .collect()
    }

    #[test]
    fn test_densest_point_becomes_centre() {
        // 1 is within reach of 0 and 2; 3 stands alone
        let points = [(0.0, 0.0), (7.0, 0.0), (14.0, 0.0), (100.0, 0.0)];
        let centres = Pointillism::default().select_centres(&points);
        assert_eq!(centres, vec![1, 3]);
    }

    #[test]
    fn test_ties_keep_stroke_order() {
        // 0 and 1 reach each other with equal counts; the earlier one wins
        let points = [(0.0, 0.0), (5.0, 0.0), (30.0, 0.0)];
        let centres = Pointillism::default().select_centres(&points);
        assert_eq!(centres, vec![0, 2]);
    }

    #[test]
    fn test_dabs_and_required_passthrough() {
        let ids = CommandIdGenerator::new();
        let mut batch: CommandBatch =
            vec![ids.motion(12000.0).with_z(-1.0).tagged(&[Tag::Required, Tag::PaintPot])].into();
        batch.extend(contacts(&ids, &[(0.0, 0.0), (3.0, 0.0), (50.0, 50.0)]));

        let out = Pointillism::default().apply(batch, &ids).unwrap();
        assert_eq!(out.len(), 1 + 2 * 3);
        assert!(out[0].has_tag(Tag::PaintPot));
        let touch = &out[2];
        assert_eq!(touch.z, Some(BRUSH_TIP_Z_OFFSET - 2.0));
        assert!(touch.has_tag(Tag::Contact) && touch.has_tag(Tag::Pointillism));
        assert_eq!(out[1].z, Some(BRUSH_HOLDER_ENTRY_Z));
        assert_eq!(out[4].xy(), Some((50.0, 50.0)));
        assert!(out.iter().skip(1).all(|c| c.feed == DAB_FEED_RATE));
    }

    #[test]
    fn test_wavy_offsets() {
        let wavy = Wavy::new(30.0, Some(1));
        let offsets = wavy.offsets(3);
        // sin(0), sin(pi/2), sin(pi) scaled by 15 and floored
        assert_eq!(offsets, vec![0.0, 15.0, 0.0]);

        // auto count: at least one half period
        assert_eq!(Wavy::default().offsets(10).len(), 10);
        let many = Wavy::default().offsets(200);
        assert!(many.iter().any(|&o| o < 0.0));
    }

    #[test]
    fn test_wavy_moves_contact_x_only() {
        let ids = CommandIdGenerator::new();
        let mut batch = contacts(&ids, &[(10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        batch.push(ids.motion(12000.0).with_z(0.0));
        let out = Wavy::new(30.0, Some(1)).apply(batch, &ids).unwrap();
        assert_eq!(out[1].xy(), Some((35.0, 0.0)));
        assert_eq!(out[3].z, Some(0.0));
    }
}
