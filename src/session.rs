//! Painting session
//!
//! Owns every piece of mutable machine state (workshop, hand, tracker) and
//! turns one [`StrokeBatch`] at a time into the commands for the controller.
//! Only the dispatch consumer touches a session, so nothing here is locked.

use crate::stroke::StrokeBatch;
use paintkit_core::{
    CommandBatch, CommandIdGenerator, ConfigError, Position, ResourceError, Result,
};
use paintkit_pipeline::{AdapterChain, Preprocessor};
use paintkit_resources::{schedule_for_brush, BrushRequest, Hand, Tracker, Workshop};
use paintkit_settings::{load_holders, load_pots, Config};
use std::path::Path;

/// Requested when the stroke labels cannot be read and no brush is mounted
const UNREADABLE_REQUEST: BrushRequest = BrushRequest {
    color_index: -1,
    slot_index: -1,
};

pub struct PaintSession {
    ids: CommandIdGenerator,
    workshop: Workshop,
    hand: Hand,
    tracker: Tracker,
    preprocessor: Preprocessor,
    chain: AdapterChain,
}

impl PaintSession {
    pub fn new(
        ids: CommandIdGenerator,
        workshop: Workshop,
        tracker: Tracker,
        preprocessor: Preprocessor,
        chain: AdapterChain,
    ) -> Self {
        Self {
            ids,
            workshop,
            hand: Hand::new(),
            tracker,
            preprocessor,
            chain,
        }
    }

    /// Build a session from the configured holder and pot files
    pub fn from_config(config: &Config) -> Result<Self> {
        let holders_file = config
            .session
            .holders_file
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid {
                reason: "session.holders_file is not set".to_string(),
            })?;
        let holders = load_holders(holders_file)?;
        let pots = load_pots(config.session.pots_file.as_deref())?;

        let ids = CommandIdGenerator::new();
        let workshop = Workshop::build(&ids, &holders, &pots, config.session.pot_variant)?;
        if workshop.holders().is_empty() {
            return Err(ResourceError::NoHolders.into());
        }

        let tracker = if config.session.canvas_path.is_some() {
            Tracker::with_canvas()
        } else {
            Tracker::new()
        };
        let chain = AdapterChain::from_kinds(&config.pipeline.adapters, &config.pipeline.options);
        tracing::info!("Adapter chain: {:?}", chain);

        Ok(Self::new(
            ids,
            workshop,
            tracker,
            config.pipeline.preprocess,
            chain,
        ))
    }

    pub fn workshop(&self) -> &Workshop {
        &self.workshop
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn ids(&self) -> &CommandIdGenerator {
        &self.ids
    }

    /// Commands for one stroke: brush swap if needed, then the stroke itself
    ///
    /// A stroke that fails anywhere leaves the session exactly as it was.
    pub fn plan(&mut self, batch: &StrokeBatch) -> Result<CommandBatch> {
        let request = batch.request();
        tracing::info!(
            "Stroke received: lines={}, color={}, size={}",
            batch.data.len(),
            batch.color,
            batch.size
        );

        // parse first; a malformed sample must not cost a brush swap
        let stroke = self.preprocessor.run(&self.ids, &batch.data)?;

        let workshop = self.workshop.checkpoint();
        let hand = self.hand.clone();
        let tracker = self.tracker.checkpoint();

        let planned = self.plan_stroke(request, stroke);
        match &planned {
            Ok(_) => self.tracker.commit(),
            Err(_) => {
                self.workshop.restore(workshop);
                self.hand = hand;
                self.tracker.restore(tracker);
            }
        }
        planned
    }

    fn plan_stroke(
        &mut self,
        request: Option<BrushRequest>,
        stroke: CommandBatch,
    ) -> Result<CommandBatch> {
        let mut commands = CommandBatch::new();

        let request = match request {
            Some(request) => Some(request),
            None if self.hand.current_brush.is_none() => Some(UNREADABLE_REQUEST),
            None => {
                tracing::warn!("Unreadable brush labels, keeping the mounted brush");
                None
            }
        };
        if let Some(request) = request {
            if self.hand.needs_swap(&self.workshop, request) {
                tracing::info!(
                    "Changing brush to color {} slot {}",
                    request.color_index,
                    request.slot_index
                );
                commands.extend(self.hand.swap_brush(
                    &mut self.workshop,
                    &mut self.tracker,
                    &self.ids,
                    request,
                )?);
            }
        }

        let brush = self.hand.current_brush.ok_or(ResourceError::NoBrushMounted)?;
        tracing::info!(
            "Tracked length {:.1}, limit {:.1}",
            self.tracker.length(),
            self.workshop.brush(brush).max_stroke_length
        );
        let scheduled = schedule_for_brush(
            &mut self.workshop,
            &mut self.tracker,
            &self.ids,
            brush,
            stroke,
        );
        let adapted = self.chain.apply(scheduled, &self.ids)?;

        commands.extend(adapted);
        tracing::info!("{} commands produced", commands.len());
        Ok(commands)
    }

    /// Record that `commands` reached the controller
    pub fn confirm(&mut self, commands: &CommandBatch) {
        self.hand.follow(commands);
    }

    /// The machine was homed and the head is back at the origin
    pub fn homed(&mut self) {
        self.hand.position = Position::default();
    }

    /// Put the mounted brush back in its holder
    pub fn release_commands(&mut self) -> CommandBatch {
        if self.hand.current_brush.is_some() {
            tracing::info!("Putting brush back in holder");
        }
        self.hand.release_brush(&self.workshop)
    }

    /// Write the tracker canvas, if one is kept
    pub fn save_canvas(&self, path: &Path) -> Result<()> {
        self.tracker.save_canvas(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintkit_core::{StrokeError, Tag};
    use paintkit_pipeline::{AdapterKind, AdapterOptions};
    use paintkit_resources::{BrushConfig, HolderConfig, PotVariant};

    fn holders() -> Vec<HolderConfig> {
        (0..2)
            .map(|i| HolderConfig {
                index: i,
                color_idx: format!("{} color", i + 1),
                x: 100.0 + 130.0 * i as f64,
                y: 20.0,
                brushes: ["3", "2", "1"]
                    .iter()
                    .map(|s| BrushConfig {
                        size: s.to_string(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn session(kinds: &[AdapterKind]) -> PaintSession {
        let ids = CommandIdGenerator::new();
        let workshop = Workshop::build(&ids, &holders(), &[], PotVariant::Spiral).unwrap();
        PaintSession::new(
            ids,
            workshop,
            Tracker::new(),
            Preprocessor::default(),
            AdapterChain::from_kinds(kinds, &AdapterOptions::default()),
        )
    }

    fn stroke(color: &str, size: &str, data: &[&str]) -> StrokeBatch {
        StrokeBatch {
            color: color.to_string(),
            size: size.to_string(),
            data: data.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_first_stroke_mounts_brush() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        let commands = s
            .plan(&stroke("2 0xff0000ff", "3 12", &["100 200 0 100", "150 200 0 100"]))
            .unwrap();
        assert!(commands[0].has_tag(Tag::Pickup));
        assert!(commands.has_tag(Tag::PaintPot));
        let mounted = s.hand().current_brush.unwrap();
        assert_eq!(s.workshop().brush(mounted).slot, 0);
        assert_eq!(s.workshop().pot(s.workshop().brush(mounted).pot).index, 1);
        assert!(commands.iter().any(|c| c.has_tag(Tag::Contact)));
    }

    #[test]
    fn test_same_brush_no_swap() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        let first = stroke("1 0xff000000", "1 2", &["10 10 0 100", "20 10 0 100"]);
        s.plan(&first).unwrap();
        let second = s.plan(&first).unwrap();
        assert!(!second.has_tag(Tag::BrushChange));
    }

    #[test]
    fn test_color_change_swaps() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        s.plan(&stroke("1 0xff000000", "1 2", &["10 10 0 100", "20 10 0 100"]))
            .unwrap();
        let next = s
            .plan(&stroke("2 0xff000000", "1 2", &["10 10 0 100", "20 10 0 100"]))
            .unwrap();
        assert!(next[0].has_tag(Tag::Drop));
        assert!(next.has_tag(Tag::Pickup));
    }

    #[test]
    fn test_parse_error_keeps_state() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        let err = s
            .plan(&stroke("1 0xff000000", "1 2", &["10 10 oops 100"]))
            .unwrap_err();
        assert!(err.is_stroke_error());
        assert!(s.hand().current_brush.is_none());
    }

    #[test]
    fn test_bounds_violation_rolls_back() {
        let mut s = session(&[AdapterKind::CheckLimits]);
        let err = s
            .plan(&stroke("1 0xff000000", "1 2", &["5000 10 0 100", "5010 10 0 100"]))
            .unwrap_err();
        assert!(matches!(
            err,
            paintkit_core::Error::Stroke(StrokeError::BoundsViolation { .. })
        ));
        assert!(s.hand().current_brush.is_none());
        assert_eq!(s.tracker().length(), 0.0);
    }

    #[test]
    fn test_rejected_stroke_leaves_no_trace() {
        let mut s = session(&[AdapterKind::CheckLimits]);
        s.plan(&stroke("1 0xff000000", "1 2", &["10 100 0 100", "20 100 0 100"]))
            .unwrap();
        let moves = s.tracker().moves().len();
        let length = s.tracker().length();
        let swirl: Vec<bool> = s.workshop().pots().iter().map(|p| p.out_to_in()).collect();

        // swaps to the second holder, refills there, then fails the limit check
        s.plan(&stroke("2 0xff000000", "1 2", &["5000 100 0 100", "5010 100 0 100"]))
            .unwrap_err();
        assert_eq!(s.tracker().moves().len(), moves);
        assert_eq!(s.tracker().length(), length);
        let after: Vec<bool> = s.workshop().pots().iter().map(|p| p.out_to_in()).collect();
        assert_eq!(after, swirl);
        let mounted = s.hand().current_brush.unwrap();
        assert_eq!(s.workshop().pot(s.workshop().brush(mounted).pot).index, 0);
    }

    #[test]
    fn test_unreadable_labels_mount_default() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        s.plan(&stroke("red", "big", &["10 10 0 100", "20 10 0 100"]))
            .unwrap();
        assert_eq!(
            s.hand().current_brush,
            Some(s.workshop().default_brush().unwrap())
        );
    }

    #[test]
    fn test_release_and_confirm() {
        let mut s = session(&[AdapterKind::StartAndEndLift]);
        assert!(s.release_commands().is_empty());
        let commands = s
            .plan(&stroke("1 0xff000000", "2 6", &["10 10 0 100", "20 10 0 100"]))
            .unwrap();
        s.confirm(&commands);
        let last = commands.iter().rev().find(|c| c.x.is_some()).unwrap();
        assert_eq!(s.hand().position.x, last.x.unwrap());

        let drop = s.release_commands();
        assert!(drop.iter().all(|c| c.has_tag(Tag::Drop)));
        assert!(s.hand().current_brush.is_none());
    }
}
