//! Paint pots and their dip/scrape motion generators
//!
//! A pot sits on the pot board at a fixed spacing from its neighbours. Using a
//! pot drives the brush to the pot centre, agitates it in the paint, wipes it
//! against the rim and leaves at a safe height. Every generated command is
//! tagged `required` + `paintPot` so point reduction and stylization leave it
//! alone.

use paintkit_core::constants::{
    BASE_FEED_RATE, BED_MAX_Z, BED_MIN_Z, BRUSH_TIP_Z_OFFSET, POT_BOARD_CORNER_X,
    POT_BOARD_CORNER_Y, POT_BOARD_WIDTH, POT_DEPTH, POT_DIAMETER, POT_HEIGHT, POT_SPACING,
};
use paintkit_core::{CommandBatch, CommandIdGenerator, MotionCommand, Tag};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const POT_TAGS: &[Tag] = &[Tag::Required, Tag::PaintPot];
const SCRAPE_TAGS: &[Tag] = &[Tag::Required, Tag::PaintPot, Tag::Scrape];

/// Usable radius inside the pot rim.
const INNER_RADIUS: f64 = (POT_DIAMETER - 8.0) / 2.0;
/// Points sampled around the rim on each scrape pass.
const SCRAPE_STEPS: usize = 50;
/// Points on the precomputed spiral, excluding the origin.
const SPIRAL_POINTS: usize = 200;
/// Random dip points for the randomized pot.
const RANDOM_DIP_POINTS: usize = 10;

/// How a pot agitates the brush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PotVariant {
    /// Archimedes-spiral swirl followed by concentric rim passes
    Spiral,
    /// Random dabs inside the pot followed by a four-direction rim wipe
    #[default]
    Random,
}

impl std::fmt::Display for PotVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spiral => write!(f, "spiral"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Swirl direction and random state of a pot, for rolling back a refill
#[derive(Debug, Clone)]
pub struct PotState {
    out_to_in: bool,
    rng: StdRng,
}

/// One paint pot on the pot board
#[derive(Debug, Clone)]
pub struct PaintPot {
    /// Position of the pot on the board
    pub index: usize,
    /// Optional color label
    pub color: Option<String>,
    /// Pot centre X
    pub x: f64,
    /// Pot centre Y
    pub y: f64,
    /// Approach point X
    pub safe_x: f64,
    /// Approach point Y, in front of the board
    pub safe_y: f64,
    /// Travel height above the pots
    pub safe_z: f64,
    variant: PotVariant,
    out_to_in: bool,
    spiral: Vec<(f64, f64)>,
    scrape: Vec<MotionCommand>,
    rng: StdRng,
}

impl PaintPot {
    /// Create the pot at board position `index`
    pub fn new(
        ids: &CommandIdGenerator,
        index: usize,
        color: Option<String>,
        variant: PotVariant,
    ) -> Self {
        Self::with_rng(ids, index, color, variant, StdRng::from_os_rng())
    }

    /// Create a pot whose randomized dips come from a fixed seed
    pub fn with_seed(
        ids: &CommandIdGenerator,
        index: usize,
        color: Option<String>,
        variant: PotVariant,
        seed: u64,
    ) -> Self {
        Self::with_rng(ids, index, color, variant, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        ids: &CommandIdGenerator,
        index: usize,
        color: Option<String>,
        variant: PotVariant,
        rng: StdRng,
    ) -> Self {
        let x = POT_BOARD_CORNER_X + (index as f64 * POT_SPACING) + 20.0 + POT_DIAMETER / 2.0;
        let y = POT_BOARD_CORNER_Y + POT_BOARD_WIDTH / 2.0;
        let mut pot = Self {
            index,
            color,
            x,
            y,
            safe_x: x,
            safe_y: y + POT_BOARD_WIDTH,
            safe_z: -1.0,
            variant,
            out_to_in: false,
            spiral: spiral_points(1.0, 2.0),
            scrape: Vec::new(),
            rng,
        };
        pot.scrape = match variant {
            PotVariant::Spiral => pot.rim_passes(ids),
            PotVariant::Random => pot.rim_wipe(ids),
        };
        pot
    }

    pub fn variant(&self) -> PotVariant {
        self.variant
    }

    /// Direction the next swirl will run in
    pub fn out_to_in(&self) -> bool {
        self.out_to_in
    }

    pub fn state(&self) -> PotState {
        PotState {
            out_to_in: self.out_to_in,
            rng: self.rng.clone(),
        }
    }

    pub fn restore(&mut self, state: PotState) {
        self.out_to_in = state.out_to_in;
        self.rng = state.rng;
    }

    /// Full refill motion; with `resume_at`, finish with a travel move to that point
    pub fn use_pot(
        &mut self,
        ids: &CommandIdGenerator,
        resume_at: Option<(f64, f64)>,
    ) -> CommandBatch {
        let mut commands = self.to_center(ids);
        match self.variant {
            PotVariant::Spiral => {
                let half = self.scrape.len() / 2;
                commands.extend(self.scrape[..half].iter().cloned());
                commands.extend(self.swirl(ids));
                commands.extend(self.scrape.iter().cloned());
            }
            PotVariant::Random => {
                commands.extend(self.random_dips(ids));
                commands.extend(self.scrape.iter().cloned());
            }
        }
        commands.extend(self.exit(ids));

        if let Some((x, y)) = resume_at {
            // mirrored and limit-checked like stroke input
            commands.push(
                ids.motion(BASE_FEED_RATE)
                    .with_xyz(x, y, 0.0)
                    .tagged(&[Tag::Contact]),
            );
        }
        commands
    }

    fn to_center(&self, ids: &CommandIdGenerator) -> CommandBatch {
        vec![
            ids.motion(BASE_FEED_RATE).with_z(self.safe_z).tagged(POT_TAGS),
            ids.motion(BASE_FEED_RATE)
                .with_xy(self.safe_x, self.safe_y)
                .tagged(POT_TAGS),
            ids.motion(BASE_FEED_RATE)
                .with_xyz(self.x, self.y, self.safe_z)
                .tagged(POT_TAGS),
            ids.motion(BASE_FEED_RATE)
                .with_z(BRUSH_TIP_Z_OFFSET + POT_HEIGHT)
                .tagged(POT_TAGS),
        ]
        .into()
    }

    fn exit(&self, ids: &CommandIdGenerator) -> Vec<MotionCommand> {
        vec![
            ids.motion(BASE_FEED_RATE)
                .with_xy(self.x, self.y)
                .tagged(POT_TAGS),
            ids.motion(BASE_FEED_RATE).with_z(self.safe_z).tagged(POT_TAGS),
            ids.motion(BASE_FEED_RATE)
                .with_xy(self.safe_x, self.safe_y)
                .tagged(POT_TAGS),
        ]
    }

    /// Spiral dip; alternates between inside-out and outside-in on each call
    fn swirl(&mut self, ids: &CommandIdGenerator) -> Vec<MotionCommand> {
        let (min, max) = self
            .spiral
            .iter()
            .flat_map(|&(x, y)| [x, y])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let span = max - min;
        let base_z = BRUSH_TIP_Z_OFFSET + 5.0;
        let z_cycle = [base_z - 2.0, base_z - 1.0, base_z, base_z + 1.0];

        let mut points: Vec<MotionCommand> = self
            .spiral
            .iter()
            .enumerate()
            .map(|(i, &(sx, sy))| {
                let nx = ((sx - min) / span - 0.5) * (POT_DIAMETER - 8.0);
                let ny = ((sy - min) / span - 0.5) * (POT_DIAMETER - 8.0);
                ids.motion(BASE_FEED_RATE)
                    .with_xyz(self.x + nx, self.y + ny, z_cycle[i % z_cycle.len()])
                    .tagged(POT_TAGS)
            })
            .collect();

        if self.out_to_in {
            points.reverse();
        }
        self.out_to_in = !self.out_to_in;

        let mut commands = Vec::with_capacity(points.len() + 1);
        commands.push(
            ids.motion(BASE_FEED_RATE)
                .with_z(BRUSH_TIP_Z_OFFSET + (POT_HEIGHT - POT_DEPTH))
                .tagged(POT_TAGS),
        );
        commands.extend(points);
        commands
    }

    /// Concentric passes around the rim, each a little higher than the last
    fn rim_passes(&self, ids: &CommandIdGenerator) -> Vec<MotionCommand> {
        let base_z = BRUSH_TIP_Z_OFFSET + (POT_HEIGHT - POT_DEPTH);
        let ceiling = BED_MAX_Z - 1.0;
        let mut commands = Vec::new();

        let mut pass_z = base_z + POT_HEIGHT - 30.0;
        while pass_z < base_z + POT_HEIGHT - 10.0 {
            let z = if pass_z > BED_MAX_Z { ceiling } else { pass_z };
            for step in 0..SCRAPE_STEPS {
                let angle = (360.0 * step as f64 / (SCRAPE_STEPS - 1) as f64).to_radians();
                let gradient = step as f64 * 5.0 / SCRAPE_STEPS as f64;
                commands.push(
                    ids.motion(BASE_FEED_RATE)
                        .with_xyz(
                            self.x + angle.cos() * INNER_RADIUS,
                            self.y + angle.sin() * INNER_RADIUS,
                            (z + gradient).min(ceiling),
                        )
                        .tagged(SCRAPE_TAGS),
                );
            }
            if z == ceiling {
                break;
            }
            pass_z += 5.0;
        }
        commands
    }

    /// Inner, outer and half-radius wipe in each of the four directions
    fn rim_wipe(&self, ids: &CommandIdGenerator) -> Vec<MotionCommand> {
        let outer = (POT_DIAMETER + 8.0) / 2.0;
        let half = (POT_DIAMETER - 8.0) / 4.0;
        let low_z = (BRUSH_TIP_Z_OFFSET + POT_HEIGHT - 17.0).max(BED_MIN_Z);
        let high_z = BED_MAX_Z;

        let mut commands = Vec::with_capacity(12);
        for angle in [0.0_f64, 180.0, 90.0, 270.0] {
            let (sin, cos) = angle.to_radians().sin_cos();
            for (radius, z) in [(INNER_RADIUS, low_z), (outer, high_z), (half, high_z)] {
                commands.push(
                    ids.motion(BASE_FEED_RATE)
                        .with_xyz(self.x + radius * cos, self.y + radius * sin, z)
                        .tagged(POT_TAGS),
                );
            }
        }
        commands
    }

    fn random_dips(&mut self, ids: &CommandIdGenerator) -> Vec<MotionCommand> {
        (0..RANDOM_DIP_POINTS)
            .map(|_| {
                let angle = self.rng.random_range(0.0..2.0 * PI);
                let r = self.rng.random_range(0.0..INNER_RADIUS);
                ids.motion(BASE_FEED_RATE)
                    .with_xyz(
                        self.x + r * angle.cos(),
                        self.y + r * angle.sin(),
                        BRUSH_TIP_Z_OFFSET + 5.0,
                    )
                    .tagged(POT_TAGS)
            })
            .collect()
    }
}

/// Points on an Archimedes spiral `r = b·phi`
///
/// `arc` is the approximate distance between consecutive points and
/// `separation` the distance between turnings. The first point is the origin.
pub fn spiral_points(arc: f64, separation: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(SPIRAL_POINTS + 1);
    points.push((0.0, 0.0));

    let b = separation / (2.0 * PI);
    let mut r = arc;
    let mut phi = r / b;
    for _ in 0..SPIRAL_POINTS {
        points.push((r * phi.cos(), r * phi.sin()));
        phi += arc / r;
        r = b * phi;
    }
    points
}
