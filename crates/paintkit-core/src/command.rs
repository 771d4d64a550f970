//! Motion command model
//!
//! A [`MotionCommand`] is one `G1` line to the motion controller: optional axis
//! targets, a feed rate and a list of semantic [`Tag`]s that tell the pipeline
//! stages which commands they may touch. Commands live in software space; the
//! rendered G-code negates x and y to land in machine space.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Semantic tag attached to a motion command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tag {
    /// Touches the painting surface; subject to reduction and stylization
    Contact,
    /// Structural machine motion that stylization must pass through verbatim
    Required,
    /// Synthesized by an adapter
    Adapter,
    /// Z-only lift at the start or end of a stroke
    Lift,
    /// Y coordinate was rewritten by the mirror adapter
    MirrorOnY,
    /// Part of a synthetic lead-in path
    LeadIn,
    /// Produced by a stylization adapter
    Style,
    /// Part of a pointillism dab
    Pointillism,
    /// Paint pot dip/scrape motion
    PaintPot,
    /// Rim scrape pass
    Scrape,
    /// Brush holder motion
    BrushChange,
    /// Brush pickup sequence
    Pickup,
    /// Brush drop sequence
    Drop,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contact => "contact",
            Self::Required => "required",
            Self::Adapter => "adapter",
            Self::Lift => "lift",
            Self::MirrorOnY => "mirrorOnY",
            Self::LeadIn => "leadIn",
            Self::Style => "style",
            Self::Pointillism => "pointillism",
            Self::PaintPot => "paintPot",
            Self::Scrape => "scrape",
            Self::BrushChange => "brushChange",
            Self::Pickup => "pickup",
            Self::Drop => "drop",
        };
        write!(f, "{}", name)
    }
}

/// Ordered tag list; duplicates are kept, membership is what adapters query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    pub fn extend(&mut self, tags: &[Tag]) {
        self.0.extend_from_slice(tags);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[Tag]> for TagSet {
    fn from(tags: &[Tag]) -> Self {
        Self(tags.to_vec())
    }
}

/// Creation id of a command, for ordering and debugging only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by whoever builds command batches
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct CommandIdGenerator {
    counter: Arc<AtomicU64>,
}

impl CommandIdGenerator {
    /// Create a new generator starting at 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next command id
    pub fn next(&self) -> CommandId {
        CommandId(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Get the last id handed out without incrementing
    pub fn current(&self) -> CommandId {
        CommandId(self.counter.load(Ordering::SeqCst))
    }

    /// Start a new command with a fresh id
    pub fn motion(&self, feed: f64) -> MotionCommand {
        MotionCommand::new(self.next(), feed)
    }
}

/// One linear move to the motion controller
#[derive(Debug, Clone)]
pub struct MotionCommand {
    /// Creation id (never part of equality)
    pub id: CommandId,
    /// Target X in software space, if this line moves X
    pub x: Option<f64>,
    /// Target Y in software space, if this line moves Y
    pub y: Option<f64>,
    /// Target Z, if this line moves Z
    pub z: Option<f64>,
    /// Feed rate in mm/min
    pub feed: f64,
    /// Semantic tags
    pub tags: TagSet,
}

impl MotionCommand {
    /// Create a command that moves no axis yet
    pub fn new(id: CommandId, feed: f64) -> Self {
        Self {
            id,
            x: None,
            y: None,
            z: None,
            feed,
            tags: TagSet::new(),
        }
    }

    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_xy(self, x: f64, y: f64) -> Self {
        self.with_x(x).with_y(y)
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_xyz(self, x: f64, y: f64, z: f64) -> Self {
        self.with_xy(x, y).with_z(z)
    }

    /// Append tags, keeping any already present
    pub fn tagged(mut self, tags: &[Tag]) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Planar position, if both x and y are set
    pub fn xy(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Planar distance to another command; `None` unless both have x and y
    pub fn distance_to(&self, other: &MotionCommand) -> Option<f64> {
        let (x1, y1) = self.xy()?;
        let (x2, y2) = other.xy()?;
        Some(((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt())
    }

    /// Axis targets in machine space (x and y negated)
    pub fn machine_coords(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        (self.x.map(|x| -x), self.y.map(|y| -y), self.z)
    }

    /// Render as a controller line
    pub fn to_gcode(&self) -> String {
        let (x, y, z) = self.machine_coords();
        let mut line = String::from("G1");
        if let Some(x) = x {
            line.push_str(&format!(" X{:.3}", x));
        }
        if let Some(y) = y {
            line.push_str(&format!(" Y{:.3}", y));
        }
        if let Some(z) = z {
            line.push_str(&format!(" Z{:.3}", z));
        }
        line.push_str(&format!(" F{:.0}", self.feed));
        line
    }
}

impl PartialEq for MotionCommand {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z && self.feed == other.feed
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_gcode())
    }
}

/// Ordered sequence of commands; order is execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBatch {
    commands: Vec<MotionCommand>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, command: MotionCommand) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = MotionCommand>) {
        self.commands.extend(commands);
    }

    /// Put `other` in front of everything already in the batch
    pub fn prepend(&mut self, other: CommandBatch) {
        let tail = std::mem::replace(&mut self.commands, other.commands);
        self.commands.extend(tail);
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, MotionCommand> {
        self.commands.iter_mut()
    }

    /// Commands tagged `contact`, in order
    pub fn contact_points(&self) -> impl Iterator<Item = &MotionCommand> {
        self.commands.iter().filter(|c| c.has_tag(Tag::Contact))
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.commands.iter().any(|c| c.has_tag(tag))
    }

    /// Sum of planar distances between consecutive commands
    pub fn path_length(&self) -> f64 {
        self.commands
            .windows(2)
            .filter_map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    pub fn to_gcode_lines(&self) -> Vec<String> {
        self.commands.iter().map(MotionCommand::to_gcode).collect()
    }

    pub fn into_vec(self) -> Vec<MotionCommand> {
        self.commands
    }
}

impl std::ops::Deref for CommandBatch {
    type Target = [MotionCommand];

    fn deref(&self) -> &Self::Target {
        &self.commands
    }
}

impl From<Vec<MotionCommand>> for CommandBatch {
    fn from(commands: Vec<MotionCommand>) -> Self {
        Self { commands }
    }
}

impl FromIterator<MotionCommand> for CommandBatch {
    fn from_iter<T: IntoIterator<Item = MotionCommand>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CommandBatch {
    type Item = MotionCommand;
    type IntoIter = std::vec::IntoIter<MotionCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a MotionCommand;
    type IntoIter = std::slice::Iter<'a, MotionCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
