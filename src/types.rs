//! Shared types used across multiple modules.
//!
//! Values here mirror what `bspc` prints: node ids, preselection
//! directions, client states and rectangles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque node identifier as printed by `bspc query -N` (e.g. `0x01A00003`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monitor identifier as printed by `bspc query -M`
pub type MonitorId = String;

/// Desktop identifier as printed by `bspc query -D`.
///
/// Desktop names need not be unique across monitors, so selectors use this.
pub type DesktopId = String;

/// Preselection (split) direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// Parse a direction as bspc reports it.
    ///
    /// `cancel`, empty text and anything unrecognised mean there is no
    /// preselection to restore.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "north" => Ok(Direction::North),
            "south" => Ok(Direction::South),
            "east" => Ok(Direction::East),
            "west" => Ok(Direction::West),
            other => Err(format!("not a preselection direction: {:?}", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Tiled,
    PseudoTiled,
    Floating,
    Fullscreen,
}

impl NodeState {
    pub fn is_floating(&self) -> bool {
        matches!(self, NodeState::Floating)
    }
}

/// A rectangle representing geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[allow(dead_code)]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Edge of a node that a resize moves.
///
/// Only the right and bottom edges are used so the top-left corner stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    East,
    South,
}

impl Edge {
    /// Resize handle name understood by `bspc node -z`
    pub fn handle(&self) -> &'static str {
        match self {
            Edge::East => "right",
            Edge::South => "bottom",
        }
    }
}

/// State and geometry read from a node's tree snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    /// `None` when the snapshot carried no client state
    pub state: Option<NodeState>,
    pub rectangle: Rect,
}

impl NodeInfo {
    pub fn is_floating(&self) -> bool {
        self.state.is_some_and(|s| s.is_floating())
    }
}

/// Signed (width, height) change that turns `current` into `target`
pub fn size_delta(target: Rect, current: Rect) -> (i32, i32) {
    let dx = target.width as i64 - current.width as i64;
    let dy = target.height as i64 - current.height as i64;
    (clamp_i32(dx), clamp_i32(dy))
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
