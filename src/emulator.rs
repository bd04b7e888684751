//! In-memory stand-in for a running bspwm, used by unit tests.
//!
//! Interprets the same argument vectors `Bspc` produces, keeps desktops,
//! leaf order, preselections and a spiral layout, and records every call.
//! Moving a node onto a desktop appends it to that desktop's leaf order; a
//! desktop that loses its last leaf loses its root along with the root's
//! preselection and split ratio, though a preselection can be set on it
//! again before the next insertion.
//!
//! Desktops get ids in creation order starting at [`FIRST_DESKTOP_ID`].
//! Selectors match an id first, then the first desktop with that name,
//! the same way bspwm resolves a name shared by several monitors.

use std::collections::HashMap;

use serde_json::json;

use crate::bspc::{CommandRunner, ControlError};
use crate::types::{Direction, NodeState, Rect};

const SCREEN_WIDTH: u32 = 1920;
const SCREEN_HEIGHT: u32 = 1080;
const DEFAULT_RATIO: f64 = 0.5;

/// Id of the first desktop a `FakeWm` creates
pub const FIRST_DESKTOP_ID: &str = "0x00400001";

#[derive(Debug, Clone)]
pub struct FakeDesktop {
    pub id: String,
    pub name: String,
    pub leaves: Vec<String>,
    pub presel: Option<Direction>,
    /// Split ratio of the root, which sizes the anchor
    pub ratio: f64,
}

impl FakeDesktop {
    fn new(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            leaves: Vec::new(),
            presel: None,
            ratio: DEFAULT_RATIO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub state: NodeState,
    pub floating_rect: Rect,
}

pub struct FakeWm {
    pub monitor: String,
    pub desktops: Vec<FakeDesktop>,
    pub focused_node: Option<String>,
    /// Id of the focused desktop
    focused_desktop: Option<String>,
    next_desktop: u32,
    pub nodes: HashMap<String, FakeNode>,
    /// Every call, joined with spaces
    pub calls: Vec<String>,
    /// Calls that were not queries
    pub mutations: Vec<String>,
    /// Calls starting with any of these prefixes fail
    failing: Vec<String>,
    /// Replace the answer to a tree query with raw text
    raw_trees: HashMap<String, String>,
}

impl FakeWm {
    pub fn new() -> Self {
        Self {
            monitor: "0x00200002".to_string(),
            desktops: Vec::new(),
            focused_node: None,
            focused_desktop: None,
            next_desktop: 0,
            nodes: HashMap::new(),
            calls: Vec::new(),
            mutations: Vec::new(),
            failing: Vec::new(),
            raw_trees: HashMap::new(),
        }
    }

    /// Add a desktop holding tiled leaves. The first desktop added is focused.
    pub fn desktop(mut self, name: &str, leaves: &[&str]) -> Self {
        let mut desktop = self.new_desktop(name);
        for leaf in leaves {
            desktop.leaves.push(leaf.to_string());
            self.nodes.insert(
                leaf.to_string(),
                FakeNode {
                    state: NodeState::Tiled,
                    floating_rect: Rect::new(200, 150, 640, 480),
                },
            );
        }
        if self.focused_desktop.is_none() {
            self.focused_desktop = Some(desktop.id.clone());
        }
        self.desktops.push(desktop);
        self
    }

    pub fn focus(mut self, node: &str) -> Self {
        self.focused_node = Some(node.to_string());
        self.focused_desktop = self.desktop_of(node).map(|d| self.desktops[d].id.clone());
        self
    }

    pub fn unfocused(mut self) -> Self {
        self.focused_desktop = None;
        self.focused_node = None;
        self
    }

    pub fn floating(mut self, node: &str) -> Self {
        if let Some(n) = self.nodes.get_mut(node) {
            n.state = NodeState::Floating;
        }
        self
    }

    pub fn presel(mut self, desktop: &str, direction: Direction) -> Self {
        if let Some(d) = self.find_desktop(desktop) {
            self.desktops[d].presel = Some(direction);
        }
        self
    }

    pub fn ratio(mut self, desktop: &str, ratio: f64) -> Self {
        if let Some(d) = self.find_desktop(desktop) {
            self.desktops[d].ratio = ratio;
        }
        self
    }

    pub fn fail(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub fn raw_tree(mut self, selector: &str, text: &str) -> Self {
        self.raw_trees.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn leaves(&self, desktop: &str) -> Vec<String> {
        self.find_desktop(desktop)
            .map(|d| self.desktops[d].leaves.clone())
            .unwrap_or_default()
    }

    pub fn desktop_names(&self) -> Vec<String> {
        self.desktops.iter().map(|d| d.name.clone()).collect()
    }

    pub fn presel_of(&self, desktop: &str) -> Option<Direction> {
        self.find_desktop(desktop).and_then(|d| self.desktops[d].presel)
    }

    pub fn state_of(&self, node: &str) -> Option<NodeState> {
        self.nodes.get(node).map(|n| n.state)
    }

    fn new_desktop(&mut self, name: &str) -> FakeDesktop {
        let id = format!("0x{:08X}", 0x0040_0001 + self.next_desktop);
        self.next_desktop += 1;
        FakeDesktop::new(id, name)
    }

    /// Resolve a desktop selector: an id, or the first desktop with that name
    fn find_desktop(&self, selector: &str) -> Option<usize> {
        self.desktops
            .iter()
            .position(|d| d.id == selector)
            .or_else(|| self.desktops.iter().position(|d| d.name == selector))
    }

    fn focused_desktop_index(&self) -> Option<usize> {
        self.find_desktop(self.focused_desktop.as_deref()?)
    }

    fn desktop_of(&self, node: &str) -> Option<usize> {
        self.desktops
            .iter()
            .position(|d| d.leaves.iter().any(|l| l == node))
    }

    fn tiled_leaves(&self, desktop: usize) -> Vec<&String> {
        self.desktops[desktop]
            .leaves
            .iter()
            .filter(|l| self.nodes.get(*l).is_some_and(|n| !n.state.is_floating()))
            .collect()
    }

    /// Spiral layout: each tiled leaf takes a share of what remains,
    /// alternating vertical and horizontal splits. The root ratio sizes
    /// the anchor; deeper splits are even.
    pub fn rect_of(&self, node: &str) -> Option<Rect> {
        let info = self.nodes.get(node)?;
        if info.state.is_floating() {
            return Some(info.floating_rect);
        }
        let desktop = self.desktop_of(node)?;
        let tiled = self.tiled_leaves(desktop);
        let mut region = Rect::new(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT);

        for (i, leaf) in tiled.iter().enumerate() {
            if i + 1 == tiled.len() {
                return (leaf.as_str() == node).then_some(region);
            }
            let ratio = if i == 0 { self.desktops[desktop].ratio } else { DEFAULT_RATIO };
            let (mine, rest) = if i % 2 == 0 {
                let w = (region.width as f64 * ratio).round() as u32;
                (
                    Rect::new(region.x, region.y, w, region.height),
                    Rect::new(region.x + w as i32, region.y, region.width - w, region.height),
                )
            } else {
                let h = (region.height as f64 * ratio).round() as u32;
                (
                    Rect::new(region.x, region.y, region.width, h),
                    Rect::new(region.x, region.y + h as i32, region.width, region.height - h),
                )
            };
            if leaf.as_str() == node {
                return Some(mine);
            }
            region = rest;
        }
        None
    }

    fn error(command: &str, stderr: &str) -> ControlError {
        ControlError::Failed {
            command: command.to_string(),
            code: Some(1),
            stderr: stderr.to_string(),
        }
    }

    fn root_desktop(selector: &str) -> Option<&str> {
        selector.strip_prefix('@')?.strip_suffix(":/")
    }

    fn tree(&self, command: &str, selector: &str) -> Result<String, ControlError> {
        if let Some(raw) = self.raw_trees.get(selector) {
            return Ok(raw.clone());
        }
        if let Some(name) = Self::root_desktop(selector) {
            let d = self
                .find_desktop(name)
                .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
            let desktop = &self.desktops[d];
            if desktop.leaves.is_empty() {
                return Ok(String::new());
            }
            let presel = desktop
                .presel
                .map(|dir| json!({"splitDir": dir.as_str(), "splitRatio": 0.5}));
            return Ok(json!({
                "splitType": "vertical",
                "splitRatio": desktop.ratio,
                "presel": presel,
                "rectangle": {"x": 0, "y": 0, "width": SCREEN_WIDTH, "height": SCREEN_HEIGHT},
                "client": null
            })
            .to_string());
        }

        let node = self
            .nodes
            .get(selector)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        let rect = self
            .rect_of(selector)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        Ok(json!({
            "presel": null,
            "rectangle": rect,
            "client": {"className": "XTerm", "state": node.state}
        })
        .to_string())
    }

    fn move_node(&mut self, command: &str, node: &str, target: &str) -> Result<(), ControlError> {
        let to = self
            .find_desktop(target)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        let from = self
            .desktop_of(node)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        if from == to {
            return Ok(());
        }
        self.desktops[from].leaves.retain(|l| l != node);
        if self.desktops[from].leaves.is_empty() {
            self.desktops[from].presel = None;
            self.desktops[from].ratio = DEFAULT_RATIO;
        }
        self.desktops[to].leaves.push(node.to_string());
        Ok(())
    }

    fn resize(&mut self, command: &str, node: &str, handle: &str, dx: &str, dy: &str) -> Result<(), ControlError> {
        let dx: i64 = dx.parse().map_err(|_| Self::error(command, "Invalid argument"))?;
        let dy: i64 = dy.parse().map_err(|_| Self::error(command, "Invalid argument"))?;
        let desktop = self
            .desktop_of(node)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        let rect = self
            .rect_of(node)
            .ok_or_else(|| Self::error(command, "Invalid descriptor"))?;
        let (is_anchor, tiled_count) = {
            let tiled = self.tiled_leaves(desktop);
            (tiled.first().is_some_and(|l| l.as_str() == node), tiled.len())
        };

        // Only the anchor's right edge borders a split; it spans the full height
        match handle {
            "right" if is_anchor && tiled_count > 1 && dy == 0 => {
                let width = (rect.width as i64 + dx).clamp(1, SCREEN_WIDTH as i64 - 1);
                self.desktops[desktop].ratio = width as f64 / SCREEN_WIDTH as f64;
                Ok(())
            }
            _ => Err(Self::error(command, "")),
        }
    }
}

impl CommandRunner for FakeWm {
    fn run(&mut self, args: &[String]) -> Result<String, ControlError> {
        let command = args.join(" ");
        self.calls.push(command.clone());
        let is_query = args.first().is_some_and(|a| a == "query");
        if !is_query {
            self.mutations.push(command.clone());
        }
        if self.failing.iter().any(|p| command.starts_with(p.as_str())) {
            return Err(Self::error(&command, "injected failure"));
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["query", "-D", "-d", "focused", "--names"] => self
                .focused_desktop_index()
                .map(|d| self.desktops[d].name.clone())
                .ok_or_else(|| Self::error(&command, "")),
            ["query", "-D", "-d", "focused"] => self
                .focused_desktop
                .clone()
                .ok_or_else(|| Self::error(&command, "")),
            ["query", "-M", "-m", "focused"] => Ok(self.monitor.clone()),
            ["query", "-N", "-n", "focused"] => self
                .focused_node
                .clone()
                .ok_or_else(|| Self::error(&command, "")),
            ["query", "-N", "-n", ".window", "-d", desktop] => {
                let d = self
                    .find_desktop(desktop)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                if self.desktops[d].leaves.is_empty() {
                    return Err(Self::error(&command, ""));
                }
                Ok(self.desktops[d].leaves.join("\n"))
            }
            ["query", "-D", "-d", name] => self
                .find_desktop(name)
                .map(|d| self.desktops[d].id.clone())
                .ok_or_else(|| Self::error(&command, "")),
            ["query", "-T", "-n", selector] => self.tree(&command, selector),
            ["monitor", monitor, "-a", name] => {
                if *monitor != self.monitor {
                    return Err(Self::error(&command, "Invalid descriptor"));
                }
                let desktop = self.new_desktop(name);
                self.desktops.push(desktop);
                Ok(String::new())
            }
            ["desktop", name, "-r"] => {
                let d = self
                    .find_desktop(name)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                if !self.desktops[d].leaves.is_empty() {
                    return Err(Self::error(&command, "desktop not empty"));
                }
                self.desktops.remove(d);
                Ok(String::new())
            }
            ["node", selector, "-p", direction] => {
                let name = Self::root_desktop(selector)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                let d = self
                    .find_desktop(name)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                self.desktops[d].presel = Direction::parse(direction);
                Ok(String::new())
            }
            ["node", node, "-t", "tiled"] => {
                let n = self
                    .nodes
                    .get_mut(*node)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                n.state = NodeState::Tiled;
                Ok(String::new())
            }
            ["node", node, "-d", desktop] => {
                self.move_node(&command, node, desktop)?;
                Ok(String::new())
            }
            ["node", node, "-z", handle, dx, dy] => {
                self.resize(&command, node, handle, dx, dy)?;
                Ok(String::new())
            }
            ["node", node, "-f"] => {
                let d = self
                    .desktop_of(node)
                    .ok_or_else(|| Self::error(&command, "Invalid descriptor"))?;
                self.focused_node = Some(node.to_string());
                self.focused_desktop = Some(self.desktops[d].id.clone());
                Ok(String::new())
            }
            _ => Err(Self::error(&command, "Unknown command")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spiral_layout() {
        let wm = FakeWm::new().desktop("1", &["a", "b", "c"]).ratio("1", 0.6);
        assert_eq!(wm.rect_of("a"), Some(Rect::new(0, 0, 1152, 1080)));
        assert_eq!(wm.rect_of("b"), Some(Rect::new(1152, 0, 768, 540)));
        assert_eq!(wm.rect_of("c"), Some(Rect::new(1152, 540, 768, 540)));
    }

    #[test]
    fn test_single_leaf_fills_screen() {
        let wm = FakeWm::new().desktop("1", &["a"]);
        assert_eq!(wm.rect_of("a"), Some(Rect::new(0, 0, 1920, 1080)));
    }

    #[test]
    fn test_selectors_prefer_ids() {
        let mut wm = FakeWm::new()
            .desktop("1", &["a"])
            .desktop("1", &["b"])
            .focus("b");
        let query = |wm: &mut FakeWm, args: &[&str]| {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            wm.run(&args).unwrap()
        };

        assert_eq!(query(&mut wm, &["query", "-D", "-d", "focused"]), "0x00400002");
        assert_eq!(query(&mut wm, &["query", "-D", "-d", "focused", "--names"]), "1");
        assert_eq!(query(&mut wm, &["query", "-N", "-n", ".window", "-d", "1"]), "a");
        assert_eq!(
            query(&mut wm, &["query", "-N", "-n", ".window", "-d", "0x00400002"]),
            "b"
        );
        assert_eq!(wm.desktops[0].id, FIRST_DESKTOP_ID);
    }

    #[test]
    fn test_emptied_desktop_forgets_root() {
        let mut wm = FakeWm::new()
            .desktop("1", &["a"])
            .desktop("2", &[])
            .presel("1", Direction::East)
            .ratio("1", 0.7);
        let args: Vec<String> = ["node", "a", "-d", "2"].iter().map(|s| s.to_string()).collect();
        wm.run(&args).unwrap();
        assert_eq!(wm.presel_of("1"), None);
        assert_eq!(wm.desktops[0].ratio, DEFAULT_RATIO);
        assert_eq!(wm.leaves("2"), vec!["a"]);
    }
}
