//! Promote the focused node to the anchor of its desktop.
//!
//! bspc has no primitive to reorder leaves, so the reflow parks every leaf
//! on a scratch desktop and moves them back with the focused node first:
//!
//! ```text
//!   Discovery ──► Normalization ──► Relocation ──► Cleanup ──► Size restoration
//!   (queries)     (tile focused)    (park, presel,   (remove     (east/south
//!                                    re-insert)       scratch)    resize, focus)
//! ```
//!
//! Every mutation goes through [`Reflow::call`] with an explicit [`Policy`].
//! Desktop creation/removal, node moves and the final focus propagate their
//! failures; preselection restore, tiling and resizing are tolerated.

use anyhow::{bail, Context, Result};

use crate::bspc::{Bspc, CommandRunner, ControlError};
use crate::config::ReflowConfig;
use crate::journal::{CallOutcome, Journal, Policy};
use crate::types::{size_delta, DesktopId, Direction, Edge, MonitorId, NodeId, Rect};

/// State captured before anything is changed
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Name of the desktop, for messages
    pub desktop: String,
    /// Selector for the desktop; names may repeat across monitors
    pub desktop_id: DesktopId,
    pub monitor: MonitorId,
    /// Leaves in traversal order; the membership to rebuild
    pub leaves: Vec<NodeId>,
    pub focused: NodeId,
    pub preselection: Option<Direction>,
    /// Rectangle of the anchor before the reflow
    pub anchor_size: Option<Rect>,
}

/// Summary of a completed reflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub desktop: String,
    /// Order the leaves were re-inserted in
    pub order: Vec<NodeId>,
    /// Width and height change applied to the new anchor
    pub resized: (i32, i32),
    pub tolerated_failures: usize,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoFocusedDesktop,
    NoLeaves { desktop: String },
    NoFocusedNode { desktop: String },
    Reflowed(Report),
}

enum Discovery {
    Ready(Snapshot),
    Skip(Outcome),
}

/// Focused node first, then every other leaf in its original order
pub fn reinsertion_order(leaves: &[NodeId], focused: &NodeId) -> Vec<NodeId> {
    std::iter::once(focused.clone())
        .chain(leaves.iter().filter(|l| *l != focused).cloned())
        .collect()
}

pub struct Reflow<R: CommandRunner> {
    bspc: Bspc<R>,
    config: ReflowConfig,
    journal: Journal,
    /// Leaves currently sitting on the scratch desktop
    parked: Vec<NodeId>,
}

impl<R: CommandRunner> Reflow<R> {
    pub fn new(bspc: Bspc<R>, config: ReflowConfig) -> Self {
        Self {
            bspc,
            config,
            journal: Journal::new(),
            parked: Vec::new(),
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn run(&mut self) -> Result<Outcome> {
        let snapshot = match self.discover()? {
            Discovery::Ready(snapshot) => snapshot,
            Discovery::Skip(outcome) => return Ok(outcome),
        };

        log::info!(
            "Reflowing desktop '{}': {} leaves, new anchor {}",
            snapshot.desktop,
            snapshot.leaves.len(),
            snapshot.focused
        );

        self.normalize(&snapshot);
        let order = self.relocate(&snapshot)?;
        self.cleanup()?;
        let resized = self.restore_size(&snapshot)?;

        Ok(Outcome::Reflowed(Report {
            desktop: snapshot.desktop,
            order,
            resized,
            tolerated_failures: self.journal.tolerated_failures(),
        }))
    }

    fn record<T>(&mut self, policy: Policy, action: String, result: &Result<T, ControlError>) {
        let outcome = match result {
            Ok(_) => CallOutcome::Ok,
            Err(e) => CallOutcome::Failed { error: e.to_string() },
        };
        log::debug!("{} [{:?}]: {:?}", action, policy, outcome);
        self.journal.record(action, policy, outcome);
    }

    /// Issue one mutation, journal it, and return its result untouched
    fn call<T>(
        &mut self,
        policy: Policy,
        action: String,
        f: impl FnOnce(&mut Bspc<R>) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let result = f(&mut self.bspc);
        self.record(policy, action, &result);
        result
    }

    fn essential<T>(
        &mut self,
        action: String,
        f: impl FnOnce(&mut Bspc<R>) -> Result<T, ControlError>,
    ) -> Result<T> {
        self.call(Policy::Propagate, action.clone(), f)
            .with_context(|| format!("Failed to {}", action))
    }

    fn tolerated<T>(
        &mut self,
        action: String,
        f: impl FnOnce(&mut Bspc<R>) -> Result<T, ControlError>,
    ) -> Option<T> {
        match self.call(Policy::Tolerate, action.clone(), f) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Ignoring failure to {}: {}", action, e);
                None
            }
        }
    }

    /// Tile a floating node. Only an actual toggle is journaled.
    fn tile(&mut self, node: &NodeId) {
        let result = self.bspc.ensure_tiled(node);
        if matches!(result, Ok(false)) {
            return;
        }
        let action = format!("tile {}", node);
        self.record(Policy::Tolerate, action.clone(), &result);
        if let Err(e) = result {
            log::warn!("Ignoring failure to {}: {}", action, e);
        }
    }

    /// Attach the list of stranded leaves to an abort
    fn stranded(&self, err: anyhow::Error) -> anyhow::Error {
        if self.parked.is_empty() {
            return err;
        }
        let ids: Vec<String> = self.parked.iter().map(ToString::to_string).collect();
        err.context(format!(
            "Reflow aborted with {} node(s) left on desktop '{}': {}",
            ids.len(),
            self.config.scratch_desktop,
            ids.join(" ")
        ))
    }

    fn discover(&mut self) -> Result<Discovery> {
        let Some(desktop) = self.bspc.resolve_focused_desktop() else {
            log::info!("No focused desktop, nothing to do");
            return Ok(Discovery::Skip(Outcome::NoFocusedDesktop));
        };

        let desktop_id = self
            .bspc
            .resolve_focused_desktop_id()
            .context("Failed to query focused desktop id")?;
        let monitor = self
            .bspc
            .resolve_focused_monitor()
            .context("Failed to query focused monitor")?;

        let leaves = self.bspc.list_leaves(&desktop_id);
        if leaves.is_empty() {
            log::info!("Desktop '{}' has no leaves, nothing to do", desktop);
            return Ok(Discovery::Skip(Outcome::NoLeaves { desktop }));
        }

        let focused = match self.bspc.resolve_focused_node() {
            Some(node) if leaves.contains(&node) => node,
            other => {
                log::info!(
                    "Focused node {:?} is not a leaf of desktop '{}', nothing to do",
                    other.map(|n| n.to_string()),
                    desktop
                );
                return Ok(Discovery::Skip(Outcome::NoFocusedNode { desktop }));
            }
        };

        let scratch = &self.config.scratch_desktop;
        if desktop == *scratch || self.bspc.desktop_exists(scratch) {
            bail!(
                "Desktop '{}' already exists; a previous run may have aborted and left nodes on it",
                scratch
            );
        }

        let preselection = self.bspc.read_root_preselection(&desktop_id);
        let anchor_size = self.bspc.read_node_state(&leaves[0]).map(|i| i.rectangle);
        log::debug!(
            "Snapshot: desktop={} monitor={} preselection={:?} anchor_size={:?}",
            desktop_id,
            monitor,
            preselection,
            anchor_size
        );

        Ok(Discovery::Ready(Snapshot {
            desktop,
            desktop_id,
            monitor,
            leaves,
            focused,
            preselection,
            anchor_size,
        }))
    }

    fn normalize(&mut self, snapshot: &Snapshot) {
        self.tile(&snapshot.focused);
    }

    fn relocate(&mut self, snapshot: &Snapshot) -> Result<Vec<NodeId>> {
        let scratch = self.config.scratch_desktop.clone();
        let (desktop, name) = (&snapshot.desktop_id, &snapshot.desktop);

        self.essential(
            format!("create desktop '{}' on monitor {}", scratch, snapshot.monitor),
            |b| b.create_desktop(&snapshot.monitor, &scratch),
        )?;

        for leaf in &snapshot.leaves {
            self.essential(format!("move {} to '{}'", leaf, scratch), |b| {
                b.move_node(leaf, &scratch)
            })
            .map_err(|e| self.stranded(e))?;
            self.parked.push(leaf.clone());
        }

        if let Some(direction) = snapshot.preselection {
            if self.config.restore_preselection {
                self.tolerated(
                    format!("preselect {} on the root of '{}'", direction, name),
                    |b| b.set_preselection(desktop, direction),
                );
            }
        }

        let order = reinsertion_order(&snapshot.leaves, &snapshot.focused);
        for leaf in &order {
            self.essential(format!("move {} to '{}'", leaf, name), |b| {
                b.move_node(leaf, desktop)
            })
            .map_err(|e| self.stranded(e))?;
            self.parked.retain(|p| p != leaf);
            self.tile(leaf);
        }

        Ok(order)
    }

    fn cleanup(&mut self) -> Result<()> {
        let scratch = self.config.scratch_desktop.clone();
        self.essential(format!("remove desktop '{}'", scratch), |b| {
            b.remove_desktop(&scratch)
        })
    }

    fn restore_size(&mut self, snapshot: &Snapshot) -> Result<(i32, i32)> {
        let anchor = &snapshot.focused;
        let mut resized = (0, 0);

        if self.config.restore_size {
            let current = self.bspc.read_node_state(anchor).map(|i| i.rectangle);
            if let (Some(target), Some(current)) = (snapshot.anchor_size, current) {
                let (dx, dy) = size_delta(target, current);
                if dx != 0
                    && self
                        .tolerated(format!("resize {} east by {}", anchor, dx), |b| {
                            b.resize_edge(anchor, Edge::East, dx, 0)
                        })
                        .is_some()
                {
                    resized.0 = dx;
                }
                if dy != 0
                    && self
                        .tolerated(format!("resize {} south by {}", anchor, dy), |b| {
                            b.resize_edge(anchor, Edge::South, 0, dy)
                        })
                        .is_some()
                {
                    resized.1 = dy;
                }
            } else {
                log::debug!("Anchor size unknown, skipping resize");
            }
        }

        self.essential(format!("focus {}", anchor), |b| b.focus_node(anchor))?;
        Ok(resized)
    }
}
