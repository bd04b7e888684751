//! Client for the bspwm control surface.
//!
//! Every query and mutation reanchor issues goes through [`Bspc`], which
//! builds `bspc` argument vectors and hands them to a [`CommandRunner`].
//! Nothing is cached between calls: each method reads fresh state.

use std::io;
use std::process::Command;

use thiserror::Error;

use crate::tree;
use crate::types::{DesktopId, Direction, Edge, MonitorId, NodeId, NodeInfo};

/// Failure of a single control-program invocation
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("`{command}` printed non-UTF-8 output")]
    Utf8 { command: String },
}

/// Runs the control program with an argument vector and returns its stdout
pub trait CommandRunner {
    fn run(&mut self, args: &[String]) -> Result<String, ControlError>;
}

/// Runs the real control program as a child process
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, args: &[String]) -> Result<String, ControlError> {
        let command = format!("{} {}", self.program, args.join(" "));
        log::debug!("exec: {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ControlError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ControlError::Failed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|_| ControlError::Utf8 { command })
    }
}

fn argv<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Selector for the root node of a desktop
fn desktop_root(desktop: &str) -> String {
    format!("@{}:/", desktop)
}

/// Typed operations over the bspc command line
pub struct Bspc<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> Bspc<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn run(&mut self, args: Vec<String>) -> Result<String, ControlError> {
        self.runner.run(&args)
    }

    /// Run a query whose failure or empty output both mean "nothing there"
    fn query_optional(&mut self, args: Vec<String>) -> Option<String> {
        match self.run(args) {
            Ok(out) if !out.is_empty() => Some(out),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Query returned nothing: {}", e);
                None
            }
        }
    }

    // Queries

    /// Name of the focused desktop, if any
    pub fn resolve_focused_desktop(&mut self) -> Option<String> {
        self.query_optional(argv(["query", "-D", "-d", "focused", "--names"]))
            .and_then(|out| out.lines().next().map(str::to_string))
    }

    /// Id of the focused desktop
    pub fn resolve_focused_desktop_id(&mut self) -> Result<DesktopId, ControlError> {
        let out = self.run(argv(["query", "-D", "-d", "focused"]))?;
        Ok(out.lines().next().unwrap_or_default().to_string())
    }

    pub fn resolve_focused_monitor(&mut self) -> Result<MonitorId, ControlError> {
        let out = self.run(argv(["query", "-M", "-m", "focused"]))?;
        Ok(out.lines().next().unwrap_or_default().to_string())
    }

    /// Window leaves of a desktop in tree traversal order
    pub fn list_leaves(&mut self, desktop: &str) -> Vec<NodeId> {
        self.query_optional(argv(["query", "-N", "-n", ".window", "-d", desktop]))
            .map(|out| {
                out.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(NodeId::new)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resolve_focused_node(&mut self) -> Option<NodeId> {
        self.query_optional(argv(["query", "-N", "-n", "focused"]))
            .and_then(|out| out.lines().next().map(NodeId::new))
    }

    pub fn desktop_exists(&mut self, name: &str) -> bool {
        self.query_optional(argv(["query", "-D", "-d", name])).is_some()
    }

    /// Preselection pending on a desktop's root node
    pub fn read_root_preselection(&mut self, desktop: &str) -> Option<Direction> {
        let root = desktop_root(desktop);
        let json = self.query_optional(argv(["query", "-T", "-n", root.as_str()]))?;
        tree::parse_preselection(&json)
    }

    pub fn read_node_state(&mut self, node: &NodeId) -> Option<NodeInfo> {
        let json = self.query_optional(argv(["query", "-T", "-n", node.as_str()]))?;
        tree::parse_node_info(&json)
    }

    // Mutations

    pub fn set_tiled(&mut self, node: &NodeId) -> Result<(), ControlError> {
        self.run(argv(["node", node.as_str(), "-t", "tiled"])).map(drop)
    }

    /// Tile `node` if it is floating. Returns whether a state change was issued.
    ///
    /// An unreadable snapshot leaves the node untouched.
    pub fn ensure_tiled(&mut self, node: &NodeId) -> Result<bool, ControlError> {
        match self.read_node_state(node) {
            Some(info) if info.is_floating() => {
                self.set_tiled(node)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn create_desktop(&mut self, monitor: &str, name: &str) -> Result<(), ControlError> {
        self.run(argv(["monitor", monitor, "-a", name])).map(drop)
    }

    pub fn move_node(&mut self, node: &NodeId, desktop: &str) -> Result<(), ControlError> {
        self.run(argv(["node", node.as_str(), "-d", desktop])).map(drop)
    }

    pub fn set_preselection(
        &mut self,
        desktop: &str,
        direction: Direction,
    ) -> Result<(), ControlError> {
        let root = desktop_root(desktop);
        self.run(argv(["node", root.as_str(), "-p", direction.as_str()])).map(drop)
    }

    pub fn remove_desktop(&mut self, name: &str) -> Result<(), ControlError> {
        self.run(argv(["desktop", name, "-r"])).map(drop)
    }

    pub fn resize_edge(
        &mut self,
        node: &NodeId,
        edge: Edge,
        dx: i32,
        dy: i32,
    ) -> Result<(), ControlError> {
        let (dx, dy) = (dx.to_string(), dy.to_string());
        self.run(argv(["node", node.as_str(), "-z", edge.handle(), dx.as_str(), dy.as_str()]))
            .map(drop)
    }

    pub fn focus_node(&mut self, node: &NodeId) -> Result<(), ControlError> {
        self.run(argv(["node", node.as_str(), "-f"])).map(drop)
    }
}
