//! Parsing of `bspc query -T` tree snapshots.
//!
//! Only the handful of fields reanchor needs are modelled; everything else
//! in the snapshot is ignored. Parsing never fails hard: a malformed or
//! unexpected document means the piece of state is treated as unknown.

use serde::Deserialize;

use crate::types::{Direction, NodeInfo, NodeState, Rect};

/// Subset of a node snapshot
#[derive(Debug, Deserialize)]
struct NodeSnapshot {
    #[serde(default)]
    presel: Option<PreselSnapshot>,
    #[serde(default)]
    state: Option<NodeState>,
    #[serde(default)]
    client: Option<ClientSnapshot>,
    #[serde(default)]
    rectangle: Option<Rect>,
}

/// Pending split recorded on a node
#[derive(Debug, Deserialize)]
struct PreselSnapshot {
    #[serde(alias = "splitDir")]
    direction: Option<String>,
}

/// Window-holding part of a leaf
#[derive(Debug, Deserialize)]
struct ClientSnapshot {
    #[serde(default)]
    state: Option<NodeState>,
}

fn parse_snapshot(json: &str) -> Option<NodeSnapshot> {
    match serde_json::from_str::<NodeSnapshot>(json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::debug!("Ignoring unparseable tree snapshot: {}", e);
            None
        }
    }
}

/// Preselection direction recorded on the snapshot's node
pub fn parse_preselection(json: &str) -> Option<Direction> {
    let direction = parse_snapshot(json)?.presel?.direction?;
    Direction::parse(&direction)
}

/// Client state and rectangle of a node
pub fn parse_node_info(json: &str) -> Option<NodeInfo> {
    let snapshot = parse_snapshot(json)?;
    let state = snapshot
        .state
        .or_else(|| snapshot.client.and_then(|c| c.state));
    let rectangle = snapshot.rectangle?;
    Some(NodeInfo { state, rectangle })
}
