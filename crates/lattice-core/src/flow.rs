//! Flow traces — bounded call chains rooted at entry routines

use serde::{Deserialize, Serialize};

use crate::model::EntityId;

/// Why a trace stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// `flow.max_depth` reached.
    DepthLimit,
    /// The last callee has no outgoing calls.
    Leaf,
    /// The callee was already expanded on this path.
    CycleBreak,
    /// The callee could not be bound to a project routine.
    Unresolved,
}

impl Terminal {
    pub fn name(&self) -> &'static str {
        match self {
            Terminal::DepthLimit => "depth_limit",
            Terminal::Leaf => "leaf",
            Terminal::CycleBreak => "cycle_break",
            Terminal::Unresolved => "unresolved",
        }
    }
}

/// One caller→callee hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowHop {
    pub caller: EntityId,
    /// External for an unresolved callee.
    pub callee: EntityId,
    /// The call expression, verbatim, for diagnostic display.
    pub call_text: String,
    pub line: u32,
    /// Attached when tie-breaking picked among several candidates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// An ordered call chain rooted at an entry routine. One trace is emitted
/// per call site of the entry, so renderers get one scenario each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTrace {
    pub entry: EntityId,
    pub hops: Vec<FlowHop>,
    /// Deepest recursion level reached.
    pub depth: u32,
    pub terminal: Terminal,
}
