//! Typed channel for inline edits of gate parameters.
//!
//! A node interaction pushes an [`EditRequest`]; a single [`EditingCoordinator`]
//! opens it, and the value it commits lands in the diagram as an undoable
//! node update.

use std::collections::VecDeque;

use crate::history::{CommandHistory, EditCommand};
use crate::model::{Diagram, GateType, Node, NodeId};

pub const DEFAULT_LABEL_TEXT: &str = "LABEL";
pub const DEFAULT_TIMER_SECONDS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Label,
    TimerSeconds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditRequest {
    Begin {
        node_id: NodeId,
        field: EditField,
        initial: String,
    },
}

impl EditRequest {
    /// Only LABEL and PDTIMER gates have an editable parameter.
    pub fn for_node(node: &Node) -> Option<Self> {
        let (field, initial) = match node.kind.gate_type()? {
            GateType::Label => (
                EditField::Label,
                node.custom_label
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LABEL_TEXT.to_string()),
            ),
            GateType::PdTimer => (
                EditField::TimerSeconds,
                node.timer_value.unwrap_or(DEFAULT_TIMER_SECONDS).to_string(),
            ),
            _ => return None,
        };
        Some(Self::Begin {
            node_id: node.id.clone(),
            field,
            initial,
        })
    }

    pub fn node_id(&self) -> &str {
        match self {
            Self::Begin { node_id, .. } => node_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditingCoordinator {
    pending: VecDeque<EditRequest>,
    active: Option<EditRequest>,
}

impl EditingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, request: EditRequest) {
        self.pending.push_back(request);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Open the next queued request. Keeps the current one if an edit is already open.
    pub fn begin_next(&mut self) -> Option<&EditRequest> {
        if self.active.is_none() {
            self.active = self.pending.pop_front();
        }
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&EditRequest> {
        self.active.as_ref()
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Close the open edit, writing `value` to its node. Returns whether the
    /// node changed. Timer values must parse as a positive finite number;
    /// anything else closes the edit without a change.
    pub fn commit(&mut self, value: &str, diagram: &mut Diagram, history: &mut CommandHistory) -> bool {
        let Some(EditRequest::Begin { node_id, field, .. }) = self.active.take() else {
            return false;
        };
        let Some(before) = diagram.nodes.get_node(&node_id).cloned() else {
            return false;
        };
        let mut after = before.clone();
        match field {
            EditField::Label => after.custom_label = Some(value.to_string()),
            EditField::TimerSeconds => match value.trim().parse::<f32>() {
                Ok(seconds) if seconds.is_finite() && seconds > 0.0 => after.timer_value = Some(seconds),
                _ => {
                    tracing::debug!(node = %node_id, value, "ignored invalid timer value");
                    return false;
                }
            },
        }
        if after == before {
            return false;
        }
        history.execute(EditCommand::UpdateNode { before, after }, diagram);
        true
    }
}
