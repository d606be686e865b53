//! Bounded undo/redo over reversible diagram edits.

use crate::geometry::Position;
use crate::model::{Connection, ConnectionId, Diagram, Node, NodeId, Port, RemovedNode};

#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    AddNode {
        node: Node,
        ports: Vec<Port>,
    },
    RemoveNode(RemovedNode),
    MoveNode {
        id: NodeId,
        from: Position,
        to: Position,
    },
    UpdateNode {
        before: Node,
        after: Node,
    },
    AddConnection(Connection),
    RemoveConnection(Connection),
    SetWaypoints {
        id: ConnectionId,
        before: Option<Vec<Position>>,
        after: Option<Vec<Position>>,
    },
}

impl EditCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add node",
            Self::RemoveNode(_) => "remove node",
            Self::MoveNode { .. } => "move node",
            Self::UpdateNode { .. } => "update node",
            Self::AddConnection(_) => "add connection",
            Self::RemoveConnection(_) => "remove connection",
            Self::SetWaypoints { .. } => "set waypoints",
        }
    }

    pub fn apply(&self, diagram: &mut Diagram) {
        match self {
            Self::AddNode { node, ports } => {
                diagram.nodes.add_node(node.clone());
                diagram.ports.add_ports(ports.iter().cloned());
            }
            Self::RemoveNode(removed) => {
                diagram.remove_node_cascade(&removed.node.id);
            }
            Self::MoveNode { id, to, .. } => set_position(diagram, id, *to),
            Self::UpdateNode { after, .. } => put_node(diagram, after),
            Self::AddConnection(conn) => diagram.insert_connection(conn.clone()),
            Self::RemoveConnection(conn) => {
                diagram.remove_connection(&conn.id);
            }
            Self::SetWaypoints { id, after, .. } => set_waypoints(diagram, id, after),
        }
    }

    pub fn revert(&self, diagram: &mut Diagram) {
        match self {
            Self::AddNode { node, .. } => {
                diagram.remove_node_cascade(&node.id);
            }
            Self::RemoveNode(removed) => diagram.restore_node(removed.clone()),
            Self::MoveNode { id, from, .. } => set_position(diagram, id, *from),
            Self::UpdateNode { before, .. } => put_node(diagram, before),
            Self::AddConnection(conn) => {
                diagram.remove_connection(&conn.id);
            }
            Self::RemoveConnection(conn) => diagram.insert_connection(conn.clone()),
            Self::SetWaypoints { id, before, .. } => set_waypoints(diagram, id, before),
        }
    }
}

fn set_position(diagram: &mut Diagram, id: &str, position: Position) {
    if let Some(node) = diagram.nodes.get_node(id) {
        let mut node = node.clone();
        node.position = position;
        diagram.nodes.replace_node(node);
    }
}

fn put_node(diagram: &mut Diagram, node: &Node) {
    let resized = diagram
        .nodes
        .get_node(&node.id)
        .is_some_and(|current| current.size != node.size);
    diagram.nodes.replace_node(node.clone());
    if resized {
        diagram.relayout_ports(&node.id);
    }
}

fn set_waypoints(diagram: &mut Diagram, id: &str, waypoints: &Option<Vec<Position>>) {
    diagram
        .connections
        .update_connection_waypoints(id, waypoints.clone().unwrap_or_default());
}

#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: Vec<EditCommand>,
    /// Number of entries currently applied.
    cursor: usize,
    max_entries: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries,
        }
    }

    /// Record a command whose effect is already in the diagram. Drops the redo
    /// tail and, past the limit, the oldest entry.
    pub fn record(&mut self, command: EditCommand) {
        if self.max_entries == 0 {
            return;
        }
        self.entries.truncate(self.cursor);
        self.entries.push(command);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
    }

    pub fn execute(&mut self, command: EditCommand, diagram: &mut Diagram) {
        command.apply(diagram);
        self.record(command);
    }

    pub fn undo(&mut self, diagram: &mut Diagram) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        let command = &self.entries[self.cursor];
        tracing::debug!(command = command.label(), "undo");
        command.revert(diagram);
        true
    }

    pub fn redo(&mut self, diagram: &mut Diagram) -> bool {
        if !self.can_redo() {
            return false;
        }
        let command = &self.entries[self.cursor];
        tracing::debug!(command = command.label(), "redo");
        command.apply(diagram);
        self.cursor += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
