use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{NodeId, PortId};
use crate::geometry::Position;
use crate::routing::PortSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// Side the wire attaches on when this port is the start of a connection.
    pub fn source_side(self) -> PortSide {
        match self {
            Self::Output => PortSide::Right,
            Self::Input => PortSide::Left,
        }
    }

    /// Side the wire attaches on when this port is the end of a connection.
    pub fn target_side(self) -> PortSide {
        match self {
            Self::Input => PortSide::Left,
            Self::Output => PortSide::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub node_id: NodeId,
    pub direction: PortDirection,
    /// Offset from the owning node's origin.
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub connected: bool,
    /// Advisory only. Inputs carry `Some(1)` for display, but validation
    /// still lets several outputs feed one input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl Port {
    pub fn new(
        id: impl Into<PortId>,
        node_id: impl Into<NodeId>,
        direction: PortDirection,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            direction,
            position,
            label: None,
            connected: false,
            max_connections: match direction {
                PortDirection::Input => Some(1),
                PortDirection::Output => None,
            },
        }
    }

    pub fn absolute_position(&self, node_position: Position) -> Position {
        node_position.offset(self.position.x, self.position.y)
    }
}

/// Partial update for a port. Identity, owner and direction are fixed at
/// creation and have no field here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortPatch {
    pub position: Option<Position>,
    pub label: Option<Option<String>>,
    pub connected: Option<bool>,
    pub max_connections: Option<Option<u32>>,
}

impl PortPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    fn apply(self, port: &mut Port) {
        if let Some(position) = self.position {
            port.position = position;
        }
        if let Some(label) = self.label {
            port.label = label;
        }
        if let Some(connected) = self.connected {
            port.connected = connected;
        }
        if let Some(max) = self.max_connections {
            port.max_connections = max;
        }
    }
}

/// All port records, keyed by id in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: IndexMap<PortId, Port>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Insert or overwrite by id.
    pub fn add_port(&mut self, port: Port) {
        self.ports.insert(port.id.clone(), port);
    }

    /// Insert or overwrite a whole port set in one step.
    pub fn add_ports(&mut self, ports: impl IntoIterator<Item = Port>) {
        for port in ports {
            self.ports.insert(port.id.clone(), port);
        }
    }

    /// Merge `patch` into the port. Unknown ids are ignored.
    pub fn update_port(&mut self, id: &str, patch: PortPatch) {
        if let Some(port) = self.ports.get_mut(id) {
            patch.apply(port);
        }
    }

    /// Move several ports at once, so a node's layout never shows a half-applied state.
    /// Unknown ids are skipped.
    pub fn update_positions<'a>(&mut self, updates: impl IntoIterator<Item = (&'a str, Position)>) {
        let mut moved = 0usize;
        for (id, position) in updates {
            if let Some(port) = self.ports.get_mut(id) {
                port.position = position;
                moved += 1;
            }
        }
        tracing::debug!(moved, "batched port position update");
    }

    pub fn remove_port(&mut self, id: &str) -> Option<Port> {
        self.ports.shift_remove(id)
    }

    /// Remove and return every port owned by `node_id`.
    pub fn remove_ports_by_node(&mut self, node_id: &str) -> Vec<Port> {
        let mut removed = Vec::new();
        self.ports.retain(|_, port| {
            if port.node_id == node_id {
                removed.push(port.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Only flips the flag; keeping it in sync with the connection registry is the caller's job.
    pub fn set_port_connected(&mut self, id: &str, connected: bool) {
        if let Some(port) = self.ports.get_mut(id) {
            port.connected = connected;
        }
    }

    pub fn get_port(&self, id: &str) -> Option<&Port> {
        self.ports.get(id)
    }

    pub fn get_node_ports(&self, node_id: &str) -> Vec<&Port> {
        self.ports.values().filter(|port| port.node_id == node_id).collect()
    }

    pub fn get_node_input_ports(&self, node_id: &str) -> Vec<&Port> {
        self.node_ports_with(node_id, PortDirection::Input)
    }

    pub fn get_node_output_ports(&self, node_id: &str) -> Vec<&Port> {
        self.node_ports_with(node_id, PortDirection::Output)
    }

    pub fn direction_of(&self, id: &str) -> Option<PortDirection> {
        self.ports.get(id).map(|port| port.direction)
    }

    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    fn node_ports_with(&self, node_id: &str, direction: PortDirection) -> Vec<&Port> {
        self.ports
            .values()
            .filter(|port| port.node_id == node_id && port.direction == direction)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_ports(node: &str) -> Vec<Port> {
        vec![
            Port::new(format!("{node}-in-0"), node, PortDirection::Input, Position::new(0.0, 20.0)),
            Port::new(format!("{node}-in-1"), node, PortDirection::Input, Position::new(0.0, 40.0)),
            Port::new(format!("{node}-out"), node, PortDirection::Output, Position::new(80.0, 30.0)),
        ]
    }

    #[test]
    fn queries_filter_by_node_and_direction() {
        let mut registry = PortRegistry::new();
        registry.add_ports(gate_ports("a"));
        registry.add_ports(gate_ports("b"));
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.get_node_ports("a").len(), 3);
        assert_eq!(registry.get_node_input_ports("b").len(), 2);
        let outputs = registry.get_node_output_ports("b");
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].id, "b-out");
    }

    #[test]
    fn add_overwrites_by_id() {
        let mut registry = PortRegistry::new();
        registry.add_ports(gate_ports("a"));
        registry.add_port(Port::new("a-out", "a", PortDirection::Output, Position::new(90.0, 30.0)));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_port("a-out").unwrap().position.x, 90.0);
    }

    #[test]
    fn update_of_missing_port_is_ignored() {
        let mut registry = PortRegistry::new();
        registry.update_port("ghost", PortPatch::position(Position::new(1.0, 1.0)));
        registry.set_port_connected("ghost", true);
        assert!(registry.is_empty());
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut registry = PortRegistry::new();
        registry.add_ports(gate_ports("a"));
        registry.update_port(
            "a-in-0",
            PortPatch {
                label: Some(Some("A".to_string())),
                ..PortPatch::default()
            },
        );
        let port = registry.get_port("a-in-0").unwrap();
        assert_eq!(port.label.as_deref(), Some("A"));
        assert_eq!(port.position, Position::new(0.0, 20.0));
        assert_eq!(port.direction, PortDirection::Input);
    }

    #[test]
    fn batch_positions_apply_together() {
        let mut registry = PortRegistry::new();
        registry.add_ports(gate_ports("a"));
        registry.update_positions([
            ("a-in-0", Position::new(-4.0, 10.0)),
            ("a-out", Position::new(100.0, 15.0)),
            ("missing", Position::new(0.0, 0.0)),
        ]);
        assert_eq!(registry.get_port("a-in-0").unwrap().position, Position::new(-4.0, 10.0));
        assert_eq!(registry.get_port("a-out").unwrap().position, Position::new(100.0, 15.0));
    }

    #[test]
    fn remove_by_node_returns_removed_ports() {
        let mut registry = PortRegistry::new();
        registry.add_ports(gate_ports("a"));
        registry.add_ports(gate_ports("b"));
        let removed = registry.remove_ports_by_node("a");
        assert_eq!(removed.len(), 3);
        assert!(registry.get_node_ports("a").is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn input_ports_default_to_single_connection() {
        let input = Port::new("i", "n", PortDirection::Input, Position::default());
        let output = Port::new("o", "n", PortDirection::Output, Position::default());
        assert_eq!(input.max_connections, Some(1));
        assert_eq!(output.max_connections, None);
        assert!(!input.connected);
    }
}
