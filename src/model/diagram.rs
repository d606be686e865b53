use std::collections::BTreeSet;

use super::connections::{Connection, ConnectionRegistry};
use super::nodes::{Node, NodeRegistry, port_id, port_layout};
use super::ports::{Port, PortRegistry};
use super::PortId;
use crate::geometry::Position;

/// The three registries as one unit, so edits that span them stay together.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub nodes: NodeRegistry,
    pub ports: PortRegistry,
    pub connections: ConnectionRegistry,
}

/// Everything a node delete took with it, enough to put it back exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub order: usize,
    pub ports: Vec<Port>,
    pub connections: Vec<Connection>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// `node.position + port.position`, or `None` if either is gone.
    pub fn absolute_port_position(&self, port_id: &str) -> Option<Position> {
        let port = self.ports.get_port(port_id)?;
        let node = self.nodes.get_node(&port.node_id)?;
        Some(port.absolute_position(node.position))
    }

    /// Recompute `connected` from the connection registry for each listed port.
    pub fn refresh_connected<'a>(&mut self, port_ids: impl IntoIterator<Item = &'a str>) {
        for id in port_ids {
            let in_use = self.connections.is_port_in_use(id);
            self.ports.set_port_connected(id, in_use);
        }
    }

    /// Drop connections touching the node's ports, then the ports, then the node.
    pub fn remove_node_cascade(&mut self, node_id: &str) -> Option<RemovedNode> {
        self.nodes.get_node(node_id)?;
        let port_ids: Vec<PortId> = self
            .ports
            .get_node_ports(node_id)
            .into_iter()
            .map(|port| port.id.clone())
            .collect();
        let connections = self.connections.remove_connections_by_node(node_id, &port_ids);
        let ports = self.ports.remove_ports_by_node(node_id);
        let (node, order) = self.nodes.remove_node(node_id)?;

        let touched = endpoints(&connections);
        self.refresh_connected(touched.iter().map(String::as_str));
        tracing::debug!(
            node = node_id,
            ports = ports.len(),
            connections = connections.len(),
            "node removed"
        );
        Some(RemovedNode {
            node,
            order,
            ports,
            connections,
        })
    }

    pub fn restore_node(&mut self, removed: RemovedNode) {
        let RemovedNode {
            node,
            order,
            ports,
            connections,
        } = removed;
        self.nodes.restore_node(node, order);
        self.ports.add_ports(ports);
        let touched = endpoints(&connections);
        for connection in connections {
            self.connections.restore_connection(connection);
        }
        self.refresh_connected(touched.iter().map(String::as_str));
    }

    pub fn insert_connection(&mut self, connection: Connection) {
        let ends = [connection.from_port_id.clone(), connection.to_port_id.clone()];
        self.connections.restore_connection(connection);
        self.refresh_connected(ends.iter().map(String::as_str));
    }

    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let removed = self.connections.remove_connection(id)?;
        self.refresh_connected([removed.from_port_id.as_str(), removed.to_port_id.as_str()]);
        Some(removed)
    }

    /// Recompute the node's port offsets from its kind and size, applied as one batch.
    pub fn relayout_ports(&mut self, node_id: &str) {
        let Some(node) = self.nodes.get_node(node_id) else {
            return;
        };
        let updates: Vec<(PortId, Position)> = port_layout(node.kind, node.size)
            .into_iter()
            .map(|slot| (port_id(node_id, &slot.suffix), slot.position))
            .collect();
        self.ports
            .update_positions(updates.iter().map(|(id, pos)| (id.as_str(), *pos)));
    }
}

fn endpoints(connections: &[Connection]) -> BTreeSet<PortId> {
    connections
        .iter()
        .flat_map(|conn| [conn.from_port_id.clone(), conn.to_port_id.clone()])
        .collect()
}
