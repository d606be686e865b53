use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ports::{PortDirection, PortRegistry};
use super::{ConnectionId, NodeId, PortId};
use crate::error::ConnectionRejection;
use crate::geometry::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    /// The output-side port once normalized by the drawing interaction.
    pub from_port_id: PortId,
    pub to_port_id: PortId,
    #[serde(default)]
    pub selected: bool,
    /// User-placed route override. Never `Some(vec![])`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Position>>,
    /// Precomputed path string, carried for renderers that cache one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Connection {
    pub fn new(
        id: impl Into<ConnectionId>,
        from_port_id: impl Into<PortId>,
        to_port_id: impl Into<PortId>,
    ) -> Self {
        Self {
            id: id.into(),
            from_port_id: from_port_id.into(),
            to_port_id: to_port_id.into(),
            selected: false,
            waypoints: None,
            path: None,
        }
    }

    pub fn touches(&self, port_id: &str) -> bool {
        self.from_port_id == port_id || self.to_port_id == port_id
    }

    /// Same unordered port pair.
    pub fn links(&self, a: &str, b: &str) -> bool {
        (self.from_port_id == a && self.to_port_id == b)
            || (self.from_port_id == b && self.to_port_id == a)
    }

    pub fn has_waypoints(&self) -> bool {
        self.waypoints.is_some()
    }
}

fn normalize_waypoints(waypoints: Vec<Position>) -> Option<Vec<Position>> {
    if waypoints.is_empty() {
        None
    } else {
        Some(waypoints)
    }
}

/// Connection rules shared by [`ConnectionRegistry::add_connection`] and the
/// dry-run [`ConnectionRegistry::is_valid_connection`].
///
/// Argument order does not matter for either rule: the pair check is
/// unordered, and an output port is checked wherever it appears. Ports missing
/// from `ports` skip the output rule.
pub fn validate_connection<'a>(
    from_port_id: &str,
    to_port_id: &str,
    existing: impl IntoIterator<Item = &'a Connection> + Clone,
    ports: &PortRegistry,
) -> Result<(), ConnectionRejection> {
    if existing
        .clone()
        .into_iter()
        .any(|conn| conn.links(from_port_id, to_port_id))
    {
        return Err(ConnectionRejection::AlreadyConnected);
    }

    for port_id in [from_port_id, to_port_id] {
        if ports.direction_of(port_id) != Some(PortDirection::Output) {
            continue;
        }
        if existing
            .clone()
            .into_iter()
            .any(|conn| conn.from_port_id == port_id)
        {
            return Err(ConnectionRejection::OutputAlreadyConnected {
                port_id: port_id.to_string(),
            });
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: IndexMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Validate, then insert. A rejected connection leaves the registry untouched.
    pub fn add_connection(
        &mut self,
        connection: Connection,
        ports: &PortRegistry,
    ) -> Result<(), ConnectionRejection> {
        if let Err(rejection) = validate_connection(
            &connection.from_port_id,
            &connection.to_port_id,
            self.connections.values(),
            ports,
        ) {
            tracing::warn!(
                from = %connection.from_port_id,
                to = %connection.to_port_id,
                %rejection,
                "connection rejected"
            );
            return Err(rejection);
        }
        tracing::debug!(
            id = %connection.id,
            from = %connection.from_port_id,
            to = %connection.to_port_id,
            "connection added"
        );
        self.connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    /// Reinsert a record verbatim, skipping validation. Used by history replay.
    pub(crate) fn restore_connection(&mut self, connection: Connection) {
        self.connections.insert(connection.id.clone(), connection);
    }

    /// Does not touch port `connected` flags.
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let removed = self.connections.shift_remove(id);
        if removed.is_some() {
            tracing::debug!(id, "connection removed");
        }
        removed
    }

    pub fn remove_connections_by_port(&mut self, port_id: &str) -> Vec<Connection> {
        self.remove_where(|conn| conn.touches(port_id))
    }

    /// `port_ids` decides what goes; `node_id` only labels the log line.
    pub fn remove_connections_by_node(
        &mut self,
        node_id: &str,
        port_ids: &[PortId],
    ) -> Vec<Connection> {
        let port_set: HashSet<&str> = port_ids.iter().map(String::as_str).collect();
        let removed = self.remove_where(|conn| {
            port_set.contains(conn.from_port_id.as_str()) || port_set.contains(conn.to_port_id.as_str())
        });
        tracing::debug!(node = node_id, removed = removed.len(), "cascaded node connections");
        removed
    }

    /// Exclusive unless `multi`. An unknown id still clears the others.
    pub fn select_connection(&mut self, id: &str, multi: bool) {
        if !multi {
            self.clear_connection_selection();
        }
        if let Some(conn) = self.connections.get_mut(id) {
            conn.selected = true;
        }
    }

    pub fn clear_connection_selection(&mut self) {
        for conn in self.connections.values_mut() {
            conn.selected = false;
        }
    }

    /// Full replace. An empty list clears the override.
    pub fn update_connection_waypoints(&mut self, id: &str, waypoints: Vec<Position>) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.waypoints = normalize_waypoints(waypoints);
        }
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn add_connection_waypoint(&mut self, id: &str, waypoint: Position, index: usize) {
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        let mut waypoints = conn.waypoints.take().unwrap_or_default();
        let index = index.min(waypoints.len());
        waypoints.insert(index, waypoint);
        conn.waypoints = Some(waypoints);
    }

    /// Remove at `index`; out-of-range indices change nothing.
    pub fn remove_connection_waypoint(&mut self, id: &str, index: usize) {
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        let Some(mut waypoints) = conn.waypoints.take() else {
            return;
        };
        if index < waypoints.len() {
            waypoints.remove(index);
        }
        conn.waypoints = normalize_waypoints(waypoints);
    }

    pub fn get_connection(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn get_port_connections(&self, port_id: &str) -> Vec<&Connection> {
        self.connections
            .values()
            .filter(|conn| conn.touches(port_id))
            .collect()
    }

    pub fn get_selected_connections(&self) -> Vec<&Connection> {
        self.connections.values().filter(|conn| conn.selected).collect()
    }

    pub fn get_all_connections(&self) -> Vec<&Connection> {
        self.connections.values().collect()
    }

    pub fn is_port_in_use(&self, port_id: &str) -> bool {
        self.connections.values().any(|conn| conn.touches(port_id))
    }

    pub fn is_valid_connection(
        &self,
        from_port_id: &str,
        to_port_id: &str,
        ports: &PortRegistry,
    ) -> Result<(), ConnectionRejection> {
        validate_connection(from_port_id, to_port_id, self.connections.values(), ports)
    }

    /// Connections touching any of `node_ids`' ports, without removing them.
    pub fn connections_for_nodes(&self, ports: &PortRegistry, node_ids: &[NodeId]) -> Vec<&Connection> {
        let port_set: HashSet<&str> = node_ids
            .iter()
            .flat_map(|node| ports.get_node_ports(node))
            .map(|port| port.id.as_str())
            .collect();
        self.connections
            .values()
            .filter(|conn| {
                port_set.contains(conn.from_port_id.as_str()) || port_set.contains(conn.to_port_id.as_str())
            })
            .collect()
    }

    fn remove_where(&mut self, mut pred: impl FnMut(&Connection) -> bool) -> Vec<Connection> {
        let mut removed = Vec::new();
        self.connections.retain(|_, conn| {
            if pred(conn) {
                removed.push(conn.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}
