use serde::Serialize;

use crate::config::Config;
use crate::drawing::{ConnectionDrawing, DrawOutcome};
use crate::editing::{EditRequest, EditingCoordinator};
use crate::error::{ConnectionRejection, ModelError};
use crate::geometry::{BoundingBox, Position, distance_to_segment};
use crate::history::{CommandHistory, EditCommand};
use crate::model::{
    Connection, ConnectionId, ConnectionRegistry, Diagram, Node, NodeId, NodeKind, NodePatch,
    NodeRegistry, PortDirection, PortId, PortRegistry, build_ports,
};
use crate::routing::{RoutingOptions, calculate_orthogonal_path};
use crate::viewport::Viewport;

/// A connection with its endpoints resolved and its route computed, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedConnection {
    pub id: ConnectionId,
    pub from_port_id: PortId,
    pub to_port_id: PortId,
    pub selected: bool,
    pub points: Vec<Position>,
}

/// Where to draw a port anchor and whether to show it as wired.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAnchor {
    pub port_id: PortId,
    pub node_id: NodeId,
    pub direction: PortDirection,
    pub position: Position,
    pub connected: bool,
}

/// One open diagram: the registries plus every interaction that edits them.
#[derive(Debug, Clone)]
pub struct DiagramSession {
    config: Config,
    diagram: Diagram,
    drawing: ConnectionDrawing,
    history: CommandHistory,
    editing: EditingCoordinator,
    viewport: Viewport,
    next_node: u64,
    next_connection: u64,
}

impl Default for DiagramSession {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl DiagramSession {
    pub fn new(config: Config) -> Self {
        Self {
            history: CommandHistory::new(config.history.max_entries),
            viewport: Viewport::new(config.grid.clone()),
            config,
            diagram: Diagram::new(),
            drawing: ConnectionDrawing::new(),
            editing: EditingCoordinator::new(),
            next_node: 0,
            next_connection: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.diagram.nodes
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.diagram.ports
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.diagram.connections
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn drawing(&self) -> &ConnectionDrawing {
        &self.drawing
    }

    pub fn editing(&self) -> &EditingCoordinator {
        &self.editing
    }

    // ── Nodes ───────────────────────────────────────────────────────

    /// Add a node at its configured default size. Its ports go in as one batch.
    pub fn add_node(&mut self, kind: NodeKind, position: Position, label: impl Into<String>) -> NodeId {
        let id = self.mint_node_id();
        let node = Node::new(
            id.clone(),
            kind,
            position,
            kind.default_size(&self.config.nodes),
            label,
        );
        let ports = build_ports(&node);
        tracing::debug!(node = %id, ports = ports.len(), "node added");
        self.history
            .execute(EditCommand::AddNode { node, ports }, &mut self.diagram);
        id
    }

    /// Merge-patch a node. A size change re-lays its ports in one batch.
    /// Returns whether anything changed; unknown ids change nothing.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<bool, ModelError> {
        let Some(before) = self.diagram.nodes.get_node(id).cloned() else {
            return Ok(false);
        };
        let mut probe = NodeRegistry::new();
        probe.add_node(before.clone());
        probe.update_node(id, patch)?;
        let Some(after) = probe.get_node(id).cloned() else {
            return Ok(false);
        };
        if after == before {
            return Ok(false);
        }
        self.history
            .execute(EditCommand::UpdateNode { before, after }, &mut self.diagram);
        Ok(true)
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<bool, ModelError> {
        if !position.is_finite() {
            return Err(ModelError::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }
        let Some(from) = self.diagram.nodes.get_node(id).map(|node| node.position) else {
            return Ok(false);
        };
        if from == position {
            return Ok(false);
        }
        self.history.execute(
            EditCommand::MoveNode {
                id: id.to_string(),
                from,
                to: position,
            },
            &mut self.diagram,
        );
        Ok(true)
    }

    pub fn select_node(&mut self, id: &str, multi: bool) {
        if !multi {
            self.diagram.connections.clear_connection_selection();
        }
        self.diagram.nodes.select_node(id, multi);
    }

    pub fn select_connection(&mut self, id: &str, multi: bool) {
        if !multi {
            self.diagram.nodes.clear_node_selection();
        }
        self.diagram.connections.select_connection(id, multi);
    }

    pub fn clear_selection(&mut self) {
        self.diagram.nodes.clear_node_selection();
        self.diagram.connections.clear_connection_selection();
    }

    pub fn bring_to_front(&mut self, id: &str) {
        self.diagram.nodes.bring_to_front(id);
    }

    // ── Deletion ────────────────────────────────────────────────────

    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some(removed) = self.diagram.remove_node_cascade(id) else {
            return false;
        };
        self.history.record(EditCommand::RemoveNode(removed));
        true
    }

    pub fn delete_connection(&mut self, id: &str) -> bool {
        let Some(removed) = self.diagram.remove_connection(id) else {
            return false;
        };
        self.history.record(EditCommand::RemoveConnection(removed));
        true
    }

    /// Delete selected connections, then selected nodes with everything wired
    /// to them. Returns how many records were deleted directly.
    pub fn delete_selection(&mut self) -> usize {
        let connection_ids: Vec<ConnectionId> = self
            .diagram
            .connections
            .get_selected_connections()
            .into_iter()
            .map(|conn| conn.id.clone())
            .collect();
        let node_ids: Vec<NodeId> = self
            .diagram
            .nodes
            .selected_nodes()
            .into_iter()
            .map(|node| node.id.clone())
            .collect();

        let mut deleted = 0;
        for id in &connection_ids {
            deleted += usize::from(self.delete_connection(id));
        }
        for id in &node_ids {
            deleted += usize::from(self.delete_node(id));
        }
        tracing::debug!(deleted, "deleted selection");
        deleted
    }

    // ── Connections ─────────────────────────────────────────────────

    /// Press on a port anchor. Returns `false` for unknown ports or while
    /// another drag is in progress.
    pub fn begin_connection(&mut self, port_id: &str) -> bool {
        let Some(anchor) = self.diagram.absolute_port_position(port_id) else {
            return false;
        };
        self.drawing.begin(port_id, anchor)
    }

    pub fn update_cursor(&mut self, position: Position) {
        self.drawing.update_cursor(position);
    }

    /// Dry run for hover hints while dragging.
    pub fn check_connection_target(&self, port_id: &str) -> Option<ConnectionRejection> {
        self.drawing
            .check_target(port_id, &self.diagram.ports, &self.diagram.connections)
    }

    /// Release the drag over `target`, or over empty canvas when `None`.
    pub fn finish_connection(&mut self, target: Option<&str>) -> DrawOutcome {
        let next = self.peek_connection_id();
        let outcome = self.drawing.finish(
            target,
            &mut self.diagram.ports,
            &mut self.diagram.connections,
            || next,
        );
        if let DrawOutcome::Connected(connection) = &outcome {
            self.next_connection += 1;
            self.history.record(EditCommand::AddConnection(connection.clone()));
        }
        outcome
    }

    pub fn cancel_connection(&mut self) {
        self.drawing.cancel();
    }

    /// Connect two ports directly, under the same rules as a drag.
    pub fn connect(&mut self, a: &str, b: &str) -> Result<ConnectionId, ConnectionRejection> {
        let mut drawing = ConnectionDrawing::new();
        drawing.begin(a, Position::default());
        let next = self.peek_connection_id();
        match drawing.finish(
            Some(b),
            &mut self.diagram.ports,
            &mut self.diagram.connections,
            || next,
        ) {
            DrawOutcome::Connected(connection) => {
                self.next_connection += 1;
                let id = connection.id.clone();
                self.history.record(EditCommand::AddConnection(connection));
                Ok(id)
            }
            DrawOutcome::Rejected(rejection) => Err(rejection),
            DrawOutcome::Inactive | DrawOutcome::Cancelled => {
                Err(ConnectionRejection::MissingPort {
                    port_id: if self.diagram.ports.get_port(a).is_none() {
                        a.to_string()
                    } else {
                        b.to_string()
                    },
                })
            }
        }
    }

    // ── Waypoints ───────────────────────────────────────────────────

    /// Replace the waypoint list. An empty list restores automatic routing.
    pub fn set_waypoints(&mut self, connection_id: &str, waypoints: Vec<Position>) -> bool {
        self.edit_waypoints(connection_id, |connections| {
            connections.update_connection_waypoints(connection_id, waypoints)
        })
    }

    pub fn add_waypoint(&mut self, connection_id: &str, waypoint: Position, index: usize) -> bool {
        self.edit_waypoints(connection_id, |connections| {
            connections.add_connection_waypoint(connection_id, waypoint, index)
        })
    }

    pub fn remove_waypoint(&mut self, connection_id: &str, index: usize) -> bool {
        self.edit_waypoints(connection_id, |connections| {
            connections.remove_connection_waypoint(connection_id, index)
        })
    }

    /// Add a waypoint at `point`, after the segment of the drawn route nearest
    /// to it. A connection on automatic routing first adopts that route's
    /// corners as its waypoints, so its shape is kept. Returns the new index.
    pub fn insert_waypoint_at(&mut self, connection_id: &str, point: Position) -> Option<usize> {
        let connection = self.diagram.connections.get_connection(connection_id)?;
        let path = self.route_connection(connection)?;
        if path.len() < 2 {
            return None;
        }
        let segment = path
            .windows(2)
            .enumerate()
            .map(|(idx, seg)| (idx, distance_to_segment(point, seg[0], seg[1])))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(idx, _)| idx)?;

        let mut waypoints = path[1..path.len() - 1].to_vec();
        let index = segment.min(waypoints.len());
        waypoints.insert(index, point);
        self.set_waypoints(connection_id, waypoints).then_some(index)
    }

    fn edit_waypoints(
        &mut self,
        connection_id: &str,
        edit: impl FnOnce(&mut ConnectionRegistry),
    ) -> bool {
        let Some(before) = self
            .diagram
            .connections
            .get_connection(connection_id)
            .map(|conn| conn.waypoints.clone())
        else {
            return false;
        };
        edit(&mut self.diagram.connections);
        let after = self
            .diagram
            .connections
            .get_connection(connection_id)
            .and_then(|conn| conn.waypoints.clone());
        if after == before {
            return false;
        }
        self.history.record(EditCommand::SetWaypoints {
            id: connection_id.to_string(),
            before,
            after,
        });
        true
    }

    // ── Rendering queries ───────────────────────────────────────────

    pub fn absolute_port_position(&self, port_id: &str) -> Option<Position> {
        self.diagram.absolute_port_position(port_id)
    }

    /// Route for one connection, or `None` if an endpoint is gone.
    pub fn route_connection(&self, connection: &Connection) -> Option<Vec<Position>> {
        let from_port = self.diagram.ports.get_port(&connection.from_port_id)?;
        let to_port = self.diagram.ports.get_port(&connection.to_port_id)?;
        let from = self.diagram.absolute_port_position(&from_port.id)?;
        let to = self.diagram.absolute_port_position(&to_port.id)?;

        let routing = &self.config.routing;
        let obstacles = if routing.avoid_nodes {
            self.node_obstacles(&[&from_port.node_id, &to_port.node_id])
        } else {
            Vec::new()
        };
        let options = RoutingOptions {
            offset_from_port: routing.offset_from_port,
            custom_waypoints: connection.waypoints.clone().unwrap_or_default(),
            obstacles,
            obstacle_padding: routing.obstacle_padding,
        };
        Some(calculate_orthogonal_path(
            from,
            to,
            from_port.direction.source_side(),
            to_port.direction.target_side(),
            &options,
        ))
    }

    /// Every drawable connection with its route. Dangling records are skipped.
    pub fn routed_connections(&self) -> Vec<RoutedConnection> {
        self.diagram
            .connections
            .get_all_connections()
            .into_iter()
            .filter_map(|conn| {
                let points = self.route_connection(conn)?;
                Some(RoutedConnection {
                    id: conn.id.clone(),
                    from_port_id: conn.from_port_id.clone(),
                    to_port_id: conn.to_port_id.clone(),
                    selected: conn.selected,
                    points,
                })
            })
            .collect()
    }

    pub fn port_anchors(&self) -> Vec<PortAnchor> {
        self.diagram
            .ports
            .all_ports()
            .filter_map(|port| {
                Some(PortAnchor {
                    port_id: port.id.clone(),
                    node_id: port.node_id.clone(),
                    direction: port.direction,
                    position: self.diagram.absolute_port_position(&port.id)?,
                    connected: port.connected,
                })
            })
            .collect()
    }

    /// Closest port anchor within `radius` of `point`.
    pub fn port_at(&self, point: Position, radius: f32) -> Option<PortId> {
        self.port_anchors()
            .into_iter()
            .map(|anchor| (point.distance_to(anchor.position), anchor.port_id))
            .filter(|(dist, _)| *dist <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    fn node_obstacles(&self, exclude: &[&NodeId]) -> Vec<BoundingBox> {
        self.diagram
            .nodes
            .all_nodes()
            .into_iter()
            .filter(|node| !exclude.contains(&&node.id))
            .map(Node::bounding_box)
            .collect()
    }

    // ── Inline editing ──────────────────────────────────────────────

    /// Queue an edit for a LABEL or PDTIMER gate. Other nodes return `false`.
    pub fn request_edit(&mut self, node_id: &str) -> bool {
        let Some(request) = self.diagram.nodes.get_node(node_id).and_then(EditRequest::for_node) else {
            return false;
        };
        self.editing.send(request);
        true
    }

    pub fn begin_edit(&mut self) -> Option<EditRequest> {
        self.editing.begin_next().cloned()
    }

    pub fn commit_edit(&mut self, value: &str) -> bool {
        self.editing.commit(value, &mut self.diagram, &mut self.history)
    }

    pub fn cancel_edit(&mut self) {
        self.editing.cancel();
    }

    // ── History ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.drawing.cancel();
        self.history.undo(&mut self.diagram)
    }

    pub fn redo(&mut self) -> bool {
        self.drawing.cancel();
        self.history.redo(&mut self.diagram)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ── Ids ─────────────────────────────────────────────────────────

    fn mint_node_id(&mut self) -> NodeId {
        loop {
            self.next_node += 1;
            let id = format!("node-{}", self.next_node);
            if self.diagram.nodes.get_node(&id).is_none() {
                return id;
            }
        }
    }

    /// Next free connection id. The counter only advances once it is used.
    fn peek_connection_id(&mut self) -> ConnectionId {
        loop {
            let id = format!("conn-{}", self.next_connection + 1);
            if self.diagram.connections.get_connection(&id).is_none() {
                return id;
            }
            self.next_connection += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GateType;

    fn and_gate() -> NodeKind {
        NodeKind::Gate { gate: GateType::And }
    }

    fn wired_pair() -> (DiagramSession, NodeId, NodeId, ConnectionId) {
        let mut session = DiagramSession::default();
        let a = session.add_node(NodeKind::Tag, Position::new(0.0, 0.0), "IN1");
        let b = session.add_node(and_gate(), Position::new(300.0, 0.0), "AND");
        let conn = session
            .connect(&format!("{a}-out"), &format!("{b}-in-0"))
            .unwrap();
        (session, a, b, conn)
    }

    #[test]
    fn ids_count_up() {
        let (mut session, a, b, conn) = wired_pair();
        assert_eq!((a.as_str(), b.as_str(), conn.as_str()), ("node-1", "node-2", "conn-1"));
        let c = session.add_node(NodeKind::Junction, Position::new(0.0, 200.0), "");
        assert_eq!(c, "node-3");
        assert_eq!(session.ports().get_node_ports(&c).len(), 4);
    }

    #[test]
    fn refused_connect_does_not_burn_an_id() {
        let (mut session, a, b, _) = wired_pair();
        assert!(session.connect(&format!("{a}-out"), &format!("{b}-in-1")).is_err());
        let c = session.add_node(and_gate(), Position::new(600.0, 0.0), "AND");
        let conn = session.connect(&format!("{b}-out"), &format!("{c}-in-0")).unwrap();
        assert_eq!(conn, "conn-2");
    }

    #[test]
    fn routed_connection_uses_configured_offset() {
        let (session, _, _, conn) = wired_pair();
        let routed = session.routed_connections();
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].id, conn);
        // Tag out at (100, 25), AND in-0 at (300, 20); enough room for a mid-x jog.
        assert_eq!(
            routed[0].points,
            vec![
                Position::new(100.0, 25.0),
                Position::new(200.0, 25.0),
                Position::new(200.0, 20.0),
                Position::new(300.0, 20.0),
            ]
        );
    }

    #[test]
    fn delete_selection_cascades_and_clears_flags() {
        let (mut session, a, b, _) = wired_pair();
        session.select_node(&b, false);
        assert_eq!(session.delete_selection(), 1);
        assert!(session.connections().is_empty());
        assert!(!session.ports().get_port(&format!("{a}-out")).unwrap().connected);
        assert!(session.undo());
        assert_eq!(session.connections().len(), 1);
        assert!(session.ports().get_port(&format!("{a}-out")).unwrap().connected);
    }

    #[test]
    fn deleting_a_selected_wire_keeps_nodes() {
        let (mut session, _, _, conn) = wired_pair();
        session.select_connection(&conn, false);
        assert_eq!(session.delete_selection(), 1);
        assert_eq!(session.nodes().len(), 2);
        assert!(session.connections().is_empty());
    }

    #[test]
    fn insert_waypoint_adopts_automatic_corners() {
        let (mut session, _, _, conn) = wired_pair();
        let index = session.insert_waypoint_at(&conn, Position::new(250.0, 22.0)).unwrap();
        assert_eq!(index, 2);
        let waypoints = session
            .connections()
            .get_connection(&conn)
            .unwrap()
            .waypoints
            .clone()
            .unwrap();
        assert_eq!(
            waypoints,
            vec![
                Position::new(200.0, 25.0),
                Position::new(200.0, 20.0),
                Position::new(250.0, 22.0),
            ]
        );
        assert!(session.undo());
        assert!(!session.connections().get_connection(&conn).unwrap().has_waypoints());
    }

    #[test]
    fn resize_relays_ports_and_undoes() {
        let (mut session, _, b, _) = wired_pair();
        let changed = session
            .update_node(
                &b,
                NodePatch {
                    size: Some(crate::geometry::Size::new(80.0, 90.0)),
                    ..NodePatch::default()
                },
            )
            .unwrap();
        assert!(changed);
        assert_eq!(
            session.ports().get_port(&format!("{b}-in-1")).unwrap().position,
            Position::new(0.0, 60.0)
        );
        session.undo();
        assert_eq!(
            session.ports().get_port(&format!("{b}-in-1")).unwrap().position,
            Position::new(0.0, 40.0)
        );
    }

    #[test]
    fn invalid_patch_is_an_error_and_records_nothing() {
        let (mut session, a, _, _) = wired_pair();
        session.clear_history();
        let err = session.update_node(
            &a,
            NodePatch {
                size: Some(crate::geometry::Size::new(-1.0, 10.0)),
                ..NodePatch::default()
            },
        );
        assert!(err.is_err());
        assert!(!session.can_undo());
        assert!(session.move_node(&a, Position::new(f32::NAN, 0.0)).is_err());
    }

    #[test]
    fn avoid_nodes_keeps_route_shape() {
        let mut config = Config::default();
        config.routing.avoid_nodes = true;
        let mut session = DiagramSession::new(config);
        let a = session.add_node(NodeKind::Tag, Position::new(0.0, 0.0), "A");
        session.add_node(NodeKind::Tag, Position::new(150.0, 0.0), "blocker");
        let c = session.add_node(NodeKind::Tag, Position::new(400.0, 0.0), "C");
        session.connect(&format!("{a}-out"), &format!("{c}-in")).unwrap();
        let routed = session.routed_connections();
        assert_eq!(routed[0].points.first(), Some(&Position::new(100.0, 25.0)));
        assert_eq!(routed[0].points.last(), Some(&Position::new(400.0, 25.0)));
    }

    #[test]
    fn port_hit_test_picks_nearest() {
        let (session, a, _, _) = wired_pair();
        assert_eq!(
            session.port_at(Position::new(103.0, 24.0), 8.0),
            Some(format!("{a}-out"))
        );
        assert_eq!(session.port_at(Position::new(150.0, 150.0), 8.0), None);
    }
}
