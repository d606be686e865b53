//! Press-drag-release interaction that turns two port anchors into a connection.

use crate::error::ConnectionRejection;
use crate::geometry::Position;
use crate::model::{Connection, ConnectionId, ConnectionRegistry, Port, PortDirection, PortId, PortRegistry};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawingState {
    #[default]
    Idle,
    Drawing {
        from_port_id: PortId,
        cursor: Position,
    },
}

/// How a release ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// Nothing was being drawn.
    Inactive,
    /// Released over empty canvas, or an endpoint vanished mid-drag.
    Cancelled,
    Connected(Connection),
    Rejected(ConnectionRejection),
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionDrawing {
    state: DrawingState,
}

impl ConnectionDrawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawingState::Drawing { .. })
    }

    /// Pin `port_id` and start tracking the cursor at its anchor. Ignored while
    /// another drag is active.
    pub fn begin(&mut self, port_id: impl Into<PortId>, anchor: Position) -> bool {
        if self.is_drawing() {
            return false;
        }
        self.state = DrawingState::Drawing {
            from_port_id: port_id.into(),
            cursor: anchor,
        };
        true
    }

    pub fn update_cursor(&mut self, position: Position) {
        if let DrawingState::Drawing { cursor, .. } = &mut self.state {
            *cursor = position;
        }
    }

    /// Pinned port and live cursor, for the rubber-band preview.
    pub fn preview(&self) -> Option<(&str, Position)> {
        match &self.state {
            DrawingState::Drawing {
                from_port_id,
                cursor,
            } => Some((from_port_id.as_str(), *cursor)),
            DrawingState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DrawingState::Idle;
    }

    /// Dry run of a release over `target`: the reason it would be refused, if any.
    pub fn check_target(
        &self,
        target: &str,
        ports: &PortRegistry,
        connections: &ConnectionRegistry,
    ) -> Option<ConnectionRejection> {
        let (from_id, _) = self.preview()?;
        let (source, sink) = (ports.get_port(from_id)?, ports.get_port(target)?);
        let (output, input) = match normalize(source, sink) {
            Ok(pair) => pair,
            Err(rejection) => return Some(rejection),
        };
        connections.is_valid_connection(output, input, ports).err()
    }

    /// Release the drag over `target` (or over empty canvas when `None`).
    ///
    /// `next_id` is called only once the connection is known to be valid. On
    /// success both endpoints are marked connected; on any other outcome the
    /// registries are left as they were.
    pub fn finish(
        &mut self,
        target: Option<&str>,
        ports: &mut PortRegistry,
        connections: &mut ConnectionRegistry,
        next_id: impl FnOnce() -> ConnectionId,
    ) -> DrawOutcome {
        let DrawingState::Drawing { from_port_id, .. } = std::mem::take(&mut self.state) else {
            return DrawOutcome::Inactive;
        };
        let Some(target) = target else {
            return DrawOutcome::Cancelled;
        };
        let (Some(source), Some(sink)) = (ports.get_port(&from_port_id), ports.get_port(target)) else {
            tracing::debug!(from = %from_port_id, to = target, "drag endpoint no longer exists");
            return DrawOutcome::Cancelled;
        };

        let (output, input) = match normalize(source, sink) {
            Ok((output, input)) => (output.to_string(), input.to_string()),
            Err(rejection) => {
                tracing::warn!(from = %from_port_id, to = target, %rejection, "connection refused");
                return DrawOutcome::Rejected(rejection);
            }
        };
        if let Err(rejection) = connections.is_valid_connection(&output, &input, ports) {
            tracing::warn!(from = %output, to = %input, %rejection, "connection refused");
            return DrawOutcome::Rejected(rejection);
        }

        let connection = Connection::new(next_id(), output, input);
        if let Err(rejection) = connections.add_connection(connection.clone(), ports) {
            return DrawOutcome::Rejected(rejection);
        }
        ports.set_port_connected(&connection.from_port_id, true);
        ports.set_port_connected(&connection.to_port_id, true);
        DrawOutcome::Connected(connection)
    }
}

/// Same-node and same-direction checks, then order the pair output-first.
fn normalize<'a>(a: &'a Port, b: &'a Port) -> Result<(&'a str, &'a str), ConnectionRejection> {
    if a.node_id == b.node_id {
        return Err(ConnectionRejection::SameNode);
    }
    if a.direction == b.direction {
        return Err(ConnectionRejection::SameDirection);
    }
    Ok(match a.direction {
        PortDirection::Output => (a.id.as_str(), b.id.as_str()),
        PortDirection::Input => (b.id.as_str(), a.id.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries() -> (PortRegistry, ConnectionRegistry) {
        let mut ports = PortRegistry::new();
        for node in ["a", "b", "c"] {
            ports.add_ports([
                Port::new(format!("{node}-in-0"), node, PortDirection::Input, Position::new(0.0, 20.0)),
                Port::new(format!("{node}-in-1"), node, PortDirection::Input, Position::new(0.0, 40.0)),
                Port::new(format!("{node}-out"), node, PortDirection::Output, Position::new(80.0, 30.0)),
            ]);
        }
        (ports, ConnectionRegistry::new())
    }

    fn drag(
        drawing: &mut ConnectionDrawing,
        from: &str,
        to: &str,
        ports: &mut PortRegistry,
        connections: &mut ConnectionRegistry,
    ) -> DrawOutcome {
        drawing.begin(from, Position::default());
        let id = format!("conn-{}", connections.len() + 1);
        drawing.finish(Some(to), ports, connections, || id)
    }

    #[test]
    fn drag_from_input_is_normalized_output_first() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        let outcome = drag(&mut drawing, "b-in-0", "a-out", &mut ports, &mut connections);
        let DrawOutcome::Connected(conn) = outcome else {
            panic!("expected a connection, got {outcome:?}");
        };
        assert_eq!(conn.from_port_id, "a-out");
        assert_eq!(conn.to_port_id, "b-in-0");
        assert!(ports.get_port("a-out").unwrap().connected);
        assert!(ports.get_port("b-in-0").unwrap().connected);
        assert!(!drawing.is_drawing());
    }

    #[test]
    fn same_node_and_same_direction_are_refused_first() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        assert_eq!(
            drag(&mut drawing, "a-out", "a-in-0", &mut ports, &mut connections),
            DrawOutcome::Rejected(ConnectionRejection::SameNode)
        );
        assert_eq!(
            drag(&mut drawing, "a-in-0", "b-in-1", &mut ports, &mut connections),
            DrawOutcome::Rejected(ConnectionRejection::SameDirection)
        );
        assert!(connections.is_empty());
        assert!(!ports.get_port("a-in-0").unwrap().connected);
    }

    #[test]
    fn second_wire_from_an_output_is_rejected() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        drag(&mut drawing, "a-out", "b-in-0", &mut ports, &mut connections);
        let outcome = drag(&mut drawing, "c-in-0", "a-out", &mut ports, &mut connections);
        assert!(matches!(
            outcome,
            DrawOutcome::Rejected(ConnectionRejection::OutputAlreadyConnected { .. })
        ));
        assert_eq!(connections.len(), 1);
        assert!(!ports.get_port("c-in-0").unwrap().connected);
    }

    #[test]
    fn id_is_not_minted_for_refused_drags() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        drawing.begin("a-out", Position::default());
        let mut minted = false;
        let outcome = drawing.finish(Some("a-in-1"), &mut ports, &mut connections, || {
            minted = true;
            "conn-x".to_string()
        });
        assert!(matches!(outcome, DrawOutcome::Rejected(_)));
        assert!(!minted);
    }

    #[test]
    fn release_over_canvas_cancels() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        drawing.begin("a-out", Position::new(80.0, 30.0));
        drawing.update_cursor(Position::new(150.0, 90.0));
        assert_eq!(drawing.preview(), Some(("a-out", Position::new(150.0, 90.0))));
        let outcome = drawing.finish(None, &mut ports, &mut connections, || "conn-1".to_string());
        assert_eq!(outcome, DrawOutcome::Cancelled);
        assert_eq!(drawing.state(), &DrawingState::Idle);
        assert!(connections.is_empty());
    }

    #[test]
    fn second_begin_is_ignored_while_drawing() {
        let mut drawing = ConnectionDrawing::new();
        assert!(drawing.begin("a-out", Position::default()));
        assert!(!drawing.begin("b-out", Position::default()));
        assert_eq!(drawing.preview().map(|(id, _)| id), Some("a-out"));
        drawing.cancel();
        assert!(drawing.preview().is_none());
    }

    #[test]
    fn check_target_previews_rejections() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        drag(&mut drawing, "a-out", "b-in-0", &mut ports, &mut connections);
        drawing.begin("b-in-0", Position::default());
        assert_eq!(
            drawing.check_target("a-out", &ports, &connections),
            Some(ConnectionRejection::AlreadyConnected)
        );
        assert_eq!(drawing.check_target("c-out", &ports, &connections), None);
    }

    #[test]
    fn finish_without_begin_is_inactive() {
        let (mut ports, mut connections) = registries();
        let mut drawing = ConnectionDrawing::new();
        let outcome = drawing.finish(Some("a-out"), &mut ports, &mut connections, || "x".to_string());
        assert_eq!(outcome, DrawOutcome::Inactive);
    }
}
