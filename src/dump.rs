use crate::routing::{find_path_obstacles, path_bend_count, path_length, to_flat};
use crate::session::DiagramSession;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct SessionDump {
    pub nodes: Vec<NodeDump>,
    pub ports: Vec<PortDump>,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct PortDump {
    pub id: String,
    pub node: String,
    pub direction: String,
    pub x: f32,
    pub y: f32,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub custom_waypoints: bool,
    pub points: Vec<f32>,
    pub bends: usize,
    pub length: f32,
    /// Nodes other than the two endpoints' owners that the route crosses.
    pub crosses: Vec<String>,
}

impl SessionDump {
    pub fn from_session(session: &DiagramSession) -> Self {
        let all_nodes = session.nodes().all_nodes();

        let nodes = all_nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: match node.kind.gate_type() {
                    Some(gate) => gate.as_str().to_string(),
                    None => format!("{:?}", node.kind).to_lowercase(),
                },
                label: node.custom_label.clone().unwrap_or_else(|| node.label.clone()),
                x: node.position.x,
                y: node.position.y,
                width: node.size.width,
                height: node.size.height,
                selected: node.selected,
            })
            .collect();

        let ports = session
            .port_anchors()
            .into_iter()
            .map(|anchor| PortDump {
                id: anchor.port_id,
                node: anchor.node_id,
                direction: format!("{:?}", anchor.direction).to_lowercase(),
                x: anchor.position.x,
                y: anchor.position.y,
                connected: anchor.connected,
            })
            .collect();

        let mut connections = Vec::new();
        for routed in session.routed_connections() {
            let owners: Vec<&str> = [&routed.from_port_id, &routed.to_port_id]
                .into_iter()
                .filter_map(|port| session.ports().get_port(port))
                .map(|port| port.node_id.as_str())
                .collect();
            let others: Vec<_> = all_nodes
                .iter()
                .filter(|node| !owners.contains(&node.id.as_str()))
                .collect();
            let boxes: Vec<_> = others.iter().map(|node| node.bounding_box()).collect();
            let crosses = find_path_obstacles(&routed.points, &boxes)
                .into_iter()
                .map(|idx| others[idx].id.clone())
                .collect();
            let custom_waypoints = session
                .connections()
                .get_connection(&routed.id)
                .is_some_and(|conn| conn.has_waypoints());

            connections.push(ConnectionDump {
                bends: path_bend_count(&routed.points),
                length: path_length(&routed.points),
                points: to_flat(&routed.points),
                id: routed.id,
                from: routed.from_port_id,
                to: routed.to_port_id,
                custom_waypoints,
                crosses,
            });
        }

        SessionDump {
            nodes,
            ports,
            connections,
        }
    }
}

pub fn write_session_dump(path: &Path, session: &DiagramSession) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = SessionDump::from_session(session);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
