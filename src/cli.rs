use crate::config::load_config;
use crate::dump::{SessionDump, write_session_dump};
use crate::geometry::{Position, Size};
use crate::model::{GateType, NodeKind, NodePatch};
use crate::routing::{
    PortSide, RoutingOptions, calculate_orthogonal_path, simplify_orthogonal_path, to_flat,
};
use crate::session::DiagramSession;
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

static POINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$").unwrap()
});

#[derive(Parser, Debug)]
#[command(name = "gateflow", version, about = "Orthogonal wire routing for logic-gate diagrams")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Route a single wire between two points and print the flat point list
    Route(RouteArgs),
    /// Build a diagram from a scene file and print its routed connections
    Scene(SceneArgs),
}

#[derive(ClapArgs, Debug)]
pub struct RouteArgs {
    /// Start point as X,Y
    #[arg(long = "from", value_parser = parse_point, allow_hyphen_values = true)]
    pub from: Position,

    /// End point as X,Y
    #[arg(long = "to", value_parser = parse_point, allow_hyphen_values = true)]
    pub to: Position,

    /// Side the start port faces
    #[arg(long = "from-side", value_enum, default_value = "right")]
    pub from_side: SideArg,

    /// Side the end port faces
    #[arg(long = "to-side", value_enum, default_value = "left")]
    pub to_side: SideArg,

    /// Stub length before the first turn
    #[arg(long = "offset", default_value_t = crate::routing::DEFAULT_OFFSET_FROM_PORT)]
    pub offset: f32,

    /// Manual waypoint as X,Y (repeatable, replaces automatic routing)
    #[arg(short = 'w', long = "waypoint", value_parser = parse_point, allow_hyphen_values = true)]
    pub waypoints: Vec<Position>,

    /// Drop redundant collinear points
    #[arg(long = "simplify")]
    pub simplify: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SceneArgs {
    /// Scene file (JSON or JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for PortSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => PortSide::Left,
            SideArg::Right => PortSide::Right,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    match args.command {
        Command::Route(route) => run_route(&route),
        Command::Scene(scene) => run_scene(&scene),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_route(args: &RouteArgs) -> Result<()> {
    let options = RoutingOptions {
        custom_waypoints: args.waypoints.clone(),
        ..RoutingOptions::with_offset(args.offset)
    };
    let mut points = calculate_orthogonal_path(
        args.from,
        args.to,
        args.from_side.into(),
        args.to_side.into(),
        &options,
    );
    if args.simplify {
        points = simplify_orthogonal_path(&points);
    }
    println!("{}", serde_json::to_string(&to_flat(&points))?);
    Ok(())
}

fn run_scene(args: &SceneArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let text = read_input(args.input.as_deref())?;
    let scene = Scene::parse(&text)?;
    let session = scene.build(DiagramSession::new(config))?;

    match args.output.as_deref() {
        Some(path) => write_session_dump(path, &session)?,
        None => {
            let dump = SessionDump::from_session(&session);
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn parse_point(raw: &str) -> std::result::Result<Position, String> {
    let caps = POINT_RE
        .captures(raw)
        .ok_or_else(|| format!("expected X,Y but got '{raw}'"))?;
    let coord = |idx: usize| -> std::result::Result<f32, String> {
        caps[idx]
            .parse::<f32>()
            .map_err(|err| format!("bad coordinate '{}': {err}", &caps[idx]))
    };
    Ok(Position::new(coord(1)?, coord(2)?))
}

// ── Scene input ─────────────────────────────────────────────────────

/// Input-only scene description for building a session from the command line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scene {
    #[serde(default)]
    nodes: Vec<SceneNode>,
    #[serde(default)]
    connections: Vec<SceneConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneNode {
    id: String,
    /// "tag", "junction" or a gate name such as "AND".
    kind: String,
    x: f32,
    y: f32,
    label: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneConnection {
    /// `node.suffix`, e.g. `in1.out` or `g1.in-0`.
    from: String,
    to: String,
    #[serde(default)]
    waypoints: Vec<[f32; 2]>,
}

impl Scene {
    fn parse(text: &str) -> Result<Self> {
        match serde_json::from_str::<Scene>(text) {
            Ok(scene) => Ok(scene),
            Err(json_err) => json5::from_str::<Scene>(text)
                .map_err(|json5_err| anyhow::anyhow!("invalid scene: {json_err}; json5: {json5_err}")),
        }
    }

    fn build(self, mut session: DiagramSession) -> Result<DiagramSession> {
        let mut ids: HashMap<String, String> = HashMap::new();
        for node in &self.nodes {
            let kind = parse_kind(&node.kind)
                .with_context(|| format!("node '{}' has unknown kind '{}'", node.id, node.kind))?;
            let label = node.label.clone().unwrap_or_else(|| node.kind.to_uppercase());
            let session_id = session.add_node(kind, Position::new(node.x, node.y), label);
            if node.width.is_some() || node.height.is_some() {
                let default = kind.default_size(&session.config().nodes);
                let size = Size::new(
                    node.width.unwrap_or(default.width),
                    node.height.unwrap_or(default.height),
                );
                session.update_node(
                    &session_id,
                    NodePatch {
                        size: Some(size),
                        ..NodePatch::default()
                    },
                )?;
            }
            ids.insert(node.id.clone(), session_id);
        }

        for conn in &self.connections {
            let from = resolve_port(&ids, &conn.from)?;
            let to = resolve_port(&ids, &conn.to)?;
            let id = session
                .connect(&from, &to)
                .with_context(|| format!("cannot connect {} -> {}", conn.from, conn.to))?;
            if !conn.waypoints.is_empty() {
                let waypoints = conn.waypoints.iter().map(|&[x, y]| Position::new(x, y)).collect();
                session.set_waypoints(&id, waypoints);
            }
        }
        Ok(session)
    }
}

fn parse_kind(raw: &str) -> Option<NodeKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "tag" => Some(NodeKind::Tag),
        "junction" => Some(NodeKind::Junction),
        other => GateType::from_token(other).map(|gate| NodeKind::Gate { gate }),
    }
}

fn resolve_port(ids: &HashMap<String, String>, raw: &str) -> Result<String> {
    let (node, suffix) = raw
        .split_once('.')
        .with_context(|| format!("port reference '{raw}' must look like node.port"))?;
    let session_id = ids
        .get(node)
        .with_context(|| format!("port reference '{raw}' names unknown node '{node}'"))?;
    Ok(crate::model::port_id(session_id, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_with_spaces_and_signs() {
        assert_eq!(parse_point("10,20").unwrap(), Position::new(10.0, 20.0));
        assert_eq!(parse_point(" -5.5 , 0 ").unwrap(), Position::new(-5.5, 0.0));
        assert!(parse_point("10;20").is_err());
        assert!(parse_point("x,1").is_err());
    }

    #[test]
    fn route_args_parse() {
        let args = Args::try_parse_from([
            "gateflow", "route", "--from", "0,50", "--to", "-60,200", "--from-side", "left",
            "--to-side", "right", "--offset", "40",
        ])
        .unwrap();
        let Command::Route(route) = args.command else {
            panic!("expected route subcommand");
        };
        assert_eq!(route.to, Position::new(-60.0, 200.0));
        assert!(matches!(route.from_side, SideArg::Left));
        assert_eq!(route.offset, 40.0);
        assert!(!route.simplify);
    }

    #[test]
    fn scene_builds_a_wired_session() {
        let text = r#"{
            // json5 is fine too
            nodes: [
                { id: "in1", kind: "tag", x: 0, y: 0 },
                { id: "g1", kind: "and", x: 300, y: 0 },
                { id: "j", kind: "junction", x: 500, y: 100, width: 12, height: 12 },
            ],
            connections: [
                { from: "in1.out", to: "g1.in-0" },
                { from: "g1.out", to: "j.left", waypoints: [[450, 30], [450, 106]] },
            ],
        }"#;
        let scene = Scene::parse(text).unwrap();
        let session = scene.build(DiagramSession::default()).unwrap();
        assert_eq!(session.nodes().len(), 3);
        assert_eq!(session.connections().len(), 2);
        assert_eq!(
            session.absolute_port_position("node-3-left"),
            Some(Position::new(500.0, 106.0))
        );
        let routed = session.routed_connections();
        assert_eq!(routed[1].points.len(), 4);
    }

    #[test]
    fn scene_errors_name_the_problem() {
        let bad_kind = Scene::parse(r#"{"nodes":[{"id":"x","kind":"XOR","x":0,"y":0}]}"#).unwrap();
        let err = bad_kind.build(DiagramSession::default()).unwrap_err();
        assert!(err.to_string().contains("unknown kind"));

        let bad_port = Scene::parse(r#"{"connections":[{"from":"a.out","to":"b.in"}]}"#).unwrap();
        assert!(bad_port.build(DiagramSession::default()).is_err());
    }
}
