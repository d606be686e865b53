use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::geometry::Size;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    /// Stub length the editor's connector uses before the first turn.
    pub offset_from_port: f32,
    pub obstacle_padding: f32,
    /// Pass other nodes' boxes to the router as obstacles.
    pub avoid_nodes: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            offset_from_port: 40.0,
            obstacle_padding: 10.0,
            avoid_nodes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    pub tag: Size,
    pub gate: Size,
    pub junction: Size,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tag: Size::new(100.0, 50.0),
            gate: Size::new(80.0, 60.0),
            junction: Size::new(8.0, 8.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub size: f32,
    pub snap: bool,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            snap: true,
            min_scale: 0.1,
            max_scale: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub routing: RoutingConfig,
    pub nodes: NodeConfig,
    pub history: HistoryConfig,
    pub grid: GridConfig,
}

impl Config {
    /// Parse config text. Strict JSON first, then JSON5 for hand-written files
    /// with comments or trailing commas.
    pub fn from_str_lenient(contents: &str) -> Result<Self, String> {
        match serde_json::from_str::<Config>(contents) {
            Ok(config) => Ok(config),
            Err(json_err) => json5::from_str::<Config>(contents)
                .map_err(|json5_err| format!("{json_err}; json5: {json5_err}")),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_str_lenient(&contents).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = Config::from_str_lenient(r#"{"routing": {"offsetFromPort": 30}}"#).unwrap();
        assert_eq!(config.routing.offset_from_port, 30.0);
        assert_eq!(config.routing.obstacle_padding, 10.0);
        assert_eq!(config.history.max_entries, 100);
        assert_eq!(config.nodes.gate, Size::new(80.0, 60.0));
    }

    #[test]
    fn json5_fallback_accepts_comments() {
        let text = "{\n  // tighter grid\n  grid: { size: 5, snap: false, },\n}";
        let config = Config::from_str_lenient(text).unwrap();
        assert_eq!(config.grid.size, 5.0);
        assert!(!config.grid.snap);
        assert_eq!(config.grid.max_scale, 5.0);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(Config::from_str_lenient("not a config").is_err());
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.routing.avoid_nodes);
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
