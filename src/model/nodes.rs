use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::NodeId;
use super::ports::{Port, PortDirection};
use crate::config::NodeConfig;
use crate::error::ModelError;
use crate::geometry::{BoundingBox, Position, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateType {
    And,
    Or,
    Not,
    Nand,
    Nor,
    Comparator,
    Rising,
    Falling,
    #[serde(rename = "PDTIMER")]
    PdTimer,
    Label,
    Switch,
}

impl GateType {
    pub const ALL: [GateType; 11] = [
        GateType::And,
        GateType::Or,
        GateType::Not,
        GateType::Nand,
        GateType::Nor,
        GateType::Comparator,
        GateType::Rising,
        GateType::Falling,
        GateType::PdTimer,
        GateType::Label,
        GateType::Switch,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|gate| gate.as_str().eq_ignore_ascii_case(token.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Comparator => "COMPARATOR",
            Self::Rising => "RISING",
            Self::Falling => "FALLING",
            Self::PdTimer => "PDTIMER",
            Self::Label => "LABEL",
            Self::Switch => "SWITCH",
        }
    }

    pub fn input_count(self) -> usize {
        match self {
            Self::Not => 1,
            _ => 2,
        }
    }

    /// Pointed left edge; input anchors sit slightly outside it.
    fn has_pointed_inlet(self) -> bool {
        matches!(self, Self::Not | Self::Comparator | Self::Rising | Self::Falling)
    }

    /// Inverting gates draw a bubble past the right edge.
    fn has_output_bubble(self) -> bool {
        matches!(self, Self::Not | Self::Nand | Self::Nor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Tag,
    Gate { gate: GateType },
    Junction,
}

impl NodeKind {
    pub fn default_size(self, config: &NodeConfig) -> Size {
        match self {
            Self::Tag => config.tag,
            Self::Gate { .. } => config.gate,
            Self::Junction => config.junction,
        }
    }

    pub fn gate_type(self) -> Option<GateType> {
        match self {
            Self::Gate { gate } => Some(gate),
            _ => None,
        }
    }
}

/// One entry of a node's port layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSlot {
    pub suffix: String,
    pub direction: PortDirection,
    pub position: Position,
}

impl PortSlot {
    fn new(suffix: impl Into<String>, direction: PortDirection, x: f32, y: f32) -> Self {
        Self {
            suffix: suffix.into(),
            direction,
            position: Position::new(x, y),
        }
    }
}

pub fn port_id(node_id: &str, suffix: &str) -> String {
    format!("{node_id}-{suffix}")
}

/// Port count and relative offsets for a node of `kind` at `size`.
pub fn port_layout(kind: NodeKind, size: Size) -> Vec<PortSlot> {
    let (w, h) = (size.width, size.height);
    match kind {
        NodeKind::Tag => vec![
            PortSlot::new("in", PortDirection::Input, 0.0, h / 2.0),
            PortSlot::new("out", PortDirection::Output, w, h / 2.0),
        ],
        NodeKind::Gate { gate } => {
            let inputs = gate.input_count();
            let inset = if gate.has_pointed_inlet() {
                (h * 0.1).max(4.0)
            } else {
                0.0
            };
            let bubble = if gate.has_output_bubble() {
                (h * 0.08).max(3.0) + 2.0
            } else {
                0.0
            };
            let mut slots: Vec<PortSlot> = (0..inputs)
                .map(|idx| {
                    let y = h / (inputs as f32 + 1.0) * (idx as f32 + 1.0);
                    PortSlot::new(format!("in-{idx}"), PortDirection::Input, -inset, y)
                })
                .collect();
            slots.push(PortSlot::new("out", PortDirection::Output, w + bubble, h / 2.0));
            slots
        }
        NodeKind::Junction => vec![
            PortSlot::new("top", PortDirection::Input, w / 2.0, 0.0),
            PortSlot::new("right", PortDirection::Output, w, h / 2.0),
            PortSlot::new("bottom", PortDirection::Input, w / 2.0, h),
            PortSlot::new("left", PortDirection::Input, 0.0, h / 2.0),
        ],
    }
}

/// Port records for `node`, ready for a single batch insert.
pub fn build_ports(node: &Node) -> Vec<Port> {
    port_layout(node.kind, node.size)
        .into_iter()
        .map(|slot| {
            Port::new(
                port_id(&node.id, &slot.suffix),
                node.id.clone(),
                slot.direction,
                slot.position,
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Position,
    pub size: Size,
    pub label: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    /// Free text for LABEL gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    /// Seconds for PDTIMER gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_value: Option<f32>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        kind: NodeKind,
        position: Position,
        size: Size,
        label: impl Into<String>,
    ) -> Self {
        let rotation = match kind {
            NodeKind::Tag => None,
            NodeKind::Gate { .. } | NodeKind::Junction => Some(0.0),
        };
        Self {
            id: id.into(),
            kind,
            position,
            size,
            label: label.into(),
            selected: false,
            z_index: 0,
            rotation,
            custom_label: None,
            timer_value: None,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_node(self.position, self.size)
    }
}

/// Partial node update. The kind is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub label: Option<String>,
    pub z_index: Option<i32>,
    pub rotation: Option<Option<f32>>,
    pub custom_label: Option<Option<String>>,
    pub timer_value: Option<Option<f32>>,
}

impl NodePatch {
    fn validate(&self) -> Result<(), ModelError> {
        if let Some(size) = self.size
            && !size.is_valid()
        {
            return Err(ModelError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        if let Some(position) = self.position
            && !position.is_finite()
        {
            return Err(ModelError::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }
        Ok(())
    }

    fn apply(self, node: &mut Node) {
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(size) = self.size {
            node.size = size;
        }
        if let Some(label) = self.label {
            node.label = label;
        }
        if let Some(z) = self.z_index {
            node.z_index = z;
        }
        if let Some(rotation) = self.rotation {
            node.rotation = rotation;
        }
        if let Some(custom) = self.custom_label {
            node.custom_label = custom;
        }
        if let Some(timer) = self.timer_value {
            node.timer_value = timer;
        }
    }
}

/// Node records plus their draw order (last is on top).
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: IndexMap<NodeId, Node>,
    render_order: Vec<NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.render_order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Reinsert at a specific draw-order slot. Used by history replay.
    pub(crate) fn restore_node(&mut self, node: Node, order: usize) {
        self.render_order.retain(|id| id != &node.id);
        let order = order.min(self.render_order.len());
        self.render_order.insert(order, node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Overwrite an existing record in place, keeping its draw-order slot.
    pub(crate) fn replace_node(&mut self, node: Node) {
        if let Some(slot) = self.nodes.get_mut(&node.id) {
            *slot = node;
        }
    }

    /// Merge `patch` into the node. Unknown ids are a no-op; a patch that would
    /// leave the node with a degenerate size or position is refused whole.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), ModelError> {
        patch.validate()?;
        if let Some(node) = self.nodes.get_mut(id) {
            patch.apply(node);
        }
        Ok(())
    }

    /// Remove the node and return it with its former draw-order slot.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, usize)> {
        let node = self.nodes.shift_remove(id)?;
        let order = self
            .render_order
            .iter()
            .position(|other| other == id)
            .unwrap_or(self.render_order.len());
        self.render_order.retain(|other| other != id);
        Some((node, order))
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), ModelError> {
        self.update_node(
            id,
            NodePatch {
                position: Some(position),
                ..NodePatch::default()
            },
        )
    }

    pub fn select_node(&mut self, id: &str, multi: bool) {
        if !multi {
            self.clear_node_selection();
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.selected = true;
        }
    }

    pub fn clear_node_selection(&mut self) {
        for node in self.nodes.values_mut() {
            node.selected = false;
        }
    }

    pub fn bring_to_front(&mut self, id: &str) {
        if !self.nodes.contains_key(id) {
            return;
        }
        self.render_order.retain(|other| other != id);
        self.render_order.push(id.to_string());
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn selected_nodes(&self) -> Vec<&Node> {
        self.all_nodes().into_iter().filter(|node| node.selected).collect()
    }

    /// Nodes in draw order.
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.render_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn render_order(&self) -> &[NodeId] {
        &self.render_order
    }

    pub fn bounding_box(&self, id: &str) -> Option<BoundingBox> {
        self.nodes.get(id).map(Node::bounding_box)
    }
}
