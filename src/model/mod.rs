mod connections;
mod diagram;
mod nodes;
mod ports;

pub use connections::*;
pub use diagram::*;
pub use nodes::*;
pub use ports::*;

pub type NodeId = String;
pub type PortId = String;
pub type ConnectionId = String;
