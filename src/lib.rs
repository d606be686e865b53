#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod drawing;
pub mod dump;
pub mod editing;
pub mod error;
pub mod geometry;
pub mod history;
pub mod model;
pub mod routing;
pub mod session;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use error::{ConfigError, ConnectionRejection, ModelError};
pub use geometry::{BoundingBox, Position, Size};
pub use routing::{PortSide, RoutingOptions, calculate_orthogonal_path};
pub use session::DiagramSession;
