pub mod graph;
pub mod node;
pub mod story;
pub mod validate;

pub use graph::{ScenarioError, ScenarioGraph};
pub use node::{Media, MediaKind, NodeType, ScenarioNode, ScenarioOption};
pub use validate::{GraphIssue, GraphWarning, ValidationError};
