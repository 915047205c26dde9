pub mod graph;
pub mod linker;
pub mod snapshot;

pub use graph::{GraphLimits, GraphStore, GraphView, NewNode, StoreError};
