pub mod insight;

pub use insight::{
    ConceptSummary, EdgeView, GraphViewResponse, InsightEngine, InsightReport, MetricsView,
    NodeView,
};
