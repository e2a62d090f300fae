use scene::{GraphError, ResourceError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("region {feature:?} is malformed: {reason}")]
    Malformed { feature: String, reason: String },
    #[error("region {feature:?} has no polygon geometry")]
    NoPolygons { feature: String },
    #[error("region {feature:?}: ring {ring} of polygon {polygon} has fewer than three distinct points or no area")]
    DegenerateRing {
        feature: String,
        polygon: usize,
        ring: usize,
    },
    #[error("region {feature:?}: triangulation failed: {reason}")]
    Triangulation { feature: String, reason: String },
    #[error(transparent)]
    Style(#[from] ResourceError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
