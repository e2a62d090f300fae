use formats::GeoJsonError;
use gpu::RenderError;
use layers::{MarkerError, MeshError};
use runtime::LoopError;
use scene::components::MarkerId;
use scene::{DisposeError, GraphError, PickError};

use crate::config::ErrorPolicy;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("map is already initialized")]
    AlreadyInitialized,
    #[error("map is not initialized")]
    NotInitialized,
    #[error("map has been torn down")]
    TornDown,
    #[error("unknown marker {0:?}")]
    UnknownMarker(MarkerId),
    #[error(transparent)]
    GeoJson(#[from] GeoJsonError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Marker(#[from] MarkerError),
    #[error(transparent)]
    Pick(#[from] PickError),
    #[error(transparent)]
    Dispose(#[from] DisposeError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Loop(#[from] LoopError),
}

impl ErrorPolicy {
    /// Applies the policy to one item's failure: `Ok(())` means keep going.
    pub fn absorb(self, what: &str, err: impl Into<EngineError>) -> Result<(), EngineError> {
        let err = err.into();
        match self {
            ErrorPolicy::LogAndContinue => {
                tracing::warn!(error = %err, "skipping {what}");
                Ok(())
            }
            ErrorPolicy::Strict => Err(err),
        }
    }
}
