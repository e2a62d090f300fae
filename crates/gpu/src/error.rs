use scene::PickError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("camera matrices are not invertible")]
    SingularCamera,
    #[error(transparent)]
    Pick(#[from] PickError),
    #[error("render surface: {0}")]
    Surface(String),
}
