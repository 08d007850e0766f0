use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid tile size: {width}×{height} (must be > 0)")]
    InvalidTileSize { width: u32, height: u32 },

    #[error("invalid image dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no history entry at index {index} (history holds {len})")]
    HistoryIndex { index: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Core(#[from] fractal_core::CoreError),
}
