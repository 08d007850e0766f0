use thiserror::Error;

/// Errors originating from the core fractal engine and settings layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u64),

    #[error("invalid bailout: {0} (must be positive and finite)")]
    InvalidBailout(f64),

    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("failed to parse number {value:?}: {reason}")]
    ParseNumber { value: String, reason: String },

    #[error("malformed settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("palette index {index} out of range for palette of size {size}")]
    PaletteIndex { index: usize, size: usize },

    #[error("unknown color palette: {0}")]
    UnknownPalette(String),

    #[error("unknown coloring algorithm: {0}")]
    UnknownColoring(String),

    #[error("unknown fractal type: {0}")]
    UnknownFractal(String),
}
