pub mod buffer;
pub mod error;
pub mod export;
pub mod history;
pub mod pool;
pub mod renderer;
pub mod stats;
pub mod surface;
pub mod tile;

pub use buffer::RenderBuffer;
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use history::{HistoryBuffer, HistoryEntry};
pub use pool::WorkerPool;
pub use renderer::{FractalRenderer, RenderCancel};
pub use stats::RenderBoxTimeStats;
pub use surface::Surface;
pub use tile::{build_tile_grid, RenderBox, RenderBoxCell, RenderBoxState};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
