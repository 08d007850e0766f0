use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use fractal_core::PixelSize;

use crate::error::RenderError;

/// Lifecycle of a tile within one render pass.
///
/// `None → Queued → Rendering → Rendered`. A halted pass may leave tiles in
/// `Rendering`; the next pass discards the whole set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RenderBoxState {
    None = 0,
    Queued = 1,
    Rendering = 2,
    Rendered = 3,
}

impl RenderBoxState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Queued,
            2 => Self::Rendering,
            3 => Self::Rendered,
            _ => Self::None,
        }
    }
}

/// A rectangular tile of the image, as seen by callers (progress display,
/// statistics). Snapshot of a [`RenderBoxCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBox {
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    /// Tile width in pixels (may be smaller at the right edge).
    pub width: u32,
    /// Tile height in pixels (may be smaller at the bottom edge).
    pub height: u32,
    pub draft_render: bool,
    pub draft_inc: u32,
    pub state: RenderBoxState,
    /// Zero until the tile reaches [`RenderBoxState::Rendered`].
    pub render_time: Duration,
}

impl RenderBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            draft_render: false,
            draft_inc: 1,
            state: RenderBoxState::None,
            render_time: Duration::ZERO,
        }
    }

    /// Number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Shared per-tile record. Geometry is fixed at creation; `state` and the
/// render time are written only by the worker that owns the tile.
#[derive(Debug)]
pub struct RenderBoxCell {
    geometry: RenderBox,
    state: AtomicU8,
    render_time_ns: AtomicU64,
}

impl RenderBoxCell {
    pub fn new(geometry: RenderBox) -> Self {
        Self {
            state: AtomicU8::new(geometry.state as u8),
            render_time_ns: AtomicU64::new(geometry.render_time.as_nanos() as u64),
            geometry,
        }
    }

    pub fn geometry(&self) -> &RenderBox {
        &self.geometry
    }

    pub fn state(&self) -> RenderBoxState {
        RenderBoxState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: RenderBoxState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn render_time(&self) -> Duration {
        Duration::from_nanos(self.render_time_ns.load(Ordering::Acquire))
    }

    /// Record the elapsed time and mark the tile rendered.
    pub fn finish(&self, elapsed: Duration) {
        // Never store zero: statistics treat zero as "not finished".
        let ns = (elapsed.as_nanos() as u64).max(1);
        self.render_time_ns.store(ns, Ordering::Release);
        self.set_state(RenderBoxState::Rendered);
    }

    pub fn snapshot(&self) -> RenderBox {
        RenderBox {
            state: self.state(),
            render_time: self.render_time(),
            ..self.geometry
        }
    }
}

/// Split `image` into `ceil(image / tile)` tiles per axis, row by row.
///
/// The last column and row are clipped to the image; tiles inherit the
/// draft settings and start out [`RenderBoxState::None`].
pub fn build_tile_grid(
    image: PixelSize,
    tile: PixelSize,
    draft_render: bool,
    draft_inc: u32,
) -> crate::Result<Vec<RenderBox>> {
    if tile.is_empty() {
        return Err(RenderError::InvalidTileSize {
            width: tile.width,
            height: tile.height,
        });
    }
    if image.is_empty() {
        return Err(RenderError::InvalidDimensions {
            width: image.width,
            height: image.height,
        });
    }

    let cols = image.width.div_ceil(tile.width);
    let rows = image.height.div_ceil(tile.height);
    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        let y = row * tile.height;
        let th = tile.height.min(image.height - y);
        for col in 0..cols {
            let x = col * tile.width;
            let tw = tile.width.min(image.width - x);
            tiles.push(RenderBox {
                draft_render,
                draft_inc,
                ..RenderBox::new(x, y, tw, th)
            });
        }
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(w: u32, h: u32, tw: u32, th: u32) -> Vec<RenderBox> {
        build_tile_grid(PixelSize::new(w, h), PixelSize::new(tw, th), false, 1).unwrap()
    }

    #[test]
    fn tile_grid_covers_viewport() {
        let tiles = grid(200, 150, 64, 64);
        let total_pixels: usize = tiles.iter().map(|t| t.pixel_count()).sum();
        assert_eq!(total_pixels, 200 * 150);
    }

    #[test]
    fn tile_grid_no_overlap() {
        let tiles = grid(200, 150, 64, 48);
        let mut covered = vec![false; 200 * 150];
        for tile in &tiles {
            for py in tile.y..tile.y + tile.height {
                for px in tile.x..tile.x + tile.width {
                    let idx = py as usize * 200 + px as usize;
                    assert!(!covered[idx], "pixel ({px}, {py}) covered twice");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c), "all pixels must be covered");
    }

    #[test]
    fn last_row_and_column_are_clipped() {
        let tiles = grid(100, 100, 30, 30);
        assert_eq!(tiles.len(), 16);
        let widths: Vec<u32> = tiles[..4].iter().map(|t| t.width).collect();
        assert_eq!(widths, [30, 30, 30, 10]);
        let heights: Vec<u32> = tiles.iter().step_by(4).map(|t| t.height).collect();
        assert_eq!(heights, [30, 30, 30, 10]);
        assert_eq!((tiles[15].x, tiles[15].y), (90, 90));
    }

    #[test]
    fn tiles_inherit_draft_settings() {
        let tiles = build_tile_grid(PixelSize::new(10, 10), PixelSize::new(4, 4), true, 3).unwrap();
        assert!(tiles.iter().all(|t| t.draft_render && t.draft_inc == 3));
        assert!(tiles.iter().all(|t| t.state == RenderBoxState::None));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            build_tile_grid(PixelSize::new(10, 10), PixelSize::new(0, 4), false, 1),
            Err(RenderError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            build_tile_grid(PixelSize::new(0, 10), PixelSize::new(4, 4), false, 1),
            Err(RenderError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn cell_state_machine() {
        let cell = RenderBoxCell::new(RenderBox::new(0, 0, 4, 4));
        assert_eq!(cell.state(), RenderBoxState::None);
        cell.set_state(RenderBoxState::Queued);
        cell.set_state(RenderBoxState::Rendering);
        assert_eq!(cell.snapshot().state, RenderBoxState::Rendering);
        assert_eq!(cell.render_time(), Duration::ZERO);
        cell.finish(Duration::from_millis(3));
        let snap = cell.snapshot();
        assert_eq!(snap.state, RenderBoxState::Rendered);
        assert_eq!(snap.render_time, Duration::from_millis(3));
        assert_eq!(snap.width, 4);
    }
}
