use std::sync::atomic::{AtomicU32, Ordering};

use fractal_core::{Color, PixelSize};

use crate::buffer::RenderBuffer;
use crate::error::RenderError;

/// The shared image a render pass paints into.
///
/// Each pixel is one `AtomicU32` holding packed RGBA8, so tile workers can
/// write through a shared reference. Tiles never overlap, so relaxed ordering
/// is enough; the pool's completion barrier publishes the writes to readers.
#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<AtomicU32>,
}

#[inline]
fn pack(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

#[inline]
fn unpack(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

impl Surface {
    /// A surface filled with opaque black.
    pub fn new(size: PixelSize) -> Self {
        let black = pack(Color::BLACK.to_rgba8());
        Self {
            width: size.width,
            height: size.height,
            pixels: (0..size.area()).map(|_| AtomicU32::new(black)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Write one pixel. Coordinates outside the surface are ignored.
    #[inline]
    pub fn set_pixel(&self, x: u32, y: u32, color: Color) {
        self.set_rgba(x, y, color.to_rgba8());
    }

    #[inline]
    pub fn set_rgba(&self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i].store(pack(rgba), Ordering::Relaxed);
        }
    }

    /// Read one pixel; `None` outside the surface.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.get_rgba(x, y).map(Color::from_rgba8)
    }

    pub fn get_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.index(x, y)
            .map(|i| unpack(self.pixels[i].load(Ordering::Relaxed)))
    }

    /// Paint a clipped rectangle with one color.
    pub fn fill_rect(&self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let rgba = color.to_rgba8();
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_rgba(px, py, rgba);
            }
        }
    }

    pub fn fill(&self, color: Color) {
        self.fill_rect(0, 0, self.width, self.height, color);
    }

    /// Copy the current contents into an owned buffer.
    pub fn snapshot(&self) -> RenderBuffer {
        let mut pixels = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            pixels.extend_from_slice(&unpack(p.load(Ordering::Relaxed)));
        }
        RenderBuffer {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Overwrite the contents from a buffer of the same dimensions.
    pub fn restore(&self, buffer: &RenderBuffer) -> crate::Result<()> {
        if buffer.width != self.width
            || buffer.height != self.height
            || buffer.pixels.len() != self.pixels.len() * 4
        {
            return Err(RenderError::InvalidDimensions {
                width: buffer.width,
                height: buffer.height,
            });
        }
        for (dst, src) in self.pixels.iter().zip(buffer.pixels.chunks_exact(4)) {
            dst.store(pack([src[0], src[1], src[2], src[3]]), Ordering::Relaxed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_opaque_black() {
        let s = Surface::new(PixelSize::new(3, 2));
        assert_eq!(s.get_rgba(2, 1), Some([0, 0, 0, 255]));
        assert_eq!(s.get_rgba(3, 0), None);
    }

    #[test]
    fn set_and_get_round_trip() {
        let s = Surface::new(PixelSize::new(4, 4));
        s.set_pixel(1, 2, Color::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(s.get_rgba(1, 2), Some([255, 128, 0, 255]));
        s.set_pixel(10, 10, Color::WHITE);
    }

    #[test]
    fn fill_rect_is_clipped() {
        let s = Surface::new(PixelSize::new(4, 4));
        s.fill_rect(2, 2, 10, 10, Color::WHITE);
        assert_eq!(s.get_rgba(3, 3), Some([255; 4]));
        assert_eq!(s.get_rgba(1, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn snapshot_and_restore() {
        let s = Surface::new(PixelSize::new(2, 2));
        s.set_rgba(0, 1, [1, 2, 3, 4]);
        let snap = s.snapshot();
        assert_eq!(snap.pixel(0, 1), [1, 2, 3, 4]);

        s.fill(Color::WHITE);
        s.restore(&snap).unwrap();
        assert_eq!(s.get_rgba(0, 1), Some([1, 2, 3, 4]));
        assert_eq!(s.get_rgba(1, 1), Some([0, 0, 0, 255]));

        assert!(s.restore(&RenderBuffer::new(3, 2)).is_err());
    }

    #[test]
    fn concurrent_disjoint_writes() {
        let s = Surface::new(PixelSize::new(64, 64));
        std::thread::scope(|scope| {
            for band in 0..4u32 {
                let s = &s;
                scope.spawn(move || {
                    s.fill_rect(0, band * 16, 64, 16, Color::rgb(band as f32 / 4.0, 0.0, 0.0));
                });
            }
        });
        assert_eq!(s.get_rgba(5, 50).map(|p| p[0]), Some(191));
    }
}
