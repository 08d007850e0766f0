use fractal_core::Color;

/// An owned RGBA8 image: a finished render, a history frame or a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major order.
    pub pixels: Vec<u8>,
}

impl RenderBuffer {
    /// Create a new buffer filled with black (opaque).
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn color(&self, x: u32, y: u32) -> Color {
        Color::from_rgba8(self.pixel(x, y))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Nearest-neighbour resample of the sub-rectangle `[x0, x1) × [y0, y1)`
    /// (in source pixels, possibly fractional) to a `width × height` image.
    ///
    /// Source coordinates outside the buffer are clamped to its edge.
    pub fn stretch(&self, x0: f64, y0: f64, x1: f64, y1: f64, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        let sx = (x1 - x0) / width as f64;
        let sy = (y1 - y0) / height as f64;
        for y in 0..height {
            let src_y = (y0 + (y as f64 + 0.5) * sy).floor();
            let src_y = src_y.clamp(0.0, (self.height - 1) as f64) as u32;
            for x in 0..width {
                let src_x = (x0 + (x as f64 + 0.5) * sx).floor();
                let src_x = src_x.clamp(0.0, (self.width - 1) as f64) as u32;
                out.set_pixel(x, y, self.pixel(src_x, src_y));
            }
        }
        out
    }
}
