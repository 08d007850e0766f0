//! Render configuration and the settings-file schema it is loaded from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bigfloat::{BigFloat, LOW_PRECISION_BITS};
use crate::complex::Complex;
use crate::complex_big::ComplexBig;
use crate::error::CoreError;
use crate::palette::ColorPalette;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Snapshot of everything one render pass needs.
///
/// Owned by the renderer and cloned into each pass, each fractal variant and
/// each history entry; it is never mutated while a pass that holds a copy is
/// still running.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub num_threads: usize,
    pub max_iters: u64,
    /// Arithmetic precision in bits; at or below 64 the `f64` path is used.
    pub precision: u32,
    /// Squared-magnitude bailout threshold.
    pub bail: f64,
    /// Supersampling factor per axis; 1 disables anti-aliasing.
    pub anti_alias: u32,
    pub image_size: PixelSize,
    pub box_size: PixelSize,
    pub frac_top_left: ComplexBig,
    pub frac_size: ComplexBig,
    pub original_frac_size: ComplexBig,
    pub palette: ColorPalette,
    pub draft_render: bool,
    pub draft_inc: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let precision = LOW_PRECISION_BITS;
        let frac_size = ComplexBig::from_f64(4.0, 3.0, precision);
        Self {
            num_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_iters: 256,
            precision,
            bail: Self::DEFAULT_BAIL,
            anti_alias: 1,
            image_size: PixelSize::new(800, 600),
            box_size: PixelSize::new(64, 64),
            frac_top_left: ComplexBig::from_f64(-2.5, -1.5, precision),
            original_frac_size: frac_size.clone(),
            frac_size,
            palette: ColorPalette::fallback(),
            draft_render: false,
            draft_inc: 4,
        }
    }
}

impl RenderConfig {
    pub const DEFAULT_BAIL: f64 = 4.0;

    /// Check every invariant a render pass relies on.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |field: &'static str, reason: &str| {
            Err(CoreError::InvalidSetting {
                field,
                reason: reason.to_string(),
            })
        };

        if self.num_threads == 0 {
            return invalid("numThreads", "must be at least 1");
        }
        if self.max_iters == 0 {
            return Err(CoreError::InvalidMaxIterations(self.max_iters));
        }
        if !(self.bail > 0.0 && self.bail.is_finite()) {
            return Err(CoreError::InvalidBailout(self.bail));
        }
        if self.anti_alias == 0 {
            return invalid("antiAlias", "must be at least 1");
        }
        if self.image_size.is_empty() {
            return invalid("imageSize", "width and height must be positive");
        }
        if self.box_size.is_empty() {
            return invalid("boxSize", "width and height must be positive");
        }
        if self.draft_inc == 0 {
            return invalid("draftInc", "must be at least 1");
        }
        let zero = BigFloat::zero(self.precision);
        if !(self.frac_size.re > zero && self.frac_size.im > zero) {
            return invalid("fractalSize", "both components must be positive");
        }
        if self.palette.is_empty() {
            return invalid("colorPalettes", "the active palette has no colors");
        }
        Ok(())
    }

    #[inline]
    pub fn is_low_precision(&self) -> bool {
        self.precision <= LOW_PRECISION_BITS
    }

    /// Fractal-space size of one pixel, per axis.
    pub fn pixel_step_low(&self) -> Complex {
        let size = self.frac_size.to_complex();
        Complex::new(
            size.re / self.image_size.width as f64,
            size.im / self.image_size.height as f64,
        )
    }

    /// High-precision pixel step. `None` only for a zero-sized image.
    pub fn pixel_step_high(&self) -> Option<ComplexBig> {
        let pixels = ComplexBig::from_f64(
            self.image_size.width as f64,
            self.image_size.height as f64,
            self.precision,
        );
        self.frac_size.div_components(&pixels)
    }

    /// Map a (possibly fractional) pixel position to fractal space.
    ///
    /// Pixel `y` grows downwards and maps to increasing imaginary parts.
    pub fn pixel_to_fractal_low(&self, px: f64, py: f64) -> Complex {
        self.frac_top_left.to_complex() + Complex::new(px, py).scale_by(self.pixel_step_low())
    }

    pub fn pixel_to_fractal_high(&self, px: f64, py: f64) -> Option<ComplexBig> {
        let offset = ComplexBig::from_f64(px, py, self.precision);
        Some(self.frac_top_left.add(&offset.scale_by(&self.pixel_step_high()?)))
    }

    /// Center of the fractal rectangle (`top_left + size / 2`).
    pub fn frac_center(&self) -> ComplexBig {
        self.frac_top_left.add(&half(&self.frac_size, self.precision))
    }

    /// Place the fractal rectangle by its center.
    pub fn set_center(&mut self, center: &ComplexBig, size: &ComplexBig) {
        self.frac_top_left = center.sub(&half(size, self.precision));
        self.frac_size = size.clone();
    }

    /// Re-round every stored coordinate to `precision` bits.
    pub fn set_precision(&mut self, precision: u32) {
        self.precision = precision;
        self.frac_top_left = self.frac_top_left.with_precision(precision);
        self.frac_size = self.frac_size.with_precision(precision);
        self.original_frac_size = self.original_frac_size.with_precision(precision);
    }

    /// `original_frac_size.x / frac_size.x`, for display.
    pub fn zoom_factor(&self) -> f64 {
        self.original_frac_size
            .re
            .checked_div(&self.frac_size.re)
            .map(|z| z.to_f64())
            .unwrap_or(f64::INFINITY)
    }
}

fn half(v: &ComplexBig, precision: u32) -> ComplexBig {
    v.scale_by(&ComplexBig::from_f64(0.5, 0.5, precision))
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

/// A decimal accepted either as a JSON string (full precision) or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalText {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalText {
    pub fn parse(&self, precision: u32) -> crate::Result<BigFloat> {
        match self {
            Self::Text(s) => BigFloat::parse(s, precision),
            Self::Number(n) => BigFloat::parse(&n.to_string(), precision),
        }
    }
}

/// A complex coordinate as written in the settings file: `{"Re": .., "Im": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexText {
    #[serde(rename = "Re")]
    pub re: DecimalText,
    #[serde(rename = "Im")]
    pub im: DecimalText,
}

impl ComplexText {
    pub fn parse(&self, precision: u32) -> crate::Result<ComplexBig> {
        Ok(ComplexBig::new(
            self.re.parse(precision)?,
            self.im.parse(precision)?,
        ))
    }

    pub fn from_big(v: &ComplexBig) -> Self {
        Self {
            re: DecimalText::Text(v.re.to_decimal_string()),
            im: DecimalText::Text(v.im.to_decimal_string()),
        }
    }
}

/// Per-variant defaults from the optional `fractals` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FractalDefaultsText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bail: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frac_top_left: Option<ComplexText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frac_size: Option<ComplexText>,
}

/// Parsed per-variant defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FractalDefaults {
    pub bail: Option<f64>,
    pub frac_top_left: Option<ComplexBig>,
    pub frac_size: Option<ComplexBig>,
}

fn default_bail() -> f64 {
    RenderConfig::DEFAULT_BAIL
}

fn default_draft_inc() -> u32 {
    4
}

/// The `renderConfig` section of a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    pub num_threads: usize,
    pub max_iters: u64,
    pub precision: u32,
    #[serde(default = "default_bail")]
    pub bail: f64,
    pub anti_alias: u32,
    pub image_size: PixelSize,
    pub box_size: PixelSize,
    /// Center of the view (not the corner).
    pub fractal_origin: ComplexText,
    pub fractal_size: ComplexText,
    #[serde(default)]
    pub draft_render: bool,
    #[serde(default = "default_draft_inc")]
    pub draft_inc: u32,
    #[serde(default)]
    pub color_palettes: Vec<ColorPalette>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fractal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_func: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fractals: BTreeMap<String, FractalDefaultsText>,
}

/// A loaded settings document.
///
/// The raw JSON is kept alongside the parsed section so that keys this crate
/// does not understand (UI layout, menus) survive an export unchanged.
#[derive(Debug, Clone)]
pub struct Settings {
    raw: Value,
    render: RenderSettings,
}

impl Settings {
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(raw: Value) -> crate::Result<Self> {
        let section = raw
            .get("renderConfig")
            .cloned()
            .ok_or_else(|| CoreError::InvalidSetting {
                field: "renderConfig",
                reason: "missing section".to_string(),
            })?;
        let render: RenderSettings = serde_json::from_value(section)?;
        Ok(Self { raw, render })
    }

    /// A minimal document describing `config`, for renderers built without a file.
    pub fn from_render_config(config: &RenderConfig, palettes: &[ColorPalette]) -> Self {
        let render = RenderSettings {
            num_threads: config.num_threads,
            max_iters: config.max_iters,
            precision: config.precision,
            bail: config.bail,
            anti_alias: config.anti_alias,
            image_size: config.image_size,
            box_size: config.box_size,
            fractal_origin: ComplexText::from_big(&config.frac_center()),
            fractal_size: ComplexText::from_big(&config.frac_size),
            draft_render: config.draft_render,
            draft_inc: config.draft_inc,
            color_palettes: palettes.to_vec(),
            fractal_type: None,
            color_func: None,
            color_palette: Some(config.palette.name.clone()),
            fractals: BTreeMap::new(),
        };
        Self {
            raw: Value::Object(Default::default()),
            render,
        }
    }

    pub fn render(&self) -> &RenderSettings {
        &self.render
    }

    pub fn palettes(&self) -> &[ColorPalette] {
        &self.render.color_palettes
    }

    pub fn palette(&self, name: &str) -> Option<&ColorPalette> {
        self.palettes().iter().find(|p| p.name == name)
    }

    /// Build and validate the render configuration described by this document.
    ///
    /// The active palette is the one named by `colorPalette` when present,
    /// otherwise the first palette listed.
    pub fn to_render_config(&self) -> crate::Result<RenderConfig> {
        let r = &self.render;
        if r.color_palettes.is_empty() {
            return Err(CoreError::InvalidSetting {
                field: "colorPalettes",
                reason: "at least one palette is required".to_string(),
            });
        }
        if let Some(empty) = r.color_palettes.iter().find(|p| p.is_empty()) {
            return Err(CoreError::InvalidSetting {
                field: "colorPalettes",
                reason: format!("palette {:?} has no colors", empty.name),
            });
        }
        let palette = match &r.color_palette {
            Some(name) => self
                .palette(name)
                .ok_or_else(|| CoreError::UnknownPalette(name.clone()))?,
            None => &r.color_palettes[0],
        };

        let origin = r.fractal_origin.parse(r.precision)?;
        let size = r.fractal_size.parse(r.precision)?;

        let mut config = RenderConfig {
            num_threads: r.num_threads,
            max_iters: r.max_iters,
            precision: r.precision,
            bail: r.bail,
            anti_alias: r.anti_alias,
            image_size: r.image_size,
            box_size: r.box_size,
            frac_top_left: ComplexBig::zero(r.precision),
            frac_size: size.clone(),
            original_frac_size: size.clone(),
            palette: palette.clone(),
            draft_render: r.draft_render,
            draft_inc: r.draft_inc,
        };
        config.set_center(&origin, &size);
        config.validate()?;
        Ok(config)
    }

    /// Parsed entry of the `fractals` table for `name`, if present.
    pub fn fractal_defaults(
        &self,
        name: &str,
        precision: u32,
    ) -> crate::Result<Option<FractalDefaults>> {
        let Some(text) = self.render.fractals.get(name) else {
            return Ok(None);
        };
        Ok(Some(FractalDefaults {
            bail: text.bail,
            frac_top_left: text
                .frac_top_left
                .as_ref()
                .map(|c| c.parse(precision))
                .transpose()?,
            frac_size: text
                .frac_size
                .as_ref()
                .map(|c| c.parse(precision))
                .transpose()?,
        }))
    }

    /// Serialize the document with `renderConfig` overwritten from the live state.
    pub fn export(
        &self,
        config: &RenderConfig,
        fractal_type: &str,
        color_func: &str,
        color_palette: &str,
    ) -> crate::Result<String> {
        let mut render = self.render.clone();
        render.num_threads = config.num_threads;
        render.max_iters = config.max_iters;
        render.precision = config.precision;
        render.bail = config.bail;
        render.anti_alias = config.anti_alias;
        render.image_size = config.image_size;
        render.box_size = config.box_size;
        render.fractal_origin = ComplexText::from_big(&config.frac_center());
        render.fractal_size = ComplexText::from_big(&config.frac_size);
        render.draft_render = config.draft_render;
        render.draft_inc = config.draft_inc;
        render.fractal_type = Some(fractal_type.to_string());
        render.color_func = Some(color_func.to_string());
        render.color_palette = Some(color_palette.to_string());

        let mut doc = self.raw.clone();
        if !doc.is_object() {
            doc = Value::Object(Default::default());
        }
        let fresh = serde_json::to_value(&render)?;
        match (&mut doc["renderConfig"], fresh) {
            (Value::Object(existing), Value::Object(fields)) => existing.extend(fields),
            (slot, fresh) => *slot = fresh,
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}
