use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use fractal_core::{ComplexBig, PixelSize};
use fractal_render::FractalRenderer;

/// Render an escape-time fractal to a PNG.
#[derive(Parser, Debug)]
#[command(name = "fractal-renderer", version)]
pub struct Args {
    /// Settings JSON. Built-in defaults are used when omitted.
    pub settings: Option<PathBuf>,

    /// Variant: "Mandelbrot", "Julia Set" or "Newton's Fractal".
    #[arg(long)]
    pub fractal: Option<String>,

    /// Coloring algorithm, by name.
    #[arg(long)]
    pub color_func: Option<String>,

    /// Palette from the settings file, by name.
    #[arg(long)]
    pub palette: Option<String>,

    /// Arithmetic precision in bits; above 64 the arbitrary-precision path is used.
    #[arg(long)]
    pub precision: Option<u32>,

    #[arg(long)]
    pub max_iters: Option<u64>,

    #[arg(long)]
    pub threads: Option<usize>,

    /// Supersampling factor per axis.
    #[arg(long)]
    pub anti_alias: Option<u32>,

    /// Output size as WIDTHxHEIGHT.
    #[arg(long)]
    pub image_size: Option<Dimensions>,

    /// View center as RE,IM (decimal strings, any precision).
    #[arg(long, allow_hyphen_values = true)]
    pub center: Option<ComplexArg>,

    /// View size as RE,IM; requires --center.
    #[arg(long, requires = "center")]
    pub view_size: Option<ComplexArg>,

    /// Zoom into the pixel rectangle X0,Y0,X1,Y1. Repeatable; each step is
    /// rendered and kept in the history.
    #[arg(long)]
    pub zoom: Vec<PixelRect>,

    /// Step back this many zooms before exporting.
    #[arg(long, default_value_t = 0)]
    pub undo: usize,

    /// Render in draft mode (every Nth pixel, no anti-aliasing).
    #[arg(long)]
    pub draft: bool,

    /// Restore the variant's default view before zooming.
    #[arg(long)]
    pub reset_view: bool,

    /// Output PNG path.
    #[arg(short, long, default_value = "fractal.png")]
    pub output: PathBuf,

    /// Also write the final settings JSON here.
    #[arg(long)]
    pub settings_out: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the available variants, coloring algorithms and palettes, then exit.
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions(pub PixelSize);

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
        Ok(Self(PixelSize::new(parse(w)?, parse(h)?)))
    }
}

/// A complex number kept as text until the working precision is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexArg {
    pub re: String,
    pub im: String,
}

impl ComplexArg {
    pub fn to_big(&self, precision: u32) -> fractal_core::Result<ComplexBig> {
        ComplexBig::parse(&self.re, &self.im, precision)
    }
}

impl FromStr for ComplexArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (re, im) = s
            .split_once(',')
            .ok_or_else(|| format!("expected RE,IM, got {s:?}"))?;
        Ok(Self {
            re: re.trim().to_string(),
            im: im.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
}

impl FromStr for PixelRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        match values[..] {
            [x0, y0, x1, y1] => Ok(Self {
                top_left: (x0, y0),
                bottom_right: (x1, y1),
            }),
            _ => Err(format!("expected X0,Y0,X1,Y1, got {s:?}")),
        }
    }
}

impl Args {
    /// Apply the command-line overrides that do not need a render.
    pub fn apply(&self, renderer: &mut FractalRenderer) -> fractal_render::Result<()> {
        if let Some(name) = &self.fractal {
            renderer.set_fractal_by_name(name)?;
        }
        if let Some(name) = &self.color_func {
            renderer.set_color_func(name)?;
        }
        if let Some(name) = &self.palette {
            renderer.set_palette(name)?;
        }
        if let Some(bits) = self.precision {
            renderer.set_precision(bits)?;
        }
        if let Some(Dimensions(size)) = self.image_size {
            renderer.set_image_size(size)?;
        }
        renderer.edit_config(|c| {
            if let Some(n) = self.max_iters {
                c.max_iters = n;
            }
            if let Some(n) = self.threads {
                c.num_threads = n;
            }
            if let Some(n) = self.anti_alias {
                c.anti_alias = n;
            }
            c.draft_render |= self.draft;
        })?;
        if self.reset_view {
            renderer.reset_view()?;
        }
        if let Some(center) = &self.center {
            let precision = renderer.config().precision;
            let size = match &self.view_size {
                Some(size) => size.to_big(precision)?,
                None => renderer.config().frac_size.clone(),
            };
            renderer.move_fractal_center(center.to_big(precision)?, size)?;
        }
        Ok(())
    }
}
