use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use fractal_core::{
    Color, ColorPalette, ColoringAlgorithm, Complex, ComplexBig, CoreError, Fractal, FractalKind,
    Optimisations, PixelSize, RenderConfig, Settings,
};

use crate::buffer::RenderBuffer;
use crate::error::RenderError;
use crate::export::{export_png, ExportMetadata};
use crate::pool::WorkerPool;
use crate::stats::RenderBoxTimeStats;
use crate::surface::Surface;
use crate::tile::{build_tile_grid, RenderBox, RenderBoxCell, RenderBoxState};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Tracks the current render generation for cancellation and progress.
///
/// Incrementing the generation signals all in-flight tiles to stop early.
/// The progress counters let a front end display a progress bar.
#[derive(Debug)]
pub struct RenderCancel {
    generation: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Cancel the current render by advancing the generation.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Reset progress for a new pass with `total` tiles.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    /// Count one finished tile; returns the updated `(done, total)`.
    pub fn inc_progress(&self) -> (usize, usize) {
        let done = self.progress_done.fetch_add(1, Ordering::AcqRel) + 1;
        (done, self.progress_total.load(Ordering::Relaxed))
    }

    /// Read the current progress as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Per-pass state shared by the tile jobs
// ---------------------------------------------------------------------------

/// Placeholder painted over a tile before its draft samples land.
const DRAFT_PLACEHOLDER: Color = Color::new(0.2, 0.0, 0.2, 0.5);

/// Everything a tile job reads. Built once per pass; never mutated.
struct PassContext {
    config: RenderConfig,
    fractal: Arc<dyn Fractal>,
    coloring: ColoringAlgorithm,
    surface: Arc<Surface>,
    boxes: Arc<Vec<RenderBoxCell>>,
    cancel: Arc<RenderCancel>,
    generation: u64,
    started: Instant,
}

impl PassContext {
    #[inline]
    fn halted(&self) -> bool {
        self.cancel.generation() != self.generation
    }
}

/// Produces the (anti-aliased) color of one pixel of a tile.
trait PixelSampler {
    /// `dx`, `dy` are pixel offsets from the tile's top-left corner.
    fn sample(&self, dx: u32, dy: u32) -> Color;
}

struct LowSampler<'a> {
    fractal: &'a dyn Fractal,
    palette: &'a ColorPalette,
    coloring: &'a ColoringAlgorithm,
    origin: Complex,
    step: Complex,
    aa: u32,
}

impl<'a> LowSampler<'a> {
    fn new(ctx: &'a PassContext, tile: &RenderBox, aa: u32) -> Self {
        Self {
            fractal: ctx.fractal.as_ref(),
            palette: &ctx.config.palette,
            coloring: &ctx.coloring,
            origin: ctx.config.pixel_to_fractal_low(tile.x as f64, tile.y as f64),
            step: ctx.config.pixel_step_low(),
            aa,
        }
    }
}

impl PixelSampler for LowSampler<'_> {
    fn sample(&self, dx: u32, dy: u32) -> Color {
        let base = self.origin + Complex::new(dx as f64, dy as f64).scale_by(self.step);
        let aa = self.aa as f64;
        let mut sum = Color::TRANSPARENT;
        for ay in 0..self.aa {
            for ax in 0..self.aa {
                let sub = Complex::new(ax as f64 / aa, ay as f64 / aa).scale_by(self.step);
                let (iters, z) = self.fractal.iter_coord_low(base + sub);
                sum += self.fractal.color_low(z, iters, self.palette, self.coloring);
            }
        }
        sum / (self.aa * self.aa) as f32
    }
}

struct HighSampler<'a> {
    fractal: &'a dyn Fractal,
    palette: &'a ColorPalette,
    coloring: &'a ColoringAlgorithm,
    origin: ComplexBig,
    step: ComplexBig,
    /// `step / aa` per axis.
    sub_step: ComplexBig,
    precision: u32,
    aa: u32,
}

impl<'a> HighSampler<'a> {
    /// `None` if the configuration yields no pixel step (empty image).
    fn new(ctx: &'a PassContext, tile: &RenderBox, aa: u32) -> Option<Self> {
        let precision = ctx.config.precision;
        let step = ctx.config.pixel_step_high()?;
        let divisor = ComplexBig::from_f64(aa as f64, aa as f64, precision);
        Some(Self {
            fractal: ctx.fractal.as_ref(),
            palette: &ctx.config.palette,
            coloring: &ctx.coloring,
            origin: ctx.config.pixel_to_fractal_high(tile.x as f64, tile.y as f64)?,
            sub_step: step.div_components(&divisor)?,
            step,
            precision,
            aa,
        })
    }
}

impl PixelSampler for HighSampler<'_> {
    fn sample(&self, dx: u32, dy: u32) -> Color {
        let offset = ComplexBig::from_f64(dx as f64, dy as f64, self.precision);
        let base = self.origin.add(&offset.scale_by(&self.step));
        let mut sum = Color::TRANSPARENT;
        for ay in 0..self.aa {
            for ax in 0..self.aa {
                let sub = ComplexBig::from_f64(ax as f64, ay as f64, self.precision);
                let coord = base.add(&sub.scale_by(&self.sub_step));
                let (iters, z) = self.fractal.iter_coord_high(&coord);
                sum += self.fractal.color_high(&z, iters, self.palette, self.coloring);
            }
        }
        sum / (self.aa * self.aa) as f32
    }
}

// ---------------------------------------------------------------------------
// Tile worker
// ---------------------------------------------------------------------------

fn render_tile(ctx: &PassContext, index: usize) {
    let Some(cell) = ctx.boxes.get(index) else {
        return;
    };
    cell.set_state(RenderBoxState::Rendering);
    let start = Instant::now();
    if ctx.halted() {
        return;
    }

    let tile = *cell.geometry();
    let aa = if tile.draft_render { 1 } else { ctx.config.anti_alias };
    let completed = if ctx.config.is_low_precision() {
        paint_tile(ctx, &tile, &LowSampler::new(ctx, &tile, aa))
    } else {
        match HighSampler::new(ctx, &tile, aa) {
            Some(sampler) => paint_tile(ctx, &tile, &sampler),
            None => {
                error!(x = tile.x, y = tile.y, "no pixel step for tile; skipping");
                false
            }
        }
    };
    if !completed {
        return;
    }

    cell.finish(start.elapsed());
    let (done, total) = ctx.cancel.inc_progress();
    if done == total {
        info!(
            tile_count = total,
            elapsed_ms = ctx.started.elapsed().as_millis() as u64,
            "render complete"
        );
    }
}

/// Paint one tile. Returns `false` if the pass was halted part-way.
fn paint_tile<S: PixelSampler>(ctx: &PassContext, tile: &RenderBox, sampler: &S) -> bool {
    let surface = ctx.surface.as_ref();
    if tile.draft_render {
        surface.fill_rect(tile.x, tile.y, tile.width, tile.height, DRAFT_PLACEHOLDER);
        return paint_rows(ctx, tile, sampler, 0, tile.draft_inc.max(1));
    }

    let outline = ctx
        .fractal
        .supported_optimisations()
        .contains(Optimisations::OUTLINE);
    if !outline || tile.width < 3 || tile.height < 3 {
        return paint_rows(ctx, tile, sampler, 0, 1);
    }

    match paint_edges(ctx, tile, sampler) {
        None => false,
        Some(true) => {
            surface.fill_rect(tile.x + 1, tile.y + 1, tile.width - 2, tile.height - 2, Color::BLACK);
            !ctx.halted()
        }
        Some(false) => paint_rows(ctx, tile, sampler, 1, 1),
    }
}

/// Compute the border pixels of `tile`, one edge at a time. Returns whether
/// all of them are black, or `None` if the pass was halted between edges.
fn paint_edges<S: PixelSampler>(ctx: &PassContext, tile: &RenderBox, sampler: &S) -> Option<bool> {
    let surface = ctx.surface.as_ref();
    let (w, h) = (tile.width, tile.height);
    let edges: [Vec<(u32, u32)>; 4] = [
        (0..w).map(|dx| (dx, 0)).collect(),
        (0..w).map(|dx| (dx, h - 1)).collect(),
        (1..h - 1).map(|dy| (0, dy)).collect(),
        (1..h - 1).map(|dy| (w - 1, dy)).collect(),
    ];
    let mut all_black = true;
    for edge in edges {
        if ctx.halted() {
            return None;
        }
        for (dx, dy) in edge {
            let color = sampler.sample(dx, dy);
            all_black &= color.is_black();
            surface.set_pixel(tile.x + dx, tile.y + dy, color);
        }
    }
    Some(all_black)
}

/// Paint rows of `tile`, skipping `inset` pixels on every side and stepping
/// by `inc` in both directions. Each painted sample is replicated over its
/// `inc × inc` block.
fn paint_rows<S: PixelSampler>(
    ctx: &PassContext,
    tile: &RenderBox,
    sampler: &S,
    inset: u32,
    inc: u32,
) -> bool {
    let surface = ctx.surface.as_ref();
    let w = tile.width.saturating_sub(inset);
    let h = tile.height.saturating_sub(inset);
    for dy in (inset..h).step_by(inc as usize) {
        if ctx.halted() {
            return false;
        }
        for dx in (inset..w).step_by(inc as usize) {
            let color = sampler.sample(dx, dy);
            if inc == 1 {
                surface.set_pixel(tile.x + dx, tile.y + dy, color);
            } else {
                surface.fill_rect(
                    tile.x + dx,
                    tile.y + dy,
                    inc.min(w - dx),
                    inc.min(h - dy),
                    color,
                );
            }
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Viewport restored by [`FractalRenderer::reset_view`] when the settings
/// carry no per-variant defaults.
#[derive(Debug, Clone)]
struct HomeView {
    top_left: ComplexBig,
    size: ComplexBig,
    bail: f64,
}

/// Drives tiled, multithreaded render passes of one fractal into a shared
/// [`Surface`].
///
/// The configuration only changes between passes: every mutator stops the
/// running pass first.
pub struct FractalRenderer {
    settings: Settings,
    config: RenderConfig,
    kind: FractalKind,
    fractal: Box<dyn Fractal>,
    coloring: ColoringAlgorithm,
    surface: Arc<Surface>,
    boxes: Arc<Vec<RenderBoxCell>>,
    pool: WorkerPool,
    cancel: Arc<RenderCancel>,
    home: HomeView,
}

impl std::fmt::Debug for FractalRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FractalRenderer")
            .field("fractal", &self.kind.name())
            .field("coloring", &self.coloring.name)
            .field("palette", &self.config.palette.name)
            .field("image_size", &self.config.image_size)
            .field("pool", &self.pool)
            .finish()
    }
}

fn default_coloring(fractal: &dyn Fractal) -> crate::Result<ColoringAlgorithm> {
    fractal
        .coloring_algorithms()
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::UnknownColoring(format!("none offered by {}", fractal.name())).into())
}

impl FractalRenderer {
    /// A renderer for `kind` with a settings document synthesised from `config`.
    pub fn new(config: RenderConfig, kind: FractalKind) -> crate::Result<Self> {
        config.validate()?;
        let palettes = [config.palette.clone()];
        let settings = Settings::from_render_config(&config, &palettes);
        Self::build(settings, config, kind, None)
    }

    /// A renderer configured from a loaded settings document, honouring its
    /// `fractalType` and `colorFunc` selections. Names the variant does not
    /// know fall back to its defaults with a warning.
    pub fn from_settings(settings: Settings) -> crate::Result<Self> {
        let config = settings.to_render_config()?;
        let kind = settings
            .render()
            .fractal_type
            .as_deref()
            .map(FractalKind::from_name_or_default)
            .unwrap_or(FractalKind::Mandelbrot);
        let color_func = settings.render().color_func.clone();
        Self::build(settings, config, kind, color_func.as_deref())
    }

    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Self::from_settings(Settings::from_json_str(text)?)
    }

    /// Load a settings file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to read settings");
            RenderError::Io(e)
        })?;
        let renderer = Self::from_json_str(&text).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load settings");
            e
        })?;
        info!(path = %path.display(), fractal = renderer.fractal_name(), "loaded settings");
        Ok(renderer)
    }

    fn build(
        settings: Settings,
        config: RenderConfig,
        kind: FractalKind,
        color_func: Option<&str>,
    ) -> crate::Result<Self> {
        let fractal = kind.build(&config);
        let coloring = match color_func.map(|name| fractal.coloring(name)) {
            Some(Ok(coloring)) => coloring,
            Some(Err(e)) => {
                warn!(error = %e, fractal = fractal.name(), "using the default coloring");
                default_coloring(fractal.as_ref())?
            }
            None => default_coloring(fractal.as_ref())?,
        };
        let home = HomeView {
            top_left: config.frac_top_left.clone(),
            size: config.frac_size.clone(),
            bail: config.bail,
        };
        Ok(Self {
            pool: WorkerPool::new(config.num_threads)?,
            surface: Arc::new(Surface::new(config.image_size)),
            boxes: Arc::new(Vec::new()),
            cancel: Arc::new(RenderCancel::new()),
            settings,
            config,
            kind,
            fractal,
            coloring,
            home,
        })
    }

    // -- render control -----------------------------------------------------

    /// Halt the running pass and block until its workers have drained.
    pub fn stop_render(&self) {
        if self.pool.queued() > 0 {
            info!(queued = self.pool.queued(), "halting render");
        }
        self.cancel.cancel();
        self.pool.wait_for_all();
    }

    /// Start a full render pass. Returns once every tile job is queued; use
    /// [`wait`](Self::wait) to block until the pass finishes.
    pub fn render_fractal(&mut self) -> crate::Result<()> {
        if self.pool.queued() > 0 {
            warn!("render requested while a pass is running; halting it first");
        }
        self.stop_render();
        self.pool.reset(self.config.num_threads)?;

        let grid = build_tile_grid(
            self.config.image_size,
            self.config.box_size,
            self.config.draft_render,
            self.config.draft_inc,
        )?;
        let boxes: Vec<RenderBoxCell> = grid
            .into_iter()
            .map(|b| {
                RenderBoxCell::new(RenderBox {
                    state: RenderBoxState::Queued,
                    ..b
                })
            })
            .collect();
        self.boxes = Arc::new(boxes);
        self.cancel.reset_progress(self.boxes.len());

        let ctx = Arc::new(PassContext {
            config: self.config.clone(),
            fractal: Arc::from(self.fractal.clone()),
            coloring: self.coloring,
            surface: Arc::clone(&self.surface),
            boxes: Arc::clone(&self.boxes),
            cancel: Arc::clone(&self.cancel),
            generation: self.cancel.generation(),
            started: Instant::now(),
        });

        info!(
            fractal = self.kind.name(),
            coloring = self.coloring.name,
            tile_count = self.boxes.len(),
            threads = self.pool.threads(),
            precision = self.config.precision,
            draft = self.config.draft_render,
            "render started"
        );
        for index in 0..self.boxes.len() {
            let ctx = Arc::clone(&ctx);
            self.pool.enqueue(move || render_tile(&ctx, index));
        }
        Ok(())
    }

    /// Block until the current pass has finished or halted.
    pub fn wait(&self) {
        self.pool.wait_for_all();
    }

    pub fn is_rendering(&self) -> bool {
        self.pool.queued() > 0
    }

    /// `(finished tiles, total tiles)` of the current pass.
    pub fn progress(&self) -> (usize, usize) {
        self.cancel.progress()
    }

    // -- configuration --------------------------------------------------------

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings from a JSON document. On error the previous
    /// configuration is kept.
    pub fn set_config(&mut self, json: &str) -> crate::Result<()> {
        self.stop_render();
        let loaded = Settings::from_json_str(json).and_then(|s| {
            let config = s.to_render_config()?;
            Ok((s, config))
        });
        let (settings, config) = match loaded {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "rejected settings; keeping previous configuration");
                return Err(e.into());
            }
        };
        self.home = HomeView {
            top_left: config.frac_top_left.clone(),
            size: config.frac_size.clone(),
            bail: config.bail,
        };
        self.settings = settings;
        self.apply_config(config)
    }

    /// Mutate a copy of the configuration; it replaces the live one only if it
    /// validates.
    pub fn edit_config<F>(&mut self, edit: F) -> crate::Result<()>
    where
        F: FnOnce(&mut RenderConfig),
    {
        let mut next = self.config.clone();
        edit(&mut next);
        self.apply_config(next)
    }

    /// Reinstate a configuration, e.g. one taken from a history entry.
    pub fn restore_config(&mut self, config: &RenderConfig) -> crate::Result<()> {
        self.apply_config(config.clone())
    }

    fn apply_config(&mut self, next: RenderConfig) -> crate::Result<()> {
        if let Err(e) = next.validate() {
            error!(error = %e, "rejected configuration; keeping previous one");
            return Err(e.into());
        }
        self.stop_render();
        let resized = next.image_size != self.config.image_size;
        self.config = next;
        self.fractal.update_render_config(&self.config);
        if resized {
            self.regenerate_surface();
        }
        Ok(())
    }

    /// Move the viewport by its top-left corner.
    pub fn move_fractal_corner(&mut self, top_left: ComplexBig, size: ComplexBig) -> crate::Result<()> {
        self.edit_config(|c| {
            c.frac_top_left = top_left.with_precision(c.precision);
            c.frac_size = size.with_precision(c.precision);
        })
    }

    /// Move the viewport by its center.
    pub fn move_fractal_center(&mut self, center: ComplexBig, size: ComplexBig) -> crate::Result<()> {
        self.edit_config(|c| {
            let precision = c.precision;
            c.set_center(&center.with_precision(precision), &size.with_precision(precision));
        })
    }

    pub fn set_precision(&mut self, precision: u32) -> crate::Result<()> {
        self.edit_config(|c| c.set_precision(precision))
    }

    pub fn set_image_size(&mut self, size: PixelSize) -> crate::Result<()> {
        self.edit_config(|c| c.image_size = size)
    }

    /// Replace the surface with a fresh black one of the configured size and
    /// drop the tile set.
    pub fn regenerate_surface(&mut self) {
        self.stop_render();
        self.surface = Arc::new(Surface::new(self.config.image_size));
        self.boxes = Arc::new(Vec::new());
        debug!(
            width = self.config.image_size.width,
            height = self.config.image_size.height,
            "surface regenerated"
        );
    }

    pub fn zoom_factor(&self) -> f64 {
        self.config.zoom_factor()
    }

    /// Restore the variant's home viewport and bailout.
    pub fn reset_view(&mut self) -> crate::Result<()> {
        let defaults = self
            .settings
            .fractal_defaults(self.kind.name(), self.config.precision)?;
        let home = self.home.clone();
        let (top_left, size, bail) = match defaults {
            Some(d) => (
                d.frac_top_left.unwrap_or(home.top_left),
                d.frac_size.unwrap_or(home.size),
                d.bail.unwrap_or(home.bail),
            ),
            None => (home.top_left, home.size, home.bail),
        };
        self.edit_config(|c| {
            c.frac_top_left = top_left.with_precision(c.precision);
            c.frac_size = size.with_precision(c.precision);
            c.original_frac_size = c.frac_size.clone();
            c.bail = bail;
        })
    }

    /// Zoom into the pixel rectangle spanned by two corners. The current image
    /// is stretched over the surface as a preview until the next pass.
    pub fn zoom_to_pixel_rect(&mut self, a: (f64, f64), b: (f64, f64)) -> crate::Result<()> {
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        let degenerate = RenderError::InvalidDimensions {
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        };
        if !(x1 - x0 > 0.0 && y1 - y0 > 0.0) {
            return Err(degenerate);
        }
        self.stop_render();

        let precision = self.config.precision;
        let (Some(top_left), Some(step)) = (
            self.config.pixel_to_fractal_high(x0, y0),
            self.config.pixel_step_high(),
        ) else {
            return Err(degenerate);
        };
        let size = ComplexBig::from_f64(x1 - x0, y1 - y0, precision).scale_by(&step);

        let PixelSize { width, height } = self.config.image_size;
        let preview = self.surface.snapshot().stretch(x0, y0, x1, y1, width, height);
        self.surface.restore(&preview)?;

        debug!(x0, y0, x1, y1, "zoom to pixel rectangle");
        self.move_fractal_corner(top_left, size)
    }

    // -- fractal variant and coloring ---------------------------------------

    pub fn fractal_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn fractal_kind(&self) -> FractalKind {
        self.kind
    }

    /// Switch variant. The coloring algorithm is kept if the new variant
    /// offers it, otherwise its first algorithm is selected.
    pub fn set_fractal(&mut self, kind: FractalKind) -> crate::Result<()> {
        self.stop_render();
        let fractal = kind.build(&self.config);
        let coloring = match fractal.coloring(self.coloring.name) {
            Ok(c) => c,
            Err(_) => default_coloring(fractal.as_ref())?,
        };
        info!(from = self.kind.name(), to = kind.name(), coloring = coloring.name, "fractal changed");
        self.kind = kind;
        self.fractal = fractal;
        self.coloring = coloring;
        Ok(())
    }

    /// Switch variant by display name; unknown names select Mandelbrot.
    pub fn set_fractal_by_name(&mut self, name: &str) -> crate::Result<()> {
        self.set_fractal(FractalKind::from_name_or_default(name))
    }

    pub fn set_color_func(&mut self, name: &str) -> crate::Result<()> {
        let coloring = self.fractal.coloring(name).map_err(|e| {
            error!(coloring = name, fractal = self.kind.name(), "unknown coloring algorithm");
            e
        })?;
        self.stop_render();
        self.coloring = coloring;
        Ok(())
    }

    pub fn color_func_name(&self) -> &'static str {
        self.coloring.name
    }

    /// Coloring algorithms offered by the current variant, in menu order.
    pub fn color_func_names(&self) -> Vec<&'static str> {
        self.fractal
            .coloring_algorithms()
            .iter()
            .map(|c| c.name)
            .collect()
    }

    pub fn set_palette(&mut self, name: &str) -> crate::Result<()> {
        let Some(palette) = self.settings.palette(name).cloned() else {
            error!(palette = name, "unknown color palette");
            return Err(CoreError::UnknownPalette(name.to_string()).into());
        };
        self.edit_config(|c| c.palette = palette)
    }

    pub fn palette_name(&self) -> &str {
        &self.config.palette.name
    }

    pub fn palette_names(&self) -> Vec<&str> {
        self.settings
            .palettes()
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    // -- output ---------------------------------------------------------------

    /// Snapshot of the tiles of the current pass.
    pub fn render_boxes(&self) -> Vec<RenderBox> {
        self.boxes.iter().map(RenderBoxCell::snapshot).collect()
    }

    pub fn box_time_stats(&self) -> RenderBoxTimeStats {
        RenderBoxTimeStats::from_boxes(&self.render_boxes(), self.pool.threads())
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn snapshot(&self) -> RenderBuffer {
        self.surface.snapshot()
    }

    /// Write the current surface as a PNG with the viewport in its metadata.
    pub fn export_image(&self, path: &Path) -> crate::Result<()> {
        let center = self.config.frac_center();
        let meta = ExportMetadata {
            fractal_type: self.kind.name().to_string(),
            center_re: center.re.to_decimal_string(),
            center_im: center.im.to_decimal_string(),
            size_re: self.config.frac_size.re.to_decimal_string(),
            size_im: self.config.frac_size.im.to_decimal_string(),
            zoom: self.zoom_factor(),
            max_iterations: self.config.max_iters,
            precision: self.config.precision,
            bail: self.config.bail,
            anti_alias: self.config.anti_alias,
            coloring: self.coloring.name.to_string(),
            palette_name: self.config.palette.name.clone(),
        };
        export_png(&self.snapshot(), path, &meta)?;
        info!(path = %path.display(), "image exported");
        Ok(())
    }

    /// The settings document with `renderConfig` updated from the live state.
    pub fn settings_json(&self) -> crate::Result<String> {
        Ok(self.settings.export(
            &self.config,
            self.kind.name(),
            self.coloring.name,
            &self.config.palette.name,
        )?)
    }

    pub fn export_settings(&self, path: &Path) -> crate::Result<()> {
        std::fs::write(path, self.settings_json()?)?;
        info!(path = %path.display(), "settings exported");
        Ok(())
    }
}

impl Drop for FractalRenderer {
    fn drop(&mut self) {
        self.stop_render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal_core::coloring;
    use std::cell::Cell;

    /// Colors each sample by its own coordinate: red = re, green = im.
    #[derive(Clone)]
    struct CoordinateFractal {
        config: RenderConfig,
    }

    impl Fractal for CoordinateFractal {
        fn name(&self) -> &'static str {
            "Coordinates"
        }

        fn supported_optimisations(&self) -> Optimisations {
            Optimisations::NONE
        }

        fn config(&self) -> &RenderConfig {
            &self.config
        }

        fn update_render_config(&mut self, config: &RenderConfig) {
            self.config = config.clone();
        }

        fn iter_coord_low(&self, coord: Complex) -> (u64, Complex) {
            (0, coord)
        }

        fn iter_coord_high(&self, coord: &ComplexBig) -> (u64, ComplexBig) {
            (0, coord.clone())
        }

        fn color_low(&self, z: Complex, _: u64, _: &ColorPalette, _: &ColoringAlgorithm) -> Color {
            Color::rgb(z.re as f32, z.im as f32, 0.0)
        }

        fn color_high(&self, z: &ComplexBig, iters: u64, p: &ColorPalette, c: &ColoringAlgorithm) -> Color {
            self.color_low(z.to_complex(), iters, p, c)
        }

        fn coloring_algorithms(&self) -> Vec<ColoringAlgorithm> {
            vec![coloring::fixed_iteration_palette_algorithm()]
        }
    }

    /// Wraps a variant and hides its optimisations.
    #[derive(Clone)]
    struct Unoptimised(Box<dyn Fractal>);

    impl Fractal for Unoptimised {
        fn name(&self) -> &'static str {
            self.0.name()
        }

        fn supported_optimisations(&self) -> Optimisations {
            Optimisations::NONE
        }

        fn config(&self) -> &RenderConfig {
            self.0.config()
        }

        fn update_render_config(&mut self, config: &RenderConfig) {
            self.0.update_render_config(config);
        }

        fn iter_coord_low(&self, coord: Complex) -> (u64, Complex) {
            self.0.iter_coord_low(coord)
        }

        fn iter_coord_high(&self, coord: &ComplexBig) -> (u64, ComplexBig) {
            self.0.iter_coord_high(coord)
        }

        fn color_low(&self, z: Complex, n: u64, p: &ColorPalette, c: &ColoringAlgorithm) -> Color {
            self.0.color_low(z, n, p, c)
        }

        fn color_high(&self, z: &ComplexBig, n: u64, p: &ColorPalette, c: &ColoringAlgorithm) -> Color {
            self.0.color_high(z, n, p, c)
        }

        fn coloring_algorithms(&self) -> Vec<ColoringAlgorithm> {
            self.0.coloring_algorithms()
        }
    }

    fn context(config: &RenderConfig, fractal: Arc<dyn Fractal>) -> PassContext {
        let grid = build_tile_grid(
            config.image_size,
            config.box_size,
            config.draft_render,
            config.draft_inc,
        )
        .unwrap();
        let coloring = fractal.coloring_algorithms()[0];
        PassContext {
            config: config.clone(),
            fractal,
            coloring,
            surface: Arc::new(Surface::new(config.image_size)),
            boxes: Arc::new(grid.into_iter().map(RenderBoxCell::new).collect()),
            cancel: Arc::new(RenderCancel::new()),
            generation: 0,
            started: Instant::now(),
        }
    }

    /// Render every tile on the calling thread.
    fn run_pass(config: &RenderConfig, fractal: Arc<dyn Fractal>) -> RenderBuffer {
        let ctx = context(config, fractal);
        ctx.cancel.reset_progress(ctx.boxes.len());
        for i in 0..ctx.boxes.len() {
            render_tile(&ctx, i);
        }
        ctx.surface.snapshot()
    }

    fn coordinate_config(anti_alias: u32) -> RenderConfig {
        RenderConfig {
            anti_alias,
            image_size: PixelSize::new(4, 4),
            box_size: PixelSize::new(4, 4),
            frac_top_left: ComplexBig::from_f64(0.0, 0.0, 64),
            frac_size: ComplexBig::from_f64(4.0, 4.0, 64),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn single_sample_is_not_averaged() {
        let config = coordinate_config(1);
        let ctx = context(&config, Arc::new(CoordinateFractal { config: config.clone() }));
        let tile = *ctx.boxes[0].geometry();
        let sampler = LowSampler::new(&ctx, &tile, 1);
        assert_eq!(sampler.sample(1, 2), Color::rgb(1.0, 2.0, 0.0));
    }

    #[test]
    fn anti_aliasing_takes_the_mean_of_sub_samples() {
        let config = coordinate_config(2);
        let ctx = context(&config, Arc::new(CoordinateFractal { config: config.clone() }));
        let tile = *ctx.boxes[0].geometry();

        // Sub-samples at re ∈ {1, 1.5}, im ∈ {2, 2.5}; alpha is 1 for each.
        let low = LowSampler::new(&ctx, &tile, 2).sample(1, 2);
        assert_eq!(low, Color::new(1.25, 2.25, 0.0, 1.0));

        let high = HighSampler::new(&ctx, &tile, 2).unwrap().sample(1, 2);
        assert!((high.r - 1.25).abs() < 1e-6 && (high.g - 2.25).abs() < 1e-6);
    }

    #[test]
    fn outline_fill_matches_full_computation() {
        let mut config = RenderConfig {
            max_iters: 64,
            image_size: PixelSize::new(48, 32),
            box_size: PixelSize::new(8, 8),
            frac_top_left: ComplexBig::from_f64(-0.6, -0.4, 64),
            frac_size: ComplexBig::from_f64(1.2, 0.8, 64),
            ..RenderConfig::default()
        };
        let mandelbrot = FractalKind::Mandelbrot.build(&config);
        assert!(mandelbrot
            .supported_optimisations()
            .contains(Optimisations::OUTLINE));
        let fast = run_pass(&config, Arc::from(mandelbrot.clone()));
        let slow = run_pass(&config, Arc::new(Unoptimised(mandelbrot)));
        assert_eq!(fast, slow);
        assert!(fast.pixels.chunks_exact(4).any(|p| p != [0, 0, 0, 255]));

        config.frac_top_left = ComplexBig::from_f64(-0.3, -0.2, 64);
        config.frac_size = ComplexBig::from_f64(0.6, 0.4, 64);
        let julia = FractalKind::Julia.build(&config);
        let fast = run_pass(&config, Arc::from(julia.clone()));
        let slow = run_pass(&config, Arc::new(Unoptimised(julia)));
        assert_eq!(fast, slow);
    }

    #[test]
    fn halted_pass_leaves_tiles_rendering() {
        let config = coordinate_config(1);
        let ctx = context(&config, Arc::new(CoordinateFractal { config: config.clone() }));
        ctx.cancel.cancel();
        render_tile(&ctx, 0);
        assert_eq!(ctx.boxes[0].state(), RenderBoxState::Rendering);
        assert_eq!(ctx.cancel.progress().0, 0);
        assert_eq!(ctx.surface.get_rgba(1, 1), Some([0, 0, 0, 255]));
    }

    /// Cancels the pass on its first sample; counts every sample taken.
    struct CancellingSampler<'a> {
        cancel: &'a RenderCancel,
        samples: Cell<u32>,
    }

    impl PixelSampler for CancellingSampler<'_> {
        fn sample(&self, _dx: u32, _dy: u32) -> Color {
            if self.samples.get() == 0 {
                self.cancel.cancel();
            }
            self.samples.set(self.samples.get() + 1);
            Color::BLACK
        }
    }

    #[test]
    fn border_pass_stops_after_the_current_edge() {
        let config = coordinate_config(1);
        let ctx = context(&config, Arc::from(FractalKind::Mandelbrot.build(&config)));
        let tile = *ctx.boxes[0].geometry();
        let sampler = CancellingSampler {
            cancel: &ctx.cancel,
            samples: Cell::new(0),
        };
        assert!(!paint_tile(&ctx, &tile, &sampler));
        // Only the top edge is computed.
        assert_eq!(sampler.samples.get(), tile.width);
    }

    #[test]
    fn draft_tiles_replicate_samples() {
        let config = RenderConfig {
            draft_render: true,
            draft_inc: 2,
            ..coordinate_config(3)
        };
        let image = run_pass(&config, Arc::new(CoordinateFractal { config: config.clone() }));
        // Sample (2, 0) covers the 2×2 block at (2..4, 0..2); anti-aliasing is off.
        assert_eq!(image.pixel(3, 1), Color::rgb(2.0, 0.0, 0.0).to_rgba8());
        assert_eq!(image.pixel(2, 0), image.pixel(3, 1));
    }

    fn small_config() -> RenderConfig {
        RenderConfig {
            num_threads: 2,
            max_iters: 64,
            image_size: PixelSize::new(32, 24),
            box_size: PixelSize::new(8, 8),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn progress_counts_up_to_total() {
        let cancel = RenderCancel::new();
        cancel.reset_progress(2);
        assert_eq!(cancel.inc_progress(), (1, 2));
        assert_eq!(cancel.inc_progress(), (2, 2));
        assert_eq!(cancel.progress(), (2, 2));
    }

    #[test]
    fn cancel_advances_generation() {
        let cancel = RenderCancel::default();
        let g = cancel.generation();
        cancel.cancel();
        assert_eq!(cancel.generation(), g + 1);
    }

    #[test]
    fn full_pass_renders_every_tile() {
        let mut r = FractalRenderer::new(small_config(), FractalKind::Mandelbrot).unwrap();
        r.render_fractal().unwrap();
        r.wait();

        let boxes = r.render_boxes();
        assert_eq!(boxes.len(), 4 * 3);
        assert!(boxes.iter().all(|b| b.state == RenderBoxState::Rendered));
        assert_eq!(r.progress(), (12, 12));
        assert_eq!(r.box_time_stats().completed, 12);
        assert!(!r.is_rendering());
    }

    #[test]
    fn switching_variant_keeps_shared_coloring() {
        let mut r = FractalRenderer::new(small_config(), FractalKind::Mandelbrot).unwrap();
        r.set_color_func(coloring::STEPPED_GRADIENTS).unwrap();
        r.set_fractal(FractalKind::Julia).unwrap();
        assert_eq!(r.color_func_name(), coloring::STEPPED_GRADIENTS);

        r.set_fractal(FractalKind::Newton).unwrap();
        assert_eq!(r.color_func_name(), r.color_func_names()[0]);
        assert!(!r
            .color_func_names()
            .contains(&coloring::LOGARITHMIC_SCALING));
    }

    #[test]
    fn invalid_edit_keeps_previous_config() {
        let mut r = FractalRenderer::new(small_config(), FractalKind::Mandelbrot).unwrap();
        assert!(r.edit_config(|c| c.max_iters = 0).is_err());
        assert_eq!(r.config().max_iters, 64);
        assert!(r.set_color_func("Nope").is_err());
        assert!(r.set_palette("Nope").is_err());
    }

    #[test]
    fn resizing_regenerates_surface() {
        let mut r = FractalRenderer::new(small_config(), FractalKind::Mandelbrot).unwrap();
        r.render_fractal().unwrap();
        r.wait();
        r.set_image_size(PixelSize::new(10, 5)).unwrap();
        assert_eq!(r.surface().size(), PixelSize::new(10, 5));
        assert!(r.render_boxes().is_empty());
    }
}
