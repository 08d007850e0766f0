mod cli;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use fractal_core::{FractalKind, RenderConfig};
use fractal_render::{FractalRenderer, HistoryBuffer};

use cli::Args;

/// Upper bound on kept zoom steps; each one holds a full image.
const MAX_HISTORY: usize = 64;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting fractal-renderer");
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fractal-renderer failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> fractal_render::Result<()> {
    let mut renderer = match &args.settings {
        Some(path) => FractalRenderer::load(path)?,
        None => FractalRenderer::new(RenderConfig::default(), FractalKind::Mandelbrot)?,
    };
    args.apply(&mut renderer)?;

    if args.list {
        print_choices(&renderer);
        return Ok(());
    }

    let mut history = HistoryBuffer::with_max_entries(MAX_HISTORY);
    render(&mut renderer)?;
    history.append(renderer.config().clone(), renderer.snapshot());

    for rect in &args.zoom {
        renderer.zoom_to_pixel_rect(rect.top_left, rect.bottom_right)?;
        render(&mut renderer)?;
        history.append(renderer.config().clone(), renderer.snapshot());
    }

    for _ in 0..args.undo {
        if !history.undo() {
            break;
        }
    }
    if let Some(entry) = history.current() {
        if history.current_index() != Some(history.len() - 1) {
            renderer.restore_config(&entry.config)?;
            renderer.surface().restore(&entry.surface)?;
            info!(
                step = history.current_index(),
                steps = history.len(),
                "restored earlier zoom step"
            );
        }
    }

    renderer.export_image(&args.output)?;
    if let Some(path) = &args.settings_out {
        renderer.export_settings(path)?;
    }
    Ok(())
}

fn render(renderer: &mut FractalRenderer) -> fractal_render::Result<()> {
    renderer.render_fractal()?;
    renderer.wait();

    let stats = renderer.box_time_stats();
    info!(
        fractal = renderer.fractal_name(),
        coloring = renderer.color_func_name(),
        palette = renderer.palette_name(),
        zoom = renderer.zoom_factor(),
        tiles = stats.total,
        min_ms = stats.min.as_secs_f64() * 1e3,
        avg_ms = stats.average.as_secs_f64() * 1e3,
        max_ms = stats.max.as_secs_f64() * 1e3,
        "pass finished"
    );
    Ok(())
}

fn print_choices(renderer: &FractalRenderer) {
    println!("Fractals:");
    for kind in FractalKind::ALL {
        println!("  {}", kind.name());
    }
    println!("Coloring algorithms for {}:", renderer.fractal_name());
    for name in renderer.color_func_names() {
        println!("  {name}");
    }
    println!("Palettes:");
    for name in renderer.palette_names() {
        println!("  {name}");
    }
}
