//! PNG export with embedded metadata (tEXt chunks).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use crate::buffer::RenderBuffer;

pub const SOFTWARE: &str = "fractal-renderer";

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub fractal_type: String,
    pub center_re: String,
    pub center_im: String,
    pub size_re: String,
    pub size_im: String,
    pub zoom: f64,
    pub max_iterations: u64,
    pub precision: u32,
    pub bail: f64,
    pub anti_alias: u32,
    pub coloring: String,
    pub palette_name: String,
}

/// Write an RGBA buffer as a PNG file with embedded fractal metadata.
///
/// Uses the `png` crate directly to inject custom tEXt chunks readable by
/// exiftool and most image viewers.
pub fn export_png(image: &RenderBuffer, path: &Path, metadata: &ExportMetadata) -> crate::Result<()> {
    let writer = BufWriter::new(File::create(path)?);

    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), SOFTWARE.to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&image.pixels)?;
    png_writer.finish()?;

    debug!(
        width = image.width,
        height = image.height,
        path = %path.display(),
        "exported PNG"
    );
    Ok(())
}

fn build_description(meta: &ExportMetadata) -> String {
    format!(
        "{} - Center: {} {}i, Zoom: {}, Iterations: {}",
        meta.fractal_type, meta.center_re, meta.center_im, meta.zoom, meta.max_iterations,
    )
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    vec![
        ("Fractal.Type".into(), meta.fractal_type.clone()),
        ("Fractal.CenterRe".into(), meta.center_re.clone()),
        ("Fractal.CenterIm".into(), meta.center_im.clone()),
        ("Fractal.SizeRe".into(), meta.size_re.clone()),
        ("Fractal.SizeIm".into(), meta.size_im.clone()),
        ("Fractal.Zoom".into(), meta.zoom.to_string()),
        ("Fractal.MaxIterations".into(), meta.max_iterations.to_string()),
        ("Fractal.Precision".into(), meta.precision.to_string()),
        ("Fractal.Bailout".into(), meta.bail.to_string()),
        ("Fractal.AntiAlias".into(), meta.anti_alias.to_string()),
        ("Fractal.Coloring".into(), meta.coloring.clone()),
        ("Fractal.Palette".into(), meta.palette_name.clone()),
    ]
}
