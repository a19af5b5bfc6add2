//! Pixel comparison between two captured rasters
//!
//! Decodes two PNG buffers, validates that their dimensions agree, and walks
//! both grids pixel by pixel. Matching pixels are painted as a muted
//! grayscale rendering of the base image so the diff keeps its context;
//! differing pixels are painted solid red. The whole step is pure and
//! synchronous: fixed inputs always produce the same variant, count, and
//! diff bytes.

use crate::{Error, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// Matching tolerance of the YIQ color-distance metric. 35215 is the largest
// delta the metric can produce; 0.1 is the default pixel-matching threshold
// and is not exposed on the CLI.
const DIFF_THRESHOLD: f64 = 0.1;
const MAX_YIQ_DELTA: f64 = 35215.0;

// Opacity of the grayscale rendering used for matching pixels.
const MATCH_FADE: f64 = 0.1;

/// Outcome of comparing two rasters
///
/// `DimensionMismatch` is data, not an error: per-pixel comparison is
/// undefined when the grids are not congruent, and callers branch on it
/// without error machinery. `Different` always carries a nonzero count; a
/// zero-pixel diff is reclassified as `Identical` and its image discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Every pixel matched within tolerance
    Identical,
    /// Widths or heights differ; no pixel comparison was attempted
    DimensionMismatch,
    /// `pixels` positions differed; `diff` is the encoded visual diff map
    Different { pixels: u64, diff: Vec<u8> },
}

/// Compare two encoded PNG buffers.
///
/// Decode failure is fatal ([`Error::Decode`]), not a comparison outcome.
pub fn compare(a: &[u8], b: &[u8]) -> Result<Comparison> {
    let base = decode_png(a)?;
    let candidate = decode_png(b)?;
    compare_rasters(&base, &candidate)
}

/// Compare two decoded RGBA grids.
///
/// The diff image treats `base` as the reference side: its pixels provide the
/// grayscale context where the grids match.
pub fn compare_rasters(base: &RgbaImage, candidate: &RgbaImage) -> Result<Comparison> {
    if base.dimensions() != candidate.dimensions() {
        return Ok(Comparison::DimensionMismatch);
    }

    let (width, height) = base.dimensions();
    let mut diff = RgbaImage::new(width, height);
    let mut pixels = 0u64;

    let max_delta = MAX_YIQ_DELTA * DIFF_THRESHOLD * DIFF_THRESHOLD;

    for (x, y, base_px) in base.enumerate_pixels() {
        let candidate_px = candidate.get_pixel(x, y);

        // Byte-equal pixels short-circuit the color metric.
        if base_px != candidate_px && color_delta(*base_px, *candidate_px) > max_delta {
            pixels += 1;
            diff.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        } else {
            diff.put_pixel(x, y, faded(*base_px));
        }
    }

    if pixels == 0 {
        return Ok(Comparison::Identical);
    }

    Ok(Comparison::Different {
        pixels,
        diff: encode_png(&diff)?,
    })
}

/// Decode PNG bytes into an RGBA grid.
pub fn decode_png(data: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Encode an RGBA grid to PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Squared color distance in YIQ space between two pixels.
fn color_delta(a: Rgba<u8>, b: Rgba<u8>) -> f64 {
    let (r1, g1, b1) = flatten(a);
    let (r2, g2, b2) = flatten(b);

    let dy = rgb2y(r1, g1, b1) - rgb2y(r2, g2, b2);
    let di = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let dq = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    0.5053 * dy * dy + 0.299 * di * di + 0.1957 * dq * dq
}

// Semi-transparent pixels are composited over white before the distance is
// taken, matching how they render on the default page background.
fn flatten(px: Rgba<u8>) -> (f64, f64, f64) {
    let [r, g, b, a] = px.0;
    if a == 255 {
        return (r as f64, g as f64, b as f64);
    }
    let alpha = a as f64 / 255.0;
    (
        blend(r as f64, alpha),
        blend(g as f64, alpha),
        blend(b as f64, alpha),
    )
}

/// Muted grayscale marker for a matching pixel.
fn faded(px: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = px.0;
    let gray = rgb2y(r as f64, g as f64, b as f64);
    let value = blend(gray, MATCH_FADE * a as f64 / 255.0) as u8;
    Rgba([value, value, value, 255])
}

fn blend(color: f64, alpha: f64) -> f64 {
    255.0 + (color - 255.0) * alpha
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}
