//! Terminal graphics for rendered diagrams.
//!
//! Picks the best protocol the terminal offers (Kitty, Sixel, iTerm2, or
//! Unicode half-blocks) and turns a rasterized diagram into a ratatui-image
//! protocol ready to draw.

use std::time::Duration;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use ratatui_image::picker::{Picker, ProtocolType};
#[cfg(unix)]
use ratatui_image::picker::cap_parser::QueryStdioOptions;
use ratatui_image::protocol::StatefulProtocol;

const PICKER_QUERY_TIMEOUT_MS: u64 = 250;

/// Create a picker for terminal image rendering.
///
/// Must run before the terminal enters raw mode, since it queries stdio.
pub fn create_picker(force_half_cell: bool) -> Option<Picker> {
    if force_half_cell {
        crate::perf::log_event("image.picker", "force_half_cell=true protocol=Halfblocks");
        return Some(Picker::halfblocks());
    }

    // The stdio capability query can leave an orphaned reader on the Windows
    // console input buffer; half-blocks always work.
    #[cfg(not(unix))]
    {
        crate::perf::log_event("image.picker", "windows fallback protocol=Halfblocks");
        return Some(Picker::halfblocks());
    }

    #[cfg(unix)]
    {
        match Picker::from_query_stdio_with_options(query_options()) {
            Ok(picker) => {
                crate::perf::log_event(
                    "image.picker",
                    format!(
                        "term={} colorterm={} protocol={:?}",
                        std::env::var("TERM").unwrap_or_else(|_| "<unset>".to_string()),
                        std::env::var("COLORTERM").unwrap_or_else(|_| "<unset>".to_string()),
                        picker.protocol_type()
                    ),
                );
                Some(picker)
            }
            Err(err) => {
                tracing::warn!(error = %err, "terminal graphics query failed; using half-blocks");
                Some(Picker::halfblocks())
            }
        }
    }
}

/// Build a drawable protocol for a rasterized diagram.
pub fn diagram_protocol(picker: &Picker, image: &DynamicImage) -> StatefulProtocol {
    let halfblocks = matches!(picker.protocol_type(), ProtocolType::Halfblocks);
    let source = if halfblocks && !supports_truecolor_terminal() {
        quantize_to_ansi256(image)
    } else {
        image.clone()
    };
    picker.new_resize_protocol(source)
}

/// Whether terminal output should be treated as truecolor-capable.
pub fn supports_truecolor_terminal() -> bool {
    if let Ok(force) = std::env::var("CODEATLAS_TRUECOLOR") {
        let value = force.to_ascii_lowercase();
        return matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    if std::env::var("TERM_PROGRAM")
        .ok()
        .as_deref()
        .is_some_and(|v| v == "Apple_Terminal")
    {
        return false;
    }
    supports_truecolor_from_env(
        std::env::var("COLORTERM").ok().as_deref(),
        std::env::var("TERM").ok().as_deref(),
    )
}

/// Quantize image RGB channels to the ANSI-256 palette while preserving alpha.
pub fn quantize_to_ansi256(image: &DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mut out = RgbaImage::new(width, height);
    let src = image.to_rgba8();

    for (x, y, px) in src.enumerate_pixels() {
        let idx = rgb_to_xterm_cube(px[0], px[1], px[2]);
        let (r, g, b) = xterm_cube_to_rgb(idx);
        out.put_pixel(x, y, Rgba([r, g, b, px[3]]));
    }

    DynamicImage::ImageRgba8(out)
}

#[cfg(unix)]
fn query_options() -> QueryStdioOptions {
    let mut options = QueryStdioOptions::default();
    options.timeout = Duration::from_millis(PICKER_QUERY_TIMEOUT_MS);
    options
}

fn supports_truecolor_from_env(colorterm: Option<&str>, term: Option<&str>) -> bool {
    let has = |value: Option<&str>, needles: &[&str]| {
        value.is_some_and(|v| {
            let lower = v.to_ascii_lowercase();
            needles.iter().any(|needle| lower.contains(needle))
        })
    };
    has(colorterm, &["truecolor", "24bit"]) || has(term, &["direct", "truecolor"])
}

/// Index into the 6x6x6 color cube of the xterm palette.
#[allow(clippy::cast_possible_truncation)]
fn rgb_to_xterm_cube(r: u8, g: u8, b: u8) -> u8 {
    let to_cube = |v: u8| ((u16::from(v) * 5) / 255) as u8;
    16 + (36 * to_cube(r)) + (6 * to_cube(g)) + to_cube(b)
}

fn xterm_cube_to_rgb(i: u8) -> (u8, u8, u8) {
    let i = i.saturating_sub(16);
    let to_val = |c: u8| if c == 0 { 0 } else { 55 + c * 40 };
    (to_val((i / 36) % 6), to_val((i / 6) % 6), to_val(i % 6))
}
