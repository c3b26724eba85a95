use crate::canvas::{EmbeddedImage, PageCanvas, RenderedDoc};
use crate::capture::CaptureFrame;
use crate::error::ExportError;
use crate::types::{Pt, Size};
use log::debug;
use tiny_skia::{IntRect, Pixmap};

/// One page-sized horizontal band cut from the captured bitmap.
pub(crate) struct BandPage {
    pub pixmap: Pixmap,
    /// Band height converted back to page units through the width ratio.
    pub display_height: Pt,
}

/// Slice plan for a canvas of `canvas_height` pixels cut into bands of
/// `slice_height` pixels: every band is full-height except the last,
/// which absorbs the remainder. The heights always sum to
/// `canvas_height` exactly, and the band count is
/// `canvas_height.div_ceil(slice_height)`.
pub(crate) fn band_heights(canvas_height: u32, slice_height: u32) -> Vec<u32> {
    if canvas_height == 0 || slice_height == 0 {
        return Vec::new();
    }
    let mut bands = Vec::with_capacity(canvas_height.div_ceil(slice_height) as usize);
    let mut y = 0u32;
    while y < canvas_height {
        let height = slice_height.min(canvas_height - y);
        bands.push(height);
        y += height;
    }
    bands
}

/// Cuts the captured bitmap into page-height bands.
///
/// `ratio = canvas_width_px / page_width_pt` couples the bitmap's pixel
/// resolution to the page's physical width; every vertical measurement
/// converts through it. Band boundaries are purely geometric — content
/// rows in the capture can land across two pages.
pub(crate) fn slice_frame(
    frame: &CaptureFrame,
    page_size: Size,
) -> Result<Vec<BandPage>, ExportError> {
    let canvas_width = frame.pixmap.width();
    let canvas_height = frame.pixmap.height();
    let page_width = page_size.width.to_f32() as f64;
    let page_height = page_size.height.to_f32() as f64;
    if page_width <= 0.0 || page_height <= 0.0 {
        return Err(ExportError::Render("page size is degenerate".to_string()));
    }

    let ratio = canvas_width as f64 / page_width;
    // Captures quantize to whole pixels; the nudge keeps an exact
    // integer product from ceiling up on float fuzz.
    let slice_height = (((page_height * ratio) - 1e-6).ceil() as u32).max(1);
    let heights = band_heights(canvas_height, slice_height);
    debug!(
        "slicing {}x{} capture into {} band(s) of {}px",
        canvas_width,
        canvas_height,
        heights.len(),
        slice_height
    );

    let mut bands = Vec::with_capacity(heights.len());
    let mut source_y = 0u32;
    for height in heights {
        let rect = IntRect::from_xywh(0, source_y as i32, canvas_width, height)
            .ok_or_else(|| ExportError::Render("band rectangle out of range".to_string()))?;
        let pixmap = frame
            .pixmap
            .clone_rect(rect)
            .ok_or_else(|| ExportError::Render("band copy failed".to_string()))?;
        bands.push(BandPage {
            pixmap,
            display_height: Pt::from_f32((height as f64 / ratio) as f32),
        });
        source_y += height;
    }
    Ok(bands)
}

/// Assembles band pages into the shared page representation: one page
/// per band, each holding a single full-width image op.
pub(crate) fn bands_to_doc(bands: Vec<BandPage>, page_size: Size) -> RenderedDoc {
    let mut canvas = PageCanvas::new(page_size);
    for band in bands {
        let image = canvas.register_image(flatten_rgb(&band.pixmap));
        canvas.draw_image(
            Pt::ZERO,
            Pt::ZERO,
            page_size.width,
            band.display_height.min(page_size.height),
            image,
        );
        canvas.show_page();
    }
    canvas.finish()
}

/// Premultiplied RGBA to plain 8-bit RGB on white.
fn flatten_rgb(pixmap: &Pixmap) -> EmbeddedImage {
    let mut rgb = Vec::with_capacity(pixmap.pixels().len() * 3);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        let alpha = color.alpha() as u16;
        let blend = |channel: u8| -> u8 {
            ((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        rgb.push(blend(color.red()));
        rgb.push(blend(color.green()));
        rgb.push(blend(color.blue()));
    }
    EmbeddedImage {
        rgb,
        width: pixmap.width(),
        height: pixmap.height(),
    }
}
