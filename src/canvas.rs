use crate::font::FontId;
use crate::types::{Color, Pt, Rect, Size};

/// One recorded drawing operation. Coordinates use a top-left origin;
/// the PDF writer flips them into device space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillColor(Color),
    StrokeColor(Color),
    LineWidth(Pt),
    Font {
        id: FontId,
        size: Pt,
    },
    /// Text positioned at its baseline.
    Text {
        x: Pt,
        y: Pt,
        text: String,
    },
    Rect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        fill: bool,
        stroke: bool,
    },
    Line {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
    },
    Image {
        rect: Rect,
        image: ImageRef,
    },
}

/// Index into [`RenderedDoc::images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef(pub(crate) usize);

/// Decoded 8-bit RGB pixels ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPage {
    pub ops: Vec<DrawOp>,
}

/// The finished page sequence plus its image table. Either pagination
/// strategy produces this; a raster band page holds exactly one
/// `Image` op.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDoc {
    pub page_size: Size,
    pub pages: Vec<RenderedPage>,
    pub images: Vec<EmbeddedImage>,
}

#[derive(Clone)]
struct DrawState {
    fill_color: Color,
    font: Option<(FontId, Pt)>,
}

impl DrawState {
    fn fresh() -> Self {
        Self {
            fill_color: Color::BLACK,
            font: None,
        }
    }
}

/// Records draw ops page by page. Redundant fill-color and font changes
/// are suppressed; state resets at each page boundary.
pub struct PageCanvas {
    page_size: Size,
    pages: Vec<RenderedPage>,
    current: RenderedPage,
    images: Vec<EmbeddedImage>,
    state: DrawState,
}

impl PageCanvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: RenderedPage::default(),
            images: Vec::new(),
            state: DrawState::fresh(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn pages_emitted(&self) -> usize {
        self.pages.len()
    }

    pub fn set_fill_color(&mut self, color: Color) {
        // PDF's device default is black, so an initial black set is a no-op.
        if self.state.fill_color == color {
            return;
        }
        self.state.fill_color = color;
        self.current.ops.push(DrawOp::FillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.current.ops.push(DrawOp::StrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        self.current.ops.push(DrawOp::LineWidth(width.max(Pt::ZERO)));
    }

    pub fn set_font(&mut self, id: FontId, size: Pt) {
        if self.state.font == Some((id, size)) {
            return;
        }
        self.state.font = Some((id, size));
        self.current.ops.push(DrawOp::Font { id, size });
    }

    pub fn text(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.ops.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
        });
    }

    pub fn fill_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill: true,
            stroke: false,
        });
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.current.ops.push(DrawOp::Line { x1, y1, x2, y2 });
    }

    pub fn register_image(&mut self, image: EmbeddedImage) -> ImageRef {
        self.images.push(image);
        ImageRef(self.images.len() - 1)
    }

    pub fn draw_image(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, image: ImageRef) {
        self.current.ops.push(DrawOp::Image {
            rect: Rect {
                x,
                y,
                width,
                height,
            },
            image,
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::take(&mut self.current);
        self.pages.push(current);
        self.state = DrawState::fresh();
    }

    /// Closes the in-progress page (an empty document still gets one
    /// blank page) and returns the finished sequence.
    pub fn finish(mut self) -> RenderedDoc {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        RenderedDoc {
            page_size: self.page_size,
            pages: self.pages,
            images: self.images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_state_changes_are_suppressed() {
        let mut canvas = PageCanvas::new(Size::letter());
        canvas.set_font(FontId::Helvetica, Pt::from_f32(9.0));
        canvas.set_font(FontId::Helvetica, Pt::from_f32(9.0));
        canvas.set_font(FontId::HelveticaBold, Pt::from_f32(9.0));
        let doc = canvas.finish();
        let fonts = doc.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Font { .. }))
            .count();
        assert_eq!(fonts, 2);
    }

    #[test]
    fn state_resets_at_page_boundaries() {
        let mut canvas = PageCanvas::new(Size::letter());
        canvas.set_font(FontId::Helvetica, Pt::from_f32(9.0));
        canvas.text(Pt::ZERO, Pt::ZERO, "a");
        canvas.show_page();
        canvas.set_font(FontId::Helvetica, Pt::from_f32(9.0));
        canvas.text(Pt::ZERO, Pt::ZERO, "b");
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 2);
        assert!(doc.pages[1]
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Font { .. })));
    }

    #[test]
    fn finish_emits_a_blank_page_for_an_empty_canvas() {
        let doc = PageCanvas::new(Size::letter()).finish();
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages[0].ops.is_empty());
    }

    #[test]
    fn image_refs_index_the_image_table() {
        let mut canvas = PageCanvas::new(Size::letter());
        let image = canvas.register_image(EmbeddedImage {
            rgb: vec![255, 0, 0],
            width: 1,
            height: 1,
        });
        canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(10.0), Pt::from_f32(10.0), image);
        let doc = canvas.finish();
        assert_eq!(doc.images.len(), 1);
        match &doc.pages[0].ops[0] {
            DrawOp::Image { image, .. } => assert_eq!(image.0, 0),
            other => panic!("unexpected op {:?}", other),
        }
    }
}
