use crate::types::Pt;

/// The base-14 faces the engine draws with. Fonts are selected by this
/// enum everywhere; the PDF resource name and BaseFont string are derived
/// from it, never looked up by string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontId {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl FontId {
    pub const ALL: [FontId; 3] = [
        FontId::Helvetica,
        FontId::HelveticaBold,
        FontId::HelveticaOblique,
    ];

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            FontId::Helvetica => "Helvetica",
            FontId::HelveticaBold => "Helvetica-Bold",
            FontId::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            FontId::Helvetica => "F1",
            FontId::HelveticaBold => "F2",
            FontId::HelveticaOblique => "F3",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            // Oblique shares the regular advance widths.
            FontId::Helvetica | FontId::HelveticaOblique => &HELVETICA_WIDTHS,
            FontId::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    fn missing_width(self) -> u16 {
        match self {
            FontId::Helvetica | FontId::HelveticaOblique => 556,
            FontId::HelveticaBold => 611,
        }
    }
}

/// AFM advance widths for the printable ASCII range (0x20..=0x7E),
/// in 1/1000 em.
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333,
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278,
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn char_advance(font: FontId, ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        font.widths()[(code - 0x20) as usize]
    } else {
        font.missing_width()
    }
}

/// Advance width of `text` at `size`.
pub fn text_width(font: FontId, size: Pt, text: &str) -> Pt {
    let units: i64 = text.chars().map(|c| char_advance(font, c) as i64).sum();
    // units are 1/1000 em; scale into millipoints without going through f32.
    Pt::from_milli_i64(units.saturating_mul(size.to_milli_i64()) / 1000)
}

/// Greedy word wrap into lines no wider than `max_width`. Words wider
/// than a full line are broken at character boundaries.
pub fn wrap_text(font: FontId, size: Pt, max_width: Pt, text: &str) -> Vec<String> {
    let space_width = text_width(font, size, " ");
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = Pt::ZERO;

    for word in text.split_whitespace() {
        let word_width = text_width(font, size, word);

        if word_width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = Pt::ZERO;
            }
            let mut chunk = String::new();
            let mut chunk_width = Pt::ZERO;
            for c in word.chars() {
                let w = text_width(font, size, c.encode_utf8(&mut [0; 4]));
                if chunk_width + w > max_width && !chunk.is_empty() {
                    lines.push(std::mem::take(&mut chunk));
                    chunk_width = Pt::ZERO;
                }
                chunk.push(c);
                chunk_width += w;
            }
            current = chunk;
            current_width = chunk_width;
            continue;
        }

        if current.is_empty() {
            current = word.to_string();
            current_width = word_width;
        } else if current_width + space_width + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space_width + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_scales_with_font_size() {
        let narrow = text_width(FontId::Helvetica, Pt::from_f32(10.0), "invoice");
        let wide = text_width(FontId::Helvetica, Pt::from_f32(20.0), "invoice");
        assert_eq!(wide.to_milli_i64(), narrow.to_milli_i64() * 2);
    }

    #[test]
    fn bold_runs_at_least_as_wide_as_regular() {
        for text in ["Subtotal", "Balance Due", "Q-2024"] {
            let regular = text_width(FontId::Helvetica, Pt::from_f32(9.0), text);
            let bold = text_width(FontId::HelveticaBold, Pt::from_f32(9.0), text);
            assert!(bold >= regular, "{} bold narrower than regular", text);
        }
    }

    #[test]
    fn digits_share_a_tabular_width() {
        let size = Pt::from_f32(9.0);
        let w0 = text_width(FontId::Helvetica, size, "0");
        for d in ["1", "2", "3", "4", "5", "6", "7", "8", "9"] {
            assert_eq!(text_width(FontId::Helvetica, size, d), w0);
        }
    }

    #[test]
    fn wrapped_lines_fit_the_limit() {
        let size = Pt::from_f32(8.0);
        let max = Pt::from_f32(120.0);
        let text = "Around-the-clock mobile patrol coverage for the warehouse \
                    district including weekend escalation response";
        let lines = wrap_text(FontId::Helvetica, size, max, text);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(FontId::Helvetica, size, line) <= max, "{:?}", line);
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined.split_whitespace().count(), text.split_whitespace().count());
    }

    #[test]
    fn overlong_word_breaks_at_character_boundaries() {
        let size = Pt::from_f32(8.0);
        let max = Pt::from_f32(40.0);
        let lines = wrap_text(FontId::Helvetica, size, max, "AAAAAAAAAAAAAAAAAAAAAAAA");
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(FontId::Helvetica, size, line) <= max);
        }
    }

    #[test]
    fn empty_text_wraps_to_one_empty_line() {
        let lines = wrap_text(FontId::Helvetica, Pt::from_f32(8.0), Pt::from_f32(100.0), "");
        assert_eq!(lines, vec![String::new()]);
    }
}
