use crate::canvas::{DrawOp, EmbeddedImage, PageCanvas, RenderedDoc};
use crate::document::{DocumentKind, DocumentModel, SystemConfig};
use crate::font::{self, FontId};
use crate::money::Money;
use crate::types::{Color, Margins, Pt, Size};
use log::debug;

/// Colors used by the vector layout. The brand fill covers the page-1
/// header band; owing/settled drive the balance-due color coding.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStyle {
    pub brand: Color,
    pub on_brand: Color,
    pub text: Color,
    pub muted: Color,
    pub rule: Color,
    pub table_fill: Color,
    pub owing: Color,
    pub settled: Color,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            brand: Color::rgb(0.10, 0.16, 0.28),
            on_brand: Color::WHITE,
            text: Color::BLACK,
            muted: Color::rgb(0.42, 0.42, 0.42),
            rule: Color::rgb(0.85, 0.85, 0.85),
            table_fill: Color::rgb(0.93, 0.94, 0.96),
            owing: Color::rgb(0.90, 0.49, 0.13),
            settled: Color::rgb(0.15, 0.62, 0.38),
        }
    }
}

const HEADER_BAND_HEIGHT: f32 = 88.0;
const LOGO_BOX_HEIGHT: f32 = 48.0;
const LOGO_BOX_WIDTH: f32 = 120.0;
const ROW_BASE_HEIGHT: f32 = 14.0;
const DESCRIPTION_LEADING: f32 = 9.0;
const NOTES_LEADING: f32 = 11.0;
const LEGAL_LEADING: f32 = 9.0;

fn pt(value: f32) -> Pt {
    Pt::from_f32(value)
}

fn dollars(amount: Money) -> String {
    format!("${}", amount.format())
}

/// Right-edge x positions for the line-item table columns.
struct TableColumns {
    name_x: Pt,
    name_width: Pt,
    unit_x: Pt,
    qty_right: Pt,
    price_right: Pt,
    amount_right: Pt,
}

impl TableColumns {
    fn compute(page: Size, margins: Margins) -> Self {
        let amount_right = page.width - margins.right;
        let price_right = amount_right - pt(78.0);
        let qty_right = price_right - pt(70.0);
        let unit_x = qty_right - pt(92.0);
        let name_x = margins.left;
        Self {
            name_x,
            name_width: unit_x - name_x - pt(10.0),
            unit_x,
            qty_right,
            price_right,
            amount_right,
        }
    }
}

/// Cursor-driven top-to-bottom flow. A break closes the current page
/// and resets the cursor to the top margin; pages after the first carry
/// no header band.
struct PageFlow {
    canvas: PageCanvas,
    page: Size,
    margins: Margins,
    y: Pt,
}

impl PageFlow {
    fn new(page: Size, margins: Margins) -> Self {
        Self {
            canvas: PageCanvas::new(page),
            page,
            margins,
            y: margins.top,
        }
    }

    fn bottom_limit(&self) -> Pt {
        self.page.height - self.margins.bottom
    }

    fn break_page(&mut self) {
        self.canvas.show_page();
        self.y = self.margins.top;
    }

    /// Breaks the page unless `needed` more points fit above the bottom
    /// margin.
    fn ensure_room(&mut self, needed: Pt) {
        if self.y + needed > self.bottom_limit() {
            self.break_page();
        }
    }
}

/// Draws the document into a finished page sequence. Row-aware: a line
/// item (name plus all wrapped description lines) never splits across a
/// page boundary.
pub(crate) fn paginate(
    document: &DocumentModel,
    branding: &SystemConfig,
    logo: Option<&EmbeddedImage>,
    page: Size,
    margins: Margins,
    style: &LayoutStyle,
) -> RenderedDoc {
    let mut flow = PageFlow::new(page, margins);
    let columns = TableColumns::compute(page, margins);

    draw_header_band(&mut flow, branding, logo, style);
    draw_metadata(&mut flow, document, style);
    draw_recipient(&mut flow, document, style);
    draw_table_header(&mut flow, &columns, style);
    for item in &document.line_items {
        draw_line_item(&mut flow, &columns, item, style);
    }
    draw_totals(&mut flow, &columns, document, style);
    draw_notes(&mut flow, document, style);
    draw_footer_content(&mut flow, document, style);

    let rendered = flow.canvas.finish();
    debug!(
        "document {} paginated into {} page(s)",
        document.number,
        rendered.pages.len()
    );
    rendered
}

/// Page-1 brand band: color fill, logo when loaded, company identity on
/// the left, contact lines right-aligned.
fn draw_header_band(
    flow: &mut PageFlow,
    branding: &SystemConfig,
    logo: Option<&EmbeddedImage>,
    style: &LayoutStyle,
) {
    let band_height = pt(HEADER_BAND_HEIGHT);
    flow.canvas.set_fill_color(style.brand);
    flow.canvas
        .fill_rect(Pt::ZERO, Pt::ZERO, flow.page.width, band_height);

    let mut text_x = flow.margins.left;
    if let Some(logo) = logo {
        let scale = (LOGO_BOX_HEIGHT / logo.height as f32)
            .min(LOGO_BOX_WIDTH / logo.width as f32)
            .min(1.0);
        let width = pt(logo.width as f32 * scale);
        let height = pt(logo.height as f32 * scale);
        let top = pt((HEADER_BAND_HEIGHT - logo.height as f32 * scale) / 2.0);
        let image = flow.canvas.register_image(logo.clone());
        flow.canvas
            .draw_image(flow.margins.left, top, width, height, image);
        text_x += width + pt(14.0);
    }

    flow.canvas.set_fill_color(style.on_brand);
    flow.canvas.set_font(FontId::HelveticaBold, pt(16.0));
    flow.canvas.text(text_x, pt(38.0), &branding.company_name);
    if let Some(tagline) = &branding.tagline {
        flow.canvas.set_font(FontId::HelveticaOblique, pt(9.0));
        flow.canvas.text(text_x, pt(54.0), tagline);
    }

    let contact_lines: Vec<&str> = [
        branding.phone.as_deref(),
        branding.email.as_deref(),
        branding.website.as_deref(),
    ]
    .into_iter()
    .flatten()
    .chain(branding.address_lines.iter().map(String::as_str))
    .collect();

    flow.canvas.set_font(FontId::Helvetica, pt(8.0));
    let right_edge = flow.page.width - flow.margins.right;
    let mut baseline = pt(26.0);
    for line in contact_lines {
        let width = font::text_width(FontId::Helvetica, pt(8.0), line);
        flow.canvas.text(right_edge - width, baseline, line);
        baseline += pt(11.0);
    }

    flow.y = band_height + pt(26.0);
}

fn draw_metadata(flow: &mut PageFlow, document: &DocumentModel, style: &LayoutStyle) {
    let (title, number_label, expiry_label) = match document.kind {
        DocumentKind::Quote => ("QUOTE", "Quote #", "Valid Until"),
        DocumentKind::Invoice => ("INVOICE", "Invoice #", "Due Date"),
    };

    flow.canvas.set_fill_color(style.brand);
    flow.canvas.set_font(FontId::HelveticaBold, pt(18.0));
    flow.canvas.text(flow.margins.left, flow.y + pt(14.0), title);

    let right_edge = flow.page.width - flow.margins.right;
    let mut meta = vec![
        (
            FontId::HelveticaBold,
            format!("{} {}", number_label, document.number),
        ),
        (
            FontId::Helvetica,
            format!("Issued {}", document.issue_date.format("%b %-d, %Y")),
        ),
    ];
    if let Some(expiry) = document.expiry_date {
        meta.push((
            FontId::Helvetica,
            format!("{} {}", expiry_label, expiry.format("%b %-d, %Y")),
        ));
    }

    flow.canvas.set_fill_color(style.text);
    let mut baseline = flow.y + pt(4.0);
    for (font_id, line) in &meta {
        flow.canvas.set_font(*font_id, pt(9.0));
        let width = font::text_width(*font_id, pt(9.0), line);
        flow.canvas.text(right_edge - width, baseline, line);
        baseline += pt(12.0);
    }

    flow.y += pt(14.0).max(baseline - flow.y) + pt(16.0);
}

fn draw_recipient(flow: &mut PageFlow, document: &DocumentModel, style: &LayoutStyle) {
    let recipient = match &document.recipient {
        Some(recipient) => recipient,
        None => return,
    };
    let label = match document.kind {
        DocumentKind::Quote => "PREPARED FOR",
        DocumentKind::Invoice => "BILL TO",
    };

    flow.canvas.set_fill_color(style.muted);
    flow.canvas.set_font(FontId::HelveticaBold, pt(8.0));
    flow.canvas.text(flow.margins.left, flow.y, label);
    flow.y += pt(13.0);

    flow.canvas.set_fill_color(style.text);
    flow.canvas.set_font(FontId::HelveticaBold, pt(10.0));
    flow.canvas.text(flow.margins.left, flow.y, &recipient.name);
    flow.y += pt(13.0);

    flow.canvas.set_font(FontId::Helvetica, pt(9.0));
    for line in [
        recipient.company.as_deref(),
        recipient.address.as_deref(),
        recipient.email.as_deref(),
        recipient.phone.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        flow.canvas.text(flow.margins.left, flow.y, line);
        flow.y += pt(12.0);
    }
    flow.y += pt(10.0);
}

fn draw_table_header(flow: &mut PageFlow, columns: &TableColumns, style: &LayoutStyle) {
    flow.ensure_room(pt(22.0));
    let header_height = pt(16.0);
    flow.canvas.set_fill_color(style.table_fill);
    flow.canvas.fill_rect(
        flow.margins.left,
        flow.y,
        flow.page.width - flow.margins.left - flow.margins.right,
        header_height,
    );

    flow.canvas.set_fill_color(style.text);
    flow.canvas.set_font(FontId::HelveticaBold, pt(8.0));
    let baseline = flow.y + pt(11.0);
    flow.canvas.text(columns.name_x + pt(4.0), baseline, "Description");
    flow.canvas.text(columns.unit_x, baseline, "Unit");
    for (label, right) in [
        ("Qty", columns.qty_right),
        ("Unit Price", columns.price_right),
        ("Amount", columns.amount_right),
    ] {
        let width = font::text_width(FontId::HelveticaBold, pt(8.0), label);
        flow.canvas.text(right - width, baseline, label);
    }
    flow.y += header_height + pt(6.0);
}

/// One table row: name, unit, quantity, unit price, amount, plus every
/// wrapped description line beneath the name. The whole row moves to the
/// next page when it does not fit.
fn draw_line_item(
    flow: &mut PageFlow,
    columns: &TableColumns,
    item: &crate::document::LineItem,
    style: &LayoutStyle,
) {
    let description_lines = item
        .description
        .as_deref()
        .map(|text| font::wrap_text(FontId::Helvetica, pt(7.5), columns.name_width, text))
        .unwrap_or_default();
    let row_height =
        pt(ROW_BASE_HEIGHT + description_lines.len() as f32 * DESCRIPTION_LEADING + 4.0);
    flow.ensure_room(row_height);

    let baseline = flow.y + pt(10.0);
    flow.canvas.set_fill_color(style.text);
    flow.canvas.set_font(FontId::Helvetica, pt(9.0));
    flow.canvas.text(columns.name_x, baseline, &item.name);

    flow.canvas.set_font(FontId::Helvetica, pt(8.0));
    flow.canvas.text(columns.unit_x, baseline, &item.unit);

    flow.canvas.set_font(FontId::Helvetica, pt(9.0));
    for (value, right) in [
        (item.quantity.to_string(), columns.qty_right),
        (dollars(item.unit_price), columns.price_right),
        (dollars(item.line_total), columns.amount_right),
    ] {
        let width = font::text_width(FontId::Helvetica, pt(9.0), &value);
        flow.canvas.text(right - width, baseline, value);
    }

    if !description_lines.is_empty() {
        flow.canvas.set_fill_color(style.muted);
        flow.canvas.set_font(FontId::Helvetica, pt(7.5));
        let mut line_baseline = baseline + pt(10.0);
        for line in &description_lines {
            flow.canvas.text(columns.name_x + pt(6.0), line_baseline, line);
            line_baseline += pt(DESCRIPTION_LEADING);
        }
    }

    let rule_y = flow.y + row_height - pt(2.0);
    flow.canvas.set_stroke_color(style.rule);
    flow.canvas.set_line_width(pt(0.5));
    flow.canvas
        .line(flow.margins.left, rule_y, columns.amount_right, rule_y);

    flow.y += row_height;
}

/// Totals block, kept together: subtotal, tax (only for a positive
/// rate), bold total, and for invoices the amount-paid and color-coded
/// balance-due lines.
fn draw_totals(
    flow: &mut PageFlow,
    columns: &TableColumns,
    document: &DocumentModel,
    style: &LayoutStyle,
) {
    let totals = &document.totals;
    struct TotalLine {
        label: String,
        value: String,
        bold: bool,
        color: Option<Color>,
    }

    let mut lines = vec![TotalLine {
        label: "Subtotal".to_string(),
        value: dollars(totals.subtotal),
        bold: false,
        color: None,
    }];
    if totals.tax_rate.is_positive() {
        lines.push(TotalLine {
            label: format!("Tax ({}%)", totals.tax_rate.format()),
            value: dollars(totals.tax_amount),
            bold: false,
            color: None,
        });
    }
    lines.push(TotalLine {
        label: "Total".to_string(),
        value: dollars(totals.total),
        bold: true,
        color: None,
    });
    if let Some(payment) = &totals.payment {
        lines.push(TotalLine {
            label: "Amount Paid".to_string(),
            value: dollars(payment.amount_paid),
            bold: false,
            color: None,
        });
        let owed = payment.balance_due > Money::ZERO;
        lines.push(TotalLine {
            label: "Balance Due".to_string(),
            // Overpayments display as a zero balance; the color still
            // flips to settled.
            value: dollars(payment.balance_due.max(Money::ZERO)),
            bold: true,
            color: Some(if owed { style.owing } else { style.settled }),
        });
    }

    let block_height = pt(10.0 + lines.len() as f32 * 16.0);
    flow.ensure_room(block_height);
    flow.y += pt(8.0);

    for line in &lines {
        let font_id = if line.bold {
            FontId::HelveticaBold
        } else {
            FontId::Helvetica
        };
        let size = if line.bold { pt(10.0) } else { pt(9.0) };
        if line.bold {
            let rule_y = flow.y - pt(10.0);
            flow.canvas.set_stroke_color(style.rule);
            flow.canvas.set_line_width(pt(0.5));
            flow.canvas
                .line(columns.qty_right, rule_y, columns.amount_right, rule_y);
        }
        flow.canvas.set_fill_color(line.color.unwrap_or(style.text));
        flow.canvas.set_font(font_id, size);
        let label_width = font::text_width(font_id, size, &line.label);
        flow.canvas
            .text(columns.price_right - label_width, flow.y, &line.label);
        let value_width = font::text_width(font_id, size, &line.value);
        flow.canvas
            .text(columns.amount_right - value_width, flow.y, &line.value);
        flow.y += pt(16.0);
    }
}

fn draw_notes(flow: &mut PageFlow, document: &DocumentModel, style: &LayoutStyle) {
    let notes = match document.notes.as_deref() {
        Some(notes) if !notes.trim().is_empty() => notes,
        _ => return,
    };
    flow.y += pt(10.0);
    flow.ensure_room(pt(30.0));

    flow.canvas.set_fill_color(style.text);
    flow.canvas.set_font(FontId::HelveticaBold, pt(9.0));
    flow.canvas.text(flow.margins.left, flow.y, "Notes");
    flow.y += pt(13.0);

    let width = flow.page.width - flow.margins.left - flow.margins.right;
    flow.canvas.set_font(FontId::Helvetica, pt(8.0));
    for line in font::wrap_text(FontId::Helvetica, pt(8.0), width, notes) {
        flow.ensure_room(pt(NOTES_LEADING));
        // A page break resets font state with the page.
        flow.canvas.set_fill_color(style.text);
        flow.canvas.set_font(FontId::Helvetica, pt(8.0));
        flow.canvas.text(flow.margins.left, flow.y, line);
        flow.y += pt(NOTES_LEADING);
    }
}

fn draw_footer_content(flow: &mut PageFlow, document: &DocumentModel, style: &LayoutStyle) {
    let footer = &document.footer;
    let width = flow.page.width - flow.margins.left - flow.margins.right;

    if let Some(terms) = footer.legal_terms.as_deref() {
        if !terms.trim().is_empty() {
            flow.y += pt(14.0);
            for line in font::wrap_text(FontId::Helvetica, pt(7.0), width, terms) {
                flow.ensure_room(pt(LEGAL_LEADING));
                flow.canvas.set_fill_color(style.muted);
                flow.canvas.set_font(FontId::Helvetica, pt(7.0));
                flow.canvas.text(flow.margins.left, flow.y, line);
                flow.y += pt(LEGAL_LEADING);
            }
        }
    }

    if !footer.active_services.is_empty() {
        flow.y += pt(10.0);
        let services = format!("Active services: {}", footer.active_services.join(" | "));
        for line in font::wrap_text(FontId::Helvetica, pt(7.0), width, &services) {
            flow.ensure_room(pt(LEGAL_LEADING));
            flow.canvas.set_fill_color(style.muted);
            flow.canvas.set_font(FontId::Helvetica, pt(7.0));
            flow.canvas.text(flow.margins.left, flow.y, line);
            flow.y += pt(LEGAL_LEADING);
        }
    }
}

/// Second pass over the finished sequence: "Page i of N" centered and
/// the company name on the left, inside the bottom margin of every
/// page. Runs after pagination because N must be final.
pub(crate) fn stamp_footers(
    rendered: &mut RenderedDoc,
    company_name: &str,
    margins: Margins,
    style: &LayoutStyle,
) {
    let total = rendered.pages.len();
    let page = rendered.page_size;
    let baseline = page.height - margins.bottom * 0.5;
    for (index, rendered_page) in rendered.pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", index + 1, total);
        let label_width = font::text_width(FontId::Helvetica, pt(7.0), &label);
        let center_x = (page.width - label_width) * 0.5;
        rendered_page.ops.extend([
            DrawOp::FillColor(style.muted),
            DrawOp::Font {
                id: FontId::Helvetica,
                size: pt(7.0),
            },
            DrawOp::Text {
                x: margins.left,
                y: baseline,
                text: company_name.to_string(),
            },
            DrawOp::Text {
                x: center_x,
                y: baseline,
                text: label,
            },
        ]);
    }
}
