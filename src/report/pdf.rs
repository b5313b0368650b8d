use crate::error::{ReportError, Result};
use crate::report::layout::{Align, Block, DocumentLayout};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

/// Turns a layout into document bytes.
pub trait DocumentRenderer {
    fn render(&self, layout: &DocumentLayout) -> Result<Vec<u8>>;
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const BOTTOM_LIMIT: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;

#[derive(Debug, Clone)]
pub struct PdfRenderer {
    pub heading_size: f32,
    pub title_size: f32,
    pub body_size: f32,
    pub line_height: f32,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            heading_size: 14.0,
            title_size: 10.0,
            body_size: 9.0,
            line_height: 6.0,
        }
    }
}

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
    page: usize,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

fn render_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Rough Helvetica advance; good enough for right and centre alignment.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

impl PdfRenderer {
    fn new_page(&self, doc: &PdfDocumentReference, layout: &DocumentLayout, fonts: &Fonts, page: usize) -> Cursor {
        let (page_index, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {page}"));
        let layer = doc.get_page(page_index).get_layer(layer_index);
        self.start_page(layer, layout, fonts, page)
    }

    fn start_page(&self, layer: PdfLayerReference, layout: &DocumentLayout, fonts: &Fonts, page: usize) -> Cursor {
        let mut y = PAGE_HEIGHT - MARGIN - 5.0;
        for line in &layout.header {
            let x = (PAGE_WIDTH - text_width(line, self.title_size)) / 2.0;
            layer.use_text(line.as_str(), self.title_size, Mm(x.max(MARGIN)), Mm(y), &fonts.bold);
            y -= self.line_height + 2.0;
        }
        let footer = layout.footer.replace("{page}", &page.to_string());
        let x = (PAGE_WIDTH - text_width(&footer, 8.0)) / 2.0;
        layer.use_text(footer, 8.0, Mm(x.max(MARGIN)), Mm(MARGIN), &fonts.italic);

        Cursor {
            layer,
            y: y - 3.0,
            page,
        }
    }

    fn ensure_room(
        &self,
        cursor: &mut Cursor,
        needed: f32,
        doc: &PdfDocumentReference,
        layout: &DocumentLayout,
        fonts: &Fonts,
    ) {
        if cursor.y - needed < BOTTOM_LIMIT {
            *cursor = self.new_page(doc, layout, fonts, cursor.page + 1);
        }
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, layout: &DocumentLayout) -> Result<Vec<u8>> {
        let (doc, page_index, layer_index) =
            PdfDocument::new(layout.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_error)?,
            italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(render_error)?,
        };

        let first_layer = doc.get_page(page_index).get_layer(layer_index);
        let mut cursor = self.start_page(first_layer, layout, &fonts, 1);

        for block in &layout.blocks {
            match block {
                Block::Heading(text) => {
                    self.ensure_room(&mut cursor, self.line_height * 2.0, &doc, layout, &fonts);
                    let x = (PAGE_WIDTH - text_width(text, self.heading_size)) / 2.0;
                    cursor.layer.use_text(
                        text.as_str(),
                        self.heading_size,
                        Mm(x.max(MARGIN)),
                        Mm(cursor.y),
                        &fonts.bold,
                    );
                    cursor.y -= self.line_height * 2.0;
                }
                Block::SectionTitle(text) => {
                    self.ensure_room(&mut cursor, self.line_height + 2.0, &doc, layout, &fonts);
                    cursor.layer.use_text(
                        text.as_str(),
                        self.title_size,
                        Mm(MARGIN),
                        Mm(cursor.y),
                        &fonts.bold,
                    );
                    cursor.y -= self.line_height + 2.0;
                }
                Block::Text(text) => {
                    self.ensure_room(&mut cursor, self.line_height, &doc, layout, &fonts);
                    cursor.layer.use_text(
                        text.as_str(),
                        self.body_size,
                        Mm(MARGIN),
                        Mm(cursor.y),
                        &fonts.regular,
                    );
                    cursor.y -= self.line_height;
                }
                Block::Row(cells) => {
                    self.ensure_room(&mut cursor, self.line_height, &doc, layout, &fonts);
                    let mut x = MARGIN;
                    for cell in cells {
                        let width = text_width(&cell.text, self.body_size);
                        let offset = match cell.align {
                            Align::Left => 1.0,
                            Align::Center => ((cell.width_mm - width) / 2.0).max(1.0),
                            Align::Right => (cell.width_mm - width - 1.0).max(1.0),
                        };
                        cursor.layer.use_text(
                            cell.text.as_str(),
                            self.body_size,
                            Mm(x + offset),
                            Mm(cursor.y),
                            &fonts.regular,
                        );
                        x += cell.width_mm;
                    }
                    cursor.y -= self.line_height;
                }
                Block::Spacer(height) => {
                    cursor.y -= height;
                }
            }
        }

        doc.save_to_bytes().map_err(render_error)
    }
}
