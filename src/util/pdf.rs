use crate::config::CompanyConfig;
use crate::model::quote::Quote;
use crate::util::logo::resolve_logo;
use async_trait::async_trait;
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};
use std::io::Cursor;
use tracing::{info, instrument, warn};

/// PDF rendering errors
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Font error: {0}")]
    FontError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

/// Renders a persisted quote into a PDF byte buffer. Errors propagate to the
/// pipeline, which treats rendering as best-effort.
#[async_trait]
pub trait QuoteRenderer: Send + Sync {
    async fn render(&self, quote: &Quote) -> Result<Vec<u8>, PdfError>;
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 18.0;
const BOTTOM_MARGIN_MM: f32 = 25.0;
const TOP_MARGIN_MM: f32 = 18.0;
const LINE_STEP_MM: f32 = 5.5;
const ROW_STEP_MM: f32 = 9.0;

// Four-column table offsets, fixed.
const COL_PRODUCT_MM: f32 = 18.0;
const COL_PRESENTATION_MM: f32 = 70.0;
const COL_QUANTITY_MM: f32 = 123.0;
const COL_FREQUENCY_MM: f32 = 158.0;

const LOGO_X_MM: f32 = 18.0;
const LOGO_Y_MM: f32 = 18.0;
const LOGO_WIDTH_MM: f32 = 28.0;
const LOGO_DPI: f32 = 300.0;

const PRODUCT_COLUMN_CHARS: usize = 28;

fn dark() -> Color {
    Color::Rgb(Rgb::new(0.17, 0.24, 0.31, None))
}

fn muted() -> Color {
    Color::Rgb(Rgb::new(0.50, 0.55, 0.55, None))
}

fn accent() -> Color {
    Color::Rgb(Rgb::new(0.91, 0.30, 0.24, None))
}

/// Greedy word wrap against a character budget. Words longer than the budget
/// are emitted on their own line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
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

/// Approximate centering for the builtin Helvetica face.
fn centered_x(text: &str, font_size_pt: f32) -> f32 {
    let width_mm = text.chars().count() as f32 * font_size_pt * 0.55 * 0.352_778;
    ((PAGE_WIDTH_MM - width_mm) / 2.0).max(MARGIN_LEFT_MM)
}

/// Top-down cursor over a growing document. Vertical positions are tracked
/// from the page top and converted on write.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    y_from_top: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::FontError(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(PageWriter {
            doc,
            layer,
            font,
            y_from_top: TOP_MARGIN_MM,
        })
    }

    fn text_at(&self, text: &str, size_pt: f32, x_mm: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.use_text(
            text,
            size_pt,
            Mm(x_mm),
            Mm(PAGE_HEIGHT_MM - self.y_from_top),
            &self.font,
        );
    }

    fn line(&mut self, text: &str, size_pt: f32, color: Color, advance_mm: f32) {
        self.text_at(text, size_pt, MARGIN_LEFT_MM, color);
        self.y_from_top += advance_mm;
    }

    fn advance(&mut self, dy_mm: f32) {
        self.y_from_top += dy_mm;
    }

    fn near_bottom(&self) -> bool {
        self.y_from_top > PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM
    }

    fn break_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y_from_top = TOP_MARGIN_MM;
    }

    fn embed_logo(&self, bytes: &[u8]) {
        let image = match decode_logo(bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping logo, failed to decode: {}", e);
                return;
            }
        };

        let native_w_mm = image.image.width.0 as f32 * 25.4 / LOGO_DPI;
        let native_h_mm = image.image.height.0 as f32 * 25.4 / LOGO_DPI;
        if native_w_mm <= 0.0 {
            return;
        }
        let scale = LOGO_WIDTH_MM / native_w_mm;
        let displayed_h_mm = native_h_mm * scale;

        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(LOGO_X_MM)),
                translate_y: Some(Mm(PAGE_HEIGHT_MM - LOGO_Y_MM - displayed_h_mm)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(LOGO_DPI),
                ..Default::default()
            },
        );
    }

    fn finish(self) -> Result<Vec<u8>, PdfError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| PdfError::RenderError(e.to_string()))
    }
}

fn decode_logo(bytes: &[u8]) -> Result<Image, PdfError> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        let decoder = PngDecoder::new(Cursor::new(bytes))
            .map_err(|e| PdfError::ImageError(e.to_string()))?;
        Image::try_from(decoder).map_err(|e| PdfError::ImageError(e.to_string()))
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        let decoder = JpegDecoder::new(Cursor::new(bytes))
            .map_err(|e| PdfError::ImageError(e.to_string()))?;
        Image::try_from(decoder).map_err(|e| PdfError::ImageError(e.to_string()))
    } else {
        Err(PdfError::ImageError("Unsupported image format".to_string()))
    }
}

/// Fixed single-pass A4 layout: header with logo and company contact block,
/// centered title, metadata, client block, four-column line-item table,
/// optional observations section. Stateless across invocations.
pub struct QuotePdfRenderer {
    company: CompanyConfig,
}

impl QuotePdfRenderer {
    pub fn new(company: CompanyConfig) -> Self {
        QuotePdfRenderer { company }
    }

    pub fn render_with_logo(
        &self,
        quote: &Quote,
        logo: Option<&[u8]>,
    ) -> Result<Vec<u8>, PdfError> {
        let mut page = PageWriter::new("Cotización")?;

        // Header
        if let Some(bytes) = logo {
            page.embed_logo(bytes);
        }
        page.y_from_top = 50.0;
        page.line(&self.company.name, 16.0, dark(), 7.0);
        page.line(&self.company.address, 10.0, muted(), LINE_STEP_MM);
        page.line(&format!("Tel: {}", self.company.phone), 10.0, muted(), LINE_STEP_MM);
        page.line(
            &format!("Email: {}", self.company.email),
            10.0,
            muted(),
            8.0,
        );

        // Title
        page.advance(6.0);
        let title = "COTIZACIÓN";
        page.text_at(title, 20.0, centered_x(title, 20.0), accent());
        page.advance(12.0);

        // Metadata
        page.line(&format!("Número: {}", quote.id_hex()), 12.0, dark(), 6.0);
        page.line(&format!("Fecha: {}", quote.created_date()), 12.0, dark(), 6.0);
        page.line(&format!("Hora: {}", quote.created_time()), 12.0, dark(), 6.0);

        // Client block
        page.advance(4.0);
        page.line("INFORMACIÓN DEL CLIENTE", 14.0, accent(), 8.0);
        page.line(
            &format!("Tipo de Cliente: {}", quote.clientType.label()),
            12.0,
            dark(),
            6.0,
        );
        page.line(&format!("Nombre: {}", quote.client_name()), 12.0, dark(), 6.0);
        page.line(&format!("DNI: {}", quote.dni), 12.0, dark(), 6.0);
        page.line(&format!("Email: {}", quote.email), 12.0, dark(), 6.0);
        page.line(&format!("Teléfono: {}", quote.phone), 12.0, dark(), 6.0);
        if let Some(company_name) = &quote.companyName {
            page.line(&format!("Razón Social: {}", company_name), 12.0, dark(), 6.0);
        }
        if let Some(ruc) = &quote.ruc {
            page.line(&format!("RUC: {}", ruc), 12.0, dark(), 6.0);
        }
        if quote.contactPreferences.any() {
            page.line(
                &format!(
                    "Método de contacto preferido: {}",
                    quote.contactPreferences.summary()
                ),
                12.0,
                dark(),
                6.0,
            );
        }

        // Line-item table
        page.advance(4.0);
        page.line("PRODUCTOS SOLICITADOS", 14.0, accent(), 8.0);
        page.text_at("Producto", 12.0, COL_PRODUCT_MM, dark());
        page.text_at("Presentación", 12.0, COL_PRESENTATION_MM, dark());
        page.text_at("Cantidad", 12.0, COL_QUANTITY_MM, dark());
        page.text_at("Frecuencia", 12.0, COL_FREQUENCY_MM, dark());
        page.advance(7.0);

        for item in &quote.products {
            let name_lines = wrap_text(&item.productName, PRODUCT_COLUMN_CHARS);
            let presentation = item.presentationLabel.as_deref().unwrap_or("N/A");
            let presentation_lines = wrap_text(presentation, PRODUCT_COLUMN_CHARS);

            for (i, line) in name_lines.iter().take(2).enumerate() {
                self.row_cell(&page, line, COL_PRODUCT_MM, i);
            }
            for (i, line) in presentation_lines.iter().take(2).enumerate() {
                self.row_cell(&page, line, COL_PRESENTATION_MM, i);
            }
            self.row_cell(&page, &item.quantity.to_string(), COL_QUANTITY_MM, 0);
            self.row_cell(&page, item.frequency.label(), COL_FREQUENCY_MM, 0);
            page.advance(ROW_STEP_MM);
        }

        // Observations, only when non-empty
        if let Some(observations) = quote
            .observations
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            page.advance(8.0);
            if page.near_bottom() {
                page.break_page();
            }
            page.line("OBSERVACIONES", 14.0, accent(), 8.0);
            for raw_line in observations.replace("\r\n", "\n").split('\n') {
                for line in wrap_text(raw_line, 90) {
                    if page.near_bottom() {
                        page.break_page();
                    }
                    page.line(&line, 10.0, dark(), 5.0);
                }
            }
        }

        page.finish()
    }

    fn row_cell(&self, page: &PageWriter, text: &str, x_mm: f32, sub_line: usize) {
        page.layer.set_fill_color(dark());
        page.layer.use_text(
            text,
            10.0,
            Mm(x_mm),
            Mm(PAGE_HEIGHT_MM - page.y_from_top - sub_line as f32 * 4.0),
            &page.font,
        );
    }
}

#[async_trait]
impl QuoteRenderer for QuotePdfRenderer {
    #[instrument(skip(self, quote), fields(quote_id = %quote.id_hex()))]
    async fn render(&self, quote: &Quote) -> Result<Vec<u8>, PdfError> {
        info!("Rendering quote PDF");
        let logo = resolve_logo(&self.company).await;
        let bytes = self.render_with_logo(quote, logo.as_deref())?;
        info!(size = bytes.len(), "Quote PDF rendered");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_budget() {
        let lines = wrap_text("Hidróxido de Sodio en escamas grado industrial", 20);
        assert!(lines.len() > 1);
        for line in &lines {
            // A single overlong word may exceed the budget; these do not.
            assert!(line.len() <= 20);
        }
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 20), vec![String::new()]);
    }

    #[test]
    fn test_wrap_text_short_stays_single_line() {
        assert_eq!(wrap_text("Soda Cáustica", 28), vec!["Soda Cáustica".to_string()]);
    }

    #[test]
    fn test_centered_x_within_page() {
        let x = centered_x("COTIZACIÓN", 20.0);
        assert!(x > MARGIN_LEFT_MM);
        assert!(x < PAGE_WIDTH_MM / 2.0);
    }

    #[test]
    fn test_decode_logo_rejects_garbage() {
        assert!(decode_logo(b"not an image").is_err());
    }
}
