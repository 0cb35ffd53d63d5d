//! Glyph extraction from page content streams.
//!
//! This module walks a page's content-stream operators through a simplified
//! PDF graphics/text state machine and produces one [`PositionedGlyph`] per
//! rendered character. Text drawn inside form XObjects is kept apart as
//! figures, since it carries no line or word grouping of its own.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  PositionedGlyph[]  (page text)
//!                  PageObject[]       (figures and images, stream order)
//! ```

use log::{trace, warn};

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue,
    ResourceScope, XObject, IDENTITY_MATRIX,
};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single character at its device position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    pub text: String,
    /// Rendered font size.
    pub size: f32,
    pub x0: f32,
    pub x1: f32,
    /// Baseline.
    pub y: f32,
}

/// A non-text-flow object drawn on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageObject {
    /// Glyphs drawn by a form XObject, nested forms flattened in.
    Figure(Vec<PositionedGlyph>),
    Image,
}

/// Everything extracted from one page's content stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    /// Glyphs drawn directly on the page, in stream order.
    pub glyphs: Vec<PositionedGlyph>,
    pub objects: Vec<PageObject>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Glyph width as a fraction of font size when the font declares no widths.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Nesting limit for form XObjects drawing other forms.
const MAX_FORM_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Matrices
// ---------------------------------------------------------------------------

/// Concatenate two 2x3 matrices: the result applies `m1` first, then `m2`.
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn matrix_operands(operands: &[PdfValue]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    <[f32; 6]>::try_from(vals).ok()
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key, not the full name).
    font_key: Vec<u8>,
    /// Current font size in text-space units.
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix -- set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).  Default 1.0.
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    /// Current transformation matrix (user space to device space).
    ctm: [f32; 6],
    text: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY_MATRIX,
            text: TextState::default(),
        }
    }
}

/// Resolve a font resource name to its [`BackendFontInfo`].
fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

struct Extractor<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    content: PageContent,
}

impl<'a> Extractor<'a> {
    fn new(backend: &'a dyn PdfBackend, page: PageId) -> Self {
        Extractor {
            backend,
            page,
            state: GraphicsState::default(),
            saved: Vec::new(),
            content: PageContent::default(),
        }
    }

    /// Run a list of operators. `figure` is the index (into
    /// `content.objects`) of the figure collecting glyphs, if any.
    fn run(
        &mut self,
        ops: &[ContentOp],
        scope: ResourceScope,
        fonts: &[BackendFontInfo],
        depth: usize,
        figure: Option<usize>,
    ) {
        for op in ops {
            let operands = op.operands.as_slice();
            let number = |i: usize| operands.get(i).and_then(get_number_from_value);

            match op.operator.as_str() {
                // -- Graphics state -------------------------------------
                "q" => self.saved.push(self.state.clone()),
                "Q" => {
                    if let Some(state) = self.saved.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.state.ctm = multiply(&m, &self.state.ctm);
                    }
                }

                // -- Text object delimiters -----------------------------
                "BT" => {
                    self.state.text.text_matrix = IDENTITY_MATRIX;
                    self.state.text.line_matrix = IDENTITY_MATRIX;
                }
                "ET" => {}

                // -- Font -----------------------------------------------
                "Tf" => {
                    let key = match operands.first() {
                        Some(PdfValue::Name(n)) | Some(PdfValue::Str(n)) => n.clone(),
                        _ => continue,
                    };
                    self.state.text.font_key = key;
                    self.state.text.font_size = number(1).unwrap_or(0.0);
                }

                // -- Text matrix / position -----------------------------
                "Tm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.state.text.text_matrix = m;
                        self.state.text.line_matrix = m;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                        self.state.text.translate_line(tx, ty);
                    }
                }
                "TD" => {
                    // TD is equivalent to: -ty TL ; tx ty Td
                    if let (Some(tx), Some(ty)) = (number(0), number(1)) {
                        self.state.text.leading = -ty;
                        self.state.text.translate_line(tx, ty);
                    }
                }
                "T*" => self.state.text.next_line(),
                "TL" => {
                    if let Some(v) = number(0) {
                        self.state.text.leading = v;
                    }
                }

                // -- Spacing / scaling ----------------------------------
                "Tc" => {
                    if let Some(v) = number(0) {
                        self.state.text.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = number(0) {
                        self.state.text.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = number(0) {
                        self.state.text.horiz_scale = v / 100.0;
                    }
                }
                "Ts" => {
                    if let Some(v) = number(0) {
                        self.state.text.text_rise = v;
                    }
                }

                // -- Show text ------------------------------------------
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show(bytes, fonts, figure);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(arr)) = operands.first() {
                        for elem in arr {
                            match elem {
                                PdfValue::Str(bytes) => self.show(bytes, fonts, figure),
                                val => {
                                    // Negative moves right, in thousandths of
                                    // a text-space unit.
                                    if let Some(adj) = get_number_from_value(val) {
                                        let text = &mut self.state.text;
                                        let dx = -adj / 1000.0 * text.font_size * text.horiz_scale;
                                        text.advance_x(dx);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" => {
                    self.state.text.next_line();
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show(bytes, fonts, figure);
                    }
                }
                "\"" => {
                    // " aw ac string  =>  set Tw, Tc, T*, Tj
                    if let (Some(aw), Some(ac)) = (number(0), number(1)) {
                        self.state.text.word_spacing = aw;
                        self.state.text.char_spacing = ac;
                    }
                    self.state.text.next_line();
                    if let Some(PdfValue::Str(bytes)) = operands.get(2) {
                        self.show(bytes, fonts, figure);
                    }
                }

                // -- External objects -----------------------------------
                "Do" => {
                    if let Some(PdfValue::Name(name)) = operands.first() {
                        self.draw_xobject(name, scope, depth, figure);
                    }
                }

                _ => { /* Ignore path, color and other operators */ }
            }
        }
    }

    /// Render one string operand, emitting a glyph per character.
    fn show(&mut self, bytes: &[u8], fonts: &[BackendFontInfo], figure: Option<usize>) {
        let font = resolve_font(&self.state.text.font_key, fonts);
        let text = self.backend.decode_text(font, bytes);
        // Single-byte strings index the width table by byte.
        let single_byte = text.chars().count() == bytes.len();

        for (i, ch) in text.chars().enumerate() {
            let code = if single_byte { bytes[i] as u32 } else { ch as u32 };
            let glyph_w = font
                .and_then(|f| f.glyph_width(code))
                .unwrap_or(APPROX_CHAR_WIDTH_RATIO * 1000.0)
                / 1000.0;

            let ts = &self.state.text;
            let trm = multiply(&ts.text_matrix, &self.state.ctm);
            let h_scale = (trm[0].powi(2) + trm[1].powi(2)).sqrt();
            let v_scale = (trm[2].powi(2) + trm[3].powi(2)).sqrt();

            let x0 = trm[4] + ts.text_rise * trm[2];
            let y = trm[5] + ts.text_rise * trm[3];
            let width = glyph_w * ts.font_size * ts.horiz_scale * h_scale;
            let glyph = PositionedGlyph {
                text: ch.to_string(),
                size: (ts.font_size * v_scale).abs(),
                x0,
                x1: x0 + width,
                y,
            };

            let mut advance = glyph_w * ts.font_size + ts.char_spacing;
            if single_byte && code == 32 {
                advance += ts.word_spacing;
            }
            let advance = advance * ts.horiz_scale;

            self.emit(glyph, figure);
            self.state.text.advance_x(advance);
        }
    }

    fn emit(&mut self, glyph: PositionedGlyph, figure: Option<usize>) {
        match figure.and_then(|i| self.content.objects.get_mut(i)) {
            Some(PageObject::Figure(glyphs)) => glyphs.push(glyph),
            _ => self.content.glyphs.push(glyph),
        }
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        scope: ResourceScope,
        depth: usize,
        figure: Option<usize>,
    ) {
        let Some(xobject) = self.backend.xobject(scope, name) else {
            trace!("unknown XObject /{}", String::from_utf8_lossy(name));
            return;
        };

        match xobject {
            XObject::Form(form) => {
                if depth >= MAX_FORM_DEPTH {
                    warn!(
                        "form XObject /{} nested too deeply, skipping",
                        String::from_utf8_lossy(name)
                    );
                    return;
                }
                let ops = match self.backend.decode_content(&form.content) {
                    Ok(ops) => ops,
                    Err(e) => {
                        warn!("skipping form XObject /{}: {e}", String::from_utf8_lossy(name));
                        return;
                    }
                };
                let form_scope = ResourceScope::Form {
                    page: self.page,
                    form: form.id,
                };
                let fonts = self.backend.fonts(form_scope).unwrap_or_default();

                let target = match figure {
                    Some(index) => index,
                    None => {
                        self.content.objects.push(PageObject::Figure(Vec::new()));
                        self.content.objects.len() - 1
                    }
                };

                self.saved.push(self.state.clone());
                self.state.ctm = multiply(&form.matrix, &self.state.ctm);
                self.run(&ops, form_scope, &fonts, depth + 1, Some(target));
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            XObject::Image if figure.is_none() => self.content.objects.push(PageObject::Image),
            XObject::Image | XObject::Other => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and collect its glyphs and objects.
///
/// Handles the text operators (`BT`, `ET`, `Tf`, `Tm`, `Td`, `TD`, `T*`,
/// `TL`, `Tc`, `Tw`, `Tz`, `Ts`, `Tj`, `TJ`, `'`, `"`), the graphics-state
/// operators `q`, `Q` and `cm`, and `Do` for form and image XObjects.
pub fn extract_page_content(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<PageContent, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let scope = ResourceScope::Page(page_id);
    let fonts = backend.fonts(scope).unwrap_or_default();

    let mut extractor = Extractor::new(backend, page_id);
    extractor.run(&ops, scope, &fonts, 0, None);
    Ok(extractor.content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
