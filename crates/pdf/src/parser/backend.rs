use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// An object identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type ObjectId = (u32, u16);

/// A page identifier.
pub type PageId = ObjectId;

/// The identity 2x3 matrix: [a, b, c, d, e, f].
pub const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Levels of the page tree searched for inherited resources.
const MAX_TREE_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font information extracted from a resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Font subtype (e.g. `Type1`, `TrueType`, `Type0`).
    pub subtype: Option<String>,
    /// Encoding entry from the font dictionary, if present.
    pub encoding: Option<String>,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph widths in thousandths of a text-space unit.
    pub widths: Vec<f32>,
}

impl BackendFontInfo {
    /// Width of a character code in thousandths of a unit, if the font
    /// declares one.
    pub fn glyph_width(&self, code: u32) -> Option<f32> {
        let index = code.checked_sub(self.first_char)? as usize;
        self.widths.get(index).copied().filter(|w| *w > 0.0)
    }
}

/// Where resource names (fonts, XObjects) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Page(PageId),
    /// A form XObject drawn on a page; names missing from the form's own
    /// resources fall back to the page.
    Form { page: PageId, form: ObjectId },
}

impl ResourceScope {
    pub fn page(&self) -> PageId {
        match self {
            ResourceScope::Page(page) | ResourceScope::Form { page, .. } => *page,
        }
    }
}

/// A form XObject: a self-contained content stream.
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub id: ObjectId,
    pub content: Vec<u8>,
    /// Form space to user space matrix.
    pub matrix: [f32; 6],
}

/// An external object invoked with the `Do` operator.
#[derive(Debug, Clone)]
pub enum XObject {
    Form(FormXObject),
    Image,
    Other,
}

/// A simplified, lopdf-independent representation of a PDF value.
///
/// This enum decouples higher-level logic from the concrete `lopdf::Object`
/// type so that the layout code can work with pure data.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(ObjectId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].
///
/// References are preserved as `PdfValue::Reference`. Stream dictionaries
/// are converted but the raw stream bytes are discarded.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(convert_dict(dict)),
        lopdf::Object::Stream(stream) => PdfValue::Dict(convert_dict(&stream.dict)),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

fn convert_dict(dict: &lopdf::Dictionary) -> Vec<(Vec<u8>, PdfValue)> {
    dict.iter()
        .map(|(k, v)| (k.clone(), convert_object(v)))
        .collect()
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// Handles three cases in order:
/// 1. UTF-16BE with BOM (`\xFE\xFF` prefix) -- strips BOM and decodes.
/// 2. Valid UTF-8 -- returned as-is.
/// 3. Fallback to Latin-1 (ISO 8859-1) -- each byte mapped to its Unicode
///    code point.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        return decode_utf16be(&bytes[2..]);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // PDFDocEncoding agrees with Latin-1 on the printable range.
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode UTF-16BE code units; a trailing odd byte is ignored.
fn decode_utf16be(bytes: &[u8]) -> String {
    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&code_units)
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// This trait exists so that the layout analysis can be tested against mock
/// implementations without building real documents.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return font information for every font visible in a scope.
    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Return the decompressed content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode raw string bytes found in a text-showing operator, using the
    /// current font's encoding when it is known.
    fn decode_text(&self, font: Option<&BackendFontInfo>, bytes: &[u8]) -> String {
        let identity = font
            .and_then(|f| f.encoding.as_deref())
            .is_some_and(|enc| enc.contains("Identity"));

        // Identity-H / Identity-V fonts typically use 2-byte CID codes that
        // map to Unicode.
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let decoded = decode_utf16be(bytes);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }

    /// Look up an XObject by resource name.
    fn xobject(&self, scope: ResourceScope, name: &[u8]) -> Option<XObject>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Extract metadata from the PDF trailer's Info dictionary.
    ///
    /// Returns a `BTreeMap` of keys such as `"Title"`, `"Author"`,
    /// `"Creator"`, `"Producer"`, `"Subject"` and `"Keywords"`.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Some(info_dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return meta;
        };

        let keys: &[&[u8]] = &[
            b"Title",
            b"Author",
            b"Creator",
            b"Producer",
            b"Subject",
            b"Keywords",
        ];

        for key in keys {
            if let Ok(obj) = info_dict.get(key) {
                let value = match self.resolve(obj) {
                    lopdf::Object::String(bytes, _) => decode_text_simple(bytes),
                    lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    _ => continue,
                };
                let key_str = String::from_utf8_lossy(key).into_owned();
                meta.insert(key_str, value);
            }
        }

        meta
    }

    // -- private helpers ----------------------------------------------------

    /// Follow a single level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// Resolve an object to a dictionary; a stream yields its dictionary.
    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        match self.resolve(obj) {
            lopdf::Object::Dictionary(d) => Some(d),
            lopdf::Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    fn page_dict(&self, page: PageId) -> Result<&lopdf::Dictionary, PdfError> {
        self.doc
            .get_object(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page object: {}", e)))?
            .as_dict()
            .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))
    }

    /// Walk up the page tree to find the inherited Resources dictionary.
    fn find_resources<'a>(&'a self, dict: &'a lopdf::Dictionary) -> Option<&'a lopdf::Dictionary> {
        let mut node = dict;
        // Bounded, since a malformed tree may loop through Parent.
        for _ in 0..MAX_TREE_DEPTH {
            if let Some(resources) = node.get(b"Resources").ok().and_then(|o| self.resolve_dict(o)) {
                return Some(resources);
            }
            node = self.resolve_dict(node.get(b"Parent").ok()?)?;
        }
        None
    }

    /// The stream dictionary of a form XObject.
    fn form_dict(&self, form: ObjectId) -> Option<&lopdf::Dictionary> {
        match self.doc.get_object(form).ok()? {
            lopdf::Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Resource dictionaries of a scope, most specific first.
    fn resource_chain(&self, scope: ResourceScope) -> Vec<&lopdf::Dictionary> {
        let mut chain = Vec::new();
        if let ResourceScope::Form { form, .. } = scope {
            if let Some(res) = self
                .form_dict(form)
                .and_then(|d| d.get(b"Resources").ok())
                .and_then(|o| self.resolve_dict(o))
            {
                chain.push(res);
            }
        }
        if let Some(res) = self
            .page_dict(scope.page())
            .ok()
            .and_then(|d| self.find_resources(d))
        {
            chain.push(res);
        }
        chain
    }

    /// Build a [`BackendFontInfo`] from a font dictionary.
    fn font_info(&self, name: &[u8], dict: &lopdf::Dictionary) -> BackendFontInfo {
        let name_entry = |key: &[u8]| {
            dict.get(key).ok().and_then(|o| match self.resolve(o) {
                lopdf::Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
                _ => None,
            })
        };

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.resolve(o).as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);

        let widths = match dict.get(b"Widths").map(|o| self.resolve(o)) {
            Ok(lopdf::Object::Array(arr)) => arr
                .iter()
                .map(|w| get_number_from_value(&convert_object(self.resolve(w))).unwrap_or(0.0))
                .collect(),
            _ => Vec::new(),
        };

        BackendFontInfo {
            name: name.to_vec(),
            base_font: name_entry(b"BaseFont"),
            subtype: name_entry(b"Subtype"),
            encoding: name_entry(b"Encoding"),
            first_char,
            widths,
        }
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn fonts(&self, scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError> {
        let mut result: Vec<BackendFontInfo> = Vec::new();

        for resources in self.resource_chain(scope) {
            let Some(font_dict) = resources.get(b"Font").ok().and_then(|o| self.resolve_dict(o))
            else {
                continue;
            };
            for (name, obj) in font_dict.iter() {
                if result.iter().any(|f| &f.name == name) {
                    continue;
                }
                if let Some(dict) = self.resolve_dict(obj) {
                    result.push(self.font_info(name, dict));
                }
            }
        }

        Ok(result)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        let ops = content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect();

        Ok(ops)
    }

    fn xobject(&self, scope: ResourceScope, name: &[u8]) -> Option<XObject> {
        let obj = self.resource_chain(scope).into_iter().find_map(|resources| {
            let xobjects = self.resolve_dict(resources.get(b"XObject").ok()?)?;
            xobjects.get(name).ok()
        })?;

        let id = obj.as_reference().ok();
        let lopdf::Object::Stream(stream) = self.resolve(obj) else {
            return Some(XObject::Other);
        };

        let subtype = stream.dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        match (subtype, id) {
            (Some(b"Form"), Some(id)) => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let matrix = match stream.dict.get(b"Matrix").map(convert_object) {
                    Ok(PdfValue::Array(values)) if values.len() == 6 => {
                        let nums: Vec<f32> =
                            values.iter().filter_map(get_number_from_value).collect();
                        <[f32; 6]>::try_from(nums).unwrap_or(IDENTITY_MATRIX)
                    }
                    _ => IDENTITY_MATRIX,
                };
                Some(XObject::Form(FormXObject {
                    id,
                    content,
                    matrix,
                }))
            }
            (Some(b"Image"), _) => Some(XObject::Image),
            _ => Some(XObject::Other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    // -- decode_text_simple -------------------------------------------------

    #[test]
    fn decode_text_simple_utf8() {
        let input = "Hello, world!";
        assert_eq!(decode_text_simple(input.as_bytes()), "Hello, world!");
    }

    #[test]
    fn decode_text_simple_latin1() {
        // 0xE9 is U+00E9 in Latin-1 but not valid standalone UTF-8.
        let input: &[u8] = &[0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text_simple(input), "caf\u{00E9}");
    }

    #[test]
    fn decode_text_simple_utf16be_basic() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_text_simple(input), "AB");
    }

    #[test]
    fn decode_text_simple_utf16be_odd_trailing_byte() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_simple(input), "A");
    }

    #[test]
    fn decode_text_simple_empty() {
        assert_eq!(decode_text_simple(&[]), "");
    }

    // -- glyph widths -------------------------------------------------------

    #[test]
    fn glyph_width_lookup() {
        let font = BackendFontInfo {
            first_char: 32,
            widths: vec![278.0, 0.0, 355.0],
            ..BackendFontInfo::default()
        };
        assert_eq!(font.glyph_width(32), Some(278.0));
        assert_eq!(font.glyph_width(33), None);
        assert_eq!(font.glyph_width(34), Some(355.0));
        assert_eq!(font.glyph_width(35), None);
        assert_eq!(font.glyph_width(10), None);
    }

    // -- convert_object -----------------------------------------------------

    #[test]
    fn convert_scalars() {
        assert_eq!(convert_object(&lopdf::Object::Null), PdfValue::Null);
        assert_eq!(
            convert_object(&lopdf::Object::Integer(99)),
            PdfValue::Integer(99),
        );
        assert_eq!(
            convert_object(&lopdf::Object::Real(1.5)),
            PdfValue::Real(1.5),
        );
        assert_eq!(
            convert_object(&lopdf::Object::Reference((7, 0))),
            PdfValue::Reference((7, 0)),
        );
    }

    #[test]
    fn convert_stream_uses_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set("Length", lopdf::Object::Integer(0));
        let obj = lopdf::Object::Stream(lopdf::Stream::new(dict, vec![]));

        match convert_object(&obj) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, b"Length");
                assert_eq!(entries[0].1, PdfValue::Integer(0));
            }
            other => panic!("expected Dict for stream, got {:?}", other),
        }
    }

    // -- decode_text --------------------------------------------------------

    struct NoopBackend;

    impl PdfBackend for NoopBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::new()
        }
        fn fonts(&self, _scope: ResourceScope) -> Result<Vec<BackendFontInfo>, PdfError> {
            Ok(vec![])
        }
        fn page_content(&self, _page: PageId) -> Result<Vec<u8>, PdfError> {
            Ok(vec![])
        }
        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            Ok(vec![])
        }
        fn xobject(&self, _scope: ResourceScope, _name: &[u8]) -> Option<XObject> {
            None
        }
    }

    #[test]
    fn decode_text_identity_encoding() {
        let font = BackendFontInfo {
            encoding: Some("Identity-H".to_string()),
            ..BackendFontInfo::default()
        };
        assert_eq!(
            NoopBackend.decode_text(Some(&font), &[0x1E, 0xC7, 0x00, 0x74]),
            "\u{1EC7}t"
        );
        assert_eq!(NoopBackend.decode_text(None, b"plain"), "plain");
    }

    // -- LopdfBackend -------------------------------------------------------

    #[test]
    fn lopdf_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn lopdf_reads_fonts_with_widths() {
        let bytes = fixtures::simple_document("Hello", 24.0);
        let backend = LopdfBackend::load_bytes(&bytes).unwrap();
        let page = *backend.pages().values().next().unwrap();

        let fonts = backend.fonts(ResourceScope::Page(page)).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].name, b"F1");
        assert_eq!(fonts[0].base_font.as_deref(), Some("Helvetica"));
        assert_eq!(fonts[0].first_char, 32);
        assert_eq!(fonts[0].glyph_width('H' as u32), Some(722.0));
    }

    #[test]
    fn lopdf_reads_metadata() {
        let bytes = fixtures::simple_document("Hello", 24.0);
        let backend = LopdfBackend::load_bytes(&bytes).unwrap();
        let meta = backend.metadata();
        assert_eq!(meta.get("Title").map(String::as_str), Some("Fixture Metadata Title"));
        assert_eq!(backend.page_count(), 1);
    }

    #[test]
    fn lopdf_finds_form_and_image_xobjects() {
        let bytes = fixtures::figure_document();
        let backend = LopdfBackend::load_bytes(&bytes).unwrap();
        let page = *backend.pages().values().next().unwrap();
        let scope = ResourceScope::Page(page);

        let Some(XObject::Form(form)) = backend.xobject(scope, b"Fm1") else {
            panic!("expected a form XObject");
        };
        assert!(!form.content.is_empty());
        assert_eq!(form.matrix, IDENTITY_MATRIX);

        // Fonts declared by the form itself are visible inside it.
        let form_scope = ResourceScope::Form {
            page,
            form: form.id,
        };
        let fonts = backend.fonts(form_scope).unwrap();
        assert!(fonts.iter().any(|f| f.name == b"F2"));

        assert!(matches!(backend.xobject(scope, b"Im1"), Some(XObject::Image)));
        assert!(backend.xobject(scope, b"Missing").is_none());
    }
}
