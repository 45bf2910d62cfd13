//! PDF text source backed by [`lopdf`].
//!
//! Walks each page's content stream with a small text-only interpreter and
//! yields [`TextFragment`]s, either one per text-showing operator with its
//! page-space origin (positioned mode) or one per page (bulk mode).

use std::collections::HashMap;
use std::sync::LazyLock;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use quotekit_core::{
    ExtractResult, ExtractWarning, ExtractWarningCode, QuoteError, TextFragment, join_fragments,
};

use crate::cmap::ToUnicodeMap;
use crate::error::BackendError;
use crate::text_state::{Matrix, TextState};
use crate::tokenizer::{Operand, Operation, tokenize};

/// How page text is turned into fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractMode {
    /// One position-less fragment per page.
    #[default]
    Bulk,
    /// One fragment per text run, carrying its page-space origin.
    Positioned,
}

/// `TJ` offsets below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f64 = -200.0;

/// Nested form XObjects deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 8;

/// An opened PDF document.
#[derive(Debug)]
pub struct PdfSource {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

/// What one page's interpretation produced.
#[derive(Debug, Default)]
struct PageText {
    runs: Vec<TextFragment>,
    missing_fonts: Vec<String>,
}

impl PdfSource {
    /// Parse a PDF from memory.
    ///
    /// # Errors
    ///
    /// [`BackendError::Parse`] for malformed files and
    /// [`QuoteError::PasswordRequired`] for encrypted ones.
    pub fn open(bytes: &[u8]) -> Result<Self, BackendError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        if doc.is_encrypted() {
            return Err(BackendError::Core(QuoteError::PasswordRequired));
        }
        let page_ids = doc.get_pages().into_values().collect();
        Ok(Self { doc, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Positioned mode: one fragment per text-showing operator.
    pub fn page_runs(&self, index: usize) -> Result<Vec<TextFragment>, BackendError> {
        Ok(self.interpret_page(index)?.runs)
    }

    /// Bulk mode: every run on the page joined by a single space.
    pub fn page_text(&self, index: usize) -> Result<TextFragment, BackendError> {
        let runs = self.page_runs(index)?;
        Ok(TextFragment::new(join_fragments(&runs), index))
    }

    /// Fragments for one page in the given mode.
    pub fn page_fragments(
        &self,
        index: usize,
        mode: ExtractMode,
    ) -> ExtractResult<Vec<TextFragment>> {
        match self.interpret_page(index) {
            Ok(page) => {
                let warnings = page
                    .missing_fonts
                    .iter()
                    .map(|name| {
                        ExtractWarning::with_code(
                            ExtractWarningCode::MissingFont,
                            format!("font /{name} not found in page resources"),
                        )
                        .on_page(index)
                    })
                    .collect();
                let fragments = match mode {
                    ExtractMode::Positioned => page.runs,
                    ExtractMode::Bulk => vec![TextFragment::new(join_fragments(&page.runs), index)],
                };
                ExtractResult::with_warnings(fragments, warnings)
            }
            Err(e) => {
                tracing::warn!(page = index, error = %e, "page text extraction failed");
                ExtractResult::with_warnings(
                    vec![TextFragment::new("", index)],
                    vec![
                        ExtractWarning::with_code(
                            ExtractWarningCode::PageExtractionFailed,
                            e.to_string(),
                        )
                        .on_page(index),
                    ],
                )
            }
        }
    }

    /// Fragments for every page, in page order.
    ///
    /// A page that cannot be read contributes one empty fragment and a
    /// warning; the remaining pages are still extracted.
    pub fn extract(&self, mode: ExtractMode) -> ExtractResult<Vec<TextFragment>> {
        let mut fragments = Vec::new();
        let mut warnings = Vec::new();
        for index in 0..self.page_count() {
            let page = self.page_fragments(index, mode);
            fragments.extend(page.value);
            warnings.extend(page.warnings);
        }
        ExtractResult::with_warnings(fragments, warnings)
    }

    fn interpret_page(&self, index: usize) -> Result<PageText, BackendError> {
        let page_id = *self.page_ids.get(index).ok_or_else(|| {
            BackendError::Parse(format!(
                "page index {index} out of range (document has {} pages)",
                self.page_count()
            ))
        })?;
        let page_dict = self.doc.get_dictionary(page_id)?;
        let content = page_content(&self.doc, page_dict)?;
        let resources = page_resources(&self.doc, page_id)?;

        let mut interpreter = Interpreter {
            doc: &self.doc,
            page_index: index,
            page: PageText::default(),
        };
        interpreter.run(&content, resources, TextState::new(), 0)?;
        Ok(interpreter.page)
    }
}

/// Follow a single indirect reference.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, BackendError> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn sub_dictionary<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    let obj = dict.get(key).ok()?;
    resolve(doc, obj).ok()?.as_dict().ok()
}

/// Look `key` up on the page, then on its ancestors through `/Parent`.
fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut node = doc.get_dictionary(page_id)?;
    loop {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        let Ok(parent) = node.get(b"Parent") else {
            return Ok(None);
        };
        node = resolve(doc, parent)?
            .as_dict()
            .map_err(|e| BackendError::Parse(format!("invalid /Parent: {e}")))?;
    }
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, BackendError> {
    static NO_RESOURCES: LazyLock<Dictionary> = LazyLock::new(Dictionary::new);

    match inherited(doc, page_id, b"Resources")? {
        Some(obj) => resolve(doc, obj)?
            .as_dict()
            .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string())),
        None => Ok(&NO_RESOURCES),
    }
}

/// The page's content, concatenating `/Contents` arrays.
fn page_content(doc: &Document, page: &Dictionary) -> Result<Vec<u8>, BackendError> {
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    match resolve(doc, contents)? {
        Object::Stream(stream) => stream_bytes(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let stream = resolve(doc, part)?.as_stream().map_err(|e| {
                    BackendError::Parse(format!("/Contents entry is not a stream: {e}"))
                })?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&stream_bytes(stream)?);
            }
            Ok(content)
        }
        _ => Err(BackendError::Parse(
            "/Contents is neither a stream nor an array".to_string(),
        )),
    }
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// How a font's shown strings map to Unicode.
#[derive(Debug)]
enum FontDecoder {
    ToUnicode(ToUnicodeMap),
    /// Composite font without a CMap: 2-byte codes read as UTF-16.
    TwoByte,
    /// Simple font: WinAnsi (windows-1252).
    WinAnsi,
}

impl FontDecoder {
    fn load(doc: &Document, font: &Dictionary) -> Self {
        if let Some(stream) = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o).ok())
            .and_then(|o| o.as_stream().ok())
        {
            match stream_bytes(stream).and_then(|data| ToUnicodeMap::parse(&data)) {
                Ok(map) if !map.is_empty() => return FontDecoder::ToUnicode(map),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "ignoring unreadable ToUnicode CMap"),
            }
        }
        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        if subtype == Some(b"Type0".as_slice()) {
            FontDecoder::TwoByte
        } else {
            FontDecoder::WinAnsi
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
            return utf16be(utf16);
        }
        match self {
            FontDecoder::ToUnicode(map) => map.decode(bytes),
            FontDecoder::TwoByte => utf16be(bytes),
            FontDecoder::WinAnsi => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

fn utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

struct Interpreter<'a> {
    doc: &'a Document,
    page_index: usize,
    page: PageText,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: &'a Dictionary,
        mut state: TextState,
        depth: usize,
    ) -> Result<(), BackendError> {
        let mut fonts: HashMap<String, FontDecoder> = HashMap::new();

        for op in tokenize(content)? {
            match op.operator.as_str() {
                "q" => state.save(),
                "Q" => state.restore(),
                "cm" => {
                    if let Some(m) = op.numbers::<6>() {
                        state.concat(Matrix::from_array(m));
                    }
                }
                "BT" => state.begin_text(),
                "Tf" => {
                    let name = op.operands.first().and_then(Operand::as_name);
                    if let (Some(name), Some([size])) = (name, op.numbers::<1>()) {
                        if !fonts.contains_key(name) {
                            let decoder = self.load_font(resources, name);
                            fonts.insert(name.to_string(), decoder);
                        }
                        state.params.font = Some(name.to_string());
                        state.params.font_size = size;
                    }
                }
                "Tc" => set(&op, &mut state.params.char_spacing),
                "Tw" => set(&op, &mut state.params.word_spacing),
                "TL" => set(&op, &mut state.params.leading),
                "Ts" => set(&op, &mut state.params.rise),
                "Tz" => {
                    if let Some([scale]) = op.numbers::<1>() {
                        state.params.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" => {
                    if let Some([tx, ty]) = op.numbers::<2>() {
                        state.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let Some([tx, ty]) = op.numbers::<2>() {
                        state.move_line_set_leading(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = op.numbers::<6>() {
                        state.set_text_matrix(Matrix::from_array(m));
                    }
                }
                "T*" => state.next_line(),
                "Tj" => {
                    if let Some(Operand::Str(bytes)) = op.operands.last() {
                        self.show(&mut state, &fonts, &[Operand::Str(bytes.clone())]);
                    }
                }
                "TJ" => {
                    if let Some(Operand::Array(items)) = op.operands.last() {
                        self.show(&mut state, &fonts, items);
                    }
                }
                "'" => {
                    state.next_line();
                    if let Some(Operand::Str(bytes)) = op.operands.last() {
                        self.show(&mut state, &fonts, &[Operand::Str(bytes.clone())]);
                    }
                }
                "\"" => {
                    if let [aw, ac, Operand::Str(bytes)] = op.operands.as_slice() {
                        state.params.word_spacing = aw.as_number().unwrap_or(0.0);
                        state.params.char_spacing = ac.as_number().unwrap_or(0.0);
                        state.next_line();
                        self.show(&mut state, &fonts, &[Operand::Str(bytes.clone())]);
                    }
                }
                "Do" => {
                    if let Some(name) = op.operands.last().and_then(Operand::as_name) {
                        self.form(resources, name, &state, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn load_font(&mut self, resources: &Dictionary, name: &str) -> FontDecoder {
        let font = sub_dictionary(self.doc, resources, b"Font").and_then(|fonts| {
            let obj = fonts.get(name.as_bytes()).ok()?;
            resolve(self.doc, obj).ok()?.as_dict().ok()
        });
        match font {
            Some(font) => FontDecoder::load(self.doc, font),
            None => {
                tracing::debug!(page = self.page_index, font = name, "font resource missing");
                self.page.missing_fonts.push(name.to_string());
                FontDecoder::WinAnsi
            }
        }
    }

    /// Record one text run starting at the current text origin.
    fn show(
        &mut self,
        state: &mut TextState,
        fonts: &HashMap<String, FontDecoder>,
        items: &[Operand],
    ) {
        let decoder = state
            .params
            .font
            .as_ref()
            .and_then(|name| fonts.get(name))
            .unwrap_or(&FontDecoder::WinAnsi);

        let (x, y) = state.origin();
        let mut text = String::new();
        for item in items {
            match item {
                Operand::Str(bytes) => {
                    let piece = decoder.decode(bytes);
                    state.advance_text(&piece);
                    text.push_str(&piece);
                }
                Operand::Number(offset) => {
                    if *offset < TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                        text.push(' ');
                    }
                    state.adjust(*offset);
                }
                _ => {}
            }
        }

        if !text.trim().is_empty() {
            let (end_x, _) = state.origin();
            let chars = text.chars().count() as f64;
            let mut run = TextFragment::positioned(text, x, y, self.page_index);
            let advance = (end_x - x) / chars;
            if advance > 0.0 {
                run = run.with_char_advance(advance);
            }
            self.page.runs.push(run);
        }
    }

    fn form(
        &mut self,
        resources: &'a Dictionary,
        name: &str,
        state: &TextState,
        depth: usize,
    ) -> Result<(), BackendError> {
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!(page = self.page_index, xobject = name, "form nesting too deep");
            return Ok(());
        }
        let Some(stream) = sub_dictionary(self.doc, resources, b"XObject")
            .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
            .and_then(|obj| resolve(self.doc, obj).ok())
            .and_then(|obj| obj.as_stream().ok())
        else {
            return Ok(());
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            == Some(b"Form".as_slice());
        if !is_form {
            return Ok(());
        }

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|items| {
                let values: Vec<f64> = items.iter().filter_map(number).collect();
                <[f64; 6]>::try_from(values).ok()
            })
            .map(Matrix::from_array)
            .unwrap_or_default();
        let form_resources = sub_dictionary(self.doc, &stream.dict, b"Resources").unwrap_or(resources);
        let content = stream_bytes(stream)?;

        let mut inner = TextState::with_ctm(matrix.then(&state.ctm));
        inner.params = state.params.clone();
        self.run(&content, form_resources, inner, depth + 1)
    }
}

fn set(op: &Operation, target: &mut f64) {
    if let Some([value]) = op.numbers::<1>() {
        *target = value;
    }
}
