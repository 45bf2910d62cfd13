//! Write adjusted prices back into a PDF.
//!
//! Each affected page gets one extra content stream that paints a white
//! rectangle over the old amount and draws the new one in Helvetica. The
//! original page content is wrapped in `q`/`Q` so graphics state it leaves
//! behind cannot shift the overlay.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use quotekit_core::{OverlayInstruction, QuoteError};
use quotekit_parse::BackendError;

/// Resource name of the overlay font. Unusual enough not to collide.
const OVERLAY_FONT: &str = "QkHelv";

/// Apply an overlay plan to `pdf_bytes` and return the saved PDF.
///
/// Instructions pointing at pages the document does not have are skipped.
///
/// # Errors
///
/// [`QuoteError::ParseError`] when the PDF cannot be loaded or its page
/// tree is malformed, [`QuoteError::PasswordRequired`] for encrypted input.
pub fn bake_overlays(pdf_bytes: &[u8], plan: &[OverlayInstruction]) -> Result<Vec<u8>, QuoteError> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(BackendError::from)?;
    if doc.is_encrypted() {
        return Err(QuoteError::PasswordRequired);
    }
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut by_page: BTreeMap<usize, Vec<&OverlayInstruction>> = BTreeMap::new();
    for instruction in plan {
        if instruction.page_index < page_ids.len() {
            by_page.entry(instruction.page_index).or_default().push(instruction);
        } else {
            tracing::warn!(
                price = %instruction.price_id,
                page = instruction.page_index,
                "overlay targets a missing page"
            );
        }
    }
    if by_page.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    for (page_index, instructions) in by_page {
        let page_id = page_ids[page_index];
        add_font_resource(&mut doc, page_id, font_id)?;
        let content = overlay_content(&instructions);
        append_content(&mut doc, page_id, content)?;
        tracing::debug!(page = page_index, overlays = instructions.len(), "baked overlays");
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Content stream operators for one page's overlays.
pub fn overlay_content(instructions: &[&OverlayInstruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for ins in instructions {
        let c = &ins.cover;
        out.extend_from_slice(
            format!(
                "q 1 1 1 rg {} {} {} {} re f Q\n",
                num(c.x),
                num(c.y),
                num(c.width),
                num(c.height)
            )
            .as_bytes(),
        );
        out.extend_from_slice(
            format!(
                "BT 0 0 0 rg /{OVERLAY_FONT} {} Tf 1 0 0 1 {} {} Tm ",
                num(ins.font_size),
                num(ins.position.x),
                num(ins.position.y)
            )
            .as_bytes(),
        );
        out.extend_from_slice(&pdf_literal(&ins.text));
        out.extend_from_slice(b" Tj ET\n");
    }
    out
}

fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// A PDF literal string in WinAnsi encoding; characters outside it become `?`.
fn pdf_literal(text: &str) -> Vec<u8> {
    let mut out = vec![b'('];
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let (encoded, _, unmappable) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        let byte = if unmappable || encoded.len() != 1 { b'?' } else { encoded[0] };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

fn resolved_dict(doc: &Document, obj: &Object) -> Result<Dictionary, BackendError> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id)?,
        other => other,
    };
    Ok(obj.as_dict()?.clone())
}

/// The page's effective `/Resources`, following `/Parent` inheritance.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, BackendError> {
    let mut node_id = page_id;
    loop {
        let node = doc.get_dictionary(node_id)?;
        if let Ok(resources) = node.get(b"Resources") {
            return resolved_dict(doc, resources);
        }
        match node.get(b"Parent") {
            Ok(parent) => node_id = parent.as_reference()?,
            Err(_) => return Ok(Dictionary::new()),
        }
    }
}

/// Register the overlay font on the page, copying inherited or shared
/// resources onto the page so other pages are unaffected.
fn add_font_resource(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<(), BackendError> {
    let mut resources = effective_resources(doc, page_id)?;
    let mut fonts = match resources.get(b"Font") {
        Ok(fonts) => resolved_dict(doc, fonts)?,
        Err(_) => Dictionary::new(),
    };
    fonts.set(OVERLAY_FONT, font_id);
    resources.set("Font", fonts);
    doc.get_dictionary_mut(page_id)?.set("Resources", resources);
    Ok(())
}

/// Wrap the existing content in `q`/`Q` and append `content` after it.
fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<(), BackendError> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Array(parts)) => parts.clone(),
        Ok(obj @ Object::Reference(_)) => vec![obj.clone()],
        Ok(_) | Err(_) => Vec::new(),
    };

    let mut parts = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        parts.push(Object::Reference(doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()))));
        parts.extend(existing);
        parts.push(Object::Reference(doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()))));
    }
    parts.push(Object::Reference(doc.add_object(Stream::new(dictionary! {}, content))));

    doc.get_dictionary_mut(page_id)?.set("Contents", parts);
    Ok(())
}
