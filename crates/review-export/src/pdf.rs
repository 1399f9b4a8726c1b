//! Small lopdf helpers shared by extraction, overlay and merge

use crate::error::ExportError;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Page tree depth at which attribute inheritance gives up
const MAX_TREE_DEPTH: usize = 32;

pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Load a PDF from raw bytes
pub fn load_document(bytes: &[u8]) -> Result<Document, ExportError> {
    Document::load_mem(bytes).map_err(|e| ExportError::MalformedDocument(e.to_string()))
}

/// Serialize a document to bytes
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::WriteError(e.to_string()))?;
    Ok(buffer)
}

/// Follow one level of indirection
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Parse a PDF rectangle array into `[x1, y1, x2, y2]`
pub fn parse_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0f64; 4];
    for (i, item) in arr.iter().enumerate() {
        values[i] = number(resolve(doc, item))?;
    }
    Some(values)
}

/// Look up a page attribute, walking up `/Parent` links for inheritable keys
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// `[x1, y1, x2, y2]` of the page media box, inherited if needed
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| parse_rect(doc, obj))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

pub fn rotation(doc: &Document, page_id: ObjectId) -> i32 {
    inherited(doc, page_id, b"Rotate")
        .and_then(|obj| match obj {
            Object::Integer(i) => i32::try_from(*i).ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// Page ids in page order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Dictionary value, resolved through a reference, cloned
pub fn dict_value(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Dictionary> {
    let obj = dict.get(key).ok()?;
    resolve(doc, obj).as_dict().ok().cloned()
}

/// Decode a PDF string operand: UTF-16BE with BOM, then UTF-8, then Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// PDF text string: literal when ASCII, UTF-16BE with BOM otherwise
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

pub fn real(v: f64) -> Object {
    Object::Real(v as f32)
}
