//! Page-sequence merge
//!
//! Places every page of one document in front of every page of another.
//! The back document's objects are imported with shifted ids and its whole
//! page tree is hung under the front document's page root, so inherited
//! page attributes (MediaBox, Resources, Rotate) keep applying to its pages.

use crate::error::ExportError;
use crate::pdf::{load_document, save_document};
use lopdf::{Document, Object, ObjectId};
use tracing::{info, instrument};

/// Prepend the pages of `front` to the pages of `back`
#[instrument(skip_all, fields(front_len = front.len(), back_len = back.len()))]
pub fn prepend_pages(front: &[u8], back: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut dest = load_document(front)?;
    let source = load_document(back)?;

    let front_count = dest.get_pages().len();
    let back_count = source.get_pages().len();

    let dest_root = pages_root(&dest)?;
    let source_root = pages_root(&source)?;
    let source_catalog = catalog_id(&source)?;

    let offset = dest.max_id;
    for (old_id, object) in source.objects.into_iter() {
        if old_id == source_catalog || is_structural_stream(&object) {
            continue;
        }
        dest.objects
            .insert(shift(old_id, offset), remap_object_refs(object, offset));
    }
    dest.max_id = source.max_id + offset;

    let subtree = shift(source_root, offset);
    match dest.objects.get_mut(&subtree) {
        Some(Object::Dictionary(dict)) => dict.set("Parent", Object::Reference(dest_root)),
        _ => {
            return Err(ExportError::MalformedDocument(
                "page tree root is not a dictionary".into(),
            ))
        }
    }

    match dest.objects.get_mut(&dest_root) {
        Some(Object::Dictionary(pages)) => {
            let mut kids = pages
                .get(b"Kids")
                .and_then(Object::as_array)
                .cloned()
                .unwrap_or_default();
            kids.push(Object::Reference(subtree));
            pages.set("Kids", Object::Array(kids));
            pages.set("Count", Object::Integer((front_count + back_count) as i64));
        }
        _ => {
            return Err(ExportError::MalformedDocument(
                "page tree root is not a dictionary".into(),
            ))
        }
    }

    dest.compress();
    let bytes = save_document(&mut dest)?;
    info!(
        front_pages = front_count,
        back_pages = back_count,
        "Documents merged"
    );
    Ok(bytes)
}

fn shift(id: ObjectId, offset: u32) -> ObjectId {
    (id.0 + offset, id.1)
}

fn catalog_id(doc: &Document) -> Result<ObjectId, ExportError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| ExportError::MalformedDocument("no Root in trailer".into()))
}

fn pages_root(doc: &Document) -> Result<ObjectId, ExportError> {
    let catalog = doc
        .get_dictionary(catalog_id(doc)?)
        .map_err(|e| ExportError::MalformedDocument(format!("invalid catalog: {}", e)))?;
    catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| ExportError::MalformedDocument("no Pages in catalog".into()))
}

/// Cross-reference and object streams describe the source file layout and
/// must not be carried into the destination
fn is_structural_stream(object: &Object) -> bool {
    match object {
        Object::Stream(stream) => matches!(
            stream.dict.get(b"Type").and_then(Object::as_name),
            Ok(b"XRef") | Ok(b"ObjStm")
        ),
        _ => false,
    }
}

/// Recursively shift object references
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference(shift(id, offset)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::decode_text;
    use lopdf::content::Content;
    use lopdf::{dictionary, Dictionary, Stream};
    use pretty_assertions::assert_eq;

    /// PDF whose pages each show `"<prefix> <n>"`
    fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for i in 1..=num_pages {
            let content = format!("BT /F1 12 Tf 72 720 Td ({} {}) Tj ET", prefix, i);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => num_pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn page_texts(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| op.operands.first())
                    .filter_map(|obj| obj.as_str().ok())
                    .map(decode_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    #[test]
    fn test_front_pages_come_first() {
        let front = create_test_pdf(2, "Report");
        let back = create_test_pdf(3, "Lease");
        let merged = prepend_pages(&front, &back).unwrap();

        assert_eq!(
            page_texts(&merged),
            vec!["Report 1", "Report 2", "Lease 1", "Lease 2", "Lease 3"]
        );
    }

    #[test]
    fn test_count_and_inheritance() {
        let merged = prepend_pages(&create_test_pdf(1, "R"), &create_test_pdf(2, "D")).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let root = pages_root(&doc).unwrap();
        let pages = doc.get_dictionary(root).unwrap();
        assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), 3);

        // Back pages still inherit their MediaBox through the nested node
        let last = *doc.get_pages().values().last().unwrap();
        assert_eq!(crate::pdf::media_box(&doc, last), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_single_catalog_survives() {
        let merged = prepend_pages(&create_test_pdf(1, "R"), &create_test_pdf(1, "D")).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let catalogs = doc
            .objects
            .values()
            .filter(|obj| {
                obj.as_dict()
                    .ok()
                    .and_then(|d| d.get(b"Type").ok())
                    .and_then(|t| t.as_name().ok())
                    == Some(b"Catalog".as_slice())
            })
            .count();
        assert_eq!(catalogs, 1);
    }

    #[test]
    fn test_malformed_back_is_fatal() {
        let front = create_test_pdf(1, "R");
        assert!(matches!(
            prepend_pages(&front, b"not a pdf"),
            Err(ExportError::MalformedDocument(_))
        ));
    }
}
