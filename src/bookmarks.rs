//! Section outline embedding built on top of `lopdf`.
//!
//! The paginated export has no notion of text, so the document outline is
//! added afterwards: each report section becomes one top-level bookmark that
//! jumps to the page its first row landed on.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

/// Failure while embedding bookmarks into a finished PDF.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("failed to parse PDF bytes")]
    Parse(#[from] lopdf::Error),
    #[error("failed to write PDF bytes")]
    Write(#[from] std::io::Error),
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    #[error("bookmark '{title}' points at missing page {page}")]
    MissingPage { title: String, page: usize },
}

/// Adds a flat outline mapping every `(title, page)` entry to its page.
///
/// Pages are 1-based.  Returns the input unchanged when `entries` is empty.
pub fn apply_section_bookmarks(
    pdf_bytes: &[u8],
    entries: &[(String, usize)],
) -> Result<Vec<u8>, BookmarkError> {
    if entries.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();
    let mut outline = collect_outline_entries(&mut document, entries, &pages)?;

    let outlines_id = document.new_object_id();
    link_outline_entries(outlines_id, &mut document, &mut outline);
    insert_outlines_root(outlines_id, &mut document, &outline)?;

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
}

fn collect_outline_entries(
    document: &mut Document,
    entries: &[(String, usize)],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry>, BookmarkError> {
    entries
        .iter()
        .map(|(title, page)| {
            let page_ref = u32::try_from(*page)
                .ok()
                .and_then(|number| pages.get(&number).copied())
                .ok_or_else(|| BookmarkError::MissingPage {
                    title: title.clone(),
                    page: *page,
                })?;
            Ok(OutlineEntry {
                object_id: document.new_object_id(),
                page_ref,
                title: title.clone(),
            })
        })
        .collect()
}

fn link_outline_entries(outlines_id: ObjectId, document: &mut Document, entries: &mut [OutlineEntry]) {
    for index in 0..entries.len() {
        let entry = &entries[index];
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", Object::string_literal(entry.title.as_str()));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));
        if index > 0 {
            dictionary.set("Prev", Object::Reference(entries[index - 1].object_id));
        }
        if index + 1 < entries.len() {
            dictionary.set("Next", Object::Reference(entries[index + 1].object_id));
        }

        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }
}

fn insert_outlines_root(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry],
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut dictionary = Dictionary::new();
    dictionary.set("Type", Object::Name("Outlines".into()));
    dictionary.set("Count", Object::Integer(entries.len() as i64));
    if let Some(first) = entries.first() {
        dictionary.set("First", Object::Reference(first.object_id));
    }
    if let Some(last) = entries.last() {
        dictionary.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(dictionary));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;
    use crate::writer::{DocumentWriter, PrintPdfWriter};

    fn two_page_pdf() -> Vec<u8> {
        let mut writer = PrintPdfWriter::new(PageSize::A4, "bookmarks");
        writer.add_page().expect("second page");
        writer.finish().expect("finish")
    }

    #[test]
    fn outline_points_at_pages() {
        let bytes = two_page_pdf();
        let entries = vec![("Summary".to_owned(), 1), ("Details".to_owned(), 2)];

        let with_outline = apply_section_bookmarks(&bytes, &entries).expect("bookmarks");

        let document = Document::load_mem(&with_outline).expect("reload");
        let catalog = document.catalog().expect("catalog");
        assert!(catalog.get(b"Outlines").is_ok());
    }

    #[test]
    fn missing_page_is_reported() {
        let bytes = two_page_pdf();
        let err = apply_section_bookmarks(&bytes, &[("Appendix".to_owned(), 9)]).unwrap_err();
        assert!(matches!(err, BookmarkError::MissingPage { page: 9, .. }));
    }
}
