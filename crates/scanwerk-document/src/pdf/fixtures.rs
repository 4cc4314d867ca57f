// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic scans for tests: one text label per page, with the page size and
// resources inherited from the page tree like many scanner PDFs do.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Build a PDF whose pages show the given labels.
///
/// Every page carries an annotation pointing back at its page (`/P`), which
/// makes the object graph cyclic.
pub(crate) fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", name("Font"));
    font.set("Subtype", name("Type1"));
    font.set("BaseFont", name("Helvetica"));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(Object::Dictionary(resources));

    let mut kids = Vec::new();
    for label in labels {
        let content = format!("BT /F1 24 Tf 72 720 Td ({label}) Tj ET");
        let content_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            content.into_bytes(),
        )));

        let page_id = doc.new_object_id();
        let mut annot = Dictionary::new();
        annot.set("Type", name("Annot"));
        annot.set("Subtype", name("Text"));
        annot.set("P", Object::Reference(page_id));
        let annot_id = doc.add_object(Object::Dictionary(annot));

        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        page.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        doc.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", name("Pages"));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    pages.set("Resources", Object::Reference(resources_id));
    pages.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ]),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", name("Catalog"));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture serialises");
    out
}

/// The label drawn on each page, in page order.
pub(crate) fn page_labels(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).expect("valid PDF");
    doc.get_pages()
        .into_values()
        .map(|id| label_of(&doc, id))
        .collect()
}

fn label_of(doc: &Document, page_id: ObjectId) -> String {
    let content = doc.get_page_content(page_id).expect("page content");
    let text = String::from_utf8_lossy(&content);
    let start = text.find('(').expect("label start") + 1;
    let end = text[start..].find(')').expect("label end") + start;
    text[start..end].to_string()
}
