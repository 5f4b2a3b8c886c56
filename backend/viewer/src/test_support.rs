use bytes::Bytes;
use lopdf::{dictionary, Document, Object};

/// Build a minimal A4 PDF with `pages` blank pages. The MediaBox lives on the
/// page tree root so every page inherits it.
pub fn sample_pdf(pages: u32) -> Bytes {
    build(pages, None)
}

/// Like [`sample_pdf`], with `/Rotate` set on every page.
pub fn sample_pdf_rotated(pages: u32, rotate: i64) -> Bytes {
    build(pages, Some(rotate))
}

fn build(pages: u32, rotate: Option<i64>) -> Bytes {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            if let Some(rotate) = rotate {
                page.set("Rotate", rotate);
            }
            doc.add_object(page).into()
        })
        .collect();
    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(595),
        Object::Integer(842),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(pages),
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("in-memory save");
    Bytes::from(buf)
}
