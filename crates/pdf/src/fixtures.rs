//! In-memory PDF documents for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Metadata title written by [`simple_document`].
pub const METADATA_TITLE: &str = "Fixture Metadata Title";

fn helvetica_widths() -> Object {
    Object::Array(
        (32..127)
            .map(|code| match code {
                32 => 278,
                72 => 722,
                _ => 556,
            })
            .map(Object::Integer)
            .collect(),
    )
}

fn helvetica(doc: &mut Document) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "FirstChar" => 32,
        "Widths" => helvetica_widths(),
    })
}

/// `BT /F1 size Tf x y Td (text) Tj ET`
pub fn show_text(text: &str, size: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn stream(operations: Vec<Operation>) -> Stream {
    let content = Content { operations };
    Stream::new(dictionary! {}, content.encode().unwrap())
}

/// Save a document whose pages draw `pages`, sharing one font resource on
/// the page tree root.
pub fn document(pages: Vec<Vec<Operation>>, info_title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = helvetica(&mut doc);

    let kids: Vec<Object> = pages
        .into_iter()
        .map(|ops| {
            let content_id = doc.add_object(stream(ops));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = info_title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One page with `title` at `size` above a line of body text.
pub fn simple_document(title: &str, size: f32) -> Vec<u8> {
    let mut ops = show_text(title, size as i64, 72, 700);
    ops.extend(show_text("Body text of the document", 10, 72, 600));
    document(vec![ops], Some(METADATA_TITLE))
}

/// One page drawing a form XObject (with its own font) and an image.
pub fn figure_document() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = helvetica(&mut doc);

    let form_ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), 30.into()]),
        Operation::new("Td", vec![100.into(), 500.into()]),
        Operation::new("Tj", vec![Object::string_literal("Poster Title Here")]),
        Operation::new("ET", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), 12.into()]),
        Operation::new("Td", vec![100.into(), 460.into()]),
        Operation::new("Tj", vec![Object::string_literal("by the authors")]),
        Operation::new("ET", vec![]),
    ];
    let form_content = Content {
        operations: form_ops,
    };
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F2" => font_id },
            },
        },
        form_content.encode().unwrap(),
    ));

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0],
    ));

    let mut page_ops = vec![
        Operation::new("q", vec![]),
        Operation::new("Do", vec!["Fm1".into()]),
        Operation::new("Q", vec![]),
        Operation::new("Do", vec!["Im1".into()]),
    ];
    page_ops.extend(show_text("small print", 8, 72, 100));
    let content_id = doc.add_object(stream(page_ops));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Fm1" => form_id, "Im1" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
