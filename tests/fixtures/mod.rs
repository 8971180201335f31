//! PDF fixtures built in memory
//! Author: kartik4091

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Content and annotations of one fixture page
pub struct PageSpec {
    pub content: Vec<u8>,
    pub annots: Vec<Object>,
}

impl PageSpec {
    pub fn new(content: &[u8]) -> Self {
        Self { content: content.to_vec(), annots: Vec::new() }
    }

    pub fn with_annot(mut self, annot: Dictionary) -> Self {
        self.annots.push(Object::Dictionary(annot));
        self
    }
}

pub struct TestFixtures;

impl TestFixtures {
    /// Label at the usual spot, with a link over it
    pub fn get_labelled_pdf() -> Vec<u8> {
        Self::build(vec![PageSpec::new(b"BT /F1 12 Tf 72 700 Td (Link Disposisi) Tj ET")
            .with_annot(Self::link(70, 695, 150, 712, "https://example.org/disposisi"))])
    }

    /// Page 1 carries the label and its link; page 2 has body text and an unrelated link
    pub fn get_two_page_pdf() -> Vec<u8> {
        Self::build(vec![
            PageSpec::new(b"BT /F1 12 Tf 72 700 Td (Link Disposisi) Tj 0 -20 Td (Nomor: 12/2025) Tj ET")
                .with_annot(Self::link(70, 695, 150, 712, "https://example.org/disposisi")),
            PageSpec::new(b"BT /F1 12 Tf 72 110 Td (Lampiran surat) Tj ET")
                .with_annot(Self::link(72, 100, 200, 120, "https://example.org/lampiran")),
        ])
    }

    pub fn get_unlabelled_pdf() -> Vec<u8> {
        Self::build(vec![PageSpec::new(b"BT /F1 12 Tf 72 700 Td (Surat Keputusan) Tj ET")])
    }

    pub fn get_malformed_pdf() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF".to_vec()
    }

    pub fn link(x0: i64, y0: i64, x1: i64, y1: i64, uri: &str) -> Dictionary {
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![x0.into(), y0.into(), x1.into(), y1.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            },
        }
    }

    /// Helvetica `/F1` on every page, annotations stored as indirect objects
    pub fn build(pages: Vec<PageSpec>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for spec in pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, spec.content));
            let annots: Vec<Object> = spec.annots.into_iter().map(|a| doc.add_object(a).into()).collect();
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Annots" => annots,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("fixture serializes");
        out
    }

    /// Page with the label, a link overlapping only its tail and a link beside it
    pub fn get_partial_overlap_pdf() -> Vec<u8> {
        Self::build(vec![PageSpec::new(b"BT /F1 12 Tf 72 700 Td (Link Disposisi) Tj ET")
            .with_annot(Self::link(140, 695, 300, 712, "https://example.org/partial"))
            .with_annot(Self::link(300, 695, 400, 712, "https://example.org/beside"))])
    }

    /// Label, then an inline image, then body text
    pub fn get_inline_image_pdf() -> Vec<u8> {
        Self::build(vec![PageSpec::new(
            b"BT /F1 12 Tf 72 700 Td (Link Disposisi) Tj ET \
              q 10 0 0 10 72 500 cm BI /W 1 /H 1 /BPC 8 /CS /G ID \x80 EI Q \
              BT /F1 12 Tf 72 600 Td (Isi surat penting) Tj ET",
        )
        .with_annot(Self::link(70, 695, 150, 712, "https://example.org/disposisi"))])
    }

    /// URIs of the link annotations still linked from page `index`
    pub fn annotation_uris(bytes: &[u8], index: usize) -> Vec<String> {
        let doc = Document::load_mem(bytes).expect("fixture reloads");
        let page_id = *doc.get_pages().values().nth(index).expect("page exists");
        let page = doc.get_dictionary(page_id).expect("page dictionary");
        let Ok(annots) = page.get(b"Annots").and_then(|o| o.as_array()) else {
            return Vec::new();
        };
        annots
            .iter()
            .filter_map(|o| o.as_reference().ok())
            .filter_map(|id| doc.get_dictionary(id).ok())
            .filter_map(|d| d.get(b"A").and_then(|a| a.as_dict()).ok())
            .filter_map(|a| match a.get(b"URI") {
                Ok(Object::String(uri, _)) => Some(String::from_utf8_lossy(uri).into_owned()),
                _ => None,
            })
            .collect()
    }

    /// Subtypes of the annotations still linked from page `index`
    pub fn annotation_subtypes(bytes: &[u8], index: usize) -> Vec<String> {
        let doc = Document::load_mem(bytes).expect("fixture reloads");
        let page_id = *doc.get_pages().values().nth(index).expect("page exists");
        let page = doc.get_dictionary(page_id).expect("page dictionary");
        let Ok(annots) = page.get(b"Annots").and_then(|o| o.as_array()) else {
            return Vec::new();
        };
        annots
            .iter()
            .filter_map(|o| match o {
                Object::Reference(id) => doc.get_dictionary(*id).ok(),
                Object::Dictionary(d) => Some(d),
                _ => None,
            })
            .filter_map(|d| d.get(b"Subtype").and_then(|s| s.as_name()).ok())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }
}
