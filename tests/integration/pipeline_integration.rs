use linkstrip::error::ContentError;
use linkstrip::{DocumentSanitizer, Error, PdfDocument, SanitizerConfig};

use crate::fixtures::{PageSpec, TestFixtures};

#[test]
fn test_label_and_link_are_removed() {
    let input = TestFixtures::get_labelled_pdf();
    let result = DocumentSanitizer::default().sanitize(&input).unwrap();

    assert!(result.redacted);
    assert_eq!(result.page_count, 1);
    assert_eq!(result.regions_redacted(), 1);
    assert_eq!(result.annotations_removed(), 1);
    assert_ne!(result.input_sha256, result.output_sha256);

    let doc = PdfDocument::load(&result.bytes).unwrap();
    assert!(!doc.text_layer(0).unwrap().raw_text().to_lowercase().contains("disposisi"));
    assert!(TestFixtures::annotation_subtypes(&result.bytes, 0).is_empty());
}

#[test]
fn test_unrelated_page_is_left_alone() {
    let input = TestFixtures::get_two_page_pdf();
    let result = DocumentSanitizer::default().sanitize(&input).unwrap();

    assert!(result.redacted);
    assert_eq!(result.page_count, 2);
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].page, 1);

    let doc = PdfDocument::load(&result.bytes).unwrap();
    let first = doc.text_layer(0).unwrap().raw_text();
    assert!(first.contains("Nomor"));
    assert!(!first.contains("Disposisi"));
    assert_eq!(doc.text_layer(1).unwrap().raw_text(), "Lampiran surat");
    assert_eq!(TestFixtures::annotation_subtypes(&result.bytes, 1), vec!["Link".to_string()]);
}

#[test]
fn test_unlabelled_document_is_returned_byte_for_byte() {
    let input = TestFixtures::get_unlabelled_pdf();
    let result = DocumentSanitizer::default().sanitize(&input).unwrap();

    assert!(!result.redacted);
    assert_eq!(result.bytes, input);
    assert_eq!(result.input_sha256, result.output_sha256);
}

#[test]
fn test_sanitizing_twice_is_stable() {
    let sanitizer = DocumentSanitizer::default();
    let once = sanitizer.sanitize(&TestFixtures::get_labelled_pdf()).unwrap();
    let twice = sanitizer.sanitize(&once.bytes).unwrap();

    assert!(!twice.redacted);
    assert_eq!(twice.bytes, once.bytes);
}

#[test]
fn test_custom_phrase() {
    let config = SanitizerConfig { target_phrase: "lampiran SURAT".into(), ..SanitizerConfig::default() };
    let result = DocumentSanitizer::new(config).sanitize(&TestFixtures::get_two_page_pdf()).unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].page, 2);
    assert!(TestFixtures::annotation_subtypes(&result.bytes, 1).is_empty());
    assert_eq!(TestFixtures::annotation_subtypes(&result.bytes, 0), vec!["Link".to_string()]);
}

#[test]
fn test_malformed_input_is_a_decode_error() {
    let err = DocumentSanitizer::default().sanitize(&TestFixtures::get_malformed_pdf()).unwrap_err();
    assert!(matches!(err, Error::DecodeError(_)));
}

#[test]
fn test_partially_overlapping_link_is_removed() {
    let result = DocumentSanitizer::default().sanitize(&TestFixtures::get_partial_overlap_pdf()).unwrap();

    assert!(result.redacted);
    assert_eq!(result.annotations_removed(), 1);
    assert_eq!(
        TestFixtures::annotation_uris(&result.bytes, 0),
        vec!["https://example.org/beside".to_string()]
    );
}

#[test]
fn test_inline_image_survives_redaction() {
    let input = TestFixtures::get_inline_image_pdf();
    let result = DocumentSanitizer::default().sanitize(&input).unwrap();

    assert!(result.redacted);
    assert_eq!(result.annotations_removed(), 1);
    let doc = PdfDocument::load(&result.bytes).unwrap();
    assert_eq!(doc.text_layer(0).unwrap().raw_text(), "Isi surat penting");
    let image: &[u8] = b"ID \x80 EI";
    assert!(result.bytes.windows(image.len()).any(|w| w == image));
}

#[test]
fn test_unreadable_content_is_an_error_not_a_silent_pass() {
    let input = TestFixtures::build(vec![PageSpec::new(
        b"BT /F1 12 Tf 72 700 Td (Link Disposisi) Tj ET BI /W 1 /H 1 ID \x80\x80",
    )]);
    let err = DocumentSanitizer::default().sanitize(&input).unwrap_err();
    assert!(matches!(err, Error::ContentError(ContentError::Unparseable(_))));
}
