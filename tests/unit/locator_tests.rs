use linkstrip::pdf_document::PdfDocument;
use linkstrip::types::{RedactableDocument, RedactablePage};
use linkstrip::{LabelLocator, Redactor, SanitizerConfig};

use crate::fixtures::{PageSpec, TestFixtures};

#[test]
fn test_locator_reports_label_position() {
    let mut doc = PdfDocument::load(&TestFixtures::get_labelled_pdf()).unwrap();
    let page = doc.page(0).unwrap();

    let regions = LabelLocator::from_config(&SanitizerConfig::default()).locate(&page).unwrap();
    assert_eq!(regions.len(), 1);
    let rect = regions[0].rect;
    assert!((rect.x0 - 72.0).abs() < 0.5);
    assert!(rect.y0 < 700.0 && rect.y1 > 700.0);
    assert!(rect.x1 > 140.0 && rect.x1 < 160.0);
}

#[test]
fn test_label_split_over_kerning_is_found() {
    let bytes = TestFixtures::build(vec![PageSpec::new(
        b"BT /F1 12 Tf 72 700 Td [(Li) 20 (nk D) -15 (isposisi)] TJ ET",
    )]);
    let mut doc = PdfDocument::load(&bytes).unwrap();
    let page = doc.page(0).unwrap();
    assert_eq!(LabelLocator::new("Link Disposisi").locate(&page).unwrap().len(), 1);
}

#[test]
fn test_redactor_keeps_following_text_in_place() {
    let bytes = TestFixtures::build(vec![PageSpec::new(b"BT /F1 12 Tf 72 700 Td (Link Disposisi: Kabag) Tj ET")]);
    let mut doc = PdfDocument::load(&bytes).unwrap();
    let before: Vec<f64> = doc.text_layer(0).unwrap().glyphs.iter().map(|g| g.rect.x0).collect();

    let mut page = doc.page(0).unwrap();
    let regions = LabelLocator::new("Link Disposisi").locate(&page).unwrap();
    let outcome = Redactor::default().redact_page(&mut page, &regions).unwrap();
    assert_eq!(outcome.glyphs_removed, 14);
    drop(page);

    let after = doc.text_layer(0).unwrap();
    assert_eq!(after.raw_text(), ": Kabag");
    assert!((after.glyphs[0].rect.x0 - before[14]).abs() < 1e-3);
}
