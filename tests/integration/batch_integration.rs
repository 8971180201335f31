use linkstrip::{
    BatchProcessor, DocumentSanitizer, LocalSink, OutcomeStatus, ReportFormat, ReportFormatter, UploadSession,
    UploadedFile,
};
use tempfile::TempDir;

use crate::fixtures::TestFixtures;

fn batch() -> Vec<UploadedFile> {
    vec![
        UploadedFile::new("surat-1.pdf", TestFixtures::get_labelled_pdf()),
        UploadedFile::new("surat-2.pdf", TestFixtures::get_unlabelled_pdf()),
        UploadedFile::new("rusak.pdf", TestFixtures::get_malformed_pdf()),
    ]
}

#[tokio::test]
async fn test_batch_into_local_directory() {
    let dir = TempDir::new().unwrap();
    let processor = BatchProcessor::new(DocumentSanitizer::default(), LocalSink::new(dir.path()), "");
    let mut session = UploadSession::new();

    let report = processor.process(&mut session, batch()).await;

    let statuses: Vec<&OutcomeStatus> = report.outcomes.iter().map(|o| &o.status).collect();
    assert!(matches!(statuses[0], OutcomeStatus::Redacted { annotations_removed: 1, .. }));
    assert_eq!(statuses[1], &OutcomeStatus::Unchanged);
    assert!(matches!(statuses[2], OutcomeStatus::Failed { .. }));
    assert!(report.has_failures());

    assert!(dir.path().join("surat-1.pdf").exists());
    let stored = std::fs::read(dir.path().join("surat-2.pdf")).unwrap();
    assert_eq!(stored, TestFixtures::get_unlabelled_pdf());
    assert!(!dir.path().join("rusak.pdf").exists());

    assert_eq!(session.processed_names(), ["surat-1.pdf".to_string(), "surat-2.pdf".to_string()]);
}

#[tokio::test]
async fn test_resubmitted_files_are_skipped_until_reset() {
    let dir = TempDir::new().unwrap();
    let processor = BatchProcessor::new(DocumentSanitizer::default(), LocalSink::new(dir.path()), "");
    let mut session = UploadSession::new();

    processor.process(&mut session, batch()).await;
    let again = processor.process(&mut session, batch()).await;
    let summary = again.summary();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 1);

    session.reset();
    let processor = BatchProcessor::new(
        DocumentSanitizer::default(),
        LocalSink::new(dir.path()).overwrite(true),
        "",
    );
    let after_reset = processor.process(&mut session, batch()).await;
    assert_eq!(after_reset.generation, 1);
    assert_eq!(after_reset.summary().skipped, 0);
    assert_eq!(after_reset.summary().redacted, 1);
}

#[tokio::test]
async fn test_report_lists_every_document() {
    let dir = TempDir::new().unwrap();
    let processor = BatchProcessor::new(DocumentSanitizer::default(), LocalSink::new(dir.path()), "");
    let report = processor.process(&mut UploadSession::new(), batch()).await;

    let text = ReportFormatter::new("Link Disposisi").format(&report, ReportFormat::Text).unwrap();
    assert!(text.contains("✅ surat-1.pdf"));
    assert!(text.contains("⚠️ surat-2.pdf"));
    assert!(text.contains("❌ rusak.pdf"));
    assert!(text.contains("Total PDFs processed : 3"));
}
