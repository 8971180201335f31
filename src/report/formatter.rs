//! Report formatter implementation
//! Author: kartik4091
//! Created: 2025-06-05

use serde::Serialize;

use super::ReportFormat;
use crate::error::Result;
use crate::session::{BatchReport, BatchSummary, DocumentOutcome, OutcomeStatus};

/// Formats batch reports into the supported output formats
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    phrase: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    phrase: &'a str,
    generation: u64,
    summary: BatchSummary,
    documents: &'a [DocumentOutcome],
}

impl ReportFormatter {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self { phrase: phrase.into() }
    }

    pub fn format(&self, report: &BatchReport, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text(report)),
            ReportFormat::Markdown => Ok(self.to_markdown(report)),
            ReportFormat::Json => self.to_json(report),
        }
    }

    /// One line describing what happened to a document
    pub fn outcome_line(&self, outcome: &DocumentOutcome) -> String {
        match &outcome.status {
            OutcomeStatus::Redacted { .. } => format!("✅ {} → label removed and stored", outcome.name),
            OutcomeStatus::Unchanged => {
                format!("⚠️ {} → text '{}' not found (stored as is)", outcome.name, self.phrase)
            }
            OutcomeStatus::Skipped => format!("⏭️ {} → already processed in this session", outcome.name),
            OutcomeStatus::Failed { reason } => format!("❌ {} → failed: {}", outcome.name, reason),
        }
    }

    fn to_text(&self, report: &BatchReport) -> String {
        let mut output = String::new();
        for outcome in &report.outcomes {
            output.push_str(&self.outcome_line(outcome));
            output.push('\n');
        }

        let summary = report.summary();
        output.push_str("\n📊 Summary\n");
        output.push_str(&format!("- Total PDFs processed : {}\n", summary.total));
        output.push_str(&format!("- Label removed        : {}\n", summary.redacted));
        output.push_str(&format!("- Label not found      : {}\n", summary.unchanged));
        output.push_str(&format!("- Skipped              : {}\n", summary.skipped));
        output.push_str(&format!("- Failed               : {}\n", summary.failed));
        output
    }

    fn to_markdown(&self, report: &BatchReport) -> String {
        let mut md = String::new();
        for outcome in &report.outcomes {
            md.push_str(&format!("- {}\n", self.outcome_line(outcome)));
        }

        let summary = report.summary();
        md.push_str("\n### 📊 Summary\n");
        md.push_str(&format!("- Total PDFs processed: **{}**\n", summary.total));
        md.push_str(&format!("- Label removed: **{}**\n", summary.redacted));
        md.push_str(&format!("- Label not found: **{}**\n", summary.unchanged));
        md.push_str(&format!("- Skipped: **{}**\n", summary.skipped));
        md.push_str(&format!("- Failed: **{}**\n", summary.failed));
        md
    }

    fn to_json(&self, report: &BatchReport) -> Result<String> {
        let json = JsonReport {
            phrase: &self.phrase,
            generation: report.generation,
            summary: report.summary(),
            documents: &report.outcomes,
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
