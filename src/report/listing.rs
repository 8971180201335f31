//! Recent-file listing in the display time zone
//! Author: kartik4091
//! Created: 2025-06-15

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use super::ReportFormat;
use crate::drive::DriveFile;
use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%d %b %Y, %H:%M";
const EMPTY_NOTICE: &str = "No files in this folder yet.";

#[derive(Serialize)]
struct ListingEntry<'a> {
    index: usize,
    id: &'a str,
    name: &'a str,
    link: &'a str,
    created: String,
}

/// Renders [`DriveFile`] listings with local creation times
#[derive(Debug, Clone, Copy)]
pub struct ListingFormatter {
    offset: FixedOffset,
}

impl ListingFormatter {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| Error::ConfigError(format!("Invalid UTC offset: {}h", utc_offset_hours)))?;
        Ok(Self { offset })
    }

    pub fn local_time(&self, time: &DateTime<Utc>) -> String {
        time.with_timezone(&self.offset).format(DATE_FORMAT).to_string()
    }

    /// `N. 📄 [name](link) (created DD Mon YYYY, HH:MM)`
    pub fn line(&self, index: usize, file: &DriveFile) -> String {
        format!(
            "{}. 📄 [{}]({}) (created {})",
            index,
            file.name,
            file.web_view_link,
            self.local_time(&file.created_time)
        )
    }

    pub fn format(&self, files: &[DriveFile], format: ReportFormat) -> Result<String> {
        if format == ReportFormat::Json {
            let entries: Vec<ListingEntry<'_>> = files
                .iter()
                .enumerate()
                .map(|(i, f)| ListingEntry {
                    index: i + 1,
                    id: &f.id,
                    name: &f.name,
                    link: &f.web_view_link,
                    created: self.local_time(&f.created_time),
                })
                .collect();
            return Ok(serde_json::to_string_pretty(&entries)?);
        }

        let mut out = String::new();
        if format == ReportFormat::Markdown {
            out.push_str("### 📂 Latest files in the shared folder\n\n");
        }
        if files.is_empty() {
            out.push_str(EMPTY_NOTICE);
            out.push('\n');
            return Ok(out);
        }
        for (i, file) in files.iter().enumerate() {
            out.push_str(&self.line(i + 1, file));
            out.push('\n');
        }
        Ok(out)
    }
}
