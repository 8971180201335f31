use chrono::{TimeZone, Utc};
use linkstrip::{DriveFile, ListingFormatter, ReportFormat};

fn file(name: &str, hour: u32) -> DriveFile {
    DriveFile {
        id: format!("id-{}", name),
        name: name.to_string(),
        web_view_link: format!("https://drive.example/{}", name),
        created_time: Utc.with_ymd_and_hms(2025, 6, 14, hour, 5, 0).unwrap(),
    }
}

#[test]
fn test_listing_uses_configured_offset() {
    let listing = ListingFormatter::new(7).unwrap();
    let text = listing.format(&[file("a.pdf", 1), file("b.pdf", 18)], ReportFormat::Text).unwrap();
    assert!(text.contains("1. 📄 [a.pdf](https://drive.example/a.pdf) (created 14 Jun 2025, 08:05)"));
    assert!(text.contains("2. 📄 [b.pdf](https://drive.example/b.pdf) (created 15 Jun 2025, 01:05)"));
}

#[test]
fn test_listing_formats_parse_from_cli_names() {
    assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
    assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
    assert!("xml".parse::<ReportFormat>().is_err());
}

#[test]
fn test_json_listing_is_machine_readable() {
    let listing = ListingFormatter::new(0).unwrap();
    let json = listing.format(&[file("a.pdf", 9)], ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["name"], "a.pdf");
    assert_eq!(value[0]["index"], 1);
}
