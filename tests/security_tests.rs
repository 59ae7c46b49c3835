/// Security tests for csrf-audit reports
/// Tests CSV injection protection and escaping of values taken from the target

use csrf_audit::reporting::{export_csv_to, export_markdown_to, ReportRow};
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("csrf_audit_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be writable");
    dir
}

fn row(phase: &str, subject: &str, result: &str) -> ReportRow {
    (phase.to_string(), subject.to_string(), result.to_string())
}

#[test]
fn test_csv_injection_protection() {
    // Token values and form actions come straight from the target page
    let dir = scratch_dir("injection");
    let results = vec![
        row("Evaluating", "http://t/a", "=HYPERLINK(\"http://evil.com\")"),
        row("Evaluating", "http://t/b", "+cmd|'/C calc'!A1"),
        row("Comparing", "-2+3+cmd|'/C calc'!A1", "shared by 2 token(s)"),
        row("Comparing", "@SUM(1+1)*cmd|'/C calc'!A1", "shared by 3 token(s)"),
        row("Evaluating", "http://t/c", "\t=1+1"),
    ];

    let path = export_csv_to(&dir, &results).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read CSV file");

    assert!(content.contains("\"'=HYPERLINK"), "CSV should escape = prefix");
    assert!(content.contains("\"'+cmd"), "CSV should escape + prefix");
    assert!(content.contains("\"'-2+3"), "CSV should escape - prefix");
    assert!(content.contains("\"'@SUM"), "CSV should escape @ prefix");
    assert!(content.contains("\"'\t=1+1"), "CSV should escape tab prefix");
    assert!(content.starts_with("Phase,Subject,Result\n"), "CSV header should be intact");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_csv_normal_content_not_escaped() {
    let dir = scratch_dir("plain");
    let results = vec![row("Testing", "http://t/post remove", "BYPASS SUCCEEDED")];

    let path = export_csv_to(&dir, &results).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should read CSV");

    assert!(content.contains("Testing,http://t/post remove,BYPASS SUCCEEDED"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_csv_comma_and_quote_escaping() {
    let dir = scratch_dir("quotes");
    let results = vec![row("Comparing", "http://t/a / http://t/b", "value \"a,b\" reused")];

    let path = export_csv_to(&dir, &results).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should read CSV");

    assert!(content.contains("\"value \"\"a,b\"\" reused\""), "Quotes should be doubled inside a quoted field");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_csv_empty_fields() {
    let dir = scratch_dir("empty");
    let results = vec![row("Analysing", "", "")];

    let path = export_csv_to(&dir, &results).expect("CSV export should succeed");
    let content = fs::read_to_string(&path).expect("Should read CSV");

    assert!(content.contains("Analysing,,\n"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_markdown_export_structure() {
    let dir = scratch_dir("markdown");
    let results = vec![
        row("Testing", "http://t/post remove", "BYPASS SUCCEEDED"),
        row("Testing", "http://t/post clear", "PROTECTION HELD"),
        row("Analysing", "monobit", "non-random"),
    ];

    let path = export_markdown_to(&dir, &results).expect("Markdown export should succeed");
    let content = fs::read_to_string(&path).expect("Should be able to read markdown file");

    assert!(content.starts_with("# CSRF Audit Report\n"), "Should have header");
    assert_eq!(content.matches("## Testing").count(), 1, "Rows of one phase share a heading");
    assert!(content.contains("## Analysing"));
    assert!(content.contains("- **http://t/post remove**: BYPASS SUCCEEDED"));
    assert_eq!(content.lines().filter(|l| l.starts_with("- ")).count(), 3);

    let _ = fs::remove_dir_all(&dir);
}
