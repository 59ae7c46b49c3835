// Reporting and output for csrf-audit
// Every phase contributes (phase, subject, result) rows; CSV and Markdown export

use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type ReportRow = (String, String, String);

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let Some(first_char) = field.chars().next() else {
        return String::new();
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping {
        // Prefix with single quote to prevent formula injection
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn report_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("csrf_audit_report_{}.{}", timestamp, extension))
}

pub fn export_csv_to(dir: &Path, results: &[ReportRow]) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "csv");
    let mut file = File::create(&path)?;

    writeln!(file, "Phase,Subject,Result")?;
    for (phase, subject, result) in results {
        writeln!(
            file,
            "{},{},{}",
            escape_csv_field(phase),
            escape_csv_field(subject),
            escape_csv_field(result)
        )?;
    }

    Ok(path)
}

pub fn export_markdown_to(dir: &Path, results: &[ReportRow]) -> Result<PathBuf, std::io::Error> {
    let path = report_path(dir, "md");
    let mut file = File::create(&path)?;

    writeln!(file, "# CSRF Audit Report\n")?;
    let mut current_phase: Option<&str> = None;
    for (phase, subject, result) in results {
        if current_phase != Some(phase.as_str()) {
            writeln!(file, "\n## {}\n", phase)?;
            current_phase = Some(phase.as_str());
        }
        writeln!(file, "- **{}**: {}", subject, result)?;
    }

    Ok(path)
}

/// Write the CSV report into the working directory, returning its name
pub fn export_csv(results: &[ReportRow]) -> Result<String, std::io::Error> {
    export_csv_to(Path::new("."), results).map(|p| file_name(&p))
}

pub fn export_markdown(results: &[ReportRow]) -> Result<String, std::io::Error> {
    export_markdown_to(Path::new("."), results).map(|p| file_name(&p))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
