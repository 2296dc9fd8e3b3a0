//! Shared output formatting for check results.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use treewalk_core::{AuditReport, Severity, Violation};

use crate::OutputFormat;

/// Print check results in the specified format.
pub fn print(report: &AuditReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print_compact(report),
    }
    Ok(())
}

fn count_by_severity(report: &AuditReport) -> (usize, usize, usize) {
    report.violations().fold((0, 0, 0), |(e, w, i), (_, v)| match v.severity {
        Severity::Error => (e + 1, w, i),
        Severity::Warning => (e, w + 1, i),
        Severity::Info | Severity::Ignore => (e, w, i + 1),
    })
}

fn print_text(report: &AuditReport) {
    let (errors, warnings, infos) = count_by_severity(report);

    for (path, violation) in report.violations() {
        let severity_indicator = match violation.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
            Severity::Info | Severity::Ignore => "\x1b[34minfo\x1b[0m",
        };

        println!("{} at {}", violation.check, location(path, violation));
        println!("  {}: {}", severity_indicator, violation.message);
        println!();
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    let cached = report.files.iter().filter(|f| f.cached).count();
    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} file(s) ({} unchanged)\x1b[0m",
        summary_color,
        errors,
        warnings,
        infos,
        report.files_checked(),
        cached
    );
}

/// JSON shape of one violation.
#[derive(Serialize)]
struct JsonViolation<'a> {
    file: &'a Path,
    #[serde(flatten)]
    violation: &'a Violation,
}

/// JSON shape of a whole run.
#[derive(Serialize)]
struct JsonReport<'a> {
    files_checked: usize,
    threshold_count: usize,
    violations: Vec<JsonViolation<'a>>,
}

fn print_json(report: &AuditReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&json_report(report))?;
    println!("{json}");
    Ok(())
}

fn json_report(report: &AuditReport) -> JsonReport<'_> {
    JsonReport {
        files_checked: report.files_checked(),
        threshold_count: report.threshold_count,
        violations: report
            .violations()
            .map(|(file, violation)| JsonViolation { file, violation })
            .collect(),
    }
}

fn print_compact(report: &AuditReport) {
    for (path, violation) in report.violations() {
        println!(
            "{}: {} [{}] {}",
            location(path, violation),
            violation.severity,
            violation.check,
            violation.message,
        );
    }
}

/// `path:line` or `path:line:column` when the column is known.
fn location(path: &Path, violation: &Violation) -> String {
    if violation.column == 0 {
        format!("{}:{}", path.display(), violation.line)
    } else {
        format!("{}:{}:{}", path.display(), violation.line, violation.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use treewalk_core::FileReport;

    fn sample() -> AuditReport {
        let violation = Violation::new(3, 5, Severity::Warning, "block.empty", vec!["if".into()], Some("Empty {0} block."), "EmptyBlock");
        AuditReport {
            files: vec![FileReport {
                path: PathBuf::from("src/A.java"),
                violations: vec![violation],
                cached: false,
            }],
            threshold_count: 1,
        }
    }

    #[test]
    fn location_omits_unknown_column() {
        let report = sample();
        let (path, violation) = report.violations().next().unwrap();
        assert_eq!(location(path, violation), "src/A.java:3:5");
        let whole_line = Violation { column: 0, ..violation.clone() };
        assert_eq!(location(path, &whole_line), "src/A.java:3");
    }

    #[test]
    fn json_carries_file_and_violation_fields() {
        let report = sample();
        let value = serde_json::to_value(json_report(&report)).unwrap();
        assert_eq!(value["threshold_count"], 1);
        assert_eq!(value["violations"][0]["file"], "src/A.java");
        assert_eq!(value["violations"][0]["message"], "Empty if block.");
        assert_eq!(value["violations"][0]["severity"], "warning");
    }

    #[test]
    fn counts_by_severity() {
        assert_eq!(count_by_severity(&sample()), (0, 1, 0));
    }
}
