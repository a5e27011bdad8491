//! Report renderings: text, CSV, HTML, JSON.

use std::fmt::Write as _;

use super::report::Report;
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Csv,
    Html,
    Json,
}

impl ReportFormat {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "text" | "txt" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(ValidationError::InvalidArgument(format!(
                "unknown report format {}, expected text, csv, html or json",
                other
            ))
            .into()),
        }
    }
}

impl Report {
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Csv => self.render_csv(),
            ReportFormat::Html => self.render_html(),
            ReportFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ValidationError::InvalidArgument(e.to_string()))?,
        })
    }

    /// Findings grouped by message, then a summary line.
    fn render_text(&self) -> String {
        let mut out = String::new();
        for (finding, names) in self.by_finding() {
            let _ = writeln!(out, "{}:", finding);
            for name in names {
                let f = &self.secrets[&name].findings[&finding];
                let _ = writeln!(out, "  - {} ({}): {}", name, f.severity, f.message);
            }
        }
        let _ = writeln!(
            out,
            "{} of {} secrets have findings",
            self.flagged(),
            self.len()
        );
        out
    }

    fn render_csv(&self) -> String {
        let mut out = String::from("secret,finding,severity,message,age_days\n");
        for (name, report) in &self.secrets {
            let age = report.age_days.map(|d| d.to_string()).unwrap_or_default();
            for (finding, f) in &report.findings {
                let _ = writeln!(
                    out,
                    "{},{},{},{},{}",
                    csv_field(name),
                    csv_field(finding),
                    f.severity,
                    csv_field(&f.message),
                    age
                );
            }
        }
        out
    }

    fn render_html(&self) -> String {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>gpass audit</title></head>\n<body>\n<table>\n<tr><th>Secret</th><th>Finding</th><th>Severity</th><th>Message</th><th>Age (days)</th></tr>\n",
        );
        for (name, report) in &self.secrets {
            let age = report.age_days.map(|d| d.to_string()).unwrap_or_default();
            for (finding, f) in &report.findings {
                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>",
                    html_escape(name),
                    html_escape(finding),
                    f.severity,
                    f.severity,
                    html_escape(&f.message),
                    age
                );
            }
        }
        out.push_str("</table>\n</body>\n</html>\n");
        out
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::report::{Finding, ReportBuilder};
    use super::*;

    fn sample() -> Report {
        let b = ReportBuilder::new();
        b.add_password("a", "p");
        b.add_password("b", "p");
        b.add_finding("web/<x>", "name", Finding::error("password equals the secret name"));
        b.set_age("a", 3);
        b.finalize()
    }

    #[test]
    fn test_text() {
        let text = sample().render(ReportFormat::Text).unwrap();
        assert!(text.contains("duplicates:\n  - a (warning): password shared with b\n"));
        assert!(text.ends_with("3 of 3 secrets have findings\n"));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let b = ReportBuilder::new();
        b.add_password("a", "p");
        b.add_password("b", "p");
        b.add_password("c", "p");
        let csv = b.finalize().render(ReportFormat::Csv).unwrap();
        assert!(csv.starts_with("secret,finding,severity,message,age_days\n"));
        assert!(csv.contains("a,duplicates,warning,\"password shared with b, c\",\n"));
    }

    #[test]
    fn test_html_escapes() {
        let html = sample().render(ReportFormat::Html).unwrap();
        assert!(html.contains("<td>web/&lt;x&gt;</td>"));
        assert!(html.contains("<td>3</td>"));
    }

    #[test]
    fn test_json() {
        let json = sample().render(ReportFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["secrets"]["a"]["age_days"], 3);
        assert_eq!(v["secrets"]["b"]["findings"]["duplicates"]["severity"], "warning");
        assert!(ReportFormat::from_name("pdf").is_err());
    }
}
