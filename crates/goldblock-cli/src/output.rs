//! Output formatting for the CLI.

use std::fmt::{Display, Write as _};

use anyhow::Result;
use goldblock::core::recover_signer;
use goldblock::{Admission, EntryStatus, LedgerEntry, ProvenanceRecord, VerificationReport};
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable `label: value` lines (default)
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// A view that can be printed either way.
pub trait Render: Serialize {
    fn text(&self) -> String;
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, view: &impl Render) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
            OutputFormat::Text => Ok(view.text()),
        }
    }
}

/// UTF-8 text as-is, anything else as `0x`-prefixed hex.
fn text_or_hex(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

fn field(out: &mut String, label: &str, value: impl Display) {
    let _ = writeln!(out, "{:<20} {}", format!("{}:", label), value);
}

fn list(values: &[u32]) -> String {
    let items: Vec<String> = values.iter().map(u32::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: String,
    pub producer: String,
    pub location: String,
    pub weight: u32,
    pub timestamp: String,
    pub parent_ids: Vec<u32>,
    pub kind: u8,
}

impl From<&ProvenanceRecord> for RecordView {
    fn from(record: &ProvenanceRecord) -> Self {
        Self {
            id: text_or_hex(&record.id),
            producer: text_or_hex(record.producer.as_bytes()),
            location: text_or_hex(&record.location),
            weight: record.weight,
            timestamp: record.timestamp.to_string(),
            parent_ids: record.parent_ids.clone(),
            kind: record.kind,
        }
    }
}

impl RecordView {
    fn write_text(&self, out: &mut String) {
        field(out, "id", &self.id);
        field(out, "producer", &self.producer);
        field(out, "location", &self.location);
        field(out, "weight", self.weight);
        field(out, "timestamp", &self.timestamp);
        field(out, "parents", list(&self.parent_ids));
        field(out, "kind", self.kind);
    }
}

/// Output of `sign`.
#[derive(Debug, Serialize)]
pub struct SignedView {
    pub record: RecordView,
    pub encoding: String,
    pub content_id: String,
    pub signed_message_hash: String,
    pub signature: String,
    pub signer: String,
}

impl Render for SignedView {
    fn text(&self) -> String {
        let mut out = String::new();
        self.record.write_text(&mut out);
        field(&mut out, "encoding", &self.encoding);
        field(&mut out, "content id", &self.content_id);
        field(&mut out, "signed message hash", &self.signed_message_hash);
        field(&mut out, "signature", &self.signature);
        field(&mut out, "signer", &self.signer);
        out
    }
}

/// Output of `submit`.
#[derive(Debug, Serialize)]
pub struct AdmissionView {
    pub index: u32,
    pub content_id: String,
    pub duplicate: bool,
    pub signature: String,
}

impl AdmissionView {
    pub fn new(admission: &Admission, signature: &goldblock::Signature) -> Self {
        Self {
            index: admission.index(),
            content_id: admission.content_id().to_hex(),
            duplicate: admission.is_duplicate(),
            signature: signature.to_hex(),
        }
    }
}

impl Render for AdmissionView {
    fn text(&self) -> String {
        let mut out = String::new();
        let status = if self.duplicate {
            "already admitted"
        } else {
            "admitted"
        };
        field(&mut out, "status", status);
        field(&mut out, "index", self.index);
        field(&mut out, "content id", &self.content_id);
        field(&mut out, "signature", &self.signature);
        out
    }
}

/// Output of `fetch`.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub index: u32,
    pub record: RecordView,
    pub content_id: String,
    pub signature: String,
    pub signer: Option<String>,
    pub verified: bool,
}

impl EntryView {
    pub fn new(entry: &LedgerEntry, verified: bool) -> Self {
        Self {
            index: entry.index,
            record: RecordView::from(&entry.record),
            content_id: entry.content_id.to_hex(),
            signature: entry.signature.to_hex(),
            signer: recover_signer(&entry.content_id, &entry.signature)
                .ok()
                .map(|a| a.to_string()),
            verified,
        }
    }
}

impl Render for EntryView {
    fn text(&self) -> String {
        let mut out = String::new();
        field(&mut out, "index", self.index);
        self.record.write_text(&mut out);
        field(&mut out, "content id", &self.content_id);
        field(&mut out, "signature", &self.signature);
        field(
            &mut out,
            "signer",
            self.signer.as_deref().unwrap_or("(unrecoverable)"),
        );
        field(
            &mut out,
            "verified",
            if self.verified { "yes" } else { "skipped" },
        );
        out
    }
}

/// Output of `ancestors`.
#[derive(Debug, Serialize)]
pub struct AncestorsView {
    pub index: u32,
    pub ancestors: Vec<u32>,
}

impl Render for AncestorsView {
    fn text(&self) -> String {
        let mut out = String::new();
        field(&mut out, "index", self.index);
        field(&mut out, "ancestors", list(&self.ancestors));
        out
    }
}

#[derive(Debug, Serialize)]
pub struct FailureView {
    pub index: u32,
    pub reason: String,
}

/// Output of `verify`.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub total: usize,
    pub valid: usize,
    pub failures: Vec<FailureView>,
}

impl From<&VerificationReport> for ReportView {
    fn from(report: &VerificationReport) -> Self {
        let failures = report
            .entries
            .iter()
            .filter_map(|(index, status)| {
                let reason = match status {
                    EntryStatus::Valid(_) => return None,
                    EntryStatus::ContentIdMismatch { stored, computed } => format!(
                        "content id mismatch: stored {}, computed {}",
                        stored, computed
                    ),
                    EntryStatus::Unauthorized(e) => e.to_string(),
                };
                Some(FailureView {
                    index: *index,
                    reason,
                })
            })
            .collect();

        Self {
            total: report.entries.len(),
            valid: report.valid_count(),
            failures,
        }
    }
}

impl Render for ReportView {
    fn text(&self) -> String {
        let mut out = String::new();
        field(&mut out, "entries", self.total);
        field(&mut out, "valid", self.valid);
        for failure in &self.failures {
            let _ = writeln!(out, "  #{}: {}", failure.index, failure.reason);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_or_hex() {
        assert_eq!(text_or_hex(b"shenzhen"), "shenzhen");
        assert_eq!(text_or_hex("深圳".as_bytes()), "深圳");
        assert_eq!(text_or_hex(&[0xff, 0x00]), "0xff00");
        assert_eq!(text_or_hex(b"a\nb"), "0x610a62");
    }

    #[test]
    fn test_ancestors_both_formats() {
        let view = AncestorsView {
            index: 3,
            ancestors: vec![0, 1, 2],
        };

        let text = Formatter::new(OutputFormat::Text).render(&view).unwrap();
        assert!(text.contains("[0, 1, 2]"));

        let json = Formatter::new(OutputFormat::Json).render(&view).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["ancestors"], serde_json::json!([0, 1, 2]));
    }
}
