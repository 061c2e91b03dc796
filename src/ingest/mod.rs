//! Batch ingestion dispatcher.
//!
//! Routes each uploaded file to its parser by extension, runs the
//! deduplication guard, persists through the store collaborator, and
//! reports a per-file (and, for CSV, per-invoice) status from a fixed
//! vocabulary. Files are processed sequentially and in isolation: one
//! file's failure becomes its status entry and never aborts the batch.
//!
//! The dispatcher owns the temporary input files it is handed and removes
//! each one after processing, on every exit path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::{Invoice, InvoiceStore, NotaError, StoreOutcome, store_invoice};
use crate::csv::parse_nfe_csv;
use crate::pdf::{PdfOutcome, TextStructurer, process_pdf};
use crate::xml::parse_nfe_xml;

/// The closed set of supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Xml,
    Csv,
    Pdf,
}

impl SourceKind {
    /// Pure extension-to-variant mapping, case-insensitive. Anything else
    /// is unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Per-invoice processing outcome. `Display` renders the fixed status
/// vocabulary; failure variants carry the underlying reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    /// Parsed, deduplicated, and stored.
    Success,
    /// An equivalent document was already stored; nothing was written.
    DuplicateSkipped,
    /// The source could not be parsed into a canonical record.
    ParseError(String),
    /// The store rejected the record; nothing partial was written.
    SaveError(String),
    /// The file extension maps to no parser.
    UnsupportedFormat,
    /// PDF without an AI collaborator: only raw text was extracted.
    TextExtracted,
}

impl IngestStatus {
    /// Fixed vocabulary label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DuplicateSkipped => "duplicate-skipped",
            Self::ParseError(_) => "parse-error",
            Self::SaveError(_) => "save-error",
            Self::UnsupportedFormat => "unsupported-format",
            Self::TextExtracted => "extraction-text-only",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One status entry of a batch result.
#[derive(Debug)]
pub struct FileReport {
    /// File name as submitted.
    pub file: String,
    /// Document number, when one was recognized (multi-invoice CSV files
    /// produce one report per invoice).
    pub invoice_number: Option<String>,
    pub status: IngestStatus,
    /// Raw text for the `TextExtracted` outcome, kept for manual handling.
    pub extracted_text: Option<String>,
}

impl FileReport {
    fn plain(file: &str, status: IngestStatus) -> Self {
        Self {
            file: file.to_string(),
            invoice_number: None,
            status,
            extracted_text: None,
        }
    }
}

/// Removes the temporary input file when dropped, covering every exit
/// path out of the per-file processing.
struct TempGuard<'a>(&'a Path);

impl Drop for TempGuard<'_> {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_file(self.0) {
                warn!(file = %self.0.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

/// Process a batch of uploaded files sequentially, in submission order.
///
/// `operator_id` is the operating entity's CNPJ used for role
/// classification; `structurer` is the optional AI collaborator for PDF
/// structuring. Every file yields at least one [`FileReport`]; temporary
/// input files are removed regardless of outcome.
pub fn process_batch(
    files: &[PathBuf],
    operator_id: &str,
    structurer: Option<&dyn TextStructurer>,
    store: &mut dyn InvoiceStore,
) -> Vec<FileReport> {
    let mut reports = Vec::new();

    for path in files {
        let _guard = TempGuard(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let Some(kind) = SourceKind::from_path(path) else {
            reports.push(FileReport::plain(&name, IngestStatus::UnsupportedFormat));
            continue;
        };

        process_file(path, &name, kind, operator_id, structurer, store, &mut reports);
    }

    reports
}

fn process_file(
    path: &Path,
    name: &str,
    kind: SourceKind,
    operator_id: &str,
    structurer: Option<&dyn TextStructurer>,
    store: &mut dyn InvoiceStore,
    reports: &mut Vec<FileReport>,
) {
    info!(file = %name, ?kind, "processing upload");

    match kind {
        SourceKind::Xml => {
            let xml = match read_text(path) {
                Ok(s) => s,
                Err(e) => {
                    reports.push(FileReport::plain(
                        name,
                        IngestStatus::ParseError(e.to_string()),
                    ));
                    return;
                }
            };
            match parse_nfe_xml(&xml, operator_id) {
                Ok(invoice) => reports.push(persist(name, invoice, store)),
                Err(e) => reports.push(FileReport::plain(
                    name,
                    IngestStatus::ParseError(e.to_string()),
                )),
            }
        }
        SourceKind::Csv => {
            let data = match read_text(path) {
                Ok(s) => s,
                Err(e) => {
                    reports.push(FileReport::plain(
                        name,
                        IngestStatus::ParseError(e.to_string()),
                    ));
                    return;
                }
            };
            match parse_nfe_csv(&data, operator_id) {
                // A file that groups into nothing (header only, or every
                // row missing its document number) still owes the batch
                // one status entry.
                Ok(invoices) if invoices.is_empty() => reports.push(FileReport::plain(
                    name,
                    IngestStatus::ParseError("no invoices found in file".into()),
                )),
                Ok(invoices) => {
                    for invoice in invoices {
                        reports.push(persist(name, invoice, store));
                    }
                }
                Err(e) => reports.push(FileReport::plain(
                    name,
                    IngestStatus::ParseError(e.to_string()),
                )),
            }
        }
        SourceKind::Pdf => {
            let bytes = match read_bytes(path) {
                Ok(b) => b,
                Err(e) => {
                    reports.push(FileReport::plain(
                        name,
                        IngestStatus::ParseError(e.to_string()),
                    ));
                    return;
                }
            };
            match process_pdf(&bytes, operator_id, structurer) {
                Ok(PdfOutcome::Structured(invoice)) | Ok(PdfOutcome::Fallback(invoice)) => {
                    reports.push(persist(name, invoice, store));
                }
                Ok(PdfOutcome::TextOnly(text)) => reports.push(FileReport {
                    file: name.to_string(),
                    invoice_number: None,
                    status: IngestStatus::TextExtracted,
                    extracted_text: Some(text),
                }),
                Err(e) => reports.push(FileReport::plain(
                    name,
                    IngestStatus::ParseError(e.to_string()),
                )),
            }
        }
    }
}

fn read_text(path: &Path) -> Result<String, NotaError> {
    Ok(fs::read_to_string(path)?)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, NotaError> {
    Ok(fs::read(path)?)
}

/// Dedup check + insert as one logical unit; every outcome becomes a
/// status entry.
fn persist(name: &str, invoice: Invoice, store: &mut dyn InvoiceStore) -> FileReport {
    let number = invoice.number.clone();
    let status = match store_invoice(store, invoice) {
        Ok(StoreOutcome::Inserted) => IngestStatus::Success,
        Ok(StoreOutcome::Duplicate) => IngestStatus::DuplicateSkipped,
        Err(NotaError::Store(reason)) => IngestStatus::SaveError(reason),
        Err(e) => IngestStatus::SaveError(e.to_string()),
    };
    info!(file = %name, number = %number, status = %status, "invoice processed");
    FileReport {
        file: name.to_string(),
        invoice_number: Some(number),
        status,
        extracted_text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert_eq!(
            SourceKind::from_path(Path::new("a/b/nota.XML")),
            Some(SourceKind::Xml)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("export.Csv")),
            Some(SourceKind::Csv)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("danfe.pdf")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(SourceKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn status_vocabulary() {
        assert_eq!(IngestStatus::Success.code(), "success");
        assert_eq!(IngestStatus::DuplicateSkipped.code(), "duplicate-skipped");
        assert_eq!(IngestStatus::ParseError("x".into()).code(), "parse-error");
        assert_eq!(IngestStatus::SaveError("x".into()).code(), "save-error");
        assert_eq!(IngestStatus::UnsupportedFormat.code(), "unsupported-format");
        assert_eq!(IngestStatus::TextExtracted.code(), "extraction-text-only");
    }
}
