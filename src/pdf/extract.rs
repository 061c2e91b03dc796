use lopdf::Document;
use tracing::debug;

use crate::core::NotaError;

/// Extract the raw text of every page, newline-joined.
///
/// A page that fails to decode is skipped; a document yielding no text at
/// all is a terminal [`NotaError::Pdf`] for this file — there is nothing
/// downstream can do with an empty extraction.
pub fn extract_text(bytes: &[u8]) -> Result<String, NotaError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| NotaError::Pdf(format!("failed to load PDF: {e}")))?;

    let mut out = String::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(content) => {
                let content = content.trim();
                if !content.is_empty() {
                    out.push_str(content);
                    out.push('\n');
                }
            }
            Err(e) => debug!(page = page_number, error = %e, "page text extraction failed"),
        }
    }

    let out = out.trim().to_string();
    if out.is_empty() {
        return Err(NotaError::Pdf("PDF yielded no extractable text".into()));
    }
    Ok(out)
}
