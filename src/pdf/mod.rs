//! PDF ingestion: text extraction, AI-assisted structuring, and a
//! deterministic regex fallback.
//!
//! A PDF carries no reliable structure, so the adapter extracts raw text
//! and delegates structuring to an external AI collaborator (the
//! [`TextStructurer`] contract). The collaborator's output is sanitized
//! against a small, enumerated set of malformations (markdown
//! fences, stray braces); anything beyond that set routes to the regex
//! fallback rather than open-ended recovery. The AI's directionality guess
//! is never trusted — the operation role is always recomputed from CNPJs.

mod adapter;
mod extract;

pub use adapter::{
    INSTRUCTION, PdfOutcome, TextStructurer, fallback_from_text, process_pdf, sanitize_response,
};
pub use extract::extract_text;
