use thiserror::Error;

/// Errors that can occur while ingesting or normalizing a fiscal document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotaError {
    /// Required structure absent from the source document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Low-level XML reader failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// Low-level CSV reader failure.
    #[error("CSV error: {0}")]
    Csv(String),

    /// PDF could not be loaded or yielded no text.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The AI text-structuring collaborator failed terminally
    /// (after bounded retries for transient conditions).
    #[error("AI collaborator error: {0}")]
    Ai(String),

    /// Persistence collaborator failure. The candidate invoice and its
    /// line items were not stored.
    #[error("storage error: {0}")]
    Store(String),

    /// Filesystem failure reading or cleaning up an input file.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for NotaError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
