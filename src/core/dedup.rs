use tracing::debug;

use super::error::NotaError;
use super::store::InvoiceStore;
use super::types::Invoice;

/// Outcome of offering a candidate invoice to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Stored, together with all line items.
    Inserted,
    /// An equivalent document already exists; nothing was written.
    /// Distinct from an error — re-ingesting a known document is routine.
    Duplicate,
}

/// Find a stored invoice that makes `candidate` a duplicate.
///
/// With a non-empty access key the key alone decides; otherwise the
/// (number, issuer tax ID, issue date) triple does.
pub fn find_duplicate<'a>(
    store: &'a dyn InvoiceStore,
    candidate: &Invoice,
) -> Option<&'a Invoice> {
    if candidate.has_access_key() {
        store.find_by_access_key(&candidate.access_key)
    } else {
        let (number, issuer, date) = candidate.identity();
        store.find_by_identity(number, issuer, date)
    }
}

/// Deduplication guard: persist `invoice` unless an equivalent document is
/// already stored.
///
/// The check and the insert are one logical unit per candidate; the store's
/// own uniqueness enforcement remains the final arbiter, so a concurrent
/// submission of the same key cannot be admitted twice.
pub fn store_invoice(
    store: &mut dyn InvoiceStore,
    invoice: Invoice,
) -> Result<StoreOutcome, NotaError> {
    if find_duplicate(store, &invoice).is_some() {
        debug!(number = %invoice.number, key = %invoice.access_key, "duplicate skipped");
        return Ok(StoreOutcome::Duplicate);
    }
    store.insert(invoice)?;
    Ok(StoreOutcome::Inserted)
}
