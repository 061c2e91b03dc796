use super::error::NotaError;
use super::types::{Invoice, LineItem, OperationRole};

/// Persistence collaborator contract.
///
/// The pipeline only ever needs these operations: atomic create of an
/// invoice together with its line items (an [`Invoice`] owns its items, so
/// inserting the value *is* the transaction), lookups backing the
/// deduplication guard, filtered queries for aggregation, and an explicit
/// cascade delete. There is no update path — stored invoices are immutable.
pub trait InvoiceStore {
    /// Insert an invoice and all of its line items atomically, or not at
    /// all. Implementations must enforce the uniqueness invariant (access
    /// key, else identity triple) as the final arbiter, even if the caller
    /// already ran the dedup check.
    fn insert(&mut self, invoice: Invoice) -> Result<(), NotaError>;

    /// Look up a stored invoice by its 44-digit access key.
    fn find_by_access_key(&self, key: &str) -> Option<&Invoice>;

    /// Look up a stored invoice by the (number, issuer, issue date) triple.
    fn find_by_identity(
        &self,
        number: &str,
        issuer_tax_id: &str,
        issue_date: &str,
    ) -> Option<&Invoice>;

    /// All stored invoices, insertion order.
    fn all(&self) -> Vec<&Invoice>;

    /// Invoices with the given operation role.
    fn by_role(&self, role: OperationRole) -> Vec<&Invoice>;

    /// Invoices where the given tax ID is issuer or recipient.
    fn by_party(&self, tax_id: &str) -> Vec<&Invoice>;

    /// Line items of the invoice with the given access key.
    fn items_by_access_key(&self, key: &str) -> Vec<&LineItem>;

    /// Remove an invoice (and, by ownership, all of its line items) by
    /// access key. Returns the removed record.
    fn remove_by_access_key(&mut self, key: &str) -> Option<Invoice>;

    /// Remove an invoice by identity triple. Returns the removed record.
    fn remove_by_identity(
        &mut self,
        number: &str,
        issuer_tax_id: &str,
        issue_date: &str,
    ) -> Option<Invoice>;
}

/// Vec-backed reference implementation of [`InvoiceStore`].
///
/// Used by the test suites and as the semantic model for real backends:
/// `insert` re-checks uniqueness, so existence check plus insert behave as
/// one logical unit per candidate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    invoices: Vec<Invoice>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

impl InvoiceStore for MemoryStore {
    fn insert(&mut self, invoice: Invoice) -> Result<(), NotaError> {
        if invoice.has_access_key() {
            if self.find_by_access_key(&invoice.access_key).is_some() {
                return Err(NotaError::Store(format!(
                    "access key {} already stored",
                    invoice.access_key
                )));
            }
        } else {
            let (number, issuer, date) = invoice.identity();
            if self.find_by_identity(number, issuer, date).is_some() {
                return Err(NotaError::Store(format!(
                    "invoice {number} from {issuer} on {date} already stored"
                )));
            }
        }
        self.invoices.push(invoice);
        Ok(())
    }

    fn find_by_access_key(&self, key: &str) -> Option<&Invoice> {
        if key.is_empty() {
            return None;
        }
        self.invoices.iter().find(|i| i.access_key == key)
    }

    fn find_by_identity(
        &self,
        number: &str,
        issuer_tax_id: &str,
        issue_date: &str,
    ) -> Option<&Invoice> {
        self.invoices.iter().find(|i| {
            i.number == number && i.issuer_tax_id == issuer_tax_id && i.issue_date == issue_date
        })
    }

    fn all(&self) -> Vec<&Invoice> {
        self.invoices.iter().collect()
    }

    fn by_role(&self, role: OperationRole) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.operation_role == role)
            .collect()
    }

    fn by_party(&self, tax_id: &str) -> Vec<&Invoice> {
        self.invoices
            .iter()
            .filter(|i| i.issuer_tax_id == tax_id || i.recipient_tax_id == tax_id)
            .collect()
    }

    fn items_by_access_key(&self, key: &str) -> Vec<&LineItem> {
        self.find_by_access_key(key)
            .map(|i| i.items.iter().collect())
            .unwrap_or_default()
    }

    fn remove_by_access_key(&mut self, key: &str) -> Option<Invoice> {
        if key.is_empty() {
            return None;
        }
        let pos = self.invoices.iter().position(|i| i.access_key == key)?;
        Some(self.invoices.remove(pos))
    }

    fn remove_by_identity(
        &mut self,
        number: &str,
        issuer_tax_id: &str,
        issue_date: &str,
    ) -> Option<Invoice> {
        let pos = self.invoices.iter().position(|i| {
            i.number == number && i.issuer_tax_id == issuer_tax_id && i.issue_date == issue_date
        })?;
        Some(self.invoices.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(number: &str, key: &str) -> Invoice {
        Invoice {
            number: number.into(),
            issue_date: "2024-01-01".into(),
            issuer_tax_id: "11222333000181".into(),
            access_key: key.into(),
            items: vec![LineItem::default(), LineItem::default()],
            ..Invoice::default()
        }
    }

    #[test]
    fn insert_enforces_access_key_uniqueness() {
        let mut store = MemoryStore::new();
        store.insert(keyed("1", "k1")).unwrap();
        assert!(store.insert(keyed("2", "k1")).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_enforces_identity_triple_without_key() {
        let mut store = MemoryStore::new();
        store.insert(keyed("1", "")).unwrap();
        assert!(store.insert(keyed("1", "")).is_err());
        // Different number is fine
        store.insert(keyed("2", "")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_cascades_items() {
        let mut store = MemoryStore::new();
        store.insert(keyed("1", "k1")).unwrap();
        assert_eq!(store.items_by_access_key("k1").len(), 2);
        let removed = store.remove_by_access_key("k1").unwrap();
        assert_eq!(removed.items.len(), 2);
        assert!(store.items_by_access_key("k1").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn empty_access_key_never_matches() {
        let mut store = MemoryStore::new();
        store.insert(keyed("1", "")).unwrap();
        assert!(store.find_by_access_key("").is_none());
        assert!(store.remove_by_access_key("").is_none());
    }
}
