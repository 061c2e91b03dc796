//! # nota
//!
//! Brazilian NF-e ingestion and normalization library. Heterogeneous fiscal
//! document sources — NF-e 4.00 XML, tabular CSV exports, and free-text PDFs
//! structured with AI assistance — are normalized into one canonical
//! [`Invoice`]/[`LineItem`] model suitable for storage and tax aggregation.
//!
//! Directionality (inbound vs. outbound) is derived solely from comparing the
//! operator's CNPJ against the issuer and recipient CNPJs — never from the
//! document's free-text "natureza da operação".
//!
//! ## Quick Start
//!
//! ```rust
//! use nota::core::*;
//!
//! let role = classify_role("11222333000181", "99888777000100", "11222333000181");
//! assert_eq!(role, OperationRole::Outbound);
//!
//! let addr = compose_address("Rua das Flores", "100", "Centro", "São Paulo", "SP");
//! assert_eq!(addr, "Rua das Flores 100, Centro, São Paulo - SP");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Canonical types, normalizer, dedup guard, aggregator |
//! | `xml` | NF-e 4.00 XML parsing |
//! | `csv` | Semicolon-delimited tabular export parsing |
//! | `pdf` | PDF text extraction, AI adapter, regex fallback |
//! | `ai` | HTTP text-structuring collaborator with bounded retry |
//! | `ingest` | Batch dispatcher over xml + csv + pdf |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "csv")]
pub mod csv;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(feature = "ai")]
pub mod ai;

#[cfg(feature = "ingest")]
pub mod ingest;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
