//! Canonical NF-e record model, field normalizer, deduplication guard, and
//! tax aggregation.
//!
//! Every per-format parser produces the same [`Invoice`]/[`LineItem`] shape
//! defined here; everything downstream (dedup, storage, aggregation) only
//! ever sees that shape.

mod aggregate;
mod dedup;
mod error;
mod normalize;
mod store;
mod types;

pub use aggregate::*;
pub use dedup::*;
pub use error::*;
pub use normalize::*;
pub use store::*;
pub use types::*;
