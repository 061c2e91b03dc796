//! NF-e 4.00 XML parsing.
//!
//! Extracts one canonical [`Invoice`](crate::core::Invoice) (with line
//! items) from a namespaced NF-e document. Vendor variations are tolerated
//! where the schema allows them — missing optional sub-elements default to
//! empty strings or 0.0 — but a document missing a required block (`ide`,
//! `emit`, `ICMSTot`) fails as a whole; this parser never returns a partial
//! record.
//!
//! # Example
//!
//! ```no_run
//! use nota::xml::parse_nfe_xml;
//!
//! let xml = std::fs::read_to_string("nota.xml").unwrap();
//! let invoice = parse_nfe_xml(&xml, "11222333000181").unwrap();
//! println!("{} items", invoice.items.len());
//! ```

mod nfe;

pub use nfe::parse_nfe_xml;
