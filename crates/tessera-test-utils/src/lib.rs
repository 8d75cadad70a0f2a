//! Test fixtures for Tessera development.
//!
//! [`fixtures`] builds small mini-table sets directly with the layout
//! builder; [`schemas`] describes the same shapes as schema files for the
//! def pool.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod schemas;

pub use fixtures::TableFixture;
