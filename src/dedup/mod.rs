//! Deduplication module.
//!
//! Provides:
//! - The persisted ledger of already-downloaded posts

pub mod ledger;

pub use ledger::DedupLedger;
