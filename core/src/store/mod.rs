// cart_sync/src/store/mod.rs

//! The document-store seam the persistence adapter writes through.
//!
//! The hosted store itself is an external collaborator; this module only fixes the contract
//! (get / merge-patch / watch on a per-identity document) and ships an in-process
//! implementation for tests and local runs.

pub mod document;
pub mod memory;

pub use document::{merge_patch, DocumentKey, DocumentSnapshot, DocumentStore, DocumentWatch};
pub use memory::MemoryDocumentStore;
