//! Credential store
//!
//! Persistence for `userAuth`, `userVerification`, `userProfile` and
//! `resetToken` records. The surface is an abstract [`repository::Repository`]
//! trait speaking JSON documents plus typed stores that speak the entity
//! structs. The in-memory backend is the reference implementation; relational
//! and document backends plug in behind the same trait.

pub mod models;
pub mod repository;
pub mod stores;

pub use repository::{
    Collection, Cursor, FieldMap, FieldValue, Filter, IndexSpec, MemoryRepository, Page,
    Repository, RepositoryError, RepositoryResult, RetryPolicy, Transaction, TransactionConfig,
    with_transaction,
};
